//! Fluent configuration of one index.

use super::EXPLICIT;
use crate::error::{ModelError, Result};
use crate::internal::InternalModelBuilder;
use crate::metadata::{Index, IndexId};
use serde_json::Value;

/// Configures an index.
#[derive(Debug)]
pub struct IndexBuilder<'a> {
    mb: &'a mut InternalModelBuilder,
    id: IndexId,
}

impl<'a> IndexBuilder<'a> {
    pub(crate) fn new(mb: &'a mut InternalModelBuilder, id: IndexId) -> Self {
        Self { mb, id }
    }

    /// Current metadata of the index.
    pub fn metadata(&self) -> Option<&Index> {
        self.mb.model().index(self.id)
    }

    fn check(&mut self, applied: bool, operation: &str) -> Result<&mut Self> {
        if applied {
            return Ok(self);
        }
        let model = self.mb.model();
        let target = match model.index(self.id) {
            Some(index) => format!(
                "{}({})",
                model.entity_type_name(index.declaring_entity_type()),
                model.display_properties(index.properties())
            ),
            None => format!("{:?}", self.id),
        };
        Err(ModelError::rejected(operation, target))
    }

    /// Make the index unique.
    pub fn is_unique(&mut self, unique: bool) -> Result<&mut Self> {
        let applied = self.mb.index_builder(self.id).is_unique(unique, EXPLICIT);
        self.check(applied, "is_unique")
    }

    /// Set an index annotation.
    pub fn has_annotation(&mut self, name: &str, value: Value) -> Result<&mut Self> {
        let applied = self
            .mb
            .index_builder(self.id)
            .has_annotation(name, Some(value), EXPLICIT);
        self.check(applied, "has_annotation")
    }
}
