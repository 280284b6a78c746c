//! Builder for indexes.

use super::InternalModelBuilder;
use crate::metadata::{ConfigurationSource, Index, IndexId};
use serde_json::Value;

/// Configures one index.
pub struct InternalIndexBuilder<'a> {
    mb: &'a mut InternalModelBuilder,
    id: IndexId,
}

impl<'a> InternalIndexBuilder<'a> {
    pub(crate) fn new(mb: &'a mut InternalModelBuilder, id: IndexId) -> Self {
        Self { mb, id }
    }

    /// The index being configured.
    pub fn id(&self) -> IndexId {
        self.id
    }

    /// The index metadata, if it still exists.
    pub fn metadata(&self) -> Option<&Index> {
        self.mb.model.index(self.id)
    }

    /// Make the index unique or not.
    pub fn is_unique(&mut self, unique: bool, source: ConfigurationSource) -> bool {
        let Some(changed) = self
            .mb
            .model
            .index_mut(self.id)
            .and_then(|i| i.unique.set(unique, source))
        else {
            return false;
        };
        if changed {
            self.mb.on_index_uniqueness_changed(self.id);
        }
        true
    }

    /// Set or remove an index annotation.
    pub fn has_annotation(
        &mut self,
        name: &str,
        value: Option<Value>,
        source: ConfigurationSource,
    ) -> bool {
        let Some(index) = self.mb.model.index_mut(self.id) else {
            return false;
        };
        let previous = index.annotations.find(name).cloned();
        if index.annotations.set(name, value, source).is_none() {
            return false;
        }
        if previous.as_ref().map(|a| &a.value) == index.annotations.get(name) {
            return true;
        }
        self.mb
            .on_index_annotation_changed(self.id, name.to_string(), previous)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModelConfig;
    use crate::conventions::ConventionSet;
    use crate::metadata::{ScalarType, TypeRegistry, TypeShape};
    use serde_json::json;

    #[test]
    fn test_index_uniqueness_and_annotations() {
        let registry = TypeRegistry::new().with_shape(
            TypeShape::new("User")
                .with_scalar("Id", ScalarType::Int32)
                .with_scalar("Email", ScalarType::String),
        );
        let mut builder = InternalModelBuilder::with_conventions(
            registry,
            ModelConfig::default(),
            ConventionSet::empty(),
        );
        let user = builder.entity("User", ConfigurationSource::Explicit).unwrap();
        let mut entity = builder.entity_builder(user);
        let email = entity.property("Email", ConfigurationSource::Explicit).unwrap();
        let index = entity
            .has_index(vec![email], ConfigurationSource::Convention)
            .unwrap();

        let mut index_builder = builder.index_builder(index);
        assert!(index_builder.is_unique(true, ConfigurationSource::Explicit));
        assert!(!index_builder.is_unique(false, ConfigurationSource::Convention));
        assert!(index_builder.has_annotation(
            "Relational:Name",
            Some(json!("IX_User_Email")),
            ConfigurationSource::Explicit
        ));

        let index = builder.model().index(index).unwrap();
        assert!(index.is_unique());
        assert_eq!(index.annotation("Relational:Name"), Some(&json!("IX_User_Email")));
    }
}
