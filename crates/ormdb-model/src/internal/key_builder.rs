//! Builder for keys.

use super::InternalModelBuilder;
use crate::metadata::{ConfigurationSource, Key, KeyId};
use serde_json::Value;

/// Configures one key.
pub struct InternalKeyBuilder<'a> {
    mb: &'a mut InternalModelBuilder,
    id: KeyId,
}

impl<'a> InternalKeyBuilder<'a> {
    pub(crate) fn new(mb: &'a mut InternalModelBuilder, id: KeyId) -> Self {
        Self { mb, id }
    }

    /// The key being configured.
    pub fn id(&self) -> KeyId {
        self.id
    }

    /// The key metadata, if it still exists.
    pub fn metadata(&self) -> Option<&Key> {
        self.mb.model.key(self.id)
    }

    /// Set or remove a key annotation.
    pub fn has_annotation(
        &mut self,
        name: &str,
        value: Option<Value>,
        source: ConfigurationSource,
    ) -> bool {
        self.mb
            .model
            .key_mut(self.id)
            .and_then(|k| k.annotations.set(name, value, source))
            .is_some()
    }
}
