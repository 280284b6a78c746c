//! Key metadata.

use super::annotations::Annotations;
use super::ids::{EntityTypeId, KeyId, PropertyId};
use super::source::ConfigurationSource;
use serde_json::Value;

/// An ordered, non-empty set of properties that uniquely identifies an entity.
#[derive(Debug, Clone)]
pub struct Key {
    pub(crate) id: KeyId,
    pub(crate) declaring_entity_type: EntityTypeId,
    pub(crate) properties: Vec<PropertyId>,
    pub(crate) source: ConfigurationSource,
    pub(crate) annotations: Annotations,
}

impl Key {
    pub(crate) fn new(
        id: KeyId,
        declaring_entity_type: EntityTypeId,
        properties: Vec<PropertyId>,
        source: ConfigurationSource,
    ) -> Self {
        Self {
            id,
            declaring_entity_type,
            properties,
            source,
            annotations: Annotations::new(),
        }
    }

    /// Arena id.
    pub fn id(&self) -> KeyId {
        self.id
    }

    /// The entity type that declares this key.
    pub fn declaring_entity_type(&self) -> EntityTypeId {
        self.declaring_entity_type
    }

    /// Key properties in order.
    pub fn properties(&self) -> &[PropertyId] {
        &self.properties
    }

    /// Source that added the key.
    pub fn configuration_source(&self) -> ConfigurationSource {
        self.source
    }

    /// Annotation lookup.
    pub fn annotation(&self, name: &str) -> Option<&Value> {
        self.annotations.get(name)
    }

    /// All annotations.
    pub fn annotations(&self) -> &Annotations {
        &self.annotations
    }
}
