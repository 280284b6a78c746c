//! Index metadata.

use super::annotations::Annotations;
use super::ids::{EntityTypeId, IndexId, PropertyId};
use super::source::{ConfigurationSource, Sourced};
use serde_json::Value;

/// An ordered list of properties indexed together.
#[derive(Debug, Clone)]
pub struct Index {
    pub(crate) id: IndexId,
    pub(crate) declaring_entity_type: EntityTypeId,
    pub(crate) properties: Vec<PropertyId>,
    pub(crate) source: ConfigurationSource,
    pub(crate) unique: Sourced<bool>,
    pub(crate) annotations: Annotations,
}

impl Index {
    pub(crate) fn new(
        id: IndexId,
        declaring_entity_type: EntityTypeId,
        properties: Vec<PropertyId>,
        source: ConfigurationSource,
    ) -> Self {
        Self {
            id,
            declaring_entity_type,
            properties,
            source,
            unique: Sourced::new(false),
            annotations: Annotations::new(),
        }
    }

    /// Arena id.
    pub fn id(&self) -> IndexId {
        self.id
    }

    /// The entity type that declares this index.
    pub fn declaring_entity_type(&self) -> EntityTypeId {
        self.declaring_entity_type
    }

    /// Indexed properties in order.
    pub fn properties(&self) -> &[PropertyId] {
        &self.properties
    }

    /// Source that added the index.
    pub fn configuration_source(&self) -> ConfigurationSource {
        self.source
    }

    /// Whether the index enforces uniqueness.
    pub fn is_unique(&self) -> bool {
        self.unique.value()
    }

    /// Source that set uniqueness.
    pub fn unique_configuration_source(&self) -> Option<ConfigurationSource> {
        self.unique.source()
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
