//! Property metadata.

use super::annotations::Annotations;
use super::ids::{EntityTypeId, PropertyId};
use super::source::{ConfigurationSource, Sourced};
use super::types::{PropertyType, ValueGenerated};
use serde_json::Value;

/// A scalar property declared on an entity type.
#[derive(Debug, Clone)]
pub struct Property {
    pub(crate) id: PropertyId,
    pub(crate) declaring_entity_type: EntityTypeId,
    pub(crate) name: String,
    pub(crate) property_type: PropertyType,
    pub(crate) clr_nullable: bool,
    pub(crate) shadow: bool,
    pub(crate) source: ConfigurationSource,
    pub(crate) nullable: Sourced<bool>,
    pub(crate) value_generated: Sourced<ValueGenerated>,
    pub(crate) requires_value_generator: bool,
    pub(crate) max_length: Sourced<Option<u32>>,
    pub(crate) concurrency_token: Sourced<bool>,
    pub(crate) field: Sourced<Option<String>>,
    pub(crate) annotations: Annotations,
}

impl Property {
    pub(crate) fn new(
        id: PropertyId,
        declaring_entity_type: EntityTypeId,
        name: String,
        property_type: PropertyType,
        clr_nullable: bool,
        shadow: bool,
        source: ConfigurationSource,
    ) -> Self {
        Self {
            id,
            declaring_entity_type,
            name,
            property_type,
            clr_nullable,
            shadow,
            source,
            nullable: Sourced::new(clr_nullable),
            value_generated: Sourced::new(ValueGenerated::Never),
            requires_value_generator: false,
            max_length: Sourced::new(None),
            concurrency_token: Sourced::new(false),
            field: Sourced::new(None),
            annotations: Annotations::new(),
        }
    }

    /// Arena id.
    pub fn id(&self) -> PropertyId {
        self.id
    }

    /// Property name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The entity type that declares this property.
    pub fn declaring_entity_type(&self) -> EntityTypeId {
        self.declaring_entity_type
    }

    /// Stored value type.
    pub fn property_type(&self) -> &PropertyType {
        &self.property_type
    }

    /// Whether the underlying member type admits null.
    pub fn is_clr_nullable(&self) -> bool {
        self.clr_nullable
    }

    /// Whether the property has no backing member.
    pub fn is_shadow(&self) -> bool {
        self.shadow
    }

    /// Source that added the property.
    pub fn configuration_source(&self) -> ConfigurationSource {
        self.source
    }

    /// Whether null values are allowed.
    pub fn is_nullable(&self) -> bool {
        self.nullable.value()
    }

    /// Source that set nullability.
    pub fn nullable_configuration_source(&self) -> Option<ConfigurationSource> {
        self.nullable.source()
    }

    /// Value generation strategy.
    pub fn value_generated(&self) -> ValueGenerated {
        self.value_generated.value()
    }

    /// Source that set the value generation strategy.
    pub fn value_generated_configuration_source(&self) -> Option<ConfigurationSource> {
        self.value_generated.source()
    }

    /// Whether a value generator must produce values for this property.
    pub fn requires_value_generator(&self) -> bool {
        self.requires_value_generator
    }

    /// Maximum length, if configured.
    pub fn max_length(&self) -> Option<u32> {
        self.max_length.value()
    }

    /// Whether the property is a concurrency token.
    pub fn is_concurrency_token(&self) -> bool {
        self.concurrency_token.value()
    }

    /// Name of the backing field, if bound.
    pub fn field_name(&self) -> Option<&str> {
        self.field.get().as_deref()
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
