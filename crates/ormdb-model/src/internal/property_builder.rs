//! Builder for properties.

use super::InternalModelBuilder;
use crate::metadata::{ConfigurationSource, Property, PropertyId, ValueGenerated};
use serde_json::Value;

/// Configures one property.
pub struct InternalPropertyBuilder<'a> {
    mb: &'a mut InternalModelBuilder,
    id: PropertyId,
}

impl<'a> InternalPropertyBuilder<'a> {
    pub(crate) fn new(mb: &'a mut InternalModelBuilder, id: PropertyId) -> Self {
        Self { mb, id }
    }

    /// The property being configured.
    pub fn id(&self) -> PropertyId {
        self.id
    }

    /// The property metadata, if it still exists.
    pub fn metadata(&self) -> Option<&Property> {
        self.mb.model.property(self.id)
    }

    /// Make the property required or optional.
    ///
    /// A property can only become nullable when its type admits null and it
    /// is not part of a key.
    pub fn is_required(&mut self, required: bool, source: ConfigurationSource) -> bool {
        let Some(property) = self.mb.model.property(self.id) else {
            return false;
        };
        let nullable = !required;
        if nullable
            && (!property.clr_nullable || !self.mb.model.keys_containing(self.id).is_empty())
        {
            return false;
        }
        let previous = property.nullable.clone();
        let Some(property) = self.mb.model.property_mut(self.id) else {
            return false;
        };
        match property.nullable.set(nullable, source) {
            None => false,
            Some(false) => true,
            Some(true) => self.mb.on_property_nullability_changed(self.id, previous),
        }
    }

    /// Set when the store generates values.
    pub fn value_generated(&mut self, value: ValueGenerated, source: ConfigurationSource) -> bool {
        self.mb
            .model
            .property_mut(self.id)
            .and_then(|p| p.value_generated.set(value, source))
            .is_some()
    }

    /// Set the maximum length.
    pub fn has_max_length(&mut self, length: Option<u32>, source: ConfigurationSource) -> bool {
        self.mb
            .model
            .property_mut(self.id)
            .and_then(|p| p.max_length.set(length, source))
            .is_some()
    }

    /// Mark the property as a concurrency token.
    pub fn is_concurrency_token(&mut self, token: bool, source: ConfigurationSource) -> bool {
        self.mb
            .model
            .property_mut(self.id)
            .and_then(|p| p.concurrency_token.set(token, source))
            .is_some()
    }

    /// Set or clear the backing field.
    ///
    /// The field must exist on the declaring type's shape with the same
    /// property type.
    pub fn has_field(&mut self, field: Option<&str>, source: ConfigurationSource) -> bool {
        let Some(property) = self.mb.model.property(self.id) else {
            return false;
        };
        if let Some(field) = field {
            let matches = self
                .mb
                .find_member(property.declaring_entity_type, field)
                .is_some_and(|m| {
                    m.is_field
                        && m.member_type.property_type().map(|(t, _)| t).as_ref()
                            == Some(&property.property_type)
                });
            if !matches {
                return false;
            }
        }
        let previous = property.field.get().clone();
        let Some(changed) = self
            .mb
            .model
            .property_mut(self.id)
            .and_then(|p| p.field.set(field.map(str::to_string), source))
        else {
            return false;
        };
        if changed {
            self.mb.on_property_field_changed(self.id, previous);
        }
        true
    }

    /// Set or remove a property annotation.
    pub fn has_annotation(
        &mut self,
        name: &str,
        value: Option<Value>,
        source: ConfigurationSource,
    ) -> bool {
        let Some(property) = self.mb.model.property_mut(self.id) else {
            return false;
        };
        let previous = property.annotations.find(name).cloned();
        if property.annotations.set(name, value, source).is_none() {
            return false;
        }
        if previous.as_ref().map(|a| &a.value) == property.annotations.get(name) {
            return true;
        }
        self.mb
            .on_property_annotation_changed(self.id, name.to_string(), previous)
    }

    pub(crate) fn set_requires_value_generator(&mut self, requires: bool) {
        if let Some(property) = self.mb.model.property_mut(self.id) {
            property.requires_value_generator = requires;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModelConfig;
    use crate::conventions::ConventionSet;
    use crate::metadata::{MemberShape, MemberType, ScalarType, TypeRegistry, TypeShape};
    use serde_json::json;

    fn builder() -> (InternalModelBuilder, PropertyId, PropertyId) {
        let registry = TypeRegistry::new().with_shape(
            TypeShape::new("Customer")
                .with_scalar("Id", ScalarType::Int32)
                .with_property("Nickname", MemberType::OptionalScalar(ScalarType::String))
                .with_member(MemberShape::field(
                    "_nickname",
                    MemberType::OptionalScalar(ScalarType::String),
                )),
        );
        let mut builder = InternalModelBuilder::with_conventions(
            registry,
            ModelConfig::default(),
            ConventionSet::empty(),
        );
        let customer = builder.entity("Customer", ConfigurationSource::Explicit).unwrap();
        let mut entity = builder.entity_builder(customer);
        let id = entity.property("Id", ConfigurationSource::Explicit).unwrap();
        let nickname = entity
            .property("Nickname", ConfigurationSource::Explicit)
            .unwrap();
        (builder, id, nickname)
    }

    #[test]
    fn test_non_nullable_type_cannot_become_optional() {
        let (mut builder, id, nickname) = builder();
        assert!(!builder
            .property_builder(id)
            .is_required(false, ConfigurationSource::Explicit));
        assert!(builder
            .property_builder(nickname)
            .is_required(true, ConfigurationSource::DataAnnotation));
        assert!(!builder
            .property_builder(nickname)
            .is_required(false, ConfigurationSource::Convention));
        assert!(!builder.model().property(nickname).unwrap().is_nullable());
    }

    #[test]
    fn test_backing_field_must_exist() {
        let (mut builder, _, nickname) = builder();
        let mut property = builder.property_builder(nickname);
        assert!(!property.has_field(Some("_missing"), ConfigurationSource::Explicit));
        assert!(property.has_field(Some("_nickname"), ConfigurationSource::Explicit));
        assert_eq!(
            builder.model().property(nickname).unwrap().field_name(),
            Some("_nickname")
        );
    }

    #[test]
    fn test_facets_respect_precedence() {
        let (mut builder, _, nickname) = builder();
        let mut property = builder.property_builder(nickname);
        assert!(property.has_max_length(Some(64), ConfigurationSource::DataAnnotation));
        assert!(!property.has_max_length(Some(32), ConfigurationSource::Convention));
        assert!(property.is_concurrency_token(true, ConfigurationSource::Explicit));
        assert!(property.has_annotation(
            "Relational:ColumnName",
            Some(json!("nick")),
            ConfigurationSource::Explicit
        ));
        let property = builder.model().property(nickname).unwrap();
        assert_eq!(property.max_length(), Some(64));
        assert!(property.is_concurrency_token());
        assert_eq!(
            property.annotation("Relational:ColumnName"),
            Some(&json!("nick"))
        );
    }
}
