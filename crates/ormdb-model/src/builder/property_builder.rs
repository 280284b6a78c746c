//! Fluent configuration of one property.

use super::EXPLICIT;
use crate::error::{ModelError, Result};
use crate::internal::InternalModelBuilder;
use crate::metadata::{Property, PropertyId, ValueGenerated};
use serde_json::Value;

/// Configures a property.
#[derive(Debug)]
pub struct PropertyBuilder<'a> {
    mb: &'a mut InternalModelBuilder,
    id: PropertyId,
}

impl<'a> PropertyBuilder<'a> {
    pub(crate) fn new(mb: &'a mut InternalModelBuilder, id: PropertyId) -> Self {
        Self { mb, id }
    }

    /// The property being configured.
    pub fn id(&self) -> PropertyId {
        self.id
    }

    /// Current metadata of the property.
    pub fn metadata(&self) -> Option<&Property> {
        self.mb.model().property(self.id)
    }

    fn check(&mut self, applied: bool, operation: &str) -> Result<&mut Self> {
        if applied {
            return Ok(self);
        }
        let model = self.mb.model();
        let target = match model.property(self.id) {
            Some(p) => format!(
                "{}.{}",
                model.entity_type_name(p.declaring_entity_type()),
                p.name()
            ),
            None => format!("{:?}", self.id),
        };
        Err(ModelError::rejected(operation, target))
    }

    /// Require a value, or allow null when the type admits it.
    pub fn is_required(&mut self, required: bool) -> Result<&mut Self> {
        let applied = self.mb.property_builder(self.id).is_required(required, EXPLICIT);
        self.check(applied, "is_required")
    }

    /// Set when the store generates values.
    pub fn value_generated(&mut self, value_generated: ValueGenerated) -> Result<&mut Self> {
        let applied = self
            .mb
            .property_builder(self.id)
            .value_generated(value_generated, EXPLICIT);
        self.check(applied, "value_generated")
    }

    /// Shorthand for [`ValueGenerated::Never`].
    pub fn value_generated_never(&mut self) -> Result<&mut Self> {
        self.value_generated(ValueGenerated::Never)
    }

    /// Limit the length of string or binary values.
    pub fn has_max_length(&mut self, length: u32) -> Result<&mut Self> {
        let applied = self
            .mb
            .property_builder(self.id)
            .has_max_length(Some(length), EXPLICIT);
        self.check(applied, "has_max_length")
    }

    /// Use the property for optimistic concurrency checks.
    pub fn is_concurrency_token(&mut self, token: bool) -> Result<&mut Self> {
        let applied = self
            .mb
            .property_builder(self.id)
            .is_concurrency_token(token, EXPLICIT);
        self.check(applied, "is_concurrency_token")
    }

    /// Set the backing field.
    pub fn has_field(&mut self, field: &str) -> Result<&mut Self> {
        let applied = self.mb.property_builder(self.id).has_field(Some(field), EXPLICIT);
        self.check(applied, "has_field")
    }

    /// Set a property annotation.
    pub fn has_annotation(&mut self, name: &str, value: Value) -> Result<&mut Self> {
        let applied = self
            .mb
            .property_builder(self.id)
            .has_annotation(name, Some(value), EXPLICIT);
        self.check(applied, "has_annotation")
    }
}

#[cfg(test)]
mod tests {
    use crate::builder::ModelBuilder;
    use crate::error::ModelError;
    use crate::metadata::{MemberShape, MemberType, ScalarType, TypeRegistry, TypeShape, ValueGenerated};
    use serde_json::json;

    fn registry() -> TypeRegistry {
        TypeRegistry::new().with_shape(
            TypeShape::new("Product")
                .with_scalar("Id", ScalarType::Int32)
                .with_scalar("Name", ScalarType::String)
                .with_scalar("Price", ScalarType::Int64)
                .with_scalar("Version", ScalarType::Bytes)
                .with_member(MemberShape::field("_name", MemberType::Scalar(ScalarType::String))),
        )
    }

    #[test]
    fn test_facets_are_applied() {
        let mut builder = ModelBuilder::new(registry());
        let mut product = builder.entity("Product").unwrap();
        product
            .property("Name")
            .unwrap()
            .is_required(true)
            .unwrap()
            .has_max_length(200)
            .unwrap()
            .has_field("_name")
            .unwrap()
            .has_annotation("Column:Collation", json!("nocase"))
            .unwrap();
        product.property("Version").unwrap().is_concurrency_token(true).unwrap();
        product.property("Id").unwrap().value_generated_never().unwrap();
        let id = product.id();

        let model = builder.model();
        let name = model.find_property(id, "Name").unwrap();
        assert!(!name.is_nullable());
        assert_eq!(name.max_length(), Some(200));
        assert_eq!(name.field_name(), Some("_name"));
        assert_eq!(name.annotation("Column:Collation"), Some(&json!("nocase")));
        assert!(model.find_property(id, "Version").unwrap().is_concurrency_token());
        assert_eq!(
            model.find_property(id, "Id").unwrap().value_generated(),
            ValueGenerated::Never
        );
    }

    #[test]
    fn test_non_nullable_type_cannot_be_optional() {
        let mut builder = ModelBuilder::new(registry());
        let mut product = builder.entity("Product").unwrap();
        let err = product.property("Price").unwrap().is_required(false).unwrap_err();
        assert_eq!(err, ModelError::rejected("is_required", "Product.Price"));
    }
}
