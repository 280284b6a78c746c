//! Entry point of the fluent surface.

use super::{EntityTypeBuilder, EXPLICIT};
use crate::config::ModelConfig;
use crate::conventions::ConventionSet;
use crate::diagnostics::DiagnosticsLogger;
use crate::error::{ModelError, Result};
use crate::internal::InternalModelBuilder;
use crate::metadata::{Model, PropertyType, TypeRegistry};
use serde_json::Value;

/// Builds a [`Model`] from registered type shapes.
///
/// Conventions discover most of the model as entity types are added; the
/// builder methods override what they found.
///
/// ```
/// use ormdb_model::{ModelBuilder, ScalarType, TypeRegistry, TypeShape};
///
/// let registry = TypeRegistry::new()
///     .with_shape(
///         TypeShape::new("Blog")
///             .with_scalar("Id", ScalarType::Int32)
///             .with_collection("Posts", "Post"),
///     )
///     .with_shape(
///         TypeShape::new("Post")
///             .with_scalar("Id", ScalarType::Int32)
///             .with_scalar("BlogId", ScalarType::Int32)
///             .with_reference("Blog", "Blog"),
///     );
///
/// let mut builder = ModelBuilder::new(registry);
/// builder.entity("Blog").unwrap();
/// let model = builder.finalize().unwrap();
/// assert_eq!(model.entity_types().len(), 2);
/// ```
#[derive(Debug)]
pub struct ModelBuilder {
    inner: InternalModelBuilder,
}

impl ModelBuilder {
    /// Create a builder with the default configuration.
    pub fn new(registry: TypeRegistry) -> Self {
        Self::with_config(registry, ModelConfig::default())
    }

    /// Create a builder with the core conventions for `config`.
    pub fn with_config(registry: TypeRegistry, config: ModelConfig) -> Self {
        Self {
            inner: InternalModelBuilder::new(registry, config),
        }
    }

    /// Create a builder with a custom convention set.
    pub fn with_conventions(
        registry: TypeRegistry,
        config: ModelConfig,
        conventions: ConventionSet,
    ) -> Self {
        Self {
            inner: InternalModelBuilder::with_conventions(registry, config, conventions),
        }
    }

    /// The model built so far.
    pub fn model(&self) -> &Model {
        self.inner.model()
    }

    /// Diagnostics logged so far.
    pub fn diagnostics(&self) -> &DiagnosticsLogger {
        self.inner.model().diagnostics()
    }

    /// The internal builder, for configuring at a source other than explicit.
    pub fn internal(&mut self) -> &mut InternalModelBuilder {
        &mut self.inner
    }

    /// Get or add the entity type for a registered type.
    pub fn entity(&mut self, name: &str) -> Result<EntityTypeBuilder<'_>> {
        if !self.inner.registry().contains(name) {
            return Err(ModelError::TypeNotRegistered {
                name: name.to_string(),
            });
        }
        let id = self
            .inner
            .entity(name, EXPLICIT)
            .ok_or_else(|| ModelError::rejected("entity", name))?;
        Ok(EntityTypeBuilder::new(&mut self.inner, id))
    }

    /// Get or add an entity type with no backing type shape.
    ///
    /// Its properties are declared with [`EntityTypeBuilder::shadow_property`].
    pub fn shadow_entity(&mut self, name: &str) -> Result<EntityTypeBuilder<'_>> {
        if self.inner.registry().contains(name) {
            return self.entity(name);
        }
        let id = self
            .inner
            .entity(name, EXPLICIT)
            .ok_or_else(|| ModelError::rejected("entity", name))?;
        Ok(EntityTypeBuilder::new(&mut self.inner, id))
    }

    /// Exclude a type from the model.
    pub fn ignore(&mut self, name: &str) -> Result<&mut Self> {
        if self.inner.ignore(name, EXPLICIT) {
            Ok(self)
        } else {
            Err(ModelError::rejected("ignore", name))
        }
    }

    /// Set a model annotation.
    pub fn has_annotation(&mut self, name: &str, value: Value) -> Result<&mut Self> {
        if self.inner.has_annotation(name, Some(value), EXPLICIT) {
            Ok(self)
        } else {
            Err(ModelError::rejected("has_annotation", name))
        }
    }

    /// Shorthand for a shadow property on a shadow entity type.
    pub fn shadow_property(
        &mut self,
        entity: &str,
        name: &str,
        property_type: PropertyType,
        nullable: bool,
    ) -> Result<&mut Self> {
        self.shadow_entity(entity)?
            .shadow_property(name, property_type, nullable)?;
        Ok(self)
    }

    /// Run the model built conventions and, if configured, the validator.
    pub fn finalize(self) -> Result<Model> {
        self.inner.finalize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{ScalarType, TypeShape};
    use serde_json::json;

    fn registry() -> TypeRegistry {
        TypeRegistry::new()
            .with_shape(TypeShape::new("Blog").with_scalar("Id", ScalarType::Int32))
            .with_shape(TypeShape::new("Audit").with_scalar("Id", ScalarType::Int32))
    }

    #[test]
    fn test_unregistered_type_is_an_error() {
        let mut builder = ModelBuilder::new(registry());
        assert_eq!(
            builder.entity("Missing").err(),
            Some(ModelError::TypeNotRegistered {
                name: "Missing".into()
            })
        );
    }

    #[test]
    fn test_ignore_removes_entity_type() {
        let mut builder = ModelBuilder::new(registry());
        builder.entity("Audit").unwrap();
        builder.ignore("Audit").unwrap();
        assert!(builder.model().find_entity_type("Audit").is_none());

        builder.entity("Audit").unwrap();
        assert!(builder.model().find_entity_type("Audit").is_some());
    }

    #[test]
    fn test_shadow_entity_and_annotation() {
        let mut builder = ModelBuilder::new(registry());
        builder
            .shadow_property("Tag", "Id", PropertyType::scalar(ScalarType::Int64), false)
            .unwrap()
            .has_annotation("Scaffold:Schema", json!("blogging"))
            .unwrap();

        let model = builder.finalize().unwrap();
        let tag = model.find_entity_type("Tag").unwrap();
        assert!(tag.is_shadow());
        assert_eq!(
            model.find_primary_key(tag.id()).map(|k| model.property_names(k.properties())),
            Some(vec!["Id".to_string()])
        );
        assert_eq!(model.annotation("Scaffold:Schema"), Some(&json!("blogging")));
    }
}
