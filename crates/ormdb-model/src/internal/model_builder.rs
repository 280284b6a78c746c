//! The root internal builder.

use super::{
    InternalEntityTypeBuilder, InternalIndexBuilder, InternalKeyBuilder, InternalPropertyBuilder,
    InternalRelationshipBuilder,
};
use crate::config::ModelConfig;
use crate::conventions::{ConventionDispatcher, ConventionSet};
use crate::diagnostics::Diagnostic;
use crate::error::Result;
use crate::metadata::{
    ConfigurationSource, DefiningNavigation, EntityType, EntityTypeId, ForeignKey, ForeignKeyId,
    Index, IndexId, Key, KeyId, MemberShape, Model, Property, PropertyId, TypeRegistry,
};
use crate::validation::ModelValidator;
use serde_json::Value;
use std::rc::Rc;
use tracing::{debug, info, instrument};

/// Owns the model under construction and every mutation path into it.
///
/// All changes carry a [`ConfigurationSource`]. A change is applied only when
/// its source is at least as strong as the one that set the current value;
/// otherwise the call returns `None` or `false` and leaves the model alone.
pub struct InternalModelBuilder {
    pub(crate) model: Model,
    pub(crate) registry: Rc<TypeRegistry>,
    pub(crate) config: ModelConfig,
    pub(crate) dispatcher: ConventionDispatcher,
}

impl InternalModelBuilder {
    /// Create a builder with the core conventions for `config`.
    pub fn new(registry: TypeRegistry, config: ModelConfig) -> Self {
        let conventions = ConventionSet::core(&config);
        Self::with_conventions(registry, config, conventions)
    }

    /// Create a builder with a custom convention set.
    pub fn with_conventions(
        registry: TypeRegistry,
        config: ModelConfig,
        conventions: ConventionSet,
    ) -> Self {
        let mut builder = Self {
            model: Model::new(),
            registry: Rc::new(registry),
            config,
            dispatcher: ConventionDispatcher::new(conventions),
        };
        builder.on_model_initialized();
        builder
    }

    /// The model under construction.
    pub fn model(&self) -> &Model {
        &self.model
    }

    /// The type shapes being mapped.
    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    /// Shared handle to the registry, usable while the builder is borrowed mutably.
    pub fn shared_registry(&self) -> Rc<TypeRegistry> {
        Rc::clone(&self.registry)
    }

    /// The session configuration.
    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    /// The convention dispatcher.
    pub fn dispatcher(&self) -> &ConventionDispatcher {
        &self.dispatcher
    }

    /// Record a diagnostic on the model.
    pub fn log(&mut self, diagnostic: Diagnostic) -> bool {
        self.model.diagnostics.log(diagnostic)
    }

    // ---- builders -------------------------------------------------------

    /// Builder for an entity type.
    pub fn entity_builder(&mut self, id: EntityTypeId) -> InternalEntityTypeBuilder<'_> {
        InternalEntityTypeBuilder::new(self, id)
    }

    /// Builder for a property.
    pub fn property_builder(&mut self, id: PropertyId) -> InternalPropertyBuilder<'_> {
        InternalPropertyBuilder::new(self, id)
    }

    /// Builder for a key.
    pub fn key_builder(&mut self, id: KeyId) -> InternalKeyBuilder<'_> {
        InternalKeyBuilder::new(self, id)
    }

    /// Builder for an index.
    pub fn index_builder(&mut self, id: IndexId) -> InternalIndexBuilder<'_> {
        InternalIndexBuilder::new(self, id)
    }

    /// Builder for a relationship.
    pub fn relationship_builder(&mut self, id: ForeignKeyId) -> InternalRelationshipBuilder<'_> {
        InternalRelationshipBuilder::new(self, id)
    }

    // ---- type shape lookups ---------------------------------------------

    /// Members at the declared level of an entity type.
    ///
    /// That is the type's own members plus those of unmapped ancestors up to
    /// the mapped base type. Shadow entity types have none.
    pub fn declared_members(&self, id: EntityTypeId) -> Vec<MemberShape> {
        let Some(clr_type) = self.model.entity_type(id).and_then(|e| e.clr_type()) else {
            return Vec::new();
        };
        let stop = self
            .model
            .entity_type(id)
            .and_then(|e| e.base_type())
            .and_then(|b| self.model.entity_type(b))
            .and_then(|b| b.clr_type());
        self.registry
            .members_up_to(clr_type, stop)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Find a member on the type of an entity type, including inherited ones.
    pub fn find_member(&self, id: EntityTypeId, name: &str) -> Option<MemberShape> {
        let clr_type = self.model.entity_type(id)?.clr_type()?;
        self.registry.find_member(clr_type, name).cloned()
    }

    /// Navigation target type name and collection flag of a member.
    pub fn navigation_member(&self, id: EntityTypeId, name: &str) -> Option<(String, bool)> {
        let member = self.find_member(id, name)?;
        member
            .member_type
            .navigation_target()
            .map(|(target, is_collection)| (target.to_string(), is_collection))
    }

    /// Whether the entity type's shape is assignable to `type_name`.
    pub fn is_assignable_to(&self, id: EntityTypeId, type_name: &str) -> bool {
        match self.model.entity_type(id) {
            Some(entity_type) => match entity_type.clr_type() {
                Some(clr_type) => self.registry.is_assignable_from(type_name, clr_type),
                None => entity_type.name() == type_name,
            },
            None => false,
        }
    }

    // ---- entity types ---------------------------------------------------

    /// Whether the type name is ignored at a source `source` cannot override.
    pub fn is_ignored(&self, name: &str, source: ConfigurationSource) -> bool {
        self.model
            .ignored_type_source(name)
            .is_some_and(|ignored| source != ConfigurationSource::Explicit && ignored >= source)
    }

    /// Get or add the entity type for a type name.
    ///
    /// Names without a registered shape produce shadow entity types.
    pub fn entity(&mut self, name: &str, source: ConfigurationSource) -> Option<EntityTypeId> {
        if self.is_ignored(name, source) {
            return None;
        }
        self.model.ignored_types.remove(name);

        if let Some(id) = self.model.find_entity_type_id(name) {
            if let Some(entity_type) = self.model.entity_type_mut(id) {
                entity_type.source = entity_type.source.max_with(Some(source));
            }
            return Some(id);
        }

        let clr_type = self.registry.contains(name).then(|| name.to_string());
        let id = self
            .model
            .add_entity_type(name.to_string(), clr_type, None, source);
        debug!(entity = name, %source, "entity type added");
        self.on_entity_type_added(id)
    }

    /// Get or add the weak entity type reached through `owner.navigation`.
    pub fn owned_entity(
        &mut self,
        owner: EntityTypeId,
        navigation: &str,
        type_name: &str,
        source: ConfigurationSource,
    ) -> Option<EntityTypeId> {
        if self.is_ignored(type_name, source) {
            return None;
        }
        if let Some(existing) = self
            .model
            .find_weak_entity_type(type_name, owner, navigation)
            .map(|e| e.id())
        {
            if let Some(entity_type) = self.model.entity_type_mut(existing) {
                entity_type.source = entity_type.source.max_with(Some(source));
            }
            return Some(existing);
        }

        let owner_name = self.model.entity_type(owner)?.name().to_string();
        let name = format!("{owner_name}.{navigation}#{type_name}");
        let clr_type = self.registry.contains(type_name).then(|| type_name.to_string());
        let defining = DefiningNavigation {
            entity_type: owner,
            navigation: navigation.to_string(),
        };
        let id = self
            .model
            .add_entity_type(name, clr_type, Some(defining), source);
        self.on_entity_type_added(id)
    }

    /// Ignore a type name and remove its entity types.
    pub fn ignore(&mut self, name: &str, source: ConfigurationSource) -> bool {
        let mut targets: Vec<EntityTypeId> = self
            .model
            .find_entity_type_id(name)
            .into_iter()
            .collect();
        targets.extend(
            self.model
                .entity_types
                .iter()
                .flatten()
                .filter(|e| e.is_weak() && e.clr_type() == Some(name))
                .map(|e| e.id()),
        );
        for id in &targets {
            let Some(entity_type) = self.model.entity_type(*id) else {
                continue;
            };
            if !source.overrides(Some(entity_type.configuration_source())) {
                return false;
            }
        }

        {
            let mut batch = self.start_batch();
            for id in targets {
                batch.remove_entity_type(id, source);
            }
            let entry = batch
                .model
                .ignored_types
                .entry(name.to_string())
                .or_insert(source);
            *entry = (*entry).max(source);
            batch.on_entity_type_ignored(name);
        }
        debug!(entity = name, %source, "entity type ignored");
        true
    }

    /// Remove an entity type together with everything that depends on it.
    pub fn remove_entity_type(
        &mut self,
        id: EntityTypeId,
        source: ConfigurationSource,
    ) -> Option<EntityType> {
        let entity_type = self.model.entity_type(id)?;
        if !source.overrides(Some(entity_type.configuration_source())) {
            return None;
        }
        let base_type = entity_type.base_type();
        let declared_properties = entity_type.properties.clone();
        let declared_keys = entity_type.keys.clone();

        let mut batch = self.start_batch();

        for derived in batch.model.derived_types(id) {
            batch
                .entity_builder(derived)
                .has_base_type(base_type, ConfigurationSource::Explicit);
        }
        for owned in batch.model.owned_entity_types(id) {
            batch.remove_entity_type(owned, ConfigurationSource::Explicit);
        }

        let foreign_keys: Vec<ForeignKeyId> = batch
            .model
            .foreign_keys
            .iter()
            .flatten()
            .filter(|f| {
                f.declaring_entity_type == id
                    || f.principal_entity_type == id
                    || declared_keys.contains(&f.principal_key)
                    || f.properties.iter().any(|p| declared_properties.contains(p))
            })
            .map(|f| f.id())
            .collect();
        for foreign_key in foreign_keys {
            batch.remove_foreign_key(foreign_key, ConfigurationSource::Explicit);
        }

        let entity_type = batch.model.entity_type(id)?.clone();
        for index in entity_type.indexes {
            batch.model.detach_index(index);
        }
        for key in entity_type.keys {
            batch.model.detach_key(key);
        }
        for property in entity_type.properties {
            batch.model.detach_property(property);
        }
        let removed = batch.model.detach_entity_type(id)?;
        debug!(entity = %removed.name(), "entity type removed");
        batch.on_entity_type_removed(removed.clone());
        Some(removed)
    }

    /// Set or remove a model annotation.
    pub fn has_annotation(
        &mut self,
        name: &str,
        value: Option<Value>,
        source: ConfigurationSource,
    ) -> bool {
        let previous = self.model.annotations.find(name).cloned();
        if self.model.annotations.set(name, value, source).is_none() {
            return false;
        }
        let changed = previous.as_ref().map(|a| &a.value) != self.model.annotations.get(name);
        if changed {
            return self.on_model_annotation_changed(name.to_string(), previous);
        }
        true
    }

    // ---- removal by id --------------------------------------------------

    /// Remove a property from its declaring entity type.
    pub fn remove_property(
        &mut self,
        id: PropertyId,
        source: ConfigurationSource,
    ) -> Option<Property> {
        let declaring = self.model.property(id)?.declaring_entity_type();
        self.entity_builder(declaring).remove_property(id, source)
    }

    /// Remove a key from its declaring entity type.
    pub fn remove_key(&mut self, id: KeyId, source: ConfigurationSource) -> Option<Key> {
        let declaring = self.model.key(id)?.declaring_entity_type();
        self.entity_builder(declaring).remove_key(id, source)
    }

    /// Remove an index from its declaring entity type.
    pub fn remove_index(&mut self, id: IndexId, source: ConfigurationSource) -> Option<Index> {
        let declaring = self.model.index(id)?.declaring_entity_type();
        self.entity_builder(declaring).remove_index(id, source)
    }

    /// Remove a foreign key and the convention shadow properties only it used.
    pub fn remove_foreign_key(
        &mut self,
        id: ForeignKeyId,
        source: ConfigurationSource,
    ) -> Option<ForeignKey> {
        let foreign_key = self.model.foreign_key(id)?;
        if !source.overrides(Some(foreign_key.configuration_source())) {
            return None;
        }
        let removed = self.model.detach_foreign_key(id)?;
        debug!(
            dependent = %self.model.entity_type_name(removed.declaring_entity_type()),
            principal = %self.model.entity_type_name(removed.principal_entity_type()),
            "foreign key removed"
        );
        let mut batch = self.start_batch();
        batch.on_foreign_key_removed(removed.clone());
        batch.remove_unused_shadow_properties(removed.properties());
        batch.remove_unused_convention_key(removed.principal_key());
        Some(removed)
    }

    /// Remove convention shadow properties that no key or foreign key uses anymore.
    pub(crate) fn remove_unused_shadow_properties(&mut self, properties: &[PropertyId]) {
        for property in properties {
            let Some(candidate) = self.model.property(*property) else {
                continue;
            };
            if !candidate.is_shadow()
                || candidate.configuration_source() != ConfigurationSource::Convention
            {
                continue;
            }
            let in_use = !self.model.foreign_keys_containing(*property).is_empty()
                || !self.model.keys_containing(*property).is_empty()
                || self
                    .model
                    .indexes_containing(*property)
                    .into_iter()
                    .filter_map(|i| self.model.index(i))
                    .any(|i| i.configuration_source() != ConfigurationSource::Convention);
            if !in_use {
                self.remove_property(*property, ConfigurationSource::Convention);
            }
        }
    }

    /// Remove a convention key that is neither primary nor referenced.
    ///
    /// Covers temporary principal keys and primary keys that were replaced.
    pub(crate) fn remove_unused_convention_key(&mut self, key: KeyId) {
        let Some(candidate) = self.model.key(key) else {
            return;
        };
        if candidate.configuration_source() != ConfigurationSource::Convention
            || !self.model.foreign_keys_referencing_key(key).is_empty()
            || self.model.primary_key_id(candidate.declaring_entity_type()) == Some(key)
        {
            return;
        }
        let properties = candidate.properties().to_vec();
        if self.remove_key(key, ConfigurationSource::Convention).is_some() {
            self.remove_unused_shadow_properties(&properties);
        }
    }

    // ---- finalization ---------------------------------------------------

    /// Run the model built conventions and the validator, then hand out the model.
    #[instrument(skip(self), fields(entity_types = self.model.entity_type_ids().len()))]
    pub fn finalize(mut self) -> Result<Model> {
        self.on_model_built()?;
        if self.config.validate_on_finalize {
            ModelValidator::new(&self.config).validate(&self.model)?;
        }
        info!(
            entity_types = self.model.entity_type_ids().len(),
            diagnostics = self.model.diagnostics().len(),
            "model finalized"
        );
        Ok(self.model)
    }
}

impl std::fmt::Debug for InternalModelBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InternalModelBuilder")
            .field("entity_types", &self.model.entity_type_ids().len())
            .field("dispatcher", &self.dispatcher)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{MemberAttribute, MemberShape, MemberType, ScalarType, TypeShape};
    use serde_json::json;

    fn registry() -> TypeRegistry {
        TypeRegistry::new()
            .with_shape(
                TypeShape::new("Blog")
                    .with_scalar("Id", ScalarType::Int32)
                    .with_scalar("Url", ScalarType::String),
            )
            .with_shape(TypeShape::new("Audit").not_mapped())
            .with_shape(
                TypeShape::new("Tag").with_member(
                    MemberShape::property("Label", MemberType::Scalar(ScalarType::String))
                        .with_attribute(MemberAttribute::NotMapped),
                ),
            )
    }

    #[test]
    fn test_entity_is_get_or_add() {
        let mut builder = InternalModelBuilder::new(registry(), ModelConfig::default());
        let first = builder.entity("Blog", ConfigurationSource::Convention).unwrap();
        let second = builder.entity("Blog", ConfigurationSource::Explicit).unwrap();
        assert_eq!(first, second);
        assert_eq!(
            builder.model().entity_type(first).unwrap().configuration_source(),
            ConfigurationSource::Explicit
        );
    }

    #[test]
    fn test_unregistered_name_is_shadow_entity_type() {
        let mut builder = InternalModelBuilder::new(registry(), ModelConfig::default());
        let id = builder.entity("Log", ConfigurationSource::Explicit).unwrap();
        assert!(builder.model().entity_type(id).unwrap().is_shadow());
    }

    #[test]
    fn test_ignore_precedence() {
        let mut builder = InternalModelBuilder::new(registry(), ModelConfig::default());
        builder.entity("Blog", ConfigurationSource::Explicit).unwrap();

        assert!(!builder.ignore("Blog", ConfigurationSource::DataAnnotation));
        assert!(builder.model().find_entity_type("Blog").is_some());

        assert!(builder.ignore("Blog", ConfigurationSource::Explicit));
        assert!(builder.model().find_entity_type("Blog").is_none());
        assert!(builder.entity("Blog", ConfigurationSource::Convention).is_none());
    }

    #[test]
    fn test_not_mapped_type_is_vetoed() {
        let mut builder = InternalModelBuilder::new(registry(), ModelConfig::default());
        assert!(builder.entity("Audit", ConfigurationSource::Convention).is_none());
        assert_eq!(
            builder.model().ignored_type_source("Audit"),
            Some(ConfigurationSource::DataAnnotation)
        );

        // An explicit request wins over the attribute.
        assert!(builder.entity("Audit", ConfigurationSource::Explicit).is_some());
    }

    #[test]
    fn test_not_mapped_member_is_ignored() {
        let mut builder = InternalModelBuilder::new(registry(), ModelConfig::default());
        let tag = builder.entity("Tag", ConfigurationSource::Explicit).unwrap();
        let entity_type = builder.model().entity_type(tag).unwrap();
        assert_eq!(
            entity_type.ignored_member_source("Label"),
            Some(ConfigurationSource::DataAnnotation)
        );
        assert!(builder.model().find_property(tag, "Label").is_none());
    }

    #[test]
    fn test_model_annotation_precedence() {
        let mut builder = InternalModelBuilder::new(registry(), ModelConfig::default());
        assert!(builder.has_annotation(
            "Scaffolding:DatabaseName",
            Some(json!("blogging")),
            ConfigurationSource::Explicit
        ));
        assert!(!builder.has_annotation(
            "Scaffolding:DatabaseName",
            Some(json!("other")),
            ConfigurationSource::Convention
        ));
        assert_eq!(
            builder.model().annotation("Scaffolding:DatabaseName"),
            Some(&json!("blogging"))
        );
    }

    #[test]
    fn test_remove_entity_type() {
        let mut builder = InternalModelBuilder::new(registry(), ModelConfig::default());
        let blog = builder.entity("Blog", ConfigurationSource::Convention).unwrap();
        let id = builder.model().find_property_id(blog, "Id").unwrap();

        let removed = builder
            .remove_entity_type(blog, ConfigurationSource::Convention)
            .unwrap();
        assert_eq!(removed.name(), "Blog");
        assert!(!builder.model().contains_property(id));
        assert!(builder.model().entity_types().is_empty());
    }
}
