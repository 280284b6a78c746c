//! Fluent configuration of one entity type.

use super::{
    resolve_properties, target_name, CollectionNavigationBuilder, IndexBuilder,
    OwnedNavigationBuilder, PropertyBuilder, ReferenceNavigationBuilder, EXPLICIT,
};
use crate::error::{ModelError, Result};
use crate::internal::InternalModelBuilder;
use crate::metadata::{ConfigurationSource, EntityType, EntityTypeId, PropertyType, ServiceKind};
use serde_json::Value;

/// Configures an entity type. Borrowed from a [`super::ModelBuilder`].
#[derive(Debug)]
pub struct EntityTypeBuilder<'a> {
    mb: &'a mut InternalModelBuilder,
    id: EntityTypeId,
}

impl<'a> EntityTypeBuilder<'a> {
    pub(crate) fn new(mb: &'a mut InternalModelBuilder, id: EntityTypeId) -> Self {
        Self { mb, id }
    }

    /// The entity type being configured.
    pub fn id(&self) -> EntityTypeId {
        self.id
    }

    /// Current metadata of the entity type.
    pub fn metadata(&self) -> Option<&EntityType> {
        self.mb.model().entity_type(self.id)
    }

    fn rejected(&self, operation: &str, member: Option<&str>) -> ModelError {
        ModelError::rejected(operation, target_name(self.mb, self.id, member))
    }

    /// Get or add the property backed by a member.
    pub fn property(&mut self, name: &str) -> Result<PropertyBuilder<'_>> {
        let added = self.mb.entity_builder(self.id).property(name, EXPLICIT);
        let id = match added {
            Some(id) => id,
            None => self
                .mb
                .model()
                .find_property_id(self.id, name)
                .ok_or_else(|| ModelError::PropertyNotFound {
                    entity: self.mb.model().entity_type_name(self.id),
                    property: name.to_string(),
                })?,
        };
        Ok(PropertyBuilder::new(self.mb, id))
    }

    /// Get or add a property with an explicit type, shadow unless a member backs it.
    pub fn shadow_property(
        &mut self,
        name: &str,
        property_type: PropertyType,
        nullable: bool,
    ) -> Result<PropertyBuilder<'_>> {
        let id = self
            .mb
            .entity_builder(self.id)
            .shadow_property(name, property_type, nullable, EXPLICIT)
            .ok_or_else(|| self.rejected("shadow_property", Some(name)))?;
        Ok(PropertyBuilder::new(self.mb, id))
    }

    /// Exclude a member from the entity type.
    pub fn ignore(&mut self, name: &str) -> Result<&mut Self> {
        if self.mb.entity_builder(self.id).ignore(name, EXPLICIT) {
            Ok(self)
        } else {
            Err(self.rejected("ignore", Some(name)))
        }
    }

    /// Set the primary key.
    pub fn has_key(&mut self, names: &[&str]) -> Result<&mut Self> {
        let properties = resolve_properties(self.mb, self.id, names)?;
        if self
            .mb
            .entity_builder(self.id)
            .has_primary_key(Some(properties), EXPLICIT)
        {
            Ok(self)
        } else {
            Err(self.rejected("has_key", None))
        }
    }

    /// Remove the primary key, leaving key discovery to choose again.
    pub fn has_no_key(&mut self) -> Result<&mut Self> {
        if self.mb.entity_builder(self.id).has_primary_key(None, EXPLICIT) {
            Ok(self)
        } else {
            Err(self.rejected("has_no_key", None))
        }
    }

    /// Add an alternate key.
    pub fn has_alternate_key(&mut self, names: &[&str]) -> Result<&mut Self> {
        let properties = resolve_properties(self.mb, self.id, names)?;
        let key = self.mb.entity_builder(self.id).has_key(properties, EXPLICIT);
        match key {
            Some(_) => Ok(self),
            None => Err(self.rejected("has_alternate_key", None)),
        }
    }

    /// Get or add an index.
    pub fn has_index(&mut self, names: &[&str]) -> Result<IndexBuilder<'_>> {
        let properties = resolve_properties(self.mb, self.id, names)?;
        let index = self
            .mb
            .entity_builder(self.id)
            .has_index(properties, EXPLICIT)
            .ok_or_else(|| self.rejected("has_index", None))?;
        Ok(IndexBuilder::new(self.mb, index))
    }

    /// Set the base type, or make this a root with `None`.
    pub fn has_base_type(&mut self, base: Option<&str>) -> Result<&mut Self> {
        let base_id = match base {
            Some(name) => Some(
                self.mb
                    .model()
                    .find_entity_type_id(name)
                    .ok_or_else(|| ModelError::EntityTypeNotFound {
                        name: name.to_string(),
                    })?,
            ),
            None => None,
        };
        if self.mb.entity_builder(self.id).has_base_type(base_id, EXPLICIT) {
            Ok(self)
        } else {
            Err(self.rejected("has_base_type", None))
        }
    }

    /// Map a member as an injected service.
    pub fn has_service_property(&mut self, name: &str, kind: ServiceKind) -> Result<&mut Self> {
        if self
            .mb
            .entity_builder(self.id)
            .has_service_property(name, kind, EXPLICIT)
        {
            Ok(self)
        } else {
            Err(self.rejected("has_service_property", Some(name)))
        }
    }

    /// Set an entity type annotation.
    pub fn has_annotation(&mut self, name: &str, value: Value) -> Result<&mut Self> {
        if self
            .mb
            .entity_builder(self.id)
            .has_annotation(name, Some(value), EXPLICIT)
        {
            Ok(self)
        } else {
            Err(self.rejected("has_annotation", Some(name)))
        }
    }

    /// Validate a navigation member and add its target entity type.
    fn navigation_target(&mut self, name: &str, collection: bool) -> Result<EntityTypeId> {
        let entity = self.mb.model().entity_type_name(self.id);
        let Some((target, is_collection)) = self.mb.navigation_member(self.id, name) else {
            return Err(ModelError::NavigationNotFound {
                entity,
                navigation: name.to_string(),
            });
        };
        let invalid = |reason: String| ModelError::InvalidNavigation {
            entity: entity.clone(),
            navigation: name.to_string(),
            reason,
        };
        if is_collection != collection {
            let kind = if collection { "collection" } else { "reference" };
            return Err(invalid(format!("not a {kind} navigation")));
        }
        if self.mb.registry().get(&target).is_some_and(|s| s.owned) {
            return Err(invalid(format!("{target} is an owned type")));
        }
        self.mb
            .entity(&target, EXPLICIT)
            .ok_or_else(|| invalid(format!("{target} is ignored")))
    }

    /// Start configuring the relationship of a reference navigation.
    pub fn has_one(&mut self, navigation: &str) -> Result<ReferenceNavigationBuilder<'_>> {
        let target = self.navigation_target(navigation, false)?;
        Ok(ReferenceNavigationBuilder::new(
            self.mb,
            self.id,
            navigation.to_string(),
            target,
        ))
    }

    /// Start configuring the relationship of a collection navigation.
    pub fn has_many(&mut self, navigation: &str) -> Result<CollectionNavigationBuilder<'_>> {
        let target = self.navigation_target(navigation, true)?;
        Ok(CollectionNavigationBuilder::new(
            self.mb,
            self.id,
            navigation.to_string(),
            target,
        ))
    }

    /// Map a reference navigation as an owned type.
    pub fn owns_one(&mut self, navigation: &str) -> Result<OwnedNavigationBuilder<'_>> {
        owns_one(self.mb, self.id, navigation)
    }
}

/// Shared by entity and owned navigation builders.
pub(super) fn owns_one<'b>(
    mb: &'b mut InternalModelBuilder,
    owner: EntityTypeId,
    navigation: &str,
) -> Result<OwnedNavigationBuilder<'b>> {
    let entity = mb.model().entity_type_name(owner);
    let Some((target, is_collection)) = mb.navigation_member(owner, navigation) else {
        return Err(ModelError::NavigationNotFound {
            entity,
            navigation: navigation.to_string(),
        });
    };
    if is_collection {
        return Err(ModelError::InvalidNavigation {
            entity,
            navigation: navigation.to_string(),
            reason: "owned collections are not supported".to_string(),
        });
    }

    // A regular entity type discovered for the same navigation gives way.
    let previous = mb
        .model()
        .find_navigation(owner, navigation)
        .filter(|n| mb.model().foreign_key(n.foreign_key).is_some_and(|f| !f.is_ownership()));
    if let Some(previous) = &previous {
        mb.remove_foreign_key(previous.foreign_key, EXPLICIT);
    }

    let foreign_key = mb
        .owns(owner, navigation, &target, EXPLICIT)
        .ok_or_else(|| ModelError::rejected("owns_one", format!("{entity}.{navigation}")))?;

    if let Some(previous) = previous {
        remove_if_unreferenced(mb, previous.target_entity_type);
    }
    Ok(OwnedNavigationBuilder::new(mb, foreign_key))
}

/// Drop a convention-added entity type that no relationship reaches anymore.
fn remove_if_unreferenced(mb: &mut InternalModelBuilder, id: EntityTypeId) {
    let model = mb.model();
    let Some(entity_type) = model.entity_type(id) else {
        return;
    };
    let unreferenced = entity_type.configuration_source() == ConfigurationSource::Convention
        && !entity_type.is_weak()
        && model
            .referencing_foreign_keys(id)
            .iter()
            .all(|f| f.declaring_entity_type() == id)
        && model.derived_types(id).is_empty();
    if unreferenced {
        mb.remove_entity_type(id, ConfigurationSource::Convention);
    }
}
