//! Builder for entity types and their members.

use super::InternalModelBuilder;
use crate::metadata::{
    ConfigurationSource, EntityType, EntityTypeId, ForeignKeyId, Index, IndexId, Key, KeyId,
    NavigationSide, Property, PropertyId, PropertyType, ServiceKind, ServiceProperty,
};
use serde_json::Value;
use std::collections::BTreeSet;
use tracing::debug;

/// Configures one entity type.
pub struct InternalEntityTypeBuilder<'a> {
    mb: &'a mut InternalModelBuilder,
    id: EntityTypeId,
}

impl<'a> InternalEntityTypeBuilder<'a> {
    pub(crate) fn new(mb: &'a mut InternalModelBuilder, id: EntityTypeId) -> Self {
        Self { mb, id }
    }

    /// The entity type being configured.
    pub fn id(&self) -> EntityTypeId {
        self.id
    }

    /// The entity type metadata, if it still exists.
    pub fn metadata(&self) -> Option<&EntityType> {
        self.mb.model.entity_type(self.id)
    }

    /// The model builder this builder belongs to.
    pub fn model_builder(&mut self) -> &mut InternalModelBuilder {
        self.mb
    }

    /// Resolve property names against the effective properties.
    pub fn properties_by_name(&self, names: &[&str]) -> Option<Vec<PropertyId>> {
        names
            .iter()
            .map(|name| self.mb.model.find_property_id(self.id, name))
            .collect()
    }

    // ---- ignored members ------------------------------------------------

    /// Whether a member is ignored at a source `source` cannot override.
    pub fn is_ignored(&self, name: &str, source: ConfigurationSource) -> bool {
        self.mb
            .model
            .hierarchy(self.id)
            .into_iter()
            .filter_map(|level| self.mb.model.entity_type(level))
            .filter_map(|e| e.ignored_member_source(name))
            .any(|ignored| source != ConfigurationSource::Explicit && ignored >= source)
    }

    fn unignore(&mut self, name: &str) {
        for level in self.mb.model.hierarchy(self.id) {
            if let Some(entity_type) = self.mb.model.entity_type_mut(level) {
                entity_type.ignored_members.remove(name);
            }
        }
    }

    /// Ignore a member, removing whatever is mapped to it.
    ///
    /// Members mapped on a base type cannot be ignored from a derived type.
    pub fn ignore(&mut self, name: &str, source: ConfigurationSource) -> bool {
        let model = &self.mb.model;
        let Some(entity_type) = model.entity_type(self.id) else {
            return false;
        };
        if let Some(existing) = entity_type.ignored_member_source(name) {
            if existing >= source {
                return true;
            }
        }

        let mut scopes = vec![self.id];
        scopes.extend(model.all_derived_types(self.id));

        let mut properties: Vec<PropertyId> = Vec::new();
        let mut navigations: Vec<(ForeignKeyId, NavigationSide)> = Vec::new();
        let mut services: Vec<EntityTypeId> = Vec::new();
        for scope in &scopes {
            if let Some(property) = model.find_property(*scope, name) {
                if !model.is_same_or_base_of(self.id, property.declaring_entity_type)
                    || !source.overrides(Some(property.source))
                {
                    return false;
                }
                if !properties.contains(&property.id) {
                    properties.push(property.id);
                }
            }
            if let Some(navigation) = model.find_navigation(*scope, name) {
                if !model.is_same_or_base_of(self.id, navigation.declaring_entity_type)
                    || !source.overrides(Some(navigation.source))
                {
                    return false;
                }
                let entry = (navigation.foreign_key, navigation.side);
                if !navigations.contains(&entry) {
                    navigations.push(entry);
                }
            }
            let declared_service = model
                .entity_type(*scope)
                .and_then(|e| e.service_properties.iter().find(|s| s.name == name));
            if let Some(service) = declared_service {
                if !source.overrides(Some(service.source)) {
                    return false;
                }
                services.push(*scope);
            }
        }
        if model
            .base_types(self.id)
            .into_iter()
            .filter_map(|b| model.entity_type(b))
            .any(|b| b.service_properties.iter().any(|s| s.name == name))
        {
            return false;
        }

        let id = self.id;
        let mut batch = self.mb.start_batch();
        for property in properties {
            batch.remove_property(property, source);
        }
        for (foreign_key, side) in navigations {
            batch
                .relationship_builder(foreign_key)
                .has_navigation(None, side, source);
        }
        for scope in services {
            if let Some(entity_type) = batch.model.entity_type_mut(scope) {
                entity_type.service_properties.retain(|s| s.name != name);
            }
        }
        if let Some(entity_type) = batch.model.entity_type_mut(id) {
            let entry = entity_type
                .ignored_members
                .entry(name.to_string())
                .or_insert(source);
            *entry = (*entry).max(source);
        }
        debug!(entity = %batch.model.entity_type_name(id), member = name, %source, "member ignored");
        batch.on_entity_type_member_ignored(id, name);
        true
    }

    // ---- inheritance ----------------------------------------------------

    /// Set or clear the base type.
    ///
    /// Members of this type and its derived types that collide with members
    /// of the new base are removed, as are keys declared here. The change is
    /// rejected when any of them was configured above `source`.
    pub fn has_base_type(
        &mut self,
        base_type: Option<EntityTypeId>,
        source: ConfigurationSource,
    ) -> bool {
        let model = &self.mb.model;
        let Some(entity_type) = model.entity_type(self.id) else {
            return false;
        };
        let previous = entity_type.base_type();
        if previous == base_type {
            if let Some(entity_type) = self.mb.model.entity_type_mut(self.id) {
                entity_type.base_type.set(base_type, source);
            }
            return true;
        }
        if !entity_type.base_type.can_set(&base_type, source) {
            return false;
        }

        let mut properties: Vec<PropertyId> = Vec::new();
        let mut navigations: Vec<(ForeignKeyId, NavigationSide)> = Vec::new();
        let mut services: Vec<(EntityTypeId, String)> = Vec::new();
        let mut keys: Vec<KeyId> = Vec::new();
        if let Some(base) = base_type {
            let Some(base_entity) = model.entity_type(base) else {
                return false;
            };
            if model.is_same_or_base_of(self.id, base)
                || base_entity.is_weak() != entity_type.is_weak()
            {
                return false;
            }

            let mut base_members: BTreeSet<String> = model
                .properties(base)
                .into_iter()
                .map(|p| p.name.clone())
                .collect();
            base_members.extend(model.navigations(base).into_iter().map(|n| n.name));
            base_members.extend(
                model
                    .service_properties(base)
                    .into_iter()
                    .map(|s| s.name.clone()),
            );

            let mut scopes = vec![self.id];
            scopes.extend(model.all_derived_types(self.id));
            for scope in scopes {
                let Some(scope_type) = model.entity_type(scope) else {
                    continue;
                };
                for property in scope_type
                    .properties
                    .iter()
                    .filter_map(|p| model.property(*p))
                    .filter(|p| base_members.contains(&p.name))
                {
                    if !source.overrides(Some(property.source)) {
                        return false;
                    }
                    properties.push(property.id);
                }
                for navigation in model
                    .declared_navigations(scope)
                    .into_iter()
                    .filter(|n| base_members.contains(&n.name))
                {
                    if !source.overrides(Some(navigation.source)) {
                        return false;
                    }
                    navigations.push((navigation.foreign_key, navigation.side));
                }
                for service in scope_type
                    .service_properties
                    .iter()
                    .filter(|s| base_members.contains(&s.name))
                {
                    if !source.overrides(Some(service.source)) {
                        return false;
                    }
                    services.push((scope, service.name.clone()));
                }
            }

            for key in entity_type.keys.iter().filter_map(|k| model.key(*k)) {
                if !source.overrides(Some(key.source)) {
                    return false;
                }
                keys.push(key.id);
            }
            if !source.overrides(entity_type.primary_key_configuration_source())
                && entity_type.declared_primary_key().is_some()
            {
                return false;
            }
        }

        let id = self.id;
        let mut batch = self.mb.start_batch();
        for (foreign_key, side) in navigations {
            batch
                .relationship_builder(foreign_key)
                .has_navigation(None, side, source);
        }
        for (scope, name) in services {
            if let Some(scope_type) = batch.model.entity_type_mut(scope) {
                scope_type.service_properties.retain(|s| s.name != name);
            }
        }
        for key in keys {
            batch.remove_key(key, source);
        }
        for property in properties {
            batch.remove_property(property, source);
        }
        if let Some(entity_type) = batch.model.entity_type_mut(id) {
            entity_type.base_type.set(base_type, source);
        }
        debug!(
            entity = %batch.model.entity_type_name(id),
            base = ?base_type.map(|b| batch.model.entity_type_name(b)),
            %source,
            "base type changed"
        );
        batch.on_base_type_changed(id, previous);
        true
    }

    // ---- properties -----------------------------------------------------

    /// Get or add the property backed by a member of the entity type's shape.
    pub fn property(&mut self, name: &str, source: ConfigurationSource) -> Option<PropertyId> {
        let member = self.mb.find_member(self.id, name)?;
        let (property_type, clr_nullable) = member.member_type.property_type()?;
        self.add_property(name, property_type, clr_nullable, false, source)
    }

    /// Get or add a property with an explicit type.
    ///
    /// When the shape has a member with that name the member backs the
    /// property and must have the same type. Otherwise a shadow property is
    /// created.
    pub fn shadow_property(
        &mut self,
        name: &str,
        property_type: PropertyType,
        nullable: bool,
        source: ConfigurationSource,
    ) -> Option<PropertyId> {
        if let Some(member) = self.mb.find_member(self.id, name) {
            let (member_type, clr_nullable) = member.member_type.property_type()?;
            if member_type != property_type {
                return None;
            }
            return self.add_property(name, member_type, clr_nullable, false, source);
        }
        self.add_property(name, property_type, nullable, true, source)
    }

    fn add_property(
        &mut self,
        name: &str,
        property_type: PropertyType,
        clr_nullable: bool,
        shadow: bool,
        source: ConfigurationSource,
    ) -> Option<PropertyId> {
        if self.is_ignored(name, source) {
            return None;
        }

        if let Some(existing) = self.mb.model.find_property(self.id, name) {
            let existing_id = existing.id;
            if existing.property_type == property_type {
                if let Some(property) = self.mb.model.property_mut(existing_id) {
                    property.source = property.source.max_with(Some(source));
                }
                self.unignore(name);
                return Some(existing_id);
            }
            if !source.overrides(Some(existing.source)) {
                return None;
            }
            self.mb.remove_property(existing_id, source)?;
        }

        let model = &self.mb.model;
        let navigation = model.find_navigation(self.id, name);
        if let Some(navigation) = &navigation {
            if !source.overrides(Some(navigation.source)) {
                return None;
            }
        }
        let service = model.find_service_property(self.id, name);
        if let Some(service) = service {
            if !source.overrides(Some(service.source)) {
                return None;
            }
        }
        let service = service.is_some();

        let mut derived_properties: Vec<PropertyId> = Vec::new();
        for derived in model.all_derived_types(self.id) {
            if let Some(property) = model
                .find_declared_property_id(derived, name)
                .and_then(|p| model.property(p))
            {
                if !source.overrides(Some(property.source)) {
                    return None;
                }
                derived_properties.push(property.id);
            }
        }

        let id = self.id;
        let property = {
            let mut batch = self.mb.start_batch();
            if let Some(navigation) = navigation {
                batch
                    .relationship_builder(navigation.foreign_key)
                    .has_navigation(None, navigation.side, source);
            }
            if service {
                batch.entity_builder(id).remove_service_property(name, source);
            }
            for derived in derived_properties {
                batch.remove_property(derived, source);
            }
            batch.entity_builder(id).unignore(name);
            let property = batch.model.add_property(
                id,
                name.to_string(),
                property_type,
                clr_nullable,
                shadow,
                source,
            )?;
            batch.on_property_added(property);
            property
        };
        self.mb.model.contains_property(property).then_some(property)
    }

    /// Remove a property and everything built on it.
    ///
    /// Keys and indexes containing the property are removed. A foreign key
    /// whose properties were discovered by convention falls back to shadow
    /// properties; any other foreign key containing it is removed.
    pub fn remove_property(
        &mut self,
        id: PropertyId,
        source: ConfigurationSource,
    ) -> Option<Property> {
        let property = self.mb.model.property(id)?;
        if !source.overrides(Some(property.source)) {
            return None;
        }
        let shadow = property.shadow;

        let mut batch = self.mb.start_batch();
        for foreign_key in batch.model.foreign_keys_containing(id) {
            let reset = !shadow
                && batch
                    .model
                    .foreign_key(foreign_key)
                    .is_some_and(|f| f.properties_source == Some(ConfigurationSource::Convention));
            let kept = reset
                && batch
                    .relationship_builder(foreign_key)
                    .reset_to_shadow_properties()
                    .is_some();
            if !kept && batch.model.contains_foreign_key(foreign_key) {
                batch.remove_foreign_key(foreign_key, ConfigurationSource::Explicit);
            }
        }
        for key in batch.model.keys_containing(id) {
            batch.remove_key(key, ConfigurationSource::Explicit);
        }
        for index in batch.model.indexes_containing(id) {
            batch.remove_index(index, ConfigurationSource::Explicit);
        }
        let removed = batch.model.detach_property(id)?;
        debug!(
            entity = %batch.model.entity_type_name(removed.declaring_entity_type),
            property = %removed.name,
            "property removed"
        );
        batch.on_property_removed(removed.clone());
        Some(removed)
    }

    // ---- keys -----------------------------------------------------------

    /// Set or clear the primary key.
    ///
    /// Only root entity types declare keys. The key properties become
    /// required.
    pub fn has_primary_key(
        &mut self,
        properties: Option<Vec<PropertyId>>,
        source: ConfigurationSource,
    ) -> bool {
        let model = &self.mb.model;
        let Some(entity_type) = model.entity_type(self.id) else {
            return false;
        };
        if properties.is_some() && entity_type.base_type().is_some() {
            return false;
        }
        let current = entity_type.declared_primary_key();
        let current_properties = current
            .and_then(|k| model.key(k))
            .map(|k| k.properties.clone());

        if current_properties == properties {
            if let Some(entity_type) = self.mb.model.entity_type_mut(self.id) {
                entity_type.primary_key.set(current, source);
            }
            if let Some(key) = current.and_then(|k| self.mb.model.key_mut(k)) {
                key.source = key.source.max_with(Some(source));
            }
            return true;
        }
        if !source.overrides(entity_type.primary_key_configuration_source()) {
            return false;
        }

        let new_key = match properties {
            Some(properties) => match self.has_key(properties, source) {
                Some(key) => Some(key),
                None => return false,
            },
            None => None,
        };

        let id = self.id;
        {
            let mut batch = self.mb.start_batch();
            if let Some(entity_type) = batch.model.entity_type_mut(id) {
                entity_type.primary_key.set(new_key, source);
            }
            debug!(
                entity = %batch.model.entity_type_name(id),
                key = %new_key
                    .and_then(|k| batch.model.key(k))
                    .map(|k| batch.model.display_properties(&k.properties))
                    .unwrap_or_default(),
                %source,
                "primary key changed"
            );
            batch.on_primary_key_changed(id, current_properties.unwrap_or_default());
        }
        if let Some(previous) = current {
            self.mb.remove_unused_convention_key(previous);
        }
        true
    }

    /// Get or add an alternate key over the given properties.
    pub fn has_key(
        &mut self,
        properties: Vec<PropertyId>,
        source: ConfigurationSource,
    ) -> Option<KeyId> {
        let model = &self.mb.model;
        let entity_type = model.entity_type(self.id)?;
        if properties.is_empty() || entity_type.base_type().is_some() {
            return None;
        }
        let effective = model.property_ids(self.id);
        let distinct: BTreeSet<&PropertyId> = properties.iter().collect();
        if distinct.len() != properties.len() || !properties.iter().all(|p| effective.contains(p)) {
            return None;
        }

        if let Some(existing) = model.find_key_id(self.id, &properties) {
            if let Some(key) = self.mb.model.key_mut(existing) {
                key.source = key.source.max_with(Some(source));
            }
            return Some(existing);
        }

        for property in &properties {
            self.mb.property_builder(*property).is_required(true, source);
        }
        let key = self.mb.model.add_key(self.id, properties, source)?;
        self.mb.on_key_added(key)
    }

    /// Remove a key, the foreign keys referencing it and, if it was primary,
    /// the primary key designation.
    pub fn remove_key(&mut self, key: KeyId, source: ConfigurationSource) -> Option<Key> {
        let existing = self.mb.model.key(key)?;
        if !source.overrides(Some(existing.source)) {
            return None;
        }
        let declaring = existing.declaring_entity_type;
        let properties = existing.properties.clone();

        let mut batch = self.mb.start_batch();
        let is_primary = batch
            .model
            .entity_type(declaring)
            .is_some_and(|e| e.declared_primary_key() == Some(key));
        if is_primary {
            if let Some(entity_type) = batch.model.entity_type_mut(declaring) {
                entity_type.primary_key.reset(None);
            }
            batch.on_primary_key_changed(declaring, properties);
        }
        for foreign_key in batch.model.foreign_keys_referencing_key(key) {
            batch.remove_foreign_key(foreign_key, ConfigurationSource::Explicit);
        }
        let removed = batch.model.detach_key(key)?;
        batch.on_key_removed(removed.clone());
        Some(removed)
    }

    // ---- indexes --------------------------------------------------------

    /// Get or add an index over the given properties.
    pub fn has_index(
        &mut self,
        properties: Vec<PropertyId>,
        source: ConfigurationSource,
    ) -> Option<IndexId> {
        let model = &self.mb.model;
        if properties.is_empty() || model.entity_type(self.id).is_none() {
            return None;
        }
        let effective = model.property_ids(self.id);
        if !properties.iter().all(|p| effective.contains(p)) {
            return None;
        }
        if let Some(existing) = model.find_index_id(self.id, &properties) {
            if let Some(index) = self.mb.model.index_mut(existing) {
                index.source = index.source.max_with(Some(source));
            }
            return Some(existing);
        }
        let index = self.mb.model.add_index(self.id, properties, source)?;
        self.mb.on_index_added(index)
    }

    /// Remove an index.
    pub fn remove_index(&mut self, index: IndexId, source: ConfigurationSource) -> Option<Index> {
        let existing = self.mb.model.index(index)?;
        if !source.overrides(Some(existing.source)) {
            return None;
        }
        let removed = self.mb.model.detach_index(index)?;
        self.mb.on_index_removed(removed.clone());
        Some(removed)
    }

    // ---- service properties ---------------------------------------------

    /// Get or add a service property.
    pub fn has_service_property(
        &mut self,
        name: &str,
        kind: ServiceKind,
        source: ConfigurationSource,
    ) -> bool {
        if self.is_ignored(name, source) {
            return false;
        }
        let model = &self.mb.model;
        let Some(entity_type) = model.entity_type(self.id) else {
            return false;
        };
        if let Some(existing) = entity_type.service_properties.iter().find(|s| s.name == name) {
            if existing.kind != kind && !source.overrides(Some(existing.source)) {
                return false;
            }
            if let Some(existing) = self
                .mb
                .model
                .entity_type_mut(self.id)
                .and_then(|e| e.service_properties.iter_mut().find(|s| s.name == name))
            {
                existing.kind = kind;
                existing.source = existing.source.max_with(Some(source));
            }
            return true;
        }
        if model.find_service_property(self.id, name).is_some() {
            return false;
        }

        let property = model.find_property(self.id, name).map(|p| (p.id, p.source));
        if let Some((_, existing)) = property {
            if !source.overrides(Some(existing)) {
                return false;
            }
        }
        let navigation = model.find_navigation(self.id, name);
        if let Some(navigation) = &navigation {
            if !source.overrides(Some(navigation.source)) {
                return false;
            }
        }

        let id = self.id;
        let mut batch = self.mb.start_batch();
        if let Some((property, _)) = property {
            batch.remove_property(property, source);
        }
        if let Some(navigation) = navigation {
            batch
                .relationship_builder(navigation.foreign_key)
                .has_navigation(None, navigation.side, source);
        }
        batch.entity_builder(id).unignore(name);
        match batch.model.entity_type_mut(id) {
            Some(entity_type) => {
                entity_type
                    .service_properties
                    .push(ServiceProperty::new(name.to_string(), kind, source));
                true
            }
            None => false,
        }
    }

    /// Remove a service property declared on this entity type.
    pub fn remove_service_property(&mut self, name: &str, source: ConfigurationSource) -> bool {
        let Some(entity_type) = self.mb.model.entity_type_mut(self.id) else {
            return false;
        };
        let Some(position) = entity_type
            .service_properties
            .iter()
            .position(|s| s.name == name)
        else {
            return false;
        };
        if !source.overrides(Some(entity_type.service_properties[position].source)) {
            return false;
        }
        entity_type.service_properties.remove(position);
        true
    }

    // ---- annotations ----------------------------------------------------

    /// Set or remove an entity type annotation.
    pub fn has_annotation(
        &mut self,
        name: &str,
        value: Option<Value>,
        source: ConfigurationSource,
    ) -> bool {
        self.mb
            .model
            .entity_type_mut(self.id)
            .and_then(|e| e.annotations.set(name, value, source))
            .is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModelConfig;
    use crate::conventions::ConventionSet;
    use crate::metadata::{ScalarType, TypeRegistry, TypeShape};

    fn bare_builder() -> InternalModelBuilder {
        let registry = TypeRegistry::new()
            .with_shape(
                TypeShape::new("Animal")
                    .with_scalar("Id", ScalarType::Int32)
                    .with_scalar("Name", ScalarType::String),
            )
            .with_shape(
                TypeShape::new("Dog")
                    .with_base("Animal")
                    .with_scalar("Name", ScalarType::String)
                    .with_scalar("Breed", ScalarType::String),
            );
        InternalModelBuilder::with_conventions(
            registry,
            ModelConfig::default(),
            ConventionSet::empty(),
        )
    }

    #[test]
    fn test_property_is_get_or_add() {
        let mut builder = bare_builder();
        let animal = builder.entity("Animal", ConfigurationSource::Explicit).unwrap();
        let mut entity = builder.entity_builder(animal);
        let first = entity.property("Name", ConfigurationSource::Convention).unwrap();
        let second = entity.property("Name", ConfigurationSource::Explicit).unwrap();
        assert_eq!(first, second);
        assert_eq!(
            builder.model().property(first).unwrap().configuration_source(),
            ConfigurationSource::Explicit
        );
    }

    #[test]
    fn test_unknown_member_is_not_a_property() {
        let mut builder = bare_builder();
        let animal = builder.entity("Animal", ConfigurationSource::Explicit).unwrap();
        assert!(builder
            .entity_builder(animal)
            .property("Missing", ConfigurationSource::Explicit)
            .is_none());
    }

    #[test]
    fn test_ignored_member_blocks_weaker_sources() {
        let mut builder = bare_builder();
        let animal = builder.entity("Animal", ConfigurationSource::Explicit).unwrap();
        let mut entity = builder.entity_builder(animal);
        assert!(entity.ignore("Name", ConfigurationSource::DataAnnotation));
        assert!(entity.property("Name", ConfigurationSource::Convention).is_none());
        assert!(entity.property("Name", ConfigurationSource::DataAnnotation).is_none());
        assert!(entity.property("Name", ConfigurationSource::Explicit).is_some());
        assert!(!entity.is_ignored("Name", ConfigurationSource::Convention));
    }

    #[test]
    fn test_base_type_removes_duplicate_members() {
        let mut builder = bare_builder();
        let dog = builder.entity("Dog", ConfigurationSource::Explicit).unwrap();
        let dog_name = builder
            .entity_builder(dog)
            .property("Name", ConfigurationSource::Convention)
            .unwrap();
        let animal = builder.entity("Animal", ConfigurationSource::Explicit).unwrap();
        let animal_name = builder
            .entity_builder(animal)
            .property("Name", ConfigurationSource::Convention)
            .unwrap();

        assert!(builder
            .entity_builder(dog)
            .has_base_type(Some(animal), ConfigurationSource::Explicit));
        assert!(!builder.model().contains_property(dog_name));
        assert_eq!(builder.model().find_property_id(dog, "Name"), Some(animal_name));
    }

    #[test]
    fn test_base_type_rejects_cycles_and_stronger_members() {
        let mut builder = bare_builder();
        let dog = builder.entity("Dog", ConfigurationSource::Explicit).unwrap();
        let animal = builder.entity("Animal", ConfigurationSource::Explicit).unwrap();
        builder
            .entity_builder(dog)
            .property("Name", ConfigurationSource::Explicit)
            .unwrap();
        builder
            .entity_builder(animal)
            .property("Name", ConfigurationSource::Convention)
            .unwrap();

        assert!(!builder
            .entity_builder(dog)
            .has_base_type(Some(animal), ConfigurationSource::Convention));
        assert!(builder
            .entity_builder(dog)
            .has_base_type(Some(animal), ConfigurationSource::Explicit));
        assert!(!builder
            .entity_builder(animal)
            .has_base_type(Some(dog), ConfigurationSource::Explicit));
    }

    #[test]
    fn test_primary_key_forces_required_and_root_only() {
        let mut builder = bare_builder();
        let animal = builder.entity("Animal", ConfigurationSource::Explicit).unwrap();
        let dog = builder.entity("Dog", ConfigurationSource::Explicit).unwrap();
        builder
            .entity_builder(dog)
            .has_base_type(Some(animal), ConfigurationSource::Explicit);
        let name = builder
            .entity_builder(animal)
            .shadow_property(
                "Code",
                PropertyType::scalar(ScalarType::String),
                true,
                ConfigurationSource::Explicit,
            )
            .unwrap();

        assert!(!builder
            .entity_builder(dog)
            .has_primary_key(Some(vec![name]), ConfigurationSource::Explicit));
        assert!(builder
            .entity_builder(animal)
            .has_primary_key(Some(vec![name]), ConfigurationSource::Explicit));
        assert!(!builder.model().property(name).unwrap().is_nullable());
        assert!(builder.model().find_primary_key(dog).is_some());
    }

    #[test]
    fn test_remove_property_cascades_to_keys_and_indexes() {
        let mut builder = bare_builder();
        let animal = builder.entity("Animal", ConfigurationSource::Explicit).unwrap();
        let mut entity = builder.entity_builder(animal);
        let id = entity.property("Id", ConfigurationSource::Explicit).unwrap();
        let name = entity.property("Name", ConfigurationSource::Explicit).unwrap();
        assert!(entity.has_primary_key(Some(vec![id]), ConfigurationSource::Explicit));
        let index = entity
            .has_index(vec![name], ConfigurationSource::Explicit)
            .unwrap();

        entity.remove_property(id, ConfigurationSource::Explicit).unwrap();
        entity.remove_property(name, ConfigurationSource::Explicit).unwrap();
        assert!(builder.model().find_primary_key(animal).is_none());
        assert!(!builder.model().contains_index(index));
    }

    #[test]
    fn test_service_property_replaces_convention_property() {
        let mut builder = bare_builder();
        let animal = builder.entity("Animal", ConfigurationSource::Explicit).unwrap();
        let mut entity = builder.entity_builder(animal);
        let name = entity.property("Name", ConfigurationSource::Convention).unwrap();
        assert!(entity.has_service_property(
            "Name",
            ServiceKind::Context,
            ConfigurationSource::Explicit
        ));
        assert!(!builder.model().contains_property(name));
        assert!(builder.model().find_service_property(animal, "Name").is_some());
    }
}
