//! The model arena and its read-only query surface.

use super::annotations::Annotations;
use super::entity_type::{DefiningNavigation, EntityType};
use super::foreign_key::{ForeignKey, NavigationRef, NavigationSide};
use super::ids::{EntityTypeId, ForeignKeyId, IndexId, KeyId, PropertyId};
use super::index::Index;
use super::key::Key;
use super::property::Property;
use super::service_property::ServiceProperty;
use super::source::ConfigurationSource;
use super::types::PropertyType;
use crate::diagnostics::DiagnosticsLogger;
use serde_json::Value;
use std::collections::BTreeMap;

/// The metadata graph.
///
/// All elements live in per-kind arenas and reference each other by id.
/// Mutation goes through the internal builders; this type only exposes the
/// read surface used by conventions and by out-of-core consumers.
#[derive(Debug, Clone, Default)]
pub struct Model {
    pub(crate) entity_types: Vec<Option<EntityType>>,
    pub(crate) properties: Vec<Option<Property>>,
    pub(crate) keys: Vec<Option<Key>>,
    pub(crate) indexes: Vec<Option<Index>>,
    pub(crate) foreign_keys: Vec<Option<ForeignKey>>,
    pub(crate) names: BTreeMap<String, EntityTypeId>,
    pub(crate) ignored_types: BTreeMap<String, ConfigurationSource>,
    pub(crate) annotations: Annotations,
    pub(crate) diagnostics: DiagnosticsLogger,
}

impl Model {
    /// Create an empty model.
    pub fn new() -> Self {
        Self::default()
    }

    // ---- element lookup -------------------------------------------------

    /// Get a live entity type.
    pub fn entity_type(&self, id: EntityTypeId) -> Option<&EntityType> {
        self.entity_types.get(id.0).and_then(|e| e.as_ref())
    }

    /// Get a live property.
    pub fn property(&self, id: PropertyId) -> Option<&Property> {
        self.properties.get(id.0).and_then(|p| p.as_ref())
    }

    /// Get a live key.
    pub fn key(&self, id: KeyId) -> Option<&Key> {
        self.keys.get(id.0).and_then(|k| k.as_ref())
    }

    /// Get a live index.
    pub fn index(&self, id: IndexId) -> Option<&Index> {
        self.indexes.get(id.0).and_then(|i| i.as_ref())
    }

    /// Get a live foreign key.
    pub fn foreign_key(&self, id: ForeignKeyId) -> Option<&ForeignKey> {
        self.foreign_keys.get(id.0).and_then(|f| f.as_ref())
    }

    pub(crate) fn entity_type_mut(&mut self, id: EntityTypeId) -> Option<&mut EntityType> {
        self.entity_types.get_mut(id.0).and_then(|e| e.as_mut())
    }

    pub(crate) fn property_mut(&mut self, id: PropertyId) -> Option<&mut Property> {
        self.properties.get_mut(id.0).and_then(|p| p.as_mut())
    }

    pub(crate) fn key_mut(&mut self, id: KeyId) -> Option<&mut Key> {
        self.keys.get_mut(id.0).and_then(|k| k.as_mut())
    }

    pub(crate) fn index_mut(&mut self, id: IndexId) -> Option<&mut Index> {
        self.indexes.get_mut(id.0).and_then(|i| i.as_mut())
    }

    pub(crate) fn foreign_key_mut(&mut self, id: ForeignKeyId) -> Option<&mut ForeignKey> {
        self.foreign_keys.get_mut(id.0).and_then(|f| f.as_mut())
    }

    /// Whether the entity type is still part of the model.
    pub fn contains_entity_type(&self, id: EntityTypeId) -> bool {
        self.entity_type(id).is_some()
    }

    /// Whether the property is still part of the model.
    pub fn contains_property(&self, id: PropertyId) -> bool {
        self.property(id).is_some()
    }

    /// Whether the key is still part of the model.
    pub fn contains_key(&self, id: KeyId) -> bool {
        self.key(id).is_some()
    }

    /// Whether the index is still part of the model.
    pub fn contains_index(&self, id: IndexId) -> bool {
        self.index(id).is_some()
    }

    /// Whether the foreign key is still part of the model.
    pub fn contains_foreign_key(&self, id: ForeignKeyId) -> bool {
        self.foreign_key(id).is_some()
    }

    // ---- entity types ---------------------------------------------------

    /// Live entity type ids in creation order.
    pub fn entity_type_ids(&self) -> Vec<EntityTypeId> {
        self.entity_types
            .iter()
            .flatten()
            .map(|e| e.id)
            .collect()
    }

    /// Live entity types ordered by display name.
    pub fn entity_types(&self) -> Vec<&EntityType> {
        self.names
            .values()
            .filter_map(|id| self.entity_type(*id))
            .collect()
    }

    /// Find a non-weak entity type by name.
    pub fn find_entity_type(&self, name: &str) -> Option<&EntityType> {
        self.names
            .get(name)
            .and_then(|id| self.entity_type(*id))
            .filter(|e| !e.is_weak())
    }

    /// Find the id of a non-weak entity type by name.
    pub fn find_entity_type_id(&self, name: &str) -> Option<EntityTypeId> {
        self.find_entity_type(name).map(|e| e.id)
    }

    /// Find a weak entity type by its type, owner and defining navigation.
    pub fn find_weak_entity_type(
        &self,
        clr_type: &str,
        owner: EntityTypeId,
        navigation: &str,
    ) -> Option<&EntityType> {
        self.entity_types.iter().flatten().find(|e| {
            e.clr_type.as_deref() == Some(clr_type)
                && e.defining.as_ref().is_some_and(|d| {
                    d.entity_type == owner && d.navigation == navigation
                })
        })
    }

    /// Weak entity types defined by navigations on `owner`.
    pub fn owned_entity_types(&self, owner: EntityTypeId) -> Vec<EntityTypeId> {
        self.entity_types
            .iter()
            .flatten()
            .filter(|e| e.defining.as_ref().is_some_and(|d| d.entity_type == owner))
            .map(|e| e.id)
            .collect()
    }

    /// Whether a type name is ignored at any source.
    pub fn ignored_type_source(&self, name: &str) -> Option<ConfigurationSource> {
        self.ignored_types.get(name).copied()
    }

    /// Display name of an entity type, or an empty string if removed.
    pub fn entity_type_name(&self, id: EntityTypeId) -> String {
        self.entity_type(id)
            .map(|e| e.name.clone())
            .unwrap_or_default()
    }

    // ---- hierarchy ------------------------------------------------------

    /// Ancestors of an entity type, nearest first.
    pub fn base_types(&self, id: EntityTypeId) -> Vec<EntityTypeId> {
        let mut result = Vec::new();
        let mut current = self.entity_type(id).and_then(|e| e.base_type());
        while let Some(base) = current {
            if base == id || result.contains(&base) {
                break;
            }
            result.push(base);
            current = self.entity_type(base).and_then(|e| e.base_type());
        }
        result
    }

    /// The entity type at the top of the hierarchy.
    pub fn root_type(&self, id: EntityTypeId) -> EntityTypeId {
        self.base_types(id).last().copied().unwrap_or(id)
    }

    /// The entity type and its ancestors, root first.
    pub fn hierarchy(&self, id: EntityTypeId) -> Vec<EntityTypeId> {
        let mut levels = self.base_types(id);
        levels.reverse();
        levels.push(id);
        levels
    }

    /// Whether `ancestor` is `id` or one of its base types.
    pub fn is_same_or_base_of(&self, ancestor: EntityTypeId, id: EntityTypeId) -> bool {
        ancestor == id || self.base_types(id).contains(&ancestor)
    }

    /// Whether the two entity types share a hierarchy line.
    pub fn in_same_line(&self, a: EntityTypeId, b: EntityTypeId) -> bool {
        self.is_same_or_base_of(a, b) || self.is_same_or_base_of(b, a)
    }

    /// Direct derived types.
    pub fn derived_types(&self, id: EntityTypeId) -> Vec<EntityTypeId> {
        self.entity_types
            .iter()
            .flatten()
            .filter(|e| e.base_type() == Some(id))
            .map(|e| e.id)
            .collect()
    }

    /// All derived types, breadth first.
    pub fn all_derived_types(&self, id: EntityTypeId) -> Vec<EntityTypeId> {
        let mut result = Vec::new();
        let mut pending = self.derived_types(id);
        while let Some(next) = pending.pop() {
            if next == id || result.contains(&next) {
                continue;
            }
            result.push(next);
            pending.extend(self.derived_types(next));
        }
        result
    }

    // ---- properties -----------------------------------------------------

    /// Effective property ids: inherited first, then declared.
    pub fn property_ids(&self, id: EntityTypeId) -> Vec<PropertyId> {
        self.hierarchy(id)
            .into_iter()
            .filter_map(|level| self.entity_type(level))
            .flat_map(|e| e.properties.iter().copied())
            .collect()
    }

    /// Effective properties.
    pub fn properties(&self, id: EntityTypeId) -> Vec<&Property> {
        self.property_ids(id)
            .into_iter()
            .filter_map(|p| self.property(p))
            .collect()
    }

    /// Find an effective property by name.
    pub fn find_property_id(&self, id: EntityTypeId, name: &str) -> Option<PropertyId> {
        self.property_ids(id)
            .into_iter()
            .find(|p| self.property(*p).is_some_and(|p| p.name == name))
    }

    /// Find an effective property by name.
    pub fn find_property(&self, id: EntityTypeId, name: &str) -> Option<&Property> {
        self.find_property_id(id, name)
            .and_then(|p| self.property(p))
    }

    /// Find a declared property by name.
    pub fn find_declared_property_id(&self, id: EntityTypeId, name: &str) -> Option<PropertyId> {
        self.entity_type(id)?
            .properties
            .iter()
            .copied()
            .find(|p| self.property(*p).is_some_and(|p| p.name == name))
    }

    /// Names of the given properties.
    pub fn property_names(&self, properties: &[PropertyId]) -> Vec<String> {
        properties
            .iter()
            .filter_map(|p| self.property(*p))
            .map(|p| p.name.clone())
            .collect()
    }

    /// Types of the given properties.
    pub fn property_types(&self, properties: &[PropertyId]) -> Vec<PropertyType> {
        properties
            .iter()
            .filter_map(|p| self.property(*p))
            .map(|p| p.property_type.clone())
            .collect()
    }

    /// Comma separated property names.
    pub fn display_properties(&self, properties: &[PropertyId]) -> String {
        self.property_names(properties).join(", ")
    }

    // ---- keys -----------------------------------------------------------

    /// Effective key ids.
    pub fn key_ids(&self, id: EntityTypeId) -> Vec<KeyId> {
        self.hierarchy(id)
            .into_iter()
            .filter_map(|level| self.entity_type(level))
            .flat_map(|e| e.keys.iter().copied())
            .collect()
    }

    /// Effective keys.
    pub fn keys(&self, id: EntityTypeId) -> Vec<&Key> {
        self.key_ids(id)
            .into_iter()
            .filter_map(|k| self.key(k))
            .collect()
    }

    /// The primary key of the hierarchy.
    pub fn primary_key_id(&self, id: EntityTypeId) -> Option<KeyId> {
        self.hierarchy(id)
            .into_iter()
            .find_map(|level| self.entity_type(level).and_then(|e| e.primary_key.value()))
    }

    /// The primary key of the hierarchy.
    pub fn find_primary_key(&self, id: EntityTypeId) -> Option<&Key> {
        self.primary_key_id(id).and_then(|k| self.key(k))
    }

    /// Find an effective key over exactly these properties.
    pub fn find_key_id(&self, id: EntityTypeId, properties: &[PropertyId]) -> Option<KeyId> {
        self.key_ids(id)
            .into_iter()
            .find(|k| self.key(*k).is_some_and(|k| k.properties == properties))
    }

    /// Keys containing the property.
    pub fn keys_containing(&self, property: PropertyId) -> Vec<KeyId> {
        self.keys
            .iter()
            .flatten()
            .filter(|k| k.properties.contains(&property))
            .map(|k| k.id)
            .collect()
    }

    /// Whether the property is part of the primary key of its hierarchy.
    pub fn is_primary_key_property(&self, property: PropertyId) -> bool {
        self.property(property)
            .and_then(|p| self.primary_key_id(p.declaring_entity_type))
            .and_then(|k| self.key(k))
            .is_some_and(|k| k.properties.contains(&property))
    }

    // ---- indexes --------------------------------------------------------

    /// Effective index ids.
    pub fn index_ids(&self, id: EntityTypeId) -> Vec<IndexId> {
        self.hierarchy(id)
            .into_iter()
            .filter_map(|level| self.entity_type(level))
            .flat_map(|e| e.indexes.iter().copied())
            .collect()
    }

    /// Effective indexes.
    pub fn indexes(&self, id: EntityTypeId) -> Vec<&Index> {
        self.index_ids(id)
            .into_iter()
            .filter_map(|i| self.index(i))
            .collect()
    }

    /// Find an effective index over exactly these properties.
    pub fn find_index_id(&self, id: EntityTypeId, properties: &[PropertyId]) -> Option<IndexId> {
        self.index_ids(id)
            .into_iter()
            .find(|i| self.index(*i).is_some_and(|i| i.properties == properties))
    }

    /// Indexes containing the property.
    pub fn indexes_containing(&self, property: PropertyId) -> Vec<IndexId> {
        self.indexes
            .iter()
            .flatten()
            .filter(|i| i.properties.contains(&property))
            .map(|i| i.id)
            .collect()
    }

    // ---- foreign keys ---------------------------------------------------

    /// Effective (declared and inherited) foreign key ids.
    pub fn foreign_key_ids(&self, id: EntityTypeId) -> Vec<ForeignKeyId> {
        self.hierarchy(id)
            .into_iter()
            .filter_map(|level| self.entity_type(level))
            .flat_map(|e| e.foreign_keys.iter().copied())
            .collect()
    }

    /// Effective foreign keys.
    pub fn foreign_keys(&self, id: EntityTypeId) -> Vec<&ForeignKey> {
        self.foreign_key_ids(id)
            .into_iter()
            .filter_map(|f| self.foreign_key(f))
            .collect()
    }

    /// All live foreign key ids in creation order.
    pub fn all_foreign_key_ids(&self) -> Vec<ForeignKeyId> {
        self.foreign_keys.iter().flatten().map(|f| f.id).collect()
    }

    /// Foreign keys whose principal is the entity type or one of its ancestors.
    pub fn referencing_foreign_key_ids(&self, id: EntityTypeId) -> Vec<ForeignKeyId> {
        let levels = self.hierarchy(id);
        self.foreign_keys
            .iter()
            .flatten()
            .filter(|f| levels.contains(&f.principal_entity_type))
            .map(|f| f.id)
            .collect()
    }

    /// Foreign keys referencing the entity type or its ancestors.
    pub fn referencing_foreign_keys(&self, id: EntityTypeId) -> Vec<&ForeignKey> {
        self.referencing_foreign_key_ids(id)
            .into_iter()
            .filter_map(|f| self.foreign_key(f))
            .collect()
    }

    /// Foreign keys whose principal key is `key`, ordered by dependent then foreign key.
    pub fn foreign_keys_referencing_key(&self, key: KeyId) -> Vec<ForeignKeyId> {
        let mut result: Vec<&ForeignKey> = self
            .foreign_keys
            .iter()
            .flatten()
            .filter(|f| f.principal_key == key)
            .collect();
        result.sort_by_key(|f| (f.declaring_entity_type, f.id));
        result.into_iter().map(|f| f.id).collect()
    }

    /// Foreign keys containing the property.
    pub fn foreign_keys_containing(&self, property: PropertyId) -> Vec<ForeignKeyId> {
        self.foreign_keys
            .iter()
            .flatten()
            .filter(|f| f.properties.contains(&property))
            .map(|f| f.id)
            .collect()
    }

    /// Whether the property is part of some foreign key.
    pub fn is_foreign_key_property(&self, property: PropertyId) -> bool {
        self.foreign_keys
            .iter()
            .flatten()
            .any(|f| f.properties.contains(&property))
    }

    /// Effective foreign keys of `dependent` over exactly these properties.
    pub fn find_foreign_keys_over(
        &self,
        dependent: EntityTypeId,
        properties: &[PropertyId],
    ) -> Vec<ForeignKeyId> {
        self.foreign_key_ids(dependent)
            .into_iter()
            .filter(|f| self.foreign_key(*f).is_some_and(|f| f.properties == properties))
            .collect()
    }

    // ---- navigations ----------------------------------------------------

    /// Resolve one side of a foreign key to a navigation view.
    pub fn navigation_ref(&self, fk: ForeignKeyId, side: NavigationSide) -> Option<NavigationRef> {
        let foreign_key = self.foreign_key(fk)?;
        let navigation = foreign_key.navigation(side)?;
        let (declaring, target, is_collection) = match side {
            NavigationSide::DependentToPrincipal => (
                foreign_key.declaring_entity_type,
                foreign_key.principal_entity_type,
                false,
            ),
            NavigationSide::PrincipalToDependent => (
                foreign_key.principal_entity_type,
                foreign_key.declaring_entity_type,
                !foreign_key.is_unique(),
            ),
        };
        Some(NavigationRef {
            foreign_key: fk,
            side,
            name: navigation.name.clone(),
            declaring_entity_type: declaring,
            target_entity_type: target,
            is_collection,
            source: navigation.source,
        })
    }

    /// Effective navigations of an entity type.
    pub fn navigations(&self, id: EntityTypeId) -> Vec<NavigationRef> {
        let mut result: Vec<NavigationRef> = self
            .foreign_key_ids(id)
            .into_iter()
            .filter_map(|f| self.navigation_ref(f, NavigationSide::DependentToPrincipal))
            .collect();
        result.extend(
            self.referencing_foreign_key_ids(id)
                .into_iter()
                .filter_map(|f| self.navigation_ref(f, NavigationSide::PrincipalToDependent)),
        );
        result
    }

    /// Navigations declared on exactly this entity type.
    pub fn declared_navigations(&self, id: EntityTypeId) -> Vec<NavigationRef> {
        self.navigations(id)
            .into_iter()
            .filter(|n| n.declaring_entity_type == id)
            .collect()
    }

    /// Find an effective navigation by name.
    pub fn find_navigation(&self, id: EntityTypeId, name: &str) -> Option<NavigationRef> {
        self.navigations(id).into_iter().find(|n| n.name == name)
    }

    /// Find a navigation by name on the type or any derived type.
    pub fn find_navigation_in_hierarchy(&self, id: EntityTypeId, name: &str) -> Option<NavigationRef> {
        self.find_navigation(id, name).or_else(|| {
            self.all_derived_types(id)
                .into_iter()
                .find_map(|d| self.find_navigation(d, name).filter(|n| n.declaring_entity_type == d))
        })
    }

    // ---- service properties ---------------------------------------------

    /// Effective service properties.
    pub fn service_properties(&self, id: EntityTypeId) -> Vec<&ServiceProperty> {
        self.hierarchy(id)
            .into_iter()
            .filter_map(|level| self.entity_type(level))
            .flat_map(|e| e.service_properties.iter())
            .collect()
    }

    /// Find an effective service property by name.
    pub fn find_service_property(&self, id: EntityTypeId, name: &str) -> Option<&ServiceProperty> {
        self.service_properties(id)
            .into_iter()
            .find(|s| s.name == name)
    }

    /// Whether a member name is used by a property, navigation or service property.
    pub fn is_member_mapped(&self, id: EntityTypeId, name: &str) -> bool {
        self.find_property_id(id, name).is_some()
            || self.find_navigation(id, name).is_some()
            || self.find_service_property(id, name).is_some()
    }

    /// Whether a member is ignored on the type or any ancestor.
    pub fn is_member_ignored(&self, id: EntityTypeId, name: &str) -> bool {
        self.hierarchy(id)
            .into_iter()
            .filter_map(|level| self.entity_type(level))
            .any(|e| e.ignored_members.contains_key(name))
    }

    // ---- annotations and diagnostics ------------------------------------

    /// Model annotation lookup.
    pub fn annotation(&self, name: &str) -> Option<&Value> {
        self.annotations.get(name)
    }

    /// All model annotations.
    pub fn annotations(&self) -> &Annotations {
        &self.annotations
    }

    /// Diagnostics recorded while building.
    pub fn diagnostics(&self) -> &DiagnosticsLogger {
        &self.diagnostics
    }

    // ---- arena mutation -------------------------------------------------

    pub(crate) fn add_entity_type(
        &mut self,
        name: String,
        clr_type: Option<String>,
        defining: Option<DefiningNavigation>,
        source: ConfigurationSource,
    ) -> EntityTypeId {
        let id = EntityTypeId(self.entity_types.len());
        self.names.insert(name.clone(), id);
        self.entity_types
            .push(Some(EntityType::new(id, name, clr_type, defining, source)));
        id
    }

    pub(crate) fn add_property(
        &mut self,
        entity_type: EntityTypeId,
        name: String,
        property_type: PropertyType,
        clr_nullable: bool,
        shadow: bool,
        source: ConfigurationSource,
    ) -> Option<PropertyId> {
        let id = PropertyId(self.properties.len());
        self.entity_type_mut(entity_type)?.properties.push(id);
        self.properties.push(Some(Property::new(
            id,
            entity_type,
            name,
            property_type,
            clr_nullable,
            shadow,
            source,
        )));
        Some(id)
    }

    pub(crate) fn add_key(
        &mut self,
        entity_type: EntityTypeId,
        properties: Vec<PropertyId>,
        source: ConfigurationSource,
    ) -> Option<KeyId> {
        let id = KeyId(self.keys.len());
        self.entity_type_mut(entity_type)?.keys.push(id);
        self.keys
            .push(Some(Key::new(id, entity_type, properties, source)));
        Some(id)
    }

    pub(crate) fn add_index(
        &mut self,
        entity_type: EntityTypeId,
        properties: Vec<PropertyId>,
        source: ConfigurationSource,
    ) -> Option<IndexId> {
        let id = IndexId(self.indexes.len());
        self.entity_type_mut(entity_type)?.indexes.push(id);
        self.indexes
            .push(Some(Index::new(id, entity_type, properties, source)));
        Some(id)
    }

    pub(crate) fn add_foreign_key(
        &mut self,
        dependent: EntityTypeId,
        principal: EntityTypeId,
        principal_key: KeyId,
        properties: Vec<PropertyId>,
        source: ConfigurationSource,
    ) -> Option<ForeignKeyId> {
        let id = ForeignKeyId(self.foreign_keys.len());
        self.entity_type_mut(dependent)?.foreign_keys.push(id);
        self.foreign_keys.push(Some(ForeignKey::new(
            id,
            dependent,
            principal,
            principal_key,
            properties,
            source,
        )));
        Some(id)
    }

    pub(crate) fn detach_entity_type(&mut self, id: EntityTypeId) -> Option<EntityType> {
        let entity_type = self.entity_types.get_mut(id.0)?.take()?;
        self.names.remove(&entity_type.name);
        Some(entity_type)
    }

    pub(crate) fn detach_property(&mut self, id: PropertyId) -> Option<Property> {
        let property = self.properties.get_mut(id.0)?.take()?;
        if let Some(entity_type) = self.entity_type_mut(property.declaring_entity_type) {
            entity_type.properties.retain(|p| *p != id);
        }
        Some(property)
    }

    pub(crate) fn detach_key(&mut self, id: KeyId) -> Option<Key> {
        let key = self.keys.get_mut(id.0)?.take()?;
        if let Some(entity_type) = self.entity_type_mut(key.declaring_entity_type) {
            entity_type.keys.retain(|k| *k != id);
            if entity_type.primary_key.value() == Some(id) {
                entity_type.primary_key.reset(None);
            }
        }
        Some(key)
    }

    pub(crate) fn detach_index(&mut self, id: IndexId) -> Option<Index> {
        let index = self.indexes.get_mut(id.0)?.take()?;
        if let Some(entity_type) = self.entity_type_mut(index.declaring_entity_type) {
            entity_type.indexes.retain(|i| *i != id);
        }
        Some(index)
    }

    pub(crate) fn detach_foreign_key(&mut self, id: ForeignKeyId) -> Option<ForeignKey> {
        let foreign_key = self.foreign_keys.get_mut(id.0)?.take()?;
        if let Some(entity_type) = self.entity_type_mut(foreign_key.declaring_entity_type) {
            entity_type.foreign_keys.retain(|f| *f != id);
        }
        Some(foreign_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::types::ScalarType;

    fn int() -> PropertyType {
        PropertyType::scalar(ScalarType::Int32)
    }

    #[test]
    fn test_arena_ids_are_stable_after_removal() {
        let mut model = Model::new();
        let blog = model.add_entity_type(
            "Blog".to_string(),
            Some("Blog".to_string()),
            None,
            ConfigurationSource::Explicit,
        );
        let id = model
            .add_property(blog, "Id".to_string(), int(), false, false, ConfigurationSource::Convention)
            .unwrap();
        let name = model
            .add_property(blog, "Name".to_string(), int(), false, false, ConfigurationSource::Convention)
            .unwrap();

        assert!(model.detach_property(id).is_some());
        assert!(!model.contains_property(id));
        assert_eq!(model.property(name).unwrap().name(), "Name");
        assert_eq!(model.property_ids(blog), vec![name]);
    }

    #[test]
    fn test_effective_members_include_base() {
        let mut model = Model::new();
        let animal = model.add_entity_type(
            "Animal".to_string(),
            Some("Animal".to_string()),
            None,
            ConfigurationSource::Explicit,
        );
        let dog = model.add_entity_type(
            "Dog".to_string(),
            Some("Dog".to_string()),
            None,
            ConfigurationSource::Explicit,
        );
        model
            .entity_type_mut(dog)
            .unwrap()
            .base_type
            .set(Some(animal), ConfigurationSource::Convention);
        let id = model
            .add_property(animal, "Id".to_string(), int(), false, false, ConfigurationSource::Convention)
            .unwrap();
        let breed = model
            .add_property(dog, "Breed".to_string(), int(), false, false, ConfigurationSource::Convention)
            .unwrap();
        let key = model
            .add_key(animal, vec![id], ConfigurationSource::Convention)
            .unwrap();
        model
            .entity_type_mut(animal)
            .unwrap()
            .primary_key
            .set(Some(key), ConfigurationSource::Convention);

        assert_eq!(model.property_ids(dog), vec![id, breed]);
        assert_eq!(model.primary_key_id(dog), Some(key));
        assert_eq!(model.root_type(dog), animal);
        assert_eq!(model.derived_types(animal), vec![dog]);
        assert!(model.is_primary_key_property(id));
        assert!(model.find_property(dog, "Id").is_some());
        assert!(model.find_declared_property_id(dog, "Id").is_none());
    }

    #[test]
    fn test_entity_types_sorted_by_name() {
        let mut model = Model::new();
        for name in ["Post", "Blog", "Author"] {
            model.add_entity_type(
                name.to_string(),
                Some(name.to_string()),
                None,
                ConfigurationSource::Explicit,
            );
        }
        let names: Vec<&str> = model.entity_types().iter().map(|e| e.name()).collect();
        assert_eq!(names, vec!["Author", "Blog", "Post"]);
    }

    #[test]
    fn test_detach_key_clears_primary_key() {
        let mut model = Model::new();
        let blog = model.add_entity_type(
            "Blog".to_string(),
            Some("Blog".to_string()),
            None,
            ConfigurationSource::Explicit,
        );
        let id = model
            .add_property(blog, "Id".to_string(), int(), false, false, ConfigurationSource::Convention)
            .unwrap();
        let key = model
            .add_key(blog, vec![id], ConfigurationSource::Convention)
            .unwrap();
        model
            .entity_type_mut(blog)
            .unwrap()
            .primary_key
            .set(Some(key), ConfigurationSource::Convention);

        model.detach_key(key);
        assert!(model.find_primary_key(blog).is_none());
        assert!(model.keys(blog).is_empty());
    }
}
