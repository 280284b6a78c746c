//! Entity type metadata.

use super::annotations::Annotations;
use super::ids::{EntityTypeId, ForeignKeyId, IndexId, KeyId, PropertyId};
use super::service_property::ServiceProperty;
use super::source::{ConfigurationSource, Sourced};
use serde_json::Value;
use std::collections::BTreeMap;

/// The navigation that defines a weak (owned) entity type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefiningNavigation {
    /// The owner entity type.
    pub entity_type: EntityTypeId,
    /// Navigation on the owner.
    pub navigation: String,
}

/// One mapped shape in the model.
///
/// Members are stored as ids into the owning model's arenas. Only declared
/// members live here; inherited members are resolved through the base type.
#[derive(Debug, Clone)]
pub struct EntityType {
    pub(crate) id: EntityTypeId,
    pub(crate) name: String,
    pub(crate) clr_type: Option<String>,
    pub(crate) defining: Option<DefiningNavigation>,
    pub(crate) source: ConfigurationSource,
    pub(crate) base_type: Sourced<Option<EntityTypeId>>,
    pub(crate) properties: Vec<PropertyId>,
    pub(crate) keys: Vec<KeyId>,
    pub(crate) primary_key: Sourced<Option<KeyId>>,
    pub(crate) indexes: Vec<IndexId>,
    pub(crate) foreign_keys: Vec<ForeignKeyId>,
    pub(crate) service_properties: Vec<ServiceProperty>,
    pub(crate) ignored_members: BTreeMap<String, ConfigurationSource>,
    pub(crate) ambiguous_navigations: Vec<String>,
    pub(crate) annotations: Annotations,
}

impl EntityType {
    pub(crate) fn new(
        id: EntityTypeId,
        name: String,
        clr_type: Option<String>,
        defining: Option<DefiningNavigation>,
        source: ConfigurationSource,
    ) -> Self {
        Self {
            id,
            name,
            clr_type,
            defining,
            source,
            base_type: Sourced::new(None),
            properties: Vec::new(),
            keys: Vec::new(),
            primary_key: Sourced::new(None),
            indexes: Vec::new(),
            foreign_keys: Vec::new(),
            service_properties: Vec::new(),
            ignored_members: BTreeMap::new(),
            ambiguous_navigations: Vec::new(),
            annotations: Annotations::new(),
        }
    }

    /// Arena id.
    pub fn id(&self) -> EntityTypeId {
        self.id
    }

    /// Display name. Weak types are named `{Owner}.{Navigation}#{Type}`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The mapped type name, or `None` for shadow entity types.
    pub fn clr_type(&self) -> Option<&str> {
        self.clr_type.as_deref()
    }

    /// The type name used when composing member names.
    pub fn short_name(&self) -> &str {
        self.clr_type.as_deref().unwrap_or(&self.name)
    }

    /// Whether this type has no backing type shape.
    pub fn is_shadow(&self) -> bool {
        self.clr_type.is_none()
    }

    /// Whether this type is owned through a defining navigation.
    pub fn is_weak(&self) -> bool {
        self.defining.is_some()
    }

    /// The defining navigation of a weak type.
    pub fn defining_navigation(&self) -> Option<&DefiningNavigation> {
        self.defining.as_ref()
    }

    /// Source that added the entity type.
    pub fn configuration_source(&self) -> ConfigurationSource {
        self.source
    }

    /// The base type id, if any.
    pub fn base_type(&self) -> Option<EntityTypeId> {
        self.base_type.value()
    }

    /// Source that set the base type.
    pub fn base_type_configuration_source(&self) -> Option<ConfigurationSource> {
        self.base_type.source()
    }

    /// Declared properties in declaration order.
    pub fn declared_properties(&self) -> &[PropertyId] {
        &self.properties
    }

    /// Declared keys.
    pub fn declared_keys(&self) -> &[KeyId] {
        &self.keys
    }

    /// The declared primary key, if this type declares one.
    pub fn declared_primary_key(&self) -> Option<KeyId> {
        self.primary_key.value()
    }

    /// Source that set the primary key.
    pub fn primary_key_configuration_source(&self) -> Option<ConfigurationSource> {
        self.primary_key.source()
    }

    /// Declared indexes.
    pub fn declared_indexes(&self) -> &[IndexId] {
        &self.indexes
    }

    /// Declared (outgoing) foreign keys.
    pub fn declared_foreign_keys(&self) -> &[ForeignKeyId] {
        &self.foreign_keys
    }

    /// Declared service properties.
    pub fn declared_service_properties(&self) -> &[ServiceProperty] {
        &self.service_properties
    }

    /// Source that ignored a member, if ignored.
    pub fn ignored_member_source(&self, name: &str) -> Option<ConfigurationSource> {
        self.ignored_members.get(name).copied()
    }

    /// Names of ignored members.
    pub fn ignored_members(&self) -> impl Iterator<Item = &str> {
        self.ignored_members.keys().map(|k| k.as_str())
    }

    /// Navigation members left unmapped because their pairing is ambiguous.
    pub fn ambiguous_navigations(&self) -> &[String] {
        &self.ambiguous_navigations
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
