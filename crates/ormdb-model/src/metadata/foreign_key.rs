//! Foreign key and navigation metadata.

use super::annotations::Annotations;
use super::ids::{EntityTypeId, ForeignKeyId, KeyId, PropertyId};
use super::source::{ConfigurationSource, Sourced};
use super::types::DeleteBehavior;
use serde_json::Value;

/// Which end of a foreign key a navigation starts from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NavigationSide {
    /// Declared on the dependent, points at the principal.
    DependentToPrincipal,
    /// Declared on the principal, points at the dependent(s).
    PrincipalToDependent,
}

impl NavigationSide {
    /// The other side.
    pub fn opposite(self) -> Self {
        match self {
            NavigationSide::DependentToPrincipal => NavigationSide::PrincipalToDependent,
            NavigationSide::PrincipalToDependent => NavigationSide::DependentToPrincipal,
        }
    }
}

/// A named navigation stored on its foreign key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Navigation {
    pub(crate) name: String,
    pub(crate) source: ConfigurationSource,
}

impl Navigation {
    pub(crate) fn new(name: String, source: ConfigurationSource) -> Self {
        Self { name, source }
    }

    /// Navigation name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Source that set the navigation.
    pub fn configuration_source(&self) -> ConfigurationSource {
        self.source
    }
}

/// A resolved view of a navigation with both of its ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationRef {
    /// The owning foreign key.
    pub foreign_key: ForeignKeyId,
    /// Which side of the foreign key this is.
    pub side: NavigationSide,
    /// Navigation name.
    pub name: String,
    /// Entity type the navigation is declared on.
    pub declaring_entity_type: EntityTypeId,
    /// Entity type the navigation points to.
    pub target_entity_type: EntityTypeId,
    /// Whether the navigation holds many entities.
    pub is_collection: bool,
    /// Source that set the navigation.
    pub source: ConfigurationSource,
}

/// A relationship from a dependent entity type to a principal key.
#[derive(Debug, Clone)]
pub struct ForeignKey {
    pub(crate) id: ForeignKeyId,
    pub(crate) declaring_entity_type: EntityTypeId,
    pub(crate) principal_entity_type: EntityTypeId,
    pub(crate) principal_key: KeyId,
    pub(crate) properties: Vec<PropertyId>,
    pub(crate) source: ConfigurationSource,
    pub(crate) properties_source: Option<ConfigurationSource>,
    pub(crate) principal_key_source: Option<ConfigurationSource>,
    pub(crate) principal_end_source: Option<ConfigurationSource>,
    pub(crate) unique: Sourced<bool>,
    pub(crate) required: Sourced<bool>,
    pub(crate) ownership: Sourced<bool>,
    pub(crate) delete_behavior: Sourced<DeleteBehavior>,
    pub(crate) dependent_to_principal: Option<Navigation>,
    pub(crate) principal_to_dependent: Option<Navigation>,
    pub(crate) annotations: Annotations,
}

impl ForeignKey {
    pub(crate) fn new(
        id: ForeignKeyId,
        declaring_entity_type: EntityTypeId,
        principal_entity_type: EntityTypeId,
        principal_key: KeyId,
        properties: Vec<PropertyId>,
        source: ConfigurationSource,
    ) -> Self {
        Self {
            id,
            declaring_entity_type,
            principal_entity_type,
            principal_key,
            properties,
            source,
            properties_source: None,
            principal_key_source: None,
            principal_end_source: None,
            unique: Sourced::new(false),
            required: Sourced::new(false),
            ownership: Sourced::new(false),
            delete_behavior: Sourced::new(DeleteBehavior::ClientSetNull),
            dependent_to_principal: None,
            principal_to_dependent: None,
            annotations: Annotations::new(),
        }
    }

    /// Arena id.
    pub fn id(&self) -> ForeignKeyId {
        self.id
    }

    /// The dependent entity type.
    pub fn declaring_entity_type(&self) -> EntityTypeId {
        self.declaring_entity_type
    }

    /// The principal entity type.
    pub fn principal_entity_type(&self) -> EntityTypeId {
        self.principal_entity_type
    }

    /// The referenced key on the principal.
    pub fn principal_key(&self) -> KeyId {
        self.principal_key
    }

    /// Dependent-side properties in principal key order.
    pub fn properties(&self) -> &[PropertyId] {
        &self.properties
    }

    /// Source that added the foreign key.
    pub fn configuration_source(&self) -> ConfigurationSource {
        self.source
    }

    /// Source that chose the properties; `None` while they are synthesized.
    pub fn properties_configuration_source(&self) -> Option<ConfigurationSource> {
        self.properties_source
    }

    /// Source that chose the principal key.
    pub fn principal_key_configuration_source(&self) -> Option<ConfigurationSource> {
        self.principal_key_source
    }

    /// Source that chose which end is the principal.
    pub fn principal_end_configuration_source(&self) -> Option<ConfigurationSource> {
        self.principal_end_source
    }

    /// Whether at most one dependent exists per principal.
    pub fn is_unique(&self) -> bool {
        self.unique.value()
    }

    /// Source that set uniqueness.
    pub fn unique_configuration_source(&self) -> Option<ConfigurationSource> {
        self.unique.source()
    }

    /// Whether a dependent must have a principal.
    pub fn is_required(&self) -> bool {
        self.required.value()
    }

    /// Source that set requiredness.
    pub fn required_configuration_source(&self) -> Option<ConfigurationSource> {
        self.required.source()
    }

    /// Whether this foreign key defines an owned type.
    pub fn is_ownership(&self) -> bool {
        self.ownership.value()
    }

    /// Delete behavior.
    pub fn delete_behavior(&self) -> DeleteBehavior {
        self.delete_behavior.value()
    }

    /// Source that set the delete behavior.
    pub fn delete_behavior_configuration_source(&self) -> Option<ConfigurationSource> {
        self.delete_behavior.source()
    }

    /// Navigation on the dependent.
    pub fn dependent_to_principal(&self) -> Option<&Navigation> {
        self.dependent_to_principal.as_ref()
    }

    /// Navigation on the principal.
    pub fn principal_to_dependent(&self) -> Option<&Navigation> {
        self.principal_to_dependent.as_ref()
    }

    /// Navigation on the given side.
    pub fn navigation(&self, side: NavigationSide) -> Option<&Navigation> {
        match side {
            NavigationSide::DependentToPrincipal => self.dependent_to_principal.as_ref(),
            NavigationSide::PrincipalToDependent => self.principal_to_dependent.as_ref(),
        }
    }

    pub(crate) fn navigation_mut(&mut self, side: NavigationSide) -> &mut Option<Navigation> {
        match side {
            NavigationSide::DependentToPrincipal => &mut self.dependent_to_principal,
            NavigationSide::PrincipalToDependent => &mut self.principal_to_dependent,
        }
    }

    /// Whether the dependent and the principal are the same entity type.
    pub fn is_self_referencing(&self) -> bool {
        self.declaring_entity_type == self.principal_entity_type
    }

    /// Whether the foreign key has no navigation at all.
    pub fn is_navigationless(&self) -> bool {
        self.dependent_to_principal.is_none() && self.principal_to_dependent.is_none()
    }

    /// The strongest source among the foreign key and its navigations.
    pub fn strongest_source(&self) -> ConfigurationSource {
        let mut source = self.source;
        for navigation in [&self.dependent_to_principal, &self.principal_to_dependent]
            .into_iter()
            .flatten()
        {
            source = source.max_with(Some(navigation.source));
        }
        source
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
