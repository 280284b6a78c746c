//! Builder for relationships: foreign keys together with their navigations.

use super::InternalModelBuilder;
use crate::conventions::RemovedNavigation;
use crate::metadata::{
    max_source, ConfigurationSource, DeleteBehavior, EntityTypeId, ForeignKey, ForeignKeyId,
    KeyId, Navigation, NavigationSide, PropertyId, PropertyType, ScalarType, Sourced,
};
use serde_json::Value;
use std::collections::BTreeSet;
use tracing::debug;

/// Configures one foreign key and its navigations.
///
/// Operations that may replace the foreign key (inversion, conventions
/// reacting to a change) return the id of the foreign key that carries the
/// relationship afterwards, or `None` when the change was rejected or the
/// relationship is gone.
pub struct InternalRelationshipBuilder<'a> {
    mb: &'a mut InternalModelBuilder,
    id: ForeignKeyId,
}

impl<'a> InternalRelationshipBuilder<'a> {
    pub(crate) fn new(mb: &'a mut InternalModelBuilder, id: ForeignKeyId) -> Self {
        Self { mb, id }
    }

    /// The foreign key being configured.
    pub fn id(&self) -> ForeignKeyId {
        self.id
    }

    /// The foreign key metadata, if it still exists.
    pub fn metadata(&self) -> Option<&ForeignKey> {
        self.mb.model.foreign_key(self.id)
    }

    fn ends(foreign_key: &ForeignKey, side: NavigationSide) -> (EntityTypeId, EntityTypeId) {
        match side {
            NavigationSide::DependentToPrincipal => (
                foreign_key.declaring_entity_type,
                foreign_key.principal_entity_type,
            ),
            NavigationSide::PrincipalToDependent => (
                foreign_key.principal_entity_type,
                foreign_key.declaring_entity_type,
            ),
        }
    }

    // ---- navigations ----------------------------------------------------

    /// Set (`Some`) or remove (`None`) the navigation on one side.
    ///
    /// The member must exist on the declaring type's shape and point at the
    /// other end. A collection can only sit on the principal side and makes
    /// the relationship one-to-many; a reference there makes it one-to-one.
    /// Conflicting properties and navigations with the same name are removed
    /// when `source` allows it.
    pub fn has_navigation(
        &mut self,
        name: Option<&str>,
        side: NavigationSide,
        source: ConfigurationSource,
    ) -> Option<ForeignKeyId> {
        let Some(name) = name else {
            return self.remove_navigation(side, source);
        };
        let foreign_key = self.mb.model.foreign_key(self.id)?;
        let (declaring, target) = Self::ends(foreign_key, side);
        let current = foreign_key.navigation(side).cloned();
        if let Some(current) = &current {
            if current.name == name {
                if let Some(navigation) = self
                    .mb
                    .model
                    .foreign_key_mut(self.id)
                    .and_then(|f| f.navigation_mut(side).as_mut())
                {
                    navigation.source = navigation.source.max(source);
                }
                return Some(self.id);
            }
            if !source.overrides(Some(current.source)) {
                return None;
            }
        }

        let is_collection = match self.mb.navigation_member(declaring, name) {
            Some((member_target, is_collection)) => {
                if !self.mb.is_assignable_to(target, &member_target) {
                    return None;
                }
                is_collection
            }
            None => {
                let declaring_is_shadow = self
                    .mb
                    .model
                    .entity_type(declaring)
                    .is_some_and(|e| e.is_shadow());
                if !declaring_is_shadow {
                    return None;
                }
                side == NavigationSide::PrincipalToDependent && !foreign_key.is_unique()
            }
        };
        if side == NavigationSide::DependentToPrincipal && is_collection {
            return None;
        }
        if self.mb.entity_builder(declaring).is_ignored(name, source) {
            return None;
        }

        let model = &self.mb.model;
        let foreign_key = model.foreign_key(self.id)?;
        let required_unique =
            (side == NavigationSide::PrincipalToDependent).then_some(!is_collection);
        if let Some(unique) = required_unique {
            if !foreign_key.unique.can_set(&unique, source) {
                return None;
            }
        }
        let property = model.find_property(declaring, name).map(|p| (p.id, p.source));
        if let Some((_, existing)) = property {
            if !source.overrides(Some(existing)) {
                return None;
            }
        }
        let service = model
            .hierarchy(declaring)
            .into_iter()
            .find(|level| {
                model
                    .entity_type(*level)
                    .is_some_and(|e| e.service_properties.iter().any(|s| s.name == name))
            });
        if let Some(service) = model.find_service_property(declaring, name) {
            if !source.overrides(Some(service.source)) {
                return None;
            }
        }
        let other = model
            .find_navigation(declaring, name)
            .filter(|n| !(n.foreign_key == self.id && n.side == side));
        if let Some(other) = &other {
            if !source.overrides(Some(other.source)) {
                return None;
            }
        }

        let id = self.id;
        {
            let mut batch = self.mb.start_batch();
            if let Some((property, _)) = property {
                batch.remove_property(property, source);
            }
            if let Some(level) = service {
                batch.entity_builder(level).remove_service_property(name, source);
            }
            if let Some(other) = other {
                if other.foreign_key == id {
                    batch.relationship_builder(id).clear_navigation(other.side);
                } else {
                    batch
                        .relationship_builder(other.foreign_key)
                        .has_navigation(None, other.side, source);
                }
            }
            if !batch.model.contains_foreign_key(id) {
                return None;
            }
            if current.is_some() {
                batch.relationship_builder(id).clear_navigation(side);
            }
            if let Some(unique) = required_unique {
                batch.relationship_builder(id).is_unique(unique, source)?;
            }
            *batch.model.foreign_key_mut(id)?.navigation_mut(side) =
                Some(Navigation::new(name.to_string(), source));
            debug!(
                entity = %batch.model.entity_type_name(declaring),
                navigation = name,
                target = %batch.model.entity_type_name(target),
                %source,
                "navigation added"
            );
            batch.on_navigation_added(id, side);
        }

        let carries_navigation = self
            .mb
            .model
            .foreign_key(id)
            .and_then(|f| f.navigation(side))
            .is_some_and(|n| n.name == name);
        if carries_navigation {
            return Some(id);
        }
        self.mb
            .model
            .find_navigation(declaring, name)
            .map(|n| n.foreign_key)
    }

    /// Drop the navigation on one side without touching the foreign key.
    fn clear_navigation(&mut self, side: NavigationSide) {
        let Some(foreign_key) = self.mb.model.foreign_key_mut(self.id) else {
            return;
        };
        let Some(previous) = foreign_key.navigation_mut(side).take() else {
            return;
        };
        let (declaring, target) = Self::ends(foreign_key, side);
        self.mb.on_navigation_removed(RemovedNavigation {
            declaring_entity_type: declaring,
            target_entity_type: target,
            name: previous.name,
            foreign_key: Some(self.id),
        });
    }

    /// Remove the navigation on one side.
    ///
    /// A convention foreign key left without navigations is removed too.
    fn remove_navigation(
        &mut self,
        side: NavigationSide,
        source: ConfigurationSource,
    ) -> Option<ForeignKeyId> {
        let foreign_key = self.mb.model.foreign_key(self.id)?;
        let Some(current) = foreign_key.navigation(side) else {
            return Some(self.id);
        };
        if !source.overrides(Some(current.source)) {
            return None;
        }
        let (declaring, target) = Self::ends(foreign_key, side);
        let name = current.name.clone();
        let id = self.id;

        let mut batch = self.mb.start_batch();
        if let Some(foreign_key) = batch.model.foreign_key_mut(id) {
            *foreign_key.navigation_mut(side) = None;
        }
        debug!(
            entity = %batch.model.entity_type_name(declaring),
            navigation = %name,
            "navigation removed"
        );
        let orphaned = batch.model.foreign_key(id).is_some_and(|f| {
            f.is_navigationless() && f.source == ConfigurationSource::Convention
        });
        if orphaned {
            batch.remove_foreign_key(id, ConfigurationSource::Convention);
        }
        batch.on_navigation_removed(RemovedNavigation {
            declaring_entity_type: declaring,
            target_entity_type: target,
            name,
            foreign_key: (!orphaned).then_some(id),
        });
        batch.model.contains_foreign_key(id).then_some(id)
    }

    // ---- facets ---------------------------------------------------------

    /// Make the relationship one-to-one (`true`) or one-to-many.
    pub fn is_unique(&mut self, unique: bool, source: ConfigurationSource) -> Option<ForeignKeyId> {
        let foreign_key = self.mb.model.foreign_key(self.id)?;
        if foreign_key.is_unique() == unique {
            if let Some(foreign_key) = self.mb.model.foreign_key_mut(self.id) {
                foreign_key.unique.set(unique, source);
            }
            return Some(self.id);
        }
        if !foreign_key.unique.can_set(&unique, source) {
            return None;
        }
        if let Some(navigation) = foreign_key.principal_to_dependent() {
            let member = self
                .mb
                .navigation_member(foreign_key.principal_entity_type, navigation.name());
            if member.is_some_and(|(_, is_collection)| is_collection == unique) {
                return None;
            }
        }
        self.mb.model.foreign_key_mut(self.id)?.unique.set(unique, source);
        self.mb.on_foreign_key_uniqueness_changed(self.id)
    }

    /// Make the relationship required or optional.
    ///
    /// The foreign key properties follow: a required relationship makes them
    /// non-nullable. An optional one needs properties whose type admits null.
    pub fn is_required(
        &mut self,
        required: bool,
        source: ConfigurationSource,
    ) -> Option<ForeignKeyId> {
        let model = &self.mb.model;
        let foreign_key = model.foreign_key(self.id)?;
        if foreign_key.is_required() == required {
            if let Some(foreign_key) = self.mb.model.foreign_key_mut(self.id) {
                foreign_key.required.set(required, source);
            }
            return Some(self.id);
        }
        if !foreign_key.required.can_set(&required, source) {
            return None;
        }
        if !required
            && foreign_key
                .properties
                .iter()
                .filter_map(|p| model.property(*p))
                .any(|p| !p.clr_nullable)
        {
            return None;
        }
        let properties = foreign_key.properties.clone();
        self.mb.model.foreign_key_mut(self.id)?.required.set(required, source);
        for property in properties {
            self.mb.property_builder(property).is_required(required, source);
        }
        self.mb.on_foreign_key_requiredness_changed(self.id)
    }

    /// Mark the relationship as an ownership.
    pub fn is_ownership(
        &mut self,
        ownership: bool,
        source: ConfigurationSource,
    ) -> Option<ForeignKeyId> {
        let changed = self
            .mb
            .model
            .foreign_key_mut(self.id)?
            .ownership
            .set(ownership, source)?;
        if changed {
            return self.mb.on_foreign_key_ownership_changed(self.id);
        }
        Some(self.id)
    }

    /// Set the delete behavior.
    pub fn delete_behavior(&mut self, behavior: DeleteBehavior, source: ConfigurationSource) -> bool {
        self.mb
            .model
            .foreign_key_mut(self.id)
            .and_then(|f| f.delete_behavior.set(behavior, source))
            .is_some()
    }

    /// Set or remove a foreign key annotation.
    pub fn has_annotation(
        &mut self,
        name: &str,
        value: Option<Value>,
        source: ConfigurationSource,
    ) -> bool {
        self.mb
            .model
            .foreign_key_mut(self.id)
            .and_then(|f| f.annotations.set(name, value, source))
            .is_some()
    }

    // ---- principal end --------------------------------------------------

    /// Pin `principal` as the principal end, inverting when it is the dependent.
    pub fn has_principal_end(
        &mut self,
        principal: EntityTypeId,
        source: ConfigurationSource,
    ) -> Option<ForeignKeyId> {
        let foreign_key = self.mb.model.foreign_key(self.id)?;
        if foreign_key.principal_entity_type == principal {
            let previous = foreign_key.principal_end_source;
            let updated = max_source(previous, Some(source));
            self.mb.model.foreign_key_mut(self.id)?.principal_end_source = updated;
            if updated != previous {
                return self.mb.on_principal_end_changed(self.id);
            }
            return Some(self.id);
        }
        if foreign_key.declaring_entity_type == principal {
            return self.invert(source);
        }
        None
    }

    /// Swap the principal and dependent ends.
    ///
    /// The foreign key is rebuilt: the old one is removed and a new one with
    /// shadow properties on the new dependent takes over the navigations.
    pub fn invert(&mut self, source: ConfigurationSource) -> Option<ForeignKeyId> {
        let foreign_key = self.mb.model.foreign_key(self.id)?.clone();
        if !source.overrides(foreign_key.principal_end_source) || foreign_key.is_ownership() {
            return None;
        }
        if !foreign_key.is_unique() && foreign_key.principal_to_dependent.is_some() {
            return None;
        }
        let make_unique = !foreign_key.is_unique() && foreign_key.dependent_to_principal.is_some();
        if make_unique && !foreign_key.unique.can_set(&true, source) {
            return None;
        }

        let principal = foreign_key.declaring_entity_type;
        let dependent = foreign_key.principal_entity_type;
        let dependent_to_principal = foreign_key.principal_to_dependent.clone();
        let principal_to_dependent = foreign_key.dependent_to_principal.clone();
        debug!(
            dependent = %self.mb.model.entity_type_name(dependent),
            principal = %self.mb.model.entity_type_name(principal),
            "inverting relationship"
        );

        let inverted = {
            let mut batch = self.mb.start_batch();
            batch.remove_foreign_key(self.id, ConfigurationSource::Explicit)?;
            let inverted = batch.add_relationship(
                principal,
                dependent,
                dependent_to_principal.as_ref().map(|n| n.name.as_str()),
                foreign_key.source,
            )?;
            let rebuilt = batch.model.foreign_key_mut(inverted)?;
            rebuilt.unique = if make_unique {
                Sourced::with_source(true, source)
            } else {
                foreign_key.unique.clone()
            };
            rebuilt.principal_end_source = Some(source.max_with(foreign_key.principal_end_source));
            rebuilt.annotations = foreign_key.annotations.clone();
            if foreign_key
                .delete_behavior
                .source()
                .is_some_and(|s| s > ConfigurationSource::Convention)
            {
                rebuilt.delete_behavior = foreign_key.delete_behavior.clone();
            }
            rebuilt.dependent_to_principal = dependent_to_principal.clone();
            rebuilt.principal_to_dependent = principal_to_dependent.clone();
            for (side, navigation) in [
                (NavigationSide::DependentToPrincipal, &dependent_to_principal),
                (NavigationSide::PrincipalToDependent, &principal_to_dependent),
            ] {
                if navigation.is_some() {
                    batch.on_navigation_added(inverted, side);
                }
            }
            batch.on_principal_end_changed(inverted);
            inverted
        };

        self.mb.resolve_relationship(
            inverted,
            dependent,
            principal,
            dependent_to_principal.as_ref().map(|n| n.name.as_str()),
            principal_to_dependent.as_ref().map(|n| n.name.as_str()),
        )
    }

    // ---- properties and principal key -----------------------------------

    /// Set the foreign key properties, or fall back to shadow properties (`None`).
    ///
    /// The properties must match the principal key in count and type.
    pub fn has_foreign_key(
        &mut self,
        properties: Option<Vec<PropertyId>>,
        source: ConfigurationSource,
    ) -> Option<ForeignKeyId> {
        let model = &self.mb.model;
        let foreign_key = model.foreign_key(self.id)?;
        let Some(properties) = properties else {
            if !source.overrides(foreign_key.properties_source) {
                return None;
            }
            if foreign_key.properties_source.is_none() {
                return Some(self.id);
            }
            return self.reset_to_shadow_properties();
        };

        if foreign_key.properties == properties {
            let updated = max_source(foreign_key.properties_source, Some(source));
            self.mb.model.foreign_key_mut(self.id)?.properties_source = updated;
            return Some(self.id);
        }
        if !source.overrides(foreign_key.properties_source) {
            return None;
        }
        let key = model.key(foreign_key.principal_key)?;
        let effective = model.property_ids(foreign_key.declaring_entity_type);
        let distinct: BTreeSet<&PropertyId> = properties.iter().collect();
        if properties.is_empty()
            || distinct.len() != properties.len()
            || properties.len() != key.properties.len()
            || !properties.iter().all(|p| effective.contains(p))
            || model.property_types(&properties) != model.property_types(&key.properties)
        {
            return None;
        }

        let mut displaced: Vec<ForeignKeyId> = Vec::new();
        for other in model.find_foreign_keys_over(foreign_key.declaring_entity_type, &properties) {
            if other == self.id {
                continue;
            }
            let Some(other_key) = model.foreign_key(other) else {
                continue;
            };
            if other_key.principal_entity_type != foreign_key.principal_entity_type {
                continue;
            }
            if !source.overrides_strictly(other_key.properties_source) {
                return None;
            }
            displaced.push(other);
        }
        for other in displaced {
            self.mb.relationship_builder(other).reset_to_shadow_properties();
        }

        self.set_properties(properties, Some(source))
    }

    /// Replace the properties with fresh convention shadow properties.
    pub(crate) fn reset_to_shadow_properties(&mut self) -> Option<ForeignKeyId> {
        let foreign_key = self.mb.model.foreign_key(self.id)?;
        let dependent = foreign_key.declaring_entity_type;
        let principal = foreign_key.principal_entity_type;
        let key = foreign_key.principal_key;
        let navigation = foreign_key
            .dependent_to_principal
            .as_ref()
            .map(|n| n.name.clone());
        let id = self.id;

        let mut batch = self.mb.start_batch();
        let properties = batch.create_shadow_foreign_key_properties(
            dependent,
            principal,
            key,
            navigation.as_deref(),
        )?;
        batch.relationship_builder(id).set_properties(properties, None)
    }

    fn set_properties(
        &mut self,
        properties: Vec<PropertyId>,
        source: Option<ConfigurationSource>,
    ) -> Option<ForeignKeyId> {
        let id = self.id;
        let foreign_key = self.mb.model.foreign_key_mut(id)?;
        let previous = std::mem::replace(&mut foreign_key.properties, properties.clone());
        let previous_key = foreign_key.principal_key;
        let dependent = foreign_key.declaring_entity_type;
        foreign_key.properties_source = source;
        let required = foreign_key.required.clone();
        debug!(
            dependent = %self.mb.model.entity_type_name(dependent),
            properties = %self.mb.model.display_properties(&properties),
            "foreign key properties changed"
        );

        {
            let mut batch = self.mb.start_batch();
            if required
                .source()
                .map_or(true, |s| s <= ConfigurationSource::Convention)
            {
                let all_required = properties
                    .iter()
                    .filter_map(|p| batch.model.property(*p))
                    .all(|p| !p.is_nullable());
                batch
                    .relationship_builder(id)
                    .is_required(all_required, ConfigurationSource::Convention);
            } else {
                for property in &properties {
                    batch
                        .property_builder(*property)
                        .is_required(required.value(), ConfigurationSource::Convention);
                }
            }
            batch.on_foreign_key_properties_changed(id, previous.clone(), previous_key);
        }
        self.mb.remove_unused_shadow_properties(&previous);
        self.mb.model.contains_foreign_key(id).then_some(id)
    }

    /// Point the relationship at another principal key (`None` for the primary key).
    ///
    /// Properties that no longer fit the new key fall back to shadow properties
    /// when their source allows it; otherwise the change is rejected.
    pub fn has_principal_key(
        &mut self,
        properties: Option<Vec<PropertyId>>,
        source: ConfigurationSource,
    ) -> Option<ForeignKeyId> {
        let foreign_key = self.mb.model.foreign_key(self.id)?;
        let principal = foreign_key.principal_entity_type;
        let previous_key = foreign_key.principal_key;
        let previous_source = foreign_key.principal_key_source;
        let properties_source = foreign_key.properties_source;
        let dependent_properties = foreign_key.properties.clone();
        if !source.overrides(previous_source) {
            let same = properties.as_ref().map_or(false, |p| {
                self.mb.model.key(previous_key).is_some_and(|k| &k.properties == p)
            });
            return same.then_some(self.id);
        }

        let key = match &properties {
            Some(properties) => {
                let root = self.mb.model.root_type(principal);
                self.mb.entity_builder(root).has_key(properties.clone(), source)?
            }
            None => self.mb.principal_key_for(principal)?,
        };
        let key_source = properties.as_ref().map(|_| source);
        if key == previous_key {
            self.mb.model.foreign_key_mut(self.id)?.principal_key_source =
                max_source(previous_source, key_source);
            return Some(self.id);
        }

        let model = &self.mb.model;
        let compatible = model
            .key(key)
            .is_some_and(|k| model.property_types(&k.properties) == model.property_types(&dependent_properties));
        if !compatible && !source.overrides(properties_source) {
            return None;
        }

        {
            let foreign_key = self.mb.model.foreign_key_mut(self.id)?;
            foreign_key.principal_key = key;
            foreign_key.principal_key_source = key_source;
        }
        let result = if compatible {
            self.mb
                .on_foreign_key_properties_changed(self.id, dependent_properties, previous_key)
        } else {
            self.reset_to_shadow_properties()
        };
        self.mb.remove_unused_convention_key(previous_key);
        result
    }
}

impl InternalModelBuilder {
    /// The key a new relationship to `principal` should reference.
    ///
    /// That is the primary key of the hierarchy, or a temporary shadow key
    /// on the root when there is none yet.
    pub(crate) fn principal_key_for(&mut self, principal: EntityTypeId) -> Option<KeyId> {
        let root = self.model.root_type(principal);
        if let Some(key) = self.model.primary_key_id(root) {
            return Some(key);
        }
        let temporary = self.config.temporary_key_name.clone();
        let existing = self.model.key_ids(root).into_iter().find(|k| {
            self.model.key(*k).is_some_and(|key| {
                key.properties.len() == 1
                    && self
                        .model
                        .property(key.properties[0])
                        .is_some_and(|p| p.shadow && p.name == temporary)
            })
        });
        if existing.is_some() {
            return existing;
        }
        let property = self.entity_builder(root).shadow_property(
            &temporary,
            PropertyType::scalar(ScalarType::Int32),
            false,
            ConfigurationSource::Convention,
        )?;
        self.entity_builder(root)
            .has_key(vec![property], ConfigurationSource::Convention)
    }

    /// A member name on `entity_type` not used by anything mapped or declared.
    fn unique_member_name(&self, entity_type: EntityTypeId, desired: &str) -> String {
        let model = &self.model;
        let mut scopes = vec![entity_type];
        scopes.extend(model.all_derived_types(entity_type));
        let taken = |name: &str| {
            scopes.iter().any(|scope| {
                model.is_member_mapped(*scope, name)
                    || model.is_member_ignored(*scope, name)
                    || self.find_member(*scope, name).is_some()
            })
        };
        if !taken(desired) {
            return desired.to_string();
        }
        (1..)
            .map(|i| format!("{desired}{i}"))
            .find(|candidate| !taken(candidate))
            .unwrap_or_else(|| desired.to_string())
    }

    /// Create convention shadow properties on `dependent` matching `key`.
    ///
    /// Names are `{navigation}{key property}`, or `{principal}{key property}`
    /// without a navigation, unless the key property already starts with that
    /// prefix. Taken names get a numeric suffix.
    pub(crate) fn create_shadow_foreign_key_properties(
        &mut self,
        dependent: EntityTypeId,
        principal: EntityTypeId,
        key: KeyId,
        navigation: Option<&str>,
    ) -> Option<Vec<PropertyId>> {
        let prefix = match navigation {
            Some(navigation) => navigation.to_string(),
            None => self.model.entity_type(principal)?.short_name().to_string(),
        };
        let key_properties: Vec<(String, PropertyType)> = self
            .model
            .key(key)?
            .properties
            .iter()
            .filter_map(|p| self.model.property(*p))
            .map(|p| (p.name.clone(), p.property_type.clone()))
            .collect();

        let mut properties = Vec::with_capacity(key_properties.len());
        for (name, property_type) in key_properties {
            let desired = if name.to_lowercase().starts_with(&prefix.to_lowercase()) {
                name
            } else {
                format!("{prefix}{name}")
            };
            let name = self.unique_member_name(dependent, &desired);
            let property = self.entity_builder(dependent).shadow_property(
                &name,
                property_type,
                true,
                ConfigurationSource::Convention,
            )?;
            properties.push(property);
        }
        Some(properties)
    }

    /// Add a foreign key from `dependent` to `principal` over new shadow properties.
    pub(crate) fn add_relationship(
        &mut self,
        principal: EntityTypeId,
        dependent: EntityTypeId,
        navigation: Option<&str>,
        source: ConfigurationSource,
    ) -> Option<ForeignKeyId> {
        let mut batch = self.start_batch();
        let key = batch.principal_key_for(principal)?;
        let properties =
            batch.create_shadow_foreign_key_properties(dependent, principal, key, navigation)?;
        let foreign_key = batch
            .model
            .add_foreign_key(dependent, principal, key, properties, source)?;
        debug!(
            dependent = %batch.model.entity_type_name(dependent),
            principal = %batch.model.entity_type_name(principal),
            %source,
            "foreign key added"
        );
        batch.on_foreign_key_added(foreign_key)
    }

    /// Find the relationship carrying the given navigations after conventions
    /// may have replaced `foreign_key`.
    pub(crate) fn resolve_relationship(
        &self,
        foreign_key: ForeignKeyId,
        dependent: EntityTypeId,
        principal: EntityTypeId,
        dependent_to_principal: Option<&str>,
        principal_to_dependent: Option<&str>,
    ) -> Option<ForeignKeyId> {
        if self.model.contains_foreign_key(foreign_key) {
            return Some(foreign_key);
        }
        dependent_to_principal
            .and_then(|n| self.model.find_navigation(dependent, n))
            .or_else(|| principal_to_dependent.and_then(|n| self.model.find_navigation(principal, n)))
            .map(|n| n.foreign_key)
    }

    /// Create a relationship with the given navigations.
    ///
    /// Everything happens inside one batch so conventions only see the
    /// finished relationship.
    pub fn create_relationship(
        &mut self,
        principal: EntityTypeId,
        dependent: EntityTypeId,
        dependent_to_principal: Option<&str>,
        principal_to_dependent: Option<&str>,
        unique: Option<bool>,
        source: ConfigurationSource,
    ) -> Option<ForeignKeyId> {
        let created = {
            let mut batch = self.start_batch();
            let foreign_key =
                batch.add_relationship(principal, dependent, dependent_to_principal, source)?;
            let configured = unique.map_or(true, |u| {
                batch.relationship_builder(foreign_key).is_unique(u, source).is_some()
            }) && dependent_to_principal.map_or(true, |n| {
                batch
                    .relationship_builder(foreign_key)
                    .has_navigation(Some(n), NavigationSide::DependentToPrincipal, source)
                    .is_some()
            }) && principal_to_dependent.map_or(true, |n| {
                batch
                    .relationship_builder(foreign_key)
                    .has_navigation(Some(n), NavigationSide::PrincipalToDependent, source)
                    .is_some()
            });
            if !configured {
                batch.remove_foreign_key(foreign_key, ConfigurationSource::Explicit);
                return None;
            }
            foreign_key
        };
        self.resolve_relationship(
            created,
            dependent,
            principal,
            dependent_to_principal,
            principal_to_dependent,
        )
    }

    /// Map `owner.navigation` as an ownership of a weak entity type.
    pub fn owns(
        &mut self,
        owner: EntityTypeId,
        navigation: &str,
        type_name: &str,
        source: ConfigurationSource,
    ) -> Option<ForeignKeyId> {
        if let Some(existing) = self.model.find_navigation(owner, navigation) {
            let is_ownership = existing.side == NavigationSide::PrincipalToDependent
                && self
                    .model
                    .foreign_key(existing.foreign_key)
                    .is_some_and(|f| f.is_ownership());
            if is_ownership {
                return self.relationship_builder(existing.foreign_key).has_navigation(
                    Some(navigation),
                    NavigationSide::PrincipalToDependent,
                    source,
                );
            }
        }
        match self.navigation_member(owner, navigation) {
            Some((target, false)) if self.registry.is_assignable_from(&target, type_name) => {}
            _ => return None,
        }

        let weak = self.owned_entity(owner, navigation, type_name, source)?;
        let created = {
            let mut batch = self.start_batch();
            let foreign_key = batch.add_relationship(owner, weak, None, source)?;
            let mut relationship = batch.relationship_builder(foreign_key);
            let configured = relationship.is_unique(true, source).is_some()
                && relationship.is_required(true, source).is_some()
                && relationship.is_ownership(true, source).is_some()
                && relationship.has_principal_end(owner, source).is_some()
                && relationship
                    .has_navigation(Some(navigation), NavigationSide::PrincipalToDependent, source)
                    .is_some();
            if !configured {
                batch.remove_entity_type(weak, ConfigurationSource::Explicit);
                return None;
            }
            foreign_key
        };
        self.resolve_relationship(created, weak, owner, None, Some(navigation))
    }

    /// Find an existing relationship between `entity_type.navigation` and
    /// `inverse` on `target`.
    pub(crate) fn find_relationship(
        &self,
        entity_type: EntityTypeId,
        navigation: &str,
        target: EntityTypeId,
        inverse: Option<&str>,
    ) -> Option<ForeignKeyId> {
        let found = self.model.find_navigation(entity_type, navigation)?;
        if !self.model.in_same_line(found.target_entity_type, target) {
            return None;
        }
        let foreign_key = self.model.foreign_key(found.foreign_key)?;
        let opposite = foreign_key.navigation(found.side.opposite()).map(|n| n.name());
        (opposite == inverse).then_some(found.foreign_key)
    }

    /// Configure the relationship between `entity_type.navigation` and an
    /// optional `inverse` on `target`, deciding the ends from member shapes.
    ///
    /// A reference paired with a collection is one-to-many with the reference
    /// side as dependent. Two references make a one-to-one whose dependent is
    /// tentatively `entity_type`. Two collections are not supported.
    pub fn configure_navigation_pair(
        &mut self,
        entity_type: EntityTypeId,
        navigation: &str,
        target: EntityTypeId,
        inverse: Option<&str>,
        source: ConfigurationSource,
    ) -> Option<ForeignKeyId> {
        let (_, navigation_is_collection) = self.navigation_member(entity_type, navigation)?;
        let inverse_is_collection = match inverse {
            Some(inverse) => Some(self.navigation_member(target, inverse)?.1),
            None => None,
        };

        if let Some(existing) = self.find_relationship(entity_type, navigation, target, inverse) {
            let mut relationship = self.relationship_builder(existing);
            if let Some(found) = relationship.metadata().cloned() {
                for side in [
                    NavigationSide::DependentToPrincipal,
                    NavigationSide::PrincipalToDependent,
                ] {
                    if let Some(name) = found.navigation(side).map(|n| n.name.clone()) {
                        relationship.has_navigation(Some(&name), side, source);
                    }
                }
            }
            return Some(existing);
        }

        // A one-sided relationship on `navigation` can take the inverse as is.
        if let (Some(inverse), Some(found)) =
            (inverse, self.model.find_navigation(entity_type, navigation))
        {
            let open = self.model.in_same_line(found.target_entity_type, target)
                && self
                    .model
                    .foreign_key(found.foreign_key)
                    .is_some_and(|f| f.navigation(found.side.opposite()).is_none());
            if open {
                let extended = self.relationship_builder(found.foreign_key).has_navigation(
                    Some(inverse),
                    found.side.opposite(),
                    source,
                );
                if extended.is_some() {
                    let current = self.model.find_navigation(entity_type, navigation)?;
                    return self.relationship_builder(current.foreign_key).has_navigation(
                        Some(navigation),
                        current.side,
                        source,
                    );
                }
            }
        }

        let (principal, dependent, dependent_to_principal, principal_to_dependent, unique) =
            match (navigation_is_collection, inverse_is_collection) {
                (false, None) => (target, entity_type, Some(navigation), None, false),
                (true, None) => (entity_type, target, None, Some(navigation), false),
                (false, Some(true)) => (target, entity_type, Some(navigation), inverse, false),
                (true, Some(false)) => (entity_type, target, inverse, Some(navigation), false),
                (false, Some(false)) => (target, entity_type, Some(navigation), inverse, true),
                (true, Some(true)) => return None,
            };
        self.create_relationship(
            principal,
            dependent,
            dependent_to_principal,
            principal_to_dependent,
            Some(unique),
            source,
        )
    }
}
