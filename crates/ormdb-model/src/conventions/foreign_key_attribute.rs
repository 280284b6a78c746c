//! Applies `ForeignKey` attributes to relationships.
//!
//! The attribute can sit on a navigation, naming the foreign key properties
//! (comma separated), or on a property, naming the navigation it serves.
//! When the named properties only exist on the principal of a one-to-one
//! relationship, the relationship is inverted first.

use crate::internal::InternalModelBuilder;
use crate::metadata::{ConfigurationSource, EntityTypeId, ForeignKeyId, NavigationSide, PropertyId};

const SOURCE: ConfigurationSource = ConfigurationSource::DataAnnotation;

pub(crate) fn foreign_key_added(
    mb: &mut InternalModelBuilder,
    id: ForeignKeyId,
) -> Option<ForeignKeyId> {
    Some(apply(mb, id))
}

pub(crate) fn navigation_added(
    mb: &mut InternalModelBuilder,
    id: ForeignKeyId,
    _side: NavigationSide,
) -> Option<ForeignKeyId> {
    Some(apply(mb, id))
}

/// Property names named by attributes on either end of the relationship.
fn attribute_names(mb: &InternalModelBuilder, id: ForeignKeyId) -> Option<Vec<String>> {
    let foreign_key = mb.model.foreign_key(id)?;
    let dependent = foreign_key.declaring_entity_type();
    let principal = foreign_key.principal_entity_type();
    let dependent_to_principal = foreign_key.dependent_to_principal().map(|n| n.name().to_string());
    let principal_to_dependent = foreign_key.principal_to_dependent().map(|n| n.name().to_string());

    let on_navigation = |entity_type: EntityTypeId, navigation: &Option<String>| {
        navigation
            .as_deref()
            .and_then(|n| mb.find_member(entity_type, n))
            .and_then(|m| m.foreign_key_attribute().map(split_names))
    };
    let on_properties = |entity_type: EntityTypeId, navigation: &Option<String>| {
        let navigation = navigation.as_deref()?;
        let names: Vec<String> = mb
            .declared_members(entity_type)
            .into_iter()
            .filter(|m| m.member_type.is_primitive())
            .filter(|m| m.foreign_key_attribute() == Some(navigation))
            .map(|m| m.name)
            .collect();
        (!names.is_empty()).then_some(names)
    };

    on_navigation(dependent, &dependent_to_principal)
        .or_else(|| on_navigation(principal, &principal_to_dependent))
        .or_else(|| on_properties(dependent, &dependent_to_principal))
        .or_else(|| on_properties(principal, &principal_to_dependent))
}

fn split_names(names: &str) -> Vec<String> {
    names
        .split(',')
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string)
        .collect()
}

/// Whether every name is a property or a primitive member of `entity_type`.
fn resolvable(mb: &InternalModelBuilder, entity_type: EntityTypeId, names: &[String]) -> bool {
    names.iter().all(|name| {
        mb.model.find_property_id(entity_type, name).is_some()
            || mb
                .find_member(entity_type, name)
                .is_some_and(|m| m.is_candidate() && m.member_type.is_primitive())
    })
}

fn resolve(
    mb: &mut InternalModelBuilder,
    entity_type: EntityTypeId,
    names: &[String],
) -> Option<Vec<PropertyId>> {
    names
        .iter()
        .map(|name| match mb.model.find_property_id(entity_type, name) {
            Some(property) => Some(property),
            None => mb.entity_builder(entity_type).property(name, SOURCE),
        })
        .collect()
}

fn apply(mb: &mut InternalModelBuilder, id: ForeignKeyId) -> ForeignKeyId {
    let Some(names) = attribute_names(mb, id) else {
        return id;
    };
    let Some(foreign_key) = mb.model.foreign_key(id) else {
        return id;
    };
    if !SOURCE.overrides(foreign_key.properties_configuration_source()) {
        return id;
    }
    let dependent = foreign_key.declaring_entity_type();
    let principal = foreign_key.principal_entity_type();
    let invertible = foreign_key.is_unique() && !foreign_key.is_ownership();

    let (id, dependent) = if resolvable(mb, dependent, &names) {
        (id, dependent)
    } else if invertible && resolvable(mb, principal, &names) {
        match mb.relationship_builder(id).invert(SOURCE) {
            Some(inverted) => (inverted, principal),
            None => return id,
        }
    } else {
        return id;
    };

    let Some(properties) = resolve(mb, dependent, &names) else {
        return id;
    };
    mb.relationship_builder(id)
        .has_foreign_key(Some(properties), SOURCE)
        .unwrap_or(id)
}
