//! Discovers relationships from navigation members.
//!
//! Navigations of an entity type are grouped by target type and matched with
//! the navigations on the target that point back. One candidate on each side
//! makes a single relationship, and navigations without any inverse make one
//! relationship each. Anything else is ambiguous: nothing is configured and
//! the candidate names are remembered on both entity types until a higher
//! source settles them.

use super::RemovedNavigation;
use crate::diagnostics::Diagnostic;
use crate::internal::InternalModelBuilder;
use crate::metadata::{
    ConfigurationSource, DefiningNavigation, EntityType, EntityTypeId, ForeignKeyId,
    NavigationSide,
};
use tracing::debug;

const SOURCE: ConfigurationSource = ConfigurationSource::Convention;

#[derive(Debug, Clone)]
struct Candidate {
    name: String,
    target: String,
    is_collection: bool,
}

pub(crate) fn entity_type_added(
    mb: &mut InternalModelBuilder,
    id: EntityTypeId,
) -> Option<EntityTypeId> {
    discover(mb, id);
    mb.model.contains_entity_type(id).then_some(id)
}

pub(crate) fn entity_type_ignored(mb: &mut InternalModelBuilder, _name: &str) -> bool {
    rediscover_ambiguous(mb);
    true
}

pub(crate) fn entity_type_removed(mb: &mut InternalModelBuilder, _entity_type: &EntityType) -> bool {
    rediscover_ambiguous(mb);
    true
}

pub(crate) fn member_ignored(mb: &mut InternalModelBuilder, id: EntityTypeId, name: &str) -> bool {
    let was_ambiguous = mb
        .model
        .entity_type(id)
        .is_some_and(|e| e.ambiguous_navigations.iter().any(|n| n == name));
    if was_ambiguous {
        clear_ambiguous(mb, id, &[name.to_string()]);
        rediscover_ambiguous(mb);
    }
    true
}

pub(crate) fn base_type_changed(
    mb: &mut InternalModelBuilder,
    id: EntityTypeId,
    previous: Option<EntityTypeId>,
) -> bool {
    remove_navigationless(mb, id);
    discover(mb, id);
    if let Some(previous) = previous {
        discover(mb, previous);
    }
    if let Some(base) = mb.model.entity_type(id).and_then(|e| e.base_type()) {
        discover(mb, base);
    }
    true
}

/// Drop convention relationships of `id` that lost every navigation when
/// their members moved to the new base type.
fn remove_navigationless(mb: &mut InternalModelBuilder, id: EntityTypeId) {
    let stale: Vec<ForeignKeyId> = mb
        .model
        .all_foreign_key_ids()
        .into_iter()
        .filter_map(|f| mb.model.foreign_key(f))
        .filter(|f| f.declaring_entity_type() == id || f.principal_entity_type() == id)
        .filter(|f| f.is_navigationless() && f.strongest_source() == SOURCE)
        .map(|f| f.id())
        .collect();
    for foreign_key in stale {
        debug!(
            entity = %mb.model.entity_type_name(id),
            "removing relationship moved to the base type"
        );
        mb.remove_foreign_key(foreign_key, SOURCE);
    }
}

pub(crate) fn navigation_added(
    mb: &mut InternalModelBuilder,
    id: ForeignKeyId,
    side: NavigationSide,
) -> Option<ForeignKeyId> {
    let navigation = mb.model.navigation_ref(id, side)?;
    let foreign_key = mb.model.foreign_key(id)?;

    if foreign_key.is_ownership() && side == NavigationSide::PrincipalToDependent {
        // The owned type may navigate back to its owner.
        let dependent = foreign_key.declaring_entity_type();
        discover(mb, dependent);
    } else if navigation.source != SOURCE {
        let settles_ambiguity = [navigation.declaring_entity_type, navigation.target_entity_type]
            .into_iter()
            .filter_map(|e| mb.model.entity_type(e))
            .any(|e| !e.ambiguous_navigations.is_empty());
        if settles_ambiguity {
            clear_ambiguous(mb, navigation.declaring_entity_type, &[navigation.name.clone()]);
            discover(mb, navigation.declaring_entity_type);
            discover(mb, navigation.target_entity_type);
        }
    }
    mb.model.contains_foreign_key(id).then_some(id)
}

pub(crate) fn navigation_removed(mb: &mut InternalModelBuilder, removed: &RemovedNavigation) -> bool {
    let ambiguous = |mb: &InternalModelBuilder, id: EntityTypeId| {
        mb.model
            .entity_type(id)
            .map(|e| e.ambiguous_navigations.clone())
            .unwrap_or_default()
    };
    let declaring = ambiguous(mb, removed.declaring_entity_type);
    if declaring.contains(&removed.name) {
        return true;
    }
    if !ambiguous(mb, removed.target_entity_type).is_empty() {
        discover(mb, removed.target_entity_type);
    }
    if !declaring.is_empty() && removed.target_entity_type != removed.declaring_entity_type {
        discover(mb, removed.declaring_entity_type);
    }
    true
}

/// Navigation members of `id` still open to discovery.
fn candidates(mb: &InternalModelBuilder, id: EntityTypeId) -> Vec<Candidate> {
    let Some(clr_type) = mb.model.entity_type(id).and_then(|e| e.clr_type()) else {
        return Vec::new();
    };
    mb.declared_members(id)
        .into_iter()
        .filter(|m| m.is_candidate() && m.inverse_property_attribute().is_none())
        .filter_map(|m| {
            let (target, is_collection) = m.member_type.navigation_target()?;
            Some(Candidate {
                name: m.name.clone(),
                target: target.to_string(),
                is_collection,
            })
        })
        .filter(|c| mb.registry.contains(&c.target) && !mb.is_ignored(&c.target, SOURCE))
        .filter(|c| !mb.model.is_member_ignored(id, &c.name))
        .filter(|c| {
            mb.model.find_property_id(id, &c.name).is_none()
                && mb.model.find_service_property(id, &c.name).is_none()
        })
        .filter(|c| {
            mb.model
                .find_navigation(id, &c.name)
                .map_or(true, |n| n.source == SOURCE)
        })
        .filter(|c| !named_as_inverse(mb, clr_type, c))
        .collect()
}

/// Whether a member on the target names `candidate` in an `InverseProperty` attribute.
fn named_as_inverse(mb: &InternalModelBuilder, clr_type: &str, candidate: &Candidate) -> bool {
    mb.registry.all_members(&candidate.target).into_iter().any(|m| {
        m.inverse_property_attribute() == Some(candidate.name.as_str())
            && m
                .member_type
                .navigation_target()
                .is_some_and(|(target, _)| target == clr_type)
    })
}

fn discover(mb: &mut InternalModelBuilder, id: EntityTypeId) {
    let Some(entity_type) = mb.model.entity_type(id) else {
        return;
    };
    let Some(clr_type) = entity_type.clr_type().map(str::to_string) else {
        return;
    };
    let defining = entity_type.defining_navigation().cloned();
    let is_owner_reference = |mb: &InternalModelBuilder, candidate: &Candidate| {
        defining.as_ref().is_some_and(|defining| {
            !candidate.is_collection
                && mb
                    .model
                    .entity_type(defining.entity_type)
                    .and_then(|o| o.clr_type())
                    == Some(candidate.target.as_str())
        })
    };
    let is_owned_target = |mb: &InternalModelBuilder, candidate: &Candidate| {
        mb.registry.get(&candidate.target).is_some_and(|s| s.owned)
    };

    // Mapping the targets can map further types and re-parent `id`, so the
    // candidates are collected again once every target exists.
    for candidate in candidates(mb, id) {
        if is_owned_target(mb, &candidate) {
            if !candidate.is_collection {
                mb.owns(id, &candidate.name, &candidate.target, SOURCE);
            }
        } else if is_owner_reference(mb, &candidate) {
            if let Some(defining) = &defining {
                attach_to_owner(mb, defining, &candidate.name);
            }
        } else {
            mb.entity(&candidate.target, SOURCE);
        }
        if !mb.model.contains_entity_type(id) {
            return;
        }
    }

    let mut groups: Vec<(String, Vec<Candidate>)> = Vec::new();
    for candidate in candidates(mb, id) {
        if is_owned_target(mb, &candidate) || is_owner_reference(mb, &candidate) {
            continue;
        }
        match groups.iter_mut().find(|(target, _)| *target == candidate.target) {
            Some((_, group)) => group.push(candidate),
            None => groups.push((candidate.target.clone(), vec![candidate])),
        }
    }

    for (target, navigations) in groups {
        let Some(target_id) = mb.model.find_entity_type_id(&target) else {
            continue;
        };
        if !mb.model.contains_entity_type(id) {
            return;
        }
        configure_group(mb, id, &clr_type, target_id, navigations);
    }
}

/// Use a reference from an owned type back to its owner as the inverse of the
/// defining navigation.
fn attach_to_owner(mb: &mut InternalModelBuilder, defining: &DefiningNavigation, name: &str) {
    let Some(navigation) = mb
        .model
        .find_navigation(defining.entity_type, &defining.navigation)
    else {
        return;
    };
    let open = mb
        .model
        .foreign_key(navigation.foreign_key)
        .is_some_and(|f| f.is_ownership() && f.dependent_to_principal().is_none());
    if open {
        mb.relationship_builder(navigation.foreign_key).has_navigation(
            Some(name),
            NavigationSide::DependentToPrincipal,
            SOURCE,
        );
    }
}

fn configure_group(
    mb: &mut InternalModelBuilder,
    id: EntityTypeId,
    clr_type: &str,
    target: EntityTypeId,
    navigations: Vec<Candidate>,
) {
    let self_referencing = target == id;
    let weak = mb.model.entity_type(id).is_some_and(|e| e.is_weak());
    let inverses: Vec<Candidate> = if self_referencing || weak {
        Vec::new()
    } else {
        candidates(mb, target)
            .into_iter()
            .filter(|c| c.target == clr_type)
            .collect()
    };

    let navigation_names: Vec<String> = navigations.iter().map(|n| n.name.clone()).collect();
    let inverse_names: Vec<String> = inverses.iter().map(|n| n.name.clone()).collect();
    clear_ambiguous(mb, id, &navigation_names);
    clear_ambiguous(mb, target, &inverse_names);

    let pairs: Vec<(String, Option<String>)> = if self_referencing {
        match navigations.as_slice() {
            [single] => vec![(single.name.clone(), None)],
            [first, second] if first.is_collection && second.is_collection => return,
            [first, second] => vec![(first.name.clone(), Some(second.name.clone()))],
            _ => {
                mark_ambiguous(mb, id, target, navigation_names, Vec::new());
                return;
            }
        }
    } else if inverses.is_empty() {
        navigations.iter().map(|n| (n.name.clone(), None)).collect()
    } else {
        match (navigations.as_slice(), inverses.as_slice()) {
            ([navigation], [inverse]) if navigation.is_collection && inverse.is_collection => {
                return
            }
            ([navigation], [inverse]) => {
                vec![(navigation.name.clone(), Some(inverse.name.clone()))]
            }
            _ => {
                mark_ambiguous(mb, id, target, navigation_names, inverse_names);
                return;
            }
        }
    };

    for (navigation, inverse) in pairs {
        if !mb.model.contains_entity_type(id) || !mb.model.contains_entity_type(target) {
            return;
        }
        mb.configure_navigation_pair(id, &navigation, target, inverse.as_deref(), SOURCE);
    }
}

fn mark_ambiguous(
    mb: &mut InternalModelBuilder,
    id: EntityTypeId,
    target: EntityTypeId,
    navigations: Vec<String>,
    inverses: Vec<String>,
) {
    for (entity_type, names) in [(id, &navigations), (target, &inverses)] {
        if let Some(entity_type) = mb.model.entity_type_mut(entity_type) {
            for name in names {
                if !entity_type.ambiguous_navigations.contains(name) {
                    entity_type.ambiguous_navigations.push(name.clone());
                }
            }
        }
    }
    debug!(
        entity = %mb.model.entity_type_name(id),
        navigations = ?navigations,
        "ambiguous navigations left unconfigured"
    );
    let diagnostic = Diagnostic::MultipleNavigationProperties {
        entity: mb.model.entity_type_name(id),
        target: mb.model.entity_type_name(target),
        navigations: navigations.clone(),
        inverses: inverses.clone(),
    };
    mb.log(diagnostic);

    for (entity_type, names) in [(id, navigations), (target, inverses)] {
        for name in names {
            remove_convention_navigation(mb, entity_type, &name);
        }
    }
}

fn clear_ambiguous(mb: &mut InternalModelBuilder, id: EntityTypeId, names: &[String]) {
    if let Some(entity_type) = mb.model.entity_type_mut(id) {
        entity_type.ambiguous_navigations.retain(|n| !names.contains(n));
    }
}

fn remove_convention_navigation(mb: &mut InternalModelBuilder, id: EntityTypeId, name: &str) {
    let Some(navigation) = mb
        .model
        .find_navigation(id, name)
        .filter(|n| n.declaring_entity_type == id && n.source == SOURCE)
    else {
        return;
    };
    mb.relationship_builder(navigation.foreign_key)
        .has_navigation(None, navigation.side, SOURCE);
}

fn rediscover_ambiguous(mb: &mut InternalModelBuilder) {
    let ambiguous: Vec<EntityTypeId> = mb
        .model
        .entity_type_ids()
        .into_iter()
        .filter(|id| {
            mb.model
                .entity_type(*id)
                .is_some_and(|e| !e.ambiguous_navigations.is_empty())
        })
        .collect();
    for id in ambiguous {
        discover(mb, id);
    }
}
