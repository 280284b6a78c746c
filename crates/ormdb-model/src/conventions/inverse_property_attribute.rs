//! Pairs navigations named by `InverseProperty` attributes.

use crate::error::{ModelError, Result};
use crate::internal::InternalModelBuilder;
use crate::metadata::{ConfigurationSource, EntityTypeId, MemberShape};

const SOURCE: ConfigurationSource = ConfigurationSource::DataAnnotation;

pub(crate) fn entity_type_added(
    mb: &mut InternalModelBuilder,
    id: EntityTypeId,
) -> Option<EntityTypeId> {
    let entity_type = mb.model.entity_type(id)?;
    if entity_type.is_weak() {
        return Some(id);
    }
    let Some(clr_type) = entity_type.clr_type().map(str::to_string) else {
        return Some(id);
    };

    for member in attributed_members(mb, id) {
        let (Some(inverse), Some((target, _))) = (
            member.inverse_property_attribute(),
            member.member_type.navigation_target(),
        ) else {
            continue;
        };
        // Reported when the model is built.
        if target == clr_type && inverse == member.name {
            continue;
        }
        if mb.model.is_member_ignored(id, &member.name)
            || mb.registry.get(target).is_some_and(|s| s.owned)
        {
            continue;
        }
        let Some(target_id) = mb.entity(target, SOURCE) else {
            continue;
        };
        if !mb.model.contains_entity_type(id) {
            return None;
        }
        mb.configure_navigation_pair(id, &member.name, target_id, Some(inverse), SOURCE);
    }
    mb.model.contains_entity_type(id).then_some(id)
}

pub(crate) fn model_built(mb: &mut InternalModelBuilder) -> Result<()> {
    for id in mb.model.entity_type_ids() {
        let Some(entity_type) = mb.model.entity_type(id) else {
            continue;
        };
        if entity_type.is_weak() {
            continue;
        }
        let Some(clr_type) = entity_type.clr_type() else {
            continue;
        };

        for member in attributed_members(mb, id) {
            let (Some(inverse), Some((target, _))) = (
                member.inverse_property_attribute(),
                member.member_type.navigation_target(),
            ) else {
                continue;
            };
            if target == clr_type && inverse == member.name {
                return Err(ModelError::SelfReferencingNavigationWithInverseProperty {
                    entity: entity_type.name().to_string(),
                    navigation: member.name.clone(),
                });
            }
            if mb.model.is_member_ignored(id, &member.name) {
                continue;
            }
            let points_back = mb
                .registry
                .find_member(target, inverse)
                .and_then(|m| m.member_type.navigation_target())
                .is_some_and(|(back, _)| mb.registry.is_assignable_from(back, clr_type));
            if !points_back {
                return Err(ModelError::InvalidNavigation {
                    entity: entity_type.name().to_string(),
                    navigation: member.name.clone(),
                    reason: format!("inverse '{inverse}' on '{target}' does not navigate back"),
                });
            }
        }
    }
    Ok(())
}

fn attributed_members(mb: &InternalModelBuilder, id: EntityTypeId) -> Vec<MemberShape> {
    mb.declared_members(id)
        .into_iter()
        .filter(|m| m.is_candidate() && m.inverse_property_attribute().is_some())
        .collect()
}
