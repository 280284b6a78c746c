//! Drops leftovers of discovery once the model is complete.

use crate::error::Result;
use crate::internal::InternalModelBuilder;
use crate::metadata::{ConfigurationSource, EntityTypeId, ForeignKeyId, Model};
use tracing::debug;

pub(crate) fn model_built(mb: &mut InternalModelBuilder) -> Result<()> {
    remove_unreachable_weak_types(mb);
    remove_navigationless_foreign_keys(mb);
    Ok(())
}

/// A weak type is reachable while its owner is and the owner still holds the
/// defining ownership navigation to it.
fn is_reachable(model: &Model, id: EntityTypeId) -> bool {
    let mut current = id;
    let mut seen: Vec<EntityTypeId> = Vec::new();
    loop {
        let Some(entity_type) = model.entity_type(current) else {
            return false;
        };
        let Some(defining) = entity_type.defining_navigation() else {
            return true;
        };
        if seen.contains(&current) {
            return false;
        }
        seen.push(current);

        let owned = model
            .find_navigation(defining.entity_type, &defining.navigation)
            .filter(|n| n.target_entity_type == current)
            .and_then(|n| model.foreign_key(n.foreign_key))
            .is_some_and(|f| f.is_ownership());
        if !owned {
            return false;
        }
        current = defining.entity_type;
    }
}

fn remove_unreachable_weak_types(mb: &mut InternalModelBuilder) {
    loop {
        let unreachable = mb
            .model
            .entity_type_ids()
            .into_iter()
            .find(|id| !is_reachable(&mb.model, *id));
        let Some(id) = unreachable else {
            return;
        };
        debug!(entity = %mb.model.entity_type_name(id), "removing unreachable weak entity type");
        if mb
            .remove_entity_type(id, ConfigurationSource::Explicit)
            .is_none()
        {
            return;
        }
    }
}

fn remove_navigationless_foreign_keys(mb: &mut InternalModelBuilder) {
    let leftovers: Vec<ForeignKeyId> = mb
        .model
        .all_foreign_key_ids()
        .into_iter()
        .filter_map(|id| mb.model.foreign_key(id))
        .filter(|f| {
            f.is_navigationless()
                && !f.is_ownership()
                && f.configuration_source() == ConfigurationSource::Convention
        })
        .map(|f| f.id())
        .collect();
    for id in leftovers {
        mb.remove_foreign_key(id, ConfigurationSource::Convention);
    }
}
