//! Re-parents mapped types under a newly mapped, closer ancestor.

use crate::internal::InternalModelBuilder;
use crate::metadata::{ConfigurationSource, EntityTypeId};

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

    let derived: Vec<EntityTypeId> = mb
        .model
        .entity_types()
        .into_iter()
        .filter(|e| !e.is_weak() && e.id() != id && e.base_type() != Some(id))
        .filter(|e| {
            let Some(candidate) = e.clr_type() else {
                return false;
            };
            // The new type must be the nearest mapped ancestor.
            mb.registry
                .ancestors(candidate)
                .into_iter()
                .find_map(|ancestor| mb.model.find_entity_type_id(&ancestor.name))
                == Some(id)
                && candidate != clr_type
        })
        .map(|e| e.id())
        .collect();

    for derived in derived {
        mb.entity_builder(derived)
            .has_base_type(Some(id), ConfigurationSource::Convention);
    }
    mb.model.contains_entity_type(id).then_some(id)
}
