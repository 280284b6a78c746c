//! Sets the nearest mapped ancestor as the base type of a new entity type.

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
    let base = entity_type.clr_type().and_then(|clr_type| {
        mb.registry
            .ancestors(clr_type)
            .into_iter()
            .find_map(|ancestor| mb.model.find_entity_type_id(&ancestor.name))
    });
    if let Some(base) = base {
        mb.entity_builder(id)
            .has_base_type(Some(base), ConfigurationSource::Convention);
    }
    mb.model.contains_entity_type(id).then_some(id)
}
