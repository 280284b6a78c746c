//! Maps members typed as runtime services to service properties.

use crate::internal::InternalModelBuilder;
use crate::metadata::{ConfigurationSource, EntityTypeId};

pub(crate) fn entity_type_added(
    mb: &mut InternalModelBuilder,
    id: EntityTypeId,
) -> Option<EntityTypeId> {
    discover_service_properties(mb, id);
    mb.model.contains_entity_type(id).then_some(id)
}

pub(crate) fn base_type_changed(
    mb: &mut InternalModelBuilder,
    id: EntityTypeId,
    _previous: Option<EntityTypeId>,
) -> bool {
    discover_service_properties(mb, id);
    true
}

fn discover_service_properties(mb: &mut InternalModelBuilder, id: EntityTypeId) {
    for member in mb.declared_members(id) {
        let Some(kind) = member.member_type.service_kind() else {
            continue;
        };
        if member.is_static || member.is_indexer || !mb.model.contains_entity_type(id) {
            continue;
        }
        mb.entity_builder(id)
            .has_service_property(&member.name, kind, ConfigurationSource::Convention);
    }
}
