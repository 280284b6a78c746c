//! Maps scalar and enum members to properties.

use crate::internal::InternalModelBuilder;
use crate::metadata::{ConfigurationSource, EntityTypeId};

pub(crate) fn entity_type_added(
    mb: &mut InternalModelBuilder,
    id: EntityTypeId,
) -> Option<EntityTypeId> {
    discover_properties(mb, id);
    mb.model.contains_entity_type(id).then_some(id)
}

pub(crate) fn base_type_changed(
    mb: &mut InternalModelBuilder,
    id: EntityTypeId,
    _previous: Option<EntityTypeId>,
) -> bool {
    discover_properties(mb, id);
    true
}

fn discover_properties(mb: &mut InternalModelBuilder, id: EntityTypeId) {
    let members = mb.declared_members(id);
    for member in members
        .iter()
        .filter(|m| m.is_candidate() && m.member_type.is_primitive())
    {
        if !mb.model.contains_entity_type(id) {
            return;
        }
        mb.entity_builder(id)
            .property(&member.name, ConfigurationSource::Convention);
    }
}
