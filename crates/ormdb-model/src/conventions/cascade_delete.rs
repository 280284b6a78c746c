//! Derives the delete behavior from whether the relationship is required.

use crate::internal::InternalModelBuilder;
use crate::metadata::{ConfigurationSource, DeleteBehavior, ForeignKeyId, KeyId, PropertyId};

pub(crate) fn foreign_key_added(
    mb: &mut InternalModelBuilder,
    id: ForeignKeyId,
) -> Option<ForeignKeyId> {
    apply(mb, id);
    mb.model.contains_foreign_key(id).then_some(id)
}

pub(crate) fn foreign_key_properties_changed(
    mb: &mut InternalModelBuilder,
    id: ForeignKeyId,
    _previous: &[PropertyId],
    _previous_key: KeyId,
) -> Option<ForeignKeyId> {
    apply(mb, id);
    mb.model.contains_foreign_key(id).then_some(id)
}

pub(crate) fn foreign_key_requiredness_changed(
    mb: &mut InternalModelBuilder,
    id: ForeignKeyId,
) -> Option<ForeignKeyId> {
    apply(mb, id);
    mb.model.contains_foreign_key(id).then_some(id)
}

fn apply(mb: &mut InternalModelBuilder, id: ForeignKeyId) {
    let Some(foreign_key) = mb.model.foreign_key(id) else {
        return;
    };
    let behavior = if foreign_key.is_required() {
        DeleteBehavior::Cascade
    } else {
        DeleteBehavior::ClientSetNull
    };
    mb.relationship_builder(id)
        .delete_behavior(behavior, ConfigurationSource::Convention);
}
