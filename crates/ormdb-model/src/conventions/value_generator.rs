//! Keeps store value generation in line with keys and foreign keys.
//!
//! A primary key property that is not part of a foreign key and has a type
//! the store can generate gets `OnAdd`. Strings only qualify as the sole key
//! property. Every other property touched by these events falls back to
//! `Never`.

use crate::internal::InternalModelBuilder;
use crate::metadata::{
    ConfigurationSource, EntityTypeId, ForeignKey, ForeignKeyId, KeyId, PropertyId, ValueGenerated,
};

pub(crate) fn key_added(mb: &mut InternalModelBuilder, id: KeyId) -> Option<KeyId> {
    let properties = mb.model.key(id)?.properties().to_vec();
    update_all(mb, &properties);
    mb.model.contains_key(id).then_some(id)
}

pub(crate) fn primary_key_changed(
    mb: &mut InternalModelBuilder,
    id: EntityTypeId,
    previous: &[PropertyId],
) -> bool {
    update_all(mb, previous);
    let current = mb
        .model
        .find_primary_key(id)
        .map(|k| k.properties().to_vec())
        .unwrap_or_default();
    update_all(mb, &current);
    true
}

pub(crate) fn foreign_key_added(
    mb: &mut InternalModelBuilder,
    id: ForeignKeyId,
) -> Option<ForeignKeyId> {
    let properties = mb.model.foreign_key(id)?.properties().to_vec();
    update_all(mb, &properties);
    mb.model.contains_foreign_key(id).then_some(id)
}

pub(crate) fn foreign_key_removed(mb: &mut InternalModelBuilder, foreign_key: &ForeignKey) -> bool {
    update_all(mb, foreign_key.properties());
    true
}

pub(crate) fn foreign_key_properties_changed(
    mb: &mut InternalModelBuilder,
    id: ForeignKeyId,
    previous: &[PropertyId],
    _previous_key: KeyId,
) -> Option<ForeignKeyId> {
    update_all(mb, previous);
    let current = mb.model.foreign_key(id)?.properties().to_vec();
    update_all(mb, &current);
    mb.model.contains_foreign_key(id).then_some(id)
}

fn update_all(mb: &mut InternalModelBuilder, properties: &[PropertyId]) {
    for property in properties {
        update(mb, *property);
    }
}

fn update(mb: &mut InternalModelBuilder, id: PropertyId) {
    let Some(property) = mb.model.property(id) else {
        return;
    };
    let (in_primary_key, sole) = mb
        .model
        .find_primary_key(property.declaring_entity_type())
        .map(|k| (k.properties().contains(&id), k.properties().len() == 1))
        .unwrap_or_default();
    let generated = in_primary_key
        && !mb.model.is_foreign_key_property(id)
        && property.property_type().supports_generation(sole);

    let value = if generated {
        ValueGenerated::OnAdd
    } else {
        ValueGenerated::Never
    };
    let mut builder = mb.property_builder(id);
    builder.value_generated(value, ConfigurationSource::Convention);
    let effective = builder
        .metadata()
        .map(|p| p.value_generated())
        .unwrap_or_default();
    builder.set_requires_value_generator(generated && effective != ValueGenerated::Never);
}
