//! Maintains an index over the properties of every foreign key.
//!
//! The index is skipped when a key already covers the properties: any key
//! that starts with them for a non-unique foreign key, a key over exactly
//! those properties for a unique one.

use crate::diagnostics::Diagnostic;
use crate::internal::InternalModelBuilder;
use crate::metadata::{
    ConfigurationSource, EntityTypeId, ForeignKey, ForeignKeyId, Key, KeyId, Model, PropertyId,
};
use std::collections::BTreeSet;

pub(crate) fn key_added(mb: &mut InternalModelBuilder, id: KeyId) -> Option<KeyId> {
    let key = mb.model.key(id)?;
    let declaring = key.declaring_entity_type();
    let key_properties = key.properties().to_vec();

    let mut scopes = vec![declaring];
    scopes.extend(mb.model.all_derived_types(declaring));
    let redundant: Vec<(EntityTypeId, Vec<PropertyId>)> = scopes
        .into_iter()
        .flat_map(|scope| {
            mb.model
                .entity_type(scope)
                .map(|e| e.declared_indexes().to_vec())
                .unwrap_or_default()
        })
        .filter_map(|index| mb.model.index(index))
        .filter(|index| index.configuration_source() == ConfigurationSource::Convention)
        .filter(|index| {
            let unique = is_unique_over(&mb.model, index.declaring_entity_type(), index.properties());
            covers(&key_properties, index.properties(), unique)
        })
        .map(|index| (index.declaring_entity_type(), index.properties().to_vec()))
        .collect();

    for (entity_type, properties) in redundant {
        if remove_convention_index(mb, entity_type, &properties) {
            let diagnostic = Diagnostic::RedundantIndexRemoved {
                entity: mb.model.entity_type_name(entity_type),
                index: mb.model.property_names(&properties),
                key: mb.model.property_names(&key_properties),
            };
            mb.log(diagnostic);
        }
    }
    mb.model.contains_key(id).then_some(id)
}

pub(crate) fn key_removed(mb: &mut InternalModelBuilder, key: &Key) -> bool {
    let declaring = key.declaring_entity_type();
    let mut scopes = vec![declaring];
    scopes.extend(mb.model.all_derived_types(declaring));
    let foreign_keys: Vec<ForeignKeyId> = scopes
        .into_iter()
        .filter_map(|scope| mb.model.entity_type(scope))
        .flat_map(|e| e.declared_foreign_keys().to_vec())
        .collect();
    for foreign_key in foreign_keys {
        ensure_index(mb, foreign_key);
    }
    true
}

pub(crate) fn foreign_key_added(
    mb: &mut InternalModelBuilder,
    id: ForeignKeyId,
) -> Option<ForeignKeyId> {
    ensure_index(mb, id);
    mb.model.contains_foreign_key(id).then_some(id)
}

pub(crate) fn foreign_key_removed(mb: &mut InternalModelBuilder, foreign_key: &ForeignKey) -> bool {
    release_index(mb, foreign_key.declaring_entity_type(), foreign_key.properties());
    true
}

pub(crate) fn foreign_key_properties_changed(
    mb: &mut InternalModelBuilder,
    id: ForeignKeyId,
    previous: &[PropertyId],
    _previous_key: KeyId,
) -> Option<ForeignKeyId> {
    let dependent = mb.model.foreign_key(id)?.declaring_entity_type();
    release_index(mb, dependent, previous);
    ensure_index(mb, id);
    mb.model.contains_foreign_key(id).then_some(id)
}

pub(crate) fn foreign_key_uniqueness_changed(
    mb: &mut InternalModelBuilder,
    id: ForeignKeyId,
) -> Option<ForeignKeyId> {
    ensure_index(mb, id);
    mb.model.contains_foreign_key(id).then_some(id)
}

/// Whether a key over `key` makes an index over `properties` redundant.
fn covers(key: &[PropertyId], properties: &[PropertyId], unique: bool) -> bool {
    if unique {
        let key: BTreeSet<&PropertyId> = key.iter().collect();
        let properties: BTreeSet<&PropertyId> = properties.iter().collect();
        key == properties
    } else {
        key.starts_with(properties)
    }
}

fn is_unique_over(model: &Model, dependent: EntityTypeId, properties: &[PropertyId]) -> bool {
    model
        .find_foreign_keys_over(dependent, properties)
        .into_iter()
        .filter_map(|f| model.foreign_key(f))
        .any(|f| f.is_unique())
}

fn covered_by_key(model: &Model, entity_type: EntityTypeId, properties: &[PropertyId]) -> bool {
    let unique = is_unique_over(model, entity_type, properties);
    model
        .keys(entity_type)
        .into_iter()
        .any(|k| covers(k.properties(), properties, unique))
}

fn ensure_index(mb: &mut InternalModelBuilder, id: ForeignKeyId) {
    let Some(foreign_key) = mb.model.foreign_key(id) else {
        return;
    };
    let dependent = foreign_key.declaring_entity_type();
    let properties = foreign_key.properties().to_vec();

    if covered_by_key(&mb.model, dependent, &properties) {
        remove_convention_index(mb, dependent, &properties);
        return;
    }
    let unique = is_unique_over(&mb.model, dependent, &properties);
    let Some(index) = mb
        .entity_builder(dependent)
        .has_index(properties, ConfigurationSource::Convention)
    else {
        return;
    };
    mb.index_builder(index)
        .is_unique(unique, ConfigurationSource::Convention);
}

/// Drop the convention index over `properties` unless another foreign key still needs it.
fn release_index(mb: &mut InternalModelBuilder, dependent: EntityTypeId, properties: &[PropertyId]) {
    if !mb.model.contains_entity_type(dependent) {
        return;
    }
    let still_used = mb
        .model
        .find_foreign_keys_over(dependent, properties)
        .into_iter()
        .next();
    match still_used {
        Some(other) => ensure_index(mb, other),
        None => {
            remove_convention_index(mb, dependent, properties);
        }
    }
}

fn remove_convention_index(
    mb: &mut InternalModelBuilder,
    entity_type: EntityTypeId,
    properties: &[PropertyId],
) -> bool {
    let Some(index) = mb.model.find_index_id(entity_type, properties) else {
        return false;
    };
    mb.remove_index(index, ConfigurationSource::Convention)
        .is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModelConfig;
    use crate::metadata::ModelSnapshot;
    use crate::metadata::{ScalarType, TypeRegistry, TypeShape};

    fn registry() -> TypeRegistry {
        TypeRegistry::new()
            .with_shape(
                TypeShape::new("Blog")
                    .with_scalar("Id", ScalarType::Int32)
                    .with_collection("Posts", "Post"),
            )
            .with_shape(
                TypeShape::new("Post")
                    .with_scalar("Id", ScalarType::Int32)
                    .with_scalar("BlogId", ScalarType::Int32)
                    .with_reference("Blog", "Blog"),
            )
    }

    fn index_over(builder: &InternalModelBuilder, entity: EntityTypeId, name: &str) -> Option<bool> {
        let model = builder.model();
        let property = model.find_property_id(entity, name)?;
        model
            .find_index_id(entity, &[property])
            .and_then(|i| model.index(i))
            .map(|i| i.is_unique())
    }

    #[test]
    fn test_foreign_key_gets_non_unique_index() {
        let mut builder = InternalModelBuilder::new(registry(), ModelConfig::default());
        builder.entity("Blog", ConfigurationSource::Explicit).unwrap();
        let post = builder.model().find_entity_type_id("Post").unwrap();
        assert_eq!(index_over(&builder, post, "BlogId"), Some(false));
    }

    #[test]
    fn test_index_follows_the_foreign_key() {
        let mut builder = InternalModelBuilder::new(registry(), ModelConfig::default());
        let blog = builder.entity("Blog", ConfigurationSource::Explicit).unwrap();
        let post = builder.model().find_entity_type_id("Post").unwrap();
        let foreign_key = builder.model().find_navigation(blog, "Posts").unwrap().foreign_key;

        builder
            .remove_foreign_key(foreign_key, ConfigurationSource::Explicit)
            .unwrap();
        assert_eq!(index_over(&builder, post, "BlogId"), None);
    }

    #[test]
    fn test_key_makes_index_redundant() {
        let mut builder = InternalModelBuilder::new(registry(), ModelConfig::default());
        builder.entity("Blog", ConfigurationSource::Explicit).unwrap();
        let post = builder.model().find_entity_type_id("Post").unwrap();
        let blog_id = builder.model().find_property_id(post, "BlogId").unwrap();
        let id = builder.model().find_property_id(post, "Id").unwrap();

        builder
            .entity_builder(post)
            .has_key(vec![blog_id, id], ConfigurationSource::Explicit)
            .unwrap();
        assert_eq!(index_over(&builder, post, "BlogId"), None);
        assert!(builder
            .model()
            .diagnostics()
            .with_code("redundant_index_removed")
            .next()
            .is_some());
    }

    #[test]
    fn test_covers() {
        let a = PropertyId(1);
        let b = PropertyId(2);
        assert!(covers(&[a, b], &[a], false));
        assert!(!covers(&[a, b], &[a], true));
        assert!(covers(&[b, a], &[a, b], true));
        assert!(!covers(&[b, a], &[a, b], false));
    }

    #[test]
    fn test_reapplying_is_idempotent() {
        let mut builder = InternalModelBuilder::new(registry(), ModelConfig::default());
        let blog = builder.entity("Blog", ConfigurationSource::Explicit).unwrap();
        let foreign_key = builder.model().find_navigation(blog, "Posts").unwrap().foreign_key;

        let before = ModelSnapshot::capture(builder.model());
        assert_eq!(foreign_key_added(&mut builder, foreign_key), Some(foreign_key));
        assert_eq!(ModelSnapshot::capture(builder.model()), before);
    }
}
