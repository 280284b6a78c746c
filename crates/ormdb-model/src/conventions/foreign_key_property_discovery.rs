//! Discovers foreign key properties by naming convention.
//!
//! For a principal key property `K` the dependent is searched for, in order:
//! `{navigation}{K}`, `{principal}{K}` and `{K}`. A tier only matches when
//! every key property finds a counterpart of the same type. One-to-one
//! relationships with a known principal end may also use the dependent's
//! primary key. A one-to-one whose principal can supply the properties while
//! the dependent cannot is inverted.
//!
//! Relationships without matching properties keep convention shadow
//! properties. Shadow foreign keys that lost their candidates to another
//! relationship fail the model built check.

use crate::diagnostics::Diagnostic;
use crate::error::{ModelError, Result};
use crate::internal::InternalModelBuilder;
use crate::metadata::{
    ConfigurationSource, EntityTypeId, ForeignKey, ForeignKeyId, Model, NavigationSide, Property,
    PropertyId,
};
use std::collections::BTreeMap;
use tracing::debug;

pub(crate) fn property_added(mb: &mut InternalModelBuilder, id: PropertyId) -> Option<PropertyId> {
    let entity_type = mb.model.property(id)?.declaring_entity_type();

    let mut foreign_keys = declared_in_hierarchy(&mb.model, entity_type);
    foreign_keys.extend(
        mb.model
            .referencing_foreign_keys(entity_type)
            .into_iter()
            .filter(|f| f.is_unique())
            .map(|f| f.id()),
    );
    for foreign_key in foreign_keys {
        discover(mb, foreign_key);
    }
    mb.model.contains_property(id).then_some(id)
}

pub(crate) fn property_nullability_changed(mb: &mut InternalModelBuilder, id: PropertyId) -> bool {
    for foreign_key in mb.model.foreign_keys_containing(id) {
        let Some(found) = mb.model.foreign_key(foreign_key) else {
            continue;
        };
        if !ConfigurationSource::Convention.overrides(found.required_configuration_source()) {
            continue;
        }
        let required = found
            .properties()
            .iter()
            .filter_map(|p| mb.model.property(*p))
            .all(|p| !p.is_nullable());
        mb.relationship_builder(foreign_key)
            .is_required(required, ConfigurationSource::Convention);
    }
    true
}

pub(crate) fn primary_key_changed(
    mb: &mut InternalModelBuilder,
    id: EntityTypeId,
    _previous: &[PropertyId],
) -> bool {
    let mut scopes = vec![id];
    scopes.extend(mb.model.all_derived_types(id));

    let referencing: Vec<ForeignKeyId> = mb
        .model
        .all_foreign_key_ids()
        .into_iter()
        .filter(|f| {
            mb.model.foreign_key(*f).is_some_and(|f| {
                scopes.contains(&f.principal_entity_type())
                    && ConfigurationSource::Convention
                        .overrides(f.principal_key_configuration_source())
            })
        })
        .collect();
    for foreign_key in referencing {
        let repointed = mb
            .relationship_builder(foreign_key)
            .has_principal_key(None, ConfigurationSource::Convention);
        if let Some(repointed) = repointed {
            discover(mb, repointed);
        }
    }

    for foreign_key in declared_in_hierarchy(&mb.model, id) {
        discover(mb, foreign_key);
    }
    true
}

pub(crate) fn foreign_key_added(
    mb: &mut InternalModelBuilder,
    id: ForeignKeyId,
) -> Option<ForeignKeyId> {
    discover(mb, id)
}

pub(crate) fn foreign_key_uniqueness_changed(
    mb: &mut InternalModelBuilder,
    id: ForeignKeyId,
) -> Option<ForeignKeyId> {
    discover(mb, id)
}

pub(crate) fn principal_end_changed(
    mb: &mut InternalModelBuilder,
    id: ForeignKeyId,
) -> Option<ForeignKeyId> {
    discover(mb, id)
}

pub(crate) fn navigation_added(
    mb: &mut InternalModelBuilder,
    id: ForeignKeyId,
    _side: NavigationSide,
) -> Option<ForeignKeyId> {
    discover(mb, id)
}

/// Fails on shadow foreign keys whose candidates another relationship took,
/// and warns about shadow names that depend on discovery order.
pub(crate) fn model_built(mb: &mut InternalModelBuilder) -> Result<()> {
    let model = &mb.model;
    for id in model.all_foreign_key_ids() {
        let Some(foreign_key) = model.foreign_key(id) else {
            continue;
        };
        if foreign_key.properties_configuration_source().is_some() {
            continue;
        }
        let mut ignored = Vec::new();
        let Some(candidates) = find_candidates(model, id, &mut ignored) else {
            continue;
        };
        let rival = model
            .find_foreign_keys_over(foreign_key.declaring_entity_type(), &candidates)
            .into_iter()
            .filter(|other| *other != id)
            .filter_map(|other| model.foreign_key(other))
            .find(|other| {
                other.properties_configuration_source() == Some(ConfigurationSource::Convention)
                    && model.in_same_line(
                        other.principal_entity_type(),
                        foreign_key.principal_entity_type(),
                    )
            });
        if let Some(rival) = rival {
            return Err(ModelError::AmbiguousForeignKeyPropertyCandidates {
                dependent: model.entity_type_name(foreign_key.declaring_entity_type()),
                first_navigation: relationship_name(model, rival),
                second_navigation: relationship_name(model, foreign_key),
                properties: model.display_properties(&candidates),
            });
        }
    }

    let mut pairs: BTreeMap<(EntityTypeId, EntityTypeId), Vec<ForeignKeyId>> = BTreeMap::new();
    for foreign_key in model
        .all_foreign_key_ids()
        .into_iter()
        .filter_map(|f| model.foreign_key(f))
        .filter(|f| {
            f.properties_configuration_source().is_none() && f.dependent_to_principal().is_none()
        })
    {
        pairs
            .entry((foreign_key.declaring_entity_type(), foreign_key.principal_entity_type()))
            .or_default()
            .push(foreign_key.id());
    }
    let conflicts: Vec<Diagnostic> = pairs
        .into_iter()
        .filter(|(_, foreign_keys)| foreign_keys.len() > 1)
        .flat_map(|((dependent, principal), foreign_keys)| {
            foreign_keys
                .into_iter()
                .skip(1)
                .filter_map(|f| model.foreign_key(f))
                .map(|f| Diagnostic::ConflictingShadowForeignKeys {
                    dependent: model.entity_type_name(dependent),
                    principal: model.entity_type_name(principal),
                    property: model.display_properties(f.properties()),
                })
                .collect::<Vec<_>>()
        })
        .collect();
    for conflict in conflicts {
        mb.log(conflict);
    }
    Ok(())
}

/// Foreign keys declared on the entity type or any of its derived types.
fn declared_in_hierarchy(model: &Model, id: EntityTypeId) -> Vec<ForeignKeyId> {
    let mut scopes = vec![id];
    scopes.extend(model.all_derived_types(id));
    scopes
        .into_iter()
        .filter_map(|scope| model.entity_type(scope))
        .flat_map(|e| e.declared_foreign_keys().to_vec())
        .collect()
}

fn relationship_name(model: &Model, foreign_key: &ForeignKey) -> String {
    match foreign_key.dependent_to_principal() {
        Some(navigation) => navigation.name().to_string(),
        None => model.entity_type_name(foreign_key.principal_entity_type()),
    }
}

enum TierMatch {
    Missing,
    Matched(Vec<PropertyId>),
    Incompatible(Vec<PropertyId>),
}

/// Match `{prefix}{K}` for every principal key property `K` on `entity_type`.
///
/// A key property that already starts with the prefix also matches by its
/// own name. Convention shadow properties never match.
fn match_tier(model: &Model, entity_type: EntityTypeId, prefix: &str, key: &[&Property]) -> TierMatch {
    let candidates: Vec<&Property> = model
        .properties(entity_type)
        .into_iter()
        .filter(|p| !(p.is_shadow() && p.configuration_source() == ConfigurationSource::Convention))
        .collect();
    let find = |name: &str| candidates.iter().find(|p| p.name().eq_ignore_ascii_case(name));

    let mut matched = Vec::with_capacity(key.len());
    let mut compatible = true;
    for key_property in key {
        let name = key_property.name();
        let prefixed = format!("{prefix}{name}");
        let found = find(&prefixed).or_else(|| {
            let carries_prefix = !prefix.is_empty()
                && name.to_lowercase().starts_with(&prefix.to_lowercase());
            carries_prefix.then(|| find(name)).flatten()
        });
        let Some(found) = found else {
            return TierMatch::Missing;
        };
        if matched.contains(&found.id()) {
            return TierMatch::Missing;
        }
        compatible &= found.property_type() == key_property.property_type();
        matched.push(found.id());
    }
    if compatible {
        TierMatch::Matched(matched)
    } else {
        TierMatch::Incompatible(matched)
    }
}

/// The first candidate property set on the dependent, if any.
fn find_candidates(
    model: &Model,
    id: ForeignKeyId,
    diagnostics: &mut Vec<Diagnostic>,
) -> Option<Vec<PropertyId>> {
    let foreign_key = model.foreign_key(id)?;
    let dependent = foreign_key.declaring_entity_type();
    let principal = foreign_key.principal_entity_type();
    let key_ids = model.key(foreign_key.principal_key())?.properties().to_vec();
    let key: Vec<&Property> = key_ids.iter().filter_map(|p| model.property(*p)).collect();
    let dependent_key = model
        .find_primary_key(dependent)
        .map(|k| k.properties().to_vec());
    let key_eligible = foreign_key.is_unique()
        && !foreign_key.is_self_referencing()
        && foreign_key.principal_end_configuration_source().is_some();

    let mut prefixes = Vec::with_capacity(3);
    if let Some(navigation) = foreign_key.dependent_to_principal() {
        prefixes.push(navigation.name().to_string());
    }
    prefixes.push(model.entity_type(principal)?.short_name().to_string());
    prefixes.push(String::new());

    for prefix in prefixes {
        match match_tier(model, dependent, &prefix, &key) {
            TierMatch::Matched(properties) => {
                if !key_eligible && dependent_key.as_deref() == Some(properties.as_slice()) {
                    continue;
                }
                return Some(properties);
            }
            TierMatch::Incompatible(properties) => {
                diagnostics.push(Diagnostic::IncompatibleMatchingForeignKeyProperties {
                    dependent: model.entity_type_name(dependent),
                    properties: model.property_names(&properties),
                    principal: model.entity_type_name(principal),
                    principal_key: model.property_names(&key_ids),
                });
            }
            TierMatch::Missing => {}
        }
    }

    if key_eligible {
        if let Some(dependent_key) = dependent_key {
            if model.property_types(&dependent_key) == model.property_types(&key_ids) {
                return Some(dependent_key);
            }
        }
    }
    None
}

/// Whether the principal could carry the foreign key if the relationship were inverted.
fn principal_has_candidates(model: &Model, foreign_key: &ForeignKey) -> bool {
    let dependent = foreign_key.declaring_entity_type();
    let principal = foreign_key.principal_entity_type();
    let Some(dependent_key) = model.find_primary_key(dependent) else {
        return false;
    };
    let key: Vec<&Property> = dependent_key
        .properties()
        .iter()
        .filter_map(|p| model.property(*p))
        .collect();
    let principal_key = model
        .find_primary_key(principal)
        .map(|k| k.properties().to_vec());
    let Some(dependent_name) = model.entity_type(dependent).map(|e| e.short_name().to_string())
    else {
        return false;
    };

    foreign_key
        .principal_to_dependent()
        .map(|n| n.name().to_string())
        .into_iter()
        .chain(std::iter::once(dependent_name))
        .any(|prefix| match match_tier(model, principal, &prefix, &key) {
            TierMatch::Matched(properties) => principal_key.as_deref() != Some(properties.as_slice()),
            _ => false,
        })
}

fn discover(mb: &mut InternalModelBuilder, id: ForeignKeyId) -> Option<ForeignKeyId> {
    let foreign_key = mb.model.foreign_key(id)?;
    let properties_source = foreign_key.properties_configuration_source();
    if !ConfigurationSource::Convention.overrides(properties_source) {
        return Some(id);
    }
    let current = foreign_key.properties().to_vec();
    let dependent = foreign_key.declaring_entity_type();
    let principal = foreign_key.principal_entity_type();
    // One-to-one with an open choice of dependent.
    let undecided = foreign_key.is_unique()
        && !foreign_key.is_ownership()
        && !foreign_key.is_self_referencing()
        && foreign_key.principal_end_configuration_source().is_none();

    let mut diagnostics = Vec::new();
    let candidates = find_candidates(&mb.model, id, &mut diagnostics);
    for diagnostic in diagnostics {
        mb.log(diagnostic);
    }

    match candidates {
        Some(properties) if properties == current => Some(id),
        Some(properties) => {
            debug!(
                dependent = %mb.model.entity_type_name(dependent),
                properties = %mb.model.display_properties(&properties),
                "foreign key properties discovered"
            );
            let Some(assigned) = mb
                .relationship_builder(id)
                .has_foreign_key(Some(properties), ConfigurationSource::Convention)
            else {
                return mb.model.contains_foreign_key(id).then_some(id);
            };
            if undecided {
                return mb
                    .relationship_builder(assigned)
                    .has_principal_end(principal, ConfigurationSource::Convention);
            }
            Some(assigned)
        }
        None if undecided && principal_has_candidates(&mb.model, mb.model.foreign_key(id)?) => {
            match mb.relationship_builder(id).invert(ConfigurationSource::Convention) {
                Some(inverted) => discover(mb, inverted),
                None => mb.model.contains_foreign_key(id).then_some(id),
            }
        }
        None if properties_source == Some(ConfigurationSource::Convention) => {
            mb.relationship_builder(id).reset_to_shadow_properties()
        }
        None => Some(id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModelConfig;
    use crate::metadata::ModelSnapshot;
    use crate::metadata::{PropertyType, ScalarType, TypeRegistry, TypeShape};

    fn blog_registry(post: TypeShape) -> TypeRegistry {
        TypeRegistry::new()
            .with_shape(
                TypeShape::new("Blog")
                    .with_scalar("Id", ScalarType::Int32)
                    .with_collection("Posts", "Post"),
            )
            .with_shape(post)
    }

    fn foreign_key_names(builder: &InternalModelBuilder, id: ForeignKeyId) -> Vec<String> {
        let model = builder.model();
        model.property_names(model.foreign_key(id).unwrap().properties())
    }

    #[test]
    fn test_blog_post_relationship() {
        let registry = blog_registry(
            TypeShape::new("Post")
                .with_scalar("Id", ScalarType::Int32)
                .with_scalar("BlogId", ScalarType::Int32)
                .with_reference("Blog", "Blog"),
        );
        let mut builder = InternalModelBuilder::new(registry, ModelConfig::default());
        let blog = builder.entity("Blog", ConfigurationSource::Explicit).unwrap();
        let post = builder.model().find_entity_type_id("Post").unwrap();

        let model = builder.model();
        let foreign_keys = model.foreign_keys(post);
        assert_eq!(foreign_keys.len(), 1);
        let foreign_key = foreign_keys[0];
        assert_eq!(foreign_key.principal_entity_type(), blog);
        assert_eq!(Some(foreign_key.principal_key()), model.primary_key_id(blog));
        assert!(!foreign_key.is_unique());
        assert_eq!(foreign_key.dependent_to_principal().unwrap().name(), "Blog");
        assert_eq!(foreign_key.principal_to_dependent().unwrap().name(), "Posts");
        assert_eq!(foreign_key_names(&builder, foreign_key.id()), vec!["BlogId".to_string()]);
        assert_eq!(
            foreign_key.properties_configuration_source(),
            Some(ConfigurationSource::Convention)
        );
    }

    #[test]
    fn test_navigation_prefix_wins() {
        let registry = TypeRegistry::new()
            .with_shape(TypeShape::new("Person").with_scalar("Id", ScalarType::Int32))
            .with_shape(
                TypeShape::new("Post")
                    .with_scalar("Id", ScalarType::Int32)
                    .with_scalar("PersonId", ScalarType::Int32)
                    .with_scalar("WriterId", ScalarType::Int32)
                    .with_reference("Writer", "Person"),
            );
        let mut builder = InternalModelBuilder::new(registry, ModelConfig::default());
        let post = builder.entity("Post", ConfigurationSource::Explicit).unwrap();
        let navigation = builder.model().find_navigation(post, "Writer").unwrap();
        assert_eq!(
            foreign_key_names(&builder, navigation.foreign_key),
            vec!["WriterId".to_string()]
        );
    }

    #[test]
    fn test_incompatible_type_is_logged_and_skipped() {
        let registry = blog_registry(
            TypeShape::new("Post")
                .with_scalar("Id", ScalarType::Int32)
                .with_scalar("BlogId", ScalarType::String)
                .with_reference("Blog", "Blog"),
        );
        let mut builder = InternalModelBuilder::new(registry, ModelConfig::default());
        let blog = builder.entity("Blog", ConfigurationSource::Explicit).unwrap();
        let foreign_key = builder.model().find_navigation(blog, "Posts").unwrap().foreign_key;

        let found = builder.model().foreign_key(foreign_key).unwrap();
        assert_eq!(found.properties_configuration_source(), None);
        assert_ne!(foreign_key_names(&builder, foreign_key), vec!["BlogId".to_string()]);
        assert!(builder
            .model()
            .diagnostics()
            .with_code("incompatible_matching_foreign_key_properties")
            .next()
            .is_some());
    }

    #[test]
    fn test_late_property_is_picked_up() {
        let registry = blog_registry(
            TypeShape::new("Post")
                .with_scalar("Id", ScalarType::Int32)
                .with_reference("Owner", "Blog"),
        );
        let mut builder = InternalModelBuilder::new(registry, ModelConfig::default());
        let blog = builder.entity("Blog", ConfigurationSource::Explicit).unwrap();
        let post = builder.model().find_entity_type_id("Post").unwrap();
        let foreign_key = builder.model().find_navigation(blog, "Posts").unwrap().foreign_key;
        let shadow = builder.model().foreign_key(foreign_key).unwrap().properties()[0];
        assert_eq!(foreign_key_names(&builder, foreign_key), vec!["OwnerId".to_string()]);

        let added = builder
            .entity_builder(post)
            .shadow_property(
                "BlogId",
                PropertyType::scalar(ScalarType::Int32),
                false,
                ConfigurationSource::Explicit,
            )
            .unwrap();
        let found = builder.model().foreign_key(foreign_key).unwrap();
        assert_eq!(found.properties(), [added]);
        assert!(!builder.model().contains_property(shadow));
    }

    fn passport_registry() -> TypeRegistry {
        TypeRegistry::new()
            .with_shape(
                TypeShape::new("Person")
                    .with_scalar("Id", ScalarType::Int32)
                    .with_reference("Passport", "Passport"),
            )
            .with_shape(
                TypeShape::new("Passport")
                    .with_scalar("Id", ScalarType::Int32)
                    .with_scalar("PersonId", ScalarType::Int32)
                    .with_reference("Person", "Person"),
            )
    }

    #[test]
    fn test_one_to_one_dependent_follows_candidates() {
        let mut builder = InternalModelBuilder::new(passport_registry(), ModelConfig::default());
        let person = builder.entity("Person", ConfigurationSource::Explicit).unwrap();
        let passport = builder.model().find_entity_type_id("Passport").unwrap();

        let navigation = builder.model().find_navigation(person, "Passport").unwrap();
        let foreign_key = builder.model().foreign_key(navigation.foreign_key).unwrap();
        assert_eq!(foreign_key.declaring_entity_type(), passport);
        assert!(foreign_key.is_unique());
        assert_eq!(
            foreign_key.principal_end_configuration_source(),
            Some(ConfigurationSource::Convention)
        );
        assert_eq!(
            foreign_key_names(&builder, navigation.foreign_key),
            vec!["PersonId".to_string()]
        );
    }

    #[test]
    fn test_one_to_one_is_inverted() {
        let config = ModelConfig::default().without_relationship_discovery();
        let mut builder = InternalModelBuilder::new(passport_registry(), config);
        let person = builder.entity("Person", ConfigurationSource::Explicit).unwrap();
        let passport = builder.entity("Passport", ConfigurationSource::Explicit).unwrap();

        // Person starts out as the dependent but only Passport has a candidate.
        builder
            .create_relationship(
                passport,
                person,
                Some("Passport"),
                Some("Person"),
                Some(true),
                ConfigurationSource::Convention,
            )
            .unwrap();

        let navigation = builder.model().find_navigation(person, "Passport").unwrap();
        assert_eq!(navigation.side, NavigationSide::PrincipalToDependent);
        let foreign_key = builder.model().foreign_key(navigation.foreign_key).unwrap();
        assert_eq!(foreign_key.declaring_entity_type(), passport);
        assert_eq!(
            foreign_key_names(&builder, navigation.foreign_key),
            vec!["PersonId".to_string()]
        );
        assert!(builder.model().foreign_keys(person).is_empty());
    }

    #[test]
    fn test_claimed_candidates_fail_model_built() {
        let registry = TypeRegistry::new()
            .with_shape(TypeShape::new("Blog").with_scalar("Id", ScalarType::Int32))
            .with_shape(
                TypeShape::new("Post")
                    .with_scalar("Id", ScalarType::Int32)
                    .with_scalar("BlogId", ScalarType::Int32)
                    .with_reference("Author", "Blog")
                    .with_reference("Editor", "Blog"),
            );
        let mut builder = InternalModelBuilder::new(registry, ModelConfig::default());
        builder.entity("Post", ConfigurationSource::Explicit).unwrap();

        let error = model_built(&mut builder).unwrap_err();
        assert_eq!(
            error,
            ModelError::AmbiguousForeignKeyPropertyCandidates {
                dependent: "Post".to_string(),
                first_navigation: "Author".to_string(),
                second_navigation: "Editor".to_string(),
                properties: "BlogId".to_string(),
            }
        );
    }

    #[test]
    fn test_conflicting_shadow_names_warn() {
        let registry = TypeRegistry::new()
            .with_shape(TypeShape::new("Blog").with_scalar("Id", ScalarType::Int32))
            .with_shape(TypeShape::new("Post").with_scalar("Id", ScalarType::Int32));
        let mut builder = InternalModelBuilder::new(registry, ModelConfig::default());
        let blog = builder.entity("Blog", ConfigurationSource::Explicit).unwrap();
        let post = builder.entity("Post", ConfigurationSource::Explicit).unwrap();
        for _ in 0..2 {
            builder
                .create_relationship(blog, post, None, None, None, ConfigurationSource::Explicit)
                .unwrap();
        }

        model_built(&mut builder).unwrap();
        let warnings: Vec<_> = builder
            .model()
            .diagnostics()
            .with_code("conflicting_shadow_foreign_keys")
            .collect();
        assert_eq!(
            warnings,
            vec![&Diagnostic::ConflictingShadowForeignKeys {
                dependent: "Post".to_string(),
                principal: "Blog".to_string(),
                property: "BlogId1".to_string(),
            }]
        );
    }

    #[test]
    fn test_rediscovery_is_idempotent() {
        let registry = blog_registry(
            TypeShape::new("Post")
                .with_scalar("Id", ScalarType::Int32)
                .with_scalar("BlogId", ScalarType::Int32)
                .with_reference("Blog", "Blog"),
        );
        let mut builder = InternalModelBuilder::new(registry, ModelConfig::default());
        let blog = builder.entity("Blog", ConfigurationSource::Explicit).unwrap();
        let id = builder.model().find_navigation(blog, "Posts").unwrap().foreign_key;

        let before = ModelSnapshot::capture(builder.model());
        assert_eq!(foreign_key_added(&mut builder, id), Some(id));
        assert_eq!(ModelSnapshot::capture(builder.model()), before);
    }
}
