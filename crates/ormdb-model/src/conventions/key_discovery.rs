//! Discovers primary keys by naming convention.
//!
//! A root entity type without a configured key gets the property named `Id`,
//! or failing that `{Type}Id`, both compared case-insensitively. Two matches
//! for the same pattern leave the type without a key and record a
//! diagnostic. Weak entity types are keyed by their ownership foreign key.

use crate::diagnostics::Diagnostic;
use crate::internal::InternalModelBuilder;
use crate::metadata::{ConfigurationSource, EntityTypeId, ForeignKeyId, KeyId, PropertyId};

pub(crate) fn entity_type_added(
    mb: &mut InternalModelBuilder,
    id: EntityTypeId,
) -> Option<EntityTypeId> {
    try_configure_primary_key(mb, id);
    mb.model.contains_entity_type(id).then_some(id)
}

pub(crate) fn member_ignored(mb: &mut InternalModelBuilder, id: EntityTypeId, _name: &str) -> bool {
    try_configure_primary_key(mb, id);
    true
}

pub(crate) fn base_type_changed(
    mb: &mut InternalModelBuilder,
    id: EntityTypeId,
    _previous: Option<EntityTypeId>,
) -> bool {
    try_configure_primary_key(mb, id);
    true
}

pub(crate) fn property_added(mb: &mut InternalModelBuilder, id: PropertyId) -> Option<PropertyId> {
    let entity_type = mb.model.property(id)?.declaring_entity_type();
    try_configure_primary_key(mb, entity_type);
    mb.model.contains_property(id).then_some(id)
}

pub(crate) fn foreign_key_properties_changed(
    mb: &mut InternalModelBuilder,
    id: ForeignKeyId,
    _previous: &[PropertyId],
    _previous_key: KeyId,
) -> Option<ForeignKeyId> {
    configure_for_ownership(mb, id);
    mb.model.contains_foreign_key(id).then_some(id)
}

pub(crate) fn foreign_key_ownership_changed(
    mb: &mut InternalModelBuilder,
    id: ForeignKeyId,
) -> Option<ForeignKeyId> {
    configure_for_ownership(mb, id);
    mb.model.contains_foreign_key(id).then_some(id)
}

fn configure_for_ownership(mb: &mut InternalModelBuilder, id: ForeignKeyId) {
    let Some(foreign_key) = mb.model.foreign_key(id) else {
        return;
    };
    if foreign_key.is_ownership() {
        let dependent = foreign_key.declaring_entity_type();
        try_configure_primary_key(mb, dependent);
    }
}

fn try_configure_primary_key(mb: &mut InternalModelBuilder, id: EntityTypeId) {
    let Some(entity_type) = mb.model.entity_type(id) else {
        return;
    };
    if entity_type.base_type().is_some()
        || !ConfigurationSource::Convention.overrides(entity_type.primary_key_configuration_source())
    {
        return;
    }

    let has_key = entity_type.declared_primary_key().is_some();
    let candidates = if entity_type.is_weak() {
        ownership_key_properties(mb, id)
    } else {
        discover_key_properties(mb, id)
    };
    match candidates {
        Some(properties) => {
            mb.entity_builder(id)
                .has_primary_key(Some(properties), ConfigurationSource::Convention);
        }
        None if has_key => {
            mb.entity_builder(id)
                .has_primary_key(None, ConfigurationSource::Convention);
        }
        None => {}
    }
}

fn ownership_key_properties(mb: &InternalModelBuilder, id: EntityTypeId) -> Option<Vec<PropertyId>> {
    let owner = mb.model.entity_type(id)?.defining_navigation()?.entity_type;
    mb.model
        .foreign_keys(id)
        .into_iter()
        .find(|f| f.is_ownership() && f.principal_entity_type() == owner)
        .map(|f| f.properties().to_vec())
}

fn discover_key_properties(mb: &mut InternalModelBuilder, id: EntityTypeId) -> Option<Vec<PropertyId>> {
    let entity_type = mb.model.entity_type(id)?;
    let type_key = format!("{}Id", entity_type.short_name());
    let properties: Vec<(PropertyId, String)> = entity_type
        .declared_properties()
        .iter()
        .filter_map(|p| mb.model.property(*p))
        .map(|p| (p.id(), p.name().to_string()))
        .collect();

    let mut candidates: Vec<&(PropertyId, String)> = properties
        .iter()
        .filter(|(_, name)| name.eq_ignore_ascii_case("Id"))
        .collect();
    if candidates.is_empty() {
        candidates = properties
            .iter()
            .filter(|(_, name)| name.eq_ignore_ascii_case(&type_key))
            .collect();
    }

    match candidates.as_slice() {
        [] => None,
        [(property, _)] => Some(vec![*property]),
        [(_, first), (_, second), ..] => {
            let diagnostic = Diagnostic::MultiplePrimaryKeyCandidates {
                entity: mb.model.entity_type_name(id),
                first: first.clone(),
                second: second.clone(),
            };
            mb.log(diagnostic);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModelConfig;
    use crate::metadata::ModelSnapshot;
    use crate::diagnostics::DiagnosticLevel;
    use crate::metadata::{ScalarType, TypeRegistry, TypeShape};

    fn build(shape: TypeShape) -> (InternalModelBuilder, EntityTypeId) {
        let name = shape.name.clone();
        let registry = TypeRegistry::new().with_shape(shape);
        let mut builder = InternalModelBuilder::new(registry, ModelConfig::default());
        let id = builder.entity(&name, ConfigurationSource::Explicit).unwrap();
        (builder, id)
    }

    fn key_names(builder: &InternalModelBuilder, id: EntityTypeId) -> Option<Vec<String>> {
        let model = builder.model();
        model
            .find_primary_key(id)
            .map(|k| model.property_names(k.properties()))
    }

    #[test]
    fn test_id_is_discovered_case_insensitively() {
        let (builder, id) = build(
            TypeShape::new("Customer")
                .with_scalar("ID", ScalarType::Int32)
                .with_scalar("Name", ScalarType::String),
        );
        assert_eq!(key_names(&builder, id), Some(vec!["ID".to_string()]));
    }

    #[test]
    fn test_type_name_id_is_discovered() {
        let (builder, id) = build(
            TypeShape::new("Customer")
                .with_scalar("customerid", ScalarType::Uuid)
                .with_scalar("Name", ScalarType::String),
        );
        assert_eq!(key_names(&builder, id), Some(vec!["customerid".to_string()]));
    }

    #[test]
    fn test_id_wins_over_type_name_id() {
        let (builder, id) = build(
            TypeShape::new("Customer")
                .with_scalar("CustomerId", ScalarType::Int32)
                .with_scalar("Id", ScalarType::Int32),
        );
        assert_eq!(key_names(&builder, id), Some(vec!["Id".to_string()]));
    }

    #[test]
    fn test_case_variant_candidates_leave_no_key() {
        let (builder, id) = build(
            TypeShape::new("Customer")
                .with_scalar("ID", ScalarType::Int32)
                .with_scalar("Id", ScalarType::Int32),
        );
        assert_eq!(key_names(&builder, id), None);

        let logged: Vec<_> = builder
            .model()
            .diagnostics()
            .at_level(DiagnosticLevel::Information)
            .collect();
        assert_eq!(logged.len(), 1);
        assert_eq!(
            logged[0],
            &Diagnostic::MultiplePrimaryKeyCandidates {
                entity: "Customer".to_string(),
                first: "ID".to_string(),
                second: "Id".to_string(),
            }
        );
    }

    #[test]
    fn test_explicit_key_is_never_touched() {
        let (mut builder, id) = build(
            TypeShape::new("Customer")
                .with_scalar("Id", ScalarType::Int32)
                .with_scalar("Code", ScalarType::String),
        );
        let code = builder.model().find_property_id(id, "Code").unwrap();
        assert!(builder
            .entity_builder(id)
            .has_primary_key(Some(vec![code]), ConfigurationSource::Explicit));

        entity_type_added(&mut builder, id).unwrap();
        assert_eq!(key_names(&builder, id), Some(vec!["Code".to_string()]));
    }

    #[test]
    fn test_ignoring_the_key_member_removes_the_key() {
        let (mut builder, id) = build(
            TypeShape::new("Customer")
                .with_scalar("Id", ScalarType::Int32)
                .with_scalar("CustomerId", ScalarType::Int32),
        );
        assert!(builder
            .entity_builder(id)
            .ignore("Id", ConfigurationSource::Explicit));
        assert_eq!(key_names(&builder, id), Some(vec!["CustomerId".to_string()]));
    }

    #[test]
    fn test_rediscovery_is_idempotent() {
        let (mut builder, id) = build(
            TypeShape::new("Customer")
                .with_scalar("Id", ScalarType::Int32)
                .with_scalar("Name", ScalarType::String),
        );
        let before = ModelSnapshot::capture(builder.model());
        assert_eq!(entity_type_added(&mut builder, id), Some(id));
        assert_eq!(ModelSnapshot::capture(builder.model()), before);
    }
}
