//! Conventions driven by member and type attributes.
//!
//! Everything configured here uses the `DataAnnotation` source, so it wins
//! over discovery and loses to explicit configuration.

use super::property_member;
use crate::error::{ModelError, Result};
use crate::internal::InternalModelBuilder;
use crate::metadata::{ConfigurationSource, EntityTypeId, MemberAttribute, PropertyId};

const SOURCE: ConfigurationSource = ConfigurationSource::DataAnnotation;

/// Ignores entity types whose shape is marked not mapped.
pub(crate) fn not_mapped_type_entity_type_added(
    mb: &mut InternalModelBuilder,
    id: EntityTypeId,
) -> Option<EntityTypeId> {
    let entity_type = mb.model.entity_type(id)?;
    let not_mapped = !entity_type.is_weak()
        && entity_type
            .clr_type()
            .and_then(|clr_type| mb.registry.get(clr_type))
            .is_some_and(|shape| shape.not_mapped);
    if not_mapped {
        let name = entity_type.name().to_string();
        mb.ignore(&name, SOURCE);
    }
    mb.model.contains_entity_type(id).then_some(id)
}

/// Ignores members marked not mapped.
pub(crate) fn not_mapped_member_entity_type_added(
    mb: &mut InternalModelBuilder,
    id: EntityTypeId,
) -> Option<EntityTypeId> {
    let ignored: Vec<String> = mb
        .declared_members(id)
        .into_iter()
        .filter(|m| m.has_attribute(&MemberAttribute::NotMapped))
        .map(|m| m.name)
        .collect();
    for name in ignored {
        mb.entity_builder(id).ignore(&name, SOURCE);
    }
    mb.model.contains_entity_type(id).then_some(id)
}

/// Adds properties carrying `Key` to the primary key.
///
/// Several key attributes on one type accumulate into a composite key, which
/// is reported by [`key_model_built`].
pub(crate) fn key_property_added(
    mb: &mut InternalModelBuilder,
    id: PropertyId,
) -> Option<PropertyId> {
    let is_key = property_member(mb, id).is_some_and(|m| m.has_attribute(&MemberAttribute::Key));
    if is_key {
        let entity_type = mb.model.property(id)?.declaring_entity_type();
        let entity = mb.model.entity_type(entity_type)?;
        if entity.base_type().is_none() {
            let mut properties = match entity.primary_key_configuration_source() {
                Some(ConfigurationSource::DataAnnotation) => mb
                    .model
                    .find_primary_key(entity_type)
                    .map(|k| k.properties().to_vec())
                    .unwrap_or_default(),
                _ => Vec::new(),
            };
            let previous = entity.declared_primary_key();
            if !properties.contains(&id) {
                properties.push(id);
            }
            let replaced = mb
                .entity_builder(entity_type)
                .has_primary_key(Some(properties), SOURCE)
                && previous.is_some_and(|k| mb.model.primary_key_id(entity_type) != Some(k));
            if let Some(previous) = previous.filter(|_| replaced) {
                if mb.model.foreign_keys_referencing_key(previous).is_empty() {
                    mb.remove_key(previous, SOURCE);
                }
            }
        }
    }
    mb.model.contains_property(id).then_some(id)
}

pub(crate) fn required_property_added(
    mb: &mut InternalModelBuilder,
    id: PropertyId,
) -> Option<PropertyId> {
    if property_member(mb, id).is_some_and(|m| m.has_attribute(&MemberAttribute::Required)) {
        mb.property_builder(id).is_required(true, SOURCE);
    }
    mb.model.contains_property(id).then_some(id)
}

pub(crate) fn max_length_property_added(
    mb: &mut InternalModelBuilder,
    id: PropertyId,
) -> Option<PropertyId> {
    if let Some(length) = property_member(mb, id).and_then(|m| m.max_length_attribute()) {
        mb.property_builder(id).has_max_length(Some(length), SOURCE);
    }
    mb.model.contains_property(id).then_some(id)
}

pub(crate) fn concurrency_check_property_added(
    mb: &mut InternalModelBuilder,
    id: PropertyId,
) -> Option<PropertyId> {
    if property_member(mb, id)
        .is_some_and(|m| m.has_attribute(&MemberAttribute::ConcurrencyCheck))
    {
        mb.property_builder(id).is_concurrency_token(true, SOURCE);
    }
    mb.model.contains_property(id).then_some(id)
}

pub(crate) fn database_generated_property_added(
    mb: &mut InternalModelBuilder,
    id: PropertyId,
) -> Option<PropertyId> {
    if let Some(value) = property_member(mb, id).and_then(|m| m.database_generated_attribute()) {
        mb.property_builder(id).value_generated(value, SOURCE);
    }
    mb.model.contains_property(id).then_some(id)
}

/// Fails for composite primary keys assembled from key attributes.
pub(crate) fn key_model_built(mb: &mut InternalModelBuilder) -> Result<()> {
    for entity_type in mb.model.entity_types() {
        if entity_type.primary_key_configuration_source() != Some(SOURCE) {
            continue;
        }
        let Some(key) = entity_type
            .declared_primary_key()
            .and_then(|k| mb.model.key(k))
        else {
            continue;
        };
        if key.properties().len() > 1 {
            return Err(ModelError::CompositePrimaryKeyWithDataAnnotation {
                entity: entity_type.name().to_string(),
                properties: mb.model.display_properties(key.properties()),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModelConfig;
    use crate::metadata::{MemberShape, MemberType, ScalarType, TypeRegistry, TypeShape, ValueGenerated};

    fn scalar(name: &str, scalar: ScalarType) -> MemberShape {
        MemberShape::property(name, MemberType::Scalar(scalar))
    }

    fn registry() -> TypeRegistry {
        TypeRegistry::new()
            .with_shape(
                TypeShape::new("Account")
                    .with_member(scalar("Number", ScalarType::Int64).with_attribute(MemberAttribute::Key))
                    .with_member(
                        MemberShape::property("Email", MemberType::OptionalScalar(ScalarType::String))
                            .with_attribute(MemberAttribute::Required)
                            .with_attribute(MemberAttribute::MaxLength(256)),
                    )
                    .with_member(
                        MemberShape::property("Version", MemberType::Scalar(ScalarType::Bytes))
                            .with_attribute(MemberAttribute::ConcurrencyCheck)
                            .with_attribute(MemberAttribute::DatabaseGenerated(
                                ValueGenerated::OnAddOrUpdate,
                            )),
                    ),
            )
            .with_shape(
                TypeShape::new("Line")
                    .with_member(scalar("OrderId", ScalarType::Int32).with_attribute(MemberAttribute::Key))
                    .with_member(scalar("Position", ScalarType::Int32).with_attribute(MemberAttribute::Key)),
            )
    }

    #[test]
    fn test_property_attributes_apply_at_data_annotation() {
        let mut builder = InternalModelBuilder::new(registry(), ModelConfig::default());
        let account = builder.entity("Account", ConfigurationSource::Explicit).unwrap();
        let model = builder.model();

        let key = model.find_primary_key(account).unwrap();
        assert_eq!(model.property_names(key.properties()), vec!["Number"]);
        assert_eq!(
            model.entity_type(account).unwrap().primary_key_configuration_source(),
            Some(ConfigurationSource::DataAnnotation)
        );

        let email = model.find_property(account, "Email").unwrap();
        assert!(!email.is_nullable());
        assert_eq!(email.max_length(), Some(256));

        let version = model.find_property(account, "Version").unwrap();
        assert!(version.is_concurrency_token());
        assert_eq!(version.value_generated(), ValueGenerated::OnAddOrUpdate);
    }

    #[test]
    fn test_explicit_configuration_beats_attributes() {
        let mut builder = InternalModelBuilder::new(registry(), ModelConfig::default());
        let account = builder.entity("Account", ConfigurationSource::Explicit).unwrap();
        let email = builder.model().find_property_id(account, "Email").unwrap();
        assert!(builder
            .property_builder(email)
            .has_max_length(Some(64), ConfigurationSource::Explicit));
        assert!(!builder.property_builder(email).has_max_length(Some(256), SOURCE));
        assert_eq!(builder.model().property(email).unwrap().max_length(), Some(64));
    }

    #[test]
    fn test_composite_key_attributes_fail_at_model_built() {
        let mut builder = InternalModelBuilder::new(registry(), ModelConfig::default());
        let line = builder.entity("Line", ConfigurationSource::Explicit).unwrap();
        assert_eq!(builder.model().find_primary_key(line).unwrap().properties().len(), 2);

        let err = key_model_built(&mut builder).unwrap_err();
        assert!(matches!(
            err,
            ModelError::CompositePrimaryKeyWithDataAnnotation { ref entity, .. } if entity == "Line"
        ));
    }
}
