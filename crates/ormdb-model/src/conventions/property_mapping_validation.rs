//! Fails the build for type members that never made it into the model.

use crate::error::{ModelError, Result};
use crate::internal::InternalModelBuilder;

pub(crate) fn model_built(mb: &mut InternalModelBuilder) -> Result<()> {
    for entity_type in mb.model.entity_types() {
        let id = entity_type.id();
        if entity_type.is_shadow() {
            continue;
        }
        for member in mb.declared_members(id) {
            if !member.is_candidate() || member.member_type.service_kind().is_some() {
                continue;
            }
            if mb.model.is_member_mapped(id, &member.name) || mb.model.is_member_ignored(id, &member.name) {
                continue;
            }

            let entity = entity_type.name().to_string();
            if member.member_type.is_primitive() {
                return Err(ModelError::PropertyNotAdded {
                    entity,
                    property: member.name,
                    member_type: member.member_type.to_string(),
                });
            }
            if let Some((target, _)) = member.member_type.navigation_target() {
                if mb.registry.contains(target) {
                    return Err(ModelError::NavigationNotAdded {
                        entity,
                        navigation: member.name.clone(),
                        target: target.to_string(),
                    });
                }
            }
            return Err(ModelError::PropertyNotMapped {
                entity,
                property: member.name.clone(),
                member_type: member.member_type.to_string(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModelConfig;
    use crate::metadata::{ConfigurationSource, MemberShape, MemberType, ScalarType, TypeRegistry, TypeShape};

    fn build(shape: TypeShape) -> InternalModelBuilder {
        let registry = TypeRegistry::new()
            .with_shape(shape)
            .with_shape(TypeShape::new("Tag").with_scalar("Id", ScalarType::Int32));
        let mut builder = InternalModelBuilder::new(registry, ModelConfig::default());
        builder.entity("Item", ConfigurationSource::Explicit).unwrap();
        builder
    }

    #[test]
    fn test_mapped_members_pass() {
        let mut builder = build(
            TypeShape::new("Item")
                .with_scalar("Id", ScalarType::Int32)
                .with_reference("Tag", "Tag")
                .with_member(MemberShape::field("_cache", MemberType::Opaque { name: "Cache".into() }))
                .with_member(
                    MemberShape::property("Blob", MemberType::Opaque { name: "Blob".into() }).write_only(),
                ),
        );
        assert_eq!(model_built(&mut builder), Ok(()));
    }

    #[test]
    fn test_unmapped_opaque_member_fails() {
        let mut builder = build(
            TypeShape::new("Item")
                .with_scalar("Id", ScalarType::Int32)
                .with_property("Shape", MemberType::Opaque { name: "Geometry".into() }),
        );
        assert_eq!(
            model_built(&mut builder),
            Err(ModelError::PropertyNotMapped {
                entity: "Item".into(),
                property: "Shape".into(),
                member_type: "Geometry".into(),
            })
        );
    }

    #[test]
    fn test_removed_property_fails() {
        let mut builder = build(
            TypeShape::new("Item")
                .with_scalar("Id", ScalarType::Int32)
                .with_scalar("Name", ScalarType::String),
        );
        let item = builder.model().find_entity_type_id("Item").unwrap();
        let name = builder.model().find_property_id(item, "Name").unwrap();
        builder
            .remove_property(name, ConfigurationSource::Explicit)
            .unwrap();

        assert!(matches!(
            model_built(&mut builder),
            Err(ModelError::PropertyNotAdded { property, .. }) if property == "Name"
        ));

        assert!(builder
            .entity_builder(item)
            .ignore("Name", ConfigurationSource::Explicit));
        assert_eq!(model_built(&mut builder), Ok(()));
    }

    #[test]
    fn test_unmapped_navigation_fails() {
        let mut builder = build(
            TypeShape::new("Item")
                .with_scalar("Id", ScalarType::Int32)
                .with_reference("Tag", "Tag"),
        );
        let item = builder.model().find_entity_type_id("Item").unwrap();
        let navigation = builder.model().find_navigation(item, "Tag").unwrap();
        builder
            .remove_foreign_key(navigation.foreign_key, ConfigurationSource::Explicit)
            .unwrap();

        assert_eq!(
            model_built(&mut builder),
            Err(ModelError::NavigationNotAdded {
                entity: "Item".into(),
                navigation: "Tag".into(),
                target: "Tag".into(),
            })
        );
    }
}
