//! Detached, id-free description of a finalized model.
//!
//! Out-of-core consumers (scaffolding, provider mapping) read this instead of
//! the arena. Annotation values are carried as JSON text so the snapshot can be
//! archived with rkyv as well as written as JSON.

use super::annotations::Annotations;
use super::foreign_key::NavigationSide;
use super::model::Model;
use super::source::ConfigurationSource;
use super::types::{DeleteBehavior, PropertyType, ValueGenerated};
use crate::error::ModelError;
use rkyv::{Archive, Deserialize, Serialize};

/// An annotation as name and JSON text.
#[derive(
    Debug, Clone, PartialEq, Archive, Serialize, Deserialize, serde::Serialize, serde::Deserialize,
)]
pub struct AnnotationSnapshot {
    /// Annotation key.
    pub name: String,
    /// JSON encoded value.
    pub value: String,
}

/// A property.
#[derive(
    Debug, Clone, PartialEq, Archive, Serialize, Deserialize, serde::Serialize, serde::Deserialize,
)]
pub struct PropertySnapshot {
    pub name: String,
    pub property_type: PropertyType,
    pub nullable: bool,
    pub shadow: bool,
    pub value_generated: ValueGenerated,
    pub max_length: Option<u32>,
    pub concurrency_token: bool,
    pub field: Option<String>,
    pub source: ConfigurationSource,
    pub annotations: Vec<AnnotationSnapshot>,
}

/// A key or index over named properties.
#[derive(
    Debug, Clone, PartialEq, Archive, Serialize, Deserialize, serde::Serialize, serde::Deserialize,
)]
pub struct KeySnapshot {
    pub properties: Vec<String>,
    pub primary: bool,
    pub annotations: Vec<AnnotationSnapshot>,
}

/// An index.
#[derive(
    Debug, Clone, PartialEq, Archive, Serialize, Deserialize, serde::Serialize, serde::Deserialize,
)]
pub struct IndexSnapshot {
    pub properties: Vec<String>,
    pub unique: bool,
    pub annotations: Vec<AnnotationSnapshot>,
}

/// A foreign key declared on the owning entity type.
#[derive(
    Debug, Clone, PartialEq, Archive, Serialize, Deserialize, serde::Serialize, serde::Deserialize,
)]
pub struct ForeignKeySnapshot {
    pub properties: Vec<String>,
    pub principal_entity_type: String,
    pub principal_key: Vec<String>,
    pub unique: bool,
    pub required: bool,
    pub ownership: bool,
    pub delete_behavior: DeleteBehavior,
    pub dependent_to_principal: Option<String>,
    pub principal_to_dependent: Option<String>,
    pub annotations: Vec<AnnotationSnapshot>,
}

/// An entity type with its declared members.
#[derive(
    Debug, Clone, PartialEq, Archive, Serialize, Deserialize, serde::Serialize, serde::Deserialize,
)]
pub struct EntityTypeSnapshot {
    pub name: String,
    pub clr_type: Option<String>,
    pub base_type: Option<String>,
    pub owner: Option<String>,
    pub properties: Vec<PropertySnapshot>,
    pub keys: Vec<KeySnapshot>,
    pub indexes: Vec<IndexSnapshot>,
    pub foreign_keys: Vec<ForeignKeySnapshot>,
    pub service_properties: Vec<String>,
    pub annotations: Vec<AnnotationSnapshot>,
}

/// The whole model.
#[derive(
    Debug,
    Clone,
    PartialEq,
    Default,
    Archive,
    Serialize,
    Deserialize,
    serde::Serialize,
    serde::Deserialize,
)]
pub struct ModelSnapshot {
    /// Entity types ordered by name.
    pub entity_types: Vec<EntityTypeSnapshot>,
    /// Model annotations.
    pub annotations: Vec<AnnotationSnapshot>,
}

fn annotations(annotations: &Annotations) -> Vec<AnnotationSnapshot> {
    annotations
        .iter()
        .map(|(name, value)| AnnotationSnapshot {
            name: name.to_string(),
            value: value.to_string(),
        })
        .collect()
}

impl ModelSnapshot {
    /// Capture the current state of a model.
    pub fn capture(model: &Model) -> Self {
        let entity_types = model
            .entity_types()
            .into_iter()
            .map(|entity_type| {
                let id = entity_type.id();
                let primary_key = entity_type.declared_primary_key();
                EntityTypeSnapshot {
                    name: entity_type.name().to_string(),
                    clr_type: entity_type.clr_type().map(str::to_string),
                    base_type: entity_type
                        .base_type()
                        .map(|base| model.entity_type_name(base)),
                    owner: entity_type
                        .defining_navigation()
                        .map(|d| model.entity_type_name(d.entity_type)),
                    properties: entity_type
                        .declared_properties()
                        .iter()
                        .filter_map(|p| model.property(*p))
                        .map(|p| PropertySnapshot {
                            name: p.name().to_string(),
                            property_type: p.property_type().clone(),
                            nullable: p.is_nullable(),
                            shadow: p.is_shadow(),
                            value_generated: p.value_generated(),
                            max_length: p.max_length(),
                            concurrency_token: p.is_concurrency_token(),
                            field: p.field_name().map(str::to_string),
                            source: p.configuration_source(),
                            annotations: annotations(p.annotations()),
                        })
                        .collect(),
                    keys: entity_type
                        .declared_keys()
                        .iter()
                        .filter_map(|k| model.key(*k))
                        .map(|k| KeySnapshot {
                            properties: model.property_names(k.properties()),
                            primary: primary_key == Some(k.id()),
                            annotations: annotations(k.annotations()),
                        })
                        .collect(),
                    indexes: entity_type
                        .declared_indexes()
                        .iter()
                        .filter_map(|i| model.index(*i))
                        .map(|i| IndexSnapshot {
                            properties: model.property_names(i.properties()),
                            unique: i.is_unique(),
                            annotations: annotations(i.annotations()),
                        })
                        .collect(),
                    foreign_keys: entity_type
                        .declared_foreign_keys()
                        .iter()
                        .filter_map(|f| model.foreign_key(*f))
                        .map(|f| ForeignKeySnapshot {
                            properties: model.property_names(f.properties()),
                            principal_entity_type: model
                                .entity_type_name(f.principal_entity_type()),
                            principal_key: model
                                .key(f.principal_key())
                                .map(|k| model.property_names(k.properties()))
                                .unwrap_or_default(),
                            unique: f.is_unique(),
                            required: f.is_required(),
                            ownership: f.is_ownership(),
                            delete_behavior: f.delete_behavior(),
                            dependent_to_principal: f
                                .navigation(NavigationSide::DependentToPrincipal)
                                .map(|n| n.name().to_string()),
                            principal_to_dependent: f
                                .navigation(NavigationSide::PrincipalToDependent)
                                .map(|n| n.name().to_string()),
                            annotations: annotations(f.annotations()),
                        })
                        .collect(),
                    service_properties: model
                        .entity_type(id)
                        .map(|e| {
                            e.declared_service_properties()
                                .iter()
                                .map(|s| s.name().to_string())
                                .collect()
                        })
                        .unwrap_or_default(),
                    annotations: annotations(entity_type.annotations()),
                }
            })
            .collect();

        Self {
            entity_types,
            annotations: annotations(model.annotations()),
        }
    }

    /// Get an entity type by name.
    pub fn get_entity_type(&self, name: &str) -> Option<&EntityTypeSnapshot> {
        self.entity_types.iter().find(|e| e.name == name)
    }

    /// List all entity type names.
    pub fn entity_type_names(&self) -> Vec<&str> {
        self.entity_types.iter().map(|e| e.name.as_str()).collect()
    }

    /// Serialize the snapshot to bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, ModelError> {
        rkyv::to_bytes::<rkyv::rancor::Error>(self)
            .map(|v| v.to_vec())
            .map_err(|e| ModelError::Serialization(e.to_string()))
    }

    /// Deserialize a snapshot from bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ModelError> {
        rkyv::from_bytes::<Self, rkyv::rancor::Error>(bytes)
            .map_err(|e| ModelError::Deserialization(e.to_string()))
    }

    /// Serialize the snapshot as pretty JSON.
    pub fn to_json(&self) -> Result<String, ModelError> {
        serde_json::to_string_pretty(self).map_err(|e| ModelError::Serialization(e.to_string()))
    }

    /// Deserialize a snapshot from JSON.
    pub fn from_json(json: &str) -> Result<Self, ModelError> {
        serde_json::from_str(json).map_err(|e| ModelError::Deserialization(e.to_string()))
    }
}

impl EntityTypeSnapshot {
    /// Get a declared property by name.
    pub fn get_property(&self, name: &str) -> Option<&PropertySnapshot> {
        self.properties.iter().find(|p| p.name == name)
    }

    /// The declared primary key, if any.
    pub fn primary_key(&self) -> Option<&KeySnapshot> {
        self.keys.iter().find(|k| k.primary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::types::ScalarType;
    use serde_json::json;

    fn sample_model() -> Model {
        let mut model = Model::new();
        let blog = model.add_entity_type(
            "Blog".to_string(),
            Some("Blog".to_string()),
            None,
            ConfigurationSource::Explicit,
        );
        let id = model
            .add_property(
                blog,
                "Id".to_string(),
                PropertyType::scalar(ScalarType::Int32),
                false,
                false,
                ConfigurationSource::Convention,
            )
            .unwrap();
        let key = model
            .add_key(blog, vec![id], ConfigurationSource::Convention)
            .unwrap();
        model
            .entity_type_mut(blog)
            .unwrap()
            .primary_key
            .set(Some(key), ConfigurationSource::Convention);
        model.annotations.set(
            "Scaffolding:DatabaseName",
            Some(json!("blogging")),
            ConfigurationSource::Explicit,
        );
        model
    }

    #[test]
    fn test_capture() {
        let snapshot = ModelSnapshot::capture(&sample_model());

        assert_eq!(snapshot.entity_type_names(), vec!["Blog"]);
        let blog = snapshot.get_entity_type("Blog").unwrap();
        assert_eq!(blog.primary_key().unwrap().properties, vec!["Id"]);
        assert_eq!(snapshot.annotations[0].value, "\"blogging\"");
    }

    #[test]
    fn test_serialization_roundtrip() {
        let snapshot = ModelSnapshot::capture(&sample_model());

        let bytes = snapshot.to_bytes().unwrap();
        assert_eq!(ModelSnapshot::from_bytes(&bytes).unwrap(), snapshot);

        let json = snapshot.to_json().unwrap();
        assert_eq!(ModelSnapshot::from_json(&json).unwrap(), snapshot);
    }
}
