//! Metadata graph for the model builder.
//!
//! Entity types, properties, keys, indexes and foreign keys live in one arena
//! owned by [`Model`] and reference each other by id.

mod annotations;
mod entity_type;
mod foreign_key;
mod ids;
mod index;
mod key;
mod model;
mod property;
mod service_property;
mod shape;
mod snapshot;
mod source;
mod types;

pub use annotations::{namespaced, Annotation, Annotations};
pub use entity_type::{DefiningNavigation, EntityType};
pub use foreign_key::{ForeignKey, Navigation, NavigationRef, NavigationSide};
pub use ids::{EntityTypeId, ForeignKeyId, IndexId, KeyId, PropertyId};
pub use index::Index;
pub use key::Key;
pub use model::Model;
pub use property::Property;
pub use service_property::ServiceProperty;
pub use shape::{MemberAttribute, MemberShape, MemberType, ServiceKind, TypeRegistry, TypeShape};
pub use snapshot::{
    AnnotationSnapshot, EntityTypeSnapshot, ForeignKeySnapshot, IndexSnapshot, KeySnapshot,
    ModelSnapshot, PropertySnapshot,
};
pub use source::{max_source, ConfigurationSource, Sourced};
pub use types::{DeleteBehavior, PropertyType, ScalarType, ValueGenerated};
