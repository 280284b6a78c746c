//! ORMDB metadata model builder.
//!
//! Builds the metadata model of an ORM (entity types, properties, keys,
//! indexes, relationships and owned types) from registered type shapes.
//! Conventions discover most of the model as elements are added; explicit
//! configuration through the fluent builders always wins over what they
//! found.
//!
//! # Modules
//!
//! - [`metadata`] - Model arena, entity structs, type shapes and snapshots
//! - [`internal`] - Source-aware builders every mutation goes through
//! - [`conventions`] - Convention set, dispatcher and the core conventions
//! - [`builder`] - Public fluent surface
//! - [`validation`] - Final model validation
//!
//! # Example
//!
//! ```
//! use ormdb_model::{ModelBuilder, ScalarType, TypeRegistry, TypeShape};
//!
//! let registry = TypeRegistry::new()
//!     .with_shape(
//!         TypeShape::new("Blog")
//!             .with_scalar("Id", ScalarType::Int32)
//!             .with_collection("Posts", "Post"),
//!     )
//!     .with_shape(
//!         TypeShape::new("Post")
//!             .with_scalar("Id", ScalarType::Int32)
//!             .with_scalar("BlogId", ScalarType::Int32)
//!             .with_reference("Blog", "Blog"),
//!     );
//!
//! let mut builder = ModelBuilder::new(registry);
//! builder.entity("Blog")?;
//! builder.entity("Post")?.property("BlogId")?.is_required(true)?;
//! let model = builder.finalize()?;
//!
//! let post = model.find_entity_type_id("Post").unwrap();
//! let foreign_key = model.foreign_keys(post)[0];
//! assert_eq!(model.property_names(foreign_key.properties()), vec!["BlogId"]);
//! # Ok::<(), ormdb_model::ModelError>(())
//! ```

pub mod builder;
pub mod config;
pub mod conventions;
pub mod diagnostics;
pub mod error;
pub mod internal;
pub mod metadata;
pub mod validation;

pub use builder::{
    CollectionNavigationBuilder, EntityTypeBuilder, IndexBuilder, ModelBuilder,
    OwnedNavigationBuilder, PropertyBuilder, ReferenceNavigationBuilder, RelationshipBuilder,
};
pub use config::ModelConfig;
pub use conventions::ConventionSet;
pub use diagnostics::{Diagnostic, DiagnosticLevel, DiagnosticsLogger};
pub use error::{ModelError, Result};
pub use internal::InternalModelBuilder;
pub use metadata::{
    ConfigurationSource, DeleteBehavior, EntityType, EntityTypeId, ForeignKey, ForeignKeyId,
    Index, IndexId, Key, KeyId, MemberAttribute, MemberShape, MemberType, Model, ModelSnapshot,
    Navigation, NavigationRef, NavigationSide, Property, PropertyId, PropertyType, ScalarType,
    ServiceKind, ServiceProperty, TypeRegistry, TypeShape, ValueGenerated,
};
pub use validation::ModelValidator;
