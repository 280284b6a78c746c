//! Source-aware builders over the metadata arena.
//!
//! Every mutation of the model goes through these builders. They enforce
//! configuration source precedence, keep the graph consistent and fire the
//! convention events. The public fluent surface in [`crate::builder`] is a
//! thin layer over them that always configures at `Explicit`.

mod entity_type_builder;
mod index_builder;
mod key_builder;
mod model_builder;
mod property_builder;
mod relationship_builder;

pub use entity_type_builder::InternalEntityTypeBuilder;
pub use index_builder::InternalIndexBuilder;
pub use key_builder::InternalKeyBuilder;
pub use model_builder::InternalModelBuilder;
pub use property_builder::InternalPropertyBuilder;
pub use relationship_builder::InternalRelationshipBuilder;
