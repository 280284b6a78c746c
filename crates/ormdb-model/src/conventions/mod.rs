//! Conventions: small handlers that discover and refine metadata in response
//! to model events.
//!
//! Each convention module exposes plain functions with the signature of the
//! event it reacts to. [`ConventionSet::core`] registers them in order and the
//! [`ConventionDispatcher`] invokes them.

mod attributes;
mod backing_field;
mod base_type_discovery;
mod cascade_delete;
mod derived_type_discovery;
mod dispatcher;
mod foreign_key_attribute;
mod foreign_key_index;
mod foreign_key_property_discovery;
mod inverse_property_attribute;
mod key_discovery;
mod model_cleanup;
mod property_discovery;
mod property_mapping_validation;
mod relationship_discovery;
mod service_property_discovery;
mod set;
mod value_generator;

pub use dispatcher::{ConventionBatch, ConventionDispatcher};
pub use set::{
    AddedConvention, AnnotationChangedConvention, BaseTypeChangedConvention, ChangedConvention,
    ConventionSet, EntityTypeIgnoredConvention, FieldChangedConvention,
    ForeignKeyPropertiesChangedConvention, MemberIgnoredConvention,
    ModelAnnotationChangedConvention, ModelBuiltConvention, ModelInitializedConvention,
    NavigationAddedConvention, PrimaryKeyChangedConvention, RemovedConvention,
    RemovedNavigation,
};

use crate::internal::InternalModelBuilder;
use crate::metadata::{MemberShape, PropertyId};

/// The type member backing a non-shadow property.
pub(crate) fn property_member(mb: &InternalModelBuilder, id: PropertyId) -> Option<MemberShape> {
    let property = mb.model.property(id)?;
    if property.is_shadow() {
        return None;
    }
    mb.find_member(property.declaring_entity_type(), property.name())
}
