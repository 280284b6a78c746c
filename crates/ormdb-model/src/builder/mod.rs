//! Fluent model building surface.
//!
//! Every call is applied at [`ConfigurationSource::Explicit`] through the
//! internal builders, so it wins over conventions and attributes. Calls that
//! cannot be applied fail with a [`ModelError`] instead of being ignored.

mod entity_type_builder;
mod index_builder;
mod model_builder;
mod navigation_builder;
mod owned_navigation_builder;
mod property_builder;
mod relationship_builder;

pub use entity_type_builder::EntityTypeBuilder;
pub use index_builder::IndexBuilder;
pub use model_builder::ModelBuilder;
pub use navigation_builder::{CollectionNavigationBuilder, ReferenceNavigationBuilder};
pub use owned_navigation_builder::OwnedNavigationBuilder;
pub use property_builder::PropertyBuilder;
pub use relationship_builder::RelationshipBuilder;

use crate::error::{ModelError, Result};
use crate::internal::InternalModelBuilder;
use crate::metadata::{ConfigurationSource, EntityTypeId, PropertyId};

const EXPLICIT: ConfigurationSource = ConfigurationSource::Explicit;

/// Get or add the named properties on an entity type.
///
/// Names without a backing member must already exist as shadow properties.
fn resolve_properties(
    mb: &mut InternalModelBuilder,
    entity_type: EntityTypeId,
    names: &[&str],
) -> Result<Vec<PropertyId>> {
    names
        .iter()
        .map(|name| {
            mb.entity_builder(entity_type)
                .property(name, EXPLICIT)
                .or_else(|| mb.model().find_property_id(entity_type, name))
                .ok_or_else(|| ModelError::PropertyNotFound {
                    entity: mb.model().entity_type_name(entity_type),
                    property: name.to_string(),
                })
        })
        .collect()
}

/// Display target for rejections, `{Entity}.{member}` or just the entity.
fn target_name(mb: &InternalModelBuilder, entity_type: EntityTypeId, member: Option<&str>) -> String {
    let entity = mb.model().entity_type_name(entity_type);
    match member {
        Some(member) => format!("{entity}.{member}"),
        None => entity,
    }
}
