//! Fluent configuration of an owned type reached through a navigation.

use super::entity_type_builder::owns_one;
use super::{EntityTypeBuilder, RelationshipBuilder, EXPLICIT};
use crate::error::{ModelError, Result};
use crate::internal::InternalModelBuilder;
use crate::metadata::{EntityTypeId, ForeignKeyId, NavigationSide};

/// Configures a weak entity type and its ownership.
#[derive(Debug)]
pub struct OwnedNavigationBuilder<'a> {
    mb: &'a mut InternalModelBuilder,
    ownership: ForeignKeyId,
}

impl<'a> OwnedNavigationBuilder<'a> {
    pub(crate) fn new(mb: &'a mut InternalModelBuilder, ownership: ForeignKeyId) -> Self {
        Self { mb, ownership }
    }

    /// The weak entity type.
    pub fn owned_entity_type(&self) -> Option<EntityTypeId> {
        self.mb
            .model()
            .foreign_key(self.ownership)
            .map(|f| f.declaring_entity_type())
    }

    fn owned(&self) -> Result<EntityTypeId> {
        self.owned_entity_type()
            .ok_or_else(|| ModelError::rejected("owns_one", format!("{:?}", self.ownership)))
    }

    /// Configure the weak entity type itself.
    pub fn entity(&mut self) -> Result<EntityTypeBuilder<'_>> {
        let id = self.owned()?;
        Ok(EntityTypeBuilder::new(self.mb, id))
    }

    /// Configure the ownership relationship.
    pub fn ownership(&mut self) -> RelationshipBuilder<'_> {
        RelationshipBuilder::new(self.mb, self.ownership)
    }

    /// Map the reference from the owned type back to its owner.
    pub fn with_owner(&mut self, navigation: &str) -> Result<&mut Self> {
        let owned = self.owned()?;
        let id = self.mb.relationship_builder(self.ownership).has_navigation(
            Some(navigation),
            NavigationSide::DependentToPrincipal,
            EXPLICIT,
        );
        match id {
            Some(id) => {
                self.ownership = id;
                Ok(self)
            }
            None => Err(ModelError::rejected(
                "with_owner",
                format!("{}.{navigation}", self.mb.model().entity_type_name(owned)),
            )),
        }
    }

    /// Map a reference on the owned type as a nested owned type.
    pub fn owns_one(&mut self, navigation: &str) -> Result<OwnedNavigationBuilder<'_>> {
        let owned = self.owned()?;
        owns_one(self.mb, owned, navigation)
    }
}
