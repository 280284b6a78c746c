//! First half of a relationship: the navigation on the configured type.

use super::{RelationshipBuilder, EXPLICIT};
use crate::error::{ModelError, Result};
use crate::internal::InternalModelBuilder;
use crate::metadata::{EntityTypeId, ForeignKeyId};

/// Shared state of both navigation builders.
#[derive(Debug)]
struct PendingNavigation<'a> {
    mb: &'a mut InternalModelBuilder,
    entity_type: EntityTypeId,
    navigation: String,
    target: EntityTypeId,
}

impl<'a> PendingNavigation<'a> {
    /// Check that `inverse` on the target is a navigation of the expected kind
    /// pointing back at the configured type.
    fn check_inverse(&self, inverse: &str, collection: bool) -> Result<()> {
        let entity = self.mb.model().entity_type_name(self.target);
        let Some((back, is_collection)) = self.mb.navigation_member(self.target, inverse) else {
            return Err(ModelError::NavigationNotFound {
                entity,
                navigation: inverse.to_string(),
            });
        };
        let reason = if is_collection != collection {
            let kind = if collection { "collection" } else { "reference" };
            format!("not a {kind} navigation")
        } else if !self.mb.is_assignable_to(self.entity_type, &back) {
            format!("points at {back}")
        } else {
            return Ok(());
        };
        Err(ModelError::InvalidNavigation {
            entity,
            navigation: inverse.to_string(),
            reason,
        })
    }

    fn configure(
        self,
        inverse: Option<&str>,
        inverse_is_collection: bool,
        unique: bool,
    ) -> Result<RelationshipBuilder<'a>> {
        if let Some(inverse) = inverse {
            self.check_inverse(inverse, inverse_is_collection)?;
        }
        let target = format!(
            "{}.{}",
            self.mb.model().entity_type_name(self.entity_type),
            self.navigation
        );
        let rejected = || ModelError::rejected("relationship", target.clone());
        let foreign_key: ForeignKeyId = self
            .mb
            .configure_navigation_pair(self.entity_type, &self.navigation, self.target, inverse, EXPLICIT)
            .ok_or_else(rejected)?;
        let foreign_key = self
            .mb
            .relationship_builder(foreign_key)
            .is_unique(unique, EXPLICIT)
            .ok_or_else(rejected)?;
        Ok(RelationshipBuilder::new(self.mb, foreign_key))
    }
}

/// A reference navigation waiting for its inverse.
#[derive(Debug)]
pub struct ReferenceNavigationBuilder<'a> {
    pending: PendingNavigation<'a>,
}

impl<'a> ReferenceNavigationBuilder<'a> {
    pub(crate) fn new(
        mb: &'a mut InternalModelBuilder,
        entity_type: EntityTypeId,
        navigation: String,
        target: EntityTypeId,
    ) -> Self {
        Self {
            pending: PendingNavigation {
                mb,
                entity_type,
                navigation,
                target,
            },
        }
    }

    /// Many-to-one, with an optional collection on the target.
    pub fn with_many(self, inverse: Option<&str>) -> Result<RelationshipBuilder<'a>> {
        self.pending.configure(inverse, true, false)
    }

    /// One-to-one, with an optional reference on the target.
    ///
    /// The dependent end stays undecided until a foreign key or principal end
    /// is configured.
    pub fn with_one(self, inverse: Option<&str>) -> Result<RelationshipBuilder<'a>> {
        self.pending.configure(inverse, false, true)
    }
}

/// A collection navigation waiting for its inverse.
#[derive(Debug)]
pub struct CollectionNavigationBuilder<'a> {
    pending: PendingNavigation<'a>,
}

impl<'a> CollectionNavigationBuilder<'a> {
    pub(crate) fn new(
        mb: &'a mut InternalModelBuilder,
        entity_type: EntityTypeId,
        navigation: String,
        target: EntityTypeId,
    ) -> Self {
        Self {
            pending: PendingNavigation {
                mb,
                entity_type,
                navigation,
                target,
            },
        }
    }

    /// One-to-many, with an optional reference on the target.
    pub fn with_one(self, inverse: Option<&str>) -> Result<RelationshipBuilder<'a>> {
        self.pending.configure(inverse, false, false)
    }
}

#[cfg(test)]
mod tests {
    use crate::builder::ModelBuilder;
    use crate::error::ModelError;
    use crate::metadata::{NavigationSide, ScalarType, TypeRegistry, TypeShape};

    fn registry() -> TypeRegistry {
        TypeRegistry::new()
            .with_shape(
                TypeShape::new("User")
                    .with_scalar("Id", ScalarType::Int32)
                    .with_collection("Written", "Post")
                    .with_collection("Edited", "Post"),
            )
            .with_shape(
                TypeShape::new("Post")
                    .with_scalar("Id", ScalarType::Int32)
                    .with_reference("Author", "User")
                    .with_reference("Editor", "User"),
            )
    }

    #[test]
    fn test_explicit_pairs_resolve_ambiguity() {
        let mut builder = ModelBuilder::new(registry());
        builder.entity("User").unwrap();
        let user = builder.model().find_entity_type_id("User").unwrap();
        assert!(!builder.model().entity_type(user).unwrap().ambiguous_navigations().is_empty());

        builder
            .entity("Post")
            .unwrap()
            .has_one("Author")
            .unwrap()
            .with_many(Some("Written"))
            .unwrap();
        builder
            .entity("User")
            .unwrap()
            .has_many("Edited")
            .unwrap()
            .with_one(Some("Editor"))
            .unwrap();

        let model = builder.finalize().unwrap();
        let post = model.find_entity_type_id("Post").unwrap();
        for (navigation, inverse) in [("Author", "Written"), ("Editor", "Edited")] {
            let found = model.find_navigation(post, navigation).unwrap();
            assert_eq!(found.side, NavigationSide::DependentToPrincipal);
            let foreign_key = model.foreign_key(found.foreign_key).unwrap();
            assert_eq!(
                foreign_key.principal_to_dependent().map(|n| n.name()),
                Some(inverse)
            );
        }
        assert!(model.entity_type(user).unwrap().ambiguous_navigations().is_empty());
    }

    #[test]
    fn test_inverse_must_match() {
        let mut builder = ModelBuilder::new(registry());
        let err = builder
            .entity("Post")
            .unwrap()
            .has_one("Author")
            .unwrap()
            .with_one(Some("Written"))
            .unwrap_err();
        assert!(matches!(err, ModelError::InvalidNavigation { .. }));

        let err = builder
            .entity("Post")
            .unwrap()
            .has_one("Author")
            .unwrap()
            .with_many(Some("Missing"))
            .unwrap_err();
        assert!(matches!(err, ModelError::NavigationNotFound { .. }));
    }
}
