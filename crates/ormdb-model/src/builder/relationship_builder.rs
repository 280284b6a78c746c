//! Fluent configuration of one relationship.

use super::{resolve_properties, EXPLICIT};
use crate::error::{ModelError, Result};
use crate::internal::InternalModelBuilder;
use crate::metadata::{DeleteBehavior, EntityTypeId, ForeignKey, ForeignKeyId};
use serde_json::Value;

/// Configures a relationship.
///
/// Some calls rebuild the foreign key, for example when the principal end
/// flips; [`RelationshipBuilder::id`] always returns the current one.
#[derive(Debug)]
pub struct RelationshipBuilder<'a> {
    mb: &'a mut InternalModelBuilder,
    id: ForeignKeyId,
}

impl<'a> RelationshipBuilder<'a> {
    pub(crate) fn new(mb: &'a mut InternalModelBuilder, id: ForeignKeyId) -> Self {
        Self { mb, id }
    }

    /// The current foreign key.
    pub fn id(&self) -> ForeignKeyId {
        self.id
    }

    /// Current metadata of the foreign key.
    pub fn metadata(&self) -> Option<&ForeignKey> {
        self.mb.model().foreign_key(self.id)
    }

    fn foreign_key(&self) -> Result<&ForeignKey> {
        self.metadata()
            .ok_or_else(|| ModelError::rejected("relationship", format!("{:?}", self.id)))
    }

    fn rejected(&self, operation: &str) -> ModelError {
        let model = self.mb.model();
        let target = match model.foreign_key(self.id) {
            Some(f) => format!(
                "{} -> {}",
                model.entity_type_name(f.declaring_entity_type()),
                model.entity_type_name(f.principal_entity_type())
            ),
            None => format!("{:?}", self.id),
        };
        ModelError::rejected(operation, target)
    }

    fn update(&mut self, id: Option<ForeignKeyId>, operation: &str) -> Result<&mut Self> {
        match id {
            Some(id) => {
                self.id = id;
                Ok(self)
            }
            None => Err(self.rejected(operation)),
        }
    }

    fn end(&self, name: &str) -> Result<EntityTypeId> {
        let foreign_key = self.foreign_key()?;
        let id = self
            .mb
            .model()
            .find_entity_type_id(name)
            .ok_or_else(|| ModelError::EntityTypeNotFound {
                name: name.to_string(),
            })?;
        if id != foreign_key.declaring_entity_type() && id != foreign_key.principal_entity_type() {
            return Err(ModelError::rejected(
                "relationship end",
                format!("{name} is not an end of the relationship"),
            ));
        }
        Ok(id)
    }

    /// Make `entity` the principal end, swapping ends when needed.
    pub fn has_principal_end(&mut self, entity: &str) -> Result<&mut Self> {
        let principal = self.end(entity)?;
        let id = self
            .mb
            .relationship_builder(self.id)
            .has_principal_end(principal, EXPLICIT);
        self.update(id, "has_principal_end")
    }

    /// Set the foreign key properties on the dependent end.
    ///
    /// They must match the principal key in count and type.
    pub fn has_foreign_key(&mut self, names: &[&str]) -> Result<&mut Self> {
        let foreign_key = self.foreign_key()?;
        let dependent = foreign_key.declaring_entity_type();
        let principal = foreign_key.principal_entity_type();
        let principal_key = foreign_key.principal_key();
        let properties = resolve_properties(self.mb, dependent, names)?;

        let model = self.mb.model();
        if let Some(key) = model.key(principal_key) {
            let dependent_name = model.entity_type_name(dependent);
            let principal_name = model.entity_type_name(principal);
            if key.properties().len() != properties.len() {
                return Err(ModelError::ForeignKeyCountMismatch {
                    dependent: dependent_name,
                    principal: principal_name,
                    properties: model.display_properties(&properties),
                    count: properties.len(),
                    principal_count: key.properties().len(),
                });
            }
            for (p, k) in properties.iter().zip(key.properties()) {
                let (Some(p), Some(k)) = (model.property(*p), model.property(*k)) else {
                    continue;
                };
                if p.property_type() != k.property_type() {
                    return Err(ModelError::ForeignKeyTypeMismatch {
                        dependent: dependent_name,
                        property: p.name().to_string(),
                        principal: principal_name,
                        principal_property: k.name().to_string(),
                    });
                }
            }
        }

        let id = self
            .mb
            .relationship_builder(self.id)
            .has_foreign_key(Some(properties), EXPLICIT);
        self.update(id, "has_foreign_key")
    }

    /// Pick the dependent end and its foreign key properties in one call.
    pub fn has_foreign_key_on(&mut self, dependent: &str, names: &[&str]) -> Result<&mut Self> {
        let dependent = self.end(dependent)?;
        let foreign_key = self.foreign_key()?;
        let principal = if foreign_key.declaring_entity_type() == dependent {
            foreign_key.principal_entity_type()
        } else {
            foreign_key.declaring_entity_type()
        };
        let id = self
            .mb
            .relationship_builder(self.id)
            .has_principal_end(principal, EXPLICIT);
        self.update(id, "has_foreign_key_on")?;
        self.has_foreign_key(names)
    }

    /// Reference a principal key other than the primary key.
    pub fn has_principal_key(&mut self, names: &[&str]) -> Result<&mut Self> {
        let principal = self.foreign_key()?.principal_entity_type();
        let properties = resolve_properties(self.mb, principal, names)?;
        let id = self
            .mb
            .relationship_builder(self.id)
            .has_principal_key(Some(properties), EXPLICIT);
        self.update(id, "has_principal_key")
    }

    /// Make the relationship required or optional.
    pub fn is_required(&mut self, required: bool) -> Result<&mut Self> {
        let id = self
            .mb
            .relationship_builder(self.id)
            .is_required(required, EXPLICIT);
        self.update(id, "is_required")
    }

    /// Set what happens to dependents when the principal is deleted.
    pub fn on_delete(&mut self, behavior: DeleteBehavior) -> Result<&mut Self> {
        if self
            .mb
            .relationship_builder(self.id)
            .delete_behavior(behavior, EXPLICIT)
        {
            Ok(self)
        } else {
            Err(self.rejected("on_delete"))
        }
    }

    /// Set a foreign key annotation.
    pub fn has_annotation(&mut self, name: &str, value: Value) -> Result<&mut Self> {
        if self
            .mb
            .relationship_builder(self.id)
            .has_annotation(name, Some(value), EXPLICIT)
        {
            Ok(self)
        } else {
            Err(self.rejected("has_annotation"))
        }
    }
}
