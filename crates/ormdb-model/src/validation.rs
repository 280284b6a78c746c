//! Final validation of a finished model.
//!
//! Runs once, after the model built conventions, and reports the first
//! structural problem it finds. Discovery never gets here with an error of its
//! own; anything left unresolved at this point is a configuration the caller
//! has to fix.

use crate::config::ModelConfig;
use crate::diagnostics::DiagnosticLevel;
use crate::error::{ModelError, Result};
use crate::metadata::{ForeignKey, Model, Navigation};
use tracing::{debug, instrument};

/// Validates a finalized model against the session configuration.
#[derive(Debug, Clone, Copy)]
pub struct ModelValidator<'a> {
    config: &'a ModelConfig,
}

impl<'a> ModelValidator<'a> {
    /// Create a validator for the given configuration.
    pub fn new(config: &'a ModelConfig) -> Self {
        Self { config }
    }

    /// Validate the model.
    #[instrument(skip_all)]
    pub fn validate(&self, model: &Model) -> Result<()> {
        if self.config.require_primary_keys {
            self.validate_primary_keys(model)?;
        }
        self.validate_foreign_keys(model)?;
        self.validate_dependent_sides(model)?;
        if self.config.warnings_as_errors {
            self.validate_no_warnings(model)?;
        }
        debug!(
            entity_types = model.entity_type_ids().len(),
            foreign_keys = model.all_foreign_key_ids().len(),
            "model validated"
        );
        Ok(())
    }

    fn validate_primary_keys(&self, model: &Model) -> Result<()> {
        for entity_type in model.entity_types() {
            if entity_type.base_type().is_some() {
                continue;
            }
            if model.find_primary_key(entity_type.id()).is_none() {
                return Err(ModelError::EntityRequiresPrimaryKey {
                    entity: entity_type.name().to_string(),
                });
            }
        }
        Ok(())
    }

    fn validate_foreign_keys(&self, model: &Model) -> Result<()> {
        for id in model.all_foreign_key_ids() {
            let Some(foreign_key) = model.foreign_key(id) else {
                continue;
            };
            let Some(principal_key) = model.key(foreign_key.principal_key()) else {
                continue;
            };
            let dependent = model.entity_type_name(foreign_key.declaring_entity_type());
            let principal = model.entity_type_name(foreign_key.principal_entity_type());

            if foreign_key.properties().len() != principal_key.properties().len() {
                return Err(ModelError::ForeignKeyCountMismatch {
                    dependent,
                    principal,
                    properties: model.display_properties(foreign_key.properties()),
                    count: foreign_key.properties().len(),
                    principal_count: principal_key.properties().len(),
                });
            }
            let pairs = foreign_key
                .properties()
                .iter()
                .zip(principal_key.properties())
                .filter_map(|(d, p)| Some((model.property(*d)?, model.property(*p)?)));
            for (property, principal_property) in pairs {
                if property.property_type() != principal_property.property_type() {
                    return Err(ModelError::ForeignKeyTypeMismatch {
                        dependent,
                        property: property.name().to_string(),
                        principal,
                        principal_property: principal_property.name().to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    fn validate_dependent_sides(&self, model: &Model) -> Result<()> {
        let undecided = model
            .all_foreign_key_ids()
            .into_iter()
            .filter_map(|id| model.foreign_key(id))
            .find(|f| is_undecided(f));
        let Some(foreign_key) = undecided else {
            return Ok(());
        };
        let name = |navigation: Option<&Navigation>| {
            navigation.map(|n| n.name().to_string()).unwrap_or_default()
        };
        Err(ModelError::AmbiguousDependentSide {
            first: model.entity_type_name(foreign_key.declaring_entity_type()),
            first_navigation: name(foreign_key.dependent_to_principal()),
            second: model.entity_type_name(foreign_key.principal_entity_type()),
            second_navigation: name(foreign_key.principal_to_dependent()),
        })
    }

    fn validate_no_warnings(&self, model: &Model) -> Result<()> {
        match model.diagnostics().at_level(DiagnosticLevel::Warning).next() {
            Some(warning) => Err(ModelError::WarningAsError {
                message: warning.to_string(),
            }),
            None => Ok(()),
        }
    }
}

/// A one-to-one relationship whose ends nothing has decided.
fn is_undecided(foreign_key: &ForeignKey) -> bool {
    foreign_key.is_unique()
        && !foreign_key.is_ownership()
        && !foreign_key.is_self_referencing()
        && foreign_key.principal_end_configuration_source().is_none()
        && foreign_key.properties_configuration_source().is_none()
}
