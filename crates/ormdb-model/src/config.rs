//! Model building configuration.

/// Default name of the shadow property backing a temporary principal key.
pub const DEFAULT_TEMPORARY_KEY_NAME: &str = "TempId";

/// Configuration for a modeling session.
///
/// Selects and parameterizes the core convention set and the final
/// validation pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelConfig {
    /// Run the model validator when the model is finalized.
    pub validate_on_finalize: bool,

    /// Fail validation for entity types without a primary key.
    pub require_primary_keys: bool,

    /// Name of the shadow property created for temporary principal keys.
    pub temporary_key_name: String,

    /// Turn logged warnings into validation errors.
    pub warnings_as_errors: bool,

    /// Register relationship discovery in the core convention set.
    pub discover_relationships: bool,
}

impl ModelConfig {
    /// Create the default configuration.
    pub fn new() -> Self {
        Self {
            validate_on_finalize: true,
            require_primary_keys: true,
            temporary_key_name: DEFAULT_TEMPORARY_KEY_NAME.to_string(),
            warnings_as_errors: false,
            discover_relationships: true,
        }
    }

    /// Enable or disable validation on finalize.
    pub fn with_validation(mut self, enabled: bool) -> Self {
        self.validate_on_finalize = enabled;
        self
    }

    /// Skip validation on finalize.
    pub fn without_validation(mut self) -> Self {
        self.validate_on_finalize = false;
        self
    }

    /// Require or relax primary keys on every entity type.
    pub fn with_required_primary_keys(mut self, required: bool) -> Self {
        self.require_primary_keys = required;
        self
    }

    /// Set the temporary key property name.
    pub fn with_temporary_key_name(mut self, name: impl Into<String>) -> Self {
        self.temporary_key_name = name.into();
        self
    }

    /// Treat warnings as errors.
    pub fn with_warnings_as_errors(mut self, enabled: bool) -> Self {
        self.warnings_as_errors = enabled;
        self
    }

    /// Disable relationship discovery.
    pub fn without_relationship_discovery(mut self) -> Self {
        self.discover_relationships = false;
        self
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self::new()
    }
}
