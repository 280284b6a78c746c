//! Diagnostics raised while conventions settle.
//!
//! Discovery never fails on ambiguity. It maps nothing, emits a `tracing`
//! event and records a typed [`Diagnostic`] so callers can inspect what was
//! skipped.

/// Severity of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DiagnosticLevel {
    /// Internal bookkeeping worth tracing.
    Debug,
    /// Discovery skipped something it could not decide.
    Information,
    /// The model is valid but likely not what was intended.
    Warning,
}

/// A diagnostic recorded during model building.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Diagnostic {
    /// More than one property could be the primary key.
    MultiplePrimaryKeyCandidates {
        /// Entity type name.
        entity: String,
        /// First candidate property.
        first: String,
        /// Second candidate property.
        second: String,
    },
    /// More than one navigation pairing is possible between two entity types.
    MultipleNavigationProperties {
        /// Entity type the navigations are declared on.
        entity: String,
        /// Target entity type.
        target: String,
        /// Candidate navigations on `entity`.
        navigations: Vec<String>,
        /// Candidate inverse navigations on `target`.
        inverses: Vec<String>,
    },
    /// A property name matches a foreign key candidate but its type does not.
    IncompatibleMatchingForeignKeyProperties {
        /// Dependent entity type.
        dependent: String,
        /// Candidate dependent properties.
        properties: Vec<String>,
        /// Principal entity type.
        principal: String,
        /// Principal key properties.
        principal_key: Vec<String>,
    },
    /// A shadow foreign key property name depends on discovery order.
    ConflictingShadowForeignKeys {
        /// Dependent entity type.
        dependent: String,
        /// Principal entity type.
        principal: String,
        /// The uniquified shadow property.
        property: String,
    },
    /// A shadow property was created for a foreign key.
    ShadowPropertyCreated {
        /// Entity type name.
        entity: String,
        /// Property name.
        property: String,
    },
    /// A convention index became redundant with a key and was removed.
    RedundantIndexRemoved {
        /// Entity type name.
        entity: String,
        /// Index properties.
        index: Vec<String>,
        /// Covering key properties.
        key: Vec<String>,
    },
}

impl Diagnostic {
    /// The severity of this diagnostic.
    pub fn level(&self) -> DiagnosticLevel {
        match self {
            Diagnostic::MultiplePrimaryKeyCandidates { .. }
            | Diagnostic::MultipleNavigationProperties { .. }
            | Diagnostic::IncompatibleMatchingForeignKeyProperties { .. } => {
                DiagnosticLevel::Information
            }
            Diagnostic::ConflictingShadowForeignKeys { .. } => DiagnosticLevel::Warning,
            Diagnostic::ShadowPropertyCreated { .. } | Diagnostic::RedundantIndexRemoved { .. } => {
                DiagnosticLevel::Debug
            }
        }
    }

    /// A short stable identifier for the diagnostic kind.
    pub fn code(&self) -> &'static str {
        match self {
            Diagnostic::MultiplePrimaryKeyCandidates { .. } => "multiple_primary_key_candidates",
            Diagnostic::MultipleNavigationProperties { .. } => "multiple_navigation_properties",
            Diagnostic::IncompatibleMatchingForeignKeyProperties { .. } => {
                "incompatible_matching_foreign_key_properties"
            }
            Diagnostic::ConflictingShadowForeignKeys { .. } => "conflicting_shadow_foreign_keys",
            Diagnostic::ShadowPropertyCreated { .. } => "shadow_property_created",
            Diagnostic::RedundantIndexRemoved { .. } => "redundant_index_removed",
        }
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Diagnostic::MultiplePrimaryKeyCandidates {
                entity,
                first,
                second,
            } => write!(
                f,
                "the properties {first} and {second} on {entity} are both primary key candidates; no key was configured"
            ),
            Diagnostic::MultipleNavigationProperties {
                entity,
                target,
                navigations,
                inverses,
            } => write!(
                f,
                "no relationship was discovered between {entity} ({}) and {target} ({}) because more than one pairing is possible",
                navigations.join(", "),
                inverses.join(", ")
            ),
            Diagnostic::IncompatibleMatchingForeignKeyProperties {
                dependent,
                properties,
                principal,
                principal_key,
            } => write!(
                f,
                "the foreign key candidate {dependent}({}) was not used because its types do not match {principal}({})",
                properties.join(", "),
                principal_key.join(", ")
            ),
            Diagnostic::ConflictingShadowForeignKeys {
                dependent,
                principal,
                property,
            } => write!(
                f,
                "the shadow foreign key property {dependent}.{property} to {principal} was named by discovery order"
            ),
            Diagnostic::ShadowPropertyCreated { entity, property } => {
                write!(f, "shadow property {entity}.{property} was created")
            }
            Diagnostic::RedundantIndexRemoved { entity, index, key } => write!(
                f,
                "index {entity}({}) was removed because key ({}) covers it",
                index.join(", "),
                key.join(", ")
            ),
        }
    }
}

/// Collects diagnostics for one modeling session.
///
/// Identical diagnostics are recorded once; conventions re-run on settled
/// state and would otherwise repeat themselves.
#[derive(Debug, Clone, Default)]
pub struct DiagnosticsLogger {
    entries: Vec<Diagnostic>,
}

impl DiagnosticsLogger {
    /// Create an empty logger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a diagnostic. Returns false if it had already been recorded.
    pub fn log(&mut self, diagnostic: Diagnostic) -> bool {
        if self.entries.contains(&diagnostic) {
            return false;
        }
        match diagnostic.level() {
            DiagnosticLevel::Debug => {
                tracing::debug!(code = diagnostic.code(), "{}", diagnostic)
            }
            DiagnosticLevel::Information => {
                tracing::info!(code = diagnostic.code(), "{}", diagnostic)
            }
            DiagnosticLevel::Warning => {
                tracing::warn!(code = diagnostic.code(), "{}", diagnostic)
            }
        }
        self.entries.push(diagnostic);
        true
    }

    /// All recorded diagnostics in order.
    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    /// Diagnostics at exactly the given level.
    pub fn at_level(&self, level: DiagnosticLevel) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter().filter(move |d| d.level() == level)
    }

    /// Diagnostics with the given code.
    pub fn with_code<'a>(&'a self, code: &'a str) -> impl Iterator<Item = &'a Diagnostic> {
        self.entries.iter().filter(move |d| d.code() == code)
    }

    /// Whether any warning was recorded.
    pub fn has_warnings(&self) -> bool {
        self.at_level(DiagnosticLevel::Warning).next().is_some()
    }

    /// Number of recorded diagnostics.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_diagnostics_recorded_once() {
        let mut logger = DiagnosticsLogger::new();
        let diagnostic = Diagnostic::MultiplePrimaryKeyCandidates {
            entity: "Order".to_string(),
            first: "ID".to_string(),
            second: "Id".to_string(),
        };

        assert!(logger.log(diagnostic.clone()));
        assert!(!logger.log(diagnostic));
        assert_eq!(logger.len(), 1);
    }

    #[test]
    fn test_levels_and_codes() {
        let mut logger = DiagnosticsLogger::new();
        logger.log(Diagnostic::ConflictingShadowForeignKeys {
            dependent: "Post".to_string(),
            principal: "User".to_string(),
            property: "UserId1".to_string(),
        });
        logger.log(Diagnostic::ShadowPropertyCreated {
            entity: "Post".to_string(),
            property: "UserId1".to_string(),
        });

        assert!(logger.has_warnings());
        assert_eq!(logger.at_level(DiagnosticLevel::Debug).count(), 1);
        assert_eq!(logger.with_code("conflicting_shadow_foreign_keys").count(), 1);
    }

    #[test]
    fn test_display_names_candidates() {
        let diagnostic = Diagnostic::MultiplePrimaryKeyCandidates {
            entity: "Order".to_string(),
            first: "ID".to_string(),
            second: "Id".to_string(),
        };
        let text = diagnostic.to_string();
        assert!(text.contains("Order"));
        assert!(text.contains("ID"));
        assert!(text.contains("Id"));
    }
}
