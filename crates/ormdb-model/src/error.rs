//! Model building error types.

use thiserror::Error;

/// Errors raised while building or validating a model.
///
/// Discovery never fails: conventions back off instead. These errors come from
/// the model-built checkpoint, the final validator, or the fluent surface when
/// an explicitly requested configuration is structurally impossible.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ModelError {
    /// Two relationships compete for the same foreign key properties.
    #[error(
        "ambiguous foreign key property candidates: {first_navigation} and {second_navigation} \
         on {dependent} could both use ({properties})"
    )]
    AmbiguousForeignKeyPropertyCandidates {
        /// Dependent entity type.
        dependent: String,
        /// Navigation (or principal type) of the first relationship.
        first_navigation: String,
        /// Navigation (or principal type) of the second relationship.
        second_navigation: String,
        /// Comma separated candidate properties.
        properties: String,
    },

    /// A composite primary key was declared through member attributes.
    #[error("entity type {entity} has a composite primary key ({properties}) defined with key attributes")]
    CompositePrimaryKeyWithDataAnnotation {
        /// Entity type name.
        entity: String,
        /// Comma separated key properties.
        properties: String,
    },

    /// An inverse property attribute on a self-referencing navigation names the navigation itself.
    #[error("navigation {entity}.{navigation} is self-referencing and names itself as its inverse")]
    SelfReferencingNavigationWithInverseProperty {
        /// Entity type name.
        entity: String,
        /// Navigation name.
        navigation: String,
    },

    /// A primitive member was never added as a property.
    #[error("property {entity}.{property} of type {member_type} was not added to the model")]
    PropertyNotAdded {
        /// Entity type name.
        entity: String,
        /// Member name.
        property: String,
        /// Member type description.
        member_type: String,
    },

    /// A navigation-shaped member was never mapped or ignored.
    #[error("navigation {entity}.{navigation} to {target} was not added to the model and was not ignored")]
    NavigationNotAdded {
        /// Entity type name.
        entity: String,
        /// Member name.
        navigation: String,
        /// Target type name.
        target: String,
    },

    /// A member whose type cannot be mapped.
    #[error("property {entity}.{property} could not be mapped because it is of type {member_type}")]
    PropertyNotMapped {
        /// Entity type name.
        entity: String,
        /// Member name.
        property: String,
        /// Member type description.
        member_type: String,
    },

    /// An entity type without a primary key.
    #[error("entity type {entity} requires a primary key")]
    EntityRequiresPrimaryKey {
        /// Entity type name.
        entity: String,
    },

    /// The dependent end of a one-to-one relationship could not be chosen.
    #[error(
        "the dependent side could not be determined for the one-to-one relationship between \
         {first}.{first_navigation} and {second}.{second_navigation}"
    )]
    AmbiguousDependentSide {
        /// First entity type.
        first: String,
        /// Navigation on the first entity type.
        first_navigation: String,
        /// Second entity type.
        second: String,
        /// Navigation on the second entity type.
        second_navigation: String,
    },

    /// Foreign key and principal key property counts differ.
    #[error(
        "foreign key ({properties}) on {dependent} has {count} properties but the principal key \
         on {principal} has {principal_count}"
    )]
    ForeignKeyCountMismatch {
        /// Dependent entity type.
        dependent: String,
        /// Principal entity type.
        principal: String,
        /// Comma separated foreign key properties.
        properties: String,
        /// Foreign key property count.
        count: usize,
        /// Principal key property count.
        principal_count: usize,
    },

    /// A foreign key property type is incompatible with its principal key property.
    #[error(
        "foreign key property {dependent}.{property} is not compatible with principal key property \
         {principal}.{principal_property}"
    )]
    ForeignKeyTypeMismatch {
        /// Dependent entity type.
        dependent: String,
        /// Dependent property.
        property: String,
        /// Principal entity type.
        principal: String,
        /// Principal property.
        principal_property: String,
    },

    /// A type name is not present in the type registry.
    #[error("type {name} is not registered")]
    TypeNotRegistered {
        /// Type name.
        name: String,
    },

    /// An entity type is not part of the model.
    #[error("entity type {name} not found")]
    EntityTypeNotFound {
        /// Entity type name.
        name: String,
    },

    /// A property is not part of the entity type.
    #[error("property {entity}.{property} not found")]
    PropertyNotFound {
        /// Entity type name.
        entity: String,
        /// Property name.
        property: String,
    },

    /// A navigation is not part of the entity type.
    #[error("navigation {entity}.{navigation} not found")]
    NavigationNotFound {
        /// Entity type name.
        entity: String,
        /// Navigation name.
        navigation: String,
    },

    /// A member cannot be used as the requested navigation.
    #[error("member {entity}.{navigation} cannot be used as a navigation: {reason}")]
    InvalidNavigation {
        /// Entity type name.
        entity: String,
        /// Member name.
        navigation: String,
        /// Why the member is unusable.
        reason: String,
    },

    /// A builder call was rejected by configuration source precedence.
    #[error("{operation} on {target} was rejected by existing configuration")]
    Rejected {
        /// The attempted operation.
        operation: String,
        /// The element being configured.
        target: String,
    },

    /// A warning was raised while warnings are configured as errors.
    #[error("warning treated as error: {message}")]
    WarningAsError {
        /// The warning message.
        message: String,
    },

    /// Snapshot encoding failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Snapshot decoding failed.
    #[error("deserialization error: {0}")]
    Deserialization(String),
}

impl ModelError {
    /// Shorthand for a rejected builder call.
    pub fn rejected(operation: impl Into<String>, target: impl Into<String>) -> Self {
        ModelError::Rejected {
            operation: operation.into(),
            target: target.into(),
        }
    }
}

/// Result alias for model operations.
pub type Result<T> = std::result::Result<T, ModelError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_names_members() {
        let err = ModelError::AmbiguousForeignKeyPropertyCandidates {
            dependent: "Post".to_string(),
            first_navigation: "Author".to_string(),
            second_navigation: "Editor".to_string(),
            properties: "UserId".to_string(),
        };
        let message = err.to_string();
        assert!(message.contains("Author"));
        assert!(message.contains("Editor"));
        assert!(message.contains("UserId"));
    }

    #[test]
    fn test_rejected_shorthand() {
        let err = ModelError::rejected("has_key", "Blog");
        assert_eq!(
            err.to_string(),
            "has_key on Blog was rejected by existing configuration"
        );
    }
}
