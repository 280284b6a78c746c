//! Core value type definitions for the metadata model.

use rkyv::Archive;

/// Scalar data types a property can hold.
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    Hash,
    Archive,
    rkyv::Serialize,
    rkyv::Deserialize,
    serde::Serialize,
    serde::Deserialize,
)]
pub enum ScalarType {
    /// Boolean value.
    Bool,
    /// 16-bit signed integer.
    Int16,
    /// 32-bit signed integer.
    Int32,
    /// 64-bit signed integer.
    Int64,
    /// 32-bit floating point.
    Float32,
    /// 64-bit floating point.
    Float64,
    /// Fixed-precision decimal.
    Decimal {
        /// Total number of digits.
        precision: u8,
        /// Number of digits after decimal point.
        scale: u8,
    },
    /// UTF-8 string.
    String,
    /// Binary data.
    Bytes,
    /// Timestamp (microseconds since Unix epoch).
    Timestamp,
    /// UUID (128-bit identifier).
    Uuid,
}

impl ScalarType {
    /// Check if this type is numeric.
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            ScalarType::Int16
                | ScalarType::Int32
                | ScalarType::Int64
                | ScalarType::Float32
                | ScalarType::Float64
                | ScalarType::Decimal { .. }
        )
    }

    /// Check if this type is an integer.
    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            ScalarType::Int16 | ScalarType::Int32 | ScalarType::Int64
        )
    }

    /// Check if this type is a string-like type.
    pub fn is_string_like(&self) -> bool {
        matches!(self, ScalarType::String | ScalarType::Bytes)
    }
}

impl std::fmt::Display for ScalarType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScalarType::Bool => write!(f, "bool"),
            ScalarType::Int16 => write!(f, "i16"),
            ScalarType::Int32 => write!(f, "i32"),
            ScalarType::Int64 => write!(f, "i64"),
            ScalarType::Float32 => write!(f, "f32"),
            ScalarType::Float64 => write!(f, "f64"),
            ScalarType::Decimal { precision, scale } => write!(f, "decimal({precision},{scale})"),
            ScalarType::String => write!(f, "string"),
            ScalarType::Bytes => write!(f, "bytes"),
            ScalarType::Timestamp => write!(f, "timestamp"),
            ScalarType::Uuid => write!(f, "uuid"),
        }
    }
}

/// The stored type of a property, independent of nullability.
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    Hash,
    Archive,
    rkyv::Serialize,
    rkyv::Deserialize,
    serde::Serialize,
    serde::Deserialize,
)]
pub enum PropertyType {
    /// A scalar value.
    Scalar(ScalarType),
    /// A named enumeration.
    Enum {
        /// Name of the enum type.
        name: String,
    },
}

impl PropertyType {
    /// Create a scalar property type.
    pub fn scalar(scalar: ScalarType) -> Self {
        PropertyType::Scalar(scalar)
    }

    /// Create an enum property type.
    pub fn enum_type(name: impl Into<String>) -> Self {
        PropertyType::Enum { name: name.into() }
    }

    /// Get the inner scalar type if this is not an enum.
    pub fn scalar_type(&self) -> Option<&ScalarType> {
        match self {
            PropertyType::Scalar(scalar) => Some(scalar),
            PropertyType::Enum { .. } => None,
        }
    }

    /// Whether a key property of this type can get values generated on add.
    ///
    /// Strings only qualify when they are the sole key component. Enums never do.
    pub fn supports_generation(&self, sole_component: bool) -> bool {
        match self {
            PropertyType::Scalar(scalar) => match scalar {
                ScalarType::String => sole_component,
                ScalarType::Uuid | ScalarType::Bytes => true,
                other => other.is_numeric(),
            },
            PropertyType::Enum { .. } => false,
        }
    }
}

impl std::fmt::Display for PropertyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PropertyType::Scalar(scalar) => write!(f, "{scalar}"),
            PropertyType::Enum { name } => write!(f, "enum {name}"),
        }
    }
}

/// When a property gets a value generated by the store.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Archive,
    rkyv::Serialize,
    rkyv::Deserialize,
    serde::Serialize,
    serde::Deserialize,
)]
pub enum ValueGenerated {
    /// Values are always supplied by the application.
    #[default]
    Never,
    /// A value is generated when the entity is added.
    OnAdd,
    /// A value is generated when the entity is updated.
    OnUpdate,
    /// A value is generated on add and on update.
    OnAddOrUpdate,
}

/// Behavior when a principal entity is deleted.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Archive,
    rkyv::Serialize,
    rkyv::Deserialize,
    serde::Serialize,
    serde::Deserialize,
)]
pub enum DeleteBehavior {
    /// Delete related entities.
    Cascade,
    /// Prevent deletion if related entities exist.
    Restrict,
    /// Set foreign key to null.
    SetNull,
    /// Set foreign key to null on tracked dependents only.
    #[default]
    ClientSetNull,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_classification() {
        assert!(ScalarType::Int16.is_numeric());
        assert!(ScalarType::Decimal {
            precision: 10,
            scale: 2
        }
        .is_numeric());
        assert!(!ScalarType::Uuid.is_numeric());
        assert!(ScalarType::Int64.is_integer());
        assert!(!ScalarType::Float64.is_integer());
        assert!(ScalarType::Bytes.is_string_like());
    }

    #[test]
    fn test_generation_eligibility() {
        assert!(PropertyType::scalar(ScalarType::Int32).supports_generation(false));
        assert!(PropertyType::scalar(ScalarType::Uuid).supports_generation(false));
        assert!(PropertyType::scalar(ScalarType::Bytes).supports_generation(true));
        assert!(PropertyType::scalar(ScalarType::String).supports_generation(true));
        assert!(!PropertyType::scalar(ScalarType::String).supports_generation(false));
        assert!(!PropertyType::scalar(ScalarType::Bool).supports_generation(true));
        assert!(!PropertyType::enum_type("Status").supports_generation(true));
    }

    #[test]
    fn test_display() {
        assert_eq!(PropertyType::scalar(ScalarType::Int32).to_string(), "i32");
        assert_eq!(PropertyType::enum_type("Status").to_string(), "enum Status");
    }
}
