//! Type shapes: the member surface of the types being mapped.
//!
//! Conventions discover properties and navigations by scanning the members
//! of a type. Those members are described up front in a [`TypeRegistry`].

use super::types::{PropertyType, ScalarType, ValueGenerated};
use std::collections::BTreeMap;

/// Kind of runtime service a service property is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ServiceKind {
    /// A delegate that loads navigations on first access.
    LazyLoader,
    /// The owning session/context.
    Context,
    /// The entity type metadata itself.
    EntityType,
}

impl std::fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServiceKind::LazyLoader => write!(f, "lazy loader"),
            ServiceKind::Context => write!(f, "context"),
            ServiceKind::EntityType => write!(f, "entity type"),
        }
    }
}

/// The declared type of a member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemberType {
    /// A required scalar.
    Scalar(ScalarType),
    /// A nullable scalar.
    OptionalScalar(ScalarType),
    /// A required enum.
    Enum {
        /// Name of the enum type.
        name: String,
    },
    /// A nullable enum.
    OptionalEnum {
        /// Name of the enum type.
        name: String,
    },
    /// An array of scalars (not mappable as a property).
    ArrayScalar(ScalarType),
    /// A reference to another type.
    Reference {
        /// Referenced type name.
        entity: String,
    },
    /// A collection of another type.
    Collection {
        /// Element type name.
        entity: String,
    },
    /// A type the model cannot map.
    Opaque {
        /// Type name.
        name: String,
    },
    /// An injectable runtime service.
    Service(ServiceKind),
}

impl MemberType {
    /// The property type and CLR nullability for primitive members.
    pub fn property_type(&self) -> Option<(PropertyType, bool)> {
        match self {
            MemberType::Scalar(scalar) => Some((PropertyType::Scalar(scalar.clone()), false)),
            MemberType::OptionalScalar(scalar) => {
                Some((PropertyType::Scalar(scalar.clone()), true))
            }
            MemberType::Enum { name } => Some((PropertyType::enum_type(name.clone()), false)),
            MemberType::OptionalEnum { name } => {
                Some((PropertyType::enum_type(name.clone()), true))
            }
            _ => None,
        }
    }

    /// Target type name and whether the member is a collection.
    pub fn navigation_target(&self) -> Option<(&str, bool)> {
        match self {
            MemberType::Reference { entity } => Some((entity.as_str(), false)),
            MemberType::Collection { entity } => Some((entity.as_str(), true)),
            _ => None,
        }
    }

    /// Whether this member maps to a scalar property.
    pub fn is_primitive(&self) -> bool {
        self.property_type().is_some()
    }

    /// The service kind for service members.
    pub fn service_kind(&self) -> Option<ServiceKind> {
        match self {
            MemberType::Service(kind) => Some(*kind),
            _ => None,
        }
    }
}

impl std::fmt::Display for MemberType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MemberType::Scalar(scalar) => write!(f, "{scalar}"),
            MemberType::OptionalScalar(scalar) => write!(f, "Option<{scalar}>"),
            MemberType::Enum { name } => write!(f, "{name}"),
            MemberType::OptionalEnum { name } => write!(f, "Option<{name}>"),
            MemberType::ArrayScalar(scalar) => write!(f, "Vec<{scalar}>"),
            MemberType::Reference { entity } => write!(f, "{entity}"),
            MemberType::Collection { entity } => write!(f, "Vec<{entity}>"),
            MemberType::Opaque { name } => write!(f, "{name}"),
            MemberType::Service(kind) => write!(f, "service {kind}"),
        }
    }
}

/// An attribute attached to a member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemberAttribute {
    /// Part of the primary key.
    Key,
    /// Not nullable.
    Required,
    /// Maximum length.
    MaxLength(u32),
    /// Used for optimistic concurrency.
    ConcurrencyCheck,
    /// Excluded from the model.
    NotMapped,
    /// Value generation strategy.
    DatabaseGenerated(ValueGenerated),
    /// Names the foreign key properties (on a navigation) or the navigation (on a property).
    ForeignKey(String),
    /// Names the inverse navigation on the target type.
    InverseProperty(String),
}

/// A member (property or field) of a type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberShape {
    /// Member name.
    pub name: String,
    /// Declared type.
    pub member_type: MemberType,
    /// Static members are never mapped.
    pub is_static: bool,
    /// Whether the member has a getter.
    pub can_read: bool,
    /// Whether the member has a setter.
    pub can_write: bool,
    /// Indexers are never mapped.
    pub is_indexer: bool,
    /// Fields only serve as backing fields.
    pub is_field: bool,
    /// Attached attributes.
    pub attributes: Vec<MemberAttribute>,
}

impl MemberShape {
    /// A readable and writable property member.
    pub fn property(name: impl Into<String>, member_type: MemberType) -> Self {
        Self {
            name: name.into(),
            member_type,
            is_static: false,
            can_read: true,
            can_write: true,
            is_indexer: false,
            is_field: false,
            attributes: Vec::new(),
        }
    }

    /// A backing field member.
    pub fn field(name: impl Into<String>, member_type: MemberType) -> Self {
        Self {
            is_field: true,
            ..Self::property(name, member_type)
        }
    }

    /// Attach an attribute.
    pub fn with_attribute(mut self, attribute: MemberAttribute) -> Self {
        self.attributes.push(attribute);
        self
    }

    /// Mark as static.
    pub fn static_member(mut self) -> Self {
        self.is_static = true;
        self
    }

    /// Remove the setter.
    pub fn read_only(mut self) -> Self {
        self.can_write = false;
        self
    }

    /// Remove the getter.
    pub fn write_only(mut self) -> Self {
        self.can_read = false;
        self
    }

    /// Mark as an indexer.
    pub fn indexer(mut self) -> Self {
        self.is_indexer = true;
        self
    }

    /// Whether the member can be mapped at all.
    ///
    /// Fields are not: they only back properties.
    pub fn is_candidate(&self) -> bool {
        !self.is_static && !self.is_indexer && !self.is_field && self.can_read && self.can_write
    }

    /// Whether the member carries the given attribute.
    pub fn has_attribute(&self, attribute: &MemberAttribute) -> bool {
        self.attributes.contains(attribute)
    }

    /// The name in a `ForeignKey` attribute, if any.
    pub fn foreign_key_attribute(&self) -> Option<&str> {
        self.attributes.iter().find_map(|a| match a {
            MemberAttribute::ForeignKey(name) => Some(name.as_str()),
            _ => None,
        })
    }

    /// The name in an `InverseProperty` attribute, if any.
    pub fn inverse_property_attribute(&self) -> Option<&str> {
        self.attributes.iter().find_map(|a| match a {
            MemberAttribute::InverseProperty(name) => Some(name.as_str()),
            _ => None,
        })
    }

    /// The length in a `MaxLength` attribute, if any.
    pub fn max_length_attribute(&self) -> Option<u32> {
        self.attributes.iter().find_map(|a| match a {
            MemberAttribute::MaxLength(length) => Some(*length),
            _ => None,
        })
    }

    /// The strategy in a `DatabaseGenerated` attribute, if any.
    pub fn database_generated_attribute(&self) -> Option<ValueGenerated> {
        self.attributes.iter().find_map(|a| match a {
            MemberAttribute::DatabaseGenerated(value) => Some(*value),
            _ => None,
        })
    }
}

/// The shape of a mappable type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeShape {
    /// Type name (unique within the registry).
    pub name: String,
    /// Name of the base type, if any.
    pub base: Option<String>,
    /// Members declared on this type (not inherited).
    pub members: Vec<MemberShape>,
    /// Reference navigations to this type become ownerships.
    pub owned: bool,
    /// The type is excluded from the model.
    pub not_mapped: bool,
}

impl TypeShape {
    /// Create a new type shape.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            base: None,
            members: Vec::new(),
            owned: false,
            not_mapped: false,
        }
    }

    /// Set the base type.
    pub fn with_base(mut self, base: impl Into<String>) -> Self {
        self.base = Some(base.into());
        self
    }

    /// Add a member.
    pub fn with_member(mut self, member: MemberShape) -> Self {
        self.members.push(member);
        self
    }

    /// Add a readable and writable property member.
    pub fn with_property(self, name: impl Into<String>, member_type: MemberType) -> Self {
        self.with_member(MemberShape::property(name, member_type))
    }

    /// Add a required scalar property member.
    pub fn with_scalar(self, name: impl Into<String>, scalar: ScalarType) -> Self {
        self.with_property(name, MemberType::Scalar(scalar))
    }

    /// Add a reference navigation member.
    pub fn with_reference(self, name: impl Into<String>, entity: impl Into<String>) -> Self {
        self.with_property(
            name,
            MemberType::Reference {
                entity: entity.into(),
            },
        )
    }

    /// Add a collection navigation member.
    pub fn with_collection(self, name: impl Into<String>, entity: impl Into<String>) -> Self {
        self.with_property(
            name,
            MemberType::Collection {
                entity: entity.into(),
            },
        )
    }

    /// Mark the type as owned.
    pub fn owned(mut self) -> Self {
        self.owned = true;
        self
    }

    /// Mark the type as not mapped.
    pub fn not_mapped(mut self) -> Self {
        self.not_mapped = true;
        self
    }

    /// Get a declared member by name.
    pub fn get_member(&self, name: &str) -> Option<&MemberShape> {
        self.members.iter().find(|m| m.name == name)
    }
}

/// All type shapes known to a modeling session.
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    shapes: BTreeMap<String, TypeShape>,
}

impl TypeRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a shape, replacing any shape with the same name.
    pub fn register(&mut self, shape: TypeShape) {
        self.shapes.insert(shape.name.clone(), shape);
    }

    /// Register a shape (builder style).
    pub fn with_shape(mut self, shape: TypeShape) -> Self {
        self.register(shape);
        self
    }

    /// Get a shape by name.
    pub fn get(&self, name: &str) -> Option<&TypeShape> {
        self.shapes.get(name)
    }

    /// Whether a shape is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.shapes.contains_key(name)
    }

    /// All shapes ordered by name.
    pub fn shapes(&self) -> impl Iterator<Item = &TypeShape> {
        self.shapes.values()
    }

    /// Ancestors of a type, nearest first.
    ///
    /// Stops at unregistered names and at cycles.
    pub fn ancestors(&self, name: &str) -> Vec<&TypeShape> {
        let mut result: Vec<&TypeShape> = Vec::new();
        let mut current = self.get(name).and_then(|s| s.base.as_deref());
        while let Some(base_name) = current {
            let Some(shape) = self.get(base_name) else {
                break;
            };
            if shape.name == name || result.iter().any(|s| s.name == shape.name) {
                break;
            }
            result.push(shape);
            current = shape.base.as_deref();
        }
        result
    }

    /// Whether `derived` is `ancestor` or inherits from it.
    pub fn is_assignable_from(&self, ancestor: &str, derived: &str) -> bool {
        ancestor == derived || self.ancestors(derived).iter().any(|s| s.name == ancestor)
    }

    /// Find a member on the type or any ancestor, nearest first.
    pub fn find_member(&self, type_name: &str, member: &str) -> Option<&MemberShape> {
        let shape = self.get(type_name)?;
        shape
            .get_member(member)
            .or_else(|| {
                self.ancestors(type_name)
                    .into_iter()
                    .find_map(|ancestor| ancestor.get_member(member))
            })
    }

    /// Members of the type and its ancestors up to, not including, `stop`.
    ///
    /// With `stop == None` all inherited members are returned. Members of the
    /// type itself come first; a name already seen hides inherited ones.
    pub fn members_up_to(&self, type_name: &str, stop: Option<&str>) -> Vec<&MemberShape> {
        let Some(shape) = self.get(type_name) else {
            return Vec::new();
        };
        let mut levels = vec![shape];
        for ancestor in self.ancestors(type_name) {
            if Some(ancestor.name.as_str()) == stop {
                break;
            }
            levels.push(ancestor);
        }

        let mut members: Vec<&MemberShape> = Vec::new();
        for level in levels {
            for member in &level.members {
                if !members.iter().any(|m| m.name == member.name) {
                    members.push(member);
                }
            }
        }
        members
    }

    /// All members of the type including inherited ones.
    pub fn all_members(&self, type_name: &str) -> Vec<&MemberShape> {
        self.members_up_to(type_name, None)
    }

    /// Number of registered shapes.
    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> TypeRegistry {
        TypeRegistry::new()
            .with_shape(
                TypeShape::new("Animal")
                    .with_scalar("Id", ScalarType::Int32)
                    .with_scalar("Name", ScalarType::String),
            )
            .with_shape(
                TypeShape::new("Pet")
                    .with_base("Animal")
                    .with_scalar("Name", ScalarType::String)
                    .with_scalar("Chip", ScalarType::Uuid),
            )
            .with_shape(
                TypeShape::new("Dog")
                    .with_base("Pet")
                    .with_scalar("Breed", ScalarType::String),
            )
    }

    #[test]
    fn test_ancestors_nearest_first() {
        let registry = registry();
        let names: Vec<&str> = registry
            .ancestors("Dog")
            .iter()
            .map(|s| s.name.as_str())
            .collect();
        assert_eq!(names, vec!["Pet", "Animal"]);
        assert!(registry.ancestors("Animal").is_empty());
    }

    #[test]
    fn test_assignability() {
        let registry = registry();
        assert!(registry.is_assignable_from("Animal", "Dog"));
        assert!(registry.is_assignable_from("Dog", "Dog"));
        assert!(!registry.is_assignable_from("Dog", "Animal"));
    }

    #[test]
    fn test_members_up_to_stops_at_mapped_ancestor() {
        let registry = registry();
        let names: Vec<&str> = registry
            .members_up_to("Dog", Some("Animal"))
            .iter()
            .map(|m| m.name.as_str())
            .collect();
        assert_eq!(names, vec!["Breed", "Name", "Chip"]);

        let all: Vec<&str> = registry
            .all_members("Dog")
            .iter()
            .map(|m| m.name.as_str())
            .collect();
        assert_eq!(all, vec!["Breed", "Name", "Chip", "Id"]);
    }

    #[test]
    fn test_base_cycle_terminates() {
        let registry = TypeRegistry::new()
            .with_shape(TypeShape::new("A").with_base("B"))
            .with_shape(TypeShape::new("B").with_base("A"));
        assert_eq!(registry.ancestors("A").len(), 1);
    }

    #[test]
    fn test_member_candidates() {
        let member = MemberShape::property("Count", MemberType::Scalar(ScalarType::Int32));
        assert!(member.is_candidate());
        assert!(!member.clone().static_member().is_candidate());
        assert!(!member.clone().write_only().is_candidate());
        assert!(!member.clone().indexer().is_candidate());
        assert!(!MemberShape::field("_count", MemberType::Scalar(ScalarType::Int32)).is_candidate());
    }

    #[test]
    fn test_member_type_classification() {
        let optional = MemberType::OptionalScalar(ScalarType::Int32);
        assert_eq!(
            optional.property_type(),
            Some((PropertyType::Scalar(ScalarType::Int32), true))
        );
        let collection = MemberType::Collection {
            entity: "Post".to_string(),
        };
        assert_eq!(collection.navigation_target(), Some(("Post", true)));
        assert!(!MemberType::ArrayScalar(ScalarType::Int32).is_primitive());
    }
}
