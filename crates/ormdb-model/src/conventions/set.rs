//! Ordered convention registrations, one list per event kind.

use super::{
    attributes, backing_field, base_type_discovery, cascade_delete, derived_type_discovery,
    foreign_key_attribute, foreign_key_index, foreign_key_property_discovery,
    inverse_property_attribute, key_discovery, model_cleanup, property_discovery,
    property_mapping_validation, relationship_discovery, service_property_discovery,
    value_generator,
};
use crate::config::ModelConfig;
use crate::error::Result;
use crate::internal::InternalModelBuilder;
use crate::metadata::{
    Annotation, EntityType, EntityTypeId, ForeignKey, ForeignKeyId, Index, IndexId, Key, KeyId,
    NavigationSide, Property, PropertyId,
};
use std::rc::Rc;

/// Runs once when the model builder is created.
pub type ModelInitializedConvention = Rc<dyn Fn(&mut InternalModelBuilder)>;

/// Runs when the model is finalized. Errors abort finalization.
pub type ModelBuiltConvention = Rc<dyn Fn(&mut InternalModelBuilder) -> Result<()>>;

/// Reacts to an added element.
///
/// Returning the same id continues the chain, another id amends it, `None`
/// vetoes the addition.
pub type AddedConvention<I> = Rc<dyn Fn(&mut InternalModelBuilder, I) -> Option<I>>;

/// Reacts to a change on an element. Returning `false` stops the chain.
pub type ChangedConvention<I> = Rc<dyn Fn(&mut InternalModelBuilder, I) -> bool>;

/// Reacts to a removed element. Returning `false` stops the chain.
pub type RemovedConvention<T> = Rc<dyn Fn(&mut InternalModelBuilder, &T) -> bool>;

/// Reacts to an ignored entity type name.
pub type EntityTypeIgnoredConvention = Rc<dyn Fn(&mut InternalModelBuilder, &str) -> bool>;

/// Reacts to an ignored member of an entity type.
pub type MemberIgnoredConvention = Rc<dyn Fn(&mut InternalModelBuilder, EntityTypeId, &str) -> bool>;

/// Reacts to a base type change; receives the previous base type.
pub type BaseTypeChangedConvention =
    Rc<dyn Fn(&mut InternalModelBuilder, EntityTypeId, Option<EntityTypeId>) -> bool>;

/// Reacts to a backing field change; receives the previous field name.
pub type FieldChangedConvention =
    Rc<dyn Fn(&mut InternalModelBuilder, PropertyId, Option<&str>) -> bool>;

/// Reacts to an annotation change; receives the annotation name and previous value.
pub type AnnotationChangedConvention<I> =
    Rc<dyn Fn(&mut InternalModelBuilder, I, &str, Option<&Annotation>) -> bool>;

/// Reacts to a model annotation change.
pub type ModelAnnotationChangedConvention =
    Rc<dyn Fn(&mut InternalModelBuilder, &str, Option<&Annotation>) -> bool>;

/// Reacts to a primary key change; receives the previous key properties.
pub type PrimaryKeyChangedConvention =
    Rc<dyn Fn(&mut InternalModelBuilder, EntityTypeId, &[PropertyId]) -> bool>;

/// Reacts to new foreign key properties; receives the previous properties and principal key.
pub type ForeignKeyPropertiesChangedConvention = Rc<
    dyn Fn(&mut InternalModelBuilder, ForeignKeyId, &[PropertyId], KeyId) -> Option<ForeignKeyId>,
>;

/// Reacts to a navigation set on one side of a foreign key.
pub type NavigationAddedConvention =
    Rc<dyn Fn(&mut InternalModelBuilder, ForeignKeyId, NavigationSide) -> Option<ForeignKeyId>>;

/// A navigation that was removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemovedNavigation {
    /// Entity type the navigation was declared on.
    pub declaring_entity_type: EntityTypeId,
    /// Entity type it pointed to.
    pub target_entity_type: EntityTypeId,
    /// Navigation name.
    pub name: String,
    /// The foreign key it belonged to, if that still exists.
    pub foreign_key: Option<ForeignKeyId>,
}

/// Every registered convention, grouped by the event that triggers it.
#[derive(Clone, Default)]
pub struct ConventionSet {
    pub model_initialized: Vec<ModelInitializedConvention>,
    pub model_annotation_changed: Vec<ModelAnnotationChangedConvention>,
    pub model_built: Vec<ModelBuiltConvention>,

    pub entity_type_added: Vec<AddedConvention<EntityTypeId>>,
    pub entity_type_ignored: Vec<EntityTypeIgnoredConvention>,
    pub entity_type_removed: Vec<RemovedConvention<EntityType>>,
    pub entity_type_member_ignored: Vec<MemberIgnoredConvention>,
    pub base_type_changed: Vec<BaseTypeChangedConvention>,

    pub property_added: Vec<AddedConvention<PropertyId>>,
    pub property_removed: Vec<RemovedConvention<Property>>,
    pub property_nullability_changed: Vec<ChangedConvention<PropertyId>>,
    pub property_field_changed: Vec<FieldChangedConvention>,
    pub property_annotation_changed: Vec<AnnotationChangedConvention<PropertyId>>,

    pub key_added: Vec<AddedConvention<KeyId>>,
    pub key_removed: Vec<RemovedConvention<Key>>,
    pub primary_key_changed: Vec<PrimaryKeyChangedConvention>,

    pub index_added: Vec<AddedConvention<IndexId>>,
    pub index_removed: Vec<RemovedConvention<Index>>,
    pub index_uniqueness_changed: Vec<ChangedConvention<IndexId>>,
    pub index_annotation_changed: Vec<AnnotationChangedConvention<IndexId>>,

    pub foreign_key_added: Vec<AddedConvention<ForeignKeyId>>,
    pub foreign_key_removed: Vec<RemovedConvention<ForeignKey>>,
    pub foreign_key_properties_changed: Vec<ForeignKeyPropertiesChangedConvention>,
    pub foreign_key_uniqueness_changed: Vec<AddedConvention<ForeignKeyId>>,
    pub foreign_key_requiredness_changed: Vec<AddedConvention<ForeignKeyId>>,
    pub foreign_key_ownership_changed: Vec<AddedConvention<ForeignKeyId>>,
    pub principal_end_changed: Vec<AddedConvention<ForeignKeyId>>,

    pub navigation_added: Vec<NavigationAddedConvention>,
    pub navigation_removed: Vec<RemovedConvention<RemovedNavigation>>,
}

impl ConventionSet {
    /// A set with no conventions at all.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The built-in conventions, parameterized by `config`.
    pub fn core(config: &ModelConfig) -> Self {
        let discover = config.discover_relationships;
        let mut set = Self::empty();

        set.entity_type_added
            .push(Rc::new(attributes::not_mapped_type_entity_type_added));
        set.entity_type_added
            .push(Rc::new(attributes::not_mapped_member_entity_type_added));
        set.entity_type_added
            .push(Rc::new(base_type_discovery::entity_type_added));
        set.entity_type_added
            .push(Rc::new(property_discovery::entity_type_added));
        set.entity_type_added
            .push(Rc::new(service_property_discovery::entity_type_added));
        set.entity_type_added
            .push(Rc::new(key_discovery::entity_type_added));
        set.entity_type_added
            .push(Rc::new(inverse_property_attribute::entity_type_added));
        if discover {
            set.entity_type_added
                .push(Rc::new(relationship_discovery::entity_type_added));
        }
        set.entity_type_added
            .push(Rc::new(derived_type_discovery::entity_type_added));

        if discover {
            set.entity_type_ignored
                .push(Rc::new(relationship_discovery::entity_type_ignored));
            set.entity_type_removed
                .push(Rc::new(relationship_discovery::entity_type_removed));
        }

        set.entity_type_member_ignored
            .push(Rc::new(key_discovery::member_ignored));
        if discover {
            set.entity_type_member_ignored
                .push(Rc::new(relationship_discovery::member_ignored));
        }

        set.base_type_changed
            .push(Rc::new(property_discovery::base_type_changed));
        set.base_type_changed
            .push(Rc::new(service_property_discovery::base_type_changed));
        set.base_type_changed
            .push(Rc::new(key_discovery::base_type_changed));
        if discover {
            set.base_type_changed
                .push(Rc::new(relationship_discovery::base_type_changed));
        }

        set.property_added
            .push(Rc::new(backing_field::property_added));
        set.property_added
            .push(Rc::new(attributes::key_property_added));
        set.property_added
            .push(Rc::new(attributes::required_property_added));
        set.property_added
            .push(Rc::new(attributes::max_length_property_added));
        set.property_added
            .push(Rc::new(attributes::concurrency_check_property_added));
        set.property_added
            .push(Rc::new(attributes::database_generated_property_added));
        set.property_added
            .push(Rc::new(key_discovery::property_added));
        set.property_added
            .push(Rc::new(foreign_key_property_discovery::property_added));

        set.property_nullability_changed.push(Rc::new(
            foreign_key_property_discovery::property_nullability_changed,
        ));

        set.key_added.push(Rc::new(value_generator::key_added));
        set.key_added.push(Rc::new(foreign_key_index::key_added));
        set.key_removed.push(Rc::new(foreign_key_index::key_removed));

        set.primary_key_changed
            .push(Rc::new(value_generator::primary_key_changed));
        set.primary_key_changed
            .push(Rc::new(foreign_key_property_discovery::primary_key_changed));

        set.foreign_key_added
            .push(Rc::new(foreign_key_attribute::foreign_key_added));
        set.foreign_key_added
            .push(Rc::new(foreign_key_property_discovery::foreign_key_added));
        set.foreign_key_added
            .push(Rc::new(value_generator::foreign_key_added));
        set.foreign_key_added
            .push(Rc::new(foreign_key_index::foreign_key_added));
        set.foreign_key_added
            .push(Rc::new(cascade_delete::foreign_key_added));

        set.foreign_key_removed
            .push(Rc::new(value_generator::foreign_key_removed));
        set.foreign_key_removed
            .push(Rc::new(foreign_key_index::foreign_key_removed));

        set.foreign_key_properties_changed
            .push(Rc::new(key_discovery::foreign_key_properties_changed));
        set.foreign_key_properties_changed
            .push(Rc::new(value_generator::foreign_key_properties_changed));
        set.foreign_key_properties_changed
            .push(Rc::new(foreign_key_index::foreign_key_properties_changed));
        set.foreign_key_properties_changed
            .push(Rc::new(cascade_delete::foreign_key_properties_changed));

        set.foreign_key_uniqueness_changed.push(Rc::new(
            foreign_key_property_discovery::foreign_key_uniqueness_changed,
        ));
        set.foreign_key_uniqueness_changed
            .push(Rc::new(foreign_key_index::foreign_key_uniqueness_changed));

        set.foreign_key_requiredness_changed
            .push(Rc::new(cascade_delete::foreign_key_requiredness_changed));

        set.foreign_key_ownership_changed
            .push(Rc::new(key_discovery::foreign_key_ownership_changed));

        set.principal_end_changed
            .push(Rc::new(foreign_key_property_discovery::principal_end_changed));

        set.navigation_added
            .push(Rc::new(foreign_key_attribute::navigation_added));
        if discover {
            set.navigation_added
                .push(Rc::new(relationship_discovery::navigation_added));
        }
        set.navigation_added
            .push(Rc::new(foreign_key_property_discovery::navigation_added));
        if discover {
            set.navigation_removed
                .push(Rc::new(relationship_discovery::navigation_removed));
        }

        set.model_built
            .push(Rc::new(foreign_key_property_discovery::model_built));
        set.model_built.push(Rc::new(attributes::key_model_built));
        set.model_built
            .push(Rc::new(inverse_property_attribute::model_built));
        set.model_built.push(Rc::new(model_cleanup::model_built));
        set.model_built
            .push(Rc::new(property_mapping_validation::model_built));

        set
    }
}

impl std::fmt::Debug for ConventionSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConventionSet")
            .field("entity_type_added", &self.entity_type_added.len())
            .field("property_added", &self.property_added.len())
            .field("key_added", &self.key_added.len())
            .field("foreign_key_added", &self.foreign_key_added.len())
            .field("navigation_added", &self.navigation_added.len())
            .field("model_built", &self.model_built.len())
            .finish_non_exhaustive()
    }
}
