//! Routes metadata events through the registered conventions.
//!
//! Dispatch is synchronous and reentrant: a convention may mutate the model,
//! which fires further events before the outer call returns. While a batch is
//! open events are queued instead and replayed in order once the outermost
//! batch closes.

use super::set::{ConventionSet, RemovedNavigation};
use crate::error::Result;
use crate::internal::InternalModelBuilder;
use crate::metadata::{
    Annotation, EntityType, EntityTypeId, ForeignKey, ForeignKeyId, Index, IndexId, Key, KeyId,
    Model, NavigationSide, Property, PropertyId, Sourced,
};
use std::collections::VecDeque;
use std::ops::{Deref, DerefMut};
use std::rc::Rc;
use tracing::{debug, trace};

/// An event captured while a batch is open.
#[derive(Debug, Clone)]
pub(crate) enum ConventionEvent {
    EntityTypeAdded(EntityTypeId),
    EntityTypeIgnored(String),
    EntityTypeRemoved(Box<EntityType>),
    EntityTypeMemberIgnored(EntityTypeId, String),
    BaseTypeChanged(EntityTypeId, Option<EntityTypeId>),
    PropertyAdded(PropertyId),
    PropertyRemoved(Box<Property>),
    PropertyNullabilityChanged(PropertyId, Sourced<bool>),
    PropertyFieldChanged(PropertyId, Option<String>),
    PropertyAnnotationChanged(PropertyId, String, Option<Annotation>),
    KeyAdded(KeyId),
    KeyRemoved(Key),
    PrimaryKeyChanged(EntityTypeId, Vec<PropertyId>),
    IndexAdded(IndexId),
    IndexRemoved(Index),
    IndexUniquenessChanged(IndexId),
    IndexAnnotationChanged(IndexId, String, Option<Annotation>),
    ForeignKeyAdded(ForeignKeyId),
    ForeignKeyRemoved(Box<ForeignKey>),
    ForeignKeyPropertiesChanged(ForeignKeyId, Vec<PropertyId>, KeyId),
    ForeignKeyUniquenessChanged(ForeignKeyId),
    ForeignKeyRequirednessChanged(ForeignKeyId),
    ForeignKeyOwnershipChanged(ForeignKeyId),
    PrincipalEndChanged(ForeignKeyId),
    NavigationAdded(ForeignKeyId, NavigationSide),
    NavigationRemoved(RemovedNavigation),
    ModelAnnotationChanged(String, Option<Annotation>),
}

impl ConventionEvent {
    fn name(&self) -> &'static str {
        match self {
            ConventionEvent::EntityTypeAdded(_) => "entity_type_added",
            ConventionEvent::EntityTypeIgnored(_) => "entity_type_ignored",
            ConventionEvent::EntityTypeRemoved(_) => "entity_type_removed",
            ConventionEvent::EntityTypeMemberIgnored(..) => "entity_type_member_ignored",
            ConventionEvent::BaseTypeChanged(..) => "base_type_changed",
            ConventionEvent::PropertyAdded(_) => "property_added",
            ConventionEvent::PropertyRemoved(_) => "property_removed",
            ConventionEvent::PropertyNullabilityChanged(..) => "property_nullability_changed",
            ConventionEvent::PropertyFieldChanged(..) => "property_field_changed",
            ConventionEvent::PropertyAnnotationChanged(..) => "property_annotation_changed",
            ConventionEvent::KeyAdded(_) => "key_added",
            ConventionEvent::KeyRemoved(_) => "key_removed",
            ConventionEvent::PrimaryKeyChanged(..) => "primary_key_changed",
            ConventionEvent::IndexAdded(_) => "index_added",
            ConventionEvent::IndexRemoved(_) => "index_removed",
            ConventionEvent::IndexUniquenessChanged(_) => "index_uniqueness_changed",
            ConventionEvent::IndexAnnotationChanged(..) => "index_annotation_changed",
            ConventionEvent::ForeignKeyAdded(_) => "foreign_key_added",
            ConventionEvent::ForeignKeyRemoved(_) => "foreign_key_removed",
            ConventionEvent::ForeignKeyPropertiesChanged(..) => "foreign_key_properties_changed",
            ConventionEvent::ForeignKeyUniquenessChanged(_) => "foreign_key_uniqueness_changed",
            ConventionEvent::ForeignKeyRequirednessChanged(_) => {
                "foreign_key_requiredness_changed"
            }
            ConventionEvent::ForeignKeyOwnershipChanged(_) => "foreign_key_ownership_changed",
            ConventionEvent::PrincipalEndChanged(_) => "principal_end_changed",
            ConventionEvent::NavigationAdded(..) => "navigation_added",
            ConventionEvent::NavigationRemoved(_) => "navigation_removed",
            ConventionEvent::ModelAnnotationChanged(..) => "model_annotation_changed",
        }
    }
}

/// Holds the convention set and the batch queue.
pub struct ConventionDispatcher {
    conventions: Rc<ConventionSet>,
    batch_depth: usize,
    queue: VecDeque<ConventionEvent>,
}

impl ConventionDispatcher {
    /// Create a dispatcher over `conventions`.
    pub fn new(conventions: ConventionSet) -> Self {
        Self {
            conventions: Rc::new(conventions),
            batch_depth: 0,
            queue: VecDeque::new(),
        }
    }

    /// The registered conventions.
    pub fn conventions(&self) -> &ConventionSet {
        &self.conventions
    }

    /// Number of open batches.
    pub fn batch_depth(&self) -> usize {
        self.batch_depth
    }

    /// Number of events waiting for the outermost batch to close.
    pub fn pending_events(&self) -> usize {
        self.queue.len()
    }

    fn enqueue(&mut self, event: ConventionEvent) -> bool {
        if self.batch_depth == 0 {
            return false;
        }
        trace!(event = event.name(), depth = self.batch_depth, "queued convention event");
        self.queue.push_back(event);
        true
    }
}

impl std::fmt::Debug for ConventionDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConventionDispatcher")
            .field("batch_depth", &self.batch_depth)
            .field("pending_events", &self.queue.len())
            .finish()
    }
}

/// An open batch scope.
///
/// Dereferences to the model builder. Dropping the outermost batch replays
/// the queued events.
pub struct ConventionBatch<'a> {
    builder: &'a mut InternalModelBuilder,
}

impl Deref for ConventionBatch<'_> {
    type Target = InternalModelBuilder;

    fn deref(&self) -> &Self::Target {
        self.builder
    }
}

impl DerefMut for ConventionBatch<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.builder
    }
}

impl Drop for ConventionBatch<'_> {
    fn drop(&mut self) {
        self.builder.end_batch();
    }
}

impl InternalModelBuilder {
    /// Open a batch scope. Events are deferred until every scope is closed.
    pub fn start_batch(&mut self) -> ConventionBatch<'_> {
        self.dispatcher.batch_depth += 1;
        trace!(depth = self.dispatcher.batch_depth, "batch opened");
        ConventionBatch { builder: self }
    }

    fn end_batch(&mut self) {
        self.dispatcher.batch_depth = self.dispatcher.batch_depth.saturating_sub(1);
        trace!(depth = self.dispatcher.batch_depth, "batch closed");
        if self.dispatcher.batch_depth > 0 {
            return;
        }
        while let Some(event) = self.dispatcher.queue.pop_front() {
            debug!(event = event.name(), "replaying convention event");
            self.replay(event);
        }
    }

    fn replay(&mut self, event: ConventionEvent) {
        match event {
            ConventionEvent::EntityTypeAdded(id) => {
                self.on_entity_type_added(id);
            }
            ConventionEvent::EntityTypeIgnored(name) => self.on_entity_type_ignored(&name),
            ConventionEvent::EntityTypeRemoved(entity_type) => {
                self.on_entity_type_removed(*entity_type)
            }
            ConventionEvent::EntityTypeMemberIgnored(id, name) => {
                self.on_entity_type_member_ignored(id, &name)
            }
            ConventionEvent::BaseTypeChanged(id, previous) => {
                self.on_base_type_changed(id, previous);
            }
            ConventionEvent::PropertyAdded(id) => {
                self.on_property_added(id);
            }
            ConventionEvent::PropertyRemoved(property) => self.on_property_removed(*property),
            ConventionEvent::PropertyNullabilityChanged(id, previous) => {
                self.on_property_nullability_changed(id, previous);
            }
            ConventionEvent::PropertyFieldChanged(id, previous) => {
                self.on_property_field_changed(id, previous)
            }
            ConventionEvent::PropertyAnnotationChanged(id, name, previous) => {
                self.on_property_annotation_changed(id, name, previous);
            }
            ConventionEvent::KeyAdded(id) => {
                self.on_key_added(id);
            }
            ConventionEvent::KeyRemoved(key) => self.on_key_removed(key),
            ConventionEvent::PrimaryKeyChanged(id, previous) => {
                self.on_primary_key_changed(id, previous)
            }
            ConventionEvent::IndexAdded(id) => {
                self.on_index_added(id);
            }
            ConventionEvent::IndexRemoved(index) => self.on_index_removed(index),
            ConventionEvent::IndexUniquenessChanged(id) => self.on_index_uniqueness_changed(id),
            ConventionEvent::IndexAnnotationChanged(id, name, previous) => {
                self.on_index_annotation_changed(id, name, previous);
            }
            ConventionEvent::ForeignKeyAdded(id) => {
                self.on_foreign_key_added(id);
            }
            ConventionEvent::ForeignKeyRemoved(foreign_key) => {
                self.on_foreign_key_removed(*foreign_key)
            }
            ConventionEvent::ForeignKeyPropertiesChanged(id, previous, key) => {
                self.on_foreign_key_properties_changed(id, previous, key);
            }
            ConventionEvent::ForeignKeyUniquenessChanged(id) => {
                self.on_foreign_key_uniqueness_changed(id);
            }
            ConventionEvent::ForeignKeyRequirednessChanged(id) => {
                self.on_foreign_key_requiredness_changed(id);
            }
            ConventionEvent::ForeignKeyOwnershipChanged(id) => {
                self.on_foreign_key_ownership_changed(id);
            }
            ConventionEvent::PrincipalEndChanged(id) => {
                self.on_principal_end_changed(id);
            }
            ConventionEvent::NavigationAdded(id, side) => {
                self.on_navigation_added(id, side);
            }
            ConventionEvent::NavigationRemoved(navigation) => {
                self.on_navigation_removed(navigation)
            }
            ConventionEvent::ModelAnnotationChanged(name, previous) => {
                self.on_model_annotation_changed(name, previous);
            }
        }
    }

    fn run_added<I: Copy + 'static>(
        &mut self,
        chain: &[super::set::AddedConvention<I>],
        mut element: I,
        exists: impl Fn(&Model, I) -> bool,
    ) -> Option<I> {
        for convention in chain {
            if !exists(&self.model, element) {
                return None;
            }
            element = convention(self, element)?;
        }
        exists(&self.model, element).then_some(element)
    }

    // ---- model ----------------------------------------------------------

    pub(crate) fn on_model_initialized(&mut self) {
        let conventions = Rc::clone(&self.dispatcher.conventions);
        for convention in &conventions.model_initialized {
            convention(self);
        }
    }

    pub(crate) fn on_model_built(&mut self) -> Result<()> {
        let conventions = Rc::clone(&self.dispatcher.conventions);
        debug!(conventions = conventions.model_built.len(), "running model built conventions");
        for convention in &conventions.model_built {
            convention(self)?;
        }
        Ok(())
    }

    pub(crate) fn on_model_annotation_changed(
        &mut self,
        name: String,
        previous: Option<Annotation>,
    ) -> bool {
        if self
            .dispatcher
            .enqueue(ConventionEvent::ModelAnnotationChanged(name.clone(), previous.clone()))
        {
            return true;
        }
        let conventions = Rc::clone(&self.dispatcher.conventions);
        for convention in &conventions.model_annotation_changed {
            if !convention(self, &name, previous.as_ref()) {
                self.model.annotations.restore(&name, previous);
                return false;
            }
        }
        true
    }

    // ---- entity types ---------------------------------------------------

    pub(crate) fn on_entity_type_added(&mut self, id: EntityTypeId) -> Option<EntityTypeId> {
        if self.dispatcher.enqueue(ConventionEvent::EntityTypeAdded(id)) {
            return Some(id);
        }
        let conventions = Rc::clone(&self.dispatcher.conventions);
        let result = self.run_added(&conventions.entity_type_added, id, Model::contains_entity_type);
        if result.is_none() && self.model.contains_entity_type(id) {
            debug!(entity = %self.model.entity_type_name(id), "entity type vetoed");
            self.remove_entity_type(id, crate::metadata::ConfigurationSource::Explicit);
        }
        result
    }

    pub(crate) fn on_entity_type_ignored(&mut self, name: &str) {
        if self
            .dispatcher
            .enqueue(ConventionEvent::EntityTypeIgnored(name.to_string()))
        {
            return;
        }
        let conventions = Rc::clone(&self.dispatcher.conventions);
        for convention in &conventions.entity_type_ignored {
            if !convention(self, name) {
                break;
            }
        }
    }

    pub(crate) fn on_entity_type_removed(&mut self, entity_type: EntityType) {
        if self.dispatcher.batch_depth > 0 {
            self.dispatcher
                .enqueue(ConventionEvent::EntityTypeRemoved(Box::new(entity_type)));
            return;
        }
        let conventions = Rc::clone(&self.dispatcher.conventions);
        for convention in &conventions.entity_type_removed {
            if !convention(self, &entity_type) {
                break;
            }
        }
    }

    pub(crate) fn on_entity_type_member_ignored(&mut self, id: EntityTypeId, name: &str) {
        if self
            .dispatcher
            .enqueue(ConventionEvent::EntityTypeMemberIgnored(id, name.to_string()))
        {
            return;
        }
        let conventions = Rc::clone(&self.dispatcher.conventions);
        for convention in &conventions.entity_type_member_ignored {
            if !self.model.contains_entity_type(id) || !convention(self, id, name) {
                break;
            }
        }
    }

    pub(crate) fn on_base_type_changed(
        &mut self,
        id: EntityTypeId,
        previous: Option<EntityTypeId>,
    ) -> bool {
        if self
            .dispatcher
            .enqueue(ConventionEvent::BaseTypeChanged(id, previous))
        {
            return true;
        }
        let conventions = Rc::clone(&self.dispatcher.conventions);
        for convention in &conventions.base_type_changed {
            if !self.model.contains_entity_type(id) {
                return false;
            }
            if !convention(self, id, previous) {
                if let Some(entity_type) = self.model.entity_type_mut(id) {
                    debug!(entity = %entity_type.name, "base type change vetoed");
                    entity_type.base_type.reset(previous);
                }
                return false;
            }
        }
        true
    }

    // ---- properties -----------------------------------------------------

    pub(crate) fn on_property_added(&mut self, id: PropertyId) -> Option<PropertyId> {
        if self.dispatcher.enqueue(ConventionEvent::PropertyAdded(id)) {
            return Some(id);
        }
        let conventions = Rc::clone(&self.dispatcher.conventions);
        let result = self.run_added(&conventions.property_added, id, Model::contains_property);
        if result.is_none() && self.model.contains_property(id) {
            self.remove_property(id, crate::metadata::ConfigurationSource::Explicit);
        }
        result
    }

    pub(crate) fn on_property_removed(&mut self, property: Property) {
        if self.dispatcher.batch_depth > 0 {
            self.dispatcher
                .enqueue(ConventionEvent::PropertyRemoved(Box::new(property)));
            return;
        }
        let conventions = Rc::clone(&self.dispatcher.conventions);
        for convention in &conventions.property_removed {
            if !convention(self, &property) {
                break;
            }
        }
    }

    pub(crate) fn on_property_nullability_changed(
        &mut self,
        id: PropertyId,
        previous: Sourced<bool>,
    ) -> bool {
        if self
            .dispatcher
            .enqueue(ConventionEvent::PropertyNullabilityChanged(id, previous.clone()))
        {
            return true;
        }
        let conventions = Rc::clone(&self.dispatcher.conventions);
        for convention in &conventions.property_nullability_changed {
            if !self.model.contains_property(id) {
                return false;
            }
            if !convention(self, id) {
                if let Some(property) = self.model.property_mut(id) {
                    property.nullable = previous;
                }
                return false;
            }
        }
        true
    }

    pub(crate) fn on_property_field_changed(&mut self, id: PropertyId, previous: Option<String>) {
        if self
            .dispatcher
            .enqueue(ConventionEvent::PropertyFieldChanged(id, previous.clone()))
        {
            return;
        }
        let conventions = Rc::clone(&self.dispatcher.conventions);
        for convention in &conventions.property_field_changed {
            if !self.model.contains_property(id) || !convention(self, id, previous.as_deref()) {
                break;
            }
        }
    }

    pub(crate) fn on_property_annotation_changed(
        &mut self,
        id: PropertyId,
        name: String,
        previous: Option<Annotation>,
    ) -> bool {
        if self.dispatcher.enqueue(ConventionEvent::PropertyAnnotationChanged(
            id,
            name.clone(),
            previous.clone(),
        )) {
            return true;
        }
        let conventions = Rc::clone(&self.dispatcher.conventions);
        for convention in &conventions.property_annotation_changed {
            if !self.model.contains_property(id) {
                return false;
            }
            if !convention(self, id, &name, previous.as_ref()) {
                if let Some(property) = self.model.property_mut(id) {
                    property.annotations.restore(&name, previous);
                }
                return false;
            }
        }
        true
    }

    // ---- keys -----------------------------------------------------------

    pub(crate) fn on_key_added(&mut self, id: KeyId) -> Option<KeyId> {
        if self.dispatcher.enqueue(ConventionEvent::KeyAdded(id)) {
            return Some(id);
        }
        let conventions = Rc::clone(&self.dispatcher.conventions);
        let result = self.run_added(&conventions.key_added, id, Model::contains_key);
        if result.is_none() && self.model.contains_key(id) {
            self.remove_key(id, crate::metadata::ConfigurationSource::Explicit);
        }
        result
    }

    pub(crate) fn on_key_removed(&mut self, key: Key) {
        if self.dispatcher.enqueue(ConventionEvent::KeyRemoved(key.clone())) {
            return;
        }
        let conventions = Rc::clone(&self.dispatcher.conventions);
        for convention in &conventions.key_removed {
            if !convention(self, &key) {
                break;
            }
        }
    }

    pub(crate) fn on_primary_key_changed(&mut self, id: EntityTypeId, previous: Vec<PropertyId>) {
        if self
            .dispatcher
            .enqueue(ConventionEvent::PrimaryKeyChanged(id, previous.clone()))
        {
            return;
        }
        let conventions = Rc::clone(&self.dispatcher.conventions);
        for convention in &conventions.primary_key_changed {
            if !self.model.contains_entity_type(id) || !convention(self, id, &previous) {
                break;
            }
        }
    }

    // ---- indexes --------------------------------------------------------

    pub(crate) fn on_index_added(&mut self, id: IndexId) -> Option<IndexId> {
        if self.dispatcher.enqueue(ConventionEvent::IndexAdded(id)) {
            return Some(id);
        }
        let conventions = Rc::clone(&self.dispatcher.conventions);
        let result = self.run_added(&conventions.index_added, id, Model::contains_index);
        if result.is_none() && self.model.contains_index(id) {
            self.remove_index(id, crate::metadata::ConfigurationSource::Explicit);
        }
        result
    }

    pub(crate) fn on_index_removed(&mut self, index: Index) {
        if self.dispatcher.enqueue(ConventionEvent::IndexRemoved(index.clone())) {
            return;
        }
        let conventions = Rc::clone(&self.dispatcher.conventions);
        for convention in &conventions.index_removed {
            if !convention(self, &index) {
                break;
            }
        }
    }

    pub(crate) fn on_index_uniqueness_changed(&mut self, id: IndexId) {
        if self
            .dispatcher
            .enqueue(ConventionEvent::IndexUniquenessChanged(id))
        {
            return;
        }
        let conventions = Rc::clone(&self.dispatcher.conventions);
        for convention in &conventions.index_uniqueness_changed {
            if !self.model.contains_index(id) || !convention(self, id) {
                break;
            }
        }
    }

    pub(crate) fn on_index_annotation_changed(
        &mut self,
        id: IndexId,
        name: String,
        previous: Option<Annotation>,
    ) -> bool {
        if self.dispatcher.enqueue(ConventionEvent::IndexAnnotationChanged(
            id,
            name.clone(),
            previous.clone(),
        )) {
            return true;
        }
        let conventions = Rc::clone(&self.dispatcher.conventions);
        for convention in &conventions.index_annotation_changed {
            if !self.model.contains_index(id) {
                return false;
            }
            if !convention(self, id, &name, previous.as_ref()) {
                if let Some(index) = self.model.index_mut(id) {
                    index.annotations.restore(&name, previous);
                }
                return false;
            }
        }
        true
    }

    // ---- foreign keys ---------------------------------------------------

    pub(crate) fn on_foreign_key_added(&mut self, id: ForeignKeyId) -> Option<ForeignKeyId> {
        if self.dispatcher.enqueue(ConventionEvent::ForeignKeyAdded(id)) {
            return Some(id);
        }
        let conventions = Rc::clone(&self.dispatcher.conventions);
        let result =
            self.run_added(&conventions.foreign_key_added, id, Model::contains_foreign_key);
        if result.is_none() && self.model.contains_foreign_key(id) {
            self.remove_foreign_key(id, crate::metadata::ConfigurationSource::Explicit);
        }
        result
    }

    pub(crate) fn on_foreign_key_removed(&mut self, foreign_key: ForeignKey) {
        if self.dispatcher.batch_depth > 0 {
            self.dispatcher
                .enqueue(ConventionEvent::ForeignKeyRemoved(Box::new(foreign_key)));
            return;
        }
        let conventions = Rc::clone(&self.dispatcher.conventions);
        for convention in &conventions.foreign_key_removed {
            if !convention(self, &foreign_key) {
                break;
            }
        }
    }

    pub(crate) fn on_foreign_key_properties_changed(
        &mut self,
        id: ForeignKeyId,
        previous: Vec<PropertyId>,
        previous_key: KeyId,
    ) -> Option<ForeignKeyId> {
        if self.dispatcher.enqueue(ConventionEvent::ForeignKeyPropertiesChanged(
            id,
            previous.clone(),
            previous_key,
        )) {
            return Some(id);
        }
        let conventions = Rc::clone(&self.dispatcher.conventions);
        let mut current = id;
        for convention in &conventions.foreign_key_properties_changed {
            if !self.model.contains_foreign_key(current) {
                return None;
            }
            current = convention(self, current, &previous, previous_key)?;
        }
        self.model.contains_foreign_key(current).then_some(current)
    }

    pub(crate) fn on_foreign_key_uniqueness_changed(
        &mut self,
        id: ForeignKeyId,
    ) -> Option<ForeignKeyId> {
        if self
            .dispatcher
            .enqueue(ConventionEvent::ForeignKeyUniquenessChanged(id))
        {
            return Some(id);
        }
        let conventions = Rc::clone(&self.dispatcher.conventions);
        self.run_added(
            &conventions.foreign_key_uniqueness_changed,
            id,
            Model::contains_foreign_key,
        )
    }

    pub(crate) fn on_foreign_key_requiredness_changed(
        &mut self,
        id: ForeignKeyId,
    ) -> Option<ForeignKeyId> {
        if self
            .dispatcher
            .enqueue(ConventionEvent::ForeignKeyRequirednessChanged(id))
        {
            return Some(id);
        }
        let conventions = Rc::clone(&self.dispatcher.conventions);
        self.run_added(
            &conventions.foreign_key_requiredness_changed,
            id,
            Model::contains_foreign_key,
        )
    }

    pub(crate) fn on_foreign_key_ownership_changed(
        &mut self,
        id: ForeignKeyId,
    ) -> Option<ForeignKeyId> {
        if self
            .dispatcher
            .enqueue(ConventionEvent::ForeignKeyOwnershipChanged(id))
        {
            return Some(id);
        }
        let conventions = Rc::clone(&self.dispatcher.conventions);
        self.run_added(
            &conventions.foreign_key_ownership_changed,
            id,
            Model::contains_foreign_key,
        )
    }

    pub(crate) fn on_principal_end_changed(&mut self, id: ForeignKeyId) -> Option<ForeignKeyId> {
        if self.dispatcher.enqueue(ConventionEvent::PrincipalEndChanged(id)) {
            return Some(id);
        }
        let conventions = Rc::clone(&self.dispatcher.conventions);
        self.run_added(&conventions.principal_end_changed, id, Model::contains_foreign_key)
    }

    // ---- navigations ----------------------------------------------------

    pub(crate) fn on_navigation_added(
        &mut self,
        id: ForeignKeyId,
        side: NavigationSide,
    ) -> Option<ForeignKeyId> {
        if self
            .dispatcher
            .enqueue(ConventionEvent::NavigationAdded(id, side))
        {
            return Some(id);
        }
        let Some(name) = self
            .model
            .foreign_key(id)
            .and_then(|f| f.navigation(side))
            .map(|n| n.name.clone())
        else {
            return None;
        };
        let conventions = Rc::clone(&self.dispatcher.conventions);
        let mut current = id;
        let mut current_side = side;
        for convention in &conventions.navigation_added {
            let still_there = self
                .model
                .foreign_key(current)
                .and_then(|f| f.navigation(current_side))
                .is_some_and(|n| n.name == name);
            if !still_there {
                return None;
            }
            match convention(self, current, current_side) {
                Some(next) => {
                    if next != current {
                        // The relationship was rebuilt; find which side now carries the name.
                        let Some(next_side) = self.model.foreign_key(next).and_then(|f| {
                            [NavigationSide::DependentToPrincipal, NavigationSide::PrincipalToDependent]
                                .into_iter()
                                .find(|s| f.navigation(*s).is_some_and(|n| n.name == name))
                        }) else {
                            return Some(next);
                        };
                        current_side = next_side;
                    }
                    current = next;
                }
                None => {
                    let still_there = self
                        .model
                        .foreign_key(current)
                        .and_then(|f| f.navigation(current_side))
                        .is_some_and(|n| n.name == name);
                    if still_there {
                        debug!(navigation = %name, "navigation vetoed");
                        self.relationship_builder(current).has_navigation(
                            None,
                            current_side,
                            crate::metadata::ConfigurationSource::Explicit,
                        );
                    }
                    return None;
                }
            }
        }
        Some(current)
    }

    pub(crate) fn on_navigation_removed(&mut self, navigation: RemovedNavigation) {
        if self
            .dispatcher
            .enqueue(ConventionEvent::NavigationRemoved(navigation.clone()))
        {
            return;
        }
        let conventions = Rc::clone(&self.dispatcher.conventions);
        for convention in &conventions.navigation_removed {
            if !convention(self, &navigation) {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModelConfig;
    use crate::conventions::set::AddedConvention;
    use crate::metadata::{ConfigurationSource, PropertyType, ScalarType, TypeRegistry, TypeShape};
    use std::cell::RefCell;

    type Log = Rc<RefCell<Vec<String>>>;

    fn builder(conventions: ConventionSet) -> (InternalModelBuilder, EntityTypeId) {
        let registry = TypeRegistry::new().with_shape(
            TypeShape::new("Item")
                .with_scalar("Id", ScalarType::Int32)
                .with_scalar("Name", ScalarType::String),
        );
        let mut mb =
            InternalModelBuilder::with_conventions(registry, ModelConfig::default(), conventions);
        let item = mb.entity("Item", ConfigurationSource::Explicit).unwrap();
        (mb, item)
    }

    fn add(mb: &mut InternalModelBuilder, entity: EntityTypeId, name: &str) -> PropertyId {
        mb.model
            .add_property(
                entity,
                name.to_string(),
                PropertyType::scalar(ScalarType::String),
                true,
                true,
                ConfigurationSource::Explicit,
            )
            .unwrap()
    }

    fn recorder(log: &Log, tag: &'static str) -> AddedConvention<PropertyId> {
        let log = Rc::clone(log);
        Rc::new(move |mb: &mut InternalModelBuilder, id: PropertyId| {
            let name = mb.model().property(id).map(|p| p.name().to_string());
            log.borrow_mut().push(format!("{tag}:{}", name.unwrap_or_default()));
            Some(id)
        })
    }

    fn veto(name: &'static str) -> AddedConvention<PropertyId> {
        Rc::new(move |mb: &mut InternalModelBuilder, id: PropertyId| {
            let vetoed = mb.model().property(id).is_some_and(|p| p.name() == name);
            (!vetoed).then_some(id)
        })
    }

    #[test]
    fn test_veto_stops_chain_and_removes_element() {
        let log = Log::default();
        let mut conventions = ConventionSet::empty();
        conventions.property_added = vec![
            recorder(&log, "first"),
            veto("Code"),
            recorder(&log, "last"),
        ];
        let (mut mb, item) = builder(conventions);

        let name = add(&mut mb, item, "Name");
        assert_eq!(mb.on_property_added(name), Some(name));
        let code = add(&mut mb, item, "Code");
        assert_eq!(mb.on_property_added(code), None);

        assert!(mb.model().contains_property(name));
        assert!(!mb.model().contains_property(code));
        assert!(mb.model().find_property(item, "Code").is_none());
        assert_eq!(*log.borrow(), vec!["first:Name", "last:Name", "first:Code"]);
    }

    #[test]
    fn test_replacement_element_reaches_later_conventions() {
        let log = Log::default();
        let mut conventions = ConventionSet::empty();
        let replace: AddedConvention<PropertyId> =
            Rc::new(|mb: &mut InternalModelBuilder, id: PropertyId| {
                let property = mb.model().property(id)?;
                if property.name() != "Alias" {
                    return Some(id);
                }
                let entity = property.declaring_entity_type();
                mb.remove_property(id, ConfigurationSource::Explicit);
                mb.model().find_property(entity, "Name").map(|p| p.id)
            });
        conventions.property_added = vec![replace, recorder(&log, "seen")];
        let (mut mb, item) = builder(conventions);

        let name = add(&mut mb, item, "Name");
        let alias = add(&mut mb, item, "Alias");
        assert_eq!(mb.on_property_added(alias), Some(name));

        assert!(!mb.model().contains_property(alias));
        assert_eq!(*log.borrow(), vec!["seen:Name"]);
    }

    #[test]
    fn test_nested_batches_share_one_queue() {
        let log = Log::default();
        let mut conventions = ConventionSet::empty();
        conventions.property_added = vec![recorder(&log, "added")];
        let (mut mb, item) = builder(conventions);

        {
            let mut outer = mb.start_batch();
            let name = add(&mut outer, item, "Name");
            assert_eq!(outer.on_property_added(name), Some(name));
            {
                let mut inner = outer.start_batch();
                assert_eq!(inner.dispatcher().batch_depth(), 2);
                assert_eq!(inner.dispatcher().pending_events(), 1);
                let code = add(&mut inner, item, "Code");
                inner.on_property_added(code);
            }
            assert_eq!(outer.dispatcher().batch_depth(), 1);
            assert_eq!(outer.dispatcher().pending_events(), 2);
            assert!(log.borrow().is_empty());
        }

        assert_eq!(mb.dispatcher().batch_depth(), 0);
        assert_eq!(mb.dispatcher().pending_events(), 0);
        assert_eq!(*log.borrow(), vec!["added:Name", "added:Code"]);
    }

    #[test]
    fn test_veto_during_replay_removes_element() {
        let log = Log::default();
        let mut conventions = ConventionSet::empty();
        conventions.property_added = vec![veto("Code"), recorder(&log, "added")];
        let removed = Rc::clone(&log);
        conventions.property_removed = vec![Rc::new(
            move |_: &mut InternalModelBuilder, property: &Property| {
                removed
                    .borrow_mut()
                    .push(format!("removed:{}", property.name()));
                true
            },
        )];
        let (mut mb, item) = builder(conventions);

        let (name, code) = {
            let mut batch = mb.start_batch();
            let name = add(&mut batch, item, "Name");
            let code = add(&mut batch, item, "Code");
            assert_eq!(batch.on_property_added(name), Some(name));
            assert_eq!(batch.on_property_added(code), Some(code));
            assert!(batch.model().contains_property(code));
            (name, code)
        };

        assert!(mb.model().contains_property(name));
        assert!(!mb.model().contains_property(code));
        assert_eq!(*log.borrow(), vec!["added:Name", "removed:Code"]);
    }

    #[test]
    fn test_vetoed_change_restores_previous_value() {
        let log = Log::default();
        let mut conventions = ConventionSet::empty();
        let later = Rc::clone(&log);
        conventions.property_nullability_changed = vec![
            Rc::new(|_: &mut InternalModelBuilder, _: PropertyId| false),
            Rc::new(move |_: &mut InternalModelBuilder, _: PropertyId| {
                later.borrow_mut().push("later".to_string());
                true
            }),
        ];
        let (mut mb, item) = builder(conventions);
        let name = add(&mut mb, item, "Name");
        assert!(mb.model().property(name).unwrap().is_nullable());

        assert!(!mb
            .property_builder(name)
            .is_required(true, ConfigurationSource::Explicit));

        assert!(mb.model().property(name).unwrap().is_nullable());
        assert!(log.borrow().is_empty());
    }
}
