//! Preheated state and the import bundle validators read from.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use tracker_core::{
    AccessControl, AllowAll, Enrollment, EntityRef, Event, IdentifiableObject, ImportRelationship,
    ImportStrategy, MetadataIdentifier, Principal, Relationship, RelationshipKey,
    RelationshipType, TrackedEntity, TrackerType, Uid,
};

/// Everything an import needs to know about the database, loaded once
/// before validation.
#[derive(Debug, Clone, Default)]
pub struct TrackerPreheat {
    relationship_types: HashMap<Uid, RelationshipType>,
    tracked_entities: HashMap<Uid, TrackedEntity>,
    enrollments: HashMap<Uid, Enrollment>,
    events: HashMap<Uid, Event>,
    relationships: HashMap<Uid, Relationship>,
    /// Keys of existing live relationships, mapped to the owning uid.
    relationship_keys: HashMap<RelationshipKey, Uid>,
}

impl TrackerPreheat {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_relationship_type(&mut self, relationship_type: RelationshipType) {
        self.relationship_types
            .insert(relationship_type.uid().clone(), relationship_type);
    }

    pub fn add_tracked_entity(&mut self, tracked_entity: TrackedEntity) {
        self.tracked_entities
            .insert(tracked_entity.uid.clone(), tracked_entity);
    }

    pub fn add_enrollment(&mut self, enrollment: Enrollment) {
        self.enrollments.insert(enrollment.uid.clone(), enrollment);
    }

    pub fn add_event(&mut self, event: Event) {
        self.events.insert(event.uid.clone(), event);
    }

    /// Register an existing relationship. Live ones also take part in
    /// duplicate detection, bidirectional ones under both orientations.
    pub fn add_relationship(&mut self, relationship: Relationship) {
        if !relationship.deleted {
            if let Some(key) = relationship.key() {
                if relationship.bidirectional {
                    self.relationship_keys
                        .insert(key.inverse(), relationship.uid.clone());
                }
                self.relationship_keys.insert(key, relationship.uid.clone());
            }
        }
        self.relationships
            .insert(relationship.uid.clone(), relationship);
    }

    /// Relationship type referenced by `identifier` under its own scheme.
    pub fn relationship_type(&self, identifier: &MetadataIdentifier) -> Option<&RelationshipType> {
        if identifier.is_blank() {
            return None;
        }
        self.relationship_types.values().find(|relationship_type| {
            relationship_type.identifier(&identifier.scheme).as_deref()
                == Some(identifier.identifier.as_str())
        })
    }

    pub fn tracked_entity(&self, uid: &Uid) -> Option<&TrackedEntity> {
        self.tracked_entities.get(uid)
    }

    pub fn enrollment(&self, uid: &Uid) -> Option<&Enrollment> {
        self.enrollments.get(uid)
    }

    pub fn event(&self, uid: &Uid) -> Option<&Event> {
        self.events.get(uid)
    }

    /// Existing relationship by uid, soft-deleted ones included.
    pub fn relationship(&self, uid: &Uid) -> Option<&Relationship> {
        self.relationships.get(uid)
    }

    /// True when a live (not soft-deleted) record of `tracker_type` exists.
    pub fn exists(&self, tracker_type: TrackerType, uid: &Uid) -> bool {
        match tracker_type {
            TrackerType::TrackedEntity => self.tracked_entity(uid).is_some_and(|te| !te.deleted),
            TrackerType::Enrollment => self.enrollment(uid).is_some_and(|e| !e.deleted),
            TrackerType::Event => self.event(uid).is_some_and(|e| !e.deleted),
            TrackerType::Relationship => self.relationship(uid).is_some_and(|r| !r.deleted),
        }
    }

    /// True when another live relationship already links the same
    /// endpoints with the same type. Bidirectional types also match the
    /// swapped orientation.
    pub fn is_duplicate(&self, item: &ImportRelationship, relationship_type: &RelationshipType) -> bool {
        let Some(key) = item.key(relationship_type.uid()) else {
            return false;
        };
        let other = |key: &RelationshipKey| {
            self.relationship_keys
                .get(key)
                .is_some_and(|owner| owner != &item.uid)
        };
        other(&key) || (relationship_type.bidirectional && other(&key.inverse()))
    }

    pub fn relationship_type_count(&self) -> usize {
        self.relationship_types.len()
    }

    pub fn relationship_count(&self) -> usize {
        self.relationships.len()
    }
}

/// Preheated state plus the parameters of one import pass.
#[derive(Clone)]
pub struct ImportBundle {
    pub preheat: TrackerPreheat,
    pub strategy: ImportStrategy,
    pub principal: Principal,
    access: Arc<dyn AccessControl>,
    /// Records created earlier in the same payload.
    pending: HashSet<EntityRef>,
}

impl ImportBundle {
    /// Bundle that grants every access check.
    pub fn new(preheat: TrackerPreheat, strategy: ImportStrategy, principal: Principal) -> Self {
        Self {
            preheat,
            strategy,
            principal,
            access: Arc::new(AllowAll),
            pending: HashSet::new(),
        }
    }

    pub fn with_access_control(mut self, access: Arc<dyn AccessControl>) -> Self {
        self.access = access;
        self
    }

    pub fn with_pending(mut self, pending: impl IntoIterator<Item = EntityRef>) -> Self {
        self.pending.extend(pending);
        self
    }

    pub fn access_control(&self) -> &dyn AccessControl {
        self.access.as_ref()
    }

    pub fn is_pending(&self, entity: &EntityRef) -> bool {
        self.pending.contains(entity)
    }

    /// Effective strategy for `item`. `CreateAndUpdate` becomes `Update`
    /// when the relationship already exists, deleted or not.
    pub fn strategy_for(&self, item: &ImportRelationship) -> ImportStrategy {
        self.strategy
            .resolve(self.preheat.relationship(&item.uid).is_some())
    }

    /// The item's relationship type, when the preheat resolved it.
    pub fn relationship_type(&self, item: &ImportRelationship) -> Option<&RelationshipType> {
        item.relationship_type
            .as_ref()
            .and_then(|identifier| self.preheat.relationship_type(identifier))
    }

    /// True when the endpoint exists in the database or earlier in the
    /// payload.
    pub fn is_known(&self, entity: &EntityRef) -> bool {
        self.preheat.exists(entity.tracker_type, &entity.uid) || self.is_pending(entity)
    }
}

impl fmt::Debug for ImportBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImportBundle")
            .field("strategy", &self.strategy)
            .field("principal", &self.principal.username)
            .field("relationship_types", &self.preheat.relationship_type_count())
            .field("relationships", &self.preheat.relationship_count())
            .field("pending", &self.pending.len())
            .finish()
    }
}
