//! Tracker record structures
//!
//! Child collections on [`TrackedEntity`], [`Enrollment`] and [`Event`] are
//! empty when loaded on their own and filled by the aggregate fetch.

use crate::{
    EnrollmentStatus, EventStatus, MetadataIdentifier, RelationshipEntity, Timestamp, TrackerType,
    Uid,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Reference to a tracker record by type and uid.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityRef {
    pub tracker_type: TrackerType,
    pub uid: Uid,
}

impl EntityRef {
    pub fn new(tracker_type: TrackerType, uid: impl Into<Uid>) -> Self {
        Self {
            tracker_type,
            uid: uid.into(),
        }
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} `{}`", self.tracker_type, self.uid)
    }
}

/// Tracked entity attribute value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    pub attribute: Uid,
    pub value: String,
    pub created_at: Option<Timestamp>,
}

/// Data value captured on an event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataValue {
    pub data_element: Uid,
    pub value: String,
    pub provided_elsewhere: bool,
    pub stored_by: Option<String>,
    pub created_at: Option<Timestamp>,
}

/// Free-text note attached to an enrollment or event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub uid: Uid,
    pub value: String,
    pub stored_by: Option<String>,
    pub stored_at: Option<Timestamp>,
}

/// Tracked entity, the root of the tracker record tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedEntity {
    pub uid: Uid,
    pub tracked_entity_type: Uid,
    pub org_unit: Uid,
    pub deleted: bool,
    pub created_at: Option<Timestamp>,
    pub updated_at: Option<Timestamp>,
    #[serde(default)]
    pub attributes: Vec<Attribute>,
    #[serde(default)]
    pub enrollments: Vec<Enrollment>,
    #[serde(default)]
    pub relationships: Vec<Relationship>,
}

impl TrackedEntity {
    pub fn new(uid: impl Into<Uid>, tracked_entity_type: impl Into<Uid>, org_unit: impl Into<Uid>) -> Self {
        Self {
            uid: uid.into(),
            tracked_entity_type: tracked_entity_type.into(),
            org_unit: org_unit.into(),
            deleted: false,
            created_at: None,
            updated_at: None,
            attributes: Vec::new(),
            enrollments: Vec::new(),
            relationships: Vec::new(),
        }
    }
}

/// Enrollment of a tracked entity into a program.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Enrollment {
    pub uid: Uid,
    pub tracked_entity: Uid,
    pub program: Uid,
    pub org_unit: Uid,
    pub status: EnrollmentStatus,
    pub deleted: bool,
    pub enrolled_at: Option<Timestamp>,
    #[serde(default)]
    pub events: Vec<Event>,
    #[serde(default)]
    pub notes: Vec<Note>,
    #[serde(default)]
    pub relationships: Vec<Relationship>,
}

impl Enrollment {
    pub fn new(uid: impl Into<Uid>, tracked_entity: impl Into<Uid>, program: impl Into<Uid>, org_unit: impl Into<Uid>) -> Self {
        Self {
            uid: uid.into(),
            tracked_entity: tracked_entity.into(),
            program: program.into(),
            org_unit: org_unit.into(),
            status: EnrollmentStatus::Active,
            deleted: false,
            enrolled_at: None,
            events: Vec::new(),
            notes: Vec::new(),
            relationships: Vec::new(),
        }
    }
}

/// Event recorded against a program stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub uid: Uid,
    /// Absent for events of programs without registration.
    pub enrollment: Option<Uid>,
    pub program_stage: Uid,
    pub org_unit: Uid,
    pub status: EventStatus,
    pub deleted: bool,
    pub occurred_at: Option<Timestamp>,
    #[serde(default)]
    pub data_values: Vec<DataValue>,
    #[serde(default)]
    pub notes: Vec<Note>,
    #[serde(default)]
    pub relationships: Vec<Relationship>,
}

impl Event {
    pub fn new(uid: impl Into<Uid>, enrollment: Option<Uid>, program_stage: impl Into<Uid>, org_unit: impl Into<Uid>) -> Self {
        Self {
            uid: uid.into(),
            enrollment,
            program_stage: program_stage.into(),
            org_unit: org_unit.into(),
            status: EventStatus::Active,
            deleted: false,
            occurred_at: None,
            data_values: Vec::new(),
            notes: Vec::new(),
            relationships: Vec::new(),
        }
    }
}

// ============================================================================
// RELATIONSHIPS
// ============================================================================

/// One side of a relationship. Exactly one reference should be set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct RelationshipItem {
    pub tracked_entity: Option<Uid>,
    pub enrollment: Option<Uid>,
    pub event: Option<Uid>,
}

impl RelationshipItem {
    pub fn tracked_entity(uid: impl Into<Uid>) -> Self {
        Self {
            tracked_entity: Some(uid.into()),
            ..Default::default()
        }
    }

    pub fn enrollment(uid: impl Into<Uid>) -> Self {
        Self {
            enrollment: Some(uid.into()),
            ..Default::default()
        }
    }

    pub fn event(uid: impl Into<Uid>) -> Self {
        Self {
            event: Some(uid.into()),
            ..Default::default()
        }
    }

    /// Every non-blank reference on this side.
    pub fn references(&self) -> Vec<EntityRef> {
        [
            (TrackerType::TrackedEntity, &self.tracked_entity),
            (TrackerType::Enrollment, &self.enrollment),
            (TrackerType::Event, &self.event),
        ]
        .into_iter()
        .filter_map(|(tracker_type, uid)| {
            uid.as_ref()
                .filter(|uid| !uid.is_blank())
                .map(|uid| EntityRef::new(tracker_type, uid.clone()))
        })
        .collect()
    }

    /// The single linked entity, or `None` when zero or several are set.
    pub fn endpoint(&self) -> Option<EntityRef> {
        let mut references = self.references();
        if references.len() == 1 {
            references.pop()
        } else {
            None
        }
    }

    /// True when no reference is set.
    pub fn is_empty(&self) -> bool {
        self.references().is_empty()
    }

    /// Constraint entity kind matching the single endpoint.
    pub fn entity_kind(&self) -> Option<RelationshipEntity> {
        self.endpoint().and_then(|e| match e.tracker_type {
            TrackerType::TrackedEntity => Some(RelationshipEntity::TrackedEntity),
            TrackerType::Enrollment => Some(RelationshipEntity::Enrollment),
            TrackerType::Event => Some(RelationshipEntity::Event),
            TrackerType::Relationship => None,
        })
    }

    fn key_part(&self) -> Option<String> {
        self.endpoint()
            .map(|e| format!("{}_{}", e.tracker_type.display_name(), e.uid))
    }
}

/// Persisted relationship between two tracker records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    pub uid: Uid,
    pub relationship_type: Uid,
    pub from: RelationshipItem,
    pub to: RelationshipItem,
    pub bidirectional: bool,
    pub deleted: bool,
    pub created_at: Option<Timestamp>,
}

impl Relationship {
    /// Semantic key, `None` when either side is malformed.
    pub fn key(&self) -> Option<RelationshipKey> {
        RelationshipKey::build(self.relationship_type.as_str(), &self.from, &self.to)
    }
}

/// Relationship as it arrives in an import payload.
///
/// References are optional so missing fields surface as validation issues.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportRelationship {
    pub uid: Uid,
    pub relationship_type: Option<MetadataIdentifier>,
    pub from: Option<RelationshipItem>,
    pub to: Option<RelationshipItem>,
}

impl ImportRelationship {
    pub fn new(uid: impl Into<Uid>) -> Self {
        Self {
            uid: uid.into(),
            relationship_type: None,
            from: None,
            to: None,
        }
    }

    pub fn with_type(mut self, relationship_type: MetadataIdentifier) -> Self {
        self.relationship_type = Some(relationship_type);
        self
    }

    pub fn with_from(mut self, from: RelationshipItem) -> Self {
        self.from = Some(from);
        self
    }

    pub fn with_to(mut self, to: RelationshipItem) -> Self {
        self.to = Some(to);
        self
    }

    pub fn entity_ref(&self) -> EntityRef {
        EntityRef::new(TrackerType::Relationship, self.uid.clone())
    }

    /// Semantic key for a resolved relationship type uid.
    pub fn key(&self, relationship_type: &Uid) -> Option<RelationshipKey> {
        match (&self.from, &self.to) {
            (Some(from), Some(to)) => RelationshipKey::build(relationship_type.as_str(), from, to),
            _ => None,
        }
    }
}

/// Semantic identity of a relationship: type plus both endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RelationshipKey {
    relationship_type: String,
    from: String,
    to: String,
}

impl RelationshipKey {
    fn build(relationship_type: &str, from: &RelationshipItem, to: &RelationshipItem) -> Option<Self> {
        Some(Self {
            relationship_type: relationship_type.to_string(),
            from: from.key_part()?,
            to: to.key_part()?,
        })
    }

    /// Same type with both sides swapped.
    pub fn inverse(&self) -> Self {
        Self {
            relationship_type: self.relationship_type.clone(),
            from: self.to.clone(),
            to: self.from.clone(),
        }
    }

    pub fn as_string(&self) -> String {
        format!("{}_{}_{}", self.relationship_type, self.from, self.to)
    }
}

impl fmt::Display for RelationshipKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_string())
    }
}
