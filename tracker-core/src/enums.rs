//! Enum types shared across the pipeline

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of tracker record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrackerType {
    TrackedEntity,
    Enrollment,
    Event,
    Relationship,
}

impl TrackerType {
    /// Human readable name used in issue messages.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::TrackedEntity => "trackedEntity",
            Self::Enrollment => "enrollment",
            Self::Event => "event",
            Self::Relationship => "relationship",
        }
    }
}

impl fmt::Display for TrackerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Kind of metadata object. Doubles as the cache region tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MetadataType {
    RelationshipType,
    TrackedEntityType,
    Program,
    ProgramStage,
    OrganisationUnit,
    DataElement,
}

impl MetadataType {
    /// Every metadata type, in declaration order.
    pub const ALL: [MetadataType; 6] = [
        MetadataType::RelationshipType,
        MetadataType::TrackedEntityType,
        MetadataType::Program,
        MetadataType::ProgramStage,
        MetadataType::OrganisationUnit,
        MetadataType::DataElement,
    ];
}

impl fmt::Display for MetadataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Import strategy requested for a payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ImportStrategy {
    Create,
    Update,
    Delete,
    /// Bundle level only: resolved per item to `Create` or `Update`.
    #[default]
    CreateAndUpdate,
}

impl ImportStrategy {
    pub fn is_create(&self) -> bool {
        matches!(self, Self::Create)
    }

    pub fn is_update(&self) -> bool {
        matches!(self, Self::Update)
    }

    pub fn is_delete(&self) -> bool {
        matches!(self, Self::Delete)
    }

    /// Resolve a bundle strategy for one item given whether it already exists.
    pub fn resolve(self, exists: bool) -> ImportStrategy {
        match self {
            Self::CreateAndUpdate if exists => Self::Update,
            Self::CreateAndUpdate => Self::Create,
            other => other,
        }
    }
}

/// Severity of a validation issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    /// Reported, but does not block persistence on its own.
    Warning,
    /// Blocks persistence of the item.
    Error,
}

/// Entity kind a relationship constraint accepts on one side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RelationshipEntity {
    TrackedEntity,
    Enrollment,
    Event,
}

impl RelationshipEntity {
    pub fn tracker_type(&self) -> TrackerType {
        match self {
            Self::TrackedEntity => TrackerType::TrackedEntity,
            Self::Enrollment => TrackerType::Enrollment,
            Self::Event => TrackerType::Event,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EnrollmentStatus {
    #[default]
    Active,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventStatus {
    #[default]
    Active,
    Completed,
    Visited,
    Schedule,
    Overdue,
    Skipped,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_and_update_resolves_on_existence() {
        assert_eq!(ImportStrategy::CreateAndUpdate.resolve(true), ImportStrategy::Update);
        assert_eq!(ImportStrategy::CreateAndUpdate.resolve(false), ImportStrategy::Create);
        assert_eq!(ImportStrategy::Delete.resolve(false), ImportStrategy::Delete);
        assert_eq!(ImportStrategy::Create.resolve(true), ImportStrategy::Create);
    }

    #[test]
    fn test_relationship_entity_maps_to_tracker_type() {
        assert_eq!(
            RelationshipEntity::Enrollment.tracker_type(),
            TrackerType::Enrollment
        );
        assert_eq!(RelationshipEntity::Event.tracker_type(), TrackerType::Event);
    }

    #[test]
    fn test_metadata_type_all_is_exhaustive() {
        assert_eq!(MetadataType::ALL.len(), 6);
        assert_eq!(MetadataType::ProgramStage.to_string(), "ProgramStage");
    }
}
