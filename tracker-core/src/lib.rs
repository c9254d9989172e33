//! Tracker Core - Shared Types
//!
//! Identifiers, tracker records, metadata objects, errors and configuration.
//! Every other crate in the workspace depends on this one; it performs no I/O
//! beyond reading a configuration file.

mod access;
mod config;
mod entities;
mod enums;
mod error;
mod identity;
mod metadata;

pub use access::{AccessControl, AccessTarget, AllowAll, Principal};
pub use config::{AggregateConfig, CachePolicy, PreheatConfig, TrackerConfig};
pub use entities::{
    Attribute, DataValue, Enrollment, EntityRef, Event, ImportRelationship, Note, Relationship,
    RelationshipItem, RelationshipKey, TrackedEntity,
};
pub use enums::{
    EnrollmentStatus, EventStatus, ImportStrategy, MetadataType, RelationshipEntity, Severity,
    TrackerType,
};
pub use error::{ConfigError, PreheatError, StorageError, TrackerError, TrackerResult};
pub use identity::{generate_uid, IdScheme, MetadataIdentifier, Timestamp, Uid, UID_LENGTH};
pub use metadata::{
    DataElement, IdentifiableObject, MetadataHeader, OrganisationUnit, Program, ProgramStage,
    RelationshipConstraint, RelationshipType, TrackedEntityType,
};
