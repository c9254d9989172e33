//! Tracker Test Utilities
//!
//! Shared test infrastructure for the workspace:
//! - Proptest generators for identifiers and relationship payloads
//! - Fixtures for tracker records and metadata
//! - A configurable access control double
//! - Assertions over `TrackerResult`
//! - Tracing setup for tests

// Re-export the instrumented in-memory stores from their source crate
pub use tracker_storage::{InMemoryKeyedStore, InMemoryMetadataStore, KeyedCall, MetadataCall};

pub use tracker_core::{
    AccessControl, AccessTarget, Attribute, DataValue, Enrollment, EntityRef, Event, IdScheme,
    ImportRelationship, ImportStrategy, MetadataHeader, MetadataIdentifier, Note, Principal,
    Program, ProgramStage, Relationship, RelationshipConstraint, RelationshipItem,
    RelationshipType, TrackedEntity, TrackedEntityType, TrackerError, TrackerResult, Uid,
};

use std::collections::HashSet;

/// Install a fmt subscriber honoring `RUST_LOG`, once per process.
///
/// Later calls are no-ops, so every test may call it.
pub fn init_test_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

// ============================================================================
// MOCK ACCESS CONTROL
// ============================================================================

/// Access control that allows everything except explicitly denied targets.
#[derive(Debug, Clone, Default)]
pub struct StaticAccessControl {
    denied_read: HashSet<AccessTarget>,
    denied_write: HashSet<AccessTarget>,
    denied_delete: HashSet<AccessTarget>,
}

impl StaticAccessControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn deny_read(mut self, target: AccessTarget) -> Self {
        self.denied_read.insert(target);
        self
    }

    pub fn deny_write(mut self, target: AccessTarget) -> Self {
        self.denied_write.insert(target);
        self
    }

    pub fn deny_delete(mut self, target: AccessTarget) -> Self {
        self.denied_delete.insert(target);
        self
    }

    fn check(
        denied: &HashSet<AccessTarget>,
        action: &str,
        principal: &Principal,
        target: &AccessTarget,
    ) -> Vec<String> {
        if denied.contains(target) {
            vec![format!(
                "User `{}` has no {action} access to {}",
                principal.username,
                describe(target)
            )]
        } else {
            Vec::new()
        }
    }
}

fn describe(target: &AccessTarget) -> String {
    match target {
        AccessTarget::RelationshipType(uid) => format!("relationshipType `{uid}`"),
        AccessTarget::Entity(entity) => entity.to_string(),
    }
}

impl AccessControl for StaticAccessControl {
    fn can_read(&self, principal: &Principal, target: &AccessTarget) -> Vec<String> {
        Self::check(&self.denied_read, "read", principal, target)
    }

    fn can_write(&self, principal: &Principal, target: &AccessTarget) -> Vec<String> {
        Self::check(&self.denied_write, "write", principal, target)
    }

    fn can_delete(&self, principal: &Principal, target: &AccessTarget) -> Vec<String> {
        Self::check(&self.denied_delete, "delete", principal, target)
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for identifiers and relationship payloads.

    use super::*;
    use proptest::prelude::*;

    /// Generate a uid in the platform format.
    pub fn arb_uid() -> impl Strategy<Value = Uid> {
        "[a-zA-Z][a-zA-Z0-9]{10}".prop_map(Uid::new)
    }

    pub fn arb_import_strategy() -> impl Strategy<Value = ImportStrategy> {
        prop_oneof![
            Just(ImportStrategy::Create),
            Just(ImportStrategy::Update),
            Just(ImportStrategy::Delete),
            Just(ImportStrategy::CreateAndUpdate),
        ]
    }

    /// Generate a relationship side linking exactly one record.
    pub fn arb_relationship_item() -> impl Strategy<Value = RelationshipItem> {
        prop_oneof![
            arb_uid().prop_map(RelationshipItem::tracked_entity),
            arb_uid().prop_map(RelationshipItem::enrollment),
            arb_uid().prop_map(RelationshipItem::event),
        ]
    }

    /// Generate a relationship side linking zero or several records.
    pub fn arb_malformed_item() -> impl Strategy<Value = RelationshipItem> {
        prop_oneof![
            Just(RelationshipItem::default()),
            (arb_uid(), arb_uid()).prop_map(|(te, en)| RelationshipItem {
                tracked_entity: Some(te),
                enrollment: Some(en),
                event: None,
            }),
        ]
    }

    /// Generate a fully populated payload relationship of the given type.
    pub fn arb_import_relationship(relationship_type: Uid) -> impl Strategy<Value = ImportRelationship> {
        (arb_uid(), arb_relationship_item(), arb_relationship_item()).prop_map(
            move |(uid, from, to)| {
                ImportRelationship::new(uid)
                    .with_type(MetadataIdentifier::of_uid(relationship_type.as_str()))
                    .with_from(from)
                    .with_to(to)
            },
        )
    }

    /// Generate a payload relationship with any subset of fields missing.
    pub fn arb_partial_relationship() -> impl Strategy<Value = ImportRelationship> {
        (
            arb_uid(),
            proptest::option::of(arb_uid()),
            proptest::option::of(prop_oneof![arb_relationship_item(), arb_malformed_item()]),
            proptest::option::of(prop_oneof![arb_relationship_item(), arb_malformed_item()]),
        )
            .prop_map(|(uid, relationship_type, from, to)| ImportRelationship {
                uid,
                relationship_type: relationship_type.map(|t| MetadataIdentifier::of_uid(t.as_str())),
                from,
                to,
            })
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built records and metadata for common scenarios.

    use super::*;

    pub const TRACKED_ENTITY_TYPE: &str = "TetPerson01";
    pub const ORG_UNIT: &str = "OuClinic001";
    pub const PROGRAM: &str = "ProgAnc0001";
    pub const PROGRAM_STAGE: &str = "StageVisit1";

    pub fn tracked_entity(uid: &str) -> TrackedEntity {
        TrackedEntity::new(uid, TRACKED_ENTITY_TYPE, ORG_UNIT)
    }

    pub fn enrollment(uid: &str, tracked_entity: &str) -> Enrollment {
        Enrollment::new(uid, tracked_entity, PROGRAM, ORG_UNIT)
    }

    pub fn event(uid: &str, enrollment: &str) -> Event {
        Event::new(uid, Some(Uid::from(enrollment)), PROGRAM_STAGE, ORG_UNIT)
    }

    pub fn attribute(attribute: &str, value: &str) -> Attribute {
        Attribute {
            attribute: Uid::from(attribute),
            value: value.to_string(),
            created_at: None,
        }
    }

    pub fn data_value(data_element: &str, value: &str) -> DataValue {
        DataValue {
            data_element: Uid::from(data_element),
            value: value.to_string(),
            provided_elsewhere: false,
            stored_by: None,
            created_at: None,
        }
    }

    pub fn note(uid: &str, value: &str) -> Note {
        Note {
            uid: Uid::from(uid),
            value: value.to_string(),
            stored_by: Some("admin".to_string()),
            stored_at: None,
        }
    }

    /// A persisted relationship.
    pub fn relationship(
        uid: &str,
        relationship_type: &str,
        from: RelationshipItem,
        to: RelationshipItem,
    ) -> Relationship {
        Relationship {
            uid: Uid::from(uid),
            relationship_type: Uid::from(relationship_type),
            from,
            to,
            bidirectional: false,
            deleted: false,
            created_at: None,
        }
    }

    pub fn relationship_type(
        uid: &str,
        from_constraint: RelationshipConstraint,
        to_constraint: RelationshipConstraint,
    ) -> RelationshipType {
        RelationshipType {
            header: MetadataHeader::new(uid, format!("Relationship type {uid}"))
                .with_code(format!("RT_{uid}")),
            bidirectional: false,
            from_constraint,
            to_constraint,
        }
    }

    /// Tracked entity to tracked entity, both sides restricted to the
    /// fixture tracked entity type.
    pub fn person_to_person_type(uid: &str) -> RelationshipType {
        relationship_type(
            uid,
            RelationshipConstraint::tracked_entity(Some(Uid::from(TRACKED_ENTITY_TYPE))),
            RelationshipConstraint::tracked_entity(Some(Uid::from(TRACKED_ENTITY_TYPE))),
        )
    }

    pub fn tracked_entity_type(uid: &str) -> TrackedEntityType {
        TrackedEntityType {
            header: MetadataHeader::new(uid, format!("Tracked entity type {uid}")),
        }
    }

    pub fn program(uid: &str) -> Program {
        Program {
            header: MetadataHeader::new(uid, format!("Program {uid}")),
            tracked_entity_type: Some(Uid::from(TRACKED_ENTITY_TYPE)),
            with_registration: true,
        }
    }

    pub fn program_stage(uid: &str, program: &str) -> ProgramStage {
        ProgramStage {
            header: MetadataHeader::new(uid, format!("Program stage {uid}")),
            program: Uid::from(program),
            repeatable: true,
        }
    }

    /// Payload relationship with every field set.
    pub fn import_relationship(
        uid: &str,
        relationship_type: &str,
        from: RelationshipItem,
        to: RelationshipItem,
    ) -> ImportRelationship {
        ImportRelationship::new(uid)
            .with_type(MetadataIdentifier::of_uid(relationship_type))
            .with_from(from)
            .with_to(to)
    }

    pub fn admin() -> Principal {
        Principal::new("UserAdmin01", "admin").with_authority("ALL")
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertions over pipeline results.

    use super::*;
    use tracker_core::{ConfigError, StorageError};

    /// Assert that a TrackerResult is a Storage error.
    #[track_caller]
    pub fn assert_storage_error<T: std::fmt::Debug>(result: &TrackerResult<T>) {
        match result {
            Err(TrackerError::Storage(_)) => {}
            other => panic!("Expected Storage error, got: {:?}", other),
        }
    }

    /// Assert that a TrackerResult is a failed query on `store`.
    #[track_caller]
    pub fn assert_query_failed<T: std::fmt::Debug>(result: &TrackerResult<T>, store: &str) {
        match result {
            Err(TrackerError::Storage(StorageError::QueryFailed { store: s, .. })) => {
                assert_eq!(s, store, "Wrong store in QueryFailed error");
            }
            other => panic!("Expected QueryFailed on {store}, got: {:?}", other),
        }
    }

    /// Assert that a TrackerResult is a Config error.
    #[track_caller]
    pub fn assert_config_error<T: std::fmt::Debug>(result: &TrackerResult<T>) {
        match result {
            Err(TrackerError::Config(_)) => {}
            other => panic!("Expected Config error, got: {:?}", other),
        }
    }

    /// Assert that a ConfigError is a duplicate validator registration.
    #[track_caller]
    pub fn assert_duplicate_validator<T: std::fmt::Debug>(result: &TrackerResult<T>, name: &str) {
        match result {
            Err(TrackerError::Config(ConfigError::DuplicateValidator { name: n })) => {
                assert_eq!(n, name);
            }
            other => panic!("Expected DuplicateValidator {name}, got: {:?}", other),
        }
    }
}
