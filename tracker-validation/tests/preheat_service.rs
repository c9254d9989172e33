//! Preheat service against in-memory stores, and the full import flow.

use std::sync::Arc;

use tracker_core::{
    CachePolicy, EntityRef, IdScheme, MetadataIdentifier, MetadataType, PreheatConfig,
    RelationshipItem, RelationshipType, TrackerType, Uid,
};
use tracker_storage::{InMemoryMetadataStore, MetadataCall, PreheatLoader, TypeCache};
use tracker_test_utils::{assertions::assert_query_failed, fixtures, init_test_tracing};
use tracker_validation::{
    ImportBundle, ImportPayload, InMemoryTrackerObjectStore, PreheatParams, TrackerPreheatService,
    ValidationCode, ValidationPipeline,
};

const TYPE: &str = "TypeUid0001";

struct Harness {
    types: Arc<InMemoryMetadataStore<RelationshipType>>,
    objects: Arc<InMemoryTrackerObjectStore>,
    service: TrackerPreheatService,
}

impl Harness {
    fn new(objects: InMemoryTrackerObjectStore) -> Self {
        Self::with_config(objects, PreheatConfig::default())
    }

    fn with_config(objects: InMemoryTrackerObjectStore, config: PreheatConfig) -> Self {
        let types = Arc::new(InMemoryMetadataStore::new(
            "relationship_types",
            vec![fixtures::person_to_person_type(TYPE)],
        ));
        let objects = Arc::new(objects);
        let service = TrackerPreheatService::new(
            Arc::new(PreheatLoader::new(config)),
            types.clone(),
            objects.clone(),
        );
        Self {
            types,
            objects,
            service,
        }
    }
}

fn seeded_objects() -> InMemoryTrackerObjectStore {
    InMemoryTrackerObjectStore::new()
        .with_tracked_entity(fixtures::tracked_entity("TeUid00000A"))
        .with_tracked_entity(fixtures::tracked_entity("TeUid00000B"))
        .with_enrollment(fixtures::enrollment("EnUid000001", "TeUid00000A"))
        .with_relationship(fixtures::relationship(
            "RelUid00001",
            TYPE,
            RelationshipItem::tracked_entity("TeUid00000A"),
            RelationshipItem::tracked_entity("TeUid00000B"),
        ))
}

fn payload() -> ImportPayload {
    ImportPayload::new(vec![
        fixtures::import_relationship(
            "RelUid00002",
            TYPE,
            RelationshipItem::tracked_entity("TeUid00000A"),
            RelationshipItem::tracked_entity("TeUid00000B"),
        ),
        fixtures::import_relationship(
            "RelUid00003",
            TYPE,
            RelationshipItem::tracked_entity("TeUid00000B"),
            RelationshipItem::enrollment("EnUid000001"),
        ),
    ])
}

#[tokio::test]
async fn test_preheat_loads_everything_referenced() {
    init_test_tracing();
    let harness = Harness::new(seeded_objects());

    let preheat = harness
        .service
        .preheat(&PreheatParams::default(), &payload())
        .await
        .unwrap();

    assert!(preheat
        .relationship_type(&MetadataIdentifier::of_uid(TYPE))
        .is_some());
    assert!(preheat.exists(TrackerType::TrackedEntity, &Uid::from("TeUid00000A")));
    assert!(preheat.exists(TrackerType::Enrollment, &Uid::from("EnUid000001")));
    assert!(preheat.relationship(&Uid::from("RelUid00001")).is_some());

    let mut calls = harness.objects.calls();
    calls.sort_unstable();
    assert_eq!(
        calls,
        vec!["enrollments", "relationships", "relationships_linking", "tracked_entities"]
    );
}

#[tokio::test]
async fn test_relationship_types_are_cached_across_preheats() {
    let harness = Harness::new(seeded_objects());

    for _ in 0..3 {
        harness
            .service
            .preheat(&PreheatParams::default(), &payload())
            .await
            .unwrap();
    }

    assert_eq!(harness.types.call_count(), 1);
    assert!(harness
        .service
        .loader()
        .cache()
        .has_any(MetadataType::RelationshipType));
}

#[tokio::test]
async fn test_non_cacheable_types_query_every_time() {
    let config = PreheatConfig::default().with_policy(MetadataType::RelationshipType, CachePolicy::disabled());
    let harness = Harness::with_config(seeded_objects(), config);

    for _ in 0..2 {
        harness
            .service
            .preheat(&PreheatParams::default(), &payload())
            .await
            .unwrap();
    }
    assert_eq!(harness.types.call_count(), 2);
}

#[tokio::test]
async fn test_types_resolve_under_requested_scheme() {
    let harness = Harness::new(seeded_objects());
    let mut payload = payload();
    for item in &mut payload.relationships {
        item.relationship_type = Some(MetadataIdentifier::of_code(format!("RT_{TYPE}")));
    }
    let params = PreheatParams::default().with_relationship_type_scheme(IdScheme::Code);

    let preheat = harness.service.preheat(&params, &payload).await.unwrap();

    assert!(preheat
        .relationship_type(&MetadataIdentifier::of_code(format!("RT_{TYPE}")))
        .is_some());
    assert_eq!(
        harness.types.calls(),
        vec![MetadataCall::Identifiers {
            scheme: IdScheme::Code,
            identifiers: vec![format!("RT_{TYPE}")],
        }]
    );
}

#[tokio::test]
async fn test_empty_payload_queries_nothing() {
    let harness = Harness::new(seeded_objects());

    let preheat = harness
        .service
        .preheat(&PreheatParams::default(), &ImportPayload::default())
        .await
        .unwrap();

    assert_eq!(preheat.relationship_count(), 0);
    assert!(harness.objects.calls().is_empty());
    assert_eq!(harness.types.call_count(), 0);
}

#[tokio::test]
async fn test_store_failure_fails_preheat() {
    let harness = Harness::new(seeded_objects());
    harness.types.fail_with("connection reset");

    let result = harness
        .service
        .preheat(&PreheatParams::default(), &payload())
        .await;
    assert_query_failed(&result, "relationship_types");
}

#[tokio::test]
async fn test_preheat_then_validate() {
    init_test_tracing();
    let harness = Harness::new(seeded_objects());
    let mut payload = payload();
    payload.relationships.push(fixtures::import_relationship(
        "RelUid00004",
        TYPE,
        RelationshipItem::tracked_entity("TeUid00000A"),
        RelationshipItem::tracked_entity("TePending01"),
    ));
    let payload = payload.with_pending([EntityRef::new(TrackerType::TrackedEntity, "TePending01")]);

    let preheat = harness
        .service
        .preheat(&PreheatParams::default(), &payload)
        .await
        .unwrap();
    let bundle = ImportBundle::new(preheat, tracker_core::ImportStrategy::CreateAndUpdate, fixtures::admin())
        .with_pending(payload.pending.clone());
    let report = ValidationPipeline::relationships().run_all(&bundle, &payload.relationships);

    // RelUid00002 repeats RelUid00001; RelUid00003 links an enrollment
    // where the type wants a tracked entity
    assert_eq!(
        report.issues_for(&Uid::from("RelUid00002"))[0].code,
        ValidationCode::E4018
    );
    assert_eq!(
        report.issues_for(&Uid::from("RelUid00003"))[0].code,
        ValidationCode::E4010
    );
    assert!(report.issues_for(&Uid::from("RelUid00004")).is_empty());
    assert_eq!(
        report.invalid_uids().into_iter().collect::<Vec<_>>(),
        vec![Uid::from("RelUid00002"), Uid::from("RelUid00003")]
    );
}
