//! Loads the database state an import payload refers to.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use tracker_core::{
    Enrollment, EntityRef, Event, IdScheme, ImportRelationship, Relationship, RelationshipType,
    TrackedEntity, TrackerResult, TrackerType, Uid,
};
use tracker_storage::{MetadataStore, PreheatLoader};

use crate::bundle::TrackerPreheat;

/// Query interface for tracker records.
#[async_trait]
pub trait TrackerObjectStore: Send + Sync {
    /// Tracked entities by uid, soft-deleted ones included.
    async fn find_tracked_entities(&self, uids: &[Uid]) -> TrackerResult<Vec<TrackedEntity>>;

    /// Enrollments by uid, soft-deleted ones included.
    async fn find_enrollments(&self, uids: &[Uid]) -> TrackerResult<Vec<Enrollment>>;

    /// Events by uid, soft-deleted ones included.
    async fn find_events(&self, uids: &[Uid]) -> TrackerResult<Vec<Event>>;

    /// Relationships by uid, soft-deleted ones included.
    async fn find_relationships(&self, uids: &[Uid]) -> TrackerResult<Vec<Relationship>>;

    /// Live relationships with either side pointing at one of `endpoints`.
    async fn find_relationships_linking(&self, endpoints: &[EntityRef]) -> TrackerResult<Vec<Relationship>>;
}

/// Identifier schemes the payload's metadata references are written in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdSchemes {
    pub relationship_type: IdScheme,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreheatParams {
    pub id_schemes: IdSchemes,
}

impl PreheatParams {
    pub fn with_relationship_type_scheme(mut self, scheme: IdScheme) -> Self {
        self.id_schemes.relationship_type = scheme;
        self
    }
}

/// The relationships of one import plus the records created alongside them.
#[derive(Debug, Clone, Default)]
pub struct ImportPayload {
    pub relationships: Vec<ImportRelationship>,
    /// Records created earlier in the same payload; not yet in the store.
    pub pending: Vec<EntityRef>,
}

impl ImportPayload {
    pub fn new(relationships: Vec<ImportRelationship>) -> Self {
        Self {
            relationships,
            pending: Vec::new(),
        }
    }

    pub fn with_pending(mut self, pending: impl IntoIterator<Item = EntityRef>) -> Self {
        self.pending.extend(pending);
        self
    }
}

/// Builds a [`TrackerPreheat`] for a payload.
pub struct TrackerPreheatService {
    loader: Arc<PreheatLoader>,
    relationship_types: Arc<dyn MetadataStore<RelationshipType>>,
    objects: Arc<dyn TrackerObjectStore>,
}

impl TrackerPreheatService {
    pub fn new(
        loader: Arc<PreheatLoader>,
        relationship_types: Arc<dyn MetadataStore<RelationshipType>>,
        objects: Arc<dyn TrackerObjectStore>,
    ) -> Self {
        Self {
            loader,
            relationship_types,
            objects,
        }
    }

    pub fn loader(&self) -> &PreheatLoader {
        &self.loader
    }

    /// Load every relationship type, endpoint and existing relationship the
    /// payload references. All queries run concurrently; the first failure
    /// fails the whole preheat.
    pub async fn preheat(&self, params: &PreheatParams, payload: &ImportPayload) -> TrackerResult<TrackerPreheat> {
        let refs = References::collect(&payload.relationships);

        let (relationship_types, tracked_entities, enrollments, events, relationships, linking) = tokio::try_join!(
            self.loader.resolve::<RelationshipType, _>(
                self.relationship_types.as_ref(),
                &params.id_schemes.relationship_type,
                &refs.relationship_types,
            ),
            async {
                if refs.tracked_entities.is_empty() {
                    return Ok(Vec::new());
                }
                self.objects.find_tracked_entities(&refs.tracked_entities).await
            },
            async {
                if refs.enrollments.is_empty() {
                    return Ok(Vec::new());
                }
                self.objects.find_enrollments(&refs.enrollments).await
            },
            async {
                if refs.events.is_empty() {
                    return Ok(Vec::new());
                }
                self.objects.find_events(&refs.events).await
            },
            async {
                if refs.relationships.is_empty() {
                    return Ok(Vec::new());
                }
                self.objects.find_relationships(&refs.relationships).await
            },
            async {
                if refs.endpoints.is_empty() {
                    return Ok(Vec::new());
                }
                self.objects.find_relationships_linking(&refs.endpoints).await
            },
        )?;

        tracing::debug!(
            relationship_types = relationship_types.len(),
            tracked_entities = tracked_entities.len(),
            enrollments = enrollments.len(),
            events = events.len(),
            relationships = relationships.len(),
            linking = linking.len(),
            "preheated import payload"
        );

        let mut preheat = TrackerPreheat::new();
        relationship_types
            .into_iter()
            .for_each(|t| preheat.add_relationship_type(t));
        tracked_entities
            .into_iter()
            .for_each(|te| preheat.add_tracked_entity(te));
        enrollments.into_iter().for_each(|e| preheat.add_enrollment(e));
        events.into_iter().for_each(|e| preheat.add_event(e));
        linking
            .into_iter()
            .chain(relationships)
            .for_each(|r| preheat.add_relationship(r));
        Ok(preheat)
    }
}

/// Distinct identifiers referenced by a payload, in first-seen order.
#[derive(Debug, Default)]
struct References {
    relationship_types: Vec<String>,
    tracked_entities: Vec<Uid>,
    enrollments: Vec<Uid>,
    events: Vec<Uid>,
    relationships: Vec<Uid>,
    endpoints: Vec<EntityRef>,
}

impl References {
    fn collect(items: &[ImportRelationship]) -> Self {
        let mut refs = Self::default();
        let mut seen_types = HashSet::new();
        let mut seen_relationships = HashSet::new();
        let mut seen_endpoints = HashSet::new();

        for item in items {
            if let Some(identifier) = item.relationship_type.as_ref().filter(|i| !i.is_blank()) {
                if seen_types.insert(identifier.identifier.clone()) {
                    refs.relationship_types.push(identifier.identifier.clone());
                }
            }
            if !item.uid.is_blank() && seen_relationships.insert(item.uid.clone()) {
                refs.relationships.push(item.uid.clone());
            }
            let sides = item.from.iter().chain(item.to.iter());
            for entity in sides.flat_map(|side| side.references()) {
                if !seen_endpoints.insert(entity.clone()) {
                    continue;
                }
                match entity.tracker_type {
                    TrackerType::TrackedEntity => refs.tracked_entities.push(entity.uid.clone()),
                    TrackerType::Enrollment => refs.enrollments.push(entity.uid.clone()),
                    TrackerType::Event => refs.events.push(entity.uid.clone()),
                    TrackerType::Relationship => continue,
                }
                refs.endpoints.push(entity);
            }
        }
        refs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracker_core::RelationshipItem;
    use tracker_test_utils::fixtures;

    #[test]
    fn test_references_are_distinct_per_kind() {
        let items = vec![
            fixtures::import_relationship(
                "RelUid00001",
                "TypeUid0001",
                RelationshipItem::tracked_entity("TeUid000001"),
                RelationshipItem::enrollment("EnUid000001"),
            ),
            fixtures::import_relationship(
                "RelUid00002",
                "TypeUid0001",
                RelationshipItem::tracked_entity("TeUid000001"),
                RelationshipItem::event("EvUid000001"),
            ),
        ];
        let refs = References::collect(&items);

        assert_eq!(refs.relationship_types, vec!["TypeUid0001".to_string()]);
        assert_eq!(refs.tracked_entities, vec![Uid::from("TeUid000001")]);
        assert_eq!(refs.enrollments, vec![Uid::from("EnUid000001")]);
        assert_eq!(refs.events, vec![Uid::from("EvUid000001")]);
        assert_eq!(refs.relationships.len(), 2);
        assert_eq!(refs.endpoints.len(), 3);
    }

    #[test]
    fn test_references_skip_missing_parts() {
        let items = vec![ImportRelationship::new("RelUid00001")];
        let refs = References::collect(&items);
        assert!(refs.relationship_types.is_empty());
        assert!(refs.endpoints.is_empty());
        assert_eq!(refs.relationships, vec![Uid::from("RelUid00001")]);
    }
}
