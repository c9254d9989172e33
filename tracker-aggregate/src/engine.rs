//! Aggregate fetch engine.
//!
//! Each level of the record tree is loaded by running its child fetches
//! concurrently, waiting on all of them, and then descending with the ids
//! found at that level. Store calls run as spawned tasks and share one
//! semaphore, so the number of queries in flight never exceeds
//! `max_concurrent_fetches`. Children are merged into their parents on the
//! calling task once a level's fetches have all completed.

use std::collections::HashSet;
use std::sync::Arc;

use futures_util::future::try_join_all;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracker_core::{
    AggregateConfig, Attribute, DataValue, Enrollment, Event, Note, Relationship, StorageError,
    TrackedEntity, TrackerResult, Uid,
};
use tracker_storage::{FetchOptions, KeyedResult, KeyedStore};

use crate::params::AggregateParams;

/// The stores an engine reads through, one per entity kind.
///
/// Root stores (`tracked_entities`, `enrollments_by_uid`, `events_by_uid`)
/// key each row by its own uid. Child stores key rows by the parent uid:
/// attributes and enrollments by tracked entity, events by enrollment, data
/// values by event, notes by their owning enrollment or event, and
/// relationships by each linked record.
#[derive(Clone)]
pub struct AggregateStores {
    pub tracked_entities: Arc<dyn KeyedStore<TrackedEntity>>,
    pub enrollments_by_uid: Arc<dyn KeyedStore<Enrollment>>,
    pub events_by_uid: Arc<dyn KeyedStore<Event>>,
    pub attributes: Arc<dyn KeyedStore<Attribute>>,
    pub enrollments: Arc<dyn KeyedStore<Enrollment>>,
    pub events: Arc<dyn KeyedStore<Event>>,
    pub data_values: Arc<dyn KeyedStore<DataValue>>,
    pub notes: Arc<dyn KeyedStore<Note>>,
    pub relationships: Arc<dyn KeyedStore<Relationship>>,
}

/// Builds denormalized tracker record trees from keyed stores.
pub struct AggregateFetchEngine {
    stores: AggregateStores,
    config: AggregateConfig,
    permits: Arc<Semaphore>,
}

impl AggregateFetchEngine {
    pub fn new(stores: AggregateStores, config: AggregateConfig) -> Self {
        let permits = Arc::new(Semaphore::new(config.max_concurrent_fetches.max(1)));
        Self {
            stores,
            config,
            permits,
        }
    }

    pub fn config(&self) -> &AggregateConfig {
        &self.config
    }

    /// Tracked entities with attributes, enrollments (and below) and
    /// relationships as selected by `params`.
    pub async fn fetch_tracked_entities(
        &self,
        root_ids: &[Uid],
        params: &AggregateParams,
    ) -> TrackerResult<Vec<TrackedEntity>> {
        let ids = distinct(root_ids);
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let options = params.fetch_options();

        let roots = self.fetch(&self.stores.tracked_entities, &ids, options).await?;
        let mut tracked_entities = in_request_order(&ids, roots);
        if tracked_entities.is_empty() {
            tracing::debug!(requested = ids.len(), "no tracked entities found");
            return Ok(tracked_entities);
        }

        let found: Vec<Uid> = tracked_entities.iter().map(|te| te.uid.clone()).collect();
        let (attributes, enrollments, relationships) = tokio::try_join!(
            self.fetch_if(params.include_attributes, &self.stores.attributes, &found, options),
            self.fetch_if(params.include_enrollments, &self.stores.enrollments, &found, options),
            self.fetch_if(params.include_relationships, &self.stores.relationships, &found, options),
        )?;
        let enrollments = self.complete_enrollments(enrollments, params, options).await?;

        for tracked_entity in &mut tracked_entities {
            tracked_entity.attributes = attributes.get(&tracked_entity.uid).to_vec();
            tracked_entity.enrollments = enrollments.get(&tracked_entity.uid).to_vec();
            tracked_entity.relationships = relationships.get(&tracked_entity.uid).to_vec();
        }

        tracing::debug!(
            requested = ids.len(),
            found = tracked_entities.len(),
            attributes = attributes.len(),
            enrollments = enrollments.len(),
            relationships = relationships.len(),
            "assembled tracked entities"
        );
        Ok(tracked_entities)
    }

    /// Enrollments with events (and below), notes and relationships as
    /// selected by `params`.
    pub async fn fetch_enrollments(
        &self,
        root_ids: &[Uid],
        params: &AggregateParams,
    ) -> TrackerResult<Vec<Enrollment>> {
        let ids = distinct(root_ids);
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let options = params.fetch_options();

        let roots = self.fetch(&self.stores.enrollments_by_uid, &ids, options).await?;
        let roots = self.complete_enrollments(roots, params, options).await?;
        Ok(in_request_order(&ids, roots))
    }

    /// Events with data values, notes and relationships as selected by
    /// `params`. Data values are always loaded.
    pub async fn fetch_events(
        &self,
        root_ids: &[Uid],
        params: &AggregateParams,
    ) -> TrackerResult<Vec<Event>> {
        let ids = distinct(root_ids);
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let options = params.fetch_options();

        let roots = self.fetch(&self.stores.events_by_uid, &ids, options).await?;
        let roots = self.complete_events(roots, params, options).await?;
        Ok(in_request_order(&ids, roots))
    }

    // ========================================================================
    // LEVELS
    // ========================================================================

    async fn complete_enrollments(
        &self,
        mut enrollments: KeyedResult<Enrollment>,
        params: &AggregateParams,
        options: FetchOptions,
    ) -> TrackerResult<KeyedResult<Enrollment>> {
        let ids = distinct_uids(enrollments.values().map(|e| &e.uid));
        if ids.is_empty() {
            return Ok(enrollments);
        }

        let (events, notes, relationships) = tokio::try_join!(
            self.fetch_if(params.include_events, &self.stores.events, &ids, options),
            self.fetch_if(params.include_notes, &self.stores.notes, &ids, options),
            self.fetch_if(params.include_relationships, &self.stores.relationships, &ids, options),
        )?;
        let events = self.complete_events(events, params, options).await?;

        for enrollment in enrollments.values_mut() {
            enrollment.events = events.get(&enrollment.uid).to_vec();
            enrollment.notes = notes.get(&enrollment.uid).to_vec();
            enrollment.relationships = relationships.get(&enrollment.uid).to_vec();
        }

        tracing::debug!(
            enrollments = ids.len(),
            events = events.len(),
            notes = notes.len(),
            relationships = relationships.len(),
            "assembled enrollments"
        );
        Ok(enrollments)
    }

    async fn complete_events(
        &self,
        mut events: KeyedResult<Event>,
        params: &AggregateParams,
        options: FetchOptions,
    ) -> TrackerResult<KeyedResult<Event>> {
        let ids = distinct_uids(events.values().map(|e| &e.uid));
        if ids.is_empty() {
            return Ok(events);
        }

        let (data_values, notes, relationships) = tokio::try_join!(
            self.fetch(&self.stores.data_values, &ids, options),
            self.fetch_if(params.include_notes, &self.stores.notes, &ids, options),
            self.fetch_if(params.include_relationships, &self.stores.relationships, &ids, options),
        )?;

        for event in events.values_mut() {
            event.data_values = data_values.get(&event.uid).to_vec();
            event.notes = notes.get(&event.uid).to_vec();
            event.relationships = relationships.get(&event.uid).to_vec();
        }

        tracing::debug!(
            events = ids.len(),
            data_values = data_values.len(),
            notes = notes.len(),
            relationships = relationships.len(),
            "assembled events"
        );
        Ok(events)
    }

    // ========================================================================
    // FETCH TASKS
    // ========================================================================

    /// A disabled gate yields an empty result without touching the store.
    async fn fetch_if<V>(
        &self,
        enabled: bool,
        store: &Arc<dyn KeyedStore<V>>,
        ids: &[Uid],
        options: FetchOptions,
    ) -> TrackerResult<KeyedResult<V>>
    where
        V: Send + 'static,
    {
        if !enabled {
            return Ok(KeyedResult::empty());
        }
        self.fetch(store, ids, options).await
    }

    /// Query `store` for `ids`, one spawned task per batch.
    async fn fetch<V>(
        &self,
        store: &Arc<dyn KeyedStore<V>>,
        ids: &[Uid],
        options: FetchOptions,
    ) -> TrackerResult<KeyedResult<V>>
    where
        V: Send + 'static,
    {
        if ids.is_empty() {
            return Ok(KeyedResult::empty());
        }

        let batches = ids.chunks(self.config.batch_size.max(1)).map(|batch| {
            let handle = tokio::spawn(run_batch(
                Arc::clone(store),
                Arc::clone(&self.permits),
                batch.to_vec(),
                options,
            ));
            flatten(store.name().to_string(), handle)
        });

        let mut merged = KeyedResult::empty();
        for result in try_join_all(batches).await? {
            merged.extend(result);
        }
        Ok(merged)
    }
}

async fn run_batch<V>(
    store: Arc<dyn KeyedStore<V>>,
    permits: Arc<Semaphore>,
    ids: Vec<Uid>,
    options: FetchOptions,
) -> TrackerResult<KeyedResult<V>> {
    let _permit = permits
        .acquire_owned()
        .await
        .map_err(|e| StorageError::TaskFailed {
            task: store.name().to_string(),
            reason: format!("fetch pool closed: {e}"),
        })?;
    store.fetch_by_parent_ids(&ids, &options).await
}

async fn flatten<T>(task: String, handle: JoinHandle<TrackerResult<T>>) -> TrackerResult<T> {
    match handle.await {
        Ok(result) => result,
        Err(e) => Err(StorageError::TaskFailed {
            task,
            reason: e.to_string(),
        }
        .into()),
    }
}

fn distinct(ids: &[Uid]) -> Vec<Uid> {
    distinct_uids(ids.iter())
}

fn distinct_uids<'a>(ids: impl Iterator<Item = &'a Uid>) -> Vec<Uid> {
    let mut seen = HashSet::new();
    ids.filter(|uid| !uid.is_blank() && seen.insert(*uid))
        .cloned()
        .collect()
}

fn in_request_order<V>(ids: &[Uid], mut rows: KeyedResult<V>) -> Vec<V> {
    let mut ordered = Vec::with_capacity(rows.len());
    for id in ids {
        ordered.extend(rows.take(id));
    }
    ordered
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distinct_keeps_first_occurrence_order() {
        let ids = vec![
            Uid::from("b"),
            Uid::from("a"),
            Uid::from("b"),
            Uid::from(" "),
            Uid::from("c"),
        ];
        let ids = distinct(&ids);
        let out: Vec<&str> = ids.iter().map(Uid::as_str).collect();
        assert_eq!(out, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_in_request_order_follows_ids() {
        let rows: KeyedResult<u8> = vec![(Uid::from("a"), 1), (Uid::from("b"), 2)]
            .into_iter()
            .collect();
        let ordered = in_request_order(&[Uid::from("b"), Uid::from("x"), Uid::from("a")], rows);
        assert_eq!(ordered, vec![2, 1]);
    }
}
