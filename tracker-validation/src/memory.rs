//! In-memory tracker object store.

use std::collections::HashSet;
use std::sync::{PoisonError, RwLock, RwLockReadGuard};

use async_trait::async_trait;
use tracker_core::{
    Enrollment, EntityRef, Event, Relationship, StorageError, TrackedEntity, TrackerResult, Uid,
};

use crate::preheat::TrackerObjectStore;

fn read<T>(lock: &RwLock<T>) -> Result<RwLockReadGuard<'_, T>, StorageError> {
    lock.read().map_err(|_| StorageError::LockPoisoned)
}

/// Tracker records held in vectors. Records every query by name.
#[derive(Debug, Default)]
pub struct InMemoryTrackerObjectStore {
    tracked_entities: RwLock<Vec<TrackedEntity>>,
    enrollments: RwLock<Vec<Enrollment>>,
    events: RwLock<Vec<Event>>,
    relationships: RwLock<Vec<Relationship>>,
    calls: RwLock<Vec<&'static str>>,
    failure: RwLock<Option<String>>,
}

impl InMemoryTrackerObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tracked_entity(self, tracked_entity: TrackedEntity) -> Self {
        self.tracked_entities
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(tracked_entity);
        self
    }

    pub fn with_enrollment(self, enrollment: Enrollment) -> Self {
        self.enrollments
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(enrollment);
        self
    }

    pub fn with_event(self, event: Event) -> Self {
        self.events
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
        self
    }

    pub fn with_relationship(self, relationship: Relationship) -> Self {
        self.relationships
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(relationship);
        self
    }

    /// Make every later query fail with `reason`.
    pub fn fail_with(&self, reason: impl Into<String>) {
        *self.failure.write().unwrap_or_else(PoisonError::into_inner) = Some(reason.into());
    }

    /// Names of the queries received, in order.
    pub fn calls(&self) -> Vec<&'static str> {
        self.calls
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn record(&self, query: &'static str) -> Result<(), StorageError> {
        self.calls
            .write()
            .map_err(|_| StorageError::LockPoisoned)?
            .push(query);
        match read(&self.failure)?.as_ref() {
            Some(reason) => Err(StorageError::QueryFailed {
                store: query.to_string(),
                reason: reason.clone(),
            }),
            None => Ok(()),
        }
    }
}

fn by_uid<T: Clone>(rows: &[T], uids: &[Uid], uid: impl Fn(&T) -> &Uid) -> Vec<T> {
    let wanted: HashSet<&Uid> = uids.iter().collect();
    rows.iter().filter(|row| wanted.contains(uid(row))).cloned().collect()
}

#[async_trait]
impl TrackerObjectStore for InMemoryTrackerObjectStore {
    async fn find_tracked_entities(&self, uids: &[Uid]) -> TrackerResult<Vec<TrackedEntity>> {
        self.record("tracked_entities")?;
        Ok(by_uid(&read(&self.tracked_entities)?, uids, |te| &te.uid))
    }

    async fn find_enrollments(&self, uids: &[Uid]) -> TrackerResult<Vec<Enrollment>> {
        self.record("enrollments")?;
        Ok(by_uid(&read(&self.enrollments)?, uids, |e| &e.uid))
    }

    async fn find_events(&self, uids: &[Uid]) -> TrackerResult<Vec<Event>> {
        self.record("events")?;
        Ok(by_uid(&read(&self.events)?, uids, |e| &e.uid))
    }

    async fn find_relationships(&self, uids: &[Uid]) -> TrackerResult<Vec<Relationship>> {
        self.record("relationships")?;
        Ok(by_uid(&read(&self.relationships)?, uids, |r| &r.uid))
    }

    async fn find_relationships_linking(&self, endpoints: &[EntityRef]) -> TrackerResult<Vec<Relationship>> {
        self.record("relationships_linking")?;
        let wanted: HashSet<&EntityRef> = endpoints.iter().collect();
        Ok(read(&self.relationships)?
            .iter()
            .filter(|r| !r.deleted)
            .filter(|r| {
                r.from
                    .endpoint()
                    .into_iter()
                    .chain(r.to.endpoint())
                    .any(|e| wanted.contains(&e))
            })
            .cloned()
            .collect())
    }
}
