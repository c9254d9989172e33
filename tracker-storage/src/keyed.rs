//! Parent-keyed fetch results and the store contract that produces them.

use async_trait::async_trait;
use std::collections::HashMap;
use tracker_core::{
    Attribute, DataValue, Enrollment, Event, Note, Relationship, TrackedEntity, TrackerResult, Uid,
};

/// Multi-valued mapping from a parent uid to its child rows.
///
/// Rows under one key keep the order the store produced them in. There is
/// no ordering across keys.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyedResult<V> {
    entries: HashMap<Uid, Vec<V>>,
}

impl<V> Default for KeyedResult<V> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<V> KeyedResult<V> {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Append a row under `parent`.
    pub fn insert(&mut self, parent: Uid, value: V) {
        self.entries.entry(parent).or_default().push(value);
    }

    /// Rows for `parent`, empty when there are none.
    pub fn get(&self, parent: &Uid) -> &[V] {
        self.entries.get(parent).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Move the rows for `parent` out of the result.
    pub fn take(&mut self, parent: &Uid) -> Vec<V> {
        self.entries.remove(parent).unwrap_or_default()
    }

    pub fn contains_key(&self, parent: &Uid) -> bool {
        self.entries.contains_key(parent)
    }

    /// Number of parent keys with at least one row.
    pub fn key_count(&self) -> usize {
        self.entries.len()
    }

    /// Total number of rows across all keys.
    pub fn len(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.values().all(Vec::is_empty)
    }

    pub fn keys(&self) -> impl Iterator<Item = &Uid> {
        self.entries.keys()
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.entries.values().flatten()
    }

    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut V> {
        self.entries.values_mut().flatten()
    }

    /// Fold another result in. Rows for a shared key are appended.
    pub fn extend(&mut self, other: KeyedResult<V>) {
        for (parent, rows) in other.entries {
            self.entries.entry(parent).or_default().extend(rows);
        }
    }

    pub fn into_inner(self) -> HashMap<Uid, Vec<V>> {
        self.entries
    }
}

impl<V> FromIterator<(Uid, V)> for KeyedResult<V> {
    fn from_iter<I: IntoIterator<Item = (Uid, V)>>(iter: I) -> Self {
        let mut result = Self::empty();
        for (parent, value) in iter {
            result.insert(parent, value);
        }
        result
    }
}

/// Options passed through to every store call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchOptions {
    /// Return soft-deleted rows as well.
    pub include_deleted: bool,
}

impl FetchOptions {
    pub fn with_deleted(include_deleted: bool) -> Self {
        Self { include_deleted }
    }
}

/// Rows that can be soft-deleted.
pub trait SoftDelete {
    fn is_deleted(&self) -> bool {
        false
    }
}

impl SoftDelete for TrackedEntity {
    fn is_deleted(&self) -> bool {
        self.deleted
    }
}

impl SoftDelete for Enrollment {
    fn is_deleted(&self) -> bool {
        self.deleted
    }
}

impl SoftDelete for Event {
    fn is_deleted(&self) -> bool {
        self.deleted
    }
}

impl SoftDelete for Relationship {
    fn is_deleted(&self) -> bool {
        self.deleted
    }
}

impl SoftDelete for Attribute {}
impl SoftDelete for DataValue {}
impl SoftDelete for Note {}

/// Source of child rows grouped by parent uid.
///
/// One implementation exists per entity kind. Implementations must honor
/// [`FetchOptions::include_deleted`] and must not retry on failure.
#[async_trait]
pub trait KeyedStore<V>: Send + Sync {
    /// Short name used in logs and errors.
    fn name(&self) -> &str;

    async fn fetch_by_parent_ids(
        &self,
        ids: &[Uid],
        options: &FetchOptions,
    ) -> TrackerResult<KeyedResult<V>>;
}
