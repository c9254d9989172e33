//! In-memory stores.
//!
//! Both stores record every call they receive and can be told to fail, so
//! tests can assert exactly which queries a component issued.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use async_trait::async_trait;
use tracker_core::{IdScheme, PreheatError, StorageError, TrackerResult, Uid};

use crate::cache::Cacheable;
use crate::keyed::{FetchOptions, KeyedResult, KeyedStore, SoftDelete};
use crate::preheat::MetadataStore;

fn read<T>(lock: &RwLock<T>) -> Result<RwLockReadGuard<'_, T>, StorageError> {
    lock.read().map_err(|_| StorageError::LockPoisoned)
}

fn write<T>(lock: &RwLock<T>) -> Result<RwLockWriteGuard<'_, T>, StorageError> {
    lock.write().map_err(|_| StorageError::LockPoisoned)
}

fn injected_failure(store: &str, failure: &RwLock<Option<String>>) -> Result<(), StorageError> {
    match read(failure)?.as_ref() {
        Some(reason) => Err(StorageError::QueryFailed {
            store: store.to_string(),
            reason: reason.clone(),
        }),
        None => Ok(()),
    }
}

// ============================================================================
// KEYED STORE
// ============================================================================

/// One recorded `fetch_by_parent_ids` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyedCall {
    pub ids: Vec<Uid>,
    pub options: FetchOptions,
}

/// Keyed store over a fixed list of `(parent, row)` pairs.
#[derive(Debug)]
pub struct InMemoryKeyedStore<V> {
    name: String,
    rows: RwLock<Vec<(Uid, V)>>,
    calls: RwLock<Vec<KeyedCall>>,
    failure: RwLock<Option<String>>,
    latency: Option<Duration>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl<V> InMemoryKeyedStore<V> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rows: RwLock::new(Vec::new()),
            calls: RwLock::new(Vec::new()),
            failure: RwLock::new(None),
            latency: None,
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    /// Sleep this long inside every call.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn with_row(self, parent: impl Into<Uid>, value: V) -> Self {
        self.insert(parent, value);
        self
    }

    pub fn insert(&self, parent: impl Into<Uid>, value: V) {
        self.rows
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push((parent.into(), value));
    }

    /// Make every later call fail with `reason`.
    pub fn fail_with(&self, reason: impl Into<String>) {
        *self.failure.write().unwrap_or_else(PoisonError::into_inner) = Some(reason.into());
    }

    pub fn calls(&self) -> Vec<KeyedCall> {
        self.calls
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Highest number of calls observed running at once.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<V> KeyedStore<V> for InMemoryKeyedStore<V>
where
    V: SoftDelete + Clone + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch_by_parent_ids(
        &self,
        ids: &[Uid],
        options: &FetchOptions,
    ) -> TrackerResult<KeyedResult<V>> {
        write(&self.calls)?.push(KeyedCall {
            ids: ids.to_vec(),
            options: *options,
        });

        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(running, Ordering::SeqCst);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        injected_failure(&self.name, &self.failure)?;

        let wanted: HashSet<&Uid> = ids.iter().collect();
        let rows = read(&self.rows)?;
        Ok(rows
            .iter()
            .filter(|(parent, _)| wanted.contains(parent))
            .filter(|(_, value)| options.include_deleted || !value.is_deleted())
            .map(|(parent, value)| (parent.clone(), value.clone()))
            .collect())
    }
}

// ============================================================================
// METADATA STORE
// ============================================================================

/// One recorded metadata query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetadataCall {
    All,
    Identifiers {
        scheme: IdScheme,
        identifiers: Vec<String>,
    },
    Attribute {
        attribute: Uid,
        values: Vec<String>,
    },
}

/// Metadata store over a fixed list of records.
#[derive(Debug)]
pub struct InMemoryMetadataStore<T> {
    name: String,
    records: RwLock<Vec<T>>,
    calls: RwLock<Vec<MetadataCall>>,
    failure: RwLock<Option<String>>,
}

impl<T: Cacheable> InMemoryMetadataStore<T> {
    pub fn new(name: impl Into<String>, records: Vec<T>) -> Self {
        Self {
            name: name.into(),
            records: RwLock::new(records),
            calls: RwLock::new(Vec::new()),
            failure: RwLock::new(None),
        }
    }

    pub fn insert(&self, record: T) {
        self.records
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record);
    }

    pub fn fail_with(&self, reason: impl Into<String>) {
        *self.failure.write().unwrap_or_else(PoisonError::into_inner) = Some(reason.into());
    }

    pub fn calls(&self) -> Vec<MetadataCall> {
        self.calls
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    fn matching(&self, matches: impl Fn(&T) -> bool) -> TrackerResult<Vec<T>> {
        injected_failure(&self.name, &self.failure)?;
        let records = read(&self.records)?;
        Ok(records.iter().filter(|r| matches(r)).cloned().collect())
    }
}

#[async_trait]
impl<T: Cacheable> MetadataStore<T> for InMemoryMetadataStore<T> {
    async fn fetch_all(&self) -> TrackerResult<Vec<T>> {
        write(&self.calls)?.push(MetadataCall::All);
        self.matching(|_| true)
    }

    async fn fetch_by_identifiers(
        &self,
        scheme: &IdScheme,
        identifiers: &[String],
    ) -> TrackerResult<Vec<T>> {
        write(&self.calls)?.push(MetadataCall::Identifiers {
            scheme: scheme.clone(),
            identifiers: identifiers.to_vec(),
        });
        if scheme.is_attribute() {
            return Err(PreheatError::UnsupportedScheme {
                metadata_type: T::metadata_type(),
                scheme: scheme.clone(),
            }
            .into());
        }
        let wanted: HashSet<&str> = identifiers.iter().map(String::as_str).collect();
        self.matching(|record| {
            record
                .identifier(scheme)
                .is_some_and(|value| wanted.contains(value.as_str()))
        })
    }

    async fn fetch_by_attribute(&self, attribute: &Uid, values: &[String]) -> TrackerResult<Vec<T>> {
        write(&self.calls)?.push(MetadataCall::Attribute {
            attribute: attribute.clone(),
            values: values.to_vec(),
        });
        let wanted: HashSet<&str> = values.iter().map(String::as_str).collect();
        self.matching(|record| {
            record
                .attribute_value(attribute)
                .is_some_and(|value| wanted.contains(value))
        })
    }
}
