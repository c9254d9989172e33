//! In-memory bounded type cache.
//!
//! One region per [`MetadataType`], held in a sharded concurrent map. Each
//! region tracks insertion order so that capacity is enforced by dropping
//! the oldest-inserted entry. TTL is checked lazily on read.

use std::any::Any;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::time::Instant;
use tracker_core::{CachePolicy, MetadataType, Uid};

use super::traits::{CacheStats, Cacheable, TypeCache};

type CachedValue = Arc<dyn Any + Send + Sync>;

struct CacheEntry {
    value: CachedValue,
    inserted_at: Instant,
    ttl: Duration,
    seq: u64,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.inserted_at) >= self.ttl
    }
}

#[derive(Default)]
struct Region {
    entries: HashMap<String, CacheEntry>,
    /// Insertion log. Stale pairs (replaced or removed keys) are skipped.
    order: VecDeque<(u64, String)>,
    next_seq: u64,
    /// Set by a bulk load; the region is complete until this instant.
    complete_until: Option<Instant>,
}

enum Lookup {
    Hit(CachedValue),
    Expired,
    Miss,
}

impl Region {
    fn insert(&mut self, key: String, value: CachedValue, now: Instant, ttl: Duration) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.order.push_back((seq, key.clone()));
        self.entries.insert(
            key,
            CacheEntry {
                value,
                inserted_at: now,
                ttl,
                seq,
            },
        );
        self.compact_order();
    }

    fn lookup(&mut self, key: &str, now: Instant) -> Lookup {
        let expired = match self.entries.get(key) {
            Some(entry) => entry.is_expired(now),
            None => return Lookup::Miss,
        };
        if expired {
            self.entries.remove(key);
            self.complete_until = None;
            return Lookup::Expired;
        }
        match self.entries.get(key) {
            Some(entry) => Lookup::Hit(Arc::clone(&entry.value)),
            None => Lookup::Miss,
        }
    }

    /// Drop oldest entries until the region fits. Returns the number dropped.
    fn evict_to(&mut self, capacity: usize) -> u64 {
        let mut evicted = 0;
        while self.entries.len() > capacity {
            let Some((seq, key)) = self.order.pop_front() else {
                break;
            };
            if self.entries.get(&key).map(|e| e.seq) == Some(seq) {
                self.entries.remove(&key);
                evicted += 1;
            }
        }
        if evicted > 0 {
            self.complete_until = None;
        }
        evicted
    }

    fn purge_expired(&mut self, now: Instant) -> u64 {
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(now));
        let removed = (before - self.entries.len()) as u64;
        if removed > 0 {
            self.complete_until = None;
            self.compact_order();
        }
        removed
    }

    fn is_live(&self, seq: u64, key: &str) -> bool {
        self.entries.get(key).map(|e| e.seq) == Some(seq)
    }

    fn compact_order(&mut self) {
        if self.order.len() > self.entries.len() * 2 + 16 {
            let entries = &self.entries;
            self.order
                .retain(|(seq, key)| entries.get(key).map(|e| e.seq) == Some(*seq));
        }
    }
}

#[derive(Default)]
struct CacheCounters {
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    expirations: AtomicU64,
}

/// Bounded, typed, time-bounded cache for metadata objects.
#[derive(Default)]
pub struct BoundedTypeCache {
    regions: DashMap<MetadataType, Region>,
    counters: CacheCounters,
}

impl BoundedTypeCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn record_expired(&self, count: u64) {
        if count > 0 {
            self.counters.expirations.fetch_add(count, Ordering::Relaxed);
        }
    }
}

impl std::fmt::Debug for BoundedTypeCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundedTypeCache")
            .field("regions", &self.regions.len())
            .field("stats", &self.stats())
            .finish()
    }
}

impl TypeCache for BoundedTypeCache {
    fn get<V: Cacheable>(&self, key: &str) -> Option<V> {
        let now = Instant::now();
        let lookup = match self.regions.get_mut(&V::metadata_type()) {
            Some(mut region) => region.lookup(key, now),
            None => Lookup::Miss,
        };
        match lookup {
            Lookup::Hit(value) => {
                self.counters.hits.fetch_add(1, Ordering::Relaxed);
                value.downcast_ref::<V>().cloned()
            }
            Lookup::Expired => {
                self.record_expired(1);
                self.counters.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
            Lookup::Miss => {
                self.counters.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    fn put<V: Cacheable>(&self, key: &str, value: V, policy: &CachePolicy) {
        let metadata_type = V::metadata_type();
        if !policy.stores_entries() {
            tracing::trace!(%metadata_type, key, "caching disabled for type, put skipped");
            return;
        }
        let mut region = self.regions.entry(metadata_type).or_default();
        region.insert(key.to_string(), Arc::new(value), Instant::now(), policy.ttl());
        let evicted = region.evict_to(policy.capacity);
        drop(region);
        if evicted > 0 {
            self.counters.evictions.fetch_add(evicted, Ordering::Relaxed);
        }
    }

    fn put_all<V: Cacheable>(&self, entries: Vec<(String, V)>, policy: &CachePolicy) {
        let metadata_type = V::metadata_type();
        if !policy.stores_entries() {
            tracing::trace!(%metadata_type, "caching disabled for type, bulk load skipped");
            return;
        }
        let now = Instant::now();
        let mut region = self.regions.entry(metadata_type).or_default();
        let expired = region.purge_expired(now);
        for (key, value) in entries {
            region.insert(key, Arc::new(value), now, policy.ttl());
        }
        let evicted = region.evict_to(policy.capacity);
        region.complete_until = (evicted == 0).then(|| now + policy.ttl());
        drop(region);

        self.record_expired(expired);
        if evicted > 0 {
            self.counters.evictions.fetch_add(evicted, Ordering::Relaxed);
            tracing::warn!(
                %metadata_type,
                evicted,
                capacity = policy.capacity,
                "bulk load exceeds cache capacity, region left incomplete"
            );
        }
    }

    fn has_any(&self, metadata_type: MetadataType) -> bool {
        self.size(metadata_type) > 0
    }

    fn get_all<V: Cacheable>(&self) -> Vec<V> {
        let now = Instant::now();
        let Some(mut region) = self.regions.get_mut(&V::metadata_type()) else {
            return Vec::new();
        };
        let expired = region.purge_expired(now);
        let values: Vec<CachedValue> = region
            .order
            .iter()
            .filter(|(seq, key)| region.is_live(*seq, key))
            .filter_map(|(_, key)| region.entries.get(key).map(|e| Arc::clone(&e.value)))
            .collect();
        drop(region);
        self.record_expired(expired);

        let mut seen: HashSet<Uid> = HashSet::new();
        values
            .iter()
            .filter_map(|value| value.downcast_ref::<V>())
            .filter(|value| seen.insert(value.uid().clone()))
            .cloned()
            .collect()
    }

    fn is_complete(&self, metadata_type: MetadataType) -> bool {
        let Some(mut region) = self.regions.get_mut(&metadata_type) else {
            return false;
        };
        let now = Instant::now();
        let expired = region.purge_expired(now);
        let complete = region.complete_until.is_some_and(|until| now < until);
        drop(region);
        self.record_expired(expired);
        complete
    }

    fn clear(&self, metadata_type: MetadataType) {
        self.regions.remove(&metadata_type);
    }

    fn clear_all(&self) {
        self.regions.clear();
    }

    fn size(&self, metadata_type: MetadataType) -> usize {
        let Some(mut region) = self.regions.get_mut(&metadata_type) else {
            return 0;
        };
        let expired = region.purge_expired(Instant::now());
        let size = region.entries.len();
        drop(region);
        self.record_expired(expired);
        size
    }

    fn stats(&self) -> CacheStats {
        let entry_count = self
            .regions
            .iter()
            .map(|region| region.entries.len() as u64)
            .sum();
        CacheStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            evictions: self.counters.evictions.load(Ordering::Relaxed),
            expirations: self.counters.expirations.load(Ordering::Relaxed),
            entry_count,
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
