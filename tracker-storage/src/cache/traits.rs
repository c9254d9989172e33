//! Type cache contract and cacheable marker.

use tracker_core::{CachePolicy, IdentifiableObject, MetadataType};

/// Marker for metadata objects the type cache can hold.
///
/// The cache region is taken from [`IdentifiableObject::metadata_type`].
pub trait Cacheable: IdentifiableObject + Clone + Send + Sync + 'static {}

impl<T> Cacheable for T where T: IdentifiableObject + Clone + Send + Sync + 'static {}

/// Per-type, time-bounded, size-bounded cache of metadata objects.
///
/// Implementations perform no I/O and must be safe under concurrent access.
pub trait TypeCache: Send + Sync {
    /// Cached value for `key`, or `None` when absent or expired.
    fn get<V: Cacheable>(&self, key: &str) -> Option<V>;

    /// Insert or replace the value under `key`.
    ///
    /// Does nothing when the policy disables caching.
    fn put<V: Cacheable>(&self, key: &str, value: V, policy: &CachePolicy);

    /// Seed a region with every record of the type and mark it complete.
    fn put_all<V: Cacheable>(&self, entries: Vec<(String, V)>, policy: &CachePolicy);

    /// True when the region holds at least one live entry.
    fn has_any(&self, metadata_type: MetadataType) -> bool;

    /// Every live value of the type, each object once.
    fn get_all<V: Cacheable>(&self) -> Vec<V>;

    /// True while the region still holds an intact complete load.
    fn is_complete(&self, metadata_type: MetadataType) -> bool;

    fn clear(&self, metadata_type: MetadataType);

    fn clear_all(&self);

    /// Live entry count for the type.
    fn size(&self, metadata_type: MetadataType) -> usize;

    fn stats(&self) -> CacheStats;
}

/// Statistics about cache usage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of cache hits.
    pub hits: u64,
    /// Number of cache misses.
    pub misses: u64,
    /// Number of evictions due to capacity.
    pub evictions: u64,
    /// Number of entries dropped on read after their TTL.
    pub expirations: u64,
    /// Number of entries currently in cache.
    pub entry_count: u64,
}

impl CacheStats {
    /// Calculate the hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
