//! Metadata cache used during preheat.
//!
//! Regions are keyed by [`tracker_core::MetadataType`]. Each region carries
//! its own TTL and capacity from the caller's [`tracker_core::CachePolicy`],
//! and remembers whether it currently holds a complete load of its type so
//! that wildcard lookups can be served without a store query.

pub mod bounded;
pub mod traits;

pub use bounded::BoundedTypeCache;
pub use traits::{CacheStats, Cacheable, TypeCache};
