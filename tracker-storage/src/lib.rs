//! Tracker Storage - Store Contracts and Metadata Cache
//!
//! Defines the keyed store abstraction the aggregate engine reads through,
//! the bounded per-type metadata cache, and the preheat loader that resolves
//! metadata identifiers cache-first. In-memory store implementations live in
//! [`memory`].

pub mod cache;
pub mod keyed;
pub mod memory;
pub mod preheat;

pub use cache::{BoundedTypeCache, CacheStats, Cacheable, TypeCache};
pub use keyed::{FetchOptions, KeyedResult, KeyedStore, SoftDelete};
pub use memory::{InMemoryKeyedStore, InMemoryMetadataStore, KeyedCall, MetadataCall};
pub use preheat::{
    DefaultIdentifierResolver, MetadataIdentifierResolver, MetadataStore, PreheatLoader, WILDCARD,
};
