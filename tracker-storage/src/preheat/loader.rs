//! Cache-first metadata resolution.

use std::collections::HashSet;
use std::sync::Arc;

use tracker_core::{CachePolicy, IdScheme, PreheatConfig, TrackerResult};

use super::{DefaultIdentifierResolver, MetadataIdentifierResolver, MetadataStore, WILDCARD};
use crate::cache::{BoundedTypeCache, Cacheable, TypeCache};

/// Resolves identifier lists to metadata objects through the type cache.
///
/// One loader is shared across imports; the cache it wraps is the only
/// state that outlives a call.
#[derive(Debug)]
pub struct PreheatLoader<C = BoundedTypeCache, R = DefaultIdentifierResolver> {
    cache: Arc<C>,
    config: PreheatConfig,
    resolver: R,
}

impl PreheatLoader {
    /// Loader over a fresh cache with the default key resolver.
    pub fn new(config: PreheatConfig) -> Self {
        Self::with_cache(Arc::new(BoundedTypeCache::new()), config, DefaultIdentifierResolver)
    }
}

impl<C, R> PreheatLoader<C, R>
where
    C: TypeCache,
    R: MetadataIdentifierResolver,
{
    pub fn with_cache(cache: Arc<C>, config: PreheatConfig, resolver: R) -> Self {
        Self {
            cache,
            config,
            resolver,
        }
    }

    pub fn cache(&self) -> &C {
        &self.cache
    }

    pub fn config(&self) -> &PreheatConfig {
        &self.config
    }

    /// Resolve `ids` under `scheme` to records of type `T`.
    ///
    /// A single `"*"` loads every record of the type. Attribute schemes and
    /// non-cacheable types always query the store. Otherwise cached records
    /// are returned without a query and the misses are fetched in one batch
    /// and cached. Blank and repeated ids are dropped first.
    pub async fn resolve<T, S>(&self, store: &S, scheme: &IdScheme, ids: &[String]) -> TrackerResult<Vec<T>>
    where
        T: Cacheable,
        S: MetadataStore<T> + ?Sized,
    {
        let metadata_type = T::metadata_type();
        let ids = distinct_ids(ids);
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let policy = self.config.policy_for(metadata_type);
        if ids.len() == 1 && ids[0] == WILDCARD {
            return self.resolve_all(store, &policy).await;
        }

        if let IdScheme::Attribute(attribute) = scheme {
            tracing::debug!(
                %metadata_type,
                %attribute,
                requested = ids.len(),
                "attribute scheme, querying store directly"
            );
            return store.fetch_by_attribute(attribute, &ids).await;
        }

        if !policy.stores_entries() {
            tracing::debug!(
                %metadata_type,
                scheme = scheme.label(),
                requested = ids.len(),
                "type not cached, querying store directly"
            );
            return store.fetch_by_identifiers(scheme, &ids).await;
        }

        let mut found = Vec::with_capacity(ids.len());
        let mut misses = Vec::new();
        for id in ids {
            let key = self.resolver.cache_key(metadata_type, scheme, &id)?;
            match self.cache.get::<T>(&key) {
                Some(record) => found.push(record),
                None => misses.push(id),
            }
        }
        let hits = found.len();

        if !misses.is_empty() {
            let fetched = store.fetch_by_identifiers(scheme, &misses).await?;
            for record in &fetched {
                if let Some(identifier) = record.identifier(scheme) {
                    let key = self.resolver.cache_key(metadata_type, scheme, &identifier)?;
                    self.cache.put(&key, record.clone(), &policy);
                }
            }
            found.extend(fetched);
        }

        tracing::debug!(
            %metadata_type,
            scheme = scheme.label(),
            hits,
            misses = misses.len(),
            resolved = found.len(),
            "resolved metadata identifiers"
        );
        Ok(found)
    }

    async fn resolve_all<T, S>(&self, store: &S, policy: &CachePolicy) -> TrackerResult<Vec<T>>
    where
        T: Cacheable,
        S: MetadataStore<T> + ?Sized,
    {
        let metadata_type = T::metadata_type();
        if policy.stores_entries() && self.cache.is_complete(metadata_type) {
            let cached = self.cache.get_all::<T>();
            tracing::debug!(%metadata_type, count = cached.len(), "wildcard served from cache");
            return Ok(cached);
        }

        let records = store.fetch_all().await?;
        if policy.stores_entries() {
            let mut entries = Vec::with_capacity(records.len());
            for record in &records {
                let key = self
                    .resolver
                    .cache_key(metadata_type, &IdScheme::Uid, record.uid().as_str())?;
                entries.push((key, record.clone()));
            }
            self.cache.put_all(entries, policy);
        }
        tracing::debug!(%metadata_type, count = records.len(), "wildcard loaded from store");
        Ok(records)
    }
}

fn distinct_ids(ids: &[String]) -> Vec<String> {
    let mut seen: HashSet<&str> = HashSet::with_capacity(ids.len());
    let mut distinct = Vec::with_capacity(ids.len());
    for id in ids {
        if id.trim().is_empty() || !seen.insert(id.as_str()) {
            continue;
        }
        distinct.push(id.clone());
    }
    distinct
}

// ============================================================================
// TESTS
// ============================================================================
