//! Metadata resolution for imports.
//!
//! [`PreheatLoader`] turns scheme-qualified identifiers into metadata
//! objects, serving what it can from the type cache and batching the rest
//! into a single store query.

pub mod loader;

use async_trait::async_trait;
use tracker_core::{IdScheme, MetadataType, PreheatError, TrackerResult, Uid};

pub use loader::PreheatLoader;

/// Identifier list meaning "every record of the type".
pub const WILDCARD: &str = "*";

/// Backing query interface for one metadata type.
#[async_trait]
pub trait MetadataStore<T>: Send + Sync {
    /// Every record of the type.
    async fn fetch_all(&self) -> TrackerResult<Vec<T>>;

    /// Records whose uid, code or name column matches one of `identifiers`.
    async fn fetch_by_identifiers(
        &self,
        scheme: &IdScheme,
        identifiers: &[String],
    ) -> TrackerResult<Vec<T>>;

    /// Records whose value for `attribute` is one of `values`.
    async fn fetch_by_attribute(&self, attribute: &Uid, values: &[String]) -> TrackerResult<Vec<T>>;
}

/// Maps a scheme-qualified identifier to its canonical cache key.
pub trait MetadataIdentifierResolver: Send + Sync {
    fn cache_key(
        &self,
        metadata_type: MetadataType,
        scheme: &IdScheme,
        identifier: &str,
    ) -> Result<String, PreheatError>;
}

/// Uids are their own key; codes and names are prefixed with the scheme.
///
/// Attribute values are never cached and have no key.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultIdentifierResolver;

impl MetadataIdentifierResolver for DefaultIdentifierResolver {
    fn cache_key(
        &self,
        metadata_type: MetadataType,
        scheme: &IdScheme,
        identifier: &str,
    ) -> Result<String, PreheatError> {
        match scheme {
            IdScheme::Uid => Ok(identifier.to_string()),
            IdScheme::Code | IdScheme::Name => Ok(format!("{}:{}", scheme.label(), identifier)),
            IdScheme::Attribute(_) => Err(PreheatError::UnsupportedScheme {
                metadata_type,
                scheme: scheme.clone(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_keys_per_scheme() {
        let resolver = DefaultIdentifierResolver;
        let t = MetadataType::Program;
        assert_eq!(resolver.cache_key(t, &IdScheme::Uid, "Prog0000001").unwrap(), "Prog0000001");
        assert_eq!(resolver.cache_key(t, &IdScheme::Code, "ANC").unwrap(), "CODE:ANC");
        assert_eq!(resolver.cache_key(t, &IdScheme::Name, "Antenatal").unwrap(), "NAME:Antenatal");
    }

    #[test]
    fn test_attribute_scheme_has_no_cache_key() {
        let scheme = IdScheme::Attribute(Uid::from("AttrUid0001"));
        let err = DefaultIdentifierResolver
            .cache_key(MetadataType::Program, &scheme, "x")
            .unwrap_err();
        assert_eq!(
            err,
            PreheatError::UnsupportedScheme {
                metadata_type: MetadataType::Program,
                scheme,
            }
        );
    }
}
