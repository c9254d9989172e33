//! Configuration for the preheat cache and the aggregate fetch engine.
//!
//! Every section has defaults, so an empty TOML document is a valid
//! configuration. Unknown keys are rejected.

use crate::{ConfigError, MetadataType};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TrackerConfig {
    #[serde(default)]
    pub preheat: PreheatConfig,
    #[serde(default)]
    pub aggregate: AggregateConfig,
}

/// Cache parameters for one metadata type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CachePolicy {
    /// When false every lookup goes straight to the store.
    pub cacheable: bool,
    pub ttl_minutes: u64,
    /// Maximum entries held for the type. Zero disables caching.
    pub capacity: usize,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            cacheable: true,
            ttl_minutes: 5,
            capacity: 1000,
        }
    }
}

impl CachePolicy {
    pub fn new(ttl_minutes: u64, capacity: usize) -> Self {
        Self {
            cacheable: true,
            ttl_minutes,
            capacity,
        }
    }

    /// Policy for a type that is never cached.
    pub fn disabled() -> Self {
        Self {
            cacheable: false,
            ttl_minutes: 0,
            capacity: 0,
        }
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_minutes.saturating_mul(60))
    }

    /// True when entries may be stored at all.
    pub fn stores_entries(&self) -> bool {
        self.cacheable && self.capacity > 0 && self.ttl_minutes > 0
    }
}

/// Per-type cache policies with a shared default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PreheatConfig {
    #[serde(default)]
    pub default: CachePolicy,
    pub relationship_type: Option<CachePolicy>,
    pub tracked_entity_type: Option<CachePolicy>,
    pub program: Option<CachePolicy>,
    pub program_stage: Option<CachePolicy>,
    pub organisation_unit: Option<CachePolicy>,
    pub data_element: Option<CachePolicy>,
}

impl PreheatConfig {
    /// Effective policy for a metadata type.
    pub fn policy_for(&self, metadata_type: MetadataType) -> CachePolicy {
        self.override_for(metadata_type).unwrap_or(self.default)
    }

    pub fn with_default(mut self, policy: CachePolicy) -> Self {
        self.default = policy;
        self
    }

    pub fn with_policy(mut self, metadata_type: MetadataType, policy: CachePolicy) -> Self {
        *self.slot(metadata_type) = Some(policy);
        self
    }

    fn override_for(&self, metadata_type: MetadataType) -> Option<CachePolicy> {
        match metadata_type {
            MetadataType::RelationshipType => self.relationship_type,
            MetadataType::TrackedEntityType => self.tracked_entity_type,
            MetadataType::Program => self.program,
            MetadataType::ProgramStage => self.program_stage,
            MetadataType::OrganisationUnit => self.organisation_unit,
            MetadataType::DataElement => self.data_element,
        }
    }

    fn slot(&mut self, metadata_type: MetadataType) -> &mut Option<CachePolicy> {
        match metadata_type {
            MetadataType::RelationshipType => &mut self.relationship_type,
            MetadataType::TrackedEntityType => &mut self.tracked_entity_type,
            MetadataType::Program => &mut self.program,
            MetadataType::ProgramStage => &mut self.program_stage,
            MetadataType::OrganisationUnit => &mut self.organisation_unit,
            MetadataType::DataElement => &mut self.data_element,
        }
    }
}

/// Aggregate fetch tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AggregateConfig {
    /// Root ids per store call.
    pub batch_size: usize,
    /// Store calls allowed in flight at once.
    pub max_concurrent_fetches: usize,
}

impl Default for AggregateConfig {
    fn default() -> Self {
        Self {
            batch_size: 1000,
            max_concurrent_fetches: 8,
        }
    }
}

impl AggregateConfig {
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_max_concurrent_fetches(mut self, max: usize) -> Self {
        self.max_concurrent_fetches = max;
        self
    }
}

impl TrackerConfig {
    /// Read, parse and validate a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let config = Self::from_path(path)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|e| ConfigError::Parse {
            reason: e.to_string(),
        })
    }

    pub fn with_preheat(mut self, preheat: PreheatConfig) -> Self {
        self.preheat = preheat;
        self
    }

    pub fn with_aggregate(mut self, aggregate: AggregateConfig) -> Self {
        self.aggregate = aggregate;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_policy("preheat.default", &self.preheat.default)?;
        for metadata_type in MetadataType::ALL {
            if let Some(policy) = self.preheat.override_for(metadata_type) {
                let field = format!("preheat.{}", field_name(metadata_type));
                validate_policy(&field, &policy)?;
            }
        }
        if self.aggregate.batch_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "aggregate.batch_size".to_string(),
                value: "0".to_string(),
                reason: "must be > 0".to_string(),
            });
        }
        if self.aggregate.max_concurrent_fetches == 0 {
            return Err(ConfigError::InvalidValue {
                field: "aggregate.max_concurrent_fetches".to_string(),
                value: "0".to_string(),
                reason: "must be > 0".to_string(),
            });
        }
        Ok(())
    }
}

fn validate_policy(field: &str, policy: &CachePolicy) -> Result<(), ConfigError> {
    if policy.cacheable && policy.capacity > 0 && policy.ttl_minutes == 0 {
        return Err(ConfigError::InvalidValue {
            field: format!("{field}.ttl_minutes"),
            value: "0".to_string(),
            reason: "must be > 0 for a cacheable type with capacity".to_string(),
        });
    }
    Ok(())
}

fn field_name(metadata_type: MetadataType) -> &'static str {
    match metadata_type {
        MetadataType::RelationshipType => "relationship_type",
        MetadataType::TrackedEntityType => "tracked_entity_type",
        MetadataType::Program => "program",
        MetadataType::ProgramStage => "program_stage",
        MetadataType::OrganisationUnit => "organisation_unit",
        MetadataType::DataElement => "data_element",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_yields_defaults() {
        let config = TrackerConfig::from_toml_str("").unwrap();
        assert_eq!(config, TrackerConfig::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_per_type_override_wins_over_default() {
        let config = TrackerConfig::from_toml_str(
            r#"
            [preheat.default]
            cacheable = true
            ttl_minutes = 10
            capacity = 50

            [preheat.relationship_type]
            cacheable = true
            ttl_minutes = 60
            capacity = 5

            [aggregate]
            batch_size = 200
            max_concurrent_fetches = 4
            "#,
        )
        .unwrap();
        config.validate().unwrap();

        let rt = config.preheat.policy_for(MetadataType::RelationshipType);
        assert_eq!(rt.capacity, 5);
        assert_eq!(rt.ttl(), Duration::from_secs(3600));
        assert_eq!(config.preheat.policy_for(MetadataType::Program).capacity, 50);
        assert_eq!(config.aggregate.batch_size, 200);
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        let err = TrackerConfig::from_toml_str("[aggregate]\nbatch = 3\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_validate_rejects_zero_batch_size() {
        let config = TrackerConfig::default()
            .with_aggregate(AggregateConfig::default().with_batch_size(0));
        let err = config.validate().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue { ref field, .. } if field == "aggregate.batch_size"
        ));
    }

    #[test]
    fn test_validate_rejects_zero_ttl_on_cacheable_override() {
        let preheat = PreheatConfig::default().with_policy(MetadataType::Program, CachePolicy::new(0, 10));
        let err = TrackerConfig::default().with_preheat(preheat).validate().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue { ref field, .. } if field == "preheat.program.ttl_minutes"
        ));
    }

    #[test]
    fn test_disabled_policy_is_valid_and_stores_nothing() {
        let preheat = PreheatConfig::default().with_policy(MetadataType::DataElement, CachePolicy::disabled());
        let config = TrackerConfig::default().with_preheat(preheat);
        assert!(config.validate().is_ok());
        assert!(!config.preheat.policy_for(MetadataType::DataElement).stores_entries());
    }

    #[test]
    fn test_missing_file_maps_to_io_error() {
        let err = TrackerConfig::from_path(Path::new("/nonexistent/tracker.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
