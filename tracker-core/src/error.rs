//! Error types for pipeline infrastructure failures
//!
//! Validation findings are never errors; they are issues on a report.

use crate::{IdScheme, MetadataType};
use thiserror::Error;

/// Storage layer errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("Query failed on {store}: {reason}")]
    QueryFailed { store: String, reason: String },

    #[error("Fetch task {task} failed: {reason}")]
    TaskFailed { task: String, reason: String },

    #[error("Storage lock poisoned")]
    LockPoisoned,
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required configuration field: {field}")]
    MissingRequired { field: String },

    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Failed to parse config TOML: {reason}")]
    Parse { reason: String },

    #[error("Failed to read config file {path}: {reason}")]
    Io { path: String, reason: String },

    #[error("Validator registered twice: {name}")]
    DuplicateValidator { name: String },
}

/// Metadata preheat errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PreheatError {
    #[error("Id scheme {scheme:?} is not supported for {metadata_type}")]
    UnsupportedScheme {
        metadata_type: MetadataType,
        scheme: IdScheme,
    },
}

/// Master error type for the pipeline.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TrackerError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Preheat error: {0}")]
    Preheat(#[from] PreheatError),
}

/// Result type alias for pipeline operations.
pub type TrackerResult<T> = Result<T, TrackerError>;

// =============================================================================
// TESTS
// =============================================================================
