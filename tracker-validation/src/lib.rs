//! Tracker Validation - Relationship Import Checks
//!
//! Preheats the database state an import payload refers to, then runs an
//! ordered list of validators over each payload relationship. Validators
//! report issues into a [`ValidationReport`]; only infrastructure failures
//! surface as errors.
//!
//! ```text
//! payload -> TrackerPreheatService -> ImportBundle -> ValidationPipeline -> ValidationReport
//! ```

pub mod bundle;
pub mod memory;
pub mod pipeline;
pub mod preheat;
pub mod report;
pub mod validators;

pub use bundle::{ImportBundle, TrackerPreheat};
pub use memory::InMemoryTrackerObjectStore;
pub use pipeline::{ValidationPipeline, ValidationPipelineBuilder, Validator};
pub use preheat::{IdSchemes, ImportPayload, PreheatParams, TrackerObjectStore, TrackerPreheatService};
pub use report::{ValidationCode, ValidationIssue, ValidationReport};
pub use validators::{
    ConstraintValidator, ConstraintValueTypeValidator, DataRelationsValidator,
    DuplicationValidator, ExistenceValidator, LinkValidator, MandatoryFieldsValidator,
    SecurityOwnershipValidator,
};
