//! Ordered validator pipeline.

use std::collections::HashSet;

use tracker_core::{ConfigError, ImportRelationship, ImportStrategy, TrackerResult};

use crate::bundle::ImportBundle;
use crate::report::ValidationReport;
use crate::validators::{
    ConstraintValidator, ConstraintValueTypeValidator, DataRelationsValidator,
    DuplicationValidator, ExistenceValidator, LinkValidator, MandatoryFieldsValidator,
    SecurityOwnershipValidator,
};

/// One validation rule over a payload relationship.
///
/// Validators hold no state between calls and report findings into the
/// report they are handed.
pub trait Validator: Send + Sync {
    /// Unique name within a pipeline.
    fn name(&self) -> &str;

    /// Whether the rule applies to items imported with `strategy`.
    fn needs_to_run(&self, strategy: ImportStrategy) -> bool;

    fn validate(&self, report: &mut ValidationReport, bundle: &ImportBundle, item: &ImportRelationship);
}

/// Runs validators in a fixed order over each item.
pub struct ValidationPipeline {
    validators: Vec<Box<dyn Validator>>,
    fail_fast: bool,
}

impl ValidationPipeline {
    pub fn builder() -> ValidationPipelineBuilder {
        ValidationPipelineBuilder::default()
    }

    /// The relationship rules in their canonical order.
    pub fn relationships() -> Self {
        Self {
            validators: vec![
                Box::new(MandatoryFieldsValidator),
                Box::new(ExistenceValidator),
                Box::new(LinkValidator),
                Box::new(DataRelationsValidator),
                Box::new(ConstraintValidator),
                Box::new(ConstraintValueTypeValidator),
                Box::new(DuplicationValidator),
                Box::new(SecurityOwnershipValidator),
            ],
            fail_fast: false,
        }
    }

    pub fn names(&self) -> Vec<&str> {
        self.validators.iter().map(|v| v.name()).collect()
    }

    pub fn is_fail_fast(&self) -> bool {
        self.fail_fast
    }

    /// Validate one item into a fresh report.
    ///
    /// Every applicable validator runs, even after earlier ones reported
    /// errors, unless the pipeline was built with `fail_fast`.
    pub fn run(&self, bundle: &ImportBundle, item: &ImportRelationship) -> ValidationReport {
        let strategy = bundle.strategy_for(item);
        let mut report = ValidationReport::new();

        for validator in &self.validators {
            if !validator.needs_to_run(strategy) {
                tracing::trace!(validator = validator.name(), uid = %item.uid, ?strategy, "skipped");
                continue;
            }

            let before = report.len();
            validator.validate(&mut report, bundle, item);
            let added = &report.issues()[before..];
            tracing::trace!(
                validator = validator.name(),
                uid = %item.uid,
                ?strategy,
                issues = added.len(),
                "validated"
            );

            if self.fail_fast && added.iter().any(|issue| issue.is_error()) {
                break;
            }
        }
        report
    }

    /// Validate `items` in order, each into its own report, and merge them.
    pub fn run_all(&self, bundle: &ImportBundle, items: &[ImportRelationship]) -> ValidationReport {
        let mut merged = ValidationReport::new();
        for item in items {
            merged.merge(self.run(bundle, item));
        }
        tracing::debug!(
            items = items.len(),
            issues = merged.len(),
            invalid = merged.invalid_uids().len(),
            "validated relationships"
        );
        merged
    }
}

impl std::fmt::Debug for ValidationPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidationPipeline")
            .field("validators", &self.names())
            .field("fail_fast", &self.fail_fast)
            .finish()
    }
}

/// Composes a custom pipeline.
#[derive(Default)]
pub struct ValidationPipelineBuilder {
    validators: Vec<Box<dyn Validator>>,
    fail_fast: bool,
}

impl ValidationPipelineBuilder {
    pub fn validator(mut self, validator: impl Validator + 'static) -> Self {
        self.validators.push(Box::new(validator));
        self
    }

    /// Stop at the first validator that reports an error.
    pub fn fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }

    pub fn build(self) -> TrackerResult<ValidationPipeline> {
        let mut names = HashSet::new();
        for validator in &self.validators {
            if !names.insert(validator.name().to_string()) {
                return Err(ConfigError::DuplicateValidator {
                    name: validator.name().to_string(),
                }
                .into());
            }
        }
        Ok(ValidationPipeline {
            validators: self.validators,
            fail_fast: self.fail_fast,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracker_test_utils::assertions::assert_duplicate_validator;

    #[test]
    fn test_canonical_order() {
        let pipeline = ValidationPipeline::relationships();
        assert_eq!(
            pipeline.names(),
            vec![
                "mandatory_fields",
                "existence",
                "link",
                "data_relations",
                "constraint",
                "constraint_value_type",
                "duplication",
                "security_ownership",
            ]
        );
        assert!(!pipeline.is_fail_fast());
    }

    #[test]
    fn test_builder_rejects_duplicate_names() {
        let result = ValidationPipeline::builder()
            .validator(LinkValidator)
            .validator(ExistenceValidator)
            .validator(LinkValidator)
            .build();
        assert_duplicate_validator(&result, "link");
    }

    #[test]
    fn test_builder_keeps_order() {
        let pipeline = ValidationPipeline::builder()
            .validator(DuplicationValidator)
            .validator(MandatoryFieldsValidator)
            .fail_fast(true)
            .build()
            .unwrap();
        assert_eq!(pipeline.names(), vec!["duplication", "mandatory_fields"]);
        assert!(pipeline.is_fail_fast());
    }
}
