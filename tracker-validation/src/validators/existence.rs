use tracker_core::{ImportRelationship, ImportStrategy};

use crate::bundle::ImportBundle;
use crate::pipeline::Validator;
use crate::report::{ValidationCode, ValidationReport};

/// Checks the item's existence against what its strategy expects.
///
/// Relationships are immutable, so an update of a live relationship is
/// reported as a warning and otherwise ignored.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExistenceValidator;

impl Validator for ExistenceValidator {
    fn name(&self) -> &str {
        "existence"
    }

    fn needs_to_run(&self, _strategy: ImportStrategy) -> bool {
        true
    }

    fn validate(&self, report: &mut ValidationReport, bundle: &ImportBundle, item: &ImportRelationship) {
        let subject = item.entity_ref();
        let uid = [item.uid.as_str()];
        let existing = bundle.preheat.relationship(&item.uid);

        match (bundle.strategy_for(item), existing) {
            (_, Some(relationship)) if relationship.deleted => {
                report.add_error(ValidationCode::E4017, subject, uid);
            }
            (ImportStrategy::Create, Some(_)) => {
                report.add_error(ValidationCode::E4015, subject, uid);
            }
            (ImportStrategy::Update, Some(_)) => {
                report.add_warning(ValidationCode::E4015, subject, uid);
            }
            (ImportStrategy::Update | ImportStrategy::Delete, None) => {
                report.add_error(ValidationCode::E4016, subject, uid);
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validators::testing::{self, a_to_b};
    use tracker_core::{RelationshipItem, Severity};
    use tracker_test_utils::fixtures;

    fn with_existing(strategy: ImportStrategy, deleted: bool) -> ImportBundle {
        let mut preheat = testing::preheat();
        let mut existing = fixtures::relationship(
            "RelUid00001",
            testing::TYPE,
            RelationshipItem::tracked_entity(testing::TE_A),
            RelationshipItem::tracked_entity(testing::TE_B),
        );
        existing.deleted = deleted;
        preheat.add_relationship(existing);
        ImportBundle::new(preheat, strategy, fixtures::admin())
    }

    #[test]
    fn test_create_new_passes() {
        let bundle = testing::bundle(ImportStrategy::Create);
        let report = testing::validate(&ExistenceValidator, &bundle, &a_to_b("RelUid00001"));
        assert!(report.is_empty());
    }

    #[test]
    fn test_create_existing_is_error() {
        let bundle = with_existing(ImportStrategy::Create, false);
        let report = testing::validate(&ExistenceValidator, &bundle, &a_to_b("RelUid00001"));
        assert_eq!(report.codes(), vec![ValidationCode::E4015]);
        assert!(report.has_errors());
    }

    #[test]
    fn test_update_existing_is_warning() {
        let bundle = with_existing(ImportStrategy::Update, false);
        let report = testing::validate(&ExistenceValidator, &bundle, &a_to_b("RelUid00001"));
        assert_eq!(report.codes(), vec![ValidationCode::E4015]);
        assert_eq!(report.issues()[0].severity, Severity::Warning);
        assert!(!report.has_errors());
    }

    #[test]
    fn test_create_and_update_on_existing_warns() {
        let bundle = with_existing(ImportStrategy::CreateAndUpdate, false);
        let report = testing::validate(&ExistenceValidator, &bundle, &a_to_b("RelUid00001"));
        assert_eq!(report.warnings().len(), 1);
    }

    #[test]
    fn test_deleted_is_reported_for_every_strategy() {
        for strategy in [ImportStrategy::Create, ImportStrategy::Update, ImportStrategy::Delete] {
            let bundle = with_existing(strategy, true);
            let report = testing::validate(&ExistenceValidator, &bundle, &a_to_b("RelUid00001"));
            assert_eq!(report.codes(), vec![ValidationCode::E4017], "{strategy:?}");
        }
    }

    #[test]
    fn test_update_or_delete_missing_is_error() {
        for strategy in [ImportStrategy::Update, ImportStrategy::Delete] {
            let bundle = testing::bundle(strategy);
            let report = testing::validate(&ExistenceValidator, &bundle, &a_to_b("RelUid00009"));
            assert_eq!(report.codes(), vec![ValidationCode::E4016], "{strategy:?}");
        }
    }
}
