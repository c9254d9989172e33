use tracker_core::{ImportRelationship, ImportStrategy};

use super::sides;
use crate::bundle::ImportBundle;
use crate::pipeline::Validator;
use crate::report::{ValidationCode, ValidationReport};

/// The relationship type and both linked records must be resolvable.
///
/// A linked record resolves when it exists in the database or is created
/// earlier in the same payload.
#[derive(Debug, Clone, Copy, Default)]
pub struct DataRelationsValidator;

impl Validator for DataRelationsValidator {
    fn name(&self) -> &str {
        "data_relations"
    }

    fn needs_to_run(&self, strategy: ImportStrategy) -> bool {
        strategy.is_create()
    }

    fn validate(&self, report: &mut ValidationReport, bundle: &ImportBundle, item: &ImportRelationship) {
        if let Some(identifier) = item.relationship_type.as_ref().filter(|i| !i.is_blank()) {
            if bundle.relationship_type(item).is_none() {
                report.add_error(ValidationCode::E4006, item.entity_ref(), [identifier.identifier.as_str()]);
            }
        }

        for (_, side) in sides(item) {
            let Some(endpoint) = side.and_then(|side| side.endpoint()) else {
                continue;
            };
            if !bundle.is_known(&endpoint) {
                report.add_error(
                    ValidationCode::E4012,
                    item.entity_ref(),
                    [endpoint.tracker_type.display_name(), endpoint.uid.as_str()],
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validators::testing::{self, a_to_b};
    use tracker_core::{EntityRef, RelationshipItem, TrackerType};
    use tracker_test_utils::fixtures;

    #[test]
    fn test_resolved_item_passes() {
        let bundle = testing::bundle(ImportStrategy::Create);
        let report = testing::validate(&DataRelationsValidator, &bundle, &a_to_b("RelUid00001"));
        assert!(report.is_empty());
    }

    #[test]
    fn test_unknown_type() {
        let bundle = testing::bundle(ImportStrategy::Create);
        let item = fixtures::import_relationship(
            "RelUid00001",
            "TypeMissing",
            RelationshipItem::tracked_entity(testing::TE_A),
            RelationshipItem::tracked_entity(testing::TE_B),
        );
        let report = testing::validate(&DataRelationsValidator, &bundle, &item);
        assert_eq!(report.codes(), vec![ValidationCode::E4006]);
        assert_eq!(report.issues()[0].message, "Could not find relationship type: `TypeMissing`.");
    }

    #[test]
    fn test_unknown_endpoint() {
        let bundle = testing::bundle(ImportStrategy::Create);
        let item = fixtures::import_relationship(
            "RelUid00001",
            testing::TYPE,
            RelationshipItem::tracked_entity(testing::TE_A),
            RelationshipItem::event("EvMissing01"),
        );
        let report = testing::validate(&DataRelationsValidator, &bundle, &item);
        assert_eq!(report.codes(), vec![ValidationCode::E4012]);
        assert_eq!(report.issues()[0].args, vec!["event".to_string(), "EvMissing01".to_string()]);
    }

    #[test]
    fn test_pending_endpoint_resolves() {
        let pending = EntityRef::new(TrackerType::Event, "EvPending01");
        let bundle = ImportBundle::new(testing::preheat(), ImportStrategy::Create, fixtures::admin())
            .with_pending([pending]);
        let item = fixtures::import_relationship(
            "RelUid00001",
            testing::TYPE,
            RelationshipItem::tracked_entity(testing::TE_A),
            RelationshipItem::event("EvPending01"),
        );
        let report = testing::validate(&DataRelationsValidator, &bundle, &item);
        assert!(report.is_empty());
    }

    #[test]
    fn test_soft_deleted_endpoint_does_not_resolve() {
        let mut preheat = testing::preheat();
        let mut deleted = fixtures::tracked_entity("TeDeleted01");
        deleted.deleted = true;
        preheat.add_tracked_entity(deleted);
        let bundle = ImportBundle::new(preheat, ImportStrategy::Create, fixtures::admin());
        let item = fixtures::import_relationship(
            "RelUid00001",
            testing::TYPE,
            RelationshipItem::tracked_entity(testing::TE_A),
            RelationshipItem::tracked_entity("TeDeleted01"),
        );
        let report = testing::validate(&DataRelationsValidator, &bundle, &item);
        assert_eq!(report.codes(), vec![ValidationCode::E4012]);
    }
}
