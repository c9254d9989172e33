use tracker_core::{ImportRelationship, ImportStrategy};

use super::sides;
use crate::bundle::ImportBundle;
use crate::pipeline::Validator;
use crate::report::{ValidationCode, ValidationReport};

/// Relationship type and both sides must be present.
#[derive(Debug, Clone, Copy, Default)]
pub struct MandatoryFieldsValidator;

impl Validator for MandatoryFieldsValidator {
    fn name(&self) -> &str {
        "mandatory_fields"
    }

    fn needs_to_run(&self, strategy: ImportStrategy) -> bool {
        strategy.is_create() || strategy.is_update()
    }

    fn validate(&self, report: &mut ValidationReport, _bundle: &ImportBundle, item: &ImportRelationship) {
        let type_missing = item
            .relationship_type
            .as_ref()
            .map_or(true, |identifier| identifier.is_blank());
        if type_missing {
            report.add_error(ValidationCode::E1124, item.entity_ref(), ["relationshipType"]);
        }

        for (property, side) in sides(item) {
            if side.is_none() {
                report.add_error(ValidationCode::E1124, item.entity_ref(), [property]);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validators::testing::{self, a_to_b};
    use tracker_core::{MetadataIdentifier, RelationshipItem};

    #[test]
    fn test_complete_item_passes() {
        let bundle = testing::bundle(ImportStrategy::Create);
        let report = testing::validate(&MandatoryFieldsValidator, &bundle, &a_to_b("RelUid00001"));
        assert!(report.is_empty());
    }

    #[test]
    fn test_one_issue_per_missing_property() {
        let bundle = testing::bundle(ImportStrategy::Create);
        let item = ImportRelationship::new("RelUid00001");
        let report = testing::validate(&MandatoryFieldsValidator, &bundle, &item);

        assert_eq!(report.issues_with_code(ValidationCode::E1124).len(), 3);
        let args: Vec<&str> = report.issues().iter().map(|i| i.args[0].as_str()).collect();
        assert_eq!(args, vec!["relationshipType", "from", "to"]);
    }

    #[test]
    fn test_blank_type_is_missing() {
        let bundle = testing::bundle(ImportStrategy::Update);
        let item = ImportRelationship::new("RelUid00001")
            .with_type(MetadataIdentifier::of_uid("  "))
            .with_from(RelationshipItem::tracked_entity(testing::TE_A))
            .with_to(RelationshipItem::tracked_entity(testing::TE_B));
        let report = testing::validate(&MandatoryFieldsValidator, &bundle, &item);
        assert_eq!(report.codes(), vec![ValidationCode::E1124]);
        assert_eq!(report.issues()[0].args, vec!["relationshipType".to_string()]);
    }

    #[test]
    fn test_runs_for_create_and_update_only() {
        assert!(MandatoryFieldsValidator.needs_to_run(ImportStrategy::Create));
        assert!(MandatoryFieldsValidator.needs_to_run(ImportStrategy::Update));
        assert!(!MandatoryFieldsValidator.needs_to_run(ImportStrategy::Delete));
    }
}
