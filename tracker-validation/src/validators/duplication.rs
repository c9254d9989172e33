use tracker_core::{ImportRelationship, ImportStrategy, RelationshipItem};

use crate::bundle::ImportBundle;
use crate::pipeline::Validator;
use crate::report::{ValidationCode, ValidationReport};

/// Rejects a relationship that repeats an existing one's type and endpoints.
#[derive(Debug, Clone, Copy, Default)]
pub struct DuplicationValidator;

impl Validator for DuplicationValidator {
    fn name(&self) -> &str {
        "duplication"
    }

    fn needs_to_run(&self, strategy: ImportStrategy) -> bool {
        strategy.is_create()
    }

    fn validate(&self, report: &mut ValidationReport, bundle: &ImportBundle, item: &ImportRelationship) {
        let Some(relationship_type) = bundle.relationship_type(item) else {
            return;
        };
        if bundle.preheat.is_duplicate(item, relationship_type) {
            report.add_error(
                ValidationCode::E4018,
                item.entity_ref(),
                [item.uid.to_string(), describe(item.from.as_ref()), describe(item.to.as_ref())],
            );
        }
    }
}

fn describe(side: Option<&RelationshipItem>) -> String {
    side.and_then(RelationshipItem::endpoint)
        .map(|endpoint| endpoint.to_string())
        .unwrap_or_default()
}
