use tracker_core::{IdentifiableObject, ImportRelationship, ImportStrategy};

use super::{constraint_for, sides};
use crate::bundle::ImportBundle;
use crate::pipeline::Validator;
use crate::report::{ValidationCode, ValidationReport};

/// Each side must link the kind of record its type constraint names.
///
/// Skipped when the relationship type did not resolve.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConstraintValidator;

impl Validator for ConstraintValidator {
    fn name(&self) -> &str {
        "constraint"
    }

    fn needs_to_run(&self, strategy: ImportStrategy) -> bool {
        strategy.is_create()
    }

    fn validate(&self, report: &mut ValidationReport, bundle: &ImportBundle, item: &ImportRelationship) {
        let Some(relationship_type) = bundle.relationship_type(item) else {
            return;
        };

        for (property, side) in sides(item) {
            let Some(kind) = side.and_then(|side| side.entity_kind()) else {
                continue;
            };
            let constraint = constraint_for(relationship_type, property);
            if kind != constraint.entity {
                report.add_error(
                    ValidationCode::E4010,
                    item.entity_ref(),
                    [
                        relationship_type.uid().as_str(),
                        constraint.entity.tracker_type().display_name(),
                        kind.tracker_type().display_name(),
                    ],
                );
            }
        }
    }
}
