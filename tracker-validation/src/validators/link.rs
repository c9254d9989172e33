use tracker_core::{ImportRelationship, ImportStrategy};

use super::sides;
use crate::bundle::ImportBundle;
use crate::pipeline::Validator;
use crate::report::{ValidationCode, ValidationReport};

/// Each side links exactly one record, and the two sides differ.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinkValidator;

impl Validator for LinkValidator {
    fn name(&self) -> &str {
        "link"
    }

    fn needs_to_run(&self, strategy: ImportStrategy) -> bool {
        strategy.is_create()
    }

    fn validate(&self, report: &mut ValidationReport, _bundle: &ImportBundle, item: &ImportRelationship) {
        for (property, side) in sides(item) {
            // absent sides are reported by the mandatory fields rule
            let Some(side) = side else { continue };
            if side.endpoint().is_none() {
                report.add_error(
                    ValidationCode::E4001,
                    item.entity_ref(),
                    [property, item.uid.as_str()],
                );
            }
        }

        let from = item.from.as_ref().and_then(|side| side.endpoint());
        let to = item.to.as_ref().and_then(|side| side.endpoint());
        if let (Some(from), Some(to)) = (from, to) {
            if from == to {
                report.add_error(ValidationCode::E4000, item.entity_ref(), [item.uid.as_str()]);
            }
        }
    }
}
