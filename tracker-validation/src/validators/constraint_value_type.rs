use tracker_core::{
    EntityRef, IdentifiableObject, ImportRelationship, ImportStrategy, RelationshipConstraint,
    TrackerType, Uid,
};

use super::{constraint_for, sides};
use crate::bundle::ImportBundle;
use crate::pipeline::Validator;
use crate::report::{ValidationCode, ValidationReport};

/// Linked records must carry the tracked entity type, program or program
/// stage their side's constraint restricts to.
///
/// Only records already in the database are checked, and only on sides
/// whose kind matches the constraint.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConstraintValueTypeValidator;

impl Validator for ConstraintValueTypeValidator {
    fn name(&self) -> &str {
        "constraint_value_type"
    }

    fn needs_to_run(&self, strategy: ImportStrategy) -> bool {
        strategy.is_create()
    }

    fn validate(&self, report: &mut ValidationReport, bundle: &ImportBundle, item: &ImportRelationship) {
        let Some(relationship_type) = bundle.relationship_type(item) else {
            return;
        };
        let type_uid = relationship_type.uid().as_str();

        for (property, side) in sides(item) {
            let Some(endpoint) = side.and_then(|side| side.endpoint()) else {
                continue;
            };
            let constraint = constraint_for(relationship_type, property);
            if endpoint.tracker_type != constraint.entity.tracker_type() {
                continue;
            }
            if let Some(mismatch) = mismatch(bundle, constraint, &endpoint) {
                let subject = item.entity_ref();
                match mismatch {
                    Mismatch::TrackedEntityType { expected, actual } => report.add_error(
                        ValidationCode::E4014,
                        subject,
                        [type_uid, expected.as_str(), actual.as_str()],
                    ),
                    Mismatch::Program { property, expected, actual } => report.add_error(
                        ValidationCode::E4011,
                        subject,
                        [type_uid, property, expected.as_str(), actual.as_str()],
                    ),
                }
            }
        }
    }
}

enum Mismatch<'a> {
    TrackedEntityType { expected: &'a Uid, actual: &'a Uid },
    Program { property: &'static str, expected: &'a Uid, actual: &'a Uid },
}

fn mismatch<'a>(
    bundle: &'a ImportBundle,
    constraint: &'a RelationshipConstraint,
    endpoint: &EntityRef,
) -> Option<Mismatch<'a>> {
    let preheat = &bundle.preheat;
    match endpoint.tracker_type {
        TrackerType::TrackedEntity => {
            let expected = constraint.tracked_entity_type.as_ref()?;
            let actual = &preheat.tracked_entity(&endpoint.uid)?.tracked_entity_type;
            (expected != actual).then_some(Mismatch::TrackedEntityType { expected, actual })
        }
        TrackerType::Enrollment => {
            let expected = constraint.program.as_ref()?;
            let actual = &preheat.enrollment(&endpoint.uid)?.program;
            (expected != actual).then_some(Mismatch::Program {
                property: "program",
                expected,
                actual,
            })
        }
        TrackerType::Event => {
            let expected = constraint.program_stage.as_ref()?;
            let actual = &preheat.event(&endpoint.uid)?.program_stage;
            (expected != actual).then_some(Mismatch::Program {
                property: "program stage",
                expected,
                actual,
            })
        }
        TrackerType::Relationship => None,
    }
}
