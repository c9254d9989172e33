//! The relationship validation rules.

mod constraint;
mod constraint_value_type;
mod data_relations;
mod duplication;
mod existence;
mod link;
mod mandatory;
mod security;

pub use constraint::ConstraintValidator;
pub use constraint_value_type::ConstraintValueTypeValidator;
pub use data_relations::DataRelationsValidator;
pub use duplication::DuplicationValidator;
pub use existence::ExistenceValidator;
pub use link::LinkValidator;
pub use mandatory::MandatoryFieldsValidator;
pub use security::SecurityOwnershipValidator;

use tracker_core::{ImportRelationship, RelationshipConstraint, RelationshipItem, RelationshipType};

/// Property name of each side, paired with the side if present.
fn sides(item: &ImportRelationship) -> [(&'static str, Option<&RelationshipItem>); 2] {
    [("from", item.from.as_ref()), ("to", item.to.as_ref())]
}

fn constraint_for<'a>(relationship_type: &'a RelationshipType, side: &str) -> &'a RelationshipConstraint {
    if side == "from" {
        &relationship_type.from_constraint
    } else {
        &relationship_type.to_constraint
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use tracker_core::{ImportRelationship, ImportStrategy, RelationshipItem};
    use tracker_test_utils::fixtures;

    use crate::bundle::{ImportBundle, TrackerPreheat};
    use crate::pipeline::Validator;
    use crate::report::ValidationReport;

    pub const TYPE: &str = "TypeUid0001";
    pub const TE_A: &str = "TeUid00000A";
    pub const TE_B: &str = "TeUid00000B";

    /// Preheat with the person-to-person type and tracked entities A and B.
    pub fn preheat() -> TrackerPreheat {
        let mut preheat = TrackerPreheat::new();
        preheat.add_relationship_type(fixtures::person_to_person_type(TYPE));
        preheat.add_tracked_entity(fixtures::tracked_entity(TE_A));
        preheat.add_tracked_entity(fixtures::tracked_entity(TE_B));
        preheat
    }

    pub fn bundle(strategy: ImportStrategy) -> ImportBundle {
        ImportBundle::new(preheat(), strategy, fixtures::admin())
    }

    /// A to B under the fixture type.
    pub fn a_to_b(uid: &str) -> ImportRelationship {
        fixtures::import_relationship(
            uid,
            TYPE,
            RelationshipItem::tracked_entity(TE_A),
            RelationshipItem::tracked_entity(TE_B),
        )
    }

    pub fn validate(validator: &dyn Validator, bundle: &ImportBundle, item: &ImportRelationship) -> ValidationReport {
        let mut report = ValidationReport::new();
        validator.validate(&mut report, bundle, item);
        report
    }
}
