use tracker_core::{AccessTarget, IdentifiableObject, ImportRelationship, ImportStrategy};

use crate::bundle::ImportBundle;
use crate::pipeline::Validator;
use crate::report::{ValidationCode, ValidationReport};

/// The acting user needs write access to the type and both linked records
/// to create a relationship, and delete access to remove one.
#[derive(Debug, Clone, Copy, Default)]
pub struct SecurityOwnershipValidator;

impl Validator for SecurityOwnershipValidator {
    fn name(&self) -> &str {
        "security_ownership"
    }

    fn needs_to_run(&self, strategy: ImportStrategy) -> bool {
        strategy.is_create() || strategy.is_delete()
    }

    fn validate(&self, report: &mut ValidationReport, bundle: &ImportBundle, item: &ImportRelationship) {
        let access = bundle.access_control();
        let principal = &bundle.principal;

        let denials = match bundle.strategy_for(item) {
            ImportStrategy::Delete => {
                access.can_delete(principal, &AccessTarget::Entity(item.entity_ref()))
            }
            ImportStrategy::Create => {
                let mut targets = Vec::with_capacity(3);
                if let Some(relationship_type) = bundle.relationship_type(item) {
                    targets.push(AccessTarget::RelationshipType(relationship_type.uid().clone()));
                }
                targets.extend(
                    [item.from.as_ref(), item.to.as_ref()]
                        .into_iter()
                        .flatten()
                        .filter_map(|side| side.endpoint())
                        .map(AccessTarget::Entity),
                );
                targets
                    .iter()
                    .flat_map(|target| access.can_write(principal, target))
                    .collect()
            }
            _ => Vec::new(),
        };

        for reason in denials {
            report.add_error(
                ValidationCode::E4020,
                item.entity_ref(),
                [principal.username.clone(), reason],
            );
        }
    }
}
