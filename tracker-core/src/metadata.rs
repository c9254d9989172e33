//! Metadata objects referenced by tracker payloads

use crate::{IdScheme, MetadataType, RelationshipEntity, Uid};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Common surface of every metadata object.
///
/// The preheat cache uses this to derive keys under any [`IdScheme`].
pub trait IdentifiableObject {
    /// Type tag, constant for all instances.
    fn metadata_type() -> MetadataType
    where
        Self: Sized;

    fn uid(&self) -> &Uid;

    fn code(&self) -> Option<&str>;

    fn name(&self) -> &str;

    /// Value of a metadata attribute, if assigned.
    fn attribute_value(&self, attribute: &Uid) -> Option<&str>;

    /// The value this object is known by under `scheme`.
    fn identifier(&self, scheme: &IdScheme) -> Option<String> {
        match scheme {
            IdScheme::Uid => Some(self.uid().as_str().to_string()),
            IdScheme::Code => self.code().map(str::to_string),
            IdScheme::Name => Some(self.name().to_string()),
            IdScheme::Attribute(attribute) => self.attribute_value(attribute).map(str::to_string),
        }
    }
}

/// Fields shared by every metadata object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataHeader {
    pub uid: Uid,
    pub code: Option<String>,
    pub name: String,
    #[serde(default)]
    pub attribute_values: BTreeMap<Uid, String>,
}

impl MetadataHeader {
    pub fn new(uid: impl Into<Uid>, name: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            code: None,
            name: name.into(),
            attribute_values: BTreeMap::new(),
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_attribute_value(mut self, attribute: impl Into<Uid>, value: impl Into<String>) -> Self {
        self.attribute_values.insert(attribute.into(), value.into());
        self
    }
}

macro_rules! identifiable {
    ($ty:ty, $tag:expr) => {
        impl IdentifiableObject for $ty {
            fn metadata_type() -> MetadataType {
                $tag
            }

            fn uid(&self) -> &Uid {
                &self.header.uid
            }

            fn code(&self) -> Option<&str> {
                self.header.code.as_deref()
            }

            fn name(&self) -> &str {
                &self.header.name
            }

            fn attribute_value(&self, attribute: &Uid) -> Option<&str> {
                self.header.attribute_values.get(attribute).map(String::as_str)
            }
        }
    };
}

/// What one side of a relationship type accepts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipConstraint {
    pub entity: RelationshipEntity,
    pub tracked_entity_type: Option<Uid>,
    pub program: Option<Uid>,
    pub program_stage: Option<Uid>,
}

impl RelationshipConstraint {
    pub fn tracked_entity(tracked_entity_type: Option<Uid>) -> Self {
        Self {
            entity: RelationshipEntity::TrackedEntity,
            tracked_entity_type,
            program: None,
            program_stage: None,
        }
    }

    pub fn enrollment(program: Option<Uid>) -> Self {
        Self {
            entity: RelationshipEntity::Enrollment,
            tracked_entity_type: None,
            program,
            program_stage: None,
        }
    }

    pub fn event(program_stage: Option<Uid>) -> Self {
        Self {
            entity: RelationshipEntity::Event,
            tracked_entity_type: None,
            program: None,
            program_stage,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipType {
    #[serde(flatten)]
    pub header: MetadataHeader,
    pub bidirectional: bool,
    pub from_constraint: RelationshipConstraint,
    pub to_constraint: RelationshipConstraint,
}

identifiable!(RelationshipType, MetadataType::RelationshipType);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedEntityType {
    #[serde(flatten)]
    pub header: MetadataHeader,
}

identifiable!(TrackedEntityType, MetadataType::TrackedEntityType);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Program {
    #[serde(flatten)]
    pub header: MetadataHeader,
    pub tracked_entity_type: Option<Uid>,
    /// Programs without registration carry single events only.
    pub with_registration: bool,
}

identifiable!(Program, MetadataType::Program);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramStage {
    #[serde(flatten)]
    pub header: MetadataHeader,
    pub program: Uid,
    pub repeatable: bool,
}

identifiable!(ProgramStage, MetadataType::ProgramStage);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganisationUnit {
    #[serde(flatten)]
    pub header: MetadataHeader,
    pub path: String,
}

identifiable!(OrganisationUnit, MetadataType::OrganisationUnit);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataElement {
    #[serde(flatten)]
    pub header: MetadataHeader,
    pub value_type: String,
}

identifiable!(DataElement, MetadataType::DataElement);

#[cfg(test)]
mod tests {
    use super::*;

    fn relationship_type() -> RelationshipType {
        RelationshipType {
            header: MetadataHeader::new("TypeUid0001", "Mother-child")
                .with_code("MOTHER_CHILD")
                .with_attribute_value("AttrUid0001", "mc"),
            bidirectional: false,
            from_constraint: RelationshipConstraint::tracked_entity(None),
            to_constraint: RelationshipConstraint::tracked_entity(None),
        }
    }

    #[test]
    fn test_identifier_per_scheme() {
        let rt = relationship_type();
        assert_eq!(rt.identifier(&IdScheme::Uid).as_deref(), Some("TypeUid0001"));
        assert_eq!(rt.identifier(&IdScheme::Code).as_deref(), Some("MOTHER_CHILD"));
        assert_eq!(rt.identifier(&IdScheme::Name).as_deref(), Some("Mother-child"));
        assert_eq!(
            rt.identifier(&IdScheme::Attribute(Uid::from("AttrUid0001"))).as_deref(),
            Some("mc")
        );
        assert_eq!(rt.identifier(&IdScheme::Attribute(Uid::from("Other000001"))), None);
    }

    #[test]
    fn test_metadata_type_tags() {
        assert_eq!(RelationshipType::metadata_type(), MetadataType::RelationshipType);
        assert_eq!(ProgramStage::metadata_type(), MetadataType::ProgramStage);
        assert_eq!(DataElement::metadata_type(), MetadataType::DataElement);
    }
}
