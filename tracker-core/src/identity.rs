//! Identity types for tracker and metadata records

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use rand::Rng;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

/// Length of a generated identifier.
pub const UID_LENGTH: usize = 11;

const LETTERS: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";
const ALPHANUMERIC: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

static UID_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z][a-zA-Z0-9]{10}$").expect("uid pattern is a valid regex")
});

/// Opaque record identifier, unique within its type.
///
/// The platform generates 11 character alphanumeric identifiers starting
/// with a letter, but lookups accept any string: a malformed reference is
/// simply one that resolves to nothing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Uid(String);

impl Uid {
    /// Wrap an existing identifier.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Borrow the identifier text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume into the underlying string.
    pub fn into_inner(self) -> String {
        self.0
    }

    /// True when the identifier is empty or whitespace only.
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// True when the identifier has the generated format.
    pub fn is_valid_format(&self) -> bool {
        UID_PATTERN.is_match(&self.0)
    }
}

impl fmt::Display for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Uid {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for Uid {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl AsRef<str> for Uid {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Generate a new identifier in the platform format.
pub fn generate_uid() -> Uid {
    let mut rng = rand::rng();
    let mut out = String::with_capacity(UID_LENGTH);
    out.push(LETTERS[rng.random_range(0..LETTERS.len())] as char);
    for _ in 1..UID_LENGTH {
        out.push(ALPHANUMERIC[rng.random_range(0..ALPHANUMERIC.len())] as char);
    }
    Uid(out)
}

/// How an incoming payload refers to metadata.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(tag = "type", content = "attribute", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IdScheme {
    /// Stable identifier column.
    #[default]
    Uid,
    /// Business code column.
    Code,
    /// Display name column.
    Name,
    /// Value of the given metadata attribute.
    Attribute(Uid),
}

impl IdScheme {
    /// Attribute based schemes resolve through a dynamic attribute value,
    /// so their results are never cached.
    pub fn is_attribute(&self) -> bool {
        matches!(self, Self::Attribute(_))
    }

    /// Short label used in cache keys and log fields.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Uid => "UID",
            Self::Code => "CODE",
            Self::Name => "NAME",
            Self::Attribute(_) => "ATTRIBUTE",
        }
    }
}

/// A scheme-qualified reference to a metadata object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MetadataIdentifier {
    pub scheme: IdScheme,
    pub identifier: String,
}

impl MetadataIdentifier {
    pub fn new(scheme: IdScheme, identifier: impl Into<String>) -> Self {
        Self {
            scheme,
            identifier: identifier.into(),
        }
    }

    /// Reference by uid.
    pub fn of_uid(uid: impl Into<String>) -> Self {
        Self::new(IdScheme::Uid, uid)
    }

    /// Reference by code.
    pub fn of_code(code: impl Into<String>) -> Self {
        Self::new(IdScheme::Code, code)
    }

    /// Reference by name.
    pub fn of_name(name: impl Into<String>) -> Self {
        Self::new(IdScheme::Name, name)
    }

    pub fn is_blank(&self) -> bool {
        self.identifier.trim().is_empty()
    }
}

impl fmt::Display for MetadataIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.identifier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_generated_uid_has_platform_format() {
        for _ in 0..200 {
            let uid = generate_uid();
            assert_eq!(uid.as_str().len(), UID_LENGTH);
            assert!(uid.is_valid_format(), "bad uid {uid}");
        }
    }

    #[test]
    fn test_uid_format_rejects_leading_digit_and_wrong_length() {
        assert!(!Uid::from("1bcdefghijk").is_valid_format());
        assert!(!Uid::from("abc").is_valid_format());
        assert!(!Uid::from("abcdefghij!").is_valid_format());
        assert!(Uid::from("Abcdefghij1").is_valid_format());
    }

    #[test]
    fn test_blank_detection() {
        assert!(Uid::from("   ").is_blank());
        assert!(!Uid::from("x").is_blank());
        assert!(MetadataIdentifier::of_code("").is_blank());
    }

    #[test]
    fn test_id_scheme_serializes_with_attribute_payload() {
        let scheme = IdScheme::Attribute(Uid::from("AttrUid0001"));
        let json = serde_json::to_string(&scheme).unwrap();
        assert!(json.contains("ATTRIBUTE"));
        assert!(json.contains("AttrUid0001"));
        let back: IdScheme = serde_json::from_str(&json).unwrap();
        assert_eq!(back, scheme);
        assert!(back.is_attribute());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        /// Property: every string matching the pattern is accepted.
        #[test]
        fn prop_pattern_strings_are_valid(s in "[a-zA-Z][a-zA-Z0-9]{10}") {
            prop_assert!(Uid::new(s).is_valid_format());
        }
    }
}
