//! Validation issues and the per-run report that collects them.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracker_core::{EntityRef, Severity, Uid};

/// Stable code identifying the rule an issue came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ValidationCode {
    /// Mandatory property missing.
    E1124,
    /// Relationship links an entity to itself.
    E4000,
    /// A side links zero or several entities.
    E4001,
    /// Relationship type not found.
    E4006,
    /// Endpoint kind does not match the type constraint.
    E4010,
    /// Program or program stage does not match the type constraint.
    E4011,
    /// Linked entity not found.
    E4012,
    /// Tracked entity type does not match the type constraint.
    E4014,
    /// Relationship already exists.
    E4015,
    /// Relationship does not exist.
    E4016,
    /// Relationship is deleted.
    E4017,
    /// Semantically identical relationship already exists.
    E4018,
    /// Access denied.
    E4020,
}

impl ValidationCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::E1124 => "E1124",
            Self::E4000 => "E4000",
            Self::E4001 => "E4001",
            Self::E4006 => "E4006",
            Self::E4010 => "E4010",
            Self::E4011 => "E4011",
            Self::E4012 => "E4012",
            Self::E4014 => "E4014",
            Self::E4015 => "E4015",
            Self::E4016 => "E4016",
            Self::E4017 => "E4017",
            Self::E4018 => "E4018",
            Self::E4020 => "E4020",
        }
    }

    /// Message template with positional `{n}` placeholders.
    pub fn template(&self) -> &'static str {
        match self {
            Self::E1124 => "Missing required relationship property: `{0}`.",
            Self::E4000 => "Relationship: `{0}` cannot link to itself.",
            Self::E4001 => {
                "Relationship item `{0}` for relationship `{1}` is invalid: an item can link one and only one tracker entity."
            }
            Self::E4006 => "Could not find relationship type: `{0}`.",
            Self::E4010 => "Relationship type `{0}` constraint requires a {1} but a {2} was found.",
            Self::E4011 => "Relationship type `{0}` constraint requires {1} `{2}` but `{3}` was found.",
            Self::E4012 => "Could not find {0}: `{1}`, linked to relationship.",
            Self::E4014 => {
                "Relationship type `{0}` constraint requires a tracked entity having type `{1}` but `{2}` was found."
            }
            Self::E4015 => "Relationship: `{0}`, already exists.",
            Self::E4016 => "Relationship: `{0}`, does not exist.",
            Self::E4017 => "Relationship: `{0}`, is already deleted and cannot be modified.",
            Self::E4018 => "Relationship: `{0}`, linking {1} to {2} already exists.",
            Self::E4020 => "User: `{0}`, has no access: {1}",
        }
    }

    /// Fill the template with `args` in one pass; unmatched placeholders
    /// stay as written and inserted text is never rescanned.
    pub fn render(&self, args: &[String]) -> String {
        let mut rest = self.template();
        let mut message = String::with_capacity(rest.len());
        while let Some(open) = rest.find('{') {
            message.push_str(&rest[..open]);
            let after = &rest[open + 1..];
            let arg = after.find('}').and_then(|close| {
                let index: usize = after[..close].parse().ok()?;
                args.get(index).map(|arg| (close, arg))
            });
            match arg {
                Some((close, arg)) => {
                    message.push_str(arg);
                    rest = &after[close + 1..];
                }
                None => {
                    message.push('{');
                    rest = after;
                }
            }
        }
        message.push_str(rest);
        message
    }
}

impl fmt::Display for ValidationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single finding against one payload object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub severity: Severity,
    pub code: ValidationCode,
    /// The payload object the issue is about.
    pub subject: EntityRef,
    pub args: Vec<String>,
    pub message: String,
}

impl ValidationIssue {
    pub fn new(severity: Severity, code: ValidationCode, subject: EntityRef, args: Vec<String>) -> Self {
        let message = code.render(&args);
        Self {
            severity,
            code,
            subject,
            args,
            message,
        }
    }

    pub fn error(code: ValidationCode, subject: EntityRef, args: Vec<String>) -> Self {
        Self::new(Severity::Error, code, subject, args)
    }

    pub fn warning(code: ValidationCode, subject: EntityRef, args: Vec<String>) -> Self {
        Self::new(Severity::Warning, code, subject, args)
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.code, self.subject, self.message)
    }
}

/// Append-only collection of issues produced by one validation run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_issue(&mut self, issue: ValidationIssue) {
        self.issues.push(issue);
    }

    pub fn add_error<I, S>(&mut self, code: ValidationCode, subject: EntityRef, args: I)
    where
        I: IntoIterator<Item = S>,
        S: ToString,
    {
        let args = args.into_iter().map(|a| a.to_string()).collect();
        self.add_issue(ValidationIssue::error(code, subject, args));
    }

    pub fn add_warning<I, S>(&mut self, code: ValidationCode, subject: EntityRef, args: I)
    where
        I: IntoIterator<Item = S>,
        S: ToString,
    {
        let args = args.into_iter().map(|a| a.to_string()).collect();
        self.add_issue(ValidationIssue::warning(code, subject, args));
    }

    pub fn issues(&self) -> &[ValidationIssue] {
        &self.issues
    }

    pub fn len(&self) -> usize {
        self.issues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn has_errors(&self) -> bool {
        self.issues.iter().any(ValidationIssue::is_error)
    }

    pub fn has_warnings(&self) -> bool {
        self.issues.iter().any(|i| i.severity == Severity::Warning)
    }

    pub fn errors(&self) -> Vec<&ValidationIssue> {
        self.issues.iter().filter(|i| i.is_error()).collect()
    }

    pub fn warnings(&self) -> Vec<&ValidationIssue> {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Warning)
            .collect()
    }

    /// All issues carrying `code`, in the order they were added.
    pub fn issues_with_code(&self, code: ValidationCode) -> Vec<&ValidationIssue> {
        self.issues.iter().filter(|i| i.code == code).collect()
    }

    pub fn has_code(&self, code: ValidationCode) -> bool {
        self.issues.iter().any(|i| i.code == code)
    }

    /// All issues about the payload object `uid`.
    pub fn issues_for(&self, uid: &Uid) -> Vec<&ValidationIssue> {
        self.issues.iter().filter(|i| &i.subject.uid == uid).collect()
    }

    /// Codes in the order they were reported.
    pub fn codes(&self) -> Vec<ValidationCode> {
        self.issues.iter().map(|i| i.code).collect()
    }

    /// Append every issue of `other`.
    pub fn merge(&mut self, other: ValidationReport) {
        self.issues.extend(other.issues);
    }

    /// Uids of payload objects with at least one error.
    pub fn invalid_uids(&self) -> BTreeSet<Uid> {
        self.issues
            .iter()
            .filter(|i| i.is_error())
            .map(|i| i.subject.uid.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracker_core::TrackerType;

    fn subject(uid: &str) -> EntityRef {
        EntityRef::new(TrackerType::Relationship, uid)
    }

    #[test]
    fn test_render_fills_positional_args() {
        let message = ValidationCode::E4012.render(&["trackedEntity".to_string(), "TeUid000001".to_string()]);
        assert_eq!(message, "Could not find trackedEntity: `TeUid000001`, linked to relationship.");
    }

    #[test]
    fn test_render_does_not_rescan_inserted_args() {
        let args = ["Rel{1}x".to_string(), "{0}".to_string(), "{2}".to_string()];
        assert_eq!(
            ValidationCode::E4018.render(&args),
            "Relationship: `Rel{1}x`, linking {0} to {2} already exists."
        );
    }

    #[test]
    fn test_render_leaves_missing_args() {
        assert_eq!(ValidationCode::E4006.render(&[]), "Could not find relationship type: `{0}`.");
    }

    #[test]
    fn test_warnings_do_not_make_report_invalid() {
        let mut report = ValidationReport::new();
        report.add_warning(ValidationCode::E4015, subject("RelUid00001"), ["RelUid00001"]);
        assert!(!report.has_errors());
        assert!(report.has_warnings());
        assert!(report.invalid_uids().is_empty());

        report.add_error(ValidationCode::E4006, subject("RelUid00002"), ["TypeUid0001"]);
        assert!(report.has_errors());
        assert_eq!(report.errors().len(), 1);
        assert_eq!(report.warnings().len(), 1);
        assert_eq!(report.invalid_uids().into_iter().collect::<Vec<_>>(), vec![Uid::from("RelUid00002")]);
    }

    #[test]
    fn test_filters_by_code_and_subject() {
        let mut report = ValidationReport::new();
        report.add_error(ValidationCode::E1124, subject("RelUid00001"), ["from"]);
        report.add_error(ValidationCode::E1124, subject("RelUid00001"), ["to"]);
        report.add_error(ValidationCode::E4000, subject("RelUid00002"), ["RelUid00002"]);

        assert_eq!(report.issues_with_code(ValidationCode::E1124).len(), 2);
        assert_eq!(report.issues_for(&Uid::from("RelUid00002")).len(), 1);
        assert!(!report.has_code(ValidationCode::E4018));
    }

    #[test]
    fn test_merge_preserves_order() {
        let mut first = ValidationReport::new();
        first.add_error(ValidationCode::E4000, subject("RelUid00001"), ["RelUid00001"]);
        let mut second = ValidationReport::new();
        second.add_error(ValidationCode::E4006, subject("RelUid00002"), ["TypeUid0001"]);

        first.merge(second);
        assert_eq!(first.codes(), vec![ValidationCode::E4000, ValidationCode::E4006]);
    }

    #[test]
    fn test_report_serializes() {
        let mut report = ValidationReport::new();
        report.add_error(ValidationCode::E4016, subject("RelUid00001"), ["RelUid00001"]);
        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("\"E4016\""));
        assert!(json.contains("\"ERROR\""));
        let back: ValidationReport = serde_json::from_str(&json).unwrap();
        assert_eq!(back, report);
    }
}
