//! Error types module
//!
//! This module provides the shared error currency of the document pipeline.
//! Validation problems are collected into a `ValidationFailure` carrying one
//! `ConstraintViolation` per failed check so callers can present every
//! problem with an upload at once rather than the first one found.

use crate::models::Role;

/// Machine-readable code for a single failed validation check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ViolationCode {
    NoFile,
    EmptyFile,
    WrongKind,
    TooSmall,
    TooLarge,
    MissingVersion,
    PdfMalformed,
    PdfUnremovableScript,
    PdfNoFormFields,
}

impl ViolationCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ViolationCode::NoFile => "no-file",
            ViolationCode::EmptyFile => "empty-file",
            ViolationCode::WrongKind => "wrong-kind",
            ViolationCode::TooSmall => "too-small",
            ViolationCode::TooLarge => "too-large",
            ViolationCode::MissingVersion => "missing-version",
            ViolationCode::PdfMalformed => "pdf-malformed",
            ViolationCode::PdfUnremovableScript => "pdf-unremovable-script",
            ViolationCode::PdfNoFormFields => "pdf-no-form-fields",
        }
    }
}

impl std::fmt::Display for ViolationCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single failed check: which field of the submission failed, a stable
/// code, and the category-configured message shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ConstraintViolation {
    pub field: String,
    pub code: ViolationCode,
    pub message: String,
}

impl ConstraintViolation {
    pub fn new(field: &str, code: ViolationCode, message: impl Into<String>) -> Self {
        ConstraintViolation {
            field: field.to_string(),
            code,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ConstraintViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Aggregate of every violation found in one validation pass.
///
/// Checks are evaluated independently and merged, so a submission that is
/// both too small and the wrong kind reports both problems.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("file validation failed: {}", summarise(.violations))]
pub struct ValidationFailure {
    pub violations: Vec<ConstraintViolation>,
}

fn summarise(violations: &[ConstraintViolation]) -> String {
    violations
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl ValidationFailure {
    pub fn new() -> Self {
        ValidationFailure {
            violations: Vec::new(),
        }
    }

    pub fn single(field: &str, code: ViolationCode, message: impl Into<String>) -> Self {
        ValidationFailure {
            violations: vec![ConstraintViolation::new(field, code, message)],
        }
    }

    pub fn push(&mut self, field: &str, code: ViolationCode, message: impl Into<String>) {
        self.violations
            .push(ConstraintViolation::new(field, code, message));
    }

    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    /// Ok when no check failed, otherwise the collected violations.
    pub fn into_result(self) -> Result<(), ValidationFailure> {
        if self.violations.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }

    pub fn has_code(&self, code: ViolationCode) -> bool {
        self.violations.iter().any(|v| v.code == code)
    }
}

impl Default for ValidationFailure {
    fn default() -> Self {
        Self::new()
    }
}

/// Raised when a principal fails the ownership check on a document mutation.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{principal} ({role}) is not permitted to modify this document")]
pub struct AuthorizationError {
    pub principal: String,
    pub role: Role,
}

impl AuthorizationError {
    pub fn new(principal: impl Into<String>, role: Role) -> Self {
        AuthorizationError {
            principal: principal.into(),
            role,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merges_violations_into_one_failure() {
        let mut failure = ValidationFailure::new();
        failure.push("size", ViolationCode::TooSmall, "The selected file is too small");
        failure.push("extension", ViolationCode::WrongKind, "The selected file must be a PDF");

        let err = failure.into_result().unwrap_err();
        assert_eq!(err.violations.len(), 2);
        assert!(err.has_code(ViolationCode::TooSmall));
        assert!(err.has_code(ViolationCode::WrongKind));
        let rendered = err.to_string();
        assert!(rendered.contains("too small"));
        assert!(rendered.contains("must be a PDF"));
    }

    #[test]
    fn test_empty_failure_is_ok() {
        assert!(ValidationFailure::new().into_result().is_ok());
    }
}
