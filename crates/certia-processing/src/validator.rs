//! Upload validation against a document category's policy.
//!
//! Checks are evaluated independently and merged into one failure so a user
//! sees every problem with a submission at once. The only ordering rule is
//! that an empty payload suppresses the kind check, because an absent file
//! has no meaningful kind.

use certia_core::models::{DocumentCategory, FileKind};
use certia_core::{ValidationFailure, ViolationCode};

const MISSING_VERSION_MESSAGE: &str = "Enter a version number";

/// Validate an upload's content against the category policy.
///
/// `declared_kind` is the kind derived from the submitted file name, if any.
/// `version` is checked for non-blankness only when the category demands one.
pub fn validate_file(
    bytes: &[u8],
    declared_kind: Option<FileKind>,
    version: Option<&str>,
    category: &DocumentCategory,
) -> Result<(), ValidationFailure> {
    let mut failure = ValidationFailure::new();

    if bytes.is_empty() {
        failure.push("size", ViolationCode::EmptyFile, &category.messages.empty_file);
    } else if bytes.len() < category.min_size_bytes {
        failure.push("size", ViolationCode::TooSmall, &category.messages.too_small);
    }

    if bytes.len() > category.max_size_bytes {
        failure.push("size", ViolationCode::TooLarge, &category.messages.too_large);
    }

    if !bytes.is_empty() {
        let permitted = declared_kind.map(|kind| category.permits(kind));
        if permitted != Some(true) {
            failure.push(
                "extension",
                ViolationCode::WrongKind,
                &category.messages.wrong_kind,
            );
        }
    }

    if category.requires_version {
        let blank = version.map(str::trim).unwrap_or("").is_empty();
        if blank {
            failure.push("version", ViolationCode::MissingVersion, MISSING_VERSION_MESSAGE);
        }
    }

    failure.into_result()
}

/// Validate a submitted file name alone, before any content is read.
pub fn validate_file_name(name: &str, category: &DocumentCategory) -> Result<(), ValidationFailure> {
    if name.trim().is_empty() {
        return Err(ValidationFailure::single(
            "file",
            ViolationCode::NoFile,
            &category.messages.no_file,
        ));
    }

    match FileKind::from_file_name(name) {
        Some(kind) if category.permits(kind) => Ok(()),
        _ => Err(ValidationFailure::single(
            "extension",
            ViolationCode::WrongKind,
            &category.messages.wrong_kind,
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use certia_core::models::DocumentCategory;

    fn templates() -> DocumentCategory {
        DocumentCategory::templates()
    }

    fn pdf_payload(len: usize) -> Vec<u8> {
        let mut bytes = b"%PDF-1.5\n".to_vec();
        bytes.resize(len, b'x');
        bytes
    }

    #[test]
    fn test_accepts_a_well_formed_upload() {
        let category = templates();
        let bytes = pdf_payload(category.min_size_bytes + 1);
        assert!(validate_file(&bytes, Some(FileKind::Pdf), Some("2"), &category).is_ok());
    }

    #[test]
    fn test_empty_payload_reports_emptiness_without_a_kind_violation() {
        let category = templates();
        let err = validate_file(&[], Some(FileKind::Pdf), Some("1"), &category).unwrap_err();
        assert!(err.has_code(ViolationCode::EmptyFile));
        assert!(!err.has_code(ViolationCode::WrongKind));
        assert!(!err.has_code(ViolationCode::TooSmall));
    }

    #[test]
    fn test_undersized_payload_reports_too_small() {
        let category = templates();
        let bytes = pdf_payload(category.min_size_bytes - 1);
        let err = validate_file(&bytes, Some(FileKind::Pdf), Some("1"), &category).unwrap_err();
        assert!(err.has_code(ViolationCode::TooSmall));
        assert!(!err.has_code(ViolationCode::EmptyFile));
    }

    #[test]
    fn test_oversized_payload_reports_too_large() {
        let category = templates();
        let bytes = pdf_payload(category.max_size_bytes + 1);
        let err = validate_file(&bytes, Some(FileKind::Pdf), Some("1"), &category).unwrap_err();
        assert!(err.has_code(ViolationCode::TooLarge));
    }

    #[test]
    fn test_independent_checks_are_merged() {
        let category = templates();
        let bytes = pdf_payload(category.min_size_bytes - 1);
        let err = validate_file(&bytes, Some(FileKind::Zip), None, &category).unwrap_err();
        assert!(err.has_code(ViolationCode::TooSmall));
        assert!(err.has_code(ViolationCode::WrongKind));
        assert!(err.has_code(ViolationCode::MissingVersion));
        assert_eq!(err.violations.len(), 3);
    }

    #[test]
    fn test_unknown_kind_is_rejected() {
        let category = templates();
        let bytes = pdf_payload(category.min_size_bytes + 1);
        let err = validate_file(&bytes, None, Some("1"), &category).unwrap_err();
        assert!(err.has_code(ViolationCode::WrongKind));
    }

    #[test]
    fn test_blank_version_is_rejected_when_required() {
        let category = templates();
        let bytes = pdf_payload(category.min_size_bytes + 1);
        for version in [None, Some(""), Some("   ")] {
            let err = validate_file(&bytes, Some(FileKind::Pdf), version, &category).unwrap_err();
            assert!(err.has_code(ViolationCode::MissingVersion));
        }
    }

    #[test]
    fn test_version_is_ignored_when_not_required() {
        let category = DocumentCategory::application_forms();
        let bytes = pdf_payload(category.min_size_bytes + 1);
        assert!(validate_file(&bytes, Some(FileKind::Pdf), None, &category).is_ok());
    }

    #[test]
    fn test_blank_file_name_reports_no_file() {
        let category = templates();
        let err = validate_file_name("   ", &category).unwrap_err();
        assert!(err.has_code(ViolationCode::NoFile));
    }

    #[test]
    fn test_file_name_with_wrong_extension_is_rejected() {
        let category = templates();
        assert!(validate_file_name("report.pdf", &category).is_ok());
        let err = validate_file_name("report.exe", &category).unwrap_err();
        assert!(err.has_code(ViolationCode::WrongKind));
        let err = validate_file_name("no-extension", &category).unwrap_err();
        assert!(err.has_code(ViolationCode::WrongKind));
    }
}
