use std::time::Instant;

use bytes::Bytes;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use certia_core::{
    BlobMetadata, ConstraintViolation, DocumentCategory, FileKind, Principal, StoredDocument,
    ValidationFailure, ViolationCode,
};
use certia_processing::{
    sanitise_pdf, validate_file, validate_file_name, PdfProfile, PdfSanitiseError,
};
use certia_scan::{Definitions, Infection, ScanClient, ScanEngineError, ScanVerdict};
use certia_storage::{BlobAddressResolver, StorageBackendError};

/// One submitted file as received at the boundary. Never persisted: the
/// payload either becomes a [`StoredDocument`] or is discarded with an error.
#[derive(Debug)]
pub struct RawFile {
    pub file_name: String,
    /// Kind claimed by the caller. When absent it is derived from the
    /// file name extension.
    pub kind: Option<FileKind>,
    pub version: Option<String>,
    pub bytes: Vec<u8>,
}

impl RawFile {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        RawFile {
            file_name: file_name.into(),
            kind: None,
            version: None,
            bytes,
        }
    }

    pub fn with_kind(mut self, kind: FileKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }
}

/// Why an upload was refused or failed.
///
/// `Validation` and `Infected` are caller problems and safe to show to the
/// submitter. `Scan` and `Storage` are infrastructure faults: nothing was
/// persisted and the caller may retry.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error(transparent)]
    Validation(#[from] ValidationFailure),

    /// The scan completed and named at least one signature. Never retried.
    #[error("{warning}")]
    Infected { warning: String },

    /// The scan could not produce a verdict, so the payload is not accepted.
    #[error(transparent)]
    Scan(#[from] ScanEngineError),

    /// The cleaned PDF could not be serialised back to bytes.
    #[error("PDF sanitisation failed: {0}")]
    Sanitisation(#[source] PdfSanitiseError),

    #[error(transparent)]
    Storage(StorageBackendError),
}

impl UploadError {
    /// Field-level violations to surface, when the rejection carries any.
    pub fn violations(&self) -> &[ConstraintViolation] {
        match self {
            UploadError::Validation(failure) => &failure.violations,
            _ => &[],
        }
    }
}

/// Runs the ingest pipeline: validate, sanitise PDFs, scan, then persist at
/// the category's deterministic address. Bytes reach the store only after
/// every prior stage has passed.
#[derive(Clone)]
pub struct UploadService {
    resolver: BlobAddressResolver,
    scanner: ScanClient,
}

impl UploadService {
    pub fn new(resolver: BlobAddressResolver, scanner: ScanClient) -> Self {
        UploadService { resolver, scanner }
    }

    /// Accept one file for `category` on behalf of `principal`.
    ///
    /// `name_arguments` fill the category's naming template and `path` is an
    /// optional virtual directory under the container. The stored blob is
    /// tagged with the principal as applicant and an upload timestamp.
    pub async fn upload(
        &self,
        category: &DocumentCategory,
        principal: &Principal,
        mut file: RawFile,
        name_arguments: &[&str],
        path: Option<&str>,
    ) -> Result<StoredDocument, UploadError> {
        let upload_id = Uuid::new_v4();
        let started = Instant::now();
        let kind = file
            .kind
            .or_else(|| FileKind::from_file_name(&file.file_name));

        validate_file_name(&file.file_name, category)?;
        validate_file(&file.bytes, kind, file.version.as_deref(), category)?;

        if kind == Some(FileKind::Pdf) {
            file.bytes = self.sanitise(upload_id, file.bytes, category)?;
        }

        let verdict = if kind == Some(FileKind::Zip) {
            self.scanner.scan_archive(&file.bytes).await?
        } else {
            self.scanner.scan(&file.bytes).await?
        };
        if let ScanVerdict::Infected {
            definitions,
            infections,
        } = verdict
        {
            let warning = infection_warning(&definitions, &infections);
            warn!(
                upload_id = %upload_id,
                category = %category.name,
                infections = infections.len(),
                "upload rejected by virus scan"
            );
            return Err(UploadError::Infected { warning });
        }

        let location = self.resolver.resolve(category, name_arguments, path);
        let store = self
            .resolver
            .store_for(&location)
            .await
            .map_err(|e| UploadError::Storage(e.into()))?;

        let mut metadata = BlobMetadata::new();
        metadata.set_applicant(principal);
        metadata.stamp_uploaded();

        let content_type = kind
            .map(|k| k.content_type())
            .unwrap_or("application/octet-stream");
        let size = file.bytes.len() as u64;
        let blob_path = location.blob_path();

        store
            .put(&blob_path, Bytes::from(file.bytes), content_type, &metadata)
            .await
            .map_err(|e| UploadError::Storage(e.into()))?;
        let url = store.url_for(&blob_path);

        info!(
            upload_id = %upload_id,
            location = %location,
            size_bytes = size,
            duration_ms = started.elapsed().as_millis(),
            "upload stored"
        );

        Ok(StoredDocument {
            location,
            url,
            content_type: content_type.to_string(),
            size,
        })
    }

    /// Strip active content from a PDF, enforcing the category's fillable
    /// requirement. Rejections become field violations; a rewrite fault is
    /// an internal error.
    fn sanitise(
        &self,
        upload_id: Uuid,
        bytes: Vec<u8>,
        category: &DocumentCategory,
    ) -> Result<Vec<u8>, UploadError> {
        let profile = PdfProfile {
            require_form_fields: category.requires_fillable_pdf,
        };
        match sanitise_pdf(&bytes, &profile) {
            Ok(cleaned) => Ok(cleaned),
            Err(err) => match violation_code_for(&err) {
                Some(code) => {
                    warn!(upload_id = %upload_id, error = %err, "PDF rejected during sanitisation");
                    Err(ValidationFailure::single("file", code, err.to_string()).into())
                }
                None => Err(UploadError::Sanitisation(err)),
            },
        }
    }
}

fn violation_code_for(err: &PdfSanitiseError) -> Option<ViolationCode> {
    match err {
        PdfSanitiseError::Malformed(_) => Some(ViolationCode::PdfMalformed),
        PdfSanitiseError::UnremovableScript => Some(ViolationCode::PdfUnremovableScript),
        PdfSanitiseError::NoFormFields => Some(ViolationCode::PdfNoFormFields),
        PdfSanitiseError::Rewrite(_) => None,
    }
}

/// User-facing rejection line naming the engine build and the signatures
/// that matched, without echoing raw scanner output.
fn infection_warning(definitions: &Definitions, infections: &[Infection]) -> String {
    let names = infections
        .iter()
        .map(|infection| infection.name.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "The selected file contains a virus and cannot be accepted (engine {}, definitions {}): {}",
        definitions.engine_version, definitions.rules_date, names
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_infection_warning_names_engine_and_signatures() {
        let definitions = Definitions {
            engine_version: "1.3.1".to_string(),
            rules_date: "Wed Aug 20 10:31:26 2025".to_string(),
        };
        let infections = vec![
            Infection {
                id: "stream!a.txt".to_string(),
                name: "Eicar-Test-Signature".to_string(),
            },
            Infection {
                id: "stream!b.txt".to_string(),
                name: "Win.Test.EICAR_HDB-1".to_string(),
            },
        ];

        let warning = infection_warning(&definitions, &infections);
        assert_eq!(
            warning,
            "The selected file contains a virus and cannot be accepted (engine 1.3.1, \
             definitions Wed Aug 20 10:31:26 2025): Eicar-Test-Signature, Win.Test.EICAR_HDB-1"
        );
    }

    #[test]
    fn test_sanitise_rejections_map_to_field_violations() {
        assert_eq!(
            violation_code_for(&PdfSanitiseError::UnremovableScript),
            Some(ViolationCode::PdfUnremovableScript)
        );
        assert_eq!(
            violation_code_for(&PdfSanitiseError::NoFormFields),
            Some(ViolationCode::PdfNoFormFields)
        );
        assert_eq!(
            violation_code_for(&PdfSanitiseError::Malformed("truncated".to_string())),
            Some(ViolationCode::PdfMalformed)
        );
        assert_eq!(
            violation_code_for(&PdfSanitiseError::Rewrite("io".to_string())),
            None
        );
    }

    #[test]
    fn test_raw_file_builder_sets_optional_fields() {
        let file = RawFile::new("form.pdf", vec![1, 2, 3])
            .with_kind(FileKind::Pdf)
            .with_version("2");
        assert_eq!(file.kind, Some(FileKind::Pdf));
        assert_eq!(file.version.as_deref(), Some("2"));
    }
}
