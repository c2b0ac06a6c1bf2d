//! Certia Services Layer
//!
//! This crate is the **document pipeline's service layer**: it hosts the
//! upload, download, and mutation boundaries and re-exports a unified API
//! from the core, processing, scan, and storage crates so that callers
//! depend on a single facade. Keep orchestration here; keep HTTP handling
//! and persistence of business records outside this workspace.

pub mod services;

// Re-export commonly used types
pub use certia_core::{
    BlobLocation, BlobMetadata, CategoryRegistry, ConstraintViolation, DocumentCategory, FileKind,
    PipelineConfig, Principal, RelaySettings, Role, ScanSettings, StorageSettings, StoredDocument,
    ValidationFailure, ViolationCode,
};
pub use certia_processing::{
    sanitise_pdf, validate_file, validate_file_name, PdfProfile, PdfSanitiseError,
};
pub use certia_scan::{Definitions, Infection, ScanClient, ScanEngineError, ScanVerdict};
pub use certia_storage::{
    create_blob_store, BlobAddressResolver, BlobStore, ContainerRegistry, StorageBackend,
    StorageBackendError, StorageError, StorageResult, StreamRelay,
};
pub use services::download::DownloadService;
pub use services::mutation::{
    MutationError, MutationService, OwnershipGuard, OWNER_MUTATION_ROLES,
    UNCONDITIONAL_MUTATION_ROLES,
};
pub use services::upload::{RawFile, UploadError, UploadService};
pub use services::DocumentPipeline;
