//! Certia Core Library
//!
//! This crate provides the core domain models, error types, configuration and
//! filename policy shared across all Certia document pipeline components.

pub mod config;
pub mod error;
pub mod filename;
pub mod models;
pub mod storage_types;

// Re-export commonly used types
pub use config::{PipelineConfig, RelaySettings, ScanSettings, StorageSettings};
pub use error::{AuthorizationError, ConstraintViolation, ValidationFailure, ViolationCode};
pub use models::{
    BlobLocation, BlobMetadata, CategoryMessages, CategoryRegistry, DocumentCategory, FileKind,
    Principal, Role, StoredDocument,
};
pub use storage_types::StorageBackend;
