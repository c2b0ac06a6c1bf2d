//! Storage abstraction trait
//!
//! This module defines the BlobStore trait that all storage backends must
//! implement, and the error types shared across them.

use async_trait::async_trait;
use bytes::Bytes;
use certia_core::{BlobMetadata, StorageBackend};
use futures::Stream;
use std::pin::Pin;
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("Metadata operation failed: {0}")]
    MetadataFailed(String),

    #[error("Blob not found: {0}")]
    NotFound(String),

    #[error("Invalid blob path: {0}")]
    InvalidPath(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl StorageError {
    /// HTTP-style status for errors that have a natural one.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            StorageError::NotFound(_) => Some(404),
            StorageError::InvalidPath(_) => Some(400),
            StorageError::ConfigError(_) => Some(500),
            _ => None,
        }
    }
}

/// External-facing translation of a failed storage interaction: an
/// HTTP-style status plus a displayable message. Backend error types never
/// cross this boundary.
#[derive(Debug, Clone, Error)]
#[error("storage backend failure ({status}): {message}")]
pub struct StorageBackendError {
    pub status: u16,
    pub message: String,
}

impl From<StorageError> for StorageBackendError {
    fn from(err: StorageError) -> Self {
        StorageBackendError {
            status: err.status_code().unwrap_or(400),
            message: err.to_string(),
        }
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Chunked blob content.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, StorageError>> + Send>>;

/// Storage abstraction trait
///
/// One instance is scoped to one container. All backends (Azure, local
/// filesystem) must implement this trait so the pipeline can work with any
/// backend without coupling to implementation details.
///
/// **Path format:** blob paths are relative within the container and must
/// not contain `..` or a leading `/`. See the crate root documentation.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Ensure the backing container exists and is usable.
    ///
    /// Idempotent: provisioning an already-existing container succeeds.
    /// Any other failure means the container cannot be used at all.
    async fn provision(&self) -> StorageResult<()>;

    /// Write a blob with its content type and metadata.
    async fn put(
        &self,
        blob_path: &str,
        data: Bytes,
        content_type: &str,
        metadata: &BlobMetadata,
    ) -> StorageResult<()>;

    /// Read a whole blob into memory.
    async fn get(&self, blob_path: &str) -> StorageResult<Vec<u8>>;

    /// Stream a blob's content starting at `offset` bytes in.
    ///
    /// The offset lets an interrupted transfer resume without re-reading
    /// bytes the caller already has.
    async fn get_stream(&self, blob_path: &str, offset: u64) -> StorageResult<ByteStream>;

    /// Read the metadata written alongside a blob.
    async fn metadata(&self, blob_path: &str) -> StorageResult<BlobMetadata>;

    /// Replace a blob's metadata.
    async fn set_metadata(&self, blob_path: &str, metadata: &BlobMetadata) -> StorageResult<()>;

    /// Delete a blob. Deleting a blob that does not exist is a no-op.
    async fn delete(&self, blob_path: &str) -> StorageResult<()>;

    /// Check if a blob exists
    async fn exists(&self, blob_path: &str) -> StorageResult<bool>;

    /// Get the size in bytes of a blob, if it exists.
    async fn content_length(&self, blob_path: &str) -> StorageResult<u64>;

    /// Get the storage backend type
    fn backend_type(&self) -> StorageBackend;

    /// The container this store writes into.
    fn container(&self) -> &str;

    /// Externally-resolvable URL for a blob: service root, container,
    /// then the blob path, in that order.
    fn url_for(&self, blob_path: &str) -> String;
}
