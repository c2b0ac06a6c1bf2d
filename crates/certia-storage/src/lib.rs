//! Certia Storage Library
//!
//! This crate provides the blob storage abstraction for the document
//! pipeline. It includes the BlobStore trait, implementations for Azure
//! blob storage and the local filesystem, per-container connection caching,
//! deterministic blob addressing, and the delivery relay.
//!
//! # Blob layout
//!
//! Each document category writes into its own container (e.g. `templates`,
//! `application-forms`). Blob names come from the category's name template
//! with every argument passed through storage-name sanitisation, so
//! resolving the same inputs twice always yields the same location.
//!
//! Blob paths must not contain `..` or a leading `/`.

pub mod address;
#[cfg(feature = "storage-azure")]
pub mod azure;
#[cfg(feature = "storage-local")]
pub mod local;
pub mod registry;
pub mod relay;
pub mod traits;

// Re-export commonly used types
pub use address::BlobAddressResolver;
#[cfg(feature = "storage-azure")]
pub use azure::AzureBlobStore;
pub use certia_core::StorageBackend;
#[cfg(feature = "storage-local")]
pub use local::LocalBlobStore;
pub use registry::{create_blob_store, ContainerRegistry};
pub use relay::StreamRelay;
pub use traits::{BlobStore, ByteStream, StorageBackendError, StorageError, StorageResult};
