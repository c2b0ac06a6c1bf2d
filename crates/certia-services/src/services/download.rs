use tokio::io::AsyncWrite;
use tracing::info;

use certia_core::BlobLocation;
use certia_storage::{BlobAddressResolver, StorageBackendError, StreamRelay};

/// Streams stored documents back to callers through the retrying relay.
/// Every backend failure surfaces as a status-coded [`StorageBackendError`].
#[derive(Clone)]
pub struct DownloadService {
    resolver: BlobAddressResolver,
    relay: StreamRelay,
}

impl DownloadService {
    pub fn new(resolver: BlobAddressResolver, relay: StreamRelay) -> Self {
        DownloadService { resolver, relay }
    }

    /// Relay the document at `location` into `sink` and return the number of
    /// bytes delivered. Returns only once the stream has fully drained or
    /// definitively failed.
    pub async fn stream_to<W>(
        &self,
        location: &BlobLocation,
        sink: &mut W,
    ) -> Result<u64, StorageBackendError>
    where
        W: AsyncWrite + Unpin + Send,
    {
        let store = self
            .resolver
            .store_for(location)
            .await
            .map_err(StorageBackendError::from)?;
        let delivered = self
            .relay
            .relay(store.as_ref(), &location.blob_path(), sink)
            .await?;
        info!(location = %location, size_bytes = delivered, "document delivered");
        Ok(delivered)
    }

    /// Size of the stored document, for callers that announce a length
    /// before streaming.
    pub async fn content_length(&self, location: &BlobLocation) -> Result<u64, StorageBackendError> {
        let store = self
            .resolver
            .store_for(location)
            .await
            .map_err(StorageBackendError::from)?;
        store
            .content_length(&location.blob_path())
            .await
            .map_err(StorageBackendError::from)
    }
}
