use crate::traits::{BlobStore, ByteStream, StorageError, StorageResult};
use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use certia_core::BlobMetadata;
use futures::StreamExt;
use object_store::azure::{MicrosoftAzure, MicrosoftAzureBuilder};
use object_store::path::Path;
use object_store::Error as ObjectStoreError;
use object_store::{
    Attribute, Attributes, GetOptions, GetRange, ObjectStore, ObjectStoreExt, PutOptions,
    PutPayload, Result as ObjectResult,
};
use std::borrow::Cow;
use std::sync::Arc;

/// Azure blob storage implementation
///
/// One instance is scoped to one container. Blob metadata rides on the
/// object's attributes, so it is written atomically with the content.
#[derive(Clone)]
pub struct AzureBlobStore {
    store: Arc<MicrosoftAzure>,
    account: String,
    container: String,
    endpoint: Option<String>, // Custom endpoint for Azurite or other emulators
    public_base_url: Option<String>,
}

impl AzureBlobStore {
    /// Create a new AzureBlobStore instance
    ///
    /// # Arguments
    /// * `account` - Storage account name
    /// * `access_key` - Optional shared access key; other credentials can
    ///   come from the environment
    /// * `container` - Container this store is scoped to
    /// * `endpoint` - Optional custom endpoint URL for emulators
    ///   (e.g., "http://127.0.0.1:10000" for Azurite)
    /// * `public_base_url` - Optional base for external URLs when blobs are
    ///   served through a CDN or proxy rather than the account hostname
    pub fn new(
        account: String,
        access_key: Option<String>,
        container: impl Into<String>,
        endpoint: Option<String>,
        public_base_url: Option<String>,
    ) -> StorageResult<Self> {
        let container = container.into();

        // Build the Azure object store from environment and explicit settings.
        let mut builder = MicrosoftAzureBuilder::from_env()
            .with_account(account.clone())
            .with_container_name(container.clone());

        if let Some(ref key) = access_key {
            builder = builder.with_access_key(key.clone());
        }

        if let Some(ref endpoint) = endpoint {
            let allow_http = endpoint.starts_with("http://");
            builder = builder
                .with_endpoint(endpoint.clone())
                .with_allow_http(allow_http);
        }

        let store = builder
            .build()
            .map_err(|e| StorageError::ConfigError(e.to_string()))?;

        Ok(AzureBlobStore {
            store: Arc::new(store),
            account,
            container,
            endpoint,
            public_base_url,
        })
    }

    fn location(blob_path: &str) -> Path {
        Path::from(blob_path)
    }

    fn attributes_for(content_type: &str, metadata: &BlobMetadata) -> Attributes {
        let mut attributes = Attributes::new();
        attributes.insert(Attribute::ContentType, content_type.to_string().into());
        for (key, value) in metadata.iter() {
            attributes.insert(
                Attribute::Metadata(Cow::Owned(key.clone())),
                value.clone().into(),
            );
        }
        attributes
    }
}

#[async_trait]
impl BlobStore for AzureBlobStore {
    /// The client cannot create containers, so provisioning probes the
    /// configured one instead. An existing container always succeeds; a
    /// missing or unreachable one is a configuration failure.
    async fn provision(&self) -> StorageResult<()> {
        self.store.list_with_delimiter(None).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "container {} is not usable: {}",
                self.container, e
            ))
        })?;
        Ok(())
    }

    async fn put(
        &self,
        blob_path: &str,
        data: Bytes,
        content_type: &str,
        metadata: &BlobMetadata,
    ) -> StorageResult<()> {
        let location = Self::location(blob_path);
        let size = data.len() as u64;
        let options = PutOptions {
            attributes: Self::attributes_for(content_type, metadata),
            ..Default::default()
        };

        let start = std::time::Instant::now();

        let result: ObjectResult<_> = self
            .store
            .put_opts(&location, PutPayload::from(data), options)
            .await;

        result.map_err(|e| {
            tracing::error!(
                error = %e,
                container = %self.container,
                path = %blob_path,
                size_bytes = size,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "Azure upload failed"
            );
            StorageError::UploadFailed(e.to_string())
        })?;

        tracing::info!(
            container = %self.container,
            path = %blob_path,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Azure upload successful"
        );

        Ok(())
    }

    async fn get(&self, blob_path: &str) -> StorageResult<Vec<u8>> {
        let start = std::time::Instant::now();
        let location = Self::location(blob_path);

        let result: ObjectResult<_> = self.store.get(&location).await;

        let result = result.map_err(|e| match e {
            ObjectStoreError::NotFound { .. } => StorageError::NotFound(blob_path.to_string()),
            other => {
                tracing::error!(
                    error = %other,
                    container = %self.container,
                    path = %blob_path,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "Azure download failed"
                );
                StorageError::DownloadFailed(other.to_string())
            }
        })?;

        let bytes = result
            .bytes()
            .await
            .map_err(|e| StorageError::DownloadFailed(e.to_string()))?;

        tracing::info!(
            container = %self.container,
            path = %blob_path,
            size_bytes = bytes.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Azure download successful"
        );

        Ok(bytes.to_vec())
    }

    async fn get_stream(&self, blob_path: &str, offset: u64) -> StorageResult<ByteStream> {
        let location = Self::location(blob_path);
        let options = if offset > 0 {
            GetOptions {
                range: Some(GetRange::Offset(offset)),
                ..Default::default()
            }
        } else {
            GetOptions::default()
        };

        let result = self
            .store
            .get_opts(&location, options)
            .await
            .map_err(|e| match e {
                ObjectStoreError::NotFound { .. } => StorageError::NotFound(blob_path.to_string()),
                other => StorageError::DownloadFailed(other.to_string()),
            })?;

        let stream = result
            .into_stream()
            .map(|chunk| chunk.map_err(|e| StorageError::DownloadFailed(e.to_string())));

        Ok(Box::pin(stream))
    }

    async fn metadata(&self, blob_path: &str) -> StorageResult<BlobMetadata> {
        let location = Self::location(blob_path);
        let options = GetOptions {
            head: true,
            ..Default::default()
        };

        let result = self
            .store
            .get_opts(&location, options)
            .await
            .map_err(|e| match e {
                ObjectStoreError::NotFound { .. } => StorageError::NotFound(blob_path.to_string()),
                other => StorageError::MetadataFailed(other.to_string()),
            })?;

        let mut metadata = BlobMetadata::new();
        for (attribute, value) in result.attributes.iter() {
            if let Attribute::Metadata(key) = attribute {
                metadata.insert(key.to_string(), value.to_string());
            }
        }

        Ok(metadata)
    }

    /// Attributes can only be written with content, so a metadata update
    /// re-uploads the blob with its existing bytes and content type.
    async fn set_metadata(&self, blob_path: &str, metadata: &BlobMetadata) -> StorageResult<()> {
        let location = Self::location(blob_path);

        let current = self
            .store
            .get_opts(&location, GetOptions::default())
            .await
            .map_err(|e| match e {
                ObjectStoreError::NotFound { .. } => StorageError::NotFound(blob_path.to_string()),
                other => StorageError::MetadataFailed(other.to_string()),
            })?;

        let content_type = current
            .attributes
            .get(&Attribute::ContentType)
            .map(|value| value.to_string())
            .unwrap_or_else(|| "application/octet-stream".to_string());

        let bytes = current
            .bytes()
            .await
            .map_err(|e| StorageError::MetadataFailed(e.to_string()))?;

        self.put(blob_path, bytes, &content_type, metadata).await?;

        tracing::info!(
            container = %self.container,
            path = %blob_path,
            entries = metadata.len(),
            "Azure metadata updated"
        );

        Ok(())
    }

    async fn delete(&self, blob_path: &str) -> StorageResult<()> {
        let start = std::time::Instant::now();
        let location = Self::location(blob_path);

        match self.store.delete(&location).await {
            Ok(()) => {
                tracing::info!(
                    container = %self.container,
                    path = %blob_path,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "Azure delete successful"
                );
                Ok(())
            }
            Err(ObjectStoreError::NotFound { .. }) => Ok(()),
            Err(e) => {
                tracing::error!(
                    error = %e,
                    container = %self.container,
                    path = %blob_path,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "Azure delete failed"
                );
                Err(StorageError::DeleteFailed(e.to_string()))
            }
        }
    }

    async fn exists(&self, blob_path: &str) -> StorageResult<bool> {
        let location = Self::location(blob_path);
        match self.store.head(&location).await {
            Ok(_) => Ok(true),
            Err(ObjectStoreError::NotFound { .. }) => Ok(false),
            Err(e) => Err(StorageError::BackendError(e.to_string())),
        }
    }

    async fn content_length(&self, blob_path: &str) -> StorageResult<u64> {
        let location = Self::location(blob_path);
        match self.store.head(&location).await {
            Ok(meta) => Ok(meta.size),
            Err(ObjectStoreError::NotFound { .. }) => {
                Err(StorageError::NotFound(blob_path.to_string()))
            }
            Err(e) => Err(StorageError::BackendError(e.to_string())),
        }
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Azure
    }

    fn container(&self) -> &str {
        &self.container
    }

    fn url_for(&self, blob_path: &str) -> String {
        if let Some(ref base) = self.public_base_url {
            format!(
                "{}/{}/{}",
                base.trim_end_matches('/'),
                self.container,
                blob_path
            )
        } else if let Some(ref endpoint) = self.endpoint {
            // Emulators use path-style addressing: {endpoint}/{account}/{container}/{blob}
            format!(
                "{}/{}/{}/{}",
                endpoint.trim_end_matches('/'),
                self.account,
                self.container,
                blob_path
            )
        } else {
            format!(
                "https://{}.blob.core.windows.net/{}/{}",
                self.account, self.container, blob_path
            )
        }
    }
}
