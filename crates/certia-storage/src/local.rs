use crate::traits::{BlobStore, ByteStream, StorageError, StorageResult};
use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use certia_core::BlobMetadata;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::{AsyncSeekExt, AsyncWriteExt};

/// Local filesystem storage implementation
///
/// Blobs live under `{root}/{container}/{blob_path}`. Metadata and content
/// type are kept in a JSON sidecar file next to each blob, since the
/// filesystem has nowhere native to put them.
#[derive(Clone)]
pub struct LocalBlobStore {
    container: String,
    base_path: PathBuf,
    base_url: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct SidecarRecord {
    content_type: String,
    metadata: BlobMetadata,
}

impl LocalBlobStore {
    /// Create a new LocalBlobStore for one container.
    ///
    /// # Arguments
    /// * `root` - Root directory for all containers (e.g. "/var/lib/certia/blobs")
    /// * `container` - Container name; becomes a directory under the root
    /// * `base_url` - Base URL for serving files (e.g. "http://localhost:3000/blobs")
    pub fn new(root: impl Into<PathBuf>, container: impl Into<String>, base_url: String) -> Self {
        let container = container.into();
        let base_path = root.into().join(&container);
        LocalBlobStore {
            container,
            base_path,
            base_url,
        }
    }

    /// Convert a blob path to a filesystem path, rejecting traversal
    /// sequences that could escape the container directory.
    fn path_for(&self, blob_path: &str) -> StorageResult<PathBuf> {
        if blob_path.is_empty() {
            return Err(StorageError::InvalidPath("blob path is empty".to_string()));
        }
        if blob_path.contains("..") || blob_path.starts_with('/') {
            return Err(StorageError::InvalidPath(
                "blob path contains invalid characters".to_string(),
            ));
        }
        Ok(self.base_path.join(blob_path))
    }

    fn sidecar_for(path: &Path) -> PathBuf {
        let mut sidecar = path.as_os_str().to_os_string();
        sidecar.push(".meta.json");
        PathBuf::from(sidecar)
    }

    async fn ensure_parent_dir(&self, path: &Path) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    async fn read_sidecar(&self, path: &Path) -> StorageResult<SidecarRecord> {
        let sidecar = Self::sidecar_for(path);
        if !fs::try_exists(&sidecar).await.unwrap_or(false) {
            return Ok(SidecarRecord::default());
        }
        let raw = fs::read(&sidecar)
            .await
            .map_err(|e| StorageError::MetadataFailed(e.to_string()))?;
        serde_json::from_slice(&raw).map_err(|e| StorageError::MetadataFailed(e.to_string()))
    }

    async fn write_sidecar(&self, path: &Path, record: &SidecarRecord) -> StorageResult<()> {
        let sidecar = Self::sidecar_for(path);
        let raw = serde_json::to_vec(record)
            .map_err(|e| StorageError::MetadataFailed(e.to_string()))?;
        fs::write(&sidecar, raw)
            .await
            .map_err(|e| StorageError::MetadataFailed(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn provision(&self) -> StorageResult<()> {
        fs::create_dir_all(&self.base_path).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create container directory {}: {}",
                self.base_path.display(),
                e
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
        let path = self.path_for(blob_path)?;
        let size = data.len();

        self.ensure_parent_dir(&path).await?;

        let start = std::time::Instant::now();

        let mut file = fs::File::create(&path).await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to create file {}: {}", path.display(), e))
        })?;

        file.write_all(&data).await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to write file {}: {}", path.display(), e))
        })?;

        file.sync_all().await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to sync file {}: {}", path.display(), e))
        })?;

        self.write_sidecar(
            &path,
            &SidecarRecord {
                content_type: content_type.to_string(),
                metadata: metadata.clone(),
            },
        )
        .await?;

        tracing::info!(
            container = %self.container,
            path = %blob_path,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage upload successful"
        );

        Ok(())
    }

    async fn get(&self, blob_path: &str) -> StorageResult<Vec<u8>> {
        let path = self.path_for(blob_path)?;
        let start = std::time::Instant::now();

        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Err(StorageError::NotFound(blob_path.to_string()));
        }

        let data = fs::read(&path).await.map_err(|e| {
            StorageError::DownloadFailed(format!("Failed to read file {}: {}", path.display(), e))
        })?;

        tracing::info!(
            container = %self.container,
            path = %blob_path,
            size_bytes = data.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage download successful"
        );

        Ok(data)
    }

    async fn get_stream(&self, blob_path: &str, offset: u64) -> StorageResult<ByteStream> {
        let path = self.path_for(blob_path)?;

        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Err(StorageError::NotFound(blob_path.to_string()));
        }

        let mut file = fs::File::open(&path).await.map_err(|e| {
            StorageError::DownloadFailed(format!("Failed to open file {}: {}", path.display(), e))
        })?;

        if offset > 0 {
            file.seek(SeekFrom::Start(offset)).await.map_err(|e| {
                StorageError::DownloadFailed(format!(
                    "Failed to seek to offset {} in {}: {}",
                    offset,
                    path.display(),
                    e
                ))
            })?;
        }

        let reader = tokio_util::io::ReaderStream::new(file);
        let stream = reader.map(|result| {
            result.map_err(|e| StorageError::DownloadFailed(format!("Failed to read chunk: {}", e)))
        });

        Ok(Box::pin(stream))
    }

    async fn metadata(&self, blob_path: &str) -> StorageResult<BlobMetadata> {
        let path = self.path_for(blob_path)?;

        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Err(StorageError::NotFound(blob_path.to_string()));
        }

        Ok(self.read_sidecar(&path).await?.metadata)
    }

    async fn set_metadata(&self, blob_path: &str, metadata: &BlobMetadata) -> StorageResult<()> {
        let path = self.path_for(blob_path)?;

        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Err(StorageError::NotFound(blob_path.to_string()));
        }

        let mut record = self.read_sidecar(&path).await?;
        record.metadata = metadata.clone();
        self.write_sidecar(&path, &record).await?;

        tracing::info!(
            container = %self.container,
            path = %blob_path,
            entries = metadata.len(),
            "Local storage metadata updated"
        );

        Ok(())
    }

    async fn delete(&self, blob_path: &str) -> StorageResult<()> {
        let path = self.path_for(blob_path)?;
        let start = std::time::Instant::now();

        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Ok(());
        }

        fs::remove_file(&path).await.map_err(|e| {
            StorageError::DeleteFailed(format!("Failed to delete file {}: {}", path.display(), e))
        })?;

        // Sidecar removal is best effort; an orphaned sidecar is harmless.
        let _ = fs::remove_file(Self::sidecar_for(&path)).await;

        tracing::info!(
            container = %self.container,
            path = %blob_path,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage delete successful"
        );

        Ok(())
    }

    async fn exists(&self, blob_path: &str) -> StorageResult<bool> {
        let path = self.path_for(blob_path)?;
        Ok(fs::try_exists(&path).await.unwrap_or(false))
    }

    async fn content_length(&self, blob_path: &str) -> StorageResult<u64> {
        let path = self.path_for(blob_path)?;
        let meta = fs::metadata(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StorageError::NotFound(blob_path.to_string())
            } else {
                StorageError::BackendError(e.to_string())
            }
        })?;
        Ok(meta.len())
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }

    fn container(&self) -> &str {
        &self.container
    }

    fn url_for(&self, blob_path: &str) -> String {
        format!(
            "{}/{}/{}",
            self.base_url.trim_end_matches('/'),
            self.container,
            blob_path
        )
    }
}

#[cfg(all(test, feature = "storage-local"))]
mod tests {
    use super::*;
    use futures::StreamExt;
    use tempfile::tempdir;

    fn store(root: &Path) -> LocalBlobStore {
        LocalBlobStore::new(root, "templates", "http://localhost:3000/blobs".to_string())
    }

    fn owner_metadata() -> BlobMetadata {
        let mut metadata = BlobMetadata::new();
        metadata.insert("applicant", "user-1");
        metadata
    }

    #[tokio::test]
    async fn test_put_get_round_trip_with_metadata() {
        let dir = tempdir().unwrap();
        let store = store(dir.path());
        store.provision().await.unwrap();

        let data = Bytes::from_static(b"template body");
        store
            .put("claim-v1.pdf", data.clone(), "application/pdf", &owner_metadata())
            .await
            .unwrap();

        let read = store.get("claim-v1.pdf").await.unwrap();
        assert_eq!(read, data.to_vec());

        let metadata = store.metadata("claim-v1.pdf").await.unwrap();
        assert_eq!(metadata.get("applicant"), Some("user-1"));

        assert_eq!(store.content_length("claim-v1.pdf").await.unwrap(), 13);
        assert_eq!(
            store.url_for("claim-v1.pdf"),
            "http://localhost:3000/blobs/templates/claim-v1.pdf"
        );
    }

    #[tokio::test]
    async fn test_path_traversal_rejected() {
        let dir = tempdir().unwrap();
        let store = store(dir.path());
        store.provision().await.unwrap();

        let result = store.get("../../../etc/passwd").await;
        assert!(matches!(result, Err(StorageError::InvalidPath(_))));

        let result = store.delete("../escape.pdf").await;
        assert!(matches!(result, Err(StorageError::InvalidPath(_))));

        let result = store.exists("/etc/passwd").await;
        assert!(matches!(result, Err(StorageError::InvalidPath(_))));
    }

    #[tokio::test]
    async fn test_delete_nonexistent_is_ok() {
        let dir = tempdir().unwrap();
        let store = store(dir.path());
        store.provision().await.unwrap();

        assert!(store.delete("never-uploaded.pdf").await.is_ok());
    }

    #[tokio::test]
    async fn test_delete_removes_blob_and_sidecar() {
        let dir = tempdir().unwrap();
        let store = store(dir.path());
        store.provision().await.unwrap();

        store
            .put("gone.pdf", Bytes::from_static(b"x"), "application/pdf", &owner_metadata())
            .await
            .unwrap();
        store.delete("gone.pdf").await.unwrap();

        assert!(!store.exists("gone.pdf").await.unwrap());
        assert!(matches!(
            store.metadata("gone.pdf").await,
            Err(StorageError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_set_metadata_preserves_content() {
        let dir = tempdir().unwrap();
        let store = store(dir.path());
        store.provision().await.unwrap();

        let data = Bytes::from_static(b"unchanged");
        store
            .put("form.pdf", data.clone(), "application/pdf", &owner_metadata())
            .await
            .unwrap();

        let mut updated = owner_metadata();
        updated.insert("status", "approved");
        store.set_metadata("form.pdf", &updated).await.unwrap();

        assert_eq!(store.get("form.pdf").await.unwrap(), data.to_vec());
        let metadata = store.metadata("form.pdf").await.unwrap();
        assert_eq!(metadata.get("status"), Some("approved"));
        assert_eq!(metadata.get("applicant"), Some("user-1"));
    }

    #[tokio::test]
    async fn test_stream_from_offset_skips_flushed_bytes() {
        let dir = tempdir().unwrap();
        let store = store(dir.path());
        store.provision().await.unwrap();

        store
            .put(
                "resume.bin",
                Bytes::from_static(b"hello world"),
                "application/octet-stream",
                &owner_metadata(),
            )
            .await
            .unwrap();

        let mut stream = store.get_stream("resume.bin", 6).await.unwrap();
        let mut tail = Vec::new();
        while let Some(chunk) = stream.next().await {
            tail.extend_from_slice(&chunk.unwrap());
        }

        assert_eq!(tail, b"world");
    }

    #[tokio::test]
    async fn test_missing_blob_is_not_found() {
        let dir = tempdir().unwrap();
        let store = store(dir.path());
        store.provision().await.unwrap();

        assert!(matches!(
            store.get("absent.pdf").await,
            Err(StorageError::NotFound(_))
        ));
        assert!(matches!(
            store.get_stream("absent.pdf", 0).await.err(),
            Some(StorageError::NotFound(_))
        ));
    }
}
