//! Backend factory and per-container connection cache.

#[cfg(feature = "storage-azure")]
use crate::AzureBlobStore;
#[cfg(feature = "storage-local")]
use crate::LocalBlobStore;
use crate::{BlobStore, StorageBackend, StorageError, StorageResult};
use certia_core::StorageSettings;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Create a blob store for one container based on configuration
pub fn create_blob_store(
    settings: &StorageSettings,
    container: &str,
) -> StorageResult<Arc<dyn BlobStore>> {
    let backend = settings.backend.unwrap_or(StorageBackend::Azure);

    match backend {
        #[cfg(feature = "storage-azure")]
        StorageBackend::Azure => {
            let account = settings.azure_account.clone().ok_or_else(|| {
                StorageError::ConfigError("AZURE_STORAGE_ACCOUNT not configured".to_string())
            })?;

            let store = AzureBlobStore::new(
                account,
                settings.azure_access_key.clone(),
                container,
                settings.azure_endpoint.clone(),
                settings.azure_public_base_url.clone(),
            )?;
            Ok(Arc::new(store))
        }

        #[cfg(not(feature = "storage-azure"))]
        StorageBackend::Azure => Err(StorageError::ConfigError(
            "Azure storage backend not available (storage-azure feature not enabled)".to_string(),
        )),

        #[cfg(feature = "storage-local")]
        StorageBackend::Local => {
            let root = settings.local_storage_path.clone().ok_or_else(|| {
                StorageError::ConfigError("LOCAL_STORAGE_PATH not configured".to_string())
            })?;
            let base_url = settings.local_storage_base_url.clone().ok_or_else(|| {
                StorageError::ConfigError("LOCAL_STORAGE_BASE_URL not configured".to_string())
            })?;

            Ok(Arc::new(LocalBlobStore::new(root, container, base_url)))
        }

        #[cfg(not(feature = "storage-local"))]
        StorageBackend::Local => Err(StorageError::ConfigError(
            "Local storage backend not available (storage-local feature not enabled)".to_string(),
        )),
    }
}

/// Caches one provisioned store per container so repeated resolutions
/// reuse the backing connection instead of re-authenticating.
pub struct ContainerRegistry {
    settings: StorageSettings,
    stores: RwLock<HashMap<String, Arc<dyn BlobStore>>>,
}

impl ContainerRegistry {
    pub fn new(settings: StorageSettings) -> Self {
        ContainerRegistry {
            settings,
            stores: RwLock::new(HashMap::new()),
        }
    }

    /// Get the store for a container, creating and provisioning it on first
    /// use. Two concurrent first uses may both provision; provisioning is
    /// idempotent and only one store is kept.
    pub async fn store_for(&self, container: &str) -> StorageResult<Arc<dyn BlobStore>> {
        if let Some(store) = self.stores.read().await.get(container) {
            return Ok(store.clone());
        }

        let store = create_blob_store(&self.settings, container)?;
        store.provision().await?;

        let mut stores = self.stores.write().await;
        let entry = stores.entry(container.to_string()).or_insert(store);
        Ok(entry.clone())
    }
}

#[cfg(all(test, feature = "storage-local"))]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn local_settings(root: &std::path::Path) -> StorageSettings {
        StorageSettings {
            backend: Some(StorageBackend::Local),
            local_storage_path: Some(root.to_string_lossy().to_string()),
            local_storage_base_url: Some("http://localhost:3000/blobs".to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_registry_caches_one_store_per_container() {
        let dir = tempdir().unwrap();
        let registry = ContainerRegistry::new(local_settings(dir.path()));

        let first = registry.store_for("templates").await.unwrap();
        let second = registry.store_for("templates").await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        let other = registry.store_for("application-forms").await.unwrap();
        assert_eq!(other.container(), "application-forms");
        assert!(dir.path().join("templates").is_dir());
        assert!(dir.path().join("application-forms").is_dir());
    }

    #[tokio::test]
    async fn test_missing_local_path_is_a_config_error() {
        let settings = StorageSettings {
            backend: Some(StorageBackend::Local),
            ..Default::default()
        };
        let registry = ContainerRegistry::new(settings);

        let result = registry.store_for("templates").await;
        assert!(matches!(result, Err(StorageError::ConfigError(_))));
    }
}
