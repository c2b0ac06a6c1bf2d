pub mod download;
pub mod mutation;
pub mod upload;

pub use download::DownloadService;
pub use mutation::{MutationError, MutationService, OwnershipGuard};
pub use upload::{RawFile, UploadError, UploadService};

use std::sync::Arc;

use certia_core::{CategoryRegistry, PipelineConfig};
use certia_scan::ScanClient;
use certia_storage::{BlobAddressResolver, ContainerRegistry, StreamRelay};

/// The three pipeline boundaries wired to one shared container registry,
/// so every service reuses the same cached backend connections.
pub struct DocumentPipeline {
    pub categories: CategoryRegistry,
    pub upload: UploadService,
    pub download: DownloadService,
    pub mutation: MutationService,
}

impl DocumentPipeline {
    pub fn from_config(config: &PipelineConfig) -> Result<Self, anyhow::Error> {
        config.validate()?;

        let registry = Arc::new(ContainerRegistry::new(config.storage.clone()));
        let resolver = BlobAddressResolver::new(registry);
        let scanner = ScanClient::new(config.scan.clone());

        Ok(DocumentPipeline {
            categories: CategoryRegistry::standard(),
            upload: UploadService::new(resolver.clone(), scanner),
            download: DownloadService::new(
                resolver.clone(),
                StreamRelay::new(config.relay.clone()),
            ),
            mutation: MutationService::new(resolver),
        })
    }
}
