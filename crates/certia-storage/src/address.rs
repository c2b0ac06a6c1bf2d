//! Deterministic blob addressing.
//!
//! A document's location is a pure function of its category and the
//! arguments substituted into the category's name template, so the same
//! inputs always resolve to the same blob.

use crate::registry::ContainerRegistry;
use crate::traits::{BlobStore, StorageResult};
use certia_core::filename;
use certia_core::{BlobLocation, DocumentCategory};
use std::sync::Arc;

/// Resolves where a document's bytes live and hands out the cached store
/// for that location's container.
#[derive(Clone)]
pub struct BlobAddressResolver {
    registry: Arc<ContainerRegistry>,
}

impl BlobAddressResolver {
    pub fn new(registry: Arc<ContainerRegistry>) -> Self {
        BlobAddressResolver { registry }
    }

    /// Compute the location for a document by substituting `arguments`
    /// into the category's name template and sanitising the result for
    /// the storage backend.
    pub fn resolve(
        &self,
        category: &DocumentCategory,
        arguments: &[&str],
        path: Option<&str>,
    ) -> BlobLocation {
        let rendered = render_template(&category.blob_name_template, arguments);
        let file_name = filename::sanitise_for_storage(&rendered);
        match path {
            Some(path) => BlobLocation::with_path(&category.container, path, file_name),
            None => BlobLocation::new(&category.container, file_name),
        }
    }

    /// Ensure a container is usable before its first write.
    pub async fn provision(&self, container: &str) -> StorageResult<()> {
        self.registry.store_for(container).await.map(|_| ())
    }

    /// The cached store backing a location's container.
    pub async fn store_for(&self, location: &BlobLocation) -> StorageResult<Arc<dyn BlobStore>> {
        self.registry.store_for(&location.container).await
    }
}

fn render_template(template: &str, arguments: &[&str]) -> String {
    let mut rendered = template.to_string();
    for (index, argument) in arguments.iter().enumerate() {
        rendered = rendered.replace(&format!("{{{}}}", index), argument);
    }
    rendered
}

#[cfg(test)]
mod tests {
    use super::*;
    use certia_core::StorageSettings;

    fn resolver() -> BlobAddressResolver {
        BlobAddressResolver::new(Arc::new(ContainerRegistry::new(StorageSettings::default())))
    }

    #[test]
    fn test_resolving_the_same_inputs_twice_is_idempotent() {
        let resolver = resolver();
        let category = DocumentCategory::templates();

        let first = resolver.resolve(&category, &["Claim Form", "2"], None);
        let second = resolver.resolve(&category, &["Claim Form", "2"], None);

        assert_eq!(first, second);
        assert_eq!(first.container, "templates");
        assert_eq!(first.file_name, "claim-form-v2.pdf");
    }

    #[test]
    fn test_arguments_are_sanitised_for_the_backend() {
        let resolver = resolver();
        let category = DocumentCategory::templates();

        let location = resolver.resolve(&category, &["Ministry_Form (final)", "3"], None);

        assert_eq!(location.file_name, "ministry-form-final-v3.pdf");
    }

    #[test]
    fn test_optional_path_segment_prefixes_the_blob_path() {
        let resolver = resolver();
        let category = DocumentCategory::supporting_documents();

        let location = resolver.resolve(&category, &["case-12", "evidence.png"], Some("2026"));

        assert_eq!(location.blob_path(), "2026/case-12-evidence.png");
        assert_eq!(location.to_string(), "supporting-documents/2026/case-12-evidence.png");
    }
}
