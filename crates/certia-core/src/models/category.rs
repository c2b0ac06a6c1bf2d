//! Document categories: the per-category policy that drives validation,
//! sanitisation and blob addressing.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::models::FileKind;

const KIB: usize = 1024;
const MIB: usize = 1024 * 1024;

/// User-facing message strings for each validation failure mode.
///
/// Categories configure their own copy so rejection messages can name the
/// thing being uploaded rather than a generic "file".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryMessages {
    pub no_file: String,
    pub empty_file: String,
    pub wrong_kind: String,
    pub too_small: String,
    pub too_large: String,
}

impl CategoryMessages {
    fn new(
        no_file: &str,
        empty_file: &str,
        wrong_kind: &str,
        too_small: &str,
        too_large: &str,
    ) -> Self {
        CategoryMessages {
            no_file: no_file.to_string(),
            empty_file: empty_file.to_string(),
            wrong_kind: wrong_kind.to_string(),
            too_small: too_small.to_string(),
            too_large: too_large.to_string(),
        }
    }
}

/// Policy for one category of document.
///
/// A category fixes which container its documents land in, how blob names
/// are derived, the size band and permitted kinds enforced at validation,
/// and whether its PDFs must arrive as fillable forms.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentCategory {
    pub name: String,
    /// Backing container provisioned on first use.
    pub container: String,
    /// Blob name template; `{0}`, `{1}`, ... are replaced with the caller's
    /// naming arguments in order.
    pub blob_name_template: String,
    pub min_size_bytes: usize,
    pub max_size_bytes: usize,
    pub permitted_kinds: Vec<FileKind>,
    /// Whether uploads must carry a non-blank version string.
    pub requires_version: bool,
    /// Whether PDF uploads must contain at least one fillable form field.
    pub requires_fillable_pdf: bool,
    pub messages: CategoryMessages,
}

impl DocumentCategory {
    pub fn permits(&self, kind: FileKind) -> bool {
        self.permitted_kinds.contains(&kind)
    }

    /// Blank PDF templates distributed for applicants to fill in.
    pub fn templates() -> Self {
        DocumentCategory {
            name: "templates".to_string(),
            container: "templates".to_string(),
            blob_name_template: "{0}-v{1}.pdf".to_string(),
            min_size_bytes: KIB,
            max_size_bytes: 5 * MIB,
            permitted_kinds: vec![FileKind::Pdf],
            requires_version: true,
            requires_fillable_pdf: true,
            messages: CategoryMessages::new(
                "Select a template file",
                "The selected file is empty",
                "The selected file must be a PDF",
                "The selected file must be larger than 1KB",
                "The selected file must be smaller than 5MB",
            ),
        }
    }

    /// Completed application forms submitted by applicants.
    pub fn application_forms() -> Self {
        DocumentCategory {
            name: "application-forms".to_string(),
            container: "application-forms".to_string(),
            blob_name_template: "{0}-{1}.pdf".to_string(),
            min_size_bytes: KIB,
            max_size_bytes: 10 * MIB,
            permitted_kinds: vec![FileKind::Pdf],
            requires_version: false,
            requires_fillable_pdf: false,
            messages: CategoryMessages::new(
                "Select an application form",
                "The selected file is empty",
                "The selected file must be a PDF",
                "The selected file must be larger than 1KB",
                "The selected file must be smaller than 10MB",
            ),
        }
    }

    /// Supporting evidence attached to an application.
    pub fn supporting_documents() -> Self {
        DocumentCategory {
            name: "supporting-documents".to_string(),
            container: "supporting-documents".to_string(),
            blob_name_template: "{0}-{1}".to_string(),
            min_size_bytes: KIB,
            max_size_bytes: 20 * MIB,
            permitted_kinds: vec![
                FileKind::Pdf,
                FileKind::Zip,
                FileKind::Png,
                FileKind::Jpeg,
                FileKind::Docx,
                FileKind::Xlsx,
                FileKind::Odt,
                FileKind::Csv,
            ],
            requires_version: false,
            requires_fillable_pdf: false,
            messages: CategoryMessages::new(
                "Select a supporting document",
                "The selected file is empty",
                "The selected file must be a PDF, Word document, spreadsheet, image, CSV or ZIP",
                "The selected file must be larger than 1KB",
                "The selected file must be smaller than 20MB",
            ),
        }
    }
}

/// Lookup of the categories an installation serves, keyed by name.
#[derive(Debug, Clone, Default)]
pub struct CategoryRegistry {
    categories: HashMap<String, Arc<DocumentCategory>>,
}

impl CategoryRegistry {
    pub fn new() -> Self {
        CategoryRegistry::default()
    }

    /// The registry with the three built-in categories.
    pub fn standard() -> Self {
        let mut registry = CategoryRegistry::new();
        registry.register(DocumentCategory::templates());
        registry.register(DocumentCategory::application_forms());
        registry.register(DocumentCategory::supporting_documents());
        registry
    }

    pub fn register(&mut self, category: DocumentCategory) {
        self.categories
            .insert(category.name.clone(), Arc::new(category));
    }

    pub fn get(&self, name: &str) -> Option<Arc<DocumentCategory>> {
        self.categories.get(name).cloned()
    }

    pub fn names(&self) -> Vec<&str> {
        self.categories.keys().map(|name| name.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_registry_serves_all_categories() {
        let registry = CategoryRegistry::standard();
        for name in ["templates", "application-forms", "supporting-documents"] {
            let category = registry.get(name).unwrap();
            assert_eq!(category.name, name);
            assert!(category.max_size_bytes > category.min_size_bytes);
        }
        assert!(registry.get("unknown").is_none());
    }

    #[test]
    fn test_templates_demand_fillable_versioned_pdfs() {
        let templates = DocumentCategory::templates();
        assert!(templates.requires_version);
        assert!(templates.requires_fillable_pdf);
        assert!(templates.permits(FileKind::Pdf));
        assert!(!templates.permits(FileKind::Zip));
    }
}
