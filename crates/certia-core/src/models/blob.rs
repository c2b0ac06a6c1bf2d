//! Blob addressing and metadata models: backend-agnostic reference to where
//! a document lives and what is recorded against it.

use std::collections::HashMap;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::models::Principal;

/// Metadata key holding the id of the principal that uploaded a document.
/// Written once at upload and consulted on every subsequent mutation check.
pub const APPLICANT_KEY: &str = "applicant";

/// Metadata key holding the RFC 3339 upload timestamp.
pub const UPLOADED_KEY: &str = "uploaded";

/// A deterministic address for a stored document: the backing container,
/// an optional virtual directory within it, and the blob's file name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlobLocation {
    pub container: String,
    pub path: Option<String>,
    pub file_name: String,
}

impl BlobLocation {
    pub fn new(container: impl Into<String>, file_name: impl Into<String>) -> Self {
        BlobLocation {
            container: container.into(),
            path: None,
            file_name: file_name.into(),
        }
    }

    pub fn with_path(
        container: impl Into<String>,
        path: impl Into<String>,
        file_name: impl Into<String>,
    ) -> Self {
        BlobLocation {
            container: container.into(),
            path: Some(path.into()),
            file_name: file_name.into(),
        }
    }

    /// The blob's key within its container, with the virtual directory
    /// prepended when present.
    pub fn blob_path(&self) -> String {
        match &self.path {
            Some(path) => format!("{}/{}", path.trim_matches('/'), self.file_name),
            None => self.file_name.clone(),
        }
    }
}

impl Display for BlobLocation {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}/{}", self.container, self.blob_path())
    }
}

impl FromStr for BlobLocation {
    type Err = anyhow::Error;

    /// Parse the `container/path/file` form produced by `Display`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim_matches('/');
        let (container, rest) = trimmed
            .split_once('/')
            .ok_or_else(|| anyhow::anyhow!("Invalid blob address: {}", s))?;
        if container.is_empty() || rest.is_empty() {
            return Err(anyhow::anyhow!("Invalid blob address: {}", s));
        }
        match rest.rsplit_once('/') {
            Some((path, file_name)) => Ok(BlobLocation::with_path(container, path, file_name)),
            None => Ok(BlobLocation::new(container, rest)),
        }
    }
}

/// String key/value metadata stored alongside a blob.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlobMetadata(HashMap<String, String>);

impl BlobMetadata {
    pub fn new() -> Self {
        BlobMetadata(HashMap::new())
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(|v| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.0.iter()
    }

    /// The id of the principal recorded as this document's uploader.
    pub fn applicant(&self) -> Option<&str> {
        self.get(APPLICANT_KEY)
    }

    pub fn set_applicant(&mut self, principal: &Principal) {
        self.insert(APPLICANT_KEY, principal.id.clone());
    }

    pub fn stamp_uploaded(&mut self) {
        self.insert(UPLOADED_KEY, Utc::now().to_rfc3339());
    }

    /// The canonical ownership check: the caller owns the document when its
    /// id matches the recorded applicant.
    pub fn is_owned_by(&self, principal: &Principal) -> bool {
        self.applicant() == Some(principal.id.as_str())
    }

    /// Fold `updates` into this metadata. The applicant marker is written
    /// once at upload and is never overwritten by later updates.
    pub fn merge_updates(&mut self, updates: BlobMetadata) {
        for (key, value) in updates.0 {
            if key == APPLICANT_KEY && self.0.contains_key(APPLICANT_KEY) {
                continue;
            }
            self.0.insert(key, value);
        }
    }
}

impl FromIterator<(String, String)> for BlobMetadata {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        BlobMetadata(iter.into_iter().collect())
    }
}

/// The outcome of a successful upload: where the document landed and the
/// externally resolvable URL for it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredDocument {
    pub location: BlobLocation,
    pub url: String,
    pub content_type: String,
    pub size: u64,
}
