use std::fmt::{Display, Formatter, Result as FmtResult};

use serde::{Deserialize, Serialize};

/// The kinds of file the pipeline accepts, keyed by extension.
///
/// The declared kind of an upload is derived from its file name; anything
/// that does not map onto one of these is rejected during validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Pdf,
    Zip,
    Png,
    Jpeg,
    Docx,
    Xlsx,
    Odt,
    Csv,
}

impl FileKind {
    /// Map a bare extension (no dot, any case) onto a kind.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "pdf" => Some(FileKind::Pdf),
            "zip" => Some(FileKind::Zip),
            "png" => Some(FileKind::Png),
            "jpg" | "jpeg" => Some(FileKind::Jpeg),
            "docx" => Some(FileKind::Docx),
            "xlsx" => Some(FileKind::Xlsx),
            "odt" => Some(FileKind::Odt),
            "csv" => Some(FileKind::Csv),
            _ => None,
        }
    }

    /// Derive the kind from a file name's final extension.
    pub fn from_file_name(name: &str) -> Option<Self> {
        let ext = name.rsplit_once('.').map(|(_, ext)| ext)?;
        Self::from_extension(ext)
    }

    pub fn extension(&self) -> &'static str {
        match self {
            FileKind::Pdf => "pdf",
            FileKind::Zip => "zip",
            FileKind::Png => "png",
            FileKind::Jpeg => "jpeg",
            FileKind::Docx => "docx",
            FileKind::Xlsx => "xlsx",
            FileKind::Odt => "odt",
            FileKind::Csv => "csv",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            FileKind::Pdf => "application/pdf",
            FileKind::Zip => "application/zip",
            FileKind::Png => "image/png",
            FileKind::Jpeg => "image/jpeg",
            FileKind::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
            FileKind::Xlsx => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            FileKind::Odt => "application/vnd.oasis.opendocument.text",
            FileKind::Csv => "text/csv",
        }
    }
}

impl Display for FileKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.extension())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derives_kind_from_file_name() {
        assert_eq!(FileKind::from_file_name("report.PDF"), Some(FileKind::Pdf));
        assert_eq!(FileKind::from_file_name("photo.jpg"), Some(FileKind::Jpeg));
        assert_eq!(FileKind::from_file_name("archive.tar.gz"), None);
        assert_eq!(FileKind::from_file_name("no-extension"), None);
    }
}
