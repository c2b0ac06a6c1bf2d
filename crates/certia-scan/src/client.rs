use std::io;
use std::io::Read;
use std::time::Instant;

use futures::future::BoxFuture;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use certia_core::ScanSettings;

use crate::error::ScanEngineError;
use crate::protocol::{ClamdSession, RawVerdict};
use crate::verdict::{Definitions, Infection, ScanVerdict};

const ZIP_MAGIC: &[u8] = b"PK\x03\x04";

/// Client for a clamd-compatible scan engine.
///
/// Each scan runs over its own session: connect, query definitions, stream
/// the payload, close. Archives are unpacked locally and every entry is
/// scanned individually so a verdict names the entry that matched.
#[derive(Clone)]
pub struct ScanClient {
    settings: ScanSettings,
}

impl ScanClient {
    pub fn new(settings: ScanSettings) -> Self {
        ScanClient { settings }
    }

    /// Scan a single payload.
    pub async fn scan(&self, bytes: &[u8]) -> Result<ScanVerdict, ScanEngineError> {
        self.scan_labelled(bytes, "stream").await
    }

    /// Scan a payload, unpacking zip archives up to the configured nesting
    /// depth and scanning each entry. Infections are reported against
    /// `parent!entry` labels.
    pub async fn scan_archive(&self, bytes: &[u8]) -> Result<ScanVerdict, ScanEngineError> {
        self.scan_nested(bytes, "stream", 0).await
    }

    fn scan_nested<'a>(
        &'a self,
        bytes: &'a [u8],
        label: &'a str,
        depth: u32,
    ) -> BoxFuture<'a, Result<ScanVerdict, ScanEngineError>> {
        Box::pin(async move {
            if depth > self.settings.max_archive_depth {
                return Err(ScanEngineError::ArchiveTooDeep(
                    self.settings.max_archive_depth,
                ));
            }
            if !is_zip(bytes) {
                return self.scan_labelled(bytes, label).await;
            }

            let entries = unpack_zip(bytes, label)?;
            if entries.is_empty() {
                // Archive with no file entries: scan the container itself.
                return self.scan_labelled(bytes, label).await;
            }

            let mut definitions: Option<Definitions> = None;
            let mut infections = Vec::new();
            for (entry_label, entry_bytes) in entries {
                match self.scan_nested(&entry_bytes, &entry_label, depth + 1).await? {
                    ScanVerdict::Clean(defs) => {
                        definitions.get_or_insert(defs);
                    }
                    ScanVerdict::Infected {
                        definitions: defs,
                        infections: found,
                    } => {
                        definitions.get_or_insert(defs);
                        infections.extend(found);
                    }
                }
            }

            let definitions = definitions.unwrap_or_else(Definitions::unknown);
            if infections.is_empty() {
                Ok(ScanVerdict::Clean(definitions))
            } else {
                Ok(ScanVerdict::Infected {
                    definitions,
                    infections,
                })
            }
        })
    }

    async fn scan_labelled(
        &self,
        bytes: &[u8],
        label: &str,
    ) -> Result<ScanVerdict, ScanEngineError> {
        let started = Instant::now();
        let mut session = self.connect().await?;
        let outcome = self.run_scan(&mut session, bytes).await;
        session.end().await;

        let (definitions, raw) = outcome?;
        match raw {
            RawVerdict::Clean => {
                info!(
                    item = %label,
                    size = bytes.len(),
                    duration_ms = started.elapsed().as_millis(),
                    "scan verdict clean"
                );
                Ok(ScanVerdict::Clean(definitions))
            }
            RawVerdict::Found { name } => {
                warn!(
                    item = %label,
                    signature = %name,
                    duration_ms = started.elapsed().as_millis(),
                    "scan verdict infected"
                );
                Ok(ScanVerdict::Infected {
                    definitions,
                    infections: vec![Infection {
                        id: label.to_string(),
                        name,
                    }],
                })
            }
        }
    }

    async fn run_scan(
        &self,
        session: &mut ClamdSession,
        bytes: &[u8],
    ) -> Result<(Definitions, RawVerdict), ScanEngineError> {
        let definitions = session.version().await?;
        let raw = session.scan_stream(bytes, self.settings.chunk_size).await?;
        Ok((definitions, raw))
    }

    /// Try every endpoint in order, several rounds, before giving up.
    async fn connect(&self) -> Result<ClamdSession, ScanEngineError> {
        let attempts = self.settings.connect_attempts.max(1);
        let mut last_error: Option<io::Error> = None;

        for attempt in 1..=attempts {
            for endpoint in &self.settings.endpoints {
                match ClamdSession::open(endpoint, self.settings.io_timeout()).await {
                    Ok(session) => return Ok(session),
                    Err(err) => {
                        debug!(
                            endpoint = %endpoint,
                            attempt,
                            error = %err,
                            "scan engine connection failed"
                        );
                        last_error = Some(err);
                    }
                }
            }
            if attempt < attempts {
                sleep(self.settings.retry_delay()).await;
            }
        }

        Err(ScanEngineError::Unreachable {
            attempts,
            source: last_error.unwrap_or_else(|| {
                io::Error::new(
                    io::ErrorKind::NotConnected,
                    "no scan engine endpoints configured",
                )
            }),
        })
    }
}

fn is_zip(bytes: &[u8]) -> bool {
    bytes.starts_with(ZIP_MAGIC)
}

/// Extract every file entry from a zip payload. Entry sizes declared in the
/// archive headers are not trusted for allocation.
fn unpack_zip(bytes: &[u8], parent: &str) -> Result<Vec<(String, Vec<u8>)>, ScanEngineError> {
    let cursor = io::Cursor::new(bytes);
    let mut archive =
        zip::ZipArchive::new(cursor).map_err(|err| ScanEngineError::MalformedArchive {
            name: parent.to_string(),
            reason: err.to_string(),
        })?;

    let mut entries = Vec::new();
    for index in 0..archive.len() {
        let mut entry =
            archive
                .by_index(index)
                .map_err(|err| ScanEngineError::MalformedArchive {
                    name: format!("{}!#{}", parent, index),
                    reason: err.to_string(),
                })?;
        if entry.is_dir() {
            continue;
        }
        let label = format!("{}!{}", parent, entry.name());
        let mut data = Vec::new();
        entry
            .read_to_end(&mut data)
            .map_err(|err| ScanEngineError::MalformedArchive {
                name: label.clone(),
                reason: err.to_string(),
            })?;
        entries.push((label, data));
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zip_detection_checks_the_magic() {
        assert!(is_zip(b"PK\x03\x04rest"));
        assert!(!is_zip(b"%PDF-1.5"));
        assert!(!is_zip(b""));
    }

    #[test]
    fn test_unpack_labels_entries_against_their_parent() {
        let mut cursor = io::Cursor::new(Vec::new());
        {
            let mut writer = zip::ZipWriter::new(&mut cursor);
            let options = zip::write::FileOptions::default();
            writer.start_file("a.txt", options).unwrap();
            std::io::Write::write_all(&mut writer, b"alpha").unwrap();
            writer.add_directory("sub", options).unwrap();
            writer.start_file("sub/b.txt", options).unwrap();
            std::io::Write::write_all(&mut writer, b"beta").unwrap();
            writer.finish().unwrap();
        }
        let bytes = cursor.into_inner();

        let entries = unpack_zip(&bytes, "stream").unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].0, "stream!a.txt");
        assert_eq!(entries[0].1, b"alpha");
        assert_eq!(entries[1].0, "stream!sub/b.txt");
    }

    #[test]
    fn test_unpack_rejects_garbage_with_the_zip_magic() {
        let err = unpack_zip(b"PK\x03\x04 not actually a zip", "stream").unwrap_err();
        assert!(matches!(err, ScanEngineError::MalformedArchive { .. }));
    }
}
