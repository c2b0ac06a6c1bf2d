//! Delivery relay: streams a stored blob to a caller-supplied sink.

use crate::traits::{BlobStore, StorageBackendError};
use certia_core::RelaySettings;
use futures::StreamExt;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::time::timeout;
use tracing::{info, warn};

/// Relays blob content to an output sink with one timeout and attempt
/// budget applied at two boundaries: waiting for the backend to start
/// responding, and each subsequent chunk read.
///
/// A retry resumes from the byte offset already flushed to the sink, so
/// the sink never receives a byte twice. Only timeouts are retried; a
/// definitive backend error ends the relay immediately.
#[derive(Clone)]
pub struct StreamRelay {
    settings: RelaySettings,
}

impl StreamRelay {
    pub fn new(settings: RelaySettings) -> Self {
        StreamRelay { settings }
    }

    /// Stream a blob into `sink`, returning the number of bytes delivered.
    /// The call returns only once the content is fully relayed or the
    /// attempt budget is spent.
    pub async fn relay<W>(
        &self,
        store: &dyn BlobStore,
        blob_path: &str,
        sink: &mut W,
    ) -> Result<u64, StorageBackendError>
    where
        W: AsyncWrite + Unpin + Send,
    {
        let limit = self.settings.attempt_timeout();
        let max_attempts = self.settings.max_attempts.max(1);
        let mut attempt = 1u32;
        let mut flushed: u64 = 0;
        let started = std::time::Instant::now();

        'attempts: loop {
            // Initial response boundary.
            let mut stream = match timeout(limit, store.get_stream(blob_path, flushed)).await {
                Ok(Ok(stream)) => stream,
                Ok(Err(err)) => return Err(err.into()),
                Err(_) => {
                    if attempt >= max_attempts {
                        return Err(exhausted(blob_path, flushed, max_attempts));
                    }
                    attempt += 1;
                    warn!(
                        path = %blob_path,
                        attempt,
                        flushed,
                        "storage backend did not respond in time; retrying"
                    );
                    continue 'attempts;
                }
            };

            // Body streaming boundary: the same policy applies per read.
            loop {
                match timeout(limit, stream.next()).await {
                    Ok(Some(Ok(chunk))) => {
                        sink.write_all(&chunk).await.map_err(|e| StorageBackendError {
                            status: 400,
                            message: format!("output sink rejected write: {}", e),
                        })?;
                        flushed += chunk.len() as u64;
                    }
                    Ok(Some(Err(err))) => return Err(err.into()),
                    Ok(None) => {
                        sink.flush().await.map_err(|e| StorageBackendError {
                            status: 400,
                            message: format!("output sink rejected flush: {}", e),
                        })?;
                        info!(
                            path = %blob_path,
                            size_bytes = flushed,
                            attempts = attempt,
                            duration_ms = started.elapsed().as_secs_f64() * 1000.0,
                            "relay complete"
                        );
                        return Ok(flushed);
                    }
                    Err(_) => {
                        if attempt >= max_attempts {
                            return Err(exhausted(blob_path, flushed, max_attempts));
                        }
                        attempt += 1;
                        warn!(
                            path = %blob_path,
                            attempt,
                            flushed,
                            "blob read stalled; resuming from flushed offset"
                        );
                        continue 'attempts;
                    }
                }
            }
        }
    }
}

fn exhausted(blob_path: &str, flushed: u64, attempts: u32) -> StorageBackendError {
    StorageBackendError {
        status: 400,
        message: format!(
            "transfer of {} gave up after {} attempts ({} bytes delivered)",
            blob_path, attempts, flushed
        ),
    }
}
