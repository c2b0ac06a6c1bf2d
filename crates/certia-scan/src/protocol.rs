//! Session protocol spoken with the scan engine.
//!
//! One TCP connection carries one scan conversation: a session open, a
//! version query, a chunked payload stream, and a session end. Commands are
//! null-delimited; payload chunks are length-prefixed with a zero-length
//! terminator. Every read and write is bounded by the configured socket
//! timeout so a wedged engine cannot hold an upload open indefinitely.

use std::future::Future;
use std::io;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::time::timeout;

use crate::error::ScanEngineError;
use crate::verdict::Definitions;

pub(crate) struct ClamdSession {
    stream: BufReader<TcpStream>,
    io_timeout: Duration,
}

/// Response to one streamed payload, before labelling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum RawVerdict {
    Clean,
    Found { name: String },
}

async fn io_bound<T>(
    limit: Duration,
    fut: impl Future<Output = io::Result<T>>,
) -> Result<T, ScanEngineError> {
    match timeout(limit, fut).await {
        Ok(result) => Ok(result?),
        Err(_) => Err(ScanEngineError::Timeout(limit)),
    }
}

impl ClamdSession {
    pub(crate) async fn open(endpoint: &str, io_timeout: Duration) -> io::Result<ClamdSession> {
        let stream = match timeout(io_timeout, TcpStream::connect(endpoint)).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(io::Error::new(
                    io::ErrorKind::TimedOut,
                    format!("connecting to {} timed out", endpoint),
                ))
            }
        };
        let mut session = ClamdSession {
            stream: BufReader::new(stream),
            io_timeout,
        };
        match timeout(
            io_timeout,
            session.stream.get_mut().write_all(b"zIDSESSION\0"),
        )
        .await
        {
            Ok(result) => result?,
            Err(_) => {
                return Err(io::Error::new(
                    io::ErrorKind::TimedOut,
                    "scan engine handshake timed out",
                ))
            }
        }
        Ok(session)
    }

    /// Ask the engine which signature database it is scanning with.
    pub(crate) async fn version(&mut self) -> Result<Definitions, ScanEngineError> {
        let limit = self.io_timeout;
        io_bound(limit, self.stream.get_mut().write_all(b"zVERSION\0")).await?;
        let line = self.read_response().await?;
        let body = strip_session_prefix(&line);
        if body.is_empty() {
            return Err(ScanEngineError::UnrecognisedResponse(line));
        }
        Ok(parse_version(body))
    }

    /// Stream one payload and return the engine's verdict on it.
    pub(crate) async fn scan_stream(
        &mut self,
        bytes: &[u8],
        chunk_size: usize,
    ) -> Result<RawVerdict, ScanEngineError> {
        let limit = self.io_timeout;
        let chunk_size = chunk_size.max(1);

        io_bound(limit, self.stream.get_mut().write_all(b"zINSTREAM\0")).await?;
        for chunk in bytes.chunks(chunk_size) {
            let prefix = (chunk.len() as u32).to_be_bytes();
            io_bound(limit, self.stream.get_mut().write_all(&prefix)).await?;
            io_bound(limit, self.stream.get_mut().write_all(chunk)).await?;
        }
        io_bound(
            limit,
            self.stream.get_mut().write_all(&0u32.to_be_bytes()),
        )
        .await?;
        io_bound(limit, self.stream.get_mut().flush()).await?;

        let line = self.read_response().await?;
        parse_scan_response(&line)
    }

    /// Close the session. Best effort: the socket is dropped either way.
    pub(crate) async fn end(mut self) {
        let _ = timeout(self.io_timeout, self.stream.get_mut().write_all(b"zEND\0")).await;
    }

    async fn read_response(&mut self) -> Result<String, ScanEngineError> {
        let limit = self.io_timeout;
        let mut buf = Vec::new();
        let read = io_bound(limit, self.stream.read_until(0, &mut buf)).await?;
        if read == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "scan engine closed the connection",
            )
            .into());
        }
        if buf.last() == Some(&0) {
            buf.pop();
        }
        Ok(String::from_utf8_lossy(&buf).trim().to_string())
    }
}

/// Session responses arrive as `<request-id>: <body>`; strip the id.
pub(crate) fn strip_session_prefix(line: &str) -> &str {
    match line.split_once(": ") {
        Some((id, rest)) if !id.is_empty() && id.chars().all(|c| c.is_ascii_digit()) => rest,
        _ => line,
    }
}

/// Parse `ClamAV 1.3.1/27399/Wed Aug 20 10:31:26 2025` into a descriptor.
pub(crate) fn parse_version(body: &str) -> Definitions {
    let mut parts = body.splitn(3, '/').map(str::trim);
    let engine_version = match parts.next() {
        Some(version) if !version.is_empty() => version.to_string(),
        _ => "unknown".to_string(),
    };
    let _signature_release = parts.next();
    let rules_date = match parts.next() {
        Some(date) if !date.is_empty() => date.to_string(),
        _ => "unknown".to_string(),
    };
    Definitions {
        engine_version,
        rules_date,
    }
}

/// Map a scan response line onto a verdict or a classified engine failure.
/// Anything unrecognised is an error: verdicts are never guessed.
pub(crate) fn parse_scan_response(line: &str) -> Result<RawVerdict, ScanEngineError> {
    let body = strip_session_prefix(line);

    if let Some(rest) = body.strip_suffix(" FOUND") {
        let name = match rest.split_once(": ") {
            Some((_, name)) => name,
            None => rest,
        };
        return Ok(RawVerdict::Found {
            name: name.trim().to_string(),
        });
    }

    if body == "OK" || body.ends_with(": OK") {
        return Ok(RawVerdict::Clean);
    }

    if let Some(message) = body.strip_suffix("ERROR") {
        let message = message.trim().trim_end_matches('.').to_string();
        let lowered = message.to_lowercase();
        return Err(if lowered.contains("size limit") {
            ScanEngineError::PayloadTooLarge
        } else if lowered.contains("licen") {
            ScanEngineError::Licensing(message)
        } else if lowered.contains("memory") || lowered.contains("resource") {
            ScanEngineError::ResourceExhausted(message)
        } else {
            ScanEngineError::Engine(message)
        });
    }

    Err(ScanEngineError::UnrecognisedResponse(line.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_numeric_session_prefixes_only() {
        assert_eq!(strip_session_prefix("1: stream: OK"), "stream: OK");
        assert_eq!(strip_session_prefix("42: foo"), "foo");
        assert_eq!(strip_session_prefix("stream: OK"), "stream: OK");
        assert_eq!(strip_session_prefix("no prefix"), "no prefix");
    }

    #[test]
    fn test_parses_the_standard_version_line() {
        let defs = parse_version("ClamAV 1.3.1/27399/Wed Aug 20 10:31:26 2025");
        assert_eq!(defs.engine_version, "ClamAV 1.3.1");
        assert_eq!(defs.rules_date, "Wed Aug 20 10:31:26 2025");
    }

    #[test]
    fn test_version_without_database_parts_is_tolerated() {
        let defs = parse_version("ClamAV 1.3.1");
        assert_eq!(defs.engine_version, "ClamAV 1.3.1");
        assert_eq!(defs.rules_date, "unknown");
    }

    #[test]
    fn test_clean_and_found_responses_parse() {
        assert_eq!(
            parse_scan_response("1: stream: OK").unwrap(),
            RawVerdict::Clean
        );
        assert_eq!(
            parse_scan_response("2: stream: Eicar-Test-Signature FOUND").unwrap(),
            RawVerdict::Found {
                name: "Eicar-Test-Signature".to_string()
            }
        );
    }

    #[test]
    fn test_engine_errors_are_classified() {
        assert!(matches!(
            parse_scan_response("1: INSTREAM size limit exceeded. ERROR"),
            Err(ScanEngineError::PayloadTooLarge)
        ));
        assert!(matches!(
            parse_scan_response("License expired. ERROR"),
            Err(ScanEngineError::Licensing(_))
        ));
        assert!(matches!(
            parse_scan_response("Out of memory ERROR"),
            Err(ScanEngineError::ResourceExhausted(_))
        ));
        assert!(matches!(
            parse_scan_response("Unexpected failure ERROR"),
            Err(ScanEngineError::Engine(_))
        ));
    }

    #[test]
    fn test_unrecognised_responses_fail_closed() {
        assert!(matches!(
            parse_scan_response("WIBBLE"),
            Err(ScanEngineError::UnrecognisedResponse(_))
        ));
    }
}
