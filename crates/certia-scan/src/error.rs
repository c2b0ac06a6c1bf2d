use std::time::Duration;

/// Failures talking to the scan engine.
///
/// Verdicts are never synthesised from failures: any response the client
/// does not recognise is an error, so an unreachable or misbehaving engine
/// blocks delivery rather than waving content through.
#[derive(Debug, thiserror::Error)]
pub enum ScanEngineError {
    #[error("could not reach the scan engine after {attempts} attempts: {source}")]
    Unreachable {
        attempts: u32,
        #[source]
        source: std::io::Error,
    },

    #[error("scan engine I/O failure: {0}")]
    Io(#[from] std::io::Error),

    #[error("scan engine timed out after {0:?}")]
    Timeout(Duration),

    #[error("payload exceeds the scan engine's stream size limit")]
    PayloadTooLarge,

    #[error("scan engine licensing failure: {0}")]
    Licensing(String),

    #[error("scan engine resources exhausted: {0}")]
    ResourceExhausted(String),

    #[error("scan engine internal error: {0}")]
    Engine(String),

    #[error("unrecognised scan engine response: {0:?}")]
    UnrecognisedResponse(String),

    #[error("archive nesting exceeds the scan depth limit of {0}")]
    ArchiveTooDeep(u32),

    #[error("unreadable archive entry {name}: {reason}")]
    MalformedArchive { name: String, reason: String },
}
