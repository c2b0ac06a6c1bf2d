//! Certia Scan Library
//!
//! Client for a clamd-compatible virus scanning engine. Payloads are
//! streamed to the engine in chunks over a TCP session; verdicts carry the
//! engine's definitions descriptor so callers can report exactly which
//! signature database cleared or condemned a file. Archives are unpacked
//! and scanned entry by entry with a bounded nesting depth.

mod client;
mod error;
mod protocol;
mod verdict;

pub use client::ScanClient;
pub use error::ScanEngineError;
pub use verdict::{Definitions, Infection, ScanVerdict};
