//! Data models for the document pipeline
//!
//! This module contains the data structures shared across the pipeline,
//! organized by domain. Each sub-module represents a specific feature area.

mod blob;
mod category;
mod file_kind;
mod principal;

// Re-export all models for convenient imports
pub use blob::*;
pub use category::*;
pub use file_kind::*;
pub use principal::*;
