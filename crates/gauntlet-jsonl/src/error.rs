//! Error types for gauntlet-jsonl operations.

use std::io;
use thiserror::Error;

/// The error type for gauntlet-jsonl operations.
#[derive(Debug, Error)]
pub enum Error {
    /// IO error occurred while reading or writing.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid JSONL content.
    #[error("Invalid JSONL format: {0}")]
    InvalidFormat(String),
}

/// A specialized Result type for gauntlet-jsonl operations.
pub type Result<T> = std::result::Result<T, Error>;
