//! Error types for cache operations

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for cache operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while reading, writing or sweeping the cache
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error on a specific cache path
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Directory walk failed
    #[error("Failed to scan cache directory: {0}")]
    Walk(#[from] walkdir::Error),

    /// TTL cannot be represented as a calendar offset
    #[error("Invalid TTL: {0:?}")]
    InvalidTtl(std::time::Duration),

    /// No home directory to anchor the per-user cache
    #[error("Could not determine the home directory")]
    NoHomeDir,
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}
