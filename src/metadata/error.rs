//! Driver-level error types.

use thiserror::Error;

/// Result type for driver operations.
pub type SourceResult<T> = Result<T, SourceError>;

/// Errors raised while talking to the database.
///
/// These are connectivity and metadata failures; the core never recovers
/// from them and propagates them unchanged.
#[derive(Error, Debug)]
pub enum SourceError {
    /// Underlying SQLite failure.
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// The database file could not be opened.
    #[error("failed to open database '{path}': {source}")]
    OpenFailed {
        /// Path that was opened.
        path: String,
        /// Driver error.
        #[source]
        source: rusqlite::Error,
    },

    /// A table named in a request does not exist.
    #[error("table not found: {0}")]
    TableNotFound(String),

    /// Vendor metadata could not be encoded.
    #[error("failed to encode vendor metadata: {0}")]
    VendorMetadata(#[from] serde_json::Error),
}

impl SourceError {
    /// Create an open error for a path.
    pub fn open_failed(path: impl Into<String>, source: rusqlite::Error) -> Self {
        Self::OpenFailed {
            path: path.into(),
            source,
        }
    }
}
