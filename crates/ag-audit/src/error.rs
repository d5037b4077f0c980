// error.rs — Error types for the audit subsystem.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during audit operations.
#[derive(Debug, Error)]
pub enum AuditError {
    /// Failed to read or write a segment or state file.
    #[error("audit I/O at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to serialize or deserialize a record (malformed JSON).
    #[error("audit serialization: {0}")]
    Serialization(#[from] serde_json::Error),
}
