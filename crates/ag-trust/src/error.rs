// error.rs — Error types for the trust subsystem.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while loading or persisting trust state.
#[derive(Debug, Error)]
pub enum TrustError {
    /// Failed to read or write the trust store file.
    #[error("trust store I/O at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to serialize the trust store.
    #[error("trust store serialization: {0}")]
    Serialization(#[from] serde_json::Error),
}
