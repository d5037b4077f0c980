// error.rs — Error types for the policy subsystem.

use thiserror::Error;

/// Errors from loading or compiling policy documents.
///
/// Invalid individual policies are skipped with a warning rather than
/// failing the whole set; this type covers the cases where there is no
/// set to continue with.
#[derive(Debug, Error)]
pub enum PolicyError {
    /// A policy document failed to parse.
    #[error("failed to parse policy document: {0}")]
    Parse(#[from] serde_yaml::Error),
}
