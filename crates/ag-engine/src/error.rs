// error.rs — Error types for the engine crate.

use thiserror::Error;

/// Errors surfaced by engine lifecycle and configuration entry points.
///
/// The evaluation path itself never returns these to the host — it
/// converts them into the fail-mode verdict.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Trust(#[from] ag_trust::TrustError),

    #[error(transparent)]
    Audit(#[from] ag_audit::AuditError),

    #[error("failed to parse engine configuration: {0}")]
    Config(#[from] serde_yaml::Error),
}
