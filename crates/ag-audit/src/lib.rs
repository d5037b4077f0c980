//! # ag-audit
//!
//! Tamper-evident audit trail for the governance engine.
//!
//! Every verdict becomes one line of compact JSON in a per-UTC-date
//! segment file. Records are hash-chained: each carries the previous
//! record's hash, so inserting, deleting, or editing a line breaks the
//! chain and is caught by startup verification. A sidecar chain-state
//! file persists the head so the chain continues across restarts.
//!
//! Context snapshots are redacted before they ever reach a buffer:
//! credential-shaped parameter keys are blanked, long message bodies are
//! truncated, and operator-supplied patterns are scrubbed from every
//! string leaf.
//!
//! ## Key invariants
//!
//! - Sequence numbers are dense and strictly increasing; they are
//!   assigned at record time under the log mutex, not at flush time.
//! - `prev_hash` of record n+1 equals `hash` of record n; the first
//!   record chains from the all-zero sentinel.
//! - A detected chain break switches the log read-only; nothing is
//!   appended (and nothing deleted) until an operator intervenes.

pub mod chain;
pub mod error;
pub mod log;
pub mod record;
pub mod redact;

pub use chain::ChainHead;
pub use error::AuditError;
pub use log::{AuditLevel, AuditLog, AuditLogOptions, AuditQuery, ChainVerification, RecordDraft};
pub use record::{AuditRecord, MatchedRule, RiskAtDecision, TrustAtDecision, GENESIS_HASH};
pub use redact::{ContextSnapshot, Redactor, REDACTED, TRUNCATION_MARKER};
