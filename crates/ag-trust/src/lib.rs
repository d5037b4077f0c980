//! # ag-trust
//!
//! Per-agent trust scoring for the governance engine.
//!
//! Trust is earned slowly and lost quickly: successful actions and clean
//! days accrue small bonuses, violations and denied escalations subtract
//! larger penalties, and the resulting score is clamped to [0, 100] after
//! every mutation. The score maps onto five tiers that policy rules can
//! gate on.
//!
//! ## Key invariants
//!
//! - **Bounded score**: 0 ≤ score ≤ 100 after every mutation.
//! - **Derived tier**: `tier == TrustTier::from_score(score)` unless an
//!   operator has locked the tier.
//! - **Atomic persistence**: the store is written to a temp file and
//!   renamed over the target; a corrupt store is preserved under a
//!   `.corrupt-<ts>` suffix, never silently overwritten.

pub mod error;
pub mod manager;
pub mod model;
pub mod store;
pub mod tier;

pub use error::TrustError;
pub use manager::{DecaySettings, TrustManager, TrustManagerOptions, TrustWeights};
pub use model::{AgentTrust, TrustEvent, TrustEventKind, TrustSnapshot};
pub use store::TrustStore;
pub use tier::TrustTier;
