//! # ag-engine
//!
//! The governance engine orchestrator. Owns every subsystem — policy
//! index, condition dependencies, trust manager, risk assessor, frequency
//! counter, audit log — and wires them into the per-action pipeline:
//!
//! 1. cross-agent context enrichment (sub-agents inherit the parent's
//!    agent id and trust)
//! 2. frequency record
//! 3. risk assessment
//! 4. policy resolution and evaluation (deny-wins)
//! 5. verdict assembly
//! 6. audit record emission
//!
//! Any error on that path degrades to the configured fail mode (open ⇒
//! allow, closed ⇒ deny) with an `error_fallback` audit record — the
//! engine answers every call.
//!
//! The hot path is synchronous and never touches the disk; flushing and
//! persistence run on a background tick thread owned by
//! [`GovernanceEngine::start`]/[`GovernanceEngine::stop`].

pub mod config;
pub mod engine;
pub mod error;
pub mod hooks;
pub mod verdict;

pub use config::{
    AuditConfig, DecayConfig, FailMode, GovernanceConfig, PerformanceConfig, TrustConfig,
};
pub use engine::{EngineStats, EngineStatus, GovernanceEngine};
pub use error::EngineError;
pub use hooks::{
    AgentStartEvent, HostDecision, MessageEvent, SessionStartEvent, ToolCallEvent,
};
pub use verdict::{Action, Verdict};
