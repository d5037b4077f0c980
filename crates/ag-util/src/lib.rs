//! # ag-util
//!
//! Shared utilities for the agent governance engine: minute-of-day time
//! arithmetic with midnight-wrap semantics, timezone-aware clock snapshots,
//! glob-to-regex conversion, SHA-256 hashing for the audit chain, a
//! monotonic microsecond clock, and session-key parsing.
//!
//! Everything here is a pure function or a thin wrapper over the standard
//! clock — no I/O, no engine state.

pub mod clock;
pub mod hash;
pub mod pattern;
pub mod session;
pub mod time;

pub use clock::{now_ms, now_us};
pub use hash::{sha256_hex, sha256_hex_bytes};
pub use pattern::glob_to_regex;
pub use session::extract_agent_id;
pub use time::{
    current_time, current_time_in, in_time_range, parse_time_minutes, parse_zone,
    weekday_matches, TimeContext,
};
