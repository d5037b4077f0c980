// record.rs — Audit record data model.
//
// One record per verdict, one line per record. The hash covers the fields
// that order and attribute the record (sequence, wall-clock, verdict,
// agent, hook, tool, previous hash) joined with a literal `|`; a record's
// hash is recomputable from its contents alone, which is what startup
// verification does.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::redact::ContextSnapshot;
use ag_util::sha256_hex;

/// `prev_hash` of the first record in a chain.
pub const GENESIS_HASH: &str = "0000000000000000000000000000000000000000000000000000000000000000";

/// Trust at decision time, as recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrustAtDecision {
    pub score: i64,
    pub tier: String,
}

/// Risk at decision time, as recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAtDecision {
    pub level: String,
    pub score: u8,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub factors: BTreeMap<String, f64>,
}

/// One (policy, rule, effect) tuple that matched during evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchedRule {
    pub policy_id: String,
    pub rule_id: String,
    pub effect: String,
}

/// A single audit record — one line in a JSONL segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    /// Dense, strictly increasing sequence number; 1 is the first record.
    pub seq: u64,
    pub id: Uuid,
    /// Hash of the previous record; [`GENESIS_HASH`] at sequence 1.
    pub prev_hash: String,
    /// This record's own hash. See [`AuditRecord::compute_hash`].
    pub hash: String,

    /// Wall-clock milliseconds since the Unix epoch.
    pub ts_ms: i64,
    /// The same instant, RFC 3339, for human readers.
    pub iso_time: String,

    /// Final verdict kind: allow, deny, escalate, or error_fallback.
    pub verdict: String,
    pub hook: String,
    pub agent_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,

    /// Redacted context snapshot.
    pub context: ContextSnapshot,
    pub trust: TrustAtDecision,
    pub risk: RiskAtDecision,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub matched: Vec<MatchedRule>,

    /// Evaluation cost in microseconds.
    pub eval_us: u64,
    /// Whether an LLM extension was consulted for this verdict.
    pub llm_consulted: bool,
    /// Compliance control identifiers attached at emission time.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub controls: Vec<String>,
}

impl AuditRecord {
    /// Recompute this record's hash from its contents.
    pub fn compute_hash(&self) -> String {
        record_hash(
            self.seq,
            self.ts_ms,
            &self.verdict,
            &self.agent_id,
            &self.hook,
            self.tool_name.as_deref().unwrap_or(""),
            &self.prev_hash,
        )
    }
}

/// The canonical hash input: fields joined with a literal `|`.
pub fn record_hash(
    seq: u64,
    ts_ms: i64,
    verdict: &str,
    agent_id: &str,
    hook: &str,
    tool_name: &str,
    prev_hash: &str,
) -> String {
    sha256_hex(&format!(
        "{}|{}|{}|{}|{}|{}|{}",
        seq, ts_ms, verdict, agent_id, hook, tool_name, prev_hash
    ))
}
