// model.rs — Per-agent trust records.
//
// An AgentTrust carries the countable evidence (successes, violations,
// escalation outcomes, age, clean streak, manual adjustment) the score is
// derived from, plus a ring-limited history of recent events. The score
// itself is recomputed from the signals on every mutation; the stored value
// is a cache of that computation, kept in [0, 100].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::tier::TrustTier;

/// What kind of trust event an agent accrued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrustEventKind {
    Success,
    Violation,
    EscalationApproved,
    EscalationDenied,
    ManualAdjustment,
}

/// One entry in an agent's trust history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrustEvent {
    pub timestamp: DateTime<Utc>,
    pub kind: TrustEventKind,
    /// Raw-score delta this event contributed (before clamping).
    pub delta: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// A minimal copy of an agent's trust handed to evaluation contexts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustSnapshot {
    pub score: i64,
    pub tier: TrustTier,
}

/// The full per-agent trust record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentTrust {
    /// Derived score, always within [0, 100].
    pub score: i64,
    /// Derived tier; overridden by `locked_tier` when set.
    pub tier: TrustTier,

    pub success_count: u64,
    pub violation_count: u64,
    pub approved_escalations: u64,
    pub denied_escalations: u64,
    /// Whole days since the record was created; refreshed at recompute time.
    pub age_days: i64,
    pub clean_streak_days: i64,
    /// Operator- and baseline-contributed offset, in raw score units.
    pub manual_adjustment: f64,

    /// Recent events, oldest dropped once the configured cap is reached.
    #[serde(default)]
    pub history: Vec<TrustEvent>,

    pub created_at: DateTime<Utc>,
    pub last_evaluated: DateTime<Utc>,

    /// When set, overrides the derived tier until unlocked.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locked_tier: Option<TrustTier>,
    /// When set, the score never drops below this bound.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub floor: Option<i64>,
}

impl AgentTrust {
    /// A fresh record seeded with a default score.
    ///
    /// The default is carried in `manual_adjustment` so recomputation from
    /// zeroed signals reproduces it instead of collapsing to zero.
    pub fn new(default_score: i64) -> Self {
        let score = default_score.clamp(0, 100);
        let now = Utc::now();
        Self {
            score,
            tier: TrustTier::from_score(score),
            success_count: 0,
            violation_count: 0,
            approved_escalations: 0,
            denied_escalations: 0,
            age_days: 0,
            clean_streak_days: 0,
            manual_adjustment: score as f64,
            history: Vec::new(),
            created_at: now,
            last_evaluated: now,
            locked_tier: None,
            floor: None,
        }
    }

    /// The tier rules see: locked when locked, derived otherwise.
    pub fn effective_tier(&self) -> TrustTier {
        self.locked_tier.unwrap_or(self.tier)
    }

    /// Copy out the score/tier pair for an evaluation context.
    pub fn snapshot(&self) -> TrustSnapshot {
        TrustSnapshot {
            score: self.score,
            tier: self.effective_tier(),
        }
    }

    /// Append an event, dropping the oldest beyond `max_history`.
    pub fn push_event(&mut self, event: TrustEvent, max_history: usize) {
        self.history.push(event);
        if self.history.len() > max_history {
            let excess = self.history.len() - max_history;
            self.history.drain(..excess);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_record_derives_tier_from_default() {
        let t = AgentTrust::new(50);
        assert_eq!(t.score, 50);
        assert_eq!(t.tier, TrustTier::Standard);
        assert_eq!(t.manual_adjustment, 50.0);
    }

    #[test]
    fn default_score_is_clamped() {
        assert_eq!(AgentTrust::new(250).score, 100);
        assert_eq!(AgentTrust::new(-3).score, 0);
    }

    #[test]
    fn locked_tier_overrides_derived() {
        let mut t = AgentTrust::new(90);
        assert_eq!(t.effective_tier(), TrustTier::Privileged);
        t.locked_tier = Some(TrustTier::Restricted);
        assert_eq!(t.effective_tier(), TrustTier::Restricted);
        assert_eq!(t.snapshot().tier, TrustTier::Restricted);
    }

    #[test]
    fn history_is_ring_limited() {
        let mut t = AgentTrust::new(50);
        for i in 0..10 {
            t.push_event(
                TrustEvent {
                    timestamp: Utc::now(),
                    kind: TrustEventKind::Success,
                    delta: i as f64,
                    note: None,
                },
                4,
            );
        }
        assert_eq!(t.history.len(), 4);
        // Oldest entries were dropped.
        assert_eq!(t.history[0].delta, 6.0);
    }

    #[test]
    fn serialization_round_trip() {
        let t = AgentTrust::new(72);
        let json = serde_json::to_string(&t).unwrap();
        let restored: AgentTrust = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.score, 72);
        assert_eq!(restored.tier, TrustTier::Trusted);
        assert!(restored.locked_tier.is_none());
    }
}
