// manager.rs — The trust manager.
//
// Exclusive owner of the trust store. Every mutation recomputes the score
// from the signal counters, so the stored score is always consistent with
// the weights — there is no incremental drift to accumulate.
//
// Persistence is debounced: mutations mark the store dirty, and the store
// is written when the configured cadence has elapsed (or on an explicit
// `persist()` at shutdown). The write path snapshots the store under the
// lock, releases it, then serialises and renames without holding it.

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::time::{Duration, Instant};

use chrono::Utc;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::TrustError;
use crate::model::{AgentTrust, TrustEvent, TrustEventKind, TrustSnapshot};
use crate::store::TrustStore;
use crate::tier::TrustTier;

/// Weight configuration for the score formula.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TrustWeights {
    pub age_per_day: f64,
    pub age_max: f64,
    pub success_per_action: f64,
    pub success_max: f64,
    pub violation_penalty: f64,
    pub approved_escalation_bonus: f64,
    pub denied_escalation_penalty: f64,
    pub clean_streak_per_day: f64,
    pub clean_streak_max: f64,
}

impl Default for TrustWeights {
    fn default() -> Self {
        Self {
            age_per_day: 0.5,
            age_max: 20.0,
            success_per_action: 0.1,
            success_max: 30.0,
            violation_penalty: -2.0,
            approved_escalation_bonus: 0.5,
            denied_escalation_penalty: -3.0,
            clean_streak_per_day: 0.3,
            clean_streak_max: 20.0,
        }
    }
}

/// Inactivity decay: after `inactivity_days` without evaluation, the score
/// is multiplied by `rate` once per elapsed inactive period at load time.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecaySettings {
    pub inactivity_days: i64,
    pub rate: f64,
}

/// Construction options for [`TrustManager`].
#[derive(Debug, Clone)]
pub struct TrustManagerOptions {
    pub weights: TrustWeights,
    /// Default score per agent id; `"*"` is the fallback for unknown ids.
    pub defaults: HashMap<String, i64>,
    pub persist_interval: Duration,
    pub decay: Option<DecaySettings>,
    pub max_history: usize,
}

impl Default for TrustManagerOptions {
    fn default() -> Self {
        Self {
            weights: TrustWeights::default(),
            defaults: HashMap::new(),
            persist_interval: Duration::from_secs(60),
            decay: None,
            max_history: 100,
        }
    }
}

struct ManagerState {
    store: TrustStore,
    dirty: bool,
    last_persist: Instant,
}

/// Exclusive owner of per-agent trust state.
pub struct TrustManager {
    path: PathBuf,
    options: TrustManagerOptions,
    state: Mutex<ManagerState>,
}

impl TrustManager {
    /// Create a manager over `path` with an empty in-memory store.
    /// Call [`TrustManager::load`] to pull persisted state in.
    pub fn new(path: impl Into<PathBuf>, options: TrustManagerOptions) -> Self {
        Self {
            path: path.into(),
            options,
            state: Mutex::new(ManagerState {
                store: TrustStore::empty(),
                dirty: false,
                last_persist: Instant::now(),
            }),
        }
    }

    /// Load the persisted store, applying inactivity decay to each agent.
    pub fn load(&self) -> Result<(), TrustError> {
        let mut store = TrustStore::load(&self.path)?;
        if let Some(decay) = self.options.decay {
            for (id, agent) in store.agents.iter_mut() {
                self.apply_decay(id, agent, decay);
            }
        }
        let mut state = self.state.lock();
        state.store = store;
        state.dirty = false;
        Ok(())
    }

    fn apply_decay(&self, id: &str, agent: &mut AgentTrust, decay: DecaySettings) {
        if decay.inactivity_days <= 0 {
            return;
        }
        let inactive_days = (Utc::now() - agent.last_evaluated).num_days();
        let periods = inactive_days / decay.inactivity_days;
        if periods <= 0 {
            return;
        }
        let decayed = agent.score as f64 * decay.rate.powi(periods as i32);
        let raw = raw_score(agent, &self.options.weights);
        agent.manual_adjustment += decayed - raw;
        agent.push_event(
            TrustEvent {
                timestamp: Utc::now(),
                kind: TrustEventKind::ManualAdjustment,
                delta: decayed - agent.score as f64,
                note: Some("inactivity decay".to_string()),
            },
            self.options.max_history,
        );
        recompute(agent, &self.options.weights);
        tracing::debug!(agent = id, periods, score = agent.score, "applied trust decay");
    }

    /// The default score for an agent: exact id, then `"*"`, then 50.
    pub fn default_score_for(&self, agent_id: &str) -> i64 {
        self.options
            .defaults
            .get(agent_id)
            .or_else(|| self.options.defaults.get("*"))
            .copied()
            .unwrap_or(50)
    }

    /// The stored record for an agent, or a fresh default-seeded one.
    /// Reading never mutates the store.
    pub fn agent_trust(&self, agent_id: &str) -> AgentTrust {
        let state = self.state.lock();
        state
            .store
            .agents
            .get(agent_id)
            .cloned()
            .unwrap_or_else(|| AgentTrust::new(self.default_score_for(agent_id)))
    }

    /// The score/tier pair for an evaluation context.
    pub fn snapshot(&self, agent_id: &str) -> TrustSnapshot {
        self.agent_trust(agent_id).snapshot()
    }

    /// Every stored agent record, cloned out.
    pub fn all(&self) -> BTreeMap<String, AgentTrust> {
        self.state.lock().store.agents.clone()
    }

    /// Record a successful action: success count and clean streak grow.
    pub fn record_success(&self, agent_id: &str) {
        let weights = self.options.weights.clone();
        self.mutate(agent_id, |agent, max_history| {
            agent.success_count += 1;
            agent.clean_streak_days += 1;
            agent.push_event(
                TrustEvent {
                    timestamp: Utc::now(),
                    kind: TrustEventKind::Success,
                    delta: weights.success_per_action,
                    note: None,
                },
                max_history,
            );
        });
    }

    /// Record a violation: the clean streak resets.
    pub fn record_violation(&self, agent_id: &str) {
        let weights = self.options.weights.clone();
        self.mutate(agent_id, |agent, max_history| {
            agent.violation_count += 1;
            agent.clean_streak_days = 0;
            agent.push_event(
                TrustEvent {
                    timestamp: Utc::now(),
                    kind: TrustEventKind::Violation,
                    delta: weights.violation_penalty,
                    note: None,
                },
                max_history,
            );
        });
    }

    /// Record the outcome of an escalation the agent triggered.
    pub fn record_escalation(&self, agent_id: &str, approved: bool) {
        let weights = self.options.weights.clone();
        self.mutate(agent_id, |agent, max_history| {
            let (kind, delta) = if approved {
                agent.approved_escalations += 1;
                (
                    TrustEventKind::EscalationApproved,
                    weights.approved_escalation_bonus,
                )
            } else {
                agent.denied_escalations += 1;
                (
                    TrustEventKind::EscalationDenied,
                    weights.denied_escalation_penalty,
                )
            };
            agent.push_event(
                TrustEvent {
                    timestamp: Utc::now(),
                    kind,
                    delta,
                    note: None,
                },
                max_history,
            );
        });
    }

    /// Force the score to `target` (clamped to [floor, 100]) by adjusting
    /// the manual component, so recomputation preserves it.
    pub fn set_score(&self, agent_id: &str, target: i64) {
        let weights = self.options.weights.clone();
        self.mutate(agent_id, |agent, max_history| {
            let floor = agent.floor.unwrap_or(0).max(0).min(100);
            let target = target.clamp(floor, 100);
            let raw = raw_score(agent, &weights);
            let previous = agent.score;
            agent.manual_adjustment += target as f64 - raw;
            agent.push_event(
                TrustEvent {
                    timestamp: Utc::now(),
                    kind: TrustEventKind::ManualAdjustment,
                    delta: (target - previous) as f64,
                    note: Some("operator override".to_string()),
                },
                max_history,
            );
        });
    }

    /// Pin the effective tier regardless of the derived one.
    pub fn lock_tier(&self, agent_id: &str, tier: TrustTier) {
        self.mutate(agent_id, |agent, _| {
            agent.locked_tier = Some(tier);
        });
    }

    /// Remove a tier lock; the derived tier takes over again.
    pub fn unlock_tier(&self, agent_id: &str) {
        self.mutate(agent_id, |agent, _| {
            agent.locked_tier = None;
        });
    }

    /// Set a lower bound the score can never drop below.
    pub fn set_floor(&self, agent_id: &str, floor: i64) {
        self.mutate(agent_id, |agent, _| {
            agent.floor = Some(floor.clamp(0, 100));
        });
    }

    /// Drop the event history; cumulative counters are preserved.
    pub fn reset_history(&self, agent_id: &str) {
        self.mutate(agent_id, |agent, _| {
            agent.history.clear();
        });
    }

    /// Persist now if dirty and the cadence has elapsed.
    /// Returns whether a write happened.
    pub fn maybe_persist(&self) -> Result<bool, TrustError> {
        {
            let state = self.state.lock();
            if !state.dirty || state.last_persist.elapsed() < self.options.persist_interval {
                return Ok(false);
            }
        }
        self.persist()?;
        Ok(true)
    }

    /// Persist unconditionally. Snapshots under the lock, writes outside it.
    pub fn persist(&self) -> Result<(), TrustError> {
        let snapshot = {
            let mut state = self.state.lock();
            state.store.updated = Utc::now();
            state.dirty = false;
            state.last_persist = Instant::now();
            state.store.clone()
        };
        snapshot.save(&self.path)
    }

    fn mutate<F>(&self, agent_id: &str, f: F)
    where
        F: FnOnce(&mut AgentTrust, usize),
    {
        let default_score = self.default_score_for(agent_id);
        let mut state = self.state.lock();
        let agent = state
            .store
            .agents
            .entry(agent_id.to_string())
            .or_insert_with(|| AgentTrust::new(default_score));
        f(agent, self.options.max_history);
        recompute(agent, &self.options.weights);
        state.dirty = true;
    }
}

/// The unclamped, unrounded score as the weights define it.
fn raw_score(agent: &AgentTrust, w: &TrustWeights) -> f64 {
    (agent.age_days as f64 * w.age_per_day).min(w.age_max)
        + (agent.success_count as f64 * w.success_per_action).min(w.success_max)
        + agent.violation_count as f64 * w.violation_penalty
        + agent.approved_escalations as f64 * w.approved_escalation_bonus
        + agent.denied_escalations as f64 * w.denied_escalation_penalty
        + (agent.clean_streak_days as f64 * w.clean_streak_per_day).min(w.clean_streak_max)
        + agent.manual_adjustment
}

/// Refresh age, recompute the score, clamp, and re-derive the tier.
fn recompute(agent: &mut AgentTrust, weights: &TrustWeights) {
    let now = Utc::now();
    agent.age_days = (now - agent.created_at).num_days();
    let floor = agent.floor.unwrap_or(0).max(0).min(100);
    let raw = raw_score(agent, weights);
    agent.score = (raw.round() as i64).clamp(floor, 100);
    agent.tier = TrustTier::from_score(agent.score);
    agent.last_evaluated = now;
}
