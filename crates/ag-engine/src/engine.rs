// engine.rs — The governance engine.
//
// Owns every subsystem and runs the per-action pipeline. The policy index
// is published behind an RwLock'd Arc: evaluation clones the pointer at
// entry and never blocks a reload; reload builds a fresh index off the hot
// path and swaps the Arc wholesale.
//
// Background work (audit flush, trust persistence, retention) runs on one
// tick thread between start() and stop(). The evaluation path itself never
// performs disk I/O.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use serde::Serialize;

use crate::config::{FailMode, GovernanceConfig};
use crate::error::EngineError;
use crate::verdict::{Action, Verdict};
use ag_audit::{
    AuditLog, AuditLogOptions, AuditQuery, AuditRecord, ChainVerification, ContextSnapshot,
    MatchedRule, RecordDraft, RiskAtDecision, TrustAtDecision,
};
use ag_policy::{
    builtin_policies, evaluate_policies, ConditionDeps, EvaluationContext, FrequencyCounter,
    FrequencyScope, HookKind, Policy, PolicyIndex, RegexCache, RiskAssessment, RiskAssessor,
    RiskLevel, TimeWindow,
};
use ag_trust::{AgentTrust, DecaySettings, TrustManager, TrustManagerOptions, TrustSnapshot};
use ag_util::{current_time_in, extract_agent_id, now_us};

/// Running counters, aggregated across every evaluation.
#[derive(Debug, Clone, Copy, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineStats {
    pub total: u64,
    pub allowed: u64,
    pub denied: u64,
    pub escalated: u64,
    pub errors: u64,
    /// Running mean evaluation cost in microseconds.
    pub mean_eval_us: f64,
}

/// The status surface handed to the host.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineStatus {
    pub enabled: bool,
    pub policy_count: usize,
    pub trust_enabled: bool,
    pub audit_enabled: bool,
    pub fail_mode: FailMode,
    pub stats: EngineStats,
}

#[derive(Default)]
struct StatsInner {
    total: u64,
    allowed: u64,
    denied: u64,
    escalated: u64,
    errors: u64,
    total_eval_us: u64,
}

struct Ticker {
    stop: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

/// The engine. One instance per host process; all methods take `&self`.
pub struct GovernanceEngine {
    pub(crate) config: GovernanceConfig,
    pub(crate) tz: chrono_tz::Tz,
    regexes: Arc<RegexCache>,
    windows: HashMap<String, TimeWindow>,
    index: RwLock<Arc<PolicyIndex>>,
    trust: Arc<TrustManager>,
    audit: Option<Arc<AuditLog>>,
    frequency: Arc<FrequencyCounter>,
    risk: RiskAssessor,
    stats: Mutex<StatsInner>,
    /// child session key → parent session key. Lookup only, never owning.
    sub_agents: Mutex<HashMap<String, String>>,
    verification: Mutex<Option<ChainVerification>>,
    ticker: Mutex<Option<Ticker>>,
}

impl GovernanceEngine {
    /// Build an engine over `{workspace}/governance/`. Call
    /// [`GovernanceEngine::start`] before the first evaluation.
    pub fn new(config: GovernanceConfig, workspace: impl AsRef<Path>) -> Self {
        let governance_dir = workspace.as_ref().join("governance");
        let tz = ag_util::parse_zone(&config.timezone);

        let regexes = Arc::new(RegexCache::new());
        let index = PolicyIndex::build(
            config.policies.clone(),
            builtin_policies(&config.builtin_policies),
            regexes.clone(),
        );

        let trust = Arc::new(TrustManager::new(
            governance_dir.join("trust.json"),
            TrustManagerOptions {
                weights: config.trust.weights.clone(),
                defaults: config.trust.defaults.clone(),
                persist_interval: Duration::from_secs(config.trust.persist_interval_seconds),
                decay: config.trust.decay.enabled.then_some(DecaySettings {
                    inactivity_days: config.trust.decay.inactivity_days,
                    rate: config.trust.decay.rate,
                }),
                max_history: config.trust.max_history_per_agent,
            },
        ));

        let audit = config.audit.enabled.then(|| {
            let mut options = AuditLogOptions::new(governance_dir.join("audit"));
            options.retention_days = config.audit.retention_days;
            options.level = config.audit.level;
            options.redact_patterns = config.audit.redact_patterns.clone();
            Arc::new(AuditLog::new(options))
        });

        let frequency = Arc::new(FrequencyCounter::new(
            config.performance.frequency_buffer_size,
        ));
        let risk = RiskAssessor::new(config.tool_risk_overrides.clone());
        let windows = config.time_windows.clone();

        Self {
            config,
            tz,
            regexes,
            windows,
            index: RwLock::new(Arc::new(index)),
            trust,
            audit,
            frequency,
            risk,
            stats: Mutex::new(StatsInner::default()),
            sub_agents: Mutex::new(HashMap::new()),
            verification: Mutex::new(None),
            ticker: Mutex::new(None),
        }
    }

    /// Load persisted state, optionally verify the audit chain, and start
    /// the background tick thread.
    pub fn start(&self) -> Result<(), EngineError> {
        if self.config.trust.enabled {
            self.trust.load()?;
        }
        if let Some(audit) = &self.audit {
            audit.load()?;
            if self.config.audit.verify_on_startup {
                let verification = audit.verify_chain()?;
                if !verification.ok {
                    tracing::error!(
                        break_at = ?verification.break_at,
                        "audit chain broken; continuing with audit read-only"
                    );
                }
                *self.verification.lock() = Some(verification);
            }
            audit.apply_retention()?;
        }
        self.frequency.clear();
        self.spawn_ticker();
        tracing::info!(
            policies = self.index.read().policy_count(),
            timezone = %self.tz.name(),
            "governance engine started"
        );
        Ok(())
    }

    /// Stop the tick thread, flush the audit buffer, persist trust.
    pub fn stop(&self) -> Result<(), EngineError> {
        if let Some(ticker) = self.ticker.lock().take() {
            ticker.stop.store(true, Ordering::Relaxed);
            ticker.handle.thread().unpark();
            let _ = ticker.handle.join();
        }
        if let Some(audit) = &self.audit {
            audit.flush()?;
        }
        if self.config.trust.enabled {
            self.trust.persist()?;
        }
        tracing::info!("governance engine stopped");
        Ok(())
    }

    /// Evaluate one action. Never fails: any internal error produces the
    /// fail-mode verdict and an `error_fallback` audit record.
    pub fn evaluate(&self, ctx: EvaluationContext) -> Verdict {
        if !self.config.enabled {
            return Verdict {
                action: Action::Allow,
                reason: "Governance disabled".to_string(),
                risk: zero_risk(),
                matched_policies: Vec::new(),
                trust: ctx.trust,
                evaluation_us: 0,
            };
        }
        let started = now_us();
        match self.try_evaluate(ctx.clone(), started) {
            Ok(verdict) => {
                self.note_result(&verdict.action, verdict.evaluation_us, false);
                verdict
            }
            Err(err) => {
                let verdict = self.fallback_verdict(&ctx, started, &err);
                self.note_result(&verdict.action, verdict.evaluation_us, true);
                verdict
            }
        }
    }

    fn try_evaluate(
        &self,
        mut ctx: EvaluationContext,
        started: u64,
    ) -> Result<Verdict, EngineError> {
        // (1) Sub-agent contexts inherit the parent's identity and trust,
        // so agent-scoped policies follow the spawning agent.
        let parent = self.sub_agents.lock().get(&ctx.session_key).cloned();
        if let Some(parent_session) = parent {
            let inherited = extract_agent_id(&parent_session, &ctx.agent_id);
            if inherited != ctx.agent_id {
                tracing::debug!(
                    child = %ctx.agent_id,
                    parent = %inherited,
                    "sub-agent inherits parent identity"
                );
                ctx.agent_id = inherited;
                ctx.trust = self.trust.snapshot(&ctx.agent_id);
            }
        }

        // (2) Record before assessing, so a burst counts itself.
        let activity = ctx
            .tool_name
            .clone()
            .unwrap_or_else(|| ctx.hook.as_str().to_string());
        self.frequency
            .record(&ctx.agent_id, &ctx.session_key, &activity);

        // (3)
        let recent = self.frequency.count(
            60,
            FrequencyScope::Session,
            &ctx.agent_id,
            &ctx.session_key,
        );
        let risk = self.risk.assess(&ctx, recent);

        // (4, 5) Copy the index pointer at entry; a concurrent reload
        // never changes the set mid-evaluation.
        let index = self.index.read().clone();
        let deps = ConditionDeps {
            regexes: &self.regexes,
            windows: &self.windows,
            frequency: &self.frequency,
            risk: &risk,
        };
        let outcome = evaluate_policies(&ctx, &index, &deps);

        // (6)
        let elapsed = now_us().saturating_sub(started);
        if elapsed > self.config.performance.max_eval_us {
            tracing::warn!(
                elapsed_us = elapsed,
                budget_us = self.config.performance.max_eval_us,
                "evaluation exceeded its budget"
            );
        }
        let verdict =
            Verdict::from_decision(outcome.decision, risk, outcome.matched, ctx.trust, elapsed);

        // (7)
        self.emit_audit(&ctx, &verdict, verdict.action.kind());
        Ok(verdict)
    }

    fn fallback_verdict(
        &self,
        ctx: &EvaluationContext,
        started: u64,
        err: &EngineError,
    ) -> Verdict {
        tracing::error!(%err, fail_mode = self.config.fail_mode.as_str(), "evaluation failed");
        let (action, reason) = match self.config.fail_mode {
            FailMode::Open => (
                Action::Allow,
                format!("Governance error, failing open: {}", err),
            ),
            FailMode::Closed => (
                Action::Deny,
                format!("Governance error, failing closed: {}", err),
            ),
        };
        let verdict = Verdict {
            action,
            reason,
            risk: zero_risk(),
            matched_policies: Vec::new(),
            trust: ctx.trust,
            evaluation_us: now_us().saturating_sub(started),
        };
        self.emit_audit(ctx, &verdict, "error_fallback");
        verdict
    }

    /// Buffer an audit record. Write failures are transient by contract —
    /// records stay buffered for the next flush cycle — so nothing here
    /// can fail the verdict.
    fn emit_audit(&self, ctx: &EvaluationContext, verdict: &Verdict, verdict_kind: &str) {
        let Some(audit) = &self.audit else {
            return;
        };
        let draft = RecordDraft {
            verdict: verdict_kind.to_string(),
            hook: ctx.hook.as_str().to_string(),
            agent_id: ctx.agent_id.clone(),
            tool_name: ctx.tool_name.clone(),
            context: ContextSnapshot {
                hook: ctx.hook.as_str().to_string(),
                agent_id: ctx.agent_id.clone(),
                session_key: ctx.session_key.clone(),
                channel: ctx.channel.clone(),
                tool_name: ctx.tool_name.clone(),
                tool_params: ctx.tool_params.clone(),
                message_content: ctx.message_content.clone(),
                message_target: ctx.message_target.clone(),
                metadata: ctx.metadata.clone(),
            },
            trust: TrustAtDecision {
                score: verdict.trust.score,
                tier: verdict.trust.tier.to_string(),
            },
            risk: RiskAtDecision {
                level: verdict.risk.level.to_string(),
                score: verdict.risk.score,
                factors: verdict.risk.factors.clone(),
            },
            matched: verdict
                .matched_policies
                .iter()
                .map(|m| MatchedRule {
                    policy_id: m.policy_id.clone(),
                    rule_id: m.rule_id.clone(),
                    effect: m.effect.clone(),
                })
                .collect(),
            eval_us: verdict.evaluation_us,
            llm_consulted: false,
            controls: Vec::new(),
        };
        if let Err(err) = audit.record(draft) {
            tracing::warn!(%err, "audit record not persisted; will retry at next flush");
        }
    }

    /// Report a completed action so trust can move with the outcome.
    pub fn record_outcome(&self, agent_id: &str, tool_name: &str, success: bool) {
        if !self.config.trust.enabled {
            return;
        }
        if success {
            self.trust.record_success(agent_id);
        } else {
            self.trust.record_violation(agent_id);
        }
        tracing::debug!(agent = agent_id, tool = tool_name, success, "outcome recorded");
    }

    /// Report the outcome of an escalation verdict.
    pub fn record_escalation_outcome(&self, agent_id: &str, approved: bool) {
        if self.config.trust.enabled {
            self.trust.record_escalation(agent_id, approved);
        }
    }

    /// Register a parent/child session relationship for trust inheritance.
    pub fn register_sub_agent(&self, parent_session_key: &str, child_session_key: &str) {
        self.sub_agents.lock().insert(
            child_session_key.to_string(),
            parent_session_key.to_string(),
        );
    }

    /// Replace the policy set wholesale. The new index is built off the
    /// hot path and published with one pointer swap.
    pub fn reload_policies(&self, policies: Vec<Policy>) {
        let index = PolicyIndex::build(
            policies,
            builtin_policies(&self.config.builtin_policies),
            self.regexes.clone(),
        );
        let count = index.policy_count();
        *self.index.write() = Arc::new(index);
        tracing::info!(policies = count, "policy index reloaded");
    }

    pub fn status(&self) -> EngineStatus {
        EngineStatus {
            enabled: self.config.enabled,
            policy_count: self.index.read().policy_count(),
            trust_enabled: self.config.trust.enabled,
            audit_enabled: self.audit.is_some(),
            fail_mode: self.config.fail_mode,
            stats: self.stats(),
        }
    }

    pub fn stats(&self) -> EngineStats {
        let inner = self.stats.lock();
        EngineStats {
            total: inner.total,
            allowed: inner.allowed,
            denied: inner.denied,
            escalated: inner.escalated,
            errors: inner.errors,
            mean_eval_us: if inner.total == 0 {
                0.0
            } else {
                inner.total_eval_us as f64 / inner.total as f64
            },
        }
    }

    /// One agent's trust record (stored or default-seeded).
    pub fn agent_trust(&self, agent_id: &str) -> AgentTrust {
        self.trust.agent_trust(agent_id)
    }

    /// The score/tier pair for an agent.
    pub fn trust_snapshot(&self, agent_id: &str) -> TrustSnapshot {
        self.trust.snapshot(agent_id)
    }

    /// Every stored trust record.
    pub fn all_trust(&self) -> BTreeMap<String, AgentTrust> {
        self.trust.all()
    }

    /// Clamped operator override of an agent's score.
    pub fn set_trust(&self, agent_id: &str, score: i64) {
        self.trust.set_score(agent_id, score);
    }

    /// The startup verification result, when verification ran.
    pub fn audit_verification(&self) -> Option<ChainVerification> {
        self.verification.lock().clone()
    }

    /// Whether the audit log refuses appends after a chain break.
    pub fn audit_read_only(&self) -> bool {
        self.audit.as_ref().is_some_and(|audit| audit.is_read_only())
    }

    /// Scan the audit segments. See [`AuditQuery`].
    pub fn audit_query(&self, query: &AuditQuery) -> Result<Vec<AuditRecord>, EngineError> {
        match &self.audit {
            Some(audit) => Ok(audit.query(query)?),
            None => Ok(Vec::new()),
        }
    }

    /// Fresh context for a hook dispatch: clock snapshot in the configured
    /// zone plus the agent's current trust.
    pub fn make_context(
        &self,
        hook: HookKind,
        agent_id: &str,
        session_key: &str,
    ) -> EvaluationContext {
        EvaluationContext::new(
            hook,
            agent_id,
            session_key,
            current_time_in(self.tz),
            self.trust.snapshot(agent_id),
        )
    }

    /// Keep only the newest lines within the configured context cap.
    pub(crate) fn clip_history(&self, history: Vec<String>) -> Vec<String> {
        let cap = self.config.performance.max_context_messages;
        if history.len() > cap {
            history[history.len() - cap..].to_vec()
        } else {
            history
        }
    }

    fn note_result(&self, action: &Action, eval_us: u64, was_error: bool) {
        let mut stats = self.stats.lock();
        stats.total += 1;
        stats.total_eval_us += eval_us;
        if was_error {
            stats.errors += 1;
        }
        match action {
            Action::Allow => stats.allowed += 1,
            Action::Deny => stats.denied += 1,
            Action::Escalate { .. } => stats.escalated += 1,
        }
    }

    fn spawn_ticker(&self) {
        let mut slot = self.ticker.lock();
        if slot.is_some() {
            return;
        }
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = stop.clone();
        let audit = self.audit.clone();
        let trust = self.trust.clone();
        let trust_enabled = self.config.trust.enabled;
        let handle = std::thread::spawn(move || loop {
            std::thread::park_timeout(Duration::from_millis(250));
            if stop_flag.load(Ordering::Relaxed) {
                break;
            }
            if let Some(audit) = &audit {
                if let Err(err) = audit.maybe_flush() {
                    tracing::warn!(%err, "scheduled audit flush failed; will retry");
                }
                if let Err(err) = audit.maybe_apply_retention() {
                    tracing::warn!(%err, "audit retention sweep failed");
                }
            }
            if trust_enabled {
                if let Err(err) = trust.maybe_persist() {
                    tracing::warn!(%err, "scheduled trust persistence failed; will retry");
                }
            }
        });
        *slot = Some(Ticker { stop, handle });
    }
}

fn zero_risk() -> RiskAssessment {
    RiskAssessment {
        score: 0,
        level: RiskLevel::Low,
        factors: BTreeMap::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ag_policy::{policies_from_yaml, HookKind};
    use ag_trust::TrustTier;
    use tempfile::tempdir;

    fn no_shell_policies() -> Vec<Policy> {
        policies_from_yaml(
            r#"
- id: no-shell
  rules:
    - id: deny-exec
      conditions:
        - type: tool
          name: exec
      effect:
        action: deny
        reason: "no shell"
"#,
        )
        .unwrap()
    }

    fn engine_in(dir: &Path, mutate: impl FnOnce(&mut GovernanceConfig)) -> GovernanceEngine {
        let mut config = GovernanceConfig::default();
        mutate(&mut config);
        GovernanceEngine::new(config, dir)
    }

    fn exec_ctx(engine: &GovernanceEngine, agent: &str) -> EvaluationContext {
        engine
            .make_context(
                HookKind::BeforeToolCall,
                agent,
                &format!("agent:{}:sess-1", agent),
            )
            .with_tool("exec", Default::default())
    }

    #[test]
    fn allows_when_nothing_matches() {
        let dir = tempdir().unwrap();
        let engine = engine_in(dir.path(), |_| {});
        engine.start().unwrap();

        let verdict = engine.evaluate(exec_ctx(&engine, "main"));
        assert!(verdict.is_allowed());
        assert_eq!(verdict.reason, "No matching policies");

        let stats = engine.stats();
        assert_eq!(stats.total, 1);
        assert_eq!(stats.allowed, 1);
        assert_eq!(stats.denied, 0);
        engine.stop().unwrap();
    }

    #[test]
    fn disabled_engine_short_circuits() {
        let dir = tempdir().unwrap();
        let engine = engine_in(dir.path(), |c| {
            c.enabled = false;
            c.policies = no_shell_policies();
        });
        let verdict = engine.evaluate(exec_ctx(&engine, "main"));
        assert!(verdict.is_allowed());
        assert_eq!(verdict.reason, "Governance disabled");
        assert_eq!(engine.stats().total, 0);
    }

    #[test]
    fn deny_policy_denies_and_audits() {
        let dir = tempdir().unwrap();
        let engine = engine_in(dir.path(), |c| {
            c.policies = no_shell_policies();
        });
        engine.start().unwrap();

        let verdict = engine.evaluate(exec_ctx(&engine, "main"));
        assert_eq!(verdict.action, Action::Deny);
        assert_eq!(verdict.reason, "no shell");
        assert_eq!(verdict.matched_policies[0].policy_id, "no-shell");
        engine.stop().unwrap();

        let records = engine.audit_query(&AuditQuery::default()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].verdict, "deny");
        assert_eq!(records[0].seq, 1);
        assert_eq!(records[0].matched[0].policy_id, "no-shell");
    }

    #[test]
    fn record_outcome_moves_trust() {
        let dir = tempdir().unwrap();
        let engine = engine_in(dir.path(), |_| {});
        engine.start().unwrap();

        let before = engine.trust_snapshot("main").score;
        for _ in 0..10 {
            engine.record_outcome("main", "exec", true);
        }
        assert!(engine.trust_snapshot("main").score > before);

        engine.record_outcome("main", "exec", false);
        let after = engine.agent_trust("main");
        assert_eq!(after.violation_count, 1);
        assert_eq!(after.clean_streak_days, 0);
        engine.stop().unwrap();
    }

    #[test]
    fn sub_agent_inherits_parent_identity() {
        let dir = tempdir().unwrap();
        let mut policies = no_shell_policies();
        policies[0].scope.agents = vec!["main".to_string()];
        let engine = engine_in(dir.path(), |c| {
            c.policies = policies;
        });
        engine.start().unwrap();

        engine.register_sub_agent("agent:main:sess-1", "agent:child:sess-9");

        // The child's own id would not match the main-scoped policy; the
        // inherited identity does.
        let ctx = engine
            .make_context(HookKind::BeforeToolCall, "child", "agent:child:sess-9")
            .with_tool("exec", Default::default());
        let verdict = engine.evaluate(ctx);
        assert_eq!(verdict.action, Action::Deny);
        engine.stop().unwrap();
    }

    #[test]
    fn reload_swaps_the_policy_set_wholesale() {
        let dir = tempdir().unwrap();
        let engine = engine_in(dir.path(), |_| {});
        engine.start().unwrap();

        assert!(engine.evaluate(exec_ctx(&engine, "main")).is_allowed());
        assert_eq!(engine.status().policy_count, 0);

        engine.reload_policies(no_shell_policies());
        assert_eq!(engine.status().policy_count, 1);
        assert_eq!(
            engine.evaluate(exec_ctx(&engine, "main")).action,
            Action::Deny
        );
        engine.stop().unwrap();
    }

    #[test]
    fn fallback_verdict_follows_fail_mode() {
        let dir = tempdir().unwrap();
        let err = EngineError::Config(serde_yaml::from_str::<GovernanceConfig>("a: [").unwrap_err());

        let open = engine_in(dir.path(), |c| c.audit.enabled = false);
        let ctx = exec_ctx(&open, "main");
        let verdict = open.fallback_verdict(&ctx, now_us(), &err);
        assert_eq!(verdict.action, Action::Allow);
        assert!(verdict.reason.contains("failing open"));

        let closed = engine_in(dir.path(), |c| {
            c.fail_mode = FailMode::Closed;
            c.audit.enabled = false;
        });
        let verdict = closed.fallback_verdict(&ctx, now_us(), &err);
        assert_eq!(verdict.action, Action::Deny);
        assert!(verdict.reason.contains("failing closed"));
    }

    #[test]
    fn status_reflects_configuration() {
        let dir = tempdir().unwrap();
        let engine = engine_in(dir.path(), |c| {
            c.policies = no_shell_policies();
            c.builtin_policies.credential_guard = true;
            c.fail_mode = FailMode::Closed;
        });
        let status = engine.status();
        assert!(status.enabled);
        assert_eq!(status.policy_count, 2);
        assert!(status.trust_enabled);
        assert!(status.audit_enabled);
        assert_eq!(status.fail_mode, FailMode::Closed);
    }

    #[test]
    fn set_trust_is_clamped_override() {
        let dir = tempdir().unwrap();
        let engine = engine_in(dir.path(), |_| {});
        engine.set_trust("main", 250);
        assert_eq!(engine.trust_snapshot("main").score, 100);
        assert_eq!(engine.trust_snapshot("main").tier, TrustTier::Privileged);
    }

    #[test]
    fn trust_survives_stop_start_cycle() {
        let dir = tempdir().unwrap();
        {
            let engine = engine_in(dir.path(), |_| {});
            engine.start().unwrap();
            engine.record_outcome("main", "exec", true);
            engine.stop().unwrap();
        }
        {
            let engine = engine_in(dir.path(), |_| {});
            engine.start().unwrap();
            assert_eq!(engine.agent_trust("main").success_count, 1);
            engine.stop().unwrap();
        }
    }

    #[test]
    fn history_is_clipped_to_the_configured_cap() {
        let dir = tempdir().unwrap();
        let engine = engine_in(dir.path(), |c| {
            c.performance.max_context_messages = 3;
        });
        let clipped = engine.clip_history((0..10).map(|i| format!("line {}", i)).collect());
        assert_eq!(clipped, vec!["line 7", "line 8", "line 9"]);
    }
}
