// eval.rs — The policy evaluator.
//
// Resolves the effective policy set for a context, orders it, collects at
// most one rule contribution per policy, and aggregates under deny-wins:
// any deny denies, else any escalate escalates, else allow. Audit-effect
// contributions are observational — they appear in the matched list but
// never change the action.

use crate::compile::PolicyIndex;
use crate::condition::{eval_conditions, ConditionDeps};
use crate::context::EvaluationContext;
use crate::model::{Effect, EscalationFallback, Policy, Rule};
use serde::{Deserialize, Serialize};

/// Reason used when no policy matched at all.
pub const NO_MATCH_REASON: &str = "No matching policies";
/// Reason used when at least one policy matched and none denied.
pub const ALLOW_REASON: &str = "Allowed by governance policy";
/// Reason used when a deny rule carries an empty reason string.
pub const DEFAULT_DENY_REASON: &str = "Denied by governance policy";

/// One (policy, rule, effect) contribution, as recorded in audit lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleMatch {
    pub policy_id: String,
    pub rule_id: String,
    pub effect: String,
}

/// The aggregated disposition of one evaluation.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    Allow { reason: String },
    Deny { reason: String },
    Escalate {
        target: String,
        timeout_ms: u64,
        fallback: EscalationFallback,
        reason: String,
    },
}

impl Decision {
    pub fn kind(&self) -> &'static str {
        match self {
            Decision::Allow { .. } => "allow",
            Decision::Deny { .. } => "deny",
            Decision::Escalate { .. } => "escalate",
        }
    }

    pub fn reason(&self) -> &str {
        match self {
            Decision::Allow { reason }
            | Decision::Deny { reason }
            | Decision::Escalate { reason, .. } => reason,
        }
    }
}

/// The evaluator's result: the decision plus every rule that matched.
#[derive(Debug, Clone)]
pub struct EvaluationOutcome {
    pub decision: Decision,
    pub matched: Vec<RuleMatch>,
}

/// Evaluate a context against a compiled index.
///
/// Deterministic given identical (context, index, deps) inputs.
pub fn evaluate_policies(
    ctx: &EvaluationContext,
    index: &PolicyIndex,
    deps: &ConditionDeps<'_>,
) -> EvaluationOutcome {
    // Effective set: indexed candidates filtered by scope, then ordered by
    // priority (desc), specificity (desc), declaration order (asc).
    let mut effective: Vec<(usize, std::sync::Arc<Policy>)> = index
        .candidates(ctx.hook, &ctx.agent_id)
        .into_iter()
        .filter(|(_, policy)| {
            policy.enabled
                && policy
                    .scope
                    .admits(ctx.hook, &ctx.agent_id, ctx.channel.as_deref())
        })
        .collect();
    effective.sort_by(|(order_a, a), (order_b, b)| {
        b.priority
            .cmp(&a.priority)
            .then_with(|| b.scope.specificity().cmp(&a.scope.specificity()))
            .then_with(|| order_a.cmp(order_b))
    });

    // One contribution per policy: the first rule whose gates and
    // conditions hold.
    let mut matched: Vec<RuleMatch> = Vec::new();
    let mut contributions: Vec<(String, Effect)> = Vec::new();
    for (_, policy) in &effective {
        if let Some(rule) = first_matching_rule(policy, ctx, deps) {
            matched.push(RuleMatch {
                policy_id: policy.id.clone(),
                rule_id: rule.id.clone(),
                effect: rule.effect.kind().to_string(),
            });
            contributions.push((policy.id.clone(), rule.effect.clone()));
        }
    }

    let decision = aggregate(&contributions);
    EvaluationOutcome { decision, matched }
}

fn first_matching_rule<'p>(
    policy: &'p Policy,
    ctx: &EvaluationContext,
    deps: &ConditionDeps<'_>,
) -> Option<&'p Rule> {
    policy.rules.iter().find(|rule| {
        if rule
            .min_trust
            .is_some_and(|min| ctx.trust.tier < min)
        {
            return false;
        }
        if rule
            .max_trust
            .is_some_and(|max| ctx.trust.tier > max)
        {
            return false;
        }
        eval_conditions(&rule.conditions, ctx, deps)
    })
}

/// Deny-wins aggregation over contributions in priority order.
fn aggregate(contributions: &[(String, Effect)]) -> Decision {
    for (_, effect) in contributions {
        if let Effect::Deny { reason } = effect {
            let reason = if reason.is_empty() {
                DEFAULT_DENY_REASON.to_string()
            } else {
                reason.clone()
            };
            return Decision::Deny { reason };
        }
    }
    for (policy_id, effect) in contributions {
        if let Effect::Escalate {
            target,
            timeout_ms,
            fallback,
        } = effect
        {
            return Decision::Escalate {
                target: target.clone(),
                timeout_ms: *timeout_ms,
                fallback: *fallback,
                reason: format!("Escalation to {} required by policy {}", target, policy_id),
            };
        }
    }
    if contributions.is_empty() {
        Decision::Allow {
            reason: NO_MATCH_REASON.to_string(),
        }
    } else {
        Decision::Allow {
            reason: ALLOW_REASON.to_string(),
        }
    }
}
