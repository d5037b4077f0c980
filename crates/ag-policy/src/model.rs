// model.rs — The declarative policy model.
//
// Policies are data, not code: an ordered list of rules, each a set of
// AND-combined conditions plus an effect. The first rule in a policy whose
// conditions hold (and whose trust gates permit) is that policy's
// contribution; aggregation across policies happens in the evaluator.
//
// The serde shape matches the host's declarative documents (camelCase
// keys), so a policy file can be written by hand in YAML or JSON.

use serde::{Deserialize, Serialize};

use crate::condition::Condition;
use crate::context::HookKind;
use crate::error::PolicyError;
use ag_trust::TrustTier;

/// A named time window, referenced by time conditions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeWindow {
    /// "HH:MM" inclusive start.
    pub after: String,
    /// "HH:MM" exclusive end; before < after wraps past midnight.
    pub before: String,
    /// Day-of-week restriction; empty means every day.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub days: Vec<String>,
}

/// What to do when an escalation times out unanswered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EscalationFallback {
    Allow,
    #[default]
    Deny,
}

/// The effect a matching rule contributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Effect {
    /// Permit the action.
    Allow,
    /// Block the action; the reason is surfaced to the host verbatim.
    Deny {
        #[serde(default)]
        reason: String,
    },
    /// Hand the decision to a named external target.
    #[serde(rename_all = "camelCase")]
    Escalate {
        target: String,
        #[serde(default = "default_escalation_timeout_ms")]
        timeout_ms: u64,
        #[serde(default)]
        fallback: EscalationFallback,
    },
    /// Record the match at a named verbosity; never blocks.
    Audit {
        #[serde(default = "default_audit_verbosity")]
        level: String,
    },
}

impl Effect {
    /// The effect kind as it appears in matched-rule lists and audit lines.
    pub fn kind(&self) -> &'static str {
        match self {
            Effect::Allow => "allow",
            Effect::Deny { .. } => "deny",
            Effect::Escalate { .. } => "escalate",
            Effect::Audit { .. } => "audit",
        }
    }
}

fn default_escalation_timeout_ms() -> u64 {
    120_000
}

fn default_audit_verbosity() -> String {
    "standard".to_string()
}

/// One rule: AND-combined conditions, optional trust-tier gates, an effect.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    pub id: String,
    /// All conditions must hold; an empty list always holds.
    #[serde(default)]
    pub conditions: Vec<Condition>,
    pub effect: Effect,
    /// The rule only applies at this tier or above.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_trust: Option<TrustTier>,
    /// The rule only applies at this tier or below.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_trust: Option<TrustTier>,
}

/// Where a policy applies. Empty sets mean "any".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PolicyScope {
    pub agents: Vec<String>,
    pub exclude_agents: Vec<String>,
    pub channels: Vec<String>,
    pub hooks: Vec<HookKind>,
}

impl PolicyScope {
    /// Numeric tiebreaker preferring narrower scopes over broader ones.
    pub fn specificity(&self) -> i32 {
        let mut score = 0;
        if !self.agents.is_empty() {
            score += 10;
        }
        if !self.channels.is_empty() {
            score += 5;
        }
        if !self.hooks.is_empty() {
            score += 3;
        }
        score
    }

    /// Whether this scope admits the given hook/agent/channel combination.
    pub fn admits(&self, hook: HookKind, agent_id: &str, channel: Option<&str>) -> bool {
        if !self.hooks.is_empty() && !self.hooks.contains(&hook) {
            return false;
        }
        if !self.agents.is_empty() && !self.agents.iter().any(|a| a == agent_id) {
            return false;
        }
        if self.exclude_agents.iter().any(|a| a == agent_id) {
            return false;
        }
        if !self.channels.is_empty() {
            match channel {
                Some(c) => {
                    if !self.channels.iter().any(|want| want == c) {
                        return false;
                    }
                }
                None => return false,
            }
        }
        true
    }
}

/// A declarative policy: identity, priority, scope, and ordered rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Policy {
    pub id: String,
    #[serde(default = "default_policy_version")]
    pub version: String,
    #[serde(default)]
    pub name: String,
    /// Higher priority is considered first. Default 0.
    #[serde(default)]
    pub priority: i32,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub scope: PolicyScope,
    #[serde(default)]
    pub rules: Vec<Rule>,
}

fn default_policy_version() -> String {
    "1.0.0".to_string()
}

fn default_true() -> bool {
    true
}

/// Parse a YAML document containing a list of policies.
pub fn policies_from_yaml(doc: &str) -> Result<Vec<Policy>, PolicyError> {
    Ok(serde_yaml::from_str(doc)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_policy_from_yaml() {
        let doc = r#"
- id: no-shell
  rules:
    - id: deny-exec
      conditions:
        - type: tool
          name: exec
      effect:
        action: deny
        reason: "no shell"
"#;
        let policies = policies_from_yaml(doc).unwrap();
        assert_eq!(policies.len(), 1);
        let p = &policies[0];
        assert_eq!(p.id, "no-shell");
        assert!(p.enabled);
        assert_eq!(p.priority, 0);
        assert_eq!(p.version, "1.0.0");
        assert_eq!(p.rules.len(), 1);
        assert_eq!(
            p.rules[0].effect,
            Effect::Deny {
                reason: "no shell".to_string()
            }
        );
    }

    #[test]
    fn scoped_policy_round_trips_json() {
        let doc = r#"
- id: ops-only
  priority: 10
  scope:
    agents: [main]
    excludeAgents: [intern]
    channels: [ops]
    hooks: [before_tool_call]
  rules:
    - id: gate
      minTrust: trusted
      effect:
        action: allow
"#;
        let policies = policies_from_yaml(doc).unwrap();
        let json = serde_json::to_string(&policies).unwrap();
        let restored: Vec<Policy> = serde_json::from_str(&json).unwrap();
        assert_eq!(restored[0].scope, policies[0].scope);
        assert_eq!(restored[0].rules[0].min_trust, Some(TrustTier::Trusted));
    }

    #[test]
    fn escalate_effect_defaults() {
        let doc = r#"
- id: esc
  rules:
    - id: ask
      effect:
        action: escalate
        target: operator
"#;
        let policies = policies_from_yaml(doc).unwrap();
        match &policies[0].rules[0].effect {
            Effect::Escalate {
                target,
                timeout_ms,
                fallback,
            } => {
                assert_eq!(target, "operator");
                assert_eq!(*timeout_ms, 120_000);
                assert_eq!(*fallback, EscalationFallback::Deny);
            }
            other => panic!("expected escalate, got {:?}", other),
        }
    }

    #[test]
    fn effect_kind_strings() {
        assert_eq!(Effect::Allow.kind(), "allow");
        assert_eq!(
            Effect::Audit {
                level: "verbose".to_string()
            }
            .kind(),
            "audit"
        );
    }

    #[test]
    fn specificity_prefers_narrow_scopes() {
        let broad = PolicyScope::default();
        let narrow = PolicyScope {
            agents: vec!["main".to_string()],
            channels: vec!["ops".to_string()],
            hooks: vec![HookKind::BeforeToolCall],
            ..Default::default()
        };
        assert_eq!(broad.specificity(), 0);
        assert_eq!(narrow.specificity(), 18);
    }

    #[test]
    fn scope_admission() {
        let scope = PolicyScope {
            agents: vec!["main".to_string()],
            exclude_agents: vec!["rogue".to_string()],
            channels: vec!["ops".to_string()],
            hooks: vec![HookKind::BeforeToolCall],
        };
        assert!(scope.admits(HookKind::BeforeToolCall, "main", Some("ops")));
        assert!(!scope.admits(HookKind::MessageSending, "main", Some("ops")));
        assert!(!scope.admits(HookKind::BeforeToolCall, "other", Some("ops")));
        assert!(!scope.admits(HookKind::BeforeToolCall, "main", Some("dev")));
        assert!(!scope.admits(HookKind::BeforeToolCall, "main", None));
    }

    #[test]
    fn exclusion_beats_unscoped_include() {
        let scope = PolicyScope {
            exclude_agents: vec!["rogue".to_string()],
            ..Default::default()
        };
        assert!(scope.admits(HookKind::SessionStart, "main", None));
        assert!(!scope.admits(HookKind::SessionStart, "rogue", None));
    }

    #[test]
    fn bad_document_is_an_error() {
        assert!(policies_from_yaml("- id: [not a string").is_err());
    }
}
