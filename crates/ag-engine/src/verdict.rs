// verdict.rs — What the engine returns to the host.

use serde::{Deserialize, Serialize};

use ag_policy::{Decision, EscalationFallback, RiskAssessment, RuleMatch};
use ag_trust::TrustSnapshot;

/// The verdict's disposition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Action {
    Allow,
    Deny,
    #[serde(rename_all = "camelCase")]
    Escalate {
        target: String,
        timeout_ms: u64,
        fallback: EscalationFallback,
    },
}

impl Action {
    pub fn kind(&self) -> &'static str {
        match self {
            Action::Allow => "allow",
            Action::Deny => "deny",
            Action::Escalate { .. } => "escalate",
        }
    }
}

/// The full answer for one evaluation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Verdict {
    pub action: Action,
    pub reason: String,
    pub risk: RiskAssessment,
    pub matched_policies: Vec<RuleMatch>,
    pub trust: TrustSnapshot,
    pub evaluation_us: u64,
}

impl Verdict {
    pub fn is_allowed(&self) -> bool {
        matches!(self.action, Action::Allow)
    }

    pub(crate) fn from_decision(
        decision: Decision,
        risk: RiskAssessment,
        matched: Vec<RuleMatch>,
        trust: TrustSnapshot,
        evaluation_us: u64,
    ) -> Self {
        let reason = decision.reason().to_string();
        let action = match decision {
            Decision::Allow { .. } => Action::Allow,
            Decision::Deny { .. } => Action::Deny,
            Decision::Escalate {
                target,
                timeout_ms,
                fallback,
                ..
            } => Action::Escalate {
                target,
                timeout_ms,
                fallback,
            },
        };
        Self {
            action,
            reason,
            risk,
            matched_policies: matched,
            trust,
            evaluation_us,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ag_policy::RiskLevel;
    use ag_trust::TrustTier;

    #[test]
    fn action_serializes_with_kind_tag() {
        let json = serde_json::to_string(&Action::Allow).unwrap();
        assert_eq!(json, r#"{"kind":"allow"}"#);

        let escalate = Action::Escalate {
            target: "operator".to_string(),
            timeout_ms: 60_000,
            fallback: EscalationFallback::Deny,
        };
        let json = serde_json::to_string(&escalate).unwrap();
        assert!(json.contains(r#""kind":"escalate""#));
        assert!(json.contains(r#""timeoutMs":60000"#));
    }

    #[test]
    fn verdict_from_decision() {
        let verdict = Verdict::from_decision(
            Decision::Deny {
                reason: "no shell".to_string(),
            },
            RiskAssessment {
                score: 40,
                level: RiskLevel::Medium,
                factors: Default::default(),
            },
            vec![RuleMatch {
                policy_id: "no-shell".to_string(),
                rule_id: "deny-exec".to_string(),
                effect: "deny".to_string(),
            }],
            TrustSnapshot {
                score: 60,
                tier: TrustTier::Trusted,
            },
            120,
        );
        assert_eq!(verdict.action, Action::Deny);
        assert_eq!(verdict.reason, "no shell");
        assert!(!verdict.is_allowed());
        assert_eq!(verdict.evaluation_us, 120);
    }
}
