// builtin.rs — Built-in policy templates.
//
// Four opt-in policies cover the governance baseline most deployments
// want on day one: no sensitive tools at night, no touching credential
// material, escalate anything that leaves the sandbox, and a per-agent
// rate limit. Each is generated from a parameterised constructor; a
// declared policy with the same id replaces the built-in entirely.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::condition::{Condition, NameMatcher, ParamMatcher};
use crate::context::HookKind;
use crate::frequency::FrequencyScope;
use crate::model::{Effect, EscalationFallback, Policy, PolicyScope, Rule};

/// Which built-in templates to generate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BuiltinToggles {
    pub night_mode: bool,
    pub credential_guard: bool,
    pub production_safeguard: bool,
    pub rate_limiter: bool,
}

/// Generate the enabled built-in policies.
pub fn builtin_policies(toggles: &BuiltinToggles) -> Vec<Policy> {
    let mut out = Vec::new();
    if toggles.credential_guard {
        out.push(credential_guard());
    }
    if toggles.production_safeguard {
        out.push(production_safeguard("operator"));
    }
    if toggles.night_mode {
        out.push(night_mode("23:00", "08:00"));
    }
    if toggles.rate_limiter {
        out.push(rate_limiter(30, 60));
    }
    out
}

/// Sensitive tools are blocked inside the window.
pub fn night_mode(after: &str, before: &str) -> Policy {
    Policy {
        id: "builtin-night-mode".to_string(),
        version: "1.0.0".to_string(),
        name: "Night mode".to_string(),
        priority: 90,
        enabled: true,
        scope: PolicyScope {
            hooks: vec![HookKind::BeforeToolCall],
            ..Default::default()
        },
        rules: vec![Rule {
            id: "deny-sensitive-tools-at-night".to_string(),
            conditions: vec![
                Condition::Tool {
                    name: Some(NameMatcher::Many(
                        ["exec", "write", "edit", "gateway", "cron", "elevated", "sessions_spawn"]
                            .iter()
                            .map(|s| s.to_string())
                            .collect(),
                    )),
                    params: HashMap::new(),
                },
                Condition::Time {
                    window: None,
                    after: Some(after.to_string()),
                    before: Some(before.to_string()),
                    days: Vec::new(),
                },
            ],
            effect: Effect::Deny {
                reason: format!(
                    "Night mode: sensitive tools are blocked between {} and {}",
                    after, before
                ),
            },
            min_trust: None,
            max_trust: None,
        }],
    }
}

/// File and shell access to secret material is blocked outright.
pub fn credential_guard() -> Policy {
    let secret_pattern = r"\.env|\.pem|\.key|id_rsa|\.aws|\.ssh|credential|secret";
    let path_params = |key: &str| {
        let mut params = HashMap::new();
        params.insert(
            key.to_string(),
            ParamMatcher {
                matches: Some(secret_pattern.to_string()),
                ..Default::default()
            },
        );
        params
    };
    Policy {
        id: "builtin-credential-guard".to_string(),
        version: "1.0.0".to_string(),
        name: "Credential guard".to_string(),
        priority: 100,
        enabled: true,
        scope: PolicyScope {
            hooks: vec![HookKind::BeforeToolCall],
            ..Default::default()
        },
        rules: vec![
            Rule {
                id: "deny-credential-paths".to_string(),
                conditions: vec![Condition::Tool {
                    name: Some(NameMatcher::Many(
                        ["read", "write", "edit"].iter().map(|s| s.to_string()).collect(),
                    )),
                    params: path_params("path"),
                }],
                effect: Effect::Deny {
                    reason: "Credential protection: access to secret material is blocked"
                        .to_string(),
                },
                min_trust: None,
                max_trust: None,
            },
            Rule {
                id: "deny-credential-commands".to_string(),
                conditions: vec![Condition::Tool {
                    name: Some(NameMatcher::One("exec".to_string())),
                    params: path_params("command"),
                }],
                effect: Effect::Deny {
                    reason: "Credential protection: access to secret material is blocked"
                        .to_string(),
                },
                min_trust: None,
                max_trust: None,
            },
        ],
    }
}

/// Anything that reaches outside the sandbox requires a human.
pub fn production_safeguard(escalation_target: &str) -> Policy {
    let escalate = Effect::Escalate {
        target: escalation_target.to_string(),
        timeout_ms: 120_000,
        fallback: EscalationFallback::Deny,
    };
    let mut elevated_params = HashMap::new();
    elevated_params.insert(
        "elevated".to_string(),
        ParamMatcher {
            equals: Some(serde_json::Value::Bool(true)),
            ..Default::default()
        },
    );
    let mut any_host = HashMap::new();
    any_host.insert(
        "host".to_string(),
        ParamMatcher {
            matches: Some(".+".to_string()),
            ..Default::default()
        },
    );
    let mut sandbox_host = HashMap::new();
    sandbox_host.insert(
        "host".to_string(),
        ParamMatcher {
            equals: Some(serde_json::Value::String("sandbox".to_string())),
            ..Default::default()
        },
    );
    Policy {
        id: "builtin-production-safeguard".to_string(),
        version: "1.0.0".to_string(),
        name: "Production safeguard".to_string(),
        priority: 95,
        enabled: true,
        scope: PolicyScope {
            hooks: vec![HookKind::BeforeToolCall],
            ..Default::default()
        },
        rules: vec![
            Rule {
                id: "escalate-elevated-calls".to_string(),
                conditions: vec![Condition::Tool {
                    name: None,
                    params: elevated_params,
                }],
                effect: escalate.clone(),
                min_trust: None,
                max_trust: None,
            },
            Rule {
                id: "escalate-external-hosts".to_string(),
                conditions: vec![
                    Condition::Tool {
                        name: None,
                        params: any_host,
                    },
                    Condition::Not {
                        condition: Box::new(Condition::Tool {
                            name: None,
                            params: sandbox_host,
                        }),
                    },
                ],
                effect: escalate,
                min_trust: None,
                max_trust: None,
            },
        ],
    }
}

/// Per-agent action ceiling over a sliding window.
pub fn rate_limiter(max_count: u32, window_seconds: u64) -> Policy {
    Policy {
        id: "builtin-rate-limiter".to_string(),
        version: "1.0.0".to_string(),
        name: "Rate limiter".to_string(),
        priority: 70,
        enabled: true,
        scope: PolicyScope {
            hooks: vec![HookKind::BeforeToolCall],
            ..Default::default()
        },
        rules: vec![Rule {
            id: "deny-over-rate".to_string(),
            conditions: vec![Condition::Frequency {
                max_count,
                window_seconds,
                scope: FrequencyScope::Agent,
            }],
            effect: Effect::Deny {
                reason: format!(
                    "Rate limit exceeded: more than {} actions in {} seconds",
                    max_count, window_seconds
                ),
            },
            min_trust: None,
            max_trust: None,
        }],
    }
}
