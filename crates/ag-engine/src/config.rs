// config.rs — The engine's configuration surface.
//
// The host parses its own config files; the engine receives this struct
// (or deserializes it from a YAML/JSON document the host hands over).
// Every field has a default, so `GovernanceConfig::default()` is a
// working permissive configuration and partial documents fill in the
// rest — including partial trust-weight overrides.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use ag_audit::AuditLevel;
use ag_policy::{BuiltinToggles, Policy, TimeWindow};
use ag_trust::TrustWeights;

/// What the engine answers when evaluation itself fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailMode {
    /// Errors allow the action.
    #[default]
    Open,
    /// Errors deny the action.
    Closed,
}

impl FailMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailMode::Open => "open",
            FailMode::Closed => "closed",
        }
    }
}

/// Trust subsystem configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TrustConfig {
    pub enabled: bool,
    /// Default score per agent id; `"*"` is the fallback.
    pub defaults: HashMap<String, i64>,
    pub persist_interval_seconds: u64,
    pub decay: DecayConfig,
    /// Partial overrides merge over the built-in weights.
    pub weights: TrustWeights,
    pub max_history_per_agent: usize,
}

impl Default for TrustConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            defaults: HashMap::new(),
            persist_interval_seconds: 60,
            decay: DecayConfig::default(),
            weights: TrustWeights::default(),
            max_history_per_agent: 100,
        }
    }
}

/// Inactivity decay configuration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DecayConfig {
    pub enabled: bool,
    pub inactivity_days: i64,
    pub rate: f64,
}

impl Default for DecayConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            inactivity_days: 14,
            rate: 0.95,
        }
    }
}

/// Audit subsystem configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AuditConfig {
    pub enabled: bool,
    pub retention_days: i64,
    pub verify_on_startup: bool,
    pub redact_patterns: Vec<String>,
    pub level: AuditLevel,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            retention_days: 30,
            verify_on_startup: false,
            redact_patterns: Vec::new(),
            level: AuditLevel::Standard,
        }
    }
}

/// Evaluation budget and sizing knobs.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PerformanceConfig {
    /// Soft budget per evaluation; overruns warn, never truncate.
    pub max_eval_us: u64,
    /// Most recent conversation lines handed to a context.
    pub max_context_messages: usize,
    /// Frequency counter ring capacity.
    pub frequency_buffer_size: usize,
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            max_eval_us: 5000,
            max_context_messages: 50,
            frequency_buffer_size: 1000,
        }
    }
}

/// The whole configuration surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GovernanceConfig {
    /// Master switch; a disabled engine allows everything untouched.
    pub enabled: bool,
    /// IANA zone the clock snapshots are taken in.
    pub timezone: String,
    pub fail_mode: FailMode,
    pub policies: Vec<Policy>,
    pub time_windows: HashMap<String, TimeWindow>,
    pub trust: TrustConfig,
    pub audit: AuditConfig,
    /// Per-tool risk score overrides (0–100).
    pub tool_risk_overrides: HashMap<String, u8>,
    pub builtin_policies: BuiltinToggles,
    pub performance: PerformanceConfig,
}

impl Default for GovernanceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            timezone: "UTC".to_string(),
            fail_mode: FailMode::Open,
            policies: Vec::new(),
            time_windows: HashMap::new(),
            trust: TrustConfig::default(),
            audit: AuditConfig::default(),
            tool_risk_overrides: HashMap::new(),
            builtin_policies: BuiltinToggles::default(),
            performance: PerformanceConfig::default(),
        }
    }
}

impl GovernanceConfig {
    /// Deserialize a configuration document (YAML, which also covers JSON).
    pub fn from_yaml(doc: &str) -> Result<Self, EngineError> {
        Ok(serde_yaml::from_str(doc)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_permissive() {
        let config = GovernanceConfig::default();
        assert!(config.enabled);
        assert_eq!(config.timezone, "UTC");
        assert_eq!(config.fail_mode, FailMode::Open);
        assert!(config.policies.is_empty());
        assert_eq!(config.performance.max_eval_us, 5000);
        assert_eq!(config.performance.frequency_buffer_size, 1000);
        assert_eq!(config.trust.persist_interval_seconds, 60);
        assert_eq!(config.audit.retention_days, 30);
        assert!(!config.audit.verify_on_startup);
    }

    #[test]
    fn empty_document_is_the_default_config() {
        let config = GovernanceConfig::from_yaml("{}").unwrap();
        assert!(config.enabled);
        assert_eq!(config.fail_mode, FailMode::Open);
    }

    #[test]
    fn full_document_round_trip() {
        let doc = r#"
enabled: true
timezone: Europe/Berlin
failMode: closed
builtinPolicies:
  nightMode: true
  credentialGuard: true
timeWindows:
  night:
    after: "23:00"
    before: "08:00"
trust:
  defaults:
    "*": 40
    main: 70
  decay:
    enabled: true
    inactivityDays: 7
    rate: 0.9
  weights:
    violationPenalty: -5
audit:
  level: verbose
  verifyOnStartup: true
  redactPatterns:
    - "sk-[a-z0-9]+"
toolRiskOverrides:
  exec: 90
performance:
  maxEvalUs: 2000
policies:
  - id: no-shell
    priority: 5
    rules:
      - id: deny-exec
        conditions:
          - type: tool
            name: exec
        effect:
          action: deny
          reason: no shell
"#;
        let config = GovernanceConfig::from_yaml(doc).unwrap();
        assert_eq!(config.fail_mode, FailMode::Closed);
        assert_eq!(config.timezone, "Europe/Berlin");
        assert!(config.builtin_policies.night_mode);
        assert!(config.builtin_policies.credential_guard);
        assert!(!config.builtin_policies.rate_limiter);
        assert_eq!(config.trust.defaults["main"], 70);
        assert!(config.trust.decay.enabled);
        assert_eq!(config.trust.decay.inactivity_days, 7);
        // Partial weight override: the named weight changes, others keep
        // their defaults.
        assert_eq!(config.trust.weights.violation_penalty, -5.0);
        assert_eq!(config.trust.weights.age_per_day, 0.5);
        assert_eq!(config.audit.level, AuditLevel::Verbose);
        assert!(config.audit.verify_on_startup);
        assert_eq!(config.tool_risk_overrides["exec"], 90);
        assert_eq!(config.performance.max_eval_us, 2000);
        assert_eq!(config.policies.len(), 1);

        let json = serde_json::to_string(&config).unwrap();
        let restored: GovernanceConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.timezone, config.timezone);
        assert_eq!(restored.policies.len(), 1);
    }

    #[test]
    fn bad_document_is_an_error() {
        assert!(GovernanceConfig::from_yaml("enabled: [").is_err());
    }
}
