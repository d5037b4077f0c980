// risk.rs — Five-factor risk assessment.
//
// Risk is a weighted composite of what the action touches (tool
// sensitivity, external targets), when it happens (off-hours), who asks
// (trust deficit), and how often (recent frequency). The total is clamped
// to [0, 100] and banded into four levels policy rules can gate on.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::context::EvaluationContext;

/// Discrete risk bands, ascending.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    #[default]
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    /// Band a 0–100 score: ≤25 low, ≤50 medium, ≤75 high, else critical.
    pub fn from_score(score: u8) -> Self {
        match score {
            0..=25 => RiskLevel::Low,
            26..=50 => RiskLevel::Medium,
            51..=75 => RiskLevel::High,
            _ => RiskLevel::Critical,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::Critical => "critical",
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One assessment: the banded level, the total, and the factor breakdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub score: u8,
    pub level: RiskLevel,
    /// Points contributed per factor, keyed by factor name.
    pub factors: BTreeMap<String, f64>,
}

/// Built-in per-tool sensitivity (0–100); unknown tools default to 30.
const TOOL_SENSITIVITY: &[(&str, u8)] = &[
    ("gateway", 95),
    ("elevated", 95),
    ("cron", 90),
    ("exec", 70),
    ("write", 65),
    ("edit", 60),
    ("sessions_send", 50),
    ("sessions_spawn", 45),
    ("browser", 40),
    ("message", 40),
    ("web_fetch", 20),
    ("web_search", 15),
    ("canvas", 15),
    ("read", 10),
    ("image", 10),
];

const UNKNOWN_TOOL_SENSITIVITY: u8 = 30;

/// Actions that are considered a burst: 20 in the last minute saturates
/// the frequency factor.
const FREQUENCY_SATURATION: f64 = 20.0;

/// Computes risk assessments against configured sensitivity overrides.
pub struct RiskAssessor {
    overrides: HashMap<String, u8>,
}

impl RiskAssessor {
    pub fn new(overrides: HashMap<String, u8>) -> Self {
        Self { overrides }
    }

    /// Assess a context. `recent_count` is the number of actions this
    /// agent's session performed in the last 60 seconds.
    pub fn assess(&self, ctx: &EvaluationContext, recent_count: usize) -> RiskAssessment {
        let tool_sensitivity = match ctx.tool_name.as_deref() {
            Some(tool) => (self.sensitivity(tool) as f64 / 100.0) * 30.0,
            None => 0.0,
        };
        let time_of_day = if ctx.time.hour < 8 || ctx.time.hour >= 23 {
            15.0
        } else {
            0.0
        };
        let trust_deficit = ((100 - ctx.trust.score).max(0) as f64 / 100.0) * 20.0;
        let frequency = (recent_count as f64 / FREQUENCY_SATURATION).min(1.0) * 15.0;
        let target_scope = if has_external_target(ctx) { 20.0 } else { 0.0 };

        let mut factors = BTreeMap::new();
        factors.insert("tool_sensitivity".to_string(), tool_sensitivity);
        factors.insert("time_of_day".to_string(), time_of_day);
        factors.insert("trust_deficit".to_string(), trust_deficit);
        factors.insert("frequency".to_string(), frequency);
        factors.insert("target_scope".to_string(), target_scope);

        let total: f64 = factors.values().sum();
        let score = total.round().clamp(0.0, 100.0) as u8;

        RiskAssessment {
            score,
            level: RiskLevel::from_score(score),
            factors,
        }
    }

    fn sensitivity(&self, tool: &str) -> u8 {
        if let Some(&value) = self.overrides.get(tool) {
            return value.min(100);
        }
        if let Some(&(_, value)) = TOOL_SENSITIVITY.iter().find(|(name, _)| *name == tool) {
            return value;
        }
        if tool.starts_with("memory_") {
            return 5;
        }
        UNKNOWN_TOOL_SENSITIVITY
    }
}

/// Whether the action reaches outside the sandbox: an outbound message
/// addressee, a `host` parameter other than "sandbox", or `elevated: true`.
fn has_external_target(ctx: &EvaluationContext) -> bool {
    if ctx
        .message_target
        .as_deref()
        .is_some_and(|target| !target.is_empty())
    {
        return true;
    }
    if let Some(host) = ctx.tool_params.get("host").and_then(|v| v.as_str()) {
        if host != "sandbox" {
            return true;
        }
    }
    ctx.tool_params.get("elevated") == Some(&serde_json::Value::Bool(true))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::HookKind;
    use ag_trust::{TrustSnapshot, TrustTier};
    use ag_util::TimeContext;
    use serde_json::{json, Map, Value};

    fn time_at(hour: u32) -> TimeContext {
        TimeContext {
            hour,
            minute: 0,
            weekday: chrono::Weekday::Tue,
            date: chrono::NaiveDate::from_ymd_opt(2026, 3, 3).unwrap(),
            zone: "UTC".to_string(),
        }
    }

    fn ctx(hour: u32, trust: i64, tool: Option<&str>, params: Map<String, Value>) -> EvaluationContext {
        let mut ctx = EvaluationContext::new(
            HookKind::BeforeToolCall,
            "main",
            "agent:main:1",
            time_at(hour),
            TrustSnapshot {
                score: trust,
                tier: TrustTier::from_score(trust),
            },
        );
        if let Some(tool) = tool {
            ctx = ctx.with_tool(tool, params);
        }
        ctx
    }

    #[test]
    fn fully_trusted_daytime_read_is_low() {
        let assessor = RiskAssessor::new(HashMap::new());
        let assessment = assessor.assess(&ctx(12, 100, Some("read"), Map::new()), 0);
        // 10/100*30 = 3, everything else zero.
        assert_eq!(assessment.score, 3);
        assert_eq!(assessment.level, RiskLevel::Low);
    }

    #[test]
    fn off_hours_adds_fifteen() {
        let assessor = RiskAssessor::new(HashMap::new());
        let day = assessor.assess(&ctx(12, 100, Some("read"), Map::new()), 0);
        let night = assessor.assess(&ctx(3, 100, Some("read"), Map::new()), 0);
        assert_eq!(night.factors["time_of_day"], 15.0);
        assert_eq!(night.score, day.score + 15);

        let late = assessor.assess(&ctx(23, 100, Some("read"), Map::new()), 0);
        assert_eq!(late.factors["time_of_day"], 15.0);
    }

    #[test]
    fn trust_deficit_scales() {
        let assessor = RiskAssessor::new(HashMap::new());
        let assessment = assessor.assess(&ctx(12, 0, None, Map::new()), 0);
        assert_eq!(assessment.factors["trust_deficit"], 20.0);

        let half = assessor.assess(&ctx(12, 50, None, Map::new()), 0);
        assert_eq!(half.factors["trust_deficit"], 10.0);
    }

    #[test]
    fn frequency_saturates_at_twenty_actions() {
        let assessor = RiskAssessor::new(HashMap::new());
        let some = assessor.assess(&ctx(12, 100, None, Map::new()), 10);
        assert_eq!(some.factors["frequency"], 7.5);
        let saturated = assessor.assess(&ctx(12, 100, None, Map::new()), 200);
        assert_eq!(saturated.factors["frequency"], 15.0);
    }

    #[test]
    fn external_target_detection() {
        let assessor = RiskAssessor::new(HashMap::new());

        let mut params = Map::new();
        params.insert("host".to_string(), json!("db.internal"));
        let external = assessor.assess(&ctx(12, 100, Some("exec"), params), 0);
        assert_eq!(external.factors["target_scope"], 20.0);

        let mut sandboxed = Map::new();
        sandboxed.insert("host".to_string(), json!("sandbox"));
        let local = assessor.assess(&ctx(12, 100, Some("exec"), sandboxed), 0);
        assert_eq!(local.factors["target_scope"], 0.0);

        let mut elevated = Map::new();
        elevated.insert("elevated".to_string(), json!(true));
        let sudo = assessor.assess(&ctx(12, 100, Some("exec"), elevated), 0);
        assert_eq!(sudo.factors["target_scope"], 20.0);
    }

    #[test]
    fn message_addressee_is_external() {
        let assessor = RiskAssessor::new(HashMap::new());
        let mut ctx = ctx(12, 100, None, Map::new());
        ctx.hook = HookKind::MessageSending;
        ctx.message_content = Some("hello".to_string());
        ctx.message_target = Some("user@example.com".to_string());
        let assessment = assessor.assess(&ctx, 0);
        assert_eq!(assessment.factors["target_scope"], 20.0);
    }

    #[test]
    fn overrides_supersede_builtin_table() {
        let mut overrides = HashMap::new();
        overrides.insert("read".to_string(), 100u8);
        let assessor = RiskAssessor::new(overrides);
        let assessment = assessor.assess(&ctx(12, 100, Some("read"), Map::new()), 0);
        assert_eq!(assessment.factors["tool_sensitivity"], 30.0);
    }

    #[test]
    fn unknown_tool_defaults_and_memory_prefix() {
        let assessor = RiskAssessor::new(HashMap::new());
        let unknown = assessor.assess(&ctx(12, 100, Some("frobnicate"), Map::new()), 0);
        assert_eq!(unknown.factors["tool_sensitivity"], 9.0); // 30/100*30

        let memory = assessor.assess(&ctx(12, 100, Some("memory_get"), Map::new()), 0);
        assert_eq!(memory.factors["tool_sensitivity"], 1.5); // 5/100*30
    }

    #[test]
    fn worst_case_is_clamped_and_critical() {
        let assessor = RiskAssessor::new(HashMap::new());
        let mut params = Map::new();
        params.insert("elevated".to_string(), json!(true));
        let assessment = assessor.assess(&ctx(3, 0, Some("gateway"), params), 100);
        // 28.5 + 15 + 20 + 15 + 20 = 98.5 → 99
        assert_eq!(assessment.score, 99);
        assert_eq!(assessment.level, RiskLevel::Critical);
    }

    #[test]
    fn banding_boundaries() {
        assert_eq!(RiskLevel::from_score(0), RiskLevel::Low);
        assert_eq!(RiskLevel::from_score(25), RiskLevel::Low);
        assert_eq!(RiskLevel::from_score(26), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_score(50), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_score(51), RiskLevel::High);
        assert_eq!(RiskLevel::from_score(75), RiskLevel::High);
        assert_eq!(RiskLevel::from_score(76), RiskLevel::Critical);
        assert_eq!(RiskLevel::from_score(100), RiskLevel::Critical);
    }

    #[test]
    fn levels_are_ordered() {
        assert!(RiskLevel::Low < RiskLevel::Medium);
        assert!(RiskLevel::Medium < RiskLevel::High);
        assert!(RiskLevel::High < RiskLevel::Critical);
    }
}
