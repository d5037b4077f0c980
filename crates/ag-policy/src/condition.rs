// condition.rs — The condition kernel.
//
// A closed set of condition kinds, each a pure function of
// (condition, context, deps). Conditions inside a rule are AND-combined
// with short-circuit; `any` is the OR combinator and `not` the negation.
// A missing context field referenced by a condition evaluates to false,
// never to an error — the kernel cannot fail, only not-match.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::context::EvaluationContext;
use crate::frequency::{FrequencyCounter, FrequencyScope};
use crate::model::TimeWindow;
use crate::regex_cache::RegexCache;
use crate::risk::{RiskAssessment, RiskLevel};
use ag_trust::TrustTier;
use ag_util::{glob_to_regex, in_time_range, parse_time_minutes, weekday_matches};

/// A name matcher: one exact-or-glob pattern, or any-of an array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NameMatcher {
    One(String),
    Many(Vec<String>),
}

impl NameMatcher {
    pub fn matches(&self, value: &str, cache: &RegexCache) -> bool {
        match self {
            NameMatcher::One(pattern) => name_pattern_matches(pattern, value, cache),
            NameMatcher::Many(patterns) => patterns
                .iter()
                .any(|p| name_pattern_matches(p, value, cache)),
        }
    }
}

fn name_pattern_matches(pattern: &str, value: &str, cache: &RegexCache) -> bool {
    if pattern.contains('*') {
        cache.matcher(&glob_to_regex(pattern)).is_match(value)
    } else {
        pattern == value
    }
}

/// Constraints on one tool parameter. Every specified field must hold.
///
/// `equals` and `in` compare JSON values strictly; the string matchers
/// compare against the string-coerced value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ParamMatcher {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub equals: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contains: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matches: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub starts_with: Option<String>,
    #[serde(rename = "in", skip_serializing_if = "Option::is_none")]
    pub in_set: Option<Vec<Value>>,
}

impl ParamMatcher {
    fn holds(&self, value: Option<&Value>, cache: &RegexCache) -> bool {
        // Referencing a parameter the call does not carry never matches.
        let Some(value) = value else {
            return false;
        };
        if let Some(expected) = &self.equals {
            if value != expected {
                return false;
            }
        }
        let text = coerce_string(value);
        if let Some(needle) = &self.contains {
            if !text.contains(needle.as_str()) {
                return false;
            }
        }
        if let Some(source) = &self.matches {
            if !cache.matcher(source).is_match(&text) {
                return false;
            }
        }
        if let Some(prefix) = &self.starts_with {
            if !text.starts_with(prefix.as_str()) {
                return false;
            }
        }
        if let Some(set) = &self.in_set {
            if !set.iter().any(|candidate| candidate == value) {
                return false;
            }
        }
        true
    }
}

fn coerce_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// The closed set of condition kinds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Condition {
    /// Tool name and parameter constraints.
    Tool {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<NameMatcher>,
        #[serde(default, skip_serializing_if = "HashMap::is_empty")]
        params: HashMap<String, ParamMatcher>,
    },
    /// A named window reference or an inline after/before window.
    Time {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        window: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        after: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        before: Option<String>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        days: Vec<String>,
    },
    /// Agent identity, tier membership, and score range.
    #[serde(rename_all = "camelCase")]
    Agent {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<NameMatcher>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        tiers: Vec<TrustTier>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min_score: Option<i64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_score: Option<i64>,
    },
    /// Conversation, message, metadata, channel, and session-key matchers.
    #[serde(rename_all = "camelCase")]
    Context {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        history_contains: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        history_matches: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message_contains: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message_matches: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        metadata_key: Option<String>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        channels: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        session_key: Option<String>,
    },
    /// Inclusive band over the current risk level.
    #[serde(rename_all = "camelCase")]
    Risk {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min_level: Option<RiskLevel>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_level: Option<RiskLevel>,
    },
    /// Matches once the windowed count reaches the threshold.
    #[serde(rename_all = "camelCase")]
    Frequency {
        max_count: u32,
        window_seconds: u64,
        #[serde(default)]
        scope: FrequencyScope,
    },
    /// OR over sub-conditions; empty matches nothing.
    Any { conditions: Vec<Condition> },
    /// Negation of one sub-condition.
    Not { condition: Box<Condition> },
}

/// Shared dependencies the kernel evaluates against.
pub struct ConditionDeps<'a> {
    pub regexes: &'a RegexCache,
    pub windows: &'a HashMap<String, TimeWindow>,
    pub frequency: &'a FrequencyCounter,
    pub risk: &'a RiskAssessment,
}

/// AND-combine a rule's conditions, short-circuiting on the first false.
pub fn eval_conditions(
    conditions: &[Condition],
    ctx: &EvaluationContext,
    deps: &ConditionDeps<'_>,
) -> bool {
    conditions.iter().all(|c| eval_condition(c, ctx, deps))
}

/// Evaluate a single condition.
pub fn eval_condition(
    condition: &Condition,
    ctx: &EvaluationContext,
    deps: &ConditionDeps<'_>,
) -> bool {
    match condition {
        Condition::Tool { name, params } => eval_tool(name.as_ref(), params, ctx, deps),
        Condition::Time {
            window,
            after,
            before,
            days,
        } => eval_time(window.as_deref(), after.as_deref(), before.as_deref(), days, ctx, deps),
        Condition::Agent {
            id,
            tiers,
            min_score,
            max_score,
        } => eval_agent(id.as_ref(), tiers, *min_score, *max_score, ctx, deps),
        Condition::Context {
            history_contains,
            history_matches,
            message_contains,
            message_matches,
            metadata_key,
            channels,
            session_key,
        } => eval_context(
            history_contains.as_deref(),
            history_matches.as_deref(),
            message_contains.as_deref(),
            message_matches.as_deref(),
            metadata_key.as_deref(),
            channels,
            session_key.as_deref(),
            ctx,
            deps,
        ),
        Condition::Risk {
            min_level,
            max_level,
        } => {
            let level = deps.risk.level;
            min_level.map_or(true, |min| level >= min) && max_level.map_or(true, |max| level <= max)
        }
        Condition::Frequency {
            max_count,
            window_seconds,
            scope,
        } => {
            deps.frequency
                .count(*window_seconds, *scope, &ctx.agent_id, &ctx.session_key)
                >= *max_count as usize
        }
        Condition::Any { conditions } => conditions.iter().any(|c| eval_condition(c, ctx, deps)),
        Condition::Not { condition } => !eval_condition(condition, ctx, deps),
    }
}

fn eval_tool(
    name: Option<&NameMatcher>,
    params: &HashMap<String, ParamMatcher>,
    ctx: &EvaluationContext,
    deps: &ConditionDeps<'_>,
) -> bool {
    // A tool condition against a non-tool context never matches.
    let Some(tool_name) = ctx.tool_name.as_deref() else {
        return false;
    };
    if let Some(matcher) = name {
        if !matcher.matches(tool_name, deps.regexes) {
            return false;
        }
    }
    params
        .iter()
        .all(|(key, pm)| pm.holds(ctx.tool_params.get(key), deps.regexes))
}

fn eval_time(
    window: Option<&str>,
    after: Option<&str>,
    before: Option<&str>,
    days: &[String],
    ctx: &EvaluationContext,
    deps: &ConditionDeps<'_>,
) -> bool {
    let (after_str, before_str, day_set): (&str, &str, &[String]) = match window {
        Some(name) => match deps.windows.get(name) {
            Some(w) => (&w.after, &w.before, &w.days),
            None => {
                tracing::debug!(window = name, "time condition references unknown window");
                return false;
            }
        },
        None => match (after, before) {
            (Some(a), Some(b)) => (a, b, days),
            _ => return false,
        },
    };
    let after = parse_time_minutes(after_str);
    let before = parse_time_minutes(before_str);
    if after < 0 || before < 0 {
        return false;
    }
    if !weekday_matches(ctx.time.weekday, day_set) {
        return false;
    }
    // Minutes-of-day computed once per call.
    in_time_range(ctx.time.minutes_of_day(), after, before)
}

fn eval_agent(
    id: Option<&NameMatcher>,
    tiers: &[TrustTier],
    min_score: Option<i64>,
    max_score: Option<i64>,
    ctx: &EvaluationContext,
    deps: &ConditionDeps<'_>,
) -> bool {
    if let Some(matcher) = id {
        if !matcher.matches(&ctx.agent_id, deps.regexes) {
            return false;
        }
    }
    if !tiers.is_empty() && !tiers.contains(&ctx.trust.tier) {
        return false;
    }
    if min_score.is_some_and(|min| ctx.trust.score < min) {
        return false;
    }
    if max_score.is_some_and(|max| ctx.trust.score > max) {
        return false;
    }
    true
}

#[allow(clippy::too_many_arguments)]
fn eval_context(
    history_contains: Option<&str>,
    history_matches: Option<&str>,
    message_contains: Option<&str>,
    message_matches: Option<&str>,
    metadata_key: Option<&str>,
    channels: &[String],
    session_key: Option<&str>,
    ctx: &EvaluationContext,
    deps: &ConditionDeps<'_>,
) -> bool {
    if let Some(needle) = history_contains {
        if !ctx.history.iter().any(|line| line.contains(needle)) {
            return false;
        }
    }
    if let Some(source) = history_matches {
        let matcher = deps.regexes.matcher(source);
        if !ctx.history.iter().any(|line| matcher.is_match(line)) {
            return false;
        }
    }
    if let Some(needle) = message_contains {
        match ctx.message_content.as_deref() {
            Some(content) if content.contains(needle) => {}
            _ => return false,
        }
    }
    if let Some(source) = message_matches {
        match ctx.message_content.as_deref() {
            Some(content) if deps.regexes.matcher(source).is_match(content) => {}
            _ => return false,
        }
    }
    if let Some(key) = metadata_key {
        if !ctx.metadata.contains_key(key) {
            return false;
        }
    }
    if !channels.is_empty() {
        match ctx.channel.as_deref() {
            Some(channel) if channels.iter().any(|c| c == channel) => {}
            _ => return false,
        }
    }
    if let Some(pattern) = session_key {
        if !name_pattern_matches(pattern, &ctx.session_key, deps.regexes) {
            return false;
        }
    }
    true
}
