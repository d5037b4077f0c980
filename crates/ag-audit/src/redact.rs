// redact.rs — Context redaction.
//
// Audit records outlive sessions and get shipped to other systems, so the
// context snapshot is scrubbed before it ever enters the in-memory buffer:
// nothing sensitive is held even transiently. Redaction is idempotent —
// running it twice produces the same bytes.

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Replacement for sensitive values.
pub const REDACTED: &str = "[REDACTED]";
/// Appended to message bodies cut at the length cap.
pub const TRUNCATION_MARKER: &str = "[TRUNCATED at 500 chars]";
/// Message bodies longer than this are truncated.
const MAX_MESSAGE_CHARS: usize = 500;

/// Parameter keys whose values are always blanked, whatever they hold.
const SENSITIVE_KEY_PATTERN: &str =
    r"(?i)^(password|secret|token|apiKey|api_key|credential|auth|authorization)$";

/// The audit-facing copy of an evaluation context.
///
/// Deliberately decoupled from the evaluator's context type: the audit
/// subsystem only ever sees this snapshot, already stripped to what a
/// record should carry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextSnapshot {
    pub hook: String,
    pub agent_id: String,
    pub session_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub tool_params: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_target: Option<String>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
}

/// Applies the redaction rules to context snapshots.
pub struct Redactor {
    sensitive_key: Regex,
    user_patterns: Vec<Regex>,
}

impl Redactor {
    /// Build a redactor with operator-supplied patterns on top of the
    /// built-in key rules. Patterns that fail to compile are skipped with
    /// a warning; redaction must never be the thing that fails.
    pub fn new(user_patterns: &[String]) -> Self {
        let compiled = user_patterns
            .iter()
            .filter_map(|source| match Regex::new(source) {
                Ok(re) => Some(re),
                Err(err) => {
                    tracing::warn!(pattern = %source, %err, "skipping invalid redaction pattern");
                    None
                }
            })
            .collect();
        Self {
            sensitive_key: Regex::new(SENSITIVE_KEY_PATTERN).expect("built-in pattern compiles"),
            user_patterns: compiled,
        }
    }

    /// Redact a snapshot: blank sensitive parameter keys, truncate long
    /// message bodies, scrub user patterns from every string leaf.
    pub fn redact(&self, mut snapshot: ContextSnapshot) -> ContextSnapshot {
        self.redact_map(&mut snapshot.tool_params, true);
        self.redact_map(&mut snapshot.metadata, false);

        if let Some(content) = snapshot.message_content.take() {
            let scrubbed = self.apply_user_patterns(content);
            snapshot.message_content = Some(truncate_message(scrubbed));
        }
        if let Some(target) = snapshot.message_target.take() {
            snapshot.message_target = Some(self.apply_user_patterns(target));
        }
        snapshot
    }

    fn redact_map(&self, map: &mut Map<String, Value>, key_sensitive: bool) {
        for (key, value) in map.iter_mut() {
            if key_sensitive && self.sensitive_key.is_match(key) {
                *value = Value::String(REDACTED.to_string());
                continue;
            }
            self.redact_value(value, key_sensitive);
        }
    }

    fn redact_value(&self, value: &mut Value, key_sensitive: bool) {
        match value {
            Value::String(s) => {
                let scrubbed = self.apply_user_patterns(std::mem::take(s));
                *s = scrubbed;
            }
            Value::Array(items) => {
                for item in items {
                    self.redact_value(item, key_sensitive);
                }
            }
            Value::Object(map) => self.redact_map(map, key_sensitive),
            _ => {}
        }
    }

    fn apply_user_patterns(&self, mut text: String) -> String {
        for pattern in &self.user_patterns {
            if pattern.is_match(&text) {
                text = pattern.replace_all(&text, REDACTED).into_owned();
            }
        }
        text
    }
}

/// Cut a message at the cap, appending the marker. Already-truncated
/// messages pass through unchanged so truncation is idempotent.
fn truncate_message(content: String) -> String {
    if content.ends_with(TRUNCATION_MARKER) {
        return content;
    }
    if content.chars().count() <= MAX_MESSAGE_CHARS {
        return content;
    }
    let mut truncated: String = content.chars().take(MAX_MESSAGE_CHARS).collect();
    truncated.push_str(TRUNCATION_MARKER);
    truncated
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn snapshot_with_params(params: Map<String, Value>) -> ContextSnapshot {
        ContextSnapshot {
            hook: "before_tool_call".to_string(),
            agent_id: "main".to_string(),
            session_key: "agent:main:sess-1".to_string(),
            channel: None,
            tool_name: Some("exec".to_string()),
            tool_params: params,
            message_content: None,
            message_target: None,
            metadata: Map::new(),
        }
    }

    #[test]
    fn sensitive_keys_are_blanked() {
        let mut params = Map::new();
        params.insert("password".to_string(), json!("hunter2"));
        params.insert("apiKey".to_string(), json!("sk-123"));
        params.insert("API_KEY".to_string(), json!("sk-456"));
        params.insert("Authorization".to_string(), json!("Bearer abc"));
        params.insert("command".to_string(), json!("ls"));

        let redactor = Redactor::new(&[]);
        let out = redactor.redact(snapshot_with_params(params));

        assert_eq!(out.tool_params["password"], REDACTED);
        assert_eq!(out.tool_params["apiKey"], REDACTED);
        assert_eq!(out.tool_params["API_KEY"], REDACTED);
        assert_eq!(out.tool_params["Authorization"], REDACTED);
        assert_eq!(out.tool_params["command"], "ls");
    }

    #[test]
    fn key_match_is_whole_key_only() {
        let mut params = Map::new();
        params.insert("password_hint".to_string(), json!("my dog"));
        let redactor = Redactor::new(&[]);
        let out = redactor.redact(snapshot_with_params(params));
        assert_eq!(out.tool_params["password_hint"], "my dog");
    }

    #[test]
    fn nested_sensitive_keys_are_blanked() {
        let mut params = Map::new();
        params.insert(
            "options".to_string(),
            json!({ "token": "tok-1", "retries": 3 }),
        );
        let redactor = Redactor::new(&[]);
        let out = redactor.redact(snapshot_with_params(params));
        assert_eq!(out.tool_params["options"]["token"], REDACTED);
        assert_eq!(out.tool_params["options"]["retries"], 3);
    }

    #[test]
    fn long_messages_are_truncated_with_marker() {
        let redactor = Redactor::new(&[]);
        let mut snap = snapshot_with_params(Map::new());
        snap.message_content = Some("x".repeat(600));
        let out = redactor.redact(snap);
        let content = out.message_content.unwrap();
        assert!(content.ends_with(TRUNCATION_MARKER));
        assert_eq!(content.chars().count(), 500 + TRUNCATION_MARKER.chars().count());
    }

    #[test]
    fn short_messages_pass_through() {
        let redactor = Redactor::new(&[]);
        let mut snap = snapshot_with_params(Map::new());
        snap.message_content = Some("hello".to_string());
        let out = redactor.redact(snap);
        assert_eq!(out.message_content.as_deref(), Some("hello"));
    }

    #[test]
    fn user_patterns_scrub_string_leaves() {
        let mut params = Map::new();
        params.insert("command".to_string(), json!("curl -H 'X-Key: sk-abc123'"));
        params.insert("args".to_string(), json!(["sk-def456", "plain"]));

        let redactor = Redactor::new(&["sk-[a-z0-9]+".to_string()]);
        let mut snap = snapshot_with_params(params);
        snap.message_content = Some("the key is sk-topsecret".to_string());
        let out = redactor.redact(snap);

        assert_eq!(
            out.tool_params["command"],
            format!("curl -H 'X-Key: {}'", REDACTED)
        );
        assert_eq!(out.tool_params["args"][0], REDACTED);
        assert_eq!(out.tool_params["args"][1], "plain");
        assert_eq!(
            out.message_content.as_deref(),
            Some(format!("the key is {}", REDACTED).as_str())
        );
    }

    #[test]
    fn invalid_user_pattern_is_skipped() {
        let redactor = Redactor::new(&["[unclosed".to_string()]);
        let out = redactor.redact(snapshot_with_params(Map::new()));
        assert_eq!(out.agent_id, "main");
    }

    #[test]
    fn redaction_is_idempotent() {
        let mut params = Map::new();
        params.insert("secret".to_string(), json!("very secret"));
        params.insert("note".to_string(), json!("key sk-abc then text"));
        let redactor = Redactor::new(&["sk-[a-z0-9]+".to_string()]);

        let mut snap = snapshot_with_params(params);
        snap.message_content = Some("y".repeat(900));

        let once = redactor.redact(snap);
        let twice = redactor.redact(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn snapshot_round_trips() {
        let mut params = Map::new();
        params.insert("command".to_string(), json!("ls"));
        let snap = snapshot_with_params(params);
        let json = serde_json::to_string(&snap).unwrap();
        let restored: ContextSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, snap);
    }
}
