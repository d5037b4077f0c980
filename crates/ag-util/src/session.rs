// session.rs — Session-key parsing.
//
// The host encodes the owning agent into session keys as
// `agent:<id>[:subagent:<name>...]`. Anything else (raw UUIDs, channel
// keys) falls back to whatever agent id the hook already carried.

/// Extract the agent id from an `agent:<id>[:...]`-shaped session key.
///
/// Returns `fallback` when the key does not match the pattern or the id
/// segment is empty.
pub fn extract_agent_id(session_key: &str, fallback: &str) -> String {
    match session_key.strip_prefix("agent:") {
        Some(rest) => {
            let id = rest.split(':').next().unwrap_or_default();
            if id.is_empty() {
                fallback.to_string()
            } else {
                id.to_string()
            }
        }
        None => fallback.to_string(),
    }
}
