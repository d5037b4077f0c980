// context.rs — The evaluation context.
//
// One EvaluationContext is assembled per hook dispatch and is immutable for
// the duration of that evaluation. It carries everything a condition may
// look at: the hook kind, agent identity, tool call or outbound message,
// a wall-clock snapshot in the configured zone, and the agent's trust at
// decision time.

use ag_trust::TrustSnapshot;
use ag_util::TimeContext;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The four synchronous extension points the host dispatches through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HookKind {
    BeforeToolCall,
    MessageSending,
    BeforeAgentStart,
    SessionStart,
}

impl HookKind {
    /// Every hook kind, in dispatch order.
    pub const ALL: [HookKind; 4] = [
        HookKind::BeforeToolCall,
        HookKind::MessageSending,
        HookKind::BeforeAgentStart,
        HookKind::SessionStart,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            HookKind::BeforeToolCall => "before_tool_call",
            HookKind::MessageSending => "message_sending",
            HookKind::BeforeAgentStart => "before_agent_start",
            HookKind::SessionStart => "session_start",
        }
    }
}

impl std::fmt::Display for HookKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything one evaluation can see. Immutable per call.
#[derive(Debug, Clone)]
pub struct EvaluationContext {
    pub hook: HookKind,
    pub agent_id: String,
    pub session_key: String,
    pub channel: Option<String>,

    /// Tool hooks only.
    pub tool_name: Option<String>,
    pub tool_params: Map<String, Value>,

    /// Message hooks only.
    pub message_content: Option<String>,
    pub message_target: Option<String>,

    /// Wall-clock snapshot in the configured zone, taken once per call.
    pub time: TimeContext,
    /// Monotonic timestamp at context assembly.
    pub ts_us: u64,

    /// The agent's trust at decision time.
    pub trust: TrustSnapshot,

    /// Recent conversation lines, bounded by the host's message cap.
    pub history: Vec<String>,
    pub metadata: Map<String, Value>,
}

impl EvaluationContext {
    pub fn new(
        hook: HookKind,
        agent_id: impl Into<String>,
        session_key: impl Into<String>,
        time: TimeContext,
        trust: TrustSnapshot,
    ) -> Self {
        Self {
            hook,
            agent_id: agent_id.into(),
            session_key: session_key.into(),
            channel: None,
            tool_name: None,
            tool_params: Map::new(),
            message_content: None,
            message_target: None,
            time,
            ts_us: ag_util::now_us(),
            trust,
            history: Vec::new(),
            metadata: Map::new(),
        }
    }

    pub fn with_channel(mut self, channel: impl Into<String>) -> Self {
        self.channel = Some(channel.into());
        self
    }

    pub fn with_tool(mut self, name: impl Into<String>, params: Map<String, Value>) -> Self {
        self.tool_name = Some(name.into());
        self.tool_params = params;
        self
    }

    pub fn with_message(
        mut self,
        content: impl Into<String>,
        target: Option<String>,
    ) -> Self {
        self.message_content = Some(content.into());
        self.message_target = target;
        self
    }

    pub fn with_history(mut self, history: Vec<String>) -> Self {
        self.history = history;
        self
    }

    pub fn with_metadata(mut self, metadata: Map<String, Value>) -> Self {
        self.metadata = metadata;
        self
    }
}
