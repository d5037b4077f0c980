// hooks.rs — Host hook adapters.
//
// The host runtime dispatches four synchronous hooks. Each adapter turns
// the host's event payload into a fully-populated EvaluationContext,
// evaluates it, and maps the verdict onto the action the host understands
// (block with reason, cancel, proceed, or hold for approval).

use serde_json::{Map, Value};

use crate::engine::GovernanceEngine;
use crate::verdict::{Action, Verdict};
use ag_policy::{EscalationFallback, HookKind};
use ag_util::extract_agent_id;

/// A tool invocation about to run.
#[derive(Debug, Clone)]
pub struct ToolCallEvent {
    pub agent_id: String,
    pub session_key: String,
    pub channel: Option<String>,
    pub tool_name: String,
    pub params: Map<String, Value>,
    pub history: Vec<String>,
    pub metadata: Map<String, Value>,
}

/// An outbound message about to send.
#[derive(Debug, Clone)]
pub struct MessageEvent {
    pub agent_id: String,
    pub session_key: String,
    pub channel: Option<String>,
    pub content: String,
    pub target: Option<String>,
    pub history: Vec<String>,
}

/// An agent about to start.
#[derive(Debug, Clone)]
pub struct AgentStartEvent {
    pub agent_id: String,
    pub session_key: String,
    pub channel: Option<String>,
    pub metadata: Map<String, Value>,
}

/// A session about to open. The agent id is parsed from the session key.
#[derive(Debug, Clone)]
pub struct SessionStartEvent {
    pub session_key: String,
    pub channel: Option<String>,
}

/// What the host should do with the pending action.
#[derive(Debug, Clone, PartialEq)]
pub enum HostDecision {
    Proceed,
    Block { reason: String },
    Cancel { reason: String },
    HoldForApproval {
        target: String,
        timeout_ms: u64,
        fallback: EscalationFallback,
        reason: String,
    },
}

impl GovernanceEngine {
    /// `before_tool_call`: deny maps to "block with reason".
    pub fn on_before_tool_call(&self, event: ToolCallEvent) -> (Verdict, HostDecision) {
        let ctx = self
            .make_context(HookKind::BeforeToolCall, &event.agent_id, &event.session_key)
            .with_tool(event.tool_name, event.params)
            .with_history(self.clip_history(event.history))
            .with_metadata(event.metadata);
        let ctx = match event.channel {
            Some(channel) => ctx.with_channel(channel),
            None => ctx,
        };
        let verdict = self.evaluate(ctx);
        let decision = blocking_decision(&verdict);
        (verdict, decision)
    }

    /// `message_sending`: deny maps to "cancel".
    pub fn on_message_sending(&self, event: MessageEvent) -> (Verdict, HostDecision) {
        let ctx = self
            .make_context(HookKind::MessageSending, &event.agent_id, &event.session_key)
            .with_message(event.content, event.target)
            .with_history(self.clip_history(event.history));
        let ctx = match event.channel {
            Some(channel) => ctx.with_channel(channel),
            None => ctx,
        };
        let verdict = self.evaluate(ctx);
        let decision = match &verdict.action {
            Action::Allow => HostDecision::Proceed,
            Action::Deny => HostDecision::Cancel {
                reason: verdict.reason.clone(),
            },
            Action::Escalate {
                target,
                timeout_ms,
                fallback,
            } => HostDecision::HoldForApproval {
                target: target.clone(),
                timeout_ms: *timeout_ms,
                fallback: *fallback,
                reason: verdict.reason.clone(),
            },
        };
        (verdict, decision)
    }

    /// `before_agent_start`.
    pub fn on_before_agent_start(&self, event: AgentStartEvent) -> (Verdict, HostDecision) {
        let ctx = self
            .make_context(
                HookKind::BeforeAgentStart,
                &event.agent_id,
                &event.session_key,
            )
            .with_metadata(event.metadata);
        let ctx = match event.channel {
            Some(channel) => ctx.with_channel(channel),
            None => ctx,
        };
        let verdict = self.evaluate(ctx);
        let decision = blocking_decision(&verdict);
        (verdict, decision)
    }

    /// `session_start`: the agent id comes out of the session key.
    pub fn on_session_start(&self, event: SessionStartEvent) -> (Verdict, HostDecision) {
        let agent_id = extract_agent_id(&event.session_key, "unknown");
        let ctx = self.make_context(HookKind::SessionStart, &agent_id, &event.session_key);
        let ctx = match event.channel {
            Some(channel) => ctx.with_channel(channel),
            None => ctx,
        };
        let verdict = self.evaluate(ctx);
        let decision = blocking_decision(&verdict);
        (verdict, decision)
    }
}

fn blocking_decision(verdict: &Verdict) -> HostDecision {
    match &verdict.action {
        Action::Allow => HostDecision::Proceed,
        Action::Deny => HostDecision::Block {
            reason: verdict.reason.clone(),
        },
        Action::Escalate {
            target,
            timeout_ms,
            fallback,
        } => HostDecision::HoldForApproval {
            target: target.clone(),
            timeout_ms: *timeout_ms,
            fallback: *fallback,
            reason: verdict.reason.clone(),
        },
    }
}
