// frequency.rs — Bounded frequency counter.
//
// A fixed-capacity ring of recent actions. Once the ring is full the oldest
// entry is overwritten, so counts become a lossy approximation under
// sustained load — the accepted trade-off for O(1) record and O(capacity)
// count with no unbounded growth.
//
// Timestamps are monotonic milliseconds; windows only ever compare
// relative age, never wall-clock.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// What a windowed count is keyed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrequencyScope {
    #[default]
    Agent,
    Session,
    Global,
}

#[derive(Debug, Clone)]
struct Slot {
    ts_ms: u64,
    agent_id: String,
    session_key: String,
    #[allow(dead_code)]
    tool_name: String,
}

struct Ring {
    slots: Vec<Slot>,
    head: usize,
    capacity: usize,
}

/// Mutex-guarded ring of recent actions.
pub struct FrequencyCounter {
    inner: Mutex<Ring>,
}

impl FrequencyCounter {
    /// Capacity 0 is coerced to 1 — a counter must hold at least one entry.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            inner: Mutex::new(Ring {
                slots: Vec::with_capacity(capacity.min(1024)),
                head: 0,
                capacity,
            }),
        }
    }

    /// Record an action now.
    pub fn record(&self, agent_id: &str, session_key: &str, tool_name: &str) {
        self.record_at(ag_util::now_ms(), agent_id, session_key, tool_name);
    }

    /// Record an action at an explicit monotonic timestamp.
    pub fn record_at(&self, ts_ms: u64, agent_id: &str, session_key: &str, tool_name: &str) {
        let slot = Slot {
            ts_ms,
            agent_id: agent_id.to_string(),
            session_key: session_key.to_string(),
            tool_name: tool_name.to_string(),
        };
        let mut ring = self.inner.lock();
        if ring.slots.len() < ring.capacity {
            ring.slots.push(slot);
        } else {
            let head = ring.head;
            ring.slots[head] = slot;
        }
        ring.head = (ring.head + 1) % ring.capacity;
    }

    /// Count recorded actions inside the window that match the scope.
    pub fn count(
        &self,
        window_seconds: u64,
        scope: FrequencyScope,
        agent_id: &str,
        session_key: &str,
    ) -> usize {
        self.count_at(ag_util::now_ms(), window_seconds, scope, agent_id, session_key)
    }

    /// Count against an explicit monotonic "now".
    pub fn count_at(
        &self,
        now_ms: u64,
        window_seconds: u64,
        scope: FrequencyScope,
        agent_id: &str,
        session_key: &str,
    ) -> usize {
        let window_ms = window_seconds.saturating_mul(1000);
        let cutoff = now_ms.saturating_sub(window_ms);
        let ring = self.inner.lock();
        ring.slots
            .iter()
            .filter(|slot| slot.ts_ms >= cutoff && slot.ts_ms <= now_ms)
            .filter(|slot| match scope {
                FrequencyScope::Agent => slot.agent_id == agent_id,
                FrequencyScope::Session => slot.session_key == session_key,
                FrequencyScope::Global => true,
            })
            .count()
    }

    /// Drop every recorded entry.
    pub fn clear(&self) {
        let mut ring = self.inner.lock();
        ring.slots.clear();
        ring.head = 0;
    }
}
