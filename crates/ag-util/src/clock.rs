// clock.rs — Monotonic microsecond clock.
//
// Evaluation cost accounting needs a clock that never goes backwards.
// `now_us` counts microseconds from a process-local epoch (first call);
// it is never a wall clock and must not be persisted as one.

use std::sync::OnceLock;
use std::time::Instant;

static EPOCH: OnceLock<Instant> = OnceLock::new();

/// Monotonic microseconds since an arbitrary process-local epoch.
pub fn now_us() -> u64 {
    EPOCH.get_or_init(Instant::now).elapsed().as_micros() as u64
}

/// Monotonic milliseconds, derived from [`now_us`].
pub fn now_ms() -> u64 {
    now_us() / 1000
}
