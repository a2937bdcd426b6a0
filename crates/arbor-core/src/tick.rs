#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Per-tick timing supplied by the host loop.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TickContext {
    /// Monotonic tick counter, starting at 1 for the first update.
    pub tick: u64,
    /// Elapsed host time for this tick, in seconds.
    pub dt_seconds: f32,
}

impl TickContext {
    pub fn new(tick: u64, dt_seconds: f32) -> Self {
        Self { tick, dt_seconds }
    }
}
