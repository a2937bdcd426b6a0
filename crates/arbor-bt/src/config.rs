use arbor_core::derive_seed;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// RNG stream reserved for behavior tree selection when deriving per-entity seeds.
pub const SELECTION_STREAM: u64 = 0xB7_5E1E;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct TreeConfig {
    /// Seed for the default `SplitMix64` random source.
    pub seed: u64,

    /// When no top-level node is `Running` after an update, soft-reset every
    /// top-level node so the tree starts over on the next tick.
    pub restart_when_idle: bool,

    /// Arena capacity reserved up front.
    pub initial_capacity: usize,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            restart_when_idle: true,
            initial_capacity: 64,
        }
    }
}

impl TreeConfig {
    /// Config for one AI-controlled entity; each entity gets its own selection stream.
    pub fn for_agent(global_seed: u64, agent_id: u64) -> Self {
        Self {
            seed: derive_seed(global_seed, agent_id, SELECTION_STREAM),
            ..Self::default()
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_restart_when_idle(mut self, restart: bool) -> Self {
        self.restart_when_idle = restart;
        self
    }
}
