use std::fmt;

use arbor_core::{Blackboard, DeterministicRng, TickContext};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Outcome of running a node for one tick.
///
/// There is no "aborted" state: an interrupted node is reset by its parent and
/// reported as `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum NodeResult {
    Running,
    Succeeded,
    Failed,
}

impl NodeResult {
    pub fn is_running(self) -> bool {
        self == NodeResult::Running
    }

    pub fn is_done(self) -> bool {
        self != NodeResult::Running
    }

    /// Stable numeric code used in trace events.
    pub fn code(self) -> u64 {
        match self {
            NodeResult::Running => 0,
            NodeResult::Succeeded => 1,
            NodeResult::Failed => 2,
        }
    }
}

impl From<bool> for NodeResult {
    fn from(value: bool) -> Self {
        if value {
            NodeResult::Succeeded
        } else {
            NodeResult::Failed
        }
    }
}

/// How much state a reset clears. Each node kind decides what its run state is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ResetMode {
    /// Run state and accumulated statistics; forwarded to every child.
    #[default]
    Full,
    /// Interrupt: run state only, forwarded to active children only.
    Partial,
    /// Run state only, forwarded to every child.
    Soft,
}

impl ResetMode {
    pub fn clears_stats(self) -> bool {
        self == ResetMode::Full
    }
}

/// Index of a node in its tree's arena.
///
/// Every child link is a `NodeId`; nodes are never copied, so run state has
/// exactly one owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

pub struct RunContext<'a> {
    pub tick: TickContext,
    pub blackboard: &'a mut Blackboard,
    pub rng: &'a mut dyn DeterministicRng,
}

impl RunContext<'_> {
    pub fn dt(&self) -> f32 {
        self.tick.dt_seconds
    }

    pub fn reset_context(&mut self, mode: ResetMode) -> ResetContext<'_> {
        ResetContext {
            blackboard: &mut *self.blackboard,
            mode,
        }
    }
}

pub struct ResetContext<'a> {
    pub blackboard: &'a mut Blackboard,
    pub mode: ResetMode,
}
