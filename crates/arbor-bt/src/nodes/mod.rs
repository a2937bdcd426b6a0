//! Concrete node kinds.

pub mod composite;
pub mod decorator;
pub mod leaf;

use arbor_core::Blackboard;

pub use composite::{
    Parallel, ParallelPolicy, PrioritySelector, RandomSelector, Sequence, WeightedChild,
    WeightedSelector, WeightedSelectorData,
};
pub use decorator::{
    BlackboardWatcher, FailureHandler, FailureHandlerData, FailureMode, ForceMode, ForceResult,
    RepeatMode, Repeater, RepeaterData, Timeout, TimeoutData, WatchMode,
};
pub use leaf::{Action, Condition, Wait, WaitData, WaitResetMode};

/// Read a node's hot-reloadable parameters from the blackboard.
pub(crate) fn load_data<T: Clone + 'static>(key: Option<&str>, bb: &Blackboard) -> Option<T> {
    bb.value::<T>(key?).cloned()
}

/// `false` for zero, negative and NaN durations.
pub(crate) fn is_positive(seconds: f32) -> bool {
    seconds > 0.0
}
