//! Arena-backed behavior tree runtime built on `arbor-core`.
//!
//! Build a tree by inserting leaves first, then the composites and decorators
//! that refer to them by [`NodeId`], and register the top-level nodes:
//!
//! ```
//! use arbor_bt::{Action, Condition, NodeResult, Sequence, Tree};
//!
//! let mut tree = Tree::new();
//! let ready = tree.insert(Condition::new(|_, bb| bb.get_value("ready", false)));
//! let act = tree.insert(Action::new(|_, _| NodeResult::Succeeded));
//! let root = tree.add_node(Sequence::new(vec![ready, act])).unwrap();
//!
//! tree.blackboard_mut().set_value("ready", true);
//! tree.update(0.016);
//! assert_eq!(tree.node_result(0), Ok(NodeResult::Succeeded));
//! # let _ = root;
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]

pub mod arena;
pub mod bt;
pub mod config;
pub mod error;
pub mod node;
pub mod nodes;
pub mod registry;
pub mod tree;

pub use arena::{NodeArena, NodeStats};
pub use bt::{NodeId, NodeResult, ResetContext, ResetMode, RunContext};
pub use config::{TreeConfig, SELECTION_STREAM};
pub use error::{Result, TreeError};
pub use node::Node;
pub use nodes::{
    Action, BlackboardWatcher, Condition, FailureHandler, FailureHandlerData, FailureMode,
    ForceMode, ForceResult, Parallel, ParallelPolicy, PrioritySelector, RandomSelector,
    RepeatMode, Repeater, RepeaterData, Sequence, Timeout, TimeoutData, Wait, WaitData,
    WaitResetMode, WatchMode, WeightedChild, WeightedSelector, WeightedSelectorData,
};
pub use registry::{NodeCategory, NodeKind, NodeMeta, NodeRegistry};
pub use tree::Tree;
