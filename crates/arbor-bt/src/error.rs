use thiserror::Error;

use crate::NodeId;

/// Wiring errors reported by the tree driver.
///
/// Runtime AI conditions (missing children, bad durations, absent callbacks)
/// never surface here; they make the node return `Failed`.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TreeError {
    #[error("top-level node index {index} out of range (tree has {len} top-level nodes)")]
    NodeIndexOutOfRange { index: usize, len: usize },

    #[error("node {0} is not in this tree's arena")]
    UnknownNode(NodeId),

    #[error("node {0} is already a top-level node")]
    DuplicateRoot(NodeId),

    #[error("cannot add top-level nodes after the tree has started ticking")]
    AlreadyStarted,
}

pub type Result<T> = std::result::Result<T, TreeError>;
