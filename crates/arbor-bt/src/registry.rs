use std::collections::BTreeMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Tag for each node kind; mirrors the variants of [`crate::Node`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum NodeKind {
    Condition,
    Action,
    Wait,
    Sequence,
    PrioritySelector,
    RandomSelector,
    WeightedSelector,
    Parallel,
    Repeater,
    Timeout,
    ForceResult,
    FailureHandler,
    BlackboardWatcher,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum NodeCategory {
    /// No children.
    Leaf,
    /// Wraps one child (plus an optional fallback).
    Decorator,
    /// Owns an ordered list of children.
    Composite,
}

impl NodeKind {
    pub const ALL: [NodeKind; 13] = [
        NodeKind::Condition,
        NodeKind::Action,
        NodeKind::Wait,
        NodeKind::Sequence,
        NodeKind::PrioritySelector,
        NodeKind::RandomSelector,
        NodeKind::WeightedSelector,
        NodeKind::Parallel,
        NodeKind::Repeater,
        NodeKind::Timeout,
        NodeKind::ForceResult,
        NodeKind::FailureHandler,
        NodeKind::BlackboardWatcher,
    ];

    pub fn name(self) -> &'static str {
        match self {
            NodeKind::Condition => "Condition",
            NodeKind::Action => "Action",
            NodeKind::Wait => "Wait",
            NodeKind::Sequence => "Sequence",
            NodeKind::PrioritySelector => "PrioritySelector",
            NodeKind::RandomSelector => "RandomSelector",
            NodeKind::WeightedSelector => "WeightedSelector",
            NodeKind::Parallel => "Parallel",
            NodeKind::Repeater => "Repeater",
            NodeKind::Timeout => "Timeout",
            NodeKind::ForceResult => "ForceResult",
            NodeKind::FailureHandler => "FailureHandler",
            NodeKind::BlackboardWatcher => "BlackboardWatcher",
        }
    }

    pub fn category(self) -> NodeCategory {
        match self {
            NodeKind::Condition | NodeKind::Action | NodeKind::Wait => NodeCategory::Leaf,
            NodeKind::Sequence
            | NodeKind::PrioritySelector
            | NodeKind::RandomSelector
            | NodeKind::WeightedSelector
            | NodeKind::Parallel => NodeCategory::Composite,
            NodeKind::Repeater
            | NodeKind::Timeout
            | NodeKind::ForceResult
            | NodeKind::FailureHandler
            | NodeKind::BlackboardWatcher => NodeCategory::Decorator,
        }
    }

    /// Exposes children (decorators included).
    pub fn is_composite(self) -> bool {
        self.category() != NodeCategory::Leaf
    }

    pub fn is_resettable(self) -> bool {
        !matches!(self, NodeKind::Condition | NodeKind::Action)
    }

    /// Supports hot-reloading its parameters through a blackboard data key.
    pub fn is_preparable(self) -> bool {
        matches!(
            self,
            NodeKind::Wait
                | NodeKind::WeightedSelector
                | NodeKind::Repeater
                | NodeKind::Timeout
                | NodeKind::FailureHandler
        )
    }
}

/// Descriptive metadata for one node kind, for tooling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeMeta {
    pub kind: NodeKind,
    pub name: &'static str,
    pub category: NodeCategory,
    pub resettable: bool,
    pub preparable: bool,
    pub composite: bool,
    pub summary: &'static str,
}

impl NodeMeta {
    pub fn for_kind(kind: NodeKind, summary: &'static str) -> Self {
        Self {
            kind,
            name: kind.name(),
            category: kind.category(),
            resettable: kind.is_resettable(),
            preparable: kind.is_preparable(),
            composite: kind.is_composite(),
            summary,
        }
    }
}

/// Name -> metadata table, populated explicitly at construction.
#[derive(Debug, Clone, Default)]
pub struct NodeRegistry {
    by_name: BTreeMap<&'static str, NodeMeta>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every built-in node kind.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        for kind in NodeKind::ALL {
            registry.register(NodeMeta::for_kind(kind, summary(kind)));
        }
        registry
    }

    /// Insert or replace the entry for `meta.name`.
    pub fn register(&mut self, meta: NodeMeta) {
        self.by_name.insert(meta.name, meta);
    }

    pub fn get(&self, name: &str) -> Option<&NodeMeta> {
        self.by_name.get(name)
    }

    pub fn meta(&self, kind: NodeKind) -> Option<&NodeMeta> {
        self.by_name.get(kind.name())
    }

    pub fn resolve(&self, name: &str) -> Option<NodeKind> {
        self.get(name).map(|m| m.kind)
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &NodeMeta> {
        self.by_name.values()
    }
}

fn summary(kind: NodeKind) -> &'static str {
    match kind {
        NodeKind::Condition => "predicate over the blackboard",
        NodeKind::Action => "callback returning a result",
        NodeKind::Wait => "succeeds after a duration",
        NodeKind::Sequence => "children in order until one fails",
        NodeKind::PrioritySelector => "first child that does not fail",
        NodeKind::RandomSelector => "one uniformly random child",
        NodeKind::WeightedSelector => "one child drawn by weight",
        NodeKind::Parallel => "all unfinished children every tick",
        NodeKind::Repeater => "reruns a child under a policy",
        NodeKind::Timeout => "fails a child that runs too long",
        NodeKind::ForceResult => "inverts or overrides a result",
        NodeKind::FailureHandler => "skips, rethrows or catches failure",
        NodeKind::BlackboardWatcher => "restarts a child when a watched value changes",
    }
}
