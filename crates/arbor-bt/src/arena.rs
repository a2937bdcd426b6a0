use tracing::warn;

use crate::bt::{NodeId, NodeResult, ResetContext, ResetMode, RunContext};
use crate::node::Node;

/// Per-node counters accumulated across activations.
///
/// Survive `Soft` and `Partial` resets; cleared by `Full`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NodeStats {
    pub runs: u64,
    pub successes: u64,
    pub failures: u64,
    pub running: u64,
}

impl NodeStats {
    fn record(&mut self, result: NodeResult) {
        self.runs = self.runs.saturating_add(1);
        let counter = match result {
            NodeResult::Running => &mut self.running,
            NodeResult::Succeeded => &mut self.successes,
            NodeResult::Failed => &mut self.failures,
        };
        *counter = counter.saturating_add(1);
    }
}

#[derive(Debug)]
struct Slot {
    /// `None` while the node is being run or reset.
    node: Option<Node>,
    label: Option<String>,
    stats: NodeStats,
}

/// Flat storage owning every node of one tree.
///
/// A node is checked out of its slot while it runs, which lets it run its
/// children through `&mut NodeArena`. A node that (directly or indirectly)
/// lists itself as a child finds its slot empty and fails instead of recursing.
#[derive(Debug, Default)]
pub struct NodeArena {
    slots: Vec<Slot>,
}

impl NodeArena {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
        }
    }

    pub fn insert(&mut self, node: Node, label: Option<String>) -> NodeId {
        let id = NodeId(self.slots.len());
        self.slots.push(Slot {
            node: Some(node),
            label,
            stats: NodeStats::default(),
        });
        id
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        id.0 < self.slots.len()
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.slots.get(id.0)?.node.as_ref()
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.slots.get_mut(id.0)?.node.as_mut()
    }

    pub fn label(&self, id: NodeId) -> Option<&str> {
        self.slots.get(id.0)?.label.as_deref()
    }

    pub fn stats(&self, id: NodeId) -> Option<NodeStats> {
        self.slots.get(id.0).map(|s| s.stats)
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.node.as_ref().map(|n| (NodeId(i), n)))
    }

    /// Label if one was given, otherwise the kind name.
    pub fn display_name(&self, id: NodeId) -> String {
        match (self.label(id), self.get(id)) {
            (Some(label), Some(node)) => format!("{}({label})", node.kind().name()),
            (None, Some(node)) => node.kind().name().to_string(),
            _ => format!("<missing {id}>"),
        }
    }

    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        self.get(id).map(Node::children).unwrap_or_default()
    }

    pub fn active_children(&self, id: NodeId) -> Vec<NodeId> {
        self.get(id).map(Node::active_children).unwrap_or_default()
    }

    fn check_out(&mut self, id: NodeId) -> Option<Node> {
        let Some(slot) = self.slots.get_mut(id.0) else {
            warn!(node = %id, "node id out of range");
            return None;
        };
        let node = slot.node.take();
        if node.is_none() {
            warn!(node = %id, "node re-entered while already running");
        }
        node
    }

    /// Prepare then run one node. Missing or re-entrant nodes fail.
    pub fn run(&mut self, id: NodeId, ctx: &mut RunContext<'_>) -> NodeResult {
        let Some(mut node) = self.check_out(id) else {
            return NodeResult::Failed;
        };

        node.prepare(&*ctx.blackboard);
        let result = node.run(self, ctx);

        let slot = &mut self.slots[id.0];
        slot.node = Some(node);
        slot.stats.record(result);
        result
    }

    pub fn reset(&mut self, id: NodeId, ctx: &mut ResetContext<'_>) {
        let Some(mut node) = self.check_out(id) else {
            return;
        };

        node.reset(self, ctx);

        let slot = &mut self.slots[id.0];
        slot.node = Some(node);
        if ctx.mode.clears_stats() {
            slot.stats = NodeStats::default();
        }
    }

    /// Forward a reset to children: every child for `Full`/`Soft`, only the
    /// active ones for `Partial`.
    pub fn reset_children(&mut self, all: &[NodeId], active: &[NodeId], ctx: &mut ResetContext<'_>) {
        self.reset_progress(all, active, &[], ctx);
    }

    /// Like [`NodeArena::reset_children`] for nodes that remember finished
    /// children within an activation. An interrupt also soft-resets
    /// `finished`, so the next activation runs them again from scratch.
    pub fn reset_progress(
        &mut self,
        all: &[NodeId],
        active: &[NodeId],
        finished: &[NodeId],
        ctx: &mut ResetContext<'_>,
    ) {
        match ctx.mode {
            ResetMode::Partial => {
                for &child in active {
                    self.reset(child, ctx);
                }
                let mut soft = ResetContext {
                    blackboard: &mut *ctx.blackboard,
                    mode: ResetMode::Soft,
                };
                for &child in finished {
                    self.reset(child, &mut soft);
                }
            }
            ResetMode::Full | ResetMode::Soft => {
                for &child in all {
                    self.reset(child, ctx);
                }
            }
        }
    }
}
