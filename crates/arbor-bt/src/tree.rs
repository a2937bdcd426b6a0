use std::fmt;

use arbor_core::{Blackboard, DeterministicRng, SplitMix64, TickContext};
use arbor_tools::{emit as trace_emit, tags, TraceEvent};
use tracing::{debug, info, trace};

use crate::arena::{NodeArena, NodeStats};
use crate::bt::{NodeId, NodeResult, ResetContext, ResetMode, RunContext};
use crate::config::TreeConfig;
use crate::error::{Result, TreeError};
use crate::node::Node;
use crate::registry::NodeRegistry;

type ResultObserver = Box<dyn FnMut(NodeId, NodeResult)>;

#[derive(Debug, Clone, Copy)]
struct RootEntry {
    id: NodeId,
    last_result: NodeResult,
}

/// Drives one behavior tree instance.
///
/// Owns the node arena, the blackboard and the random source. Top-level
/// ("root") nodes run once per [`Tree::update`], in the order they were added.
pub struct Tree {
    config: TreeConfig,
    arena: NodeArena,
    roots: Vec<RootEntry>,
    blackboard: Blackboard,
    rng: Box<dyn DeterministicRng>,
    registry: NodeRegistry,
    observers: Vec<ResultObserver>,
    paused: bool,
    started: bool,
    tick: u64,
}

impl fmt::Debug for Tree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tree")
            .field("config", &self.config)
            .field("nodes", &self.arena.len())
            .field("roots", &self.roots)
            .field("paused", &self.paused)
            .field("tick", &self.tick)
            .finish_non_exhaustive()
    }
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}

impl Tree {
    pub fn new() -> Self {
        Self::with_config(TreeConfig::default())
    }

    pub fn with_config(config: TreeConfig) -> Self {
        Self {
            config,
            arena: NodeArena::with_capacity(config.initial_capacity),
            roots: Vec::new(),
            blackboard: Blackboard::new(),
            rng: Box::new(SplitMix64::new(config.seed)),
            registry: NodeRegistry::builtin(),
            observers: Vec::new(),
            paused: false,
            started: false,
            tick: 0,
        }
    }

    /// Replace the blackboard (e.g. one pre-populated by sensors).
    pub fn with_blackboard(mut self, blackboard: Blackboard) -> Self {
        self.blackboard = blackboard;
        self
    }

    /// Replace the random source used by selector nodes.
    pub fn with_rng(mut self, rng: impl DeterministicRng + 'static) -> Self {
        self.rng = Box::new(rng);
        self
    }

    /// Place a node in the arena without making it top-level.
    ///
    /// Children must be inserted before the parents that refer to them.
    pub fn insert(&mut self, node: impl Into<Node>) -> NodeId {
        self.arena.insert(node.into(), None)
    }

    /// Like [`Tree::insert`], with a label shown in active paths and logs.
    pub fn insert_named(&mut self, label: impl Into<String>, node: impl Into<Node>) -> NodeId {
        self.arena.insert(node.into(), Some(label.into()))
    }

    /// Insert a node and register it as a top-level node.
    pub fn add_node(&mut self, node: impl Into<Node>) -> Result<NodeId> {
        if self.started {
            return Err(TreeError::AlreadyStarted);
        }
        let id = self.insert(node);
        self.add_root(id)?;
        Ok(id)
    }

    /// Register an already inserted node as a top-level node.
    pub fn add_root(&mut self, id: NodeId) -> Result<()> {
        if self.started {
            return Err(TreeError::AlreadyStarted);
        }
        if !self.arena.contains(id) {
            return Err(TreeError::UnknownNode(id));
        }
        if self.roots.iter().any(|r| r.id == id) {
            return Err(TreeError::DuplicateRoot(id));
        }
        self.roots.push(RootEntry {
            id,
            last_result: NodeResult::Running,
        });
        Ok(())
    }

    /// Call `observer` whenever a top-level node's result differs from the
    /// previous tick's.
    pub fn on_node_result_changed(&mut self, observer: impl FnMut(NodeId, NodeResult) + 'static) {
        self.observers.push(Box::new(observer));
    }

    /// Advance the tree by one tick of `dt_seconds`.
    ///
    /// No-op while paused or when there are no top-level nodes.
    pub fn update(&mut self, dt_seconds: f32) {
        if self.paused {
            trace!("tree paused, update skipped");
            return;
        }
        if self.roots.is_empty() {
            return;
        }

        self.started = true;
        self.tick = self.tick.wrapping_add(1);
        trace!(tick = self.tick, dt = dt_seconds, "tree update");

        let mut changed = Vec::new();
        let mut ctx = RunContext {
            tick: TickContext::new(self.tick, dt_seconds),
            blackboard: &mut self.blackboard,
            rng: &mut *self.rng,
        };
        for root in &mut self.roots {
            let result = self.arena.run(root.id, &mut ctx);
            if result != root.last_result {
                root.last_result = result;
                changed.push((root.id, result));
            }
        }

        for (id, result) in changed {
            self.notify(id, result);
        }

        let any_running = self.roots.iter().any(|r| r.last_result.is_running());
        if !any_running && self.config.restart_when_idle {
            debug!(tick = self.tick, "no top-level node running, restarting tree");
            self.reset_roots(ResetMode::Soft, false);
        }
    }

    fn notify(&mut self, id: NodeId, result: NodeResult) {
        debug!(
            tick = self.tick,
            node = %self.arena.display_name(id),
            ?result,
            "node result changed"
        );
        trace_emit(
            &mut self.blackboard,
            TraceEvent::new(self.tick, tags::RESULT_CHANGED)
                .with_a(id.index() as u64)
                .with_b(result.code()),
        );
        for observer in &mut self.observers {
            observer(id, result);
        }
    }

    /// Run one arena node outside the regular update, at the current tick.
    pub fn run_node(&mut self, id: NodeId, dt_seconds: f32) -> Result<NodeResult> {
        if !self.arena.contains(id) {
            return Err(TreeError::UnknownNode(id));
        }
        let mut ctx = RunContext {
            tick: TickContext::new(self.tick, dt_seconds),
            blackboard: &mut self.blackboard,
            rng: &mut *self.rng,
        };
        Ok(self.arena.run(id, &mut ctx))
    }

    /// Fully reset the top-level node at `index` (insertion order).
    pub fn reset_node(&mut self, index: usize) -> Result<()> {
        let len = self.roots.len();
        let root = self
            .roots
            .get_mut(index)
            .ok_or(TreeError::NodeIndexOutOfRange { index, len })?;
        root.last_result = NodeResult::Running;
        let id = root.id;

        let mut ctx = ResetContext {
            blackboard: &mut self.blackboard,
            mode: ResetMode::Full,
        };
        self.arena.reset(id, &mut ctx);
        Ok(())
    }

    /// Reset every top-level node (and through them, their subtrees).
    pub fn reset_all_nodes(&mut self, mode: ResetMode) {
        self.reset_roots(mode, true);
    }

    /// The idle restart keeps recorded results; explicit resets forget them.
    fn reset_roots(&mut self, mode: ResetMode, forget_results: bool) {
        let mut ctx = ResetContext {
            blackboard: &mut self.blackboard,
            mode,
        };
        for root in &mut self.roots {
            self.arena.reset(root.id, &mut ctx);
            if forget_results {
                root.last_result = NodeResult::Running;
            }
        }
    }

    /// Result the top-level node at `index` returned on the last tick.
    ///
    /// `Running` before the first tick and after a reset.
    pub fn node_result(&self, index: usize) -> Result<NodeResult> {
        self.roots
            .get(index)
            .map(|r| r.last_result)
            .ok_or(TreeError::NodeIndexOutOfRange {
                index,
                len: self.roots.len(),
            })
    }

    /// Linear scan over every node in the arena.
    pub fn find_nodes(&self, mut predicate: impl FnMut(&Node) -> bool) -> Vec<NodeId> {
        self.arena
            .iter()
            .filter(|&(_, node)| predicate(node))
            .map(|(id, _)| id)
            .collect()
    }

    /// Nodes whose kind is registered under `name`. Unknown names match nothing.
    pub fn find_nodes_of_kind(&self, name: &str) -> Vec<NodeId> {
        match self.registry.resolve(name) {
            Some(kind) => self.find_nodes(|node| node.kind() == kind),
            None => Vec::new(),
        }
    }

    pub fn pause(&mut self) {
        if !self.paused {
            info!(tick = self.tick, "tree paused");
        }
        self.paused = true;
    }

    pub fn resume(&mut self) {
        if self.paused {
            info!(tick = self.tick, "tree resumed");
        }
        self.paused = false;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Currently executing branches, one `/`-separated path per branch.
    ///
    /// Each path starts at a running top-level node and follows active
    /// children down to a node with none. Empty before the first update.
    pub fn active_path(&self) -> Vec<String> {
        let mut paths = Vec::new();
        if !self.started {
            return paths;
        }
        for root in self.roots.iter().filter(|r| r.last_result.is_running()) {
            let mut prefix = Vec::new();
            self.collect_paths(root.id, &mut prefix, &mut paths);
        }
        paths
    }

    fn collect_paths(&self, id: NodeId, prefix: &mut Vec<String>, out: &mut Vec<String>) {
        prefix.push(self.arena.display_name(id));

        let children = self.arena.active_children(id);
        // A cycle in the wiring cannot be deeper than the arena.
        if children.is_empty() || prefix.len() > self.arena.len() {
            out.push(prefix.join("/"));
        } else {
            for child in children {
                self.collect_paths(child, prefix, out);
            }
        }

        prefix.pop();
    }

    pub fn roots(&self) -> Vec<NodeId> {
        self.roots.iter().map(|r| r.id).collect()
    }

    pub fn root_count(&self) -> usize {
        self.roots.len()
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.arena.get(id)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.arena.get_mut(id)
    }

    pub fn stats(&self, id: NodeId) -> Option<NodeStats> {
        self.arena.stats(id)
    }

    pub fn label(&self, id: NodeId) -> Option<&str> {
        self.arena.label(id)
    }

    pub fn blackboard(&self) -> &Blackboard {
        &self.blackboard
    }

    pub fn blackboard_mut(&mut self) -> &mut Blackboard {
        &mut self.blackboard
    }

    /// Number of updates that actually ran.
    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    pub fn arena(&self) -> &NodeArena {
        &self.arena
    }

    pub fn registry(&self) -> &NodeRegistry {
        &self.registry
    }

    pub fn config(&self) -> &TreeConfig {
        &self.config
    }
}
