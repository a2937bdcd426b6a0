use arbor_core::Blackboard;
use arbor_tools::{emit as trace_emit, tags, TraceEvent};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::arena::NodeArena;
use crate::bt::{NodeId, NodeResult, ResetContext, ResetMode, RunContext};
use crate::nodes::load_data;

/// Runs children left to right, resuming from the child that was running.
///
/// A failing child restarts the whole sequence on the next activation.
#[derive(Debug, Clone)]
pub struct Sequence {
    children: Vec<NodeId>,
    cursor: usize,
    running: bool,
}

impl Sequence {
    pub fn new(children: Vec<NodeId>) -> Self {
        Self {
            children,
            cursor: 0,
            running: false,
        }
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub(crate) fn active_children(&self) -> Vec<NodeId> {
        if !self.running {
            return Vec::new();
        }
        self.children.get(self.cursor).copied().into_iter().collect()
    }

    /// Children that already succeeded in the running activation.
    fn finished_children(&self) -> &[NodeId] {
        if !self.running {
            return &[];
        }
        &self.children[..self.cursor.min(self.children.len())]
    }

    pub(crate) fn run(&mut self, arena: &mut NodeArena, ctx: &mut RunContext<'_>) -> NodeResult {
        if self.children.is_empty() {
            return NodeResult::Failed;
        }

        while self.cursor < self.children.len() {
            match arena.run(self.children[self.cursor], ctx) {
                NodeResult::Running => {
                    self.running = true;
                    return NodeResult::Running;
                }
                NodeResult::Failed => {
                    self.cursor = 0;
                    self.running = false;
                    return NodeResult::Failed;
                }
                NodeResult::Succeeded => self.cursor += 1,
            }
        }

        self.cursor = 0;
        self.running = false;
        NodeResult::Succeeded
    }

    pub(crate) fn reset(&mut self, arena: &mut NodeArena, ctx: &mut ResetContext<'_>) {
        let active = self.active_children();
        let finished = self.finished_children().to_vec();
        self.cursor = 0;
        self.running = false;
        arena.reset_progress(&self.children, &active, &finished, ctx);
    }
}

/// First child (in listed order) that does not fail wins.
///
/// When a higher-priority child takes over from a running lower-priority one,
/// the preempted branch is interrupted with a `Partial` reset.
#[derive(Debug, Clone)]
pub struct PrioritySelector {
    children: Vec<NodeId>,
    running: Option<usize>,
}

impl PrioritySelector {
    pub fn new(children: Vec<NodeId>) -> Self {
        Self {
            children,
            running: None,
        }
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Index of the child that returned `Running` on the last tick.
    pub fn running_index(&self) -> Option<usize> {
        self.running
    }

    pub(crate) fn active_children(&self) -> Vec<NodeId> {
        self.running
            .and_then(|i| self.children.get(i).copied())
            .into_iter()
            .collect()
    }

    pub(crate) fn run(&mut self, arena: &mut NodeArena, ctx: &mut RunContext<'_>) -> NodeResult {
        for (i, &child) in self.children.iter().enumerate() {
            let result = arena.run(child, ctx);
            if result == NodeResult::Failed {
                continue;
            }

            if let Some(prev) = self.running {
                if prev > i {
                    tracing::debug!(preempted = prev, by = i, "priority selector preempted branch");
                    if let Some(&preempted) = self.children.get(prev) {
                        arena.reset(preempted, &mut ctx.reset_context(ResetMode::Partial));
                    }
                }
            }
            self.running = result.is_running().then_some(i);
            return result;
        }

        self.running = None;
        NodeResult::Failed
    }

    pub(crate) fn reset(&mut self, arena: &mut NodeArena, ctx: &mut ResetContext<'_>) {
        let active = self.active_children();
        self.running = None;
        arena.reset_children(&self.children, &active, ctx);
    }
}

/// Picks one child uniformly at random and sticks with it until it completes.
#[derive(Debug, Clone)]
pub struct RandomSelector {
    children: Vec<NodeId>,
    selected: Option<usize>,
}

impl RandomSelector {
    pub fn new(children: Vec<NodeId>) -> Self {
        Self {
            children,
            selected: None,
        }
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    pub(crate) fn active_children(&self) -> Vec<NodeId> {
        self.selected
            .and_then(|i| self.children.get(i).copied())
            .into_iter()
            .collect()
    }

    pub(crate) fn run(&mut self, arena: &mut NodeArena, ctx: &mut RunContext<'_>) -> NodeResult {
        if self.children.is_empty() {
            return NodeResult::Failed;
        }

        let index = match self.selected {
            Some(i) if i < self.children.len() => i,
            _ => {
                let i = ctx.rng.next_below(self.children.len());
                self.selected = Some(i);
                i
            }
        };

        let result = arena.run(self.children[index], ctx);
        if result.is_done() {
            self.selected = None;
        }
        result
    }

    pub(crate) fn reset(&mut self, arena: &mut NodeArena, ctx: &mut ResetContext<'_>) {
        let active = self.active_children();
        self.selected = None;
        arena.reset_children(&self.children, &active, ctx);
    }
}

/// One weighted branch. A `None` child is skipped by selection.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct WeightedChild {
    pub child: Option<NodeId>,
    pub weight: f64,
}

impl WeightedChild {
    pub fn new(child: NodeId, weight: f64) -> Self {
        Self {
            child: Some(child),
            weight,
        }
    }

    /// Negative and NaN weights count as zero.
    pub fn effective_weight(&self) -> f64 {
        if self.weight > 0.0 {
            self.weight
        } else {
            0.0
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct WeightedSelectorData {
    pub children: Vec<WeightedChild>,
}

/// Picks a child with probability proportional to its weight and sticks with
/// it until it completes.
///
/// Non-positive weights count as zero, and a zero-weight child is never drawn
/// while any weight is positive (not even for a draw of exactly `0.0`). When no
/// child has a positive weight the choice is uniform over the children that
/// exist.
#[derive(Debug, Clone)]
pub struct WeightedSelector {
    data: WeightedSelectorData,
    data_key: Option<String>,
    selected: Option<usize>,
}

impl WeightedSelector {
    pub fn new(children: Vec<WeightedChild>) -> Self {
        Self::from_data(WeightedSelectorData { children })
    }

    pub fn from_data(data: WeightedSelectorData) -> Self {
        Self {
            data,
            data_key: None,
            selected: None,
        }
    }

    /// Re-read `WeightedSelectorData` from this blackboard key before every run.
    pub fn with_data_key(mut self, key: impl Into<String>) -> Self {
        self.data_key = Some(key.into());
        self
    }

    pub fn data(&self) -> &WeightedSelectorData {
        &self.data
    }

    pub fn data_key(&self) -> Option<&str> {
        self.data_key.as_deref()
    }

    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    pub(crate) fn children(&self) -> Vec<NodeId> {
        self.data.children.iter().filter_map(|c| c.child).collect()
    }

    pub(crate) fn active_children(&self) -> Vec<NodeId> {
        self.selected
            .and_then(|i| self.data.children.get(i))
            .and_then(|c| c.child)
            .into_iter()
            .collect()
    }

    pub(crate) fn prepare(&mut self, bb: &Blackboard) {
        if let Some(data) = load_data(self.data_key.as_deref(), bb) {
            self.data = data;
        }
    }

    fn total_weight(&self) -> f64 {
        self.data
            .children
            .iter()
            .filter(|c| c.child.is_some())
            .map(WeightedChild::effective_weight)
            .sum()
    }

    /// Choose a child index; `None` when no child exists.
    fn pick(&self, ctx: &mut RunContext<'_>) -> Option<usize> {
        let total = self.total_weight();

        if total <= 0.0 {
            let valid: Vec<usize> = self
                .data
                .children
                .iter()
                .enumerate()
                .filter(|(_, c)| c.child.is_some())
                .map(|(i, _)| i)
                .collect();
            if valid.is_empty() {
                return None;
            }
            return Some(valid[ctx.rng.next_below(valid.len())]);
        }

        let draw = ctx.rng.next_f64_unit() * total;
        let mut cumulative = 0.0;
        let mut last_positive = None;
        for (i, c) in self.data.children.iter().enumerate() {
            let weight = c.effective_weight();
            // Zero-weight branches are never drawn while some weight is positive.
            if c.child.is_none() || weight <= 0.0 {
                continue;
            }
            cumulative += weight;
            last_positive = Some(i);
            if cumulative >= draw {
                return Some(i);
            }
        }

        // Float rounding can leave the draw a hair above the final sum.
        last_positive
    }

    pub(crate) fn run(&mut self, arena: &mut NodeArena, ctx: &mut RunContext<'_>) -> NodeResult {
        if self.data.children.is_empty() {
            return NodeResult::Failed;
        }

        let index = match self.selected {
            Some(i) => i,
            None => {
                let Some(i) = self.pick(ctx) else {
                    return NodeResult::Failed;
                };
                trace_emit(
                    ctx.blackboard,
                    TraceEvent::new(ctx.tick.tick, tags::WEIGHTED_SELECT).with_a(i as u64),
                );
                self.selected = Some(i);
                i
            }
        };

        let Some(child) = self.data.children.get(index).and_then(|c| c.child) else {
            // The selected branch disappeared (hot-reloaded data).
            self.selected = None;
            return NodeResult::Failed;
        };

        let result = arena.run(child, ctx);
        if result.is_done() {
            self.selected = None;
        }
        result
    }

    pub(crate) fn reset(&mut self, arena: &mut NodeArena, ctx: &mut ResetContext<'_>) {
        let active = self.active_children();
        self.selected = None;
        arena.reset_children(&self.children(), &active, ctx);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ParallelPolicy {
    /// Succeed once nothing is running and at least one child succeeded.
    #[default]
    RequireOne,
    /// Any child failure fails the node immediately.
    RequireAll,
}

/// Advances every unfinished child each tick.
///
/// Children that already finished in this activation are not run again.
#[derive(Debug, Clone)]
pub struct Parallel {
    children: Vec<NodeId>,
    policy: ParallelPolicy,
    results: Vec<Option<NodeResult>>,
}

impl Parallel {
    pub fn new(children: Vec<NodeId>, policy: ParallelPolicy) -> Self {
        Self {
            children,
            policy,
            results: Vec::new(),
        }
    }

    pub fn require_all(children: Vec<NodeId>) -> Self {
        Self::new(children, ParallelPolicy::RequireAll)
    }

    pub fn require_one(children: Vec<NodeId>) -> Self {
        Self::new(children, ParallelPolicy::RequireOne)
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn policy(&self) -> ParallelPolicy {
        self.policy
    }

    /// Last tracked result per child (`None` = not run in this activation).
    pub fn child_results(&self) -> &[Option<NodeResult>] {
        &self.results
    }

    pub(crate) fn active_children(&self) -> Vec<NodeId> {
        self.children
            .iter()
            .zip(&self.results)
            .filter(|(_, r)| **r == Some(NodeResult::Running))
            .map(|(&c, _)| c)
            .collect()
    }

    fn finished_children(&self) -> Vec<NodeId> {
        self.children
            .iter()
            .zip(&self.results)
            .filter(|(_, r)| matches!(r, Some(NodeResult::Succeeded | NodeResult::Failed)))
            .map(|(&c, _)| c)
            .collect()
    }

    fn finish(&mut self) {
        self.results.iter_mut().for_each(|r| *r = None);
    }

    pub(crate) fn run(&mut self, arena: &mut NodeArena, ctx: &mut RunContext<'_>) -> NodeResult {
        if self.children.is_empty() {
            return NodeResult::Failed;
        }
        if self.results.len() != self.children.len() {
            self.results = vec![None; self.children.len()];
        }

        let mut succeeded = 0usize;
        let mut running = 0usize;
        for i in 0..self.children.len() {
            if matches!(self.results[i], None | Some(NodeResult::Running)) {
                self.results[i] = Some(arena.run(self.children[i], ctx));
            }

            match self.results[i] {
                Some(NodeResult::Succeeded) => succeeded += 1,
                Some(NodeResult::Running) => running += 1,
                Some(NodeResult::Failed) if self.policy == ParallelPolicy::RequireAll => {
                    let active = self.active_children();
                    let finished = self.finished_children();
                    arena.reset_progress(
                        &[],
                        &active,
                        &finished,
                        &mut ctx.reset_context(ResetMode::Partial),
                    );
                    self.finish();
                    return NodeResult::Failed;
                }
                _ => {}
            }
        }

        if running > 0 {
            return NodeResult::Running;
        }

        self.finish();
        if succeeded > 0 {
            NodeResult::Succeeded
        } else {
            NodeResult::Failed
        }
    }

    pub(crate) fn reset(&mut self, arena: &mut NodeArena, ctx: &mut ResetContext<'_>) {
        let active = self.active_children();
        let finished = self.finished_children();
        self.finish();
        arena.reset_progress(&self.children, &active, &finished, ctx);
    }
}
