use arbor_core::Blackboard;

use crate::arena::NodeArena;
use crate::bt::{NodeId, NodeResult, ResetContext, RunContext};
use crate::nodes::{
    Action, BlackboardWatcher, Condition, FailureHandler, ForceResult, Parallel, PrioritySelector,
    RandomSelector, Repeater, Sequence, Timeout, Wait, WeightedSelector,
};
use crate::registry::NodeKind;

/// Every node kind the engine knows about.
///
/// The set is closed: dispatch is a `match`, and each variant owns its run
/// state directly. Nodes live in a [`NodeArena`] and refer to each other by
/// [`NodeId`].
#[derive(Debug)]
pub enum Node {
    Condition(Condition),
    Action(Action),
    Wait(Wait),
    Sequence(Sequence),
    PrioritySelector(PrioritySelector),
    RandomSelector(RandomSelector),
    WeightedSelector(WeightedSelector),
    Parallel(Parallel),
    Repeater(Repeater),
    Timeout(Timeout),
    ForceResult(ForceResult),
    FailureHandler(FailureHandler),
    BlackboardWatcher(BlackboardWatcher),
}

impl Node {
    pub fn kind(&self) -> NodeKind {
        match self {
            Node::Condition(_) => NodeKind::Condition,
            Node::Action(_) => NodeKind::Action,
            Node::Wait(_) => NodeKind::Wait,
            Node::Sequence(_) => NodeKind::Sequence,
            Node::PrioritySelector(_) => NodeKind::PrioritySelector,
            Node::RandomSelector(_) => NodeKind::RandomSelector,
            Node::WeightedSelector(_) => NodeKind::WeightedSelector,
            Node::Parallel(_) => NodeKind::Parallel,
            Node::Repeater(_) => NodeKind::Repeater,
            Node::Timeout(_) => NodeKind::Timeout,
            Node::ForceResult(_) => NodeKind::ForceResult,
            Node::FailureHandler(_) => NodeKind::FailureHandler,
            Node::BlackboardWatcher(_) => NodeKind::BlackboardWatcher,
        }
    }

    /// Conditions and actions hold no run state, so resetting them is a no-op.
    pub fn is_resettable(&self) -> bool {
        !matches!(self, Node::Condition(_) | Node::Action(_))
    }

    /// `true` when the node re-reads its parameters from the blackboard.
    pub fn is_preparable(&self) -> bool {
        self.data_key().is_some()
    }

    pub fn is_composite(&self) -> bool {
        self.kind().is_composite()
    }

    pub fn data_key(&self) -> Option<&str> {
        match self {
            Node::Wait(n) => n.data_key(),
            Node::WeightedSelector(n) => n.data_key(),
            Node::Repeater(n) => n.data_key(),
            Node::Timeout(n) => n.data_key(),
            Node::FailureHandler(n) => n.data_key(),
            _ => None,
        }
    }

    /// All children, in stable order. Empty for leaves.
    pub fn children(&self) -> Vec<NodeId> {
        match self {
            Node::Condition(_) | Node::Action(_) | Node::Wait(_) => Vec::new(),
            Node::Sequence(n) => n.children().to_vec(),
            Node::PrioritySelector(n) => n.children().to_vec(),
            Node::RandomSelector(n) => n.children().to_vec(),
            Node::WeightedSelector(n) => n.children(),
            Node::Parallel(n) => n.children().to_vec(),
            Node::Repeater(n) => n.children(),
            Node::Timeout(n) => n.children(),
            Node::ForceResult(n) => n.children(),
            Node::FailureHandler(n) => n.children(),
            Node::BlackboardWatcher(n) => n.children(),
        }
    }

    /// Children whose completion would roll up into this node's result on the
    /// next tick.
    pub fn active_children(&self) -> Vec<NodeId> {
        match self {
            Node::Condition(_) | Node::Action(_) | Node::Wait(_) => Vec::new(),
            Node::Sequence(n) => n.active_children(),
            Node::PrioritySelector(n) => n.active_children(),
            Node::RandomSelector(n) => n.active_children(),
            Node::WeightedSelector(n) => n.active_children(),
            Node::Parallel(n) => n.active_children(),
            Node::Repeater(n) => n.active_children(),
            Node::Timeout(n) => n.active_children(),
            Node::ForceResult(n) => n.active_children(),
            Node::FailureHandler(n) => n.active_children(),
            Node::BlackboardWatcher(n) => n.active_children(),
        }
    }

    pub(crate) fn prepare(&mut self, bb: &Blackboard) {
        match self {
            Node::Wait(n) => n.prepare(bb),
            Node::WeightedSelector(n) => n.prepare(bb),
            Node::Repeater(n) => n.prepare(bb),
            Node::Timeout(n) => n.prepare(bb),
            Node::FailureHandler(n) => n.prepare(bb),
            _ => {}
        }
    }

    pub(crate) fn run(&mut self, arena: &mut NodeArena, ctx: &mut RunContext<'_>) -> NodeResult {
        match self {
            Node::Condition(n) => n.run(ctx),
            Node::Action(n) => n.run(ctx),
            Node::Wait(n) => n.run(ctx),
            Node::Sequence(n) => n.run(arena, ctx),
            Node::PrioritySelector(n) => n.run(arena, ctx),
            Node::RandomSelector(n) => n.run(arena, ctx),
            Node::WeightedSelector(n) => n.run(arena, ctx),
            Node::Parallel(n) => n.run(arena, ctx),
            Node::Repeater(n) => n.run(arena, ctx),
            Node::Timeout(n) => n.run(arena, ctx),
            Node::ForceResult(n) => n.run(arena, ctx),
            Node::FailureHandler(n) => n.run(arena, ctx),
            Node::BlackboardWatcher(n) => n.run(arena, ctx),
        }
    }

    /// Clear run state according to `ctx.mode`.
    ///
    /// | kind              | state cleared                          |
    /// |-------------------|----------------------------------------|
    /// | Sequence          | cursor                                 |
    /// | PrioritySelector  | running branch                         |
    /// | Random/Weighted   | committed selection                    |
    /// | Parallel          | per-child tracked results              |
    /// | Repeater          | repetition count, last child result    |
    /// | Timeout           | elapsed time, timed-out latch          |
    /// | FailureHandler    | fallback-in-progress flag              |
    /// | BlackboardWatcher | re-baselines the watched value         |
    /// | Wait (`Restart`)  | elapsed time, completion latch         |
    /// | Wait (`Once`)     | nothing, in every mode                 |
    ///
    /// `Full` and `Soft` forward to every child. `Partial` reaches the active
    /// children, and soft-resets the ones that already finished in the
    /// interrupted activation. Statistics kept by the arena are cleared by
    /// `Full` only.
    pub(crate) fn reset(&mut self, arena: &mut NodeArena, ctx: &mut ResetContext<'_>) {
        match self {
            Node::Condition(_) | Node::Action(_) => {}
            Node::Wait(n) => n.reset(ctx),
            Node::Sequence(n) => n.reset(arena, ctx),
            Node::PrioritySelector(n) => n.reset(arena, ctx),
            Node::RandomSelector(n) => n.reset(arena, ctx),
            Node::WeightedSelector(n) => n.reset(arena, ctx),
            Node::Parallel(n) => n.reset(arena, ctx),
            Node::Repeater(n) => n.reset(arena, ctx),
            Node::Timeout(n) => n.reset(arena, ctx),
            Node::ForceResult(n) => n.reset(arena, ctx),
            Node::FailureHandler(n) => n.reset(arena, ctx),
            Node::BlackboardWatcher(n) => n.reset(arena, ctx),
        }
    }
}

macro_rules! impl_from_node {
    ($($kind:ident),* $(,)?) => {
        $(
            impl From<$kind> for Node {
                fn from(value: $kind) -> Self {
                    Node::$kind(value)
                }
            }
        )*
    };
}

impl_from_node!(
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
);
