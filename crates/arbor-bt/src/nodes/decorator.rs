use std::any::Any;
use std::fmt;

use arbor_core::Blackboard;
use arbor_tools::{emit as trace_emit, tags, TraceEvent};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::arena::NodeArena;
use crate::bt::{NodeId, NodeResult, ResetContext, ResetMode, RunContext};
use crate::nodes::{is_positive, load_data};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum RepeatMode {
    /// Never completes on its own.
    Infinite,
    /// Completes after the child has finished this many times. `<= 0` fails.
    CountLimited(i32),
    /// Completes the first time the child succeeds.
    UntilSuccess,
    /// Completes (with `Succeeded`) the first time the child fails.
    UntilFailure,
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RepeaterData {
    pub child: Option<NodeId>,
    pub mode: RepeatMode,
}

/// Runs its child again and again under a [`RepeatMode`].
///
/// The child is not reset between repetitions; the repetition count is the
/// only termination signal. The repeater itself never returns `Failed` except
/// for a missing child or a non-positive count.
#[derive(Debug, Clone)]
pub struct Repeater {
    data: RepeaterData,
    data_key: Option<String>,
    completed: u32,
    last_child: Option<NodeResult>,
}

impl Repeater {
    pub fn new(child: NodeId, mode: RepeatMode) -> Self {
        Self::from_data(RepeaterData {
            child: Some(child),
            mode,
        })
    }

    pub fn from_data(data: RepeaterData) -> Self {
        Self {
            data,
            data_key: None,
            completed: 0,
            last_child: None,
        }
    }

    /// Re-read `RepeaterData` from this blackboard key before every run.
    pub fn with_data_key(mut self, key: impl Into<String>) -> Self {
        self.data_key = Some(key.into());
        self
    }

    pub fn data(&self) -> &RepeaterData {
        &self.data
    }

    pub fn data_key(&self) -> Option<&str> {
        self.data_key.as_deref()
    }

    /// Repetitions finished in the current activation.
    pub fn completed(&self) -> u32 {
        self.completed
    }

    pub(crate) fn children(&self) -> Vec<NodeId> {
        self.data.child.into_iter().collect()
    }

    pub(crate) fn active_children(&self) -> Vec<NodeId> {
        match self.last_child {
            Some(NodeResult::Running) => self.children(),
            _ => Vec::new(),
        }
    }

    pub(crate) fn prepare(&mut self, bb: &Blackboard) {
        if let Some(data) = load_data(self.data_key.as_deref(), bb) {
            self.data = data;
        }
    }

    pub(crate) fn run(&mut self, arena: &mut NodeArena, ctx: &mut RunContext<'_>) -> NodeResult {
        if matches!(self.data.mode, RepeatMode::CountLimited(n) if n <= 0) {
            return NodeResult::Failed;
        }
        let Some(child) = self.data.child else {
            return NodeResult::Failed;
        };

        let result = arena.run(child, ctx);
        self.last_child = Some(result);
        if result.is_running() {
            return NodeResult::Running;
        }

        self.completed = self.completed.saturating_add(1);
        let done = match self.data.mode {
            RepeatMode::Infinite => false,
            RepeatMode::CountLimited(n) => i64::from(self.completed) >= i64::from(n),
            RepeatMode::UntilSuccess => result == NodeResult::Succeeded,
            RepeatMode::UntilFailure => result == NodeResult::Failed,
        };

        if done {
            self.completed = 0;
            self.last_child = None;
            return NodeResult::Succeeded;
        }
        NodeResult::Running
    }

    pub(crate) fn reset(&mut self, arena: &mut NodeArena, ctx: &mut ResetContext<'_>) {
        let active = self.active_children();
        self.completed = 0;
        self.last_child = None;
        arena.reset_children(&self.children(), &active, ctx);
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TimeoutData {
    pub child: Option<NodeId>,
    /// Seconds the child may stay `Running`.
    pub duration: f32,
}

/// Bounds how long its child may keep running.
///
/// On expiry the child is interrupted with a `Partial` reset and the timeout
/// latches `Failed` until it is reset itself.
#[derive(Debug, Clone)]
pub struct Timeout {
    data: TimeoutData,
    data_key: Option<String>,
    elapsed: f32,
    timed_out: bool,
    last_child: Option<NodeResult>,
}

impl Timeout {
    pub fn new(child: NodeId, duration: f32) -> Self {
        Self::from_data(TimeoutData {
            child: Some(child),
            duration,
        })
    }

    pub fn from_data(data: TimeoutData) -> Self {
        Self {
            data,
            data_key: None,
            elapsed: 0.0,
            timed_out: false,
            last_child: None,
        }
    }

    /// Re-read `TimeoutData` from this blackboard key before every run.
    pub fn with_data_key(mut self, key: impl Into<String>) -> Self {
        self.data_key = Some(key.into());
        self
    }

    pub fn data(&self) -> &TimeoutData {
        &self.data
    }

    pub fn data_key(&self) -> Option<&str> {
        self.data_key.as_deref()
    }

    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    pub fn is_timed_out(&self) -> bool {
        self.timed_out
    }

    pub(crate) fn children(&self) -> Vec<NodeId> {
        self.data.child.into_iter().collect()
    }

    pub(crate) fn active_children(&self) -> Vec<NodeId> {
        match self.last_child {
            Some(NodeResult::Running) => self.children(),
            _ => Vec::new(),
        }
    }

    pub(crate) fn prepare(&mut self, bb: &Blackboard) {
        if let Some(data) = load_data(self.data_key.as_deref(), bb) {
            self.data = data;
        }
    }

    pub(crate) fn run(&mut self, arena: &mut NodeArena, ctx: &mut RunContext<'_>) -> NodeResult {
        if self.timed_out || !is_positive(self.data.duration) {
            return NodeResult::Failed;
        }
        let Some(child) = self.data.child else {
            return NodeResult::Failed;
        };

        let result = arena.run(child, ctx);
        self.last_child = Some(result);
        if result.is_done() {
            self.elapsed = 0.0;
            return result;
        }

        self.elapsed += ctx.dt();
        if self.elapsed < self.data.duration {
            return NodeResult::Running;
        }

        tracing::debug!(child = %child, elapsed = self.elapsed, "timeout expired");
        arena.reset(child, &mut ctx.reset_context(ResetMode::Partial));
        self.timed_out = true;
        self.last_child = None;
        trace_emit(
            ctx.blackboard,
            TraceEvent::new(ctx.tick.tick, tags::TIMEOUT).with_a(child.index() as u64),
        );
        NodeResult::Failed
    }

    pub(crate) fn reset(&mut self, arena: &mut NodeArena, ctx: &mut ResetContext<'_>) {
        let active = self.active_children();
        self.elapsed = 0.0;
        self.timed_out = false;
        self.last_child = None;
        arena.reset_children(&self.children(), &active, ctx);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ForceMode {
    /// Swap `Succeeded` and `Failed`.
    Invert,
    ForceSuccess,
    ForceFailure,
}

/// Rewrites its child's finished result. `Running` always passes through.
#[derive(Debug, Clone)]
pub struct ForceResult {
    child: Option<NodeId>,
    mode: ForceMode,
    last_child: Option<NodeResult>,
}

impl ForceResult {
    pub fn new(child: NodeId, mode: ForceMode) -> Self {
        Self {
            child: Some(child),
            mode,
            last_child: None,
        }
    }

    pub fn invert(child: NodeId) -> Self {
        Self::new(child, ForceMode::Invert)
    }

    pub fn mode(&self) -> ForceMode {
        self.mode
    }

    pub(crate) fn children(&self) -> Vec<NodeId> {
        self.child.into_iter().collect()
    }

    pub(crate) fn active_children(&self) -> Vec<NodeId> {
        match self.last_child {
            Some(NodeResult::Running) => self.children(),
            _ => Vec::new(),
        }
    }

    pub(crate) fn run(&mut self, arena: &mut NodeArena, ctx: &mut RunContext<'_>) -> NodeResult {
        let Some(child) = self.child else {
            return NodeResult::Failed;
        };

        let result = arena.run(child, ctx);
        self.last_child = Some(result);
        match (self.mode, result) {
            (_, NodeResult::Running) => NodeResult::Running,
            (ForceMode::Invert, NodeResult::Succeeded) => NodeResult::Failed,
            (ForceMode::Invert, NodeResult::Failed) => NodeResult::Succeeded,
            (ForceMode::ForceSuccess, _) => NodeResult::Succeeded,
            (ForceMode::ForceFailure, _) => NodeResult::Failed,
        }
    }

    pub(crate) fn reset(&mut self, arena: &mut NodeArena, ctx: &mut ResetContext<'_>) {
        let active = self.active_children();
        self.last_child = None;
        arena.reset_children(&self.children(), &active, ctx);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum FailureMode {
    /// Treat the failure as success.
    Skip,
    /// Run the fallback node instead and report its result.
    Catch,
    /// Propagate the failure.
    Throw,
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FailureHandlerData {
    pub child: Option<NodeId>,
    pub mode: FailureMode,
    /// Only used by [`FailureMode::Catch`].
    pub fallback: Option<NodeId>,
}

/// Decides what a child's failure means for the parent.
///
/// Under `Catch`, once the fallback starts running it is driven alone until it
/// completes; the failed child is not retried in between.
#[derive(Debug, Clone)]
pub struct FailureHandler {
    data: FailureHandlerData,
    data_key: Option<String>,
    in_fallback: bool,
    last: Option<NodeResult>,
}

impl FailureHandler {
    pub fn new(child: NodeId, mode: FailureMode) -> Self {
        Self::from_data(FailureHandlerData {
            child: Some(child),
            mode,
            fallback: None,
        })
    }

    pub fn catch(child: NodeId, fallback: NodeId) -> Self {
        Self::from_data(FailureHandlerData {
            child: Some(child),
            mode: FailureMode::Catch,
            fallback: Some(fallback),
        })
    }

    pub fn from_data(data: FailureHandlerData) -> Self {
        Self {
            data,
            data_key: None,
            in_fallback: false,
            last: None,
        }
    }

    /// Re-read `FailureHandlerData` from this blackboard key before every run.
    pub fn with_data_key(mut self, key: impl Into<String>) -> Self {
        self.data_key = Some(key.into());
        self
    }

    pub fn data(&self) -> &FailureHandlerData {
        &self.data
    }

    pub fn data_key(&self) -> Option<&str> {
        self.data_key.as_deref()
    }

    pub fn is_in_fallback(&self) -> bool {
        self.in_fallback
    }

    pub(crate) fn children(&self) -> Vec<NodeId> {
        let mut out: Vec<NodeId> = self.data.child.into_iter().collect();
        if self.data.mode == FailureMode::Catch {
            out.extend(self.data.fallback);
        }
        out
    }

    pub(crate) fn active_children(&self) -> Vec<NodeId> {
        if self.last != Some(NodeResult::Running) {
            return Vec::new();
        }
        let running = if self.in_fallback {
            self.data.fallback
        } else {
            self.data.child
        };
        running.into_iter().collect()
    }

    pub(crate) fn prepare(&mut self, bb: &Blackboard) {
        if let Some(data) = load_data(self.data_key.as_deref(), bb) {
            self.data = data;
        }
    }

    fn run_fallback(&mut self, arena: &mut NodeArena, ctx: &mut RunContext<'_>) -> NodeResult {
        let result = match self.data.fallback {
            Some(fallback) => arena.run(fallback, ctx),
            None => NodeResult::Failed,
        };
        self.in_fallback = result.is_running();
        result
    }

    pub(crate) fn run(&mut self, arena: &mut NodeArena, ctx: &mut RunContext<'_>) -> NodeResult {
        let result = if self.in_fallback {
            self.run_fallback(arena, ctx)
        } else {
            let Some(child) = self.data.child else {
                return NodeResult::Failed;
            };
            match arena.run(child, ctx) {
                NodeResult::Failed => match self.data.mode {
                    FailureMode::Skip => NodeResult::Succeeded,
                    FailureMode::Throw => NodeResult::Failed,
                    FailureMode::Catch => self.run_fallback(arena, ctx),
                },
                other => other,
            }
        };
        self.last = Some(result);
        result
    }

    pub(crate) fn reset(&mut self, arena: &mut NodeArena, ctx: &mut ResetContext<'_>) {
        let active = self.active_children();
        self.in_fallback = false;
        self.last = None;
        arena.reset_children(&self.children(), &active, ctx);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum WatchMode {
    /// An existing value was replaced by an unequal one.
    OnValueChanged,
    /// The key appeared.
    OnValueAvailable,
    /// The key was removed.
    OnValueLost,
    /// Any of the above.
    OnAnyChange,
}

impl WatchMode {
    fn fires(self, before: Option<&dyn Any>, after: Option<&dyn Any>, same: SameFn) -> bool {
        let changed = matches!((before, after), (Some(a), Some(b)) if !same(a, b));
        let available = before.is_none() && after.is_some();
        let lost = before.is_some() && after.is_none();
        match self {
            WatchMode::OnValueChanged => changed,
            WatchMode::OnValueAvailable => available,
            WatchMode::OnValueLost => lost,
            WatchMode::OnAnyChange => changed || available || lost,
        }
    }
}

type ReadFn = fn(&Blackboard, &str) -> Option<Box<dyn Any>>;
type SameFn = fn(&dyn Any, &dyn Any) -> bool;

fn read_snapshot<T: Clone + 'static>(bb: &Blackboard, key: &str) -> Option<Box<dyn Any>> {
    bb.value::<T>(key).map(|v| Box::new(v.clone()) as Box<dyn Any>)
}

fn same_snapshot<T: PartialEq + 'static>(a: &dyn Any, b: &dyn Any) -> bool {
    match (a.downcast_ref::<T>(), b.downcast_ref::<T>()) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

/// Last seen state of the watched key. A value of another type counts as absent.
struct Snapshot {
    revision: Option<u64>,
    value: Option<Box<dyn Any>>,
}

impl Snapshot {
    fn take(read: ReadFn, bb: &Blackboard, key: &str) -> Self {
        Self {
            revision: bb.revision(key),
            value: read(bb, key),
        }
    }
}

/// Restarts its child whenever a watched blackboard value changes.
///
/// The key is polled at the start of every run and compared by value, so
/// rewriting an equal value (a sensor refreshing every frame) does not fire.
/// The first run only records the baseline.
pub struct BlackboardWatcher {
    child: Option<NodeId>,
    key: String,
    mode: WatchMode,
    read: ReadFn,
    same: SameFn,
    snapshot: Option<Snapshot>,
    last_child: Option<NodeResult>,
}

impl fmt::Debug for BlackboardWatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlackboardWatcher")
            .field("child", &self.child)
            .field("key", &self.key)
            .field("mode", &self.mode)
            .field("last_child", &self.last_child)
            .finish_non_exhaustive()
    }
}

impl BlackboardWatcher {
    /// Watch the value of type `T` stored under `key`.
    pub fn new<T: Clone + PartialEq + 'static>(
        child: NodeId,
        key: impl Into<String>,
        mode: WatchMode,
    ) -> Self {
        Self {
            child: Some(child),
            key: key.into(),
            mode,
            read: read_snapshot::<T>,
            same: same_snapshot::<T>,
            snapshot: None,
            last_child: None,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn mode(&self) -> WatchMode {
        self.mode
    }

    pub(crate) fn children(&self) -> Vec<NodeId> {
        self.child.into_iter().collect()
    }

    pub(crate) fn active_children(&self) -> Vec<NodeId> {
        match self.last_child {
            Some(NodeResult::Running) => self.children(),
            _ => Vec::new(),
        }
    }

    /// Compare the key against the last snapshot and record the new one.
    fn poll(&mut self, bb: &Blackboard) -> bool {
        let revision = bb.revision(&self.key);
        match self.snapshot.take() {
            Some(before) if before.revision == revision => {
                self.snapshot = Some(before);
                false
            }
            Some(before) => {
                let after = Snapshot::take(self.read, bb, &self.key);
                let fired = self
                    .mode
                    .fires(before.value.as_deref(), after.value.as_deref(), self.same);
                self.snapshot = Some(after);
                fired
            }
            None => {
                self.snapshot = Some(Snapshot::take(self.read, bb, &self.key));
                false
            }
        }
    }

    pub(crate) fn run(&mut self, arena: &mut NodeArena, ctx: &mut RunContext<'_>) -> NodeResult {
        if self.key.is_empty() {
            return NodeResult::Failed;
        }
        let Some(child) = self.child else {
            return NodeResult::Failed;
        };

        if self.poll(ctx.blackboard) {
            tracing::debug!(
                key = %self.key,
                mode = ?self.mode,
                "watched value changed, restarting child"
            );
            arena.reset(child, &mut ctx.reset_context(ResetMode::Full));
            trace_emit(
                ctx.blackboard,
                TraceEvent::new(ctx.tick.tick, tags::WATCH_FIRED).with_a(child.index() as u64),
            );
        }

        let result = arena.run(child, ctx);
        self.last_child = Some(result);
        result
    }

    pub(crate) fn reset(&mut self, arena: &mut NodeArena, ctx: &mut ResetContext<'_>) {
        let active = self.active_children();
        self.snapshot = Some(Snapshot::take(self.read, ctx.blackboard, &self.key));
        self.last_child = None;
        arena.reset_children(&self.children(), &active, ctx);
    }
}
