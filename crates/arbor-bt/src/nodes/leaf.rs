use std::fmt;

use arbor_core::{Blackboard, TickContext};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::bt::{NodeResult, ResetContext, RunContext};
use crate::nodes::{is_positive, load_data};

type PredicateFn = Box<dyn Fn(&TickContext, &Blackboard) -> bool>;
type ActionFn = Box<dyn FnMut(&TickContext, &mut Blackboard) -> NodeResult>;

/// Pure predicate over the blackboard. Never returns `Running`.
pub struct Condition {
    predicate: Option<PredicateFn>,
}

impl Condition {
    pub fn new(predicate: impl Fn(&TickContext, &Blackboard) -> bool + 'static) -> Self {
        Self {
            predicate: Some(Box::new(predicate)),
        }
    }

    /// A condition without a predicate; always fails.
    pub fn missing() -> Self {
        Self { predicate: None }
    }

    pub(crate) fn run(&mut self, ctx: &mut RunContext<'_>) -> NodeResult {
        match &self.predicate {
            Some(predicate) => predicate(&ctx.tick, &*ctx.blackboard).into(),
            None => NodeResult::Failed,
        }
    }
}

impl fmt::Debug for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Condition")
            .field("has_predicate", &self.predicate.is_some())
            .finish()
    }
}

/// Side-effecting callback. Runs exactly once per invocation.
pub struct Action {
    callback: Option<ActionFn>,
}

impl Action {
    pub fn new(callback: impl FnMut(&TickContext, &mut Blackboard) -> NodeResult + 'static) -> Self {
        Self {
            callback: Some(Box::new(callback)),
        }
    }

    /// An action without a callback; always fails.
    pub fn missing() -> Self {
        Self { callback: None }
    }

    pub(crate) fn run(&mut self, ctx: &mut RunContext<'_>) -> NodeResult {
        match self.callback.as_mut() {
            Some(callback) => callback(&ctx.tick, &mut *ctx.blackboard),
            None => NodeResult::Failed,
        }
    }
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Action")
            .field("has_callback", &self.callback.is_some())
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum WaitResetMode {
    /// Resets clear the elapsed time, so the wait runs again.
    #[default]
    Restart,
    /// The first completion is permanent; resets are ignored.
    Once,
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct WaitData {
    /// Seconds to wait.
    pub duration: f32,
    pub reset_mode: WaitResetMode,
}

/// Delay without a child: `Running` until `duration` seconds have accumulated,
/// then `Succeeded` on that tick and every later tick until reset.
#[derive(Debug, Clone)]
pub struct Wait {
    data: WaitData,
    data_key: Option<String>,
    elapsed: f32,
    completed: bool,
}

impl Wait {
    pub fn new(duration: f32) -> Self {
        Self::from_data(WaitData {
            duration,
            reset_mode: WaitResetMode::Restart,
        })
    }

    pub fn once(duration: f32) -> Self {
        Self::from_data(WaitData {
            duration,
            reset_mode: WaitResetMode::Once,
        })
    }

    pub fn from_data(data: WaitData) -> Self {
        Self {
            data,
            data_key: None,
            elapsed: 0.0,
            completed: false,
        }
    }

    /// Re-read `WaitData` from this blackboard key before every run.
    pub fn with_data_key(mut self, key: impl Into<String>) -> Self {
        self.data_key = Some(key.into());
        self
    }

    pub fn data(&self) -> &WaitData {
        &self.data
    }

    pub fn data_key(&self) -> Option<&str> {
        self.data_key.as_deref()
    }

    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    pub(crate) fn prepare(&mut self, bb: &Blackboard) {
        if let Some(data) = load_data(self.data_key.as_deref(), bb) {
            self.data = data;
        }
    }

    pub(crate) fn run(&mut self, ctx: &mut RunContext<'_>) -> NodeResult {
        if !is_positive(self.data.duration) {
            return NodeResult::Failed;
        }
        if self.completed {
            return NodeResult::Succeeded;
        }

        self.elapsed += ctx.dt();
        if self.elapsed >= self.data.duration {
            self.completed = true;
            return NodeResult::Succeeded;
        }
        NodeResult::Running
    }

    pub(crate) fn reset(&mut self, _ctx: &mut ResetContext<'_>) {
        if self.data.reset_mode == WaitResetMode::Once {
            return;
        }
        self.elapsed = 0.0;
        self.completed = false;
    }
}
