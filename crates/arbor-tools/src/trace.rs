#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

use arbor_core::{BbKey, Blackboard};

/// Tags emitted by the engine itself.
pub mod tags {
    /// A top-level node's result differs from the previous tick.
    /// `a` = node index, `b` = result code (0 running, 1 succeeded, 2 failed).
    pub const RESULT_CHANGED: &str = "bt.result.changed";
    /// A timeout interrupted its child. `a` = child index.
    pub const TIMEOUT: &str = "bt.timeout";
    /// A weighted selector committed to a branch. `a` = branch position.
    pub const WEIGHTED_SELECT: &str = "bt.weighted.select";
    /// A blackboard watcher restarted its child. `a` = child index.
    pub const WATCH_FIRED: &str = "bt.watch.fired";
}

/// One recorded engine occurrence: the tick, a dotted tag and two numeric
/// payload slots whose meaning depends on the tag.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TraceEvent {
    pub tick: u64,
    pub tag: Cow<'static, str>,
    pub a: u64,
    pub b: u64,
}

impl TraceEvent {
    pub fn new(tick: u64, tag: impl Into<Cow<'static, str>>) -> Self {
        Self {
            tick,
            tag: tag.into(),
            a: 0,
            b: 0,
        }
    }

    pub fn with_a(self, a: u64) -> Self {
        Self { a, ..self }
    }

    pub fn with_b(self, b: u64) -> Self {
        Self { b, ..self }
    }
}

/// Streaming consumer of trace events (overlay, file writer, network tap).
pub trait TraceSink {
    fn record(&mut self, event: TraceEvent);
}

impl<F: FnMut(TraceEvent)> TraceSink for F {
    fn record(&mut self, event: TraceEvent) {
        self(event)
    }
}

/// In-memory trace, usually stored on the blackboard under [`TRACE_LOG`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TraceLog {
    pub events: Vec<TraceEvent>,
}

impl TraceLog {
    pub fn push(&mut self, event: TraceEvent) {
        self.events.push(event);
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    pub fn with_tag<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a TraceEvent> + 'a {
        self.events.iter().filter(move |e| e.tag == tag)
    }

    /// Events recorded during one tick, in emission order.
    pub fn at_tick(&self, tick: u64) -> impl Iterator<Item = &TraceEvent> + '_ {
        self.events.iter().filter(move |e| e.tick == tick)
    }
}

impl TraceSink for TraceLog {
    fn record(&mut self, event: TraceEvent) {
        self.push(event);
    }
}

pub const TRACE_LOG: BbKey<TraceLog> = BbKey::new("arbor.trace.log");
pub const TRACE_SINK: BbKey<Box<dyn TraceSink>> = BbKey::new("arbor.trace.sink");

/// Record `event` into the blackboard's [`TRACE_LOG`] and/or [`TRACE_SINK`].
///
/// Does nothing (and allocates nothing) when neither is installed.
pub fn emit(blackboard: &mut Blackboard, event: TraceEvent) {
    let has_sink = blackboard.contains(TRACE_SINK);
    if let Some(log) = blackboard.get_mut(TRACE_LOG) {
        if has_sink {
            log.push(event.clone());
        } else {
            log.push(event);
            return;
        }
    }
    if let Some(sink) = blackboard.get_mut(TRACE_SINK) {
        sink.record(event);
    }
}
