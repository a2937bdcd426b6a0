//! Trace primitives for deterministic behavior tree debugging.
//!
//! Nodes record compact [`TraceEvent`]s into the blackboard while a tree
//! runs; tooling renders them afterwards. Nothing is recorded unless a
//! [`TraceLog`] or [`TraceSink`] has been installed.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]

pub mod trace;

pub use trace::{emit, tags, TraceEvent, TraceLog, TraceSink, TRACE_LOG, TRACE_SINK};
