//! Deterministic, engine-agnostic primitives shared by the behavior tree engine.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]

pub mod blackboard;
pub mod rng;
pub mod tick;

pub use blackboard::{BbKey, Blackboard};
pub use rng::{derive_seed, DeterministicRng, SplitMix64};
pub use tick::TickContext;
