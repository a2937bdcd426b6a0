//! Seedable random sources for the selector nodes. Not cryptographic.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

const GOLDEN_GAMMA: u64 = 0x9E37_79B9_7F4A_7C15;

/// Source of uniformly distributed bits.
///
/// Only [`next_u64`](DeterministicRng::next_u64) is required; the derived draws
/// take the high bits, which are the best mixed for SplitMix-style generators.
pub trait DeterministicRng {
    fn next_u64(&mut self) -> u64;

    fn next_u32(&mut self) -> u32 {
        (self.next_u64() >> 32) as u32
    }

    /// Uniform in `[0, 1)`, 24 bits of precision.
    fn next_f32_unit(&mut self) -> f32 {
        (self.next_u64() >> 40) as f32 / (1u32 << 24) as f32
    }

    /// Uniform in `[0, 1)`, 53 bits of precision.
    fn next_f64_unit(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Uniform index in `0..n` (multiply-shift, no modulo). `0` when `n == 0`.
    fn next_below(&mut self, n: usize) -> usize {
        if n == 0 {
            return 0;
        }
        ((u128::from(self.next_u64()) * n as u128) >> 64) as usize
    }

    fn next_bool(&mut self) -> bool {
        self.next_u64() >> 63 == 1
    }
}

impl<R: DeterministicRng + ?Sized> DeterministicRng for &mut R {
    fn next_u64(&mut self) -> u64 {
        (**self).next_u64()
    }
}

impl<R: DeterministicRng + ?Sized> DeterministicRng for Box<R> {
    fn next_u64(&mut self) -> u64 {
        (**self).next_u64()
    }
}

/// SplitMix64 generator; the default random source of a tree.
///
/// With the `serde` feature the state can be snapshotted and restored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SplitMix64 {
    state: u64,
}

impl SplitMix64 {
    pub fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    /// Generator for one entity's stream, see [`derive_seed`].
    pub fn for_stream(global_seed: u64, entity_id: u64, stream: u64) -> Self {
        Self::new(derive_seed(global_seed, entity_id, stream))
    }

    pub fn state(&self) -> u64 {
        self.state
    }
}

impl DeterministicRng for SplitMix64 {
    fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_add(GOLDEN_GAMMA);
        mix64(self.state)
    }
}

/// SplitMix64 output finalizer.
pub fn mix64(mut z: u64) -> u64 {
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Seed for one entity's tree, independent of every other `(entity, stream)` pair.
pub fn derive_seed(global_seed: u64, entity_id: u64, stream: u64) -> u64 {
    let entity = mix64(entity_id.wrapping_add(GOLDEN_GAMMA));
    mix64(global_seed ^ entity ^ mix64(stream))
}
