//! Deterministic PRNG for drop rolls, candidate shuffling and drop jitter.
//!
//! SplitMix64. The whole state is one `u64`, stored in level snapshots so
//! a reloaded level continues the same sequence.

use crate::fixed::Fixed64;

/// SplitMix64 pseudo-random number generator.
///
/// Deterministic across platforms, so a replayed level rolls the same drops.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SimRng {
    state: u64,
}

impl SimRng {
    /// Create a new RNG with the given seed.
    pub fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    /// Generate the next `u64` in the sequence.
    pub fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }

    /// Uniform draw in `[0, 1)` with 32 fractional bits.
    pub fn next_fraction(&mut self) -> Fixed64 {
        let upper = (self.next_u64() >> 32) as u32;
        // Integer part zero, fraction = upper / 2^32.
        Fixed64::from_bits(i64::from(upper))
    }

    /// Uniform index in `0..bound`. `bound` must be non-zero.
    pub fn next_below(&mut self, bound: usize) -> usize {
        debug_assert!(bound > 0, "next_below called with an empty range");
        // Multiply-shift keeps modulo bias below 2^-32 for small bounds.
        let r = self.next_u64() >> 32;
        ((r * bound as u64) >> 32) as usize
    }

    /// Returns `true` when a fresh `[0, 1)` draw is `<= probability`.
    ///
    /// - probability < 0 always returns false
    /// - probability >= 1 always returns true
    pub fn roll_at_most(&mut self, probability: Fixed64) -> bool {
        if probability < Fixed64::ZERO {
            return false;
        }
        self.next_fraction() <= probability
    }

    /// Fisher–Yates shuffle in place.
    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        for i in (1..items.len()).rev() {
            let j = self.next_below(i + 1);
            items.swap(i, j);
        }
    }

    /// Get the internal state (for hashing/serialization).
    pub fn state(&self) -> u64 {
        self.state
    }
}
