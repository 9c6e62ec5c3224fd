//! Deterministic random streams.
//!
//! Candidate coordinates are a pure function of `(seed, step, index)`: every
//! participant can reproduce any coordinate of any candidate without
//! exchanging draws, and can seek straight to the coordinates of its own
//! block instead of generating the whole vector.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// ChaCha stream reserved for the acceptance draws.
const ACCEPTANCE_STREAM: u64 = 1;

/// Each `f64` draw consumes one `u64`, i.e. two 32-bit ChaCha words.
const WORDS_PER_DRAW: u128 = 2;

#[inline]
fn splitmix64(mut z: u64) -> u64 {
    z = z.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Uses the configured seed, or draws a fresh one.
#[inline]
pub fn resolve_seed(seed: Option<u64>) -> u64 {
    seed.unwrap_or_else(rand::random)
}

/// Private generator for the Metropolis draws of whoever owns the decision.
pub fn acceptance_rng(seed: u64) -> ChaCha8Rng {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    rng.set_stream(ACCEPTANCE_STREAM);
    rng
}

/// Uniform candidates over the box `[lower, upper)^n`, keyed by step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CandidateStream {
    seed: u64,
    lower: f64,
    upper: f64,
}

impl CandidateStream {
    pub fn new(seed: u64, lower: f64, upper: f64) -> Self {
        Self { seed, lower, upper }
    }

    #[inline]
    fn rng_for(&self, step: u64) -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(splitmix64(self.seed ^ splitmix64(step)))
    }

    /// Writes the coordinates `start..start + out.len()` of candidate `step`.
    pub fn fill_block(&self, step: u64, start: usize, out: &mut [f64]) {
        let mut rng = self.rng_for(step);
        rng.set_word_pos(start as u128 * WORDS_PER_DRAW);
        let span = self.upper - self.lower;
        for value in out.iter_mut() {
            let s: f64 = rng.random();
            *value = self.lower + s * span;
        }
    }

    /// The full candidate of `step`.
    pub fn candidate(&self, step: u64, n: usize) -> Vec<f64> {
        let mut out = vec![0.0; n];
        self.fill_block(step, 0, &mut out);
        out
    }
}
