//! Deterministic random number generation.
//!
//! RULE: Nothing in the pipeline may call a platform RNG.
//! All randomness flows through TrialRng instances derived from the
//! single master seed of the run.
//!
//! Each (trial, stream) pair gets its own RNG, seeded from
//! (master_seed XOR mixed stream index). This means:
//!   - Trials never share a stream, so they can run in any order.
//!   - Adding a new stream never changes existing streams.
//!   - Any single trial is reproducible in isolation.

use rand::{RngCore, SeedableRng};
use rand_distr::{Distribution, Normal, Poisson};
use rand_pcg::Pcg64Mcg;

use crate::types::TrialIndex;

/// A deterministic RNG owned by exactly one trial.
pub struct TrialRng {
    inner: Pcg64Mcg,
}

impl TrialRng {
    /// Create a stream RNG from the master seed and a stable stream index.
    pub fn new(master_seed: u64, stream_index: u64) -> Self {
        let derived_seed = master_seed ^ (stream_index.wrapping_mul(0x9e37_79b9_7f4a_7c15));
        Self {
            inner: Pcg64Mcg::seed_from_u64(derived_seed),
        }
    }

    /// Roll a float in [0.0, 1.0).
    pub fn next_f64(&mut self) -> f64 {
        let bits = self.inner.next_u64();
        (bits >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
    }

    /// Sample a normal variate. A zero (or invalid) spread returns the mean.
    pub fn normal(&mut self, mean: f64, std_dev: f64) -> f64 {
        if std_dev <= 0.0 || !std_dev.is_finite() {
            return mean;
        }
        match Normal::new(mean, std_dev) {
            Ok(dist) => dist.sample(&mut self.inner),
            Err(_) => mean,
        }
    }

    /// Sample a Poisson count. A non-positive rate yields zero arrivals.
    pub fn poisson(&mut self, rate: f64) -> u64 {
        if rate <= 0.0 || !rate.is_finite() {
            return 0;
        }
        match Poisson::new(rate) {
            Ok(dist) => {
                let draw: f64 = dist.sample(&mut self.inner);
                draw as u64
            }
            Err(_) => 0,
        }
    }
}

/// Hands out per-trial stream RNGs for a single run.
#[derive(Debug, Clone, Copy)]
pub struct RngBank {
    master_seed: u64,
}

impl RngBank {
    pub fn new(master_seed: u64) -> Self {
        Self { master_seed }
    }

    pub fn for_trial(&self, trial: TrialIndex, stream: RngStream) -> TrialRng {
        let index = trial
            .wrapping_mul(RngStream::COUNT)
            .wrapping_add(stream as u64 + 1);
        TrialRng::new(self.master_seed, index)
    }
}

/// Stable stream assignments within a trial.
/// NEVER reorder or remove entries; only append.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u64)]
pub enum RngStream {
    Demand = 0,
    Arrivals = 1,
}

impl RngStream {
    /// Streams reserved per trial, including room to append.
    const COUNT: u64 = 8;
}
