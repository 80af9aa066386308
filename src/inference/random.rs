//! Uniform random draws used to initialize marginals and parameters

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Source of independent uniform values in `[0, 1)`
pub trait UniformSource {
    fn next_uniform(&mut self) -> f64;
}

/// Reproducible uniform source backed by `StdRng`
pub struct SeededUniform {
    rng: StdRng,
    seed: u64,
}

impl SeededUniform {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            seed,
        }
    }

    /// Seed from the thread-local generator; the chosen seed is kept so the
    /// run can be repeated
    pub fn from_entropy() -> Self {
        Self::new(rand::rng().random::<u64>())
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }
}

impl UniformSource for SeededUniform {
    fn next_uniform(&mut self) -> f64 {
        self.rng.random::<f64>()
    }
}

/// Fill `out` with uniform draws rescaled to sum to one
pub fn random_unity(source: &mut dyn UniformSource, out: &mut [f64]) {
    let mut sum = 0.0;
    for x in out.iter_mut() {
        *x = source.next_uniform();
        sum += *x;
    }
    for x in out.iter_mut() {
        *x /= sum;
    }
}
