//! Injectable randomness
//!
//! All draws made by the stages (lockpick targets, memory sequences, slider
//! drift and redraws) go through [`RandomSource`], so a session can be replayed
//! from a seed or driven by a fixed script in tests.

use std::collections::VecDeque;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::EngineError;

/// Source of uniform random draws
pub trait RandomSource {
    /// Uniform draw in `[0, 1)`
    fn next_unit(&mut self) -> f64;

    /// Uniform real in `[low, high)`
    fn uniform(&mut self, low: f64, high: f64) -> f64 {
        low + (high - low) * self.next_unit()
    }

    /// Uniform integer in `[0, bound)`; returns 0 when `bound` is 0
    fn index(&mut self, bound: usize) -> usize {
        if bound == 0 {
            return 0;
        }
        let scaled = (self.next_unit() * bound as f64) as usize;
        scaled.min(bound - 1)
    }
}

/// Seedable source backed by `StdRng`
#[derive(Debug, Clone)]
pub struct SeededRandom {
    rng: StdRng,
}

impl SeededRandom {
    /// Reproducible source for a given seed
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Source seeded from operating system entropy
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }
}

impl RandomSource for SeededRandom {
    fn next_unit(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }

    fn index(&mut self, bound: usize) -> usize {
        if bound == 0 {
            return 0;
        }
        self.rng.gen_range(0..bound)
    }
}

/// Replays a fixed list of unit draws, cycling when exhausted
#[derive(Debug, Clone)]
pub struct ScriptedRandom {
    script: Vec<f64>,
    pending: VecDeque<f64>,
    draws: u64,
}

impl ScriptedRandom {
    /// Build a script; every value must lie in `[0, 1)`
    pub fn new(values: Vec<f64>) -> Result<Self, EngineError> {
        if values.is_empty() {
            return Err(EngineError::InvalidRandomScript(
                "script must contain at least one value".to_string(),
            ));
        }
        if let Some(bad) = values.iter().find(|v| !(0.0..1.0).contains(*v)) {
            return Err(EngineError::InvalidRandomScript(format!(
                "value {bad} is outside [0, 1)"
            )));
        }
        Ok(Self {
            pending: values.iter().copied().collect(),
            script: values,
            draws: 0,
        })
    }

    /// Number of draws taken so far
    pub fn draws(&self) -> u64 {
        self.draws
    }
}

impl RandomSource for ScriptedRandom {
    fn next_unit(&mut self) -> f64 {
        if self.pending.is_empty() {
            self.pending.extend(self.script.iter().copied());
        }
        self.draws = self.draws.saturating_add(1);
        self.pending.pop_front().unwrap_or(0.0)
    }
}
