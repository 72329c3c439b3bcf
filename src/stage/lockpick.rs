//! Stage 1: lockpick dial
//!
//! A needle sweeps the dial while wobbling back and forth. The player stops it
//! near the target; three hits open the lock. Misses carry no penalty.

use serde::Serialize;
use tracing::{debug, info};

use crate::config::LockpickConfig;
use crate::error::EngineError;
use crate::geometry::{circular_distance, normalize_degrees, FULL_TURN_DEG};
use crate::random::RandomSource;
use crate::stage::AttemptOutcome;

/// Needle angle after `elapsed_ms` of animation.
///
/// `angle(t) = (180 + 180·sin(wobble·t) + (speed·t mod 360)) mod 360`
///
/// Pure in `t`, so any instant can be sampled without running a frame loop.
pub fn needle_angle(elapsed_ms: f64, config: &LockpickConfig) -> f64 {
    let sweep = (config.speed_deg_per_ms * elapsed_ms).rem_euclid(FULL_TURN_DEG);
    let wobble = 180.0 * (config.wobble_rate * elapsed_ms).sin();
    normalize_degrees(180.0 + wobble + sweep)
}

/// Rendering view of the dial
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LockpickSnapshot {
    pub target_angle: f64,
    pub needle_angle: f64,
    pub distance: f64,
    pub aligned: bool,
    pub wins: u32,
    pub wins_required: u32,
    pub tolerance_deg: f64,
    pub elapsed_ms: u64,
    pub disabled: bool,
    pub complete: bool,
}

#[derive(Debug, Clone)]
pub struct LockpickStage {
    config: LockpickConfig,
    target_angle: f64,
    wins: u32,
    elapsed_ms: u64,
    disabled: bool,
    completed: bool,
}

impl LockpickStage {
    pub fn new(config: LockpickConfig, rng: &mut dyn RandomSource) -> Result<Self, EngineError> {
        config.validate()?;
        Ok(Self::build(config, rng))
    }

    /// Construct from a configuration that is already validated
    pub(crate) fn build(config: LockpickConfig, rng: &mut dyn RandomSource) -> Self {
        let target_angle = draw_target(rng);
        debug!(target_angle, "lockpick stage ready");
        Self {
            config,
            target_angle,
            wins: 0,
            elapsed_ms: 0,
            disabled: false,
            completed: false,
        }
    }

    pub fn target_angle(&self) -> f64 {
        self.target_angle
    }

    pub fn wins(&self) -> u32 {
        self.wins
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed_ms
    }

    pub fn needle_angle(&self) -> f64 {
        needle_angle(self.elapsed_ms as f64, &self.config)
    }

    /// Current needle/target distance in degrees
    pub fn distance(&self) -> f64 {
        circular_distance(self.needle_angle(), self.target_angle)
    }

    pub fn is_aligned(&self) -> bool {
        self.distance() <= self.config.tolerance_deg
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    pub fn set_disabled(&mut self, disabled: bool) {
        self.disabled = disabled;
    }

    pub fn is_complete(&self) -> bool {
        self.completed
    }

    pub fn advance(&mut self, delta_ms: u64) {
        if self.disabled {
            return;
        }
        self.elapsed_ms = self.elapsed_ms.saturating_add(delta_ms);
    }

    /// Stop the needle at the current instant
    pub fn try_pick(&mut self, rng: &mut dyn RandomSource) -> AttemptOutcome {
        if self.disabled || self.completed {
            return AttemptOutcome::Ignored;
        }

        let angle = self.needle_angle();
        let distance = circular_distance(angle, self.target_angle);
        if distance > self.config.tolerance_deg {
            debug!(angle, target = self.target_angle, distance, "lockpick miss");
            return AttemptOutcome::Missed;
        }

        self.wins += 1;
        self.target_angle = draw_target(rng);
        debug!(wins = self.wins, next_target = self.target_angle, "lockpick hit");

        if self.wins >= self.config.wins_required {
            self.completed = true;
            info!(elapsed_ms = self.elapsed_ms, "lockpick opened");
            AttemptOutcome::Completed
        } else {
            AttemptOutcome::Progressed
        }
    }

    pub fn snapshot(&self) -> LockpickSnapshot {
        let distance = self.distance();
        LockpickSnapshot {
            target_angle: self.target_angle,
            needle_angle: self.needle_angle(),
            distance,
            aligned: distance <= self.config.tolerance_deg,
            wins: self.wins,
            wins_required: self.config.wins_required,
            tolerance_deg: self.config.tolerance_deg,
            elapsed_ms: self.elapsed_ms,
            disabled: self.disabled,
            complete: self.completed,
        }
    }
}

/// Targets land on whole degrees
fn draw_target(rng: &mut dyn RandomSource) -> f64 {
    rng.index(FULL_TURN_DEG as usize) as f64
}
