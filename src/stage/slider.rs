//! Stage 3: slider release
//!
//! A safe window drifts along the track on its own schedule. The player drags
//! the handle and releases it inside the window; three good releases clear the
//! stage. Each good release throws the window to a fresh spot.

use serde::Serialize;
use tracing::{debug, info, trace};

use crate::config::SliderConfig;
use crate::error::EngineError;
use crate::random::RandomSource;
use crate::stage::AttemptOutcome;

/// Slider track bounds
pub const TRACK_MIN: f64 = 0.0;
pub const TRACK_MAX: f64 = 100.0;

/// Most drift steps taken in one `advance`; the walk is clamped, so a longer
/// catch-up would not move the window anywhere new
pub const MAX_DRIFT_STEPS_PER_ADVANCE: u64 = 256;

/// One bounded random-walk step of the window centre
pub fn drift_step(current: f64, config: &SliderConfig, rng: &mut dyn RandomSource) -> f64 {
    let delta = rng.uniform(-config.drift_amplitude, config.drift_amplitude);
    (current + delta).clamp(config.drift_min, config.drift_max)
}

/// Rendering view of the track
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SliderSnapshot {
    pub position: f64,
    pub window_center: f64,
    pub half_width: f64,
    pub in_window: bool,
    pub hits: u32,
    pub hits_required: u32,
    pub elapsed_ms: u64,
    pub disabled: bool,
    pub complete: bool,
}

#[derive(Debug, Clone)]
pub struct SliderStage {
    config: SliderConfig,
    position: f64,
    window_center: f64,
    hits: u32,
    elapsed_ms: u64,
    next_drift_ms: u64,
    disabled: bool,
    completed: bool,
}

impl SliderStage {
    pub fn new(config: SliderConfig, rng: &mut dyn RandomSource) -> Result<Self, EngineError> {
        config.validate()?;
        Ok(Self::build(config, rng))
    }

    /// Construct from a configuration that is already validated
    pub(crate) fn build(config: SliderConfig, rng: &mut dyn RandomSource) -> Self {
        let window_center = rng.uniform(config.redraw_min, config.redraw_max);
        debug!(window_center, "slider stage ready");
        Self {
            position: config.initial_position,
            next_drift_ms: config.drift_interval_ms,
            config,
            window_center,
            hits: 0,
            elapsed_ms: 0,
            disabled: false,
            completed: false,
        }
    }

    pub fn position(&self) -> f64 {
        self.position
    }

    pub fn window_center(&self) -> f64 {
        self.window_center
    }

    pub fn hits(&self) -> u32 {
        self.hits
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed_ms
    }

    pub fn in_window(&self) -> bool {
        (self.position - self.window_center).abs() <= self.config.half_width
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

    /// Drag the handle; not an attempt. Non-finite input is dropped.
    pub fn set_position(&mut self, position: f64) -> bool {
        if self.disabled || self.completed || !position.is_finite() {
            return false;
        }
        self.position = position.clamp(TRACK_MIN, TRACK_MAX);
        true
    }

    /// Next scheduled drift, in stage time
    pub fn next_drift_ms(&self) -> u64 {
        self.next_drift_ms
    }

    /// Run the drift schedule up to the new stage time.
    ///
    /// At most [`MAX_DRIFT_STEPS_PER_ADVANCE`] steps are drawn no matter how
    /// many intervals fell due; the schedule still moves past the new time.
    pub fn advance(&mut self, delta_ms: u64, rng: &mut dyn RandomSource) {
        if self.disabled {
            return;
        }
        self.elapsed_ms = self.elapsed_ms.saturating_add(delta_ms);
        if self.next_drift_ms > self.elapsed_ms {
            return;
        }

        let interval = self.config.drift_interval_ms.max(1);
        let due = (self.elapsed_ms - self.next_drift_ms) / interval + 1;
        for _ in 0..due.min(MAX_DRIFT_STEPS_PER_ADVANCE) {
            self.window_center = drift_step(self.window_center, &self.config, rng);
        }
        self.next_drift_ms = self
            .next_drift_ms
            .saturating_add(due.saturating_mul(interval));
        trace!(
            window_center = self.window_center,
            due,
            next_drift_ms = self.next_drift_ms,
            "slider drift"
        );
    }

    /// Let go of the handle at its current position
    pub fn release(&mut self, rng: &mut dyn RandomSource) -> AttemptOutcome {
        if self.disabled || self.completed {
            return AttemptOutcome::Ignored;
        }

        if !self.in_window() {
            debug!(
                position = self.position,
                window_center = self.window_center,
                "slider release outside window"
            );
            return AttemptOutcome::Missed;
        }

        self.hits += 1;
        self.window_center = rng.uniform(self.config.redraw_min, self.config.redraw_max);
        debug!(hits = self.hits, next_center = self.window_center, "slider release inside window");

        if self.hits >= self.config.hits_required {
            self.completed = true;
            info!(elapsed_ms = self.elapsed_ms, "slider released");
            AttemptOutcome::Completed
        } else {
            AttemptOutcome::Progressed
        }
    }

    pub fn snapshot(&self) -> SliderSnapshot {
        SliderSnapshot {
            position: self.position,
            window_center: self.window_center,
            half_width: self.config.half_width,
            in_window: self.in_window(),
            hits: self.hits,
            hits_required: self.config.hits_required,
            elapsed_ms: self.elapsed_ms,
            disabled: self.disabled,
            complete: self.completed,
        }
    }
}
