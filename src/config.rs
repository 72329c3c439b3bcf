//! Engine configuration
//!
//! Every tunable of the three stages lives here. The defaults reproduce the
//! shipped puzzle; a host may load overrides from JSON, and every field that is
//! left out keeps its default. Validation runs before any session is built so a
//! bad configuration fails at construction rather than mid-session.

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Number of stages in a session
pub const TOTAL_STAGES: usize = 3;

/// Lockpick dial tunables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LockpickConfig {
    /// Maximum needle/target deviation counted as a hit (degrees)
    pub tolerance_deg: f64,
    /// Linear sweep speed of the needle (degrees per ms)
    pub speed_deg_per_ms: f64,
    /// Angular frequency of the needle wobble (radians per ms)
    pub wobble_rate: f64,
    /// Successful tries needed to clear the stage
    pub wins_required: u32,
}

impl Default for LockpickConfig {
    fn default() -> Self {
        Self {
            tolerance_deg: 16.0,
            speed_deg_per_ms: 0.12,
            wobble_rate: 0.004,
            wins_required: 3,
        }
    }
}

/// Memory knots tunables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MemoryConfig {
    /// Number of knots in the sequence
    pub sequence_len: usize,
    /// Playback cadence per knot (ms)
    pub step_ms: u64,
    /// How long each knot stays lit during playback (ms)
    pub flash_ms: u64,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            sequence_len: 4,
            step_ms: 600,
            flash_ms: 300,
        }
    }
}

/// Slider release tunables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SliderConfig {
    /// Half width of the safe window (slider units)
    pub half_width: f64,
    /// Period of the autonomous window drift (ms)
    pub drift_interval_ms: u64,
    /// Maximum drift per step in either direction
    pub drift_amplitude: f64,
    /// Lower clamp of the drifting window centre
    pub drift_min: f64,
    /// Upper clamp of the drifting window centre
    pub drift_max: f64,
    /// Lower bound for a freshly drawn window centre
    pub redraw_min: f64,
    /// Upper bound for a freshly drawn window centre
    pub redraw_max: f64,
    /// Slider position when the stage starts
    pub initial_position: f64,
    /// Successful releases needed to clear the stage
    pub hits_required: u32,
}

impl Default for SliderConfig {
    fn default() -> Self {
        Self {
            half_width: 12.0,
            drift_interval_ms: 900,
            drift_amplitude: 6.0,
            drift_min: 15.0,
            drift_max: 85.0,
            redraw_min: 20.0,
            redraw_max: 80.0,
            initial_position: 50.0,
            hits_required: 3,
        }
    }
}

/// Complete engine configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    pub lockpick: LockpickConfig,
    pub memory: MemoryConfig,
    pub slider: SliderConfig,
}

impl EngineConfig {
    /// Parse a (possibly partial) configuration from JSON and validate it
    pub fn from_json(json: &str) -> Result<Self, EngineError> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to pretty JSON
    pub fn to_json_pretty(&self) -> Result<String, EngineError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check that every tunable keeps the stages inside their valid domains
    pub fn validate(&self) -> Result<(), EngineError> {
        self.lockpick.validate()?;
        self.memory.validate()?;
        self.slider.validate()
    }
}

impl LockpickConfig {
    pub fn validate(&self) -> Result<(), EngineError> {
        if !(self.tolerance_deg > 0.0 && self.tolerance_deg <= 180.0) {
            return Err(invalid(format!(
                "lockpick.tolerance_deg must be in (0, 180], got {}",
                self.tolerance_deg
            )));
        }
        if !self.speed_deg_per_ms.is_finite() || !self.wobble_rate.is_finite() {
            return Err(invalid("lockpick needle rates must be finite".to_string()));
        }
        if self.wins_required == 0 {
            return Err(invalid("lockpick.wins_required must be at least 1".to_string()));
        }
        Ok(())
    }
}

impl MemoryConfig {
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.sequence_len == 0 {
            return Err(invalid("memory.sequence_len must be at least 1".to_string()));
        }
        if self.step_ms == 0 {
            return Err(invalid("memory.step_ms must be positive".to_string()));
        }
        if self.flash_ms > self.step_ms {
            return Err(invalid(format!(
                "memory.flash_ms ({}) cannot exceed memory.step_ms ({})",
                self.flash_ms, self.step_ms
            )));
        }
        Ok(())
    }
}

impl SliderConfig {
    pub fn validate(&self) -> Result<(), EngineError> {
        if !(self.half_width > 0.0 && self.half_width <= 100.0) {
            return Err(invalid(format!(
                "slider.half_width must be in (0, 100], got {}",
                self.half_width
            )));
        }
        if self.drift_interval_ms == 0 {
            return Err(invalid("slider.drift_interval_ms must be positive".to_string()));
        }
        if !(self.drift_amplitude >= 0.0 && self.drift_amplitude.is_finite()) {
            return Err(invalid("slider.drift_amplitude must be finite and non-negative".to_string()));
        }
        check_range("slider.drift", self.drift_min, self.drift_max)?;
        check_range("slider.redraw", self.redraw_min, self.redraw_max)?;
        if self.redraw_min < self.drift_min || self.redraw_max > self.drift_max {
            return Err(invalid(
                "slider redraw range must lie inside the drift range".to_string(),
            ));
        }
        if !(0.0..=100.0).contains(&self.initial_position) {
            return Err(invalid(format!(
                "slider.initial_position must be in [0, 100], got {}",
                self.initial_position
            )));
        }
        if self.hits_required == 0 {
            return Err(invalid("slider.hits_required must be at least 1".to_string()));
        }
        Ok(())
    }
}

fn invalid(msg: String) -> EngineError {
    EngineError::InvalidConfig(msg)
}

fn check_range(name: &str, min: f64, max: f64) -> Result<(), EngineError> {
    if !(0.0..=100.0).contains(&min) || !(0.0..=100.0).contains(&max) || min > max {
        return Err(invalid(format!(
            "{name} range must satisfy 0 <= min <= max <= 100, got [{min}, {max}]"
        )));
    }
    Ok(())
}
