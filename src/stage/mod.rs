//! Stage engines
//!
//! A session runs three stages in a fixed order. Each stage is its own state
//! machine with private state; [`StageEngine`] is the sum type the session holds
//! for whichever one is live.
//!
//! # Contract
//!
//! - Every discrete action returns an [`AttemptOutcome`]. Anything other than
//!   [`AttemptOutcome::Ignored`] counts as exactly one attempt.
//! - [`AttemptOutcome::Completed`] is returned at most once per instance; after
//!   that the instance ignores input.
//! - A disabled stage ignores actions, continuous input and time.
//! - Time is stage-local: the clock starts at 0 on construction and only moves
//!   through [`StageEngine::advance`]. Dropping the instance drops its schedule.

pub mod lockpick;
pub mod memory;
pub mod slider;

use serde::{Deserialize, Serialize};

use crate::config::{EngineConfig, TOTAL_STAGES};
use crate::error::EngineError;
use crate::random::RandomSource;

pub use lockpick::{needle_angle, LockpickSnapshot, LockpickStage};
pub use memory::{Knot, MemoryPhase, MemorySnapshot, MemoryStage};
pub use slider::{drift_step, SliderSnapshot, SliderStage};

/// The three stages in session order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    Lockpick,
    Memory,
    Slider,
}

impl StageKind {
    pub const ALL: [StageKind; TOTAL_STAGES] =
        [StageKind::Lockpick, StageKind::Memory, StageKind::Slider];

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn index(&self) -> usize {
        match self {
            StageKind::Lockpick => 0,
            StageKind::Memory => 1,
            StageKind::Slider => 2,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StageKind::Lockpick => "lockpick",
            StageKind::Memory => "memory",
            StageKind::Slider => "slider",
        }
    }

    /// Display title
    pub fn title(&self) -> &'static str {
        match self {
            StageKind::Lockpick => "Lockpick",
            StageKind::Memory => "Memory Knots",
            StageKind::Slider => "Slider Release",
        }
    }

    /// One-line instruction shown under the title
    pub fn objective(&self) -> &'static str {
        match self {
            StageKind::Lockpick => "Stop the needle near the sweet spot three times to unlock.",
            StageKind::Memory => "Watch the glowing knots, then repeat the sequence.",
            StageKind::Slider => "Stop the slider inside the glowing window three times.",
        }
    }
}

/// Result of a discrete action against a stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptOutcome {
    /// Not an attempt: disabled, already complete, wrong stage, or not accepting input
    Ignored,
    /// Counted attempt that did not advance the stage
    Missed,
    /// Counted attempt that advanced the stage without clearing it
    Progressed,
    /// Counted attempt that cleared the stage
    Completed,
}

impl AttemptOutcome {
    pub fn is_attempt(self) -> bool {
        !matches!(self, AttemptOutcome::Ignored)
    }

    pub fn is_completion(self) -> bool {
        matches!(self, AttemptOutcome::Completed)
    }

    /// Stable numeric code used across the C ABI
    pub fn code(self) -> i32 {
        match self {
            AttemptOutcome::Ignored => 0,
            AttemptOutcome::Missed => 1,
            AttemptOutcome::Progressed => 2,
            AttemptOutcome::Completed => 3,
        }
    }
}

/// Discrete player actions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageAction {
    /// Lockpick: stop the needle
    Try,
    /// Memory: press a knot
    Press(Knot),
    /// Slider: let go of the handle
    Release,
}

/// Read-only view of the live stage for rendering
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StageSnapshot {
    Lockpick(LockpickSnapshot),
    Memory(MemorySnapshot),
    Slider(SliderSnapshot),
}

/// The live stage, one variant per stage kind
#[derive(Debug, Clone)]
pub enum StageEngine {
    Lockpick(LockpickStage),
    Memory(MemoryStage),
    Slider(SliderStage),
}

impl StageEngine {
    /// Build a fresh stage with newly drawn random parameters.
    ///
    /// Fails if the section of `config` for this stage is invalid.
    pub fn new(
        kind: StageKind,
        config: &EngineConfig,
        rng: &mut dyn RandomSource,
    ) -> Result<Self, EngineError> {
        Ok(match kind {
            StageKind::Lockpick => {
                StageEngine::Lockpick(LockpickStage::new(config.lockpick.clone(), rng)?)
            }
            StageKind::Memory => StageEngine::Memory(MemoryStage::new(config.memory.clone(), rng)?),
            StageKind::Slider => StageEngine::Slider(SliderStage::new(config.slider.clone(), rng)?),
        })
    }

    /// Construct from a configuration that is already validated
    pub(crate) fn build(kind: StageKind, config: &EngineConfig, rng: &mut dyn RandomSource) -> Self {
        match kind {
            StageKind::Lockpick => {
                StageEngine::Lockpick(LockpickStage::build(config.lockpick.clone(), rng))
            }
            StageKind::Memory => StageEngine::Memory(MemoryStage::build(config.memory.clone(), rng)),
            StageKind::Slider => StageEngine::Slider(SliderStage::build(config.slider.clone(), rng)),
        }
    }

    pub fn kind(&self) -> StageKind {
        match self {
            StageEngine::Lockpick(_) => StageKind::Lockpick,
            StageEngine::Memory(_) => StageKind::Memory,
            StageEngine::Slider(_) => StageKind::Slider,
        }
    }

    /// Route a discrete action; actions meant for another stage are ignored
    pub fn apply(&mut self, action: StageAction, rng: &mut dyn RandomSource) -> AttemptOutcome {
        match (self, action) {
            (StageEngine::Lockpick(stage), StageAction::Try) => stage.try_pick(rng),
            (StageEngine::Memory(stage), StageAction::Press(knot)) => stage.press(knot),
            (StageEngine::Slider(stage), StageAction::Release) => stage.release(rng),
            _ => AttemptOutcome::Ignored,
        }
    }

    /// Continuous slider input; returns whether it was applied
    pub fn set_position(&mut self, position: f64) -> bool {
        match self {
            StageEngine::Slider(stage) => stage.set_position(position),
            _ => false,
        }
    }

    /// Move the stage clock forward, firing any scheduled steps that fall due
    pub fn advance(&mut self, delta_ms: u64, rng: &mut dyn RandomSource) {
        match self {
            StageEngine::Lockpick(stage) => stage.advance(delta_ms),
            StageEngine::Memory(stage) => stage.advance(delta_ms),
            StageEngine::Slider(stage) => stage.advance(delta_ms, rng),
        }
    }

    pub fn elapsed_ms(&self) -> u64 {
        match self {
            StageEngine::Lockpick(stage) => stage.elapsed_ms(),
            StageEngine::Memory(stage) => stage.elapsed_ms(),
            StageEngine::Slider(stage) => stage.elapsed_ms(),
        }
    }

    pub fn set_disabled(&mut self, disabled: bool) {
        match self {
            StageEngine::Lockpick(stage) => stage.set_disabled(disabled),
            StageEngine::Memory(stage) => stage.set_disabled(disabled),
            StageEngine::Slider(stage) => stage.set_disabled(disabled),
        }
    }

    pub fn is_disabled(&self) -> bool {
        match self {
            StageEngine::Lockpick(stage) => stage.is_disabled(),
            StageEngine::Memory(stage) => stage.is_disabled(),
            StageEngine::Slider(stage) => stage.is_disabled(),
        }
    }

    pub fn is_complete(&self) -> bool {
        match self {
            StageEngine::Lockpick(stage) => stage.is_complete(),
            StageEngine::Memory(stage) => stage.is_complete(),
            StageEngine::Slider(stage) => stage.is_complete(),
        }
    }

    pub fn snapshot(&self) -> StageSnapshot {
        match self {
            StageEngine::Lockpick(stage) => StageSnapshot::Lockpick(stage.snapshot()),
            StageEngine::Memory(stage) => StageSnapshot::Memory(stage.snapshot()),
            StageEngine::Slider(stage) => StageSnapshot::Slider(stage.snapshot()),
        }
    }

    pub fn as_lockpick(&self) -> Option<&LockpickStage> {
        match self {
            StageEngine::Lockpick(stage) => Some(stage),
            _ => None,
        }
    }

    pub fn as_memory(&self) -> Option<&MemoryStage> {
        match self {
            StageEngine::Memory(stage) => Some(stage),
            _ => None,
        }
    }

    pub fn as_slider(&self) -> Option<&SliderStage> {
        match self {
            StageEngine::Slider(stage) => Some(stage),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::ScriptedRandom;
    use pretty_assertions::assert_eq;

    fn engine(kind: StageKind) -> (StageEngine, ScriptedRandom) {
        let mut rng = ScriptedRandom::new(vec![0.5]).unwrap();
        let engine = StageEngine::new(kind, &EngineConfig::default(), &mut rng).unwrap();
        (engine, rng)
    }

    #[test]
    fn test_kind_order() {
        for (i, kind) in StageKind::ALL.iter().enumerate() {
            assert_eq!(kind.index(), i);
            assert_eq!(StageKind::from_index(i), Some(*kind));
        }
        assert_eq!(StageKind::from_index(3), None);
        assert_eq!(StageKind::Memory.title(), "Memory Knots");
    }

    #[test]
    fn test_engine_kind_matches_constructor() {
        for kind in StageKind::ALL {
            let (engine, _) = engine(kind);
            assert_eq!(engine.kind(), kind);
            assert_eq!(engine.elapsed_ms(), 0);
            assert!(!engine.is_complete());
        }
    }

    #[test]
    fn test_mismatched_actions_ignored() {
        let (mut lock, mut rng) = engine(StageKind::Lockpick);
        assert_eq!(lock.apply(StageAction::Release, &mut rng), AttemptOutcome::Ignored);
        assert_eq!(
            lock.apply(StageAction::Press(Knot::Sky), &mut rng),
            AttemptOutcome::Ignored
        );
        assert!(!lock.set_position(40.0));

        let (mut slider, mut rng) = engine(StageKind::Slider);
        assert_eq!(slider.apply(StageAction::Try, &mut rng), AttemptOutcome::Ignored);
        assert!(slider.set_position(40.0));
    }

    #[test]
    fn test_disabled_engine_ignores_everything() {
        let (mut lock, mut rng) = engine(StageKind::Lockpick);
        lock.set_disabled(true);
        assert!(lock.is_disabled());
        assert_eq!(lock.apply(StageAction::Try, &mut rng), AttemptOutcome::Ignored);
        lock.advance(500, &mut rng);
        assert_eq!(lock.elapsed_ms(), 0);
    }

    #[test]
    fn test_new_checks_the_stage_config() {
        let mut rng = ScriptedRandom::new(vec![0.5]).unwrap();
        let mut config = EngineConfig::default();
        config.memory.step_ms = 0;
        assert!(matches!(
            StageEngine::new(StageKind::Memory, &config, &mut rng),
            Err(EngineError::InvalidConfig(_))
        ));
        // other stages only look at their own section
        assert!(StageEngine::new(StageKind::Lockpick, &config, &mut rng).is_ok());

        let mut config = EngineConfig::default();
        config.slider.drift_interval_ms = 0;
        assert!(StageEngine::new(StageKind::Slider, &config, &mut rng).is_err());

        let mut config = EngineConfig::default();
        config.lockpick.wins_required = 0;
        assert!(StageEngine::new(StageKind::Lockpick, &config, &mut rng).is_err());
    }

    #[test]
    fn test_outcome_codes() {
        assert!(!AttemptOutcome::Ignored.is_attempt());
        assert!(AttemptOutcome::Missed.is_attempt());
        assert!(AttemptOutcome::Completed.is_completion());
        assert_eq!(AttemptOutcome::Progressed.code(), 2);
    }

    #[test]
    fn test_snapshot_is_tagged() {
        let (slider, _) = engine(StageKind::Slider);
        let json = serde_json::to_value(slider.snapshot()).unwrap();
        assert_eq!(json["kind"], "slider");
        assert_eq!(json["position"], 50.0);
    }
}
