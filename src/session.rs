//! Session controller
//!
//! Owns the live stage and the global tallies: which stage is up, how many
//! attempts were made, how many seconds have passed, and whether the escape is
//! complete. Stage outcomes flow back here: every counted attempt bumps the
//! tally and a completion advances to the next stage, built fresh with newly
//! drawn random parameters.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::{EngineConfig, TOTAL_STAGES};
use crate::error::EngineError;
use crate::random::{RandomSource, SeededRandom};
use crate::stage::{AttemptOutcome, Knot, StageAction, StageEngine, StageKind, StageSnapshot};

/// Banner shown once the last stage is cleared
pub const ESCAPE_MESSAGE: &str = "Escape successful!";

const MS_PER_SECOND: u64 = 1000;

/// Format whole seconds as `MM:SS`
pub fn format_clock(total_seconds: u64) -> String {
    format!("{:02}:{:02}", total_seconds / 60, total_seconds % 60)
}

/// Read-only view of the whole session for the status display
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub session_id: Uuid,
    pub stage_index: usize,
    /// 1-based stage number for display, capped at the stage count
    pub stage_number: usize,
    pub total_stages: usize,
    pub stage_title: &'static str,
    pub stage_objective: &'static str,
    pub attempts: u32,
    pub elapsed_seconds: u64,
    pub clock: String,
    pub progress: f64,
    pub complete: bool,
    pub stage: StageSnapshot,
}

/// End-of-session report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: Uuid,
    pub complete: bool,
    pub message: Option<String>,
    pub attempts: u32,
    pub elapsed_seconds: u64,
    pub clock: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// A run through the three stages
pub struct Session {
    id: Uuid,
    config: EngineConfig,
    rng: Box<dyn RandomSource>,
    stage_index: usize,
    attempts: u32,
    elapsed_seconds: u64,
    complete: bool,
    started_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    stage: StageEngine,
    /// Milliseconds passed since the last whole-second tick
    carry_ms: u64,
}

impl Session {
    /// Validate the configuration and start at stage 0
    pub fn new(config: EngineConfig, rng: Box<dyn RandomSource>) -> Result<Self, EngineError> {
        config.validate()?;
        Ok(Self::build(config, rng))
    }

    /// Default configuration with a reproducible random stream
    pub fn with_seed(seed: u64) -> Self {
        Self::build(EngineConfig::default(), Box::new(SeededRandom::from_seed(seed)))
    }

    /// Default configuration seeded from system entropy
    pub fn from_entropy() -> Self {
        Self::build(EngineConfig::default(), Box::new(SeededRandom::from_entropy()))
    }

    fn build(config: EngineConfig, mut rng: Box<dyn RandomSource>) -> Self {
        let stage = StageEngine::build(StageKind::Lockpick, &config, rng.as_mut());
        let id = Uuid::new_v4();
        info!(session_id = %id, "session started");
        Self {
            id,
            config,
            rng,
            stage_index: 0,
            attempts: 0,
            elapsed_seconds: 0,
            complete: false,
            started_at: Utc::now(),
            completed_at: None,
            stage,
            carry_ms: 0,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn stage_index(&self) -> usize {
        self.stage_index
    }

    pub fn stage_kind(&self) -> StageKind {
        self.stage.kind()
    }

    /// The live stage (disabled once the session is complete)
    pub fn stage(&self) -> &StageEngine {
        &self.stage
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn elapsed_seconds(&self) -> u64 {
        self.elapsed_seconds
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    /// Fraction of stages cleared, in `[0, 1]`
    pub fn progress(&self) -> f64 {
        if self.complete {
            1.0
        } else {
            self.stage_index as f64 / TOTAL_STAGES as f64
        }
    }

    /// Count one attempt; no-op once complete
    pub fn record_attempt(&mut self) {
        if self.complete {
            return;
        }
        self.attempts = self.attempts.saturating_add(1);
    }

    /// Move past the live stage.
    ///
    /// Normally driven by a stage completion. Clearing the last stage marks the
    /// session complete, stops the clock and disables the stage in place.
    pub fn advance_stage(&mut self) {
        if self.complete {
            return;
        }

        if self.stage_index + 1 >= TOTAL_STAGES {
            self.complete = true;
            self.completed_at = Some(Utc::now());
            self.carry_ms = 0;
            self.stage.set_disabled(true);
            info!(
                session_id = %self.id,
                attempts = self.attempts,
                elapsed_seconds = self.elapsed_seconds,
                "escape complete"
            );
            return;
        }

        self.stage_index += 1;
        let kind = StageKind::ALL[self.stage_index];
        // The old stage and its schedule are dropped here
        self.stage = StageEngine::build(kind, &self.config, self.rng.as_mut());
        info!(stage = kind.as_str(), index = self.stage_index, "stage advanced");
    }

    /// One second of session clock; no-op once complete
    pub fn tick(&mut self) {
        if self.complete {
            return;
        }
        self.elapsed_seconds = self.elapsed_seconds.saturating_add(1);
    }

    /// Start over with a fresh id, zeroed tallies and a new stage 0
    pub fn reset(&mut self) {
        self.id = Uuid::new_v4();
        self.stage_index = 0;
        self.attempts = 0;
        self.elapsed_seconds = 0;
        self.complete = false;
        self.started_at = Utc::now();
        self.completed_at = None;
        self.carry_ms = 0;
        self.stage = StageEngine::build(StageKind::Lockpick, &self.config, self.rng.as_mut());
        info!(session_id = %self.id, "session reset");
    }

    /// Let wall time pass: drives the live stage's timers and adds one second
    /// to the session clock per whole second crossed, keeping the remainder.
    pub fn pass_time(&mut self, delta: Duration) {
        let ms = u64::try_from(delta.as_millis()).unwrap_or(u64::MAX);
        self.pass_time_ms(ms);
    }

    pub fn pass_time_ms(&mut self, delta_ms: u64) {
        if self.complete {
            return;
        }
        self.stage.advance(delta_ms, self.rng.as_mut());
        let carry = self.carry_ms.saturating_add(delta_ms);
        self.elapsed_seconds = self.elapsed_seconds.saturating_add(carry / MS_PER_SECOND);
        self.carry_ms = carry % MS_PER_SECOND;
    }

    /// Lockpick: stop the needle
    pub fn try_lock(&mut self) -> AttemptOutcome {
        self.act(StageAction::Try)
    }

    /// Memory: press a knot
    pub fn press(&mut self, knot: Knot) -> AttemptOutcome {
        self.act(StageAction::Press(knot))
    }

    /// Slider: let go of the handle
    pub fn release(&mut self) -> AttemptOutcome {
        self.act(StageAction::Release)
    }

    /// Slider: drag the handle; never an attempt
    pub fn set_slider_position(&mut self, position: f64) -> bool {
        if self.complete {
            return false;
        }
        self.stage.set_position(position)
    }

    /// Route an action into the live stage and apply its outcome
    pub fn act(&mut self, action: StageAction) -> AttemptOutcome {
        if self.complete {
            return AttemptOutcome::Ignored;
        }

        let outcome = self.stage.apply(action, self.rng.as_mut());
        if outcome.is_attempt() {
            self.record_attempt();
            debug!(?action, ?outcome, attempts = self.attempts, "attempt recorded");
        }
        if outcome.is_completion() {
            self.advance_stage();
        }
        outcome
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let kind = self.stage.kind();
        SessionSnapshot {
            session_id: self.id,
            stage_index: self.stage_index,
            stage_number: (self.stage_index + 1).min(TOTAL_STAGES),
            total_stages: TOTAL_STAGES,
            stage_title: kind.title(),
            stage_objective: kind.objective(),
            attempts: self.attempts,
            elapsed_seconds: self.elapsed_seconds,
            clock: format_clock(self.elapsed_seconds),
            progress: self.progress(),
            complete: self.complete,
            stage: self.stage.snapshot(),
        }
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            session_id: self.id,
            complete: self.complete,
            message: self.complete.then(|| ESCAPE_MESSAGE.to_string()),
            attempts: self.attempts,
            elapsed_seconds: self.elapsed_seconds,
            clock: format_clock(self.elapsed_seconds),
            started_at: self.started_at,
            completed_at: self.completed_at,
        }
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("stage_index", &self.stage_index)
            .field("attempts", &self.attempts)
            .field("elapsed_seconds", &self.elapsed_seconds)
            .field("complete", &self.complete)
            .field("stage", &self.stage)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::ScriptedRandom;
    use crate::stage::MemoryPhase;
    use pretty_assertions::assert_eq;

    fn scripted(values: Vec<f64>) -> Session {
        Session::new(
            EngineConfig::default(),
            Box::new(ScriptedRandom::new(values).unwrap()),
        )
        .unwrap()
    }

    /// Lockpick targets land on 180 (the needle at t = 0), then the memory
    /// sequence comes out as amber, sky, rose, emerald. The script then cycles
    /// so the slider window opens centred on 50.
    fn scenario_session() -> Session {
        scripted(vec![0.5, 0.5, 0.5, 0.5, 0.3, 0.8, 0.1, 0.6])
    }

    fn clear_lockpick(session: &mut Session) {
        assert_eq!(session.try_lock(), AttemptOutcome::Progressed);
        assert_eq!(session.try_lock(), AttemptOutcome::Progressed);
        assert_eq!(session.try_lock(), AttemptOutcome::Completed);
    }

    fn clear_memory(session: &mut Session) {
        session.pass_time_ms(2400);
        let sequence = session.stage().as_memory().unwrap().sequence().to_vec();
        for knot in sequence {
            session.press(knot);
        }
    }

    fn clear_slider(session: &mut Session) {
        for _ in 0..3 {
            let center = session.stage().as_slider().unwrap().window_center();
            session.set_slider_position(center);
            session.release();
        }
    }

    #[test]
    fn test_fresh_session() {
        let session = Session::with_seed(1);
        assert_eq!(session.stage_index(), 0);
        assert_eq!(session.stage_kind(), StageKind::Lockpick);
        assert_eq!(session.attempts(), 0);
        assert_eq!(session.elapsed_seconds(), 0);
        assert!(!session.is_complete());
        assert_eq!(session.progress(), 0.0);
    }

    #[test]
    fn test_invalid_config_fails_fast() {
        let mut config = EngineConfig::default();
        config.slider.drift_interval_ms = 0;
        let result = Session::new(config, Box::new(SeededRandom::from_seed(1)));
        assert!(matches!(result, Err(EngineError::InvalidConfig(_))));
    }

    #[test]
    fn test_scenario_a_lockpick_advances() {
        let mut session = scenario_session();
        clear_lockpick(&mut session);
        assert_eq!(session.stage_index(), 1);
        assert_eq!(session.stage_kind(), StageKind::Memory);
        assert_eq!(session.attempts(), 3);
        assert!((session.progress() - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_misses_count_as_attempts() {
        // target 0 is far from the needle at t = 0
        let mut session = scripted(vec![0.0]);
        assert_eq!(session.try_lock(), AttemptOutcome::Missed);
        assert_eq!(session.try_lock(), AttemptOutcome::Missed);
        assert_eq!(session.attempts(), 2);
        assert_eq!(session.stage_index(), 0);
    }

    #[test]
    fn test_scenario_b_memory_completes_on_fourth_press() {
        let mut session = scenario_session();
        clear_lockpick(&mut session);

        let memory = session.stage().as_memory().unwrap();
        assert_eq!(
            memory.sequence(),
            &[Knot::Amber, Knot::Sky, Knot::Rose, Knot::Emerald]
        );

        // presses during playback are not attempts
        assert_eq!(session.press(Knot::Amber), AttemptOutcome::Ignored);
        assert_eq!(session.attempts(), 3);

        session.pass_time_ms(2400);
        assert_eq!(
            session.stage().as_memory().unwrap().phase(),
            MemoryPhase::Input
        );
        assert_eq!(session.elapsed_seconds(), 2);

        assert_eq!(session.press(Knot::Amber), AttemptOutcome::Progressed);
        assert_eq!(session.press(Knot::Sky), AttemptOutcome::Progressed);
        assert_eq!(session.press(Knot::Rose), AttemptOutcome::Progressed);
        assert_eq!(session.stage_index(), 1);
        assert_eq!(session.press(Knot::Emerald), AttemptOutcome::Completed);
        assert_eq!(session.stage_index(), 2);
        assert_eq!(session.attempts(), 7);
    }

    #[test]
    fn test_scenario_c_slider_completes_on_third_hit() {
        let mut session = scenario_session();
        clear_lockpick(&mut session);
        clear_memory(&mut session);
        assert_eq!(session.stage_kind(), StageKind::Slider);
        let attempts_before = session.attempts();

        let waits = [450u64, 1300, 77];
        let mut outcomes = Vec::new();
        for wait in waits {
            session.pass_time_ms(wait);
            let center = session.stage().as_slider().unwrap().window_center();
            assert!((15.0..=85.0).contains(&center));
            assert!(session.set_slider_position(center));
            outcomes.push(session.release());
        }

        assert_eq!(
            outcomes,
            vec![
                AttemptOutcome::Progressed,
                AttemptOutcome::Progressed,
                AttemptOutcome::Completed
            ]
        );
        assert_eq!(session.stage().as_slider().unwrap().hits(), 3);
        assert_eq!(session.attempts(), attempts_before + 3);
        assert!(session.is_complete());
    }

    #[test]
    fn test_slider_miss_still_counts() {
        let mut session = scenario_session();
        clear_lockpick(&mut session);
        clear_memory(&mut session);
        let before = session.attempts();
        let center = session.stage().as_slider().unwrap().window_center();
        let far = if center > 50.0 { 0.0 } else { 100.0 };
        assert!(session.set_slider_position(far));
        assert_eq!(session.attempts(), before);
        assert_eq!(session.release(), AttemptOutcome::Missed);
        assert_eq!(session.attempts(), before + 1);
    }

    #[test]
    fn test_scenario_d_complete_then_reset() {
        let mut session = scenario_session();
        let first_id = session.id();
        clear_lockpick(&mut session);
        clear_memory(&mut session);
        clear_slider(&mut session);

        assert!(session.is_complete());
        assert_eq!(session.progress(), 1.0);
        assert_eq!(session.stage_index(), 2);
        assert!(session.stage().is_disabled());
        assert!(session.completed_at().is_some());

        session.reset();
        assert_eq!(session.stage_index(), 0);
        assert_eq!(session.attempts(), 0);
        assert_eq!(session.elapsed_seconds(), 0);
        assert!(!session.is_complete());
        assert_eq!(session.stage_kind(), StageKind::Lockpick);
        assert!(!session.stage().is_disabled());
        assert!(session.completed_at().is_none());
        assert_ne!(session.id(), first_id);
    }

    #[test]
    fn test_complete_session_is_frozen() {
        let mut session = scenario_session();
        clear_lockpick(&mut session);
        clear_memory(&mut session);
        clear_slider(&mut session);
        let attempts = session.attempts();
        let seconds = session.elapsed_seconds();

        session.tick();
        session.pass_time_ms(5000);
        session.record_attempt();
        assert_eq!(session.release(), AttemptOutcome::Ignored);
        assert!(!session.set_slider_position(10.0));
        session.advance_stage();

        assert_eq!(session.attempts(), attempts);
        assert_eq!(session.elapsed_seconds(), seconds);
        assert_eq!(session.stage_index(), 2);
        assert!(session.is_complete());
    }

    #[test]
    fn test_reset_draws_fresh_stage_zero() {
        let mut session = scripted(vec![0.5, 0.25]);
        let before = session.stage().as_lockpick().unwrap().target_angle();
        session.reset();
        let after = session.stage().as_lockpick().unwrap().target_angle();
        assert_eq!(before, 180.0);
        assert_eq!(after, 90.0);
    }

    #[test]
    fn test_reset_mid_session() {
        let mut session = scenario_session();
        clear_lockpick(&mut session);
        session.pass_time_ms(3500);
        session.reset();
        assert_eq!(session.stage_index(), 0);
        assert_eq!(session.elapsed_seconds(), 0);
        assert_eq!(session.stage().elapsed_ms(), 0);

        // sub-second carry does not survive a reset
        session.pass_time_ms(600);
        assert_eq!(session.elapsed_seconds(), 0);
    }

    #[test]
    fn test_tick_and_pass_time() {
        let mut session = Session::with_seed(9);
        session.tick();
        session.tick();
        assert_eq!(session.elapsed_seconds(), 2);

        session.pass_time_ms(700);
        assert_eq!(session.elapsed_seconds(), 2);
        session.pass_time(Duration::from_millis(700));
        assert_eq!(session.elapsed_seconds(), 3);
        assert_eq!(session.stage().elapsed_ms(), 1400);
    }

    #[test]
    fn test_manual_advance_walks_stages() {
        let mut session = Session::with_seed(4);
        session.advance_stage();
        assert_eq!(session.stage_kind(), StageKind::Memory);
        session.advance_stage();
        assert_eq!(session.stage_kind(), StageKind::Slider);
        assert!((session.progress() - 2.0 / 3.0).abs() < 1e-12);
        session.advance_stage();
        assert!(session.is_complete());
        assert_eq!(session.stage_index(), 2);
    }

    #[test]
    fn test_snapshot_and_summary() {
        let mut session = scenario_session();
        for _ in 0..75 {
            session.tick();
        }
        let snap = session.snapshot();
        assert_eq!(snap.stage_number, 1);
        assert_eq!(snap.total_stages, 3);
        assert_eq!(snap.clock, "01:15");
        assert_eq!(snap.stage_title, "Lockpick");

        let summary = session.summary();
        assert!(!summary.complete);
        assert_eq!(summary.message, None);

        clear_lockpick(&mut session);
        clear_memory(&mut session);
        clear_slider(&mut session);
        let snap = session.snapshot();
        assert_eq!(snap.stage_number, 3);
        assert!(snap.complete);

        let summary = session.summary();
        assert!(summary.complete);
        assert_eq!(summary.message.as_deref(), Some(ESCAPE_MESSAGE));
        assert_eq!(summary.attempts, 10);
    }

    #[test]
    fn test_huge_time_step_returns_promptly() {
        let mut session = Session::with_seed(1);
        session.pass_time_ms(u64::MAX);
        assert_eq!(session.elapsed_seconds(), u64::MAX / 1000);
        assert_eq!(session.stage_kind(), StageKind::Lockpick);

        // the clock saturates instead of wrapping
        session.pass_time_ms(u64::MAX);
        assert_eq!(session.elapsed_seconds(), u64::MAX / 1000 * 2);
        session.pass_time_ms(u64::MAX);
        assert_eq!(session.elapsed_seconds(), u64::MAX);
    }

    #[test]
    fn test_time_carry_across_calls() {
        let mut session = Session::with_seed(2);
        session.pass_time_ms(2_700);
        assert_eq!(session.elapsed_seconds(), 2);
        session.pass_time_ms(300);
        assert_eq!(session.elapsed_seconds(), 3);
        session.pass_time_ms(999);
        assert_eq!(session.elapsed_seconds(), 3);
    }

    #[test]
    fn test_format_clock() {
        assert_eq!(format_clock(0), "00:00");
        assert_eq!(format_clock(59), "00:59");
        assert_eq!(format_clock(61), "01:01");
        assert_eq!(format_clock(6000), "100:00");
    }
}
