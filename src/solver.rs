//! Headless autoplayer
//!
//! Plays a session to the end using only what a player could see: it waits for
//! the needle to cover the target, watches the knot playback, and drags the
//! slider onto the window. Used by the `simulate` command and in tests to drive
//! whole sessions without a presentation layer.

use tracing::debug;

use crate::error::EngineError;
use crate::session::{Session, SessionSummary};
use crate::stage::{Knot, MemoryPhase, StageEngine};

/// Default time step between observations (ms)
pub const DEFAULT_STEP_MS: u64 = 10;

/// Default time allowed per stage before giving up (ms)
pub const DEFAULT_STAGE_BUDGET_MS: u64 = 120_000;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Move {
    Try,
    Press(Knot),
    Release(f64),
    Wait,
}

#[derive(Debug, Clone)]
pub struct Autoplayer {
    step_ms: u64,
    stage_budget_ms: u64,
}

impl Default for Autoplayer {
    fn default() -> Self {
        Self::new(DEFAULT_STEP_MS, DEFAULT_STAGE_BUDGET_MS)
    }
}

impl Autoplayer {
    pub fn new(step_ms: u64, stage_budget_ms: u64) -> Self {
        Self {
            step_ms: step_ms.max(1),
            stage_budget_ms,
        }
    }

    /// Play every remaining stage and return the final summary
    pub fn solve(&self, session: &mut Session) -> Result<SessionSummary, EngineError> {
        while !session.is_complete() {
            self.solve_stage(session)?;
        }
        Ok(session.summary())
    }

    /// Play until the live stage is cleared
    pub fn solve_stage(&self, session: &mut Session) -> Result<(), EngineError> {
        let index = session.stage_index();
        let kind = session.stage_kind();
        let mut waited_ms = 0u64;

        while !session.is_complete() && session.stage_index() == index {
            match next_move(session.stage()) {
                Move::Try => {
                    session.try_lock();
                }
                Move::Press(knot) => {
                    session.press(knot);
                }
                Move::Release(center) => {
                    session.set_slider_position(center);
                    session.release();
                }
                Move::Wait => {
                    if waited_ms >= self.stage_budget_ms {
                        return Err(EngineError::Stalled {
                            stage: kind.as_str(),
                            budget_ms: self.stage_budget_ms,
                        });
                    }
                    session.pass_time_ms(self.step_ms);
                    waited_ms += self.step_ms;
                }
            }
        }

        debug!(stage = kind.as_str(), waited_ms, "autoplayer cleared stage");
        Ok(())
    }
}

fn next_move(stage: &StageEngine) -> Move {
    match stage {
        StageEngine::Lockpick(lock) if lock.is_aligned() => Move::Try,
        StageEngine::Memory(memory) if memory.phase() == MemoryPhase::Input => memory
            .sequence()
            .get(memory.input_cursor())
            .copied()
            .map(Move::Press)
            .unwrap_or(Move::Wait),
        StageEngine::Slider(slider) => Move::Release(slider.window_center()),
        _ => Move::Wait,
    }
}
