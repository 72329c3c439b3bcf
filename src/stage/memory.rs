//! Stage 2: memory knots
//!
//! A short sequence of knots glows one after another. Once playback ends the
//! player repeats it. A wrong press sends the stage back to playback of the
//! same sequence; the sequence is drawn once per stage instance.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace};

use crate::config::MemoryConfig;
use crate::error::EngineError;
use crate::random::RandomSource;
use crate::stage::AttemptOutcome;

/// The four-symbol alphabet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Knot {
    Rose,
    Amber,
    Emerald,
    Sky,
}

impl Knot {
    pub const ALL: [Knot; 4] = [Knot::Rose, Knot::Amber, Knot::Emerald, Knot::Sky];

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn index(self) -> usize {
        match self {
            Knot::Rose => 0,
            Knot::Amber => 1,
            Knot::Emerald => 2,
            Knot::Sky => 3,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Knot::Rose => "rose",
            Knot::Amber => "amber",
            Knot::Emerald => "emerald",
            Knot::Sky => "sky",
        }
    }
}

impl fmt::Display for Knot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl TryFrom<u8> for Knot {
    type Error = EngineError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Knot::from_index(value as usize).ok_or_else(|| EngineError::UnknownKnot(value.to_string()))
    }
}

/// Accepts a knot name (`"sky"`) or its index (`"3"`)
impl FromStr for Knot {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Ok(index) = trimmed.parse::<u8>() {
            return Knot::try_from(index);
        }
        Knot::ALL
            .iter()
            .copied()
            .find(|k| k.name().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| EngineError::UnknownKnot(trimmed.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryPhase {
    Playback,
    Input,
}

/// Rendering view of the knot board.
///
/// The sequence itself is not part of the view; only the knot currently lit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MemorySnapshot {
    pub phase: MemoryPhase,
    pub lit: Option<Knot>,
    pub playback_cursor: usize,
    pub input_cursor: usize,
    pub sequence_len: usize,
    pub elapsed_ms: u64,
    pub disabled: bool,
    pub complete: bool,
}

#[derive(Debug, Clone)]
pub struct MemoryStage {
    config: MemoryConfig,
    sequence: Vec<Knot>,
    phase: MemoryPhase,
    /// Stage time at which the current playback began
    playback_started_ms: u64,
    playback_cursor: usize,
    input_cursor: usize,
    elapsed_ms: u64,
    disabled: bool,
    completed: bool,
}

impl MemoryStage {
    pub fn new(config: MemoryConfig, rng: &mut dyn RandomSource) -> Result<Self, EngineError> {
        config.validate()?;
        Ok(Self::build(config, rng))
    }

    /// Stage with a known sequence, e.g. for replaying a recorded session.
    ///
    /// The sequence may differ in length from `config.sequence_len` but cannot
    /// be empty.
    pub fn with_sequence(config: MemoryConfig, sequence: Vec<Knot>) -> Result<Self, EngineError> {
        config.validate()?;
        if sequence.is_empty() {
            return Err(EngineError::InvalidConfig(
                "memory sequence must contain at least one knot".to_string(),
            ));
        }
        Ok(Self::from_parts(config, sequence))
    }

    /// Construct from a configuration that is already validated
    pub(crate) fn build(config: MemoryConfig, rng: &mut dyn RandomSource) -> Self {
        let sequence = generate_sequence(config.sequence_len, rng);
        debug!(len = sequence.len(), "memory stage ready");
        Self::from_parts(config, sequence)
    }

    fn from_parts(config: MemoryConfig, sequence: Vec<Knot>) -> Self {
        Self {
            config,
            sequence,
            phase: MemoryPhase::Playback,
            playback_started_ms: 0,
            playback_cursor: 0,
            input_cursor: 0,
            elapsed_ms: 0,
            disabled: false,
            completed: false,
        }
    }

    pub fn sequence(&self) -> &[Knot] {
        &self.sequence
    }

    pub fn phase(&self) -> MemoryPhase {
        self.phase
    }

    /// Knots presented so far in the current playback
    pub fn playback_cursor(&self) -> usize {
        self.playback_cursor
    }

    /// Knots correctly repeated so far
    pub fn input_cursor(&self) -> usize {
        self.input_cursor
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed_ms
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

    /// Stage time at which input opens for the current playback
    pub fn input_opens_at_ms(&self) -> u64 {
        self.playback_started_ms
            .saturating_add(self.config.step_ms.saturating_mul(self.sequence.len() as u64))
    }

    /// Knot glowing right now, if any.
    ///
    /// Knot `i` lights at `step·(i+1)` after playback starts and stays lit for
    /// `flash_ms`. The last flash may outlast the switch to input.
    pub fn lit_knot(&self) -> Option<Knot> {
        let since = self.elapsed_ms.saturating_sub(self.playback_started_ms);
        let step = self.config.step_ms;
        if since < step {
            return None;
        }
        let slot = (since / step) as usize;
        let index = slot - 1;
        let into_flash = since - (slot as u64) * step;
        if index < self.sequence.len() && into_flash < self.config.flash_ms {
            Some(self.sequence[index])
        } else {
            None
        }
    }

    pub fn advance(&mut self, delta_ms: u64) {
        if self.disabled {
            return;
        }
        self.elapsed_ms = self.elapsed_ms.saturating_add(delta_ms);

        if self.phase != MemoryPhase::Playback {
            return;
        }

        let since = self.elapsed_ms - self.playback_started_ms;
        let presented = ((since / self.config.step_ms) as usize).min(self.sequence.len());
        while self.playback_cursor < presented {
            trace!(
                index = self.playback_cursor,
                knot = %self.sequence[self.playback_cursor],
                "memory playback step"
            );
            self.playback_cursor += 1;
        }

        if self.playback_cursor >= self.sequence.len() {
            self.phase = MemoryPhase::Input;
            self.input_cursor = 0;
            debug!(elapsed_ms = self.elapsed_ms, "memory input open");
        }
    }

    /// Press a knot during input
    pub fn press(&mut self, knot: Knot) -> AttemptOutcome {
        if self.disabled || self.completed || self.phase == MemoryPhase::Playback {
            return AttemptOutcome::Ignored;
        }

        if self.sequence.get(self.input_cursor) == Some(&knot) {
            self.input_cursor += 1;
            if self.input_cursor >= self.sequence.len() {
                self.completed = true;
                info!(elapsed_ms = self.elapsed_ms, "memory knots repeated");
                return AttemptOutcome::Completed;
            }
            debug!(input_cursor = self.input_cursor, "memory press matched");
            AttemptOutcome::Progressed
        } else {
            debug!(
                pressed = %knot,
                at = self.input_cursor,
                "memory press wrong, replaying sequence"
            );
            self.restart_playback();
            AttemptOutcome::Missed
        }
    }

    fn restart_playback(&mut self) {
        self.phase = MemoryPhase::Playback;
        self.playback_started_ms = self.elapsed_ms;
        self.playback_cursor = 0;
        self.input_cursor = 0;
    }

    pub fn snapshot(&self) -> MemorySnapshot {
        MemorySnapshot {
            phase: self.phase,
            lit: self.lit_knot(),
            playback_cursor: self.playback_cursor,
            input_cursor: self.input_cursor,
            sequence_len: self.sequence.len(),
            elapsed_ms: self.elapsed_ms,
            disabled: self.disabled,
            complete: self.completed,
        }
    }
}

/// Independent draws with replacement
fn generate_sequence(len: usize, rng: &mut dyn RandomSource) -> Vec<Knot> {
    (0..len)
        .map(|_| Knot::ALL[rng.index(Knot::ALL.len())])
        .collect()
}
