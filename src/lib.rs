//! Escape Rig - headless engine for a three-stage puzzle breakout
//!
//! A session runs three short challenges in order: a timing lockpick, a
//! memory sequence, and a slider with a drifting safe window. The engine is a
//! synchronous state machine driven by discrete player actions and by elapsed
//! time; it performs no I/O and renders nothing. A UI shell reads snapshots and
//! forwards actions.
//!
//! ## Modules
//!
//! - **Session**: stage sequencing, attempt tally, session clock, reset
//! - **Stages**: the lockpick, memory and slider state machines
//! - **Solver**: a headless autoplayer for simulation and testing

pub mod config;
pub mod error;
pub mod geometry;
pub mod random;
pub mod session;
pub mod solver;
pub mod stage;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use config::{EngineConfig, LockpickConfig, MemoryConfig, SliderConfig, TOTAL_STAGES};
pub use error::EngineError;
pub use geometry::circular_distance;
pub use random::{RandomSource, ScriptedRandom, SeededRandom};
pub use session::{format_clock, Session, SessionSnapshot, SessionSummary, ESCAPE_MESSAGE};
pub use solver::Autoplayer;

// Stage exports
pub use stage::{AttemptOutcome, Knot, MemoryPhase, StageAction, StageEngine, StageKind, StageSnapshot};

/// Engine version embedded in CLI output
pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name reported by the CLI
pub const PRODUCER_NAME: &str = "escape-rig";
