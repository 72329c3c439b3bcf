//! Error types for the Escape Rig engine
//!
//! Missed attempts are ordinary game flow and never surface here. These errors
//! only arise while building a session (configuration, random scripts) or when
//! the headless solver gives up.

use thiserror::Error;

/// Errors that can occur while configuring or driving the engine
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Unknown knot: {0}")]
    UnknownKnot(String),

    #[error("Invalid random script: {0}")]
    InvalidRandomScript(String),

    #[error("Stage {stage} not solved within {budget_ms} ms")]
    Stalled { stage: &'static str, budget_ms: u64 },
}
