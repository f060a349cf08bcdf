use thiserror::Error;

use crate::browser::BrowserError;
use crate::control::ControlError;
use crate::models::attempt::InvalidTransition;
use crate::models::snapshot::ConfigError;
use crate::records::SinkError;

/// Engine-level error type.
///
/// Everything the state machine can observe funnels into this enum so the run loop
/// can decide between "skip this candidate" and "give up on the run" in one place.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Operator requested a stop. Not a fault; unwinds the current attempt.
    #[error("Stop requested")]
    Stopped,

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Control channel error: {0}")]
    Control(#[from] ControlError),

    #[error("Missing credential: {0}")]
    MissingCredential(&'static str),

    #[error("Browser error: {0}")]
    Browser(#[from] BrowserError),

    #[error("Not signed in after waiting {waited_secs}s")]
    NotLoggedIn { waited_secs: u64 },

    #[error("Record sink error: {0}")]
    Sink(#[from] SinkError),

    #[error("{0}")]
    Transition(#[from] InvalidTransition),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl EngineError {
    /// Fatal faults propagate out of the engine; everything else is handled per candidate.
    pub fn is_fatal(&self) -> bool {
        match self {
            EngineError::Stopped => false,
            EngineError::Config(_) => true,
            EngineError::Control(_) => true,
            EngineError::MissingCredential(_) => true,
            EngineError::Browser(e) => e.is_fatal(),
            EngineError::NotLoggedIn { .. } => true,
            EngineError::Sink(_) => false,
            EngineError::Transition(_) => true,
            EngineError::Internal(_) => true,
        }
    }

    /// Short fault label used in activity lines.
    pub fn kind(&self) -> &'static str {
        match self {
            EngineError::Stopped => "STOPPED",
            EngineError::Config(_) => "CONFIG",
            EngineError::Control(_) => "CONTROL",
            EngineError::MissingCredential(_) => "MISSING_CREDENTIAL",
            EngineError::Browser(e) => e.kind(),
            EngineError::NotLoggedIn { .. } => "NOT_LOGGED_IN",
            EngineError::Sink(_) => "RECORD_SINK",
            EngineError::Transition(_) => "INTERNAL",
            EngineError::Internal(_) => "INTERNAL",
        }
    }
}
