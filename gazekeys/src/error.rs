//! Error taxonomy for the tracker.
//!
//! Lost signal and hit-test misses are ordinary states, not errors; they
//! are carried as `SignalState::Lost` and `None` hits respectively.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TrackerError {
    /// The gaze engine failed to start, resume, or record a sample.
    #[error("gaze engine unavailable: {0}")]
    EngineUnavailable(String),

    /// `confirm_current` was called with no calibration in progress.
    #[error("no calibration in progress")]
    CalibrationInactive,

    /// The keyboard was requested before tracking is ready.
    #[error("keyboard unavailable until calibration completes")]
    KeyboardUnavailable,

    /// The action is not possible in the session's current phase.
    #[error("cannot {action} while {phase}")]
    InvalidPhase {
        action: &'static str,
        phase: &'static str,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl TrackerError {
    /// Shorthand used by engine implementations.
    pub fn engine(msg: impl Into<String>) -> Self {
        Self::EngineUnavailable(msg.into())
    }
}

pub type Result<T, E = TrackerError> = std::result::Result<T, E>;
