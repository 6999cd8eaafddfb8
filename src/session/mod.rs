//! Analysis session
//!
//! Client-side state machine for "select patient, upload meal, refresh results".

pub mod controller;
pub mod state;

use std::path::PathBuf;

use thiserror::Error;

use crate::api::ApiError;

pub use controller::{AnalysisSessionController, RefreshOutcome, SessionSnapshot, SubmitOutcome};
pub use state::{
    Notification, RefreshTag, SessionPhase, SessionState, CACHE_BADGE_WINDOW, MAX_RECOVERY_POLLS,
    TIMEOUT_GRACE_PERIOD,
};

/// Session operation error types
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("Meal image not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("No patient selected")]
    NoPatientSelected,

    #[error("Unknown patient: {0}")]
    UnknownPatient(i64),

    #[error("Meal {0} is not in the loaded history")]
    UnknownMeal(i64),
}

/// Result type for session operations
pub type SessionResult<T> = Result<T, SessionError>;
