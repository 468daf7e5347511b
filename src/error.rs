//! Error types for the MindPatch core

use thiserror::Error;

/// Programming errors caught when a session is built. These abort
/// construction instead of degrading at runtime.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("session duration must be greater than zero")]
    ZeroDuration,

    #[error("step script for '{0}' has no steps")]
    EmptyScript(String),

    #[error("step scheduler needs at least one step")]
    NoSteps,
}

/// Failures reported by the data collaborator. Never fatal: callers keep
/// the last good state and surface a notice.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("{operation} failed: {reason}")]
    Unavailable {
        operation: &'static str,
        reason: String,
    },

    #[error("limit must be greater than zero")]
    InvalidLimit,
}

impl FetchError {
    pub fn unavailable(operation: &'static str, reason: impl Into<String>) -> Self {
        FetchError::Unavailable {
            operation,
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FeedbackError {
    #[error("select a score before submitting")]
    MissingScore,

    #[error("score {0} is outside 1..=5")]
    ScoreOutOfRange(u8),

    #[error("feedback prompt already closed")]
    Closed,
}
