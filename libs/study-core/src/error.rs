//! Error types for study-core.

use thiserror::Error;
use uuid::Uuid;

/// Result type alias using CoreError.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors raised by the scheduling engine.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoreError {
    #[error("invalid card state: {0}")]
    UnknownCardState(String),

    #[error("invalid grade {0}: expected 0 (again), 1 (hard), 2 (good) or 3 (easy)")]
    InvalidGrade(i64),

    #[error("invalid session status: {0}")]
    UnknownSessionStatus(String),

    #[error("session {0} is no longer active")]
    SessionClosed(Uuid),
}
