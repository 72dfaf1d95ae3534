//! Database error types.

use study_core::CoreError;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("card not found: {0}")]
    CardNotFound(i64),

    #[error("topic not found: {0}")]
    TopicNotFound(i64),

    #[error("source not found: {0}")]
    SourceNotFound(i64),

    #[error("session not found: {0}")]
    SessionNotFound(Uuid),

    #[error("session {0} is not active")]
    SessionNotActive(Uuid),

    #[error("card {0} changed since it was read; re-fetch and retry")]
    StaleState(i64),

    #[error("invalid data: {0}")]
    InvalidData(String),

    #[error(transparent)]
    Core(#[from] CoreError),
}
