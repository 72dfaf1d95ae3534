//! Error handling for the backend API

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use study_core::CoreError;
use thiserror::Error;

use crate::db::DbError;

/// API error types
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Database(#[from] DbError),

    #[error("{0}")]
    Core(#[from] CoreError),

    #[error("Bad request: {0}")]
    BadRequest(String),
}

/// Error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
}

impl ApiError {
    fn classify(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            ApiError::Core(err) => classify_core(err),
            ApiError::Database(err) => match err {
                DbError::CardNotFound(_)
                | DbError::TopicNotFound(_)
                | DbError::SourceNotFound(_)
                | DbError::SessionNotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
                DbError::StaleState(_) => (StatusCode::CONFLICT, "stale_state"),
                DbError::SessionNotActive(_) => (StatusCode::CONFLICT, "session_not_active"),
                DbError::Core(core) => classify_core(core),
                DbError::Sqlite(_) | DbError::InvalidData(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "database_error")
                }
            },
        }
    }
}

fn classify_core(err: &CoreError) -> (StatusCode, &'static str) {
    match err {
        CoreError::InvalidGrade(_) => (StatusCode::BAD_REQUEST, "invalid_grade"),
        CoreError::SessionClosed(_) => (StatusCode::CONFLICT, "session_not_active"),
        CoreError::UnknownCardState(_) => (StatusCode::INTERNAL_SERVER_ERROR, "invalid_card_state"),
        CoreError::UnknownSessionStatus(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "invalid_session_status")
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type) = self.classify();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        let body = Json(ErrorResponse {
            error: error_type.to_string(),
            message: self.to_string(),
        });

        (status, body).into_response()
    }
}

/// Result type alias for API operations
pub type Result<T> = std::result::Result<T, ApiError>;
