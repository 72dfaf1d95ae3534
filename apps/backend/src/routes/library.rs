//! Source and topic registration, used by the ingestion side.

use axum::{extract::State, http::StatusCode, Json};

use crate::db::repository::{Source, Topic};
use crate::error::{ApiError, Result};
use crate::models::*;
use crate::AppState;

/// POST /api/sources
pub async fn create_source(
    State(state): State<AppState>,
    Json(payload): Json<CreateSourceRequest>,
) -> Result<(StatusCode, Json<Source>)> {
    if payload.title.trim().is_empty() {
        return Err(ApiError::BadRequest("source title is empty".to_string()));
    }
    let source = state.study.add_source(&payload.title)?;
    Ok((StatusCode::CREATED, Json(source)))
}

/// POST /api/topics
pub async fn create_topic(
    State(state): State<AppState>,
    Json(payload): Json<CreateTopicRequest>,
) -> Result<(StatusCode, Json<Topic>)> {
    let topic = state.study.add_topic(
        payload.source_id,
        &payload.title,
        payload.excerpt.as_deref(),
    )?;
    Ok((StatusCode::CREATED, Json(topic)))
}
