//! Study session endpoints

use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use crate::error::Result;
use crate::models::*;
use crate::AppState;

/// POST /api/sessions
///
/// Accepts the same scope fields as the queue endpoint, as a JSON body.
pub async fn start(
    State(state): State<AppState>,
    payload: Option<Json<ScopeQuery>>,
) -> Result<Json<StartSessionResponse>> {
    let query = payload.map(|Json(query)| query).unwrap_or_default();
    let response = state.study.start_session(query.scope()?, query.limit)?;
    Ok(Json(response))
}

/// GET /api/sessions/:id
pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionSummary>> {
    Ok(Json(state.study.get_session(id)?.into()))
}

/// POST /api/sessions/:id/end
pub async fn end(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionSummary>> {
    Ok(Json(state.study.end_session(id)?.into()))
}

/// POST /api/sessions/:id/abandon
pub async fn abandon(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionSummary>> {
    Ok(Json(state.study.abandon_session(id)?.into()))
}
