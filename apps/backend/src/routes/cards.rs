//! Card endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::db::StoredReview;
use crate::error::Result;
use crate::models::*;
use crate::AppState;

/// POST /api/cards
pub async fn create(
    State(state): State<AppState>,
    Json(payload): Json<CreateCardRequest>,
) -> Result<(StatusCode, Json<Card>)> {
    let card = state
        .study
        .add_card(payload.topic_id, &payload.question, &payload.answer)?;
    Ok((StatusCode::CREATED, Json(card)))
}

/// GET /api/cards/:id
pub async fn get(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Json<Card>> {
    Ok(Json(state.study.get_card(id)?))
}

/// GET /api/cards/:id/reviews
pub async fn reviews(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<StoredReview>>> {
    Ok(Json(state.study.card_reviews(id)?))
}

/// PUT /api/cards/:id/suspend
pub async fn suspend(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<SuspendRequest>,
) -> Result<Json<Card>> {
    Ok(Json(state.study.set_suspended(id, payload.suspended)?))
}
