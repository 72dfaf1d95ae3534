//! Study endpoints

use axum::{
    extract::{Query, State},
    Json,
};

use crate::error::Result;
use crate::models::*;
use crate::AppState;

/// GET /api/study/queue
pub async fn queue(
    State(state): State<AppState>,
    Query(query): Query<ScopeQuery>,
) -> Result<Json<StudyQueueResponse>> {
    let scope = query.scope()?;
    let cards = state.study.queue(scope, query.limit)?;
    let counts = state.study.get_due_counts(scope)?;
    Ok(Json(StudyQueueResponse { cards, counts }))
}

/// GET /api/study/due-counts
pub async fn due_counts(
    State(state): State<AppState>,
    Query(query): Query<ScopeQuery>,
) -> Result<Json<DueCounts>> {
    let counts = state.study.get_due_counts(query.scope()?)?;
    Ok(Json(counts))
}

/// POST /api/study/review
pub async fn review(
    State(state): State<AppState>,
    Json(payload): Json<SubmitReviewRequest>,
) -> Result<Json<GradeResponse>> {
    let response = state.study.grade_card(&payload)?;
    Ok(Json(response))
}
