//! Statistics endpoints

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Serialize;

use crate::db::{CalendarData, StudyStats};
use crate::error::Result;
use crate::models::StatsQuery;
use crate::AppState;

const DEFAULT_CALENDAR_DAYS: usize = 30;

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    #[serde(flatten)]
    pub stats: StudyStats,
    pub calendar: Vec<CalendarData>,
}

/// GET /api/stats
pub async fn get(
    State(state): State<AppState>,
    Query(query): Query<StatsQuery>,
) -> Result<Json<StatsResponse>> {
    let stats = state.study.stats()?;
    let calendar = state
        .study
        .calendar(query.days.unwrap_or(DEFAULT_CALENDAR_DAYS))?;
    Ok(Json(StatsResponse { stats, calendar }))
}
