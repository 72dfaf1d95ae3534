//! Request and response types for the study API

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ApiError, Result};

// Re-export shared types from study-core
pub use study_core::{
    Card, CardSchedule, CardState, DueCounts, Grade, Scope, SessionStatus, StudySession,
};

// === Library Types ===

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSourceRequest {
    pub title: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTopicRequest {
    pub source_id: i64,
    pub title: String,
    #[serde(default)]
    pub excerpt: Option<String>,
}

/// A generated question/answer pair to schedule under a topic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCardRequest {
    pub topic_id: i64,
    pub question: String,
    pub answer: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuspendRequest {
    pub suspended: bool,
}

// === Study Types ===

/// Scope and size query parameters shared by queue and count endpoints.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScopeQuery {
    pub topic_id: Option<i64>,
    pub source_id: Option<i64>,
    pub limit: Option<usize>,
}

impl ScopeQuery {
    /// At most one of topic or source may be given.
    pub fn scope(&self) -> Result<Scope> {
        if self.topic_id.is_some() && self.source_id.is_some() {
            return Err(ApiError::BadRequest(
                "scope by topic_id or source_id, not both".to_string(),
            ));
        }
        Ok(Scope::from_filters(self.topic_id, self.source_id))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudyQueueResponse {
    pub cards: Vec<Card>,
    pub counts: DueCounts,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartSessionResponse {
    pub session_id: Uuid,
    pub queue: Vec<Card>,
}

/// Grade submission.
///
/// `grade` stays a raw integer so out-of-range values are rejected by the
/// engine with a proper error instead of a deserialization failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitReviewRequest {
    pub card_id: i64,
    pub grade: i64,
    #[serde(default)]
    pub elapsed_ms: Option<u64>,
    /// Defaults to the current session.
    #[serde(default)]
    pub session_id: Option<Uuid>,
    /// The card's `review_count` as the caller last saw it; a mismatch means
    /// the grade was already applied or the card moved on.
    #[serde(default)]
    pub expected_review_count: Option<u32>,
}

/// The authoritative new schedule after a grade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradeResponse {
    pub card_id: i64,
    pub new_state: CardState,
    pub step_index: u32,
    pub new_interval_days: f64,
    pub new_ease_factor: f64,
    pub due_date: DateTime<Utc>,
    pub review_count: u32,
    pub lapse_count: u32,
}

impl GradeResponse {
    pub fn from_schedule(card_id: i64, schedule: &CardSchedule, due_date: DateTime<Utc>) -> Self {
        Self {
            card_id,
            new_state: schedule.state,
            step_index: schedule.step_index,
            new_interval_days: schedule.interval_days,
            new_ease_factor: schedule.ease_factor,
            due_date,
            review_count: schedule.review_count,
            lapse_count: schedule.lapse_count,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSummary {
    #[serde(flatten)]
    pub session: StudySession,
    pub accuracy: f64,
}

impl From<StudySession> for SessionSummary {
    fn from(session: StudySession) -> Self {
        Self {
            accuracy: session.accuracy(),
            session,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatsQuery {
    pub days: Option<usize>,
}
