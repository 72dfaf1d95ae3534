//! Scheduling service boundary.
//!
//! Everything the rest of the system does with the engine goes through
//! [`StudyService`]: start a session, grade a card, end a session, read due
//! counts. The service owns the store, the algorithm and the current-session
//! slot; no state lives in globals.

use std::sync::{Mutex, MutexGuard, PoisonError};

use study_core::{
    apply_grade, Card, DueCounts, Grade, Scope, SpacedRepetitionAlgorithm, StudySession,
    MAX_QUEUE_LIMIT,
};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::db::date_utils;
use crate::db::repository::{Source, Topic};
use crate::db::{
    CalendarData, CardRepository, DbError, LibraryRepository, ReviewRepository, SessionRepository,
    SqliteRepository, StatsRepository, StoredReview, StudyStats,
};
use crate::error::Result;
use crate::models::{GradeResponse, StartSessionResponse, SubmitReviewRequest};

/// Longest stats calendar window served.
pub const MAX_CALENDAR_DAYS: usize = 366;

/// The engine's service boundary.
pub struct StudyService {
    repository: Mutex<SqliteRepository>,
    algorithm: Box<dyn SpacedRepetitionAlgorithm>,
    queue_limit: usize,
    /// Lock before `repository` when both are needed.
    current_session: Mutex<Option<Uuid>>,
}

impl StudyService {
    pub fn new(
        repository: SqliteRepository,
        algorithm: Box<dyn SpacedRepetitionAlgorithm>,
        queue_limit: usize,
    ) -> Self {
        Self {
            repository: Mutex::new(repository),
            algorithm,
            queue_limit,
            current_session: Mutex::new(None),
        }
    }

    fn repo(&self) -> MutexGuard<'_, SqliteRepository> {
        self.repository.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn slot(&self) -> MutexGuard<'_, Option<Uuid>> {
        self.current_session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Requested batch size, falling back to the configured default and capped.
    fn batch_size(&self, limit: Option<usize>) -> usize {
        limit.unwrap_or(self.queue_limit).min(MAX_QUEUE_LIMIT)
    }

    /// The session grades fall into when the caller names none.
    pub fn current_session(&self) -> Option<Uuid> {
        *self.slot()
    }

    // === Sessions ===

    /// Create a session and hand out its first queue.
    ///
    /// A session that is still current gets completed first, so only one
    /// session accrues counters at a time.
    pub fn start_session(&self, scope: Scope, limit: Option<usize>) -> Result<StartSessionResponse> {
        let now = date_utils::now();
        let mut slot = self.slot();
        let repo = self.repo();

        if let Some(previous) = slot.take() {
            if let Some(mut session) = repo.get_session(previous)? {
                if session.is_active() {
                    session.complete(now)?;
                    repo.close_session(&session)?;
                    info!(session_id = %previous, "completed previous session");
                }
            }
        }

        let session = StudySession::start(scope, now);
        repo.create_session(&session)?;
        let queue = repo.study_queue(scope, self.batch_size(limit), now)?;
        *slot = Some(session.id);

        info!(session_id = %session.id, ?scope, queued = queue.len(), "started study session");
        Ok(StartSessionResponse {
            session_id: session.id,
            queue,
        })
    }

    /// Mark a session completed.
    pub fn end_session(&self, id: Uuid) -> Result<StudySession> {
        self.close_session(id, |session, now| session.complete(now))
    }

    /// Mark a session abandoned (terminated without a completion signal).
    pub fn abandon_session(&self, id: Uuid) -> Result<StudySession> {
        self.close_session(id, |session, now| session.abandon(now))
    }

    fn close_session<F>(&self, id: Uuid, close: F) -> Result<StudySession>
    where
        F: FnOnce(&mut StudySession, chrono::DateTime<chrono::Utc>) -> study_core::Result<()>,
    {
        let now = date_utils::now();
        let mut slot = self.slot();
        let repo = self.repo();

        let mut session = repo.get_session(id)?.ok_or(DbError::SessionNotFound(id))?;
        close(&mut session, now)?;
        repo.close_session(&session)?;
        if *slot == Some(id) {
            *slot = None;
        }

        info!(
            session_id = %id,
            status = %session.status,
            studied = session.cards_studied,
            correct = session.cards_correct,
            "closed study session"
        );
        Ok(session)
    }

    pub fn get_session(&self, id: Uuid) -> Result<StudySession> {
        Ok(self.repo().get_session(id)?.ok_or(DbError::SessionNotFound(id))?)
    }

    // === Grading ===

    /// Apply a grade and return the card's authoritative new schedule.
    ///
    /// Nothing is written unless the grade is valid, the card exists, and the
    /// card has not moved since it was read. A grade naming a session that has
    /// since closed still applies; it just no longer counts toward that session.
    pub fn grade_card(&self, request: &SubmitReviewRequest) -> Result<GradeResponse> {
        let grade = Grade::from_value(request.grade)?;
        let session_id = request.session_id.or_else(|| self.current_session());
        let now = date_utils::now();
        let mut repo = self.repo();

        let card = repo
            .get_card(request.card_id)?
            .ok_or(DbError::CardNotFound(request.card_id))?;

        if let Some(expected) = request.expected_review_count {
            if expected != card.schedule.review_count {
                warn!(
                    card_id = card.id,
                    expected,
                    actual = card.schedule.review_count,
                    "refusing grade against an outdated card"
                );
                return Err(DbError::StaleState(card.id).into());
            }
        }

        let outcome = apply_grade(
            self.algorithm.as_ref(),
            &card.schedule,
            card.id,
            grade,
            request.elapsed_ms,
            session_id,
            now,
        );

        let counted = match repo.record_grade(card.id, &card.schedule, &outcome) {
            Ok(counted) => counted,
            Err(err) => {
                if matches!(err, DbError::StaleState(_)) {
                    warn!(card_id = card.id, "concurrent grade detected; nothing applied");
                }
                return Err(err.into());
            }
        };
        if let (Some(requested), None) = (session_id, counted) {
            debug!(card_id = card.id, session_id = %requested, "session not active; grade left unattached");
        }

        debug!(
            card_id = card.id,
            grade = grade.value(),
            from = %card.schedule.state,
            to = %outcome.schedule.state,
            step_index = outcome.schedule.step_index,
            lapsed = outcome.lapsed,
            "graded card"
        );
        Ok(GradeResponse::from_schedule(card.id, &outcome.schedule, outcome.due_date))
    }

    // === Reads ===

    /// Read-only peek at what a session in this scope would get.
    pub fn queue(&self, scope: Scope, limit: Option<usize>) -> Result<Vec<Card>> {
        let limit = self.batch_size(limit);
        Ok(self.repo().study_queue(scope, limit, date_utils::now())?)
    }

    pub fn get_due_counts(&self, scope: Scope) -> Result<DueCounts> {
        Ok(self.repo().due_counts(scope, date_utils::now())?)
    }

    pub fn get_card(&self, id: i64) -> Result<Card> {
        Ok(self.repo().get_card(id)?.ok_or(DbError::CardNotFound(id))?)
    }

    pub fn card_reviews(&self, id: i64) -> Result<Vec<StoredReview>> {
        let repo = self.repo();
        if repo.get_card(id)?.is_none() {
            return Err(DbError::CardNotFound(id).into());
        }
        Ok(repo.reviews_for_card(id)?)
    }

    pub fn stats(&self) -> Result<StudyStats> {
        Ok(self.repo().get_study_stats(date_utils::now())?)
    }

    /// Daily review counts for the trailing `days`, capped at [`MAX_CALENDAR_DAYS`].
    pub fn calendar(&self, days: usize) -> Result<Vec<CalendarData>> {
        let days = days.min(MAX_CALENDAR_DAYS);
        Ok(self.repo().get_calendar_data(days, date_utils::now())?)
    }

    // === Library ===

    pub fn add_source(&self, title: &str) -> Result<Source> {
        Ok(self.repo().insert_source(title)?)
    }

    pub fn add_topic(&self, source_id: i64, title: &str, excerpt: Option<&str>) -> Result<Topic> {
        Ok(self.repo().insert_topic(source_id, title, excerpt)?)
    }

    pub fn add_card(&self, topic_id: i64, question: &str, answer: &str) -> Result<Card> {
        Ok(self.repo().insert_card(topic_id, question, answer)?)
    }

    pub fn set_suspended(&self, id: i64, suspended: bool) -> Result<Card> {
        let card = self.repo().set_suspended(id, suspended)?;
        info!(card_id = id, suspended, "updated card suspension");
        Ok(card)
    }
}
