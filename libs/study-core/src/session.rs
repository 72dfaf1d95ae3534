//! Study session aggregate.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{CoreError, Result};
use crate::types::{Grade, Scope};

/// Lifecycle of a study session. Completed and abandoned are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Active,
    Completed,
    Abandoned,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Abandoned => "abandoned",
        }
    }
}

impl FromStr for SessionStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "completed" => Ok(Self::Completed),
            "abandoned" => Ok(Self::Abandoned),
            other => Err(CoreError::UnknownSessionStatus(other.to_string())),
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One continuous study run with running counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudySession {
    pub id: Uuid,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
    pub status: SessionStatus,
    pub cards_studied: u32,
    pub cards_correct: u32,
    pub total_time_ms: u64,
    pub scope: Scope,
}

impl StudySession {
    /// Begin a new active session.
    pub fn start(scope: Scope, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            started_at: now,
            ended_at: None,
            status: SessionStatus::Active,
            cards_studied: 0,
            cards_correct: 0,
            total_time_ms: 0,
            scope,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == SessionStatus::Active
    }

    /// Count one graded card.
    pub fn record(&mut self, grade: Grade, elapsed_ms: Option<u64>) -> Result<()> {
        self.ensure_active()?;
        let tally = SessionTally::for_grade(grade, elapsed_ms);
        self.cards_studied = self.cards_studied.saturating_add(tally.studied);
        self.cards_correct = self.cards_correct.saturating_add(tally.correct);
        self.total_time_ms = self.total_time_ms.saturating_add(tally.time_ms);
        Ok(())
    }

    pub fn complete(&mut self, now: DateTime<Utc>) -> Result<()> {
        self.close(SessionStatus::Completed, now)
    }

    pub fn abandon(&mut self, now: DateTime<Utc>) -> Result<()> {
        self.close(SessionStatus::Abandoned, now)
    }

    /// Share of studied cards graded Good or Easy, 0.0 for an empty session.
    pub fn accuracy(&self) -> f64 {
        if self.cards_studied == 0 {
            0.0
        } else {
            self.cards_correct as f64 / self.cards_studied as f64
        }
    }

    fn close(&mut self, status: SessionStatus, now: DateTime<Utc>) -> Result<()> {
        self.ensure_active()?;
        self.status = status;
        self.ended_at = Some(now);
        Ok(())
    }

    fn ensure_active(&self) -> Result<()> {
        if self.is_active() {
            Ok(())
        } else {
            Err(CoreError::SessionClosed(self.id))
        }
    }
}

/// Counter increments one grade contributes to its session.
///
/// Storage applies these same deltas atomically instead of round-tripping
/// the whole session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionTally {
    pub studied: u32,
    pub correct: u32,
    pub time_ms: u64,
}

impl SessionTally {
    pub fn for_grade(grade: Grade, elapsed_ms: Option<u64>) -> Self {
        Self {
            studied: 1,
            correct: u32::from(grade.is_correct()),
            time_ms: elapsed_ms.unwrap_or(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn record_counts_correct_grades() {
        let mut session = StudySession::start(Scope::All, Utc::now());
        session.record(Grade::Again, Some(1000)).unwrap();
        session.record(Grade::Hard, None).unwrap();
        session.record(Grade::Good, Some(500)).unwrap();
        session.record(Grade::Easy, Some(250)).unwrap();

        assert_eq!(session.cards_studied, 4);
        assert_eq!(session.cards_correct, 2);
        assert_eq!(session.total_time_ms, 1750);
        assert_eq!(session.accuracy(), 0.5);
    }

    #[test]
    fn tally_counts_only_good_and_easy() {
        assert_eq!(
            SessionTally::for_grade(Grade::Hard, Some(900)),
            SessionTally { studied: 1, correct: 0, time_ms: 900 }
        );
        assert_eq!(
            SessionTally::for_grade(Grade::Good, None),
            SessionTally { studied: 1, correct: 1, time_ms: 0 }
        );
    }

    #[test]
    fn huge_elapsed_time_saturates() {
        let mut session = StudySession::start(Scope::All, Utc::now());
        session.record(Grade::Good, Some(u64::MAX)).unwrap();
        session.record(Grade::Good, Some(10)).unwrap();
        assert_eq!(session.total_time_ms, u64::MAX);
    }

    #[test]
    fn completed_session_is_terminal() {
        let now = Utc::now();
        let mut session = StudySession::start(Scope::Topic(3), now);
        session.complete(now).unwrap();

        assert_eq!(session.status, SessionStatus::Completed);
        assert_eq!(session.ended_at, Some(now));
        assert_eq!(
            session.record(Grade::Good, None),
            Err(CoreError::SessionClosed(session.id))
        );
        assert!(session.abandon(now).is_err());
        assert!(session.complete(now).is_err());
    }

    #[test]
    fn abandon_marks_session_abandoned() {
        let mut session = StudySession::start(Scope::All, Utc::now());
        session.abandon(Utc::now()).unwrap();
        assert_eq!(session.status, SessionStatus::Abandoned);
        assert!(!session.is_active());
    }

    #[test]
    fn empty_session_accuracy_is_zero() {
        let session = StudySession::start(Scope::All, Utc::now());
        assert_eq!(session.accuracy(), 0.0);
    }

    #[test]
    fn status_parses_storage_names() {
        assert_eq!("abandoned".parse::<SessionStatus>(), Ok(SessionStatus::Abandoned));
        assert_eq!(
            "paused".parse::<SessionStatus>(),
            Err(CoreError::UnknownSessionStatus("paused".to_string()))
        );
    }
}
