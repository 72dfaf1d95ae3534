//! Repository pattern for database access.

use crate::db::date_utils::{self, from_db, from_db_opt, to_db};
use crate::db::error::DbError;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, ToSql};
use serde::{Deserialize, Serialize};
use std::path::Path;
use study_core::{
    assemble_with, Card, CardSchedule, CardState, DueCounts, Grade, GradeOutcome, QueueTier,
    ReviewRecord, Scope, SessionStatus, SessionTally, StudySession,
};
use uuid::Uuid;

type Result<T> = std::result::Result<T, DbError>;

/// Columns selected for every card read; pairs with [`CardRow::from_row`].
const CARD_COLUMNS: &str = "c.id, c.topic_id, t.source_id, c.question, c.answer, c.state, \
     c.step_index, c.interval_days, c.ease_factor, c.due_date, c.is_suspended, \
     c.review_count, c.lapse_count";

/// Scope filter on `?1` (topic) and `?2` (source).
const SCOPE_FILTER: &str = "(?1 IS NULL OR c.topic_id = ?1) AND (?2 IS NULL OR t.source_id = ?2)";

/// A source document registered by the ingestion service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    pub id: i64,
    pub title: String,
    pub created_at: DateTime<Utc>,
}

/// A topic segmented out of a source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Topic {
    pub id: i64,
    pub source_id: i64,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Ledger entry as stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredReview {
    pub id: i64,
    #[serde(flatten)]
    pub review: ReviewRecord,
}

/// Overall study statistics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudyStats {
    pub reviews_today: usize,
    pub total_reviews: usize,
    pub retention_rate: f64,
    pub total_lapses: usize,
    pub sessions_completed: usize,
}

/// Calendar data point.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalendarData {
    pub date: String,
    pub reviews: usize,
}

/// Repository for sources and topics (written by the ingestion collaborators).
pub trait LibraryRepository {
    fn insert_source(&self, title: &str) -> Result<Source>;
    fn insert_topic(&self, source_id: i64, title: &str, excerpt: Option<&str>) -> Result<Topic>;
}

/// Repository for card operations.
pub trait CardRepository {
    fn insert_card(&self, topic_id: i64, question: &str, answer: &str) -> Result<Card>;
    fn get_card(&self, id: i64) -> Result<Option<Card>>;
    fn set_suspended(&self, id: i64, suspended: bool) -> Result<Card>;
    fn get_tier_cards(
        &self,
        tier: QueueTier,
        scope: Scope,
        limit: usize,
        now: DateTime<Utc>,
    ) -> Result<Vec<Card>>;
    fn study_queue(&self, scope: Scope, limit: usize, now: DateTime<Utc>) -> Result<Vec<Card>>;
    fn due_counts(&self, scope: Scope, now: DateTime<Utc>) -> Result<DueCounts>;
}

/// Repository for the review ledger.
pub trait ReviewRepository {
    /// Persist one grade: card update, ledger entry and session counters, all or nothing.
    ///
    /// The card is only updated if its stored scheduling fields still equal `before`.
    /// Returns the session the grade was counted toward, if that session was active.
    fn record_grade(
        &mut self,
        card_id: i64,
        before: &CardSchedule,
        outcome: &GradeOutcome,
    ) -> Result<Option<Uuid>>;
    fn reviews_for_card(&self, card_id: i64) -> Result<Vec<StoredReview>>;
}

/// Repository for study sessions.
pub trait SessionRepository {
    fn create_session(&self, session: &StudySession) -> Result<()>;
    fn get_session(&self, id: Uuid) -> Result<Option<StudySession>>;
    /// Write a terminal status, only if the stored session is still active.
    fn close_session(&self, session: &StudySession) -> Result<()>;
}

/// Repository for statistics operations.
pub trait StatsRepository {
    fn get_study_stats(&self, now: DateTime<Utc>) -> Result<StudyStats>;
    fn get_calendar_data(&self, days: usize, now: DateTime<Utc>) -> Result<Vec<CalendarData>>;
}

/// SQLite implementation of repositories.
pub struct SqliteRepository {
    conn: Connection,
}

impl SqliteRepository {
    /// Open database at path, creating if necessary.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        let repo = Self { conn };
        repo.initialize()?;
        Ok(repo)
    }

    /// Open in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let repo = Self { conn };
        repo.initialize()?;
        Ok(repo)
    }

    fn initialize(&self) -> Result<()> {
        self.conn.pragma_update(None, "foreign_keys", true)?;
        self.conn.execute_batch(super::schema::SCHEMA)?;
        self.conn.execute(
            "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
            params![super::schema::SCHEMA_VERSION],
        )?;
        Ok(())
    }

    fn topic_exists(&self, topic_id: i64) -> Result<bool> {
        let found: Option<i64> = self
            .conn
            .query_row("SELECT id FROM topics WHERE id = ?1", params![topic_id], |row| row.get(0))
            .optional()?;
        Ok(found.is_some())
    }
}

/// Card as read from SQLite, before the state text is validated.
struct CardRow {
    id: i64,
    topic_id: i64,
    source_id: i64,
    question: String,
    answer: String,
    state: String,
    step_index: u32,
    interval_days: f64,
    ease_factor: f64,
    due_date: Option<String>,
    is_suspended: bool,
    review_count: u32,
    lapse_count: u32,
}

impl CardRow {
    fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            topic_id: row.get(1)?,
            source_id: row.get(2)?,
            question: row.get(3)?,
            answer: row.get(4)?,
            state: row.get(5)?,
            step_index: row.get(6)?,
            interval_days: row.get(7)?,
            ease_factor: row.get(8)?,
            due_date: row.get(9)?,
            is_suspended: row.get(10)?,
            review_count: row.get(11)?,
            lapse_count: row.get(12)?,
        })
    }

    /// Refuses unknown states rather than treating them as new.
    fn into_card(self) -> Result<Card> {
        let state = self.state.parse::<CardState>().map_err(|e| {
            tracing::warn!(card_id = self.id, state = %self.state, "refusing card with corrupt state");
            DbError::Core(e)
        })?;
        Ok(Card {
            id: self.id,
            topic_id: self.topic_id,
            source_id: self.source_id,
            question: self.question,
            answer: self.answer,
            schedule: CardSchedule {
                state,
                step_index: self.step_index,
                interval_days: self.interval_days,
                ease_factor: self.ease_factor,
                due_date: from_db_opt(self.due_date)?,
                is_suspended: self.is_suspended,
                review_count: self.review_count,
                lapse_count: self.lapse_count,
            },
        })
    }
}

impl LibraryRepository for SqliteRepository {
    fn insert_source(&self, title: &str) -> Result<Source> {
        let created_at = date_utils::now();
        self.conn.execute(
            "INSERT INTO sources (title, created_at) VALUES (?1, ?2)",
            params![title, to_db(created_at)],
        )?;
        Ok(Source {
            id: self.conn.last_insert_rowid(),
            title: title.to_string(),
            created_at,
        })
    }

    fn insert_topic(&self, source_id: i64, title: &str, excerpt: Option<&str>) -> Result<Topic> {
        let source: Option<i64> = self
            .conn
            .query_row("SELECT id FROM sources WHERE id = ?1", params![source_id], |row| row.get(0))
            .optional()?;
        if source.is_none() {
            return Err(DbError::SourceNotFound(source_id));
        }

        let created_at = date_utils::now();
        self.conn.execute(
            "INSERT INTO topics (source_id, title, excerpt, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![source_id, title, excerpt, to_db(created_at)],
        )?;
        Ok(Topic {
            id: self.conn.last_insert_rowid(),
            source_id,
            title: title.to_string(),
            excerpt: excerpt.map(str::to_string),
            created_at,
        })
    }
}

impl CardRepository for SqliteRepository {
    fn insert_card(&self, topic_id: i64, question: &str, answer: &str) -> Result<Card> {
        if !self.topic_exists(topic_id)? {
            return Err(DbError::TopicNotFound(topic_id));
        }
        self.conn.execute(
            "INSERT INTO cards (topic_id, question, answer, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![topic_id, question, answer, to_db(date_utils::now())],
        )?;
        let id = self.conn.last_insert_rowid();
        self.get_card(id)?.ok_or(DbError::CardNotFound(id))
    }

    fn get_card(&self, id: i64) -> Result<Option<Card>> {
        let sql = format!(
            "SELECT {CARD_COLUMNS} FROM cards c JOIN topics t ON t.id = c.topic_id WHERE c.id = ?1"
        );
        self.conn
            .query_row(&sql, params![id], CardRow::from_row)
            .optional()?
            .map(CardRow::into_card)
            .transpose()
    }

    fn set_suspended(&self, id: i64, suspended: bool) -> Result<Card> {
        let updated = self.conn.execute(
            "UPDATE cards SET is_suspended = ?1 WHERE id = ?2",
            params![suspended, id],
        )?;
        if updated == 0 {
            return Err(DbError::CardNotFound(id));
        }
        self.get_card(id)?.ok_or(DbError::CardNotFound(id))
    }

    fn get_tier_cards(
        &self,
        tier: QueueTier,
        scope: Scope,
        limit: usize,
        now: DateTime<Utc>,
    ) -> Result<Vec<Card>> {
        let states = tier
            .states()
            .iter()
            .map(|s| format!("'{}'", s.as_str()))
            .collect::<Vec<_>>()
            .join(", ");
        let (due_filter, order) = if tier.requires_due() {
            ("AND c.due_date IS NOT NULL AND c.due_date <= ?4", "c.due_date, c.id")
        } else {
            ("", "c.id")
        };
        let sql = format!(
            "SELECT {CARD_COLUMNS}
             FROM cards c
             JOIN topics t ON t.id = c.topic_id
             WHERE c.is_suspended = 0 AND c.state IN ({states}) AND {SCOPE_FILTER} {due_filter}
             ORDER BY {order}
             LIMIT ?3"
        );

        let topic_id = scope.topic_id();
        let source_id = scope.source_id();
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let now = to_db(now);
        let mut args: Vec<&dyn ToSql> = vec![&topic_id, &source_id, &limit];
        if tier.requires_due() {
            args.push(&now);
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(args.as_slice(), CardRow::from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        rows.into_iter().map(CardRow::into_card).collect()
    }

    fn study_queue(&self, scope: Scope, limit: usize, now: DateTime<Utc>) -> Result<Vec<Card>> {
        assemble_with(limit, |tier, remaining| {
            self.get_tier_cards(tier, scope, remaining, now)
        })
    }

    fn due_counts(&self, scope: Scope, now: DateTime<Utc>) -> Result<DueCounts> {
        let sql = format!(
            "SELECT
                COALESCE(SUM(CASE WHEN c.state = 'new' THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN c.state IN ('learning', 'relearning') AND c.due_date <= ?3 THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN c.state = 'review' AND c.due_date <= ?3 THEN 1 ELSE 0 END), 0)
             FROM cards c
             JOIN topics t ON t.id = c.topic_id
             WHERE c.is_suspended = 0 AND {SCOPE_FILTER}"
        );
        let (new, learning, review) = self.conn.query_row(
            &sql,
            params![scope.topic_id(), scope.source_id(), to_db(now)],
            |row| {
                Ok((
                    row.get::<_, usize>(0)?,
                    row.get::<_, usize>(1)?,
                    row.get::<_, usize>(2)?,
                ))
            },
        )?;
        Ok(DueCounts::new(new, learning, review))
    }
}

impl ReviewRepository for SqliteRepository {
    fn record_grade(
        &mut self,
        card_id: i64,
        before: &CardSchedule,
        outcome: &GradeOutcome,
    ) -> Result<Option<Uuid>> {
        let after = &outcome.schedule;
        let review = &outcome.review;
        let tx = self.conn.transaction()?;

        // Compare-and-swap on the fields the transition was computed from.
        let updated = tx.execute(
            "UPDATE cards
             SET state = ?1, step_index = ?2, interval_days = ?3, ease_factor = ?4,
                 due_date = ?5, review_count = ?6, lapse_count = ?7
             WHERE id = ?8 AND state = ?9 AND step_index = ?10 AND review_count = ?11
                 AND due_date IS ?12",
            params![
                after.state.as_str(),
                after.step_index,
                after.interval_days,
                after.ease_factor,
                after.due_date.map(to_db),
                after.review_count,
                after.lapse_count,
                card_id,
                before.state.as_str(),
                before.step_index,
                before.review_count,
                before.due_date.map(to_db),
            ],
        )?;
        if updated == 0 {
            return Err(DbError::StaleState(card_id));
        }

        // Counters only move for a session that is still active; a grade that
        // names a closed or unknown session still applies to the card.
        let counted_session = match review.session_id {
            Some(session_id) => {
                let tally = SessionTally::for_grade(review.grade, review.elapsed_ms);
                let updated = tx.execute(
                    "UPDATE study_sessions
                     SET cards_studied = cards_studied + ?1,
                         cards_correct = cards_correct + ?2,
                         total_time_ms = CASE
                             WHEN total_time_ms > 9223372036854775807 - ?3 THEN 9223372036854775807
                             ELSE total_time_ms + ?3
                         END
                     WHERE id = ?4 AND status = 'active'",
                    params![
                        tally.studied,
                        tally.correct,
                        saturating_i64(tally.time_ms),
                        session_id.to_string(),
                    ],
                )?;
                (updated > 0).then_some(session_id)
            }
            None => None,
        };

        tx.execute(
            "INSERT INTO review_history (card_id, session_id, grade, interval_before, interval_after,
                ease_before, ease_after, elapsed_ms, reviewed_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                review.card_id,
                counted_session.map(|id| id.to_string()),
                review.grade.value(),
                review.interval_before,
                review.interval_after,
                review.ease_before,
                review.ease_after,
                review.elapsed_ms.map(saturating_i64),
                to_db(review.reviewed_at),
            ],
        )?;

        tx.commit()?;
        Ok(counted_session)
    }

    fn reviews_for_card(&self, card_id: i64) -> Result<Vec<StoredReview>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, card_id, session_id, grade, interval_before, interval_after,
                    ease_before, ease_after, elapsed_ms, reviewed_at
             FROM review_history WHERE card_id = ?1 ORDER BY id",
        )?;
        let rows = stmt
            .query_map(params![card_id], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, Option<String>>(2)?,
                    row.get::<_, i64>(3)?,
                    row.get::<_, f64>(4)?,
                    row.get::<_, f64>(5)?,
                    row.get::<_, f64>(6)?,
                    row.get::<_, f64>(7)?,
                    row.get::<_, Option<i64>>(8)?,
                    row.get::<_, String>(9)?,
                ))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(
                |(id, card_id, session_id, grade, ib, ia, eb, ea, elapsed_ms, reviewed_at)| -> Result<StoredReview> {
                    Ok(StoredReview {
                        id,
                        review: ReviewRecord {
                            card_id,
                            session_id: session_id.as_deref().map(parse_uuid).transpose()?,
                            grade: Grade::from_value(grade)?,
                            interval_before: ib,
                            interval_after: ia,
                            ease_before: eb,
                            ease_after: ea,
                            elapsed_ms: elapsed_ms.map(|ms| ms.max(0) as u64),
                            reviewed_at: from_db(&reviewed_at)?,
                        },
                    })
                },
            )
            .collect()
    }
}

/// SQLite integers are signed; clamp rather than wrap.
fn saturating_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn parse_uuid(value: &str) -> Result<Uuid> {
    Uuid::parse_str(value).map_err(|e| DbError::InvalidData(format!("bad session id {value:?}: {e}")))
}

impl SessionRepository for SqliteRepository {
    fn create_session(&self, session: &StudySession) -> Result<()> {
        self.conn.execute(
            "INSERT INTO study_sessions (id, started_at, ended_at, status, cards_studied,
                cards_correct, total_time_ms, scope_topic_id, scope_source_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                session.id.to_string(),
                to_db(session.started_at),
                session.ended_at.map(to_db),
                session.status.as_str(),
                session.cards_studied,
                session.cards_correct,
                saturating_i64(session.total_time_ms),
                session.scope.topic_id(),
                session.scope.source_id(),
            ],
        )?;
        Ok(())
    }

    fn get_session(&self, id: Uuid) -> Result<Option<StudySession>> {
        let row = self
            .conn
            .query_row(
                "SELECT started_at, ended_at, status, cards_studied, cards_correct, total_time_ms,
                        scope_topic_id, scope_source_id
                 FROM study_sessions WHERE id = ?1",
                params![id.to_string()],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, Option<String>>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, u32>(3)?,
                        row.get::<_, u32>(4)?,
                        row.get::<_, i64>(5)?,
                        row.get::<_, Option<i64>>(6)?,
                        row.get::<_, Option<i64>>(7)?,
                    ))
                },
            )
            .optional()?;

        let Some((started_at, ended_at, status, studied, correct, total_ms, topic, source)) = row else {
            return Ok(None);
        };
        Ok(Some(StudySession {
            id,
            started_at: from_db(&started_at)?,
            ended_at: from_db_opt(ended_at)?,
            status: status.parse::<SessionStatus>()?,
            cards_studied: studied,
            cards_correct: correct,
            total_time_ms: total_ms.max(0) as u64,
            scope: Scope::from_filters(topic, source),
        }))
    }

    fn close_session(&self, session: &StudySession) -> Result<()> {
        let updated = self.conn.execute(
            "UPDATE study_sessions SET status = ?1, ended_at = ?2 WHERE id = ?3 AND status = 'active'",
            params![
                session.status.as_str(),
                session.ended_at.map(to_db),
                session.id.to_string(),
            ],
        )?;
        if updated == 0 {
            return Err(DbError::SessionNotActive(session.id));
        }
        Ok(())
    }
}

impl StatsRepository for SqliteRepository {
    fn get_study_stats(&self, now: DateTime<Utc>) -> Result<StudyStats> {
        let today = to_db(date_utils::start_of_day(now));

        let (reviews_today, total_reviews, retention_rate) = self.conn.query_row(
            "SELECT
                COALESCE(SUM(CASE WHEN reviewed_at >= ?1 THEN 1 ELSE 0 END), 0),
                COUNT(*),
                COALESCE(
                    CAST(SUM(CASE WHEN grade >= 2 THEN 1 ELSE 0 END) AS REAL) / NULLIF(COUNT(*), 0),
                    0.0
                )
             FROM review_history",
            params![today],
            |row| Ok((row.get::<_, usize>(0)?, row.get::<_, usize>(1)?, row.get::<_, f64>(2)?)),
        )?;

        let total_lapses: usize = self.conn.query_row(
            "SELECT COALESCE(SUM(lapse_count), 0) FROM cards",
            [],
            |row| row.get(0),
        )?;

        let sessions_completed: usize = self.conn.query_row(
            "SELECT COUNT(*) FROM study_sessions WHERE status = 'completed'",
            [],
            |row| row.get(0),
        )?;

        Ok(StudyStats {
            reviews_today,
            total_reviews,
            retention_rate,
            total_lapses,
            sessions_completed,
        })
    }

    fn get_calendar_data(&self, days: usize, now: DateTime<Utc>) -> Result<Vec<CalendarData>> {
        let dates = date_utils::trailing_days(now.date_naive(), days);
        let Some(first) = dates.first() else {
            return Ok(Vec::new());
        };
        let since = to_db(first.and_time(chrono::NaiveTime::MIN).and_utc());

        let mut stmt = self.conn.prepare(
            "SELECT substr(reviewed_at, 1, 10) AS day, COUNT(*)
             FROM review_history
             WHERE reviewed_at >= ?1
             GROUP BY day",
        )?;
        let counts = stmt
            .query_map(params![since], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, usize>(1)?))
            })?
            .collect::<std::result::Result<std::collections::HashMap<_, _>, _>>()?;

        Ok(dates
            .into_iter()
            .map(|date| {
                let date = date.format("%Y-%m-%d").to_string();
                let reviews = counts.get(&date).copied().unwrap_or(0);
                CalendarData { date, reviews }
            })
            .collect())
    }
}
