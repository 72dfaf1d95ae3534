//! Common test utilities and fixtures for integration tests.
//!
//! Each [`TestContext`] owns its own SQLite file under the system temp
//! directory, so tests run in parallel without sharing state.

pub mod fixtures;

use std::path::PathBuf;

use axum::Router;
use axum_test::TestServer;
use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, Connection};
use serde_json::Value;
use uuid::Uuid;

use study_drill_backend::db::date_utils;
use study_drill_backend::db::SqliteRepository;
use study_drill_backend::services::StudyService;
use study_drill_backend::{build_router, AppState};
use study_core::IntervalLadder;

/// Test context containing the database file and the router over it.
pub struct TestContext {
    path: PathBuf,
    app: Router,
}

impl TestContext {
    /// Create a new test context with the default queue limit.
    pub fn new() -> Self {
        Self::with_queue_limit(study_core::DEFAULT_QUEUE_LIMIT)
    }

    pub fn with_queue_limit(queue_limit: usize) -> Self {
        let path = std::env::temp_dir().join(format!("study-drill-test-{}.db", Uuid::new_v4()));
        let repository = SqliteRepository::open(&path).expect("Failed to open test database");
        let service = StudyService::new(repository, Box::new(IntervalLadder::default()), queue_limit);
        let app = build_router(AppState::new(service));

        Self { path, app }
    }

    /// Get the router for use with axum-test.
    pub fn router(&self) -> Router {
        self.app.clone()
    }

    pub fn server(&self) -> TestServer {
        TestServer::new(self.router()).expect("Failed to start test server")
    }

    /// Register a source with one topic and return the topic id.
    pub async fn create_topic(&self, server: &TestServer, title: &str) -> i64 {
        let source: Value = server
            .post("/api/sources")
            .json(&fixtures::source_request(&format!("{title} notes")))
            .await
            .json();
        let topic: Value = server
            .post("/api/topics")
            .json(&fixtures::topic_request(source["id"].as_i64().unwrap(), title))
            .await
            .json();
        topic["id"].as_i64().unwrap()
    }

    /// Create `count` cards under a topic and return their ids.
    pub async fn create_cards(&self, server: &TestServer, topic_id: i64, count: usize) -> Vec<i64> {
        let mut ids = Vec::with_capacity(count);
        for i in 0..count {
            let card: Value = server
                .post("/api/cards")
                .json(&fixtures::card_request(topic_id, i))
                .await
                .json();
            ids.push(card["id"].as_i64().unwrap());
        }
        ids
    }

    /// Overwrite a card's scheduling state directly in storage.
    ///
    /// Used to stage learning and review cards without walking each one
    /// through the grading path.
    pub fn force_state(&self, card_id: i64, state: &str, step_index: u32, due: DateTime<Utc>) {
        let conn = Connection::open(&self.path).expect("Failed to open test database");
        conn.execute(
            "UPDATE cards SET state = ?1, step_index = ?2, due_date = ?3 WHERE id = ?4",
            params![state, step_index, date_utils::to_db(due), card_id],
        )
        .expect("Failed to force card state");
    }

    /// A due date safely in the past.
    pub fn overdue() -> DateTime<Utc> {
        date_utils::now() - Duration::hours(1)
    }
}

impl Drop for TestContext {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}
