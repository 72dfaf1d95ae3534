//! Test fixtures and factory functions for creating test data.

use serde_json::{json, Value};
use uuid::Uuid;

pub fn source_request(title: &str) -> Value {
    json!({ "title": title })
}

pub fn topic_request(source_id: i64, title: &str) -> Value {
    json!({
        "source_id": source_id,
        "title": title,
        "excerpt": format!("Excerpt about {title}."),
    })
}

/// A generated question/answer pair numbered by `index`.
pub fn card_request(topic_id: i64, index: usize) -> Value {
    json!({
        "topic_id": topic_id,
        "question": format!("Question {}?", index + 1),
        "answer": format!("Answer {}.", index + 1),
    })
}

pub fn review_request(card_id: i64, grade: i64) -> Value {
    json!({
        "card_id": card_id,
        "grade": grade,
        "elapsed_ms": 1200,
    })
}

pub fn session_review_request(card_id: i64, grade: i64, session_id: Uuid) -> Value {
    json!({
        "card_id": card_id,
        "grade": grade,
        "elapsed_ms": 1200,
        "session_id": session_id,
    })
}

pub fn guarded_review_request(card_id: i64, grade: i64, expected_review_count: u32) -> Value {
    json!({
        "card_id": card_id,
        "grade": grade,
        "expected_review_count": expected_review_count,
    })
}
