//! Spaced repetition algorithm implementations.

pub mod ladder;

use crate::types::{CardSchedule, CardState, Grade};
use chrono::{DateTime, Utc};

pub use ladder::IntervalLadder;

/// Result of scheduling a card after a grade.
///
/// Counters are not touched here; see [`crate::ledger::apply_grade`].
#[derive(Debug, Clone, PartialEq)]
pub struct SchedulingResult {
    pub state: CardState,
    pub step_index: u32,
    pub interval_days: f64,
    pub ease_factor: f64,
    pub due_date: DateTime<Utc>,
}

/// Trait for spaced repetition algorithms.
pub trait SpacedRepetitionAlgorithm: Send + Sync {
    /// Algorithm identifier.
    fn name(&self) -> &'static str;

    /// Calculate the next scheduling state after a grade.
    fn schedule(&self, schedule: &CardSchedule, grade: Grade, now: DateTime<Utc>) -> SchedulingResult;

    /// Initial schedule for a new card.
    fn initial_schedule(&self) -> CardSchedule {
        CardSchedule::default()
    }
}

/// Get algorithm by name.
pub fn get_algorithm(name: &str) -> Option<Box<dyn SpacedRepetitionAlgorithm>> {
    match name {
        "ladder" => Some(Box::new(IntervalLadder::default())),
        _ => None,
    }
}

/// Apply the default ladder to bare scheduling fields.
pub fn transition(
    state: CardState,
    step_index: u32,
    ease_factor: f64,
    grade: Grade,
    now: DateTime<Utc>,
) -> SchedulingResult {
    let schedule = CardSchedule {
        state,
        step_index,
        ease_factor,
        ..CardSchedule::default()
    };
    IntervalLadder::default().schedule(&schedule, grade, now)
}
