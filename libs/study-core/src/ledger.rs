//! Review ledger: composes a grade into the card's next schedule and its audit record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::algorithm::SpacedRepetitionAlgorithm;
use crate::types::{CardSchedule, CardState, Grade};

/// Immutable record of one grading event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewRecord {
    pub card_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<Uuid>,
    pub grade: Grade,
    pub interval_before: f64,
    pub interval_after: f64,
    pub ease_before: f64,
    pub ease_after: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elapsed_ms: Option<u64>,
    pub reviewed_at: DateTime<Utc>,
}

/// Everything a single grade produces, to be persisted as one unit.
#[derive(Debug, Clone, PartialEq)]
pub struct GradeOutcome {
    pub schedule: CardSchedule,
    /// Same as `schedule.due_date`, which a graded card always has.
    pub due_date: DateTime<Utc>,
    pub review: ReviewRecord,
    pub lapsed: bool,
}

/// Compute the card's next schedule, counters and ledger entry for a grade.
///
/// Pure: nothing is written. The caller persists `schedule` and `review`
/// together, guarded on `current` being what storage still holds.
pub fn apply_grade(
    algorithm: &dyn SpacedRepetitionAlgorithm,
    current: &CardSchedule,
    card_id: i64,
    grade: Grade,
    elapsed_ms: Option<u64>,
    session_id: Option<Uuid>,
    now: DateTime<Utc>,
) -> GradeOutcome {
    let result = algorithm.schedule(current, grade, now);
    let lapsed = grade == Grade::Again && current.state == CardState::Review;

    let schedule = CardSchedule {
        state: result.state,
        step_index: result.step_index,
        interval_days: result.interval_days,
        ease_factor: result.ease_factor,
        due_date: Some(result.due_date),
        is_suspended: current.is_suspended,
        review_count: current.review_count + 1,
        lapse_count: current.lapse_count + u32::from(lapsed),
    };

    let review = ReviewRecord {
        card_id,
        session_id,
        grade,
        interval_before: current.interval_days,
        interval_after: schedule.interval_days,
        ease_before: current.ease_factor,
        ease_after: schedule.ease_factor,
        elapsed_ms,
        reviewed_at: now,
    };

    GradeOutcome {
        schedule,
        due_date: result.due_date,
        review,
        lapsed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithm::IntervalLadder;
    use chrono::Duration;
    use pretty_assertions::assert_eq;

    fn review_card(step_index: u32) -> CardSchedule {
        CardSchedule {
            state: CardState::Review,
            step_index,
            interval_days: 10.0,
            due_date: Some(Utc::now()),
            review_count: 6,
            lapse_count: 1,
            ..Default::default()
        }
    }

    #[test]
    fn lapse_on_review_card_counts() {
        let now = Utc::now();
        let outcome = apply_grade(
            &IntervalLadder::default(),
            &review_card(3),
            42,
            Grade::Again,
            Some(1500),
            None,
            now,
        );

        assert!(outcome.lapsed);
        assert_eq!(outcome.schedule.state, CardState::Relearning);
        assert_eq!(outcome.schedule.step_index, 0);
        assert_eq!(outcome.schedule.interval_days, 0.0);
        assert_eq!(outcome.schedule.due_date, Some(now + Duration::minutes(10)));
        assert_eq!(outcome.schedule.lapse_count, 2);
        assert_eq!(outcome.schedule.review_count, 7);
    }

    #[test]
    fn again_while_learning_is_not_a_lapse() {
        let current = CardSchedule {
            state: CardState::Learning,
            step_index: 1,
            due_date: Some(Utc::now()),
            review_count: 1,
            ..Default::default()
        };
        let outcome = apply_grade(
            &IntervalLadder::default(),
            &current,
            1,
            Grade::Again,
            None,
            None,
            Utc::now(),
        );

        assert!(!outcome.lapsed);
        assert_eq!(outcome.schedule.state, CardState::Learning);
        assert_eq!(outcome.schedule.lapse_count, 0);
        assert_eq!(outcome.schedule.review_count, 2);
    }

    #[test]
    fn again_while_relearning_is_not_a_second_lapse() {
        let current = CardSchedule {
            state: CardState::Relearning,
            lapse_count: 1,
            ..review_card(0)
        };
        let outcome = apply_grade(
            &IntervalLadder::default(),
            &current,
            1,
            Grade::Again,
            None,
            None,
            Utc::now(),
        );
        assert!(!outcome.lapsed);
        assert_eq!(outcome.schedule.lapse_count, 1);
    }

    #[test]
    fn ledger_entry_captures_before_and_after() {
        let now = Utc::now();
        let session = Uuid::new_v4();
        let outcome = apply_grade(
            &IntervalLadder::default(),
            &review_card(3),
            9,
            Grade::Good,
            Some(2300),
            Some(session),
            now,
        );

        assert_eq!(
            outcome.review,
            ReviewRecord {
                card_id: 9,
                session_id: Some(session),
                grade: Grade::Good,
                interval_before: 10.0,
                interval_after: 25.0,
                ease_before: 2.5,
                ease_after: 2.5,
                elapsed_ms: Some(2300),
                reviewed_at: now,
            }
        );
    }

    #[test]
    fn suspension_flag_is_preserved() {
        let current = CardSchedule {
            is_suspended: true,
            ..review_card(2)
        };
        let outcome = apply_grade(
            &IntervalLadder::default(),
            &current,
            1,
            Grade::Good,
            None,
            None,
            Utc::now(),
        );
        assert!(outcome.schedule.is_suspended);
    }
}
