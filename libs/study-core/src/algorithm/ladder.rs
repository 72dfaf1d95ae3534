//! Fixed interval ladder.
//!
//! Learning cards walk a short minutes table; review cards walk a days table.
//! `step_index` indexes whichever table matches the card's phase, and the two
//! tables are never merged. Ease is carried through untouched.

use super::{SchedulingResult, SpacedRepetitionAlgorithm};
use crate::types::{CardSchedule, CardState, Grade};
use chrono::{DateTime, Duration, Utc};

/// Learning-phase delays in minutes.
pub const LEARNING_STEPS_MINUTES: [i64; 2] = [1, 10];

/// Review-phase intervals in days. Stored schedules depend on these exact values.
pub const REVIEW_INTERVALS_DAYS: [i64; 8] = [0, 1, 4, 10, 25, 60, 150, 365];

/// Delay after a lapse, independent of the learning table.
pub const RELEARN_DELAY_MINUTES: i64 = 10;

/// Review step a card lands on when graduating with Good.
const GRADUATE_STEP: usize = 1;

/// Review step a card lands on when graduating with Easy.
const EASY_GRADUATE_STEP: usize = 2;

/// Table-driven scheduler.
#[derive(Debug, Clone)]
pub struct IntervalLadder {
    pub learning_minutes: &'static [i64],
    pub review_days: &'static [i64],
    pub relearn_minutes: i64,
}

impl Default for IntervalLadder {
    fn default() -> Self {
        Self {
            learning_minutes: &LEARNING_STEPS_MINUTES,
            review_days: &REVIEW_INTERVALS_DAYS,
            relearn_minutes: RELEARN_DELAY_MINUTES,
        }
    }
}

impl SpacedRepetitionAlgorithm for IntervalLadder {
    fn name(&self) -> &'static str {
        "ladder"
    }

    fn schedule(&self, schedule: &CardSchedule, grade: Grade, now: DateTime<Utc>) -> SchedulingResult {
        let (state, step_index, interval_days, due_date) = match schedule.state {
            CardState::New => self.schedule_learning(0, grade, now),
            CardState::Learning => self.schedule_learning(schedule.step_index as usize, grade, now),
            CardState::Review | CardState::Relearning => {
                self.schedule_review(schedule.step_index as usize, grade, now)
            }
        };

        SchedulingResult {
            state,
            step_index: step_index as u32,
            interval_days,
            ease_factor: schedule.ease_factor,
            due_date,
        }
    }
}

impl IntervalLadder {
    fn max_review_step(&self) -> usize {
        self.review_days.len() - 1
    }

    fn graduate(&self, step: usize, now: DateTime<Utc>) -> (CardState, usize, f64, DateTime<Utc>) {
        let step = step.min(self.max_review_step());
        let days = self.review_days[step];
        (CardState::Review, step, days as f64, now + Duration::days(days))
    }

    fn schedule_learning(
        &self,
        step: usize,
        grade: Grade,
        now: DateTime<Utc>,
    ) -> (CardState, usize, f64, DateTime<Utc>) {
        let steps = self.learning_minutes;
        match grade {
            Grade::Again => (CardState::Learning, 0, 0.0, now + Duration::minutes(steps[0])),
            Grade::Hard => {
                let delay = steps[step.min(steps.len() - 1)];
                (CardState::Learning, step, 0.0, now + Duration::minutes(delay))
            }
            Grade::Good if step + 1 < steps.len() => (
                CardState::Learning,
                step + 1,
                0.0,
                now + Duration::minutes(steps[step + 1]),
            ),
            Grade::Good => self.graduate(GRADUATE_STEP, now),
            Grade::Easy => self.graduate(EASY_GRADUATE_STEP, now),
        }
    }

    fn schedule_review(
        &self,
        step: usize,
        grade: Grade,
        now: DateTime<Utc>,
    ) -> (CardState, usize, f64, DateTime<Utc>) {
        let max_step = self.max_review_step();
        match grade {
            Grade::Again => (
                CardState::Relearning,
                0,
                0.0,
                now + Duration::minutes(self.relearn_minutes),
            ),
            Grade::Hard => {
                let step = step.min(max_step);
                let days = self.review_days[step];
                // The stored interval may be 0; the due date never is.
                (CardState::Review, step, days as f64, now + Duration::days(days.max(1)))
            }
            Grade::Good => self.graduate(step + 1, now),
            Grade::Easy => self.graduate(step + 2, now),
        }
    }
}
