//! Spaced repetition scheduling engine shared by the study services.
//!
//! Provides:
//! - Fixed interval ladder and card state machine
//! - Review ledger composition (next schedule + audit record per grade)
//! - Study session aggregate
//! - Tiered study-queue assembly
//!
//! Nothing in this crate performs I/O.

pub mod algorithm;
pub mod error;
pub mod ledger;
pub mod queue;
pub mod session;
pub mod types;

pub use algorithm::{get_algorithm, transition, IntervalLadder, SchedulingResult, SpacedRepetitionAlgorithm};
pub use error::{CoreError, Result};
pub use ledger::{apply_grade, GradeOutcome, ReviewRecord};
pub use queue::{assemble_queue, assemble_with, due_counts, QueueTier, DEFAULT_QUEUE_LIMIT, MAX_QUEUE_LIMIT};
pub use session::{SessionStatus, SessionTally, StudySession};
pub use types::{Card, CardSchedule, CardState, DueCounts, Grade, Scope, DEFAULT_EASE_FACTOR};
