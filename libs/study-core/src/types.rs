//! Core types for the scheduling engine.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Ease factor given to freshly created cards. Carried through unchanged.
pub const DEFAULT_EASE_FACTOR: f64 = 2.5;

/// Card scheduling state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardState {
    New,
    Learning,
    Review,
    Relearning,
}

impl Default for CardState {
    fn default() -> Self {
        Self::New
    }
}

impl CardState {
    /// Storage and wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Learning => "learning",
            Self::Review => "review",
            Self::Relearning => "relearning",
        }
    }
}

impl FromStr for CardState {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "new" => Ok(Self::New),
            "learning" => Ok(Self::Learning),
            "review" => Ok(Self::Review),
            "relearning" => Ok(Self::Relearning),
            other => Err(CoreError::UnknownCardState(other.to_string())),
        }
    }
}

impl fmt::Display for CardState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Learner's self-reported recall quality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum Grade {
    Again,
    Hard,
    Good,
    Easy,
}

impl Grade {
    /// Ordinal value (0-3) used in storage and on the wire.
    pub fn value(self) -> u8 {
        match self {
            Self::Again => 0,
            Self::Hard => 1,
            Self::Good => 2,
            Self::Easy => 3,
        }
    }

    /// Parse an ordinal grade, rejecting anything outside 0-3.
    pub fn from_value(value: i64) -> Result<Self, CoreError> {
        match value {
            0 => Ok(Self::Again),
            1 => Ok(Self::Hard),
            2 => Ok(Self::Good),
            3 => Ok(Self::Easy),
            other => Err(CoreError::InvalidGrade(other)),
        }
    }

    /// Good and Easy count as correct for accuracy reporting.
    pub fn is_correct(self) -> bool {
        self >= Self::Good
    }
}

impl TryFrom<i64> for Grade {
    type Error = CoreError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::from_value(value)
    }
}

impl From<Grade> for i64 {
    fn from(grade: Grade) -> Self {
        grade.value() as i64
    }
}

/// Scheduling fields and counters of a card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardSchedule {
    pub state: CardState,
    pub step_index: u32,
    pub interval_days: f64,
    pub ease_factor: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,
    pub is_suspended: bool,
    pub review_count: u32,
    pub lapse_count: u32,
}

impl Default for CardSchedule {
    fn default() -> Self {
        Self {
            state: CardState::New,
            step_index: 0,
            interval_days: 0.0,
            ease_factor: DEFAULT_EASE_FACTOR,
            due_date: None,
            is_suspended: false,
            review_count: 0,
            lapse_count: 0,
        }
    }
}

impl CardSchedule {
    /// Whether the card is due at `now`. New cards have no due date and are never "due".
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.due_date.map_or(false, |due| due <= now)
    }
}

/// A study prompt under spaced repetition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Card {
    pub id: i64,
    pub topic_id: i64,
    pub source_id: i64,
    pub question: String,
    pub answer: String,
    #[serde(flatten)]
    pub schedule: CardSchedule,
}

/// Optional restriction of queue assembly and due counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum Scope {
    All,
    Source(i64),
    Topic(i64),
}

impl Default for Scope {
    fn default() -> Self {
        Self::All
    }
}

impl Scope {
    /// Build a scope from optional topic/source filters. Topic wins when narrower,
    /// but callers that pass both are rejected upstream.
    pub fn from_filters(topic_id: Option<i64>, source_id: Option<i64>) -> Self {
        match (topic_id, source_id) {
            (Some(topic), _) => Self::Topic(topic),
            (None, Some(source)) => Self::Source(source),
            (None, None) => Self::All,
        }
    }

    pub fn matches(&self, card: &Card) -> bool {
        match self {
            Self::All => true,
            Self::Source(id) => card.source_id == *id,
            Self::Topic(id) => card.topic_id == *id,
        }
    }

    pub fn topic_id(&self) -> Option<i64> {
        match self {
            Self::Topic(id) => Some(*id),
            _ => None,
        }
    }

    pub fn source_id(&self) -> Option<i64> {
        match self {
            Self::Source(id) => Some(*id),
            _ => None,
        }
    }
}

/// Per-state counts for dashboards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DueCounts {
    /// Unsuspended cards never studied.
    pub new: usize,
    /// Learning and relearning cards due now.
    pub learning: usize,
    /// Review cards due now.
    pub review: usize,
    pub total: usize,
}

impl DueCounts {
    pub fn new(new: usize, learning: usize, review: usize) -> Self {
        Self {
            new,
            learning,
            review,
            total: new + learning + review,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn card_state_round_trips_through_storage_names() {
        for state in [
            CardState::New,
            CardState::Learning,
            CardState::Review,
            CardState::Relearning,
        ] {
            assert_eq!(state.as_str().parse::<CardState>(), Ok(state));
        }
    }

    #[test]
    fn unknown_card_state_is_rejected() {
        let err = "graduated".parse::<CardState>().unwrap_err();
        assert_eq!(err, CoreError::UnknownCardState("graduated".to_string()));
        assert_eq!(err.to_string(), "invalid card state: graduated");
    }

    #[test]
    fn grade_accepts_only_zero_to_three() {
        assert_eq!(Grade::from_value(0), Ok(Grade::Again));
        assert_eq!(Grade::from_value(3), Ok(Grade::Easy));
        assert_eq!(Grade::from_value(4), Err(CoreError::InvalidGrade(4)));
        assert_eq!(Grade::from_value(-1), Err(CoreError::InvalidGrade(-1)));
    }

    #[test]
    fn grade_serializes_as_integer() {
        assert_eq!(serde_json::to_string(&Grade::Good).unwrap(), "2");
        let grade: Grade = serde_json::from_str("1").unwrap();
        assert_eq!(grade, Grade::Hard);
        assert!(serde_json::from_str::<Grade>("7").is_err());
    }

    #[test]
    fn only_good_and_easy_are_correct() {
        assert!(!Grade::Again.is_correct());
        assert!(!Grade::Hard.is_correct());
        assert!(Grade::Good.is_correct());
        assert!(Grade::Easy.is_correct());
    }

    #[test]
    fn scope_from_filters() {
        assert_eq!(Scope::from_filters(None, None), Scope::All);
        assert_eq!(Scope::from_filters(Some(4), None), Scope::Topic(4));
        assert_eq!(Scope::from_filters(None, Some(9)), Scope::Source(9));
    }

    #[test]
    fn new_card_is_never_due() {
        let schedule = CardSchedule::default();
        assert!(!schedule.is_due(Utc::now()));
    }

    #[test]
    fn due_counts_total() {
        let counts = DueCounts::new(3, 2, 1);
        assert_eq!(counts.total, 6);
    }
}
