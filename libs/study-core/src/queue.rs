//! Study queue assembly.
//!
//! Cards are drawn in three tiers, in this order, each capped by whatever budget
//! the earlier tiers left over:
//! 1. learning and relearning cards that are due
//! 2. review cards that are due
//! 3. new cards
//!
//! Suspended cards never appear. Assembly is read-only.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{Card, CardSchedule, CardState, DueCounts, Scope};

/// Default number of cards handed out per queue.
pub const DEFAULT_QUEUE_LIMIT: usize = 20;

/// Largest batch a caller may ask for; bigger limits are clamped to this.
pub const MAX_QUEUE_LIMIT: usize = 500;

/// One priority tier of the study queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueTier {
    Learning,
    Review,
    New,
}

impl QueueTier {
    /// Tiers in the order they are served.
    pub const ORDER: [QueueTier; 3] = [QueueTier::Learning, QueueTier::Review, QueueTier::New];

    /// Storage states that belong to this tier.
    pub fn states(&self) -> &'static [CardState] {
        match self {
            Self::Learning => &[CardState::Learning, CardState::Relearning],
            Self::Review => &[CardState::Review],
            Self::New => &[CardState::New],
        }
    }

    /// Whether the tier requires `due_date <= now`.
    pub fn requires_due(&self) -> bool {
        !matches!(self, Self::New)
    }

    pub fn admits(&self, schedule: &CardSchedule, now: DateTime<Utc>) -> bool {
        !schedule.is_suspended
            && self.states().contains(&schedule.state)
            && (!self.requires_due() || schedule.is_due(now))
    }
}

/// Drive the tiers against any card source.
///
/// `fetch(tier, remaining)` should return at most `remaining` eligible cards for
/// the tier; anything beyond that is dropped so the limit holds regardless.
pub fn assemble_with<E, F>(limit: usize, mut fetch: F) -> Result<Vec<Card>, E>
where
    F: FnMut(QueueTier, usize) -> Result<Vec<Card>, E>,
{
    let mut queue = Vec::new();
    for tier in QueueTier::ORDER {
        let remaining = limit - queue.len();
        if remaining == 0 {
            break;
        }
        let mut cards = fetch(tier, remaining)?;
        cards.truncate(remaining);
        queue.extend(cards);
    }
    Ok(queue)
}

/// Take up to `remaining` cards of one tier from an in-memory pool, keeping pool order.
pub fn select_tier(
    cards: &[Card],
    tier: QueueTier,
    scope: Scope,
    remaining: usize,
    now: DateTime<Utc>,
) -> Vec<Card> {
    cards
        .iter()
        .filter(|card| scope.matches(card) && tier.admits(&card.schedule, now))
        .take(remaining)
        .cloned()
        .collect()
}

/// Assemble the next batch from an in-memory pool.
pub fn assemble_queue(cards: &[Card], scope: Scope, limit: usize, now: DateTime<Utc>) -> Vec<Card> {
    let result: Result<_, std::convert::Infallible> =
        assemble_with(limit, |tier, remaining| Ok(select_tier(cards, tier, scope, remaining, now)));
    match result {
        Ok(queue) => queue,
        Err(never) => match never {},
    }
}

/// Count cards per tier without building a queue.
pub fn due_counts(cards: &[Card], scope: Scope, now: DateTime<Utc>) -> DueCounts {
    let count = |tier: QueueTier| {
        cards
            .iter()
            .filter(|card| scope.matches(card) && tier.admits(&card.schedule, now))
            .count()
    };
    DueCounts::new(
        count(QueueTier::New),
        count(QueueTier::Learning),
        count(QueueTier::Review),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use pretty_assertions::assert_eq;

    fn card(id: i64, topic_id: i64, state: CardState, due: Option<DateTime<Utc>>) -> Card {
        Card {
            id,
            topic_id,
            source_id: topic_id * 10,
            question: format!("Question {id}?"),
            answer: format!("Answer {id}."),
            schedule: CardSchedule {
                state,
                due_date: due,
                ..Default::default()
            },
        }
    }

    /// 50 new, 5 review-due, 3 learning-due, in that (worst-case) pool order.
    fn mixed_pool(now: DateTime<Utc>) -> Vec<Card> {
        let past = Some(now - Duration::minutes(5));
        let mut pool = Vec::new();
        for id in 0..50 {
            pool.push(card(id, 1, CardState::New, None));
        }
        for id in 50..55 {
            pool.push(card(id, 1, CardState::Review, past));
        }
        pool.push(card(55, 1, CardState::Learning, past));
        pool.push(card(56, 1, CardState::Relearning, past));
        pool.push(card(57, 1, CardState::Learning, past));
        pool
    }

    #[test]
    fn tiers_fill_in_priority_order() {
        let now = Utc::now();
        let queue = assemble_queue(&mixed_pool(now), Scope::All, 20, now);

        assert_eq!(queue.len(), 20);
        let states: Vec<CardState> = queue.iter().map(|c| c.schedule.state).collect();
        assert!(states[..3]
            .iter()
            .all(|s| matches!(s, CardState::Learning | CardState::Relearning)));
        assert!(states[3..8].iter().all(|s| *s == CardState::Review));
        assert!(states[8..].iter().all(|s| *s == CardState::New));
        assert_eq!(queue[8].id, 0);
    }

    #[test]
    fn unbounded_limit_on_empty_pool() {
        assert!(assemble_queue(&[], Scope::All, usize::MAX, Utc::now()).is_empty());
    }

    #[test]
    fn unbounded_limit_takes_whole_pool() {
        let now = Utc::now();
        let queue = assemble_queue(&mixed_pool(now), Scope::All, usize::MAX, now);
        assert_eq!(queue.len(), 58);
    }

    #[test]
    fn small_limit_never_reaches_new_cards() {
        let now = Utc::now();
        let queue = assemble_queue(&mixed_pool(now), Scope::All, 4, now);
        let ids: Vec<i64> = queue.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![55, 56, 57, 50]);
    }

    #[test]
    fn cards_not_yet_due_are_skipped() {
        let now = Utc::now();
        let future = Some(now + Duration::minutes(10));
        let pool = vec![
            card(1, 1, CardState::Learning, future),
            card(2, 1, CardState::Review, future),
            card(3, 1, CardState::New, None),
        ];
        let queue = assemble_queue(&pool, Scope::All, 20, now);
        assert_eq!(queue.iter().map(|c| c.id).collect::<Vec<_>>(), vec![3]);
    }

    #[test]
    fn suspended_cards_are_excluded() {
        let now = Utc::now();
        let mut pool = mixed_pool(now);
        for c in pool.iter_mut() {
            c.schedule.is_suspended = true;
        }
        assert!(assemble_queue(&pool, Scope::All, 20, now).is_empty());
        assert_eq!(due_counts(&pool, Scope::All, now), DueCounts::default());
    }

    #[test]
    fn scope_filters_each_tier() {
        let now = Utc::now();
        let past = Some(now - Duration::hours(1));
        let pool = vec![
            card(1, 1, CardState::Learning, past),
            card(2, 2, CardState::Learning, past),
            card(3, 2, CardState::New, None),
            card(4, 1, CardState::New, None),
        ];
        let topic: Vec<i64> = assemble_queue(&pool, Scope::Topic(2), 20, now)
            .iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(topic, vec![2, 3]);

        let source: Vec<i64> = assemble_queue(&pool, Scope::Source(10), 20, now)
            .iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(source, vec![1, 4]);
    }

    #[test]
    fn empty_pool_yields_empty_queue() {
        assert!(assemble_queue(&[], Scope::All, 20, Utc::now()).is_empty());
    }

    #[test]
    fn zero_limit_never_fetches() {
        let mut calls = 0;
        let queue: Result<Vec<Card>, ()> = assemble_with(0, |_, _| {
            calls += 1;
            Ok(Vec::new())
        });
        assert!(queue.unwrap().is_empty());
        assert_eq!(calls, 0);
    }

    #[test]
    fn oversized_fetch_is_truncated_to_budget() {
        let now = Utc::now();
        let pool = mixed_pool(now);
        let queue: Result<Vec<Card>, ()> = assemble_with(5, |_, _| Ok(pool.clone()));
        assert_eq!(queue.unwrap().len(), 5);
    }

    #[test]
    fn fetch_errors_propagate() {
        let queue: Result<Vec<Card>, &str> = assemble_with(5, |tier, _| match tier {
            QueueTier::Review => Err("storage unavailable"),
            _ => Ok(Vec::new()),
        });
        assert_eq!(queue.unwrap_err(), "storage unavailable");
    }

    #[test]
    fn same_pool_same_order() {
        let now = Utc::now();
        let pool = mixed_pool(now);
        assert_eq!(
            assemble_queue(&pool, Scope::All, 20, now),
            assemble_queue(&pool, Scope::All, 20, now)
        );
    }

    #[test]
    fn counts_per_tier() {
        let now = Utc::now();
        assert_eq!(
            due_counts(&mixed_pool(now), Scope::All, now),
            DueCounts::new(50, 3, 5)
        );
    }
}
