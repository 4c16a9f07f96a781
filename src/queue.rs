use std::cmp::Reverse;
use std::hash::Hash;

use chrono::{DateTime, Utc};
use priority_queue::PriorityQueue;

use crate::progress::CardProgress;
use crate::quality::Quality;

/// Cards that are due, most overdue first. Cards with the same due date
/// come out in the order they were pushed.
#[derive(Debug, Clone)]
pub struct DueQueue<K: Hash + Eq> {
    queue: PriorityQueue<K, Reverse<(DateTime<Utc>, usize)>>,
    now: DateTime<Utc>,
    pushed: usize,
}

impl<K: Hash + Eq> DueQueue<K> {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            queue: PriorityQueue::new(),
            now,
            pushed: 0,
        }
    }

    pub fn from_cards<'a, I>(cards: I, now: DateTime<Utc>) -> Self
    where
        I: IntoIterator<Item = (K, &'a CardProgress)>,
    {
        let mut queue = Self::new(now);
        for (key, progress) in cards {
            queue.push(key, progress);
        }
        queue
    }

    /// Queues the card if it is due. Returns whether it was queued.
    /// Pushing a key that is already queued moves it to its new due date, or
    /// drops it when it is no longer due.
    pub fn push(&mut self, key: K, progress: &CardProgress) -> bool {
        if !progress.is_due(self.now) {
            self.queue.remove(&key);
            return false;
        }
        self.queue
            .push(key, Reverse((progress.next_review(), self.pushed)));
        self.pushed += 1;
        true
    }

    pub fn pop(&mut self) -> Option<K> {
        self.queue.pop().map(|(key, _)| key)
    }

    pub fn peek(&self) -> Option<&K> {
        self.queue.peek().map(|(key, _)| key)
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

/// Running tally of one review session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub reviewed: usize,
    pub passed: usize,
    pub lapses: usize,
    /// Consecutive passing reviews, reset by a failure.
    pub streak: usize,
    pub best_streak: usize,
}

impl SessionStats {
    pub fn record(&mut self, quality: Quality) {
        self.reviewed += 1;
        if quality.is_pass() {
            self.passed += 1;
            self.streak += 1;
            self.best_streak = self.best_streak.max(self.streak);
        } else {
            self.lapses += 1;
            self.streak = 0;
        }
    }

    /// Share of passing reviews, `None` before the first review.
    pub fn accuracy(&self) -> Option<f32> {
        (self.reviewed > 0).then(|| self.passed as f32 / self.reviewed as f32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::Status;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 10, 8, 0, 0).unwrap()
    }

    fn due_in(days: i64) -> CardProgress {
        let last_reviewed = now() + Duration::days(days) - Duration::days(3);
        CardProgress::restore(2.5, 3, 0, Status::Learning, last_reviewed).unwrap()
    }

    #[test]
    fn only_due_cards_are_queued() {
        let cards = [("a", due_in(1)), ("b", due_in(0)), ("c", due_in(-2))];
        let mut queue = DueQueue::from_cards(cards.iter().map(|(k, p)| (*k, p)), now());
        assert_eq!(queue.len(), 2);
        assert!(!queue.push("d", &due_in(5)));
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn most_overdue_first() {
        let cards = [
            ("today", due_in(0)),
            ("week", due_in(-7)),
            ("yesterday", due_in(-1)),
            ("also-week", due_in(-7)),
        ];
        let mut queue = DueQueue::from_cards(cards.iter().map(|(k, p)| (*k, p)), now());
        assert_eq!(queue.peek(), Some(&"week"));
        let order = std::iter::from_fn(|| queue.pop()).collect::<Vec<_>>();
        assert_eq!(order, ["week", "also-week", "yesterday", "today"]);
        assert!(queue.is_empty());
    }

    #[test]
    fn repush_moves_or_drops_key() {
        let mut queue = DueQueue::new(now());
        assert!(queue.push("a", &due_in(-1)));
        assert!(queue.push("b", &due_in(-3)));
        assert_eq!(queue.peek(), Some(&"b"));

        assert!(queue.push("a", &due_in(-5)));
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.peek(), Some(&"a"));

        // reviewed since, so no longer due
        assert!(!queue.push("a", &due_in(4)));
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.pop(), Some("b"));
        assert_eq!(queue.pop(), None);
    }

    #[test]
    fn session_streaks() {
        let mut stats = SessionStats::default();
        assert_eq!(stats.accuracy(), None);
        for quality in [4, 5, 3, 1, 4, 4] {
            stats.record(Quality::new(quality).unwrap());
        }
        assert_eq!(
            stats,
            SessionStats {
                reviewed: 6,
                passed: 5,
                lapses: 1,
                streak: 2,
                best_streak: 3,
            }
        );
        assert_eq!(stats.accuracy(), Some(5.0 / 6.0));
    }
}
