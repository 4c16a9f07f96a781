use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use snafu::ensure;
use strum::{Display, EnumString};

use crate::error::{InvalidInputSnafu, Result, SM2Error};
use crate::scheduler::{ReviewResult, due_after};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Learning,
    Mastered,
}

/// Where a card sits in its lifecycle. `Unseen` cards have no progress
/// record; reviewed cards move between `Learning` and `Mastered` freely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "snake_case")]
pub enum CardState {
    Unseen,
    Learning,
    Mastered,
}

impl CardState {
    pub fn of(progress: Option<&CardProgress>) -> Self {
        match progress.map(CardProgress::status) {
            None => CardState::Unseen,
            Some(Status::Learning) => CardState::Learning,
            Some(Status::Mastered) => CardState::Mastered,
        }
    }
}

/// A learner's scheduling state for one card.
///
/// Only exists once the card has been reviewed. Every field is derived from
/// the latest [`ReviewResult`], so there are no setters. Deserializing
/// recomputes `next_review` and rejects a stored one that disagrees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "StoredProgress")]
pub struct CardProgress {
    ease_factor: f32,
    interval: u32,
    lapses: u32,
    status: Status,
    last_reviewed: DateTime<Utc>,
    next_review: DateTime<Utc>,
}

impl CardProgress {
    pub fn from_review(result: &ReviewResult, reviewed_at: DateTime<Utc>) -> Result<Self> {
        Ok(Self {
            ease_factor: result.ease_factor,
            interval: result.interval,
            lapses: result.lapses,
            status: result.status,
            last_reviewed: reviewed_at,
            next_review: result.next_review_at(reviewed_at)?,
        })
    }

    /// Rebuilds a record from stored columns. The due date is recomputed so
    /// it cannot drift from the interval.
    pub fn restore(
        ease_factor: f32,
        interval: u32,
        lapses: u32,
        status: Status,
        last_reviewed: DateTime<Utc>,
    ) -> Result<Self> {
        Ok(Self {
            ease_factor,
            interval,
            lapses,
            status,
            last_reviewed,
            next_review: due_after(last_reviewed, interval)?,
        })
    }

    /// Leaves the record untouched when the new due date is out of range.
    pub fn apply(&mut self, result: &ReviewResult, reviewed_at: DateTime<Utc>) -> Result<()> {
        *self = Self::from_review(result, reviewed_at)?;
        Ok(())
    }

    pub fn ease_factor(&self) -> f32 {
        self.ease_factor
    }

    pub fn interval(&self) -> u32 {
        self.interval
    }

    pub fn lapses(&self) -> u32 {
        self.lapses
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn last_reviewed(&self) -> DateTime<Utc> {
        self.last_reviewed
    }

    pub fn next_review(&self) -> DateTime<Utc> {
        self.next_review
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.next_review <= now
    }

    /// How long past its due date the card is, zero when not yet due.
    pub fn overdue_by(&self, now: DateTime<Utc>) -> Duration {
        (now - self.next_review).max(Duration::zero())
    }
}

/// The persisted form of [`CardProgress`]. `next_review` is optional since
/// it is derived.
#[derive(Deserialize)]
struct StoredProgress {
    ease_factor: f32,
    interval: u32,
    lapses: u32,
    status: Status,
    last_reviewed: DateTime<Utc>,
    #[serde(default)]
    next_review: Option<DateTime<Utc>>,
}

impl TryFrom<StoredProgress> for CardProgress {
    type Error = SM2Error;

    fn try_from(stored: StoredProgress) -> Result<Self> {
        let progress = CardProgress::restore(
            stored.ease_factor,
            stored.interval,
            stored.lapses,
            stored.status,
            stored.last_reviewed,
        )?;
        if let Some(next_review) = stored.next_review {
            ensure!(
                next_review == progress.next_review,
                InvalidInputSnafu {
                    reason: format!(
                        "next_review {next_review} is not {} days after {}",
                        progress.interval, progress.last_reviewed
                    ),
                }
            );
        }
        Ok(progress)
    }
}

/// One entry of a card's review history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewLog {
    /// 0-5
    pub quality: i32,
    pub reviewed_at: DateTime<Utc>,
}
