use chrono::{DateTime, Duration, Utc};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use snafu::{OptionExt, ensure};

use crate::config::{InputMode, SchedulerConfig};
use crate::error::{InvalidInputSnafu, Result};
use crate::progress::{CardProgress, ReviewLog, Status};
use crate::quality::{Quality, Rating};

/// Interval after the first successful review.
pub const FIRST_INTERVAL: u32 = 1;
/// Interval after the second successful review.
pub const SECOND_INTERVAL: u32 = 6;
/// Interval after a failed review.
pub const LAPSE_INTERVAL: u32 = 1;

/// Outcome of one review. The caller persists it (usually through
/// [`CardProgress::apply`]).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReviewResult {
    /// The grade that produced this result, after any clamping.
    pub quality: Quality,
    pub ease_factor: f32,
    /// Whole days until the card is due again.
    pub interval: u32,
    pub lapses: u32,
    pub status: Status,
}

impl ReviewResult {
    pub fn next_review_at(&self, reviewed_at: DateTime<Utc>) -> Result<DateTime<Utc>> {
        due_after(reviewed_at, self.interval)
    }
}

/// `reviewed_at` plus `interval` days, or `InvalidInput` past the last
/// representable date.
pub(crate) fn due_after(reviewed_at: DateTime<Utc>, interval: u32) -> Result<DateTime<Utc>> {
    reviewed_at
        .checked_add_signed(Duration::days(i64::from(interval)))
        .context(InvalidInputSnafu {
            reason: format!("{interval} days after {reviewed_at} is out of range"),
        })
}

/// The result each answer button would produce.
#[derive(Debug, Clone, PartialEq)]
pub struct NextStates {
    pub again: ReviewResult,
    pub hard: ReviewResult,
    pub good: ReviewResult,
    pub easy: ReviewResult,
}

impl NextStates {
    pub fn get(&self, rating: Rating) -> &ReviewResult {
        match rating {
            Rating::Again => &self.again,
            Rating::Hard => &self.hard,
            Rating::Good => &self.good,
            Rating::Easy => &self.easy,
        }
    }
}

/// SM-2 scheduler. Holds only its configuration; every call is a pure
/// function of its arguments, so callers own storage and must serialize
/// concurrent updates to the same card themselves.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReviewScheduler {
    config: SchedulerConfig,
}

impl ReviewScheduler {
    pub fn new(config: SchedulerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Computes the schedule after a review graded `quality` (0-5).
    ///
    /// - `previous_interval` is in days; 0 means the card was never scheduled.
    /// - `previous_ease_factor` of 0 means "use the default ease".
    pub fn compute_next_review(
        &self,
        quality: i32,
        previous_interval: f32,
        previous_ease_factor: f32,
        previous_lapses: u32,
    ) -> Result<ReviewResult> {
        let quality = self.check_quality(quality)?;
        let previous_interval = self.check_interval(previous_interval)?;
        let previous_ease_factor = self.check_ease_factor(previous_ease_factor)?;
        Ok(self.schedule(
            quality,
            previous_interval,
            previous_ease_factor,
            previous_lapses,
        ))
    }

    /// Reviews a card, starting from its stored progress or from scratch
    /// when it has never been seen.
    pub fn review(
        &self,
        quality: i32,
        previous: Option<&CardProgress>,
        now: DateTime<Utc>,
    ) -> Result<CardProgress> {
        let (interval, ease_factor, lapses) = previous.map_or((0.0, 0.0, 0), |progress| {
            (
                progress.interval() as f32,
                progress.ease_factor(),
                progress.lapses(),
            )
        });
        let result = self.compute_next_review(quality, interval, ease_factor, lapses)?;
        CardProgress::from_review(&result, now)
    }

    pub fn next_states(&self, previous: Option<&CardProgress>) -> Result<NextStates> {
        let (interval, ease_factor, lapses) = match previous {
            Some(progress) => (
                self.check_interval(progress.interval() as f32)?,
                self.check_ease_factor(progress.ease_factor())?,
                progress.lapses(),
            ),
            None => (0, self.config.default_ease_factor, 0),
        };
        let next = |rating: Rating| self.schedule(rating.quality(), interval, ease_factor, lapses);
        Ok(NextStates {
            again: next(Rating::Again),
            hard: next(Rating::Hard),
            good: next(Rating::Good),
            easy: next(Rating::Easy),
        })
    }

    /// Folds a chronological review history into the resulting progress.
    /// Returns `None` for an empty history.
    pub fn replay(&self, history: &[ReviewLog]) -> Result<Option<CardProgress>> {
        ensure!(
            history.is_sorted_by_key(|log| log.reviewed_at),
            InvalidInputSnafu {
                reason: "review history is not in chronological order",
            }
        );
        history.iter().try_fold(None, |progress, log| {
            self.review(log.quality, progress.as_ref(), log.reviewed_at)
                .map(Some)
        })
    }

    pub(crate) fn schedule(
        &self,
        quality: Quality,
        previous_interval: u32,
        previous_ease_factor: f32,
        previous_lapses: u32,
    ) -> ReviewResult {
        let ease_factor = self.next_ease_factor(previous_ease_factor, quality);
        let (interval, lapses) = if !quality.is_pass() {
            (LAPSE_INTERVAL, previous_lapses.saturating_add(1))
        } else {
            let interval = match previous_interval {
                0 => FIRST_INTERVAL,
                1 => SECOND_INTERVAL,
                n => (n as f32 * ease_factor)
                    .round()
                    .clamp(1.0, self.config.max_interval as f32) as u32,
            };
            (interval, previous_lapses)
        };
        let status = self.config.mastery_rule.status(quality, interval);
        debug!(
            "quality {quality}: ease {previous_ease_factor} -> {ease_factor}, interval {previous_interval} -> {interval}, {status}"
        );
        ReviewResult {
            quality,
            ease_factor,
            interval,
            lapses,
            status,
        }
    }

    fn next_ease_factor(&self, ease_factor: f32, quality: Quality) -> f32 {
        let shortfall = quality.shortfall();
        let ease_factor = (ease_factor + (0.1 - shortfall * (0.08 + shortfall * 0.02)))
            .max(self.config.min_ease_factor);
        match self.config.max_ease_factor {
            Some(max) => ease_factor.min(max),
            None => ease_factor,
        }
    }

    fn check_quality(&self, quality: i32) -> Result<Quality> {
        match self.config.input_mode {
            InputMode::Strict => Quality::new(quality),
            InputMode::Lenient => {
                let clamped = Quality::clamped(quality);
                if i32::from(clamped) != quality {
                    warn!("quality {quality} clamped to {clamped}");
                }
                Ok(clamped)
            }
        }
    }

    /// Rounds to whole days so rounding error cannot compound between reviews.
    fn check_interval(&self, interval: f32) -> Result<u32> {
        if !(interval.is_finite() && interval >= 0.0) {
            ensure!(
                self.config.input_mode == InputMode::Lenient,
                InvalidInputSnafu {
                    reason: format!("previous interval {interval} must be a non-negative number"),
                }
            );
            warn!("previous interval {interval} reset to 0");
            return Ok(0);
        }
        let max_interval = self.config.max_interval;
        let interval = interval.round();
        if interval > max_interval as f32 {
            ensure!(
                self.config.input_mode == InputMode::Lenient,
                InvalidInputSnafu {
                    reason: format!("previous interval {interval} exceeds {max_interval} days"),
                }
            );
            warn!("previous interval {interval} clamped to {max_interval}");
            return Ok(max_interval);
        }
        Ok(interval as u32)
    }

    fn check_ease_factor(&self, ease_factor: f32) -> Result<f32> {
        if ease_factor == 0.0 {
            return Ok(self.config.default_ease_factor);
        }
        if !(ease_factor.is_finite() && ease_factor > 0.0) {
            ensure!(
                self.config.input_mode == InputMode::Lenient,
                InvalidInputSnafu {
                    reason: format!("previous ease factor {ease_factor} must be positive"),
                }
            );
            warn!(
                "previous ease factor {ease_factor} reset to {}",
                self.config.default_ease_factor
            );
            return Ok(self.config.default_ease_factor);
        }
        Ok(ease_factor)
    }
}
