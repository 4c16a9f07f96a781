use serde::{Deserialize, Serialize};
use snafu::ensure;

use crate::error::{InvalidConfigSnafu, Result};
use crate::progress::Status;
use crate::quality::{MAX_QUALITY, PASSING_QUALITY, Quality};
use crate::scheduler::{LAPSE_INTERVAL, SECOND_INTERVAL};

/// Ease given to a card that has never been reviewed.
pub const DEFAULT_EASE_FACTOR: f32 = 2.5;
/// No update may leave the ease below this.
pub const MIN_EASE_FACTOR: f32 = 1.3;
/// Ceiling applied by the stricter policy, see [`SchedulerConfig::with_ease_ceiling`].
pub const STRICT_MAX_EASE_FACTOR: f32 = 2.5;
pub const DEFAULT_MASTERY_QUALITY: u8 = 4;
pub const DEFAULT_MASTERY_INTERVAL: u32 = 30;
/// Longest interval a review may schedule, in days.
pub const MAX_INTERVAL: u32 = 36500;

/// Decides whether a card counts as mastered after a review.
///
/// The two rules classify very differently over time: the quality rule
/// flips a card to mastered on the first good-enough answer, while the
/// interval rule waits until the schedule itself has grown long.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum MasteryRule {
    /// Mastered when the latest quality is at least `min_quality`.
    Quality { min_quality: u8 },
    /// Mastered when the new interval is at least `days`.
    IntervalThreshold { days: u32 },
}

impl MasteryRule {
    pub fn status(&self, quality: Quality, interval: u32) -> Status {
        let mastered = match *self {
            MasteryRule::Quality { min_quality } => quality.value() >= min_quality,
            MasteryRule::IntervalThreshold { days } => interval >= days,
        };
        if mastered {
            Status::Mastered
        } else {
            Status::Learning
        }
    }
}

impl Default for MasteryRule {
    fn default() -> Self {
        MasteryRule::Quality {
            min_quality: DEFAULT_MASTERY_QUALITY,
        }
    }
}

/// How out-of-range review inputs are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputMode {
    /// Reject with [`crate::SM2Error::InvalidInput`].
    #[default]
    Strict,
    /// Clamp quality into range and reset bad interval/ease values to their
    /// "never reviewed" sentinels, logging a warning each time.
    Lenient,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub default_ease_factor: f32,
    pub min_ease_factor: f32,
    /// `None` keeps the ease unbounded above.
    pub max_ease_factor: Option<f32>,
    /// Computed intervals are capped here.
    pub max_interval: u32,
    pub mastery_rule: MasteryRule,
    pub input_mode: InputMode,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            default_ease_factor: DEFAULT_EASE_FACTOR,
            min_ease_factor: MIN_EASE_FACTOR,
            max_ease_factor: None,
            max_interval: MAX_INTERVAL,
            mastery_rule: MasteryRule::default(),
            input_mode: InputMode::default(),
        }
    }
}

impl SchedulerConfig {
    /// Caps the ease at [`STRICT_MAX_EASE_FACTOR`] in addition to the floor.
    pub fn with_ease_ceiling(self) -> Self {
        Self {
            max_ease_factor: Some(STRICT_MAX_EASE_FACTOR),
            ..self
        }
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.min_ease_factor.is_finite() && self.min_ease_factor > 0.0,
            InvalidConfigSnafu {
                reason: format!("min_ease_factor {} must be positive", self.min_ease_factor),
            }
        );
        let max_ease_factor = match self.max_ease_factor {
            Some(max) => {
                ensure!(
                    max.is_finite() && max >= self.min_ease_factor,
                    InvalidConfigSnafu {
                        reason: format!(
                            "max_ease_factor {max} is below min_ease_factor {}",
                            self.min_ease_factor
                        ),
                    }
                );
                max
            }
            None => f32::INFINITY,
        };
        ensure!(
            self.default_ease_factor.is_finite()
                && (self.min_ease_factor..=max_ease_factor).contains(&self.default_ease_factor),
            InvalidConfigSnafu {
                reason: format!(
                    "default_ease_factor {} is outside the allowed ease range",
                    self.default_ease_factor
                ),
            }
        );
        ensure!(
            self.max_interval >= SECOND_INTERVAL,
            InvalidConfigSnafu {
                reason: format!(
                    "max_interval {} is below the {SECOND_INTERVAL} day second interval",
                    self.max_interval
                ),
            }
        );
        match self.mastery_rule {
            MasteryRule::Quality { min_quality } => ensure!(
                (PASSING_QUALITY..=MAX_QUALITY).contains(&min_quality),
                InvalidConfigSnafu {
                    reason: format!(
                        "mastery min_quality {min_quality} is outside {PASSING_QUALITY}..={MAX_QUALITY}"
                    ),
                }
            ),
            MasteryRule::IntervalThreshold { days } => ensure!(
                days > LAPSE_INTERVAL,
                InvalidConfigSnafu {
                    reason: format!("mastery threshold of {days} days would master lapsed cards"),
                }
            ),
        }
        Ok(())
    }
}
