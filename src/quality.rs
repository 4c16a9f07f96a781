use std::fmt;

use serde::{Deserialize, Serialize};
use snafu::ensure;
use strum::{Display, EnumIter, EnumString};

use crate::error::{InvalidInputSnafu, Result, SM2Error};

/// Lowest grade a review can be given.
pub const MIN_QUALITY: u8 = 0;
/// Highest grade a review can be given.
pub const MAX_QUALITY: u8 = 5;
/// Grades at or above this count as a successful recall.
pub const PASSING_QUALITY: u8 = 3;
/// Highest grade of the older four-point scale (0-3).
const LEGACY_MAX_QUALITY: i32 = 3;

/// A recall grade on the 0-5 scale. 0-2 means the card was forgotten,
/// 3-5 are successively better recalls (hard, good, easy).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "u8")]
pub struct Quality(u8);

impl Quality {
    pub fn new(value: i32) -> Result<Self> {
        ensure!(
            (i32::from(MIN_QUALITY)..=i32::from(MAX_QUALITY)).contains(&value),
            InvalidInputSnafu {
                reason: format!("quality {value} is outside {MIN_QUALITY}..={MAX_QUALITY}"),
            }
        );
        Ok(Self(value as u8))
    }

    pub fn clamped(value: i32) -> Self {
        Self(value.clamp(i32::from(MIN_QUALITY), i32::from(MAX_QUALITY)) as u8)
    }

    /// Converts a grade from the four-point scale used by older clients.
    ///
    /// Shifting by two keeps the ease update identical (`3 - q` becomes
    /// `5 - (q + 2)`), and only a legacy 0 lands below [`PASSING_QUALITY`].
    pub fn from_legacy(value: i32) -> Result<Self> {
        ensure!(
            (0..=LEGACY_MAX_QUALITY).contains(&value),
            InvalidInputSnafu {
                reason: format!("legacy quality {value} is outside 0..={LEGACY_MAX_QUALITY}"),
            }
        );
        Self::new(value + 2)
    }

    pub fn value(self) -> u8 {
        self.0
    }

    pub fn is_pass(self) -> bool {
        self.0 >= PASSING_QUALITY
    }

    /// Distance from a perfect recall, as used by the ease update.
    pub(crate) fn shortfall(self) -> f32 {
        f32::from(MAX_QUALITY - self.0)
    }
}

impl TryFrom<i32> for Quality {
    type Error = SM2Error;

    fn try_from(value: i32) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Quality> for u8 {
    fn from(quality: Quality) -> Self {
        quality.0
    }
}

impl From<Quality> for i32 {
    fn from(quality: Quality) -> Self {
        i32::from(quality.0)
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The answer buttons shown under a flashcard.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum Rating {
    Again,
    Hard,
    Good,
    Easy,
}

impl Rating {
    pub fn quality(self) -> Quality {
        match self {
            Rating::Again => Quality(1),
            Rating::Hard => Quality(3),
            Rating::Good => Quality(4),
            Rating::Easy => Quality(5),
        }
    }
}

impl From<Rating> for Quality {
    fn from(rating: Rating) -> Self {
        rating.quality()
    }
}
