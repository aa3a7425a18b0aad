//! Score value types: the 1–5 feedback rating and the bounded 0–100 score.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Validation failures for [`Rating`].
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum RatingError {
    /// The value is not a whole number.
    #[error("score must be a whole number, got {value}")]
    NotAnInteger { value: f64 },
    /// The value lies outside 1–5.
    #[error("score must be between {min} and {max}, got {value}")]
    OutOfRange { value: f64, min: u8, max: u8 },
}

/// A single feedback rating, always an integer in `1..=5`.
///
/// # Examples
/// ```
/// use krishilok::domain::Rating;
///
/// let rating = Rating::try_from_f64(4.0).expect("valid rating");
/// assert!(rating.is_positive());
/// assert!(Rating::try_from_f64(4.5).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Rating(u8);

impl Rating {
    /// Lowest accepted rating.
    pub const MIN: u8 = 1;
    /// Highest accepted rating.
    pub const MAX: u8 = 5;
    /// Ratings at or above this value count as positive feedback.
    pub const POSITIVE_THRESHOLD: u8 = 4;
    /// Ratings at or below this value count as negative feedback.
    pub const NEGATIVE_THRESHOLD: u8 = 2;

    /// Validate an integer rating.
    pub fn new(value: u8) -> Result<Self, RatingError> {
        if (Self::MIN..=Self::MAX).contains(&value) {
            Ok(Self(value))
        } else {
            Err(RatingError::OutOfRange {
                value: f64::from(value),
                min: Self::MIN,
                max: Self::MAX,
            })
        }
    }

    /// Validate a rating supplied as an arbitrary JSON number.
    pub fn try_from_f64(value: f64) -> Result<Self, RatingError> {
        if !value.is_finite() || value.fract() != 0.0 {
            return Err(RatingError::NotAnInteger { value });
        }
        if value < f64::from(Self::MIN) || value > f64::from(Self::MAX) {
            return Err(RatingError::OutOfRange {
                value,
                min: Self::MIN,
                max: Self::MAX,
            });
        }
        #[expect(
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss,
            reason = "value is a whole number within 1..=5"
        )]
        let whole = value as u8;
        Ok(Self(whole))
    }

    /// The rating as an integer.
    #[must_use]
    pub const fn value(self) -> u8 {
        self.0
    }

    /// Whether this rating counts towards `positive_feedback_count`.
    #[must_use]
    pub const fn is_positive(self) -> bool {
        self.0 >= Self::POSITIVE_THRESHOLD
    }

    /// Whether this rating counts towards `negative_feedback_count`.
    #[must_use]
    pub const fn is_negative(self) -> bool {
        self.0 <= Self::NEGATIVE_THRESHOLD
    }
}

impl TryFrom<u8> for Rating {
    type Error = RatingError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Rating> for u8 {
    fn from(value: Rating) -> Self {
        value.0
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A reputation or quality value confined to `0.0..=100.0`.
///
/// Construction always clamps, so arithmetic upstream can overshoot freely.
/// `NaN` collapses to the baseline. Ordering is total.
///
/// # Examples
/// ```
/// use krishilok::domain::BoundedScore;
///
/// assert_eq!(BoundedScore::clamped(140.0).value(), 100.0);
/// assert_eq!(BoundedScore::clamped(-3.0).value(), 0.0);
/// assert_eq!(BoundedScore::baseline().value(), 50.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "f64", into = "f64")]
pub struct BoundedScore(f64);

impl BoundedScore {
    /// Lower bound.
    pub const MIN: f64 = 0.0;
    /// Upper bound.
    pub const MAX: f64 = 100.0;
    /// Score of an entity with no history.
    pub const BASELINE: f64 = 50.0;

    /// Clamp `raw` into range.
    #[must_use]
    pub fn clamped(raw: f64) -> Self {
        if raw.is_nan() {
            return Self(Self::BASELINE);
        }
        Self(raw.clamp(Self::MIN, Self::MAX))
    }

    /// Clamp `raw` into range and round to two decimal places.
    #[must_use]
    pub fn clamped_rounded(raw: f64) -> Self {
        let Self(bounded) = Self::clamped(raw);
        Self((bounded * 100.0).round() / 100.0)
    }

    /// The neutral starting score.
    #[must_use]
    pub const fn baseline() -> Self {
        Self(Self::BASELINE)
    }

    /// The score as a float.
    #[must_use]
    pub const fn value(self) -> f64 {
        self.0
    }
}

impl Default for BoundedScore {
    fn default() -> Self {
        Self::baseline()
    }
}

impl From<f64> for BoundedScore {
    fn from(value: f64) -> Self {
        Self::clamped(value)
    }
}

impl From<BoundedScore> for f64 {
    fn from(value: BoundedScore) -> Self {
        value.0
    }
}

impl Eq for BoundedScore {}

impl PartialOrd for BoundedScore {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for BoundedScore {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl fmt::Display for BoundedScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}
