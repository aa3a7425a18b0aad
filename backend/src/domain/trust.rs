//! Pure score computation.
//!
//! Every function here is a deterministic fold over persisted history. The
//! cached columns on suggestions and users are only ever written with values
//! produced by these functions, which is what makes them rebuildable.
//!
//! Usefulness centres a neutral mean rating of 3 at the baseline and scales
//! each rating point to 20 score points:
//!
//! ```text
//! usefulness = clamp(50 + (mean - 3) * 20, 0, 100)
//! trust      = clamp(50 + accepted * 10 + mean_received * 5 + verified * 3, 0, 100)
//! ```
//!
//! A user with no received feedback contributes `0` for the mean term.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{BoundedScore, Rating};

/// Mean rating that maps to the baseline usefulness.
pub const NEUTRAL_RATING: f64 = 3.0;
/// Usefulness points per rating point away from neutral.
pub const USEFULNESS_SCALE: f64 = 20.0;
/// Trust points per accepted response.
pub const ACCEPTED_RESPONSE_WEIGHT: f64 = 10.0;
/// Trust points per unit of mean received rating.
pub const RECEIVED_FEEDBACK_WEIGHT: f64 = 5.0;
/// Trust points per verified response.
pub const VERIFIED_RESPONSE_WEIGHT: f64 = 3.0;

/// One feedback row reduced to the fields the usefulness fold reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedbackSample {
    pub rating: Rating,
    /// Whether the feedback was linked to a diagnosed scan.
    pub has_context: bool,
}

/// Running tally over a set of ratings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeedbackTally {
    pub count: u32,
    pub sum: u32,
    pub positive: u32,
    pub negative: u32,
}

impl FeedbackTally {
    /// Fold ratings into a tally.
    pub fn from_ratings(ratings: impl IntoIterator<Item = Rating>) -> Self {
        ratings.into_iter().fold(Self::default(), |mut tally, rating| {
            tally.count = tally.count.saturating_add(1);
            tally.sum = tally.sum.saturating_add(u32::from(rating.value()));
            if rating.is_positive() {
                tally.positive = tally.positive.saturating_add(1);
            }
            if rating.is_negative() {
                tally.negative = tally.negative.saturating_add(1);
            }
            tally
        })
    }

    /// Arithmetic mean, or `None` when empty.
    #[must_use]
    pub fn mean(&self) -> Option<f64> {
        (self.count > 0).then(|| f64::from(self.sum) / f64::from(self.count))
    }
}

/// Derived aggregate cached on a suggestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionScores {
    #[schema(value_type = f64, minimum = 0.0, maximum = 100.0)]
    pub usefulness_score: BoundedScore,
    pub usage_count: u32,
    pub positive_feedback_count: u32,
    pub negative_feedback_count: u32,
}

impl Default for SuggestionScores {
    fn default() -> Self {
        Self {
            usefulness_score: BoundedScore::baseline(),
            usage_count: 0,
            positive_feedback_count: 0,
            negative_feedback_count: 0,
        }
    }
}

/// Recompute a suggestion's aggregate from its complete feedback history.
///
/// # Examples
/// ```
/// use krishilok::domain::trust::{suggestion_scores, FeedbackSample};
/// use krishilok::domain::Rating;
///
/// let five = FeedbackSample { rating: Rating::new(5).expect("rating"), has_context: false };
/// let scores = suggestion_scores(&[five, five, five]);
/// assert_eq!(scores.usefulness_score.value(), 100.0);
/// assert_eq!(scores.positive_feedback_count, 3);
/// ```
#[must_use]
pub fn suggestion_scores(samples: &[FeedbackSample]) -> SuggestionScores {
    let tally = FeedbackTally::from_ratings(samples.iter().map(|sample| sample.rating));
    let usage_count = samples.iter().filter(|sample| sample.has_context).count();
    SuggestionScores {
        usefulness_score: usefulness_score(&tally),
        usage_count: u32::try_from(usage_count).unwrap_or(u32::MAX),
        positive_feedback_count: tally.positive,
        negative_feedback_count: tally.negative,
    }
}

/// Usefulness for a tally; the baseline when the tally is empty.
#[must_use]
pub fn usefulness_score(tally: &FeedbackTally) -> BoundedScore {
    match tally.mean() {
        Some(mean) => BoundedScore::clamped_rounded(
            BoundedScore::BASELINE + (mean - NEUTRAL_RATING) * USEFULNESS_SCALE,
        ),
        None => BoundedScore::baseline(),
    }
}

/// History the trust fold reads for one user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContributorActivity {
    /// Responses by this user that a post owner accepted.
    pub accepted_responses: u32,
    /// Responses by this user flagged verified.
    pub verified_responses: u32,
    /// Every rating received as a suggestion author.
    pub received_ratings: Vec<Rating>,
}

/// Recompute a user's trust score from current activity.
///
/// # Examples
/// ```
/// use krishilok::domain::trust::{trust_score, ContributorActivity};
///
/// assert_eq!(trust_score(&ContributorActivity::default()).value(), 50.0);
/// ```
#[must_use]
pub fn trust_score(activity: &ContributorActivity) -> BoundedScore {
    let tally = FeedbackTally::from_ratings(activity.received_ratings.iter().copied());
    let mean_received = tally.mean().unwrap_or(0.0);
    BoundedScore::clamped_rounded(
        BoundedScore::BASELINE
            + f64::from(activity.accepted_responses) * ACCEPTED_RESPONSE_WEIGHT
            + mean_received * RECEIVED_FEEDBACK_WEIGHT
            + f64::from(activity.verified_responses) * VERIFIED_RESPONSE_WEIGHT,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn sample(value: u8) -> FeedbackSample {
        FeedbackSample {
            rating: Rating::new(value).expect("valid rating"),
            has_context: false,
        }
    }

    fn ratings(values: &[u8]) -> Vec<Rating> {
        values
            .iter()
            .map(|value| Rating::new(*value).expect("valid rating"))
            .collect()
    }

    #[rstest]
    fn empty_history_keeps_baseline() {
        assert_eq!(suggestion_scores(&[]), SuggestionScores::default());
        assert_eq!(trust_score(&ContributorActivity::default()).value(), 50.0);
    }

    #[rstest]
    #[case(&[5, 5, 5], 100.0)]
    #[case(&[1, 1, 1], 10.0)]
    #[case(&[5, 1], 50.0)]
    #[case(&[4], 70.0)]
    #[case(&[3, 4], 60.0)]
    #[case(&[2, 2, 3], 36.67)]
    fn usefulness_follows_mean_rating(#[case] values: &[u8], #[case] expected: f64) {
        let samples: Vec<_> = values.iter().copied().map(sample).collect();
        assert_eq!(suggestion_scores(&samples).usefulness_score.value(), expected);
    }

    #[rstest]
    fn counts_are_recounted_from_history() {
        let mut samples: Vec<_> = [5, 4, 3, 2, 1].into_iter().map(sample).collect();
        samples[0].has_context = true;
        samples[3].has_context = true;

        let scores = suggestion_scores(&samples);

        assert_eq!(scores.positive_feedback_count, 2);
        assert_eq!(scores.negative_feedback_count, 2);
        assert_eq!(scores.usage_count, 2);
    }

    #[rstest]
    #[case(0, 0, &[], 50.0)]
    #[case(2, 0, &[], 70.0)]
    #[case(0, 1, &[4, 2], 68.0)]
    #[case(1, 2, &[5], 91.0)]
    #[case(10, 10, &[5, 5], 100.0)]
    #[case(0, 0, &[1], 55.0)]
    fn trust_combines_weighted_activity(
        #[case] accepted: u32,
        #[case] verified: u32,
        #[case] received: &[u8],
        #[case] expected: f64,
    ) {
        let activity = ContributorActivity {
            accepted_responses: accepted,
            verified_responses: verified,
            received_ratings: ratings(received),
        };
        assert_eq!(trust_score(&activity).value(), expected);
    }

    #[rstest]
    fn scores_stay_in_range_for_extreme_histories() {
        for value in Rating::MIN..=Rating::MAX {
            let samples = vec![sample(value); 500];
            let usefulness = suggestion_scores(&samples).usefulness_score.value();
            assert!((0.0..=100.0).contains(&usefulness));

            let activity = ContributorActivity {
                accepted_responses: u32::MAX,
                verified_responses: u32::MAX,
                received_ratings: ratings(&[value; 50]),
            };
            let trust = trust_score(&activity).value();
            assert!((0.0..=100.0).contains(&trust));
        }
    }

    #[rstest]
    fn recompute_is_idempotent() {
        let samples: Vec<_> = [5, 3, 2, 4].into_iter().map(sample).collect();
        assert_eq!(suggestion_scores(&samples), suggestion_scores(&samples));
    }
}
