//! Feedback: one immutable rating of one suggestion by one user.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::trust::FeedbackSample;
use crate::domain::{FeedbackId, Rating, SuggestionId, UserId};

/// A persisted rating.
///
/// At most one exists per `(rater_id, suggestion_id)`. `target_user_id` is the
/// suggestion author at the time of rating and is the user whose trust score
/// the rating feeds into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Feedback {
    #[schema(value_type = String, format = Uuid)]
    pub id: FeedbackId,
    #[schema(value_type = String, format = Uuid)]
    pub rater_id: UserId,
    #[schema(value_type = String, format = Uuid)]
    pub suggestion_id: SuggestionId,
    #[schema(value_type = String, format = Uuid)]
    pub target_user_id: UserId,
    #[schema(value_type = u8, minimum = 1, maximum = 5)]
    pub rating: Rating,
    pub comment: Option<String>,
    /// Scan or diagnosis the advice was applied to.
    pub context_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl Feedback {
    /// Upper bound on comment length, in characters.
    pub const COMMENT_MAX: usize = 2_000;

    /// The fields the usefulness fold reads.
    #[must_use]
    pub fn sample(&self) -> FeedbackSample {
        FeedbackSample {
            rating: self.rating,
            has_context: self.context_id.is_some(),
        }
    }
}

/// Comment validation failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("comment must be at most {max} characters")]
pub struct CommentTooLong {
    pub max: usize,
}

/// Trim a comment, dropping it when blank.
pub fn normalize_comment(raw: Option<&str>) -> Result<Option<String>, CommentTooLong> {
    let Some(trimmed) = raw.map(str::trim).filter(|value| !value.is_empty()) else {
        return Ok(None);
    };
    if trimmed.chars().count() > Feedback::COMMENT_MAX {
        return Err(CommentTooLong {
            max: Feedback::COMMENT_MAX,
        });
    }
    Ok(Some(trimmed.to_owned()))
}
