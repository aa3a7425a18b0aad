//! Disease-treatment advice and its cached usefulness aggregate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::trust::{FeedbackSample, SuggestionScores};
use crate::domain::{BoundedScore, SuggestionId, UserId};

/// Validation failures for new suggestions.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SuggestionValidationError {
    /// Disease name blank after trimming.
    #[error("disease name must not be empty")]
    EmptyDiseaseName,
    /// Disease name longer than [`Suggestion::DISEASE_NAME_MAX`].
    #[error("disease name must be at most {max} characters")]
    DiseaseNameTooLong { max: usize },
    /// Advice text blank after trimming.
    #[error("suggestion text must not be empty")]
    EmptyText,
}

/// Advice tied to a disease name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Suggestion {
    #[schema(value_type = String, format = Uuid)]
    pub id: SuggestionId,
    #[schema(value_type = String, format = Uuid)]
    pub author_id: UserId,
    pub disease_name: String,
    pub text: String,
    pub details: Option<String>,
    #[schema(value_type = f64, minimum = 0.0, maximum = 100.0)]
    pub usefulness_score: BoundedScore,
    pub usage_count: u32,
    pub positive_feedback_count: u32,
    pub negative_feedback_count: u32,
    /// Optimistic concurrency counter for score writes.
    pub score_revision: u32,
    pub created_at: DateTime<Utc>,
}

impl Suggestion {
    /// Upper bound on disease name length, in characters.
    pub const DISEASE_NAME_MAX: usize = 255;

    /// Validate input and build a suggestion at the baseline score.
    pub fn draft(
        id: SuggestionId,
        author_id: UserId,
        disease_name: &str,
        text: &str,
        details: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Self, SuggestionValidationError> {
        let disease_name = normalize_disease_name(disease_name)?;
        let text = text.trim();
        if text.is_empty() {
            return Err(SuggestionValidationError::EmptyText);
        }
        let details = details
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_owned);
        Ok(Self {
            id,
            author_id,
            disease_name,
            text: text.to_owned(),
            details,
            usefulness_score: BoundedScore::baseline(),
            usage_count: 0,
            positive_feedback_count: 0,
            negative_feedback_count: 0,
            score_revision: 0,
            created_at: now,
        })
    }

    /// The cached aggregate as a comparable value.
    #[must_use]
    pub fn cached_scores(&self) -> SuggestionScores {
        SuggestionScores {
            usefulness_score: self.usefulness_score,
            usage_count: self.usage_count,
            positive_feedback_count: self.positive_feedback_count,
            negative_feedback_count: self.negative_feedback_count,
        }
    }

    /// Overwrite the cached aggregate with freshly computed values.
    pub fn apply_scores(&mut self, scores: &SuggestionScores) {
        self.usefulness_score = scores.usefulness_score;
        self.usage_count = scores.usage_count;
        self.positive_feedback_count = scores.positive_feedback_count;
        self.negative_feedback_count = scores.negative_feedback_count;
    }
}

/// Trim and validate a disease name. Matching is exact after trimming.
pub fn normalize_disease_name(raw: &str) -> Result<String, SuggestionValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(SuggestionValidationError::EmptyDiseaseName);
    }
    if trimmed.chars().count() > Suggestion::DISEASE_NAME_MAX {
        return Err(SuggestionValidationError::DiseaseNameTooLong {
            max: Suggestion::DISEASE_NAME_MAX,
        });
    }
    Ok(trimmed.to_owned())
}

/// Everything the usefulness recompute reads for one suggestion.
///
/// `suggestion.score_revision` must be read before `samples` so a write that
/// lands between the two reads is detected as a revision mismatch.
#[derive(Debug, Clone, PartialEq)]
pub struct SuggestionLedger {
    pub suggestion: Suggestion,
    pub samples: Vec<FeedbackSample>,
}

/// A suggestion paired with its author's trust score, the third ranking key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RankedSuggestion {
    #[serde(flatten)]
    pub suggestion: Suggestion,
    #[schema(value_type = f64, minimum = 0.0, maximum = 100.0)]
    pub author_trust_score: BoundedScore,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn draft(disease: &str, text: &str) -> Result<Suggestion, SuggestionValidationError> {
        Suggestion::draft(
            SuggestionId::random(),
            UserId::random(),
            disease,
            text,
            Some("  "),
            Utc::now(),
        )
    }

    #[rstest]
    fn draft_trims_fields_and_starts_at_baseline() {
        let suggestion = draft("  Leaf Rust ", " spray neem oil ").expect("valid suggestion");
        assert_eq!(suggestion.disease_name, "Leaf Rust");
        assert_eq!(suggestion.text, "spray neem oil");
        assert!(suggestion.details.is_none());
        assert_eq!(suggestion.usefulness_score.value(), 50.0);
        assert_eq!(suggestion.usage_count, 0);
    }

    #[rstest]
    #[case("", "text", SuggestionValidationError::EmptyDiseaseName)]
    #[case("rust", "   ", SuggestionValidationError::EmptyText)]
    fn draft_rejects_blank_fields(
        #[case] disease: &str,
        #[case] text: &str,
        #[case] expected: SuggestionValidationError,
    ) {
        assert_eq!(draft(disease, text), Err(expected));
    }

    #[rstest]
    fn draft_rejects_long_disease_names() {
        let name = "d".repeat(256);
        assert_eq!(
            draft(&name, "text"),
            Err(SuggestionValidationError::DiseaseNameTooLong { max: 255 })
        );
    }
}
