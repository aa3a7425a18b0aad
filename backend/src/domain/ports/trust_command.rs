//! Driving port for operations that change trust state.
//!
//! HTTP handlers and the rebuild binary call this port. Every write path ends
//! with the recompute-from-history step, so cached scores never depend on the
//! order in which events arrived.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::trust::SuggestionScores;
use crate::domain::{
    BoundedScore, Contributor, Feedback, FollowUpKey, Suggestion, SuggestionId, TrustEngineError,
    UserId, UserRole,
};

/// Create a contributor profile on behalf of the account subsystem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterContributorRequest {
    pub display_name: String,
    pub role: UserRole,
}

/// Publish a piece of advice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitSuggestionRequest {
    pub author_id: UserId,
    pub disease_name: String,
    pub text: String,
    pub details: Option<String>,
}

/// Rate a suggestion.
///
/// `score` is accepted as a raw number so non-integer and out-of-range
/// values reach the engine and are rejected as `InvalidScore`.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordFeedbackRequest {
    pub rater_id: UserId,
    pub suggestion_id: SuggestionId,
    pub score: f64,
    pub comment: Option<String>,
    pub context_id: Option<Uuid>,
}

/// Snapshot returned after feedback commits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdatedScores {
    pub feedback: Feedback,
    pub suggestion: Suggestion,
    /// The suggestion author, whose trust score the rating feeds.
    pub author: Contributor,
    /// `None` when the follow-up prompt could not be stored.
    pub follow_up_scheduled_for: Option<DateTime<Utc>>,
}

/// Cached and rebuilt aggregate of one suggestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionRebuild {
    #[schema(value_type = String, format = Uuid)]
    pub suggestion_id: SuggestionId,
    pub previous: SuggestionScores,
    pub rebuilt: SuggestionScores,
}

impl SuggestionRebuild {
    #[must_use]
    pub fn drifted(&self) -> bool {
        self.previous != self.rebuilt
    }
}

/// Cached and rebuilt trust score of one contributor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ContributorRebuild {
    #[schema(value_type = String, format = Uuid)]
    pub user_id: UserId,
    #[schema(value_type = f64)]
    pub previous: BoundedScore,
    #[schema(value_type = f64)]
    pub rebuilt: BoundedScore,
}

impl ContributorRebuild {
    #[must_use]
    pub fn drifted(&self) -> bool {
        self.previous != self.rebuilt
    }
}

/// Totals from a full rebuild.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RebuildSummary {
    pub suggestions: u32,
    pub suggestions_drifted: u32,
    pub contributors: u32,
    pub contributors_drifted: u32,
}

/// Driving port for trust state changes.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TrustCommand: Send + Sync {
    /// Create a profile at the baseline trust score.
    async fn register_contributor(
        &self,
        request: RegisterContributorRequest,
    ) -> Result<Contributor, TrustEngineError>;

    /// Publish advice at the baseline usefulness score.
    async fn submit_suggestion(
        &self,
        request: SubmitSuggestionRequest,
    ) -> Result<Suggestion, TrustEngineError>;

    /// Validate, persist and fold one rating into the suggestion and its
    /// author.
    ///
    /// # Errors
    ///
    /// `InvalidScore`, `DuplicateFeedback`, `SuggestionNotFound`,
    /// `UserNotFound`, `ConcurrentUpdateConflict`, or a storage failure.
    async fn record_feedback(
        &self,
        request: RecordFeedbackRequest,
    ) -> Result<UpdatedScores, TrustEngineError>;

    /// Recompute one suggestion from history.
    async fn rebuild_suggestion(
        &self,
        suggestion_id: SuggestionId,
    ) -> Result<SuggestionRebuild, TrustEngineError>;

    /// Recompute one contributor from history.
    async fn rebuild_contributor(
        &self,
        user_id: UserId,
    ) -> Result<ContributorRebuild, TrustEngineError>;

    /// Recompute every suggestion, then every contributor.
    async fn rebuild_all(&self) -> Result<RebuildSummary, TrustEngineError>;

    /// Cancel a pending follow-up prompt.
    async fn cancel_follow_up(&self, key: FollowUpKey) -> Result<bool, TrustEngineError>;
}
