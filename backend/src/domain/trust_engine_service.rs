//! Trust engine service implementing [`TrustCommand`] and [`TrustQuery`].
//!
//! Write paths persist the triggering fact first and then run the shared
//! recompute step, so cached scores are always a function of stored history.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockable::Clock;
use tracing::{info, warn};

use crate::domain::feedback::normalize_comment;
use crate::domain::ports::{
    CommunityRepository, ContributorRebuild, ContributorRepository, FeedbackRepository,
    FeedbackRepositoryError, FollowUpScheduler, RebuildSummary, RecordFeedbackRequest,
    RegisterContributorRequest, SubmitSuggestionRequest, SuggestionRebuild, SuggestionRepository,
    TrustCommand, TrustQuery, UpdatedScores,
};
use crate::domain::ranking;
use crate::domain::suggestion::normalize_disease_name;
use crate::domain::{
    Contributor, ContributorStanding, Feedback, FeedbackId, FollowUpKey, FollowUpPolicy,
    FollowUpPrompt, Pagination, PostFilter, PostPage, PostSort, RankedSuggestion, Rating,
    ScoreRecomputer, StaleScore, Suggestion, SuggestionId, TrustEngineError, UserId, UserRole,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Inserted {
    New,
    Duplicate,
}

/// Driven ports the trust engine reads and writes.
#[derive(Clone)]
pub struct TrustEnginePorts {
    pub suggestions: Arc<dyn SuggestionRepository>,
    pub feedback: Arc<dyn FeedbackRepository>,
    pub contributors: Arc<dyn ContributorRepository>,
    pub community: Arc<dyn CommunityRepository>,
    pub follow_ups: Arc<dyn FollowUpScheduler>,
}

/// Trust engine service.
#[derive(Clone)]
pub struct TrustEngineService {
    ports: TrustEnginePorts,
    recomputer: ScoreRecomputer,
    follow_up_policy: FollowUpPolicy,
    clock: Arc<dyn Clock>,
}

impl TrustEngineService {
    pub fn new(
        ports: TrustEnginePorts,
        recomputer: ScoreRecomputer,
        follow_up_policy: FollowUpPolicy,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            ports,
            recomputer,
            follow_up_policy,
            clock,
        }
    }

    async fn require_contributor(&self, user_id: &UserId) -> Result<Contributor, TrustEngineError> {
        self.ports
            .contributors
            .find_by_id(user_id)
            .await?
            .ok_or(TrustEngineError::UserNotFound { user_id: *user_id })
    }

    async fn require_suggestion(
        &self,
        suggestion_id: &SuggestionId,
    ) -> Result<Suggestion, TrustEngineError> {
        self.ports
            .suggestions
            .find_by_id(suggestion_id)
            .await?
            .ok_or(TrustEngineError::SuggestionNotFound {
                suggestion_id: *suggestion_id,
            })
    }

    fn validate_request(
        request: &RecordFeedbackRequest,
    ) -> Result<(Rating, Option<String>), TrustEngineError> {
        let rating =
            Rating::try_from_f64(request.score).map_err(|err| TrustEngineError::InvalidScore {
                message: err.to_string(),
            })?;
        let comment = normalize_comment(request.comment.as_deref())
            .map_err(|err| TrustEngineError::invalid_input("comment", err))?;
        Ok((rating, comment))
    }

    /// Append the feedback row, or report the pair as a duplicate.
    async fn insert_feedback(&self, feedback: &Feedback) -> Result<Inserted, TrustEngineError> {
        if self
            .ports
            .feedback
            .exists(&feedback.rater_id, &feedback.suggestion_id)
            .await?
        {
            return Ok(Inserted::Duplicate);
        }
        match self.ports.feedback.insert(feedback).await {
            Ok(()) => Ok(Inserted::New),
            // A concurrent submission won the race past the precondition.
            Err(FeedbackRepositoryError::Duplicate { .. }) => Ok(Inserted::Duplicate),
            Err(err) => Err(err.into()),
        }
    }

    /// Refresh the suggestion and its author from history.
    ///
    /// Both refreshes run even when the first fails, so one contended entity
    /// never leaves the other stale.
    async fn settle_feedback(
        &self,
        suggestion_id: SuggestionId,
        author_id: UserId,
    ) -> Result<(Suggestion, Contributor), TrustEngineError> {
        let suggestion = self.recomputer.recompute_suggestion(&suggestion_id).await;
        let author = self.recomputer.recompute_contributor(&author_id).await;
        match (suggestion, author) {
            (Ok(suggestion), Ok(author)) => Ok((suggestion.suggestion, author.contributor)),
            (suggestion, author) => {
                let pending = TrustEngineError::recompute_pending([
                    (StaleScore::suggestion(suggestion_id), suggestion.err()),
                    (StaleScore::contributor(author_id), author.err()),
                ]);
                Err(pending
                    .unwrap_or_else(|| TrustEngineError::storage("score refresh incomplete")))
            }
        }
    }

    async fn schedule_follow_up(&self, prompt: FollowUpPrompt) -> Option<DateTime<Utc>> {
        match self.ports.follow_ups.schedule(&prompt).await {
            Ok(()) => Some(prompt.key.scheduled_for),
            Err(err) => {
                warn!(
                    user_id = %prompt.key.user_id,
                    suggestion_id = %prompt.key.suggestion_id,
                    error = %err,
                    "failed to schedule follow-up prompt"
                );
                None
            }
        }
    }
}

#[async_trait]
impl TrustCommand for TrustEngineService {
    async fn register_contributor(
        &self,
        request: RegisterContributorRequest,
    ) -> Result<Contributor, TrustEngineError> {
        let contributor = Contributor::register(
            UserId::random(),
            &request.display_name,
            request.role,
            self.clock.utc(),
        )
        .map_err(|err| TrustEngineError::invalid_input("displayName", err))?;
        self.ports.contributors.insert(&contributor).await?;
        info!(user_id = %contributor.id, role = %contributor.role, "contributor registered");
        Ok(contributor)
    }

    async fn submit_suggestion(
        &self,
        request: SubmitSuggestionRequest,
    ) -> Result<Suggestion, TrustEngineError> {
        let suggestion = Suggestion::draft(
            SuggestionId::random(),
            request.author_id,
            &request.disease_name,
            &request.text,
            request.details.as_deref(),
            self.clock.utc(),
        )
        .map_err(|err| TrustEngineError::invalid_input("suggestion", err))?;
        self.require_contributor(&request.author_id).await?;
        self.ports.suggestions.insert(&suggestion).await?;
        info!(
            suggestion_id = %suggestion.id,
            author_id = %suggestion.author_id,
            disease = %suggestion.disease_name,
            "suggestion submitted"
        );
        Ok(suggestion)
    }

    async fn record_feedback(
        &self,
        request: RecordFeedbackRequest,
    ) -> Result<UpdatedScores, TrustEngineError> {
        let (rating, comment) = Self::validate_request(&request)?;
        self.require_contributor(&request.rater_id).await?;
        let suggestion = self.require_suggestion(&request.suggestion_id).await?;

        let now = self.clock.utc();
        let feedback = Feedback {
            id: FeedbackId::random(),
            rater_id: request.rater_id,
            suggestion_id: suggestion.id,
            target_user_id: suggestion.author_id,
            rating,
            comment,
            context_id: request.context_id,
            created_at: now,
        };
        if self.insert_feedback(&feedback).await? == Inserted::Duplicate {
            // A repeat may follow a call whose refresh failed after the row
            // committed; settle before reporting the duplicate.
            self.settle_feedback(suggestion.id, suggestion.author_id).await?;
            return Err(TrustEngineError::DuplicateFeedback {
                rater_id: feedback.rater_id,
                suggestion_id: feedback.suggestion_id,
            });
        }
        info!(
            feedback_id = %feedback.id,
            rater_id = %feedback.rater_id,
            suggestion_id = %feedback.suggestion_id,
            rating = rating.value(),
            "feedback recorded"
        );

        let settled = self
            .settle_feedback(feedback.suggestion_id, feedback.target_user_id)
            .await;

        // The prompt belongs to the committed feedback, refreshed or not.
        let prompt = self.follow_up_policy.prompt_for(
            feedback.rater_id,
            feedback.suggestion_id,
            feedback.context_id,
            now,
        );
        let follow_up_scheduled_for = self.schedule_follow_up(prompt).await;
        let (suggestion, author) = settled?;

        Ok(UpdatedScores {
            feedback,
            suggestion,
            author,
            follow_up_scheduled_for,
        })
    }

    async fn rebuild_suggestion(
        &self,
        suggestion_id: SuggestionId,
    ) -> Result<SuggestionRebuild, TrustEngineError> {
        let outcome = self.recomputer.recompute_suggestion(&suggestion_id).await?;
        Ok(SuggestionRebuild {
            suggestion_id,
            previous: outcome.previous,
            rebuilt: outcome.suggestion.cached_scores(),
        })
    }

    async fn rebuild_contributor(
        &self,
        user_id: UserId,
    ) -> Result<ContributorRebuild, TrustEngineError> {
        let outcome = self.recomputer.recompute_contributor(&user_id).await?;
        Ok(ContributorRebuild {
            user_id,
            previous: outcome.previous,
            rebuilt: outcome.contributor.trust_score,
        })
    }

    async fn rebuild_all(&self) -> Result<RebuildSummary, TrustEngineError> {
        let mut summary = RebuildSummary::default();
        for suggestion_id in self.ports.suggestions.list_ids().await? {
            let rebuild = self.rebuild_suggestion(suggestion_id).await?;
            summary.suggestions += 1;
            if rebuild.drifted() {
                warn!(
                    %suggestion_id,
                    cached = rebuild.previous.usefulness_score.value(),
                    rebuilt = rebuild.rebuilt.usefulness_score.value(),
                    "cached suggestion aggregate drifted from history"
                );
                summary.suggestions_drifted += 1;
            }
        }
        for user_id in self.ports.contributors.list_ids().await? {
            let rebuild = self.rebuild_contributor(user_id).await?;
            summary.contributors += 1;
            if rebuild.drifted() {
                warn!(
                    %user_id,
                    cached = rebuild.previous.value(),
                    rebuilt = rebuild.rebuilt.value(),
                    "cached trust score drifted from history"
                );
                summary.contributors_drifted += 1;
            }
        }
        info!(
            suggestions = summary.suggestions,
            suggestions_drifted = summary.suggestions_drifted,
            contributors = summary.contributors,
            contributors_drifted = summary.contributors_drifted,
            "score rebuild finished"
        );
        Ok(summary)
    }

    async fn cancel_follow_up(&self, key: FollowUpKey) -> Result<bool, TrustEngineError> {
        let cancelled = self.ports.follow_ups.cancel(&key).await?;
        if cancelled {
            info!(
                user_id = %key.user_id,
                suggestion_id = %key.suggestion_id,
                scheduled_for = %key.scheduled_for,
                "follow-up prompt cancelled"
            );
        }
        Ok(cancelled)
    }
}

#[async_trait]
impl TrustQuery for TrustEngineService {
    async fn rank_suggestions(
        &self,
        disease_name: String,
        limit: Option<usize>,
    ) -> Result<Vec<RankedSuggestion>, TrustEngineError> {
        let disease_name = normalize_disease_name(&disease_name)
            .map_err(|err| TrustEngineError::invalid_input("diseaseName", err))?;
        let candidates = self
            .ports
            .suggestions
            .list_for_disease(&disease_name)
            .await?;
        Ok(ranking::rank_suggestions(candidates, limit))
    }

    async fn rank_contributors(
        &self,
        role: UserRole,
    ) -> Result<Vec<ContributorStanding>, TrustEngineError> {
        let standings = self.ports.contributors.list_standings(role).await?;
        Ok(ranking::rank_contributors(standings))
    }

    async fn rank_posts(
        &self,
        filter: PostFilter,
        sort: PostSort,
        pagination: Pagination,
    ) -> Result<PostPage, TrustEngineError> {
        let posts = self.ports.community.list_posts(&filter).await?;
        Ok(ranking::rank_posts(posts, &filter, sort, pagination))
    }

    async fn due_follow_ups(
        &self,
        as_of: Option<DateTime<Utc>>,
    ) -> Result<Vec<FollowUpPrompt>, TrustEngineError> {
        let as_of = as_of.unwrap_or_else(|| self.clock.utc());
        Ok(self.ports.follow_ups.due(as_of).await?)
    }

    async fn require_admin(&self, user_id: UserId) -> Result<Contributor, TrustEngineError> {
        match self.ports.contributors.find_by_id(&user_id).await? {
            Some(contributor) if contributor.role == UserRole::Admin => Ok(contributor),
            _ => Err(TrustEngineError::forbidden("admin privileges required")),
        }
    }
}

#[cfg(test)]
#[path = "trust_engine_service_tests.rs"]
mod tests;
