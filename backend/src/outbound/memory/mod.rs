//! In-process store implementing every trust engine port.
//!
//! Used when no database URL is configured and by the integration tests.
//! All state sits behind one mutex, so each port call is atomic with respect
//! to every other call, mirroring the transaction boundaries of the Diesel
//! adapters.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::ports::{
    AcceptanceChange, CommunityRepository, CommunityRepositoryError, ContributorRepository,
    ContributorRepositoryError, FeedbackRepository, FeedbackRepositoryError, FollowUpScheduler,
    FollowUpSchedulerError, ResponseRemoval, SuggestionRepository, SuggestionRepositoryError,
};
use crate::domain::{
    BoundedScore, Contributor, ContributorActivity, ContributorLedger, ContributorStanding,
    CountReconciliation, Feedback, FeedbackId, FollowUpKey, FollowUpPrompt, Post, PostFilter,
    PostId, RankedSuggestion, Response, ResponseId, Suggestion, SuggestionId, SuggestionLedger,
    SuggestionScores, UserId, UserRole, Verification,
};

#[derive(Debug, Clone)]
struct ScheduledFollowUp {
    prompt: FollowUpPrompt,
    cancelled: bool,
}

#[derive(Debug, Default)]
struct MemoryState {
    contributors: BTreeMap<UserId, Contributor>,
    suggestions: BTreeMap<SuggestionId, Suggestion>,
    feedback: BTreeMap<FeedbackId, Feedback>,
    posts: BTreeMap<PostId, Post>,
    responses: BTreeMap<ResponseId, Response>,
    follow_ups: HashMap<FollowUpKey, ScheduledFollowUp>,
}

impl MemoryState {
    fn author_trust(&self, author_id: &UserId) -> BoundedScore {
        self.contributors
            .get(author_id)
            .map_or_else(BoundedScore::baseline, |author| author.trust_score)
    }

    fn accepted_response_count(&self, user_id: &UserId) -> u32 {
        let count = self
            .posts
            .values()
            .filter_map(|post| post.accepted_response_id)
            .filter_map(|response_id| self.responses.get(&response_id))
            .filter(|response| response.author_id == *user_id)
            .count();
        u32::try_from(count).unwrap_or(u32::MAX)
    }

    fn verified_response_count(&self, user_id: &UserId) -> u32 {
        let count = self
            .responses
            .values()
            .filter(|response| response.author_id == *user_id && response.is_verified)
            .count();
        u32::try_from(count).unwrap_or(u32::MAX)
    }

    fn response_count_of(&self, post_id: &PostId) -> u32 {
        let count = self
            .responses
            .values()
            .filter(|response| response.post_id == *post_id)
            .count();
        u32::try_from(count).unwrap_or(u32::MAX)
    }
}

/// Mutex-guarded store shared by all ports.
#[derive(Debug, Default)]
pub struct InMemoryTrustStore {
    state: Mutex<MemoryState>,
}

impl InMemoryTrustStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>, String> {
        self.state
            .lock()
            .map_err(|_| "in-memory trust store poisoned".to_owned())
    }

    /// Number of stored feedback rows for a suggestion.
    pub fn feedback_count(&self, suggestion_id: &SuggestionId) -> usize {
        self.lock()
            .map(|state| {
                state
                    .feedback
                    .values()
                    .filter(|feedback| feedback.suggestion_id == *suggestion_id)
                    .count()
            })
            .unwrap_or_default()
    }

    /// Overwrite a post's cached response counter, simulating drift.
    pub fn corrupt_response_count(&self, post_id: &PostId, response_count: u32) -> bool {
        let Ok(mut state) = self.lock() else {
            return false;
        };
        state
            .posts
            .get_mut(post_id)
            .map(|post| post.response_count = response_count)
            .is_some()
    }
}

#[async_trait]
impl SuggestionRepository for InMemoryTrustStore {
    async fn insert(&self, suggestion: &Suggestion) -> Result<(), SuggestionRepositoryError> {
        let mut state = self.lock().map_err(SuggestionRepositoryError::connection)?;
        state.suggestions.insert(suggestion.id, suggestion.clone());
        Ok(())
    }

    async fn find_by_id(
        &self,
        id: &SuggestionId,
    ) -> Result<Option<Suggestion>, SuggestionRepositoryError> {
        let state = self.lock().map_err(SuggestionRepositoryError::connection)?;
        Ok(state.suggestions.get(id).cloned())
    }

    async fn load_ledger(
        &self,
        id: &SuggestionId,
    ) -> Result<Option<SuggestionLedger>, SuggestionRepositoryError> {
        let state = self.lock().map_err(SuggestionRepositoryError::connection)?;
        let Some(suggestion) = state.suggestions.get(id).cloned() else {
            return Ok(None);
        };
        let samples = state
            .feedback
            .values()
            .filter(|feedback| feedback.suggestion_id == *id)
            .map(Feedback::sample)
            .collect();
        Ok(Some(SuggestionLedger {
            suggestion,
            samples,
        }))
    }

    async fn store_scores(
        &self,
        id: &SuggestionId,
        scores: &SuggestionScores,
        expected_revision: u32,
    ) -> Result<Suggestion, SuggestionRepositoryError> {
        let mut state = self.lock().map_err(SuggestionRepositoryError::connection)?;
        let suggestion = state
            .suggestions
            .get_mut(id)
            .filter(|suggestion| suggestion.score_revision == expected_revision)
            .ok_or_else(|| SuggestionRepositoryError::revision_mismatch(expected_revision))?;
        suggestion.apply_scores(scores);
        suggestion.score_revision = expected_revision.saturating_add(1);
        Ok(suggestion.clone())
    }

    async fn list_for_disease(
        &self,
        disease_name: &str,
    ) -> Result<Vec<RankedSuggestion>, SuggestionRepositoryError> {
        let state = self.lock().map_err(SuggestionRepositoryError::connection)?;
        Ok(state
            .suggestions
            .values()
            .filter(|suggestion| suggestion.disease_name == disease_name)
            .map(|suggestion| RankedSuggestion {
                suggestion: suggestion.clone(),
                author_trust_score: state.author_trust(&suggestion.author_id),
            })
            .collect())
    }

    async fn list_ids(&self) -> Result<Vec<SuggestionId>, SuggestionRepositoryError> {
        let state = self.lock().map_err(SuggestionRepositoryError::connection)?;
        Ok(state.suggestions.keys().copied().collect())
    }
}

#[async_trait]
impl FeedbackRepository for InMemoryTrustStore {
    async fn exists(
        &self,
        rater_id: &UserId,
        suggestion_id: &SuggestionId,
    ) -> Result<bool, FeedbackRepositoryError> {
        let state = self.lock().map_err(FeedbackRepositoryError::connection)?;
        Ok(state.feedback.values().any(|feedback| {
            feedback.rater_id == *rater_id && feedback.suggestion_id == *suggestion_id
        }))
    }

    async fn insert(&self, feedback: &Feedback) -> Result<(), FeedbackRepositoryError> {
        let mut state = self.lock().map_err(FeedbackRepositoryError::connection)?;
        let taken = state.feedback.values().any(|existing| {
            existing.rater_id == feedback.rater_id && existing.suggestion_id == feedback.suggestion_id
        });
        if taken {
            return Err(FeedbackRepositoryError::duplicate(format!(
                "feedback from {} on {} already stored",
                feedback.rater_id, feedback.suggestion_id
            )));
        }
        state.feedback.insert(feedback.id, feedback.clone());
        Ok(())
    }
}

#[async_trait]
impl ContributorRepository for InMemoryTrustStore {
    async fn insert(&self, contributor: &Contributor) -> Result<(), ContributorRepositoryError> {
        let mut state = self.lock().map_err(ContributorRepositoryError::connection)?;
        state.contributors.insert(contributor.id, contributor.clone());
        Ok(())
    }

    async fn find_by_id(
        &self,
        id: &UserId,
    ) -> Result<Option<Contributor>, ContributorRepositoryError> {
        let state = self.lock().map_err(ContributorRepositoryError::connection)?;
        Ok(state.contributors.get(id).cloned())
    }

    async fn load_ledger(
        &self,
        id: &UserId,
    ) -> Result<Option<ContributorLedger>, ContributorRepositoryError> {
        let state = self.lock().map_err(ContributorRepositoryError::connection)?;
        let Some(contributor) = state.contributors.get(id).cloned() else {
            return Ok(None);
        };
        let activity = ContributorActivity {
            accepted_responses: state.accepted_response_count(id),
            verified_responses: state.verified_response_count(id),
            received_ratings: state
                .feedback
                .values()
                .filter(|feedback| feedback.target_user_id == *id)
                .map(|feedback| feedback.rating)
                .collect(),
        };
        Ok(Some(ContributorLedger {
            contributor,
            activity,
        }))
    }

    async fn store_trust_score(
        &self,
        id: &UserId,
        trust_score: BoundedScore,
        expected_revision: u32,
    ) -> Result<Contributor, ContributorRepositoryError> {
        let mut state = self.lock().map_err(ContributorRepositoryError::connection)?;
        let contributor = state
            .contributors
            .get_mut(id)
            .filter(|contributor| contributor.score_revision == expected_revision)
            .ok_or_else(|| ContributorRepositoryError::revision_mismatch(expected_revision))?;
        contributor.trust_score = trust_score;
        contributor.score_revision = expected_revision.saturating_add(1);
        Ok(contributor.clone())
    }

    async fn list_standings(
        &self,
        role: UserRole,
    ) -> Result<Vec<ContributorStanding>, ContributorRepositoryError> {
        let state = self.lock().map_err(ContributorRepositoryError::connection)?;
        Ok(state
            .contributors
            .values()
            .filter(|contributor| contributor.role == role)
            .map(|contributor| ContributorStanding {
                accepted_response_count: state.accepted_response_count(&contributor.id),
                contributor: contributor.clone(),
            })
            .collect())
    }

    async fn list_ids(&self) -> Result<Vec<UserId>, ContributorRepositoryError> {
        let state = self.lock().map_err(ContributorRepositoryError::connection)?;
        Ok(state.contributors.keys().copied().collect())
    }
}

#[async_trait]
impl CommunityRepository for InMemoryTrustStore {
    async fn insert_post(&self, post: &Post) -> Result<(), CommunityRepositoryError> {
        let mut state = self.lock().map_err(CommunityRepositoryError::connection)?;
        state.posts.insert(post.id, post.clone());
        Ok(())
    }

    async fn find_post(&self, id: &PostId) -> Result<Option<Post>, CommunityRepositoryError> {
        let state = self.lock().map_err(CommunityRepositoryError::connection)?;
        Ok(state.posts.get(id).cloned())
    }

    async fn list_posts(&self, filter: &PostFilter) -> Result<Vec<Post>, CommunityRepositoryError> {
        let state = self.lock().map_err(CommunityRepositoryError::connection)?;
        Ok(state
            .posts
            .values()
            .filter(|post| filter.matches(post))
            .cloned()
            .collect())
    }

    async fn increment_views(&self, id: &PostId) -> Result<Option<Post>, CommunityRepositoryError> {
        let mut state = self.lock().map_err(CommunityRepositoryError::connection)?;
        Ok(state.posts.get_mut(id).map(|post| {
            post.view_count = post.view_count.saturating_add(1);
            post.clone()
        }))
    }

    async fn insert_response(
        &self,
        response: &Response,
    ) -> Result<Option<Post>, CommunityRepositoryError> {
        let mut state = self.lock().map_err(CommunityRepositoryError::connection)?;
        let Some(post) = state.posts.get_mut(&response.post_id) else {
            return Ok(None);
        };
        post.response_count = post.response_count.saturating_add(1);
        let post = post.clone();
        state.responses.insert(response.id, response.clone());
        Ok(Some(post))
    }

    async fn find_response(
        &self,
        id: &ResponseId,
    ) -> Result<Option<Response>, CommunityRepositoryError> {
        let state = self.lock().map_err(CommunityRepositoryError::connection)?;
        Ok(state.responses.get(id).cloned())
    }

    async fn list_responses(
        &self,
        post_id: &PostId,
    ) -> Result<Vec<Response>, CommunityRepositoryError> {
        let state = self.lock().map_err(CommunityRepositoryError::connection)?;
        let mut responses: Vec<Response> = state
            .responses
            .values()
            .filter(|response| response.post_id == *post_id)
            .cloned()
            .collect();
        responses.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(responses)
    }

    async fn delete_response(
        &self,
        id: &ResponseId,
    ) -> Result<Option<ResponseRemoval>, CommunityRepositoryError> {
        let mut state = self.lock().map_err(CommunityRepositoryError::connection)?;
        let Some(post_id) = state.responses.get(id).map(|response| response.post_id) else {
            return Ok(None);
        };
        state.responses.remove(id);
        let Some(post) = state.posts.get_mut(&post_id) else {
            return Ok(None);
        };
        post.response_count = post.response_count.saturating_sub(1);
        let was_accepted = post.accepted_response_id == Some(*id);
        if was_accepted {
            post.accepted_response_id = None;
            post.is_resolved = false;
        }
        Ok(Some(ResponseRemoval {
            post: post.clone(),
            was_accepted,
        }))
    }

    async fn accept_response(
        &self,
        post_id: &PostId,
        response_id: &ResponseId,
    ) -> Result<Option<AcceptanceChange>, CommunityRepositoryError> {
        let mut state = self.lock().map_err(CommunityRepositoryError::connection)?;
        Ok(state.posts.get_mut(post_id).map(|post| {
            let previous = post.accepted_response_id.replace(*response_id);
            post.is_resolved = true;
            AcceptanceChange {
                post: post.clone(),
                previous,
            }
        }))
    }

    async fn set_verification(
        &self,
        id: &ResponseId,
        verification: &Verification,
    ) -> Result<Option<Response>, CommunityRepositoryError> {
        let mut state = self.lock().map_err(CommunityRepositoryError::connection)?;
        Ok(state.responses.get_mut(id).map(|response| {
            response.is_verified = verification.verified;
            response.verification_confidence = Some(verification.confidence);
            response.verification_reason.clone_from(&verification.reason);
            response.clone()
        }))
    }

    async fn reconcile_response_count(
        &self,
        post_id: &PostId,
    ) -> Result<Option<CountReconciliation>, CommunityRepositoryError> {
        let mut state = self.lock().map_err(CommunityRepositoryError::connection)?;
        let actual = state.response_count_of(post_id);
        Ok(state.posts.get_mut(post_id).map(|post| {
            let cached = post.response_count;
            post.response_count = actual;
            CountReconciliation {
                post_id: *post_id,
                cached,
                actual,
            }
        }))
    }

    async fn list_post_ids(&self) -> Result<Vec<PostId>, CommunityRepositoryError> {
        let state = self.lock().map_err(CommunityRepositoryError::connection)?;
        Ok(state.posts.keys().copied().collect())
    }
}

#[async_trait]
impl FollowUpScheduler for InMemoryTrustStore {
    async fn schedule(&self, prompt: &FollowUpPrompt) -> Result<(), FollowUpSchedulerError> {
        let mut state = self.lock().map_err(FollowUpSchedulerError::connection)?;
        state
            .follow_ups
            .entry(prompt.key)
            .or_insert_with(|| ScheduledFollowUp {
                prompt: prompt.clone(),
                cancelled: false,
            });
        Ok(())
    }

    async fn cancel(&self, key: &FollowUpKey) -> Result<bool, FollowUpSchedulerError> {
        let mut state = self.lock().map_err(FollowUpSchedulerError::connection)?;
        Ok(match state.follow_ups.get_mut(key) {
            Some(entry) if !entry.cancelled => {
                entry.cancelled = true;
                true
            }
            _ => false,
        })
    }

    async fn due(
        &self,
        as_of: DateTime<Utc>,
    ) -> Result<Vec<FollowUpPrompt>, FollowUpSchedulerError> {
        let state = self.lock().map_err(FollowUpSchedulerError::connection)?;
        let mut due: Vec<FollowUpPrompt> = state
            .follow_ups
            .values()
            .filter(|entry| !entry.cancelled && entry.prompt.key.scheduled_for <= as_of)
            .map(|entry| entry.prompt.clone())
            .collect();
        due.sort_by(|a, b| {
            a.key
                .scheduled_for
                .cmp(&b.key.scheduled_for)
                .then(a.key.user_id.cmp(&b.key.user_id))
                .then(a.key.suggestion_id.cmp(&b.key.suggestion_id))
        });
        Ok(due)
    }
}
