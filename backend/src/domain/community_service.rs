//! Community service implementing [`CommunityCommand`].
//!
//! Acceptance, verification and response removal change the inputs of an
//! author's trust score, so each of them ends with a recompute.

use std::sync::Arc;

use async_trait::async_trait;
use mockable::Clock;
use tracing::{info, warn};

use crate::domain::ports::{
    AcceptedResponse, AddResponseRequest, CommunityCommand, CommunityRepository,
    ContributorRepository, CreatePostRequest, PostDetail, ReconciliationSummary,
    RecordVerificationRequest,
};
use crate::domain::{
    Contributor, CountReconciliation, Post, PostId, Response, ResponseId, ScoreRecomputer,
    StaleScore, TrustEngineError, UserId, Verification,
};

/// Driven ports the community service reads and writes.
#[derive(Clone)]
pub struct CommunityPorts {
    pub community: Arc<dyn CommunityRepository>,
    pub contributors: Arc<dyn ContributorRepository>,
}

/// Community service.
#[derive(Clone)]
pub struct CommunityService {
    ports: CommunityPorts,
    recomputer: ScoreRecomputer,
    clock: Arc<dyn Clock>,
}

impl CommunityService {
    pub fn new(ports: CommunityPorts, recomputer: ScoreRecomputer, clock: Arc<dyn Clock>) -> Self {
        Self {
            ports,
            recomputer,
            clock,
        }
    }

    async fn require_contributor(&self, user_id: &UserId) -> Result<(), TrustEngineError> {
        self.ports
            .contributors
            .find_by_id(user_id)
            .await?
            .map(|_| ())
            .ok_or(TrustEngineError::UserNotFound { user_id: *user_id })
    }

    async fn require_post(&self, post_id: &PostId) -> Result<Post, TrustEngineError> {
        self.ports
            .community
            .find_post(post_id)
            .await?
            .ok_or(TrustEngineError::PostNotFound { post_id: *post_id })
    }

    /// Fetch a response and check it answers `post_id`.
    async fn require_response_of(
        &self,
        post_id: &PostId,
        response_id: &ResponseId,
    ) -> Result<Response, TrustEngineError> {
        let response = self
            .ports
            .community
            .find_response(response_id)
            .await?
            .ok_or(TrustEngineError::ResponseNotFound {
                response_id: *response_id,
            })?;
        if response.post_id != *post_id {
            return Err(TrustEngineError::ResponseNotFound {
                response_id: *response_id,
            });
        }
        Ok(response)
    }

    /// Recompute every listed author, in order. A failure does not stop the
    /// remaining refreshes; the stale ones are reported together.
    async fn refresh_trust(
        &self,
        authors: &[UserId],
    ) -> Result<Vec<Contributor>, TrustEngineError> {
        let mut refreshed = Vec::with_capacity(authors.len());
        let mut outcomes = Vec::with_capacity(authors.len());
        for author_id in authors {
            match self.recomputer.recompute_contributor(author_id).await {
                Ok(recomputed) => {
                    refreshed.push(recomputed.contributor);
                    outcomes.push((StaleScore::contributor(*author_id), None));
                }
                Err(err) => {
                    warn!(user_id = %author_id, error = %err, "trust refresh failed");
                    outcomes.push((StaleScore::contributor(*author_id), Some(err)));
                }
            }
        }
        match TrustEngineError::recompute_pending(outcomes) {
            Some(pending) => Err(pending),
            None => Ok(refreshed),
        }
    }

    /// Authors whose trust an acceptance of `accepted` may have changed,
    /// the new author first.
    async fn acceptance_authors(
        &self,
        post_id: &PostId,
        accepted: &Response,
        previous: Option<ResponseId>,
    ) -> Result<Vec<UserId>, TrustEngineError> {
        let mut authors = vec![accepted.author_id];
        match previous {
            // A repeat acceptance cannot tell who an earlier, interrupted
            // one displaced, so it settles every answerer on the post.
            Some(previous_id) if previous_id == accepted.id => {
                for response in self.ports.community.list_responses(post_id).await? {
                    if !authors.contains(&response.author_id) {
                        authors.push(response.author_id);
                    }
                }
            }
            Some(previous_id) => {
                if let Some(previous) = self.ports.community.find_response(&previous_id).await? {
                    if previous.author_id != accepted.author_id {
                        authors.push(previous.author_id);
                    }
                }
            }
            None => {}
        }
        Ok(authors)
    }
}

#[async_trait]
impl CommunityCommand for CommunityService {
    async fn create_post(&self, request: CreatePostRequest) -> Result<Post, TrustEngineError> {
        let post = Post::draft(
            PostId::random(),
            request.author_id,
            &request.title,
            &request.description,
            request.crop_name.as_deref(),
            &request.tags,
            self.clock.utc(),
        )
        .map_err(|err| TrustEngineError::invalid_input("post", err))?;
        self.require_contributor(&request.author_id).await?;
        self.ports.community.insert_post(&post).await?;
        info!(post_id = %post.id, author_id = %post.author_id, "post created");
        Ok(post)
    }

    async fn view_post(&self, post_id: PostId) -> Result<PostDetail, TrustEngineError> {
        let post = self
            .ports
            .community
            .increment_views(&post_id)
            .await?
            .ok_or(TrustEngineError::PostNotFound { post_id })?;
        let responses = self.ports.community.list_responses(&post_id).await?;
        Ok(PostDetail { post, responses })
    }

    async fn add_response(
        &self,
        request: AddResponseRequest,
    ) -> Result<Response, TrustEngineError> {
        let response = Response::draft(
            ResponseId::random(),
            request.post_id,
            request.author_id,
            &request.content,
            request.is_expert_advice,
            self.clock.utc(),
        )
        .map_err(|err| TrustEngineError::invalid_input("content", err))?;
        self.require_contributor(&request.author_id).await?;
        let post = self
            .ports
            .community
            .insert_response(&response)
            .await?
            .ok_or(TrustEngineError::PostNotFound {
                post_id: request.post_id,
            })?;
        info!(
            response_id = %response.id,
            post_id = %post.id,
            response_count = post.response_count,
            "response added"
        );
        Ok(response)
    }

    async fn remove_response(
        &self,
        post_id: PostId,
        response_id: ResponseId,
        requester_id: UserId,
    ) -> Result<Post, TrustEngineError> {
        let response = self.require_response_of(&post_id, &response_id).await?;
        if response.author_id != requester_id {
            return Err(TrustEngineError::forbidden(
                "only the author may delete a response",
            ));
        }
        let removal = self
            .ports
            .community
            .delete_response(&response_id)
            .await?
            .ok_or(TrustEngineError::ResponseNotFound { response_id })?;
        info!(
            %response_id,
            %post_id,
            was_accepted = removal.was_accepted,
            "response removed"
        );
        if removal.was_accepted || response.is_verified {
            self.refresh_trust(&[response.author_id]).await?;
        }
        Ok(removal.post)
    }

    async fn accept_response(
        &self,
        post_id: PostId,
        response_id: ResponseId,
        requester_id: UserId,
    ) -> Result<AcceptedResponse, TrustEngineError> {
        let post = self.require_post(&post_id).await?;
        if post.author_id != requester_id {
            return Err(TrustEngineError::forbidden(
                "only the post owner may accept a response",
            ));
        }
        let response = self.require_response_of(&post_id, &response_id).await?;
        let change = self
            .ports
            .community
            .accept_response(&post_id, &response_id)
            .await?
            .ok_or(TrustEngineError::PostNotFound { post_id })?;
        info!(%post_id, %response_id, "response accepted");

        let authors = self
            .acceptance_authors(&post_id, &response, change.previous)
            .await?;
        let author = self
            .refresh_trust(&authors)
            .await?
            .into_iter()
            .next()
            .ok_or(TrustEngineError::UserNotFound {
                user_id: response.author_id,
            })?;
        Ok(AcceptedResponse {
            post: change.post,
            author,
        })
    }

    async fn record_verification(
        &self,
        request: RecordVerificationRequest,
    ) -> Result<Response, TrustEngineError> {
        let verification = Verification::new(
            request.verified,
            request.confidence,
            request.reason.as_deref(),
        )
        .map_err(|err| TrustEngineError::invalid_input("confidence", err))?;
        let response = self
            .ports
            .community
            .set_verification(&request.response_id, &verification)
            .await?
            .ok_or(TrustEngineError::ResponseNotFound {
                response_id: request.response_id,
            })?;
        info!(
            response_id = %response.id,
            verified = verification.verified,
            confidence = verification.confidence,
            "verification recorded"
        );
        self.refresh_trust(&[response.author_id]).await?;
        Ok(response)
    }

    async fn reconcile_response_count(
        &self,
        post_id: PostId,
    ) -> Result<CountReconciliation, TrustEngineError> {
        let reconciliation = self
            .ports
            .community
            .reconcile_response_count(&post_id)
            .await?
            .ok_or(TrustEngineError::PostNotFound { post_id })?;
        if reconciliation.repaired() {
            warn!(
                %post_id,
                cached = reconciliation.cached,
                actual = reconciliation.actual,
                "response count drifted; repaired"
            );
        }
        Ok(reconciliation)
    }

    async fn reconcile_all_response_counts(
        &self,
    ) -> Result<ReconciliationSummary, TrustEngineError> {
        let mut summary = ReconciliationSummary::default();
        for post_id in self.ports.community.list_post_ids().await? {
            // Posts deleted mid-scan are skipped.
            let Some(reconciliation) = self
                .ports
                .community
                .reconcile_response_count(&post_id)
                .await?
            else {
                continue;
            };
            summary.checked += 1;
            if reconciliation.repaired() {
                warn!(
                    %post_id,
                    cached = reconciliation.cached,
                    actual = reconciliation.actual,
                    "response count drifted; repaired"
                );
                summary.repaired.push(reconciliation);
            }
        }
        info!(
            checked = summary.checked,
            repaired = summary.repaired.len(),
            "response count reconciliation finished"
        );
        Ok(summary)
    }
}

#[cfg(test)]
#[path = "community_service_tests.rs"]
mod tests;
