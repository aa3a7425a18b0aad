//! Driving port for community questions and answers.
//!
//! Operations here own the accepted and verified flags. Whenever a flag
//! changes, the affected authors' trust scores are recomputed before the
//! call returns.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{
    Contributor, CountReconciliation, Post, PostId, Response, ResponseId, TrustEngineError, UserId,
};

/// Ask a question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatePostRequest {
    pub author_id: UserId,
    pub title: String,
    pub description: String,
    pub crop_name: Option<String>,
    pub tags: Vec<String>,
}

/// Answer a question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddResponseRequest {
    pub post_id: PostId,
    pub author_id: UserId,
    pub content: String,
    pub is_expert_advice: bool,
}

/// Verdict from the verification collaborator.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordVerificationRequest {
    pub response_id: ResponseId,
    pub verified: bool,
    pub confidence: f64,
    pub reason: Option<String>,
}

/// A post with its answers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PostDetail {
    pub post: Post,
    pub responses: Vec<Response>,
}

/// Result of accepting an answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AcceptedResponse {
    pub post: Post,
    /// Author of the accepted response, with the recomputed trust score.
    pub author: Contributor,
}

/// Result of a bulk counter repair.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationSummary {
    pub checked: u32,
    /// Only posts whose cached counter had drifted.
    pub repaired: Vec<CountReconciliation>,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CommunityCommand: Send + Sync {
    async fn create_post(&self, request: CreatePostRequest) -> Result<Post, TrustEngineError>;

    /// Count a view and return the post with its responses.
    async fn view_post(&self, post_id: PostId) -> Result<PostDetail, TrustEngineError>;

    async fn add_response(
        &self,
        request: AddResponseRequest,
    ) -> Result<Response, TrustEngineError>;

    /// Delete a response. Only its author may do so.
    async fn remove_response(
        &self,
        post_id: PostId,
        response_id: ResponseId,
        requester_id: UserId,
    ) -> Result<Post, TrustEngineError>;

    /// Pick the resolving answer. Only the post owner may do so.
    async fn accept_response(
        &self,
        post_id: PostId,
        response_id: ResponseId,
        requester_id: UserId,
    ) -> Result<AcceptedResponse, TrustEngineError>;

    async fn record_verification(
        &self,
        request: RecordVerificationRequest,
    ) -> Result<Response, TrustEngineError>;

    /// Repair one post's response counter.
    async fn reconcile_response_count(
        &self,
        post_id: PostId,
    ) -> Result<CountReconciliation, TrustEngineError>;

    /// Repair every post's response counter.
    async fn reconcile_all_response_counts(
        &self,
    ) -> Result<ReconciliationSummary, TrustEngineError>;
}
