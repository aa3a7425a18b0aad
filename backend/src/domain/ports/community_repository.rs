//! Port for posts, responses and the derived response counter.
//!
//! Each mutating method is one atomic unit in the adapter: inserting or
//! deleting a response and adjusting the post's `response_count` happen
//! together or not at all.

use async_trait::async_trait;

use crate::domain::{
    CountReconciliation, Post, PostFilter, PostId, Response, ResponseId, Verification,
};

use super::define_port_error;

define_port_error! {
    /// Errors raised by community repository adapters.
    pub enum CommunityRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } =>
            "community repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } =>
            "community repository query failed: {message}",
    }
}

/// Result of deleting a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseRemoval {
    /// The post after its counter (and, if needed, resolution) was updated.
    pub post: Post,
    /// Whether the deleted response had been the accepted answer.
    pub was_accepted: bool,
}

/// Result of accepting a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcceptanceChange {
    pub post: Post,
    /// The response that was accepted before, if any.
    pub previous: Option<ResponseId>,
}

/// Port for community storage.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CommunityRepository: Send + Sync {
    /// Persist a new post.
    async fn insert_post(&self, post: &Post) -> Result<(), CommunityRepositoryError>;

    /// Fetch a post by id.
    async fn find_post(&self, id: &PostId) -> Result<Option<Post>, CommunityRepositoryError>;

    /// Posts that may match `filter`.
    ///
    /// Adapters may narrow by any subset of the predicates; callers re-apply
    /// the full filter.
    async fn list_posts(&self, filter: &PostFilter) -> Result<Vec<Post>, CommunityRepositoryError>;

    /// Increment `view_count`; `None` when the post does not exist.
    async fn increment_views(&self, id: &PostId) -> Result<Option<Post>, CommunityRepositoryError>;

    /// Insert a response and increment its post's `response_count`.
    ///
    /// Returns `None` (and writes nothing) when the post does not exist.
    async fn insert_response(
        &self,
        response: &Response,
    ) -> Result<Option<Post>, CommunityRepositoryError>;

    /// Fetch a response by id.
    async fn find_response(
        &self,
        id: &ResponseId,
    ) -> Result<Option<Response>, CommunityRepositoryError>;

    /// Responses to a post, oldest first.
    async fn list_responses(
        &self,
        post_id: &PostId,
    ) -> Result<Vec<Response>, CommunityRepositoryError>;

    /// Delete a response, decrement the counter and clear the post's
    /// accepted answer if it was this response.
    async fn delete_response(
        &self,
        id: &ResponseId,
    ) -> Result<Option<ResponseRemoval>, CommunityRepositoryError>;

    /// Mark `response_id` as the accepted answer of `post_id` and resolve the
    /// post.
    async fn accept_response(
        &self,
        post_id: &PostId,
        response_id: &ResponseId,
    ) -> Result<Option<AcceptanceChange>, CommunityRepositoryError>;

    /// Store a verification verdict on a response.
    async fn set_verification(
        &self,
        id: &ResponseId,
        verification: &Verification,
    ) -> Result<Option<Response>, CommunityRepositoryError>;

    /// Recount a post's responses and overwrite the cached counter.
    async fn reconcile_response_count(
        &self,
        post_id: &PostId,
    ) -> Result<Option<CountReconciliation>, CommunityRepositoryError>;

    /// Ids of every stored post.
    async fn list_post_ids(&self) -> Result<Vec<PostId>, CommunityRepositoryError>;
}
