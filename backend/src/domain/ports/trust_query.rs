//! Driving port for read-only ranked views.
//!
//! Each call is a pure function of current state: no cursors, no hidden
//! position, and two calls with no intervening write return the same order.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{
    Contributor, ContributorStanding, FollowUpPrompt, Pagination, PostFilter, PostPage, PostSort,
    RankedSuggestion, TrustEngineError, UserId, UserRole,
};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TrustQuery: Send + Sync {
    /// Suggestions for a disease, best first, truncated to `limit`.
    async fn rank_suggestions(
        &self,
        disease_name: String,
        limit: Option<usize>,
    ) -> Result<Vec<RankedSuggestion>, TrustEngineError>;

    /// Leaderboard for one role.
    async fn rank_contributors(
        &self,
        role: UserRole,
    ) -> Result<Vec<ContributorStanding>, TrustEngineError>;

    /// Filtered, sorted, paginated community feed.
    async fn rank_posts(
        &self,
        filter: PostFilter,
        sort: PostSort,
        pagination: Pagination,
    ) -> Result<PostPage, TrustEngineError>;

    /// Pending prompts due at `as_of`, or now when absent.
    async fn due_follow_ups(
        &self,
        as_of: Option<DateTime<Utc>>,
    ) -> Result<Vec<FollowUpPrompt>, TrustEngineError>;

    /// Load `user_id` and check it holds the admin role.
    ///
    /// Unknown users and every other role are
    /// [`TrustEngineError::Forbidden`].
    async fn require_admin(&self, user_id: UserId) -> Result<Contributor, TrustEngineError>;
}
