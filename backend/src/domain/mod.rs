//! Domain primitives, aggregates and services.
//!
//! Purpose: Define the strongly typed entities of the trust engine, the pure
//! scoring and ranking functions, the ports adapters implement, and the
//! services that drive them. Nothing in here talks to a database or HTTP.
//!
//! Public surface:
//! - Error (alias to `error::Error`): API error response payload.
//! - ErrorCode (alias to `error::ErrorCode`): stable error identifier.
//! - Suggestion, Contributor, Feedback, Post, Response: scored entities.
//! - `trust`: pure usefulness and trust formulas.
//! - `ranking`: deterministic orderings over scored entities.
//! - TrustEngineService, CommunityService: use-case implementations.

pub mod community;
pub mod contributor;
pub mod error;
pub mod feedback;
pub mod follow_up;
pub mod ids;
pub mod ports;
pub mod ranking;
pub mod scores;
pub mod suggestion;
pub mod trace_id;
pub mod trust;

mod community_service;
mod score_recomputer;
mod trust_engine_error;
mod trust_engine_service;

pub use self::community::{
    CommunityValidationError, CountReconciliation, Pagination, PaginationError, Post, PostFilter,
    PostPage, PostSort, Resolution, Response, Verification,
};
pub use self::community_service::{CommunityPorts, CommunityService};
pub use self::contributor::{
    Contributor, ContributorLedger, ContributorStanding, DisplayNameError, ParseUserRoleError,
    UserRole,
};
pub use self::error::{Error, ErrorCode, ErrorValidationError, TRACE_ID_HEADER};
pub use self::feedback::{CommentTooLong, Feedback};
pub use self::follow_up::{FollowUpDelayError, FollowUpKey, FollowUpPolicy, FollowUpPrompt};
pub use self::ids::{FeedbackId, IdParseError, PostId, ResponseId, SuggestionId, UserId};
pub use self::score_recomputer::{
    BackoffJitter, RandomJitter, RecomputedContributor, RecomputedSuggestion, RetryPolicy,
    RetryPolicyError, RetryRuntime, RetrySleeper, ScoreRecomputer, TokioSleeper,
};
pub use self::scores::{BoundedScore, Rating, RatingError};
pub use self::suggestion::{
    RankedSuggestion, Suggestion, SuggestionLedger, SuggestionValidationError,
};
pub use self::trace_id::TraceId;
pub use self::trust::{ContributorActivity, FeedbackSample, SuggestionScores};
pub use self::trust_engine_error::{ScoredEntity, StaleScore, TrustEngineError};
pub use self::trust_engine_service::{TrustEnginePorts, TrustEngineService};

/// Convenient API result alias.
///
/// # Examples
/// ```
/// use actix_web::HttpResponse;
/// use krishilok::domain::{ApiResult, Error};
///
/// fn handler() -> ApiResult<HttpResponse> {
///     Err(Error::forbidden("nope"))
/// }
/// ```
pub type ApiResult<T> = Result<T, Error>;
