//! Typed failures of the trust engine and community use-cases.
//!
//! Services return [`TrustEngineError`]; inbound adapters convert it into the
//! transport-agnostic [`Error`] payload, which carries the machine-readable
//! kind in `details.code`.

use serde_json::json;
use uuid::Uuid;

use crate::domain::ports::{
    CommunityRepositoryError, ContributorRepositoryError, FeedbackRepositoryError,
    FollowUpSchedulerError, SuggestionRepositoryError,
};
use crate::domain::{Error, PostId, ResponseId, SuggestionId, UserId};

/// Which cached score a recompute was writing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoredEntity {
    Suggestion,
    Contributor,
}

impl ScoredEntity {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Suggestion => "suggestion",
            Self::Contributor => "contributor",
        }
    }
}

/// A cached score that a committed write left behind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaleScore {
    pub entity: ScoredEntity,
    pub id: Uuid,
}

impl StaleScore {
    #[must_use]
    pub fn suggestion(id: SuggestionId) -> Self {
        Self {
            entity: ScoredEntity::Suggestion,
            id: *id.as_uuid(),
        }
    }

    #[must_use]
    pub fn contributor(id: UserId) -> Self {
        Self {
            entity: ScoredEntity::Contributor,
            id: *id.as_uuid(),
        }
    }
}

/// Failure of a trust engine or community operation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TrustEngineError {
    /// Score outside 1–5 or not a whole number. Nothing was written.
    #[error("invalid score: {message}")]
    InvalidScore { message: String },
    /// The rater already rated this suggestion. Existing feedback untouched.
    #[error("user {rater_id} already rated suggestion {suggestion_id}")]
    DuplicateFeedback {
        rater_id: UserId,
        suggestion_id: SuggestionId,
    },
    #[error("suggestion {suggestion_id} not found")]
    SuggestionNotFound { suggestion_id: SuggestionId },
    #[error("user {user_id} not found")]
    UserNotFound { user_id: UserId },
    #[error("post {post_id} not found")]
    PostNotFound { post_id: PostId },
    #[error("response {response_id} not found")]
    ResponseNotFound { response_id: ResponseId },
    /// Optimistic retries exhausted; the prior cached value still stands.
    #[error("{} {id} score update conflicted {attempts} times", entity.as_str())]
    ConcurrentUpdateConflict {
        entity: ScoredEntity,
        id: Uuid,
        attempts: u32,
    },
    /// The triggering write committed but some cached scores were not
    /// refreshed. Repeating the same call reruns the refresh.
    #[error("change recorded but {} cached score(s) were not refreshed: {source}", stale.len())]
    RecomputePending {
        stale: Vec<StaleScore>,
        source: Box<TrustEngineError>,
    },
    /// The caller does not own the resource or lacks the required role.
    #[error("{message}")]
    Forbidden { message: String },
    /// A field failed validation.
    #[error("{field}: {message}")]
    InvalidInput {
        field: &'static str,
        message: String,
    },
    /// Storage unreachable.
    #[error("storage unavailable: {message}")]
    Unavailable { message: String },
    /// Storage reachable but the operation failed.
    #[error("storage error: {message}")]
    Storage { message: String },
}

impl TrustEngineError {
    /// Stable snake_case identifier of the failure kind.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidScore { .. } => "invalid_score",
            Self::DuplicateFeedback { .. } => "duplicate_feedback",
            Self::SuggestionNotFound { .. } => "suggestion_not_found",
            Self::UserNotFound { .. } => "user_not_found",
            Self::PostNotFound { .. } => "post_not_found",
            Self::ResponseNotFound { .. } => "response_not_found",
            Self::ConcurrentUpdateConflict { .. } => "concurrent_update_conflict",
            Self::RecomputePending { .. } => "recompute_pending",
            Self::Forbidden { .. } => "forbidden",
            Self::InvalidInput { .. } => "invalid_input",
            Self::Unavailable { .. } => "unavailable",
            Self::Storage { .. } => "storage",
        }
    }

    pub fn invalid_input(field: &'static str, message: impl ToString) -> Self {
        Self::InvalidInput {
            field,
            message: message.to_string(),
        }
    }

    /// Fold per-score refresh outcomes into [`Self::RecomputePending`].
    ///
    /// Returns `None` when every refresh succeeded. The first failure becomes
    /// the source.
    pub fn recompute_pending(
        outcomes: impl IntoIterator<Item = (StaleScore, Option<Self>)>,
    ) -> Option<Self> {
        let mut stale = Vec::new();
        let mut first = None;
        for (score, failure) in outcomes {
            if let Some(failure) = failure {
                stale.push(score);
                first.get_or_insert(failure);
            }
        }
        first.map(|source| Self::RecomputePending {
            stale,
            source: Box::new(source),
        })
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden {
            message: message.into(),
        }
    }

    pub fn unavailable(message: impl ToString) -> Self {
        Self::Unavailable {
            message: message.to_string(),
        }
    }

    pub fn storage(message: impl ToString) -> Self {
        Self::Storage {
            message: message.to_string(),
        }
    }
}

impl From<SuggestionRepositoryError> for TrustEngineError {
    fn from(value: SuggestionRepositoryError) -> Self {
        match value {
            SuggestionRepositoryError::Connection { message } => Self::unavailable(message),
            SuggestionRepositoryError::Query { .. }
            | SuggestionRepositoryError::RevisionMismatch { .. } => Self::storage(value),
        }
    }
}

impl From<ContributorRepositoryError> for TrustEngineError {
    fn from(value: ContributorRepositoryError) -> Self {
        match value {
            ContributorRepositoryError::Connection { message } => Self::unavailable(message),
            ContributorRepositoryError::Query { .. }
            | ContributorRepositoryError::RevisionMismatch { .. } => Self::storage(value),
        }
    }
}

impl From<FeedbackRepositoryError> for TrustEngineError {
    fn from(value: FeedbackRepositoryError) -> Self {
        match value {
            FeedbackRepositoryError::Connection { message } => Self::unavailable(message),
            // Callers that know the pair map duplicates themselves.
            FeedbackRepositoryError::Query { .. } | FeedbackRepositoryError::Duplicate { .. } => {
                Self::storage(value)
            }
        }
    }
}

impl From<CommunityRepositoryError> for TrustEngineError {
    fn from(value: CommunityRepositoryError) -> Self {
        match value {
            CommunityRepositoryError::Connection { message } => Self::unavailable(message),
            CommunityRepositoryError::Query { .. } => Self::storage(value),
        }
    }
}

impl From<FollowUpSchedulerError> for TrustEngineError {
    fn from(value: FollowUpSchedulerError) -> Self {
        match value {
            FollowUpSchedulerError::Connection { message } => Self::unavailable(message),
            FollowUpSchedulerError::Query { .. } => Self::storage(value),
        }
    }
}

impl From<TrustEngineError> for Error {
    fn from(value: TrustEngineError) -> Self {
        let code = value.code();
        let message = value.to_string();
        let base = match &value {
            TrustEngineError::RecomputePending { stale, source } => {
                let stale: Vec<_> = stale
                    .iter()
                    .map(|score| json!({ "entity": score.entity.as_str(), "id": score.id }))
                    .collect();
                let cause = source.code();
                let status = Self::from(source.as_ref().clone());
                return Self::try_new(status.code(), message)
                    .unwrap_or_else(|_| Self::internal("score refresh incomplete"))
                    .with_details(json!({ "code": code, "cause": cause, "stale": stale }));
            }
            TrustEngineError::InvalidScore { .. } => Self::invalid_request(message),
            TrustEngineError::InvalidInput { field, .. } => {
                return Self::invalid_request(message)
                    .with_details(json!({ "code": code, "field": field }));
            }
            TrustEngineError::DuplicateFeedback { .. }
            | TrustEngineError::ConcurrentUpdateConflict { .. } => Self::conflict(message),
            TrustEngineError::SuggestionNotFound { .. }
            | TrustEngineError::UserNotFound { .. }
            | TrustEngineError::PostNotFound { .. }
            | TrustEngineError::ResponseNotFound { .. } => Self::not_found(message),
            TrustEngineError::Forbidden { .. } => Self::forbidden(message),
            TrustEngineError::Unavailable { .. } => Self::service_unavailable(message),
            TrustEngineError::Storage { .. } => Self::internal(message),
        };
        base.with_details(json!({ "code": code }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ErrorCode;
    use rstest::rstest;

    #[rstest]
    #[case(
        TrustEngineError::InvalidScore { message: "6".into() },
        ErrorCode::InvalidRequest,
        "invalid_score"
    )]
    #[case(
        TrustEngineError::DuplicateFeedback {
            rater_id: UserId::random(),
            suggestion_id: SuggestionId::random(),
        },
        ErrorCode::Conflict,
        "duplicate_feedback"
    )]
    #[case(
        TrustEngineError::SuggestionNotFound { suggestion_id: SuggestionId::random() },
        ErrorCode::NotFound,
        "suggestion_not_found"
    )]
    #[case(
        TrustEngineError::ConcurrentUpdateConflict {
            entity: ScoredEntity::Suggestion,
            id: Uuid::nil(),
            attempts: 5,
        },
        ErrorCode::Conflict,
        "concurrent_update_conflict"
    )]
    #[case(TrustEngineError::forbidden("not yours"), ErrorCode::Forbidden, "forbidden")]
    #[case(TrustEngineError::unavailable("down"), ErrorCode::ServiceUnavailable, "unavailable")]
    #[case(TrustEngineError::storage("boom"), ErrorCode::InternalError, "storage")]
    fn maps_to_domain_error(
        #[case] error: TrustEngineError,
        #[case] expected_code: ErrorCode,
        #[case] expected_kind: &str,
    ) {
        let mapped = Error::from(error);
        assert_eq!(mapped.code(), expected_code);
        assert_eq!(
            mapped.details().and_then(|details| details.get("code")),
            Some(&json!(expected_kind))
        );
    }

    #[rstest]
    fn invalid_input_names_the_field() {
        let mapped = Error::from(TrustEngineError::invalid_input("title", "must not be empty"));
        assert_eq!(mapped.message(), "title: must not be empty");
        assert_eq!(
            mapped.details().and_then(|details| details.get("field")),
            Some(&json!("title"))
        );
    }

    #[rstest]
    fn conflict_message_names_entity_and_attempts() {
        let error = TrustEngineError::ConcurrentUpdateConflict {
            entity: ScoredEntity::Contributor,
            id: Uuid::nil(),
            attempts: 3,
        };
        assert_eq!(
            error.to_string(),
            "contributor 00000000-0000-0000-0000-000000000000 score update conflicted 3 times"
        );
    }

    #[rstest]
    fn pending_refresh_keeps_the_cause_status() {
        let author = UserId::random();
        let pending = TrustEngineError::recompute_pending([
            (StaleScore::suggestion(SuggestionId::random()), None),
            (
                StaleScore::contributor(author),
                Some(TrustEngineError::ConcurrentUpdateConflict {
                    entity: ScoredEntity::Contributor,
                    id: *author.as_uuid(),
                    attempts: 2,
                }),
            ),
        ])
        .expect("one refresh failed");

        let mapped = Error::from(pending);
        assert_eq!(mapped.code(), ErrorCode::Conflict);
        let details = mapped.details().expect("details present");
        assert_eq!(details.get("code"), Some(&json!("recompute_pending")));
        assert_eq!(details.get("cause"), Some(&json!("concurrent_update_conflict")));
        assert_eq!(
            details.get("stale"),
            Some(&json!([{ "entity": "contributor", "id": author.as_uuid() }]))
        );
    }

    #[rstest]
    fn nothing_pending_when_every_refresh_succeeds() {
        let pending = TrustEngineError::recompute_pending([
            (StaleScore::suggestion(SuggestionId::random()), None),
            (StaleScore::contributor(UserId::random()), None),
        ]);
        assert!(pending.is_none());
    }
}
