//! Port for the append-only feedback table.

use async_trait::async_trait;

use crate::domain::{Feedback, SuggestionId, UserId};

use super::define_port_error;

define_port_error! {
    /// Errors raised by feedback repository adapters.
    pub enum FeedbackRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } =>
            "feedback repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } =>
            "feedback repository query failed: {message}",
        /// The `(rater, suggestion)` pair already has feedback.
        Duplicate { message: String } =>
            "feedback already recorded: {message}",
    }
}

/// Port for feedback storage.
///
/// Feedback rows are never updated or deleted. Adapters must enforce
/// uniqueness of `(rater_id, suggestion_id)` atomically with the insert and
/// report a violation as [`FeedbackRepositoryError::Duplicate`].
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FeedbackRepository: Send + Sync {
    /// Whether `rater_id` has already rated `suggestion_id`.
    async fn exists(
        &self,
        rater_id: &UserId,
        suggestion_id: &SuggestionId,
    ) -> Result<bool, FeedbackRepositoryError>;

    /// Append a feedback row.
    async fn insert(&self, feedback: &Feedback) -> Result<(), FeedbackRepositoryError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn duplicate_error_names_the_pair() {
        let err = FeedbackRepositoryError::duplicate("rater 1 on suggestion 2");
        assert_eq!(
            err.to_string(),
            "feedback already recorded: rater 1 on suggestion 2"
        );
    }
}
