//! PostgreSQL-backed `FeedbackRepository`.
//!
//! The `feedback_rater_suggestion_key` constraint is the final arbiter of
//! the one-rating-per-user rule; its violation maps to
//! [`FeedbackRepositoryError::Duplicate`].

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::domain::ports::{FeedbackRepository, FeedbackRepositoryError};
use crate::domain::{Feedback, SuggestionId, UserId};

use super::diesel_basic_error_mapping::{
    is_unique_violation, map_basic_diesel_error, map_basic_pool_error,
};
use super::models::NewFeedbackRow;
use super::pool::{DbPool, PoolError};
use super::schema::feedback;

const RATER_SUGGESTION_CONSTRAINT: &str = "feedback_rater_suggestion_key";

/// Diesel-backed implementation of the feedback repository port.
#[derive(Clone)]
pub struct DieselFeedbackRepository {
    pool: DbPool,
}

impl DieselFeedbackRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> FeedbackRepositoryError {
    map_basic_pool_error(error, FeedbackRepositoryError::connection)
}

fn map_diesel_error(error: diesel::result::Error) -> FeedbackRepositoryError {
    if is_unique_violation(&error, RATER_SUGGESTION_CONSTRAINT) {
        return FeedbackRepositoryError::duplicate(error.to_string());
    }
    map_basic_diesel_error(
        error,
        FeedbackRepositoryError::query,
        FeedbackRepositoryError::connection,
    )
}

#[async_trait]
impl FeedbackRepository for DieselFeedbackRepository {
    async fn exists(
        &self,
        rater_id: &UserId,
        suggestion_id: &SuggestionId,
    ) -> Result<bool, FeedbackRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        diesel::select(diesel::dsl::exists(
            feedback::table.filter(
                feedback::rater_id
                    .eq(rater_id.as_uuid())
                    .and(feedback::suggestion_id.eq(suggestion_id.as_uuid())),
            ),
        ))
        .get_result(&mut conn)
        .await
        .map_err(map_diesel_error)
    }

    async fn insert(&self, entry: &Feedback) -> Result<(), FeedbackRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        diesel::insert_into(feedback::table)
            .values(NewFeedbackRow::from(entry))
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(map_diesel_error)
    }
}
