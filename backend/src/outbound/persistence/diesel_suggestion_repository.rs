//! PostgreSQL-backed `SuggestionRepository`.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use diesel_async::scoped_futures::ScopedFutureExt as _;

use crate::domain::ports::{SuggestionRepository, SuggestionRepositoryError};
use crate::domain::{
    BoundedScore, FeedbackSample, RankedSuggestion, Suggestion, SuggestionId, SuggestionLedger,
    SuggestionScores,
};

use super::diesel_basic_error_mapping::{
    collect_rows, map_basic_diesel_error, map_basic_pool_error,
};
use super::models::{
    NewSuggestionRow, SuggestionRow, SuggestionScoresUpdate, count_to_db, rating_from_db,
};
use super::pool::{DbPool, PoolError};
use super::schema::{feedback, suggestions, users};

/// Diesel-backed implementation of the suggestion repository port.
#[derive(Clone)]
pub struct DieselSuggestionRepository {
    pool: DbPool,
}

impl DieselSuggestionRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> SuggestionRepositoryError {
    map_basic_pool_error(error, SuggestionRepositoryError::connection)
}

fn map_diesel_error(error: diesel::result::Error) -> SuggestionRepositoryError {
    map_basic_diesel_error(
        error,
        SuggestionRepositoryError::query,
        SuggestionRepositoryError::connection,
    )
}

fn to_suggestion(row: SuggestionRow) -> Result<Suggestion, SuggestionRepositoryError> {
    Suggestion::try_from(row).map_err(SuggestionRepositoryError::query)
}

#[async_trait]
impl SuggestionRepository for DieselSuggestionRepository {
    async fn insert(&self, suggestion: &Suggestion) -> Result<(), SuggestionRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        diesel::insert_into(suggestions::table)
            .values(NewSuggestionRow::from(suggestion))
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(map_diesel_error)
    }

    async fn find_by_id(
        &self,
        id: &SuggestionId,
    ) -> Result<Option<Suggestion>, SuggestionRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row = suggestions::table
            .filter(suggestions::id.eq(id.as_uuid()))
            .select(SuggestionRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        row.map(to_suggestion).transpose()
    }

    async fn load_ledger(
        &self,
        id: &SuggestionId,
    ) -> Result<Option<SuggestionLedger>, SuggestionRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let suggestion_id = *id.as_uuid();

        // One snapshot: the revision and the feedback rows it covers.
        let loaded = conn
            .build_transaction()
            .repeatable_read()
            .read_only()
            .run(|conn| {
                async move {
                    let Some(row) = suggestions::table
                        .filter(suggestions::id.eq(suggestion_id))
                        .select(SuggestionRow::as_select())
                        .first(conn)
                        .await
                        .optional()?
                    else {
                        return Ok(None);
                    };
                    let samples: Vec<(i16, Option<uuid::Uuid>)> = feedback::table
                        .filter(feedback::suggestion_id.eq(suggestion_id))
                        .select((feedback::rating, feedback::context_id))
                        .load(conn)
                        .await?;
                    Ok(Some((row, samples)))
                }
                .scope_boxed()
            })
            .await
            .map_err(map_diesel_error)?;

        let Some((row, samples)) = loaded else {
            return Ok(None);
        };
        let samples = collect_rows(
            samples.into_iter().map(|(rating, context_id)| {
                rating_from_db(rating).map(|rating| FeedbackSample {
                    rating,
                    has_context: context_id.is_some(),
                })
            }),
            SuggestionRepositoryError::query,
        )?;
        Ok(Some(SuggestionLedger {
            suggestion: to_suggestion(row)?,
            samples,
        }))
    }

    async fn store_scores(
        &self,
        id: &SuggestionId,
        scores: &SuggestionScores,
        expected_revision: u32,
    ) -> Result<Suggestion, SuggestionRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let changeset = SuggestionScoresUpdate {
            usefulness_score: scores.usefulness_score.value(),
            usage_count: count_to_db(scores.usage_count),
            positive_feedback_count: count_to_db(scores.positive_feedback_count),
            negative_feedback_count: count_to_db(scores.negative_feedback_count),
            score_revision: count_to_db(expected_revision.saturating_add(1)),
        };
        let row = diesel::update(
            suggestions::table.filter(
                suggestions::id
                    .eq(id.as_uuid())
                    .and(suggestions::score_revision.eq(count_to_db(expected_revision))),
            ),
        )
        .set(&changeset)
        .returning(SuggestionRow::as_returning())
        .get_result(&mut conn)
        .await
        .optional()
        .map_err(map_diesel_error)?;

        // Zero rows: the revision moved, or the row is gone and the next
        // ledger read reports it missing.
        row.map_or_else(
            || Err(SuggestionRepositoryError::revision_mismatch(expected_revision)),
            to_suggestion,
        )
    }

    async fn list_for_disease(
        &self,
        disease_name: &str,
    ) -> Result<Vec<RankedSuggestion>, SuggestionRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows: Vec<(SuggestionRow, f64)> = suggestions::table
            .inner_join(users::table)
            .filter(suggestions::disease_name.eq(disease_name))
            .select((SuggestionRow::as_select(), users::trust_score))
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        collect_rows(
            rows.into_iter().map(|(row, trust)| {
                Suggestion::try_from(row).map(|suggestion| RankedSuggestion {
                    suggestion,
                    author_trust_score: BoundedScore::clamped(trust),
                })
            }),
            SuggestionRepositoryError::query,
        )
    }

    async fn list_ids(&self) -> Result<Vec<SuggestionId>, SuggestionRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let ids: Vec<uuid::Uuid> = suggestions::table
            .select(suggestions::id)
            .order(suggestions::created_at.asc())
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(ids.into_iter().map(SuggestionId::from_uuid).collect())
    }
}
