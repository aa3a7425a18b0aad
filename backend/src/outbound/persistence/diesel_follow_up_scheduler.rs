//! PostgreSQL-backed `FollowUpScheduler` over the `follow_ups` table.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::domain::ports::{FollowUpScheduler, FollowUpSchedulerError};
use crate::domain::{FollowUpKey, FollowUpPrompt};

use super::diesel_basic_error_mapping::{map_basic_diesel_error, map_basic_pool_error};
use super::models::{FollowUpRow, NewFollowUpRow};
use super::pool::{DbPool, PoolError};
use super::schema::follow_ups;

/// Diesel-backed follow-up store.
#[derive(Clone)]
pub struct DieselFollowUpScheduler {
    pool: DbPool,
}

impl DieselFollowUpScheduler {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> FollowUpSchedulerError {
    map_basic_pool_error(error, FollowUpSchedulerError::connection)
}

fn map_diesel_error(error: diesel::result::Error) -> FollowUpSchedulerError {
    map_basic_diesel_error(
        error,
        FollowUpSchedulerError::query,
        FollowUpSchedulerError::connection,
    )
}

#[async_trait]
impl FollowUpScheduler for DieselFollowUpScheduler {
    async fn schedule(&self, prompt: &FollowUpPrompt) -> Result<(), FollowUpSchedulerError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        diesel::insert_into(follow_ups::table)
            .values(NewFollowUpRow::from(prompt))
            .on_conflict_do_nothing()
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(map_diesel_error)
    }

    async fn cancel(&self, key: &FollowUpKey) -> Result<bool, FollowUpSchedulerError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let affected = diesel::update(
            follow_ups::table.filter(
                follow_ups::user_id
                    .eq(key.user_id.as_uuid())
                    .and(follow_ups::suggestion_id.eq(key.suggestion_id.as_uuid()))
                    .and(follow_ups::scheduled_for.eq(key.scheduled_for))
                    .and(follow_ups::cancelled.eq(false)),
            ),
        )
        .set(follow_ups::cancelled.eq(true))
        .execute(&mut conn)
        .await
        .map_err(map_diesel_error)?;
        Ok(affected > 0)
    }

    async fn due(
        &self,
        as_of: DateTime<Utc>,
    ) -> Result<Vec<FollowUpPrompt>, FollowUpSchedulerError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows: Vec<FollowUpRow> = follow_ups::table
            .filter(
                follow_ups::cancelled
                    .eq(false)
                    .and(follow_ups::scheduled_for.le(as_of)),
            )
            .order((
                follow_ups::scheduled_for.asc(),
                follow_ups::user_id.asc(),
                follow_ups::suggestion_id.asc(),
            ))
            .select(FollowUpRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(rows.into_iter().map(FollowUpPrompt::from).collect())
    }
}
