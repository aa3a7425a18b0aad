//! PostgreSQL-backed `ContributorRepository`.
//!
//! Accepted responses are derived from `posts.accepted_response_id`, so a
//! response counts as accepted exactly while some post points at it.

use std::collections::HashMap;

use async_trait::async_trait;
use diesel::dsl::count_star;
use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt as _;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use uuid::Uuid;

use crate::domain::ports::{ContributorRepository, ContributorRepositoryError};
use crate::domain::{
    BoundedScore, Contributor, ContributorActivity, ContributorLedger, ContributorStanding,
    UserId, UserRole,
};

use super::diesel_basic_error_mapping::{
    collect_rows, map_basic_diesel_error, map_basic_pool_error,
};
use super::models::{NewUserRow, UserRow, count_star_to_u32, count_to_db, rating_from_db};
use super::pool::{DbPool, PoolError};
use super::schema::{feedback, posts, responses, users};

/// Diesel-backed implementation of the contributor repository port.
#[derive(Clone)]
pub struct DieselContributorRepository {
    pool: DbPool,
}

impl DieselContributorRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> ContributorRepositoryError {
    map_basic_pool_error(error, ContributorRepositoryError::connection)
}

fn map_diesel_error(error: diesel::result::Error) -> ContributorRepositoryError {
    map_basic_diesel_error(
        error,
        ContributorRepositoryError::query,
        ContributorRepositoryError::connection,
    )
}

fn to_contributor(row: UserRow) -> Result<Contributor, ContributorRepositoryError> {
    Contributor::try_from(row).map_err(ContributorRepositoryError::query)
}

/// Raw rows behind a contributor ledger.
struct LedgerRows {
    user: UserRow,
    accepted: i64,
    verified: i64,
    ratings: Vec<i16>,
}

async fn load_ledger_rows(
    conn: &mut AsyncPgConnection,
    user_id: Uuid,
) -> Result<Option<LedgerRows>, diesel::result::Error> {
    let Some(user) = users::table
        .filter(users::id.eq(user_id))
        .select(UserRow::as_select())
        .first(conn)
        .await
        .optional()?
    else {
        return Ok(None);
    };
    let accepted: i64 = posts::table
        .inner_join(responses::table.on(posts::accepted_response_id.eq(responses::id.nullable())))
        .filter(responses::author_id.eq(user_id))
        .select(count_star())
        .get_result(conn)
        .await?;
    let verified: i64 = responses::table
        .filter(
            responses::author_id
                .eq(user_id)
                .and(responses::is_verified.eq(true)),
        )
        .select(count_star())
        .get_result(conn)
        .await?;
    let ratings: Vec<i16> = feedback::table
        .filter(feedback::target_user_id.eq(user_id))
        .select(feedback::rating)
        .load(conn)
        .await?;
    Ok(Some(LedgerRows {
        user,
        accepted,
        verified,
        ratings,
    }))
}

#[async_trait]
impl ContributorRepository for DieselContributorRepository {
    async fn insert(&self, contributor: &Contributor) -> Result<(), ContributorRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        diesel::insert_into(users::table)
            .values(NewUserRow::from(contributor))
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(map_diesel_error)
    }

    async fn find_by_id(
        &self,
        id: &UserId,
    ) -> Result<Option<Contributor>, ContributorRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row = users::table
            .filter(users::id.eq(id.as_uuid()))
            .select(UserRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        row.map(to_contributor).transpose()
    }

    async fn load_ledger(
        &self,
        id: &UserId,
    ) -> Result<Option<ContributorLedger>, ContributorRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let user_id = *id.as_uuid();
        let loaded = conn
            .build_transaction()
            .repeatable_read()
            .read_only()
            .run(|conn| async move { load_ledger_rows(conn, user_id).await }.scope_boxed())
            .await
            .map_err(map_diesel_error)?;

        let Some(rows) = loaded else {
            return Ok(None);
        };
        let received_ratings = collect_rows(
            rows.ratings.into_iter().map(rating_from_db),
            ContributorRepositoryError::query,
        )?;
        Ok(Some(ContributorLedger {
            contributor: to_contributor(rows.user)?,
            activity: ContributorActivity {
                accepted_responses: count_star_to_u32(rows.accepted),
                verified_responses: count_star_to_u32(rows.verified),
                received_ratings,
            },
        }))
    }

    async fn store_trust_score(
        &self,
        id: &UserId,
        trust_score: BoundedScore,
        expected_revision: u32,
    ) -> Result<Contributor, ContributorRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row = diesel::update(
            users::table.filter(
                users::id
                    .eq(id.as_uuid())
                    .and(users::score_revision.eq(count_to_db(expected_revision))),
            ),
        )
        .set((
            users::trust_score.eq(trust_score.value()),
            users::score_revision.eq(count_to_db(expected_revision.saturating_add(1))),
        ))
        .returning(UserRow::as_returning())
        .get_result(&mut conn)
        .await
        .optional()
        .map_err(map_diesel_error)?;

        row.map_or_else(
            || Err(ContributorRepositoryError::revision_mismatch(expected_revision)),
            to_contributor,
        )
    }

    async fn list_standings(
        &self,
        role: UserRole,
    ) -> Result<Vec<ContributorStanding>, ContributorRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows: Vec<UserRow> = users::table
            .filter(users::role.eq(role.as_str()))
            .select(UserRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        let accepted: HashMap<Uuid, i64> = posts::table
            .inner_join(responses::table.on(posts::accepted_response_id.eq(responses::id.nullable())))
            .group_by(responses::author_id)
            .select((responses::author_id, count_star()))
            .load::<(Uuid, i64)>(&mut conn)
            .await
            .map_err(map_diesel_error)?
            .into_iter()
            .collect();

        collect_rows(
            rows.into_iter().map(|row| {
                let accepted_response_count =
                    count_star_to_u32(accepted.get(&row.id).copied().unwrap_or_default());
                Contributor::try_from(row).map(|contributor| ContributorStanding {
                    contributor,
                    accepted_response_count,
                })
            }),
            ContributorRepositoryError::query,
        )
    }

    async fn list_ids(&self) -> Result<Vec<UserId>, ContributorRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let ids: Vec<Uuid> = users::table
            .select(users::id)
            .order(users::created_at.asc())
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(ids.into_iter().map(UserId::from_uuid).collect())
    }
}
