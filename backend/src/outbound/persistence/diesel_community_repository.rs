//! PostgreSQL-backed `CommunityRepository`.
//!
//! Response inserts and deletes adjust `posts.response_count` in the same
//! transaction. The post row is locked first so concurrent answers to one
//! post serialise on it.

use async_trait::async_trait;
use diesel::dsl::count_star;
use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt as _;
use diesel_async::{AsyncConnection as _, RunQueryDsl};
use uuid::Uuid;

use crate::domain::ports::{
    AcceptanceChange, CommunityRepository, CommunityRepositoryError, ResponseRemoval,
};
use crate::domain::{
    CountReconciliation, Post, PostFilter, PostId, Resolution, Response, ResponseId,
    Verification,
};

use super::diesel_basic_error_mapping::{
    collect_rows, map_basic_diesel_error, map_basic_pool_error,
};
use super::models::{
    NewPostRow, NewResponseRow, PostRow, ResponseRow, count_from_db, count_star_to_u32,
    count_to_db,
};
use super::pool::{DbPool, PoolError};
use super::schema::{posts, responses};

/// Diesel-backed implementation of the community repository port.
#[derive(Clone)]
pub struct DieselCommunityRepository {
    pool: DbPool,
}

impl DieselCommunityRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> CommunityRepositoryError {
    map_basic_pool_error(error, CommunityRepositoryError::connection)
}

fn map_diesel_error(error: diesel::result::Error) -> CommunityRepositoryError {
    map_basic_diesel_error(
        error,
        CommunityRepositoryError::query,
        CommunityRepositoryError::connection,
    )
}

fn to_post(row: PostRow) -> Result<Post, CommunityRepositoryError> {
    Post::try_from(row).map_err(CommunityRepositoryError::query)
}

fn lock_post(
    post_id: Uuid,
) -> diesel::dsl::Filter<posts::table, diesel::dsl::Eq<posts::id, Uuid>> {
    posts::table.filter(posts::id.eq(post_id))
}

#[async_trait]
impl CommunityRepository for DieselCommunityRepository {
    async fn insert_post(&self, post: &Post) -> Result<(), CommunityRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        diesel::insert_into(posts::table)
            .values(NewPostRow::from(post))
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(map_diesel_error)
    }

    async fn find_post(&self, id: &PostId) -> Result<Option<Post>, CommunityRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row = lock_post(*id.as_uuid())
            .select(PostRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        row.map(to_post).transpose()
    }

    async fn list_posts(&self, filter: &PostFilter) -> Result<Vec<Post>, CommunityRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let mut query = posts::table.select(PostRow::as_select()).into_boxed();
        // Text predicates stay in the domain where case folding is defined.
        query = match filter.resolution {
            Resolution::Any => query,
            Resolution::Resolved => query.filter(posts::is_resolved.eq(true)),
            Resolution::Unresolved => query.filter(posts::is_resolved.eq(false)),
        };
        let rows = query.load(&mut conn).await.map_err(map_diesel_error)?;
        collect_rows(rows.into_iter().map(Post::try_from), CommunityRepositoryError::query)
    }

    async fn increment_views(&self, id: &PostId) -> Result<Option<Post>, CommunityRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row = diesel::update(lock_post(*id.as_uuid()))
            .set(posts::view_count.eq(posts::view_count + 1))
            .returning(PostRow::as_returning())
            .get_result(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        row.map(to_post).transpose()
    }

    async fn insert_response(
        &self,
        response: &Response,
    ) -> Result<Option<Post>, CommunityRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let post_id = *response.post_id.as_uuid();
        let row = conn
            .transaction::<_, diesel::result::Error, _>(|conn| {
                async move {
                    let Some(post) = diesel::update(lock_post(post_id))
                        .set(posts::response_count.eq(posts::response_count + 1))
                        .returning(PostRow::as_returning())
                        .get_result(conn)
                        .await
                        .optional()?
                    else {
                        return Ok(None);
                    };
                    diesel::insert_into(responses::table)
                        .values(NewResponseRow::from(response))
                        .execute(conn)
                        .await?;
                    Ok(Some(post))
                }
                .scope_boxed()
            })
            .await
            .map_err(map_diesel_error)?;
        row.map(to_post).transpose()
    }

    async fn find_response(
        &self,
        id: &ResponseId,
    ) -> Result<Option<Response>, CommunityRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row = responses::table
            .filter(responses::id.eq(id.as_uuid()))
            .select(ResponseRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        Ok(row.map(Response::from))
    }

    async fn list_responses(
        &self,
        post_id: &PostId,
    ) -> Result<Vec<Response>, CommunityRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows: Vec<ResponseRow> = responses::table
            .filter(responses::post_id.eq(post_id.as_uuid()))
            .order((responses::created_at.asc(), responses::id.asc()))
            .select(ResponseRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(rows.into_iter().map(Response::from).collect())
    }

    async fn delete_response(
        &self,
        id: &ResponseId,
    ) -> Result<Option<ResponseRemoval>, CommunityRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let response_id = *id.as_uuid();
        let outcome = conn
            .transaction::<_, diesel::result::Error, _>(|conn| {
                async move {
                    let Some(post_id) = responses::table
                        .filter(responses::id.eq(response_id))
                        .select(responses::post_id)
                        .first::<Uuid>(conn)
                        .await
                        .optional()?
                    else {
                        return Ok(None);
                    };
                    let post = lock_post(post_id)
                        .select(PostRow::as_select())
                        .for_update()
                        .first(conn)
                        .await?;
                    diesel::delete(responses::table.filter(responses::id.eq(response_id)))
                        .execute(conn)
                        .await?;

                    let was_accepted = post.accepted_response_id == Some(response_id);
                    let count = post.response_count.saturating_sub(1).max(0);
                    let updated = if was_accepted {
                        diesel::update(lock_post(post_id))
                            .set((
                                posts::response_count.eq(count),
                                posts::accepted_response_id.eq(None::<Uuid>),
                                posts::is_resolved.eq(false),
                            ))
                            .returning(PostRow::as_returning())
                            .get_result(conn)
                            .await?
                    } else {
                        diesel::update(lock_post(post_id))
                            .set(posts::response_count.eq(count))
                            .returning(PostRow::as_returning())
                            .get_result(conn)
                            .await?
                    };
                    Ok(Some((updated, was_accepted)))
                }
                .scope_boxed()
            })
            .await
            .map_err(map_diesel_error)?;

        outcome
            .map(|(row, was_accepted)| {
                to_post(row).map(|post| ResponseRemoval { post, was_accepted })
            })
            .transpose()
    }

    async fn accept_response(
        &self,
        post_id: &PostId,
        response_id: &ResponseId,
    ) -> Result<Option<AcceptanceChange>, CommunityRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let post_id = *post_id.as_uuid();
        let response_id = *response_id.as_uuid();
        let outcome = conn
            .transaction::<_, diesel::result::Error, _>(|conn| {
                async move {
                    let Some(previous) = lock_post(post_id)
                        .select(posts::accepted_response_id)
                        .for_update()
                        .first::<Option<Uuid>>(conn)
                        .await
                        .optional()?
                    else {
                        return Ok(None);
                    };
                    let row = diesel::update(lock_post(post_id))
                        .set((
                            posts::accepted_response_id.eq(Some(response_id)),
                            posts::is_resolved.eq(true),
                        ))
                        .returning(PostRow::as_returning())
                        .get_result(conn)
                        .await?;
                    Ok(Some((row, previous)))
                }
                .scope_boxed()
            })
            .await
            .map_err(map_diesel_error)?;

        outcome
            .map(|(row, previous)| {
                to_post(row).map(|post| AcceptanceChange {
                    post,
                    previous: previous.map(ResponseId::from_uuid),
                })
            })
            .transpose()
    }

    async fn set_verification(
        &self,
        id: &ResponseId,
        verification: &Verification,
    ) -> Result<Option<Response>, CommunityRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row = diesel::update(responses::table.filter(responses::id.eq(id.as_uuid())))
            .set((
                responses::is_verified.eq(verification.verified),
                responses::verification_confidence.eq(Some(verification.confidence)),
                responses::verification_reason.eq(verification.reason.as_deref()),
            ))
            .returning(ResponseRow::as_returning())
            .get_result(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        Ok(row.map(Response::from))
    }

    async fn reconcile_response_count(
        &self,
        post_id: &PostId,
    ) -> Result<Option<CountReconciliation>, CommunityRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let raw_id = *post_id.as_uuid();
        let counts = conn
            .transaction::<_, diesel::result::Error, _>(|conn| {
                async move {
                    let Some(cached) = lock_post(raw_id)
                        .select(posts::response_count)
                        .for_update()
                        .first::<i32>(conn)
                        .await
                        .optional()?
                    else {
                        return Ok(None);
                    };
                    let actual: i64 = responses::table
                        .filter(responses::post_id.eq(raw_id))
                        .select(count_star())
                        .get_result(conn)
                        .await?;
                    let actual = count_star_to_u32(actual);
                    if i64::from(cached) != i64::from(actual) {
                        diesel::update(lock_post(raw_id))
                            .set(posts::response_count.eq(count_to_db(actual)))
                            .execute(conn)
                            .await?;
                    }
                    Ok(Some((cached, actual)))
                }
                .scope_boxed()
            })
            .await
            .map_err(map_diesel_error)?;

        let Some((cached, actual)) = counts else {
            return Ok(None);
        };
        // A negative cached value is itself drift; report it as zero.
        let cached = count_from_db(cached, "response_count").unwrap_or_default();
        Ok(Some(CountReconciliation {
            post_id: *post_id,
            cached,
            actual,
        }))
    }

    async fn list_post_ids(&self) -> Result<Vec<PostId>, CommunityRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let ids: Vec<Uuid> = posts::table
            .select(posts::id)
            .order(posts::created_at.asc())
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(ids.into_iter().map(PostId::from_uuid).collect())
    }
}
