//! Contributor profile, leaderboard and rebuild handlers.
//!
//! ```text
//! POST /api/v1/contributors {"displayName":"Asha","role":"farmer"}
//! GET  /api/v1/contributors/leaderboard?role=expert
//! POST /api/v1/contributors/{user_id}/rebuild
//! POST /api/v1/admin/rebuild
//! ```

use actix_web::{HttpResponse, get, post, web};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::domain::ports::{ContributorRebuild, RebuildSummary, RegisterContributorRequest};
use crate::domain::{Contributor, ContributorStanding, Error, UserRole};
use crate::inbound::http::ApiResult;
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{FieldName, invalid_role_error, parse_id};

const ROLE: FieldName = FieldName::new("role");

/// Body of `POST /api/v1/contributors`.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterContributorBody {
    pub display_name: String,
    /// Defaults to `farmer`.
    #[serde(default)]
    pub role: Option<String>,
}

/// Query of `GET /api/v1/contributors/leaderboard`.
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct LeaderboardQuery {
    /// `farmer` (default), `expert`, `extension_worker` or `admin`.
    pub role: Option<String>,
}

fn parse_role(raw: Option<&str>) -> Result<UserRole, Error> {
    match raw.map(str::trim).filter(|value| !value.is_empty()) {
        None => Ok(UserRole::default()),
        Some(value) => value
            .parse::<UserRole>()
            .map_err(|_| invalid_role_error(ROLE, value)),
    }
}

/// Create a contributor profile and bind it to the session.
///
/// Stands in for the account subsystem's sign-up flow: the new profile's id
/// becomes the session caller.
#[utoipa::path(
    post,
    path = "/api/v1/contributors",
    request_body = RegisterContributorBody,
    responses(
        (status = 201, description = "Profile created", body = Contributor,
            headers(("Set-Cookie" = String, description = "Session cookie"))),
        (status = 400, description = "Invalid request", body = Error),
        (status = 503, description = "Storage unavailable", body = Error)
    ),
    tags = ["contributors"],
    operation_id = "registerContributor",
    security([])
)]
#[post("/contributors")]
pub async fn register_contributor(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<RegisterContributorBody>,
) -> ApiResult<HttpResponse> {
    let body = payload.into_inner();
    let role = parse_role(body.role.as_deref())?;
    let contributor = state
        .trust
        .register_contributor(RegisterContributorRequest {
            display_name: body.display_name,
            role,
        })
        .await?;
    session.persist_user(&contributor.id)?;
    Ok(HttpResponse::Created().json(contributor))
}

/// Leaderboard for one role, most trusted first.
#[utoipa::path(
    get,
    path = "/api/v1/contributors/leaderboard",
    params(LeaderboardQuery),
    responses(
        (status = 200, description = "Ranked contributors", body = [ContributorStanding]),
        (status = 400, description = "Unknown role", body = Error),
        (status = 503, description = "Storage unavailable", body = Error)
    ),
    tags = ["contributors"],
    operation_id = "rankContributors",
    security([])
)]
#[get("/contributors/leaderboard")]
pub async fn leaderboard(
    state: web::Data<HttpState>,
    query: web::Query<LeaderboardQuery>,
) -> ApiResult<web::Json<Vec<ContributorStanding>>> {
    let role = parse_role(query.role.as_deref())?;
    let standings = state.trust_query.rank_contributors(role).await?;
    Ok(web::Json(standings))
}

/// Recompute one contributor's trust score from history.
#[utoipa::path(
    post,
    path = "/api/v1/contributors/{user_id}/rebuild",
    params(("user_id" = String, Path, description = "User UUID")),
    responses(
        (status = 200, description = "Cached and rebuilt trust", body = ContributorRebuild),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 403, description = "Caller is not an admin", body = Error),
        (status = 404, description = "User not found", body = Error),
        (status = 409, description = "Concurrent updates exhausted retries", body = Error)
    ),
    tags = ["contributors"],
    operation_id = "rebuildContributor"
)]
#[post("/contributors/{user_id}/rebuild")]
pub async fn rebuild_contributor(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<web::Json<ContributorRebuild>> {
    session.require_admin(state.trust_query.as_ref()).await?;
    let user_id = parse_id(&path.into_inner(), FieldName::new("userId"))?;
    let rebuild = state.trust.rebuild_contributor(user_id).await?;
    Ok(web::Json(rebuild))
}

/// Recompute every cached score and report drift.
#[utoipa::path(
    post,
    path = "/api/v1/admin/rebuild",
    responses(
        (status = 200, description = "Rebuild totals", body = RebuildSummary),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 403, description = "Caller is not an admin", body = Error),
        (status = 409, description = "Concurrent updates exhausted retries", body = Error),
        (status = 503, description = "Storage unavailable", body = Error)
    ),
    tags = ["admin"],
    operation_id = "rebuildAll"
)]
#[post("/admin/rebuild")]
pub async fn rebuild_all(
    state: web::Data<HttpState>,
    session: SessionContext,
) -> ApiResult<web::Json<RebuildSummary>> {
    session.require_admin(state.trust_query.as_ref()).await?;
    let summary = state.trust.rebuild_all().await?;
    Ok(web::Json(summary))
}
