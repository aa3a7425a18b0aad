//! Community question and answer handlers.
//!
//! ```text
//! GET    /api/v1/posts?resolution=unresolved&crop=tomato&tags=blight,fungus&sort=popular&page=1&limit=10
//! POST   /api/v1/posts
//! GET    /api/v1/posts/{post_id}
//! POST   /api/v1/posts/{post_id}/responses
//! DELETE /api/v1/posts/{post_id}/responses/{response_id}
//! POST   /api/v1/posts/{post_id}/responses/{response_id}/accept
//! PUT    /api/v1/responses/{response_id}/verification
//! POST   /api/v1/posts/{post_id}/reconcile
//! POST   /api/v1/admin/reconcile-response-counts
//! ```

use actix_web::{HttpResponse, delete, get, post, put, web};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::{IntoParams, ToSchema};

use crate::domain::ports::{
    AcceptedResponse, AddResponseRequest, CreatePostRequest, PostDetail, ReconciliationSummary,
    RecordVerificationRequest,
};
use crate::domain::{
    CountReconciliation, Error, Pagination, PaginationError, Post, PostFilter, PostId, PostPage,
    PostSort, Resolution, Response, ResponseId,
};
use crate::inbound::http::ApiResult;
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{FieldName, parse_id};

const POST_ID: FieldName = FieldName::new("postId");
const RESPONSE_ID: FieldName = FieldName::new("responseId");

/// Query of `GET /api/v1/posts`.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PostFeedQuery {
    pub resolution: Option<Resolution>,
    /// Case-insensitive substring of the crop name.
    pub crop: Option<String>,
    /// Comma-separated; posts sharing any tag match.
    pub tags: Option<String>,
    /// Case-insensitive substring of title or description.
    pub search: Option<String>,
    pub sort: Option<PostSort>,
    /// One-based.
    pub page: Option<u32>,
    /// 1 to 100, default 10.
    pub limit: Option<u32>,
}

impl PostFeedQuery {
    fn filter(&self) -> PostFilter {
        PostFilter {
            resolution: self.resolution.unwrap_or_default(),
            crop: self.crop.clone(),
            tags: self
                .tags
                .as_deref()
                .map(|raw| raw.split(',').map(str::to_owned).collect())
                .unwrap_or_default(),
            search: self.search.clone(),
        }
    }
}

/// Body of `POST /api/v1/posts`.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreatePostBody {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub crop_name: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Body of `POST /api/v1/posts/{post_id}/responses`.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddResponseBody {
    pub content: String,
    #[serde(default)]
    pub is_expert_advice: bool,
}

/// Body of `PUT /api/v1/responses/{response_id}/verification`.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerificationBody {
    pub verified: bool,
    /// In `[0, 1]`.
    pub confidence: f64,
    #[serde(default)]
    pub reason: Option<String>,
}

fn map_pagination_error(err: PaginationError) -> Error {
    let field = match err {
        PaginationError::PageOutOfRange => "page",
        PaginationError::LimitOutOfRange { .. } => "limit",
    };
    Error::invalid_request(err.to_string())
        .with_details(json!({ "field": field, "code": "invalid_pagination" }))
}

fn parse_pair(raw: (String, String)) -> Result<(PostId, ResponseId), Error> {
    let (post, response) = raw;
    Ok((parse_id(&post, POST_ID)?, parse_id(&response, RESPONSE_ID)?))
}

/// Filtered, sorted, paginated community feed.
#[utoipa::path(
    get,
    path = "/api/v1/posts",
    params(PostFeedQuery),
    responses(
        (status = 200, description = "Feed page", body = PostPage),
        (status = 400, description = "Invalid pagination or filter", body = Error),
        (status = 503, description = "Storage unavailable", body = Error)
    ),
    tags = ["community"],
    operation_id = "rankPosts",
    security([])
)]
#[get("/posts")]
pub async fn list_posts(
    state: web::Data<HttpState>,
    query: web::Query<PostFeedQuery>,
) -> ApiResult<web::Json<PostPage>> {
    let query = query.into_inner();
    let pagination = Pagination::new(query.page, query.limit).map_err(map_pagination_error)?;
    let page = state
        .trust_query
        .rank_posts(query.filter(), query.sort.unwrap_or_default(), pagination)
        .await?;
    Ok(web::Json(page))
}

/// Ask a question as the session caller.
#[utoipa::path(
    post,
    path = "/api/v1/posts",
    request_body = CreatePostBody,
    responses(
        (status = 201, description = "Post created", body = Post),
        (status = 400, description = "Invalid request", body = Error),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 404, description = "Author profile not found", body = Error)
    ),
    tags = ["community"],
    operation_id = "createPost"
)]
#[post("/posts")]
pub async fn create_post(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<CreatePostBody>,
) -> ApiResult<HttpResponse> {
    let author_id = session.require_user_id()?;
    let body = payload.into_inner();
    let post = state
        .community
        .create_post(CreatePostRequest {
            author_id,
            title: body.title,
            description: body.description,
            crop_name: body.crop_name,
            tags: body.tags,
        })
        .await?;
    Ok(HttpResponse::Created().json(post))
}

/// Open a post: counts a view and returns its answers.
#[utoipa::path(
    get,
    path = "/api/v1/posts/{post_id}",
    params(("post_id" = String, Path, description = "Post UUID")),
    responses(
        (status = 200, description = "Post with responses", body = PostDetail),
        (status = 404, description = "Post not found", body = Error)
    ),
    tags = ["community"],
    operation_id = "viewPost",
    security([])
)]
#[get("/posts/{post_id}")]
pub async fn view_post(
    state: web::Data<HttpState>,
    path: web::Path<String>,
) -> ApiResult<web::Json<PostDetail>> {
    let post_id = parse_id(&path.into_inner(), POST_ID)?;
    let detail = state.community.view_post(post_id).await?;
    Ok(web::Json(detail))
}

/// Answer a question as the session caller.
#[utoipa::path(
    post,
    path = "/api/v1/posts/{post_id}/responses",
    params(("post_id" = String, Path, description = "Post UUID")),
    request_body = AddResponseBody,
    responses(
        (status = 201, description = "Response added", body = Response),
        (status = 400, description = "Invalid request", body = Error),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 404, description = "Post or author not found", body = Error)
    ),
    tags = ["community"],
    operation_id = "addResponse"
)]
#[post("/posts/{post_id}/responses")]
pub async fn add_response(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
    payload: web::Json<AddResponseBody>,
) -> ApiResult<HttpResponse> {
    let author_id = session.require_user_id()?;
    let post_id = parse_id(&path.into_inner(), POST_ID)?;
    let body = payload.into_inner();
    let response = state
        .community
        .add_response(AddResponseRequest {
            post_id,
            author_id,
            content: body.content,
            is_expert_advice: body.is_expert_advice,
        })
        .await?;
    Ok(HttpResponse::Created().json(response))
}

/// Delete one of the caller's own responses.
#[utoipa::path(
    delete,
    path = "/api/v1/posts/{post_id}/responses/{response_id}",
    params(
        ("post_id" = String, Path, description = "Post UUID"),
        ("response_id" = String, Path, description = "Response UUID")
    ),
    responses(
        (status = 200, description = "Post after removal", body = Post),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 403, description = "Not the response author", body = Error),
        (status = 404, description = "Post or response not found", body = Error)
    ),
    tags = ["community"],
    operation_id = "removeResponse"
)]
#[delete("/posts/{post_id}/responses/{response_id}")]
pub async fn remove_response(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<(String, String)>,
) -> ApiResult<web::Json<Post>> {
    let requester_id = session.require_user_id()?;
    let (post_id, response_id) = parse_pair(path.into_inner())?;
    let post = state
        .community
        .remove_response(post_id, response_id, requester_id)
        .await?;
    Ok(web::Json(post))
}

/// Mark a response as the resolving answer. Post owner only.
#[utoipa::path(
    post,
    path = "/api/v1/posts/{post_id}/responses/{response_id}/accept",
    params(
        ("post_id" = String, Path, description = "Post UUID"),
        ("response_id" = String, Path, description = "Response UUID")
    ),
    responses(
        (status = 200, description = "Post resolved; author trust recomputed", body = AcceptedResponse),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 403, description = "Not the post owner", body = Error),
        (status = 404, description = "Post or response not found", body = Error),
        (status = 409, description = "Concurrent updates exhausted retries", body = Error)
    ),
    tags = ["community"],
    operation_id = "acceptResponse"
)]
#[post("/posts/{post_id}/responses/{response_id}/accept")]
pub async fn accept_response(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<(String, String)>,
) -> ApiResult<web::Json<AcceptedResponse>> {
    let requester_id = session.require_user_id()?;
    let (post_id, response_id) = parse_pair(path.into_inner())?;
    let accepted = state
        .community
        .accept_response(post_id, response_id, requester_id)
        .await?;
    Ok(web::Json(accepted))
}

/// Record the verification collaborator's verdict on a response. The
/// collaborator calls in with an admin session.
#[utoipa::path(
    put,
    path = "/api/v1/responses/{response_id}/verification",
    params(("response_id" = String, Path, description = "Response UUID")),
    request_body = VerificationBody,
    responses(
        (status = 200, description = "Verdict stored; author trust recomputed", body = Response),
        (status = 400, description = "Confidence outside [0, 1]", body = Error),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 403, description = "Caller is not an admin", body = Error),
        (status = 404, description = "Response not found", body = Error)
    ),
    tags = ["community"],
    operation_id = "recordVerification"
)]
#[put("/responses/{response_id}/verification")]
pub async fn record_verification(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
    payload: web::Json<VerificationBody>,
) -> ApiResult<web::Json<Response>> {
    session.require_admin(state.trust_query.as_ref()).await?;
    let response_id = parse_id(&path.into_inner(), RESPONSE_ID)?;
    let body = payload.into_inner();
    let response = state
        .community
        .record_verification(RecordVerificationRequest {
            response_id,
            verified: body.verified,
            confidence: body.confidence,
            reason: body.reason,
        })
        .await?;
    Ok(web::Json(response))
}

/// Recount one post's responses and repair its cached counter.
#[utoipa::path(
    post,
    path = "/api/v1/posts/{post_id}/reconcile",
    params(("post_id" = String, Path, description = "Post UUID")),
    responses(
        (status = 200, description = "Cached and actual counts", body = CountReconciliation),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 403, description = "Caller is not an admin", body = Error),
        (status = 404, description = "Post not found", body = Error)
    ),
    tags = ["admin"],
    operation_id = "reconcileResponseCount"
)]
#[post("/posts/{post_id}/reconcile")]
pub async fn reconcile_post(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<web::Json<CountReconciliation>> {
    session.require_admin(state.trust_query.as_ref()).await?;
    let post_id = parse_id(&path.into_inner(), POST_ID)?;
    let outcome = state.community.reconcile_response_count(post_id).await?;
    Ok(web::Json(outcome))
}

/// Repair every post's response counter.
#[utoipa::path(
    post,
    path = "/api/v1/admin/reconcile-response-counts",
    responses(
        (status = 200, description = "Posts checked and repaired", body = ReconciliationSummary),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 403, description = "Caller is not an admin", body = Error)
    ),
    tags = ["admin"],
    operation_id = "reconcileAllResponseCounts"
)]
#[post("/admin/reconcile-response-counts")]
pub async fn reconcile_all(
    state: web::Data<HttpState>,
    session: SessionContext,
) -> ApiResult<web::Json<ReconciliationSummary>> {
    session.require_admin(state.trust_query.as_ref()).await?;
    let summary = state.community.reconcile_all_response_counts().await?;
    Ok(web::Json(summary))
}

#[cfg(test)]
#[path = "community_tests.rs"]
mod tests;
