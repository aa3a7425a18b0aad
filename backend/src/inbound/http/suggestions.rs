//! Suggestion and feedback handlers.
//!
//! ```text
//! POST /api/v1/suggestions
//! GET  /api/v1/suggestions?disease=Late%20Blight&limit=5
//! POST /api/v1/suggestions/{suggestion_id}/feedback {"score":4,"contextId":"…"}
//! POST /api/v1/suggestions/{suggestion_id}/rebuild
//! ```
//!
//! The author and the rater are always the session caller; request bodies
//! never name them.

use actix_web::{HttpResponse, get, post, web};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::domain::ports::{
    RecordFeedbackRequest, SubmitSuggestionRequest, SuggestionRebuild, UpdatedScores,
};
use crate::domain::{Error, RankedSuggestion, Suggestion, SuggestionId};
use crate::inbound::http::ApiResult;
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{
    FieldName, missing_field_error, parse_id, parse_optional_id,
};

const SUGGESTION_ID: FieldName = FieldName::new("suggestionId");

/// Body of `POST /api/v1/suggestions`.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmitSuggestionBody {
    pub disease_name: String,
    pub text: String,
    #[serde(default)]
    pub details: Option<String>,
}

/// Body of `POST /api/v1/suggestions/{suggestion_id}/feedback`.
///
/// `score` is a JSON number so fractional and out-of-range values reach the
/// engine and are reported as `invalid_score`.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackBody {
    pub score: f64,
    #[serde(default)]
    pub comment: Option<String>,
    /// Scan (diagnosis) the advice was applied to.
    #[serde(default)]
    pub context_id: Option<String>,
}

/// Query of `GET /api/v1/suggestions`.
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RankSuggestionsQuery {
    /// Disease name, matched after trimming.
    pub disease: Option<String>,
    /// Keep at most this many suggestions.
    pub limit: Option<usize>,
}

/// Publish a treatment suggestion as the session caller.
#[utoipa::path(
    post,
    path = "/api/v1/suggestions",
    request_body = SubmitSuggestionBody,
    responses(
        (status = 201, description = "Suggestion created", body = Suggestion),
        (status = 400, description = "Invalid request", body = Error),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 404, description = "Author profile not found", body = Error),
        (status = 503, description = "Storage unavailable", body = Error)
    ),
    tags = ["suggestions"],
    operation_id = "submitSuggestion"
)]
#[post("/suggestions")]
pub async fn submit_suggestion(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<SubmitSuggestionBody>,
) -> ApiResult<HttpResponse> {
    let author_id = session.require_user_id()?;
    let body = payload.into_inner();
    let suggestion = state
        .trust
        .submit_suggestion(SubmitSuggestionRequest {
            author_id,
            disease_name: body.disease_name,
            text: body.text,
            details: body.details,
        })
        .await?;
    Ok(HttpResponse::Created().json(suggestion))
}

/// Suggestions for a disease, most useful first.
#[utoipa::path(
    get,
    path = "/api/v1/suggestions",
    params(RankSuggestionsQuery),
    responses(
        (status = 200, description = "Ranked suggestions", body = [RankedSuggestion]),
        (status = 400, description = "Invalid request", body = Error),
        (status = 503, description = "Storage unavailable", body = Error)
    ),
    tags = ["suggestions"],
    operation_id = "rankSuggestions",
    security([])
)]
#[get("/suggestions")]
pub async fn rank_suggestions(
    state: web::Data<HttpState>,
    query: web::Query<RankSuggestionsQuery>,
) -> ApiResult<web::Json<Vec<RankedSuggestion>>> {
    let RankSuggestionsQuery { disease, limit } = query.into_inner();
    let disease = disease.ok_or_else(|| missing_field_error(FieldName::new("disease")))?;
    let ranked = state.trust_query.rank_suggestions(disease, limit).await?;
    Ok(web::Json(ranked))
}

/// Rate a suggestion as the session caller.
#[utoipa::path(
    post,
    path = "/api/v1/suggestions/{suggestion_id}/feedback",
    params(("suggestion_id" = String, Path, description = "Suggestion UUID")),
    request_body = FeedbackBody,
    responses(
        (status = 201, description = "Feedback recorded and scores recomputed", body = UpdatedScores),
        (status = 400, description = "Invalid score or request", body = Error),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 404, description = "Suggestion or rater not found", body = Error),
        (status = 409, description = "Already rated, or concurrent updates exhausted retries", body = Error),
        (status = 503, description = "Storage unavailable", body = Error)
    ),
    tags = ["suggestions"],
    operation_id = "recordFeedback"
)]
#[post("/suggestions/{suggestion_id}/feedback")]
pub async fn record_feedback(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
    payload: web::Json<FeedbackBody>,
) -> ApiResult<HttpResponse> {
    let rater_id = session.require_user_id()?;
    let suggestion_id: SuggestionId = parse_id(&path.into_inner(), SUGGESTION_ID)?;
    let body = payload.into_inner();
    let context_id =
        parse_optional_id::<Uuid>(body.context_id.as_deref(), FieldName::new("contextId"))?;

    let updated = state
        .trust
        .record_feedback(RecordFeedbackRequest {
            rater_id,
            suggestion_id,
            score: body.score,
            comment: body.comment,
            context_id,
        })
        .await?;
    Ok(HttpResponse::Created().json(updated))
}

/// Recompute one suggestion's cached aggregate from its feedback history.
#[utoipa::path(
    post,
    path = "/api/v1/suggestions/{suggestion_id}/rebuild",
    params(("suggestion_id" = String, Path, description = "Suggestion UUID")),
    responses(
        (status = 200, description = "Cached and rebuilt scores", body = SuggestionRebuild),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 403, description = "Caller is not an admin", body = Error),
        (status = 404, description = "Suggestion not found", body = Error),
        (status = 409, description = "Concurrent updates exhausted retries", body = Error)
    ),
    tags = ["suggestions"],
    operation_id = "rebuildSuggestion"
)]
#[post("/suggestions/{suggestion_id}/rebuild")]
pub async fn rebuild_suggestion(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<web::Json<SuggestionRebuild>> {
    session.require_admin(state.trust_query.as_ref()).await?;
    let suggestion_id = parse_id(&path.into_inner(), SUGGESTION_ID)?;
    let rebuild = state.trust.rebuild_suggestion(suggestion_id).await?;
    Ok(web::Json(rebuild))
}

#[cfg(test)]
#[path = "suggestions_tests.rs"]
mod tests;
