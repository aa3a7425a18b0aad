//! OpenAPI documentation configuration.
//!
//! [`ApiDoc`] registers every trust engine endpoint together with the
//! scored entities they return and the session cookie security scheme.
//! Swagger UI serves it in debug builds.

use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::domain::ports::{
    AcceptedResponse, ContributorRebuild, PostDetail, RebuildSummary, ReconciliationSummary,
    SuggestionRebuild, UpdatedScores,
};
use crate::domain::{
    Contributor, ContributorStanding, CountReconciliation, Error, ErrorCode, Feedback,
    FollowUpKey, FollowUpPrompt, Post, PostPage, PostSort, RankedSuggestion, Resolution, Response,
    Suggestion, UserRole,
};
use crate::inbound::http::community::{AddResponseBody, CreatePostBody, VerificationBody};
use crate::inbound::http::contributors::RegisterContributorBody;
use crate::inbound::http::follow_ups::{CancelFollowUpBody, CancelFollowUpResponse};
use crate::inbound::http::health::{ReadinessReport, StorageBackend};
use crate::inbound::http::suggestions::{FeedbackBody, SubmitSuggestionBody};

/// Enrich the generated document with the session cookie security scheme.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi
            .components
            .get_or_insert_with(utoipa::openapi::Components::default);

        components.add_security_scheme(
            "SessionCookie",
            SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::with_description(
                "session",
                "Session cookie issued by POST /api/v1/contributors.",
            ))),
        );
    }
}

/// OpenAPI document for the REST API.
#[derive(OpenApi)]
#[openapi(
    modifiers(&SecurityAddon),
    info(
        title = "KrishiLok trust engine API",
        description = "Usefulness and trust scoring, ranking and community Q&A for advisory content."
    ),
    servers(
        (url = "/", description = "Relative to the deployment base URL")
    ),
    security(("SessionCookie" = [])),
    paths(
        crate::inbound::http::suggestions::submit_suggestion,
        crate::inbound::http::suggestions::rank_suggestions,
        crate::inbound::http::suggestions::record_feedback,
        crate::inbound::http::suggestions::rebuild_suggestion,
        crate::inbound::http::contributors::register_contributor,
        crate::inbound::http::contributors::leaderboard,
        crate::inbound::http::contributors::rebuild_contributor,
        crate::inbound::http::contributors::rebuild_all,
        crate::inbound::http::community::list_posts,
        crate::inbound::http::community::create_post,
        crate::inbound::http::community::view_post,
        crate::inbound::http::community::add_response,
        crate::inbound::http::community::remove_response,
        crate::inbound::http::community::accept_response,
        crate::inbound::http::community::record_verification,
        crate::inbound::http::community::reconcile_post,
        crate::inbound::http::community::reconcile_all,
        crate::inbound::http::follow_ups::due_follow_ups,
        crate::inbound::http::follow_ups::cancel_follow_up,
        crate::inbound::http::health::ready,
        crate::inbound::http::health::live,
    ),
    components(schemas(
        Error,
        ErrorCode,
        Suggestion,
        RankedSuggestion,
        Feedback,
        UpdatedScores,
        SuggestionRebuild,
        Contributor,
        ContributorStanding,
        ContributorRebuild,
        RebuildSummary,
        UserRole,
        Post,
        PostPage,
        PostDetail,
        PostSort,
        Resolution,
        Response,
        AcceptedResponse,
        CountReconciliation,
        ReconciliationSummary,
        FollowUpKey,
        FollowUpPrompt,
        SubmitSuggestionBody,
        FeedbackBody,
        RegisterContributorBody,
        CreatePostBody,
        AddResponseBody,
        VerificationBody,
        CancelFollowUpBody,
        CancelFollowUpResponse,
        ReadinessReport,
        StorageBackend,
    )),
    tags(
        (name = "suggestions", description = "Treatment suggestions and farmer feedback"),
        (name = "contributors", description = "Contributor profiles and leaderboards"),
        (name = "community", description = "Community questions and responses"),
        (name = "follow-ups", description = "Deferred outcome prompts"),
        (name = "admin", description = "Rebuild and reconciliation maintenance"),
        (name = "health", description = "Endpoints for health checks")
    )
)]
pub struct ApiDoc;
