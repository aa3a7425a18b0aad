//! Follow-up prompt handlers.
//!
//! ```text
//! GET  /api/v1/follow-ups/due?asOf=2025-03-13T00:00:00Z
//! POST /api/v1/follow-ups/cancel {"suggestionId":"…","scheduledFor":"…"}
//! ```
//!
//! Delivery belongs to the notification subsystem, which polls the due list
//! with an admin session.

use actix_web::{get, post, web};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::domain::{Error, FollowUpKey, FollowUpPrompt};
use crate::inbound::http::ApiResult;
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{
    FieldName, parse_id, parse_optional_rfc3339_timestamp, parse_rfc3339_timestamp,
};

/// Query of `GET /api/v1/follow-ups/due`.
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
#[serde(rename_all = "camelCase")]
pub struct DueQuery {
    /// RFC 3339 cut-off; defaults to now.
    pub as_of: Option<String>,
}

/// Body of `POST /api/v1/follow-ups/cancel`.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CancelFollowUpBody {
    pub suggestion_id: String,
    pub scheduled_for: String,
}

/// Result of a cancellation.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CancelFollowUpResponse {
    /// `false` when no pending prompt matched.
    pub cancelled: bool,
}

/// Pending prompts due at `asOf`, earliest first. Admin only.
#[utoipa::path(
    get,
    path = "/api/v1/follow-ups/due",
    params(DueQuery),
    responses(
        (status = 200, description = "Due prompts", body = [FollowUpPrompt]),
        (status = 400, description = "Malformed timestamp", body = Error),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 403, description = "Caller is not an admin", body = Error)
    ),
    tags = ["follow-ups"],
    operation_id = "dueFollowUps"
)]
#[get("/follow-ups/due")]
pub async fn due_follow_ups(
    state: web::Data<HttpState>,
    session: SessionContext,
    query: web::Query<DueQuery>,
) -> ApiResult<web::Json<Vec<FollowUpPrompt>>> {
    session.require_admin(state.trust_query.as_ref()).await?;
    let as_of =
        parse_optional_rfc3339_timestamp(query.as_of.as_deref(), FieldName::new("asOf"))?;
    let prompts = state.trust_query.due_follow_ups(as_of).await?;
    Ok(web::Json(prompts))
}

/// Cancel one of the caller's pending prompts.
#[utoipa::path(
    post,
    path = "/api/v1/follow-ups/cancel",
    request_body = CancelFollowUpBody,
    responses(
        (status = 200, description = "Cancellation outcome", body = CancelFollowUpResponse),
        (status = 400, description = "Invalid request", body = Error),
        (status = 401, description = "Unauthorised", body = Error)
    ),
    tags = ["follow-ups"],
    operation_id = "cancelFollowUp"
)]
#[post("/follow-ups/cancel")]
pub async fn cancel_follow_up(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<CancelFollowUpBody>,
) -> ApiResult<web::Json<CancelFollowUpResponse>> {
    let user_id = session.require_user_id()?;
    let body = payload.into_inner();
    let key = FollowUpKey {
        user_id,
        suggestion_id: parse_id(&body.suggestion_id, FieldName::new("suggestionId"))?,
        scheduled_for: parse_rfc3339_timestamp(&body.scheduled_for, FieldName::new("scheduledFor"))?,
    };
    let cancelled = state.trust.cancel_follow_up(key).await?;
    Ok(web::Json(CancelFollowUpResponse { cancelled }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{SuggestionId, UserId};
    use crate::inbound::http::test_utils::{
        MockPorts, TEST_LOGIN_PATH, login_cookie, test_login, test_session_middleware,
    };
    use actix_web::http::StatusCode;
    use actix_web::{App, test as actix_test};
    use chrono::{DateTime, TimeZone, Utc};
    use mockall::predicate::eq;
    use rstest::rstest;
    use serde_json::{Value, json};

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, day, 0, 0, 0)
            .single()
            .expect("valid timestamp")
    }

    fn test_app(
        ports: MockPorts,
    ) -> App<
        impl actix_web::dev::ServiceFactory<
            actix_web::dev::ServiceRequest,
            Config = (),
            Response = actix_web::dev::ServiceResponse,
            Error = actix_web::Error,
            InitError = (),
        >,
    > {
        App::new()
            .app_data(ports.into_state())
            .wrap(test_session_middleware())
            .route(TEST_LOGIN_PATH, web::get().to(test_login))
            .service(
                web::scope("/api/v1")
                    .service(due_follow_ups)
                    .service(cancel_follow_up),
            )
    }

    #[rstest]
    #[actix_web::test]
    async fn due_prompts_use_requested_cut_off() {
        let prompt = FollowUpPrompt {
            key: FollowUpKey {
                user_id: UserId::random(),
                suggestion_id: SuggestionId::random(),
                scheduled_for: at(12),
            },
            context_id: None,
            created_at: at(1),
        };
        let mut ports = MockPorts::default();
        ports.allow_admin();
        ports
            .trust_query
            .expect_due_follow_ups()
            .with(eq(Some(at(13))))
            .times(1)
            .returning(move |_| Ok(vec![prompt.clone()]));

        let app = actix_test::init_service(test_app(ports)).await;
        let cookie = login_cookie(&app, &UserId::random()).await;
        let response = actix_test::call_service(
            &app,
            actix_test::TestRequest::get()
                .uri("/api/v1/follow-ups/due?asOf=2025-03-13T00:00:00Z")
                .cookie(cookie)
                .to_request(),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        let body: Value = actix_test::read_body_json(response).await;
        assert_eq!(body.as_array().map(Vec::len), Some(1));
        assert!(body[0].get("scheduledFor").is_some());
    }

    #[rstest]
    #[actix_web::test]
    async fn cancel_targets_callers_prompt() {
        let caller = UserId::random();
        let suggestion_id = SuggestionId::random();
        let mut ports = MockPorts::default();
        ports
            .trust
            .expect_cancel_follow_up()
            .with(eq(FollowUpKey {
                user_id: caller,
                suggestion_id,
                scheduled_for: at(12),
            }))
            .times(1)
            .returning(|_| Ok(true));

        let app = actix_test::init_service(test_app(ports)).await;
        let cookie = login_cookie(&app, &caller).await;
        let response = actix_test::call_service(
            &app,
            actix_test::TestRequest::post()
                .uri("/api/v1/follow-ups/cancel")
                .cookie(cookie)
                .set_json(json!({
                    "suggestionId": suggestion_id.to_string(),
                    "scheduledFor": "2025-03-12T00:00:00Z"
                }))
                .to_request(),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        let body: Value = actix_test::read_body_json(response).await;
        assert_eq!(body.get("cancelled").and_then(Value::as_bool), Some(true));
    }

    #[rstest]
    #[actix_web::test]
    async fn malformed_cut_off_is_rejected() {
        let mut ports = MockPorts::default();
        ports.allow_admin();
        ports.trust_query.expect_due_follow_ups().never();

        let app = actix_test::init_service(test_app(ports)).await;
        let cookie = login_cookie(&app, &UserId::random()).await;
        let response = actix_test::call_service(
            &app,
            actix_test::TestRequest::get()
                .uri("/api/v1/follow-ups/due?asOf=tomorrow")
                .cookie(cookie)
                .to_request(),
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[rstest]
    #[actix_web::test]
    async fn absent_cut_off_is_left_to_the_service() {
        let mut ports = MockPorts::default();
        ports.allow_admin();
        ports
            .trust_query
            .expect_due_follow_ups()
            .with(eq(None))
            .times(1)
            .returning(|_| Ok(Vec::new()));

        let app = actix_test::init_service(test_app(ports)).await;
        let cookie = login_cookie(&app, &UserId::random()).await;
        let response = actix_test::call_service(
            &app,
            actix_test::TestRequest::get()
                .uri("/api/v1/follow-ups/due")
                .cookie(cookie)
                .to_request(),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[rstest]
    #[actix_web::test]
    async fn farmer_cannot_list_due_prompts() {
        let mut ports = MockPorts::default();
        ports.deny_admin();
        ports.trust_query.expect_due_follow_ups().never();

        let app = actix_test::init_service(test_app(ports)).await;
        let cookie = login_cookie(&app, &UserId::random()).await;
        let response = actix_test::call_service(
            &app,
            actix_test::TestRequest::get()
                .uri("/api/v1/follow-ups/due")
                .cookie(cookie)
                .to_request(),
        )
        .await;

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }
}
