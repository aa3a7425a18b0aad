//! Tests for suggestion and feedback handlers.

use super::*;
use crate::domain::ports::UpdatedScores;
use crate::domain::{
    BoundedScore, Contributor, Feedback, FeedbackId, Rating, SuggestionScores, TrustEngineError,
    UserId, UserRole,
};
use crate::inbound::http::test_utils::{
    MockPorts, TEST_LOGIN_PATH, login_cookie, test_login, test_session_middleware,
};
use actix_web::http::StatusCode;
use actix_web::{App, test as actix_test, web};
use chrono::{DateTime, TimeZone, Utc};
use mockall::predicate::eq;
use rstest::{fixture, rstest};
use serde_json::{Value, json};

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 1, 6, 30, 0)
        .single()
        .expect("valid timestamp")
}

#[fixture]
fn rater() -> UserId {
    UserId::random()
}

fn suggestion(author_id: UserId, usefulness: f64) -> Suggestion {
    let mut suggestion = Suggestion::draft(
        SuggestionId::random(),
        author_id,
        "Late Blight",
        "Spray copper oxychloride at 3 g/l",
        None,
        now(),
    )
    .expect("valid suggestion");
    suggestion.usefulness_score = BoundedScore::clamped(usefulness);
    suggestion
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
                .service(submit_suggestion)
                .service(rank_suggestions)
                .service(record_feedback)
                .service(rebuild_suggestion),
        )
}

#[rstest]
#[actix_web::test]
async fn feedback_uses_session_caller_as_rater(rater: UserId) {
    let author = Contributor::register(UserId::random(), "Meera", UserRole::Expert, now())
        .expect("valid contributor");
    let target = suggestion(author.id, 70.0);
    let suggestion_id = target.id;
    let context = uuid::Uuid::new_v4();

    let mut ports = MockPorts::default();
    ports
        .trust
        .expect_record_feedback()
        .withf(move |request| {
            request.rater_id == rater
                && request.suggestion_id == suggestion_id
                && (request.score - 4.0).abs() < f64::EPSILON
                && request.context_id == Some(context)
        })
        .times(1)
        .returning(move |request| {
            Ok(UpdatedScores {
                feedback: Feedback {
                    id: FeedbackId::random(),
                    rater_id: request.rater_id,
                    suggestion_id: request.suggestion_id,
                    target_user_id: author.id,
                    rating: Rating::new(4).expect("valid rating"),
                    comment: None,
                    context_id: request.context_id,
                    created_at: now(),
                },
                suggestion: target.clone(),
                author: author.clone(),
                follow_up_scheduled_for: Some(now()),
            })
        });

    let app = actix_test::init_service(test_app(ports)).await;
    let cookie = login_cookie(&app, &rater).await;
    let response = actix_test::call_service(
        &app,
        actix_test::TestRequest::post()
            .uri(&format!("/api/v1/suggestions/{suggestion_id}/feedback"))
            .cookie(cookie)
            .set_json(json!({ "score": 4, "contextId": context.to_string() }))
            .to_request(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let body: Value = actix_test::read_body_json(response).await;
    assert_eq!(
        body.pointer("/suggestion/usefulnessScore").and_then(Value::as_f64),
        Some(70.0)
    );
    assert_eq!(body.pointer("/feedback/rating").and_then(Value::as_u64), Some(4));
    assert!(body.get("followUpScheduledFor").is_some());
}

#[rstest]
#[actix_web::test]
async fn duplicate_feedback_returns_conflict(rater: UserId) {
    let suggestion_id = SuggestionId::random();
    let mut ports = MockPorts::default();
    ports.trust.expect_record_feedback().returning(move |request| {
        Err(TrustEngineError::DuplicateFeedback {
            rater_id: request.rater_id,
            suggestion_id: request.suggestion_id,
        })
    });

    let app = actix_test::init_service(test_app(ports)).await;
    let cookie = login_cookie(&app, &rater).await;
    let response = actix_test::call_service(
        &app,
        actix_test::TestRequest::post()
            .uri(&format!("/api/v1/suggestions/{suggestion_id}/feedback"))
            .cookie(cookie)
            .set_json(json!({ "score": 5 }))
            .to_request(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body: Value = actix_test::read_body_json(response).await;
    assert_eq!(
        body.pointer("/details/code").and_then(Value::as_str),
        Some("duplicate_feedback")
    );
}

#[rstest]
#[actix_web::test]
async fn feedback_requires_session() {
    let mut ports = MockPorts::default();
    ports.trust.expect_record_feedback().never();

    let app = actix_test::init_service(test_app(ports)).await;
    let response = actix_test::call_service(
        &app,
        actix_test::TestRequest::post()
            .uri(&format!("/api/v1/suggestions/{}/feedback", SuggestionId::random()))
            .set_json(json!({ "score": 3 }))
            .to_request(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[rstest]
#[case("not-a-uuid", json!({ "score": 3 }), "suggestionId")]
#[case("4a3c2b1d-0e9f-4a8b-8c7d-6e5f4a3b2c1d", json!({ "score": 3, "contextId": "scan-9" }), "contextId")]
#[actix_web::test]
async fn malformed_ids_are_rejected_before_the_engine(
    rater: UserId,
    #[case] raw_suggestion: &str,
    #[case] payload: Value,
    #[case] field: &str,
) {
    let mut ports = MockPorts::default();
    ports.trust.expect_record_feedback().never();

    let app = actix_test::init_service(test_app(ports)).await;
    let cookie = login_cookie(&app, &rater).await;
    let response = actix_test::call_service(
        &app,
        actix_test::TestRequest::post()
            .uri(&format!("/api/v1/suggestions/{raw_suggestion}/feedback"))
            .cookie(cookie)
            .set_json(payload)
            .to_request(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = actix_test::read_body_json(response).await;
    assert_eq!(body.pointer("/details/field").and_then(Value::as_str), Some(field));
}

#[rstest]
#[actix_web::test]
async fn ranking_passes_disease_and_limit_through() {
    let first = suggestion(UserId::random(), 90.0);
    let second = suggestion(UserId::random(), 60.0);
    let ranked = vec![
        RankedSuggestion {
            suggestion: first,
            author_trust_score: BoundedScore::baseline(),
        },
        RankedSuggestion {
            suggestion: second,
            author_trust_score: BoundedScore::baseline(),
        },
    ];

    let mut ports = MockPorts::default();
    ports
        .trust_query
        .expect_rank_suggestions()
        .with(eq("Late Blight".to_owned()), eq(Some(2)))
        .times(1)
        .returning(move |_, _| Ok(ranked.clone()));

    let app = actix_test::init_service(test_app(ports)).await;
    let response = actix_test::call_service(
        &app,
        actix_test::TestRequest::get()
            .uri("/api/v1/suggestions?disease=Late%20Blight&limit=2")
            .to_request(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = actix_test::read_body_json(response).await;
    let scores: Vec<f64> = body
        .as_array()
        .expect("array body")
        .iter()
        .filter_map(|item| item.get("usefulnessScore").and_then(Value::as_f64))
        .collect();
    assert_eq!(scores, vec![90.0, 60.0]);
}

#[rstest]
#[actix_web::test]
async fn ranking_without_disease_is_rejected() {
    let mut ports = MockPorts::default();
    ports.trust_query.expect_rank_suggestions().never();

    let app = actix_test::init_service(test_app(ports)).await;
    let response = actix_test::call_service(
        &app,
        actix_test::TestRequest::get().uri("/api/v1/suggestions").to_request(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = actix_test::read_body_json(response).await;
    assert_eq!(
        body.pointer("/details/code").and_then(Value::as_str),
        Some("missing_field")
    );
}

#[rstest]
#[actix_web::test]
async fn submitted_suggestion_is_authored_by_caller(rater: UserId) {
    let mut ports = MockPorts::default();
    ports
        .trust
        .expect_submit_suggestion()
        .withf(move |request| request.author_id == rater && request.disease_name == "Leaf Curl")
        .times(1)
        .returning(|request| {
            Suggestion::draft(
                SuggestionId::random(),
                request.author_id,
                &request.disease_name,
                &request.text,
                request.details.as_deref(),
                now(),
            )
            .map_err(|err| TrustEngineError::invalid_input("text", err))
        });

    let app = actix_test::init_service(test_app(ports)).await;
    let cookie = login_cookie(&app, &rater).await;
    let response = actix_test::call_service(
        &app,
        actix_test::TestRequest::post()
            .uri("/api/v1/suggestions")
            .cookie(cookie)
            .set_json(json!({ "diseaseName": "Leaf Curl", "text": "Remove whitefly hosts" }))
            .to_request(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let body: Value = actix_test::read_body_json(response).await;
    assert_eq!(body.get("usefulnessScore").and_then(Value::as_f64), Some(50.0));
    assert_eq!(
        body.get("authorId").and_then(Value::as_str),
        Some(rater.to_string().as_str())
    );
}

#[rstest]
#[actix_web::test]
async fn admin_rebuild_reports_previous_and_rebuilt() {
    let target = suggestion(UserId::random(), 70.0);
    let suggestion_id = target.id;
    let mut ports = MockPorts::default();
    ports.allow_admin();
    ports
        .trust
        .expect_rebuild_suggestion()
        .with(eq(suggestion_id))
        .times(1)
        .returning(move |id| {
            Ok(SuggestionRebuild {
                suggestion_id: id,
                previous: target.cached_scores(),
                rebuilt: SuggestionScores::default(),
            })
        });

    let app = actix_test::init_service(test_app(ports)).await;
    let cookie = login_cookie(&app, &UserId::random()).await;
    let response = actix_test::call_service(
        &app,
        actix_test::TestRequest::post()
            .uri(&format!("/api/v1/suggestions/{suggestion_id}/rebuild"))
            .cookie(cookie)
            .to_request(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = actix_test::read_body_json(response).await;
    assert_eq!(
        body.pointer("/previous/usefulnessScore").and_then(Value::as_f64),
        Some(70.0)
    );
}

#[rstest]
#[actix_web::test]
async fn farmer_cannot_rebuild_suggestion(rater: UserId) {
    let mut ports = MockPorts::default();
    ports.deny_admin();
    ports.trust.expect_rebuild_suggestion().never();

    let app = actix_test::init_service(test_app(ports)).await;
    let cookie = login_cookie(&app, &rater).await;
    let response = actix_test::call_service(
        &app,
        actix_test::TestRequest::post()
            .uri(&format!("/api/v1/suggestions/{}/rebuild", SuggestionId::random()))
            .cookie(cookie)
            .to_request(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}
