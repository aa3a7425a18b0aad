//! Tests for community handlers.

use super::*;
use crate::domain::{TrustEngineError, UserId};
use crate::inbound::http::test_utils::{
    MockPorts, TEST_LOGIN_PATH, login_cookie, test_login, test_session_middleware,
};
use actix_web::http::StatusCode;
use actix_web::{App, test as actix_test};
use chrono::Utc;
use mockall::predicate::eq;
use rstest::rstest;
use serde_json::{Value, json};

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
                .service(list_posts)
                .service(create_post)
                .service(view_post)
                .service(add_response)
                .service(remove_response)
                .service(accept_response)
                .service(record_verification)
                .service(reconcile_post)
                .service(reconcile_all),
        )
}

fn post(author_id: UserId, title: &str) -> Post {
    Post::draft(
        PostId::random(),
        author_id,
        title,
        "Leaves show brown concentric rings",
        Some("Tomato"),
        &["blight".to_owned()],
        Utc::now(),
    )
    .expect("valid post")
}

#[rstest]
#[actix_web::test]
async fn feed_query_becomes_filter_sort_and_page() {
    let page = PostPage {
        posts: vec![post(UserId::random(), "Early blight on tomato")],
        page: 2,
        limit: 5,
        total_count: 6,
        has_more: false,
    };
    let expected_filter = PostFilter {
        resolution: Resolution::Unresolved,
        crop: Some("tom".to_owned()),
        tags: vec!["blight".to_owned(), " fungus".to_owned()],
        search: None,
    };
    let mut ports = MockPorts::default();
    ports
        .trust_query
        .expect_rank_posts()
        .withf(move |filter, sort, pagination| {
            *filter == expected_filter
                && *sort == PostSort::Popular
                && pagination.page() == 2
                && pagination.limit() == 5
        })
        .times(1)
        .returning(move |_, _, _| Ok(page.clone()));

    let app = actix_test::init_service(test_app(ports)).await;
    let response = actix_test::call_service(
        &app,
        actix_test::TestRequest::get()
            .uri("/api/v1/posts?resolution=unresolved&crop=tom&tags=blight,%20fungus&sort=popular&page=2&limit=5")
            .to_request(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = actix_test::read_body_json(response).await;
    assert_eq!(body.get("totalCount").and_then(Value::as_u64), Some(6));
    assert_eq!(body.get("hasMore").and_then(Value::as_bool), Some(false));
}

#[rstest]
#[case("limit=0", "limit")]
#[case("limit=101", "limit")]
#[case("page=0", "page")]
#[actix_web::test]
async fn out_of_range_pagination_is_rejected(#[case] query: &str, #[case] field: &str) {
    let mut ports = MockPorts::default();
    ports.trust_query.expect_rank_posts().never();

    let app = actix_test::init_service(test_app(ports)).await;
    let response = actix_test::call_service(
        &app,
        actix_test::TestRequest::get()
            .uri(&format!("/api/v1/posts?{query}"))
            .to_request(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = actix_test::read_body_json(response).await;
    assert_eq!(body.pointer("/details/field").and_then(Value::as_str), Some(field));
}

#[rstest]
#[actix_web::test]
async fn accepting_as_non_owner_is_forbidden() {
    let caller = UserId::random();
    let post_id = PostId::random();
    let response_id = ResponseId::random();

    let mut ports = MockPorts::default();
    ports
        .community
        .expect_accept_response()
        .with(eq(post_id), eq(response_id), eq(caller))
        .times(1)
        .returning(|_, _, _| {
            Err(TrustEngineError::forbidden(
                "only the post owner may accept a response",
            ))
        });

    let app = actix_test::init_service(test_app(ports)).await;
    let cookie = login_cookie(&app, &caller).await;
    let response = actix_test::call_service(
        &app,
        actix_test::TestRequest::post()
            .uri(&format!(
                "/api/v1/posts/{post_id}/responses/{response_id}/accept"
            ))
            .cookie(cookie)
            .to_request(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[rstest]
#[actix_web::test]
async fn response_is_added_as_caller() {
    let caller = UserId::random();
    let post_id = PostId::random();

    let mut ports = MockPorts::default();
    ports
        .community
        .expect_add_response()
        .withf(move |request| {
            request.post_id == post_id && request.author_id == caller && request.is_expert_advice
        })
        .times(1)
        .returning(|request| {
            Response::draft(
                ResponseId::random(),
                request.post_id,
                request.author_id,
                &request.content,
                request.is_expert_advice,
                Utc::now(),
            )
            .map_err(|err| TrustEngineError::invalid_input("content", err))
        });

    let app = actix_test::init_service(test_app(ports)).await;
    let cookie = login_cookie(&app, &caller).await;
    let response = actix_test::call_service(
        &app,
        actix_test::TestRequest::post()
            .uri(&format!("/api/v1/posts/{post_id}/responses"))
            .cookie(cookie)
            .set_json(json!({ "content": "Use mancozeb at 2 g/l", "isExpertAdvice": true }))
            .to_request(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let body: Value = actix_test::read_body_json(response).await;
    assert_eq!(body.get("isVerified").and_then(Value::as_bool), Some(false));
}

#[rstest]
#[actix_web::test]
async fn viewing_unknown_post_is_not_found() {
    let post_id = PostId::random();
    let mut ports = MockPorts::default();
    ports
        .community
        .expect_view_post()
        .with(eq(post_id))
        .returning(|post_id| Err(TrustEngineError::PostNotFound { post_id }));

    let app = actix_test::init_service(test_app(ports)).await;
    let response = actix_test::call_service(
        &app,
        actix_test::TestRequest::get()
            .uri(&format!("/api/v1/posts/{post_id}"))
            .to_request(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body: Value = actix_test::read_body_json(response).await;
    assert_eq!(
        body.pointer("/details/code").and_then(Value::as_str),
        Some("post_not_found")
    );
}

#[rstest]
#[actix_web::test]
async fn verification_forwards_verdict() {
    let response_id = ResponseId::random();
    let mut ports = MockPorts::default();
    ports.allow_admin();
    ports
        .community
        .expect_record_verification()
        .withf(move |request| {
            request.response_id == response_id
                && request.verified
                && (request.confidence - 0.9).abs() < f64::EPSILON
        })
        .times(1)
        .returning(|request| {
            let mut response = Response::draft(
                request.response_id,
                PostId::random(),
                UserId::random(),
                "Apply neem oil weekly",
                false,
                Utc::now(),
            )
            .map_err(|err| TrustEngineError::invalid_input("content", err))?;
            response.is_verified = request.verified;
            response.verification_confidence = Some(request.confidence);
            Ok(response)
        });

    let app = actix_test::init_service(test_app(ports)).await;
    let cookie = login_cookie(&app, &UserId::random()).await;
    let response = actix_test::call_service(
        &app,
        actix_test::TestRequest::put()
            .uri(&format!("/api/v1/responses/{response_id}/verification"))
            .cookie(cookie)
            .set_json(json!({ "verified": true, "confidence": 0.9 }))
            .to_request(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = actix_test::read_body_json(response).await;
    assert_eq!(body.get("isVerified").and_then(Value::as_bool), Some(true));
}

#[rstest]
#[case::verification(
    actix_test::TestRequest::put()
        .uri("/api/v1/responses/7d1c2e4a-1f0b-4c8e-9a3d-5b6f7e8d9c0a/verification")
        .set_json(json!({ "verified": true, "confidence": 0.9 }))
)]
#[case::reconcile_one(
    actix_test::TestRequest::post()
        .uri("/api/v1/posts/7d1c2e4a-1f0b-4c8e-9a3d-5b6f7e8d9c0a/reconcile")
)]
#[case::reconcile_all(
    actix_test::TestRequest::post().uri("/api/v1/admin/reconcile-response-counts")
)]
#[actix_web::test]
async fn farmer_cannot_reach_admin_routes(#[case] request: actix_test::TestRequest) {
    let mut ports = MockPorts::default();
    ports.deny_admin();
    ports.community.expect_record_verification().never();
    ports.community.expect_reconcile_response_count().never();
    ports.community.expect_reconcile_all_response_counts().never();

    let app = actix_test::init_service(test_app(ports)).await;
    let cookie = login_cookie(&app, &UserId::random()).await;
    let response = actix_test::call_service(&app, request.cookie(cookie).to_request()).await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body: Value = actix_test::read_body_json(response).await;
    assert_eq!(
        body.pointer("/details/code").and_then(Value::as_str),
        Some("forbidden")
    );
}

#[rstest]
#[actix_web::test]
async fn admin_reconciles_every_post() {
    let mut ports = MockPorts::default();
    ports.allow_admin();
    ports
        .community
        .expect_reconcile_all_response_counts()
        .times(1)
        .returning(|| {
            Ok(ReconciliationSummary {
                checked: 3,
                repaired: Vec::new(),
            })
        });

    let app = actix_test::init_service(test_app(ports)).await;
    let cookie = login_cookie(&app, &UserId::random()).await;
    let response = actix_test::call_service(
        &app,
        actix_test::TestRequest::post()
            .uri("/api/v1/admin/reconcile-response-counts")
            .cookie(cookie)
            .to_request(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = actix_test::read_body_json(response).await;
    assert_eq!(body.get("checked").and_then(Value::as_u64), Some(3));
}
