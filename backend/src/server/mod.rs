//! Server construction and middleware wiring.

mod config;
mod state_builders;

pub use config::{ServerConfig, ServerSettings};

use state_builders::{build_http_state, storage_backend};

use actix_session::{
    SessionMiddleware,
    config::{CookieContentSecurity, PersistentSession},
    storage::CookieSessionStore,
};
use actix_web::cookie::{Key, SameSite};
use actix_web::dev::{Server, ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{App, HttpServer, web};

use krishilok::Trace;
#[cfg(debug_assertions)]
use krishilok::doc::ApiDoc;
use krishilok::inbound::http::community::{
    accept_response, add_response, create_post, list_posts, reconcile_all, reconcile_post,
    record_verification, remove_response, view_post,
};
use krishilok::inbound::http::contributors::{
    leaderboard, rebuild_all, rebuild_contributor, register_contributor,
};
use krishilok::inbound::http::error::{json_error_handler, path_error_handler, query_error_handler};
use krishilok::inbound::http::follow_ups::{cancel_follow_up, due_follow_ups};
use krishilok::inbound::http::health::{HealthState, live, ready};
use krishilok::inbound::http::state::HttpState;
use krishilok::inbound::http::suggestions::{
    rank_suggestions, rebuild_suggestion, record_feedback, submit_suggestion,
};
#[cfg(debug_assertions)]
use utoipa::OpenApi;
#[cfg(debug_assertions)]
use utoipa_swagger_ui::SwaggerUi;

#[derive(Clone)]
struct AppDependencies {
    health_state: web::Data<HealthState>,
    http_state: web::Data<HttpState>,
    key: Key,
    cookie_secure: bool,
    same_site: SameSite,
}

fn build_app(
    deps: AppDependencies,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    let AppDependencies {
        health_state,
        http_state,
        key,
        cookie_secure,
        same_site,
    } = deps;

    let session = SessionMiddleware::builder(CookieSessionStore::default(), key)
        .cookie_name("session".into())
        .cookie_path("/".into())
        .cookie_secure(cookie_secure)
        .cookie_http_only(true)
        .cookie_content_security(CookieContentSecurity::Private)
        .cookie_same_site(same_site)
        .session_lifecycle(
            PersistentSession::default().session_ttl(actix_web::cookie::time::Duration::hours(2)),
        )
        .build();

    let api = web::scope("/api/v1")
        .wrap(session)
        .service(submit_suggestion)
        .service(rank_suggestions)
        .service(record_feedback)
        .service(rebuild_suggestion)
        .service(register_contributor)
        .service(leaderboard)
        .service(rebuild_contributor)
        .service(rebuild_all)
        .service(list_posts)
        .service(create_post)
        .service(view_post)
        .service(add_response)
        .service(remove_response)
        .service(accept_response)
        .service(record_verification)
        .service(reconcile_post)
        .service(reconcile_all)
        .service(due_follow_ups)
        .service(cancel_follow_up);

    let app = App::new()
        .app_data(health_state)
        .app_data(http_state)
        .app_data(web::JsonConfig::default().error_handler(json_error_handler))
        .app_data(web::QueryConfig::default().error_handler(query_error_handler))
        .app_data(web::PathConfig::default().error_handler(path_error_handler))
        .wrap(Trace)
        .service(api)
        .service(ready)
        .service(live);

    #[cfg(debug_assertions)]
    let app = app.service(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()));
    #[cfg(not(debug_assertions))]
    let app = app;

    app
}

/// Construct the shared health state for `config`.
pub fn health_state_for(config: &ServerConfig) -> web::Data<HealthState> {
    web::Data::new(HealthState::new(storage_backend(config)))
}

/// Construct an Actix HTTP server using the provided health state and configuration.
///
/// # Errors
/// Propagates [`std::io::Error`] when binding the socket or starting the server fails.
pub fn create_server(
    health_state: web::Data<HealthState>,
    config: ServerConfig,
) -> std::io::Result<Server> {
    let server_health_state = health_state.clone();
    let http_state = build_http_state(&config);
    let ServerConfig {
        key,
        cookie_secure,
        same_site,
        bind_addr,
        ..
    } = config;

    let server = HttpServer::new(move || {
        build_app(AppDependencies {
            health_state: server_health_state.clone(),
            http_state: http_state.clone(),
            key: key.clone(),
            cookie_secure,
            same_site,
        })
    })
    .bind(bind_addr)?
    .run();

    health_state.mark_ready();
    Ok(server)
}
