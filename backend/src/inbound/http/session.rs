//! Caller identity for HTTP handlers.
//!
//! Sign-in itself lives in the account subsystem. Handlers only need the
//! caller's [`UserId`], which rides in the signed session cookie, and for
//! maintenance routes a role check against the stored contributor profile.

use actix_session::Session;
use actix_web::{FromRequest, HttpRequest, dev::Payload};
use futures_util::future::LocalBoxFuture;
use tracing::warn;

use crate::domain::ports::TrustQuery;
use crate::domain::{Error, UserId};

pub(crate) const USER_ID_KEY: &str = "user_id";

/// The caller's session, as seen by handlers.
#[derive(Clone)]
pub struct SessionContext(Session);

impl SessionContext {
    pub fn new(session: Session) -> Self {
        Self(session)
    }

    /// Bind `user_id` to the session cookie.
    pub fn persist_user(&self, user_id: &UserId) -> Result<(), Error> {
        self.0
            .insert(USER_ID_KEY, user_id.to_string())
            .map_err(|error| Error::internal(format!("failed to persist session: {error}")))
    }

    /// Caller id carried by the cookie. A value that does not parse is
    /// treated as no caller.
    pub fn user_id(&self) -> Result<Option<UserId>, Error> {
        let Some(raw) = self
            .0
            .get::<String>(USER_ID_KEY)
            .map_err(|error| Error::internal(format!("failed to read session: {error}")))?
        else {
            return Ok(None);
        };
        Ok(raw
            .parse::<UserId>()
            .inspect_err(|error| warn!(%error, "ignoring unparsable user id in session"))
            .ok())
    }

    /// `401 Unauthorized` unless a caller is signed in.
    pub fn require_user_id(&self) -> Result<UserId, Error> {
        self.user_id()?
            .ok_or_else(|| Error::unauthorized("login required"))
    }

    /// Signed-in caller whose stored role is admin.
    ///
    /// Anonymous callers get `401`. Known callers with any other role, and
    /// ids with no profile, get `403`.
    pub async fn require_admin(&self, trust_query: &dyn TrustQuery) -> Result<UserId, Error> {
        let user_id = self.require_user_id()?;
        trust_query.require_admin(user_id).await?;
        Ok(user_id)
    }
}

impl FromRequest for SessionContext {
    type Error = actix_web::Error;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, payload: &mut Payload) -> Self::Future {
        let fut = Session::from_request(req, payload);
        Box::pin(async move { fut.await.map(SessionContext::new) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::cookie::Cookie;
    use actix_web::dev::ServiceResponse;
    use actix_web::http::StatusCode;
    use actix_web::{App, HttpResponse, test, web};
    use chrono::Utc;

    use crate::domain::{Contributor, TrustEngineError, UserRole};
    use crate::inbound::http::state::HttpState;
    use crate::inbound::http::test_utils::{
        MockPorts, TEST_LOGIN_PATH, login_cookie, test_login, test_session_middleware,
    };

    const CALLER: &str = "5b0c3f7e-2a51-4d8e-9a52-0f3c7b9e1d24";

    async fn whoami(session: SessionContext) -> Result<HttpResponse, Error> {
        let id = session.require_user_id()?;
        Ok(HttpResponse::Ok().body(id.to_string()))
    }

    async fn maintenance(
        state: web::Data<HttpState>,
        session: SessionContext,
    ) -> Result<HttpResponse, Error> {
        let id = session.require_admin(state.trust_query.as_ref()).await?;
        Ok(HttpResponse::Ok().body(id.to_string()))
    }

    fn session_cookie(response: &ServiceResponse) -> Cookie<'static> {
        response
            .response()
            .cookies()
            .find(|cookie| cookie.name() == "session")
            .expect("session cookie set")
            .into_owned()
    }

    #[actix_web::test]
    async fn round_trips_user_id() {
        let app = test::init_service(
            App::new()
                .wrap(test_session_middleware())
                .route(TEST_LOGIN_PATH, web::get().to(test_login))
                .route("/whoami", web::get().to(whoami)),
        )
        .await;
        let caller: UserId = CALLER.parse().expect("fixture id");

        let cookie = login_cookie(&app, &caller).await;
        let res = test::call_service(
            &app,
            test::TestRequest::get().uri("/whoami").cookie(cookie).to_request(),
        )
        .await;

        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(test::read_body(res).await, CALLER);
    }

    #[actix_web::test]
    async fn missing_user_is_unauthorised() {
        let app = test::init_service(
            App::new()
                .wrap(test_session_middleware())
                .route("/whoami", web::get().to(whoami)),
        )
        .await;

        let res =
            test::call_service(&app, test::TestRequest::get().uri("/whoami").to_request()).await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn tampered_user_id_is_unauthorised() {
        let app = test::init_service(
            App::new()
                .wrap(test_session_middleware())
                .route(
                    "/set-invalid",
                    web::get().to(|session: Session| async move {
                        session
                            .insert(USER_ID_KEY, "not-a-uuid")
                            .expect("set invalid user id");
                        HttpResponse::Ok()
                    }),
                )
                .route("/whoami", web::get().to(whoami)),
        )
        .await;

        let set_res = test::call_service(
            &app,
            test::TestRequest::get().uri("/set-invalid").to_request(),
        )
        .await;
        let res = test::call_service(
            &app,
            test::TestRequest::get()
                .uri("/whoami")
                .cookie(session_cookie(&set_res))
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn anonymous_caller_never_reaches_role_check() {
        let mut ports = MockPorts::default();
        ports.trust_query.expect_require_admin().never();
        let app = test::init_service(
            App::new()
                .app_data(ports.into_state())
                .wrap(test_session_middleware())
                .route("/maintenance", web::post().to(maintenance)),
        )
        .await;

        let res = test::call_service(
            &app,
            test::TestRequest::post().uri("/maintenance").to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn farmer_is_forbidden_from_maintenance() {
        let farmer = UserId::random();
        let mut ports = MockPorts::default();
        ports
            .trust_query
            .expect_require_admin()
            .withf(move |id| *id == farmer)
            .return_once(|_| Err(TrustEngineError::forbidden("admin privileges required")));
        let app = test::init_service(
            App::new()
                .app_data(ports.into_state())
                .wrap(test_session_middleware())
                .route(TEST_LOGIN_PATH, web::get().to(test_login))
                .route("/maintenance", web::post().to(maintenance)),
        )
        .await;

        let cookie = login_cookie(&app, &farmer).await;
        let res = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/maintenance")
                .cookie(cookie)
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
    }

    #[actix_web::test]
    async fn admin_passes_role_check() {
        let admin = Contributor::register(UserId::random(), "Priya", UserRole::Admin, Utc::now())
            .expect("valid contributor");
        let admin_id = admin.id;
        let mut ports = MockPorts::default();
        ports
            .trust_query
            .expect_require_admin()
            .return_once(move |_| Ok(admin));
        let app = test::init_service(
            App::new()
                .app_data(ports.into_state())
                .wrap(test_session_middleware())
                .route(TEST_LOGIN_PATH, web::get().to(test_login))
                .route("/maintenance", web::post().to(maintenance)),
        )
        .await;

        let cookie = login_cookie(&app, &admin_id).await;
        let res = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/maintenance")
                .cookie(cookie)
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(test::read_body(res).await, admin_id.to_string());
    }
}
