//! Test helpers for inbound HTTP components.

use std::sync::Arc;

use actix_session::{SessionMiddleware, storage::CookieSessionStore};
use actix_web::cookie::{Cookie, Key};
use actix_web::{HttpResponse, test, web};

use chrono::Utc;

use crate::domain::ports::{MockCommunityCommand, MockTrustCommand, MockTrustQuery};
use crate::domain::{Contributor, Error, TrustEngineError, UserId, UserRole};
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;

/// Path of the helper route that signs a caller in for tests.
pub const TEST_LOGIN_PATH: &str = "/test/login/{user_id}";

/// Build a session middleware configured for tests.
///
/// - Generates a fresh signing/encryption key per invocation.
/// - Sets the cookie name to `session` and disables the `Secure` flag for
///   local HTTP tests.
pub fn test_session_middleware() -> SessionMiddleware<CookieSessionStore> {
    SessionMiddleware::builder(CookieSessionStore::default(), Key::generate())
        .cookie_name("session".to_owned())
        .cookie_secure(false)
        .build()
}

/// Mock driving ports, converted into [`HttpState`] once expectations are set.
#[derive(Default)]
pub struct MockPorts {
    pub trust: MockTrustCommand,
    pub trust_query: MockTrustQuery,
    pub community: MockCommunityCommand,
}

impl MockPorts {
    /// Treat every signed-in caller as an admin.
    pub fn allow_admin(&mut self) {
        self.trust_query.expect_require_admin().returning(|user_id| {
            Ok(Contributor::register(user_id, "Admin", UserRole::Admin, Utc::now())
                .expect("valid contributor"))
        });
    }

    /// Reject every signed-in caller at the admin check.
    pub fn deny_admin(&mut self) {
        self.trust_query
            .expect_require_admin()
            .returning(|_| Err(TrustEngineError::forbidden("admin privileges required")));
    }

    pub fn into_state(self) -> web::Data<HttpState> {
        web::Data::new(HttpState::new(
            Arc::new(self.trust),
            Arc::new(self.trust_query),
            Arc::new(self.community),
        ))
    }
}

/// Handler behind [`TEST_LOGIN_PATH`].
pub async fn test_login(
    session: SessionContext,
    path: web::Path<String>,
) -> Result<HttpResponse, Error> {
    let id = path
        .into_inner()
        .parse::<UserId>()
        .map_err(|err| Error::invalid_request(err.to_string()))?;
    session.persist_user(&id)?;
    Ok(HttpResponse::Ok().finish())
}

/// Sign `user_id` in through [`TEST_LOGIN_PATH`] and return the cookie.
pub async fn login_cookie(
    app: &impl actix_web::dev::Service<
        actix_http::Request,
        Response = actix_web::dev::ServiceResponse,
        Error = actix_web::Error,
    >,
    user_id: &UserId,
) -> Cookie<'static> {
    let response = test::call_service(
        app,
        test::TestRequest::get()
            .uri(&format!("/test/login/{user_id}"))
            .to_request(),
    )
    .await;
    response
        .response()
        .cookies()
        .find(|cookie| cookie.name() == "session")
        .expect("session cookie set")
        .into_owned()
}
