//! Test helpers for inbound HTTP components.

use actix_session::{SessionMiddleware, storage::CookieSessionStore};
use actix_web::body::MessageBody;
use actix_web::cookie::{Cookie, Key};
use actix_web::dev::{Service, ServiceResponse};
use actix_web::{HttpResponse, test, web};

use crate::domain::{Error, LearnerId};
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;
use crate::test_support::TestEngine;

/// Session middleware with a fresh key, cookie name `session` and the
/// `Secure` flag off for plain HTTP tests.
pub fn test_session_middleware() -> SessionMiddleware<CookieSessionStore> {
    SessionMiddleware::builder(CookieSessionStore::default(), Key::generate())
        .cookie_name("session".to_owned())
        .cookie_secure(false)
        .build()
}

/// Handler state over the engine's in-memory adapters.
pub fn engine_state(engine: &TestEngine) -> web::Data<HttpState> {
    web::Data::new(HttpState::from_ports(engine.ports(), engine.policy))
}

/// Test-only route storing the learner id from the path in the session.
pub async fn sign_in(
    session: SessionContext,
    path: web::Path<LearnerId>,
) -> Result<HttpResponse, Error> {
    session.persist_learner(path.into_inner())?;
    Ok(HttpResponse::NoContent().finish())
}

/// The `session` cookie set by a response.
pub fn session_cookie<B>(res: &ServiceResponse<B>) -> Cookie<'static> {
    res.response()
        .cookies()
        .find(|cookie| cookie.name() == "session")
        .expect("session cookie set")
        .into_owned()
}

/// Sign in through the `/test/sign-in/{id}` route and return the cookie.
pub async fn sign_in_cookie<S, B>(app: &S, learner_id: LearnerId) -> Cookie<'static>
where
    S: Service<actix_http::Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    let res = test::call_service(
        app,
        test::TestRequest::post()
            .uri(&format!("/test/sign-in/{learner_id}"))
            .to_request(),
    )
    .await;
    assert!(res.status().is_success(), "sign-in failed");
    session_cookie(&res)
}
