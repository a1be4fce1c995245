//! HTTP server assembly: session cookie, trace middleware, the `/api/v1`
//! routes and health probes.

mod config;
mod state_builders;

pub use config::ServerConfig;

use state_builders::build_http_state;

use actix_session::{
    SessionMiddleware,
    config::{CookieContentSecurity, PersistentSession},
    storage::CookieSessionStore,
};
use actix_web::cookie::{Key, SameSite};
use actix_web::dev::{Server, ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{App, HttpServer, web};

use lms_backend::Trace;
#[cfg(debug_assertions)]
use lms_backend::doc::ApiDoc;
use lms_backend::inbound::http::certificates::{download_certificate, get_certificate};
use lms_backend::inbound::http::engagement::{current_streak, leaderboard};
use lms_backend::inbound::http::enrollments::{enroll, list_enrollments};
use lms_backend::inbound::http::health::{HealthState, live, ready};
use lms_backend::inbound::http::lessons::{
    complete_lesson, course_progress, lesson_access, lesson_progress, resume_course,
};
use lms_backend::inbound::http::quizzes::{quiz_attempts, quiz_eligibility, submit_quiz};
use lms_backend::inbound::http::state::HttpState;
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
        .service(enroll)
        .service(list_enrollments)
        .service(course_progress)
        .service(resume_course)
        .service(lesson_access)
        .service(complete_lesson)
        .service(lesson_progress)
        .service(quiz_eligibility)
        .service(submit_quiz)
        .service(quiz_attempts)
        .service(current_streak)
        .service(leaderboard)
        .service(get_certificate)
        .service(download_certificate);

    let app = App::new()
        .app_data(health_state)
        .app_data(http_state)
        .wrap(Trace)
        .service(api)
        .service(ready)
        .service(live);

    #[cfg(debug_assertions)]
    let app = app.service(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()));

    app
}

/// Bind the progression API and start serving it.
///
/// Adapters are built once from `config` and shared by every worker. The
/// health state flips to ready as soon as the listener is bound.
///
/// # Errors
/// The certificate directory or webhook client cannot be set up, or the
/// address cannot be bound.
pub fn create_server(
    health_state: web::Data<HealthState>,
    config: ServerConfig,
) -> std::io::Result<Server> {
    let server_health_state = health_state.clone();
    let http_state = build_http_state(&config)?;
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
