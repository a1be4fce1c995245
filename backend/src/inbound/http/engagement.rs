//! Streak and leaderboard HTTP handlers.
//!
//! ```text
//! GET /api/v1/streak
//! GET /api/v1/leaderboard?top=
//! ```

use actix_web::{get, web};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::domain::Error;
use crate::domain::ports::{LeaderboardEntryPayload, StreakPayload};
use crate::inbound::http::ApiResult;
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;

const DEFAULT_LEADERBOARD_SIZE: i64 = 10;

/// Leaderboard query string.
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct LeaderboardQuery {
    /// Number of learners to return, 1 to 1000. Defaults to 10.
    pub top: Option<i64>,
}

/// The signed-in learner's daily streak.
#[utoipa::path(
    get,
    path = "/api/v1/streak",
    responses(
        (status = 200, description = "Current streak", body = StreakPayload),
        (status = 401, description = "Unauthorized", body = Error)
    ),
    tags = ["engagement"],
    operation_id = "currentStreak",
    security(("SessionCookie" = []))
)]
#[get("/streak")]
pub async fn current_streak(
    state: web::Data<HttpState>,
    session: SessionContext,
) -> ApiResult<web::Json<StreakPayload>> {
    let learner_id = session.require_learner_id()?;
    Ok(web::Json(state.engagement.streak(learner_id).await?))
}

/// Learners ranked by completed courses, then streak.
#[utoipa::path(
    get,
    path = "/api/v1/leaderboard",
    params(LeaderboardQuery),
    responses(
        (status = 200, description = "Leaderboard", body = [LeaderboardEntryPayload]),
        (status = 400, description = "Size out of range", body = Error),
        (status = 401, description = "Unauthorized", body = Error)
    ),
    tags = ["engagement"],
    operation_id = "leaderboard",
    security(("SessionCookie" = []))
)]
#[get("/leaderboard")]
pub async fn leaderboard(
    state: web::Data<HttpState>,
    session: SessionContext,
    query: web::Query<LeaderboardQuery>,
) -> ApiResult<web::Json<Vec<LeaderboardEntryPayload>>> {
    session.require_learner_id()?;
    let top = query.top.unwrap_or(DEFAULT_LEADERBOARD_SIZE);
    Ok(web::Json(state.engagement.leaderboard(top).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::StatusCode;
    use actix_web::{App, test};
    use rstest::rstest;
    use serde_json::Value;

    use crate::domain::LearnerStreak;
    use crate::inbound::http::test_utils::{
        engine_state, sign_in, sign_in_cookie, test_session_middleware,
    };
    use crate::test_support::TestEngine;
    use crate::test_support::fixtures::CourseBuilder;

    macro_rules! engagement_app {
        ($engine:expr) => {
            test::init_service(
                App::new()
                    .app_data(engine_state($engine))
                    .wrap(test_session_middleware())
                    .route("/test/sign-in/{id}", web::post().to(sign_in))
                    .service(
                        web::scope("/api/v1")
                            .service(current_streak)
                            .service(leaderboard),
                    ),
            )
            .await
        };
    }

    #[actix_web::test]
    async fn streak_reports_days_and_message() {
        let engine = TestEngine::new();
        let learner = engine.add_learner("Daily");
        engine.store.seed_streak(&LearnerStreak {
            learner_id: learner.id,
            current_streak_days: 7,
            last_active_at: engine.now(),
        });
        let app = engagement_app!(&engine);
        let cookie = sign_in_cookie(&app, learner.id).await;

        let res = test::call_service(
            &app,
            test::TestRequest::get().uri("/api/v1/streak").cookie(cookie).to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::OK);
        let streak: Value = test::read_body_json(res).await;
        assert_eq!(streak["currentStreakDays"], 7);
        assert!(streak["message"].as_str().is_some_and(|text| !text.is_empty()));
    }

    #[actix_web::test]
    async fn leaderboard_defaults_to_ten_entries() {
        let engine = TestEngine::new();
        let course = engine.add_course(CourseBuilder::new("Popular").lessons(1));
        let viewer = engine.add_learner("Viewer");
        for index in 0..12 {
            let learner = engine.add_learner(&format!("Learner {index}"));
            engine.enroll(&learner, &course);
        }
        let app = engagement_app!(&engine);
        let cookie = sign_in_cookie(&app, viewer.id).await;

        let res = test::call_service(
            &app,
            test::TestRequest::get()
                .uri("/api/v1/leaderboard")
                .cookie(cookie)
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::OK);
        let board: Value = test::read_body_json(res).await;
        assert_eq!(board.as_array().map(Vec::len), Some(10));
        assert_eq!(board[0]["rank"], 1);
    }

    #[rstest]
    #[case("0")]
    #[case("1001")]
    #[actix_web::test]
    async fn leaderboard_size_out_of_range_is_a_bad_request(#[case] top: &str) {
        let engine = TestEngine::new();
        let viewer = engine.add_learner("Viewer");
        let app = engagement_app!(&engine);
        let cookie = sign_in_cookie(&app, viewer.id).await;

        let res = test::call_service(
            &app,
            test::TestRequest::get()
                .uri(&format!("/api/v1/leaderboard?top={top}"))
                .cookie(cookie)
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }
}
