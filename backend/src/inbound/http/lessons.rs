//! Course progress and lesson HTTP handlers.
//!
//! ```text
//! GET  /api/v1/courses/{course_id}/progress
//! GET  /api/v1/courses/{course_id}/resume
//! GET  /api/v1/courses/{course_id}/lessons/{lesson_id}/access
//! POST /api/v1/courses/{course_id}/lessons/{lesson_id}/complete
//! GET  /api/v1/courses/{course_id}/lessons/{lesson_id}/progress
//! ```

use actix_web::{get, post, web};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::ports::{
    CompleteLessonRequest, CourseProgressPayload, CourseRequest, LessonCompletionPayload,
    LessonProgressPayload, LessonRequest, ResumePayload,
};
use crate::domain::{Error, LearnerId, LessonAccess};
use crate::inbound::http::ApiResult;
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{FieldName, non_negative, parse_id};

/// Body for marking a lesson finished.
///
/// Videos are judged on `watchedSeconds`; readings need `finished`.
#[derive(Debug, Default, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CompleteLessonBody {
    #[serde(default)]
    pub watched_seconds: i32,
    #[serde(default)]
    pub finished: bool,
}

fn course_request(learner_id: LearnerId, course_id: &str) -> Result<CourseRequest, Error> {
    Ok(CourseRequest {
        learner_id,
        course_id: parse_id(course_id, FieldName::new("courseId"))?,
    })
}

fn lesson_request(
    learner_id: LearnerId,
    (course_id, lesson_id): &(String, String),
) -> Result<LessonRequest, Error> {
    Ok(LessonRequest {
        learner_id,
        course_id: parse_id(course_id, FieldName::new("courseId"))?,
        lesson_id: parse_id(lesson_id, FieldName::new("lessonId"))?,
    })
}

/// Modules and lessons of a course with completion and unlock state.
#[utoipa::path(
    get,
    path = "/api/v1/courses/{course_id}/progress",
    params(("course_id" = String, Path, format = "uuid", description = "Course id")),
    responses(
        (status = 200, description = "Course progress", body = CourseProgressPayload),
        (status = 400, description = "Invalid request", body = Error),
        (status = 401, description = "Unauthorized", body = Error),
        (status = 403, description = "Not enrolled", body = Error),
        (status = 404, description = "Unknown course", body = Error)
    ),
    tags = ["progress"],
    operation_id = "courseProgress",
    security(("SessionCookie" = []))
)]
#[get("/courses/{course_id}/progress")]
pub async fn course_progress(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<web::Json<CourseProgressPayload>> {
    let request = course_request(session.require_learner_id()?, &path)?;
    Ok(web::Json(state.lessons.course_progress(request).await?))
}

/// Lesson the learner should continue with.
#[utoipa::path(
    get,
    path = "/api/v1/courses/{course_id}/resume",
    params(("course_id" = String, Path, format = "uuid", description = "Course id")),
    responses(
        (status = 200, description = "Resume pointer", body = ResumePayload),
        (status = 400, description = "Invalid request", body = Error),
        (status = 401, description = "Unauthorized", body = Error),
        (status = 403, description = "Not enrolled", body = Error),
        (status = 404, description = "Unknown course", body = Error)
    ),
    tags = ["progress"],
    operation_id = "resumeCourse",
    security(("SessionCookie" = []))
)]
#[get("/courses/{course_id}/resume")]
pub async fn resume_course(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<web::Json<ResumePayload>> {
    let request = course_request(session.require_learner_id()?, &path)?;
    Ok(web::Json(state.lessons.resume(request).await?))
}

/// Whether the learner may open the lesson now.
///
/// A refusal by the unlock chain is a `200` with `granted: false`; missing
/// enrollment or subscription coverage is an error.
#[utoipa::path(
    get,
    path = "/api/v1/courses/{course_id}/lessons/{lesson_id}/access",
    params(
        ("course_id" = String, Path, format = "uuid", description = "Course id"),
        ("lesson_id" = String, Path, format = "uuid", description = "Lesson id")
    ),
    responses(
        (status = 200, description = "Access decision", body = LessonAccess),
        (status = 400, description = "Invalid request", body = Error),
        (status = 401, description = "Unauthorized", body = Error),
        (status = 403, description = "Enrollment or subscription missing", body = Error),
        (status = 404, description = "Unknown course or lesson", body = Error)
    ),
    tags = ["lessons"],
    operation_id = "lessonAccess",
    security(("SessionCookie" = []))
)]
#[get("/courses/{course_id}/lessons/{lesson_id}/access")]
pub async fn lesson_access(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<(String, String)>,
) -> ApiResult<web::Json<LessonAccess>> {
    let request = lesson_request(session.require_learner_id()?, &path)?;
    Ok(web::Json(state.lessons.check_access(request).await?))
}

/// Record a lesson as finished.
#[utoipa::path(
    post,
    path = "/api/v1/courses/{course_id}/lessons/{lesson_id}/complete",
    params(
        ("course_id" = String, Path, format = "uuid", description = "Course id"),
        ("lesson_id" = String, Path, format = "uuid", description = "Lesson id")
    ),
    request_body = CompleteLessonBody,
    responses(
        (status = 200, description = "Completion recorded", body = LessonCompletionPayload),
        (status = 400, description = "Not enough watched or invalid lesson", body = Error),
        (status = 401, description = "Unauthorized", body = Error),
        (status = 403, description = "Lesson locked or not enrolled", body = Error),
        (status = 404, description = "Unknown course or lesson", body = Error),
        (status = 503, description = "Service unavailable", body = Error)
    ),
    tags = ["lessons"],
    operation_id = "completeLesson",
    security(("SessionCookie" = []))
)]
#[post("/courses/{course_id}/lessons/{lesson_id}/complete")]
pub async fn complete_lesson(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<(String, String)>,
    payload: web::Json<CompleteLessonBody>,
) -> ApiResult<web::Json<LessonCompletionPayload>> {
    let lesson = lesson_request(session.require_learner_id()?, &path)?;
    let CompleteLessonBody {
        watched_seconds,
        finished,
    } = payload.into_inner();
    let completion = state
        .lessons
        .complete_lesson(CompleteLessonRequest {
            lesson,
            watched_seconds: non_negative(watched_seconds, FieldName::new("watchedSeconds"))?,
            finished,
        })
        .await?;
    Ok(web::Json(completion))
}

/// The learner's progress row for one lesson.
#[utoipa::path(
    get,
    path = "/api/v1/courses/{course_id}/lessons/{lesson_id}/progress",
    params(
        ("course_id" = String, Path, format = "uuid", description = "Course id"),
        ("lesson_id" = String, Path, format = "uuid", description = "Lesson id")
    ),
    responses(
        (status = 200, description = "Lesson progress", body = LessonProgressPayload),
        (status = 400, description = "Invalid request", body = Error),
        (status = 401, description = "Unauthorized", body = Error),
        (status = 403, description = "Not enrolled", body = Error),
        (status = 404, description = "Unknown course or lesson", body = Error)
    ),
    tags = ["lessons"],
    operation_id = "lessonProgress",
    security(("SessionCookie" = []))
)]
#[get("/courses/{course_id}/lessons/{lesson_id}/progress")]
pub async fn lesson_progress(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<(String, String)>,
) -> ApiResult<web::Json<LessonProgressPayload>> {
    let request = lesson_request(session.require_learner_id()?, &path)?;
    Ok(web::Json(state.lessons.lesson_progress(request).await?))
}

#[cfg(test)]
#[path = "lessons_tests.rs"]
mod tests;
