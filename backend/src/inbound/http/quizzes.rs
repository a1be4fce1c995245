//! Quiz HTTP handlers.
//!
//! ```text
//! GET  /api/v1/quizzes/{quiz_id}/eligibility?enrollmentId=
//! POST /api/v1/quizzes/{quiz_id}/attempts
//! GET  /api/v1/quizzes/{quiz_id}/attempts?enrollmentId=
//! ```

use actix_web::{get, post, web};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::domain::ports::{
    AttemptPayload, QuizEligibilityPayload, QuizRequest, QuizSubmissionPayload, SubmitQuizRequest,
};
use crate::domain::{Error, LearnerId, SubmittedAnswer};
use crate::inbound::http::ApiResult;
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{FieldName, non_negative, parse_id, parse_indexed_id};

/// Query string selecting the enrollment a quiz is taken through.
#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct EnrollmentQuery {
    /// Enrollment id.
    #[param(format = "uuid")]
    pub enrollment_id: String,
}

/// One chosen option.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnswerBody {
    #[schema(format = "uuid")]
    pub question_id: String,
    #[schema(format = "uuid")]
    pub option_id: String,
}

/// A quiz submission.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmitQuizBody {
    #[schema(format = "uuid")]
    pub enrollment_id: String,
    pub answers: Vec<AnswerBody>,
    pub time_spent_seconds: i32,
}

const QUESTION_ID: FieldName = FieldName::new("answers.questionId");
const OPTION_ID: FieldName = FieldName::new("answers.optionId");

fn quiz_request(
    learner_id: LearnerId,
    quiz_id: &str,
    enrollment_id: &str,
) -> Result<QuizRequest, Error> {
    Ok(QuizRequest {
        learner_id,
        quiz_id: parse_id(quiz_id, FieldName::new("quizId"))?,
        enrollment_id: parse_id(enrollment_id, FieldName::new("enrollmentId"))?,
    })
}

fn parse_answers(answers: &[AnswerBody]) -> Result<Vec<SubmittedAnswer>, Error> {
    answers
        .iter()
        .enumerate()
        .map(|(index, answer)| {
            Ok(SubmittedAnswer {
                question_id: parse_indexed_id(&answer.question_id, QUESTION_ID, index)?,
                option_id: parse_indexed_id(&answer.option_id, OPTION_ID, index)?,
            })
        })
        .collect()
}

/// Whether a new attempt may start now.
#[utoipa::path(
    get,
    path = "/api/v1/quizzes/{quiz_id}/eligibility",
    params(
        ("quiz_id" = String, Path, format = "uuid", description = "Quiz id"),
        EnrollmentQuery
    ),
    responses(
        (status = 200, description = "Gate state", body = QuizEligibilityPayload),
        (status = 400, description = "Invalid request", body = Error),
        (status = 401, description = "Unauthorized", body = Error),
        (status = 403, description = "Enrollment belongs to someone else", body = Error),
        (status = 404, description = "Unknown quiz or enrollment", body = Error)
    ),
    tags = ["quizzes"],
    operation_id = "quizEligibility",
    security(("SessionCookie" = []))
)]
#[get("/quizzes/{quiz_id}/eligibility")]
pub async fn quiz_eligibility(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
    query: web::Query<EnrollmentQuery>,
) -> ApiResult<web::Json<QuizEligibilityPayload>> {
    let request = quiz_request(session.require_learner_id()?, &path, &query.enrollment_id)?;
    Ok(web::Json(state.quizzes.eligibility(request).await?))
}

/// Grade a submission and record the attempt.
///
/// Failed attempts are still `200`; the body carries `nextAttemptAt`.
#[utoipa::path(
    post,
    path = "/api/v1/quizzes/{quiz_id}/attempts",
    params(("quiz_id" = String, Path, format = "uuid", description = "Quiz id")),
    request_body = SubmitQuizBody,
    responses(
        (status = 200, description = "Attempt graded", body = QuizSubmissionPayload),
        (status = 400, description = "Malformed answers or time limit exceeded", body = Error),
        (status = 401, description = "Unauthorized", body = Error),
        (status = 403, description = "Cooldown active or enrollment not owned", body = Error),
        (status = 404, description = "Unknown quiz or enrollment", body = Error),
        (status = 503, description = "Service unavailable", body = Error)
    ),
    tags = ["quizzes"],
    operation_id = "submitQuiz",
    security(("SessionCookie" = []))
)]
#[post("/quizzes/{quiz_id}/attempts")]
pub async fn submit_quiz(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
    payload: web::Json<SubmitQuizBody>,
) -> ApiResult<web::Json<QuizSubmissionPayload>> {
    let quiz = quiz_request(session.require_learner_id()?, &path, &payload.enrollment_id)?;
    let submission = state
        .quizzes
        .submit(SubmitQuizRequest {
            quiz,
            answers: parse_answers(&payload.answers)?,
            time_spent_seconds: non_negative(
                payload.time_spent_seconds,
                FieldName::new("timeSpentSeconds"),
            )?,
        })
        .await?;
    Ok(web::Json(submission))
}

/// Attempts on this quiz through one enrollment, newest first.
#[utoipa::path(
    get,
    path = "/api/v1/quizzes/{quiz_id}/attempts",
    params(
        ("quiz_id" = String, Path, format = "uuid", description = "Quiz id"),
        EnrollmentQuery
    ),
    responses(
        (status = 200, description = "Attempt history", body = [AttemptPayload]),
        (status = 400, description = "Invalid request", body = Error),
        (status = 401, description = "Unauthorized", body = Error),
        (status = 403, description = "Enrollment belongs to someone else", body = Error),
        (status = 404, description = "Unknown quiz or enrollment", body = Error)
    ),
    tags = ["quizzes"],
    operation_id = "quizAttempts",
    security(("SessionCookie" = []))
)]
#[get("/quizzes/{quiz_id}/attempts")]
pub async fn quiz_attempts(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
    query: web::Query<EnrollmentQuery>,
) -> ApiResult<web::Json<Vec<AttemptPayload>>> {
    let request = quiz_request(session.require_learner_id()?, &path, &query.enrollment_id)?;
    Ok(web::Json(state.quizzes.history(request).await?))
}

#[cfg(test)]
#[path = "quizzes_tests.rs"]
mod tests;
