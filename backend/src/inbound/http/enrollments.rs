//! Enrollment HTTP handlers.
//!
//! ```text
//! POST /api/v1/enrollments
//! GET  /api/v1/enrollments
//! ```

use actix_web::{HttpResponse, get, post, web};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::Error;
use crate::domain::ports::{EnrollRequest, EnrollResponse, EnrollmentPayload};
use crate::inbound::http::ApiResult;
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{FieldName, parse_id};

/// Request body for enrolling in a course.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EnrollRequestBody {
    #[schema(format = "uuid")]
    pub course_id: String,
}

/// Enroll the signed-in learner in a course.
///
/// Responds `201 Created` for a new enrollment and `200 OK` when the learner
/// was already enrolled.
#[utoipa::path(
    post,
    path = "/api/v1/enrollments",
    request_body = EnrollRequestBody,
    responses(
        (status = 201, description = "Enrollment created", body = EnrollResponse),
        (status = 200, description = "Existing enrollment returned", body = EnrollResponse),
        (status = 400, description = "Invalid request", body = Error),
        (status = 401, description = "Unauthorized", body = Error),
        (status = 403, description = "Admission refused", body = Error),
        (status = 404, description = "Unknown learner or course", body = Error),
        (status = 503, description = "Service unavailable", body = Error)
    ),
    tags = ["enrollments"],
    operation_id = "enroll",
    security(("SessionCookie" = []))
)]
#[post("/enrollments")]
pub async fn enroll(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<EnrollRequestBody>,
) -> ApiResult<HttpResponse> {
    let learner_id = session.require_learner_id()?;
    let course_id = parse_id(&payload.course_id, FieldName::new("courseId"))?;
    let response = state
        .enrollments
        .enroll(EnrollRequest {
            learner_id,
            course_id,
        })
        .await?;
    let mut builder = if response.created {
        HttpResponse::Created()
    } else {
        HttpResponse::Ok()
    };
    Ok(builder.json(response))
}

/// Active enrollments of the signed-in learner, oldest first.
#[utoipa::path(
    get,
    path = "/api/v1/enrollments",
    responses(
        (status = 200, description = "Enrollments", body = [EnrollmentPayload]),
        (status = 401, description = "Unauthorized", body = Error),
        (status = 503, description = "Service unavailable", body = Error)
    ),
    tags = ["enrollments"],
    operation_id = "listEnrollments",
    security(("SessionCookie" = []))
)]
#[get("/enrollments")]
pub async fn list_enrollments(
    state: web::Data<HttpState>,
    session: SessionContext,
) -> ApiResult<web::Json<Vec<EnrollmentPayload>>> {
    let learner_id = session.require_learner_id()?;
    let enrollments = state.enrollments_query.list_enrollments(learner_id).await?;
    Ok(web::Json(enrollments))
}
