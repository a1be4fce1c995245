//! OpenAPI documentation for the REST API.
//!
//! [`ApiDoc`] registers every handler path, the payload schemas they use and
//! the session cookie security scheme. Swagger UI serves it in debug builds
//! and `openapi-dump` prints it for external tooling.

use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::domain::ports::{
    AttemptPayload, CertificatePayload, CourseProgressPayload, EnrollResponse, EnrollmentPayload,
    LeaderboardEntryPayload, LessonCompletionPayload, LessonNodePayload, LessonProgressPayload,
    ModuleProgressPayload, QuizEligibilityPayload, QuizSubmissionPayload, ResumePayload,
    StreakPayload,
};
use crate::domain::{
    AccessReason, CallerRole, Error, ErrorCode, GradedAnswer, LessonAccess, LessonKind,
};
use crate::inbound::http::enrollments::EnrollRequestBody;
use crate::inbound::http::lessons::CompleteLessonBody;
use crate::inbound::http::quizzes::{AnswerBody, SubmitQuizBody};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi
            .components
            .get_or_insert_with(utoipa::openapi::Components::default);
        components.add_security_scheme(
            "SessionCookie",
            SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::with_description(
                "session",
                "Private session cookie carrying the learner id.",
            ))),
        );
    }
}

/// OpenAPI document for the learning progression API.
#[derive(OpenApi)]
#[openapi(
    modifiers(&SecurityAddon),
    info(
        title = "Learning progression API",
        description = "Enrollment, lesson unlocking, quiz grading, streaks and certificates."
    ),
    servers((url = "/", description = "Relative to the deployment base URL")),
    security(("SessionCookie" = [])),
    paths(
        crate::inbound::http::enrollments::enroll,
        crate::inbound::http::enrollments::list_enrollments,
        crate::inbound::http::lessons::course_progress,
        crate::inbound::http::lessons::resume_course,
        crate::inbound::http::lessons::lesson_access,
        crate::inbound::http::lessons::complete_lesson,
        crate::inbound::http::lessons::lesson_progress,
        crate::inbound::http::quizzes::quiz_eligibility,
        crate::inbound::http::quizzes::submit_quiz,
        crate::inbound::http::quizzes::quiz_attempts,
        crate::inbound::http::engagement::current_streak,
        crate::inbound::http::engagement::leaderboard,
        crate::inbound::http::certificates::get_certificate,
        crate::inbound::http::certificates::download_certificate,
        crate::inbound::http::health::ready,
        crate::inbound::http::health::live,
    ),
    components(schemas(
        Error,
        ErrorCode,
        EnrollRequestBody,
        EnrollResponse,
        EnrollmentPayload,
        CompleteLessonBody,
        LessonCompletionPayload,
        LessonProgressPayload,
        LessonAccess,
        AccessReason,
        LessonKind,
        CourseProgressPayload,
        ModuleProgressPayload,
        LessonNodePayload,
        ResumePayload,
        SubmitQuizBody,
        AnswerBody,
        QuizEligibilityPayload,
        QuizSubmissionPayload,
        AttemptPayload,
        GradedAnswer,
        CallerRole,
        StreakPayload,
        LeaderboardEntryPayload,
        CertificatePayload,
    )),
    tags(
        (name = "enrollments", description = "Admission and enrollment listing"),
        (name = "progress", description = "Course progress and resume pointer"),
        (name = "lessons", description = "Lesson access and completion"),
        (name = "quizzes", description = "Quiz gate, grading and history"),
        (name = "engagement", description = "Streaks and leaderboard"),
        (name = "certificates", description = "Certificate read and download"),
        (name = "health", description = "Endpoints for health checks")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use utoipa::openapi::RefOr;
    use utoipa::openapi::schema::Schema;

    fn property_names(schema_name: &str) -> Vec<String> {
        let doc = ApiDoc::openapi();
        let schema = doc
            .components
            .as_ref()
            .and_then(|components| components.schemas.get(schema_name))
            .unwrap_or_else(|| panic!("schema {schema_name} missing"));
        match schema {
            RefOr::T(Schema::Object(object)) => object.properties.keys().cloned().collect(),
            _ => panic!("schema {schema_name} is not an inline object"),
        }
    }

    #[rstest]
    #[case("/api/v1/enrollments")]
    #[case("/api/v1/courses/{course_id}/lessons/{lesson_id}/complete")]
    #[case("/api/v1/quizzes/{quiz_id}/attempts")]
    #[case("/api/v1/leaderboard")]
    #[case("/api/v1/certificates/{certificate_id}/download")]
    #[case("/health/ready")]
    fn documents_every_route(#[case] path: &str) {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key(path), "missing path {path}");
    }

    #[rstest]
    #[case("Error", &["code", "message"])]
    #[case("SubmitQuizBody", &["enrollmentId", "answers", "timeSpentSeconds"])]
    #[case("LessonCompletionPayload", &["progressPercent", "certificateId", "streakDays"])]
    fn schemas_use_camel_case_fields(#[case] schema: &str, #[case] expected: &[&str]) {
        let names = property_names(schema);
        for field in expected {
            assert!(names.iter().any(|name| name == field), "{schema} lacks {field}");
        }
    }

    #[rstest]
    fn session_cookie_scheme_is_registered() {
        let doc = ApiDoc::openapi();
        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("SessionCookie"));
    }
}
