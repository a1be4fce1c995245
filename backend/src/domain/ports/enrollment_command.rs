//! Driving ports for enrollment admission and listing.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::{
    CertificateId, CourseId, Enrollment, EnrollmentId, Error, LearnerId, LessonId,
};

/// Request to enroll a learner in a course.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnrollRequest {
    pub learner_id: LearnerId,
    pub course_id: CourseId,
}

/// Enrollment as returned to callers.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentPayload {
    pub enrollment_id: EnrollmentId,
    pub course_id: CourseId,
    pub course_title: String,
    pub started_at: DateTime<Utc>,
    pub progress_percent: f64,
    pub is_completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub last_lesson_id: Option<LessonId>,
    pub certificate_id: Option<CertificateId>,
    /// Average of best passing quiz attempts; only for completed courses.
    pub average_grade: Option<f64>,
}

impl EnrollmentPayload {
    pub fn from_enrollment(
        enrollment: &Enrollment,
        course_title: impl Into<String>,
        average_grade: Option<f64>,
    ) -> Self {
        Self {
            enrollment_id: enrollment.id,
            course_id: enrollment.course_id,
            course_title: course_title.into(),
            started_at: enrollment.started_at,
            progress_percent: enrollment.progress_percent,
            is_completed: enrollment.is_completed,
            completed_at: enrollment.completed_at,
            last_lesson_id: enrollment.last_lesson_id,
            certificate_id: enrollment.certificate_id,
            average_grade,
        }
    }
}

/// Response from an admission request.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EnrollResponse {
    pub enrollment: EnrollmentPayload,
    /// `false` when an existing active enrollment was returned.
    pub created: bool,
}

/// Driving port for enrollment admission.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EnrollmentCommand: Send + Sync {
    /// Enroll the learner, or return their existing active enrollment.
    ///
    /// Fails with `not_found` for unknown learners or courses and
    /// `forbidden` when the learner is inactive, unverified, without an
    /// active subscription, or on a trial already used for another course.
    async fn enroll(&self, request: EnrollRequest) -> Result<EnrollResponse, Error>;
}

/// Driving port listing a learner's enrollments.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EnrollmentQuery: Send + Sync {
    /// Active enrollments, oldest first.
    async fn list_enrollments(&self, learner_id: LearnerId)
    -> Result<Vec<EnrollmentPayload>, Error>;
}
