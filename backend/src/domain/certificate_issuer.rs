//! Certificate issuance on course completion.
//!
//! The stored certificate row is the idempotency guard: once an enrollment
//! has one, issuing again returns it without rendering.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::info;

use super::ports::{CertificateRenderRequest, CertificateRenderer, LearningTx};
use super::{average_grade, Certificate, CertificateId, Course, Enrollment, Error, LearnerIdentity};

/// Issues certificates inside the caller's unit of work.
#[derive(Clone)]
pub struct CertificateIssuer {
    renderer: Arc<dyn CertificateRenderer>,
}

impl CertificateIssuer {
    pub fn new(renderer: Arc<dyn CertificateRenderer>) -> Self {
        Self { renderer }
    }

    /// Return the enrollment's certificate, issuing it on first call.
    ///
    /// `enrollment.certificate_id` is updated in memory; the caller persists
    /// the enrollment. A renderer failure is returned as an error so the
    /// surrounding unit of work rolls back.
    ///
    /// # Errors
    /// `forbidden` when the enrollment belongs to someone else,
    /// `invalid_request` when the course is not finished yet.
    pub async fn issue(
        &self,
        tx: &mut dyn LearningTx,
        learner: &LearnerIdentity,
        enrollment: &mut Enrollment,
        course: &Course,
        now: DateTime<Utc>,
    ) -> Result<Certificate, Error> {
        if enrollment.learner_id != learner.id {
            return Err(Error::forbidden("enrollment belongs to another learner"));
        }
        if !enrollment.is_fully_progressed() {
            return Err(Error::invalid_request(format!(
                "course is {}% complete; certificates require 100%",
                enrollment.progress_percent
            )));
        }

        if let Some(existing) = tx.find_certificate_for_enrollment(enrollment.id).await? {
            enrollment.certificate_id = Some(existing.id);
            return Ok(existing);
        }

        let attempts = tx.list_enrollment_attempts(enrollment.id).await?;
        let request = CertificateRenderRequest {
            certificate_id: CertificateId::random(),
            learner_name: learner.full_name.clone(),
            course_title: course.title.clone(),
            issued_at: now,
            average_grade: average_grade(&attempts),
        };
        let rendered = self.renderer.render(&request).await?;

        let candidate = Certificate {
            id: request.certificate_id,
            enrollment_id: enrollment.id,
            learner_id: enrollment.learner_id,
            course_id: enrollment.course_id,
            issued_at: now,
            document_location: rendered.document_location,
            average_grade: request.average_grade,
        };
        let certificate = if tx.insert_certificate(&candidate).await? {
            info!(
                enrollment_id = %enrollment.id,
                certificate_id = %candidate.id,
                "certificate issued"
            );
            candidate
        } else {
            tx.find_certificate_for_enrollment(enrollment.id)
                .await?
                .ok_or_else(|| Error::internal("certificate vanished after a conflicting insert"))?
        };
        enrollment.certificate_id = Some(certificate.id);
        Ok(certificate)
    }
}
