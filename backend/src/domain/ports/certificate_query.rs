//! Driving port for reading and downloading certificates.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::{CertificateId, CourseId, EnrollmentId, Error, LearnerId};

use super::CertificateFile;

/// A learner asking for a certificate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CertificateRequest {
    pub learner_id: LearnerId,
    pub certificate_id: CertificateId,
}

/// Certificate details.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CertificatePayload {
    pub certificate_id: CertificateId,
    pub enrollment_id: EnrollmentId,
    pub learner_id: LearnerId,
    pub learner_name: String,
    pub course_id: CourseId,
    pub course_title: String,
    pub issued_at: DateTime<Utc>,
    pub average_grade: Option<f64>,
}

/// Driving port for certificates. Only the owner or an administrator may
/// read a certificate.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CertificateQuery: Send + Sync {
    async fn certificate(&self, request: CertificateRequest) -> Result<CertificatePayload, Error>;

    async fn download(&self, request: CertificateRequest) -> Result<CertificateFile, Error>;
}
