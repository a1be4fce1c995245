//! Port for producing certificate documents.
//!
//! Rendering the same certificate twice must be safe: adapters may produce a
//! new artefact, but its effect is the same as the first render.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::CertificateId;

use super::define_port_error;

define_port_error! {
    /// Errors raised by certificate renderers.
    pub enum CertificateRenderError {
        /// The document could not be produced or stored.
        Render { message: String } as InternalError =>
            "certificate rendering failed: {message}",
        /// No stored document exists and none could be produced.
        Missing { certificate_id: String } as NotFound =>
            "certificate document {certificate_id} is missing",
    }
}

/// Facts printed on a certificate.
#[derive(Debug, Clone, PartialEq)]
pub struct CertificateRenderRequest {
    pub certificate_id: CertificateId,
    pub learner_name: String,
    pub course_title: String,
    pub issued_at: DateTime<Utc>,
    pub average_grade: Option<f64>,
}

/// Where a rendered document was stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedCertificate {
    pub document_location: String,
}

/// A downloadable certificate file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
    /// Hex SHA-256 of `bytes`.
    pub digest: String,
}

/// Port rendering certificate documents and serving them for download.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CertificateRenderer: Send + Sync {
    /// Produce and store the document for a certificate.
    async fn render(
        &self,
        request: &CertificateRenderRequest,
    ) -> Result<RenderedCertificate, CertificateRenderError>;

    /// Return the stored document, rendering it again when it has gone.
    async fn download(
        &self,
        request: &CertificateRenderRequest,
    ) -> Result<CertificateFile, CertificateRenderError>;
}
