//! Certificate reads and downloads.

use async_trait::async_trait;
use tracing::debug;

use crate::domain::ports::{
    CertificateFile, CertificatePayload, CertificateQuery, CertificateRenderRequest,
    CertificateRequest, LearningStore, require_active_learner,
};
use crate::domain::{Error, LearnerRole, ProgressionPorts};

/// Certificate service implementing [`CertificateQuery`].
pub struct CertificateService<S> {
    ports: ProgressionPorts<S>,
}

impl<S> Clone for CertificateService<S> {
    fn clone(&self) -> Self {
        Self {
            ports: self.ports.clone(),
        }
    }
}

impl<S> CertificateService<S>
where
    S: LearningStore,
{
    pub fn new(ports: ProgressionPorts<S>) -> Self {
        Self { ports }
    }

    /// Load the certificate the caller is allowed to see.
    async fn visible_certificate(
        &self,
        request: CertificateRequest,
    ) -> Result<CertificatePayload, Error> {
        let CertificateRequest {
            learner_id,
            certificate_id,
        } = request;
        let caller = require_active_learner(self.ports.identities.as_ref(), &learner_id).await?;
        let (certificate, course_title) = self
            .ports
            .store
            .in_unit_of_work(move |tx| {
                Box::pin(async move {
                    let certificate = tx.find_certificate(certificate_id).await?.ok_or_else(|| {
                        Error::not_found(format!("certificate {certificate_id} not found"))
                    })?;
                    let course_title = tx
                        .find_course(certificate.course_id)
                        .await?
                        .map(|course| course.title)
                        .unwrap_or_default();
                    Ok((certificate, course_title))
                })
            })
            .await?;

        if certificate.learner_id != caller.id && !caller.has_role(LearnerRole::Admin) {
            debug!(%learner_id, %certificate_id, "certificate read denied");
            return Err(Error::forbidden("certificate belongs to another learner"));
        }

        let learner_name = if certificate.learner_id == caller.id {
            caller.full_name
        } else {
            self.ports
                .identities
                .find_learner(&certificate.learner_id)
                .await?
                .map(|owner| owner.full_name)
                .unwrap_or_default()
        };

        Ok(CertificatePayload {
            certificate_id: certificate.id,
            enrollment_id: certificate.enrollment_id,
            learner_id: certificate.learner_id,
            learner_name,
            course_id: certificate.course_id,
            course_title,
            issued_at: certificate.issued_at,
            average_grade: certificate.average_grade,
        })
    }
}

#[async_trait]
impl<S> CertificateQuery for CertificateService<S>
where
    S: LearningStore,
{
    async fn certificate(&self, request: CertificateRequest) -> Result<CertificatePayload, Error> {
        self.visible_certificate(request).await
    }

    async fn download(&self, request: CertificateRequest) -> Result<CertificateFile, Error> {
        let certificate = self.visible_certificate(request).await?;
        let render = CertificateRenderRequest {
            certificate_id: certificate.certificate_id,
            learner_name: certificate.learner_name,
            course_title: certificate.course_title,
            issued_at: certificate.issued_at,
            average_grade: certificate.average_grade,
        };
        Ok(self.ports.renderer.download(&render).await?)
    }
}

#[cfg(test)]
#[path = "certificate_service_tests.rs"]
mod tests;
