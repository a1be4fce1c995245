//! Renderer and notifier doubles that remember what they were asked to do.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use crate::domain::CertificateId;
use crate::domain::ports::{
    CertificateFile, CertificateRenderError, CertificateRenderRequest, CertificateRenderer,
    Notification, NotificationDispatcher, NotificationError, RenderedCertificate,
};

#[derive(Default)]
pub struct RecordingCertificateRenderer {
    renders: AtomicUsize,
    fail_next: AtomicBool,
    documents: Mutex<HashMap<CertificateId, String>>,
}

impl RecordingCertificateRenderer {
    pub fn render_count(&self) -> usize {
        self.renders.load(Ordering::SeqCst)
    }

    /// Make the next render fail.
    pub fn fail_next(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    fn document(request: &CertificateRenderRequest) -> String {
        format!(
            "{} completed {} on {}",
            request.learner_name,
            request.course_title,
            request.issued_at.date_naive()
        )
    }
}

#[async_trait]
impl CertificateRenderer for RecordingCertificateRenderer {
    async fn render(
        &self,
        request: &CertificateRenderRequest,
    ) -> Result<RenderedCertificate, CertificateRenderError> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(CertificateRenderError::render("renderer told to fail"));
        }
        self.renders.fetch_add(1, Ordering::SeqCst);
        self.documents
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(request.certificate_id, Self::document(request));
        Ok(RenderedCertificate {
            document_location: format!("memory://certificates/{}", request.certificate_id),
        })
    }

    async fn download(
        &self,
        request: &CertificateRenderRequest,
    ) -> Result<CertificateFile, CertificateRenderError> {
        let body = self
            .documents
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(request.certificate_id)
            .or_insert_with(|| Self::document(request))
            .clone();
        let bytes = body.into_bytes();
        Ok(CertificateFile {
            file_name: format!("certificate-{}.txt", request.certificate_id),
            content_type: "text/plain; charset=utf-8".to_owned(),
            digest: hex::encode(Sha256::digest(&bytes)),
            bytes,
        })
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<Notification> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn subjects(&self) -> Vec<String> {
        self.sent()
            .into_iter()
            .map(|notification| notification.subject)
            .collect()
    }
}

#[async_trait]
impl NotificationDispatcher for RecordingNotifier {
    async fn dispatch(&self, notification: Notification) -> Result<(), NotificationError> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(notification);
        Ok(())
    }
}
