//! HTML certificate renderer writing documents beneath a capability directory.
//!
//! Documents are named after the certificate id, so rendering the same
//! certificate again overwrites the same file.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use cap_std::{ambient_authority, fs::Dir};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{debug, info};

use crate::domain::CertificateId;
use crate::domain::ports::{
    CertificateFile, CertificateRenderError, CertificateRenderRequest, CertificateRenderer,
    RenderedCertificate,
};

const CONTENT_TYPE: &str = "text/html; charset=utf-8";

/// Errors raised while preparing the certificate directory.
#[derive(Debug, Error)]
pub enum RendererSetupError {
    #[error("failed to open certificate directory {path}: {source}")]
    OpenDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Escape text for inclusion in HTML element content and attributes.
fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}

fn file_name(certificate_id: CertificateId) -> String {
    format!("certificate-{certificate_id}.html")
}

fn render_document(request: &CertificateRenderRequest) -> String {
    let grade = request
        .average_grade
        .map(|grade| format!("\n    <p class=\"grade\">Average grade: {grade:.2}%</p>"))
        .unwrap_or_default();
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
  <head>
    <meta charset="utf-8">
    <title>Certificate of Completion</title>
  </head>
  <body>
    <h1>Certificate of Completion</h1>
    <p class="learner">{learner}</p>
    <p>has completed</p>
    <p class="course">{course}</p>
    <p class="issued">Issued {issued}</p>{grade}
    <p class="reference">Certificate {id}</p>
  </body>
</html>
"#,
        learner = escape_html(&request.learner_name),
        course = escape_html(&request.course_title),
        issued = request.issued_at.format("%Y-%m-%d"),
        id = request.certificate_id,
    )
}

fn render_failure(action: &str, error: impl std::fmt::Display) -> CertificateRenderError {
    CertificateRenderError::render(format!("{action}: {error}"))
}

/// Renders certificates as standalone HTML files.
#[derive(Clone)]
pub struct HtmlCertificateRenderer {
    dir: Arc<Dir>,
    root: PathBuf,
}

impl HtmlCertificateRenderer {
    /// Open (creating when needed) the directory documents are written to.
    ///
    /// # Errors
    /// [`RendererSetupError::OpenDir`] when the directory cannot be created
    /// or opened.
    pub fn open(root: impl AsRef<Path>) -> Result<Self, RendererSetupError> {
        let root = root.as_ref().to_path_buf();
        let open_error = |source| RendererSetupError::OpenDir {
            path: root.clone(),
            source,
        };
        Dir::create_ambient_dir_all(&root, ambient_authority()).map_err(open_error)?;
        let dir = Dir::open_ambient_dir(&root, ambient_authority()).map_err(open_error)?;
        Ok(Self {
            dir: Arc::new(dir),
            root,
        })
    }

    fn location(&self, certificate_id: CertificateId) -> String {
        self.root.join(file_name(certificate_id)).display().to_string()
    }

    async fn write(&self, request: &CertificateRenderRequest) -> Result<Vec<u8>, CertificateRenderError> {
        let dir = Arc::clone(&self.dir);
        let name = file_name(request.certificate_id);
        let body = render_document(request).into_bytes();
        tokio::task::spawn_blocking(move || dir.write(&name, &body).map(|()| body))
            .await
            .map_err(|error| render_failure("render task failed", error))?
            .map_err(|error| render_failure("write certificate", error))
    }

    async fn read(&self, certificate_id: CertificateId) -> Result<Option<Vec<u8>>, CertificateRenderError> {
        let dir = Arc::clone(&self.dir);
        let name = file_name(certificate_id);
        let read = tokio::task::spawn_blocking(move || dir.read(&name))
            .await
            .map_err(|error| render_failure("read task failed", error))?;
        match read {
            Ok(bytes) => Ok(Some(bytes)),
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(error) => Err(render_failure("read certificate", error)),
        }
    }
}

#[async_trait]
impl CertificateRenderer for HtmlCertificateRenderer {
    async fn render(
        &self,
        request: &CertificateRenderRequest,
    ) -> Result<RenderedCertificate, CertificateRenderError> {
        self.write(request).await?;
        let document_location = self.location(request.certificate_id);
        info!(
            certificate_id = %request.certificate_id,
            %document_location,
            "certificate rendered"
        );
        Ok(RenderedCertificate { document_location })
    }

    async fn download(
        &self,
        request: &CertificateRenderRequest,
    ) -> Result<CertificateFile, CertificateRenderError> {
        let bytes = match self.read(request.certificate_id).await? {
            Some(bytes) => bytes,
            None => {
                debug!(
                    certificate_id = %request.certificate_id,
                    "certificate document missing; rendering again"
                );
                self.write(request).await?
            }
        };
        Ok(CertificateFile {
            file_name: file_name(request.certificate_id),
            content_type: CONTENT_TYPE.to_owned(),
            digest: hex::encode(Sha256::digest(&bytes)),
            bytes,
        })
    }
}
