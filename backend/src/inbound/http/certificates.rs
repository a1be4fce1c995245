//! Certificate HTTP handlers.
//!
//! ```text
//! GET /api/v1/certificates/{certificate_id}
//! GET /api/v1/certificates/{certificate_id}/download
//! ```

use actix_web::http::header::{
    CacheControl, CacheDirective, ContentDisposition, DispositionParam, DispositionType, ETag,
    EntityTag,
};
use actix_web::{HttpResponse, get, web};

use crate::domain::Error;
use crate::domain::ports::{CertificatePayload, CertificateRequest};
use crate::inbound::http::ApiResult;
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{FieldName, parse_id};

fn certificate_request(
    session: &SessionContext,
    certificate_id: &str,
) -> Result<CertificateRequest, Error> {
    Ok(CertificateRequest {
        learner_id: session.require_learner_id()?,
        certificate_id: parse_id(certificate_id, FieldName::new("certificateId"))?,
    })
}

/// Certificate details for its owner or an administrator.
#[utoipa::path(
    get,
    path = "/api/v1/certificates/{certificate_id}",
    params(("certificate_id" = String, Path, format = "uuid", description = "Certificate id")),
    responses(
        (status = 200, description = "Certificate", body = CertificatePayload),
        (status = 400, description = "Invalid request", body = Error),
        (status = 401, description = "Unauthorized", body = Error),
        (status = 403, description = "Certificate belongs to someone else", body = Error),
        (status = 404, description = "Unknown certificate", body = Error)
    ),
    tags = ["certificates"],
    operation_id = "getCertificate",
    security(("SessionCookie" = []))
)]
#[get("/certificates/{certificate_id}")]
pub async fn get_certificate(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<web::Json<CertificatePayload>> {
    let request = certificate_request(&session, &path)?;
    Ok(web::Json(state.certificates.certificate(request).await?))
}

/// Download the rendered certificate document.
///
/// The `ETag` is the SHA-256 digest of the body.
#[utoipa::path(
    get,
    path = "/api/v1/certificates/{certificate_id}/download",
    params(("certificate_id" = String, Path, format = "uuid", description = "Certificate id")),
    responses(
        (status = 200, description = "Certificate document", content_type = "text/html"),
        (status = 400, description = "Invalid request", body = Error),
        (status = 401, description = "Unauthorized", body = Error),
        (status = 403, description = "Certificate belongs to someone else", body = Error),
        (status = 404, description = "Unknown certificate", body = Error)
    ),
    tags = ["certificates"],
    operation_id = "downloadCertificate",
    security(("SessionCookie" = []))
)]
#[get("/certificates/{certificate_id}/download")]
pub async fn download_certificate(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let request = certificate_request(&session, &path)?;
    let file = state.certificates.download(request).await?;
    Ok(HttpResponse::Ok()
        .content_type(file.content_type)
        .insert_header(ETag(EntityTag::new_strong(file.digest)))
        .insert_header(CacheControl(vec![CacheDirective::Private]))
        .insert_header(ContentDisposition {
            disposition: DispositionType::Attachment,
            parameters: vec![DispositionParam::Filename(file.file_name)],
        })
        .body(file.bytes))
}
