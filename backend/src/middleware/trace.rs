//! Request correlation middleware.
//!
//! Each request is served inside [`TraceId::scope`] and an `http_request`
//! span. A well-formed `trace-id` header sent by an upstream gateway is
//! adopted; anything else gets a fresh identifier. The identifier is echoed
//! back in the `trace-id` response header and lands in domain error bodies.

use std::task::{Context, Poll};
use std::time::Instant;

use actix_web::Error;
use actix_web::dev::{Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::http::header::{HeaderName, HeaderValue};
use futures_util::future::{LocalBoxFuture, Ready, ready};
use tracing::{Instrument, debug, info_span, warn};

use crate::domain::{TRACE_ID_HEADER, TraceId};

/// Middleware factory attaching a request-scoped [`TraceId`].
///
/// # Examples
/// ```
/// use actix_web::App;
/// use lms_backend::Trace;
///
/// let _app = App::new().wrap(Trace);
/// ```
#[derive(Clone, Copy, Debug, Default)]
pub struct Trace;

impl<S, B> Transform<S, ServiceRequest> for Trace
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = TraceMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(TraceMiddleware { service }))
    }
}

pub struct TraceMiddleware<S> {
    service: S,
}

/// Identifier supplied by the caller, when it parses.
fn inbound_trace_id(req: &ServiceRequest) -> Option<TraceId> {
    req.headers()
        .get(TRACE_ID_HEADER)?
        .to_str()
        .ok()?
        .parse()
        .ok()
}

impl<S, B> Service<ServiceRequest> for TraceMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let trace_id = inbound_trace_id(&req).unwrap_or_else(TraceId::generate);
        let span = info_span!(
            "http_request",
            %trace_id,
            method = %req.method(),
            path = %req.path(),
        );
        let started = Instant::now();
        let fut = span.in_scope(|| self.service.call(req));

        let served = async move {
            let mut res = fut.await?;
            debug!(
                status = res.status().as_u16(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "request served"
            );
            match HeaderValue::from_str(&trace_id.to_string()) {
                Ok(value) => {
                    res.response_mut()
                        .headers_mut()
                        .insert(HeaderName::from_static(TRACE_ID_HEADER), value);
                }
                Err(error) => warn!(%error, "trace id is not a valid header value"),
            }
            Ok(res)
        };
        Box::pin(TraceId::scope(trace_id, served.instrument(span)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{App, HttpResponse, test, web};
    use rstest::rstest;

    use crate::domain::Error as DomainError;

    const UPSTREAM_ID: &str = "5d1f7c3e-8a47-4b51-9f0e-2f3a9c1b7e64";

    async fn call_root<F, Fut, Res>(handler: F, inbound: Option<&str>) -> ServiceResponse
    where
        F: Fn() -> Fut + Clone + 'static,
        Fut: std::future::Future<Output = Res> + 'static,
        Res: actix_web::Responder + 'static,
    {
        let app =
            test::init_service(App::new().wrap(Trace).route("/", web::get().to(handler))).await;
        let mut request = test::TestRequest::get().uri("/");
        if let Some(raw) = inbound {
            request = request.insert_header((TRACE_ID_HEADER, raw));
        }
        test::call_service(&app, request.to_request()).await
    }

    fn echoed(res: &ServiceResponse) -> String {
        res.headers()
            .get(TRACE_ID_HEADER)
            .expect("trace id header")
            .to_str()
            .expect("header is ascii")
            .to_owned()
    }

    #[rstest]
    #[case::absent(None)]
    #[case::garbage(Some("enrollment-42"))]
    #[actix_web::test]
    async fn unusable_inbound_ids_are_replaced(#[case] inbound: Option<&str>) {
        let res = call_root(|| async { HttpResponse::NoContent().finish() }, inbound).await;
        let raw = echoed(&res);
        assert!(raw.parse::<TraceId>().is_ok());
        assert_ne!(Some(raw.as_str()), inbound);
    }

    #[actix_web::test]
    async fn upstream_ids_are_adopted() {
        let res = call_root(
            || async {
                let id = TraceId::current().expect("trace id in scope");
                HttpResponse::Ok().body(id.to_string())
            },
            Some(UPSTREAM_ID),
        )
        .await;
        assert_eq!(echoed(&res), UPSTREAM_ID);
        let body = test::read_body(res).await;
        assert_eq!(body.as_ref(), UPSTREAM_ID.as_bytes());
    }

    #[actix_web::test]
    async fn error_bodies_name_the_request_trace_id() {
        let res = call_root(
            || async { Err::<HttpResponse, _>(DomainError::forbidden("not your enrollment")) },
            None,
        )
        .await;
        let expected = echoed(&res);
        let body: DomainError = test::read_body_json(res).await;
        assert_eq!(body.trace_id(), Some(expected.as_str()));
    }
}
