//! Behaviour of the service error payload and its JSON shape.

use super::*;
use chrono::TimeZone;
use rstest::rstest;
use serde_json::json;

const REQUEST_ID: &str = "5d1f7c3e-8a47-4b51-9f0e-2f3a9c1b7e64";

fn request_id() -> TraceId {
    REQUEST_ID.parse().expect("valid uuid")
}

#[rstest]
#[case(Error::invalid_request("video watched for 120 seconds"), ErrorCode::InvalidRequest)]
#[case(Error::unauthorized("sign in first"), ErrorCode::Unauthorized)]
#[case(Error::forbidden("lesson is locked"), ErrorCode::Forbidden)]
#[case(Error::not_found("quiz not found"), ErrorCode::NotFound)]
#[case(Error::conflict("certificate already issued"), ErrorCode::Conflict)]
#[case(Error::service_unavailable("store offline"), ErrorCode::ServiceUnavailable)]
#[case(Error::internal("row decode failed"), ErrorCode::InternalError)]
fn constructors_pick_their_code(#[case] error: Error, #[case] expected: ErrorCode) {
    assert_eq!(error.code(), expected);
}

#[rstest]
#[case(ErrorCode::Forbidden, "not permitted")]
#[case(ErrorCode::ServiceUnavailable, "service unavailable")]
fn blank_messages_fall_back_to_a_generic_one(#[case] code: ErrorCode, #[case] expected: &str) {
    assert_eq!(Error::new(code, " \t").message(), expected);
    assert_eq!(
        Error::try_new(code, ""),
        Err(ErrorValidationError::EmptyMessage)
    );
}

#[rstest]
fn blank_trace_ids_are_ignored_or_rejected() {
    let error = Error::not_found("course missing").with_trace_id(REQUEST_ID);
    assert_eq!(error.clone().with_trace_id("  ").trace_id(), Some(REQUEST_ID));
    assert_eq!(
        error.try_with_trace_id(""),
        Err(ErrorValidationError::EmptyTraceId)
    );
}

#[rstest]
fn only_outages_are_retryable() {
    assert!(ErrorCode::ServiceUnavailable.is_retryable());
    assert!(!ErrorCode::Forbidden.is_retryable());
    assert!(!ErrorCode::InternalError.is_retryable());
}

#[tokio::test]
async fn errors_raised_during_a_request_carry_its_id() {
    assert!(Error::internal("outside").trace_id().is_none());
    let inside = TraceId::scope(request_id(), async { Error::forbidden("locked") }).await;
    assert_eq!(inside.trace_id(), Some(REQUEST_ID));
}

#[tokio::test]
async fn decoding_ignores_the_ambient_trace_id() {
    let decoded: Error = TraceId::scope(request_id(), async {
        serde_json::from_value(json!({ "code": "conflict", "message": "taken" }))
            .expect("valid payload")
    })
    .await;
    assert!(decoded.trace_id().is_none());
}

#[rstest]
fn cooldown_errors_expose_their_retry_instant() {
    let retry_at = Utc
        .with_ymd_and_hms(2026, 3, 10, 10, 0, 0)
        .single()
        .expect("valid instant");
    let error = Error::forbidden("cooldown period not met").with_retry_at(retry_at);
    assert_eq!(error.retry_at(), Some(retry_at));

    let json = serde_json::to_value(&error).expect("serialise");
    assert_eq!(json["details"]["retryAt"], "2026-03-10T10:00:00Z");
    assert!(Error::forbidden("locked").retry_at().is_none());
}

#[rstest]
fn client_view_hides_internal_failures_only() {
    let internal = Error::internal("password authentication failed for user lms")
        .with_trace_id(REQUEST_ID)
        .with_details(json!({ "table": "enrollments" }));
    let shown = internal.client_view();
    assert_eq!(shown.message(), "Internal server error");
    assert!(shown.details().is_none());
    assert_eq!(shown.trace_id(), Some(REQUEST_ID));

    let locked = Error::forbidden("complete the previous lesson first");
    assert_eq!(locked.client_view(), locked);
}

#[rstest]
fn wire_shape_is_camel_case_without_empty_fields() {
    let error = Error::conflict("already enrolled").with_trace_id(REQUEST_ID);
    assert_eq!(
        serde_json::to_value(&error).expect("serialise"),
        json!({ "code": "conflict", "message": "already enrolled", "traceId": REQUEST_ID })
    );
}

#[rstest]
#[case(json!({ "code": "not_found", "message": "  " }))]
#[case(json!({ "code": "not_found", "message": "gone", "traceId": "" }))]
#[case(json!({ "code": "teapot", "message": "short and stout" }))]
fn malformed_payloads_do_not_decode(#[case] payload: serde_json::Value) {
    assert!(serde_json::from_value::<Error>(payload).is_err());
}
