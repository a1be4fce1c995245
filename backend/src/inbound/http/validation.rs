//! Parsing helpers shared by the HTTP handlers.
//!
//! Path segments and body fields arrive as strings and become typed ids
//! here, so a malformed value yields a `400` naming the offending field.

use serde_json::json;
use uuid::Uuid;

use crate::domain::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ValidationCode {
    InvalidUuid,
    OutOfRange,
}

impl ValidationCode {
    fn as_str(self) -> &'static str {
        match self {
            Self::InvalidUuid => "invalid_uuid",
            Self::OutOfRange => "out_of_range",
        }
    }
}

/// Name of a request field as clients spell it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FieldName(&'static str);

impl FieldName {
    pub(crate) const fn new(name: &'static str) -> Self {
        Self(name)
    }
}

pub(crate) fn invalid_uuid_error(field: FieldName, value: &str) -> Error {
    Error::invalid_request(format!("{} must be a valid UUID", field.0)).with_details(json!({
        "field": field.0,
        "value": value,
        "code": ValidationCode::InvalidUuid.as_str(),
    }))
}

/// Parse `value` as the typed id for `field`.
pub(crate) fn parse_id<T>(value: &str, field: FieldName) -> Result<T, Error>
where
    T: From<Uuid>,
{
    Uuid::parse_str(value.trim())
        .map(T::from)
        .map_err(|_| invalid_uuid_error(field, value))
}

/// Parse `value` as the typed id for one element of a list field.
pub(crate) fn parse_indexed_id<T>(value: &str, field: FieldName, index: usize) -> Result<T, Error>
where
    T: From<Uuid>,
{
    Uuid::parse_str(value.trim()).map(T::from).map_err(|_| {
        Error::invalid_request(format!("{} must contain valid UUIDs", field.0)).with_details(
            json!({
                "field": field.0,
                "index": index,
                "value": value,
                "code": ValidationCode::InvalidUuid.as_str(),
            }),
        )
    })
}

/// Reject a numeric field that is negative.
pub(crate) fn non_negative(value: i32, field: FieldName) -> Result<i32, Error> {
    if value < 0 {
        return Err(
            Error::invalid_request(format!("{} must not be negative", field.0)).with_details(
                json!({
                    "field": field.0,
                    "value": value,
                    "code": ValidationCode::OutOfRange.as_str(),
                }),
            ),
        );
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CourseId, ErrorCode, OptionId};

    const COURSE_ID: FieldName = FieldName::new("courseId");

    #[test]
    fn parses_typed_ids() {
        let id: CourseId =
            parse_id(" 3fa85f64-5717-4562-b3fc-2c963f66afa6", COURSE_ID).expect("valid uuid");
        assert_eq!(id.to_string(), "3fa85f64-5717-4562-b3fc-2c963f66afa6");
    }

    #[test]
    fn malformed_ids_name_the_field() {
        let error = parse_id::<CourseId>("nope", COURSE_ID).expect_err("invalid uuid");
        assert_eq!(error.code(), ErrorCode::InvalidRequest);
        let details = error.details().expect("details");
        assert_eq!(details["field"], "courseId");
        assert_eq!(details["code"], "invalid_uuid");
    }

    #[test]
    fn list_errors_carry_the_index() {
        let error = parse_indexed_id::<OptionId>("x", FieldName::new("answers"), 2)
            .expect_err("invalid uuid");
        assert_eq!(error.details().expect("details")["index"], 2);
    }

    #[test]
    fn negative_numbers_are_out_of_range() {
        let field = FieldName::new("watchedSeconds");
        assert_eq!(non_negative(0, field).expect("zero is fine"), 0);
        let error = non_negative(-1, field).expect_err("negative");
        assert_eq!(error.details().expect("details")["code"], "out_of_range");
    }
}
