//! Failure payload shared by every progression service.
//!
//! Services return [`Error`] with a stable [`ErrorCode`]; the HTTP adapter
//! picks the status code from it. Errors raised while a request is being
//! served capture that request's [`TraceId`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use utoipa::ToSchema;

use super::trace_id::TraceId;

/// Failure category exposed to clients as a snake_case string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[non_exhaustive]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Malformed input, an unmet completion rule or an exceeded time limit.
    InvalidRequest,
    /// No learner session.
    Unauthorized,
    /// Locked lesson, inactive subscription, cooldown or foreign enrollment.
    Forbidden,
    NotFound,
    Conflict,
    /// Storage or an identity lookup could not be reached.
    ServiceUnavailable,
    InternalError,
}

impl ErrorCode {
    /// Whether repeating the same request later may succeed unchanged.
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::ServiceUnavailable)
    }

    /// Message used when a caller supplies a blank one.
    fn fallback_message(self) -> &'static str {
        match self {
            Self::InvalidRequest => "invalid request",
            Self::Unauthorized => "authentication required",
            Self::Forbidden => "not permitted",
            Self::NotFound => "not found",
            Self::Conflict => "conflicting state",
            Self::ServiceUnavailable => "service unavailable",
            Self::InternalError => "internal error",
        }
    }
}

/// Error returned by progression services.
///
/// The message is never blank. `details` carries structured context such as
/// the `retryAt` instant of a quiz cooldown.
///
/// # Examples
/// ```
/// use lms_backend::domain::{Error, ErrorCode};
///
/// let err = Error::not_found("course 42 not found");
/// assert_eq!(err.code(), ErrorCode::NotFound);
/// assert_eq!(Error::conflict("  ").message(), "conflicting state");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
#[serde(try_from = "ErrorDto", into = "ErrorDto")]
pub struct Error {
    #[schema(example = "forbidden")]
    code: ErrorCode,
    #[schema(example = "complete the previous lesson first")]
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(example = "5d1f7c3e-8a47-4b51-9f0e-2f3a9c1b7e64")]
    trace_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Value>,
}

/// Rejections raised by the validating constructors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ErrorValidationError {
    #[error("error message must not be empty")]
    EmptyMessage,
    #[error("trace identifier must not be empty")]
    EmptyTraceId,
}

impl Error {
    /// Build an error, substituting a generic message for a blank one.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        let message = message.into();
        Self::try_new(code, message).unwrap_or_else(|_| Self {
            code,
            message: code.fallback_message().to_owned(),
            trace_id: ambient_trace_id(),
            details: None,
        })
    }

    /// Build an error, rejecting a blank message.
    pub fn try_new(
        code: ErrorCode,
        message: impl Into<String>,
    ) -> Result<Self, ErrorValidationError> {
        let message = message.into();
        if message.trim().is_empty() {
            return Err(ErrorValidationError::EmptyMessage);
        }
        Ok(Self {
            code,
            message,
            trace_id: ambient_trace_id(),
            details: None,
        })
    }

    pub fn code(&self) -> ErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn trace_id(&self) -> Option<&str> {
        self.trace_id.as_deref()
    }

    pub fn details(&self) -> Option<&Value> {
        self.details.as_ref()
    }

    /// Replace the trace identifier. Blank identifiers are ignored.
    pub fn with_trace_id(self, id: impl Into<String>) -> Self {
        let id = id.into();
        if id.trim().is_empty() {
            return self;
        }
        Self {
            trace_id: Some(id),
            ..self
        }
    }

    /// Replace the trace identifier, rejecting a blank one.
    pub fn try_with_trace_id(
        self,
        id: impl Into<String>,
    ) -> Result<Self, ErrorValidationError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(ErrorValidationError::EmptyTraceId);
        }
        Ok(self.with_trace_id(id))
    }

    /// Attach structured details.
    ///
    /// # Examples
    /// ```
    /// use lms_backend::domain::Error;
    /// use serde_json::json;
    ///
    /// let err = Error::invalid_request("answers must not be empty")
    ///     .with_details(json!({ "field": "answers" }));
    /// assert_eq!(err.details(), Some(&json!({ "field": "answers" })));
    /// ```
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Record when a gated action becomes available again.
    pub fn with_retry_at(self, retry_at: DateTime<Utc>) -> Self {
        self.with_details(json!({ "retryAt": retry_at }))
    }

    /// The `retryAt` detail, when present and well formed.
    pub fn retry_at(&self) -> Option<DateTime<Utc>> {
        let raw = self.details.as_ref()?.get("retryAt")?.as_str()?;
        DateTime::parse_from_rfc3339(raw)
            .ok()
            .map(|at| at.with_timezone(&Utc))
    }

    /// Copy safe to show a client: internal failures lose their message and
    /// details but keep the trace id.
    pub fn client_view(&self) -> Self {
        if self.code != ErrorCode::InternalError {
            return self.clone();
        }
        Self {
            code: self.code,
            message: "Internal server error".to_owned(),
            trace_id: self.trace_id.clone(),
            details: None,
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidRequest, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unauthorized, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Forbidden, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Conflict, message)
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ServiceUnavailable, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }
}

fn ambient_trace_id() -> Option<String> {
    TraceId::current().map(|id| id.to_string())
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for Error {}

/// Wire shape of [`Error`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ErrorDto {
    code: ErrorCode,
    message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    trace_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    details: Option<Value>,
}

impl From<Error> for ErrorDto {
    fn from(value: Error) -> Self {
        let Error {
            code,
            message,
            trace_id,
            details,
        } = value;
        Self {
            code,
            message,
            trace_id,
            details,
        }
    }
}

impl TryFrom<ErrorDto> for Error {
    type Error = ErrorValidationError;

    fn try_from(dto: ErrorDto) -> Result<Self, Self::Error> {
        if dto.message.trim().is_empty() {
            return Err(ErrorValidationError::EmptyMessage);
        }
        if dto.trace_id.as_deref().is_some_and(|id| id.trim().is_empty()) {
            return Err(ErrorValidationError::EmptyTraceId);
        }
        // A decoded payload keeps its own trace id, never the ambient one.
        Ok(Self {
            code: dto.code,
            message: dto.message,
            trace_id: dto.trace_id,
            details: dto.details,
        })
    }
}

#[cfg(test)]
mod tests;
