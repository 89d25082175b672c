//! Per-request errors and their JSON representation.
//!
//! Every failure on the request path ends here; nothing escapes the
//! translation boundary as a panic or a dropped connection.

use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tonic::Code;

use crate::backend::InvokeError;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("no route for {method} {path}")]
    RouteNotFound { method: Method, path: String },

    #[error("invalid request body: {0}")]
    InvalidBody(String),

    #[error("missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<String>),

    #[error("request body exceeds {limit} bytes")]
    PayloadTooLarge { limit: usize },

    #[error("shutting down")]
    Draining,

    #[error(transparent)]
    Backend(#[from] InvokeError),

    #[error("failed to encode response: {0}")]
    Encode(String),
}

impl GatewayError {
    /// gRPC code reported in the error body.
    pub fn code(&self) -> Code {
        match self {
            GatewayError::RouteNotFound { .. } => Code::NotFound,
            GatewayError::InvalidBody(_) | GatewayError::MissingFields(_) => Code::InvalidArgument,
            GatewayError::PayloadTooLarge { .. } => Code::ResourceExhausted,
            GatewayError::Draining => Code::Unavailable,
            GatewayError::Backend(e) => e.code(),
            GatewayError::Encode(_) => Code::Internal,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            GatewayError::Backend(InvokeError::Cancelled) => StatusCode::SERVICE_UNAVAILABLE,
            other => http_status(other.code()),
        }
    }

    fn message(&self) -> String {
        match self {
            GatewayError::Backend(e) => e.detail(),
            other => other.to_string(),
        }
    }

    pub fn body(&self) -> ErrorBody {
        let code = self.code();
        ErrorBody {
            error: category(code),
            code: code as i32,
            message: self.message(),
            details: Vec::new(),
        }
    }
}

/// Structured JSON error body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub code: i32,
    pub message: String,
    pub details: Vec<Value>,
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::warn!(status = status.as_u16(), error = %self, "Request failed");
        } else {
            tracing::debug!(status = status.as_u16(), error = %self, "Request rejected");
        }
        (status, Json(self.body())).into_response()
    }
}

/// gRPC status → HTTP status.
pub fn http_status(code: Code) -> StatusCode {
    match code {
        Code::Ok => StatusCode::OK,
        Code::Cancelled => StatusCode::from_u16(499).unwrap_or(StatusCode::BAD_REQUEST),
        Code::Unknown | Code::Internal | Code::DataLoss => StatusCode::INTERNAL_SERVER_ERROR,
        Code::InvalidArgument | Code::FailedPrecondition | Code::OutOfRange => StatusCode::BAD_REQUEST,
        Code::DeadlineExceeded => StatusCode::GATEWAY_TIMEOUT,
        Code::NotFound => StatusCode::NOT_FOUND,
        Code::AlreadyExists | Code::Aborted => StatusCode::CONFLICT,
        Code::PermissionDenied => StatusCode::FORBIDDEN,
        Code::Unauthenticated => StatusCode::UNAUTHORIZED,
        Code::ResourceExhausted => StatusCode::TOO_MANY_REQUESTS,
        Code::Unimplemented => StatusCode::NOT_IMPLEMENTED,
        Code::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
    }
}

/// Lowercase category text for the `error` field.
pub fn category(code: Code) -> &'static str {
    match code {
        Code::Ok => "ok",
        Code::Cancelled => "cancelled",
        Code::Unknown => "unknown",
        Code::InvalidArgument => "invalid argument",
        Code::DeadlineExceeded => "deadline exceeded",
        Code::NotFound => "not found",
        Code::AlreadyExists => "already exists",
        Code::PermissionDenied => "permission denied",
        Code::ResourceExhausted => "resource exhausted",
        Code::FailedPrecondition => "failed precondition",
        Code::Aborted => "aborted",
        Code::OutOfRange => "out of range",
        Code::Unimplemented => "unimplemented",
        Code::Internal => "internal",
        Code::Unavailable => "unavailable",
        Code::DataLoss => "data loss",
        Code::Unauthenticated => "unauthenticated",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tonic::Status;

    #[test]
    fn test_status_table() {
        assert_eq!(http_status(Code::NotFound), StatusCode::NOT_FOUND);
        assert_eq!(http_status(Code::Cancelled).as_u16(), 499);
        assert_eq!(http_status(Code::FailedPrecondition), StatusCode::BAD_REQUEST);
        assert_eq!(http_status(Code::Aborted), StatusCode::CONFLICT);
        assert_eq!(http_status(Code::ResourceExhausted), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(http_status(Code::DataLoss), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_backend_categories() {
        let unavailable = GatewayError::from(InvokeError::Unavailable("refused".into()));
        assert_eq!(unavailable.status(), StatusCode::SERVICE_UNAVAILABLE);

        let deadline = GatewayError::from(InvokeError::DeadlineExceeded(Duration::from_secs(30)));
        assert_eq!(deadline.status(), StatusCode::GATEWAY_TIMEOUT);

        let cancelled = GatewayError::from(InvokeError::Cancelled);
        assert_eq!(cancelled.status(), StatusCode::SERVICE_UNAVAILABLE);

        let rejected = GatewayError::from(InvokeError::from(Status::invalid_argument("bad id")));
        assert_eq!(rejected.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_error_body_shape() {
        let err = GatewayError::from(InvokeError::from(Status::not_found("item 999 does not exist")));
        let body = serde_json::to_value(err.body()).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "error": "not found",
                "code": 5,
                "message": "item 999 does not exist",
                "details": []
            })
        );
    }

    #[test]
    fn test_local_errors() {
        let err = GatewayError::RouteNotFound {
            method: Method::GET,
            path: "/nope".into(),
        };
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(err.body().code, 5);

        let err = GatewayError::MissingFields(vec!["name".into(), "id".into()]);
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.body().message, "missing required fields: name, id");

        assert_eq!(
            GatewayError::PayloadTooLarge { limit: 10 }.status(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        let draining = GatewayError::Draining.body();
        assert_eq!(draining.error, "unavailable");
        assert_eq!(draining.message, "shutting down");
    }
}
