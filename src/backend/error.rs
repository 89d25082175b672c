//! Backend error taxonomy.
//!
//! `ConnectError` is startup-fatal. `InvokeError` is per-request and is turned
//! into an HTTP response by the translation layer.

use std::time::Duration;

use thiserror::Error;
use tonic::{Code, Status};

#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("invalid backend address {address:?}: {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("backend {address} unreachable: {reason}")]
    Unreachable { address: String, reason: String },

    #[error("backend {address} not reachable within {after:?}")]
    Timeout { address: String, after: Duration },
}

#[derive(Debug, Error)]
pub enum InvokeError {
    /// Transport failure: the backend could not be reached.
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    /// The backend answered with a non-OK status.
    #[error("backend returned {:?}: {}", .0.code(), .0.message())]
    Rejected(Status),

    /// The per-call deadline elapsed.
    #[error("backend call exceeded {0:?}")]
    DeadlineExceeded(Duration),

    /// The call was abandoned by the gateway (forced shutdown).
    #[error("backend call cancelled")]
    Cancelled,
}

impl InvokeError {
    /// The gRPC code this failure is reported as.
    pub fn code(&self) -> Code {
        match self {
            InvokeError::Unavailable(_) | InvokeError::Cancelled => Code::Unavailable,
            InvokeError::Rejected(status) => status.code(),
            InvokeError::DeadlineExceeded(_) => Code::DeadlineExceeded,
        }
    }

    /// Human-readable detail for the error body.
    pub fn detail(&self) -> String {
        match self {
            InvokeError::Rejected(status) => status.message().to_string(),
            other => other.to_string(),
        }
    }

    /// Metrics label.
    pub fn outcome(&self) -> &'static str {
        match self {
            InvokeError::Unavailable(_) => "unavailable",
            InvokeError::Rejected(_) => "rejected",
            InvokeError::DeadlineExceeded(_) => "deadline_exceeded",
            InvokeError::Cancelled => "cancelled",
        }
    }
}

impl From<Status> for InvokeError {
    fn from(status: Status) -> Self {
        match status.code() {
            Code::Unavailable => InvokeError::Unavailable(status.message().to_string()),
            _ => InvokeError::Rejected(status),
        }
    }
}
