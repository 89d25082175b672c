//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, addresses parse)
//! - Catch malformed route declarations before the registry sees them
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Route/descriptor consistency is checked later by the registry, which owns the schema

use std::net::SocketAddr;

use axum::http::Method;
use thiserror::Error;

use crate::config::schema::{AllowOrigin, GatewayConfig};
use crate::routing::routable_verb;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{field}: invalid socket address {value:?}")]
    InvalidAddress { field: &'static str, value: String },

    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    #[error("backend.address must not be empty")]
    EmptyBackend,

    #[error("routes[{index}]: {reason}")]
    Route { index: usize, reason: String },

    #[error("cors: {0}")]
    Cors(String),
}

pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: "listener.bind_address",
            value: config.listener.bind_address.clone(),
        });
    }
    if config.listener.max_connections == 0 {
        errors.push(ValidationError::Zero { field: "listener.max_connections" });
    }
    if config.listener.max_body_bytes == 0 {
        errors.push(ValidationError::Zero { field: "listener.max_body_bytes" });
    }

    if config.backend.address.trim().is_empty() {
        errors.push(ValidationError::EmptyBackend);
    }
    if config.backend.connect_timeout_secs == 0 {
        errors.push(ValidationError::Zero { field: "backend.connect_timeout_secs" });
    }
    if config.backend.request_timeout_secs == 0 {
        errors.push(ValidationError::Zero { field: "backend.request_timeout_secs" });
    }
    if config.lifecycle.grace_period_secs == 0 {
        errors.push(ValidationError::Zero { field: "lifecycle.grace_period_secs" });
    }

    for (index, route) in config.routes.iter().enumerate() {
        if route.method.eq_ignore_ascii_case(Method::OPTIONS.as_str()) {
            errors.push(ValidationError::Route {
                index,
                reason: "OPTIONS is reserved for CORS preflight".to_string(),
            });
        } else if routable_verb(&route.method).is_none() {
            errors.push(ValidationError::Route {
                index,
                reason: format!("unknown HTTP method {:?}", route.method),
            });
        }
        if !route.path.starts_with('/') {
            errors.push(ValidationError::Route {
                index,
                reason: format!("path {:?} must start with '/'", route.path),
            });
        }
        if !route.rpc.contains('/') {
            errors.push(ValidationError::Route {
                index,
                reason: format!("rpc {:?} must look like package.Service/Method", route.rpc),
            });
        }
    }

    if config.cors.allow_origin == AllowOrigin::List && config.cors.allowed_origins.is_empty() {
        errors.push(ValidationError::Cors(
            "allow_origin = \"list\" requires allowed_origins".to_string(),
        ));
    }
    if config.cors.allow_credentials && config.cors.allow_origin == AllowOrigin::Any {
        tracing::warn!("cors.allow_credentials with allow_origin = \"any\" is ignored by browsers");
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidAddress {
            field: "observability.metrics_address",
            value: config.observability.metrics_address.clone(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
