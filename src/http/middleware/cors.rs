//! Cross-origin interceptor.
//!
//! # Responsibilities
//! - Decide the `access-control-allow-origin` value for each request
//! - Declare allowed verbs, headers, credentials and preflight max age
//! - Answer every `OPTIONS` request itself with 200 and `{}`

use std::collections::HashSet;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, HeaderValue, Method, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::config::{AllowOrigin, CorsConfig};

/// Pre-rendered CORS headers.
#[derive(Debug, Clone)]
pub struct CorsPolicy {
    allow_origin: AllowOrigin,
    allowed_origins: HashSet<String>,
    wildcard_without_origin: bool,
    allow_methods: HeaderValue,
    allow_headers: HeaderValue,
    allow_credentials: bool,
    max_age: HeaderValue,
}

impl CorsPolicy {
    pub fn from_config(config: &CorsConfig) -> Result<Self, header::InvalidHeaderValue> {
        Ok(Self {
            allow_origin: config.allow_origin,
            allowed_origins: config.allowed_origins.iter().cloned().collect(),
            wildcard_without_origin: config.wildcard_without_origin,
            allow_methods: HeaderValue::from_str(&config.allow_methods.join(", "))?,
            allow_headers: HeaderValue::from_str(&config.allow_headers)?,
            allow_credentials: config.allow_credentials,
            max_age: HeaderValue::from(config.max_age_secs),
        })
    }

    /// The allow-origin value for a request with the given `Origin`.
    pub fn allow_origin(&self, origin: Option<&HeaderValue>) -> Option<HeaderValue> {
        let origin = origin.filter(|o| !o.is_empty());
        let Some(origin) = origin else {
            return self
                .wildcard_without_origin
                .then(|| HeaderValue::from_static("*"));
        };

        match self.allow_origin {
            AllowOrigin::Any => Some(HeaderValue::from_static("*")),
            AllowOrigin::Mirror => Some(origin.clone()),
            AllowOrigin::List => origin
                .to_str()
                .ok()
                .filter(|o| self.allowed_origins.contains(*o))
                .map(|_| origin.clone()),
        }
    }

    pub fn apply(&self, origin: Option<&HeaderValue>, headers: &mut HeaderMap) {
        if let Some(value) = self.allow_origin(origin) {
            headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, value);
        }
        if self.allow_origin != AllowOrigin::Any {
            headers.append(header::VARY, HeaderValue::from_static("origin"));
        }
        headers.insert(header::ACCESS_CONTROL_ALLOW_METHODS, self.allow_methods.clone());
        headers.insert(header::ACCESS_CONTROL_ALLOW_HEADERS, self.allow_headers.clone());
        if self.allow_credentials {
            headers.insert(
                header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
                HeaderValue::from_static("true"),
            );
        }
        headers.insert(header::ACCESS_CONTROL_MAX_AGE, self.max_age.clone());
    }
}

pub async fn cors(State(policy): State<Arc<CorsPolicy>>, req: Request<Body>, next: Next) -> Response {
    let origin = req.headers().get(header::ORIGIN).cloned();

    let mut response = if req.method() == Method::OPTIONS {
        (StatusCode::OK, Json(json!({}))).into_response()
    } else {
        next.run(req).await
    };

    policy.apply(origin.as_ref(), response.headers_mut());
    response
}
