//! Per-request state handed to the translation engine.

use std::net::SocketAddr;

use axum::http::{HeaderMap, Method};
use tokio_util::sync::CancellationToken;

/// Everything the engine needs to know about one inbound request.
///
/// Created when the request enters the gateway and dropped once the response
/// has been produced.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    pub headers: HeaderMap,
    pub remote_addr: Option<SocketAddr>,
    pub request_id: Option<String>,
    /// Fires when the gateway abandons the request (forced shutdown).
    pub cancel: CancellationToken,
}

impl RequestContext {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: None,
            headers: HeaderMap::new(),
            remote_addr: None,
            request_id: None,
            cancel: CancellationToken::new(),
        }
    }
}
