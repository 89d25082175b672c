//! Access log interceptor.
//!
//! Wraps everything below it, so the logged status is the one the client
//! receives whichever layer produced it. The line is written when the
//! response body is released by the connection, i.e. after the last frame
//! went out or the client went away.

use std::net::SocketAddr;
use std::time::Instant;

use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{header, Method, Request},
    middleware::Next,
    response::Response,
};
use http_body_util::BodyExt;

use crate::http::request::request_id;
use crate::observability::metrics;

/// Response extension naming the RPC a request was routed to.
#[derive(Debug, Clone)]
pub struct ResolvedRpc(pub String);

pub async fn access_log(req: Request<Body>, next: Next) -> Response {
    let started = Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let origin = req
        .headers()
        .get(header::ORIGIN)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-")
        .to_string();
    let remote = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.to_string())
        .unwrap_or_else(|| "-".to_string());
    let request_id = request_id(req.headers()).unwrap_or_default();

    tracing::debug!(request_id = %request_id, method = %method, path = %path, remote = %remote, "Request received");

    let response = next.run(req).await;

    let record = AccessRecord {
        started,
        status: response.status().as_u16(),
        rpc: response
            .extensions()
            .get::<ResolvedRpc>()
            .map(|ResolvedRpc(name)| name.clone()),
        method,
        path,
        origin,
        remote,
        request_id,
    };

    let (parts, body) = response.into_parts();
    let body = body.map_frame(move |frame| {
        let _pending = &record;
        frame
    });
    Response::from_parts(parts, Body::new(body))
}

/// One access log line, emitted when the response body is dropped.
struct AccessRecord {
    started: Instant,
    method: Method,
    path: String,
    origin: String,
    remote: String,
    request_id: String,
    rpc: Option<String>,
    status: u16,
}

impl Drop for AccessRecord {
    fn drop(&mut self) {
        let elapsed = self.started.elapsed();
        let rpc = self.rpc.as_deref().unwrap_or(metrics::NO_RPC);

        tracing::info!(
            request_id = %self.request_id,
            method = %self.method,
            path = %self.path,
            origin = %self.origin,
            remote = %self.remote,
            rpc = %rpc,
            status = self.status,
            duration_ms = elapsed.as_secs_f64() * 1000.0,
            "Request completed"
        );
        metrics::record_request(self.method.as_str(), self.status, rpc, elapsed);
    }
}
