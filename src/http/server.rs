//! HTTP server setup and the translation handler.
//!
//! # Responsibilities
//! - Build the Axum router: one fallback handler wrapped by the middleware chain
//! - Run the accept loop on hyper directly, one task per connection
//! - Gracefully shut connections down when draining starts
//!
//! # Design Decisions
//! - Connection tasks live in a `JoinSet` owned by the lifecycle controller,
//!   so a forced shutdown can abort them and clients see a reset
//! - HTTP/1.1 and HTTP/2 via hyper-util's auto builder
//! - A client that disconnects drops its connection task, which drops the
//!   pending backend call with it

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::{Body, Bytes},
    extract::{ConnectInfo, State},
    http::{header, HeaderMap, Request},
    response::{IntoResponse, Response},
    Router,
};
use http_body_util::LengthLimitError;
use hyper::body::Incoming;
use hyper_util::{
    rt::{TokioExecutor, TokioIo},
    server::conn::auto,
};
use tokio::net::TcpStream;
use tokio::task::JoinSet;
use tower::ServiceExt;

use crate::http::middleware::{self, CorsPolicy, ResolvedRpc};
use crate::http::request::request_id;
use crate::lifecycle::Shutdown;
use crate::net::{ConnectionPermit, InFlightTracker, Listener, ListenerError};
use crate::resilience::calculate_backoff;
use crate::translate::{GatewayError, RequestContext, TranslationEngine};

const ACCEPT_BACKOFF_BASE_MS: u64 = 5;
const ACCEPT_BACKOFF_MAX_MS: u64 = 1000;

/// Application state injected into the handler.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<TranslationEngine>,
    pub shutdown: Shutdown,
    pub in_flight: InFlightTracker,
    pub max_body_bytes: usize,
}

/// Every path goes to the translation handler; the registry decides what exists.
pub fn build_router(state: AppState, cors: CorsPolicy) -> Router {
    let router = Router::new().fallback(translate_handler).with_state(state);
    middleware::apply(router, &middleware::standard_chain(cors))
}

async fn translate_handler(State(state): State<AppState>, req: Request<Body>) -> Response {
    let _in_flight = state.in_flight.track();

    if state.shutdown.is_draining() {
        return GatewayError::Draining.into_response();
    }

    let (parts, body) = req.into_parts();
    let ctx = RequestContext {
        request_id: request_id(&parts.headers),
        remote_addr: parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr),
        path: parts.uri.path().to_string(),
        query: parts.uri.query().map(str::to_string),
        method: parts.method,
        headers: parts.headers,
        cancel: state.shutdown.request_token(),
    };

    let resolved = match state.engine.resolve(&ctx) {
        Ok(resolved) => resolved,
        Err(e) => return e.into_response(),
    };
    let rpc = ResolvedRpc(resolved.descriptor.rpc_name().to_string());

    let result = match read_body(body, &ctx.headers, state.max_body_bytes).await {
        Ok(bytes) => state.engine.dispatch(&ctx, &resolved, &bytes).await,
        Err(e) => Err(e),
    };

    let mut response = match result {
        Ok(envelope) => envelope.into_response(),
        Err(e) => {
            tracing::debug!(request_id = ?ctx.request_id, rpc = %rpc.0, error = %e, "Translation failed");
            e.into_response()
        }
    };
    response.extensions_mut().insert(rpc);
    response
}

async fn read_body(body: Body, headers: &HeaderMap, limit: usize) -> Result<Bytes, GatewayError> {
    let declared = headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok());
    if declared.is_some_and(|len| len > limit as u64) {
        return Err(GatewayError::PayloadTooLarge { limit });
    }

    axum::body::to_bytes(body, limit).await.map_err(|e| {
        if exceeds_limit(&e) {
            GatewayError::PayloadTooLarge { limit }
        } else {
            GatewayError::InvalidBody(format!("failed to read request body: {e}"))
        }
    })
}

/// Bodies without a usable `Content-Length` only hit the limit while streaming.
fn exceeds_limit(err: &(dyn std::error::Error + 'static)) -> bool {
    let mut current = Some(err);
    while let Some(e) = current {
        if e.is::<LengthLimitError>() {
            return true;
        }
        current = e.source();
    }
    false
}

/// What the accept loop leaves behind when it stops.
pub struct ServeOutcome {
    /// Connection tasks still running.
    pub connections: JoinSet<()>,
    /// Set when the listener failed rather than being asked to stop.
    pub error: Option<ListenerError>,
}

/// Accept loop over a bounded listener.
pub struct HttpServer {
    listener: Listener,
    router: Router,
}

impl HttpServer {
    pub fn new(listener: Listener, router: Router) -> Self {
        Self { listener, router }
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.listener.local_addr()
    }

    /// Accept connections until draining starts or the listener fails.
    ///
    /// The listening socket is closed before this returns.
    pub async fn serve(self, shutdown: Shutdown) -> ServeOutcome {
        let HttpServer { listener, router } = self;
        let mut connections = JoinSet::new();

        let mut accept_failures: u32 = 0;

        let error = loop {
            while connections.try_join_next().is_some() {}

            tokio::select! {
                biased;
                _ = shutdown.draining() => break None,
                accepted = listener.accept() => match accepted {
                    Ok((stream, remote, permit)) => {
                        accept_failures = 0;
                        connections.spawn(serve_connection(
                            stream,
                            remote,
                            permit,
                            router.clone(),
                            shutdown.clone(),
                        ));
                    }
                    Err(e) if e.is_transient() => {
                        accept_failures = accept_failures.saturating_add(1);
                        let delay = calculate_backoff(accept_failures, ACCEPT_BACKOFF_BASE_MS, ACCEPT_BACKOFF_MAX_MS);
                        tracing::warn!(
                            error = %e,
                            attempt = accept_failures,
                            retry_in_ms = delay.as_millis() as u64,
                            "Accept failed, retrying"
                        );
                        tokio::select! {
                            _ = shutdown.draining() => break None,
                            _ = tokio::time::sleep(delay) => {}
                        }
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Listener failed");
                        break Some(e);
                    }
                },
            }
        };

        drop(listener);
        tracing::info!(open_connections = connections.len(), "Listener closed");
        ServeOutcome { connections, error }
    }
}

async fn serve_connection(
    stream: TcpStream,
    remote: SocketAddr,
    _permit: ConnectionPermit,
    router: Router,
    shutdown: Shutdown,
) {
    let io = TokioIo::new(stream);
    let service = hyper::service::service_fn(move |mut req: Request<Incoming>| {
        req.extensions_mut().insert(ConnectInfo(remote));
        router.clone().oneshot(req)
    });

    let builder = auto::Builder::new(TokioExecutor::new());
    let connection = builder.serve_connection(io, service);
    tokio::pin!(connection);

    let result = tokio::select! {
        result = connection.as_mut() => result,
        _ = shutdown.draining() => {
            connection.as_mut().graceful_shutdown();
            connection.await
        }
    };

    if let Err(e) = result {
        tracing::debug!(peer_addr = %remote, error = %e, "Connection closed with error");
    }
}
