//! Backend Connector.
//!
//! # Responsibilities
//! - Establish the channel to the RPC backend at startup
//! - Invoke unary methods with a deadline and a cancellation token
//! - Release the channel at shutdown
//!
//! # Design Decisions
//! - One shared channel for the whole gateway; calls are multiplexed on it
//! - The initial connect is retried with backoff until the connect deadline
//! - The transport sits behind `RpcBackend` so the engine can be driven by an
//!   in-process backend in tests

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::future::BoxFuture;
use prost_reflect::{DynamicMessage, MethodDescriptor as ProtoMethod};
use tokio_util::sync::CancellationToken;
use tonic::metadata::MetadataMap;
use tonic::transport::Endpoint;

use crate::backend::error::{ConnectError, InvokeError};
use crate::backend::grpc::GrpcBackend;
use crate::config::BackendConfig;
use crate::observability::metrics;
use crate::resilience::delay_until_deadline;
use crate::routing::rpc_name;

const CONNECT_BACKOFF_BASE_MS: u64 = 100;
const CONNECT_BACKOFF_MAX_MS: u64 = 1_000;

/// A transport capable of performing unary RPCs.
pub trait RpcBackend: Send + Sync + 'static {
    fn unary(&self, call: RpcCall) -> BoxFuture<'_, Result<DynamicMessage, InvokeError>>;
}

/// One unary invocation.
#[derive(Debug)]
pub struct RpcCall {
    pub method: ProtoMethod,
    pub request: DynamicMessage,
    pub metadata: MetadataMap,
    pub timeout: Option<Duration>,
}

impl RpcCall {
    pub fn new(method: ProtoMethod, request: DynamicMessage) -> Self {
        Self {
            method,
            request,
            metadata: MetadataMap::new(),
            timeout: None,
        }
    }

    pub fn with_metadata(mut self, metadata: MetadataMap) -> Self {
        self.metadata = metadata;
        self
    }

    /// `package.Service/Method`.
    pub fn rpc_name(&self) -> String {
        rpc_name(&self.method)
    }

    /// HTTP/2 request path, `/package.Service/Method`.
    pub fn path(&self) -> String {
        format!("/{}", self.rpc_name())
    }
}

/// Shared connection to the backend.
pub struct BackendConnector {
    backend: Arc<dyn RpcBackend>,
    address: String,
    request_timeout: Duration,
}

impl std::fmt::Debug for BackendConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendConnector")
            .field("address", &self.address)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

impl BackendConnector {
    /// Connect to the configured backend, retrying until `connect_timeout` elapses.
    pub async fn connect(config: &BackendConfig) -> Result<Self, ConnectError> {
        let address = normalize_address(&config.address);
        let connect_timeout = config.connect_timeout();

        let endpoint = Endpoint::from_shared(address.clone())
            .map_err(|e| ConnectError::InvalidAddress {
                address: address.clone(),
                reason: e.to_string(),
            })?
            .connect_timeout(connect_timeout);

        let deadline = Instant::now() + connect_timeout;
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            let remaining = deadline.saturating_duration_since(Instant::now());
            let result = tokio::time::timeout(remaining, endpoint.connect()).await;

            let reason = match result {
                Ok(Ok(channel)) => {
                    tracing::info!(backend = %address, attempt, "Backend connected");
                    return Ok(Self {
                        backend: Arc::new(GrpcBackend::new(channel)),
                        address,
                        request_timeout: config.request_timeout(),
                    });
                }
                Ok(Err(e)) => e.to_string(),
                Err(_) => {
                    return Err(ConnectError::Timeout {
                        address,
                        after: connect_timeout,
                    })
                }
            };

            tracing::warn!(backend = %address, attempt, error = %reason, "Backend connect failed");

            match delay_until_deadline(attempt, CONNECT_BACKOFF_BASE_MS, CONNECT_BACKOFF_MAX_MS, deadline) {
                Some(delay) => tokio::time::sleep(delay).await,
                None => return Err(ConnectError::Unreachable { address, reason }),
            }
        }
    }

    /// Wrap an already-established backend.
    pub fn with_backend(
        backend: Arc<dyn RpcBackend>,
        address: impl Into<String>,
        request_timeout: Duration,
    ) -> Self {
        Self {
            backend,
            address: address.into(),
            request_timeout,
        }
    }

    /// Perform one unary call.
    ///
    /// Completes with `Cancelled` as soon as `cancel` fires and with
    /// `DeadlineExceeded` once the per-call timeout elapses.
    pub async fn invoke(
        &self,
        mut call: RpcCall,
        cancel: &CancellationToken,
    ) -> Result<DynamicMessage, InvokeError> {
        let timeout = self.request_timeout;
        call.timeout = Some(timeout);
        let rpc = call.rpc_name();
        let started = Instant::now();

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(InvokeError::Cancelled),
            outcome = tokio::time::timeout(timeout, self.backend.unary(call)) => {
                outcome.unwrap_or(Err(InvokeError::DeadlineExceeded(timeout)))
            }
        };

        let outcome = match &result {
            Ok(_) => "ok",
            Err(e) => e.outcome(),
        };
        metrics::record_backend_call(&rpc, outcome, started.elapsed());

        if let Err(e) = &result {
            tracing::debug!(rpc = %rpc, error = %e, "Backend call failed");
        }
        result
    }

    /// Drop this handle on the transport.
    ///
    /// Returns `true` when it was the last one, i.e. the channel is closed
    /// now rather than when some other holder lets go.
    pub fn close(self) -> bool {
        let BackendConnector { backend, address, .. } = self;
        let released = Arc::strong_count(&backend) == 1;
        drop(backend);
        tracing::info!(backend = %address, released, "Backend connection closed");
        released
    }
}

/// Bare `host:port` addresses are treated as plaintext HTTP/2.
fn normalize_address(address: &str) -> String {
    if address.contains("://") {
        address.to_string()
    } else {
        format!("http://{address}")
    }
}
