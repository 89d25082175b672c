//! Translation Engine.
//!
//! # Responsibilities
//! - Resolve an inbound request against the method registry
//! - Build the RPC request from path, query and body
//! - Invoke the backend and encode the reply as JSON
//!
//! # Design Decisions
//! - Resolution happens before the body is read, so unknown routes never
//!   cost a body read or a backend call
//! - All failures are returned as `GatewayError`; the caller renders them

use std::sync::Arc;

use crate::backend::{forwarded_metadata, BackendConnector, RpcCall};
use crate::routing::{MethodRegistry, ResolvedMethod};
use crate::translate::context::RequestContext;
use crate::translate::error::GatewayError;
use crate::translate::request::build_request;
use crate::translate::response::{encode_message, ResponseEnvelope};

pub struct TranslationEngine {
    registry: Arc<MethodRegistry>,
    backend: Arc<BackendConnector>,
    forward_headers: bool,
}

impl TranslationEngine {
    pub fn new(registry: Arc<MethodRegistry>, backend: Arc<BackendConnector>, forward_headers: bool) -> Self {
        Self {
            registry,
            backend,
            forward_headers,
        }
    }

    /// Step 1: find the route, or 404.
    pub fn resolve(&self, ctx: &RequestContext) -> Result<ResolvedMethod, GatewayError> {
        self.registry
            .resolve(&ctx.method, &ctx.path)
            .ok_or_else(|| GatewayError::RouteNotFound {
                method: ctx.method.clone(),
                path: ctx.path.clone(),
            })
    }

    /// Steps 2-5 for an already resolved route.
    pub async fn dispatch(
        &self,
        ctx: &RequestContext,
        resolved: &ResolvedMethod,
        body: &[u8],
    ) -> Result<ResponseEnvelope, GatewayError> {
        let descriptor = &resolved.descriptor;
        let request = build_request(descriptor, &resolved.params, ctx.query.as_deref(), body)?;

        let mut call = RpcCall::new(descriptor.rpc().clone(), request);
        if self.forward_headers {
            call = call.with_metadata(forwarded_metadata(&ctx.headers, ctx.remote_addr));
        }

        let response = self.backend.invoke(call, &ctx.cancel).await?;
        let body = encode_message(&response).map_err(|e| GatewayError::Encode(e.to_string()))?;
        Ok(ResponseEnvelope::ok(body))
    }

    /// Resolve and dispatch in one go.
    pub async fn handle(&self, ctx: &RequestContext, body: &[u8]) -> Result<ResponseEnvelope, GatewayError> {
        let resolved = self.resolve(ctx)?;
        self.dispatch(ctx, &resolved, body).await
    }
}
