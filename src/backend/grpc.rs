//! gRPC transport over a `tonic` channel.

use std::str::FromStr;

use futures_util::future::BoxFuture;
use http::uri::PathAndQuery;
use prost_reflect::DynamicMessage;
use tonic::client::Grpc;
use tonic::transport::Channel;
use tonic::Status;

use crate::backend::codec::DynamicCodec;
use crate::backend::connector::{RpcBackend, RpcCall};
use crate::backend::error::InvokeError;

/// Unary calls over a shared HTTP/2 channel.
#[derive(Debug, Clone)]
pub struct GrpcBackend {
    channel: Channel,
}

impl GrpcBackend {
    pub fn new(channel: Channel) -> Self {
        Self { channel }
    }
}

impl RpcBackend for GrpcBackend {
    fn unary(&self, call: RpcCall) -> BoxFuture<'_, Result<DynamicMessage, InvokeError>> {
        let mut grpc = Grpc::new(self.channel.clone());

        Box::pin(async move {
            let path = PathAndQuery::from_str(&call.path()).map_err(|e| {
                InvokeError::Rejected(Status::internal(format!("invalid method path: {e}")))
            })?;
            let codec = DynamicCodec::new(call.method.output());

            grpc.ready()
                .await
                .map_err(|e| InvokeError::Unavailable(e.to_string()))?;

            let mut request = tonic::Request::new(call.request);
            *request.metadata_mut() = call.metadata;
            if let Some(timeout) = call.timeout {
                request.set_timeout(timeout);
            }

            let response = grpc.unary(request, path, codec).await?;
            Ok(response.into_inner())
        })
    }
}
