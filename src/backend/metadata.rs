//! HTTP header → gRPC metadata forwarding.
//!
//! # Design Decisions
//! - Every client header is forwarded except hop-by-hop and transport-owned ones
//! - Headers that are not valid ASCII metadata are dropped, never rejected
//! - `x-forwarded-for` gains the client address

use std::net::SocketAddr;

use axum::http::HeaderMap;
use tonic::metadata::{AsciiMetadataKey, AsciiMetadataValue, MetadataMap};

const TRANSPORT_HEADERS: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "proxy-connection",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
    "host",
    "content-length",
    "content-type",
    "accept-encoding",
];

const FORWARDED_FOR: &str = "x-forwarded-for";

fn is_transport_header(name: &str) -> bool {
    TRANSPORT_HEADERS.contains(&name) || name.starts_with("grpc-")
}

/// Build outgoing metadata from inbound request headers.
pub fn forwarded_metadata(headers: &HeaderMap, remote: Option<SocketAddr>) -> MetadataMap {
    let mut metadata = MetadataMap::new();

    for (name, value) in headers {
        if is_transport_header(name.as_str()) {
            continue;
        }
        let Ok(key) = AsciiMetadataKey::from_bytes(name.as_str().as_bytes()) else {
            tracing::trace!(header = %name, "Header is not valid metadata, skipped");
            continue;
        };
        let Some(value) = value
            .to_str()
            .ok()
            .and_then(|v| v.parse::<AsciiMetadataValue>().ok())
        else {
            continue;
        };
        metadata.append(key, value);
    }

    if let Some(addr) = remote {
        let client = addr.ip().to_string();
        let chain = match metadata.get(FORWARDED_FOR).and_then(|v| v.to_str().ok()) {
            Some(existing) => format!("{existing}, {client}"),
            None => client,
        };
        if let Ok(value) = chain.parse::<AsciiMetadataValue>() {
            metadata.insert(FORWARDED_FOR, value);
        }
    }

    metadata
}
