//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address, body limit).
    pub listener: ListenerConfig,

    /// The single gRPC backend.
    pub backend: BackendConfig,

    /// Where the protobuf descriptors come from.
    pub schema: SchemaConfig,

    /// HTTP route → RPC method bindings.
    pub routes: Vec<RouteConfig>,

    /// Cross-origin policy.
    pub cors: CorsConfig,

    /// Startup/shutdown timing.
    pub lifecycle: LifecycleConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Maximum concurrent client connections (backpressure).
    pub max_connections: usize,

    /// Largest accepted request body in bytes.
    pub max_body_bytes: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            max_connections: 10_000,
            max_body_bytes: 4 * 1024 * 1024,
        }
    }
}

/// Backend connection configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Backend address. A bare `host:port` is dialed over plaintext HTTP/2.
    pub address: String,

    /// How long startup may wait for the connection to come up.
    pub connect_timeout_secs: u64,

    /// Deadline applied to every backend call.
    pub request_timeout_secs: u64,

    /// Forward inbound HTTP headers as gRPC metadata.
    pub forward_headers: bool,
}

impl BackendConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            address: "http://localhost:9091".to_string(),
            connect_timeout_secs: 5,
            request_timeout_secs: 30,
            forward_headers: true,
        }
    }
}

/// Descriptor source.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct SchemaConfig {
    /// Path to a serialized `FileDescriptorSet` (`protoc --descriptor_set_out`).
    pub descriptor_set: Option<PathBuf>,
}

/// One HTTP route bound to a backend RPC method.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct RouteConfig {
    /// HTTP verb (e.g. "GET").
    pub method: String,

    /// Path template, e.g. "/v1/items/{id}".
    pub path: String,

    /// Fully qualified RPC, e.g. "item.ItemService/GetItem".
    pub rpc: String,

    /// Body mapping: "*" for the whole request message, a field name to bind
    /// the body to that field, or "" to ignore the body.
    #[serde(default = "default_body")]
    pub body: String,

    /// Request fields that must be supplied by the client.
    #[serde(default)]
    pub required: Vec<String>,
}

fn default_body() -> String {
    "*".to_string()
}

impl RouteConfig {
    pub fn new(method: &str, path: &str, rpc: &str) -> Self {
        Self {
            method: method.to_string(),
            path: path.to_string(),
            rpc: rpc.to_string(),
            body: default_body(),
            required: Vec::new(),
        }
    }

    pub fn with_body(mut self, body: &str) -> Self {
        self.body = body.to_string();
        self
    }

    pub fn with_required(mut self, fields: &[&str]) -> Self {
        self.required = fields.iter().map(|f| f.to_string()).collect();
        self
    }
}

/// How the allow-origin header is chosen.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AllowOrigin {
    /// Echo the request's Origin.
    Mirror,
    /// Always "*".
    Any,
    /// Echo only origins from `allowed_origins`.
    List,
}

/// Cross-origin configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CorsConfig {
    pub allow_origin: AllowOrigin,

    /// Used when `allow_origin = "list"`.
    pub allowed_origins: Vec<String>,

    /// Answer requests without an Origin header with "*".
    pub wildcard_without_origin: bool,

    pub allow_methods: Vec<String>,

    pub allow_headers: String,

    pub allow_credentials: bool,

    /// Preflight cache lifetime.
    pub max_age_secs: u64,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allow_origin: AllowOrigin::Mirror,
            allowed_origins: Vec::new(),
            wildcard_without_origin: true,
            allow_methods: ["GET", "POST", "PUT", "DELETE", "OPTIONS", "PATCH"]
                .iter()
                .map(|m| m.to_string())
                .collect(),
            allow_headers: "*".to_string(),
            allow_credentials: true,
            max_age_secs: 86_400,
        }
    }
}

/// Lifecycle timing.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LifecycleConfig {
    /// How long in-flight requests may run after a shutdown signal.
    pub grace_period_secs: u64,
}

impl LifecycleConfig {
    pub fn grace_period(&self) -> Duration {
        Duration::from_secs(self.grace_period_secs)
    }
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            grace_period_secs: 5,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    pub log_format: LogFormat,

    /// Enable the Prometheus scrape endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9095".to_string(),
        }
    }
}
