//! HTTP/JSON → gRPC edge gateway.
//!
//! ```text
//!   client ──► net::Listener ──► http (request id → access log → CORS)
//!                                  │
//!                                  ▼
//!                        translate::TranslationEngine ◄── routing::MethodRegistry
//!                                  │
//!                                  ▼
//!                        backend::BackendConnector ──► gRPC backend
//!
//!   lifecycle: Starting → Serving → Draining → Stopped
//! ```

pub mod backend;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod resilience;
pub mod routing;
pub mod translate;

#[cfg(test)]
mod test_support;

pub use config::GatewayConfig;
pub use lifecycle::{start, start_with, Gateway, LifecycleState, Shutdown};
