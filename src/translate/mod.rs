//! Translation subsystem: HTTP/JSON ⇄ RPC.
//!
//! # Data Flow
//! ```text
//! RequestContext + body
//!     → engine.rs (resolve via MethodRegistry, 404 on miss)
//!     → request.rs (merge body/query/path, required fields, decode)
//!     → BackendConnector::invoke
//!     → response.rs (JSON with proto field names, defaults emitted)
//!     → ResponseEnvelope | GatewayError (error.rs)
//! ```

pub mod context;
pub mod engine;
pub mod error;
pub mod request;
pub mod response;

pub use context::RequestContext;
pub use engine::TranslationEngine;
pub use error::{category, http_status, ErrorBody, GatewayError};
pub use request::build_request;
pub use response::{encode_message, ResponseEnvelope};
