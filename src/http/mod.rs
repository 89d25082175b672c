//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (hyper accept loop, one task per connection)
//!     → middleware/ (request id, access log, CORS)
//!     → server.rs translate handler (drain check, body limit)
//!     → TranslationEngine
//!     → JSON response
//! ```

pub mod middleware;
pub mod request;
pub mod server;

pub use middleware::{CorsPolicy, Interceptor};
pub use request::{request_id, UuidRequestId, X_REQUEST_ID};
pub use server::{build_router, AppState, HttpServer, ServeOutcome};
