//! Backend subsystem.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     BackendConfig → connector.rs (dial with backoff until connect deadline)
//!     → grpc.rs (shared tonic Channel)
//!
//! Per request:
//!     DynamicMessage + forwarded metadata (metadata.rs)
//!     → connector.rs (deadline, cancellation, metrics)
//!     → grpc.rs + codec.rs (protobuf on the wire)
//!     → DynamicMessage or InvokeError
//! ```
//!
//! # Design Decisions
//! - Unary methods only
//! - A call never outlives the gateway's force-shutdown token

pub mod codec;
pub mod connector;
pub mod error;
pub mod grpc;
pub mod metadata;

pub use codec::DynamicCodec;
pub use connector::{BackendConnector, RpcBackend, RpcCall};
pub use error::{ConnectError, InvokeError};
pub use grpc::GrpcBackend;
pub use metadata::forwarded_metadata;
