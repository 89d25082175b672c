//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Route Compilation (at startup):
//!     FileDescriptorSet → schema.rs (DescriptorPool)
//!     RouteConfig[]
//!     → template.rs (parse path templates)
//!     → registry.rs (bind to RPC methods, reject duplicates/overlaps)
//!     → Freeze as immutable MethodRegistry
//!
//! Incoming Request (verb, path)
//!     → registry.rs (verb bucket, template match)
//!     → Return: ResolvedMethod or NotFound
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - No regex in hot path (segment comparison only)
//! - Deterministic: overlapping templates cannot be registered, so at most
//!   one route matches any request

pub mod registry;
pub mod schema;
pub mod template;

pub use registry::{
    routable_verb, BodyMapping, MethodDescriptor, MethodRegistry, RegistryError, ResolvedMethod,
    ROUTABLE_VERBS,
};
pub use schema::{find_rpc, load_descriptor_pool, rpc_name, SchemaError};
pub use template::{normalize_path, PathParams, PathTemplate, TemplateError};
