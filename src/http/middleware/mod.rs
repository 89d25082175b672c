//! Middleware pipeline.
//!
//! # Data Flow
//! ```text
//! Request
//!     → RequestId (assign / keep x-request-id, echo it on the response)
//!     → AccessLog (observes the final status of everything below)
//!     → Cors (answers OPTIONS, decorates all other responses)
//!     → Translation handler
//! ```
//!
//! # Design Decisions
//! - The chain is an ordered list, outermost first, folded onto the router
//!   once at startup
//! - Each interceptor either calls the next layer or short-circuits

pub mod access_log;
pub mod cors;

use std::sync::Arc;

use axum::{middleware, Router};
use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};

use crate::http::request::{UuidRequestId, X_REQUEST_ID};

pub use access_log::{access_log, ResolvedRpc};
pub use cors::{cors, CorsPolicy};

#[derive(Debug, Clone)]
pub enum Interceptor {
    RequestId,
    AccessLog,
    Cors(Arc<CorsPolicy>),
}

impl Interceptor {
    fn wrap(&self, router: Router) -> Router {
        match self {
            // Set runs first, then Propagate copies the id onto the response
            Interceptor::RequestId => router
                .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
                .layer(SetRequestIdLayer::new(X_REQUEST_ID, UuidRequestId)),
            Interceptor::AccessLog => router.layer(middleware::from_fn(access_log)),
            Interceptor::Cors(policy) => {
                router.layer(middleware::from_fn_with_state(policy.clone(), cors))
            }
        }
    }
}

/// The gateway's interceptors, outermost first.
pub fn standard_chain(cors: CorsPolicy) -> Vec<Interceptor> {
    vec![
        Interceptor::RequestId,
        Interceptor::AccessLog,
        Interceptor::Cors(Arc::new(cors)),
    ]
}

/// Wrap `router` so that `chain[0]` sees requests first.
pub fn apply(router: Router, chain: &[Interceptor]) -> Router {
    chain
        .iter()
        .rev()
        .fold(router, |router, interceptor| interceptor.wrap(router))
}
