//! Startup orchestration.
//!
//! # Responsibilities
//! - Load descriptors and connect the backend
//! - Build the method registry and the middleware chain
//! - Bind the listener last, so traffic only arrives once everything is ready
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal and nothing is served

use std::sync::Arc;

use axum::http::header::InvalidHeaderValue;
use prost_reflect::DescriptorPool;
use thiserror::Error;

use crate::backend::{BackendConnector, ConnectError};
use crate::config::GatewayConfig;
use crate::http::{build_router, AppState, CorsPolicy, HttpServer};
use crate::lifecycle::controller::Gateway;
use crate::lifecycle::shutdown::Shutdown;
use crate::net::{InFlightTracker, Listener, ListenerError};
use crate::routing::{load_descriptor_pool, MethodRegistry, RegistryError, SchemaError};
use crate::translate::TranslationEngine;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("invalid CORS header value: {0}")]
    Cors(#[from] InvalidHeaderValue),

    #[error(transparent)]
    Listener(#[from] ListenerError),
}

/// Start from configuration: descriptors from disk, a real backend connection.
pub async fn start(config: &GatewayConfig) -> Result<Gateway, StartupError> {
    tracing::info!(backend = %config.backend.address, "Gateway starting");

    let pool = load_descriptor_pool(config.schema.descriptor_set.as_deref())?;
    let connector = BackendConnector::connect(&config.backend).await?;
    start_with(config, &pool, connector).await
}

/// Start with an already loaded pool and an established connector.
pub async fn start_with(
    config: &GatewayConfig,
    pool: &DescriptorPool,
    connector: BackendConnector,
) -> Result<Gateway, StartupError> {
    let connector = Arc::new(connector);
    let registry = Arc::new(MethodRegistry::from_routes(pool, &config.routes)?);
    let cors = CorsPolicy::from_config(&config.cors)?;

    let shutdown = Shutdown::new();
    let in_flight = InFlightTracker::new();
    let engine = TranslationEngine::new(registry, connector.clone(), config.backend.forward_headers);

    let state = AppState {
        engine: Arc::new(engine),
        shutdown: shutdown.clone(),
        in_flight: in_flight.clone(),
        max_body_bytes: config.listener.max_body_bytes,
    };
    let router = build_router(state, cors);

    let listener = Listener::bind(&config.listener).await?;
    let server = HttpServer::new(listener, router);

    Ok(Gateway::new(
        server,
        connector,
        shutdown,
        in_flight,
        config.lifecycle.grace_period(),
    ))
}
