//! Lifecycle Controller.
//!
//! # Data Flow
//! ```text
//! Starting ──(startup.rs: backend, registry, listener)──► Serving
//! Serving  ──(SIGINT/SIGTERM, Shutdown::trigger, listener failure)──► Draining
//! Draining ──(all connections done | grace period expired → force)──► Stopped
//! Stopped  : backend connection closed
//! ```
//!
//! # Design Decisions
//! - Draining is advisory: in-flight requests get the full grace period
//! - Forcing is mandatory: connection tasks are aborted before the request
//!   tokens fire, so clients see a reset rather than a crafted error body
//! - A listener failure takes the same drain path and is returned from `run`

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use crate::backend::BackendConnector;
use crate::http::HttpServer;
use crate::lifecycle::shutdown::Shutdown;
use crate::lifecycle::signals::watch_signals;
use crate::lifecycle::state::LifecycleState;
use crate::net::{InFlightTracker, ListenerError};

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShutdownReport {
    /// The grace period expired before every connection finished.
    pub forced: bool,
    /// Requests still executing when they were terminated.
    pub abandoned: usize,
}

/// A started gateway, ready to serve.
pub struct Gateway {
    server: HttpServer,
    connector: Arc<BackendConnector>,
    shutdown: Shutdown,
    in_flight: InFlightTracker,
    grace_period: Duration,
    state: watch::Sender<LifecycleState>,
    handle_signals: bool,
}

impl Gateway {
    pub(crate) fn new(
        server: HttpServer,
        connector: Arc<BackendConnector>,
        shutdown: Shutdown,
        in_flight: InFlightTracker,
        grace_period: Duration,
    ) -> Self {
        let (state, _) = watch::channel(LifecycleState::Starting);
        Self {
            server,
            connector,
            shutdown,
            in_flight,
            grace_period,
            state,
            handle_signals: true,
        }
    }

    /// Do not install OS signal handlers; shutdown only via `shutdown_handle`.
    pub fn without_signal_handlers(mut self) -> Self {
        self.handle_signals = false;
        self
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.server.local_addr()
    }

    /// Trigger draining from outside, e.g. from tests or an embedding process.
    pub fn shutdown_handle(&self) -> Shutdown {
        self.shutdown.clone()
    }

    pub fn state(&self) -> watch::Receiver<LifecycleState> {
        self.state.subscribe()
    }

    /// Serve until shutdown, then drain and stop.
    pub async fn run(self) -> Result<ShutdownReport, ListenerError> {
        let Gateway {
            server,
            connector,
            shutdown,
            in_flight,
            grace_period,
            state,
            handle_signals,
        } = self;

        let signals = handle_signals.then(|| tokio::spawn(watch_signals(shutdown.clone())));

        tracing::info!(address = %server.local_addr(), "Listening for connections");
        transition(&state, LifecycleState::Serving);

        let outcome = server.serve(shutdown.clone()).await;
        if outcome.error.is_some() {
            shutdown.trigger();
        }

        transition(&state, LifecycleState::Draining);
        tracing::info!(
            in_flight = in_flight.active(),
            grace_period_secs = grace_period.as_secs_f64(),
            "Draining in-flight requests"
        );

        let mut connections = outcome.connections;
        let drained = tokio::time::timeout(grace_period, async {
            while connections.join_next().await.is_some() {}
        })
        .await
        .is_ok();

        let report = if drained {
            tracing::info!("All requests drained");
            ShutdownReport {
                forced: false,
                abandoned: 0,
            }
        } else {
            let abandoned = in_flight.active();
            connections.abort_all();
            shutdown.force();
            while connections.join_next().await.is_some() {}
            tracing::warn!(abandoned, "Grace period expired, remaining requests terminated");
            ShutdownReport {
                forced: true,
                abandoned,
            }
        };

        if let Some(signals) = signals {
            signals.abort();
        }
        release_backend(connector);
        transition(&state, LifecycleState::Stopped);

        match outcome.error {
            Some(e) => Err(e),
            None => Ok(report),
        }
    }
}

/// Connection tasks are joined by now, so the controller should hold the last
/// reference to the connector.
fn release_backend(connector: Arc<BackendConnector>) {
    match Arc::try_unwrap(connector) {
        Ok(connector) => {
            connector.close();
        }
        Err(shared) => tracing::warn!(
            references = Arc::strong_count(&shared) - 1,
            "Backend connector still referenced at stop; channel closes when released"
        ),
    }
}

fn transition(state: &watch::Sender<LifecycleState>, next: LifecycleState) {
    tracing::info!(state = %next, "Lifecycle transition");
    state.send_replace(next);
}
