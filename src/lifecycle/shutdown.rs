//! Shutdown coordination.
//!
//! Two tokens drive shutdown. `drain` fires on the termination signal: stop
//! accepting, let in-flight requests finish. `force` fires when the grace
//! period expires: every outstanding request is abandoned.

use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Default)]
pub struct Shutdown {
    drain: CancellationToken,
    force: CancellationToken,
}

impl Shutdown {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin draining.
    pub fn trigger(&self) {
        self.drain.cancel();
    }

    pub fn is_draining(&self) -> bool {
        self.drain.is_cancelled()
    }

    /// Resolves once draining has begun.
    pub async fn draining(&self) {
        self.drain.cancelled().await
    }

    /// Abandon everything still running. Implies draining.
    pub fn force(&self) {
        self.drain.cancel();
        self.force.cancel();
    }

    /// Cancellation token for one request; fires on forced shutdown.
    pub fn request_token(&self) -> CancellationToken {
        self.force.child_token()
    }
}
