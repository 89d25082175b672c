//! In-flight request tracking.
//!
//! # Responsibilities
//! - Count requests currently inside the gateway
//! - Report how many were still running when the grace period expired

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::observability::metrics;

/// Shared counter of requests being handled.
#[derive(Debug, Clone, Default)]
pub struct InFlightTracker {
    active: Arc<AtomicUsize>,
}

impl InFlightTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a request entering the gateway. The guard decrements on drop.
    pub fn track(&self) -> InFlightGuard {
        let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        metrics::set_in_flight(active);
        InFlightGuard {
            active: Arc::clone(&self.active),
        }
    }

    pub fn active(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }
}

/// Held for the duration of one request.
#[derive(Debug)]
pub struct InFlightGuard {
    active: Arc<AtomicUsize>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        let remaining = self.active.fetch_sub(1, Ordering::SeqCst) - 1;
        metrics::set_in_flight(remaining);
    }
}
