//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (accept, connection limit)
//!     → Hand off to HTTP layer
//!     → inflight.rs (per-request tracking for draining)
//! ```
//!
//! # Design Decisions
//! - Bounded accept prevents resource exhaustion
//! - Each request tracked so shutdown can report what it abandoned

pub mod inflight;
pub mod listener;

pub use inflight::{InFlightGuard, InFlightTracker};
pub use listener::{ConnectionPermit, Listener, ListenerError};
