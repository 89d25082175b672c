//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Descriptors → Backend connect → Registry → Listener bind
//!
//! Run (controller.rs):
//!     Serving → signal (signals.rs) → Draining → Stopped
//!
//! Shutdown (shutdown.rs):
//!     drain token: stop accepting, finish in-flight
//!     force token: abandon what is left after the grace period
//! ```
//!
//! # Design Decisions
//! - Ordered startup: backend first, listener last
//! - Ordered shutdown: stop accept, drain, force, close backend
//! - Shutdown has a deadline: the grace period

pub mod controller;
pub mod shutdown;
pub mod signals;
pub mod startup;
pub mod state;

pub use controller::{Gateway, ShutdownReport};
pub use shutdown::Shutdown;
pub use startup::{start, start_with, StartupError};
pub use state::LifecycleState;
