//! Resilience helpers.
//!
//! # Design Decisions
//! - Every external call has a deadline; the connector enforces it
//! - Only the initial backend connect is retried; RPCs are never retried
//!   because the gateway cannot know whether a method is idempotent

pub mod backoff;

pub use backoff::{calculate_backoff, delay_until_deadline};
