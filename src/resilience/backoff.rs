//! Exponential backoff with jitter for backend connect attempts.

use std::time::{Duration, Instant};

use rand::Rng;

/// Calculate exponential backoff delay with jitter.
pub fn calculate_backoff(attempt: u32, base_ms: u64, max_ms: u64) -> Duration {
    if attempt == 0 {
        return Duration::from_millis(0);
    }

    let exponential_base = 2u64.saturating_pow(attempt - 1);
    let capped_delay = base_ms.saturating_mul(exponential_base).min(max_ms);

    // Jitter: 0 to 10% of the delay
    let jitter_range = capped_delay / 10;
    let jitter = if jitter_range > 0 {
        rand::thread_rng().gen_range(0..jitter_range)
    } else {
        0
    };

    Duration::from_millis(capped_delay + jitter)
}

/// Delay before the next attempt, clipped so it never sleeps past `deadline`.
///
/// Returns `None` once the deadline has been reached.
pub fn delay_until_deadline(
    attempt: u32,
    base_ms: u64,
    max_ms: u64,
    deadline: Instant,
) -> Option<Duration> {
    let remaining = deadline.checked_duration_since(Instant::now())?;
    if remaining.is_zero() {
        return None;
    }
    Some(calculate_backoff(attempt, base_ms, max_ms).min(remaining))
}
