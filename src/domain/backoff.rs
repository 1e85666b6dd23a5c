//! Linear Reconnect Backoff
//!
//! The delay before retry `n` is `base_delay * n`. Once `max_attempts`
//! retries have been handed out the ladder is exhausted and the caller
//! is expected to stop streaming for good.

use std::time::Duration;

/// Retry ladder for a streaming transport that opened and later failed.
#[derive(Debug, Clone)]
pub struct LinearBackoff {
    /// Delay unit; retry `n` waits `n` units.
    base_delay: Duration,
    /// Retries allowed before the ladder is exhausted.
    max_attempts: u32,
    /// Retries handed out since the last successful open.
    attempts: u32,
}

impl LinearBackoff {
    /// Create a fresh ladder.
    pub const fn new(base_delay: Duration, max_attempts: u32) -> Self {
        Self {
            base_delay,
            max_attempts,
            attempts: 0,
        }
    }

    /// Claim the next rung of the ladder.
    ///
    /// Returns `None` when `max_attempts` retries were already handed out.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.attempts >= self.max_attempts {
            return None;
        }

        self.attempts += 1;
        Some(
            self.base_delay
                .checked_mul(self.attempts)
                .unwrap_or(Duration::MAX),
        )
    }

    /// Reset after the transport opened successfully.
    pub const fn reset(&mut self) {
        self.attempts = 0;
    }

    /// Retries handed out since the last reset.
    pub const fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Configured retry limit.
    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Whether every retry has been handed out.
    pub const fn is_exhausted(&self) -> bool {
        self.attempts >= self.max_attempts
    }
}
