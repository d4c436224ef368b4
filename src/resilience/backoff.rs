//! Exponential backoff with jitter.

use rand::Rng;
use std::time::Duration;

/// Capped exponential backoff schedule for reconnect loops.
#[derive(Debug, Clone)]
pub struct Backoff {
    base_ms: u64,
    max_ms: u64,
    attempt: u32,
}

impl Backoff {
    pub fn new(base_ms: u64, max_ms: u64) -> Self {
        Self {
            base_ms,
            max_ms,
            attempt: 0,
        }
    }

    /// Attempts made so far.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Delay before the next attempt, doubling up to the cap with up to
    /// 10% jitter so concurrent reconnectors do not stampede.
    pub fn next_delay(&mut self) -> Duration {
        self.attempt = self.attempt.saturating_add(1);
        let exponential = 2u64.saturating_pow(self.attempt.saturating_sub(1));
        let capped = self.base_ms.saturating_mul(exponential).min(self.max_ms);

        let jitter_range = capped / 10;
        let jitter = if jitter_range > 0 {
            rand::thread_rng().gen_range(0..jitter_range)
        } else {
            0
        };

        Duration::from_millis(capped + jitter)
    }
}
