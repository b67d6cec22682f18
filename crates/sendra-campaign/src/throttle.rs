// SPDX-FileCopyrightText: 2026 Sendra Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Token-bucket pacing for gateway calls.
//!
//! The dispatcher acquires one token per send. Small batches burst through
//! on the initial bucket; sustained batches settle at the configured
//! messages-per-second rate.

use std::time::Duration;

use tokio::time::Instant;

/// Token bucket with fractional refill.
#[derive(Debug)]
pub struct RateLimiter {
    capacity: f64,
    tokens: f64,
    refill_per_sec: f64,
    last_refill: Instant,
}

impl RateLimiter {
    /// A bucket holding `burst` tokens, refilled at `rate` tokens per second.
    ///
    /// Non-positive rates are clamped to a slow trickle rather than
    /// dividing by zero; config validation rejects them earlier.
    pub fn new(rate: f64, burst: u32) -> Self {
        let refill_per_sec = if rate > 0.0 { rate } else { 0.1 };
        let capacity = f64::from(burst.max(1));
        Self {
            capacity,
            tokens: capacity,
            refill_per_sec,
            last_refill: Instant::now(),
        }
    }

    fn refill(&mut self) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.refill_per_sec).min(self.capacity);
        self.last_refill = now;
    }

    /// Take one token, sleeping until the bucket refills if it is empty.
    pub async fn acquire(&mut self) {
        self.refill();
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            return;
        }
        let deficit = 1.0 - self.tokens;
        let wait = Duration::from_secs_f64(deficit / self.refill_per_sec);
        tokio::time::sleep(wait).await;
        self.refill();
        self.tokens = (self.tokens - 1.0).max(0.0);
    }
}
