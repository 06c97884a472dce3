//! Failure backoff for external providers.
//!
//! After a failed call the provider is skipped until the delay elapses, so an
//! outage degrades planning to local routing instead of stalling each request.

use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone)]
pub struct Backoff {
    base: Duration,
    max: Duration,
    current: Duration,
    next_attempt_at: Instant,
    jitter_ratio: f64,
    failures: u32,
}

impl Backoff {
    pub fn new(base: Duration, max: Duration) -> Self {
        let base = base.max(Duration::from_millis(1));
        let max = max.max(base);
        Self {
            base,
            max,
            current: base,
            next_attempt_at: Instant::now(),
            jitter_ratio: 0.2,
            failures: 0,
        }
    }

    /// True once the provider may be called again.
    pub fn ready(&self) -> bool {
        Instant::now() >= self.next_attempt_at
    }

    pub fn failures(&self) -> u32 {
        self.failures
    }

    /// Record a success.
    pub fn reset(&mut self) {
        self.current = self.base;
        self.failures = 0;
        self.next_attempt_at = Instant::now();
    }

    /// Record a failure and return how long the provider will be skipped.
    pub fn fail(&mut self) -> Duration {
        let delay = if self.failures == 0 {
            add_jitter(self.current, self.jitter_ratio)
        } else {
            self.current = self.current.saturating_mul(2).min(self.max);
            add_jitter(self.current, self.jitter_ratio)
        };
        self.failures = self.failures.saturating_add(1);
        self.next_attempt_at = Instant::now() + delay;
        delay
    }
}

fn add_jitter(delay: Duration, ratio: f64) -> Duration {
    if !(0.0..=1.0).contains(&ratio) {
        return delay;
    }

    let delay_ms = delay.as_millis();
    let jitter_ms_max = ((delay_ms as f64) * ratio) as u128;
    if jitter_ms_max == 0 {
        return delay;
    }

    let now_nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.subsec_nanos() as u64)
        .unwrap_or(0);
    let jitter_ms = (now_nanos as u128) % (jitter_ms_max + 1);
    delay + Duration::from_millis(jitter_ms as u64)
}
