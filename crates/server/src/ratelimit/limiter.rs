use std::time::Duration;

use dashmap::DashMap;
use tokio::time::Instant;

/// Buckets kept before stale ones are swept.
const SWEEP_THRESHOLD: usize = 10_000;

/// Result of an allowed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitResult {
    pub limit: u64,
    /// Approximate remaining requests in the current window.
    pub remaining: u64,
    /// Seconds until the current window resets.
    pub reset_after: u64,
}

/// Error returned when the limit is exceeded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitExceeded {
    /// Seconds until the caller can retry.
    pub retry_after: u64,
    pub limit: u64,
}

#[derive(Debug, Clone, Copy)]
struct WindowCounts {
    window_start: u64,
    current: u64,
    previous: u64,
}

/// Per-process rate limiter using the sliding window approximation.
///
/// `effective = previous * weight + current`, where `weight` is the share of
/// the previous window still covered by a window ending now. Clocks come
/// from `tokio::time`, so tests can pause and advance time.
pub struct RateLimiter {
    window_seconds: u64,
    limit: u64,
    origin: Instant,
    buckets: DashMap<String, WindowCounts>,
}

impl RateLimiter {
    pub fn new(window: Duration, limit: u64) -> Self {
        Self {
            window_seconds: window.as_secs().max(1),
            limit,
            origin: Instant::now(),
            buckets: DashMap::new(),
        }
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }

    pub fn window_seconds(&self) -> u64 {
        self.window_seconds
    }

    /// Check and record one request for `key`.
    pub fn check(&self, key: &str) -> Result<RateLimitResult, RateLimitExceeded> {
        self.evaluate(key, true)
    }

    /// Check `key` without recording anything.
    pub fn peek(&self, key: &str) -> Result<RateLimitResult, RateLimitExceeded> {
        self.evaluate(key, false)
    }

    /// Record one event for `key` regardless of the current count.
    pub fn record(&self, key: &str) {
        let (now, window_start) = self.clock();
        let mut entry = self.entry(key, window_start);
        entry.current += 1;
        drop(entry);
        self.sweep(now);
    }

    pub fn tracked_keys(&self) -> usize {
        self.buckets.len()
    }

    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    fn evaluate(&self, key: &str, consume: bool) -> Result<RateLimitResult, RateLimitExceeded> {
        let (now, window_start) = self.clock();
        let window = self.window_seconds;
        let elapsed = now - window_start;
        let reset_after = window.saturating_sub(elapsed);

        let mut entry = self.entry(key, window_start);
        let weight = reset_after as f64 / window as f64;
        let effective = (entry.previous as f64 * weight) as u64 + entry.current;

        if effective >= self.limit {
            return Err(RateLimitExceeded {
                retry_after: reset_after.max(1),
                limit: self.limit,
            });
        }

        let used = if consume {
            entry.current += 1;
            effective + 1
        } else {
            effective
        };
        drop(entry);
        self.sweep(now);

        Ok(RateLimitResult {
            limit: self.limit,
            remaining: self.limit.saturating_sub(used),
            reset_after,
        })
    }

    /// Seconds since creation and the start of the window containing it.
    fn clock(&self) -> (u64, u64) {
        let now = self.origin.elapsed().as_secs();
        (now, (now / self.window_seconds) * self.window_seconds)
    }

    /// Fetch the bucket for `key`, rolled forward to `window_start`.
    fn entry(
        &self,
        key: &str,
        window_start: u64,
    ) -> dashmap::mapref::one::RefMut<'_, String, WindowCounts> {
        let mut entry = self
            .buckets
            .entry(key.to_owned())
            .or_insert(WindowCounts {
                window_start,
                current: 0,
                previous: 0,
            });
        let counts = entry.value_mut();
        if counts.window_start != window_start {
            counts.previous = if counts.window_start + self.window_seconds == window_start {
                counts.current
            } else {
                0
            };
            counts.current = 0;
            counts.window_start = window_start;
        }
        entry
    }

    fn sweep(&self, now: u64) {
        if self.buckets.len() < SWEEP_THRESHOLD {
            return;
        }
        let horizon = now.saturating_sub(2 * self.window_seconds);
        self.buckets.retain(|_, c| c.window_start > horizon);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn blocks_after_limit_within_window() {
        let limiter = RateLimiter::new(Duration::from_secs(60), 3);
        for remaining in [2, 1, 0] {
            assert_eq!(limiter.check("1.2.3.4").unwrap().remaining, remaining);
        }
        let exceeded = limiter.check("1.2.3.4").unwrap_err();
        assert_eq!(exceeded.limit, 3);
        assert_eq!(exceeded.retry_after, 60);

        assert!(limiter.check("5.6.7.8").is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn previous_window_is_weighted() {
        let limiter = RateLimiter::new(Duration::from_secs(100), 4);
        for _ in 0..4 {
            limiter.check("ip").unwrap();
        }

        // 10s into the next window: 4 * 0.9 = 3 still count.
        tokio::time::advance(Duration::from_secs(110)).await;
        assert!(limiter.check("ip").is_ok());
        assert!(limiter.check("ip").is_err());

        // Two windows later nothing carries over.
        tokio::time::advance(Duration::from_secs(200)).await;
        assert_eq!(limiter.check("ip").unwrap().remaining, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn peek_does_not_consume() {
        let limiter = RateLimiter::new(Duration::from_secs(900), 2);
        assert!(limiter.peek("ip").is_ok());
        assert!(limiter.peek("ip").is_ok());
        limiter.record("ip");
        limiter.record("ip");
        let exceeded = limiter.peek("ip").unwrap_err();
        assert_eq!(exceeded.retry_after, 900);
    }

    #[tokio::test(start_paused = true)]
    async fn reset_after_counts_down() {
        let limiter = RateLimiter::new(Duration::from_secs(60), 10);
        tokio::time::advance(Duration::from_secs(45)).await;
        assert_eq!(limiter.check("ip").unwrap().reset_after, 15);
        assert_eq!(limiter.tracked_keys(), 1);
    }
}
