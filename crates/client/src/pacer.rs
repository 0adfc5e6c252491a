use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

/// Default minimum spacing between outbound requests.
pub const DEFAULT_MIN_INTERVAL: Duration = Duration::from_millis(500);

/// Cooperative minimum-interval limiter.
///
/// Each call to [`Pacer::wait`] returns no earlier than `interval` after the
/// previous one returned. Concurrent callers queue on the lock and are
/// released one interval apart.
#[derive(Debug)]
pub struct Pacer {
    interval: Duration,
    next_slot: Mutex<Option<Instant>>,
}

impl Default for Pacer {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_INTERVAL)
    }
}

impl Pacer {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            next_slot: Mutex::new(None),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Wait for the next free slot and claim it.
    pub async fn wait(&self) {
        if self.interval.is_zero() {
            return;
        }
        let mut next_slot = self.next_slot.lock().await;
        if let Some(slot) = *next_slot {
            tokio::time::sleep_until(slot).await;
        }
        *next_slot = Some(Instant::now() + self.interval);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn first_call_does_not_wait() {
        let pacer = Pacer::default();
        let start = Instant::now();
        pacer.wait().await;
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn calls_are_spaced_by_the_interval() {
        let pacer = Pacer::new(Duration::from_millis(500));
        let start = Instant::now();
        for _ in 0..3 {
            pacer.wait().await;
        }
        assert!(start.elapsed() >= Duration::from_millis(1000));
        assert!(start.elapsed() < Duration::from_millis(1500));
    }

    #[tokio::test(start_paused = true)]
    async fn idle_time_counts_toward_the_interval() {
        let pacer = Pacer::new(Duration::from_millis(500));
        pacer.wait().await;
        tokio::time::sleep(Duration::from_secs(2)).await;
        let start = Instant::now();
        pacer.wait().await;
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_callers_are_serialized() {
        let pacer = Arc::new(Pacer::new(Duration::from_millis(100)));
        let start = Instant::now();
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let pacer = Arc::clone(&pacer);
                tokio::spawn(async move {
                    pacer.wait().await;
                    Instant::now()
                })
            })
            .collect();
        let mut released = Vec::new();
        for handle in handles {
            released.push(handle.await.unwrap() - start);
        }
        released.sort();
        for (i, at) in released.iter().enumerate() {
            assert!(*at >= Duration::from_millis(100) * u32::try_from(i).unwrap());
        }
    }

    #[tokio::test(start_paused = true)]
    async fn zero_interval_never_waits() {
        let pacer = Pacer::new(Duration::ZERO);
        let start = Instant::now();
        for _ in 0..10 {
            pacer.wait().await;
        }
        assert_eq!(start.elapsed(), Duration::ZERO);
    }
}
