//! Sliding-window admission control for outbound queries.
//!
//! The limiter keeps the timestamps of requests made within the last
//! `window` and admits a new request while fewer than `max_requests` are
//! retained. Every operation runs under one mutex, so a single limiter can be
//! shared by all concurrent query tasks.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Limits for a [`RateLimiter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub max_requests: usize,
    pub window_seconds: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 100,
            window_seconds: 60,
        }
    }
}

pub struct RateLimiter {
    max_requests: usize,
    window: Duration,
    timestamps: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests: max_requests.max(1),
            window,
            timestamps: Mutex::new(VecDeque::new()),
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(config.max_requests, Duration::from_secs(config.window_seconds))
    }

    /// Locks the window and drops timestamps that have aged out.
    fn window(&self) -> MutexGuard<'_, VecDeque<Instant>> {
        // A panic while holding the lock cannot leave the deque inconsistent.
        let mut timestamps = self.timestamps.lock().unwrap_or_else(|e| e.into_inner());
        let now = Instant::now();
        while let Some(oldest) = timestamps.front() {
            if now.duration_since(*oldest) >= self.window {
                timestamps.pop_front();
            } else {
                break;
            }
        }
        timestamps
    }

    /// True while fewer than `max_requests` requests fall inside the window.
    pub fn can_admit(&self) -> bool {
        self.window().len() < self.max_requests
    }

    pub fn record_request(&self) {
        self.window().push_back(Instant::now());
    }

    /// Whole seconds until the oldest retained request leaves the window.
    ///
    /// Rounded up; zero when a request could be admitted now.
    pub fn wait_seconds(&self) -> u64 {
        let wait = self.wait_duration();
        let secs = wait.as_secs();
        if wait.subsec_nanos() > 0 {
            secs + 1
        } else {
            secs
        }
    }

    fn wait_duration(&self) -> Duration {
        let timestamps = self.window();
        if timestamps.len() < self.max_requests {
            return Duration::ZERO;
        }
        match timestamps.front() {
            Some(oldest) => (*oldest + self.window).saturating_duration_since(Instant::now()),
            None => Duration::ZERO,
        }
    }

    /// Admits and records a request atomically. Returns false when full.
    pub fn try_acquire(&self) -> bool {
        let mut timestamps = self.window();
        if timestamps.len() < self.max_requests {
            timestamps.push_back(Instant::now());
            true
        } else {
            false
        }
    }

    /// Waits until a request can be admitted, then records it.
    pub async fn acquire(&self) {
        loop {
            if self.try_acquire() {
                return;
            }
            let wait = self.wait_duration().max(Duration::from_millis(10));
            debug!(wait_ms = wait.as_millis() as u64, "rate limit reached, waiting");
            tokio::time::sleep(wait).await;
        }
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::from_config(&RateLimitConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_blocks_after_max_requests() {
        let limiter = RateLimiter::new(3, Duration::from_secs(10));

        for _ in 0..3 {
            assert!(limiter.can_admit());
            limiter.record_request();
        }
        assert!(!limiter.can_admit());
        assert_eq!(limiter.wait_seconds(), 10);
    }

    #[tokio::test(start_paused = true)]
    async fn test_admits_again_after_window() {
        let limiter = RateLimiter::new(2, Duration::from_secs(5));
        limiter.record_request();
        limiter.record_request();
        assert!(!limiter.can_admit());

        tokio::time::advance(Duration::from_secs(5)).await;
        assert!(limiter.can_admit());
        assert_eq!(limiter.wait_seconds(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_seconds_rounds_up() {
        let limiter = RateLimiter::new(1, Duration::from_secs(3));
        limiter.record_request();

        tokio::time::advance(Duration::from_millis(1500)).await;
        assert_eq!(limiter.wait_seconds(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_acquire_waits_for_slot() {
        let limiter = RateLimiter::new(1, Duration::from_secs(2));
        let start = Instant::now();

        limiter.acquire().await;
        limiter.acquire().await;

        assert!(start.elapsed() >= Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_concurrent_try_acquire_never_overadmits() {
        let limiter = Arc::new(RateLimiter::new(5, Duration::from_secs(60)));
        let mut handles = Vec::new();
        for _ in 0..20 {
            let limiter = limiter.clone();
            handles.push(tokio::spawn(async move { limiter.try_acquire() }));
        }

        let mut admitted = 0;
        for handle in handles {
            if handle.await.unwrap() {
                admitted += 1;
            }
        }
        assert_eq!(admitted, 5);
    }

    #[test]
    fn test_zero_max_requests_is_clamped() {
        let limiter = RateLimiter::new(0, Duration::from_secs(1));
        assert!(limiter.try_acquire());
    }
}
