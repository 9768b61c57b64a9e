//! Per-caller request spacing.
//!
//! Advisory only: callers are told how long to wait, never rejected.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::debug;

#[derive(Debug)]
pub struct RateLimiter {
    spacing: Duration,
    last_seen: DashMap<String, Instant>,
}

impl RateLimiter {
    pub fn new(spacing: Duration) -> Self {
        Self {
            spacing,
            last_seen: DashMap::new(),
        }
    }

    /// Delay the caller must wait before proceeding.
    ///
    /// The instant the caller is allowed to proceed is recorded, so a burst
    /// of requests is spread out `spacing` apart rather than all waiting on
    /// the first one.
    pub fn throttle(&self, caller: &str) -> Duration {
        let now = Instant::now();
        match self.last_seen.entry(caller.to_string()) {
            Entry::Occupied(mut entry) => {
                let ready_at = (*entry.get() + self.spacing).max(now);
                entry.insert(ready_at);
                ready_at - now
            }
            Entry::Vacant(entry) => {
                entry.insert(now);
                Duration::ZERO
            }
        }
    }

    /// Wait out the caller's delay.
    pub async fn wait(&self, caller: &str) {
        let delay = self.throttle(caller);
        if !delay.is_zero() {
            debug!("Throttling {} for {:?}", caller, delay);
            tokio::time::sleep(delay).await;
        }
    }

    /// Drop callers not seen for longer than `max_idle`. Returns how many were removed.
    pub fn sweep(&self, max_idle: Duration) -> usize {
        let now = Instant::now();
        let before = self.last_seen.len();
        self.last_seen
            .retain(|_, last| now.saturating_duration_since(*last) <= max_idle);
        before - self.last_seen.len()
    }

    pub fn tracked_callers(&self) -> usize {
        self.last_seen.len()
    }

    /// Spawn a task that sweeps stale callers every `interval`.
    pub fn spawn_sweeper(self: &Arc<Self>, interval: Duration, max_idle: Duration) -> JoinHandle<()> {
        let limiter = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let removed = limiter.sweep(max_idle);
                if removed > 0 {
                    debug!("Evicted {} idle rate limit entries", removed);
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SPACING: Duration = Duration::from_millis(600);

    #[tokio::test(start_paused = true)]
    async fn test_first_request_is_not_delayed() {
        let limiter = RateLimiter::new(SPACING);
        assert_eq!(limiter.throttle("1.2.3.4"), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rapid_requests_are_spaced() {
        let limiter = RateLimiter::new(SPACING);
        assert_eq!(limiter.throttle("1.2.3.4"), Duration::ZERO);

        tokio::time::advance(Duration::from_millis(100)).await;
        assert_eq!(limiter.throttle("1.2.3.4"), Duration::from_millis(500));

        // A third request right away queues behind the second.
        assert_eq!(limiter.throttle("1.2.3.4"), Duration::from_millis(1100));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_enforces_spacing() {
        let limiter = RateLimiter::new(SPACING);
        let started = Instant::now();
        limiter.wait("anon").await;
        limiter.wait("anon").await;
        assert!(started.elapsed() >= SPACING);
    }

    #[tokio::test(start_paused = true)]
    async fn test_callers_are_independent() {
        let limiter = RateLimiter::new(SPACING);
        assert_eq!(limiter.throttle("a"), Duration::ZERO);
        assert_eq!(limiter.throttle("b"), Duration::ZERO);
        assert!(limiter.throttle("a") > Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_spacing_elapsed_means_no_delay() {
        let limiter = RateLimiter::new(SPACING);
        limiter.throttle("a");
        tokio::time::advance(Duration::from_millis(700)).await;
        assert_eq!(limiter.throttle("a"), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_evicts_idle_callers() {
        let limiter = RateLimiter::new(SPACING);
        limiter.throttle("old");
        tokio::time::advance(Duration::from_secs(10)).await;
        limiter.throttle("fresh");

        assert_eq!(limiter.sweep(Duration::from_secs(5)), 1);
        assert_eq!(limiter.tracked_callers(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_task_runs() {
        let limiter = Arc::new(RateLimiter::new(SPACING));
        limiter.throttle("old");
        let handle = limiter.spawn_sweeper(Duration::from_secs(1), Duration::from_secs(2));

        tokio::time::sleep(Duration::from_secs(4)).await;
        assert_eq!(limiter.tracked_callers(), 0);
        handle.abort();
    }
}
