//! Fixed-window request counters keyed by client address.
//!
//! Each limiter is independent. A request subject to several limiters must
//! pass all of them; callers evaluate them one after another.

use crate::error::{GateError, GateResult};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

pub const DEFAULT_WINDOW: Duration = Duration::from_secs(60);
pub const DEFAULT_GLOBAL_LIMIT: u32 = 120;
pub const DEFAULT_VERIFY_LIMIT: u32 = 60;
pub const DEFAULT_SUBMIT_LIMIT: u32 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    pub max_requests: u32,
    pub window: Duration,
}

impl RateLimitPolicy {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    count: u32,
}

pub struct FixedWindowLimiter {
    name: &'static str,
    policy: RateLimitPolicy,
    windows: Mutex<HashMap<String, Window>>,
}

impl FixedWindowLimiter {
    pub fn new(name: &'static str, policy: RateLimitPolicy) -> Self {
        Self {
            name,
            policy,
            windows: Mutex::new(HashMap::new()),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn policy(&self) -> RateLimitPolicy {
        self.policy
    }

    pub fn check(&self, key: &str) -> GateResult<()> {
        self.check_at(key, Instant::now())
    }

    /// Count one request for `key`. Rejected requests still count.
    pub fn check_at(&self, key: &str, now: Instant) -> GateResult<()> {
        let mut windows = self.windows.lock().unwrap_or_else(|e| e.into_inner());
        let window = windows.entry(key.to_string()).or_insert(Window {
            started: now,
            count: 0,
        });
        if now.saturating_duration_since(window.started) >= self.policy.window {
            window.started = now;
            window.count = 0;
        }
        window.count = window.count.saturating_add(1);
        if window.count > self.policy.max_requests {
            let retry_after = self
                .policy
                .window
                .saturating_sub(now.saturating_duration_since(window.started));
            tracing::debug!(
                limiter = self.name,
                client = key,
                count = window.count,
                max = self.policy.max_requests,
                "rate limit exceeded"
            );
            return Err(GateError::RateLimited {
                retry_after: retry_after.max(Duration::from_secs(1)),
            });
        }
        Ok(())
    }

    /// Remove windows that have fully elapsed.
    pub fn sweep_at(&self, now: Instant) -> usize {
        let mut windows = self.windows.lock().unwrap_or_else(|e| e.into_inner());
        let before = windows.len();
        let span = self.policy.window;
        windows.retain(|_, w| now.saturating_duration_since(w.started) < span);
        before - windows.len()
    }

    pub fn tracked_clients(&self) -> usize {
        self.windows.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

/// The three layered limiters applied by the HTTP surface.
pub struct RateLimiters {
    pub global: FixedWindowLimiter,
    pub verify: FixedWindowLimiter,
    pub submit: FixedWindowLimiter,
}

impl RateLimiters {
    pub fn new(window: Duration, global: u32, verify: u32, submit: u32) -> Self {
        Self {
            global: FixedWindowLimiter::new("global", RateLimitPolicy::new(global, window)),
            verify: FixedWindowLimiter::new("verify", RateLimitPolicy::new(verify, window)),
            submit: FixedWindowLimiter::new("submit", RateLimitPolicy::new(submit, window)),
        }
    }

    pub fn sweep_at(&self, now: Instant) -> usize {
        self.global.sweep_at(now) + self.verify.sweep_at(now) + self.submit.sweep_at(now)
    }
}

impl Default for RateLimiters {
    fn default() -> Self {
        Self::new(
            DEFAULT_WINDOW,
            DEFAULT_GLOBAL_LIMIT,
            DEFAULT_VERIFY_LIMIT,
            DEFAULT_SUBMIT_LIMIT,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(max: u32) -> FixedWindowLimiter {
        FixedWindowLimiter::new("test", RateLimitPolicy::new(max, Duration::from_secs(60)))
    }

    #[test]
    fn test_allows_up_to_ceiling_then_rejects() {
        let l = limiter(3);
        let now = Instant::now();
        for _ in 0..3 {
            l.check_at("10.0.0.1", now).unwrap();
        }
        let err = l.check_at("10.0.0.1", now).unwrap_err();
        assert_eq!(err.kind(), "rate_limited");
        assert_eq!(err.retry_after(), Some(Duration::from_secs(60)));
    }

    #[test]
    fn test_clients_are_independent() {
        let l = limiter(1);
        let now = Instant::now();
        l.check_at("10.0.0.1", now).unwrap();
        l.check_at("10.0.0.2", now).unwrap();
        assert!(l.check_at("10.0.0.1", now).is_err());
    }

    #[test]
    fn test_window_resets() {
        let l = limiter(1);
        let start = Instant::now();
        l.check_at("c", start).unwrap();
        assert!(l.check_at("c", start + Duration::from_secs(59)).is_err());
        l.check_at("c", start + Duration::from_secs(60)).unwrap();
    }

    #[test]
    fn test_retry_after_counts_down() {
        let l = limiter(1);
        let start = Instant::now();
        l.check_at("c", start).unwrap();
        let err = l.check_at("c", start + Duration::from_secs(45)).unwrap_err();
        assert_eq!(err.retry_after(), Some(Duration::from_secs(15)));
    }

    #[test]
    fn test_sweep_drops_elapsed_windows() {
        let l = limiter(5);
        let start = Instant::now();
        l.check_at("old", start).unwrap();
        l.check_at("new", start + Duration::from_secs(30)).unwrap();
        assert_eq!(l.sweep_at(start + Duration::from_secs(61)), 1);
        assert_eq!(l.tracked_clients(), 1);
    }

    #[test]
    fn test_default_ceilings() {
        let limiters = RateLimiters::default();
        assert_eq!(limiters.global.policy().max_requests, 120);
        assert_eq!(limiters.verify.policy().max_requests, 60);
        assert_eq!(limiters.submit.policy().max_requests, 30);
        assert_eq!(limiters.submit.policy().window, Duration::from_secs(60));
    }
}
