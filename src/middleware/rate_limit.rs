//! In-memory sliding-window rate limiting.
//!
//! One shared [`RateLimiter`] serves every guarded route; the limit and
//! window are chosen per route by the guard configuration. State lives in
//! process memory, so limits reset on restart and are per instance.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Tracks request timestamps per client identifier.
///
/// The map is guarded by a [`Mutex`] because the guard runs on whatever
/// worker thread picks up the request; the critical section is a few
/// comparisons, so contention stays negligible.
#[derive(Default)]
pub struct RateLimiter {
    windows: Mutex<HashMap<String, Vec<Instant>>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an attempt and report whether it exceeds the limit.
    ///
    /// Returns `true` when the identifier already has `limit` requests
    /// inside the window; the rejected attempt itself is not recorded, so
    /// a client that keeps retrying does not push its recovery further
    /// into the future. Timestamps at or past the window boundary are
    /// pruned first.
    ///
    /// This never fails; a poisoned lock is recovered, not propagated.
    pub fn check(&self, limit: usize, window: Duration, identifier: &str) -> bool {
        let now = Instant::now();
        let mut windows = match self.windows.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        let timestamps = windows.entry(identifier.to_string()).or_default();
        timestamps.retain(|t| now.duration_since(*t) < window);

        if timestamps.len() >= limit {
            return true;
        }

        timestamps.push(now);
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    const WINDOW: Duration = Duration::from_millis(200);

    #[test]
    fn allows_up_to_the_limit_then_rejects() {
        let limiter = RateLimiter::new();

        assert!(!limiter.check(2, WINDOW, "41.220.1.1"));
        assert!(!limiter.check(2, WINDOW, "41.220.1.1"));
        assert!(limiter.check(2, WINDOW, "41.220.1.1"));
    }

    #[test]
    fn identifiers_are_tracked_independently() {
        let limiter = RateLimiter::new();

        assert!(!limiter.check(1, WINDOW, "41.220.1.1"));
        assert!(limiter.check(1, WINDOW, "41.220.1.1"));
        assert!(!limiter.check(1, WINDOW, "41.220.1.2"));
    }

    #[test]
    fn rejected_attempts_do_not_consume_capacity() {
        let limiter = RateLimiter::new();

        assert!(!limiter.check(1, WINDOW, "anonymous"));
        // Hammering while limited must not extend the lockout.
        assert!(limiter.check(1, WINDOW, "anonymous"));
        assert!(limiter.check(1, WINDOW, "anonymous"));

        sleep(WINDOW + Duration::from_millis(50));
        assert!(!limiter.check(1, WINDOW, "anonymous"));
    }

    #[test]
    fn capacity_returns_after_the_window_elapses() {
        let limiter = RateLimiter::new();

        assert!(!limiter.check(2, WINDOW, "41.220.1.1"));
        assert!(!limiter.check(2, WINDOW, "41.220.1.1"));
        assert!(limiter.check(2, WINDOW, "41.220.1.1"));

        sleep(WINDOW + Duration::from_millis(50));
        assert!(!limiter.check(2, WINDOW, "41.220.1.1"));
        assert!(!limiter.check(2, WINDOW, "41.220.1.1"));
        assert!(limiter.check(2, WINDOW, "41.220.1.1"));
    }
}
