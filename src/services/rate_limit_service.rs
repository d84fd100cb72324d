use moka::sync::Cache;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Fixed-window rate limiter keyed by caller-chosen strings
/// (e.g. `"join:<session>"`, `"chat:<session>"`).
///
/// Windows are entries in a TTL cache: a key's counter lives for exactly one
/// window length and eviction is handled by the cache itself, not by the
/// request path.
pub struct RateLimiter {
    windows: Cache<String, Arc<AtomicU32>>,
}

impl RateLimiter {
    pub fn new(window: Duration) -> Self {
        Self {
            windows: Cache::builder()
                .max_capacity(100_000)
                .time_to_live(window)
                .build(),
        }
    }

    /// Record one hit for `key`; returns true when the hit pushes the key
    /// over `max_requests` for the current window.
    pub fn hit(&self, key: &str, max_requests: u32) -> bool {
        let counter = self
            .windows
            .get_with(key.to_string(), || Arc::new(AtomicU32::new(0)));
        counter.fetch_add(1, Ordering::Relaxed) + 1 > max_requests
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limits_after_max_requests() {
        let limiter = RateLimiter::new(Duration::from_secs(60));
        for _ in 0..3 {
            assert!(!limiter.hit("join:s1", 3));
        }
        assert!(limiter.hit("join:s1", 3));
        assert!(limiter.hit("join:s1", 3));
    }

    #[test]
    fn keys_are_isolated() {
        let limiter = RateLimiter::new(Duration::from_secs(60));
        for _ in 0..3 {
            assert!(!limiter.hit("chat:s1", 3));
        }
        assert!(limiter.hit("chat:s1", 3));
        assert!(!limiter.hit("chat:s2", 3));
    }

    #[test]
    fn window_expiry_resets_the_counter() {
        let limiter = RateLimiter::new(Duration::from_millis(50));
        assert!(!limiter.hit("k", 1));
        assert!(limiter.hit("k", 1));
        std::thread::sleep(Duration::from_millis(80));
        assert!(!limiter.hit("k", 1));
    }
}
