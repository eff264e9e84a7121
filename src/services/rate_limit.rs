//! In-memory rate limiting, clock injected so tests never sleep.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};

/// Tracks failed login attempts per key (client address). After
/// `max_attempts` failures the key is locked out for the full window,
/// measured from its most recent failure.
pub struct LoginLimiter {
    max_attempts: u32,
    lockout: Duration,
    attempts: HashMap<String, Attempt>,
}

struct Attempt {
    count: u32,
    last_attempt: DateTime<Utc>,
}

impl LoginLimiter {
    pub fn new(max_attempts: u32, lockout: Duration) -> Self {
        Self {
            max_attempts,
            lockout,
            attempts: HashMap::new(),
        }
    }

    /// Err carries the number of seconds until the lockout expires.
    pub fn check(&mut self, key: &str, now: DateTime<Utc>) -> Result<(), u64> {
        self.evict_expired(now);

        match self.attempts.get(key) {
            Some(attempt) if attempt.count >= self.max_attempts => {
                let elapsed = now - attempt.last_attempt;
                let remaining = self.lockout - elapsed;
                Err(remaining.num_seconds().max(1) as u64)
            }
            _ => Ok(()),
        }
    }

    pub fn record_failure(&mut self, key: &str, now: DateTime<Utc>) {
        let attempt = self.attempts.entry(key.to_string()).or_insert(Attempt {
            count: 0,
            last_attempt: now,
        });
        attempt.count += 1;
        attempt.last_attempt = now;
    }

    pub fn clear(&mut self, key: &str) {
        self.attempts.remove(key);
    }

    fn evict_expired(&mut self, now: DateTime<Utc>) {
        let lockout = self.lockout;
        self.attempts
            .retain(|_, a| now - a.last_attempt < lockout);
    }
}

/// Per-key sliding window: at most `max` acquisitions per `window`.
pub struct SlidingWindowLimiter {
    max: usize,
    window: Duration,
    hits: HashMap<String, Vec<DateTime<Utc>>>,
}

impl SlidingWindowLimiter {
    pub fn new(max: usize, window: Duration) -> Self {
        Self {
            max,
            window,
            hits: HashMap::new(),
        }
    }

    /// Err carries the number of seconds until the oldest hit leaves the
    /// window.
    pub fn try_acquire(&mut self, key: &str, now: DateTime<Utc>) -> Result<(), u64> {
        let window = self.window;
        self.hits.retain(|_, stamps| {
            stamps.retain(|t| now - *t < window);
            !stamps.is_empty()
        });

        let stamps = self.hits.entry(key.to_string()).or_default();
        if stamps.len() >= self.max {
            let oldest = stamps[0];
            let retry_after = (oldest + window) - now;
            return Err(retry_after.num_seconds().max(1) as u64);
        }
        stamps.push(now);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn test_login_allows_until_max_failures() {
        let mut limiter = LoginLimiter::new(3, Duration::minutes(15));
        for i in 0..2 {
            assert!(limiter.check("10.0.0.1", at(i)).is_ok());
            limiter.record_failure("10.0.0.1", at(i));
        }
        assert!(limiter.check("10.0.0.1", at(2)).is_ok());
    }

    #[test]
    fn test_login_locks_out_after_max_failures() {
        let mut limiter = LoginLimiter::new(3, Duration::minutes(15));
        for i in 0..3 {
            limiter.record_failure("10.0.0.1", at(i));
        }
        let retry_after = limiter.check("10.0.0.1", at(10)).unwrap_err();
        assert!(retry_after > 0 && retry_after <= 15 * 60);
    }

    #[test]
    fn test_login_lockout_expires() {
        let mut limiter = LoginLimiter::new(3, Duration::minutes(15));
        for i in 0..3 {
            limiter.record_failure("10.0.0.1", at(i));
        }
        assert!(limiter.check("10.0.0.1", at(15 * 60 + 3)).is_ok());
    }

    #[test]
    fn test_login_keys_are_independent() {
        let mut limiter = LoginLimiter::new(1, Duration::minutes(15));
        limiter.record_failure("10.0.0.1", at(0));
        assert!(limiter.check("10.0.0.1", at(1)).is_err());
        assert!(limiter.check("10.0.0.2", at(1)).is_ok());
    }

    #[test]
    fn test_login_clear_resets() {
        let mut limiter = LoginLimiter::new(1, Duration::minutes(15));
        limiter.record_failure("10.0.0.1", at(0));
        limiter.clear("10.0.0.1");
        assert!(limiter.check("10.0.0.1", at(1)).is_ok());
    }

    #[test]
    fn test_login_evicts_stale_entries() {
        let mut limiter = LoginLimiter::new(1, Duration::minutes(15));
        limiter.record_failure("10.0.0.1", at(0));
        limiter.record_failure("10.0.0.2", at(0));
        let _ = limiter.check("other", at(16 * 60));
        assert!(limiter.attempts.is_empty());
    }

    #[test]
    fn test_window_allows_up_to_max() {
        let mut limiter = SlidingWindowLimiter::new(5, Duration::hours(1));
        for i in 0..5 {
            assert!(limiter.try_acquire("a@b.com", at(i)).is_ok());
        }
        assert!(limiter.try_acquire("a@b.com", at(5)).is_err());
    }

    #[test]
    fn test_window_slides() {
        let mut limiter = SlidingWindowLimiter::new(2, Duration::hours(1));
        assert!(limiter.try_acquire("a@b.com", at(0)).is_ok());
        assert!(limiter.try_acquire("a@b.com", at(10)).is_ok());
        assert!(limiter.try_acquire("a@b.com", at(20)).is_err());
        // First hit falls out of the window.
        assert!(limiter.try_acquire("a@b.com", at(3601)).is_ok());
    }

    #[test]
    fn test_window_retry_after_counts_down() {
        let mut limiter = SlidingWindowLimiter::new(1, Duration::hours(1));
        limiter.try_acquire("a@b.com", at(0)).unwrap();
        let retry_after = limiter.try_acquire("a@b.com", at(600)).unwrap_err();
        assert_eq!(retry_after, 3000);
    }

    #[test]
    fn test_window_evicts_idle_keys() {
        let mut limiter = SlidingWindowLimiter::new(1, Duration::hours(1));
        limiter.try_acquire("a@b.com", at(0)).unwrap();
        limiter.try_acquire("c@d.com", at(3700)).unwrap();
        assert!(!limiter.hits.contains_key("a@b.com"));
    }
}
