//! Login rate limiting.
//!
//! Sliding window of failure timestamps per login key, pruned on each check,
//! with a lockout once the window fills. A successful login clears the key.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Duration, Utc};

/// Why a login attempt was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RateLimitReason {
    /// Too many failures inside the window; locked out.
    LockedOut { seconds_remaining: i64 },
}

#[derive(Debug, Clone, Default)]
struct AttemptEntry {
    /// Failure timestamps inside the current window, oldest first.
    failures: Vec<DateTime<Utc>>,
    locked_until: Option<DateTime<Utc>>,
}

/// Sliding-window limiter for login attempts.
pub struct LoginRateLimiter {
    max_attempts: usize,
    window: Duration,
    lockout: Duration,
    attempts: RwLock<HashMap<String, AttemptEntry>>,
}

impl LoginRateLimiter {
    pub fn new(max_attempts: usize, window_secs: i64, lockout_secs: i64) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            window: Duration::seconds(window_secs.max(1)),
            lockout: Duration::seconds(lockout_secs.max(1)),
            attempts: RwLock::new(HashMap::new()),
        }
    }

    /// Check whether a login attempt for `key` may proceed.
    pub fn check(&self, key: &str, now: DateTime<Utc>) -> Result<(), RateLimitReason> {
        let mut attempts = self.attempts.write().expect("rate limit lock poisoned");
        let entry = attempts.entry(key.to_string()).or_default();

        if let Some(until) = entry.locked_until {
            if now < until {
                return Err(RateLimitReason::LockedOut {
                    seconds_remaining: (until - now).num_seconds().max(1),
                });
            }
            // Lockout elapsed; start fresh.
            entry.locked_until = None;
            entry.failures.clear();
        }

        let cutoff = now - self.window;
        entry.failures.retain(|t| *t > cutoff);

        if entry.failures.len() >= self.max_attempts {
            let until = now + self.lockout;
            entry.locked_until = Some(until);
            return Err(RateLimitReason::LockedOut {
                seconds_remaining: self.lockout.num_seconds(),
            });
        }
        Ok(())
    }

    /// Record a failed attempt for `key`.
    pub fn record_failure(&self, key: &str, now: DateTime<Utc>) {
        let mut attempts = self.attempts.write().expect("rate limit lock poisoned");
        let entry = attempts.entry(key.to_string()).or_default();
        entry.failures.push(now);
    }

    /// Clear state for `key` after a successful login.
    pub fn clear(&self, key: &str) {
        let mut attempts = self.attempts.write().expect("rate limit lock poisoned");
        attempts.remove(key);
    }

    /// Drop idle entries. Called by the maintenance sweep.
    pub fn prune(&self, now: DateTime<Utc>) -> usize {
        let cutoff = now - self.window;
        let mut attempts = self.attempts.write().expect("rate limit lock poisoned");
        let before = attempts.len();
        attempts.retain(|_, entry| {
            let locked = entry.locked_until.map(|u| u > now).unwrap_or(false);
            locked || entry.failures.iter().any(|t| *t > cutoff)
        });
        before - attempts.len()
    }

    pub fn tracked_keys(&self) -> usize {
        self.attempts.read().expect("rate limit lock poisoned").len()
    }
}
