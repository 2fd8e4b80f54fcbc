//! Per-principal sliding-window rate limiting, enforced ahead of the
//! access-decision pipeline (spec.md's `RateLimit` failure outcome).

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use std::collections::VecDeque;

pub struct RateLimiter {
    windows: DashMap<String, VecDeque<DateTime<Utc>>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self { windows: DashMap::new() }
    }

    /// Drops timestamps older than `window` from `key`'s history, then
    /// admits the current request only if fewer than `limit` remain.
    /// Returns `true` when the request is admitted (and recorded).
    pub fn check_and_record(&self, key: &str, limit: u32, window: Duration, now: DateTime<Utc>) -> bool {
        let mut entry = self.windows.entry(key.to_string()).or_default();
        while entry.front().map(|at| now - *at > window).unwrap_or(false) {
            entry.pop_front();
        }
        if entry.len() as u32 >= limit {
            return false;
        }
        entry.push_back(now);
        true
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}
