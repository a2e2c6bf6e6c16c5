//! Cache freshness rules.
//!
//! The client persists query snapshots for offline display and reuses them
//! while fresh instead of refetching. Like the rest of this crate, the rule
//! is pure: callers pass wall-clock time in as epoch milliseconds.

use crate::Timestamp;
use serde::{Deserialize, Serialize};

/// Default time-to-live for cached query results: 5 minutes.
pub const DEFAULT_TTL_MS: u64 = 5 * 60 * 1000;

/// Decides whether a cached value is still fresh.
///
/// A value stored at `stored_at` is fresh at `now` while the elapsed time
/// does not exceed the ttl; past that it must be refetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FreshnessPolicy {
    /// Time-to-live in milliseconds
    pub ttl_ms: u64,
}

impl Default for FreshnessPolicy {
    fn default() -> Self {
        Self {
            ttl_ms: DEFAULT_TTL_MS,
        }
    }
}

impl FreshnessPolicy {
    /// Create a policy with a specific ttl.
    pub fn new(ttl_ms: u64) -> Self {
        Self { ttl_ms }
    }

    /// Whether a value stored at `stored_at` is still fresh at `now`.
    ///
    /// Timestamps from the future (clock skew) count as fresh.
    pub fn is_fresh(&self, stored_at: Timestamp, now: Timestamp) -> bool {
        now.saturating_sub(stored_at) <= self.ttl_ms
    }

    /// Whether a value stored at `stored_at` must be refetched at `now`.
    pub fn is_stale(&self, stored_at: Timestamp, now: Timestamp) -> bool {
        !self.is_fresh(stored_at, now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_ttl_is_five_minutes() {
        assert_eq!(FreshnessPolicy::default().ttl_ms, 300_000);
    }

    #[test]
    fn fresh_just_inside_threshold() {
        let policy = FreshnessPolicy::new(1000);
        let stored_at = 50_000;

        assert!(policy.is_fresh(stored_at, stored_at + 999));
        assert!(policy.is_fresh(stored_at, stored_at + 1000));
    }

    #[test]
    fn stale_just_past_threshold() {
        let policy = FreshnessPolicy::new(1000);
        let stored_at = 50_000;

        assert!(policy.is_stale(stored_at, stored_at + 1001));
    }

    #[test]
    fn future_timestamp_is_fresh() {
        let policy = FreshnessPolicy::new(1000);
        assert!(policy.is_fresh(10_000, 5_000));
    }
}
