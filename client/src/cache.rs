//! Query result caching.
//!
//! Snapshot results are persisted so previously seen data renders without a
//! network round trip. Each cache key holds a value blob and a stored-at
//! timestamp; the freshness rule lives in `bazaar_sync::FreshnessPolicy`.
//! The cache is an optimization, not a correctness requirement: storage
//! failures are logged and treated as a cache miss, never surfaced.

use crate::error::{ClientError, Result};
use crate::source::CollectionSource;
use bazaar_sync::{Filter, FreshnessPolicy, Record, Timestamp};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Current wall-clock time in epoch milliseconds.
pub fn now_ms() -> Timestamp {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// A cached value together with when it was stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedEntry {
    /// The serialized value blob
    pub value: String,
    /// When the blob was written, epoch milliseconds
    pub stored_at: Timestamp,
}

/// Key-value persistence for cached query results.
///
/// One value blob and one timestamp per key; a write replaces both. No
/// eviction policy: callers own key hygiene.
pub trait CacheStore: Send + Sync {
    /// Read the entry for a key, or `None` if absent.
    fn read(&self, key: &str) -> Result<Option<CachedEntry>>;

    /// Write a value blob and its timestamp, replacing any prior entry.
    fn write(&self, key: &str, value: &str, stored_at: Timestamp) -> Result<()>;
}

/// An in-memory cache store.
///
/// Values and timestamps live in separate maps, matching the two-entries-
/// per-key layout of the device key-value store this stands in for.
#[derive(Debug, Default)]
pub struct MemoryCache {
    values: RwLock<HashMap<String, String>>,
    stamps: RwLock<HashMap<String, Timestamp>>,
}

impl MemoryCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }
}

impl CacheStore for MemoryCache {
    fn read(&self, key: &str) -> Result<Option<CachedEntry>> {
        let value = match self.values.read().get(key) {
            Some(value) => value.clone(),
            None => return Ok(None),
        };
        let stored_at = match self.stamps.read().get(key) {
            Some(stamp) => *stamp,
            // Value without a timestamp is unusable.
            None => return Ok(None),
        };
        Ok(Some(CachedEntry { value, stored_at }))
    }

    fn write(&self, key: &str, value: &str, stored_at: Timestamp) -> Result<()> {
        self.values.write().insert(key.to_string(), value.to_string());
        self.stamps.write().insert(key.to_string(), stored_at);
        Ok(())
    }
}

/// Read-through cache over a collection source.
///
/// A fresh hit returns the cached records without a remote call; a miss or
/// stale entry fetches remotely once (no retries) and writes the result
/// back.
pub struct QueryCache {
    store: Arc<dyn CacheStore>,
    policy: FreshnessPolicy,
}

impl QueryCache {
    /// Create a query cache over a store with the given freshness policy.
    pub fn new(store: Arc<dyn CacheStore>, policy: FreshnessPolicy) -> Self {
        Self { store, policy }
    }

    /// Fetch the records for (collection, filter), consulting the cache
    /// first. `now` is the caller's wall clock in epoch milliseconds.
    ///
    /// Remote failures propagate; storage failures are swallowed.
    pub async fn records(
        &self,
        source: &dyn CollectionSource,
        collection: &str,
        filter: &Filter,
        now: Timestamp,
    ) -> Result<Vec<Record>> {
        let key = filter.channel_key(collection);

        if let Some(records) = self.read_fresh(&key, now) {
            tracing::debug!(key = %key, "Cache hit");
            return Ok(records);
        }

        let records = source.fetch_snapshot(collection, filter).await?;
        self.write_back(&key, &records, now);
        Ok(records)
    }

    fn read_fresh(&self, key: &str, now: Timestamp) -> Option<Vec<Record>> {
        let entry = match self.store.read(key) {
            Ok(Some(entry)) => entry,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Cache read failed, treating as absent");
                return None;
            }
        };

        if self.policy.is_stale(entry.stored_at, now) {
            return None;
        }

        match serde_json::from_str(&entry.value) {
            Ok(records) => Some(records),
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Cached blob unreadable, refetching");
                None
            }
        }
    }

    fn write_back(&self, key: &str, records: &[Record], now: Timestamp) {
        let blob = match serde_json::to_string(records) {
            Ok(blob) => blob,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Could not serialize records for cache");
                return;
            }
        };
        if let Err(e) = self.store.write(key, &blob, now) {
            tracing::warn!(key = %key, error = %e, "Cache write failed, continuing without");
        }
    }
}

impl std::fmt::Debug for QueryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryCache")
            .field("policy", &self.policy)
            .finish()
    }
}
