//! In-memory result cache for repeated DQL exports.
//!
//! Entries are keyed by a sha256 over connection name and query text and
//! evicted lazily once they outlive the configured time-to-live. Within one
//! run each (connection, query) pair is dispatched at most once, so no
//! per-key build locking is required.

use crate::db::types::ResultSet;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};
use tracing::info;

struct CacheEntry {
    result: ResultSet,
    stored_at: Instant,
}

/// A thread-safe TTL cache of materialized result sets.
pub struct QueryCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    max_age: Duration,
}

impl QueryCache {
    /// Creates a cache whose entries expire after `max_age`.
    pub fn new(max_age: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            max_age,
        }
    }

    /// Stores a result set for the given connection and query.
    pub fn set(&self, connection_name: &str, query: &str, result: ResultSet) {
        let mut entries = self.entries.write().expect("cache lock poisoned");
        entries.insert(
            cache_key(connection_name, query),
            CacheEntry {
                result,
                stored_at: Instant::now(),
            },
        );
    }

    /// Returns the cached result for the given connection and query, if any.
    pub fn get(&self, connection_name: &str, query: &str) -> Option<ResultSet> {
        let entries = self.entries.read().expect("cache lock poisoned");
        let entry = entries.get(&cache_key(connection_name, query))?;

        if entry.stored_at.elapsed() > self.max_age {
            info!(connection = %connection_name, "Cache entry expired");
            return None;
        }

        Some(entry.result.clone())
    }

    /// Removes all cache entries.
    #[allow(dead_code)]
    pub fn clear(&self) {
        let mut entries = self.entries.write().expect("cache lock poisoned");
        entries.clear();
    }

    /// Removes all cache entries older than the given duration.
    #[allow(dead_code)]
    pub fn invalidate_older(&self, older_than: Duration) {
        let mut entries = self.entries.write().expect("cache lock poisoned");
        entries.retain(|_, entry| entry.stored_at.elapsed() <= older_than);
    }
}

/// Returns the sha256 cache key for the given connection and query.
fn cache_key(connection_name: &str, query: &str) -> String {
    let digest = Sha256::digest(format!("{connection_name}-{query}").as_bytes());
    digest.iter().map(|b| format!("{b:02x}")).collect()
}
