//! In-memory cache of query results.
//!
//! Entries are keyed by [`Query::signature`](notes_model_rs::query::Query::signature)
//! and expire after a fixed TTL. The cache is bounded; inserting into a full
//! cache evicts the entry stored earliest.
//!
//! Every lookup and insert takes `now` explicitly in its `_at` form so tests
//! can control expiry without sleeping.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use notes_model_rs::query::QueryResult;
use parking_lot::Mutex;
use tracing::debug;

#[derive(Debug, Clone)]
struct CacheEntry {
    result: QueryResult,
    stored_at: DateTime<Utc>,
}

/// A bounded, TTL-expiring result cache safe to share across threads.
#[derive(Debug)]
pub struct ResultCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
    ttl: Duration,
    max_size: usize,
}

impl ResultCache {
    /// Creates a cache holding at most `max_size` results for `ttl` each.
    pub fn new(ttl: Duration, max_size: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
            max_size,
        }
    }

    /// Returns a fresh copy of the cached result, marked `from_cache`.
    pub fn get(&self, key: &str) -> Option<QueryResult> {
        self.get_at(key, Utc::now())
    }

    /// Like [`get`](Self::get), evaluated at `now`. Expired entries are removed.
    pub fn get_at(&self, key: &str, now: DateTime<Utc>) -> Option<QueryResult> {
        let mut entries = self.entries.lock();
        let entry = entries.get(key)?;

        let age = (now - entry.stored_at).to_std().unwrap_or_default();
        if age > self.ttl {
            debug!(key, "Cache entry expired");
            entries.remove(key);
            return None;
        }

        let mut result = entry.result.clone();
        result.from_cache = true;
        Some(result)
    }

    /// Stores a result under `key`. An existing entry is replaced.
    pub fn insert(&self, key: impl Into<String>, result: QueryResult) {
        self.insert_at(key, result, Utc::now());
    }

    /// Like [`insert`](Self::insert), stamped with `now`.
    pub fn insert_at(&self, key: impl Into<String>, result: QueryResult, now: DateTime<Utc>) {
        if self.max_size == 0 {
            return;
        }
        let key = key.into();
        let mut entries = self.entries.lock();

        if !entries.contains_key(&key) && entries.len() >= self.max_size {
            let oldest = entries
                .iter()
                .min_by_key(|(_, entry)| entry.stored_at)
                .map(|(k, _)| k.clone());
            if let Some(oldest) = oldest {
                debug!(key = %oldest, "Evicting oldest cache entry");
                entries.remove(&oldest);
            }
        }

        entries.insert(
            key,
            CacheEntry {
                result,
                stored_at: now,
            },
        );
    }

    /// Removes every entry.
    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    /// Number of stored entries, including expired ones not yet looked up.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Returns true if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum number of entries.
    pub fn max_size(&self) -> usize {
        self.max_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use notes_model_rs::query::QueryItems;

    fn make_result(total: usize) -> QueryResult {
        QueryResult {
            items: QueryItems::Flat(vec![]),
            total_count: total,
            execution_time_ms: 0.0,
            from_cache: false,
            warnings: vec![],
        }
    }

    fn t(seconds: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + chrono::Duration::seconds(seconds)
    }

    fn cache(max_size: usize) -> ResultCache {
        ResultCache::new(Duration::from_secs(60), max_size)
    }

    #[test]
    fn test_hit_is_marked_from_cache() {
        let cache = cache(10);
        cache.insert_at("q", make_result(3), t(0));

        let hit = cache.get_at("q", t(10)).unwrap();
        assert!(hit.from_cache);
        assert_eq!(hit.total_count, 3);
    }

    #[test]
    fn test_miss() {
        assert!(cache(10).get_at("q", t(0)).is_none());
    }

    #[test]
    fn test_expired_entry_is_dropped() {
        let cache = cache(10);
        cache.insert_at("q", make_result(1), t(0));

        assert!(cache.get_at("q", t(60)).is_some());
        assert!(cache.get_at("q", t(61)).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_last_write_wins() {
        let cache = cache(10);
        cache.insert_at("q", make_result(1), t(0));
        cache.insert_at("q", make_result(2), t(1));

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get_at("q", t(2)).unwrap().total_count, 2);
    }

    #[test]
    fn test_full_cache_evicts_oldest() {
        let cache = cache(2);
        cache.insert_at("a", make_result(1), t(0));
        cache.insert_at("b", make_result(2), t(1));
        cache.insert_at("c", make_result(3), t(2));

        assert_eq!(cache.len(), 2);
        assert!(cache.get_at("a", t(3)).is_none());
        assert!(cache.get_at("b", t(3)).is_some());
        assert!(cache.get_at("c", t(3)).is_some());
    }

    #[test]
    fn test_zero_capacity_stores_nothing() {
        let cache = cache(0);
        cache.insert_at("a", make_result(1), t(0));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_clear() {
        let cache = cache(10);
        cache.insert_at("a", make_result(1), t(0));
        cache.clear();
        assert!(cache.get_at("a", t(0)).is_none());
    }
}
