use crate::models::MediaItem;
use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};
use tracing::debug;

pub const MOVIES_KEY: &str = "movies";
pub const LATEST_MOVIES_KEY: &str = "latestMovies";
pub const SERIES_KEY: &str = "series";

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    fetched_at: Instant,
    ttl: Duration,
}

impl<V> CacheEntry<V> {
    fn is_fresh(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.fetched_at) <= self.ttl
    }
}

/// Map whose entries expire `ttl` after they were written.
///
/// Expired entries are only dropped when read; there is no size bound.
#[derive(Debug, Clone)]
pub struct TtlCache<K, V> {
    entries: HashMap<K, CacheEntry<V>>,
}

impl<K, V> Default for TtlCache<K, V> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<K: Eq + Hash, V: Clone> TtlCache<K, V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&mut self, key: &K) -> Option<V> {
        self.get_at(key, Instant::now())
    }

    pub fn get_at(&mut self, key: &K, now: Instant) -> Option<V> {
        let fresh = self.entries.get(key)?.is_fresh(now);
        if !fresh {
            self.entries.remove(key);
            return None;
        }
        self.entries.get(key).map(|entry| entry.value.clone())
    }

    pub fn set(&mut self, key: K, value: V, ttl: Duration) {
        self.set_at(key, value, ttl, Instant::now());
    }

    pub fn set_at(&mut self, key: K, value: V, ttl: Duration, now: Instant) {
        self.entries.insert(
            key,
            CacheEntry {
                value,
                fetched_at: now,
                ttl,
            },
        );
    }

    pub fn invalidate(&mut self, key: &K) -> bool {
        self.entries.remove(key).is_some()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Lists keyed by logical resource name plus a per-item details map.
#[derive(Debug, Clone)]
pub struct MediaCache {
    lists: TtlCache<String, Vec<MediaItem>>,
    details: TtlCache<String, MediaItem>,
    list_ttl: Duration,
    details_ttl: Duration,
}

impl MediaCache {
    pub fn new(list_ttl: Duration, details_ttl: Duration) -> Self {
        Self {
            lists: TtlCache::new(),
            details: TtlCache::new(),
            list_ttl,
            details_ttl,
        }
    }

    pub fn list(&mut self, key: &str) -> Option<Vec<MediaItem>> {
        let hit = self.lists.get(&key.to_string());
        debug!(key, hit = hit.is_some(), "list cache lookup");
        hit
    }

    pub fn store_list(&mut self, key: &str, items: Vec<MediaItem>) {
        self.lists.set(key.to_string(), items, self.list_ttl);
    }

    pub fn details(&mut self, item_id: &str) -> Option<MediaItem> {
        let hit = self.details.get(&item_id.to_string());
        debug!(item_id, hit = hit.is_some(), "details cache lookup");
        hit
    }

    pub fn store_details(&mut self, item: MediaItem) {
        self.details.set(item.id.clone(), item, self.details_ttl);
    }

    pub fn invalidate_list(&mut self, key: &str) {
        self.lists.invalidate(&key.to_string());
    }

    pub fn invalidate_details(&mut self, item_id: &str) {
        if self.details.invalidate(&item_id.to_string()) {
            debug!(item_id, "details cache entry invalidated");
        }
    }

    pub fn clear(&mut self) {
        self.lists.clear();
        self.details.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TTL: Duration = Duration::from_secs(60);

    #[test]
    fn test_get_within_ttl_returns_value() {
        let mut cache = TtlCache::new();
        let start = Instant::now();
        cache.set_at("movies", 1, TTL, start);
        assert_eq!(cache.get_at(&"movies", start + Duration::from_secs(30)), Some(1));
        // the bound itself is still fresh
        assert_eq!(cache.get_at(&"movies", start + TTL), Some(1));
    }

    #[test]
    fn test_get_after_ttl_is_a_miss_and_drops_entry() {
        let mut cache = TtlCache::new();
        let start = Instant::now();
        cache.set_at("movies", 1, TTL, start);
        assert_eq!(cache.get_at(&"movies", start + TTL + Duration::from_millis(1)), None);
        assert!(cache.entries.is_empty());
    }

    #[test]
    fn test_overwrite_resets_expiry_clock() {
        let mut cache = TtlCache::new();
        let start = Instant::now();
        cache.set_at("movies", 1, TTL, start);
        cache.set_at("movies", 2, TTL, start + Duration::from_secs(50));
        assert_eq!(cache.get_at(&"movies", start + Duration::from_secs(100)), Some(2));
    }

    #[test]
    fn test_invalidate_and_missing_key() {
        let mut cache: TtlCache<&str, i32> = TtlCache::new();
        assert_eq!(cache.get(&"nope"), None);
        cache.set("a", 1, TTL);
        assert!(cache.invalidate(&"a"));
        assert!(!cache.invalidate(&"a"));
        assert_eq!(cache.get(&"a"), None);
    }

    #[test]
    fn test_media_cache_details_invalidation() {
        let mut cache = MediaCache::new(TTL, TTL);
        let item = MediaItem {
            id: "42".to_string(),
            name: "Alien".to_string(),
            ..Default::default()
        };
        cache.store_details(item.clone());
        cache.store_list(MOVIES_KEY, vec![item.clone()]);

        assert_eq!(cache.details("42"), Some(item.clone()));
        cache.invalidate_details("42");
        assert_eq!(cache.details("42"), None);
        // list entry is untouched
        assert_eq!(cache.list(MOVIES_KEY).map(|l| l.len()), Some(1));
    }
}
