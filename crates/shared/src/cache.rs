//! In-memory key/value cache with TTL
//!
//! Process-local memoization used by the usage and dashboard read paths to
//! avoid redundant database queries within a short window. Entries expire by
//! wall-clock comparison at read time; `cleanup` exists only for memory
//! hygiene, not correctness.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::RwLock;
use std::time::{Duration, Instant};

/// Default cache TTL (60 seconds)
const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(60);

/// Cache entry with expiration. Immutable once set: overwritten, never
/// mutated in place.
#[derive(Clone)]
struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
}

impl<V> CacheEntry<V> {
    fn new(value: V, ttl: Duration) -> Self {
        Self {
            value,
            expires_at: Instant::now() + ttl,
        }
    }

    fn is_expired(&self) -> bool {
        Instant::now() > self.expires_at
    }
}

/// Thread-safe generic TTL cache
pub struct TtlCache<K, V> {
    entries: RwLock<HashMap<K, CacheEntry<V>>>,
    default_ttl: Duration,
}

impl<K: Eq + Hash, V: Clone> Default for TtlCache<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Eq + Hash, V: Clone> TtlCache<K, V> {
    /// Create a new cache with the default TTL
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_CACHE_TTL)
    }

    /// Create a new cache with a custom default TTL
    pub fn with_ttl(default_ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            default_ttl,
        }
    }

    /// Get a cached value. Returns None on miss or expired entry.
    pub fn get(&self, key: &K) -> Option<V> {
        let entries = self.entries.read().ok()?;
        let entry = entries.get(key)?;

        if entry.is_expired() {
            None
        } else {
            Some(entry.value.clone())
        }
    }

    /// Cache a value with the default TTL
    pub fn set(&self, key: K, value: V) {
        self.set_with_ttl(key, value, self.default_ttl);
    }

    /// Cache a value with a per-entry TTL
    pub fn set_with_ttl(&self, key: K, value: V, ttl: Duration) {
        if let Ok(mut entries) = self.entries.write() {
            entries.insert(key, CacheEntry::new(value, ttl));
        }
    }

    /// Invalidate a specific key
    pub fn invalidate(&self, key: &K) {
        if let Ok(mut entries) = self.entries.write() {
            entries.remove(key);
        }
    }

    /// Invalidate all entries whose key matches the predicate
    pub fn invalidate_where<F>(&self, predicate: F)
    where
        F: Fn(&K) -> bool,
    {
        if let Ok(mut entries) = self.entries.write() {
            entries.retain(|key, _| !predicate(key));
        }
    }

    /// Drop all entries
    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.write() {
            entries.clear();
        }
    }

    /// Drop expired entries (call periodically for memory management)
    pub fn cleanup(&self) {
        if let Ok(mut entries) = self.entries.write() {
            entries.retain(|_, entry| !entry.is_expired());
        }
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        if let Ok(entries) = self.entries.read() {
            let total = entries.len();
            let expired = entries.values().filter(|e| e.is_expired()).count();
            CacheStats {
                total_entries: total,
                expired_entries: expired,
                active_entries: total - expired,
            }
        } else {
            CacheStats::default()
        }
    }
}

/// Cache statistics
#[derive(Default, Debug)]
pub struct CacheStats {
    pub total_entries: usize,
    pub expired_entries: usize,
    pub active_entries: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    #[test]
    fn test_cache_get_set() {
        let cache: TtlCache<String, u64> = TtlCache::new();

        // Initially empty
        assert!(cache.get(&"a".to_string()).is_none());

        cache.set("a".to_string(), 42);
        assert_eq!(cache.get(&"a".to_string()), Some(42));
    }

    #[test]
    fn test_cache_overwrite() {
        let cache: TtlCache<String, u64> = TtlCache::new();

        cache.set("a".to_string(), 1);
        cache.set("a".to_string(), 2);
        assert_eq!(cache.get(&"a".to_string()), Some(2));
    }

    #[test]
    fn test_cache_expiration() {
        let cache: TtlCache<String, u64> = TtlCache::with_ttl(Duration::from_millis(50));

        cache.set("a".to_string(), 42);
        assert_eq!(cache.get(&"a".to_string()), Some(42));

        // Wait past the TTL: the entry must read as a miss
        sleep(Duration::from_millis(60));
        assert!(cache.get(&"a".to_string()).is_none());
    }

    #[test]
    fn test_cache_per_entry_ttl_overrides_default() {
        let cache: TtlCache<String, u64> = TtlCache::with_ttl(Duration::from_secs(300));

        cache.set_with_ttl("short".to_string(), 1, Duration::from_millis(40));
        cache.set("long".to_string(), 2);

        sleep(Duration::from_millis(50));
        assert!(cache.get(&"short".to_string()).is_none());
        assert_eq!(cache.get(&"long".to_string()), Some(2));
    }

    #[test]
    fn test_cache_invalidate() {
        let cache: TtlCache<String, u64> = TtlCache::new();

        cache.set("a".to_string(), 1);
        cache.invalidate(&"a".to_string());
        assert!(cache.get(&"a".to_string()).is_none());
    }

    #[test]
    fn test_cache_invalidate_where() {
        let cache: TtlCache<String, u64> = TtlCache::new();

        cache.set("usage:1".to_string(), 1);
        cache.set("usage:2".to_string(), 2);
        cache.set("plan:1".to_string(), 3);

        cache.invalidate_where(|key| key.starts_with("usage:"));

        assert!(cache.get(&"usage:1".to_string()).is_none());
        assert!(cache.get(&"usage:2".to_string()).is_none());
        assert_eq!(cache.get(&"plan:1".to_string()), Some(3));
    }

    #[test]
    fn test_cache_clear() {
        let cache: TtlCache<String, u64> = TtlCache::new();

        cache.set("a".to_string(), 1);
        cache.set("b".to_string(), 2);
        cache.clear();

        assert!(cache.get(&"a".to_string()).is_none());
        assert_eq!(cache.stats().total_entries, 0);
    }

    #[test]
    fn test_cache_cleanup_drops_expired_only() {
        let cache: TtlCache<String, u64> = TtlCache::with_ttl(Duration::from_secs(300));

        cache.set_with_ttl("dead".to_string(), 1, Duration::from_millis(30));
        cache.set("live".to_string(), 2);

        sleep(Duration::from_millis(40));
        cache.cleanup();

        let stats = cache.stats();
        assert_eq!(stats.total_entries, 1);
        assert_eq!(stats.active_entries, 1);
        assert_eq!(cache.get(&"live".to_string()), Some(2));
    }
}
