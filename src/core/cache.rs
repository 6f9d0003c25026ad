//! Generic TTL cache, one instantiation per analysis kind.
//!
//! Keys follow the `"<kind>:<mint>"` namespace convention so that safety
//! results, holder counts and smart-money classifications can share the same
//! cache type without colliding. `get` is the only operation that updates
//! hit/miss counters; `cleanup` sweeps expired entries without touching them.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::RwLock;

struct Entry<V> {
    value: V,
    expires_at: Instant,
}

/// Point-in-time snapshot of cache usage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CacheStats {
    pub size: usize,
    pub hits: u64,
    pub misses: u64,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Mapping from string key to value with a per-entry absolute expiry.
///
/// Concurrent access is serialized through a single `RwLock` rather than
/// sharded the way [`dashmap::DashMap`] is; the cached values here (safety
/// verdicts, holder snapshots, smart-money verdicts) are small and looked up
/// far less often than the per-tick hot path, so lock-free sharding buys
/// nothing. Read from both sync and async call sites without `.await`ing a
/// lock acquisition.
pub struct TtlCache<V> {
    entries: RwLock<HashMap<String, Entry<V>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<V: Clone> TtlCache<V> {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn set(&self, key: impl Into<String>, value: V, ttl: Duration) {
        self.entries.write().insert(
            key.into(),
            Entry {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
    }

    /// Returns the value if present and unexpired, evicting it otherwise.
    pub fn get(&self, key: &str) -> Option<V> {
        let now = Instant::now();
        {
            let entries = self.entries.read();
            if let Some(entry) = entries.get(key) {
                if entry.expires_at > now {
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    return Some(entry.value.clone());
                }
            } else {
                self.misses.fetch_add(1, Ordering::Relaxed);
                return None;
            }
        }
        // Expired: drop it under a write lock, then record the miss.
        self.entries.write().remove(key);
        self.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    /// Presence check that does not affect hit/miss counters.
    pub fn has(&self, key: &str) -> bool {
        let entries = self.entries.read();
        matches!(entries.get(key), Some(e) if e.expires_at > Instant::now())
    }

    pub fn delete(&self, key: &str) -> bool {
        self.entries.write().remove(key).is_some()
    }

    /// Sweeps all expired entries and returns how many were removed.
    pub fn cleanup(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, e| e.expires_at > now);
        before - entries.len()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            size: self.entries.read().len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }
}

impl<V: Clone> Default for TtlCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

/// Builds a `"<kind>:<mint>"` cache key.
pub fn key(kind: &str, mint: &str) -> String {
    format!("{kind}:{mint}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_then_get_hits() {
        let cache: TtlCache<u32> = TtlCache::new();
        cache.set(key("token_safety", "mintA"), 7, Duration::from_secs(60));
        assert_eq!(cache.get(&key("token_safety", "mintA")), Some(7));
        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 0);
    }

    #[test]
    fn missing_key_is_a_miss() {
        let cache: TtlCache<u32> = TtlCache::new();
        assert_eq!(cache.get("token_safety:missing"), None);
        assert_eq!(cache.stats().misses, 1);
    }

    #[test]
    fn expired_entry_evicts_on_get() {
        let cache: TtlCache<u32> = TtlCache::new();
        cache.set("k", 1, Duration::from_millis(0));
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(cache.get("k"), None);
        assert_eq!(cache.stats().size, 0);
    }

    #[test]
    fn cleanup_sweeps_expired_without_touching_live() {
        let cache: TtlCache<u32> = TtlCache::new();
        cache.set("stale", 1, Duration::from_millis(0));
        cache.set("fresh", 2, Duration::from_secs(60));
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(cache.cleanup(), 1);
        assert_eq!(cache.stats().size, 1);
        assert!(cache.has("fresh"));
    }

    #[test]
    fn delete_removes_entry() {
        let cache: TtlCache<u32> = TtlCache::new();
        cache.set("k", 1, Duration::from_secs(60));
        assert!(cache.delete("k"));
        assert!(!cache.has("k"));
    }

    #[test]
    fn hit_rate_reflects_history() {
        let cache: TtlCache<u32> = TtlCache::new();
        cache.set("k", 1, Duration::from_secs(60));
        cache.get("k");
        cache.get("k");
        cache.get("missing");
        let stats = cache.stats();
        assert!((stats.hit_rate() - 2.0 / 3.0).abs() < 1e-9);
    }
}
