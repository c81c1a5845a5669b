#![forbid(unsafe_code)]
#![deny(missing_docs)]

//! **tenant-cache** – A non-authoritative persistence-cache abstraction.
//!
//! This crate defines the *shape* of a convenience cache — structured keys,
//! TTL expiry, hit/miss accounting — and ships one in-memory reference
//! implementation. It deliberately carries no on-disk schema: persisting
//! cached analysis results is explicitly out of scope for this runtime, but
//! ambient caching behavior (what the teacher's analysis-tool cache layer
//! does for itself) is not, so callers that want a cache still get one
//! shaped like the rest of the codebase.
//!
//! Grounded on `toka-analysis-tools`'s `ResultCache`/`CacheConfig`/
//! `CacheStats`, generalized from a single `AnalysisResult` value type to
//! any `Clone + Send + Sync` value and from a bare `String` key to
//! [`CacheKey`], a structured key built from named parts rather than a
//! hash of keyword arguments.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

/// A cache key built from an explicit namespace plus ordered parts, e.g.
/// `CacheKey::new("law_match", ["doc-42", "v1"])` instead of a hash over a
/// kwargs dict — the parts a cache entry depends on are named in code, not
/// reconstructed from a digest.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CacheKey(String);

impl CacheKey {
    /// Build a key as `namespace:part1:part2:...`.
    pub fn new<'a>(namespace: &str, parts: impl IntoIterator<Item = &'a str>) -> Self {
        let mut key = namespace.to_string();
        for part in parts {
            key.push(':');
            key.push_str(part);
        }
        Self(key)
    }
}

/// Cache tunables. Field names mirror the teacher's `CacheConfig`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Whether the cache is active at all; `false` turns every [`PersistenceCache`]
    /// method into a no-op, matching the teacher's enable switch.
    pub enabled: bool,
    /// Maximum number of entries retained before the oldest is evicted.
    pub max_entries: usize,
    /// Time an entry remains valid after being written.
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_entries: 1000,
            ttl: Duration::from_secs(3600),
        }
    }
}

/// Running hit/miss counters for one cache instance.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheStats {
    /// Lookups that found a live entry.
    pub hits: u64,
    /// Lookups that found nothing or an expired entry.
    pub misses: u64,
    /// Current entry count.
    pub entries: usize,
}

/// A non-authoritative, best-effort cache over `V`. Every method degrades
/// gracefully: a cache miss or a disabled cache is never an error, only an
/// absence the caller falls back from.
#[async_trait]
pub trait PersistenceCache<V>: Send + Sync
where
    V: Clone + Send + Sync,
{
    /// Fetch a live entry for `key`, if one exists and hasn't expired.
    async fn get(&self, key: &CacheKey) -> Option<V>;
    /// Store `value` under `key`, evicting the oldest entry if the cache is full.
    async fn put(&self, key: CacheKey, value: V);
    /// Remove a single entry, if present.
    async fn invalidate(&self, key: &CacheKey);
    /// Drop every entry.
    async fn clear(&self);
    /// Current hit/miss/entry counters.
    async fn stats(&self) -> CacheStats;
}

struct Entry<V> {
    value: V,
    written_at: Instant,
}

/// An in-process, TTL-expiring [`PersistenceCache`] reference implementation.
/// Not shared across process restarts — there is no schema to persist it
/// with.
pub struct InMemoryCache<V> {
    config: CacheConfig,
    entries: DashMap<CacheKey, Entry<V>>,
    hits: std::sync::atomic::AtomicU64,
    misses: std::sync::atomic::AtomicU64,
}

impl<V> InMemoryCache<V> {
    /// Build a cache governed by `config`.
    pub fn new(config: CacheConfig) -> Self {
        Self {
            config,
            entries: DashMap::new(),
            hits: std::sync::atomic::AtomicU64::new(0),
            misses: std::sync::atomic::AtomicU64::new(0),
        }
    }

    fn evict_oldest(&self) {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|entry| entry.written_at)
            .map(|entry| entry.key().clone());
        if let Some(key) = oldest {
            self.entries.remove(&key);
        }
    }
}

#[async_trait]
impl<V> PersistenceCache<V> for InMemoryCache<V>
where
    V: Clone + Send + Sync,
{
    async fn get(&self, key: &CacheKey) -> Option<V> {
        if !self.config.enabled {
            return None;
        }

        if let Some(entry) = self.entries.get(key) {
            if entry.written_at.elapsed() < self.config.ttl {
                self.hits.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                return Some(entry.value.clone());
            }
        } else {
            self.misses.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
            return None;
        }

        self.entries.remove(key);
        self.misses.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        None
    }

    async fn put(&self, key: CacheKey, value: V) {
        if !self.config.enabled {
            return;
        }
        if self.entries.len() >= self.config.max_entries && !self.entries.contains_key(&key) {
            self.evict_oldest();
        }
        self.entries.insert(
            key,
            Entry {
                value,
                written_at: Instant::now(),
            },
        );
    }

    async fn invalidate(&self, key: &CacheKey) {
        self.entries.remove(key);
    }

    async fn clear(&self) {
        self.entries.clear();
    }

    async fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(std::sync::atomic::Ordering::Relaxed),
            misses: self.misses.load(std::sync::atomic::Ordering::Relaxed),
            entries: self.entries.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn miss_then_hit() {
        let cache = InMemoryCache::new(CacheConfig::default());
        let key = CacheKey::new("law_match", ["doc-1"]);
        assert_eq!(cache.get(&key).await, None);
        cache.put(key.clone(), "eviction_general".to_string()).await;
        assert_eq!(cache.get(&key).await, Some("eviction_general".to_string()));
        let stats = cache.stats().await;
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }

    #[tokio::test]
    async fn disabled_cache_never_stores() {
        let cache: InMemoryCache<String> = InMemoryCache::new(CacheConfig {
            enabled: false,
            ..CacheConfig::default()
        });
        let key = CacheKey::new("ns", ["a"]);
        cache.put(key.clone(), "x".into()).await;
        assert_eq!(cache.get(&key).await, None);
    }

    #[tokio::test]
    async fn entry_expires_after_ttl() {
        let cache = InMemoryCache::new(CacheConfig {
            ttl: Duration::from_millis(10),
            ..CacheConfig::default()
        });
        let key = CacheKey::new("ns", ["a"]);
        cache.put(key.clone(), "x".to_string()).await;
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(cache.get(&key).await, None);
    }

    #[tokio::test]
    async fn overflow_evicts_oldest_entry() {
        let cache = InMemoryCache::new(CacheConfig {
            max_entries: 2,
            ..CacheConfig::default()
        });
        cache.put(CacheKey::new("ns", ["a"]), "1".to_string()).await;
        tokio::time::sleep(Duration::from_millis(5)).await;
        cache.put(CacheKey::new("ns", ["b"]), "2".to_string()).await;
        tokio::time::sleep(Duration::from_millis(5)).await;
        cache.put(CacheKey::new("ns", ["c"]), "3".to_string()).await;

        assert_eq!(cache.get(&CacheKey::new("ns", ["a"])).await, None);
        assert!(cache.get(&CacheKey::new("ns", ["b"])).await.is_some());
        assert!(cache.get(&CacheKey::new("ns", ["c"])).await.is_some());
    }
}
