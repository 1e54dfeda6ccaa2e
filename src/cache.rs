//! Cache provider capability and a bundled TTL cache.

use crate::options::RequestOptions;
use crate::result::IpResult;
use async_trait::async_trait;
use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::RwLock;
use std::time::{Duration, Instant};

/// Pluggable store for per-address lookup results.
///
/// Eviction and expiry policy is entirely the provider's concern, as is
/// whether two queries with different option sets share a namespace; the
/// provider receives the options on every call and decides. Failures stay
/// inside the provider: a failed read is an empty map, a failed write is
/// silent.
#[async_trait]
pub trait CacheProvider: Send + Sync {
    /// Return cached results for whichever of `addresses` the provider
    /// holds a live entry for under `options`.
    async fn get_cache_records(
        &self,
        addresses: &[IpAddr],
        options: &RequestOptions,
    ) -> HashMap<IpAddr, IpResult>;

    /// Offer freshly fetched results for storage.
    async fn set_cache_record(&self, results: &HashMap<IpAddr, IpResult>, options: &RequestOptions);
}

#[derive(Debug, Clone)]
struct CacheEntry {
    result: IpResult,
    cached_at: Instant,
    ttl: Duration,
}

impl CacheEntry {
    fn is_expired(&self) -> bool {
        self.cached_at.elapsed() > self.ttl
    }
}

/// Thread-safe in-memory TTL cache, namespaced by option set.
pub struct MemoryCacheProvider {
    cache: RwLock<HashMap<(IpAddr, RequestOptions), CacheEntry>>,
    default_ttl: Duration,
    max_entries: usize,
}

impl MemoryCacheProvider {
    /// Create a cache with the given entry TTL and capacity.
    pub fn new(default_ttl_seconds: u64, max_entries: usize) -> Self {
        Self {
            cache: RwLock::new(HashMap::new()),
            default_ttl: Duration::from_secs(default_ttl_seconds),
            max_entries,
        }
    }

    fn insert(&self, ip: IpAddr, options: &RequestOptions, result: IpResult, ttl: Duration) {
        let key = (ip, options.clone());
        let entry = CacheEntry {
            result,
            cached_at: Instant::now(),
            ttl,
        };

        if let Ok(mut cache) = self.cache.write() {
            // Evict if at capacity
            if cache.len() >= self.max_entries && !cache.contains_key(&key) {
                cache.retain(|_, v| !v.is_expired());

                // If still at capacity, remove oldest entry
                if cache.len() >= self.max_entries {
                    if let Some(oldest) = cache
                        .iter()
                        .min_by_key(|(_, v)| v.cached_at)
                        .map(|(k, _)| k.clone())
                    {
                        cache.remove(&oldest);
                    }
                }
            }

            cache.insert(key, entry);
        }
    }

    /// Remove expired entries.
    pub fn cleanup(&self) {
        if let Ok(mut cache) = self.cache.write() {
            cache.retain(|_, v| !v.is_expired());
        }
    }

    /// Number of entries currently held, expired or not.
    pub fn len(&self) -> usize {
        self.cache.read().map(|c| c.len()).unwrap_or(0)
    }

    /// Check if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop all entries.
    pub fn clear(&self) {
        if let Ok(mut cache) = self.cache.write() {
            cache.clear();
        }
    }
}

#[async_trait]
impl CacheProvider for MemoryCacheProvider {
    async fn get_cache_records(
        &self,
        addresses: &[IpAddr],
        options: &RequestOptions,
    ) -> HashMap<IpAddr, IpResult> {
        let mut hits = HashMap::new();

        let Ok(cache) = self.cache.read() else {
            return hits;
        };

        for ip in addresses {
            if let Some(entry) = cache.get(&(*ip, options.clone())) {
                // Expired entries stay until cleanup to avoid a write lock
                if !entry.is_expired() {
                    hits.insert(*ip, entry.result.clone());
                }
            }
        }

        hits
    }

    async fn set_cache_record(
        &self,
        results: &HashMap<IpAddr, IpResult>,
        options: &RequestOptions,
    ) {
        for (ip, result) in results {
            self.insert(*ip, options, result.clone(), self.default_ttl);
        }
    }
}
