//! Caching layer: a capacity-bounded LRU in memory, backed by a persistent
//! sled tree, with an optional Redis tier between the two behind the
//! `redis-cache` feature.
//!
//! The cache is strictly a cache. The [`MallStore`](crate::economy::MallStore)
//! stays the source of record; anything here can be dropped at any time.

#[cfg(feature = "redis-cache")]
pub mod redis_tier;

use std::collections::{HashMap, VecDeque};
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::economy::{EconomyError, MallStore};

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("serialization error: {0}")]
    Bincode(#[from] bincode::Error),

    #[error(transparent)]
    Store(#[from] EconomyError),

    #[cfg(feature = "redis-cache")]
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),
}

/// A bounded map with least-recently-used eviction. Recency is tracked in a
/// deque: `get` and `put` move the key to the back, eviction pops the front.
pub struct LruCache<K, V> {
    capacity: usize,
    map: HashMap<K, V>,
    order: VecDeque<K>,
}

impl<K: Eq + Hash + Clone, V> LruCache<K, V> {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            map: HashMap::new(),
            order: VecDeque::new(),
        }
    }

    fn touch(&mut self, key: &K) {
        if let Some(pos) = self.order.iter().position(|k| k == key) {
            self.order.remove(pos);
        }
        self.order.push_back(key.clone());
    }

    /// Fetch a value, refreshing its recency.
    pub fn get(&mut self, key: &K) -> Option<&V> {
        if self.map.contains_key(key) {
            self.touch(key);
            self.map.get(key)
        } else {
            None
        }
    }

    /// Insert a value. Returns the evicted `(key, value)` pair when the
    /// capacity was exceeded.
    pub fn put(&mut self, key: K, value: V) -> Option<(K, V)> {
        if self.map.contains_key(&key) {
            self.touch(&key);
            self.map.insert(key, value);
            return None;
        }
        let mut evicted = None;
        if self.map.len() >= self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                evicted = self.map.remove(&oldest).map(|v| (oldest, v));
            }
        }
        self.order.push_back(key.clone());
        self.map.insert(key, value);
        evicted
    }

    pub fn remove(&mut self, key: &K) -> Option<V> {
        if let Some(pos) = self.order.iter().position(|k| k == key) {
            self.order.remove(pos);
        }
        self.map.remove(key)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.map.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Value as persisted in the fallback tier, expiry included so TTLs survive
/// a restart.
#[derive(Serialize, Deserialize)]
struct PersistedEntry {
    expires_at: i64,
    bytes: Vec<u8>,
}

struct MemoryEntry {
    expires_at: DateTime<Utc>,
    bytes: Vec<u8>,
}

/// Hit/miss counters for the `status` command.
#[derive(Debug, Default, Clone, Copy)]
pub struct CacheStats {
    pub memory_hits: u64,
    pub fallback_hits: u64,
    pub misses: u64,
}

/// Memory LRU in front of a persistent sled tree. Gets promote fallback hits
/// into memory; puts write through all tiers.
pub struct TieredCache {
    memory: Mutex<LruCache<String, MemoryEntry>>,
    store: Arc<MallStore>,
    ttl: Duration,
    #[cfg(feature = "redis-cache")]
    redis: Option<redis_tier::RedisTier>,
    memory_hits: AtomicU64,
    fallback_hits: AtomicU64,
    misses: AtomicU64,
}

impl TieredCache {
    pub fn new(store: Arc<MallStore>, memory_capacity: usize, ttl_secs: i64) -> Self {
        Self {
            memory: Mutex::new(LruCache::new(memory_capacity)),
            store,
            ttl: Duration::seconds(ttl_secs.max(1)),
            #[cfg(feature = "redis-cache")]
            redis: None,
            memory_hits: AtomicU64::new(0),
            fallback_hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Attach a Redis tier between memory and the persistent fallback.
    #[cfg(feature = "redis-cache")]
    pub fn with_redis(mut self, tier: redis_tier::RedisTier) -> Self {
        self.redis = Some(tier);
        self
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            memory_hits: self.memory_hits.load(Ordering::Relaxed),
            fallback_hits: self.fallback_hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    /// Store raw bytes under `key` in every tier.
    pub fn put_bytes(&self, key: &str, bytes: Vec<u8>, now: DateTime<Utc>) -> Result<(), CacheError> {
        let expires_at = now + self.ttl;

        #[cfg(feature = "redis-cache")]
        if let Some(redis) = &self.redis {
            redis.put(key, &bytes, self.ttl.num_seconds() as u64)?;
        }

        let persisted = PersistedEntry {
            expires_at: expires_at.timestamp(),
            bytes: bytes.clone(),
        };
        self.store
            .cache_put(key.as_bytes(), &bincode::serialize(&persisted)?)?;

        let mut memory = self.memory.lock().expect("cache lock poisoned");
        memory.put(key.to_string(), MemoryEntry { expires_at, bytes });
        Ok(())
    }

    /// Fetch raw bytes, consulting memory, then Redis (if configured), then
    /// the persistent fallback. Fallback hits are promoted into memory.
    pub fn get_bytes(&self, key: &str, now: DateTime<Utc>) -> Result<Option<Vec<u8>>, CacheError> {
        {
            let key_string = key.to_string();
            let mut memory = self.memory.lock().expect("cache lock poisoned");
            let fresh = memory
                .get(&key_string)
                .and_then(|entry| (entry.expires_at > now).then(|| entry.bytes.clone()));
            if let Some(bytes) = fresh {
                self.memory_hits.fetch_add(1, Ordering::Relaxed);
                return Ok(Some(bytes));
            }
            // Either absent or expired; dropping an absent key is a no-op.
            memory.remove(&key_string);
        }

        #[cfg(feature = "redis-cache")]
        if let Some(redis) = &self.redis {
            if let Some(bytes) = redis.get(key)? {
                self.fallback_hits.fetch_add(1, Ordering::Relaxed);
                self.promote(key, &bytes, now + self.ttl);
                return Ok(Some(bytes));
            }
        }

        if let Some(raw) = self.store.cache_get(key.as_bytes())? {
            let persisted: PersistedEntry = bincode::deserialize(&raw)?;
            let expires_at = DateTime::from_timestamp(persisted.expires_at, 0)
                .unwrap_or_else(|| now - Duration::seconds(1));
            if expires_at > now {
                self.fallback_hits.fetch_add(1, Ordering::Relaxed);
                self.promote(key, &persisted.bytes, expires_at);
                return Ok(Some(persisted.bytes));
            }
            // Lazily drop the expired entry.
            self.store.cache_remove(key.as_bytes())?;
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        Ok(None)
    }

    fn promote(&self, key: &str, bytes: &[u8], expires_at: DateTime<Utc>) {
        let mut memory = self.memory.lock().expect("cache lock poisoned");
        memory.put(
            key.to_string(),
            MemoryEntry {
                expires_at,
                bytes: bytes.to_vec(),
            },
        );
    }

    /// Drop `key` from every tier.
    pub fn invalidate(&self, key: &str) -> Result<(), CacheError> {
        self.memory
            .lock()
            .expect("cache lock poisoned")
            .remove(&key.to_string());

        #[cfg(feature = "redis-cache")]
        if let Some(redis) = &self.redis {
            redis.remove(key)?;
        }

        self.store.cache_remove(key.as_bytes())?;
        Ok(())
    }

    /// Store a serializable value.
    pub fn put_value<T: Serialize>(
        &self,
        key: &str,
        value: &T,
        now: DateTime<Utc>,
    ) -> Result<(), CacheError> {
        self.put_bytes(key, bincode::serialize(value)?, now)
    }

    /// Fetch and deserialize a value.
    pub fn get_value<T: serde::de::DeserializeOwned>(
        &self,
        key: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<T>, CacheError> {
        match self.get_bytes(key, now)? {
            Some(bytes) => Ok(Some(bincode::deserialize(&bytes)?)),
            None => Ok(None),
        }
    }
}
