//! Time-bounded cache for discovery documents.
//!
//! Caching is a pure performance optimization: a resolver with no cache, or
//! with a [`NoopCache`], produces exactly the same results, only slower.
//! Values are stored only after they have been verified, and an expired entry
//! is indistinguishable from a missing one.

use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::{PoisonError, RwLock};
use std::time::{Duration, Instant};

/// A key/value store with per-entry expiry, shared between concurrent
/// discovery calls.
///
/// Implementations must be safe for concurrent `get`/`put`; last writer wins.
pub trait Cache: Send + Sync + Debug {
    /// Returns the value stored under `key`, or `None` if it is missing or expired.
    fn get(&self, key: &str) -> Option<Vec<u8>>;

    /// Stores `value` under `key` for `ttl`.
    fn put(&self, key: &str, value: Vec<u8>, ttl: Duration);

    /// Removes `key`, if present.
    fn evict(&self, key: &str);
}

/// A cache that never stores anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopCache;

impl Cache for NoopCache {
    fn get(&self, _key: &str) -> Option<Vec<u8>> {
        None
    }

    fn put(&self, _key: &str, _value: Vec<u8>, _ttl: Duration) {}

    fn evict(&self, _key: &str) {}
}

#[derive(Debug, Clone)]
struct CacheEntry {
    value: Vec<u8>,
    expires_at: Instant,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// In-process [`Cache`] backed by a `RwLock<HashMap>`.
///
/// Expired entries are dropped lazily on access, or eagerly with
/// [`MemoryCache::purge_expired`].
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl MemoryCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries, expired ones included.
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns `true` if the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes every expired entry and returns how many were dropped.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self
            .entries
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        before - entries.len()
    }
}

impl Cache for MemoryCache {
    fn get(&self, key: &str) -> Option<Vec<u8>> {
        let now = Instant::now();
        {
            let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
            match entries.get(key) {
                None => return None,
                Some(entry) if !entry.is_expired(now) => return Some(entry.value.clone()),
                Some(_) => {}
            }
        }

        // expired: drop it unless a concurrent put already replaced it
        let mut entries = self
            .entries
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if entries.get(key).is_some_and(|e| e.is_expired(now)) {
            entries.remove(key);
        }
        None
    }

    fn put(&self, key: &str, value: Vec<u8>, ttl: Duration) {
        let Some(expires_at) = Instant::now().checked_add(ttl) else {
            return;
        };
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_owned(), CacheEntry { value, expires_at });
    }

    fn evict(&self, key: &str) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
    }
}
