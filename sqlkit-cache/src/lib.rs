//! # sqlkit-cache — in-memory cache provider for sqlkit
//!
//! A thread-safe, `DashMap`-backed store implementing sqlkit's
//! [`CacheProvider`] contract. Entries carry an optional per-entry expiry
//! and are lazily evicted on access; [`MemoryCache::evict_expired`] sweeps
//! the whole map for long-lived processes.
//!
//! The store is infallible, so the provider impl never reports a
//! [`CacheError`]. Networked backends (Redis, Memcached) implement
//! [`CacheProvider`] directly in their own crates.

use bytes::Bytes;
use dashmap::DashMap;
use sqlkit::{BoxFuture, CacheError, CacheProvider};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A thread-safe in-memory cache with optional per-entry expiry.
///
/// Each entry stores `(value, inserted_at, expire)`; `expire: None` means
/// the entry never expires. Expired entries are dropped lazily on access.
#[derive(Clone, Default)]
pub struct MemoryCache {
    inner: Arc<DashMap<String, (Bytes, Instant, Option<Duration>)>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        MemoryCache::default()
    }

    /// Get a value if it exists and has not expired.
    pub fn get(&self, key: &str) -> Option<Bytes> {
        if let Some(entry) = self.inner.get(key) {
            let (value, inserted, expire) = entry.value();
            match expire {
                Some(ttl) if inserted.elapsed() >= *ttl => {
                    // Expired. Drop the read guard before removing.
                    drop(entry);
                    self.inner.remove(key);
                }
                _ => return Some(value.clone()),
            }
        }
        None
    }

    /// Insert or replace a value.
    pub fn insert(&self, key: impl Into<String>, value: Bytes, expire: Option<Duration>) {
        self.inner.insert(key.into(), (value, Instant::now(), expire));
    }

    pub fn remove(&self, key: &str) {
        self.inner.remove(key);
    }

    pub fn clear(&self) {
        self.inner.clear();
    }

    /// Remove every expired entry.
    pub fn evict_expired(&self) {
        self.inner.retain(|_, (_, inserted, expire)| match expire {
            Some(ttl) => inserted.elapsed() < *ttl,
            None => true,
        });
    }

    /// Number of entries, including not-yet-evicted expired ones.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl CacheProvider for MemoryCache {
    fn try_get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<Bytes>, CacheError>> {
        Box::pin(async move { Ok(self.get(key)) })
    }

    fn try_set<'a>(
        &'a self,
        key: &'a str,
        value: Bytes,
        expire: Option<Duration>,
    ) -> BoxFuture<'a, Result<(), CacheError>> {
        Box::pin(async move {
            self.insert(key, value, expire);
            Ok(())
        })
    }
}
