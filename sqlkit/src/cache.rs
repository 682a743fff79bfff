use crate::connection::BoxFuture;
use crate::value::SqlParams;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::time::Duration;

/// A failure reported by a cache provider.
///
/// Cache failures are infrastructure defects: they propagate to the caller
/// and are never treated as a miss or silently bypassed.
#[derive(Debug)]
pub struct CacheError(Box<dyn std::error::Error + Send + Sync>);

impl CacheError {
    pub fn new(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        CacheError(Box::new(err))
    }

    pub fn message(msg: impl Into<String>) -> Self {
        CacheError(msg.into().into())
    }

    pub fn into_inner(self) -> Box<dyn std::error::Error + Send + Sync> {
        self.0
    }
}

impl std::fmt::Display for CacheError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for CacheError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.0.as_ref())
    }
}

impl From<CacheError> for crate::error::DataError {
    fn from(err: CacheError) -> Self {
        crate::error::DataError::Cache(err.into_inner())
    }
}

/// Key/value cache contract with get-with-existence and set-with-expiry
/// semantics.
///
/// A shared, externally-synchronized resource: each access is independent
/// and atomic at single-key granularity. `expire: None` means the entry
/// never expires. Implement this to plug in Redis, Memcached, or the
/// in-memory store from `sqlkit-cache`.
pub trait CacheProvider: Send + Sync {
    fn try_get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<Bytes>, CacheError>>;

    fn try_set<'a>(
        &'a self,
        key: &'a str,
        value: Bytes,
        expire: Option<Duration>,
    ) -> BoxFuture<'a, Result<(), CacheError>>;
}

/// Process-wide default cache policy, consulted when a call does not
/// explicitly specify caching.
///
/// A session built without any cache configuration never touches a cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// When true, calls that do not specify a cache toggle are cached.
    pub all_methods_enable_cache: bool,
    /// Default entry expiry. `None` stores entries without expiry.
    pub expire: Option<Duration>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig {
            all_methods_enable_cache: false,
            expire: None,
        }
    }
}

/// Deterministic mapping from a statement, its parameters, and optional
/// page coordinates to a stable cache key.
///
/// Different pages of the same statement must map to different keys.
pub trait CacheKeyBuilder: Send + Sync {
    fn generate(
        &self,
        sql: &str,
        params: &SqlParams,
        explicit_key: Option<&str>,
        page_index: Option<u64>,
        page_size: Option<u64>,
    ) -> String;
}

/// Default key builder: a stable hash of the statement text and parameter
/// bag, page-qualified when page coordinates are present.
///
/// An explicit key replaces the hash but is still page-qualified, so callers
/// cannot accidentally collapse two pages onto one entry.
#[derive(Debug, Clone)]
pub struct DefaultCacheKeyBuilder {
    prefix: String,
}

impl DefaultCacheKeyBuilder {
    pub fn new() -> Self {
        DefaultCacheKeyBuilder {
            prefix: "sqlkit".to_string(),
        }
    }

    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        DefaultCacheKeyBuilder {
            prefix: prefix.into(),
        }
    }
}

impl Default for DefaultCacheKeyBuilder {
    fn default() -> Self {
        DefaultCacheKeyBuilder::new()
    }
}

impl CacheKeyBuilder for DefaultCacheKeyBuilder {
    fn generate(
        &self,
        sql: &str,
        params: &SqlParams,
        explicit_key: Option<&str>,
        page_index: Option<u64>,
        page_size: Option<u64>,
    ) -> String {
        let mut key = match explicit_key {
            Some(explicit) => format!("{}:{explicit}", self.prefix),
            None => {
                // DefaultHasher with fixed keys, so keys are stable across
                // processes sharing one external cache.
                let mut hasher = DefaultHasher::new();
                sql.hash(&mut hasher);
                params.hash(&mut hasher);
                format!("{}:{:016x}", self.prefix, hasher.finish())
            }
        };
        if let Some(index) = page_index {
            key.push_str(&format!(":p{index}"));
        }
        if let Some(size) = page_size {
            key.push_str(&format!(":s{size}"));
        }
        key
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params;

    #[test]
    fn identical_inputs_produce_identical_keys() {
        let keys = DefaultCacheKeyBuilder::new();
        let params = params! { "Id" => 1i64 };
        let a = keys.generate("SELECT 1", &params, None, None, None);
        let b = keys.generate("SELECT 1", &params, None, None, None);
        assert_eq!(a, b);
    }

    #[test]
    fn different_statements_or_params_differ() {
        let keys = DefaultCacheKeyBuilder::new();
        let params = params! { "Id" => 1i64 };
        let base = keys.generate("SELECT 1", &params, None, None, None);
        assert_ne!(base, keys.generate("SELECT 2", &params, None, None, None));
        assert_ne!(
            base,
            keys.generate("SELECT 1", &params! { "Id" => 2i64 }, None, None, None)
        );
    }

    #[test]
    fn pages_never_collide() {
        let keys = DefaultCacheKeyBuilder::new();
        let params = SqlParams::new();
        let page1 = keys.generate("SELECT * FROM t", &params, None, Some(1), Some(10));
        let page2 = keys.generate("SELECT * FROM t", &params, None, Some(2), Some(10));
        assert_ne!(page1, page2);
    }

    #[test]
    fn explicit_key_is_page_qualified() {
        let keys = DefaultCacheKeyBuilder::new();
        let params = SqlParams::new();
        let page1 = keys.generate("SELECT * FROM t", &params, Some("people"), Some(1), Some(10));
        let page2 = keys.generate("SELECT * FROM t", &params, Some("people"), Some(2), Some(10));
        assert!(page1.contains("people"));
        assert_ne!(page1, page2);
    }
}
