//! Process-wide cache store.
//!
//! A key to serialized-value mapping shared by all request handlers. Values
//! are opaque blobs to this module; the catalog service owns the codec and
//! must deserialize symmetrically with what it serialized.
//!
//! There is no eviction, expiry or capacity bound here: the catalog's
//! correctness depends only on invalidation, not on bounding the cache.
//! Production deployments would configure a capacity on the builder.

use moka::future::Cache;

/// Process-wide key-value cache.
///
/// Cheap to clone; clones share the same underlying map. Individual key
/// operations are atomic, but read-then-populate sequences built on top of
/// this type are not, and are not meant to be.
#[derive(Clone)]
pub struct CacheStore {
    entries: Cache<String, String>,
}

impl CacheStore {
    /// Create an empty cache store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Cache::builder().build(),
        }
    }

    /// Returns `true` if `key` currently has an entry.
    #[must_use]
    pub fn has(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Get the serialized value stored under `key`, if any.
    pub async fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).await
    }

    /// Store `value` under `key`, overwriting unconditionally.
    pub async fn set(&self, key: &str, value: String) {
        self.entries.insert(key.to_owned(), value).await;
    }

    /// Remove the entry under `key`. Removing an absent key is a no-op.
    pub async fn delete(&self, key: &str) {
        self.entries.invalidate(key).await;
    }
}

impl Default for CacheStore {
    fn default() -> Self {
        Self::new()
    }
}
