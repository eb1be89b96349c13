//! # mdxcache - TTL result cache
//!
//! A typed TTL cache behind a pluggable byte-level store. The engine runs on
//! the in-memory [`MemoryCache`] by default; horizontally-scaled deployments
//! can plug any shared key/value store with TTL support behind the
//! [`CacheStore`] trait without touching the callers.
//!
//! Entries are immutable after insertion: a refresh overwrites the key, it
//! never mutates in place. Backend failures are invisible to callers of the
//! typed layer, which reports them as a miss on read and drops them on write.

use async_trait::async_trait;
use moka::future::Cache as MokaCache;
use moka::Expiry;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::warn;

/// Result type alias for cache store operations.
pub type Result<T> = std::result::Result<T, CacheError>;

/// Errors a cache backend may report. The typed layer swallows them.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// Backing store failure (connection, serialization inside the store...).
    #[error("cache backend error: {0}")]
    Backend(String),
}

// ============================================================================
// Store trait
// ============================================================================

/// Byte-level key/value store with per-entry TTL.
///
/// Contract:
/// - an entry expires no later than `now + ttl` after insertion;
/// - `get` during or after expiry returns `None`;
/// - concurrent `get` and `set` are safe and never observe a partial value.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<()>;
}

// ============================================================================
// In-memory store
// ============================================================================

#[derive(Clone)]
struct Entry {
    body: Arc<Vec<u8>>,
    ttl: Duration,
}

/// Reads each entry's own TTL instead of a cache-wide one.
struct PerEntryExpiry;

impl Expiry<String, Entry> for PerEntryExpiry {
    fn expire_after_create(
        &self,
        _key: &String,
        entry: &Entry,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(entry.ttl)
    }
}

/// Process-local store for single-instance deployments.
pub struct MemoryCache {
    inner: MokaCache<String, Entry>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::with_capacity(10_000)
    }

    pub fn with_capacity(max_capacity: u64) -> Self {
        Self {
            inner: MokaCache::builder()
                .max_capacity(max_capacity)
                .expire_after(PerEntryExpiry)
                .build(),
        }
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.inner.get(key).await.map(|e| e.body.as_ref().clone()))
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<()> {
        if ttl.is_zero() {
            return Ok(());
        }
        self.inner
            .insert(
                key.to_string(),
                Entry {
                    body: Arc::new(value),
                    ttl,
                },
            )
            .await;
        Ok(())
    }
}

// ============================================================================
// Typed front
// ============================================================================

/// Typed JSON accessors over a [`CacheStore`].
///
/// Failures never propagate: a backend or decode error on read is a miss, a
/// failure on write is dropped. Both are logged at warn.
#[derive(Clone)]
pub struct Cache {
    store: Arc<dyn CacheStore>,
}

impl Cache {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self { store }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryCache::new()))
    }

    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let bytes = match self.store.get(key).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return None,
            Err(err) => {
                warn!(key, error = %err, "cache read failed, treating as miss");
                return None;
            }
        };
        match serde_json::from_slice(&bytes) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!(key, error = %err, "cached value failed to decode, treating as miss");
                None
            }
        }
    }

    pub async fn set_json<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) {
        let bytes = match serde_json::to_vec(value) {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!(key, error = %err, "value failed to encode, cache write dropped");
                return;
            }
        };
        if let Err(err) = self.store.set(key, bytes, ttl).await {
            warn!(key, error = %err, "cache write failed, dropped");
        }
    }
}
