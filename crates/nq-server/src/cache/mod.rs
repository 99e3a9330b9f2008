//! Response and interpretation caching.
//!
//! `CacheStore` is the key-value collaborator (in-process by default);
//! `QueryCache` layers the `query:` / `result:` namespaces, JSON encoding
//! and hit/miss accounting on top of it.

pub mod memory;
pub mod query_cache;

use std::time::Duration;

use async_trait::async_trait;
use nq_protocol::ErrorKind;

pub use memory::MemoryStore;
pub use query_cache::{CacheConfig, CacheStats, QueryCache, normalize};

/// Cache backend failures. Always advisory: callers treat them as misses.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CacheError {
    #[error("cache backend unavailable: {0}")]
    Backend(String),

    #[error("cached value for '{key}' could not be decoded: {message}")]
    Codec { key: String, message: String },
}

impl CacheError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Cache
    }
}

pub type CacheResult<T> = Result<T, CacheError>;

/// Key-value store with per-key atomic get/set and optional expiry.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>>;

    /// Store `value` under `key`, replacing any previous value. `None` TTL
    /// never expires.
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> CacheResult<()>;

    async fn exists(&self, key: &str) -> CacheResult<bool>;

    /// Returns whether a value was removed.
    async fn delete(&self, key: &str) -> CacheResult<bool>;

    /// Remove every key starting with `prefix`, returning how many went.
    async fn clear(&self, prefix: &str) -> CacheResult<usize>;

    /// Number of live (unexpired) keys.
    async fn len(&self) -> CacheResult<usize>;
}
