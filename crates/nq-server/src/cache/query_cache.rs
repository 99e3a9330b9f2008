//! Namespaced JSON cache for interpreted queries and annotated responses.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use nq_protocol::{Query, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{CacheError, CacheResult, CacheStore};

/// Namespace for text → `Query` entries.
pub const QUERY_PREFIX: &str = "query:";
/// Namespace for text → `Response` entries.
pub const RESULT_PREFIX: &str = "result:";

/// Cache settings (`[cache]` table).
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Entry lifetime in seconds; 0 keeps entries until cleared.
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
}

fn default_enabled() -> bool {
    true
}

fn default_ttl_secs() -> u64 {
    3600
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            ttl_secs: default_ttl_secs(),
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Option<Duration> {
        (self.ttl_secs > 0).then(|| Duration::from_secs(self.ttl_secs))
    }
}

/// Snapshot reported by `GET /api/v1/cache/stats`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub entry_count: usize,
    pub hit_count: u64,
    pub miss_count: u64,
}

/// Lower-cased, trimmed, single-spaced form used as the cache key.
pub fn normalize(text: &str) -> String {
    text.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Cache of text → `Query` and text → `Response`.
///
/// Backend failures and undecodable entries are logged and read as misses.
pub struct QueryCache {
    store: Arc<dyn CacheStore>,
    ttl: Option<Duration>,
    enabled: bool,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl QueryCache {
    pub fn new(store: Arc<dyn CacheStore>, config: &CacheConfig) -> Self {
        Self {
            store,
            ttl: config.ttl(),
            enabled: config.enabled,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub async fn get_query(&self, text: &str) -> Option<Query> {
        self.lookup(&format!("{QUERY_PREFIX}{}", normalize(text)))
            .await
    }

    pub async fn put_query(&self, text: &str, query: &Query) -> CacheResult<()> {
        self.store_json(&format!("{QUERY_PREFIX}{}", normalize(text)), query)
            .await
    }

    pub async fn get_response(&self, text: &str) -> Option<Response> {
        self.lookup(&format!("{RESULT_PREFIX}{}", normalize(text)))
            .await
    }

    pub async fn put_response(&self, text: &str, response: &Response) -> CacheResult<()> {
        self.store_json(&format!("{RESULT_PREFIX}{}", normalize(text)), response)
            .await
    }

    pub async fn delete_response(&self, text: &str) -> CacheResult<bool> {
        self.store
            .delete(&format!("{RESULT_PREFIX}{}", normalize(text)))
            .await
    }

    /// Drop cached responses only, keeping interpretations.
    pub async fn clear_responses(&self) -> CacheResult<usize> {
        self.store.clear(RESULT_PREFIX).await
    }

    /// Drop both namespaces.
    pub async fn clear(&self) -> CacheResult<usize> {
        let queries = self.store.clear(QUERY_PREFIX).await?;
        let results = self.store.clear(RESULT_PREFIX).await?;
        Ok(queries + results)
    }

    pub async fn stats(&self) -> CacheStats {
        let entry_count = match self.store.len().await {
            Ok(count) => count,
            Err(e) => {
                warn!(error = %e, "cache size unavailable");
                0
            }
        };
        CacheStats {
            entry_count,
            hit_count: self.hits.load(Ordering::Relaxed),
            miss_count: self.misses.load(Ordering::Relaxed),
        }
    }

    async fn lookup<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        if !self.enabled {
            return None;
        }
        let found = match self.store.get(key).await {
            Ok(found) => found,
            Err(e) => {
                warn!(key, error = %e, "cache read failed");
                None
            }
        };
        let decoded = found.and_then(|bytes| match serde_json::from_slice(&bytes) {
            Ok(value) => Some(value),
            Err(e) => {
                let err = CacheError::Codec {
                    key: key.to_string(),
                    message: e.to_string(),
                };
                warn!(error = %err, "discarding cache entry");
                None
            }
        });
        match decoded {
            Some(value) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!(key, "cache hit");
                Some(value)
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                debug!(key, "cache miss");
                None
            }
        }
    }

    async fn store_json<T: Serialize>(&self, key: &str, value: &T) -> CacheResult<()> {
        if !self.enabled {
            return Ok(());
        }
        let bytes = serde_json::to_vec(value).map_err(|e| CacheError::Codec {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        self.store.set(key, bytes, self.ttl).await
    }
}
