//! In-process cache store.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tokio::time::Instant;

use super::{CacheResult, CacheStore};

struct Stored {
    bytes: Vec<u8>,
    expires_at: Option<Instant>,
}

impl Stored {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|at| now < at)
    }
}

/// `HashMap` behind an async `RwLock`. Expired keys read as absent and are
/// dropped on the next write.
#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, Stored>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        let entries = self.entries.read().await;
        let now = Instant::now();
        Ok(entries
            .get(key)
            .filter(|stored| stored.is_live(now))
            .map(|stored| stored.bytes.clone()))
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> CacheResult<()> {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        entries.retain(|_, stored| stored.is_live(now));
        entries.insert(
            key.to_string(),
            Stored {
                bytes: value,
                expires_at: ttl.map(|ttl| now + ttl),
            },
        );
        Ok(())
    }

    async fn exists(&self, key: &str) -> CacheResult<bool> {
        let entries = self.entries.read().await;
        let now = Instant::now();
        Ok(entries.get(key).is_some_and(|stored| stored.is_live(now)))
    }

    async fn delete(&self, key: &str) -> CacheResult<bool> {
        let now = Instant::now();
        let removed = self.entries.write().await.remove(key);
        Ok(removed.is_some_and(|stored| stored.is_live(now)))
    }

    async fn clear(&self, prefix: &str) -> CacheResult<usize> {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        let mut cleared = 0;
        entries.retain(|key, stored| {
            if !stored.is_live(now) {
                return false;
            }
            if key.starts_with(prefix) {
                cleared += 1;
                return false;
            }
            true
        });
        Ok(cleared)
    }

    async fn len(&self) -> CacheResult<usize> {
        let entries = self.entries.read().await;
        let now = Instant::now();
        Ok(entries.values().filter(|stored| stored.is_live(now)).count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_then_get() {
        let store = MemoryStore::new();
        store.set("query:a", b"one".to_vec(), None).await.unwrap();
        assert_eq!(store.get("query:a").await.unwrap(), Some(b"one".to_vec()));
        assert!(store.exists("query:a").await.unwrap());
        assert!(store.get("query:b").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn set_replaces_value() {
        let store = MemoryStore::new();
        store.set("k", b"old".to_vec(), None).await.unwrap();
        store.set("k", b"new".to_vec(), None).await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some(b"new".to_vec()));
        assert_eq!(store.len().await.unwrap(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn entries_expire_after_ttl() {
        let store = MemoryStore::new();
        store
            .set("k", b"v".to_vec(), Some(Duration::from_secs(60)))
            .await
            .unwrap();
        store.set("forever", b"v".to_vec(), None).await.unwrap();

        tokio::time::advance(Duration::from_secs(59)).await;
        assert!(store.exists("k").await.unwrap());

        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(store.get("k").await.unwrap().is_none());
        assert!(!store.exists("k").await.unwrap());
        assert!(store.exists("forever").await.unwrap());
        assert_eq!(store.len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn delete_reports_removal() {
        let store = MemoryStore::new();
        store.set("k", b"v".to_vec(), None).await.unwrap();
        assert!(store.delete("k").await.unwrap());
        assert!(!store.delete("k").await.unwrap());
    }

    #[tokio::test]
    async fn clear_by_prefix() {
        let store = MemoryStore::new();
        store.set("query:a", b"1".to_vec(), None).await.unwrap();
        store.set("query:b", b"2".to_vec(), None).await.unwrap();
        store.set("result:a", b"3".to_vec(), None).await.unwrap();

        assert_eq!(store.clear("query:").await.unwrap(), 2);
        assert_eq!(store.len().await.unwrap(), 1);
        assert!(store.exists("result:a").await.unwrap());

        assert_eq!(store.clear("").await.unwrap(), 1);
        assert_eq!(store.len().await.unwrap(), 0);
    }
}
