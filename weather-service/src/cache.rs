use async_trait::async_trait;
use common::errors::AppError;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::time::{Duration, Instant};

/// Read-modify-write step applied by [`CacheStore::update`].
///
/// Receives the live value (if any) and returns the value to store, or `None`
/// to leave the key untouched.
pub type UpdateFn = Box<dyn FnOnce(Option<Value>) -> Option<Value> + Send>;

/// Key-value store with per-key TTL shared by the weather cache and the rate limiter.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>, AppError>;

    /// Stores `value` for `ttl_secs`; a TTL of zero means the value is not retained.
    async fn set(&self, key: &str, value: Value, ttl_secs: u64) -> Result<(), AppError>;

    /// Atomically applies `f` to the value under `key` and returns what was stored.
    async fn update(
        &self,
        key: &str,
        ttl_secs: u64,
        f: UpdateFn,
    ) -> Result<Option<Value>, AppError>;
}

struct CacheEntry {
    value: Value,
    expires_at: Instant,
}

impl CacheEntry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at > now
    }
}

// Expired entries are swept once the map grows past this size
const SWEEP_THRESHOLD: usize = 10_000;

struct Entries {
    map: HashMap<String, CacheEntry>,
    // Size at which the next sweep runs; doubles past the live count after each sweep
    sweep_at: usize,
    min_sweep_at: usize,
}

impl Entries {
    fn with_threshold(threshold: usize) -> Self {
        Self {
            map: HashMap::new(),
            sweep_at: threshold,
            min_sweep_at: threshold,
        }
    }

    fn write(&mut self, key: &str, value: Value, ttl_secs: u64, now: Instant) {
        if ttl_secs == 0 {
            self.map.remove(key);
            return;
        }

        if self.map.len() >= self.sweep_at {
            self.map.retain(|_, entry| entry.is_live(now));
            self.sweep_at = (self.map.len() * 2).max(self.min_sweep_at);
        }

        self.map.insert(
            key.to_string(),
            CacheEntry {
                value,
                expires_at: now + Duration::from_secs(ttl_secs),
            },
        );
    }
}

/// In-process [`CacheStore`]
pub struct MemoryCacheStore {
    cache: Arc<RwLock<Entries>>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::with_sweep_threshold(SWEEP_THRESHOLD)
    }

    pub fn with_sweep_threshold(threshold: usize) -> Self {
        Self {
            cache: Arc::new(RwLock::new(Entries::with_threshold(threshold.max(1)))),
        }
    }

    pub async fn len(&self) -> usize {
        let now = Instant::now();
        let cache = self.cache.read().await;
        cache.map.values().filter(|entry| entry.is_live(now)).count()
    }
}

impl Default for MemoryCacheStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, AppError> {
        let cache = self.cache.read().await;
        if let Some(entry) = cache.map.get(key)
            && entry.is_live(Instant::now())
        {
            return Ok(Some(entry.value.clone()));
        }
        Ok(None)
    }

    async fn set(&self, key: &str, value: Value, ttl_secs: u64) -> Result<(), AppError> {
        let mut cache = self.cache.write().await;
        cache.write(key, value, ttl_secs, Instant::now());
        Ok(())
    }

    async fn update(
        &self,
        key: &str,
        ttl_secs: u64,
        f: UpdateFn,
    ) -> Result<Option<Value>, AppError> {
        let now = Instant::now();
        let mut cache = self.cache.write().await;

        let current = cache
            .map
            .get(key)
            .filter(|entry| entry.is_live(now))
            .map(|entry| entry.value.clone());

        let next = f(current);
        if let Some(value) = &next {
            cache.write(key, value.clone(), ttl_secs, now);
        }
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_set_then_get() {
        let store = MemoryCacheStore::new();
        store.set("a", json!({ "x": 1 }), 60).await.unwrap();

        assert_eq!(store.get("a").await.unwrap(), Some(json!({ "x": 1 })));
        assert_eq!(store.get("b").await.unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_entry_expires_after_ttl() {
        let store = MemoryCacheStore::new();
        store.set("a", json!(1), 5).await.unwrap();

        tokio::time::advance(Duration::from_secs(4)).await;
        assert!(store.get("a").await.unwrap().is_some());

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(store.get("a").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_zero_ttl_is_not_retained() {
        let store = MemoryCacheStore::new();
        store.set("a", json!(1), 60).await.unwrap();
        store.set("a", json!(2), 0).await.unwrap();

        assert!(store.get("a").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_sees_current_value() {
        let store = MemoryCacheStore::new();
        store.set("counter", json!(1), 60).await.unwrap();

        let stored = store
            .update(
                "counter",
                60,
                Box::new(|current| current.and_then(|v| v.as_i64()).map(|n| json!(n + 1))),
            )
            .await
            .unwrap();

        assert_eq!(stored, Some(json!(2)));
        assert_eq!(store.get("counter").await.unwrap(), Some(json!(2)));
    }

    #[tokio::test]
    async fn test_update_returning_none_leaves_value() {
        let store = MemoryCacheStore::new();
        store.set("k", json!("keep"), 60).await.unwrap();

        let stored = store.update("k", 60, Box::new(|_| None)).await.unwrap();

        assert_eq!(stored, None);
        assert_eq!(store.get("k").await.unwrap(), Some(json!("keep")));
    }

    #[tokio::test]
    async fn test_concurrent_updates_are_serialized() {
        let store = Arc::new(MemoryCacheStore::new());
        let mut handles = Vec::new();

        for _ in 0..50 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store
                    .update(
                        "n",
                        60,
                        Box::new(|current| {
                            let n = current.and_then(|v| v.as_i64()).unwrap_or(0);
                            Some(json!(n + 1))
                        }),
                    )
                    .await
                    .unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(store.get("n").await.unwrap(), Some(json!(50)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_drops_expired_entries() {
        let store = MemoryCacheStore::with_sweep_threshold(4);
        store.set("old-1", json!(1), 5).await.unwrap();
        store.set("old-2", json!(2), 5).await.unwrap();
        store.set("live-1", json!(3), 60).await.unwrap();
        store.set("live-2", json!(4), 60).await.unwrap();

        tokio::time::advance(Duration::from_secs(10)).await;
        store.set("live-3", json!(5), 60).await.unwrap();

        let cache = store.cache.read().await;
        assert_eq!(cache.map.len(), 3);
        assert!(!cache.map.contains_key("old-1"));
        assert_eq!(cache.sweep_at, 4);
    }

    #[tokio::test]
    async fn test_sweep_threshold_grows_when_entries_stay_live() {
        let store = MemoryCacheStore::with_sweep_threshold(4);
        for i in 0..5 {
            store.set(&format!("k{i}"), json!(i), 60).await.unwrap();
        }

        {
            let cache = store.cache.read().await;
            assert_eq!(cache.map.len(), 5);
            assert_eq!(cache.sweep_at, 8);
        }

        // No further sweep until the map reaches the raised threshold
        for i in 5..8 {
            store.set(&format!("k{i}"), json!(i), 60).await.unwrap();
        }
        assert_eq!(store.cache.read().await.sweep_at, 8);

        store.set("k8", json!(8), 60).await.unwrap();
        assert_eq!(store.cache.read().await.sweep_at, 16);
    }
}
