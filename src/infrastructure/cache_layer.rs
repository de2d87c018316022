// Read-through / write-invalidate cache layer in front of the primary store.
// Every cache failure is absorbed here: logged, counted, never returned.

use serde::{de::DeserializeOwned, Serialize};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use crate::error::AppResult;
use crate::infrastructure::traits::CacheBackend;

/// Key builders. The formats are shared with other services reading the same
/// Redis instance and must not change.
pub mod cache_keys {
    use uuid::Uuid;

    pub const FEED_POSTS: &str = "feed_posts";

    pub fn post(post_id: Uuid) -> String {
        format!("post:{}", post_id)
    }

    pub fn user_posts(user_id: Uuid) -> String {
        format!("user_posts:{}", user_id)
    }

    pub fn comments(post_id: Uuid) -> String {
        format!("comments:post:{}", post_id)
    }

    pub fn notifications(recipient_id: Uuid) -> String {
        format!("post_notifications:{}", recipient_id)
    }

    pub fn following_posts(user_ids: &[Uuid], limit: u32, offset: u32) -> String {
        let ids: Vec<String> = user_ids.iter().map(Uuid::to_string).collect();
        format!(
            "posts:user_ids:{}:limit:{}:offset:{}",
            ids.join(","),
            limit,
            offset
        )
    }
}

pub mod cache_ttl {
    use std::time::Duration;

    pub const POSTS: Duration = Duration::from_secs(60 * 60);
    pub const COMMENTS: Duration = Duration::from_secs(5 * 60);
    pub const NOTIFICATIONS: Duration = Duration::from_secs(7 * 24 * 60 * 60);
    pub const FOLLOWING_POSTS: Duration = Duration::from_secs(30);
}

pub const FEED_MAX_LEN: usize = 100;
pub const INBOX_MAX_LEN: usize = 100;

#[derive(Debug, Default)]
struct CacheCounters {
    hits: AtomicU64,
    misses: AtomicU64,
    errors: AtomicU64,
    writes: AtomicU64,
    invalidations: AtomicU64,
}

/// Point-in-time copy of the cache counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub errors: u64,
    pub writes: u64,
    pub invalidations: u64,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[derive(Clone)]
pub struct CacheLayer {
    backend: Arc<dyn CacheBackend>,
    counters: Arc<CacheCounters>,
}

impl std::fmt::Debug for CacheLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheLayer")
            .field("stats", &self.stats())
            .finish()
    }
}

impl CacheLayer {
    pub fn new(backend: Arc<dyn CacheBackend>) -> Self {
        Self {
            backend,
            counters: Arc::new(CacheCounters::default()),
        }
    }

    pub fn backend(&self) -> &Arc<dyn CacheBackend> {
        &self.backend
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            errors: self.counters.errors.load(Ordering::Relaxed),
            writes: self.counters.writes.load(Ordering::Relaxed),
            invalidations: self.counters.invalidations.load(Ordering::Relaxed),
        }
    }

    pub async fn ping(&self) -> AppResult<()> {
        self.backend.ping().await
    }

    /// Singleton lookup. `None` covers miss, undecodable value and backend failure alike.
    #[instrument(skip(self))]
    pub async fn read_object<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        match self.backend.get(key).await {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(value) => {
                    self.counters.hits.fetch_add(1, Ordering::Relaxed);
                    debug!(cache_key = key, "Cache hit");
                    Some(value)
                }
                Err(e) => {
                    self.counters.errors.fetch_add(1, Ordering::Relaxed);
                    warn!(cache_key = key, error = %e, "Failed to decode cached value, falling back to store");
                    None
                }
            },
            Ok(None) => {
                self.counters.misses.fetch_add(1, Ordering::Relaxed);
                debug!(cache_key = key, "Cache miss");
                None
            }
            Err(e) => {
                self.counters.errors.fetch_add(1, Ordering::Relaxed);
                warn!(cache_key = key, error = %e, "Cache unavailable, reading from store");
                None
            }
        }
    }

    /// Whole-list lookup. An empty list is a miss; one undecodable element
    /// discards the whole list.
    #[instrument(skip(self))]
    pub async fn read_list<T: DeserializeOwned>(&self, key: &str) -> Option<Vec<T>> {
        let raw_items = match self.backend.get_list(key, 0, -1).await {
            Ok(items) if items.is_empty() => {
                self.counters.misses.fetch_add(1, Ordering::Relaxed);
                debug!(cache_key = key, "Cache miss");
                return None;
            }
            Ok(items) => items,
            Err(e) => {
                self.counters.errors.fetch_add(1, Ordering::Relaxed);
                warn!(cache_key = key, error = %e, "Cache unavailable, reading from store");
                return None;
            }
        };

        let decoded: Result<Vec<T>, _> = raw_items
            .iter()
            .map(|raw| serde_json::from_str::<T>(raw))
            .collect();
        match decoded {
            Ok(items) => {
                self.counters.hits.fetch_add(1, Ordering::Relaxed);
                debug!(cache_key = key, count = items.len(), "Cache hit");
                Some(items)
            }
            Err(e) => {
                self.counters.errors.fetch_add(1, Ordering::Relaxed);
                warn!(cache_key = key, error = %e, "Failed to decode cached list, falling back to store");
                None
            }
        }
    }

    #[instrument(skip(self, value))]
    pub async fn write_object<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) {
        let Some(raw) = self.encode(key, value) else {
            return;
        };
        let result = self.backend.set(key, raw, ttl).await;
        if self.absorb("set", key, result) {
            self.counters.writes.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Replace a list key with `items`, keeping their order (first item at the
    /// head). The backend swaps the list in one step, so a concurrent reader
    /// never takes a half-written list for a hit.
    #[instrument(skip(self, items))]
    pub async fn write_list<T: Serialize>(
        &self,
        key: &str,
        items: &[T],
        ttl: Duration,
        max_len: Option<usize>,
    ) {
        let mut encoded = Vec::with_capacity(items.len());
        for item in items {
            match self.encode(key, item) {
                Some(raw) => encoded.push(raw),
                None => return,
            }
        }

        let result = self.backend.replace_list(key, encoded, ttl, max_len).await;
        if self.absorb("replace_list", key, result) {
            self.counters.writes.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Push one item onto the head of a list key, trimming it and refreshing its TTL.
    #[instrument(skip(self, value))]
    pub async fn prepend<T: Serialize>(
        &self,
        key: &str,
        value: &T,
        ttl: Duration,
        max_len: Option<usize>,
    ) {
        self.push_head(key, value, ttl, max_len, false).await;
    }

    /// Like `prepend`, but only while the list is cached. Pushing onto an absent
    /// key would leave a one-item list that later reads take for the full list.
    #[instrument(skip(self, value))]
    pub async fn prepend_if_cached<T: Serialize>(
        &self,
        key: &str,
        value: &T,
        ttl: Duration,
        max_len: Option<usize>,
    ) {
        self.push_head(key, value, ttl, max_len, true).await;
    }

    #[instrument(skip(self))]
    pub async fn invalidate(&self, key: &str) {
        if self.absorb("delete", key, self.backend.delete(key).await) {
            self.counters.invalidations.fetch_add(1, Ordering::Relaxed);
            debug!(cache_key = key, "Invalidated cache key");
        }
    }

    pub async fn invalidate_all(&self, keys: &[String]) {
        for key in keys {
            self.invalidate(key).await;
        }
    }

    /// Read-through for a singleton value.
    pub async fn get_or_load<T, F, Fut>(&self, key: &str, ttl: Duration, load: F) -> AppResult<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = AppResult<T>>,
    {
        if let Some(value) = self.read_object(key).await {
            return Ok(value);
        }
        let value = load().await?;
        self.write_object(key, &value, ttl).await;
        Ok(value)
    }

    /// Read-through for a list value. The caller always gets the full store
    /// result; the cached copy is capped at `max_len`.
    pub async fn get_or_load_list<T, F, Fut>(
        &self,
        key: &str,
        ttl: Duration,
        max_len: Option<usize>,
        load: F,
    ) -> AppResult<Vec<T>>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = AppResult<Vec<T>>>,
    {
        if let Some(items) = self.read_list(key).await {
            return Ok(items);
        }
        let items = load().await?;
        self.write_list(key, &items, ttl, max_len).await;
        Ok(items)
    }

    async fn push_head<T: Serialize>(
        &self,
        key: &str,
        value: &T,
        ttl: Duration,
        max_len: Option<usize>,
        only_if_present: bool,
    ) {
        let Some(raw) = self.encode(key, value) else {
            return;
        };
        let result = self
            .backend
            .push_bounded(key, raw, ttl, max_len, only_if_present)
            .await;
        match result {
            Ok(true) => {
                self.counters.writes.fetch_add(1, Ordering::Relaxed);
            }
            Ok(false) => debug!(cache_key = key, "List not cached, skipping prepend"),
            Err(e) => {
                self.absorb("push", key, Err(e));
            }
        }
    }

    fn encode<T: Serialize>(&self, key: &str, value: &T) -> Option<String> {
        match serde_json::to_string(value) {
            Ok(raw) => Some(raw),
            Err(e) => {
                self.counters.errors.fetch_add(1, Ordering::Relaxed);
                warn!(cache_key = key, error = %e, "Failed to encode value for cache");
                None
            }
        }
    }

    /// Log and count a failed cache call. Returns whether it succeeded.
    fn absorb(&self, op: &str, key: &str, result: AppResult<()>) -> bool {
        match result {
            Ok(()) => true,
            Err(e) => {
                self.counters.errors.fetch_add(1, Ordering::Relaxed);
                warn!(cache_key = key, operation = op, error = %e, "Cache write failed, continuing without cache");
                false
            }
        }
    }
}
