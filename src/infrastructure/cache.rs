// In-process cache backend - LRU bounded map with per-key TTL and list values

use async_trait::async_trait;
use lru::LruCache;
use std::collections::VecDeque;
use std::num::NonZeroUsize;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use crate::error::{AppError, AppResult};
use crate::infrastructure::traits::CacheBackend;

#[derive(Debug, Clone)]
enum CacheValue {
    Single(String),
    List(VecDeque<String>),
}

#[derive(Debug, Clone)]
struct CacheEntry {
    value: CacheValue,
    expires_at: Option<Instant>,
}

impl CacheEntry {
    fn is_expired(&self) -> bool {
        self.expires_at.map_or(false, |at| Instant::now() >= at)
    }
}

/// Single-process stand-in for Redis. Least recently used keys are evicted
/// once `capacity` keys are held.
pub struct MemoryCache {
    inner: Mutex<LruCache<String, CacheEntry>>,
}

impl MemoryCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl std::fmt::Debug for MemoryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryCache").finish_non_exhaustive()
    }
}

/// Fetch a key, dropping it first if its TTL has passed.
fn live_entry<'a>(
    cache: &'a mut LruCache<String, CacheEntry>,
    key: &str,
) -> Option<&'a mut CacheEntry> {
    let expired = cache.peek(key)?.is_expired();
    if expired {
        cache.pop(key);
        return None;
    }
    cache.get_mut(key)
}

fn wrong_type(key: &str) -> AppError {
    AppError::Internal(format!(
        "WRONGTYPE operation against key {} holding the wrong kind of value",
        key
    ))
}

/// Resolve a Redis-style inclusive range against a list of `len` items.
fn resolve_range(len: usize, start: isize, stop: isize) -> Option<(usize, usize)> {
    let len = len as isize;
    let start = if start < 0 { (len + start).max(0) } else { start };
    let stop = if stop < 0 { len + stop } else { stop.min(len - 1) };
    if start > stop || start >= len {
        None
    } else {
        Some((start as usize, stop as usize))
    }
}

#[async_trait]
impl CacheBackend for MemoryCache {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        let mut cache = self.inner.lock().await;
        match live_entry(&mut cache, key) {
            Some(CacheEntry {
                value: CacheValue::Single(value),
                ..
            }) => Ok(Some(value.clone())),
            Some(_) => Err(wrong_type(key)),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> AppResult<()> {
        let entry = CacheEntry {
            value: CacheValue::Single(value),
            expires_at: Some(Instant::now() + ttl),
        };
        self.inner.lock().await.put(key.to_string(), entry);
        Ok(())
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        self.inner.lock().await.pop(key);
        Ok(())
    }

    async fn get_list(&self, key: &str, start: isize, stop: isize) -> AppResult<Vec<String>> {
        let mut cache = self.inner.lock().await;
        match live_entry(&mut cache, key) {
            Some(CacheEntry {
                value: CacheValue::List(items),
                ..
            }) => Ok(match resolve_range(items.len(), start, stop) {
                Some((from, to)) => items.range(from..=to).cloned().collect(),
                None => Vec::new(),
            }),
            Some(_) => Err(wrong_type(key)),
            None => Ok(Vec::new()),
        }
    }

    async fn push_list(&self, key: &str, value: String) -> AppResult<()> {
        let mut cache = self.inner.lock().await;
        match live_entry(&mut cache, key) {
            Some(CacheEntry {
                value: CacheValue::List(items),
                ..
            }) => {
                items.push_front(value);
                Ok(())
            }
            Some(_) => Err(wrong_type(key)),
            None => {
                let entry = CacheEntry {
                    value: CacheValue::List(VecDeque::from([value])),
                    expires_at: None,
                };
                cache.put(key.to_string(), entry);
                Ok(())
            }
        }
    }

    async fn trim_list(&self, key: &str, max_len: usize) -> AppResult<()> {
        let mut cache = self.inner.lock().await;
        let now_empty = match live_entry(&mut cache, key) {
            Some(CacheEntry {
                value: CacheValue::List(items),
                ..
            }) => {
                items.truncate(max_len);
                items.is_empty()
            }
            Some(_) => return Err(wrong_type(key)),
            None => false,
        };
        // Redis drops a list once it has no elements
        if now_empty {
            cache.pop(key);
        }
        Ok(())
    }

    async fn expire(&self, key: &str, ttl: Duration) -> AppResult<()> {
        let mut cache = self.inner.lock().await;
        if let Some(entry) = live_entry(&mut cache, key) {
            entry.expires_at = Some(Instant::now() + ttl);
        }
        Ok(())
    }

    async fn replace_list(
        &self,
        key: &str,
        items: Vec<String>,
        ttl: Duration,
        max_len: Option<usize>,
    ) -> AppResult<()> {
        let mut items = VecDeque::from(items);
        if let Some(max_len) = max_len {
            items.truncate(max_len);
        }

        let mut cache = self.inner.lock().await;
        if items.is_empty() {
            cache.pop(key);
        } else {
            let entry = CacheEntry {
                value: CacheValue::List(items),
                expires_at: Some(Instant::now() + ttl),
            };
            cache.put(key.to_string(), entry);
        }
        Ok(())
    }

    async fn push_bounded(
        &self,
        key: &str,
        value: String,
        ttl: Duration,
        max_len: Option<usize>,
        only_if_present: bool,
    ) -> AppResult<bool> {
        let expires_at = Some(Instant::now() + ttl);
        let mut cache = self.inner.lock().await;
        let now_empty = match live_entry(&mut cache, key) {
            Some(CacheEntry {
                value: CacheValue::List(items),
                expires_at: entry_expiry,
            }) => {
                items.push_front(value);
                if let Some(max_len) = max_len {
                    items.truncate(max_len);
                }
                *entry_expiry = expires_at;
                items.is_empty()
            }
            Some(_) => return Err(wrong_type(key)),
            None if only_if_present => return Ok(false),
            None => {
                if max_len == Some(0) {
                    return Ok(false);
                }
                let entry = CacheEntry {
                    value: CacheValue::List(VecDeque::from([value])),
                    expires_at,
                };
                cache.put(key.to_string(), entry);
                return Ok(true);
            }
        };
        if now_empty {
            cache.pop(key);
            return Ok(false);
        }
        Ok(true)
    }

    async fn ping(&self) -> AppResult<()> {
        Ok(())
    }
}
