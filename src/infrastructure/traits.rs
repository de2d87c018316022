use crate::error::AppResult;
use async_trait::async_trait;
use std::time::Duration;
use uuid::Uuid;

/// Key-value + list cache client (Redis semantics).
///
/// A miss is `Ok(None)` / `Ok(vec![])`; `Err` always means the backend itself
/// failed. Lists are most-recent-first: `push_list` prepends.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    async fn get(&self, key: &str) -> AppResult<Option<String>>;
    async fn set(&self, key: &str, value: String, ttl: Duration) -> AppResult<()>;
    async fn delete(&self, key: &str) -> AppResult<()>;

    /// Inclusive range; negative indexes count from the tail (`-1` = last).
    async fn get_list(&self, key: &str, start: isize, stop: isize) -> AppResult<Vec<String>>;
    async fn push_list(&self, key: &str, value: String) -> AppResult<()>;
    /// Keep only the first `max_len` elements.
    async fn trim_list(&self, key: &str, max_len: usize) -> AppResult<()>;
    async fn expire(&self, key: &str, ttl: Duration) -> AppResult<()>;

    /// Replace `key` with `items` (first item at the head), capped at `max_len`
    /// and expiring after `ttl`, as one step: readers see the old list or the
    /// whole new one. An empty result leaves the key deleted.
    async fn replace_list(
        &self,
        key: &str,
        items: Vec<String>,
        ttl: Duration,
        max_len: Option<usize>,
    ) -> AppResult<()>;

    /// Prepend, trim to `max_len` and refresh the TTL as one step. With
    /// `only_if_present` an absent list is left absent. Returns whether the
    /// value was pushed.
    async fn push_bounded(
        &self,
        key: &str,
        value: String,
        ttl: Duration,
        max_len: Option<usize>,
        only_if_present: bool,
    ) -> AppResult<bool>;

    async fn ping(&self) -> AppResult<()>;
}

/// Follower/following lookup served by the external social graph service.
#[async_trait]
pub trait SocialGraph: Send + Sync {
    async fn get_followers(&self, user_id: Uuid) -> AppResult<Vec<String>>;
    async fn get_followings(&self, user_id: Uuid) -> AppResult<Vec<String>>;
}
