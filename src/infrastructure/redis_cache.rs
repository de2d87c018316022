// Redis cache backend - shared cache instance used in deployment

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::time::Duration;
use tracing::info;

use crate::error::{AppError, AppResult};
use crate::infrastructure::traits::CacheBackend;

/// Redis client over a multiplexed, auto-reconnecting connection.
#[derive(Clone)]
pub struct RedisCache {
    conn: ConnectionManager,
}

impl RedisCache {
    pub async fn connect(url: &str) -> AppResult<Self> {
        let client = redis::Client::open(url)
            .map_err(|e| AppError::DependencyUnavailable(format!("Invalid Redis URL {}: {}", url, e)))?;
        let conn = ConnectionManager::new(client)
            .await
            .map_err(|e| AppError::DependencyUnavailable(format!("Failed to connect to Redis: {}", e)))?;
        info!("Connected to Redis cache at {}", url);
        Ok(Self { conn })
    }
}

impl std::fmt::Debug for RedisCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisCache").finish_non_exhaustive()
    }
}

fn redis_error(op: &str, key: &str, err: redis::RedisError) -> AppError {
    AppError::DependencyUnavailable(format!("Redis {} failed for key {}: {}", op, key, err))
}

/// Redis TTLs are whole seconds; never round a non-zero TTL down to "no expiry".
fn ttl_secs(ttl: Duration) -> u64 {
    ttl.as_secs().max(1)
}

#[async_trait]
impl CacheBackend for RedisCache {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        let mut conn = self.conn.clone();
        conn.get::<_, Option<String>>(key)
            .await
            .map_err(|e| redis_error("GET", key, e))
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> AppResult<()> {
        let mut conn = self.conn.clone();
        conn.set_ex::<_, _, ()>(key, value, ttl_secs(ttl))
            .await
            .map_err(|e| redis_error("SETEX", key, e))
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        let mut conn = self.conn.clone();
        conn.del::<_, ()>(key)
            .await
            .map_err(|e| redis_error("DEL", key, e))
    }

    async fn get_list(&self, key: &str, start: isize, stop: isize) -> AppResult<Vec<String>> {
        let mut conn = self.conn.clone();
        conn.lrange::<_, Vec<String>>(key, start, stop)
            .await
            .map_err(|e| redis_error("LRANGE", key, e))
    }

    async fn push_list(&self, key: &str, value: String) -> AppResult<()> {
        let mut conn = self.conn.clone();
        conn.lpush::<_, _, ()>(key, value)
            .await
            .map_err(|e| redis_error("LPUSH", key, e))
    }

    async fn trim_list(&self, key: &str, max_len: usize) -> AppResult<()> {
        if max_len == 0 {
            // LTRIM 0 -1 would keep the whole list
            return self.delete(key).await;
        }
        let mut conn = self.conn.clone();
        let stop = max_len as isize - 1;
        conn.ltrim::<_, ()>(key, 0, stop)
            .await
            .map_err(|e| redis_error("LTRIM", key, e))
    }

    async fn expire(&self, key: &str, ttl: Duration) -> AppResult<()> {
        let mut conn = self.conn.clone();
        conn.expire::<_, ()>(key, ttl_secs(ttl) as i64)
            .await
            .map_err(|e| redis_error("EXPIRE", key, e))
    }

    async fn replace_list(
        &self,
        key: &str,
        mut items: Vec<String>,
        ttl: Duration,
        max_len: Option<usize>,
    ) -> AppResult<()> {
        if let Some(max_len) = max_len {
            items.truncate(max_len);
        }
        if items.is_empty() {
            return self.delete(key).await;
        }

        let mut pipe = redis::pipe();
        pipe.atomic()
            .del(key)
            .ignore()
            .rpush(key, items)
            .ignore()
            .expire(key, ttl_secs(ttl) as i64)
            .ignore();
        let mut conn = self.conn.clone();
        pipe.query_async::<()>(&mut conn)
            .await
            .map_err(|e| redis_error("MULTI DEL RPUSH EXPIRE", key, e))
    }

    async fn push_bounded(
        &self,
        key: &str,
        value: String,
        ttl: Duration,
        max_len: Option<usize>,
        only_if_present: bool,
    ) -> AppResult<bool> {
        if max_len == Some(0) {
            self.delete(key).await?;
            return Ok(false);
        }

        let mut pipe = redis::pipe();
        pipe.atomic();
        // LPUSHX leaves an absent key absent, and the trim and expire below are no-ops on it
        if only_if_present {
            pipe.lpush_exists(key, value);
        } else {
            pipe.lpush(key, value);
        }
        if let Some(max_len) = max_len {
            pipe.ltrim(key, 0, max_len as isize - 1).ignore();
        }
        pipe.expire(key, ttl_secs(ttl) as i64).ignore();

        let mut conn = self.conn.clone();
        let (len,): (i64,) = pipe
            .query_async(&mut conn)
            .await
            .map_err(|e| redis_error("MULTI LPUSH LTRIM EXPIRE", key, e))?;
        Ok(len > 0)
    }

    async fn ping(&self) -> AppResult<()> {
        let mut conn = self.conn.clone();
        redis::cmd("PING")
            .query_async::<String>(&mut conn)
            .await
            .map(|_| ())
            .map_err(|e| redis_error("PING", "-", e))
    }
}
