use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub cache: CacheConfig,
    pub social_graph: SocialGraphConfig,
    pub fanout: FanoutConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub request_timeout_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CacheBackendKind {
    Memory,
    Redis,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub backend: CacheBackendKind,
    pub redis_url: String,
    /// Maximum number of keys held by the in-process backend.
    pub capacity: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SocialGraphConfig {
    pub base_url: String,
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FanoutConfig {
    /// Notification saves in flight at once during a fan-out.
    pub concurrency: usize,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            database: DatabaseConfig {
                url: env::var("DATABASE_URL")
                    .unwrap_or_else(|_| "sqlite:data/content_interaction.db".to_string()),
                max_connections: parse_env("DATABASE_MAX_CONNECTIONS", 5),
            },
            server: ServerConfig {
                host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: parse_env("SERVER_PORT", 3000),
                request_timeout_ms: parse_env("REQUEST_TIMEOUT_MS", 10_000),
            },
            cache: CacheConfig {
                backend: match env::var("CACHE_BACKEND").as_deref() {
                    Ok("redis") => CacheBackendKind::Redis,
                    _ => CacheBackendKind::Memory,
                },
                redis_url: env::var("REDIS_URL")
                    .unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string()),
                capacity: parse_env("CACHE_CAPACITY", 10_000),
            },
            social_graph: SocialGraphConfig {
                base_url: env::var("SOCIAL_GRAPH_URL")
                    .unwrap_or_else(|_| "http://127.0.0.1:8081".to_string()),
                timeout_ms: parse_env("SOCIAL_GRAPH_TIMEOUT_MS", 3_000),
            },
            fanout: FanoutConfig {
                concurrency: parse_env("FANOUT_CONCURRENCY", 8),
            },
        })
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.server.request_timeout_ms)
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|raw| raw.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_env_falls_back_on_garbage() {
        env::set_var("CI_TEST_FANOUT_GARBAGE", "not-a-number");
        assert_eq!(parse_env::<usize>("CI_TEST_FANOUT_GARBAGE", 8), 8);
        env::set_var("CI_TEST_FANOUT_NUMBER", "3");
        assert_eq!(parse_env::<usize>("CI_TEST_FANOUT_NUMBER", 8), 3);
    }
}
