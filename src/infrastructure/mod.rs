// Core infrastructure modules
pub mod traits;                // Cache backend and social graph seams
pub mod database;              // Primary store interface
pub mod sqlite_database;       // SQLite primary store
pub mod cache;                 // In-process LRU cache backend
pub mod redis_cache;           // Redis cache backend
pub mod cache_layer;           // Read-through / write-invalidate cache layer
pub mod social_graph;          // Social graph HTTP client

// Re-export infrastructure components
pub use cache::MemoryCache;
pub use cache_layer::{cache_keys, cache_ttl, CacheLayer, CacheStats, FEED_MAX_LEN, INBOX_MAX_LEN};
pub use database::StoreInterface;
pub use redis_cache::RedisCache;
pub use social_graph::HttpSocialGraph;
pub use sqlite_database::SqliteStore;
pub use traits::{CacheBackend, SocialGraph};
