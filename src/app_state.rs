use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::{
    config::{CacheBackendKind, Config},
    infrastructure::{
        CacheBackend, CacheLayer, HttpSocialGraph, MemoryCache, RedisCache, SocialGraph,
        SqliteStore, StoreInterface,
    },
    services::{CommentTree, FanoutNotifier, InteractionService, LikeManager, PostManager},
};

#[derive(Clone)]
pub struct AppState {
    pub service: InteractionService,
    pub config: Config,
}

impl AppState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        // Initialize primary store
        let store: Arc<dyn StoreInterface> = Arc::new(
            SqliteStore::connect(&config.database.url, config.database.max_connections).await?,
        );

        // Initialize cache backend
        let backend: Arc<dyn CacheBackend> = match config.cache.backend {
            CacheBackendKind::Memory => Arc::new(MemoryCache::new(config.cache.capacity)),
            CacheBackendKind::Redis => Arc::new(RedisCache::connect(&config.cache.redis_url).await?),
        };
        info!("Using {:?} cache backend", config.cache.backend);

        let social_graph: Arc<dyn SocialGraph> = Arc::new(HttpSocialGraph::new(
            &config.social_graph.base_url,
            Duration::from_millis(config.social_graph.timeout_ms),
        )?);

        let service = Self::build_service(store, backend, social_graph, config.fanout.concurrency);
        Ok(Self { service, config })
    }

    /// Wire the managers and facade over already constructed dependencies.
    pub fn build_service(
        store: Arc<dyn StoreInterface>,
        backend: Arc<dyn CacheBackend>,
        social_graph: Arc<dyn SocialGraph>,
        fanout_concurrency: usize,
    ) -> InteractionService {
        let cache = CacheLayer::new(backend);
        InteractionService::new(
            PostManager::new(store.clone(), cache.clone()),
            CommentTree::new(store.clone(), cache.clone()),
            LikeManager::new(store.clone()),
            FanoutNotifier::new(store, cache, social_graph.clone(), fanout_concurrency),
            social_graph,
        )
    }
}
