#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;

use content_interaction::{
    app_state::AppState,
    infrastructure::{CacheBackend, MemoryCache, SocialGraph, SqliteStore, StoreInterface},
    models::{Comment, Like, Notification, Post},
    services::InteractionService,
    AppError, AppResult,
};

/// Store decorator that counts calls per operation and can fail notification
/// saves for chosen recipients.
pub struct CountingStore {
    inner: Arc<dyn StoreInterface>,
    calls: Mutex<HashMap<&'static str, usize>>,
    failing_recipients: Mutex<HashSet<Uuid>>,
    notification_attempts: Mutex<Vec<Uuid>>,
}

impl CountingStore {
    pub fn new(inner: Arc<dyn StoreInterface>) -> Self {
        Self {
            inner,
            calls: Mutex::new(HashMap::new()),
            failing_recipients: Mutex::new(HashSet::new()),
            notification_attempts: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self, operation: &str) -> usize {
        self.calls.lock().unwrap().get(operation).copied().unwrap_or(0)
    }

    pub fn fail_notifications_for(&self, recipient_id: Uuid) {
        self.failing_recipients.lock().unwrap().insert(recipient_id);
    }

    pub fn notification_attempts(&self) -> Vec<Uuid> {
        self.notification_attempts.lock().unwrap().clone()
    }

    fn record(&self, operation: &'static str) {
        *self.calls.lock().unwrap().entry(operation).or_insert(0) += 1;
    }
}

#[async_trait]
impl StoreInterface for CountingStore {
    async fn health_check(&self) -> AppResult<()> {
        self.record("health_check");
        self.inner.health_check().await
    }

    async fn create_post(&self, post: &Post) -> AppResult<()> {
        self.record("create_post");
        self.inner.create_post(post).await
    }

    async fn get_post(&self, id: Uuid) -> AppResult<Option<Post>> {
        self.record("get_post");
        self.inner.get_post(id).await
    }

    async fn update_post(&self, post: &Post) -> AppResult<()> {
        self.record("update_post");
        self.inner.update_post(post).await
    }

    async fn delete_post(&self, id: Uuid) -> AppResult<bool> {
        self.record("delete_post");
        self.inner.delete_post(id).await
    }

    async fn list_posts_by_user(&self, user_id: Uuid) -> AppResult<Vec<Post>> {
        self.record("list_posts_by_user");
        self.inner.list_posts_by_user(user_id).await
    }

    async fn list_posts(&self, limit: u32) -> AppResult<Vec<Post>> {
        self.record("list_posts");
        self.inner.list_posts(limit).await
    }

    async fn list_posts_by_users(
        &self,
        user_ids: &[Uuid],
        limit: u32,
        offset: u32,
    ) -> AppResult<Vec<Post>> {
        self.record("list_posts_by_users");
        self.inner.list_posts_by_users(user_ids, limit, offset).await
    }

    async fn create_comment(&self, comment: &Comment) -> AppResult<()> {
        self.record("create_comment");
        self.inner.create_comment(comment).await
    }

    async fn get_comment(&self, id: Uuid) -> AppResult<Option<Comment>> {
        self.record("get_comment");
        self.inner.get_comment(id).await
    }

    async fn update_comment_text(
        &self,
        id: Uuid,
        msg: &str,
        updated_at: DateTime<Utc>,
    ) -> AppResult<()> {
        self.record("update_comment_text");
        self.inner.update_comment_text(id, msg, updated_at).await
    }

    async fn list_comments_by_post(&self, post_id: Uuid) -> AppResult<Vec<Comment>> {
        self.record("list_comments_by_post");
        self.inner.list_comments_by_post(post_id).await
    }

    async fn list_reply_ids(&self, parent_id: Uuid) -> AppResult<Vec<Uuid>> {
        self.record("list_reply_ids");
        self.inner.list_reply_ids(parent_id).await
    }

    async fn delete_comments(&self, ids: &[Uuid]) -> AppResult<u64> {
        self.record("delete_comments");
        self.inner.delete_comments(ids).await
    }

    async fn delete_comment(&self, id: Uuid) -> AppResult<bool> {
        self.record("delete_comment");
        self.inner.delete_comment(id).await
    }

    async fn get_like(&self, user_id: Uuid, post_id: Uuid) -> AppResult<Option<Like>> {
        self.record("get_like");
        self.inner.get_like(user_id, post_id).await
    }

    async fn create_like(&self, like: &Like) -> AppResult<()> {
        self.record("create_like");
        self.inner.create_like(like).await
    }

    async fn set_like_deleted(
        &self,
        user_id: Uuid,
        post_id: Uuid,
        deleted_at: Option<DateTime<Utc>>,
    ) -> AppResult<()> {
        self.record("set_like_deleted");
        self.inner.set_like_deleted(user_id, post_id, deleted_at).await
    }

    async fn count_likes(&self, post_id: Uuid) -> AppResult<u64> {
        self.record("count_likes");
        self.inner.count_likes(post_id).await
    }

    async fn create_notification(&self, notification: &Notification) -> AppResult<()> {
        self.record("create_notification");
        self.notification_attempts
            .lock()
            .unwrap()
            .push(notification.recipient_id);
        if self
            .failing_recipients
            .lock()
            .unwrap()
            .contains(&notification.recipient_id)
        {
            return Err(AppError::DatabaseError("injected notification failure".into()));
        }
        self.inner.create_notification(notification).await
    }

    async fn list_notifications(&self, recipient_id: Uuid) -> AppResult<Vec<Notification>> {
        self.record("list_notifications");
        self.inner.list_notifications(recipient_id).await
    }

    async fn list_notification_recipients(&self, post_id: Uuid) -> AppResult<Vec<Uuid>> {
        self.record("list_notification_recipients");
        self.inner.list_notification_recipients(post_id).await
    }
}

/// Social graph with fixed relations.
#[derive(Default)]
pub struct StaticSocialGraph {
    followers: Mutex<HashMap<Uuid, Vec<String>>>,
    followings: Mutex<HashMap<Uuid, Vec<String>>>,
    down: bool,
}

impl StaticSocialGraph {
    pub fn unavailable() -> Self {
        Self {
            down: true,
            ..Default::default()
        }
    }

    pub fn set_followers(&self, user_id: Uuid, followers: &[Uuid]) {
        self.followers
            .lock()
            .unwrap()
            .insert(user_id, followers.iter().map(Uuid::to_string).collect());
    }

    pub fn set_followings(&self, user_id: Uuid, followings: &[Uuid]) {
        self.followings
            .lock()
            .unwrap()
            .insert(user_id, followings.iter().map(Uuid::to_string).collect());
    }
}

#[async_trait]
impl SocialGraph for StaticSocialGraph {
    async fn get_followers(&self, user_id: Uuid) -> AppResult<Vec<String>> {
        if self.down {
            return Err(AppError::DependencyUnavailable("social graph down".into()));
        }
        Ok(self.followers.lock().unwrap().get(&user_id).cloned().unwrap_or_default())
    }

    async fn get_followings(&self, user_id: Uuid) -> AppResult<Vec<String>> {
        if self.down {
            return Err(AppError::DependencyUnavailable("social graph down".into()));
        }
        Ok(self.followings.lock().unwrap().get(&user_id).cloned().unwrap_or_default())
    }
}

/// Cache backend that is never reachable.
pub struct DownCache;

fn refused() -> AppError {
    AppError::DependencyUnavailable("cache connection refused".into())
}

#[async_trait]
impl CacheBackend for DownCache {
    async fn get(&self, _key: &str) -> AppResult<Option<String>> {
        Err(refused())
    }
    async fn set(&self, _key: &str, _value: String, _ttl: Duration) -> AppResult<()> {
        Err(refused())
    }
    async fn delete(&self, _key: &str) -> AppResult<()> {
        Err(refused())
    }
    async fn get_list(&self, _key: &str, _start: isize, _stop: isize) -> AppResult<Vec<String>> {
        Err(refused())
    }
    async fn push_list(&self, _key: &str, _value: String) -> AppResult<()> {
        Err(refused())
    }
    async fn trim_list(&self, _key: &str, _max_len: usize) -> AppResult<()> {
        Err(refused())
    }
    async fn expire(&self, _key: &str, _ttl: Duration) -> AppResult<()> {
        Err(refused())
    }
    async fn replace_list(
        &self,
        _key: &str,
        _items: Vec<String>,
        _ttl: Duration,
        _max_len: Option<usize>,
    ) -> AppResult<()> {
        Err(refused())
    }
    async fn push_bounded(
        &self,
        _key: &str,
        _value: String,
        _ttl: Duration,
        _max_len: Option<usize>,
        _only_if_present: bool,
    ) -> AppResult<bool> {
        Err(refused())
    }
    async fn ping(&self) -> AppResult<()> {
        Err(refused())
    }
}

pub struct Harness {
    pub service: InteractionService,
    pub store: Arc<CountingStore>,
    pub graph: Arc<StaticSocialGraph>,
}

pub async fn harness() -> Harness {
    harness_with(Arc::new(MemoryCache::new(1024)), StaticSocialGraph::default()).await
}

pub async fn harness_with(backend: Arc<dyn CacheBackend>, graph: StaticSocialGraph) -> Harness {
    let sqlite: Arc<dyn StoreInterface> = Arc::new(SqliteStore::new_in_memory().await.unwrap());
    let store = Arc::new(CountingStore::new(sqlite));
    let graph = Arc::new(graph);
    let service = AppState::build_service(store.clone(), backend, graph.clone(), 4);
    Harness {
        service,
        store,
        graph,
    }
}
