// Post persistence with the cache plumbing around it

use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::infrastructure::{cache_keys, cache_ttl, CacheLayer, StoreInterface, FEED_MAX_LEN};
use crate::models::{require_text, CreatePostRequest, Post, UpdatePostRequest};

/// Owns the `post:*`, `user_posts:*`, `feed_posts` and following-feed keys.
/// Ownership checks live in the facade; this type trusts its caller.
#[derive(Clone)]
pub struct PostManager {
    store: Arc<dyn StoreInterface>,
    cache: CacheLayer,
}

impl PostManager {
    pub fn new(store: Arc<dyn StoreInterface>, cache: CacheLayer) -> Self {
        Self { store, cache }
    }

    #[instrument(skip(self, request))]
    pub async fn create(&self, user_id: Uuid, request: CreatePostRequest) -> AppResult<Post> {
        require_text(&request.caption, "caption")?;

        let post = Post::new(user_id, request);
        self.store.create_post(&post).await?;

        self.cache
            .write_object(&cache_keys::post(post.id), &post, cache_ttl::POSTS)
            .await;
        self.cache
            .prepend_if_cached(&cache_keys::user_posts(user_id), &post, cache_ttl::POSTS, None)
            .await;
        self.cache
            .prepend_if_cached(cache_keys::FEED_POSTS, &post, cache_ttl::POSTS, Some(FEED_MAX_LEN))
            .await;

        info!(post_id = %post.id, user_id = %user_id, "Created post");
        Ok(post)
    }

    pub async fn get(&self, post_id: Uuid) -> AppResult<Post> {
        self.cache
            .get_or_load(&cache_keys::post(post_id), cache_ttl::POSTS, || async {
                self.store
                    .get_post(post_id)
                    .await?
                    .ok_or_else(|| AppError::NotFound(format!("Post {} not found", post_id)))
            })
            .await
    }

    /// Cache-bypassing existence check used before writes that reference a post.
    pub async fn ensure_exists(&self, post_id: Uuid) -> AppResult<Post> {
        self.store
            .get_post(post_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Post {} not found", post_id)))
    }

    #[instrument(skip(self, existing, request), fields(post_id = %existing.id))]
    pub async fn update(&self, mut existing: Post, request: UpdatePostRequest) -> AppResult<Post> {
        existing.apply(request);
        self.store.update_post(&existing).await?;
        self.invalidate_post(&existing).await;
        Ok(existing)
    }

    /// Deleting a post cascades to its comments, likes and notifications, so
    /// the inboxes holding one of those notifications are dropped too.
    #[instrument(skip(self, post), fields(post_id = %post.id))]
    pub async fn delete(&self, post: &Post) -> AppResult<()> {
        let recipients = self.store.list_notification_recipients(post.id).await?;
        if !self.store.delete_post(post.id).await? {
            return Err(AppError::NotFound(format!("Post {} not found", post.id)));
        }

        self.invalidate_post(post).await;
        let mut keys = vec![cache_keys::comments(post.id)];
        keys.extend(recipients.into_iter().map(cache_keys::notifications));
        self.cache.invalidate_all(&keys).await;
        info!(post_id = %post.id, inboxes = keys.len() - 1, "Deleted post");
        Ok(())
    }

    pub async fn list_by_user(&self, user_id: Uuid) -> AppResult<Vec<Post>> {
        self.cache
            .get_or_load_list(&cache_keys::user_posts(user_id), cache_ttl::POSTS, None, || {
                self.store.list_posts_by_user(user_id)
            })
            .await
    }

    /// Most recent posts across all users, at most `FEED_MAX_LEN`.
    pub async fn feed(&self) -> AppResult<Vec<Post>> {
        self.cache
            .get_or_load_list(
                cache_keys::FEED_POSTS,
                cache_ttl::POSTS,
                Some(FEED_MAX_LEN),
                || self.store.list_posts(FEED_MAX_LEN as u32),
            )
            .await
    }

    /// A page of posts written by `user_ids`, newest first. Pages are cached
    /// briefly and never invalidated.
    pub async fn list_by_users(
        &self,
        user_ids: &[Uuid],
        limit: u32,
        offset: u32,
    ) -> AppResult<Vec<Post>> {
        if user_ids.is_empty() {
            return Ok(Vec::new());
        }
        self.cache
            .get_or_load_list(
                &cache_keys::following_posts(user_ids, limit, offset),
                cache_ttl::FOLLOWING_POSTS,
                None,
                || self.store.list_posts_by_users(user_ids, limit, offset),
            )
            .await
    }

    pub fn cache(&self) -> &CacheLayer {
        &self.cache
    }

    pub async fn health_check(&self) -> AppResult<()> {
        self.store.health_check().await
    }

    async fn invalidate_post(&self, post: &Post) {
        self.cache
            .invalidate_all(&[
                cache_keys::post(post.id),
                cache_keys::user_posts(post.user_id),
                cache_keys::FEED_POSTS.to_string(),
            ])
            .await;
    }
}
