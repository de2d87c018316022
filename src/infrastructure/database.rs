// Primary store interface - authoritative rows for posts, comments, likes and notifications

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::{Comment, Like, Notification, Post};

/// Relational storage behind the cache layer.
///
/// Lookups return `Ok(None)` for missing rows; updates of missing rows return
/// `AppError::NotFound`. Every other failure is `AppError::DatabaseError`.
#[async_trait]
pub trait StoreInterface: Send + Sync {
    async fn health_check(&self) -> AppResult<()>;

    // Posts
    async fn create_post(&self, post: &Post) -> AppResult<()>;
    async fn get_post(&self, id: Uuid) -> AppResult<Option<Post>>;
    async fn update_post(&self, post: &Post) -> AppResult<()>;
    async fn delete_post(&self, id: Uuid) -> AppResult<bool>;
    /// Newest first.
    async fn list_posts_by_user(&self, user_id: Uuid) -> AppResult<Vec<Post>>;
    /// Newest first.
    async fn list_posts(&self, limit: u32) -> AppResult<Vec<Post>>;
    /// Newest first, paginated.
    async fn list_posts_by_users(
        &self,
        user_ids: &[Uuid],
        limit: u32,
        offset: u32,
    ) -> AppResult<Vec<Post>>;

    // Comments
    async fn create_comment(&self, comment: &Comment) -> AppResult<()>;
    async fn get_comment(&self, id: Uuid) -> AppResult<Option<Comment>>;
    async fn update_comment_text(
        &self,
        id: Uuid,
        msg: &str,
        updated_at: DateTime<Utc>,
    ) -> AppResult<()>;
    /// Oldest first.
    async fn list_comments_by_post(&self, post_id: Uuid) -> AppResult<Vec<Comment>>;
    /// Ids of the direct replies to `parent_id`.
    async fn list_reply_ids(&self, parent_id: Uuid) -> AppResult<Vec<Uuid>>;
    async fn delete_comments(&self, ids: &[Uuid]) -> AppResult<u64>;
    async fn delete_comment(&self, id: Uuid) -> AppResult<bool>;

    // Likes
    async fn get_like(&self, user_id: Uuid, post_id: Uuid) -> AppResult<Option<Like>>;
    async fn create_like(&self, like: &Like) -> AppResult<()>;
    async fn set_like_deleted(
        &self,
        user_id: Uuid,
        post_id: Uuid,
        deleted_at: Option<DateTime<Utc>>,
    ) -> AppResult<()>;
    async fn count_likes(&self, post_id: Uuid) -> AppResult<u64>;

    // Notifications
    async fn create_notification(&self, notification: &Notification) -> AppResult<()>;
    /// Newest first.
    async fn list_notifications(&self, recipient_id: Uuid) -> AppResult<Vec<Notification>>;
    /// Distinct recipients holding a notification about `post_id`.
    async fn list_notification_recipients(&self, post_id: Uuid) -> AppResult<Vec<Uuid>>;
}
