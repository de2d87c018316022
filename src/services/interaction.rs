// InteractionService - the single entry point for post, comment, like and
// notification operations. Sequences store writes, cache upkeep and fan-out.

use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::infrastructure::{CacheStats, SocialGraph};
use crate::models::{Comment, CreatePostRequest, Like, Notification, Post, UpdatePostRequest};
use crate::services::comments::CommentTree;
use crate::services::likes::LikeManager;
use crate::services::notifications::FanoutNotifier;
use crate::services::posts::PostManager;

#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub database: bool,
    pub cache: bool,
    pub cache_stats: CacheStats,
}

impl HealthReport {
    pub fn is_healthy(&self) -> bool {
        self.database && self.cache
    }
}

#[derive(Clone)]
pub struct InteractionService {
    posts: PostManager,
    comments: CommentTree,
    likes: LikeManager,
    notifier: FanoutNotifier,
    social_graph: Arc<dyn SocialGraph>,
}

impl InteractionService {
    pub fn new(
        posts: PostManager,
        comments: CommentTree,
        likes: LikeManager,
        notifier: FanoutNotifier,
        social_graph: Arc<dyn SocialGraph>,
    ) -> Self {
        Self {
            posts,
            comments,
            likes,
            notifier,
            social_graph,
        }
    }

    // Posts

    /// Save the post, then notify the author's followers. Fan-out problems
    /// are logged and never fail the call.
    #[instrument(skip(self, request))]
    pub async fn create_post(&self, caller: Uuid, request: CreatePostRequest) -> AppResult<Post> {
        let post = self.posts.create(caller, request).await?;
        let report = self.notifier.notify_followers(&post).await;
        info!(
            post_id = %post.id,
            delivered = report.delivered,
            skipped = report.skipped,
            "Post published"
        );
        Ok(post)
    }

    pub async fn get_post(&self, post_id: Uuid) -> AppResult<Post> {
        self.posts.get(post_id).await
    }

    #[instrument(skip(self, request))]
    pub async fn update_post(
        &self,
        caller: Uuid,
        post_id: Uuid,
        request: UpdatePostRequest,
    ) -> AppResult<Post> {
        let existing = self.posts.ensure_exists(post_id).await?;
        if existing.user_id != caller {
            return Err(AppError::Unauthorized(
                "cannot update someone else's post".to_string(),
            ));
        }
        self.posts.update(existing, request).await
    }

    #[instrument(skip(self))]
    pub async fn delete_post(&self, caller: Uuid, post_id: Uuid) -> AppResult<()> {
        let existing = self.posts.ensure_exists(post_id).await?;
        if existing.user_id != caller {
            return Err(AppError::Unauthorized(
                "cannot delete someone else's post".to_string(),
            ));
        }
        self.posts.delete(&existing).await
    }

    pub async fn list_my_posts(&self, caller: Uuid) -> AppResult<Vec<Post>> {
        self.posts.list_by_user(caller).await
    }

    pub async fn list_feed(&self) -> AppResult<Vec<Post>> {
        self.posts.feed().await
    }

    /// Posts of the accounts `user_id` follows, newest first.
    #[instrument(skip(self))]
    pub async fn list_following_posts(
        &self,
        user_id: Uuid,
        limit: u32,
        offset: u32,
    ) -> AppResult<Vec<Post>> {
        let followings = self.social_graph.get_followings(user_id).await.map_err(|e| {
            warn!(user_id = %user_id, error = %e, "Following lookup failed");
            match e {
                unavailable @ AppError::DependencyUnavailable(_) => unavailable,
                other => AppError::DependencyUnavailable(other.to_string()),
            }
        })?;

        let mut ids: Vec<Uuid> = Vec::with_capacity(followings.len());
        for raw in &followings {
            match Uuid::parse_str(raw.trim()) {
                Ok(id) if !ids.contains(&id) => ids.push(id),
                Ok(_) => {}
                Err(_) => warn!(following = %raw, "Skipping malformed following id"),
            }
        }

        self.posts.list_by_users(&ids, limit, offset).await
    }

    // Comments

    pub async fn create_comment(&self, caller: Uuid, post_id: Uuid, msg: &str) -> AppResult<Comment> {
        self.comments.create_comment(caller, post_id, msg, None).await
    }

    pub async fn reply_comment(
        &self,
        caller: Uuid,
        post_id: Uuid,
        parent_id: Uuid,
        msg: &str,
    ) -> AppResult<Comment> {
        self.comments.reply(caller, post_id, parent_id, msg).await
    }

    pub async fn update_comment(&self, caller: Uuid, comment_id: Uuid, msg: &str) -> AppResult<Comment> {
        self.comments.update(comment_id, caller, msg).await
    }

    /// Author-only. Removes the comment and all of its replies.
    #[instrument(skip(self))]
    pub async fn delete_comment(&self, caller: Uuid, comment_id: Uuid) -> AppResult<u64> {
        let comment = self.comments.load(comment_id).await?;
        if comment.user_id != caller {
            return Err(AppError::Unauthorized(
                "cannot delete someone else's comment".to_string(),
            ));
        }
        self.comments.delete(comment_id).await
    }

    pub async fn list_comments(&self, post_id: Uuid) -> AppResult<Vec<Comment>> {
        self.comments.list(post_id).await
    }

    // Likes

    pub async fn like_post(&self, caller: Uuid, post_id: Uuid) -> AppResult<Like> {
        self.likes.like(caller, post_id).await
    }

    pub async fn dislike_post(&self, caller: Uuid, post_id: Uuid) -> AppResult<Like> {
        self.likes.dislike(caller, post_id).await
    }

    pub async fn count_likes(&self, post_id: Uuid) -> AppResult<u64> {
        self.likes.count(post_id).await
    }

    // Notifications

    pub async fn list_notifications(&self, caller: Uuid) -> AppResult<Vec<Notification>> {
        self.notifier.list_notifications(caller).await
    }

    pub async fn health(&self) -> HealthReport {
        let database = match self.posts.health_check().await {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "Store health check failed");
                false
            }
        };
        let cache = match self.posts.cache().ping().await {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "Cache health check failed");
                false
            }
        };
        HealthReport {
            database,
            cache,
            cache_stats: self.posts.cache().stats(),
        }
    }
}
