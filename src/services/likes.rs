// Likes: one row per (user, post), soft-deleted on dislike and restored on like

use std::sync::Arc;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::infrastructure::StoreInterface;
use crate::models::Like;

#[derive(Clone)]
pub struct LikeManager {
    store: Arc<dyn StoreInterface>,
}

impl LikeManager {
    pub fn new(store: Arc<dyn StoreInterface>) -> Self {
        Self { store }
    }

    /// Idempotent: liking an already liked post returns the existing like.
    #[instrument(skip(self))]
    pub async fn like(&self, user_id: Uuid, post_id: Uuid) -> AppResult<Like> {
        self.require_post(post_id).await?;

        match self.store.get_like(user_id, post_id).await? {
            Some(like) if like.is_active() => Ok(like),
            Some(mut like) => {
                self.store.set_like_deleted(user_id, post_id, None).await?;
                like.deleted_at = None;
                like.updated_at = crate::models::now();
                debug!(user_id = %user_id, post_id = %post_id, "Restored like");
                Ok(like)
            }
            None => {
                let like = Like::new(user_id, post_id);
                self.store.create_like(&like).await?;
                debug!(user_id = %user_id, post_id = %post_id, "Liked post");
                Ok(like)
            }
        }
    }

    #[instrument(skip(self))]
    pub async fn dislike(&self, user_id: Uuid, post_id: Uuid) -> AppResult<Like> {
        self.require_post(post_id).await?;

        let mut like = self
            .store
            .get_like(user_id, post_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("Post {} was never liked by user {}", post_id, user_id))
            })?;

        if like.is_active() {
            let now = crate::models::now();
            self.store.set_like_deleted(user_id, post_id, Some(now)).await?;
            like.deleted_at = Some(now);
            like.updated_at = now;
        }
        Ok(like)
    }

    pub async fn count(&self, post_id: Uuid) -> AppResult<u64> {
        self.require_post(post_id).await?;
        self.store.count_likes(post_id).await
    }

    async fn require_post(&self, post_id: Uuid) -> AppResult<()> {
        match self.store.get_post(post_id).await? {
            Some(_) => Ok(()),
            None => Err(AppError::NotFound(format!("Post {} not found", post_id))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::SqliteStore;
    use crate::models::{CreatePostRequest, Post};

    async fn likes_with_post() -> (LikeManager, Uuid) {
        let store = Arc::new(SqliteStore::new_in_memory().await.unwrap());
        let post = Post::new(
            Uuid::new_v4(),
            CreatePostRequest {
                caption: "likeable".into(),
                ..Default::default()
            },
        );
        store.create_post(&post).await.unwrap();
        (LikeManager::new(store), post.id)
    }

    #[tokio::test]
    async fn test_like_is_idempotent() {
        let (likes, post_id) = likes_with_post().await;
        let user = Uuid::new_v4();
        likes.like(user, post_id).await.unwrap();
        likes.like(user, post_id).await.unwrap();
        assert_eq!(likes.count(post_id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_dislike_then_like_restores() {
        let (likes, post_id) = likes_with_post().await;
        let user = Uuid::new_v4();
        likes.like(user, post_id).await.unwrap();

        let disliked = likes.dislike(user, post_id).await.unwrap();
        assert!(!disliked.is_active());
        assert_eq!(likes.count(post_id).await.unwrap(), 0);

        let restored = likes.like(user, post_id).await.unwrap();
        assert!(restored.is_active());
        assert_eq!(likes.count(post_id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_missing_targets_are_not_found() {
        let (likes, post_id) = likes_with_post().await;
        assert!(matches!(
            likes.dislike(Uuid::new_v4(), post_id).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            likes.like(Uuid::new_v4(), Uuid::new_v4()).await,
            Err(AppError::NotFound(_))
        ));
    }
}
