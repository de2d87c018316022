// Comment threads: a forest of comments per post linked through `reply_to`

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::infrastructure::{cache_keys, cache_ttl, CacheLayer, StoreInterface};
use crate::models::{require_text, Comment};

#[derive(Clone)]
pub struct CommentTree {
    store: Arc<dyn StoreInterface>,
    cache: CacheLayer,
}

impl CommentTree {
    pub fn new(store: Arc<dyn StoreInterface>, cache: CacheLayer) -> Self {
        Self { store, cache }
    }

    /// Persist a comment on `post_id`. A `parent` must be an existing comment
    /// of the same post.
    #[instrument(skip(self, msg))]
    pub async fn create_comment(
        &self,
        author: Uuid,
        post_id: Uuid,
        msg: &str,
        parent: Option<Uuid>,
    ) -> AppResult<Comment> {
        require_text(msg, "msg")?;

        if self.store.get_post(post_id).await?.is_none() {
            return Err(AppError::NotFound(format!("Post {} not found", post_id)));
        }

        if let Some(parent_id) = parent {
            let parent_comment = self.load(parent_id).await?;
            if parent_comment.post_id != post_id {
                return Err(AppError::InvalidInput(format!(
                    "Comment {} does not belong to post {}",
                    parent_id, post_id
                )));
            }
        }

        let comment = Comment::new(author, post_id, msg.to_string(), parent);
        self.store.create_comment(&comment).await?;
        self.cache.invalidate(&cache_keys::comments(post_id)).await;

        debug!(comment_id = %comment.id, post_id = %post_id, "Created comment");
        Ok(comment)
    }

    pub async fn reply(
        &self,
        author: Uuid,
        post_id: Uuid,
        parent_id: Uuid,
        msg: &str,
    ) -> AppResult<Comment> {
        self.create_comment(author, post_id, msg, Some(parent_id)).await
    }

    /// Store lookup, bypassing the thread cache.
    pub async fn load(&self, comment_id: Uuid) -> AppResult<Comment> {
        self.store
            .get_comment(comment_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Comment {} not found", comment_id)))
    }

    #[instrument(skip(self, msg))]
    pub async fn update(&self, comment_id: Uuid, requester: Uuid, msg: &str) -> AppResult<Comment> {
        require_text(msg, "msg")?;

        let mut comment = self.load(comment_id).await?;
        if comment.user_id != requester {
            return Err(AppError::Unauthorized(
                "cannot update someone else's comment".to_string(),
            ));
        }

        comment.msg = msg.to_string();
        comment.updated_at = crate::models::now();
        self.store
            .update_comment_text(comment.id, &comment.msg, comment.updated_at)
            .await?;
        self.cache.invalidate(&cache_keys::comments(comment.post_id)).await;
        Ok(comment)
    }

    /// Delete a comment together with every transitive reply. Returns the
    /// number of comments removed.
    #[instrument(skip(self))]
    pub async fn delete(&self, comment_id: Uuid) -> AppResult<u64> {
        let root = self.load(comment_id).await?;

        let descendants = self.collect_descendants(root.id).await?;
        let mut removed = 0;
        if !descendants.is_empty() {
            removed += self.store.delete_comments(&descendants).await?;
        }
        if self.store.delete_comment(root.id).await? {
            removed += 1;
        }

        self.cache.invalidate(&cache_keys::comments(root.post_id)).await;
        info!(comment_id = %root.id, post_id = %root.post_id, removed, "Deleted comment thread");
        Ok(removed)
    }

    /// Breadth-first walk over `reply_to` edges below `root`, each id once.
    async fn collect_descendants(&self, root: Uuid) -> AppResult<Vec<Uuid>> {
        let mut seen = HashSet::from([root]);
        let mut queue = VecDeque::from([root]);
        let mut descendants = Vec::new();

        while let Some(current) = queue.pop_front() {
            for reply_id in self.store.list_reply_ids(current).await? {
                if seen.insert(reply_id) {
                    descendants.push(reply_id);
                    queue.push_back(reply_id);
                }
            }
        }
        Ok(descendants)
    }

    /// Oldest first. An empty thread is an empty list.
    pub async fn list(&self, post_id: Uuid) -> AppResult<Vec<Comment>> {
        self.cache
            .get_or_load_list(&cache_keys::comments(post_id), cache_ttl::COMMENTS, None, || {
                self.store.list_comments_by_post(post_id)
            })
            .await
    }
}
