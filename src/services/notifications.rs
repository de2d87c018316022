// Fan-out of new posts into per-follower notification inboxes

use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::error::AppResult;
use crate::infrastructure::{
    cache_keys, cache_ttl, CacheLayer, SocialGraph, StoreInterface, INBOX_MAX_LEN,
};
use crate::models::{Notification, Post};

/// What happened for one follower during a fan-out.
#[derive(Debug, Clone, PartialEq)]
pub enum FanoutOutcome {
    Delivered { recipient_id: Uuid, notification_id: Uuid },
    Skipped { follower: String, reason: String },
}

/// Result of one fan-out. Skips are informational: the post is already saved.
#[derive(Debug, Clone, Default)]
pub struct FanoutReport {
    pub outcomes: Vec<FanoutOutcome>,
    pub delivered: usize,
    pub skipped: usize,
}

impl FanoutReport {
    fn record(&mut self, outcome: FanoutOutcome) {
        match outcome {
            FanoutOutcome::Delivered { .. } => self.delivered += 1,
            FanoutOutcome::Skipped { .. } => self.skipped += 1,
        }
        self.outcomes.push(outcome);
    }

    pub fn is_partial(&self) -> bool {
        self.skipped > 0
    }

    pub fn delivered_to(&self) -> Vec<Uuid> {
        self.outcomes
            .iter()
            .filter_map(|outcome| match outcome {
                FanoutOutcome::Delivered { recipient_id, .. } => Some(*recipient_id),
                FanoutOutcome::Skipped { .. } => None,
            })
            .collect()
    }
}

#[derive(Clone)]
pub struct FanoutNotifier {
    store: Arc<dyn StoreInterface>,
    cache: CacheLayer,
    social_graph: Arc<dyn SocialGraph>,
    concurrency: usize,
}

impl FanoutNotifier {
    pub fn new(
        store: Arc<dyn StoreInterface>,
        cache: CacheLayer,
        social_graph: Arc<dyn SocialGraph>,
        concurrency: usize,
    ) -> Self {
        Self {
            store,
            cache,
            social_graph,
            concurrency: concurrency.max(1),
        }
    }

    /// Write one NEW_POST notification per follower of the post's author.
    /// Never fails: lookup and save errors end up in the report.
    #[instrument(skip(self, post), fields(post_id = %post.id, author = %post.user_id))]
    pub async fn notify_followers(&self, post: &Post) -> FanoutReport {
        let mut report = FanoutReport::default();

        let followers = match self.social_graph.get_followers(post.user_id).await {
            Ok(followers) => followers,
            Err(e) => {
                warn!(error = %e, "Follower lookup failed, skipping notifications");
                return report;
            }
        };

        let mut seen = HashSet::new();
        let mut recipients = Vec::with_capacity(followers.len());
        for raw in followers {
            match Uuid::parse_str(raw.trim()) {
                Ok(id) if id == post.user_id => {}
                Ok(id) => {
                    if seen.insert(id) {
                        recipients.push(id);
                    }
                }
                Err(e) => report.record(FanoutOutcome::Skipped {
                    follower: raw,
                    reason: format!("malformed follower id: {}", e),
                }),
            }
        }

        let outcomes: Vec<FanoutOutcome> = stream::iter(recipients)
            .map(|recipient_id| self.deliver(post, recipient_id))
            .buffer_unordered(self.concurrency)
            .collect()
            .await;
        for outcome in outcomes {
            report.record(outcome);
        }

        if report.is_partial() {
            warn!(
                delivered = report.delivered,
                skipped = report.skipped,
                "Partial fan-out failure"
            );
        } else {
            info!(delivered = report.delivered, "Fan-out complete");
        }
        report
    }

    async fn deliver(&self, post: &Post, recipient_id: Uuid) -> FanoutOutcome {
        let notification =
            Notification::new_post(post.user_id, recipient_id, post.id, post.caption.clone());

        if let Err(e) = self.store.create_notification(&notification).await {
            warn!(recipient_id = %recipient_id, error = %e, "Failed to save notification");
            return FanoutOutcome::Skipped {
                follower: recipient_id.to_string(),
                reason: e.to_string(),
            };
        }

        self.cache
            .prepend_if_cached(
                &cache_keys::notifications(recipient_id),
                &notification,
                cache_ttl::NOTIFICATIONS,
                Some(INBOX_MAX_LEN),
            )
            .await;

        FanoutOutcome::Delivered {
            recipient_id,
            notification_id: notification.id,
        }
    }

    /// The recipient's inbox, newest first, at most `INBOX_MAX_LEN` entries.
    pub async fn list_notifications(&self, recipient_id: Uuid) -> AppResult<Vec<Notification>> {
        self.cache
            .get_or_load_list(
                &cache_keys::notifications(recipient_id),
                cache_ttl::NOTIFICATIONS,
                Some(INBOX_MAX_LEN),
                || async {
                    let mut inbox = self.store.list_notifications(recipient_id).await?;
                    inbox.truncate(INBOX_MAX_LEN);
                    Ok(inbox)
                },
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::infrastructure::{MemoryCache, SqliteStore};
    use crate::models::CreatePostRequest;
    use async_trait::async_trait;

    struct FixedFollowers(Vec<String>);

    #[async_trait]
    impl SocialGraph for FixedFollowers {
        async fn get_followers(&self, _user_id: Uuid) -> AppResult<Vec<String>> {
            Ok(self.0.clone())
        }
        async fn get_followings(&self, _user_id: Uuid) -> AppResult<Vec<String>> {
            Ok(Vec::new())
        }
    }

    struct GraphDown;

    #[async_trait]
    impl SocialGraph for GraphDown {
        async fn get_followers(&self, _user_id: Uuid) -> AppResult<Vec<String>> {
            Err(AppError::DependencyUnavailable("graph down".into()))
        }
        async fn get_followings(&self, _user_id: Uuid) -> AppResult<Vec<String>> {
            Err(AppError::DependencyUnavailable("graph down".into()))
        }
    }

    async fn saved_post(store: &SqliteStore) -> Post {
        let post = Post::new(
            Uuid::new_v4(),
            CreatePostRequest {
                caption: "hello followers".into(),
                ..Default::default()
            },
        );
        store.create_post(&post).await.unwrap();
        post
    }

    fn notifier(store: Arc<SqliteStore>, graph: Arc<dyn SocialGraph>) -> FanoutNotifier {
        FanoutNotifier::new(store, CacheLayer::new(Arc::new(MemoryCache::new(256))), graph, 4)
    }

    #[tokio::test]
    async fn test_fanout_skips_author_duplicates_and_garbage() {
        let store = Arc::new(SqliteStore::new_in_memory().await.unwrap());
        let post = saved_post(&store).await;
        let follower = Uuid::new_v4();

        let graph = FixedFollowers(vec![
            follower.to_string(),
            follower.to_string(),
            post.user_id.to_string(),
            "not-a-uuid".to_string(),
        ]);
        let report = notifier(store.clone(), Arc::new(graph))
            .notify_followers(&post)
            .await;

        assert_eq!(report.delivered, 1);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.delivered_to(), vec![follower]);
        assert!(store.list_notifications(post.user_id).await.unwrap().is_empty());

        let inbox = store.list_notifications(follower).await.unwrap();
        assert_eq!(inbox.len(), 1);
        assert_eq!(inbox[0].content, "hello followers");
        assert_eq!(inbox[0].source_user_id, post.user_id);
    }

    #[tokio::test]
    async fn test_lookup_failure_yields_empty_report() {
        let store = Arc::new(SqliteStore::new_in_memory().await.unwrap());
        let post = saved_post(&store).await;

        let report = notifier(store, Arc::new(GraphDown)).notify_followers(&post).await;
        assert!(report.outcomes.is_empty());
        assert!(!report.is_partial());
    }

    #[tokio::test]
    async fn test_inbox_is_newest_first_and_cached() {
        let store = Arc::new(SqliteStore::new_in_memory().await.unwrap());
        let follower = Uuid::new_v4();
        let notifier = notifier(store.clone(), Arc::new(FixedFollowers(vec![follower.to_string()])));

        let first = saved_post(&store).await;
        notifier.notify_followers(&first).await;
        let inbox = notifier.list_notifications(follower).await.unwrap();
        assert_eq!(inbox.len(), 1);

        // cached inbox gets the new entry prepended
        let second = saved_post(&store).await;
        notifier.notify_followers(&second).await;
        let inbox = notifier.list_notifications(follower).await.unwrap();
        let posts: Vec<Uuid> = inbox.iter().map(|n| n.post_id).collect();
        assert_eq!(posts, vec![second.id, first.id]);
    }
}
