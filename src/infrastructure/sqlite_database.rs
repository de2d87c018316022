use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{Sqlite, SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{QueryBuilder, Row};
use std::str::FromStr;
use tracing::info;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::infrastructure::database::StoreInterface;
use crate::models::{Comment, Like, Notification, NotificationType, Post};

const POST_COLUMNS: &str = "id, user_id, image_urls, caption, tags, created_at, updated_at";
const COMMENT_COLUMNS: &str = "id, user_id, post_id, reply_to, msg, created_at, updated_at";
const NOTIFICATION_COLUMNS: &str =
    "id, source_user_id, recipient_id, post_id, notification_type, content, created_at";

/// Ids bound into one `IN (...)` list. Larger sets are split into several
/// statements so SQLite's bound-parameter limit is never reached.
const MAX_BIND_PARAMS: usize = 500;

/// SQLite implementation of the primary store
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating if needed) the database at `url` and make sure the schema exists.
    pub async fn connect(url: &str, max_connections: u32) -> AppResult<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| AppError::DatabaseError(format!("Invalid database URL {}: {}", url, e)))?
            .create_if_missing(true)
            .foreign_keys(true);

        let filename = options.clone().get_filename();
        if let Some(parent) = filename.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await.map_err(|e| {
                    AppError::DatabaseError(format!("Failed to create database directory: {}", e))
                })?;
            }
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect_with(options)
            .await
            .map_err(|e| AppError::DependencyUnavailable(format!("Failed to connect to SQLite: {}", e)))?;

        let store = Self { pool };
        store.initialize().await?;
        info!("SQLite store ready at {}", url);
        Ok(store)
    }

    /// Private in-memory database. A single connection that never idles out,
    /// since every new SQLite memory connection starts empty.
    pub async fn new_in_memory() -> AppResult<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(|e| AppError::DatabaseError(format!("Invalid in-memory URL: {}", e)))?
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(|e| {
                AppError::DatabaseError(format!("Failed to connect to in-memory SQLite: {}", e))
            })?;

        let store = Self { pool };
        store.initialize().await?;
        Ok(store)
    }

    pub async fn initialize(&self) -> AppResult<()> {
        let statements = [
            r#"
            CREATE TABLE IF NOT EXISTS posts (
                id BLOB PRIMARY KEY,
                user_id BLOB NOT NULL,
                image_urls TEXT NOT NULL,
                caption TEXT NOT NULL,
                tags TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS comments (
                id BLOB PRIMARY KEY,
                user_id BLOB NOT NULL,
                post_id BLOB NOT NULL REFERENCES posts(id) ON DELETE CASCADE,
                reply_to BLOB,
                msg TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS likes (
                user_id BLOB NOT NULL,
                post_id BLOB NOT NULL REFERENCES posts(id) ON DELETE CASCADE,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL,
                deleted_at INTEGER,
                PRIMARY KEY (user_id, post_id)
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS notifications (
                id BLOB PRIMARY KEY,
                source_user_id BLOB NOT NULL,
                recipient_id BLOB NOT NULL,
                post_id BLOB NOT NULL REFERENCES posts(id) ON DELETE CASCADE,
                notification_type TEXT NOT NULL,
                content TEXT NOT NULL,
                created_at INTEGER NOT NULL
            )
            "#,
            "CREATE INDEX IF NOT EXISTS idx_posts_user_created ON posts(user_id, created_at DESC)",
            "CREATE INDEX IF NOT EXISTS idx_posts_created ON posts(created_at DESC)",
            "CREATE INDEX IF NOT EXISTS idx_comments_post ON comments(post_id, created_at)",
            "CREATE INDEX IF NOT EXISTS idx_comments_reply_to ON comments(reply_to)",
            "CREATE INDEX IF NOT EXISTS idx_notifications_recipient ON notifications(recipient_id, created_at DESC)",
        ];

        for statement in statements {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| AppError::DatabaseError(format!("Failed to initialize schema: {}", e)))?;
        }
        Ok(())
    }
}

fn to_micros(ts: DateTime<Utc>) -> i64 {
    ts.timestamp_micros()
}

fn from_micros(micros: i64) -> AppResult<DateTime<Utc>> {
    DateTime::from_timestamp_micros(micros)
        .ok_or_else(|| AppError::DatabaseError(format!("Timestamp out of range: {}", micros)))
}

fn column<'r, T>(row: &'r SqliteRow, name: &str) -> AppResult<T>
where
    T: sqlx::Decode<'r, Sqlite> + sqlx::Type<Sqlite>,
{
    row.try_get(name)
        .map_err(|e| AppError::DatabaseError(format!("Failed to decode column {}: {}", name, e)))
}

fn string_list(row: &SqliteRow, name: &str) -> AppResult<Vec<String>> {
    let raw: String = column(row, name)?;
    serde_json::from_str(&raw)
        .map_err(|e| AppError::DatabaseError(format!("Malformed list in column {}: {}", name, e)))
}

fn encode_list(items: &[String]) -> AppResult<String> {
    serde_json::to_string(items).map_err(AppError::from)
}

fn post_from_row(row: &SqliteRow) -> AppResult<Post> {
    Ok(Post {
        id: column(row, "id")?,
        user_id: column(row, "user_id")?,
        image_urls: string_list(row, "image_urls")?,
        caption: column(row, "caption")?,
        tags: string_list(row, "tags")?,
        created_at: from_micros(column(row, "created_at")?)?,
        updated_at: from_micros(column(row, "updated_at")?)?,
    })
}

fn comment_from_row(row: &SqliteRow) -> AppResult<Comment> {
    Ok(Comment {
        id: column(row, "id")?,
        user_id: column(row, "user_id")?,
        post_id: column(row, "post_id")?,
        reply_to: column(row, "reply_to")?,
        msg: column(row, "msg")?,
        created_at: from_micros(column(row, "created_at")?)?,
        updated_at: from_micros(column(row, "updated_at")?)?,
    })
}

fn like_from_row(row: &SqliteRow) -> AppResult<Like> {
    let deleted_at: Option<i64> = column(row, "deleted_at")?;
    Ok(Like {
        user_id: column(row, "user_id")?,
        post_id: column(row, "post_id")?,
        created_at: from_micros(column(row, "created_at")?)?,
        updated_at: from_micros(column(row, "updated_at")?)?,
        deleted_at: deleted_at.map(from_micros).transpose()?,
    })
}

fn notification_from_row(row: &SqliteRow) -> AppResult<Notification> {
    let raw_type: String = column(row, "notification_type")?;
    let notification_type = NotificationType::parse(&raw_type).ok_or_else(|| {
        AppError::DatabaseError(format!("Unknown notification type {}", raw_type))
    })?;
    Ok(Notification {
        id: column(row, "id")?,
        source_user_id: column(row, "source_user_id")?,
        recipient_id: column(row, "recipient_id")?,
        post_id: column(row, "post_id")?,
        notification_type,
        content: column(row, "content")?,
        created_at: from_micros(column(row, "created_at")?)?,
    })
}

#[async_trait]
impl StoreInterface for SqliteStore {
    async fn health_check(&self) -> AppResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DependencyUnavailable(format!("Database health check failed: {}", e)))?;
        Ok(())
    }

    async fn create_post(&self, post: &Post) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO posts (id, user_id, image_urls, caption, tags, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(post.id)
        .bind(post.user_id)
        .bind(encode_list(&post.image_urls)?)
        .bind(&post.caption)
        .bind(encode_list(&post.tags)?)
        .bind(to_micros(post.created_at))
        .bind(to_micros(post.updated_at))
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to create post {}: {}", post.id, e)))?;
        Ok(())
    }

    async fn get_post(&self, id: Uuid) -> AppResult<Option<Post>> {
        let row = sqlx::query(&format!("SELECT {} FROM posts WHERE id = ?", POST_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to get post {}: {}", id, e)))?;

        row.as_ref().map(post_from_row).transpose()
    }

    async fn update_post(&self, post: &Post) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE posts SET image_urls = ?, caption = ?, tags = ?, updated_at = ? WHERE id = ?",
        )
        .bind(encode_list(&post.image_urls)?)
        .bind(&post.caption)
        .bind(encode_list(&post.tags)?)
        .bind(to_micros(post.updated_at))
        .bind(post.id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to update post {}: {}", post.id, e)))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Post {} not found", post.id)));
        }
        Ok(())
    }

    async fn delete_post(&self, id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM posts WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to delete post {}: {}", id, e)))?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_posts_by_user(&self, user_id: Uuid) -> AppResult<Vec<Post>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM posts WHERE user_id = ? ORDER BY created_at DESC, rowid DESC",
            POST_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to list posts of user {}: {}", user_id, e)))?;

        rows.iter().map(post_from_row).collect()
    }

    async fn list_posts(&self, limit: u32) -> AppResult<Vec<Post>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM posts ORDER BY created_at DESC, rowid DESC LIMIT ?",
            POST_COLUMNS
        ))
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to list posts: {}", e)))?;

        rows.iter().map(post_from_row).collect()
    }

    async fn list_posts_by_users(
        &self,
        user_ids: &[Uuid],
        limit: u32,
        offset: u32,
    ) -> AppResult<Vec<Post>> {
        if user_ids.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }

        // Each chunk contributes at most `window` rows; merging those and
        // paging afterwards matches a single query over every id.
        let window = limit as i64 + offset as i64;
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to begin transaction: {}", e)))?;

        let mut ranked: Vec<(i64, i64, Post)> = Vec::new();
        for chunk in user_ids.chunks(MAX_BIND_PARAMS) {
            let mut qb = QueryBuilder::<Sqlite>::new(format!(
                "SELECT {}, rowid AS seq FROM posts WHERE user_id IN (",
                POST_COLUMNS
            ));
            let mut separated = qb.separated(",");
            for id in chunk {
                separated.push_bind(*id);
            }
            qb.push(") ORDER BY created_at DESC, rowid DESC LIMIT ");
            qb.push_bind(window);

            let rows = qb
                .build()
                .fetch_all(&mut *tx)
                .await
                .map_err(|e| AppError::DatabaseError(format!("Failed to list posts by users: {}", e)))?;
            for row in &rows {
                let created_at: i64 = column(row, "created_at")?;
                let seq: i64 = column(row, "seq")?;
                ranked.push((created_at, seq, post_from_row(row)?));
            }
        }

        tx.commit()
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to commit transaction: {}", e)))?;

        ranked.sort_by(|a, b| (b.0, b.1).cmp(&(a.0, a.1)));
        Ok(ranked
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .map(|(_, _, post)| post)
            .collect())
    }

    async fn create_comment(&self, comment: &Comment) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO comments (id, user_id, post_id, reply_to, msg, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(comment.id)
        .bind(comment.user_id)
        .bind(comment.post_id)
        .bind(comment.reply_to)
        .bind(&comment.msg)
        .bind(to_micros(comment.created_at))
        .bind(to_micros(comment.updated_at))
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to create comment {}: {}", comment.id, e)))?;
        Ok(())
    }

    async fn get_comment(&self, id: Uuid) -> AppResult<Option<Comment>> {
        let row = sqlx::query(&format!("SELECT {} FROM comments WHERE id = ?", COMMENT_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to get comment {}: {}", id, e)))?;

        row.as_ref().map(comment_from_row).transpose()
    }

    async fn update_comment_text(
        &self,
        id: Uuid,
        msg: &str,
        updated_at: DateTime<Utc>,
    ) -> AppResult<()> {
        let result = sqlx::query("UPDATE comments SET msg = ?, updated_at = ? WHERE id = ?")
            .bind(msg)
            .bind(to_micros(updated_at))
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to update comment {}: {}", id, e)))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Comment {} not found", id)));
        }
        Ok(())
    }

    async fn list_comments_by_post(&self, post_id: Uuid) -> AppResult<Vec<Comment>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM comments WHERE post_id = ? ORDER BY created_at ASC, rowid ASC",
            COMMENT_COLUMNS
        ))
        .bind(post_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to list comments of post {}: {}", post_id, e)))?;

        rows.iter().map(comment_from_row).collect()
    }

    async fn list_reply_ids(&self, parent_id: Uuid) -> AppResult<Vec<Uuid>> {
        let rows = sqlx::query("SELECT id FROM comments WHERE reply_to = ?")
            .bind(parent_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to get replies of {}: {}", parent_id, e)))?;

        rows.iter().map(|row| column(row, "id")).collect()
    }

    async fn delete_comments(&self, ids: &[Uuid]) -> AppResult<u64> {
        if ids.is_empty() {
            return Ok(0);
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to begin transaction: {}", e)))?;

        let mut deleted = 0;
        for chunk in ids.chunks(MAX_BIND_PARAMS) {
            let mut qb = QueryBuilder::<Sqlite>::new("DELETE FROM comments WHERE id IN (");
            let mut separated = qb.separated(",");
            for id in chunk {
                separated.push_bind(*id);
            }
            qb.push(")");

            let result = qb
                .build()
                .execute(&mut *tx)
                .await
                .map_err(|e| AppError::DatabaseError(format!("Failed to delete replies: {}", e)))?;
            deleted += result.rows_affected();
        }

        tx.commit()
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to commit reply deletion: {}", e)))?;
        Ok(deleted)
    }

    async fn delete_comment(&self, id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM comments WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to delete comment {}: {}", id, e)))?;
        Ok(result.rows_affected() > 0)
    }

    async fn get_like(&self, user_id: Uuid, post_id: Uuid) -> AppResult<Option<Like>> {
        let row = sqlx::query(
            "SELECT user_id, post_id, created_at, updated_at, deleted_at FROM likes WHERE user_id = ? AND post_id = ?",
        )
        .bind(user_id)
        .bind(post_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to get like: {}", e)))?;

        row.as_ref().map(like_from_row).transpose()
    }

    async fn create_like(&self, like: &Like) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO likes (user_id, post_id, created_at, updated_at, deleted_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(like.user_id)
        .bind(like.post_id)
        .bind(to_micros(like.created_at))
        .bind(to_micros(like.updated_at))
        .bind(like.deleted_at.map(to_micros))
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to create like: {}", e)))?;
        Ok(())
    }

    async fn set_like_deleted(
        &self,
        user_id: Uuid,
        post_id: Uuid,
        deleted_at: Option<DateTime<Utc>>,
    ) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE likes SET deleted_at = ?, updated_at = ? WHERE user_id = ? AND post_id = ?",
        )
        .bind(deleted_at.map(to_micros))
        .bind(to_micros(crate::models::now()))
        .bind(user_id)
        .bind(post_id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to update like: {}", e)))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "Like of post {} by user {} not found",
                post_id, user_id
            )));
        }
        Ok(())
    }

    async fn count_likes(&self, post_id: Uuid) -> AppResult<u64> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS likes FROM likes WHERE post_id = ? AND deleted_at IS NULL",
        )
        .bind(post_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to count likes: {}", e)))?;
        let count: i64 = column(&row, "likes")?;
        Ok(count as u64)
    }

    async fn create_notification(&self, notification: &Notification) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO notifications (id, source_user_id, recipient_id, post_id, notification_type, content, created_at) VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(notification.id)
        .bind(notification.source_user_id)
        .bind(notification.recipient_id)
        .bind(notification.post_id)
        .bind(notification.notification_type.as_str())
        .bind(&notification.content)
        .bind(to_micros(notification.created_at))
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(format!("Failed to create notification {}: {}", notification.id, e))
        })?;
        Ok(())
    }

    async fn list_notifications(&self, recipient_id: Uuid) -> AppResult<Vec<Notification>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM notifications WHERE recipient_id = ? ORDER BY created_at DESC, rowid DESC",
            NOTIFICATION_COLUMNS
        ))
        .bind(recipient_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(format!("Failed to list notifications of {}: {}", recipient_id, e))
        })?;

        rows.iter().map(notification_from_row).collect()
    }

    async fn list_notification_recipients(&self, post_id: Uuid) -> AppResult<Vec<Uuid>> {
        let rows = sqlx::query("SELECT DISTINCT recipient_id FROM notifications WHERE post_id = ?")
            .bind(post_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                AppError::DatabaseError(format!("Failed to list recipients of post {}: {}", post_id, e))
            })?;

        rows.iter().map(|row| column(row, "recipient_id")).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CreatePostRequest;

    async fn store_with_post() -> (SqliteStore, Post) {
        let store = SqliteStore::new_in_memory().await.unwrap();
        let post = Post::new(
            Uuid::new_v4(),
            CreatePostRequest {
                caption: "first light".into(),
                tags: vec!["dawn".into()],
                image_urls: vec!["uploads/1.jpg".into()],
            },
        );
        store.create_post(&post).await.unwrap();
        (store, post)
    }

    #[tokio::test]
    async fn test_post_round_trip() {
        let (store, post) = store_with_post().await;
        assert_eq!(store.get_post(post.id).await.unwrap(), Some(post.clone()));
        assert_eq!(store.get_post(Uuid::new_v4()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_update_missing_rows_is_not_found() {
        let (store, post) = store_with_post().await;
        let mut ghost = post.clone();
        ghost.id = Uuid::new_v4();
        assert!(matches!(store.update_post(&ghost).await, Err(AppError::NotFound(_))));
        assert!(matches!(
            store.update_comment_text(Uuid::new_v4(), "x", crate::models::now()).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_posts_newest_first() {
        let store = SqliteStore::new_in_memory().await.unwrap();
        let author = Uuid::new_v4();
        let mut ids = Vec::new();
        for i in 0..3 {
            let post = Post::new(
                author,
                CreatePostRequest {
                    caption: format!("post {}", i),
                    ..Default::default()
                },
            );
            store.create_post(&post).await.unwrap();
            ids.push(post.id);
        }
        ids.reverse();

        let listed: Vec<Uuid> = store
            .list_posts_by_user(author)
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(listed, ids);

        let page = store.list_posts_by_users(&[author], 2, 1).await.unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].id, ids[1]);
        assert!(store.list_posts_by_users(&[], 10, 0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_reply_lookup_and_batch_delete() {
        let (store, post) = store_with_post().await;
        let user = Uuid::new_v4();
        let root = Comment::new(user, post.id, "root".into(), None);
        let a = Comment::new(user, post.id, "a".into(), Some(root.id));
        let b = Comment::new(user, post.id, "b".into(), Some(root.id));
        for c in [&root, &a, &b] {
            store.create_comment(c).await.unwrap();
        }

        let mut replies = store.list_reply_ids(root.id).await.unwrap();
        replies.sort();
        let mut expected = vec![a.id, b.id];
        expected.sort();
        assert_eq!(replies, expected);

        assert_eq!(store.delete_comments(&replies).await.unwrap(), 2);
        assert_eq!(store.delete_comments(&[]).await.unwrap(), 0);
        assert!(store.delete_comment(root.id).await.unwrap());
        assert!(store.list_comments_by_post(post.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_batch_delete_spans_several_statements() {
        let (store, post) = store_with_post().await;
        let user = Uuid::new_v4();
        let root = Comment::new(user, post.id, "root".into(), None);
        store.create_comment(&root).await.unwrap();

        let mut ids = Vec::new();
        for i in 0..(MAX_BIND_PARAMS * 2 + 1) {
            let reply = Comment::new(user, post.id, format!("reply {}", i), Some(root.id));
            store.create_comment(&reply).await.unwrap();
            ids.push(reply.id);
        }

        assert_eq!(store.delete_comments(&ids).await.unwrap(), ids.len() as u64);
        let left: Vec<Uuid> = store
            .list_comments_by_post(post.id)
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(left, vec![root.id]);
    }

    #[tokio::test]
    async fn test_posts_by_many_users_page_across_chunks() {
        let store = SqliteStore::new_in_memory().await.unwrap();
        let users: Vec<Uuid> = (0..(MAX_BIND_PARAMS * 2 + 1)).map(|_| Uuid::new_v4()).collect();

        // one post each from the first, a middle and the last followed user, oldest first
        let mut ids = Vec::new();
        for author in [users[0], users[MAX_BIND_PARAMS + 3], users[users.len() - 1]] {
            let post = Post::new(author, CreatePostRequest { caption: "hi".into(), ..Default::default() });
            store.create_post(&post).await.unwrap();
            ids.push(post.id);
        }
        ids.reverse();

        let all: Vec<Uuid> = store
            .list_posts_by_users(&users, 10, 0)
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(all, ids);

        let page: Vec<Uuid> = store
            .list_posts_by_users(&users, 1, 1)
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(page, vec![ids[1]]);
        assert!(store.list_posts_by_users(&users, 10, 3).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_post_delete_cascades_to_dependents() {
        let (store, post) = store_with_post().await;
        let user = Uuid::new_v4();
        store
            .create_comment(&Comment::new(user, post.id, "nice".into(), None))
            .await
            .unwrap();
        store.create_like(&Like::new(user, post.id)).await.unwrap();
        store
            .create_notification(&Notification::new_post(post.user_id, user, post.id, "hi".into()))
            .await
            .unwrap();

        assert_eq!(store.list_notification_recipients(post.id).await.unwrap(), vec![user]);
        assert!(store.delete_post(post.id).await.unwrap());
        assert!(store.list_notification_recipients(post.id).await.unwrap().is_empty());
        assert!(store.list_comments_by_post(post.id).await.unwrap().is_empty());
        assert_eq!(store.get_like(user, post.id).await.unwrap(), None);
        assert!(store.list_notifications(user).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_like_soft_delete() {
        let (store, post) = store_with_post().await;
        let user = Uuid::new_v4();
        store.create_like(&Like::new(user, post.id)).await.unwrap();
        assert_eq!(store.count_likes(post.id).await.unwrap(), 1);

        store
            .set_like_deleted(user, post.id, Some(crate::models::now()))
            .await
            .unwrap();
        let like = store.get_like(user, post.id).await.unwrap().unwrap();
        assert!(!like.is_active());
        assert_eq!(store.count_likes(post.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_file_database_survives_reconnect() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite:{}", dir.path().join("nested/store.db").display());

        let post_id = {
            let store = SqliteStore::connect(&url, 2).await.unwrap();
            let post = Post::new(Uuid::new_v4(), CreatePostRequest { caption: "kept".into(), ..Default::default() });
            store.create_post(&post).await.unwrap();
            post.id
        };

        let reopened = SqliteStore::connect(&url, 2).await.unwrap();
        assert_eq!(reopened.get_post(post_id).await.unwrap().unwrap().caption, "kept");
    }
}
