use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A comment on a post. `reply_to` points at the parent comment of the same
/// post; `None` marks a top-level comment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: Uuid,
    pub user_id: Uuid,
    pub post_id: Uuid,
    pub reply_to: Option<Uuid>,
    pub msg: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Comment {
    pub fn new(user_id: Uuid, post_id: Uuid, msg: String, reply_to: Option<Uuid>) -> Self {
        let now = super::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            post_id,
            reply_to,
            msg,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_reply(&self) -> bool {
        self.reply_to.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentRequest {
    pub msg: String,
}
