use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationType {
    NewPost,
}

impl NotificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationType::NewPost => "NEW_POST",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "NEW_POST" => Some(NotificationType::NewPost),
            _ => None,
        }
    }
}

/// One inbox entry. Written once by fan-out, read only by its recipient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub source_user_id: Uuid,
    pub recipient_id: Uuid,
    pub post_id: Uuid,
    pub notification_type: NotificationType,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new_post(source_user_id: Uuid, recipient_id: Uuid, post_id: Uuid, content: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            source_user_id,
            recipient_id,
            post_id,
            notification_type: NotificationType::NewPost,
            content,
            created_at: super::now(),
        }
    }
}
