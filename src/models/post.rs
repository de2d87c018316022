use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: Uuid,
    pub user_id: Uuid,
    pub image_urls: Vec<String>,
    pub caption: String,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Post {
    pub fn new(user_id: Uuid, request: CreatePostRequest) -> Self {
        let now = super::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            image_urls: request.image_urls,
            caption: request.caption,
            tags: request.tags,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply a partial update. Blank captions and absent lists leave the field alone.
    pub fn apply(&mut self, request: UpdatePostRequest) {
        if let Some(caption) = request.caption.filter(|c| !c.trim().is_empty()) {
            self.caption = caption;
        }
        if let Some(tags) = request.tags {
            self.tags = tags;
        }
        if let Some(image_urls) = request.image_urls {
            self.image_urls = image_urls;
        }
        self.updated_at = super::now();
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreatePostRequest {
    pub caption: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub image_urls: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdatePostRequest {
    pub caption: Option<String>,
    pub tags: Option<Vec<String>>,
    pub image_urls: Option<Vec<String>>,
}
