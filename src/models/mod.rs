// Domain entities - rows of the primary store and cached JSON values

pub mod comment;
pub mod like;
pub mod notification;
pub mod post;

pub use comment::{Comment, CommentRequest};
pub use like::Like;
pub use notification::{Notification, NotificationType};
pub use post::{CreatePostRequest, Post, UpdatePostRequest};

use crate::error::{AppError, AppResult};
use chrono::{DateTime, SubsecRound, Utc};
use uuid::Uuid;

/// Current time at the microsecond precision the store keeps, so a freshly
/// built row compares equal to the same row read back.
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Parse an externally supplied identifier, naming the field in the error.
pub fn parse_id(raw: &str, field: &str) -> AppResult<Uuid> {
    Uuid::parse_str(raw.trim())
        .map_err(|_| AppError::InvalidInput(format!("failed parsing {}: {:?}", field, raw)))
}

/// Reject blank required text fields.
pub fn require_text(value: &str, field: &str) -> AppResult<()> {
    if value.trim().is_empty() {
        return Err(AppError::InvalidInput(format!("{} must not be empty", field)));
    }
    Ok(())
}
