// HTTP surface - routing, parameter binding and caller identity

use axum::{
    extract::{FromRequestParts, Path as AxumPath, Query, State},
    http::{request::Parts, StatusCode},
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{parse_id, Comment, CommentRequest, CreatePostRequest, Like, Notification, Post, UpdatePostRequest};
use crate::services::InteractionService;

/// Header carrying the caller id, set by the gateway after authentication.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Authenticated caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewer(pub Uuid);

impl<S> FromRequestParts<S> for Viewer
where
    S: Send + Sync,
{
    type Rejection = AppError;

    fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> impl std::future::Future<Output = Result<Self, Self::Rejection>> + Send {
        let viewer = match parts.headers.get(USER_ID_HEADER) {
            None => Err(AppError::Unauthenticated(format!("missing {} header", USER_ID_HEADER))),
            Some(raw) => raw
                .to_str()
                .map_err(|_| AppError::InvalidInput(format!("failed parsing {}", USER_ID_HEADER)))
                .and_then(|raw| parse_id(raw, USER_ID_HEADER))
                .map(Viewer),
        };

        async move { viewer }
    }
}

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

const DEFAULT_PAGE_LIMIT: u32 = 10;
const MAX_PAGE_LIMIT: u32 = 100;

// HTTP Handlers

pub async fn health_handler(State(service): State<InteractionService>) -> impl IntoResponse {
    let report = service.health().await;
    let status = if report.is_healthy() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(report))
}

pub async fn create_post_handler(
    State(service): State<InteractionService>,
    Viewer(caller): Viewer,
    Json(req): Json<CreatePostRequest>,
) -> AppResult<(StatusCode, Json<Post>)> {
    let post = service.create_post(caller, req).await?;
    Ok((StatusCode::CREATED, Json(post)))
}

pub async fn list_feed_handler(State(service): State<InteractionService>) -> AppResult<Json<Vec<Post>>> {
    Ok(Json(service.list_feed().await?))
}

pub async fn get_post_handler(
    State(service): State<InteractionService>,
    AxumPath(post_id): AxumPath<String>,
) -> AppResult<Json<Post>> {
    let post_id = parse_id(&post_id, "post_id")?;
    Ok(Json(service.get_post(post_id).await?))
}

pub async fn update_post_handler(
    State(service): State<InteractionService>,
    Viewer(caller): Viewer,
    AxumPath(post_id): AxumPath<String>,
    Json(req): Json<UpdatePostRequest>,
) -> AppResult<Json<Post>> {
    let post_id = parse_id(&post_id, "post_id")?;
    Ok(Json(service.update_post(caller, post_id, req).await?))
}

pub async fn delete_post_handler(
    State(service): State<InteractionService>,
    Viewer(caller): Viewer,
    AxumPath(post_id): AxumPath<String>,
) -> AppResult<Json<Value>> {
    let post_id = parse_id(&post_id, "post_id")?;
    service.delete_post(caller, post_id).await?;
    Ok(Json(json!({"id": post_id, "deleted": true})))
}

pub async fn list_my_posts_handler(
    State(service): State<InteractionService>,
    Viewer(caller): Viewer,
) -> AppResult<Json<Vec<Post>>> {
    Ok(Json(service.list_my_posts(caller).await?))
}

pub async fn list_following_posts_handler(
    State(service): State<InteractionService>,
    AxumPath(user_id): AxumPath<String>,
    Query(page): Query<PageQuery>,
) -> AppResult<Json<Vec<Post>>> {
    let user_id = parse_id(&user_id, "user_id")?;
    let limit = page.limit.unwrap_or(DEFAULT_PAGE_LIMIT).clamp(1, MAX_PAGE_LIMIT);
    let offset = page.offset.unwrap_or(0);
    Ok(Json(service.list_following_posts(user_id, limit, offset).await?))
}

pub async fn like_post_handler(
    State(service): State<InteractionService>,
    Viewer(caller): Viewer,
    AxumPath(post_id): AxumPath<String>,
) -> AppResult<Json<Like>> {
    let post_id = parse_id(&post_id, "post_id")?;
    Ok(Json(service.like_post(caller, post_id).await?))
}

pub async fn count_likes_handler(
    State(service): State<InteractionService>,
    AxumPath(post_id): AxumPath<String>,
) -> AppResult<Json<Value>> {
    let post_id = parse_id(&post_id, "post_id")?;
    let likes = service.count_likes(post_id).await?;
    Ok(Json(json!({"post_id": post_id, "likes": likes})))
}

pub async fn dislike_post_handler(
    State(service): State<InteractionService>,
    Viewer(caller): Viewer,
    AxumPath(post_id): AxumPath<String>,
) -> AppResult<Json<Like>> {
    let post_id = parse_id(&post_id, "post_id")?;
    Ok(Json(service.dislike_post(caller, post_id).await?))
}

pub async fn list_comments_handler(
    State(service): State<InteractionService>,
    AxumPath(post_id): AxumPath<String>,
) -> AppResult<Json<Vec<Comment>>> {
    let post_id = parse_id(&post_id, "post_id")?;
    Ok(Json(service.list_comments(post_id).await?))
}

pub async fn create_comment_handler(
    State(service): State<InteractionService>,
    Viewer(caller): Viewer,
    AxumPath(post_id): AxumPath<String>,
    Json(req): Json<CommentRequest>,
) -> AppResult<(StatusCode, Json<Comment>)> {
    let post_id = parse_id(&post_id, "post_id")?;
    let comment = service.create_comment(caller, post_id, &req.msg).await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

pub async fn reply_comment_handler(
    State(service): State<InteractionService>,
    Viewer(caller): Viewer,
    AxumPath((post_id, comment_id)): AxumPath<(String, String)>,
    Json(req): Json<CommentRequest>,
) -> AppResult<(StatusCode, Json<Comment>)> {
    let post_id = parse_id(&post_id, "post_id")?;
    let comment_id = parse_id(&comment_id, "comment_id")?;
    let reply = service.reply_comment(caller, post_id, comment_id, &req.msg).await?;
    Ok((StatusCode::CREATED, Json(reply)))
}

pub async fn update_comment_handler(
    State(service): State<InteractionService>,
    Viewer(caller): Viewer,
    AxumPath(comment_id): AxumPath<String>,
    Json(req): Json<CommentRequest>,
) -> AppResult<Json<Comment>> {
    let comment_id = parse_id(&comment_id, "comment_id")?;
    Ok(Json(service.update_comment(caller, comment_id, &req.msg).await?))
}

pub async fn delete_comment_handler(
    State(service): State<InteractionService>,
    Viewer(caller): Viewer,
    AxumPath(comment_id): AxumPath<String>,
) -> AppResult<Json<Value>> {
    let comment_id = parse_id(&comment_id, "comment_id")?;
    let removed = service.delete_comment(caller, comment_id).await?;
    Ok(Json(json!({"id": comment_id, "deleted": removed})))
}

pub async fn list_notifications_handler(
    State(service): State<InteractionService>,
    Viewer(caller): Viewer,
) -> AppResult<Json<Vec<Notification>>> {
    Ok(Json(service.list_notifications(caller).await?))
}

pub fn create_router(service: InteractionService) -> Router {
    Router::new()
        .route("/health", get(health_handler))

        // Posts
        .route("/posts", get(list_feed_handler).post(create_post_handler))
        .route(
            "/posts/{post_id}",
            get(get_post_handler).put(update_post_handler).delete(delete_post_handler),
        )
        .route("/users/me/posts", get(list_my_posts_handler))
        .route("/users/{user_id}/following-posts", get(list_following_posts_handler))

        // Likes
        .route("/posts/{post_id}/likes", get(count_likes_handler).post(like_post_handler))
        .route("/posts/{post_id}/dislikes", post(dislike_post_handler))

        // Comments
        .route(
            "/posts/{post_id}/comments",
            get(list_comments_handler).post(create_comment_handler),
        )
        .route("/posts/{post_id}/comments/{comment_id}/replies", post(reply_comment_handler))
        .route(
            "/comments/{comment_id}",
            put(update_comment_handler).delete(delete_comment_handler),
        )

        // Notifications
        .route("/notifications", get(list_notifications_handler))

        .with_state(service)
}
