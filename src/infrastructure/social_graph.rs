// HTTP client for the social graph service (follower / following relations)

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::infrastructure::traits::SocialGraph;

#[derive(Debug, Deserialize)]
struct FollowersResponse {
    #[serde(default)]
    followers: Vec<FollowerEntry>,
}

#[derive(Debug, Deserialize)]
struct FollowerEntry {
    follower_id: String,
}

#[derive(Debug, Deserialize)]
struct FollowingsResponse {
    #[serde(default)]
    followings: Vec<FollowingEntry>,
}

#[derive(Debug, Deserialize)]
struct FollowingEntry {
    following_id: String,
}

/// Talks to `GET {base}/api/v1/relations/{id}/followers|followings`.
/// No retries; every transport or decoding failure is `DependencyUnavailable`.
#[derive(Debug, Clone)]
pub struct HttpSocialGraph {
    client: reqwest::Client,
    base_url: String,
}

impl HttpSocialGraph {
    pub fn new(base_url: &str, timeout: Duration) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .no_proxy()
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build social graph client: {}", e)))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn relation_url(&self, user_id: Uuid, relation: &str) -> String {
        format!("{}/api/v1/relations/{}/{}", self.base_url, user_id, relation)
    }

    async fn fetch<T: serde::de::DeserializeOwned>(&self, url: &str) -> AppResult<T> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| AppError::DependencyUnavailable(format!("Social graph request to {} failed: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::DependencyUnavailable(format!(
                "Social graph returned {} for {}",
                status, url
            )));
        }

        response.json::<T>().await.map_err(|e| {
            AppError::DependencyUnavailable(format!("Malformed social graph response from {}: {}", url, e))
        })
    }
}

#[async_trait]
impl SocialGraph for HttpSocialGraph {
    #[instrument(skip(self))]
    async fn get_followers(&self, user_id: Uuid) -> AppResult<Vec<String>> {
        let body: FollowersResponse = self.fetch(&self.relation_url(user_id, "followers")).await?;
        debug!(user_id = %user_id, count = body.followers.len(), "Fetched followers");
        Ok(body.followers.into_iter().map(|f| f.follower_id).collect())
    }

    #[instrument(skip(self))]
    async fn get_followings(&self, user_id: Uuid) -> AppResult<Vec<String>> {
        let body: FollowingsResponse = self.fetch(&self.relation_url(user_id, "followings")).await?;
        debug!(user_id = %user_id, count = body.followings.len(), "Fetched followings");
        Ok(body.followings.into_iter().map(|f| f.following_id).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// One-shot HTTP server answering the first request with `body`.
    async fn serve_once(status_line: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 4096];
            let _ = socket.read(&mut buf).await;
            let response = format!(
                "{}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                status_line,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;
        });
        format!("http://{}/", addr)
    }

    #[test]
    fn test_relation_url_strips_trailing_slash() {
        let graph = HttpSocialGraph::new("http://graph.local/", Duration::from_secs(1)).unwrap();
        let id = Uuid::nil();
        assert_eq!(
            graph.relation_url(id, "followers"),
            "http://graph.local/api/v1/relations/00000000-0000-0000-0000-000000000000/followers"
        );
    }

    #[tokio::test]
    async fn test_followers_are_decoded() {
        let base = serve_once(
            "HTTP/1.1 200 OK",
            r#"{"followers":[{"follower_id":"a"},{"follower_id":"b"}]}"#,
        )
        .await;
        let graph = HttpSocialGraph::new(&base, Duration::from_secs(2)).unwrap();
        assert_eq!(graph.get_followers(Uuid::new_v4()).await.unwrap(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_followings_are_decoded() {
        let base = serve_once("HTTP/1.1 200 OK", r#"{"followings":[{"following_id":"c"}]}"#).await;
        let graph = HttpSocialGraph::new(&base, Duration::from_secs(2)).unwrap();
        assert_eq!(graph.get_followings(Uuid::new_v4()).await.unwrap(), vec!["c"]);
    }

    #[tokio::test]
    async fn test_error_status_is_dependency_unavailable() {
        let base = serve_once("HTTP/1.1 500 Internal Server Error", "{}").await;
        let graph = HttpSocialGraph::new(&base, Duration::from_secs(2)).unwrap();
        assert!(matches!(
            graph.get_followers(Uuid::new_v4()).await,
            Err(AppError::DependencyUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_unreachable_service_is_dependency_unavailable() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let graph = HttpSocialGraph::new(&format!("http://{}", addr), Duration::from_millis(500)).unwrap();
        assert!(matches!(
            graph.get_followings(Uuid::new_v4()).await,
            Err(AppError::DependencyUnavailable(_))
        ));
    }
}
