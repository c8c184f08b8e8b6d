//! REST client for the blog backend.
//!
//! The `Backend` trait is the seam the coordinator talks to; `BackendClient`
//! is the reqwest implementation.

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::Deserialize;
use tracing::debug;

use crate::config::Credential;
use crate::constants::constants;
use crate::model::{Category, ImportedVideo, NewPost, Post, PostUpdate, ServerSettings, SettingsPatch, VideoRecord};

#[async_trait]
pub trait Backend: Send + Sync {
  async fn list_videos(&self, category: Category) -> Result<Vec<VideoRecord>>;
  async fn upsert_videos(&self, videos: &[ImportedVideo]) -> Result<()>;
  /// Queues a transcription job; completion is observed later by polling.
  async fn transcribe(&self, video_id: &str, credential: &Credential) -> Result<()>;
  async fn create_post(&self, post: &NewPost) -> Result<()>;
  async fn list_posts(&self) -> Result<Vec<Post>>;
  async fn publish_post(&self, id: &str) -> Result<()>;
  async fn unpublish_post(&self, id: &str) -> Result<()>;
  async fn delete_post(&self, id: &str) -> Result<()>;
  async fn update_post(&self, id: &str, update: &PostUpdate) -> Result<()>;
  async fn settings(&self) -> Result<ServerSettings>;
  async fn update_settings(&self, patch: &SettingsPatch) -> Result<()>;
}

pub struct BackendClient {
  client: Client,
  base_url: String,
}

/// `{ success, error }` envelope returned by the job endpoints.
#[derive(Debug, Deserialize)]
struct JobAck {
  #[serde(default = "default_true")]
  success: bool,
  #[serde(default)]
  error: Option<String>,
}

fn default_true() -> bool {
  true
}

impl BackendClient {
  pub fn new(client: Client, base_url: &str) -> Self {
    Self { client, base_url: base_url.trim_end_matches('/').to_string() }
  }

  /// Shared HTTP client with the configured request timeout.
  pub fn http_client() -> Result<Client> {
    Client::builder().timeout(constants().request_timeout()).build().context("Failed to build HTTP client")
  }

  fn url(&self, path: &str) -> String {
    format!("{}{}", self.base_url, path)
  }

  /// Map non-success statuses to errors carrying the response body.
  async fn check(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
      return Ok(response);
    }
    let url = response.url().to_string();
    let body = response.text().await.unwrap_or_default();
    Err(anyhow!("{} returned {}: {}", url, status, body.trim()))
  }
}

#[async_trait]
impl Backend for BackendClient {
  async fn list_videos(&self, category: Category) -> Result<Vec<VideoRecord>> {
    let url = self.url(&format!("/api/youtube/videos?type={}", category.api_type()));
    debug!(url = %url, "backend: list videos");
    let response = self.client.get(&url).send().await.with_context(|| format!("Failed to fetch {}", url))?;
    Self::check(response)
      .await?
      .json::<Vec<VideoRecord>>()
      .await
      .with_context(|| format!("Failed to decode {} videos", category))
  }

  async fn upsert_videos(&self, videos: &[ImportedVideo]) -> Result<()> {
    if videos.is_empty() {
      return Ok(());
    }
    debug!(count = videos.len(), "backend: upsert videos");
    let response = self
      .client
      .post(self.url("/api/youtube/videos"))
      .json(&serde_json::json!({ "videos": videos }))
      .send()
      .await
      .context("Failed to save imported videos")?;
    Self::check(response).await?;
    Ok(())
  }

  async fn transcribe(&self, video_id: &str, credential: &Credential) -> Result<()> {
    debug!(video_id, provider = credential.provider.as_str(), "backend: transcribe");
    let response = self
      .client
      .post(self.url(&format!("/api/youtube/videos/{}/transcribe", video_id)))
      .json(&serde_json::json!({ "apiKey": credential.api_key, "provider": credential.provider.as_str() }))
      .send()
      .await
      .with_context(|| format!("Failed to start transcription for {}", video_id))?;
    let body = Self::check(response).await?.text().await.unwrap_or_default();
    // Older backends answer with an empty body; only an explicit `success: false` is a failure.
    if let Ok(ack) = serde_json::from_str::<JobAck>(&body)
      && !ack.success
    {
      return Err(anyhow!(ack.error.unwrap_or_else(|| "transcription was rejected".to_string())));
    }
    Ok(())
  }

  async fn create_post(&self, post: &NewPost) -> Result<()> {
    debug!(video_id = %post.video_id, status = post.status.label(), "backend: create post");
    let response =
      self.client.post(self.url("/api/posts")).json(post).send().await.context("Failed to save blog post")?;
    Self::check(response).await?;
    Ok(())
  }

  async fn list_posts(&self) -> Result<Vec<Post>> {
    let response = self.client.get(self.url("/api/posts/all")).send().await.context("Failed to fetch posts")?;
    Self::check(response).await?.json::<Vec<Post>>().await.context("Failed to decode posts")
  }

  async fn publish_post(&self, id: &str) -> Result<()> {
    let response = self
      .client
      .put(self.url(&format!("/api/posts/{}/publish", id)))
      .send()
      .await
      .with_context(|| format!("Failed to publish post {}", id))?;
    Self::check(response).await?;
    Ok(())
  }

  async fn unpublish_post(&self, id: &str) -> Result<()> {
    let response = self
      .client
      .put(self.url(&format!("/api/posts/{}/unpublish", id)))
      .send()
      .await
      .with_context(|| format!("Failed to unpublish post {}", id))?;
    Self::check(response).await?;
    Ok(())
  }

  async fn delete_post(&self, id: &str) -> Result<()> {
    let response = self
      .client
      .delete(self.url(&format!("/api/posts/{}", id)))
      .send()
      .await
      .with_context(|| format!("Failed to delete post {}", id))?;
    Self::check(response).await?;
    Ok(())
  }

  async fn update_post(&self, id: &str, update: &PostUpdate) -> Result<()> {
    debug!(id = %id, "backend: update post");
    let response = self
      .client
      .put(self.url(&format!("/api/posts/{}", id)))
      .json(update)
      .send()
      .await
      .with_context(|| format!("Failed to update post {}", id))?;
    Self::check(response).await?;
    Ok(())
  }

  async fn settings(&self) -> Result<ServerSettings> {
    let response = self.client.get(self.url("/api/settings")).send().await.context("Failed to fetch settings")?;
    Self::check(response).await?.json::<ServerSettings>().await.context("Failed to decode settings")
  }

  async fn update_settings(&self, patch: &SettingsPatch) -> Result<()> {
    let response =
      self.client.put(self.url("/api/settings")).json(patch).send().await.context("Failed to save settings")?;
    Self::check(response).await?;
    Ok(())
  }
}
