//! Text generation for blog drafts.
//!
//! `TextGenerator` is a single-shot completion call (no streaming).
//! `parse_generated_post` splits the raw completion into title, meta and body.

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::constants::constants;
use crate::model::{NewPost, PostStatus, VideoRecord};

#[async_trait]
pub trait TextGenerator: Send + Sync {
  async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String>;
}

/// OpenAI-compatible chat completion client.
pub struct OpenAiClient {
  client: Client,
  base_url: String,
  api_key: String,
  model: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
  #[serde(default)]
  choices: Vec<Choice>,
  error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct Choice {
  message: Message,
}

#[derive(Debug, Deserialize)]
struct Message {
  #[serde(default)]
  content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
  message: String,
}

impl OpenAiClient {
  pub fn new(client: Client, api_key: &str) -> Self {
    Self::with_base_url(client, &constants().completion_api_url, api_key)
  }

  pub fn with_base_url(client: Client, base_url: &str, api_key: &str) -> Self {
    Self {
      client,
      base_url: base_url.trim_end_matches('/').to_string(),
      api_key: api_key.to_string(),
      model: constants().completion_model.clone(),
    }
  }
}

#[async_trait]
impl TextGenerator for OpenAiClient {
  async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
    let c = constants();
    let body = serde_json::json!({
      "model": self.model,
      "messages": [
        { "role": "system", "content": system_prompt },
        { "role": "user", "content": user_prompt }
      ],
      "temperature": c.completion_temperature,
      "max_tokens": c.completion_max_tokens
    });

    debug!(model = %self.model, prompt_chars = user_prompt.len(), "completion: request");
    let response = self
      .client
      .post(format!("{}/chat/completions", self.base_url))
      .bearer_auth(&self.api_key)
      .json(&body)
      .send()
      .await
      .context("Completion request failed")?;

    let status = response.status();
    let text = response.text().await.context("Failed to read completion response")?;
    let parsed: ChatResponse = serde_json::from_str(&text).with_context(|| {
      format!("Completion response ({}) is not valid JSON: {}", status, text.chars().take(200).collect::<String>())
    })?;
    if let Some(error) = parsed.error {
      return Err(anyhow!("Completion API error: {}", error.message));
    }
    if !status.is_success() {
      return Err(anyhow!("Completion API returned {}", status));
    }
    parsed
      .choices
      .into_iter()
      .next()
      .and_then(|choice| choice.message.content)
      .filter(|content| !content.trim().is_empty())
      .ok_or_else(|| anyhow!("Completion response has no content"))
  }
}

// --- Prompt & response parsing ---

/// Labels that introduce the title line. The localized label is what the channel's prompts use.
const TITLE_LABELS: [&str; 2] = ["TITLE:", "BAŞLIK:"];
const META_LABEL: &str = "META:";
const SECTION_DELIMITER: &str = "---";

/// A completion split into its parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedPost {
  pub title: String,
  pub meta: Option<String>,
  pub body: String,
}

impl GeneratedPost {
  /// Post resource tied to `video`, category derived from its duration.
  pub fn into_post(self, video: &VideoRecord, status: PostStatus) -> NewPost {
    NewPost {
      title: self.title,
      content: self.body,
      excerpt: self.meta,
      category: video.category().post_tag(),
      thumbnail: video.thumbnail.clone(),
      status,
      video_id: video.id.clone(),
    }
  }
}

/// User message for a video: its title followed by the transcript.
pub fn user_prompt(title: &str, transcript: &str) -> String {
  format!("Video: {}\n\nTranscript:\n{}", title, transcript)
}

fn labelled<'a>(line: &'a str, label: &str) -> Option<&'a str> {
  line.trim_start().strip_prefix(label).map(str::trim)
}

fn title_of(line: &str) -> Option<&str> {
  TITLE_LABELS.iter().find_map(|label| labelled(line, label))
}

/// Split a raw completion into title, optional meta description and body.
///
/// The body is everything after the last `---` line. Without a delimiter the
/// title and meta lines are stripped and the rest is the body. An absent or
/// empty title falls back to `default_title`.
pub fn parse_generated_post(raw: &str, default_title: &str) -> GeneratedPost {
  let lines: Vec<&str> = raw.lines().collect();

  let title = lines
    .iter()
    .find_map(|line| title_of(line))
    .filter(|t| !t.is_empty())
    .unwrap_or(default_title)
    .to_string();
  let meta = lines.iter().find_map(|line| labelled(line, META_LABEL)).filter(|m| !m.is_empty()).map(str::to_string);

  let body = match lines.iter().rposition(|line| line.trim() == SECTION_DELIMITER) {
    Some(idx) => lines[idx + 1..].join("\n"),
    None => lines
      .iter()
      .filter(|line| title_of(line).is_none() && labelled(line, META_LABEL).is_none())
      .copied()
      .collect::<Vec<_>>()
      .join("\n"),
  };

  GeneratedPost { title, meta, body: body.trim().to_string() }
}

/// Ask the generator for a post about `video` and parse the answer.
pub async fn generate_post(
  generator: &dyn TextGenerator,
  system_prompt: &str,
  video: &VideoRecord,
) -> Result<GeneratedPost> {
  let transcript = video.transcript.as_deref().unwrap_or_default();
  let raw = generator.complete(system_prompt, &user_prompt(&video.title, transcript)).await?;
  Ok(parse_generated_post(&raw, &video.title))
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::testing::video;

  #[test]
  fn title_and_body_split_on_delimiter() {
    let post = parse_generated_post("TITLE: Foo\n---\nBody text", "Default");
    assert_eq!(post.title, "Foo");
    assert_eq!(post.body, "Body text");
    assert_eq!(post.meta, None);
  }

  #[test]
  fn no_delimiter_no_title_falls_back() {
    let raw = "Just some generated text.\nSecond line.";
    let post = parse_generated_post(raw, "Video title");
    assert_eq!(post.title, "Video title");
    assert_eq!(post.body, raw);
  }

  #[test]
  fn meta_line_is_extracted() {
    let post = parse_generated_post("TITLE: Foo\nMETA: Short summary\n---\n## Intro\nText", "D");
    assert_eq!(post.meta.as_deref(), Some("Short summary"));
    assert_eq!(post.body, "## Intro\nText");
  }

  #[test]
  fn body_follows_last_delimiter() {
    let post = parse_generated_post("TITLE: Foo\n---\nPreamble\n---\nFinal body", "D");
    assert_eq!(post.body, "Final body");
  }

  #[test]
  fn labelled_lines_stripped_without_delimiter() {
    let post = parse_generated_post("BAŞLIK: Merhaba\nMETA: Özet\nİçerik burada", "D");
    assert_eq!(post.title, "Merhaba");
    assert_eq!(post.meta.as_deref(), Some("Özet"));
    assert_eq!(post.body, "İçerik burada");
  }

  #[test]
  fn empty_title_uses_default() {
    let post = parse_generated_post("TITLE:   \n---\nBody", "Default");
    assert_eq!(post.title, "Default");
  }

  #[test]
  fn into_post_derives_category_from_duration() {
    let short = video("s", |v| v.duration = 45);
    let generated = GeneratedPost { title: "T".into(), meta: Some("M".into()), body: "B".into() };
    let post = generated.clone().into_post(&short, PostStatus::Draft);
    assert_eq!(post.category, "Shorts");
    assert_eq!(post.excerpt.as_deref(), Some("M"));
    assert_eq!(post.video_id, "s");

    let long = video("l", |v| v.duration = 600);
    assert_eq!(generated.into_post(&long, PostStatus::Published).category, "YouTube");
  }

  #[tokio::test]
  async fn openai_client_returns_first_choice() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
      .mock("POST", "/chat/completions")
      .match_header("authorization", "Bearer sk")
      .match_body(mockito::Matcher::PartialJson(serde_json::json!({ "model": "gpt-4o-mini" })))
      .with_status(200)
      .with_body(r#"{"choices":[{"message":{"content":"TITLE: X\n---\nY"}}]}"#)
      .create_async()
      .await;

    let client = OpenAiClient::with_base_url(Client::new(), &server.url(), "sk");
    let raw = client.complete("system", "user").await.unwrap();
    assert_eq!(raw, "TITLE: X\n---\nY");
    mock.assert_async().await;
  }

  #[tokio::test]
  async fn openai_error_object_is_a_failure() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
      .mock("POST", "/chat/completions")
      .with_status(429)
      .with_body(r#"{"error":{"message":"Rate limit reached"}}"#)
      .create_async()
      .await;

    let client = OpenAiClient::with_base_url(Client::new(), &server.url(), "sk");
    let err = client.complete("system", "user").await.unwrap_err();
    assert!(err.to_string().contains("Rate limit reached"));
  }
}
