use serde::{Deserialize, Deserializer, Serialize};

use crate::constants::constants;

/// Long-form vs short-form classification, derived from the duration threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
  LongForm,
  ShortForm,
}

impl Category {
  pub const ALL: [Category; 2] = [Category::LongForm, Category::ShortForm];

  pub fn from_duration(secs: u64) -> Self {
    if secs <= constants().short_form_max_secs { Category::ShortForm } else { Category::LongForm }
  }

  /// Value of the backend's `type` query parameter.
  pub fn api_type(self) -> &'static str {
    match self {
      Category::LongForm => "video",
      Category::ShortForm => "short",
    }
  }

  pub fn label(self) -> &'static str {
    match self {
      Category::LongForm => "Videos",
      Category::ShortForm => "Shorts",
    }
  }

  /// Category tag attached to blog posts generated from a video of this category.
  pub fn post_tag(self) -> &'static str {
    match self {
      Category::LongForm => "YouTube",
      Category::ShortForm => "Shorts",
    }
  }

  pub fn index(self) -> usize {
    match self {
      Category::LongForm => 0,
      Category::ShortForm => 1,
    }
  }
}

impl std::fmt::Display for Category {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.api_type())
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(from = "Option<String>")]
pub enum TranscriptStatus {
  #[default]
  None,
  Processing,
  Completed,
  Failed,
}

impl From<Option<String>> for TranscriptStatus {
  fn from(raw: Option<String>) -> Self {
    match raw.as_deref() {
      Some("processing") => TranscriptStatus::Processing,
      Some("completed") => TranscriptStatus::Completed,
      Some("failed") => TranscriptStatus::Failed,
      _ => TranscriptStatus::None,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(from = "Option<String>")]
pub enum AudioStatus {
  #[default]
  None,
  Processing,
  Completed,
}

impl From<Option<String>> for AudioStatus {
  fn from(raw: Option<String>) -> Self {
    match raw.as_deref() {
      Some("processing") => AudioStatus::Processing,
      Some("completed") => AudioStatus::Completed,
      _ => AudioStatus::None,
    }
  }
}

/// A video as mirrored from the backend.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct VideoRecord {
  pub id: String,
  #[serde(default)]
  pub title: String,
  #[serde(default)]
  pub description: Option<String>,
  #[serde(default)]
  pub thumbnail: Option<String>,
  #[serde(default, deserialize_with = "null_as_default")]
  pub duration: u64,
  #[serde(default)]
  pub published_at: Option<String>,
  #[serde(default)]
  pub transcript: Option<String>,
  #[serde(default)]
  pub transcript_status: TranscriptStatus,
  #[serde(default)]
  pub audio_status: AudioStatus,
  #[serde(default, deserialize_with = "null_as_default")]
  pub blog_created: bool,
}

impl VideoRecord {
  pub fn category(&self) -> Category {
    Category::from_duration(self.duration)
  }

  /// A transcript is usable only once the job finished and produced text.
  pub fn has_transcript(&self) -> bool {
    self.transcript_status == TranscriptStatus::Completed && self.transcript.as_deref().is_some_and(|t| !t.is_empty())
  }

  pub fn is_processing(&self) -> bool {
    self.transcript_status == TranscriptStatus::Processing || self.audio_status == AudioStatus::Processing
  }

  /// Fields the pipeline mutates server-side; compared when reconciling an open detail view.
  pub fn pipeline_state(&self) -> (Option<&str>, TranscriptStatus, AudioStatus, bool) {
    (self.transcript.as_deref(), self.transcript_status, self.audio_status, self.blog_created)
  }
}

/// A video imported from the channel listing, in the shape the backend upsert expects.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportedVideo {
  pub id: String,
  pub title: String,
  pub description: String,
  pub thumbnail: Option<String>,
  pub duration: u64,
  pub view_count: u64,
  pub published_at: String,
  pub channel_id: String,
  #[serde(rename = "type")]
  pub kind: &'static str,
}

impl ImportedVideo {
  pub fn category(&self) -> Category {
    Category::from_duration(self.duration)
  }

  /// A fresh catalog entry for this import; pipeline state starts empty.
  pub fn to_record(&self) -> VideoRecord {
    VideoRecord {
      id: self.id.clone(),
      title: self.title.clone(),
      description: Some(self.description.clone()).filter(|d| !d.is_empty()),
      thumbnail: self.thumbnail.clone(),
      duration: self.duration,
      published_at: Some(self.published_at.clone()).filter(|d| !d.is_empty()),
      transcript: None,
      transcript_status: TranscriptStatus::None,
      audio_status: AudioStatus::None,
      blog_created: false,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "Option<String>")]
pub enum PostStatus {
  #[default]
  Draft,
  Published,
  Scheduled,
}

impl From<Option<String>> for PostStatus {
  fn from(raw: Option<String>) -> Self {
    match raw.as_deref() {
      Some("published") => PostStatus::Published,
      Some("scheduled") => PostStatus::Scheduled,
      _ => PostStatus::Draft,
    }
  }
}

impl PostStatus {
  pub fn label(self) -> &'static str {
    match self {
      PostStatus::Draft => "draft",
      PostStatus::Published => "published",
      PostStatus::Scheduled => "scheduled",
    }
  }
}

/// A blog post as listed by the backend.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Post {
  #[serde(deserialize_with = "id_as_string")]
  pub id: String,
  #[serde(default)]
  pub title: String,
  #[serde(default)]
  pub content: String,
  #[serde(default)]
  pub excerpt: Option<String>,
  #[serde(default, deserialize_with = "null_as_default")]
  pub category: String,
  #[serde(default)]
  pub thumbnail: Option<String>,
  #[serde(default)]
  pub status: PostStatus,
  #[serde(default)]
  pub date: Option<String>,
  #[serde(default, alias = "videoId")]
  pub video_id: Option<String>,
}

/// Body of `POST /api/posts`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPost {
  pub title: String,
  pub content: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub excerpt: Option<String>,
  pub category: &'static str,
  pub thumbnail: Option<String>,
  pub status: PostStatus,
  pub video_id: String,
}

/// Body of `PUT /api/posts/{id}`: the editable fields, sent whole.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostUpdate {
  pub title: String,
  pub category: String,
  pub excerpt: String,
  pub content: String,
  pub thumbnail: String,
}

/// Server-side settings document.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ServerSettings {
  #[serde(default, deserialize_with = "null_as_default")]
  pub autopilot: bool,
  #[serde(default)]
  pub transcription_provider: Option<String>,
}

/// Partial update for `PUT /api/settings`; absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SettingsPatch {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub autopilot: Option<bool>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub transcription_provider: Option<String>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
  D: Deserializer<'de>,
  T: Default + Deserialize<'de>,
{
  Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Post ids come back as numbers from some backends and strings from others.
fn id_as_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
  D: Deserializer<'de>,
{
  match serde_json::Value::deserialize(deserializer)? {
    serde_json::Value::String(s) => Ok(s),
    serde_json::Value::Number(n) => Ok(n.to_string()),
    other => Err(serde::de::Error::custom(format!("unexpected post id: {}", other))),
  }
}
