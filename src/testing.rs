//! In-memory fakes for the network seams, shared by unit tests.

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::backend::Backend;
use crate::completion::TextGenerator;
use crate::config::Credential;
use crate::model::{
  AudioStatus, Category, ImportedVideo, NewPost, Post, PostUpdate, ServerSettings, SettingsPatch, TranscriptStatus,
  VideoRecord,
};
use crate::youtube::{VideoPage, VideoSource};

/// A long-form video with no pipeline state, adjusted by `edit`.
pub fn video(id: &str, edit: impl FnOnce(&mut VideoRecord)) -> VideoRecord {
  let mut v = VideoRecord {
    id: id.to_string(),
    title: format!("Video {}", id),
    description: None,
    thumbnail: Some(format!("https://img/{}.jpg", id)),
    duration: 600,
    published_at: None,
    transcript: None,
    transcript_status: TranscriptStatus::None,
    audio_status: AudioStatus::None,
    blog_created: false,
  };
  edit(&mut v);
  v
}

pub fn transcribed(v: &mut VideoRecord) {
  v.transcript = Some(format!("transcript of {}", v.id));
  v.transcript_status = TranscriptStatus::Completed;
}

pub fn imported(id: &str, duration: u64) -> ImportedVideo {
  ImportedVideo {
    id: id.to_string(),
    title: format!("Imported {}", id),
    description: String::new(),
    thumbnail: None,
    duration,
    view_count: 0,
    published_at: String::new(),
    channel_id: "UC1".to_string(),
    kind: Category::from_duration(duration).api_type(),
  }
}

#[derive(Default)]
pub struct FakeBackend {
  pub videos: Mutex<HashMap<Category, Vec<VideoRecord>>>,
  pub fail_listing: Mutex<HashSet<Category>>,
  pub fail_transcribe: HashSet<String>,
  pub fail_post_for: HashSet<String>,
  pub transcribed: Mutex<Vec<String>>,
  pub posts_created: Mutex<Vec<NewPost>>,
  pub upserts: Mutex<Vec<Vec<ImportedVideo>>>,
  pub posts: Mutex<Vec<Post>>,
  pub post_updates: Mutex<Vec<(String, PostUpdate)>>,
  pub settings: Mutex<ServerSettings>,
  pub settings_updates: Mutex<Vec<SettingsPatch>>,
  pub list_calls: AtomicUsize,
}

impl FakeBackend {
  pub fn with_videos(long_form: Vec<VideoRecord>, short_form: Vec<VideoRecord>) -> Self {
    let backend = Self::default();
    {
      let mut videos = backend.videos.lock().unwrap();
      videos.insert(Category::LongForm, long_form);
      videos.insert(Category::ShortForm, short_form);
    }
    backend
  }
}

#[async_trait]
impl Backend for FakeBackend {
  async fn list_videos(&self, category: Category) -> Result<Vec<VideoRecord>> {
    self.list_calls.fetch_add(1, Ordering::SeqCst);
    if self.fail_listing.lock().unwrap().contains(&category) {
      return Err(anyhow!("listing {} failed", category));
    }
    Ok(self.videos.lock().unwrap().get(&category).cloned().unwrap_or_default())
  }

  async fn upsert_videos(&self, videos: &[ImportedVideo]) -> Result<()> {
    self.upserts.lock().unwrap().push(videos.to_vec());
    Ok(())
  }

  async fn transcribe(&self, video_id: &str, _credential: &Credential) -> Result<()> {
    if self.fail_transcribe.contains(video_id) {
      return Err(anyhow!("transcribe {} failed", video_id));
    }
    self.transcribed.lock().unwrap().push(video_id.to_string());
    Ok(())
  }

  async fn create_post(&self, post: &NewPost) -> Result<()> {
    if self.fail_post_for.contains(&post.video_id) {
      return Err(anyhow!("post for {} rejected", post.video_id));
    }
    self.posts_created.lock().unwrap().push(post.clone());
    Ok(())
  }

  async fn list_posts(&self) -> Result<Vec<Post>> {
    Ok(self.posts.lock().unwrap().clone())
  }

  async fn publish_post(&self, _id: &str) -> Result<()> {
    Ok(())
  }

  async fn unpublish_post(&self, _id: &str) -> Result<()> {
    Ok(())
  }

  async fn delete_post(&self, id: &str) -> Result<()> {
    self.posts.lock().unwrap().retain(|p| p.id != id);
    Ok(())
  }

  async fn update_post(&self, id: &str, update: &PostUpdate) -> Result<()> {
    if let Some(post) = self.posts.lock().unwrap().iter_mut().find(|p| p.id == id) {
      post.title = update.title.clone();
      post.category = update.category.clone();
    }
    self.post_updates.lock().unwrap().push((id.to_string(), update.clone()));
    Ok(())
  }

  async fn settings(&self) -> Result<ServerSettings> {
    Ok(self.settings.lock().unwrap().clone())
  }

  async fn update_settings(&self, patch: &SettingsPatch) -> Result<()> {
    self.settings_updates.lock().unwrap().push(patch.clone());
    Ok(())
  }
}

/// Serves queued pages in order; an `Err` entry fails that fetch.
#[derive(Default)]
pub struct FakeSource {
  pub pages: Mutex<VecDeque<Result<VideoPage, String>>>,
  pub tokens_seen: Mutex<Vec<Option<String>>>,
  pub channel_id: String,
}

impl FakeSource {
  pub fn with_pages(pages: Vec<Result<VideoPage, String>>) -> Self {
    Self { pages: Mutex::new(pages.into()), channel_id: "UC1".to_string(), ..Self::default() }
  }
}

#[async_trait]
impl VideoSource for FakeSource {
  async fn resolve_channel_id(&self, handle: &str) -> Result<String> {
    if self.channel_id.is_empty() {
      return Err(anyhow!("no channel for {}", handle));
    }
    Ok(self.channel_id.clone())
  }

  async fn fetch_page(&self, _channel_id: &str, page_token: Option<&str>) -> Result<VideoPage> {
    self.tokens_seen.lock().unwrap().push(page_token.map(str::to_string));
    match self.pages.lock().unwrap().pop_front() {
      Some(Ok(page)) => Ok(page),
      Some(Err(msg)) => Err(anyhow!(msg)),
      None => Ok(VideoPage::default()),
    }
  }
}

/// Answers with a fixed post, failing for transcripts that mention a poisoned id.
#[derive(Default)]
pub struct FakeGenerator {
  pub fail_for: HashSet<String>,
  pub prompts: Mutex<Vec<String>>,
}

#[async_trait]
impl TextGenerator for FakeGenerator {
  async fn complete(&self, _system_prompt: &str, user_prompt: &str) -> Result<String> {
    self.prompts.lock().unwrap().push(user_prompt.to_string());
    if self.fail_for.iter().any(|id| user_prompt.contains(&format!("transcript of {}", id))) {
      return Err(anyhow!("generation failed"));
    }
    Ok("TITLE: Generated\n---\nGenerated body".to_string())
  }
}
