use anyhow::Result;
use tracing::{info, warn};

use crate::backend::Backend;
use crate::model::{Category, VideoRecord};

/// Both categories as returned by one refresh.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
  pub long_form: Vec<VideoRecord>,
  pub short_form: Vec<VideoRecord>,
}

/// Toolbar counts for one category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CatalogStats {
  pub total: usize,
  pub transcribed: usize,
  pub blogged: usize,
}

/// In-memory mirror of the backend's video records.
#[derive(Debug, Default)]
pub struct VideoCatalog {
  long_form: Vec<VideoRecord>,
  short_form: Vec<VideoRecord>,
  loaded: bool,
}

/// Fetch both categories; fails as a whole if either listing fails.
pub async fn fetch_snapshot(backend: &dyn Backend) -> Result<Snapshot> {
  let (long_form, short_form) =
    futures::try_join!(backend.list_videos(Category::LongForm), backend.list_videos(Category::ShortForm))?;
  Ok(Snapshot { long_form, short_form })
}

impl VideoCatalog {
  pub fn videos(&self, category: Category) -> &[VideoRecord] {
    match category {
      Category::LongForm => &self.long_form,
      Category::ShortForm => &self.short_form,
    }
  }

  fn videos_mut(&mut self, category: Category) -> &mut Vec<VideoRecord> {
    match category {
      Category::LongForm => &mut self.long_form,
      Category::ShortForm => &mut self.short_form,
    }
  }

  /// Whether at least one refresh has landed.
  pub fn is_loaded(&self) -> bool {
    self.loaded
  }

  /// Replace the mirror with a refresh result. On failure the previous
  /// snapshot stays in place. Returns whether the mirror changed hands.
  pub fn apply_refresh(&mut self, result: Result<Snapshot>) -> bool {
    match result {
      Ok(snapshot) => {
        info!(long_form = snapshot.long_form.len(), short_form = snapshot.short_form.len(), "catalog: refreshed");
        self.long_form = snapshot.long_form;
        self.short_form = snapshot.short_form;
        self.loaded = true;
        true
      }
      Err(e) => {
        warn!(err = %format!("{:#}", e), "catalog: refresh failed, keeping previous snapshot");
        false
      }
    }
  }

  /// Merge a page of records. New ids are appended; known ids take the
  /// fresh metadata but keep their pipeline state.
  pub fn append(&mut self, category: Category, records: Vec<VideoRecord>) -> usize {
    let videos = self.videos_mut(category);
    let mut added = 0;
    for record in records {
      if let Some(existing) = videos.iter_mut().find(|v| v.id == record.id) {
        existing.title = record.title;
        existing.description = record.description;
        existing.thumbnail = record.thumbnail;
        existing.duration = record.duration;
        existing.published_at = record.published_at;
      } else {
        videos.push(record);
        added += 1;
      }
    }
    added
  }

  pub fn find(&self, id: &str) -> Option<&VideoRecord> {
    self.long_form.iter().chain(self.short_form.iter()).find(|v| v.id == id)
  }

  pub fn any_processing(&self) -> bool {
    self.long_form.iter().chain(self.short_form.iter()).any(VideoRecord::is_processing)
  }

  pub fn stats(&self, category: Category) -> CatalogStats {
    let videos = self.videos(category);
    CatalogStats {
      total: videos.len(),
      transcribed: videos.iter().filter(|v| v.has_transcript()).count(),
      blogged: videos.iter().filter(|v| v.blog_created).count(),
    }
  }

  pub fn mark_blog_created(&mut self, id: &str) {
    for v in self.long_form.iter_mut().chain(self.short_form.iter_mut()).filter(|v| v.id == id) {
      v.blog_created = true;
    }
  }

  pub fn clear(&mut self) {
    self.long_form.clear();
    self.short_form.clear();
    self.loaded = false;
  }
}
