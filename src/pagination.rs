use anyhow::Result;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::backend::Backend;
use crate::constants::constants;
use crate::model::{Category, VideoRecord};
use crate::youtube::VideoSource;

/// Continuation token and busy flag for one category's channel listing.
#[derive(Debug, Default)]
pub struct PaginationCursor {
  next_token: Option<String>,
  busy: Arc<AtomicBool>,
}

/// Holds a cursor's busy flag; dropping it releases the flag on every exit
/// path, including errors and a panicking task. A finished fetch hands its
/// guard back so the flag stays set until the new token is stored.
#[derive(Debug)]
pub struct BusyGuard(Arc<AtomicBool>);

impl Drop for BusyGuard {
  fn drop(&mut self) {
    self.0.store(false, Ordering::Release);
  }
}

impl PaginationCursor {
  /// Claim the cursor. `None` while another fetch holds it.
  pub fn try_begin(&self) -> Option<BusyGuard> {
    self.busy.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire).ok()?;
    Some(BusyGuard(Arc::clone(&self.busy)))
  }

  pub fn is_busy(&self) -> bool {
    self.busy.load(Ordering::Acquire)
  }

  pub fn next_token(&self) -> Option<&str> {
    self.next_token.as_deref()
  }

  pub fn set_next_token(&mut self, token: Option<String>) {
    self.next_token = token;
  }

  /// What the next "load more" should do from here.
  pub fn next_mode(&self) -> FetchMode {
    match &self.next_token {
      Some(token) => FetchMode::Continue(token.clone()),
      None => FetchMode::Exhaustive,
    }
  }

  /// Forget the token. An in-flight fetch keeps its guard.
  pub fn reset(&mut self) {
    self.next_token = None;
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchMode {
  /// One page from a stored token.
  Continue(String),
  /// Every page from the start, up to the page cap.
  Exhaustive,
  /// Just the newest page.
  FirstPage,
}

#[derive(Debug, Clone)]
pub struct FetchRequest {
  pub category: Category,
  pub mode: FetchMode,
  /// Empty when the channel still has to be looked up from `channel_handle`.
  pub channel_id: String,
  pub channel_handle: String,
}

/// Progress streamed back while pages arrive.
#[derive(Debug, Clone, PartialEq)]
pub enum PageEvent {
  ChannelResolved(String),
  Page { category: Category, videos: Vec<VideoRecord> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchSummary {
  pub category: Category,
  pub pages: usize,
  /// Records of the requested category saved to the backend.
  pub saved: usize,
  pub next_page_token: Option<String>,
}

impl FetchSummary {
  pub fn message(&self) -> String {
    let tail = if self.next_page_token.is_some() { "more available" } else { "all loaded" };
    format!("{} {} saved from {} page(s) ({})", self.saved, self.category.label().to_lowercase(), self.pages, tail)
  }
}

/// Fetch channel pages for one category, persisting and streaming each page
/// as it arrives. Callers hold the cursor's `BusyGuard` around this.
pub async fn fetch_pages(
  source: &dyn VideoSource,
  backend: &dyn Backend,
  request: FetchRequest,
  events: &mpsc::UnboundedSender<PageEvent>,
) -> Result<FetchSummary> {
  let category = request.category;
  let channel_id = if request.channel_id.is_empty() {
    let id = source.resolve_channel_id(&request.channel_handle).await?;
    info!(handle = %request.channel_handle, channel_id = %id, "pagination: channel resolved");
    let _ = events.send(PageEvent::ChannelResolved(id.clone()));
    id
  } else {
    request.channel_id
  };

  let (mut token, page_limit) = match request.mode {
    FetchMode::Continue(token) => (Some(token), 1),
    FetchMode::FirstPage => (None, 1),
    FetchMode::Exhaustive => (None, constants().max_pages),
  };

  let mut summary = FetchSummary { category, pages: 0, saved: 0, next_page_token: None };
  while summary.pages < page_limit {
    let page = source.fetch_page(&channel_id, token.as_deref()).await?;
    summary.pages += 1;
    token = page.next_page_token;
    if page.videos.is_empty() {
      token = None;
      break;
    }

    let matching: Vec<_> = page.videos.into_iter().filter(|v| v.category() == category).collect();
    backend.upsert_videos(&matching).await?;
    summary.saved += matching.len();
    debug!(category = %category, page = summary.pages, saved = matching.len(), "pagination: page stored");
    let _ = events.send(PageEvent::Page { category, videos: matching.iter().map(|v| v.to_record()).collect() });

    if token.is_none() {
      break;
    }
  }

  summary.next_page_token = token;
  info!(category = %category, pages = summary.pages, saved = summary.saved, "pagination: fetch done");
  Ok(summary)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::testing::{FakeBackend, FakeSource, imported};
  use crate::youtube::VideoPage;

  fn page(ids: &[(&str, u64)], next: Option<&str>) -> Result<VideoPage, String> {
    Ok(VideoPage {
      videos: ids.iter().map(|(id, duration)| imported(id, *duration)).collect(),
      next_page_token: next.map(str::to_string),
    })
  }

  fn request(category: Category, mode: FetchMode) -> FetchRequest {
    FetchRequest { category, mode, channel_id: "UC1".into(), channel_handle: "@chan".into() }
  }

  #[test]
  fn busy_flag_admits_one_holder() {
    let cursor = PaginationCursor::default();
    let guard = cursor.try_begin().unwrap();
    assert!(cursor.is_busy());
    assert!(cursor.try_begin().is_none());
    drop(guard);
    assert!(!cursor.is_busy());
    assert!(cursor.try_begin().is_some());
  }

  #[test]
  fn next_mode_follows_token() {
    let mut cursor = PaginationCursor::default();
    assert_eq!(cursor.next_mode(), FetchMode::Exhaustive);
    cursor.set_next_token(Some("t".into()));
    assert_eq!(cursor.next_mode(), FetchMode::Continue("t".into()));
    cursor.reset();
    assert_eq!(cursor.next_token(), None);
  }

  #[tokio::test]
  async fn failing_fetch_surfaces_error() {
    let source = FakeSource::with_pages(vec![Err("quota exceeded".into())]);
    let backend = FakeBackend::default();
    let (tx, _rx) = mpsc::unbounded_channel();

    let result = fetch_pages(&source, &backend, request(Category::LongForm, FetchMode::FirstPage), &tx).await;

    assert!(result.is_err());
    assert!(backend.upserts.lock().unwrap().is_empty());
  }

  #[tokio::test]
  async fn panicking_task_clears_busy_flag() {
    let cursor = PaginationCursor::default();
    let guard = cursor.try_begin().unwrap();
    let handle = tokio::spawn(async move {
      let _guard = guard;
      panic!("boom");
    });
    assert!(handle.await.is_err());
    assert!(!cursor.is_busy());
  }

  #[tokio::test]
  async fn continue_fetches_one_page_for_category() {
    let source = FakeSource::with_pages(vec![page(&[("long", 600), ("short", 30)], Some("next"))]);
    let backend = FakeBackend::default();
    let (tx, mut rx) = mpsc::unbounded_channel();

    let summary =
      fetch_pages(&source, &backend, request(Category::ShortForm, FetchMode::Continue("tok".into())), &tx)
        .await
        .unwrap();

    assert_eq!(*source.tokens_seen.lock().unwrap(), vec![Some("tok".to_string())]);
    assert_eq!(
      summary,
      FetchSummary { category: Category::ShortForm, pages: 1, saved: 1, next_page_token: Some("next".into()) }
    );
    let upserts = backend.upserts.lock().unwrap();
    assert_eq!(upserts.len(), 1);
    assert_eq!(upserts[0][0].id, "short");
    match rx.try_recv().unwrap() {
      PageEvent::Page { category, videos } => {
        assert_eq!(category, Category::ShortForm);
        assert_eq!(videos.len(), 1);
        assert_eq!(videos[0].id, "short");
      }
      other => panic!("unexpected event {:?}", other),
    }
  }

  #[tokio::test]
  async fn exhaustive_fetch_stops_at_page_cap() {
    let pages = (0..15)
      .map(|i| {
        let id = format!("v{}", i);
        page(&[(id.as_str(), 600)], Some("more"))
      })
      .collect();
    let source = FakeSource::with_pages(pages);
    let backend = FakeBackend::default();
    let (tx, _rx) = mpsc::unbounded_channel();

    let summary =
      fetch_pages(&source, &backend, request(Category::LongForm, FetchMode::Exhaustive), &tx).await.unwrap();

    assert_eq!(summary.pages, constants().max_pages);
    assert_eq!(source.tokens_seen.lock().unwrap().len(), constants().max_pages);
    assert_eq!(source.tokens_seen.lock().unwrap()[0], None);
    // The cap was hit with pages left, so the token is kept for the next call.
    assert_eq!(summary.next_page_token.as_deref(), Some("more"));
  }

  #[tokio::test]
  async fn exhaustive_fetch_ends_with_last_page() {
    let source =
      FakeSource::with_pages(vec![page(&[("a", 600)], Some("p2")), page(&[("b", 600), ("c", 10)], None)]);
    let backend = FakeBackend::default();
    let (tx, _rx) = mpsc::unbounded_channel();

    let summary =
      fetch_pages(&source, &backend, request(Category::LongForm, FetchMode::Exhaustive), &tx).await.unwrap();

    assert_eq!(summary.pages, 2);
    assert_eq!(summary.saved, 2);
    assert_eq!(summary.next_page_token, None);
    assert_eq!(summary.message(), "2 videos saved from 2 page(s) (all loaded)");
  }

  #[tokio::test]
  async fn empty_page_ends_listing() {
    let source = FakeSource::with_pages(vec![page(&[], Some("dangling"))]);
    let backend = FakeBackend::default();
    let (tx, _rx) = mpsc::unbounded_channel();

    let summary =
      fetch_pages(&source, &backend, request(Category::LongForm, FetchMode::Exhaustive), &tx).await.unwrap();

    assert_eq!(summary.saved, 0);
    assert_eq!(summary.next_page_token, None);
    assert!(backend.upserts.lock().unwrap().is_empty());
  }

  #[tokio::test]
  async fn missing_channel_id_is_resolved_first() {
    let source = FakeSource { channel_id: "UCZ".into(), ..FakeSource::with_pages(vec![page(&[("a", 600)], None)]) };
    let backend = FakeBackend::default();
    let (tx, mut rx) = mpsc::unbounded_channel();
    let req = FetchRequest { channel_id: String::new(), ..request(Category::LongForm, FetchMode::FirstPage) };

    fetch_pages(&source, &backend, req, &tx).await.unwrap();

    assert_eq!(rx.try_recv().unwrap(), PageEvent::ChannelResolved("UCZ".into()));
  }
}
