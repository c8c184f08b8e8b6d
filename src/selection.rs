use tracing::debug;

use crate::model::{Category, VideoRecord};

/// Predicate applied to a category's list before display and bulk selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VideoFilter {
  #[default]
  All,
  NoBlog,
  HasTranscriptNoBlog,
}

impl VideoFilter {
  pub const ALL: [VideoFilter; 3] = [VideoFilter::All, VideoFilter::NoBlog, VideoFilter::HasTranscriptNoBlog];

  pub fn label(self) -> &'static str {
    match self {
      VideoFilter::All => "all",
      VideoFilter::NoBlog => "no blog",
      VideoFilter::HasTranscriptNoBlog => "transcript, no blog",
    }
  }

  pub fn matches(self, video: &VideoRecord) -> bool {
    match self {
      VideoFilter::All => true,
      VideoFilter::NoBlog => !video.blog_created,
      VideoFilter::HasTranscriptNoBlog => video.has_transcript() && !video.blog_created,
    }
  }

  pub fn next(self) -> Self {
    // The modulo wraps back to the first filter.
    let idx = Self::ALL.iter().position(|f| *f == self).unwrap_or(0);
    Self::ALL[(idx + 1) % Self::ALL.len()]
  }
}

/// Records passing `filter`, in snapshot order.
pub fn filter_videos(videos: &[VideoRecord], filter: VideoFilter) -> Vec<&VideoRecord> {
  videos.iter().filter(|v| filter.matches(v)).collect()
}

#[derive(Debug, Default)]
struct CategorySelection {
  /// Insertion-ordered, duplicate-free.
  ids: Vec<String>,
  filter: VideoFilter,
}

/// Per-category selected ids and active filter.
#[derive(Debug, Default)]
pub struct SelectionStore {
  categories: [CategorySelection; 2],
}

impl SelectionStore {
  fn slot(&self, category: Category) -> &CategorySelection {
    &self.categories[category.index()]
  }

  fn slot_mut(&mut self, category: Category) -> &mut CategorySelection {
    &mut self.categories[category.index()]
  }

  pub fn filter(&self, category: Category) -> VideoFilter {
    self.slot(category).filter
  }

  pub fn is_selected(&self, category: Category, id: &str) -> bool {
    self.slot(category).ids.iter().any(|s| s == id)
  }

  pub fn count(&self, category: Category) -> usize {
    self.slot(category).ids.len()
  }

  /// Selected ids in the order they were picked.
  pub fn selected(&self, category: Category) -> Vec<String> {
    self.slot(category).ids.clone()
  }

  pub fn toggle(&mut self, category: Category, id: &str) {
    let ids = &mut self.slot_mut(category).ids;
    match ids.iter().position(|s| s == id) {
      Some(pos) => {
        ids.remove(pos);
      }
      None => ids.push(id.to_string()),
    }
  }

  /// Select every record passing the active filter, or clear when that many
  /// are already selected. Records hidden by the filter are never picked up.
  pub fn toggle_all(&mut self, category: Category, videos: &[VideoRecord]) {
    let filter = self.filter(category);
    let visible = filter_videos(videos, filter);
    let slot = self.slot_mut(category);
    if slot.ids.len() == visible.len() {
      slot.ids.clear();
    } else {
      for video in visible {
        if !slot.ids.contains(&video.id) {
          slot.ids.push(video.id.clone());
        }
      }
    }
    debug!(category = %category, selected = slot.ids.len(), "selection: toggle all");
  }

  /// Changing the filter always drops the category's selection.
  pub fn set_filter(&mut self, category: Category, filter: VideoFilter) {
    let slot = self.slot_mut(category);
    slot.filter = filter;
    slot.ids.clear();
    debug!(category = %category, filter = filter.label(), "selection: filter set");
  }

  pub fn cycle_filter(&mut self, category: Category) -> VideoFilter {
    let next = self.filter(category).next();
    self.set_filter(category, next);
    next
  }

  pub fn clear(&mut self, category: Category) {
    self.slot_mut(category).ids.clear();
  }

  /// Back to empty selections and `all` filters.
  pub fn reset(&mut self) {
    *self = Self::default();
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::testing::{transcribed, video};

  fn sample() -> Vec<VideoRecord> {
    vec![
      video("a", |_| {}),
      video("b", |v| v.blog_created = true),
      video("c", transcribed),
      video("d", |v| {
        transcribed(v);
        v.blog_created = true;
      }),
    ]
  }

  fn ids(videos: Vec<&VideoRecord>) -> Vec<&str> {
    videos.into_iter().map(|v| v.id.as_str()).collect()
  }

  #[test]
  fn no_blog_filter_keeps_unblogged_only() {
    let videos = vec![video("A", |_| {}), video("B", |v| v.blog_created = true)];
    assert_eq!(ids(filter_videos(&videos, VideoFilter::NoBlog)), vec!["A"]);
  }

  #[test]
  fn transcript_filter_needs_completed_text_and_no_blog() {
    let mut videos = sample();
    videos.push(video("e", |v| v.transcript = Some("partial".into())));
    assert_eq!(ids(filter_videos(&videos, VideoFilter::HasTranscriptNoBlog)), vec!["c"]);
    assert_eq!(filter_videos(&videos, VideoFilter::All).len(), 5);
  }

  #[test]
  fn toggle_twice_is_a_noop() {
    let mut store = SelectionStore::default();
    store.toggle(Category::LongForm, "a");
    assert!(store.is_selected(Category::LongForm, "a"));
    store.toggle(Category::LongForm, "a");
    assert_eq!(store.count(Category::LongForm), 0);
  }

  #[test]
  fn categories_are_independent() {
    let mut store = SelectionStore::default();
    store.toggle(Category::LongForm, "a");
    store.set_filter(Category::ShortForm, VideoFilter::NoBlog);
    assert!(store.is_selected(Category::LongForm, "a"));
    assert!(!store.is_selected(Category::ShortForm, "a"));
    assert_eq!(store.filter(Category::LongForm), VideoFilter::All);
  }

  #[test]
  fn set_filter_clears_selection_for_every_value() {
    let mut store = SelectionStore::default();
    for filter in VideoFilter::ALL {
      store.toggle(Category::ShortForm, "x");
      store.toggle(Category::ShortForm, "y");
      store.set_filter(Category::ShortForm, filter);
      assert_eq!(store.count(Category::ShortForm), 0, "filter {:?}", filter);
      assert_eq!(store.filter(Category::ShortForm), filter);
    }
  }

  #[test]
  fn toggle_all_twice_returns_to_empty() {
    let videos = sample();
    let mut store = SelectionStore::default();
    store.toggle_all(Category::LongForm, &videos);
    assert_eq!(store.selected(Category::LongForm), vec!["a", "b", "c", "d"]);
    store.toggle_all(Category::LongForm, &videos);
    assert_eq!(store.count(Category::LongForm), 0);
  }

  #[test]
  fn toggle_all_respects_filter() {
    let videos = sample();
    let mut store = SelectionStore::default();
    store.set_filter(Category::LongForm, VideoFilter::NoBlog);
    store.toggle_all(Category::LongForm, &videos);
    assert_eq!(store.selected(Category::LongForm), vec!["a", "c"]);
  }

  #[test]
  fn toggle_all_fills_a_partial_selection() {
    let videos = sample();
    let mut store = SelectionStore::default();
    store.toggle(Category::LongForm, "c");
    store.toggle_all(Category::LongForm, &videos);
    // Existing picks keep their place, the rest follow in list order.
    assert_eq!(store.selected(Category::LongForm), vec!["c", "a", "b", "d"]);
  }

  #[test]
  fn cycle_filter_wraps_and_clears() {
    let mut store = SelectionStore::default();
    store.toggle(Category::LongForm, "a");
    assert_eq!(store.cycle_filter(Category::LongForm), VideoFilter::NoBlog);
    assert_eq!(store.count(Category::LongForm), 0);
    assert_eq!(store.cycle_filter(Category::LongForm), VideoFilter::HasTranscriptNoBlog);
    assert_eq!(store.cycle_filter(Category::LongForm), VideoFilter::All);
  }

  #[test]
  fn reset_restores_defaults() {
    let mut store = SelectionStore::default();
    store.toggle(Category::LongForm, "a");
    store.set_filter(Category::ShortForm, VideoFilter::NoBlog);
    store.reset();
    assert_eq!(store.count(Category::LongForm), 0);
    assert_eq!(store.filter(Category::ShortForm), VideoFilter::All);
  }
}
