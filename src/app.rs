use anyhow::Result;
use ratatui::widgets::ListState;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::backend::{Backend, BackendClient};
use crate::catalog::{Snapshot, VideoCatalog, fetch_snapshot};
use crate::completion::{GeneratedPost, OpenAiClient, TextGenerator, generate_post};
use crate::config::{Config, Provider};
use crate::constants::constants;
use crate::dispatch::{
  BatchEvent, BatchKind, BatchReport, GenerationPlan, JobQueue, TranscriptionPlan, plan_generation,
  plan_transcribe_all, plan_transcription, run_generation, run_transcription,
};
use crate::error::Precondition;
use crate::model::{Category, Post, PostStatus, PostUpdate, ServerSettings, SettingsPatch, VideoRecord};
use crate::pagination::{BusyGuard, FetchMode, FetchRequest, FetchSummary, PageEvent, PaginationCursor, fetch_pages};
use crate::poller::{StatusPoller, reconcile, should_refresh};
use crate::posts::{PostDesk, PostEditor};
use crate::selection::{SelectionStore, VideoFilter, filter_videos};
use crate::theme::{THEMES, Theme};
use crate::youtube::{VideoSource, YouTubeClient};

// --- Types ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppMode {
  SignedOut,
  Browsing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
  Posts,
  Videos(Category),
}

impl Tab {
  pub const ALL: [Tab; 3] = [Tab::Posts, Tab::Videos(Category::LongForm), Tab::Videos(Category::ShortForm)];

  pub fn label(self) -> &'static str {
    match self {
      Tab::Posts => "Posts",
      Tab::Videos(category) => category.label(),
    }
  }

  pub fn index(self) -> usize {
    match self {
      Tab::Posts => 0,
      Tab::Videos(category) => 1 + category.index(),
    }
  }

  pub fn category(self) -> Option<Category> {
    match self {
      Tab::Posts => None,
      Tab::Videos(category) => Some(category),
    }
  }
}

/// Action waiting for a y/n answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingAction {
  RegenerateBlogs(Category),
  DeletePost { id: String, title: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Confirmation {
  pub action: PendingAction,
  pub message: String,
}

/// The video open in the detail overlay.
#[derive(Debug, Clone)]
pub struct DetailView {
  pub video: VideoRecord,
  pub scroll: u16,
  /// Generated post waiting to be saved.
  pub preview: Option<GeneratedPost>,
}

/// A bulk batch in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchState {
  pub kind: BatchKind,
  pub category: Category,
  /// Started from the selection, which is cleared when it finishes.
  pub from_selection: bool,
}

/// Network collaborators, built once per process.
#[derive(Clone)]
pub struct Services {
  pub backend: Arc<dyn Backend>,
  pub source: Arc<dyn VideoSource>,
  pub generator: Arc<dyn TextGenerator>,
}

impl Services {
  pub fn from_config(config: &Config) -> Result<Self> {
    let http = BackendClient::http_client()?;
    Ok(Self {
      backend: Arc::new(BackendClient::new(http.clone(), config.api_url())),
      source: Arc::new(YouTubeClient::new(http.clone(), config.youtube_api_key.trim())),
      generator: Arc::new(OpenAiClient::new(http, config.openai_api_key.trim())),
    })
  }
}

/// A post change confirmed by the backend.
#[derive(Debug)]
pub(crate) enum PostChange {
  Status { id: String, title: String, status: PostStatus },
  Deleted { id: String, title: String },
  Edited { id: String, update: PostUpdate },
}

/// Result of a single-video action from the detail overlay.
#[derive(Debug)]
pub(crate) enum ItemAction {
  TranscriptionStarted { title: String },
  PostSaved { video_id: String, title: String, status: PostStatus },
}

/// In-flight async task receivers.
#[derive(Default)]
pub(crate) struct AsyncTasks {
  /// Operator or post-batch refresh; a newer one replaces the older.
  pub(crate) refresh_rx: Option<oneshot::Receiver<Result<Snapshot>>>,
  /// Poll-driven refresh, kept apart so ticks never stack.
  pub(crate) poll_refresh_rx: Option<oneshot::Receiver<Result<Snapshot>>>,
  pub(crate) batch_rx: Option<mpsc::UnboundedReceiver<BatchEvent>>,
  pub(crate) page_rx: [Option<mpsc::UnboundedReceiver<PageEvent>>; 2],
  /// The cursor's guard rides back with the summary and is dropped once the token is stored.
  pub(crate) fetch_rx: [Option<oneshot::Receiver<(Result<FetchSummary>, BusyGuard)>>; 2],
  pub(crate) posts_rx: Option<oneshot::Receiver<Result<Vec<Post>>>>,
  pub(crate) post_action_rx: Option<oneshot::Receiver<Result<PostChange>>>,
  pub(crate) settings_rx: Option<oneshot::Receiver<Result<ServerSettings>>>,
  pub(crate) settings_update_rx: Option<oneshot::Receiver<Result<SettingsPatch>>>,
  pub(crate) item_rx: Option<oneshot::Receiver<Result<ItemAction>>>,
  pub(crate) preview_rx: Option<oneshot::Receiver<Result<(String, GeneratedPost)>>>,
}

pub struct App {
  pub mode: AppMode,
  pub tab: Tab,
  pub theme_index: usize,
  pub config: Config,
  services: Services,
  pub catalog: VideoCatalog,
  pub selection: SelectionStore,
  pub cursors: [PaginationCursor; 2],
  pub posts: PostDesk,
  pub detail: Option<DetailView>,
  pub confirm: Option<Confirmation>,
  /// Post edit form, open over the posts tab.
  pub editor: Option<PostEditor>,
  /// One list cursor per tab.
  pub list_states: [ListState; 3],
  /// Server-side autopilot flag; `None` until settings load.
  pub autopilot: Option<bool>,
  pub batch: Option<BatchState>,
  pub last_error: Option<String>,
  pub status_message: Option<String>,
  /// Informational message, lower priority than status/error.
  pub info_message: Option<String>,
  pub should_quit: bool,
  error_time: Option<Instant>,
  poller: StatusPoller,
  poll_rx: Option<mpsc::Receiver<()>>,
  pub(crate) tasks: AsyncTasks,
}

// --- Helpers ---

fn spawn_result<T, F>(fut: F) -> oneshot::Receiver<T>
where
  F: Future<Output = T> + Send + 'static,
  T: Send + 'static,
{
  let (tx, rx) = oneshot::channel();
  tokio::spawn(async move {
    let _ = tx.send(fut.await);
  });
  rx
}

/// Take a finished result out of `slot`. `Some(None)` means the task died
/// without answering; `None` means it is still running.
fn take_ready<T>(slot: &mut Option<oneshot::Receiver<T>>) -> Option<Option<T>> {
  let mut rx = slot.take()?;
  match rx.try_recv() {
    Ok(value) => Some(Some(value)),
    Err(oneshot::error::TryRecvError::Empty) => {
      *slot = Some(rx);
      None
    }
    Err(oneshot::error::TryRecvError::Closed) => Some(None),
  }
}

/// Shorten to `max` chars with an ellipsis.
pub fn shorten(text: &str, max: usize) -> String {
  if text.chars().count() <= max {
    return text.to_string();
  }
  format!("{}…", text.chars().take(max).collect::<String>())
}

impl App {
  pub fn new(config: Config, services: Services) -> Self {
    Self {
      mode: AppMode::SignedOut,
      tab: Tab::Videos(Category::LongForm),
      theme_index: 0,
      config,
      services,
      catalog: VideoCatalog::default(),
      selection: SelectionStore::default(),
      cursors: Default::default(),
      posts: PostDesk::default(),
      detail: None,
      confirm: None,
      editor: None,
      list_states: Default::default(),
      autopilot: None,
      batch: None,
      last_error: None,
      status_message: None,
      info_message: None,
      should_quit: false,
      error_time: None,
      poller: StatusPoller::default(),
      poll_rx: None,
      tasks: AsyncTasks::default(),
    }
  }

  pub fn theme(&self) -> &'static Theme {
    &THEMES[self.theme_index]
  }

  pub fn next_theme(&mut self) {
    self.theme_index = (self.theme_index + 1) % THEMES.len();
  }

  /// Set an error message with auto-dismiss tracking.
  pub fn set_error(&mut self, msg: String) {
    warn!(msg = %msg, "status: error shown");
    self.last_error = Some(msg);
    self.error_time = Some(Instant::now());
  }

  pub fn clear_error(&mut self) {
    self.last_error = None;
    self.error_time = None;
  }

  /// Clear stale error messages after the configured timeout.
  pub fn expire_error(&mut self) {
    if let Some(t) = self.error_time
      && t.elapsed() >= Duration::from_secs(constants().error_timeout_secs)
    {
      self.clear_error();
    }
  }

  fn report(&mut self, precondition: Precondition) {
    self.set_error(precondition.to_string());
  }

  pub fn poller_running(&self) -> bool {
    self.poller.is_running()
  }

  // --- Session ---

  /// Load everything and start the status poller.
  pub fn start_session(&mut self) {
    info!(api_url = %self.config.api_url(), "session: start");
    self.mode = AppMode::Browsing;
    self.clear_error();
    self.trigger_refresh();
    self.load_posts();
    self.load_settings();
    self.poll_rx = Some(self.poller.start(constants().poll_interval()));
  }

  /// Stop polling and drop all session state. In-flight results are discarded.
  pub fn end_session(&mut self) {
    info!("session: end");
    self.poller.stop();
    self.poll_rx = None;
    self.tasks = AsyncTasks::default();
    self.catalog.clear();
    self.selection.reset();
    self.cursors = Default::default();
    self.posts.clear();
    self.detail = None;
    self.confirm = None;
    self.editor = None;
    self.list_states = Default::default();
    self.autopilot = None;
    self.batch = None;
    self.status_message = None;
    self.clear_error();
    self.mode = AppMode::SignedOut;
    self.info_message = Some("Signed out.".to_string());
  }

  // --- Catalog ---

  pub fn trigger_refresh(&mut self) {
    let backend = Arc::clone(&self.services.backend);
    self.tasks.refresh_rx = Some(spawn_result(async move { fetch_snapshot(&*backend).await }));
  }

  /// Poll tick: refresh only while something is processing.
  pub fn on_poll_tick(&mut self) {
    if !should_refresh(&self.catalog, self.tasks.poll_refresh_rx.is_some()) {
      debug!("poller: tick skipped");
      return;
    }
    debug!("poller: refreshing");
    let backend = Arc::clone(&self.services.backend);
    self.tasks.poll_refresh_rx = Some(spawn_result(async move { fetch_snapshot(&*backend).await }));
  }

  fn apply_refresh(&mut self, result: Result<Snapshot>) {
    if !self.catalog.apply_refresh(result) {
      return;
    }
    if let Some(detail) = self.detail.as_mut()
      && reconcile(&mut detail.video, &self.catalog)
    {
      self.info_message = Some(format!("Updated: {}", shorten(&detail.video.title, 40)));
    }
    self.clamp_lists();
  }

  pub fn current_category(&self) -> Option<Category> {
    self.tab.category()
  }

  pub fn visible_videos(&self, category: Category) -> Vec<&VideoRecord> {
    filter_videos(self.catalog.videos(category), self.selection.filter(category))
  }

  fn visible_len(&self, tab: Tab) -> usize {
    match tab {
      Tab::Posts => self.posts.visible().len(),
      Tab::Videos(category) => self.visible_videos(category).len(),
    }
  }

  fn clamp_lists(&mut self) {
    for tab in Tab::ALL {
      let len = self.visible_len(tab);
      let state = &mut self.list_states[tab.index()];
      match (len, state.selected()) {
        (0, _) => state.select(None),
        (_, None) => state.select(Some(0)),
        (len, Some(idx)) if idx >= len => state.select(Some(len - 1)),
        _ => {}
      }
    }
  }

  pub fn select_tab(&mut self, tab: Tab) {
    self.tab = tab;
    self.clamp_lists();
  }

  pub fn next_tab(&mut self) {
    self.select_tab(Tab::ALL[(self.tab.index() + 1) % Tab::ALL.len()]);
  }

  pub fn prev_tab(&mut self) {
    self.select_tab(Tab::ALL[(self.tab.index() + Tab::ALL.len() - 1) % Tab::ALL.len()]);
  }

  pub fn move_cursor(&mut self, delta: isize) {
    let len = self.visible_len(self.tab);
    if len == 0 {
      return;
    }
    let state = &mut self.list_states[self.tab.index()];
    let current = state.selected().unwrap_or(0) as isize;
    state.select(Some((current + delta).clamp(0, len as isize - 1) as usize));
  }

  pub fn highlighted_video(&self) -> Option<&VideoRecord> {
    let category = self.current_category()?;
    let idx = self.list_states[self.tab.index()].selected()?;
    self.visible_videos(category).get(idx).copied()
  }

  pub fn highlighted_post(&self) -> Option<&Post> {
    if self.tab != Tab::Posts {
      return None;
    }
    let idx = self.list_states[Tab::Posts.index()].selected()?;
    self.posts.visible().get(idx).copied()
  }

  // --- Selection ---

  pub fn toggle_highlighted(&mut self) {
    let Some(category) = self.current_category() else { return };
    let Some(id) = self.highlighted_video().map(|v| v.id.clone()) else { return };
    self.selection.toggle(category, &id);
  }

  pub fn toggle_select_all(&mut self) {
    let Some(category) = self.current_category() else { return };
    self.selection.toggle_all(category, self.catalog.videos(category));
  }

  pub fn cycle_filter(&mut self) {
    match self.current_category() {
      Some(category) => {
        let filter = self.selection.cycle_filter(category);
        self.info_message = Some(format!("Filter: {}", filter.label()));
      }
      None => {
        let filter = self.posts.cycle_filter();
        self.info_message = Some(format!("Filter: {}", filter.label()));
      }
    }
    self.clamp_lists();
  }

  pub fn set_filter(&mut self, filter: VideoFilter) {
    let Some(category) = self.current_category() else { return };
    self.selection.set_filter(category, filter);
    self.clamp_lists();
  }

  pub fn clear_selection(&mut self) {
    if let Some(category) = self.current_category() {
      self.selection.clear(category);
    }
  }

  // --- Bulk jobs ---

  fn batch_free(&mut self) -> bool {
    if self.tasks.batch_rx.is_some() {
      self.report(Precondition::BatchInProgress);
      return false;
    }
    true
  }

  pub fn bulk_transcribe(&mut self) {
    let Some(category) = self.current_category() else { return };
    if !self.batch_free() {
      return;
    }
    let selected = self.selection.selected(category);
    match plan_transcription(&selected, self.catalog.videos(category), &self.config) {
      Ok(plan) => self.spawn_transcription(category, plan, true),
      Err(p) => self.report(p),
    }
  }

  /// Transcribe everything in the current tab that still lacks a transcript.
  pub fn transcribe_all(&mut self) {
    let Some(category) = self.current_category() else { return };
    if !self.batch_free() {
      return;
    }
    match plan_transcribe_all(self.catalog.videos(category), &self.config) {
      Ok(plan) => self.spawn_transcription(category, plan, false),
      Err(p) => self.report(p),
    }
  }

  fn spawn_transcription(&mut self, category: Category, plan: TranscriptionPlan, from_selection: bool) {
    info!(category = %category, count = plan.items.len(), "bulk: transcription queued");
    self.status_message = Some(format!("Submitting {} transcription job(s)…", plan.items.len()));
    let backend = Arc::clone(&self.services.backend);
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
      let report = run_transcription(&*backend, plan, &JobQueue::new(Duration::ZERO), &tx).await;
      let _ = tx.send(BatchEvent::Finished(report));
    });
    self.tasks.batch_rx = Some(rx);
    self.batch = Some(BatchState { kind: BatchKind::Transcription, category, from_selection });
  }

  pub fn bulk_generate(&mut self) {
    if let Some(category) = self.current_category() {
      self.generate_for(category, false);
    }
  }

  fn generate_for(&mut self, category: Category, confirmed: bool) {
    if !self.batch_free() {
      return;
    }
    let selected = self.selection.selected(category);
    match plan_generation(&selected, self.catalog.videos(category), &self.config, confirmed) {
      Ok(plan) => self.spawn_generation(category, plan),
      Err(p @ Precondition::ConfirmRegenerate { .. }) => {
        self.confirm = Some(Confirmation { action: PendingAction::RegenerateBlogs(category), message: p.to_string() });
      }
      Err(p) => self.report(p),
    }
  }

  fn spawn_generation(&mut self, category: Category, plan: GenerationPlan) {
    info!(category = %category, count = plan.videos.len(), skipped = plan.skipped, "bulk: generation queued");
    self.status_message = Some(format!("Generating {} blog post(s)…", plan.videos.len()));
    let backend = Arc::clone(&self.services.backend);
    let generator = Arc::clone(&self.services.generator);
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
      let queue = JobQueue::new(constants().generation_delay());
      let report = run_generation(&*backend, &*generator, plan, &queue, &tx).await;
      let _ = tx.send(BatchEvent::Finished(report));
    });
    self.tasks.batch_rx = Some(rx);
    self.batch = Some(BatchState { kind: BatchKind::Generation, category, from_selection: true });
  }

  fn finish_batch(&mut self, report: BatchReport) {
    info!(kind = ?report.kind, succeeded = report.succeeded(), failed = report.failed(), "bulk: finished");
    self.status_message = None;
    if report.failed() > 0 {
      self.set_error(report.summary());
    } else {
      self.info_message = Some(report.summary());
    }
    if let Some(batch) = self.batch.take()
      && batch.from_selection
    {
      self.selection.clear(batch.category);
    }
    self.trigger_refresh();
    if report.kind == BatchKind::Generation {
      self.load_posts();
    }
  }

  // --- Confirmation ---

  /// Answer the pending prompt. Declining drops the action untouched.
  pub fn answer_confirmation(&mut self, accepted: bool) {
    let Some(confirmation) = self.confirm.take() else { return };
    if !accepted {
      self.info_message = Some("Cancelled.".to_string());
      return;
    }
    match confirmation.action {
      PendingAction::RegenerateBlogs(category) => self.generate_for(category, true),
      PendingAction::DeletePost { id, title } => {
        let backend = Arc::clone(&self.services.backend);
        self.tasks.post_action_rx = Some(spawn_result(async move {
          backend.delete_post(&id).await?;
          Ok(PostChange::Deleted { id, title })
        }));
      }
    }
  }

  // --- Pagination ---

  pub fn load_more(&mut self) {
    if let Some(category) = self.current_category() {
      self.start_fetch(category, false);
    }
  }

  /// Newest page only, starting the cursor over.
  pub fn import_latest(&mut self) {
    if let Some(category) = self.current_category() {
      self.start_fetch(category, true);
    }
  }

  fn start_fetch(&mut self, category: Category, latest: bool) {
    let Some(guard) = self.cursors[category.index()].try_begin() else {
      debug!(category = %category, "pagination: busy, ignoring");
      return;
    };
    if let Err(p) = self.config.youtube_key() {
      self.report(p);
      return;
    }
    let cursor = &mut self.cursors[category.index()];
    let mode = if latest {
      cursor.reset();
      FetchMode::FirstPage
    } else {
      cursor.next_mode()
    };
    info!(category = %category, mode = ?mode, "pagination: fetch");

    let request = FetchRequest {
      category,
      mode,
      channel_id: self.config.channel_id.clone(),
      channel_handle: self.config.channel_handle.clone(),
    };
    let source = Arc::clone(&self.services.source);
    let backend = Arc::clone(&self.services.backend);
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    self.tasks.page_rx[category.index()] = Some(events_rx);
    self.tasks.fetch_rx[category.index()] = Some(spawn_result(async move {
      let result = fetch_pages(&*source, &*backend, request, &events_tx).await;
      (result, guard)
    }));
    self.status_message = Some(format!("Loading {}…", category.label().to_lowercase()));
  }

  fn apply_page_event(&mut self, event: PageEvent) {
    match event {
      PageEvent::ChannelResolved(id) => {
        self.config.channel_id = id;
        if let Err(e) = self.config.save() {
          self.set_error(format!("Failed to save channel id: {:#}", e));
        }
      }
      PageEvent::Page { category, videos } => {
        let added = self.catalog.append(category, videos);
        debug!(category = %category, added, "pagination: page merged");
        self.clamp_lists();
      }
    }
  }

  // --- Posts ---

  pub fn load_posts(&mut self) {
    let backend = Arc::clone(&self.services.backend);
    self.tasks.posts_rx = Some(spawn_result(async move { backend.list_posts().await }));
  }

  fn spawn_post_status(&mut self, status: PostStatus) {
    let Some(post) = self.highlighted_post() else { return };
    if post.status == status {
      return;
    }
    let id = post.id.clone();
    let title = shorten(&post.title, 40);
    let backend = Arc::clone(&self.services.backend);
    self.tasks.post_action_rx = Some(spawn_result(async move {
      match status {
        PostStatus::Published => backend.publish_post(&id).await?,
        _ => backend.unpublish_post(&id).await?,
      }
      Ok(PostChange::Status { id, title, status })
    }));
  }

  pub fn publish_highlighted(&mut self) {
    self.spawn_post_status(PostStatus::Published);
  }

  pub fn unpublish_highlighted(&mut self) {
    self.spawn_post_status(PostStatus::Draft);
  }

  pub fn request_delete_highlighted(&mut self) {
    let Some(post) = self.highlighted_post() else { return };
    let title = shorten(&post.title, 50);
    self.confirm = Some(Confirmation {
      message: format!("Delete \"{}\"?", title),
      action: PendingAction::DeletePost { id: post.id.clone(), title },
    });
  }

  pub fn edit_highlighted(&mut self) {
    let Some(post) = self.highlighted_post() else { return };
    debug!(id = %post.id, "posts: edit");
    let editor = PostEditor::new(post);
    self.editor = Some(editor);
  }

  pub fn cancel_edit(&mut self) {
    self.editor = None;
  }

  pub fn save_edit(&mut self) {
    let Some(editor) = self.editor.take() else { return };
    let update = editor.update();
    if update.title.is_empty() {
      self.editor = Some(editor);
      return self.set_error("Title cannot be empty.".to_string());
    }
    let id = editor.id;
    let backend = Arc::clone(&self.services.backend);
    self.tasks.post_action_rx = Some(spawn_result(async move {
      backend.update_post(&id, &update).await?;
      Ok(PostChange::Edited { id, update })
    }));
  }

  fn apply_post_change(&mut self, change: PostChange) {
    match change {
      PostChange::Status { id, title, status } => {
        self.posts.set_status(&id, status);
        self.info_message = Some(format!("Marked {}: {}", status.label(), title));
      }
      PostChange::Deleted { id, title } => {
        info!(id = %id, "posts: deleted");
        self.posts.remove(&id);
        self.info_message = Some(format!("Deleted: {}", title));
      }
      PostChange::Edited { id, update } => {
        info!(id = %id, "posts: updated");
        self.posts.apply_update(&id, &update);
        self.info_message = Some(format!("Updated: {}", shorten(&update.title, 40)));
      }
    }
    self.clamp_lists();
  }

  // --- Settings ---

  pub fn load_settings(&mut self) {
    let backend = Arc::clone(&self.services.backend);
    self.tasks.settings_rx = Some(spawn_result(async move { backend.settings().await }));
  }

  /// The server's provider choice wins over the local one.
  fn apply_settings(&mut self, settings: ServerSettings) {
    self.autopilot = Some(settings.autopilot);
    let Some(provider) = settings.transcription_provider.as_deref().and_then(Provider::from_config) else {
      return;
    };
    if provider != self.config.transcription_provider {
      info!(provider = provider.as_str(), "settings: provider taken from server");
      self.config.transcription_provider = provider;
      if let Err(e) = self.config.save() {
        self.set_error(format!("Failed to save config: {:#}", e));
      }
    }
  }

  fn push_settings(&mut self, patch: SettingsPatch) {
    let backend = Arc::clone(&self.services.backend);
    self.tasks.settings_update_rx = Some(spawn_result(async move {
      backend.update_settings(&patch).await?;
      Ok(patch)
    }));
  }

  pub fn toggle_autopilot(&mut self) {
    let Some(current) = self.autopilot else {
      self.set_error("Settings are still loading.".to_string());
      return;
    };
    self.push_settings(SettingsPatch { autopilot: Some(!current), ..Default::default() });
  }

  /// Switch the transcription provider locally and on the server.
  pub fn toggle_provider(&mut self) {
    let provider = self.config.transcription_provider.toggle();
    self.config.transcription_provider = provider;
    if let Err(e) = self.config.save() {
      self.set_error(format!("Failed to save config: {:#}", e));
    }
    self.info_message = Some(format!("Transcription provider: {}", provider.label()));
    let patch = SettingsPatch { transcription_provider: Some(provider.as_str().to_string()), ..Default::default() };
    self.push_settings(patch);
  }

  // --- Detail view ---

  pub fn open_detail(&mut self) {
    let Some(video) = self.highlighted_video().cloned() else { return };
    debug!(id = %video.id, "detail: open");
    self.detail = Some(DetailView { video, scroll: 0, preview: None });
  }

  pub fn close_detail(&mut self) {
    self.detail = None;
  }

  pub fn scroll_detail(&mut self, delta: i32) {
    if let Some(detail) = self.detail.as_mut() {
      detail.scroll = (i32::from(detail.scroll) + delta).clamp(0, i32::from(u16::MAX)) as u16;
    }
  }

  pub fn transcribe_detail(&mut self) {
    let Some(video) = self.detail.as_ref().map(|d| d.video.clone()) else { return };
    let credential = match self.config.transcription_credential() {
      Ok(c) => c,
      Err(p) => return self.report(p),
    };
    let backend = Arc::clone(&self.services.backend);
    self.status_message = Some(format!("Starting transcription: {}", shorten(&video.title, 40)));
    self.tasks.item_rx = Some(spawn_result(async move {
      backend.transcribe(&video.id, &credential).await?;
      Ok(ItemAction::TranscriptionStarted { title: video.title })
    }));
  }

  pub fn preview_detail(&mut self) {
    let Some(video) = self.detail.as_ref().map(|d| d.video.clone()) else { return };
    if !video.has_transcript() {
      return self.report(Precondition::NothingTranscribed);
    }
    if let Err(p) = self.config.completion_key() {
      return self.report(p);
    }
    let generator = Arc::clone(&self.services.generator);
    let system_prompt = self.config.blog_system_prompt();
    self.status_message = Some(format!("Generating blog: {}", shorten(&video.title, 40)));
    self.tasks.preview_rx = Some(spawn_result(async move {
      let post = generate_post(&*generator, &system_prompt, &video).await?;
      Ok((video.id, post))
    }));
  }

  pub fn save_preview(&mut self, status: PostStatus) {
    let Some(detail) = self.detail.as_ref() else { return };
    let Some(preview) = detail.preview.clone() else {
      return self.report(Precondition::NoPreview);
    };
    let video = detail.video.clone();
    let backend = Arc::clone(&self.services.backend);
    self.status_message = Some("Saving post…".to_string());
    self.tasks.item_rx = Some(spawn_result(async move {
      let title = preview.title.clone();
      backend.create_post(&preview.into_post(&video, status)).await?;
      Ok(ItemAction::PostSaved { video_id: video.id, title, status })
    }));
  }

  fn apply_item_action(&mut self, action: ItemAction) {
    match action {
      ItemAction::TranscriptionStarted { title } => {
        self.info_message = Some(format!("Transcription started: {}", shorten(&title, 40)));
        self.trigger_refresh();
      }
      ItemAction::PostSaved { video_id, title, status } => {
        self.catalog.mark_blog_created(&video_id);
        if let Some(detail) = self.detail.as_mut()
          && detail.video.id == video_id
        {
          detail.video.blog_created = true;
          detail.preview = None;
        }
        self.info_message = Some(format!("Saved as {}: {}", status.label(), shorten(&title, 40)));
        self.load_posts();
      }
    }
  }

  // --- Background results ---

  /// Drain finished background work into state. Called once per frame.
  pub fn check_pending(&mut self) {
    if let Some(rx) = self.poll_rx.as_mut() {
      let mut ticked = false;
      while rx.try_recv().is_ok() {
        ticked = true;
      }
      if ticked {
        self.on_poll_tick();
      }
    }

    for slot in [0, 1] {
      let result = if slot == 0 {
        take_ready(&mut self.tasks.refresh_rx)
      } else {
        take_ready(&mut self.tasks.poll_refresh_rx)
      };
      match result {
        Some(Some(snapshot)) => self.apply_refresh(snapshot),
        Some(None) => warn!("catalog: refresh task dropped"),
        None => {}
      }
    }

    self.check_batch();
    for category in Category::ALL {
      self.check_fetch(category);
    }

    match take_ready(&mut self.tasks.posts_rx) {
      Some(Some(Ok(posts))) => {
        info!(count = posts.len(), "posts: loaded");
        self.posts.replace(posts);
        self.clamp_lists();
      }
      Some(Some(Err(e))) => self.set_error(format!("Failed to load posts: {:#}", e)),
      Some(None) => self.set_error("Post listing task failed.".to_string()),
      None => {}
    }

    match take_ready(&mut self.tasks.post_action_rx) {
      Some(Some(Ok(change))) => {
        self.apply_post_change(change);
        self.load_posts();
      }
      Some(Some(Err(e))) => self.set_error(format!("Post action failed: {:#}", e)),
      Some(None) => self.set_error("Post task failed.".to_string()),
      None => {}
    }

    match take_ready(&mut self.tasks.settings_rx) {
      Some(Some(Ok(settings))) => self.apply_settings(settings),
      Some(Some(Err(e))) => warn!(err = %format!("{:#}", e), "settings: load failed"),
      Some(None) | None => {}
    }

    match take_ready(&mut self.tasks.settings_update_rx) {
      Some(Some(Ok(patch))) => {
        if let Some(autopilot) = patch.autopilot {
          self.autopilot = Some(autopilot);
          self.info_message = Some(format!("Autopilot {}", if autopilot { "on" } else { "off" }));
        }
      }
      Some(Some(Err(e))) => self.set_error(format!("Failed to save settings: {:#}", e)),
      Some(None) | None => {}
    }

    match take_ready(&mut self.tasks.item_rx) {
      Some(Some(Ok(action))) => {
        self.status_message = None;
        self.apply_item_action(action);
      }
      Some(Some(Err(e))) => {
        self.status_message = None;
        self.set_error(format!("{:#}", e));
      }
      Some(None) => {
        self.status_message = None;
        self.set_error("Task failed.".to_string());
      }
      None => {}
    }

    match take_ready(&mut self.tasks.preview_rx) {
      Some(Some(Ok((video_id, post)))) => {
        self.status_message = None;
        if let Some(detail) = self.detail.as_mut()
          && detail.video.id == video_id
        {
          detail.preview = Some(post);
          self.info_message = Some("Preview ready. d: save draft, p: publish".to_string());
        }
      }
      Some(Some(Err(e))) => {
        self.status_message = None;
        self.set_error(format!("Generation failed: {:#}", e));
      }
      Some(None) => {
        self.status_message = None;
        self.set_error("Generation task failed.".to_string());
      }
      None => {}
    }
  }

  fn check_batch(&mut self) {
    let Some(mut rx) = self.tasks.batch_rx.take() else { return };
    loop {
      match rx.try_recv() {
        Ok(BatchEvent::Progress { kind, index, total, title }) => {
          self.status_message = Some(format!("{}: {} ({}/{})", kind.verb(), shorten(&title, 30), index + 1, total));
        }
        Ok(BatchEvent::Finished(report)) => {
          self.finish_batch(report);
          return;
        }
        Err(mpsc::error::TryRecvError::Empty) => {
          self.tasks.batch_rx = Some(rx);
          return;
        }
        Err(mpsc::error::TryRecvError::Disconnected) => {
          self.status_message = None;
          self.batch = None;
          self.set_error("Batch task failed.".to_string());
          return;
        }
      }
    }
  }

  fn check_fetch(&mut self, category: Category) {
    let idx = category.index();
    if let Some(rx) = self.tasks.page_rx[idx].as_mut() {
      let mut events = Vec::new();
      while let Ok(event) = rx.try_recv() {
        events.push(event);
      }
      for event in events {
        self.apply_page_event(event);
      }
    }

    match take_ready(&mut self.tasks.fetch_rx[idx]) {
      Some(Some((Ok(summary), guard))) => {
        self.tasks.page_rx[idx] = None;
        self.status_message = None;
        self.info_message = Some(summary.message());
        self.cursors[idx].set_next_token(summary.next_page_token);
        drop(guard);
        self.trigger_refresh();
      }
      Some(Some((Err(e), _guard))) => {
        self.tasks.page_rx[idx] = None;
        self.status_message = None;
        self.set_error(format!("Failed to load {}: {:#}", category.label().to_lowercase(), e));
      }
      // The task died; its guard was dropped with it.
      Some(None) => {
        self.tasks.page_rx[idx] = None;
        self.status_message = None;
        self.set_error("Load task failed.".to_string());
      }
      None => {}
    }
  }
}
