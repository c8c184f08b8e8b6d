//! Bulk transcription and blog generation over a selection.
//!
//! Preconditions are checked up front by the `plan_*` functions, before any
//! network call. A planned batch then runs item by item through a `JobQueue`:
//! strictly sequential, optionally spaced by a fixed delay, with every item's
//! outcome captured so one failure never aborts the rest.

use anyhow::Result;
use std::future::Future;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::backend::Backend;
use crate::completion::{TextGenerator, generate_post};
use crate::config::{Config, Credential};
use crate::error::Precondition;
use crate::model::{PostStatus, TranscriptStatus, VideoRecord};

// --- Types ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchKind {
  Transcription,
  Generation,
}

impl BatchKind {
  /// Progress verb shown while an item runs.
  pub fn verb(self) -> &'static str {
    match self {
      BatchKind::Transcription => "Transcribing",
      BatchKind::Generation => "Generating blog",
    }
  }
}

/// Notifications sent back to the UI while a batch runs.
#[derive(Debug, Clone, PartialEq)]
pub enum BatchEvent {
  Progress { kind: BatchKind, index: usize, total: usize, title: String },
  Finished(BatchReport),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
  Succeeded,
  Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemResult {
  pub id: String,
  pub title: String,
  pub outcome: ItemOutcome,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BatchReport {
  pub kind: BatchKind,
  pub results: Vec<ItemResult>,
  /// Selected items left out before the batch started.
  pub skipped: usize,
}

impl BatchReport {
  pub fn succeeded(&self) -> usize {
    self.results.iter().filter(|r| r.outcome == ItemOutcome::Succeeded).count()
  }

  pub fn failed(&self) -> usize {
    self.results.len() - self.succeeded()
  }

  /// One-line result for the status bar.
  pub fn summary(&self) -> String {
    let mut line = match self.kind {
      BatchKind::Transcription => format!("Transcription started for {} video(s)", self.succeeded()),
      BatchKind::Generation => format!("{} blog post(s) created", self.succeeded()),
    };
    if self.failed() > 0 {
      line.push_str(&format!(", {} failed", self.failed()));
    }
    if self.skipped > 0 {
      line.push_str(&format!(" ({} skipped without transcript)", self.skipped));
    }
    line
  }
}

/// A unit of work plus the id and title used to report on it.
pub struct Job<T> {
  pub id: String,
  pub title: String,
  pub input: T,
}

// --- Queue ---

/// Runs jobs one at a time, waiting `delay` between consecutive jobs.
#[derive(Debug, Clone, Copy)]
pub struct JobQueue {
  delay: Duration,
}

impl JobQueue {
  pub fn new(delay: Duration) -> Self {
    Self { delay }
  }

  pub async fn run<T, F, Fut>(
    &self,
    kind: BatchKind,
    jobs: Vec<Job<T>>,
    progress: &mpsc::UnboundedSender<BatchEvent>,
    mut work: F,
  ) -> Vec<ItemResult>
  where
    F: FnMut(T) -> Fut,
    Fut: Future<Output = Result<()>>,
  {
    let total = jobs.len();
    let mut results = Vec::with_capacity(total);
    for (index, job) in jobs.into_iter().enumerate() {
      if index > 0 && !self.delay.is_zero() {
        tokio::time::sleep(self.delay).await;
      }
      let _ = progress.send(BatchEvent::Progress { kind, index, total, title: job.title.clone() });
      let outcome = match work(job.input).await {
        Ok(()) => {
          info!(kind = ?kind, id = %job.id, "dispatch: item done");
          ItemOutcome::Succeeded
        }
        Err(e) => {
          warn!(kind = ?kind, id = %job.id, err = %format!("{:#}", e), "dispatch: item failed");
          ItemOutcome::Failed(format!("{:#}", e))
        }
      };
      results.push(ItemResult { id: job.id, title: job.title, outcome });
    }
    results
  }
}

// --- Planning ---

#[derive(Debug, Clone)]
pub struct TranscriptionPlan {
  pub credential: Credential,
  /// `(id, title)` in selection order.
  pub items: Vec<(String, String)>,
}

/// Check selection and provider key for a bulk transcription.
pub fn plan_transcription(
  selected: &[String],
  videos: &[VideoRecord],
  config: &Config,
) -> Result<TranscriptionPlan, Precondition> {
  if selected.is_empty() {
    return Err(Precondition::EmptySelection);
  }
  let credential = config.transcription_credential()?;
  let items = selected
    .iter()
    .map(|id| {
      let title = videos.iter().find(|v| &v.id == id).map(|v| v.title.clone()).unwrap_or_else(|| id.clone());
      (id.clone(), title)
    })
    .collect();
  Ok(TranscriptionPlan { credential, items })
}

/// Queue every video in the category that has no transcript and is not already
/// being transcribed. The provider key is checked first.
pub fn plan_transcribe_all(videos: &[VideoRecord], config: &Config) -> Result<TranscriptionPlan, Precondition> {
  let credential = config.transcription_credential()?;
  let items: Vec<(String, String)> = videos
    .iter()
    .filter(|v| v.transcript.as_deref().is_none_or(str::is_empty))
    .filter(|v| v.transcript_status != TranscriptStatus::Processing)
    .map(|v| (v.id.clone(), v.title.clone()))
    .collect();
  if items.is_empty() {
    return Err(Precondition::NothingToTranscribe);
  }
  Ok(TranscriptionPlan { credential, items })
}

#[derive(Debug, Clone)]
pub struct GenerationPlan {
  pub system_prompt: String,
  /// Selected records with a usable transcript, in selection order.
  pub videos: Vec<VideoRecord>,
  pub skipped: usize,
}

/// Check a bulk generation request.
///
/// Order of checks: empty selection, nothing transcribed, missing LLM key,
/// then confirmation when a candidate already has a post. Pass
/// `confirmed = true` once the operator agreed to generate again.
pub fn plan_generation(
  selected: &[String],
  videos: &[VideoRecord],
  config: &Config,
  confirmed: bool,
) -> Result<GenerationPlan, Precondition> {
  if selected.is_empty() {
    return Err(Precondition::EmptySelection);
  }
  let candidates: Vec<VideoRecord> = selected
    .iter()
    .filter_map(|id| videos.iter().find(|v| &v.id == id))
    .filter(|v| v.has_transcript())
    .cloned()
    .collect();
  if candidates.is_empty() {
    return Err(Precondition::NothingTranscribed);
  }
  config.completion_key()?;

  let existing = candidates.iter().filter(|v| v.blog_created).count();
  if existing > 0 && !confirmed {
    return Err(Precondition::ConfirmRegenerate { existing, total: candidates.len() });
  }

  Ok(GenerationPlan {
    system_prompt: config.blog_system_prompt(),
    skipped: selected.len() - candidates.len(),
    videos: candidates,
  })
}

// --- Execution ---

/// Submit one transcription job per item. Jobs finish server-side later.
pub async fn run_transcription(
  backend: &dyn Backend,
  plan: TranscriptionPlan,
  queue: &JobQueue,
  progress: &mpsc::UnboundedSender<BatchEvent>,
) -> BatchReport {
  info!(count = plan.items.len(), provider = plan.credential.provider.as_str(), "dispatch: bulk transcription");
  let credential = &plan.credential;
  let jobs = plan.items.into_iter().map(|(id, title)| Job { id: id.clone(), title, input: id }).collect();
  let results = queue
    .run(BatchKind::Transcription, jobs, progress, move |id: String| async move {
      backend.transcribe(&id, credential).await
    })
    .await;
  BatchReport { kind: BatchKind::Transcription, results, skipped: 0 }
}

/// Generate and save a draft post for every planned video.
pub async fn run_generation(
  backend: &dyn Backend,
  generator: &dyn TextGenerator,
  plan: GenerationPlan,
  queue: &JobQueue,
  progress: &mpsc::UnboundedSender<BatchEvent>,
) -> BatchReport {
  info!(count = plan.videos.len(), skipped = plan.skipped, "dispatch: bulk generation");
  let system_prompt = plan.system_prompt.as_str();
  let jobs = plan.videos.into_iter().map(|v| Job { id: v.id.clone(), title: v.title.clone(), input: v }).collect();
  let results = queue
    .run(BatchKind::Generation, jobs, progress, move |video: VideoRecord| async move {
      let generated = generate_post(generator, system_prompt, &video).await?;
      backend.create_post(&generated.into_post(&video, PostStatus::Draft)).await
    })
    .await;
  BatchReport { kind: BatchKind::Generation, results, skipped: plan.skipped }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::Provider;
  use crate::testing::{FakeBackend, FakeGenerator, transcribed, video};
  use std::collections::HashSet;

  fn config_with_keys() -> Config {
    Config { openai_api_key: "sk".into(), assemblyai_api_key: "aai".into(), ..Config::default() }
  }

  fn ids(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
  }

  fn progress() -> (mpsc::UnboundedSender<BatchEvent>, mpsc::UnboundedReceiver<BatchEvent>) {
    mpsc::unbounded_channel()
  }

  // --- plan_transcription ---

  #[test]
  fn transcription_requires_selection() {
    let err = plan_transcription(&[], &[], &config_with_keys()).unwrap_err();
    assert_eq!(err, Precondition::EmptySelection);
  }

  #[test]
  fn transcription_requires_provider_key() {
    let config =
      Config { transcription_provider: Provider::AssemblyAi, openai_api_key: "sk".into(), ..Config::default() };
    let err = plan_transcription(&ids(&["a"]), &[], &config).unwrap_err();
    assert!(matches!(err, Precondition::MissingCredential { service: "AssemblyAI", .. }));
  }

  #[test]
  fn transcription_plan_keeps_selection_order() {
    let videos = vec![video("a", |_| {}), video("b", |_| {})];
    let plan = plan_transcription(&ids(&["b", "a", "gone"]), &videos, &config_with_keys()).unwrap();
    let titles: Vec<(&str, &str)> = plan.items.iter().map(|(id, title)| (id.as_str(), title.as_str())).collect();
    assert_eq!(titles, vec![("b", "Video b"), ("a", "Video a"), ("gone", "gone")]);
    assert_eq!(plan.credential.api_key, "sk");
  }

  #[test]
  fn transcribe_all_skips_transcribed_and_processing() {
    let videos = vec![
      video("done", transcribed),
      video("busy", |v| v.transcript_status = TranscriptStatus::Processing),
      video("fresh", |_| {}),
      video("failed", |v| v.transcript_status = TranscriptStatus::Failed),
      video("blank", |v| v.transcript = Some(String::new())),
    ];
    let plan = plan_transcribe_all(&videos, &config_with_keys()).unwrap();
    let ids: Vec<&str> = plan.items.iter().map(|(id, _)| id.as_str()).collect();
    assert_eq!(ids, vec!["fresh", "failed", "blank"]);
  }

  #[test]
  fn transcribe_all_with_nothing_left_is_refused() {
    let videos =
      vec![video("done", transcribed), video("busy", |v| v.transcript_status = TranscriptStatus::Processing)];
    assert_eq!(plan_transcribe_all(&videos, &config_with_keys()).unwrap_err(), Precondition::NothingToTranscribe);
  }

  #[test]
  fn transcribe_all_checks_key_first() {
    let err = plan_transcribe_all(&[], &Config::default()).unwrap_err();
    assert!(matches!(err, Precondition::MissingCredential { service: "OpenAI", .. }));
  }

  // --- plan_generation ---

  #[test]
  fn generation_requires_selection() {
    assert_eq!(plan_generation(&[], &[], &config_with_keys(), false).unwrap_err(), Precondition::EmptySelection);
  }

  #[test]
  fn generation_skips_untranscribed() {
    let videos = vec![video("A", transcribed), video("B", |_| {})];
    let plan = plan_generation(&ids(&["A", "B"]), &videos, &config_with_keys(), false).unwrap();
    assert_eq!(plan.videos.iter().map(|v| v.id.as_str()).collect::<Vec<_>>(), vec!["A"]);
    assert_eq!(plan.skipped, 1);
  }

  #[test]
  fn generation_without_transcripts_is_refused() {
    let videos = vec![video("A", |v| v.transcript_status = TranscriptStatus::Processing)];
    let err = plan_generation(&ids(&["A"]), &videos, &config_with_keys(), false).unwrap_err();
    assert_eq!(err, Precondition::NothingTranscribed);
  }

  #[test]
  fn generation_requires_llm_key_before_confirmation() {
    let videos = vec![video("A", |v| {
      transcribed(v);
      v.blog_created = true;
    })];
    let err = plan_generation(&ids(&["A"]), &videos, &Config::default(), false).unwrap_err();
    assert!(matches!(err, Precondition::MissingCredential { service: "OpenAI", .. }));
  }

  #[test]
  fn generation_over_existing_posts_needs_confirmation() {
    let videos = vec![
      video("A", |v| {
        transcribed(v);
        v.blog_created = true;
      }),
      video("B", transcribed),
    ];
    let selected = ids(&["A", "B"]);
    let err = plan_generation(&selected, &videos, &config_with_keys(), false).unwrap_err();
    assert_eq!(err, Precondition::ConfirmRegenerate { existing: 1, total: 2 });

    let plan = plan_generation(&selected, &videos, &config_with_keys(), true).unwrap();
    assert_eq!(plan.videos.len(), 2);
  }

  #[test]
  fn generation_plan_carries_system_prompt() {
    let videos = vec![video("A", transcribed)];
    let config = Config { blog_prompt: "P".into(), seo_rules: "R".into(), ..config_with_keys() };
    let plan = plan_generation(&ids(&["A"]), &videos, &config, false).unwrap();
    assert_eq!(plan.system_prompt, "P\n\nR");
  }

  // --- execution ---

  #[tokio::test]
  async fn generation_submits_only_transcribed_items() {
    let videos = vec![video("A", transcribed), video("B", |_| {})];
    let plan = plan_generation(&ids(&["A", "B"]), &videos, &config_with_keys(), false).unwrap();
    let backend = FakeBackend::default();
    let generator = FakeGenerator::default();
    let (tx, _rx) = progress();

    let report = run_generation(&backend, &generator, plan, &JobQueue::new(Duration::ZERO), &tx).await;

    let posts = backend.posts_created.lock().unwrap();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].video_id, "A");
    assert_eq!(posts[0].status, PostStatus::Draft);
    assert_eq!(posts[0].category, "YouTube");
    assert_eq!(posts[0].title, "Generated");
    assert_eq!(report.skipped, 1);
    assert_eq!(report.succeeded(), 1);
  }

  #[tokio::test]
  async fn one_failure_does_not_abort_the_batch() {
    let videos: Vec<VideoRecord> = ["1", "2", "3"].iter().map(|id| video(id, transcribed)).collect();
    let plan = plan_generation(&ids(&["1", "2", "3"]), &videos, &config_with_keys(), false).unwrap();
    let backend = FakeBackend::default();
    let generator = FakeGenerator { fail_for: HashSet::from(["2".to_string()]), ..Default::default() };
    let (tx, _rx) = progress();

    let report = run_generation(&backend, &generator, plan, &JobQueue::new(Duration::ZERO), &tx).await;

    assert_eq!((report.succeeded(), report.failed()), (2, 1));
    assert!(matches!(report.results[1].outcome, ItemOutcome::Failed(_)));
    assert_eq!(generator.prompts.lock().unwrap().len(), 3);
    assert_eq!(report.summary(), "2 blog post(s) created, 1 failed");
  }

  #[tokio::test]
  async fn rejected_post_counts_as_failure() {
    let videos = vec![video("a", transcribed), video("b", transcribed)];
    let plan = plan_generation(&ids(&["a", "b"]), &videos, &config_with_keys(), false).unwrap();
    let backend = FakeBackend { fail_post_for: HashSet::from(["b".to_string()]), ..Default::default() };
    let (tx, _rx) = progress();

    let report =
      run_generation(&backend, &FakeGenerator::default(), plan, &JobQueue::new(Duration::ZERO), &tx).await;
    assert_eq!(report.results[1], ItemResult {
      id: "b".into(),
      title: "Video b".into(),
      outcome: ItemOutcome::Failed("post for b rejected".into()),
    });
  }

  #[tokio::test]
  async fn transcription_submits_each_item_in_order() {
    let plan = plan_transcription(&ids(&["x", "y", "z"]), &[], &config_with_keys()).unwrap();
    let backend = FakeBackend { fail_transcribe: HashSet::from(["y".to_string()]), ..Default::default() };
    let (tx, mut rx) = progress();

    let report = run_transcription(&backend, plan, &JobQueue::new(Duration::ZERO), &tx).await;

    assert_eq!(*backend.transcribed.lock().unwrap(), vec!["x", "z"]);
    assert_eq!(report.summary(), "Transcription started for 2 video(s), 1 failed");
    let mut titles = Vec::new();
    while let Ok(BatchEvent::Progress { title, total, .. }) = rx.try_recv() {
      assert_eq!(total, 3);
      titles.push(title);
    }
    assert_eq!(titles, vec!["x", "y", "z"]);
  }

  #[tokio::test(start_paused = true)]
  async fn queue_waits_between_items_only() {
    let (tx, _rx) = progress();
    let jobs: Vec<Job<()>> = (0..3).map(|i| Job { id: i.to_string(), title: String::new(), input: () }).collect();
    let started = tokio::time::Instant::now();

    let results = JobQueue::new(Duration::from_secs(1))
      .run(BatchKind::Generation, jobs, &tx, |_| async { Ok::<(), anyhow::Error>(()) })
      .await;

    assert_eq!(results.len(), 3);
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_secs(2) && elapsed < Duration::from_secs(3), "elapsed {:?}", elapsed);
  }

  #[test]
  fn summary_mentions_skipped() {
    let report = BatchReport {
      kind: BatchKind::Generation,
      results: vec![ItemResult { id: "a".into(), title: "A".into(), outcome: ItemOutcome::Succeeded }],
      skipped: 2,
    };
    assert_eq!(report.summary(), "1 blog post(s) created (2 skipped without transcript)");
  }
}
