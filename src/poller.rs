use std::time::Duration;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::catalog::VideoCatalog;
use crate::model::VideoRecord;

/// Fixed-interval tick source. Ticks carry no data; the receiver decides
/// whether a tick is worth a refresh.
#[derive(Default)]
pub struct StatusPoller {
  handle: Option<JoinHandle<()>>,
}

impl StatusPoller {
  /// Start ticking every `period`, first tick one period from now. Restarting
  /// replaces the previous timer. At most one tick is buffered.
  pub fn start(&mut self, period: Duration) -> mpsc::Receiver<()> {
    self.stop();
    let (tx, rx) = mpsc::channel(1);
    self.handle = Some(tokio::spawn(async move {
      let mut interval = tokio::time::interval_at(Instant::now() + period, period);
      interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
      loop {
        interval.tick().await;
        match tx.try_send(()) {
          Ok(()) | Err(TrySendError::Full(())) => {}
          Err(TrySendError::Closed(())) => break,
        }
      }
    }));
    info!(period_secs = period.as_secs(), "poller: started");
    rx
  }

  pub fn stop(&mut self) {
    if let Some(handle) = self.handle.take() {
      handle.abort();
      info!("poller: stopped");
    }
  }

  pub fn is_running(&self) -> bool {
    self.handle.as_ref().is_some_and(|h| !h.is_finished())
  }
}

impl Drop for StatusPoller {
  fn drop(&mut self) {
    self.stop();
  }
}

/// A tick refreshes only while something is processing and no poll refresh is already out.
pub fn should_refresh(catalog: &VideoCatalog, refresh_in_flight: bool) -> bool {
  !refresh_in_flight && catalog.any_processing()
}

/// Swap the open detail view for the catalog's copy when its pipeline state
/// changed. Returns whether the view was replaced.
pub fn reconcile(view: &mut VideoRecord, catalog: &VideoCatalog) -> bool {
  let Some(fresh) = catalog.find(&view.id) else { return false };
  if fresh.pipeline_state() == view.pipeline_state() {
    return false;
  }
  debug!(id = %view.id, "poller: detail view updated");
  *view = fresh.clone();
  true
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::catalog::Snapshot;
  use crate::model::{AudioStatus, Category, TranscriptStatus};
  use crate::testing::{transcribed, video};

  #[tokio::test(start_paused = true)]
  async fn ticks_after_each_period() {
    let mut poller = StatusPoller::default();
    let started = Instant::now();
    let mut rx = poller.start(Duration::from_secs(10));

    assert_eq!(rx.recv().await, Some(()));
    assert_eq!(started.elapsed(), Duration::from_secs(10));
    assert_eq!(rx.recv().await, Some(()));
    assert_eq!(started.elapsed(), Duration::from_secs(20));
    assert!(poller.is_running());
  }

  #[tokio::test(start_paused = true)]
  async fn unread_ticks_do_not_pile_up() {
    let mut poller = StatusPoller::default();
    let mut rx = poller.start(Duration::from_secs(10));

    tokio::time::sleep(Duration::from_secs(35)).await;

    assert!(rx.try_recv().is_ok());
    assert!(rx.try_recv().is_err());
  }

  #[tokio::test(start_paused = true)]
  async fn stop_closes_the_channel() {
    let mut poller = StatusPoller::default();
    let mut rx = poller.start(Duration::from_secs(10));
    poller.stop();

    assert_eq!(rx.recv().await, None);
    assert!(!poller.is_running());
  }

  #[test]
  fn refresh_only_while_processing() {
    let mut catalog = VideoCatalog::default();
    catalog.append(Category::LongForm, vec![video("a", transcribed)]);
    assert!(!should_refresh(&catalog, false));

    catalog.append(Category::LongForm, vec![video("b", |v| v.transcript_status = TranscriptStatus::Processing)]);
    assert!(should_refresh(&catalog, false));
    assert!(!should_refresh(&catalog, true));
  }

  #[test]
  fn reconcile_replaces_view_when_pipeline_moves() {
    let mut view = video("a", |v| v.transcript_status = TranscriptStatus::Processing);
    let mut catalog = VideoCatalog::default();
    catalog.apply_refresh(Ok(Snapshot { long_form: vec![video("a", transcribed)], short_form: Vec::new() }));

    assert!(reconcile(&mut view, &catalog));
    assert!(view.has_transcript());
    assert!(!reconcile(&mut view, &catalog));
  }

  #[test]
  fn reconcile_ignores_metadata_only_changes() {
    let mut view = video("a", |v| v.audio_status = AudioStatus::Processing);
    let mut catalog = VideoCatalog::default();
    catalog.apply_refresh(Ok(Snapshot {
      long_form: vec![video("a", |v| {
        v.audio_status = AudioStatus::Processing;
        v.title = "Renamed".into();
      })],
      short_form: Vec::new(),
    }));

    assert!(!reconcile(&mut view, &catalog));
    assert_eq!(view.title, "Video a");
  }

  #[test]
  fn reconcile_keeps_view_missing_from_catalog() {
    let mut view = video("gone", |_| {});
    assert!(!reconcile(&mut view, &VideoCatalog::default()));
  }
}
