use thiserror::Error;

/// Conditions checked before an operation touches the network.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Precondition {
  #[error("Select at least one video.")]
  EmptySelection,

  #[error("{service} API key required. Add it to {config}.")]
  MissingCredential { service: &'static str, config: String },

  #[error("None of the selected videos has a transcript. Transcribe them first.")]
  NothingTranscribed,

  #[error("{existing} of {total} selected videos already have a blog post. Generate again?")]
  ConfirmRegenerate { existing: usize, total: usize },

  #[error("No videos left to transcribe.")]
  NothingToTranscribe,

  #[error("Generate a post preview first.")]
  NoPreview,

  #[error("A batch is already running.")]
  BatchInProgress,
}
