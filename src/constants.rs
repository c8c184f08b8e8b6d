//! Application constants loaded from `constants.ron` at compile time.
//!
//! The RON file is embedded via `include_str!` so it is always available:
//! no runtime file I/O. Parsed once on first access via `LazyLock`.

use serde::Deserialize;
use std::sync::LazyLock;
use std::time::Duration;

/// All tuneable application constants.
#[derive(Debug, Deserialize)]
pub struct Constants {
  // Endpoints
  pub api_url: String,
  pub youtube_api_url: String,
  pub completion_api_url: String,
  pub default_channel_handle: String,
  pub request_timeout_secs: u64,

  // Catalog
  pub short_form_max_secs: u64,
  pub poll_interval_secs: u64,

  // Channel paging
  pub page_size: u32,
  pub max_pages: usize,

  // Blog generation
  pub generation_delay_ms: u64,
  pub completion_model: String,
  pub completion_temperature: f32,
  pub completion_max_tokens: u32,

  // Status line
  pub error_timeout_secs: u64,

  pub default_blog_prompt: String,
  pub default_seo_rules: String,
}

impl Constants {
  pub fn poll_interval(&self) -> Duration {
    Duration::from_secs(self.poll_interval_secs)
  }

  pub fn generation_delay(&self) -> Duration {
    Duration::from_millis(self.generation_delay_ms)
  }

  pub fn request_timeout(&self) -> Duration {
    Duration::from_secs(self.request_timeout_secs)
  }
}

static CONSTANTS: LazyLock<Constants> = LazyLock::new(|| {
  // Safety: the RON file is embedded at compile time; if it's malformed this is a build-time error.
  ron::from_str(include_str!("../constants.ron")).expect("constants.ron must be valid RON (embedded at compile time)")
});

/// Returns a reference to the parsed application constants.
pub fn constants() -> &'static Constants {
  &CONSTANTS
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn embedded_constants_parse() {
    let c = constants();
    assert_eq!(c.short_form_max_secs, 60);
    assert_eq!(c.poll_interval(), Duration::from_secs(10));
    assert_eq!(c.page_size, 50);
    assert_eq!(c.max_pages, 10);
    assert_eq!(c.generation_delay(), Duration::from_secs(1));
  }

  #[test]
  fn default_prompt_uses_title_and_delimiter_format() {
    let prompt = &constants().default_blog_prompt;
    assert!(prompt.contains("TITLE:"));
    assert!(prompt.lines().any(|l| l.trim() == "---"));
  }
}
