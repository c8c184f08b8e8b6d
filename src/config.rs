use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::constants::constants;
use crate::error::Precondition;

/// External transcription service the backend hands jobs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Provider {
  #[default]
  #[serde(rename = "openai")]
  OpenAi,
  #[serde(rename = "assemblyai")]
  AssemblyAi,
}

impl Provider {
  /// Wire name used by the backend.
  pub fn as_str(self) -> &'static str {
    match self {
      Provider::OpenAi => "openai",
      Provider::AssemblyAi => "assemblyai",
    }
  }

  pub fn label(self) -> &'static str {
    match self {
      Provider::OpenAi => "OpenAI Whisper",
      Provider::AssemblyAi => "AssemblyAI",
    }
  }

  pub fn from_config(s: &str) -> Option<Self> {
    match s.to_lowercase().as_str() {
      "openai" => Some(Provider::OpenAi),
      "assemblyai" => Some(Provider::AssemblyAi),
      _ => None,
    }
  }

  pub fn toggle(self) -> Self {
    match self {
      Provider::OpenAi => Provider::AssemblyAi,
      Provider::AssemblyAi => Provider::OpenAi,
    }
  }
}

/// Provider plus the key the backend forwards to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
  pub provider: Provider,
  pub api_key: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
  pub api_url: String,
  pub youtube_api_key: String,
  pub openai_api_key: String,
  pub assemblyai_api_key: String,
  pub channel_id: String,
  pub channel_handle: String,
  pub transcription_provider: Provider,
  pub blog_prompt: String,
  pub seo_rules: String,
  /// Where this config was read from; saves go back to the same file.
  #[serde(skip)]
  pub path: Option<PathBuf>,
  /// Backend URL given on the command line. Used for this run only, never saved.
  #[serde(skip)]
  pub api_url_override: Option<String>,
}

impl Default for Config {
  fn default() -> Self {
    let c = constants();
    Self {
      api_url: c.api_url.clone(),
      youtube_api_key: String::new(),
      openai_api_key: String::new(),
      assemblyai_api_key: String::new(),
      channel_id: String::new(),
      channel_handle: c.default_channel_handle.clone(),
      transcription_provider: Provider::default(),
      blog_prompt: c.default_blog_prompt.clone(),
      seo_rules: c.default_seo_rules.clone(),
      path: None,
      api_url_override: None,
    }
  }
}

impl Config {
  pub fn default_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "tubeblog").map(|dirs| dirs.config_dir().join("config.toml"))
  }

  pub fn load() -> Self {
    match Self::default_path() {
      Some(path) => Self::load_from(&path),
      None => Self::default(),
    }
  }

  /// Missing or unreadable files fall back to defaults; the path is remembered either way.
  pub fn load_from(path: &Path) -> Self {
    let mut config = match std::fs::read_to_string(path) {
      Ok(content) => match toml::from_str::<Config>(&content) {
        Ok(config) => config,
        Err(e) => {
          warn!(path = %path.display(), err = %e, "config: invalid file, using defaults");
          Self::default()
        }
      },
      Err(_) => Self::default(),
    };
    if config.blog_prompt.trim().is_empty() {
      config.blog_prompt = constants().default_blog_prompt.clone();
    }
    if config.seo_rules.trim().is_empty() {
      config.seo_rules = constants().default_seo_rules.clone();
    }
    config.path = Some(path.to_path_buf());
    config
  }

  pub fn save(&self) -> Result<()> {
    let Some(path) = self.path.clone().or_else(Self::default_path) else {
      return Ok(());
    };
    if let Some(dir) = path.parent() {
      std::fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;
    }
    let content = toml::to_string(self).context("Failed to serialize config")?;
    std::fs::write(&path, content).with_context(|| format!("Failed to write {}", path.display()))?;
    info!(path = %path.display(), "config: saved");
    Ok(())
  }

  /// Backend base URL in effect: the command-line override, else the file's.
  pub fn api_url(&self) -> &str {
    self.api_url_override.as_deref().unwrap_or(&self.api_url)
  }

  /// Human-readable location for error messages.
  pub fn display_path(&self) -> String {
    self
      .path
      .clone()
      .or_else(Self::default_path)
      .map(|p| p.display().to_string())
      .unwrap_or_else(|| "config.toml".to_string())
  }

  /// Key for the selected transcription provider.
  pub fn transcription_credential(&self) -> Result<Credential, Precondition> {
    let provider = self.transcription_provider;
    let (service, key) = match provider {
      Provider::OpenAi => ("OpenAI", &self.openai_api_key),
      Provider::AssemblyAi => ("AssemblyAI", &self.assemblyai_api_key),
    };
    if key.trim().is_empty() {
      return Err(Precondition::MissingCredential { service, config: self.display_path() });
    }
    Ok(Credential { provider, api_key: key.trim().to_string() })
  }

  /// Key for the text-generation API.
  pub fn completion_key(&self) -> Result<String, Precondition> {
    let key = self.openai_api_key.trim();
    if key.is_empty() {
      return Err(Precondition::MissingCredential { service: "OpenAI", config: self.display_path() });
    }
    Ok(key.to_string())
  }

  pub fn youtube_key(&self) -> Result<String, Precondition> {
    let key = self.youtube_api_key.trim();
    if key.is_empty() {
      return Err(Precondition::MissingCredential { service: "YouTube", config: self.display_path() });
    }
    Ok(key.to_string())
  }

  /// System prompt for blog generation: the post format followed by the SEO rules.
  pub fn blog_system_prompt(&self) -> String {
    format!("{}\n\n{}", self.blog_prompt.trim(), self.seo_rules.trim())
  }
}
