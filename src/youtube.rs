use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;
use tracing::debug;

use crate::constants::constants;
use crate::model::{Category, ImportedVideo};

/// One page of a channel's uploads.
#[derive(Debug, Clone, Default)]
pub struct VideoPage {
  pub videos: Vec<ImportedVideo>,
  pub next_page_token: Option<String>,
}

/// Paginated listing of a channel's videos.
#[async_trait]
pub trait VideoSource: Send + Sync {
  /// Look up the channel id for a handle such as `@name`.
  async fn resolve_channel_id(&self, handle: &str) -> Result<String>;
  async fn fetch_page(&self, channel_id: &str, page_token: Option<&str>) -> Result<VideoPage>;
}

/// YouTube Data API v3 client.
pub struct YouTubeClient {
  client: Client,
  base_url: String,
  api_key: String,
}

// --- Wire types ---

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchResponse {
  #[serde(default)]
  items: Vec<SearchItem>,
  next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
  #[serde(default)]
  id: SearchId,
  snippet: Snippet,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchId {
  video_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Snippet {
  #[serde(default)]
  title: String,
  #[serde(default)]
  description: String,
  #[serde(default)]
  channel_id: String,
  #[serde(default)]
  published_at: String,
  #[serde(default)]
  thumbnails: Thumbnails,
}

#[derive(Debug, Default, Deserialize)]
struct Thumbnails {
  high: Option<Thumbnail>,
  medium: Option<Thumbnail>,
  default: Option<Thumbnail>,
}

#[derive(Debug, Deserialize)]
struct Thumbnail {
  url: String,
}

#[derive(Debug, Deserialize)]
struct DetailsResponse {
  #[serde(default)]
  items: Vec<DetailsItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DetailsItem {
  id: String,
  content_details: Option<ContentDetails>,
  statistics: Option<Statistics>,
}

#[derive(Debug, Deserialize)]
struct ContentDetails {
  duration: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Statistics {
  view_count: Option<String>,
}

// --- Helpers ---

/// Parse an ISO-8601 duration (`PT1H2M3S`, `P1DT5M`) into seconds.
/// Unparseable input yields 0.
pub fn parse_iso8601_duration(raw: &str) -> u64 {
  let Some(rest) = raw.trim().strip_prefix('P') else { return 0 };
  let mut total = 0u64;
  let mut number = 0u64;
  let mut in_time = false;
  for c in rest.chars() {
    match c {
      '0'..='9' => number = number.saturating_mul(10).saturating_add(u64::from(c as u8 - b'0')),
      'T' => in_time = true,
      'D' if !in_time => {
        total = total.saturating_add(number.saturating_mul(86_400));
        number = 0;
      }
      'H' if in_time => {
        total = total.saturating_add(number.saturating_mul(3_600));
        number = 0;
      }
      'M' if in_time => {
        total = total.saturating_add(number.saturating_mul(60));
        number = 0;
      }
      'S' if in_time => {
        total = total.saturating_add(number);
        number = 0;
      }
      _ => return 0,
    }
  }
  total
}

impl Thumbnails {
  fn best(self) -> Option<String> {
    self.high.or(self.medium).or(self.default).map(|t| t.url)
  }
}

impl YouTubeClient {
  pub fn new(client: Client, api_key: &str) -> Self {
    Self::with_base_url(client, &constants().youtube_api_url, api_key)
  }

  pub fn with_base_url(client: Client, base_url: &str, api_key: &str) -> Self {
    Self { client, base_url: base_url.trim_end_matches('/').to_string(), api_key: api_key.to_string() }
  }

  fn endpoint(&self, path: &str, params: &[(&str, &str)]) -> Result<Url> {
    let base = format!("{}/{}", self.base_url, path);
    let mut url = Url::parse_with_params(&base, params).with_context(|| format!("Invalid URL {}", base))?;
    url.query_pairs_mut().append_pair("key", &self.api_key);
    Ok(url)
  }

  async fn get_json<T: for<'de> Deserialize<'de>>(&self, url: Url, what: &str) -> Result<T> {
    let response = self.client.get(url).send().await.with_context(|| format!("Failed to fetch {}", what))?;
    let status = response.status();
    if !status.is_success() {
      let body = response.text().await.unwrap_or_default();
      return Err(anyhow!("YouTube {} failed ({}): {}", what, status, body.trim()));
    }
    response.json::<T>().await.with_context(|| format!("Failed to decode YouTube {}", what))
  }
}

#[async_trait]
impl VideoSource for YouTubeClient {
  async fn resolve_channel_id(&self, handle: &str) -> Result<String> {
    let url = self.endpoint("search", &[("part", "snippet"), ("type", "channel"), ("q", handle)])?;
    let response: SearchResponse = self.get_json(url, "channel search").await?;
    response
      .items
      .into_iter()
      .map(|item| item.snippet.channel_id)
      .find(|id| !id.is_empty())
      .ok_or_else(|| anyhow!("No channel found for {}", handle))
  }

  async fn fetch_page(&self, channel_id: &str, page_token: Option<&str>) -> Result<VideoPage> {
    let max_results = constants().page_size.to_string();
    let mut params = vec![
      ("part", "snippet"),
      ("channelId", channel_id),
      ("maxResults", max_results.as_str()),
      ("order", "date"),
      ("type", "video"),
    ];
    if let Some(token) = page_token {
      params.push(("pageToken", token));
    }
    let search: SearchResponse = self.get_json(self.endpoint("search", &params)?, "search").await?;
    debug!(channel_id, items = search.items.len(), has_next = search.next_page_token.is_some(), "youtube: page");

    let entries: Vec<(String, Snippet)> =
      search.items.into_iter().filter_map(|item| item.id.video_id.map(|id| (id, item.snippet))).collect();
    if entries.is_empty() {
      return Ok(VideoPage { videos: Vec::new(), next_page_token: search.next_page_token });
    }

    let ids = entries.iter().map(|(id, _)| id.as_str()).collect::<Vec<_>>().join(",");
    let details_url = self.endpoint("videos", &[("part", "contentDetails,statistics"), ("id", ids.as_str())])?;
    let details: DetailsResponse = self.get_json(details_url, "video details").await?;

    let videos = entries
      .into_iter()
      .map(|(id, snippet)| {
        let detail = details.items.iter().find(|d| d.id == id);
        let duration = detail
          .and_then(|d| d.content_details.as_ref())
          .and_then(|c| c.duration.as_deref())
          .map(parse_iso8601_duration)
          .unwrap_or(0);
        let view_count = detail
          .and_then(|d| d.statistics.as_ref())
          .and_then(|s| s.view_count.as_deref())
          .and_then(|v| v.parse().ok())
          .unwrap_or(0);
        ImportedVideo {
          id,
          title: snippet.title,
          description: snippet.description,
          thumbnail: snippet.thumbnails.best(),
          duration,
          view_count,
          published_at: snippet.published_at,
          channel_id: channel_id.to_string(),
          kind: Category::from_duration(duration).api_type(),
        }
      })
      .collect();

    Ok(VideoPage { videos, next_page_token: search.next_page_token })
  }
}
