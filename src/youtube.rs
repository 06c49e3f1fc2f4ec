//! YouTube Data API v3 client
//!
//! Three calls are used: video search (the expensive, quota-tracked one),
//! bulk channel lookup, and the newest item of an uploads playlist. The
//! pipeline only sees the [`ChannelSource`] trait, so tests swap in fakes.

use crate::config::HttpConfig;
use crate::error::{ApiError, ApiResult};
use crate::types::{ChannelRecord, SearchPage, SearchQuery};
use reqwest::blocking::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

pub const API_BASE: &str = "https://www.googleapis.com/youtube/v3";

/// The upstream search and metadata service.
pub trait ChannelSource {
    /// One page of recent videos matching `query`; yields their channel ids.
    fn search_page(&self, query: &SearchQuery, page_token: Option<&str>) -> ApiResult<SearchPage>;

    /// Metadata for up to one batch of channel ids. Unknown ids are omitted.
    fn channels(&self, ids: &[String]) -> ApiResult<Vec<ChannelRecord>>;

    /// Raw `publishedAt` of the newest item in an uploads playlist, if any.
    fn latest_upload(&self, playlist_id: &str) -> ApiResult<Option<String>>;
}

pub struct YouTubeClient {
    http: Client,
    api_key: String,
    base_url: String,
}

impl YouTubeClient {
    pub fn new(api_key: String, config: &HttpConfig) -> ApiResult<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            api_key,
            base_url: API_BASE.to_string(),
        })
    }

    fn get<T: DeserializeOwned>(&self, endpoint: &str, params: &[(&str, String)]) -> ApiResult<T> {
        let url = format!("{}/{}", self.base_url.trim_end_matches('/'), endpoint);
        let resp = self
            .http
            .get(&url)
            .query(params)
            .query(&[("key", self.api_key.as_str())])
            .send()?;

        let status = resp.status();
        let body = resp.text()?;
        if !status.is_success() {
            return Err(ApiError::from_response(status.as_u16(), &body));
        }
        Ok(serde_json::from_str(&body)?)
    }
}

impl ChannelSource for YouTubeClient {
    fn search_page(&self, query: &SearchQuery, page_token: Option<&str>) -> ApiResult<SearchPage> {
        let mut params = vec![
            ("part", "snippet".to_string()),
            ("q", query.keyword.clone()),
            ("type", "video".to_string()),
            ("order", "date".to_string()),
            ("regionCode", query.region.clone()),
            ("relevanceLanguage", query.relevance_language.clone()),
            ("maxResults", query.page_size.to_string()),
            (
                "publishedAfter",
                query.published_after.format("%Y-%m-%dT%H:%M:%SZ").to_string(),
            ),
        ];
        if let Some(token) = page_token {
            params.push(("pageToken", token.to_string()));
        }
        debug!(keyword = %query.keyword, region = %query.region, page_token, "search.list");
        let resp: SearchListResponse = self.get("search", &params)?;
        Ok(resp.into())
    }

    fn channels(&self, ids: &[String]) -> ApiResult<Vec<ChannelRecord>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }
        let params = [
            ("part", "snippet,statistics,contentDetails".to_string()),
            ("id", ids.join(",")),
            ("maxResults", ids.len().to_string()),
        ];
        debug!(batch = ids.len(), "channels.list");
        let resp: ChannelListResponse = self.get("channels", &params)?;
        Ok(resp.items.into_iter().map(ChannelRecord::from).collect())
    }

    fn latest_upload(&self, playlist_id: &str) -> ApiResult<Option<String>> {
        let params = [
            ("part", "snippet".to_string()),
            ("playlistId", playlist_id.to_string()),
            ("maxResults", "1".to_string()),
        ];
        match self.get::<PlaylistItemListResponse>("playlistItems", &params) {
            Ok(resp) => Ok(resp.newest_published_at()),
            // Deleted or private uploads playlists answer 404
            Err(ApiError::Api { status: 404, .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

// --- wire types ---

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchListResponse {
    #[serde(default)]
    items: Vec<SearchResult>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    snippet: Option<SearchSnippet>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchSnippet {
    channel_id: Option<String>,
}

impl From<SearchListResponse> for SearchPage {
    fn from(resp: SearchListResponse) -> Self {
        let channel_ids = resp
            .items
            .into_iter()
            .filter_map(|item| item.snippet.and_then(|s| s.channel_id))
            .filter(|id| !id.is_empty())
            .collect();
        SearchPage {
            channel_ids,
            next_page_token: resp.next_page_token.filter(|t| !t.is_empty()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChannelListResponse {
    #[serde(default)]
    items: Vec<ChannelResource>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChannelResource {
    #[serde(default)]
    id: String,
    #[serde(default)]
    snippet: ChannelSnippet,
    #[serde(default)]
    statistics: ChannelStatistics,
    #[serde(default)]
    content_details: ContentDetails,
}

#[derive(Debug, Default, Deserialize)]
struct ChannelSnippet {
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
    country: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChannelStatistics {
    subscriber_count: Option<String>,
    #[serde(default)]
    hidden_subscriber_count: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ContentDetails {
    #[serde(default)]
    related_playlists: RelatedPlaylists,
}

#[derive(Debug, Default, Deserialize)]
struct RelatedPlaylists {
    uploads: Option<String>,
}

impl From<ChannelResource> for ChannelRecord {
    fn from(res: ChannelResource) -> Self {
        let subscriber_count = if res.statistics.hidden_subscriber_count {
            None
        } else {
            res.statistics.subscriber_count
        };
        ChannelRecord {
            id: res.id,
            title: res.snippet.title,
            description: res.snippet.description,
            country: res.snippet.country.filter(|c| !c.trim().is_empty()),
            subscriber_count,
            uploads_playlist: res
                .content_details
                .related_playlists
                .uploads
                .filter(|p| !p.is_empty()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct PlaylistItemListResponse {
    #[serde(default)]
    items: Vec<PlaylistItem>,
}

#[derive(Debug, Deserialize)]
struct PlaylistItem {
    snippet: Option<PlaylistSnippet>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistSnippet {
    published_at: Option<String>,
}

impl PlaylistItemListResponse {
    fn newest_published_at(self) -> Option<String> {
        self.items
            .into_iter()
            .next()
            .and_then(|item| item.snippet)
            .and_then(|s| s.published_at)
    }
}
