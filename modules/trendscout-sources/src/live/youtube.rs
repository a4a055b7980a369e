use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::debug;

use trendscout_common::{Country, SignalItem, SourceType, TimeRange};

use super::{check_status, http_client, popularity_index, window_start, LiveFeed};
use crate::error::Result;

const BASE_URL: &str = "https://www.googleapis.com/youtube/v3";

/// YouTube Data API v3: search, then one statistics lookup for the hits.
pub struct YouTubeClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    max_results: u32,
}

impl YouTubeClient {
    pub fn new(api_key: impl Into<String>, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: http_client(timeout)?,
            api_key: api_key.into(),
            base_url: BASE_URL.to_string(),
            max_results: 10,
        })
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    async fn search(
        &self,
        keyword: &str,
        country: Country,
        range: TimeRange,
    ) -> Result<SearchResponse> {
        let max_results = self.max_results.to_string();
        let published_after = window_start(range, Utc::now());
        let mut query = vec![
            ("part", "snippet"),
            ("type", "video"),
            ("order", "viewCount"),
            ("q", keyword),
            ("maxResults", max_results.as_str()),
            ("publishedAfter", published_after.as_str()),
            ("key", self.api_key.as_str()),
        ];
        if let Some(region) = country.geo_code() {
            query.push(("regionCode", region));
        }
        let resp = self
            .client
            .get(format!("{}/search", self.base_url))
            .query(&query)
            .send()
            .await?;
        Ok(check_status(resp).await?.json().await?)
    }

    async fn statistics(&self, ids: &[&str]) -> Result<HashMap<String, Statistics>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let joined = ids.join(",");
        let resp = self
            .client
            .get(format!("{}/videos", self.base_url))
            .query(&[
                ("part", "statistics"),
                ("id", joined.as_str()),
                ("key", self.api_key.as_str()),
            ])
            .send()
            .await?;
        let videos: VideosResponse = check_status(resp).await?.json().await?;
        Ok(videos
            .items
            .into_iter()
            .map(|v| (v.id, v.statistics))
            .collect())
    }
}

#[async_trait]
impl LiveFeed for YouTubeClient {
    fn source_type(&self) -> SourceType {
        SourceType::VideoPlatform
    }

    async fn fetch(
        &self,
        keyword: &str,
        country: Country,
        range: TimeRange,
    ) -> Result<Vec<SignalItem>> {
        let search = self.search(keyword, country, range).await?;
        let ids: Vec<&str> = search
            .items
            .iter()
            .filter_map(|hit| hit.id.video_id.as_deref())
            .collect();
        let stats = self.statistics(&ids).await?;
        debug!(keyword, videos = ids.len(), "YouTube search");
        Ok(to_items(search, &stats))
    }
}

// --- Response shape ---

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    id: VideoRef,
    snippet: Snippet,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoRef {
    #[serde(default)]
    video_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Snippet {
    title: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    channel_title: Option<String>,
    #[serde(default)]
    published_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct VideosResponse {
    #[serde(default)]
    items: Vec<VideoStats>,
}

#[derive(Debug, Deserialize)]
struct VideoStats {
    id: String,
    #[serde(default)]
    statistics: Statistics,
}

// The API returns counts as decimal strings.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Statistics {
    #[serde(default)]
    view_count: Option<String>,
    #[serde(default)]
    comment_count: Option<String>,
}

fn count(raw: &Option<String>) -> u64 {
    raw.as_deref().and_then(|s| s.parse().ok()).unwrap_or(0)
}

fn to_items(search: SearchResponse, stats: &HashMap<String, Statistics>) -> Vec<SignalItem> {
    search
        .items
        .into_iter()
        .filter_map(|hit| {
            let id = hit.id.video_id?;
            let stat = stats.get(&id).cloned().unwrap_or_default();
            let views = count(&stat.view_count);
            let mut item = SignalItem::new(hit.snippet.title, popularity_index(views), SourceType::VideoPlatform)
                .with_url(format!("https://www.youtube.com/watch?v={id}"));
            item.description = hit.snippet.description.filter(|d| !d.is_empty());
            item.channel_title = hit.snippet.channel_title;
            item.published_at = hit.snippet.published_at;
            item.comments = Some(count(&stat.comment_count).min(u64::from(u32::MAX)) as u32);
            Some(item)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_search_hits_with_statistics() {
        let search: SearchResponse = serde_json::from_str(
            r#"{"items": [
                {"id": {"kind": "youtube#video", "videoId": "abc123"},
                 "snippet": {"title": "Top 5 fitness apps", "description": "", "channelTitle": "FitTube",
                             "publishedAt": "2025-02-20T10:00:00Z"}},
                {"id": {"kind": "youtube#channel", "channelId": "UCxyz"},
                 "snippet": {"title": "A channel", "channelTitle": "Someone"}}
            ]}"#,
        )
        .unwrap();
        let stats: VideosResponse = serde_json::from_str(
            r#"{"items": [{"id": "abc123", "statistics": {"viewCount": "99999", "commentCount": "321"}}]}"#,
        )
        .unwrap();
        let stats = stats.items.into_iter().map(|v| (v.id, v.statistics)).collect();

        let items = to_items(search, &stats);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].value, 100);
        assert_eq!(items[0].comments, Some(321));
        assert_eq!(items[0].channel_title.as_deref(), Some("FitTube"));
        assert_eq!(items[0].description, None);
        assert_eq!(
            items[0].url.as_deref(),
            Some("https://www.youtube.com/watch?v=abc123")
        );
    }

    #[test]
    fn missing_statistics_count_as_zero() {
        let search: SearchResponse = serde_json::from_str(
            r#"{"items": [{"id": {"videoId": "v1"}, "snippet": {"title": "Clip"}}]}"#,
        )
        .unwrap();
        let items = to_items(search, &HashMap::new());
        assert_eq!(items[0].value, 0);
        assert_eq!(items[0].comments, Some(0));
    }
}
