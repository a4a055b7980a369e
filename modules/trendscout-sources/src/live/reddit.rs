use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::debug;

use trendscout_common::{Country, SignalItem, SourceType, TimeRange};

use super::{check_status, http_client, popularity_index, LiveFeed};
use crate::error::Result;

const BASE_URL: &str = "https://www.reddit.com";

/// Public Reddit search (no auth), top posts within the requested window.
pub struct RedditClient {
    client: reqwest::Client,
    base_url: String,
    limit: u32,
}

impl RedditClient {
    pub fn new(timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: http_client(timeout)?,
            base_url: BASE_URL.to_string(),
            limit: 10,
        })
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }
}

/// Reddit's `t` filter. It has no quarter, so 90d widens to a year.
fn time_filter(range: TimeRange) -> &'static str {
    match range {
        TimeRange::Week => "week",
        TimeRange::Month => "month",
        TimeRange::Quarter => "year",
    }
}

#[async_trait]
impl LiveFeed for RedditClient {
    fn source_type(&self) -> SourceType {
        SourceType::ForumMentions
    }

    // Reddit search is global; country does not narrow it.
    async fn fetch(
        &self,
        keyword: &str,
        _country: Country,
        range: TimeRange,
    ) -> Result<Vec<SignalItem>> {
        let url = format!("{}/search.json", self.base_url);
        let limit = self.limit.to_string();
        let resp = self
            .client
            .get(&url)
            .query(&[
                ("q", keyword),
                ("sort", "top"),
                ("t", time_filter(range)),
                ("limit", limit.as_str()),
            ])
            .send()
            .await?;
        let listing: Listing = check_status(resp).await?.json().await?;
        debug!(keyword, posts = listing.data.children.len(), "Reddit search");
        Ok(to_items(&self.base_url, listing))
    }
}

// --- Response shape ---

#[derive(Debug, Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    #[serde(default)]
    children: Vec<Child>,
}

#[derive(Debug, Deserialize)]
struct Child {
    data: Post,
}

#[derive(Debug, Deserialize)]
struct Post {
    title: String,
    #[serde(default)]
    subreddit: String,
    #[serde(default)]
    score: i64,
    #[serde(default)]
    num_comments: u32,
    #[serde(default)]
    permalink: String,
    #[serde(default)]
    created_utc: f64,
}

fn to_items(base_url: &str, listing: Listing) -> Vec<SignalItem> {
    listing
        .data
        .children
        .into_iter()
        .map(|child| {
            let post = child.data;
            let engagement = post.score.max(0) as u64 + u64::from(post.num_comments);
            let mut item = SignalItem::new(post.title, popularity_index(engagement), SourceType::ForumMentions)
                .with_description(format!(
                    "r/{}: {} upvotes, {} comments",
                    post.subreddit, post.score, post.num_comments
                ))
                .with_url(format!("{base_url}{}", post.permalink));
            item.published_at = DateTime::<Utc>::from_timestamp(post.created_utc as i64, 0);
            item.comments = Some(post.num_comments);
            item
        })
        .collect()
}
