use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use trendscout_common::{Country, SignalItem, SourceType, TimeRange};

use super::{check_status, http_client, popularity_index, window_start, LiveFeed};
use crate::error::{Result, SourceError};

const GRAPHQL_URL: &str = "https://api.producthunt.com/v2/api/graphql";

const POSTS_QUERY: &str = r#"
query TopicPosts($topic: String!, $first: Int!, $postedAfter: DateTime) {
  posts(topic: $topic, order: VOTES, first: $first, postedAfter: $postedAfter) {
    edges {
      node { name tagline url votesCount commentsCount createdAt }
    }
  }
}
"#;

/// Product Hunt GraphQL v2, posts filed under the keyword's topic slug
/// and launched inside the window.
pub struct ProductHuntClient {
    client: reqwest::Client,
    token: String,
    url: String,
    first: u32,
}

impl ProductHuntClient {
    pub fn new(token: impl Into<String>, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: http_client(timeout)?,
            token: token.into(),
            url: GRAPHQL_URL.to_string(),
            first: 10,
        })
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }
}

/// "AI Writing Tools" → "ai-writing-tools".
fn topic_slug(keyword: &str) -> String {
    keyword
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("-")
}

#[async_trait]
impl LiveFeed for ProductHuntClient {
    fn source_type(&self) -> SourceType {
        SourceType::LaunchBoard
    }

    async fn fetch(
        &self,
        keyword: &str,
        _country: Country,
        range: TimeRange,
    ) -> Result<Vec<SignalItem>> {
        let body = json!({
            "query": POSTS_QUERY,
            "variables": {
                "topic": topic_slug(keyword),
                "first": self.first,
                "postedAfter": window_start(range, Utc::now()),
            },
        });
        let resp = self
            .client
            .post(&self.url)
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await?;
        let gql: GraphQlResponse = check_status(resp).await?.json().await?;
        let items = to_items(gql)?;
        debug!(keyword, posts = items.len(), "Product Hunt posts");
        Ok(items)
    }
}

// --- Response shape ---

#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    data: Option<PostsData>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct PostsData {
    posts: Connection,
}

#[derive(Debug, Deserialize)]
struct Connection {
    #[serde(default)]
    edges: Vec<Edge>,
}

#[derive(Debug, Deserialize)]
struct Edge {
    node: PostNode,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PostNode {
    name: String,
    #[serde(default)]
    tagline: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    votes_count: u64,
    #[serde(default)]
    comments_count: u32,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
}

fn to_items(gql: GraphQlResponse) -> Result<Vec<SignalItem>> {
    if let Some(first) = gql.errors.first() {
        return Err(SourceError::Parse(first.message.clone()));
    }
    let data = gql
        .data
        .ok_or_else(|| SourceError::Parse("missing data".to_string()))?;

    Ok(data
        .posts
        .edges
        .into_iter()
        .map(|edge| {
            let node = edge.node;
            let mut item = SignalItem::new(node.name, popularity_index(node.votes_count), SourceType::LaunchBoard);
            item.description = node.tagline;
            item.url = node.url;
            item.published_at = node.created_at;
            item.comments = Some(node.comments_count);
            item
        })
        .collect())
}
