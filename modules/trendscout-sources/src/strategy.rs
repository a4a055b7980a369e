use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use tracing::{info, warn};

use trendscout_common::{Config, Country, SourceMode, SourceType, TimeRange};

use crate::adapter::{FetchOutcome, SourceAdapter};
use crate::live::{
    request_timeout, LiveFeed, ProductHuntClient, RedditClient, SerpApiTrendsClient, YouTubeClient,
};
use crate::synthetic::SyntheticProfile;

/// How one source produces its items.
#[derive(Clone)]
pub enum SourceStrategy {
    /// Call the provider; fall back to the synthetic series on failure.
    Live(Arc<dyn LiveFeed>),
    Synthetic,
}

impl std::fmt::Debug for SourceStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceStrategy::Live(feed) => write!(f, "Live({})", feed.source_type()),
            SourceStrategy::Synthetic => f.write_str("Synthetic"),
        }
    }
}

/// The production `SourceAdapter`: a profile plus a strategy.
#[derive(Debug, Clone)]
pub struct StrategySource {
    profile: SyntheticProfile,
    strategy: SourceStrategy,
}

impl StrategySource {
    pub fn synthetic(source_type: SourceType) -> Self {
        Self {
            profile: SyntheticProfile::for_source(source_type),
            strategy: SourceStrategy::Synthetic,
        }
    }

    pub fn live(feed: Arc<dyn LiveFeed>) -> Self {
        Self {
            profile: SyntheticProfile::for_source(feed.source_type()),
            strategy: SourceStrategy::Live(feed),
        }
    }

    pub fn with_synthetic_count(mut self, count: usize) -> Self {
        self.profile = self.profile.with_count(count);
        self
    }

    pub fn strategy(&self) -> &SourceStrategy {
        &self.strategy
    }
}

#[async_trait]
impl SourceAdapter for StrategySource {
    fn source_type(&self) -> SourceType {
        self.profile.source_type
    }

    async fn fetch(
        &self,
        keyword: &str,
        country: Country,
        range: TimeRange,
    ) -> Result<FetchOutcome> {
        match &self.strategy {
            SourceStrategy::Synthetic => Ok(FetchOutcome::items(
                self.profile.generate(keyword, country, range, Utc::now()),
            )),
            SourceStrategy::Live(feed) => match feed.fetch(keyword, country, range).await {
                Ok(items) => Ok(FetchOutcome::items(items)),
                Err(e) => {
                    warn!(
                        source = %self.profile.source_type,
                        keyword,
                        error = %e,
                        "Live provider failed, using synthetic series"
                    );
                    Ok(FetchOutcome::degraded(
                        self.profile.generate(keyword, country, range, Utc::now()),
                        e.to_string(),
                    ))
                }
            },
        }
    }
}

/// One adapter per source. In live mode a source goes live only when its
/// provider is configured; the rest stay synthetic.
pub fn sources_from_config(config: &Config) -> Result<Vec<Arc<dyn SourceAdapter>>> {
    let mut sources: Vec<Arc<dyn SourceAdapter>> = Vec::with_capacity(SourceType::ALL.len());

    for source_type in SourceType::ALL {
        let feed = match config.source_mode {
            SourceMode::Synthetic => None,
            SourceMode::Live => live_feed(config, source_type)?,
        };
        let adapter = match feed {
            Some(feed) => StrategySource::live(feed),
            None => StrategySource::synthetic(source_type),
        }
        .with_synthetic_count(config.synthetic_items);

        info!(source = %source_type, strategy = ?adapter.strategy(), "Source configured");
        sources.push(Arc::new(adapter));
    }

    Ok(sources)
}

fn live_feed(config: &Config, source_type: SourceType) -> Result<Option<Arc<dyn LiveFeed>>> {
    let timeout = request_timeout(config.source_timeout);
    let feed: Option<Arc<dyn LiveFeed>> = match source_type {
        SourceType::SearchVolume => match &config.serpapi_api_key {
            Some(key) => Some(Arc::new(SerpApiTrendsClient::new(key.clone(), timeout)?)),
            None => None,
        },
        SourceType::ForumMentions if config.reddit_live => Some(Arc::new(RedditClient::new(timeout)?)),
        SourceType::ForumMentions => None,
        SourceType::LaunchBoard => match &config.producthunt_token {
            Some(token) => Some(Arc::new(ProductHuntClient::new(token.clone(), timeout)?)),
            None => None,
        },
        SourceType::VideoPlatform => match &config.youtube_api_key {
            Some(key) => Some(Arc::new(YouTubeClient::new(key.clone(), timeout)?)),
            None => None,
        },
    };
    Ok(feed)
}
