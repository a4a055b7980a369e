//! Live provider clients.
//!
//! Each client maps a provider response onto `SignalItem`s with a 0–100
//! `value`. Providers that report raw counts (upvotes, views, votes) are
//! squashed onto that scale with [`popularity_index`].

mod producthunt;
mod reddit;
mod serpapi;
mod youtube;

pub use producthunt::ProductHuntClient;
pub use reddit::RedditClient;
pub use serpapi::SerpApiTrendsClient;
pub use youtube::YouTubeClient;

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};

use trendscout_common::{Country, SignalItem, SourceType, TimeRange};

use crate::error::{Result, SourceError};

#[async_trait]
pub trait LiveFeed: Send + Sync {
    fn source_type(&self) -> SourceType;

    async fn fetch(
        &self,
        keyword: &str,
        country: Country,
        range: TimeRange,
    ) -> Result<Vec<SignalItem>>;
}

const USER_AGENT: &str = concat!("trendscout/", env!("CARGO_PKG_VERSION"));

/// Headroom left under the aggregator deadline for the synthetic fallback.
const FALLBACK_MARGIN: Duration = Duration::from_secs(1);

/// Provider request timeout for a given aggregator deadline. Always strictly
/// shorter, so a hung provider still degrades to synthetic items in time.
pub fn request_timeout(deadline: Duration) -> Duration {
    deadline.saturating_sub(FALLBACK_MARGIN).max(deadline / 2)
}

/// Shared HTTP client for provider calls.
pub(crate) fn http_client(timeout: Duration) -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()?)
}

/// Map a raw engagement count onto 0–100 on a log scale (10 → 20, 1k → 60, 100k → 100).
pub fn popularity_index(count: u64) -> i64 {
    let scaled = ((count as f64) + 1.0).log10() * 20.0;
    scaled.round().clamp(0.0, 100.0) as i64
}

/// Start of the trailing window, as the RFC 3339 timestamp providers expect.
pub(crate) fn window_start(range: TimeRange, now: DateTime<Utc>) -> String {
    (now - chrono::Duration::days(range.days())).to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Turn a non-2xx response into `SourceError::Api`.
pub(crate) async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let message = resp.text().await.unwrap_or_default();
    Err(SourceError::Api {
        status: status.as_u16(),
        message,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn popularity_index_is_log_scaled_and_capped() {
        assert_eq!(popularity_index(0), 0);
        assert_eq!(popularity_index(9), 20);
        assert_eq!(popularity_index(999), 60);
        assert_eq!(popularity_index(99_999), 100);
        assert_eq!(popularity_index(u64::MAX), 100);
    }

    #[test]
    fn window_start_counts_back_from_now() {
        let now = "2025-03-10T12:00:00Z".parse().unwrap();
        assert_eq!(window_start(TimeRange::Week, now), "2025-03-03T12:00:00Z");
        assert_eq!(window_start(TimeRange::Quarter, now), "2024-12-10T12:00:00Z");
    }

    #[test]
    fn request_timeout_stays_under_the_deadline() {
        assert_eq!(request_timeout(Duration::from_secs(5)), Duration::from_secs(4));
        assert_eq!(request_timeout(Duration::from_millis(1_200)), Duration::from_millis(600));
        for ms in [1, 10, 999, 1_000, 5_000, 60_000] {
            let deadline = Duration::from_millis(ms);
            assert!(request_timeout(deadline) < deadline, "{ms}ms");
        }
    }
}
