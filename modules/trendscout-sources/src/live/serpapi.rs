use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::debug;

use trendscout_common::{title_case, Country, SignalItem, SourceType, TimeRange};

use super::{check_status, http_client, LiveFeed};
use crate::error::{Result, SourceError};

const BASE_URL: &str = "https://serpapi.com/search.json";

/// Google Trends interest-over-time through SerpApi.
pub struct SerpApiTrendsClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl SerpApiTrendsClient {
    pub fn new(api_key: impl Into<String>, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: http_client(timeout)?,
            api_key: api_key.into(),
            base_url: BASE_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }
}

/// Google Trends `date` parameter for a window.
fn trends_window(range: TimeRange) -> &'static str {
    match range {
        TimeRange::Week => "now 7-d",
        TimeRange::Month => "today 1-m",
        TimeRange::Quarter => "today 3-m",
    }
}

#[async_trait]
impl LiveFeed for SerpApiTrendsClient {
    fn source_type(&self) -> SourceType {
        SourceType::SearchVolume
    }

    async fn fetch(
        &self,
        keyword: &str,
        country: Country,
        range: TimeRange,
    ) -> Result<Vec<SignalItem>> {
        let mut query = vec![
            ("engine", "google_trends"),
            ("data_type", "TIMESERIES"),
            ("q", keyword),
            ("date", trends_window(range)),
            ("api_key", self.api_key.as_str()),
        ];
        if let Some(geo) = country.geo_code() {
            query.push(("geo", geo));
        }

        let resp = self.client.get(&self.base_url).query(&query).send().await?;
        let body: TrendsResponse = check_status(resp).await?.json().await?;
        debug!(keyword, points = body.interest_over_time.timeline_data.len(), "SerpApi trends");
        parse_timeline(keyword, body)
    }
}

// --- Response shape ---

#[derive(Debug, Deserialize)]
struct TrendsResponse {
    #[serde(default)]
    interest_over_time: InterestOverTime,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct InterestOverTime {
    #[serde(default)]
    timeline_data: Vec<TimelinePoint>,
}

#[derive(Debug, Deserialize)]
struct TimelinePoint {
    date: String,
    timestamp: String,
    #[serde(default)]
    values: Vec<TimelineValue>,
}

#[derive(Debug, Deserialize)]
struct TimelineValue {
    #[serde(default)]
    extracted_value: i64,
}

/// Newest point first, matching the synthetic series.
fn parse_timeline(keyword: &str, body: TrendsResponse) -> Result<Vec<SignalItem>> {
    if let Some(error) = body.error {
        return Err(SourceError::Parse(error));
    }
    let display = title_case(keyword);

    let mut items = body
        .interest_over_time
        .timeline_data
        .into_iter()
        .map(|point| {
            let value = point.values.first().map(|v| v.extracted_value).unwrap_or(0);
            let published = point
                .timestamp
                .parse::<i64>()
                .ok()
                .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0));
            let mut item = SignalItem::new(
                format!("{display} google {}", point.date),
                value.clamp(0, 100),
                SourceType::SearchVolume,
            )
            .with_description(format!("Search interest for {display} on {}.", point.date));
            item.published_at = published;
            item
        })
        .collect::<Vec<_>>();
    items.reverse();
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_timeline_newest_first() {
        let body: TrendsResponse = serde_json::from_str(
            r#"{
                "interest_over_time": {
                    "timeline_data": [
                        {"date": "Mar 1, 2025", "timestamp": "1740787200", "values": [{"query": "yoga", "value": "40", "extracted_value": 40}]},
                        {"date": "Mar 2, 2025", "timestamp": "1740873600", "values": [{"query": "yoga", "value": "55", "extracted_value": 55}]}
                    ]
                }
            }"#,
        )
        .unwrap();
        let items = parse_timeline("yoga", body).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].value, 55);
        assert_eq!(items[0].name, "Yoga google Mar 2, 2025");
        assert!(items[0].published_at > items[1].published_at);
    }

    #[test]
    fn windows_follow_the_range() {
        assert_eq!(trends_window(TimeRange::Week), "now 7-d");
        assert_eq!(trends_window(TimeRange::Month), "today 1-m");
        assert_eq!(trends_window(TimeRange::Quarter), "today 3-m");
    }

    #[test]
    fn provider_error_field_is_an_error() {
        let body: TrendsResponse =
            serde_json::from_str(r#"{"error": "Invalid API key."}"#).unwrap();
        assert!(matches!(parse_timeline("yoga", body), Err(SourceError::Parse(_))));
    }
}
