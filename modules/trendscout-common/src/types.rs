use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

// --- Request parameters ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Country {
    #[default]
    #[serde(rename = "US")]
    Us,
    #[serde(rename = "FR")]
    Fr,
    #[serde(rename = "GB")]
    Gb,
    #[serde(rename = "DE")]
    De,
    #[serde(rename = "CA")]
    Ca,
    #[serde(rename = "AU")]
    Au,
    #[serde(rename = "global")]
    Global,
}

impl Country {
    pub const ALL: [Country; 7] = [
        Country::Us,
        Country::Fr,
        Country::Gb,
        Country::De,
        Country::Ca,
        Country::Au,
        Country::Global,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Country::Us => "US",
            Country::Fr => "FR",
            Country::Gb => "GB",
            Country::De => "DE",
            Country::Ca => "CA",
            Country::Au => "AU",
            Country::Global => "global",
        }
    }

    /// Exact-match parse; country codes are case-sensitive on the wire.
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == s)
    }

    /// Two-letter geo code for providers, `None` for worldwide.
    pub fn geo_code(&self) -> Option<&'static str> {
        match self {
            Country::Global => None,
            other => Some(other.as_str()),
        }
    }
}

impl std::fmt::Display for Country {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TimeRange {
    #[serde(rename = "7d")]
    Week,
    #[default]
    #[serde(rename = "30d")]
    Month,
    #[serde(rename = "90d")]
    Quarter,
}

impl TimeRange {
    pub const ALL: [TimeRange; 3] = [TimeRange::Week, TimeRange::Month, TimeRange::Quarter];

    pub fn as_str(&self) -> &'static str {
        match self {
            TimeRange::Week => "7d",
            TimeRange::Month => "30d",
            TimeRange::Quarter => "90d",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|r| r.as_str() == s)
    }

    pub fn days(&self) -> i64 {
        match self {
            TimeRange::Week => 7,
            TimeRange::Month => 30,
            TimeRange::Quarter => 90,
        }
    }
}

impl std::fmt::Display for TimeRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// --- Signals ---

/// The four popularity feeds a trend analysis draws on.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
pub enum SourceType {
    /// Search-volume index (Google Trends).
    #[serde(rename = "google")]
    SearchVolume,
    /// Forum mentions (Reddit).
    #[serde(rename = "reddit")]
    ForumMentions,
    /// Product launch board (Product Hunt).
    #[serde(rename = "producthunt")]
    LaunchBoard,
    /// Video platform (YouTube).
    #[serde(rename = "youtube")]
    VideoPlatform,
}

impl SourceType {
    pub const ALL: [SourceType; 4] = [
        SourceType::SearchVolume,
        SourceType::ForumMentions,
        SourceType::LaunchBoard,
        SourceType::VideoPlatform,
    ];

    /// Short tag used in synthetic item names and URLs.
    pub fn tag(&self) -> &'static str {
        match self {
            SourceType::SearchVolume => "google",
            SourceType::ForumMentions => "reddit",
            SourceType::LaunchBoard => "producthunt",
            SourceType::VideoPlatform => "youtube",
        }
    }

    /// Key of this source's block in a `TrendReport`.
    pub fn report_key(&self) -> &'static str {
        match self {
            SourceType::SearchVolume => "googleTrends",
            SourceType::ForumMentions => "reddit",
            SourceType::LaunchBoard => "productHunt",
            SourceType::VideoPlatform => "youtube",
        }
    }

    /// Share of the cross-source growth estimate.
    pub fn weight(&self) -> f64 {
        match self {
            SourceType::SearchVolume => 0.40,
            SourceType::ForumMentions => 0.25,
            SourceType::LaunchBoard => 0.20,
            SourceType::VideoPlatform => 0.15,
        }
    }
}

impl std::fmt::Display for SourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}

/// One observation from one source. `value` is source-local.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalItem {
    pub name: String,
    pub value: i64,
    #[serde(rename = "type")]
    pub source_type: SourceType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comments: Option<u32>,
}

impl SignalItem {
    pub fn new(name: impl Into<String>, value: i64, source_type: SourceType) -> Self {
        Self {
            name: name.into(),
            value,
            source_type,
            description: None,
            url: None,
            published_at: None,
            channel_title: None,
            comments: None,
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn published(mut self, at: DateTime<Utc>) -> Self {
        self.published_at = Some(at);
        self
    }

    /// Case-insensitive merge key.
    pub fn merge_key(&self) -> String {
        self.name.to_lowercase()
    }
}

/// Same-named signals folded across sources and variants.
///
/// Invariant: `item.value == round(score / occurrences)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergedTrend {
    #[serde(flatten)]
    pub item: SignalItem,
    pub score: i64,
    pub occurrences: u32,
}

impl MergedTrend {
    pub fn from_item(item: SignalItem) -> Self {
        Self {
            score: item.value,
            occurrences: 1,
            item,
        }
    }

    /// Fold another trend with the same merge key into this one. Scores and
    /// occurrences add; display fields come from whichever item sorts first
    /// by `(source_type, url, name)`, so the result is order-independent.
    pub fn absorb(&mut self, other: MergedTrend) {
        let score = self.score + other.score;
        let occurrences = self.occurrences + other.occurrences;
        if representative_key(&other.item) < representative_key(&self.item) {
            self.item = other.item;
        }
        self.score = score;
        self.occurrences = occurrences;
        self.item.value = (score as f64 / f64::from(occurrences)).round() as i64;
    }

    pub fn name(&self) -> &str {
        &self.item.name
    }

    pub fn value(&self) -> i64 {
        self.item.value
    }
}

fn representative_key(item: &SignalItem) -> (SourceType, Option<&str>, &str) {
    (item.source_type, item.url.as_deref(), item.name.as_str())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimePoint {
    pub date: NaiveDate,
    pub value: i64,
}

// --- Per-request aggregates ---

/// What one source contributed to a request, across all variants.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceSummary {
    pub available: bool,
    pub item_count: u32,
    pub average_value: f64,
    pub peak_value: i64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub timeseries: Vec<TimePoint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Comparable, unitless figures derived once per request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedMetrics {
    /// 0–100 weighted growth estimate across available sources.
    pub raw_growth_estimate: f64,
    /// Percent change of recent search volume over older search volume, ±100.
    pub velocity: f64,
    /// Number of sources that returned any data.
    pub source_diversity: u32,
    pub mention_volume: u32,
    /// Per-source 0–100 score keyed by source tag.
    pub source_scores: BTreeMap<String, f64>,
    pub sources_used: Vec<SourceType>,
}

impl NormalizedMetrics {
    pub fn is_empty(&self) -> bool {
        self.source_diversity == 0
    }
}

// --- Scoring ---

/// Final explainable score for a topic. Scores are 0–100.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScoreBundle {
    pub growth_score: u8,
    pub market_potential: u8,
    pub confidence_level: u8,
    pub actionable_insights: Vec<String>,
    pub potential_pitfalls: Vec<String>,
    pub recommended_strategy: String,
    pub next_steps: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoringPath {
    Live,
    Fallback,
}

// --- Report ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scores {
    pub growth: u8,
    pub market_potential: u8,
    pub confidence: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiAnalysis {
    pub actionable_insights: Vec<String>,
    pub potential_pitfalls: Vec<String>,
    pub recommended_strategy: String,
    pub next_steps: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportMeta {
    pub original_topic: String,
    pub keyword: String,
    pub variants_searched: Vec<String>,
    pub sources_used: Vec<SourceType>,
    pub scoring: ScoringPath,
    pub raw_metrics: NormalizedMetrics,
}

/// The structured result handed back to callers and persisted verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendReport {
    pub ok: bool,
    pub topic: String,
    pub country: Country,
    pub range: TimeRange,
    pub timestamp: DateTime<Utc>,
    pub scores: Scores,
    pub timeseries: Vec<TimePoint>,
    pub sources: BTreeMap<String, SourceSummary>,
    pub ai_analysis: AiAnalysis,
    pub ranked_trends: Vec<MergedTrend>,
    pub total_analyzed: u32,
    pub meta: ReportMeta,
    pub cached: bool,
}

impl TrendReport {
    pub fn source(&self, source: SourceType) -> Option<&SourceSummary> {
        self.sources.get(source.report_key())
    }
}

// --- Persistence ---

/// Cache key. `topic` is the normalized keyword, never the raw input.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    pub topic: String,
    pub country: Country,
    pub range: TimeRange,
}

impl CacheKey {
    pub fn new(topic: impl Into<String>, country: Country, range: TimeRange) -> Self {
        Self {
            topic: topic.into(),
            country,
            range,
        }
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.topic, self.country, self.range)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub key: CacheKey,
    pub payload: TrendReport,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRecord {
    pub user_id: String,
    pub topic: String,
    pub country: Country,
    pub range: TimeRange,
    pub report: TrendReport,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn country_parse_is_exact() {
        assert_eq!(Country::parse("US"), Some(Country::Us));
        assert_eq!(Country::parse("global"), Some(Country::Global));
        assert_eq!(Country::parse("us"), None);
        assert_eq!(Country::parse("XX"), None);
    }

    #[test]
    fn range_parse_and_days() {
        assert_eq!(TimeRange::parse("7d").map(|r| r.days()), Some(7));
        assert_eq!(TimeRange::parse("90d"), Some(TimeRange::Quarter));
        assert_eq!(TimeRange::parse("1y"), None);
    }

    #[test]
    fn country_serializes_as_wire_code() {
        assert_eq!(serde_json::to_string(&Country::Gb).unwrap(), "\"GB\"");
        assert_eq!(serde_json::to_string(&TimeRange::Month).unwrap(), "\"30d\"");
    }

    #[test]
    fn source_weights_sum_to_one() {
        let total: f64 = SourceType::ALL.iter().map(|s| s.weight()).sum();
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn merged_trend_flattens_item_fields() {
        let trend = MergedTrend {
            item: SignalItem::new("Fitness Apps reddit 1", 70, SourceType::ForumMentions),
            score: 140,
            occurrences: 2,
        };
        let json = serde_json::to_value(&trend).unwrap();
        assert_eq!(json["name"], "Fitness Apps reddit 1");
        assert_eq!(json["type"], "reddit");
        assert_eq!(json["occurrences"], 2);
    }
}
