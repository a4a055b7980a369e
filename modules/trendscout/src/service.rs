// TrendService: the request pipeline.
//
// validate → rate limit → cache → keywords → fan-out → normalize → merge
// → score → (background) cache upsert + history append.

use std::sync::Arc;
use std::time::{Duration, Instant};

use ai_client::OpenAi;
use anyhow::Context;
use serde::Deserialize;
use tracing::{info, warn};
use typed_builder::TypedBuilder;

use trendscout_common::{
    AiAnalysis, CacheKey, Config, Country, HistoryRecord, ReportMeta, Scores, SourceType,
    TimeRange, TrendError, TrendReport,
};
use trendscout_sources::{sources_from_config, SourceAdapter};

use crate::aggregator::SignalAggregator;
use crate::cache::{ResultCache, DEFAULT_TTL};
use crate::clock::{Clock, SystemClock};
use crate::keyword::{normalize_keyword, NormalizedKeyword};
use crate::merge::merge_and_rank;
use crate::normalizer::{normalize, summarize};
use crate::rate_limit::{caller_identity, RateDecision, RateLimitPolicy, RateLimiter};
use crate::scorer::Scorer;
use crate::store::{MemoryStore, PendingWrites, PostgresStore, TrendStore};

/// Ranked trends carried in a report.
pub const RANKED_LIMIT: usize = 20;
pub const DEFAULT_HISTORY_LIMIT: usize = 10;
const MAX_HISTORY_LIMIT: usize = 100;
const MAX_TOPIC_CHARS: usize = 200;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendRequest {
    #[serde(default)]
    pub topic: String,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub range: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    /// Client address, used for rate limiting when there is no user id.
    #[serde(skip)]
    pub caller_id: Option<String>,
}

impl TrendRequest {
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            ..Self::default()
        }
    }

    pub fn country(mut self, country: impl Into<String>) -> Self {
        self.country = Some(country.into());
        self
    }

    pub fn range(mut self, range: impl Into<String>) -> Self {
        self.range = Some(range.into());
        self
    }

    pub fn user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn caller(mut self, caller_id: impl Into<String>) -> Self {
        self.caller_id = Some(caller_id.into());
        self
    }
}

/// Long-lived collaborators of a `TrendService`.
#[derive(Clone, TypedBuilder)]
pub struct TrendDeps {
    pub sources: Vec<Arc<dyn SourceAdapter>>,
    pub store: Arc<dyn TrendStore>,
    #[builder(default = Scorer::fallback())]
    pub scorer: Scorer,
    #[builder(default = RateLimiter::in_memory(RateLimitPolicy::default()))]
    pub rate_limiter: RateLimiter,
    #[builder(default = Arc::new(SystemClock) as Arc<dyn Clock>)]
    pub clock: Arc<dyn Clock>,
    #[builder(default = SignalAggregator::DEFAULT_TIMEOUT)]
    pub source_timeout: Duration,
    #[builder(default = DEFAULT_TTL)]
    pub cache_ttl: Duration,
}

impl TrendDeps {
    /// Production wiring from environment config. Connects to (and migrates)
    /// Postgres when `DATABASE_URL` is set.
    pub async fn from_config(config: &Config) -> anyhow::Result<Self> {
        let sources = sources_from_config(config).context("building source adapters")?;

        let store: Arc<dyn TrendStore> = match &config.database_url {
            Some(url) => {
                let store = PostgresStore::connect(url).await?;
                store.migrate().await?;
                Arc::new(store)
            }
            None => {
                info!("DATABASE_URL not set, using in-memory trend store");
                Arc::new(MemoryStore::new())
            }
        };

        let scorer = match &config.openai_api_key {
            Some(key) => Scorer::live(Arc::new(
                OpenAi::new(key.clone(), config.openai_model.clone())
                    .json_mode()
                    .with_timeout(Duration::from_secs(30)),
            )),
            None => {
                info!("OPENAI_API_KEY not set, scoring with deterministic fallback");
                Scorer::fallback()
            }
        };

        let rate_limiter = RateLimiter::in_memory(RateLimitPolicy {
            window: config.rate_limit_window,
            max_requests: config.rate_limit_max,
        });

        Ok(TrendDeps::builder()
            .sources(sources)
            .store(store)
            .scorer(scorer)
            .rate_limiter(rate_limiter)
            .source_timeout(config.source_timeout)
            .cache_ttl(config.cache_ttl)
            .build())
    }
}

pub struct TrendService {
    aggregator: SignalAggregator,
    scorer: Scorer,
    cache: ResultCache,
    store: Arc<dyn TrendStore>,
    rate_limiter: RateLimiter,
    clock: Arc<dyn Clock>,
    writes: PendingWrites,
}

impl TrendService {
    pub fn new(deps: TrendDeps) -> Self {
        Self {
            aggregator: SignalAggregator::new(deps.sources).with_timeout(deps.source_timeout),
            scorer: deps.scorer,
            cache: ResultCache::new(deps.store.clone(), deps.clock.clone(), deps.cache_ttl),
            store: deps.store,
            rate_limiter: deps.rate_limiter,
            clock: deps.clock,
            writes: PendingWrites::new(),
        }
    }

    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.rate_limiter
    }

    /// Run (or serve from cache) a trend analysis.
    pub async fn analyze(&self, request: TrendRequest) -> Result<TrendReport, TrendError> {
        let (topic, country, range) = validate(&request)?;

        let identity = caller_identity(request.user_id.as_deref(), request.caller_id.as_deref());
        if let RateDecision::Limited { retry_after } =
            self.rate_limiter.check(identity, self.clock.now())
        {
            warn!(identity, retry_after_ms = retry_after.as_millis() as u64, "Rate limited");
            return Err(TrendError::Throttled {
                retry_after_secs: ceil_secs(retry_after),
            });
        }

        let started = Instant::now();
        let normalized = normalize_keyword(&topic);
        let key = CacheKey::new(normalized.keyword.clone(), country, range);

        info!(topic = topic.as_str(), %country, %range, "Starting trend analysis");

        if let Some(report) = self.cache.lookup(&key).await {
            info!(key = %key, elapsed_ms = started.elapsed().as_millis() as u64, "Served from cache");
            return Ok(report);
        }

        let aggregation = self.aggregator.collect(&normalized.variants, country, range).await;
        let summaries = summarize(&aggregation);
        let metrics = normalize(&summaries);
        let merged = merge_and_rank(&aggregation.item_batches());
        let (bundle, scoring) = self.scorer.score(&metrics, &topic).await;

        let timeseries = summaries
            .get(&SourceType::SearchVolume)
            .map(|s| s.timeseries.clone())
            .unwrap_or_default();
        let total_analyzed = merged.len() as u32;

        let report = TrendReport {
            ok: true,
            topic: topic.clone(),
            country,
            range,
            timestamp: self.clock.now(),
            scores: Scores {
                growth: bundle.growth_score,
                market_potential: bundle.market_potential,
                confidence: bundle.confidence_level,
            },
            timeseries,
            sources: summaries
                .into_iter()
                .map(|(source, summary)| (source.report_key().to_string(), summary))
                .collect(),
            ai_analysis: AiAnalysis {
                actionable_insights: bundle.actionable_insights,
                potential_pitfalls: bundle.potential_pitfalls,
                recommended_strategy: bundle.recommended_strategy,
                next_steps: bundle.next_steps,
            },
            ranked_trends: merged.into_iter().take(RANKED_LIMIT).collect(),
            total_analyzed,
            meta: ReportMeta {
                original_topic: request.topic.clone(),
                keyword: normalized.keyword,
                variants_searched: normalized.variants,
                sources_used: metrics.sources_used.clone(),
                scoring,
                raw_metrics: metrics,
            },
            cached: false,
        };

        self.cache.store(&self.writes, key, report.clone());
        if let Some(user_id) = request.user_id.as_deref().filter(|u| !u.trim().is_empty()) {
            let store = self.store.clone();
            let record = HistoryRecord {
                user_id: user_id.to_string(),
                topic,
                country,
                range,
                report: report.clone(),
                created_at: self.clock.now(),
            };
            self.writes
                .spawn("history", async move { store.append(record).await });
        }

        info!(
            topic = report.topic.as_str(),
            growth = report.scores.growth,
            sources = report.meta.sources_used.len(),
            trends = total_analyzed,
            scoring = ?report.meta.scoring,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Trend analysis complete"
        );
        Ok(report)
    }

    /// A user's past analyses, newest first.
    pub async fn history(
        &self,
        user_id: &str,
        limit: Option<usize>,
    ) -> Result<Vec<HistoryRecord>, TrendError> {
        let user_id = user_id.trim();
        if user_id.is_empty() {
            return Err(TrendError::InvalidInput("userId is required".to_string()));
        }
        let limit = limit.unwrap_or(DEFAULT_HISTORY_LIMIT).clamp(1, MAX_HISTORY_LIMIT);
        let records = self
            .store
            .history(user_id, limit)
            .await
            .context("loading trend history")?;
        Ok(records)
    }

    /// Keyword expansion only, no source calls.
    pub fn keywords(&self, topic: &str) -> Result<NormalizedKeyword, TrendError> {
        let topic = validate_topic(topic)?;
        Ok(normalize_keyword(&topic))
    }

    /// Wait for background cache and history writes. Call before shutdown.
    pub async fn drain_pending_writes(&self) {
        self.writes.drain().await;
    }
}

fn ceil_secs(d: Duration) -> u64 {
    d.as_secs() + u64::from(d.subsec_nanos() > 0)
}

fn validate_topic(raw: &str) -> Result<String, TrendError> {
    let topic = raw.trim();
    if topic.is_empty() {
        return Err(TrendError::InvalidInput(
            "Topic is required and must be a non-empty string".to_string(),
        ));
    }
    if topic.chars().count() > MAX_TOPIC_CHARS {
        return Err(TrendError::InvalidInput(format!(
            "Topic must be at most {MAX_TOPIC_CHARS} characters"
        )));
    }
    Ok(topic.to_string())
}

fn validate(request: &TrendRequest) -> Result<(String, Country, TimeRange), TrendError> {
    let topic = validate_topic(&request.topic)?;

    let country = match request.country.as_deref() {
        None => Country::default(),
        Some(raw) => Country::parse(raw).ok_or_else(|| {
            TrendError::InvalidInput(format!(
                "Invalid country. Must be one of: {}",
                join(Country::ALL.iter().map(|c| c.as_str()))
            ))
        })?,
    };

    let range = match request.range.as_deref() {
        None => TimeRange::default(),
        Some(raw) => TimeRange::parse(raw).ok_or_else(|| {
            TrendError::InvalidInput(format!(
                "Invalid range. Must be one of: {}",
                join(TimeRange::ALL.iter().map(|r| r.as_str()))
            ))
        })?,
    };

    Ok((topic, country, range))
}

fn join<'a>(values: impl Iterator<Item = &'a str>) -> String {
    values.collect::<Vec<_>>().join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_defaults_country_and_range() {
        let (topic, country, range) = validate(&TrendRequest::new("  fitness apps ")).unwrap();
        assert_eq!(topic, "fitness apps");
        assert_eq!(country, Country::Us);
        assert_eq!(range, TimeRange::Month);
    }

    #[test]
    fn validation_messages_list_allowed_values() {
        let err = validate(&TrendRequest::new("yoga").country("XX")).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid input: Invalid country. Must be one of: US, FR, GB, DE, CA, AU, global"
        );
        let err = validate(&TrendRequest::new("yoga").range("1y")).unwrap_err();
        assert!(err.to_string().contains("7d, 30d, 90d"));
    }

    #[test]
    fn blank_and_oversized_topics_are_rejected() {
        assert!(validate(&TrendRequest::new("   ")).is_err());
        assert!(validate(&TrendRequest::new("x".repeat(MAX_TOPIC_CHARS + 1))).is_err());
        assert!(validate(&TrendRequest::new("x".repeat(MAX_TOPIC_CHARS))).is_ok());
    }

    #[test]
    fn retry_after_rounds_up() {
        assert_eq!(ceil_secs(Duration::from_millis(30_000)), 30);
        assert_eq!(ceil_secs(Duration::from_millis(30_001)), 31);
    }
}
