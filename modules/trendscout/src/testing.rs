// Test doubles for the trend pipeline.
//
// - CountingSource / FailingSource / SlowSource (SourceAdapter)
// - ScriptedCompletion (Completion): queued replies, records prompts
// - FailingStore (TrendStore): every call errors
// - ManualClock (Clock): time only moves when told to
//
// Plus `sample_report` and `synthetic_service` for building fixtures.

use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use ai_client::{AiError, Completion, Message, MessageRole};
use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use trendscout_common::{
    AiAnalysis, CacheEntry, CacheKey, Country, HistoryRecord, NormalizedMetrics, ReportMeta,
    Scores, ScoringPath, SourceType, TimeRange, TrendReport,
};
use trendscout_sources::{FetchOutcome, SourceAdapter, SyntheticProfile};

use crate::clock::Clock;
use crate::rate_limit::RateLimiter;
use crate::service::{TrendDeps, TrendService};
use crate::store::{MemoryStore, TrendStore};

// ---------------------------------------------------------------------------
// Sources
// ---------------------------------------------------------------------------

/// Synthetic source that counts how often it is called.
pub struct CountingSource {
    profile: SyntheticProfile,
    calls: AtomicUsize,
}

impl CountingSource {
    pub fn new(source_type: SourceType) -> Self {
        Self {
            profile: SyntheticProfile::for_source(source_type),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SourceAdapter for CountingSource {
    fn source_type(&self) -> SourceType {
        self.profile.source_type
    }

    async fn fetch(&self, keyword: &str, country: Country, range: TimeRange) -> Result<FetchOutcome> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(FetchOutcome::items(
            self.profile.generate(keyword, country, range, Utc::now()),
        ))
    }
}

/// Always errors with the given message.
pub struct FailingSource {
    source_type: SourceType,
    message: String,
}

impl FailingSource {
    pub fn new(source_type: SourceType, message: impl Into<String>) -> Self {
        Self {
            source_type,
            message: message.into(),
        }
    }
}

#[async_trait]
impl SourceAdapter for FailingSource {
    fn source_type(&self) -> SourceType {
        self.source_type
    }

    async fn fetch(
        &self,
        _keyword: &str,
        _country: Country,
        _range: TimeRange,
    ) -> Result<FetchOutcome> {
        bail!("{}", self.message)
    }
}

/// Sleeps before answering; pair with a short aggregator timeout.
pub struct SlowSource {
    inner: CountingSource,
    delay: Duration,
}

impl SlowSource {
    pub fn new(source_type: SourceType, delay: Duration) -> Self {
        Self {
            inner: CountingSource::new(source_type),
            delay,
        }
    }
}

#[async_trait]
impl SourceAdapter for SlowSource {
    fn source_type(&self) -> SourceType {
        self.inner.source_type()
    }

    async fn fetch(&self, keyword: &str, country: Country, range: TimeRange) -> Result<FetchOutcome> {
        tokio::time::sleep(self.delay).await;
        self.inner.fetch(keyword, country, range).await
    }
}

/// One counting source per source type.
pub fn counting_sources() -> Vec<Arc<CountingSource>> {
    SourceType::ALL
        .into_iter()
        .map(|s| Arc::new(CountingSource::new(s)))
        .collect()
}

// ---------------------------------------------------------------------------
// ScriptedCompletion
// ---------------------------------------------------------------------------

/// Replies from a queue; the last entry repeats once the queue drains.
pub struct ScriptedCompletion {
    script: Mutex<VecDeque<std::result::Result<String, String>>>,
    calls: AtomicUsize,
    last_user_prompt: Mutex<Option<String>>,
}

impl Default for ScriptedCompletion {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedCompletion {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            calls: AtomicUsize::new(0),
            last_user_prompt: Mutex::new(None),
        }
    }

    pub fn reply(self, text: impl Into<String>) -> Self {
        self.script.lock().unwrap().push_back(Ok(text.into()));
        self
    }

    pub fn fail(self, message: impl Into<String>) -> Self {
        self.script.lock().unwrap().push_back(Err(message.into()));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_user_prompt(&self) -> Option<String> {
        self.last_user_prompt.lock().unwrap().clone()
    }
}

#[async_trait]
impl Completion for ScriptedCompletion {
    async fn complete(&self, messages: &[Message]) -> ai_client::error::Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(user) = messages.iter().rev().find(|m| m.role == MessageRole::User) {
            *self.last_user_prompt.lock().unwrap() = Some(user.content.clone());
        }

        let next = {
            let mut script = self.script.lock().unwrap();
            if script.len() > 1 {
                script.pop_front()
            } else {
                script.front().cloned()
            }
        };
        match next {
            Some(Ok(text)) => Ok(text),
            Some(Err(message)) => Err(AiError::Network(message)),
            None => Err(AiError::EmptyResponse("scripted".to_string())),
        }
    }

    fn model(&self) -> &str {
        "scripted"
    }
}

// ---------------------------------------------------------------------------
// FailingStore
// ---------------------------------------------------------------------------

pub struct FailingStore;

#[async_trait]
impl TrendStore for FailingStore {
    async fn get(&self, _key: &CacheKey) -> Result<Option<CacheEntry>> {
        bail!("store unavailable")
    }

    async fn upsert(&self, _entry: CacheEntry) -> Result<()> {
        bail!("store unavailable")
    }

    async fn append(&self, _record: HistoryRecord) -> Result<()> {
        bail!("store unavailable")
    }

    async fn history(&self, _user_id: &str, _limit: usize) -> Result<Vec<HistoryRecord>> {
        bail!("store unavailable")
    }
}

// ---------------------------------------------------------------------------
// ManualClock
// ---------------------------------------------------------------------------

pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    /// Start at an RFC 3339 timestamp.
    pub fn at(rfc3339: &str) -> Self {
        Self::new(rfc3339.parse().expect("valid RFC 3339 timestamp"))
    }

    pub fn advance(&self, by: chrono::Duration) {
        *self.now.lock().unwrap() += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

pub fn sample_report(topic: &str) -> TrendReport {
    TrendReport {
        ok: true,
        topic: topic.to_string(),
        country: Country::Us,
        range: TimeRange::Month,
        timestamp: "2025-03-10T12:00:00Z".parse().expect("valid timestamp"),
        scores: Scores {
            growth: 64,
            market_potential: 58,
            confidence: 50,
        },
        timeseries: Vec::new(),
        sources: BTreeMap::new(),
        ai_analysis: AiAnalysis {
            actionable_insights: vec!["Start small".to_string()],
            potential_pitfalls: vec!["Seasonality".to_string()],
            recommended_strategy: "Validate first".to_string(),
            next_steps: vec!["Talk to users".to_string()],
        },
        ranked_trends: Vec::new(),
        total_analyzed: 0,
        meta: ReportMeta {
            original_topic: topic.to_string(),
            keyword: topic.to_lowercase(),
            variants_searched: vec![topic.to_lowercase()],
            sources_used: Vec::new(),
            scoring: ScoringPath::Fallback,
            raw_metrics: NormalizedMetrics::default(),
        },
        cached: false,
    }
}

/// Service over the given sources with an in-memory store and fallback scoring.
pub fn synthetic_service(
    sources: Vec<Arc<dyn SourceAdapter>>,
    store: Arc<MemoryStore>,
    clock: Arc<dyn Clock>,
    rate_limiter: RateLimiter,
) -> TrendService {
    TrendService::new(
        TrendDeps::builder()
            .sources(sources)
            .store(store)
            .clock(clock)
            .rate_limiter(rate_limiter)
            .build(),
    )
}
