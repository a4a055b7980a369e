// SignalAggregator: fan every keyword variant out to every source.
//
// All calls run concurrently and are settled together. A call that fails or
// misses its deadline contributes zero items and an error string; it never
// fails the request.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tracing::{debug, warn};

use trendscout_common::{Country, SignalItem, SourceType, TimeRange};
use trendscout_sources::SourceAdapter;

/// Items one source returned for one variant.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceBatch {
    pub source_type: SourceType,
    pub variant: String,
    pub items: Vec<SignalItem>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Aggregation {
    /// Variant-major, then source order. Stable for a given configuration.
    pub batches: Vec<SourceBatch>,
    /// First failure (or degradation) reported by each source.
    pub errors: BTreeMap<SourceType, String>,
}

impl Aggregation {
    pub fn items(&self) -> impl Iterator<Item = &SignalItem> {
        self.batches.iter().flat_map(|b| b.items.iter())
    }

    pub fn items_for(&self, source: SourceType) -> impl Iterator<Item = &SignalItem> {
        self.batches
            .iter()
            .filter(move |b| b.source_type == source)
            .flat_map(|b| b.items.iter())
    }

    pub fn item_count(&self) -> usize {
        self.batches.iter().map(|b| b.items.len()).sum()
    }

    /// Item lists per batch, ready for merging.
    pub fn item_batches(&self) -> Vec<Vec<SignalItem>> {
        self.batches.iter().map(|b| b.items.clone()).collect()
    }
}

pub struct SignalAggregator {
    sources: Vec<Arc<dyn SourceAdapter>>,
    timeout: Duration,
}

impl SignalAggregator {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

    pub fn new(sources: Vec<Arc<dyn SourceAdapter>>) -> Self {
        Self {
            sources,
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn source_types(&self) -> Vec<SourceType> {
        self.sources.iter().map(|s| s.source_type()).collect()
    }

    pub async fn collect(
        &self,
        variants: &[String],
        country: Country,
        range: TimeRange,
    ) -> Aggregation {
        let calls = variants.iter().flat_map(|variant| {
            self.sources
                .iter()
                .map(move |source| self.fetch_one(source.as_ref(), variant, country, range))
        });

        let mut aggregation = Aggregation::default();
        for (batch, error) in join_all(calls).await {
            if let Some(error) = error {
                aggregation.errors.entry(batch.source_type).or_insert(error);
            }
            aggregation.batches.push(batch);
        }

        debug!(
            variants = variants.len(),
            sources = self.sources.len(),
            items = aggregation.item_count(),
            errors = aggregation.errors.len(),
            "Aggregated signals"
        );
        aggregation
    }

    async fn fetch_one(
        &self,
        source: &dyn SourceAdapter,
        variant: &str,
        country: Country,
        range: TimeRange,
    ) -> (SourceBatch, Option<String>) {
        let source_type = source.source_type();
        let fetch = source.fetch(variant, country, range);
        let (items, error) = match tokio::time::timeout(self.timeout, fetch).await {
            Ok(Ok(outcome)) => (outcome.items, outcome.degraded),
            Ok(Err(e)) => {
                warn!(source = %source_type, variant, error = %e, "Source fetch failed");
                (Vec::new(), Some(e.to_string()))
            }
            Err(_) => {
                warn!(source = %source_type, variant, timeout_ms = self.timeout.as_millis() as u64, "Source fetch timed out");
                (
                    Vec::new(),
                    Some(format!("timed out after {}ms", self.timeout.as_millis())),
                )
            }
        };

        (
            SourceBatch {
                source_type,
                variant: variant.to_string(),
                items,
            },
            error,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{CountingSource, FailingSource, SlowSource};

    fn variants(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn every_variant_hits_every_source() {
        let forum = Arc::new(CountingSource::new(SourceType::ForumMentions));
        let video = Arc::new(CountingSource::new(SourceType::VideoPlatform));
        let aggregator = SignalAggregator::new(vec![forum.clone(), video.clone()]);

        let result = aggregator
            .collect(
                &variants(&["yoga", "yoga ai", "yoga tools"]),
                Country::Us,
                TimeRange::Month,
            )
            .await;

        assert_eq!(forum.calls(), 3);
        assert_eq!(video.calls(), 3);
        assert_eq!(result.batches.len(), 6);
        assert_eq!(result.batches[0].variant, "yoga");
        assert_eq!(result.batches[0].source_type, SourceType::ForumMentions);
        assert_eq!(result.batches[1].source_type, SourceType::VideoPlatform);
        assert!(result.errors.is_empty());
    }

    #[tokio::test]
    async fn failures_become_empty_batches_with_errors() {
        let aggregator = SignalAggregator::new(vec![
            Arc::new(CountingSource::new(SourceType::SearchVolume)),
            Arc::new(FailingSource::new(SourceType::LaunchBoard, "quota exhausted")),
        ]);

        let result = aggregator.collect(&variants(&["yoga"]), Country::Fr, TimeRange::Month).await;

        assert!(result.items_for(SourceType::SearchVolume).count() > 0);
        assert_eq!(result.items_for(SourceType::LaunchBoard).count(), 0);
        assert!(result.errors[&SourceType::LaunchBoard].contains("quota exhausted"));
    }

    #[tokio::test(start_paused = true)]
    async fn slow_sources_time_out() {
        let aggregator = SignalAggregator::new(vec![
            Arc::new(SlowSource::new(SourceType::VideoPlatform, Duration::from_secs(30))),
            Arc::new(CountingSource::new(SourceType::ForumMentions)),
        ])
        .with_timeout(Duration::from_millis(200));

        let result = aggregator.collect(&variants(&["yoga"]), Country::Us, TimeRange::Month).await;

        assert_eq!(result.items_for(SourceType::VideoPlatform).count(), 0);
        assert!(result.errors[&SourceType::VideoPlatform].contains("timed out"));
        assert!(result.items_for(SourceType::ForumMentions).count() > 0);
    }

    #[tokio::test]
    async fn no_sources_means_no_items() {
        let aggregator = SignalAggregator::new(Vec::new());
        let result = aggregator.collect(&variants(&["yoga"]), Country::Us, TimeRange::Month).await;
        assert_eq!(result.item_count(), 0);
        assert!(result.batches.is_empty());
    }
}
