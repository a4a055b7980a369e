// SourceAdapter: one popularity feed behind a uniform interface.
//
// The aggregator calls every adapter for every keyword variant and treats
// an `Err` (or a timeout) as "this source had nothing to say". Adapters
// that can degrade on their own (live provider down, synthetic stand-in)
// return `Ok` and explain themselves through `FetchOutcome::degraded`.

use anyhow::Result;
use async_trait::async_trait;

use trendscout_common::{Country, SignalItem, SourceType, TimeRange};

/// Items from one adapter call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchOutcome {
    pub items: Vec<SignalItem>,
    /// Provider error that forced a synthetic stand-in, if any.
    pub degraded: Option<String>,
}

impl FetchOutcome {
    pub fn items(items: Vec<SignalItem>) -> Self {
        Self {
            items,
            degraded: None,
        }
    }

    pub fn degraded(items: Vec<SignalItem>, reason: impl Into<String>) -> Self {
        Self {
            items,
            degraded: Some(reason.into()),
        }
    }
}

#[async_trait]
pub trait SourceAdapter: Send + Sync {
    fn source_type(&self) -> SourceType;

    /// Fetch signals for one keyword variant over the trailing `range`.
    async fn fetch(
        &self,
        keyword: &str,
        country: Country,
        range: TimeRange,
    ) -> Result<FetchOutcome>;
}
