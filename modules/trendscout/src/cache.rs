//! Read-through report cache over a `TrendStore`.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error};

use trendscout_common::{CacheEntry, CacheKey, TrendReport};

use crate::clock::Clock;
use crate::store::{PendingWrites, TrendStore};

pub const DEFAULT_TTL: Duration = Duration::from_secs(6 * 60 * 60);

pub struct ResultCache {
    store: Arc<dyn TrendStore>,
    clock: Arc<dyn Clock>,
    ttl: chrono::Duration,
}

impl ResultCache {
    pub fn new(store: Arc<dyn TrendStore>, clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self {
            store,
            clock,
            ttl: chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::days(36_500)),
        }
    }

    /// Fresh report for `key`, marked `cached`. Store errors count as a miss.
    pub async fn lookup(&self, key: &CacheKey) -> Option<TrendReport> {
        let entry = match self.store.get(key).await {
            Ok(entry) => entry?,
            Err(e) => {
                error!(key = %key, error = %e, "Cache read failed");
                return None;
            }
        };

        let age = self.clock.now() - entry.updated_at;
        if age >= self.ttl {
            debug!(key = %key, age_secs = age.num_seconds(), "Cache entry stale");
            return None;
        }

        let mut report = entry.payload;
        report.cached = true;
        Some(report)
    }

    /// Upsert in the background, stamped with the current time.
    pub fn store(&self, writes: &PendingWrites, key: CacheKey, report: TrendReport) {
        let store = self.store.clone();
        let entry = CacheEntry {
            key,
            payload: TrendReport {
                cached: false,
                ..report
            },
            updated_at: self.clock.now(),
        };
        writes.spawn("cache", async move { store.upsert(entry).await });
    }
}
