// TrendStore: cached reports and per-user history.
//
// Writes are best effort: the service spawns them through `PendingWrites`
// and only logs failures.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PostgresStore;

use std::future::Future;
use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;
use tokio::task::JoinSet;
use tracing::error;

use trendscout_common::{CacheEntry, CacheKey, HistoryRecord};

#[async_trait]
pub trait TrendStore: Send + Sync {
    async fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>>;

    /// Insert or overwrite the entry for `entry.key`.
    async fn upsert(&self, entry: CacheEntry) -> Result<()>;

    async fn append(&self, record: HistoryRecord) -> Result<()>;

    /// Newest first.
    async fn history(&self, user_id: &str, limit: usize) -> Result<Vec<HistoryRecord>>;
}

/// Fire-and-forget writes that can still be awaited at shutdown.
#[derive(Default)]
pub struct PendingWrites {
    tasks: Mutex<JoinSet<()>>,
}

impl PendingWrites {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn<F>(&self, what: &'static str, write: F)
    where
        F: Future<Output = Result<()>> + Send + 'static,
    {
        let mut tasks = match self.tasks.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        // reap finished writes so the set stays small
        while tasks.try_join_next().is_some() {}
        tasks.spawn(async move {
            if let Err(e) = write.await {
                error!(write = what, error = %e, "Background write failed");
            }
        });
    }

    /// Wait for every write spawned so far.
    pub async fn drain(&self) {
        let mut tasks = match self.tasks.lock() {
            Ok(mut guard) => std::mem::take(&mut *guard),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        };
        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                error!(error = %e, "Background write panicked");
            }
        }
    }
}
