use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::RwLock;

use trendscout_common::{CacheEntry, CacheKey, HistoryRecord};

use super::TrendStore;

/// Process-local store, used when no database is configured.
#[derive(Default)]
pub struct MemoryStore {
    cache: RwLock<HashMap<CacheKey, CacheEntry>>,
    history: RwLock<Vec<HistoryRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn cache_len(&self) -> usize {
        self.cache.read().await.len()
    }

    pub async fn history_len(&self) -> usize {
        self.history.read().await.len()
    }
}

#[async_trait]
impl TrendStore for MemoryStore {
    async fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>> {
        Ok(self.cache.read().await.get(key).cloned())
    }

    async fn upsert(&self, entry: CacheEntry) -> Result<()> {
        self.cache.write().await.insert(entry.key.clone(), entry);
        Ok(())
    }

    async fn append(&self, record: HistoryRecord) -> Result<()> {
        self.history.write().await.push(record);
        Ok(())
    }

    async fn history(&self, user_id: &str, limit: usize) -> Result<Vec<HistoryRecord>> {
        let history = self.history.read().await;
        let mut records: Vec<HistoryRecord> = history
            .iter()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect();
        // stable sort keeps append order for equal timestamps; reverse for newest first
        records.sort_by_key(|r| r.created_at);
        records.reverse();
        records.truncate(limit);
        Ok(records)
    }
}
