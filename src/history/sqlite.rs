use anyhow::Result;
use async_trait::async_trait;

use super::{History, HistoryEntry, push_bounded};
use crate::consts::{HISTORY_KEY, HISTORY_LIMIT};
use crate::storage::KvStore;

/// History persisted as one JSON array under [`HISTORY_KEY`].
pub struct SqliteHistory {
    store: KvStore,
    limit: usize,
}

impl SqliteHistory {
    pub fn new(path: &str) -> Result<Self> {
        Ok(Self::with_store(KvStore::open(path)?))
    }

    pub fn in_memory() -> Result<Self> {
        Self::new(":memory:")
    }

    pub fn with_store(store: KvStore) -> Self {
        Self {
            store,
            limit: HISTORY_LIMIT,
        }
    }

    /// Stored list, or empty if missing or unreadable.
    fn decode(raw: Option<String>) -> Vec<HistoryEntry> {
        let Some(json) = raw else {
            return Vec::new();
        };
        match serde_json::from_str(&json) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(error = %e, "stored history is unreadable, starting fresh");
                Vec::new()
            }
        }
    }
}

#[async_trait]
impl History for SqliteHistory {
    async fn record(&self, entry: HistoryEntry) -> Result<()> {
        self.store.update(HISTORY_KEY, |raw| {
            let mut entries = Self::decode(raw);
            push_bounded(&mut entries, entry, self.limit);
            Ok(serde_json::to_string(&entries)?)
        })
    }

    async fn entries(&self) -> Result<Vec<HistoryEntry>> {
        Ok(Self::decode(self.store.get(HISTORY_KEY)?))
    }

    async fn clear(&self) -> Result<()> {
        self.store.set(HISTORY_KEY, "[]")
    }
}
