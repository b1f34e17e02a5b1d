pub mod sqlite;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One successful calculation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub expression: String,
    pub result: f64,
    pub timestamp: String,
}

impl HistoryEntry {
    /// Stamp an entry with the current UTC time (RFC 3339).
    pub fn new(expression: impl Into<String>, result: f64) -> Self {
        Self {
            expression: expression.into(),
            result,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Insert `entry` at the front, evicting from the back past `limit`.
pub fn push_bounded(entries: &mut Vec<HistoryEntry>, entry: HistoryEntry, limit: usize) {
    entries.insert(0, entry);
    entries.truncate(limit);
}

/// Record of past calculations, newest first.
#[async_trait]
pub trait History: Send + Sync {
    async fn record(&self, entry: HistoryEntry) -> Result<()>;
    async fn entries(&self) -> Result<Vec<HistoryEntry>>;
    async fn clear(&self) -> Result<()>;
}
