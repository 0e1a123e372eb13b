use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tokio::sync::RwLock;

use crate::assessment::Verdict;

/// A reviewed single transaction, as kept in the history log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewRecord {
    pub id: String,
    pub customer_id: String,
    pub kyc_verified: bool,
    pub account_age_days: u32,
    pub transaction_amount: f64,
    pub channel: String,
    /// When the transaction happened, as submitted.
    pub transaction_time: String,
    pub prediction: Verdict,
    pub risk_score: f64,
    pub confidence: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub reviewed_at: DateTime<Utc>,
}

/// Storage for single-transaction review history.
#[async_trait]
pub trait TransactionRepository: Send + Sync {
    async fn append(&self, record: ReviewRecord) -> eyre::Result<()>;

    /// All records, newest first.
    async fn list(&self) -> eyre::Result<Vec<ReviewRecord>>;

    async fn clear(&self) -> eyre::Result<()>;
}

/// Bounded in-memory history. Once full, the oldest record is dropped.
pub struct InMemoryHistory {
    records: RwLock<VecDeque<ReviewRecord>>,
    capacity: usize,
}

impl InMemoryHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            records: RwLock::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }
}

#[async_trait]
impl TransactionRepository for InMemoryHistory {
    async fn append(&self, record: ReviewRecord) -> eyre::Result<()> {
        let mut records = self.records.write().await;
        records.push_front(record);
        records.truncate(self.capacity);
        Ok(())
    }

    async fn list(&self) -> eyre::Result<Vec<ReviewRecord>> {
        Ok(self.records.read().await.iter().cloned().collect())
    }

    async fn clear(&self) -> eyre::Result<()> {
        let mut records = self.records.write().await;
        let dropped = records.len();
        records.clear();
        tracing::info!(dropped, "Review history cleared");
        Ok(())
    }
}
