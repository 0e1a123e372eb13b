use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::aggregate::DatasetSummary;
use crate::ingest::types::ScoredTransaction;
use crate::scoring::ModelInfo;

/// The most recent fully scored upload.
#[derive(Debug, Clone, Serialize)]
pub struct Dataset {
    pub transactions: Vec<ScoredTransaction>,
    pub summary: DatasetSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_info: Option<ModelInfo>,
    pub uploaded_at: DateTime<Utc>,
}

/// Holds at most one dataset. A new upload replaces the previous one
/// wholesale; a failed upload never touches it.
#[derive(Default)]
pub struct SessionStore {
    current: RwLock<Option<Arc<Dataset>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn update_dataset(&self, dataset: Dataset) -> Arc<Dataset> {
        let dataset = Arc::new(dataset);
        let previous = self.current.write().await.replace(dataset.clone());
        tracing::info!(
            transactions = dataset.transactions.len(),
            replaced = previous.is_some(),
            "Dataset stored"
        );
        dataset
    }

    pub async fn snapshot(&self) -> Option<Arc<Dataset>> {
        self.current.read().await.clone()
    }

    pub async fn clear(&self) -> bool {
        let cleared = self.current.write().await.take().is_some();
        if cleared {
            tracing::info!("Dataset cleared");
        }
        cleared
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::summarize;
    use crate::aggregate::test_support::scored;

    fn dataset(ids: &[&str]) -> Dataset {
        let transactions: Vec<_> = ids.iter().map(|id| scored(id, 10.0, 0, 0.1)).collect();
        Dataset {
            summary: summarize(&transactions),
            transactions,
            model_info: None,
            uploaded_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_upload_replaces_previous() {
        let store = SessionStore::new();
        assert!(store.snapshot().await.is_none());

        store.update_dataset(dataset(&["a", "b"])).await;
        store.update_dataset(dataset(&["c"])).await;

        let current = store.snapshot().await.unwrap();
        assert_eq!(current.transactions.len(), 1);
        assert_eq!(current.transactions[0].transaction_id, "c");
        assert_eq!(current.summary.total_transactions, 1);
    }

    #[tokio::test]
    async fn test_clear() {
        let store = SessionStore::new();
        assert!(!store.clear().await);
        store.update_dataset(dataset(&["a"])).await;
        assert!(store.clear().await);
        assert!(store.snapshot().await.is_none());
    }
}
