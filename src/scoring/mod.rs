pub mod client;
pub mod model;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::aggregate::DatasetSummary;
use crate::error::ScoringError;
use crate::ingest::types::{CanonicalTransaction, ScoredTransaction};

/// Anything that can turn a batch of canonical transactions into predictions.
///
/// Implementations must return exactly one scored transaction per input, in
/// input order. Retrying a batch is not required to reproduce earlier scores.
#[async_trait]
pub trait Scorer: Send + Sync {
    async fn score(
        &self,
        batch: &[CanonicalTransaction],
    ) -> Result<Vec<ScoredTransaction>, ScoringError>;

    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Static description of the model, when the scorer knows it.
    fn model_info(&self) -> Option<ModelInfo> {
        None
    }
}

/// Request body of the scoring endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreRequest {
    pub transactions: Vec<CanonicalTransaction>,
}

/// Response body of the scoring endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreResponse {
    pub transactions: Vec<ScoredTransaction>,
    pub summary: DatasetSummary,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_info: Option<ModelInfo>,
}

/// Reported model metadata. Values are whatever the model claims; nothing here
/// is measured by this service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub model_type: String,
    pub preprocessing: String,
    pub features_count: u32,
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub auc_roc: f64,
}
