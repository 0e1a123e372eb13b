use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::aggregate::DatasetSummary;
use crate::assessment::RiskFactor;
use crate::history::ReviewRecord;
use crate::scoring::ModelInfo;

// ============================================================
// Query params
// ============================================================

#[derive(Debug, Deserialize, Default)]
pub struct UploadParams {
    pub filename: Option<String>,
}

// ============================================================
// Response types
// ============================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub scorer: String,
    pub dataset_loaded: bool,
    pub history_size: usize,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub file_name: Option<String>,
    pub batches: usize,
    pub summary: DatasetSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_info: Option<ModelInfo>,
    pub uploaded_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct DatasetResponse {
    pub summary: DatasetSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_info: Option<ModelInfo>,
    pub uploaded_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ReviewResponse {
    #[serde(flatten)]
    pub record: ReviewRecord,
    pub factors: Vec<RiskFactor>,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub transactions: Vec<ReviewRecord>,
    pub total: usize,
}

#[derive(Debug, Serialize)]
pub struct ClearedResponse {
    pub cleared: bool,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}
