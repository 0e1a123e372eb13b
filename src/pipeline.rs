use chrono::Utc;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Instant;

use crate::aggregate::{summarize, DatasetSummary};
use crate::config::UploadConfig;
use crate::error::{ScoringError, UploadError};
use crate::ingest::batcher::{batch_count, into_batches};
use crate::ingest::csv_input::{parse_rows, validate_upload, UploadMeta};
use crate::ingest::normalizer::normalize_rows;
use crate::ingest::types::{CanonicalTransaction, ScoredTransaction};
use crate::scoring::{ModelInfo, Scorer};

/// Outcome of a fully scored upload.
#[derive(Debug, Clone)]
pub struct BulkResult {
    pub transactions: Vec<ScoredTransaction>,
    pub summary: DatasetSummary,
    pub model_info: Option<ModelInfo>,
}

/// Drives one upload end to end:
/// 1. Validate the file
/// 2. Parse rows
/// 3. Normalize against one clock reading
/// 4. Score batches in order, stopping at the first failure
/// 5. Summarize the concatenated results
pub struct BulkPipeline {
    scorer: Arc<dyn Scorer>,
    batch_size: NonZeroUsize,
    max_bytes: u64,
}

impl BulkPipeline {
    pub fn new(scorer: Arc<dyn Scorer>, config: &UploadConfig) -> eyre::Result<Self> {
        let batch_size = NonZeroUsize::new(config.batch_size)
            .ok_or_else(|| eyre::eyre!("upload.batch_size must be greater than 0"))?;
        Ok(Self {
            scorer,
            batch_size,
            max_bytes: config.max_file_size_bytes(),
        })
    }

    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size.get()
    }

    pub fn scorer(&self) -> &Arc<dyn Scorer> {
        &self.scorer
    }

    pub async fn process_upload(
        &self,
        meta: &UploadMeta<'_>,
        data: &[u8],
    ) -> Result<BulkResult, UploadError> {
        validate_upload(meta, self.max_bytes)?;

        let rows = parse_rows(data)?;
        if rows.is_empty() {
            return Err(UploadError::NoRows);
        }

        let transactions = normalize_rows(&rows, Utc::now());
        tracing::info!(
            file = meta.file_name.unwrap_or("<unnamed>"),
            rows = transactions.len(),
            "Upload normalized"
        );

        self.score_all(&transactions).await
    }

    /// Score every batch sequentially. Any failure discards all results,
    /// including those of batches that already succeeded.
    pub async fn score_all(
        &self,
        transactions: &[CanonicalTransaction],
    ) -> Result<BulkResult, UploadError> {
        let batches = batch_count(transactions.len(), self.batch_size);
        let started = Instant::now();
        let mut scored = Vec::with_capacity(transactions.len());
        tracing::info!(
            rows = transactions.len(),
            batches,
            batch_size = self.batch_size.get(),
            scorer = self.scorer.name(),
            "Batches planned"
        );

        for (i, batch) in into_batches(transactions, self.batch_size)
            .into_iter()
            .enumerate()
        {
            let fail = |source: ScoringError| {
                tracing::error!(
                    batch = i + 1,
                    batches,
                    scorer = self.scorer.name(),
                    error = %source,
                    "Batch scoring failed, discarding upload"
                );
                UploadError::BatchFailed {
                    batch: i + 1,
                    batches,
                    source,
                }
            };

            let results = self.scorer.score(batch).await.map_err(fail)?;
            if results.len() != batch.len() {
                return Err(fail(ScoringError::CountMismatch {
                    expected: batch.len(),
                    actual: results.len(),
                }));
            }

            for mut tx in results {
                tx.fill_missing(scored.len() + 1);
                scored.push(tx);
            }

            tracing::info!(
                batch = i + 1,
                batches,
                size = batch.len(),
                progress = %format!("{}%", (i + 1) * 100 / batches),
                "Batch scored"
            );
        }

        let summary = summarize(&scored);
        tracing::info!(
            total = summary.total_transactions,
            fraud = summary.fraud_count,
            fraud_pct = %format!("{:.1}%", summary.fraud_percentage),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Upload scored"
        );

        Ok(BulkResult {
            transactions: scored,
            summary,
            model_info: self.scorer.model_info(),
        })
    }
}
