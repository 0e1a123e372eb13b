pub mod insights;

use serde::{Deserialize, Serialize};

use crate::ingest::types::ScoredTransaction;

/// The riskiest transaction in a dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HighestRisk {
    pub id: String,
    pub score: f64,
    pub amount: f64,
}

/// Summary statistics over one scored dataset. Always recomputed from the full
/// collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct DatasetSummary {
    pub total_transactions: usize,
    pub fraud_count: usize,
    /// `fraud_count / total * 100`; 0 for an empty dataset.
    pub fraud_percentage: f64,
    /// Mean risk score over fraud-labeled transactions; 0 when there are none.
    pub avg_fraud_risk_score: f64,
    /// `None` only for an empty dataset.
    pub highest_risk_transaction: Option<HighestRisk>,
}

/// Summarize a scored dataset in a single left-to-right pass.
///
/// The highest-risk transaction is the first one holding the maximum score:
/// a later transaction replaces the running maximum only when strictly higher.
pub fn summarize(transactions: &[ScoredTransaction]) -> DatasetSummary {
    let mut fraud_count = 0usize;
    let mut fraud_risk_sum = 0.0;
    let mut highest: Option<&ScoredTransaction> = None;

    for tx in transactions {
        if tx.is_fraud() {
            fraud_count += 1;
            fraud_risk_sum += tx.risk_score;
        }
        match highest {
            Some(max) if tx.risk_score <= max.risk_score => {}
            _ => highest = Some(tx),
        }
    }

    let total = transactions.len();
    DatasetSummary {
        total_transactions: total,
        fraud_count,
        fraud_percentage: if total > 0 {
            fraud_count as f64 / total as f64 * 100.0
        } else {
            0.0
        },
        avg_fraud_risk_score: if fraud_count > 0 {
            fraud_risk_sum / fraud_count as f64
        } else {
            0.0
        },
        highest_risk_transaction: highest.map(|tx| HighestRisk {
            id: tx.transaction_id.clone(),
            score: tx.risk_score,
            amount: tx.transaction_amount,
        }),
    }
}
