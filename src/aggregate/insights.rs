use serde::Serialize;
use std::collections::BTreeMap;

use crate::assessment::Verdict;
use crate::history::ReviewRecord;
use crate::ingest::timestamp::parse_timestamp_utc;
use crate::ingest::types::ScoredTransaction;

use super::DatasetSummary;

/// Risk above this is "high".
pub const HIGH_RISK: f64 = 0.7;
/// Risk at or above this (and not high) is "medium".
pub const MEDIUM_RISK: f64 = 0.4;
const TREND_DAYS: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelBreakdown {
    pub channel: String,
    pub total: usize,
    pub fraud: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct RiskDistribution {
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskBin {
    pub range: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyFraudRate {
    pub date: String,
    pub fraud_percentage: f64,
}

/// One fraud-labeled transaction on the amount vs risk scatter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AmountRiskPoint {
    pub transaction_id: String,
    pub amount: f64,
    pub risk_score: f64,
}

/// Chart and panel data for a scored dataset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Insights {
    pub fraud_count: usize,
    pub legit_count: usize,
    pub by_channel: Vec<ChannelBreakdown>,
    pub risk_distribution: RiskDistribution,
    /// Histogram of fraud-labeled risk scores in ten 10% bins.
    pub fraud_risk_histogram: Vec<RiskBin>,
    /// Fraud rate per UTC day, oldest first, at most the last ten days.
    pub daily_trend: Vec<DailyFraudRate>,
    /// Fraud transactions with a positive amount and risk, in upload order.
    pub fraud_amount_vs_risk: Vec<AmountRiskPoint>,
    pub total_amount: f64,
    pub amount_protected: f64,
    pub avg_risk_score: f64,
}

pub fn compute_insights(transactions: &[ScoredTransaction]) -> Insights {
    let mut channels: BTreeMap<String, (usize, usize)> = BTreeMap::new();
    let mut days: BTreeMap<String, (usize, usize)> = BTreeMap::new();
    let mut distribution = RiskDistribution::default();
    let mut histogram = vec![0usize; 10];
    let mut scatter = Vec::new();
    let mut fraud_count = 0;
    let mut total_amount = 0.0;
    let mut amount_protected = 0.0;
    let mut risk_sum = 0.0;

    for tx in transactions {
        let fraud = tx.is_fraud();
        let channel = [tx.channel.as_str(), tx.transaction.device_type.as_str()]
            .into_iter()
            .find(|c| !c.is_empty())
            .unwrap_or("Unknown");
        let entry = channels.entry(channel.to_string()).or_default();
        entry.0 += 1;

        if let Some(day) = utc_day(&tx.timestamp) {
            let entry = days.entry(day).or_default();
            entry.0 += 1;
            if fraud {
                entry.1 += 1;
            }
        }

        if tx.risk_score > HIGH_RISK {
            distribution.high += 1;
        } else if tx.risk_score >= MEDIUM_RISK {
            distribution.medium += 1;
        } else {
            distribution.low += 1;
        }

        total_amount += tx.transaction_amount;
        risk_sum += tx.risk_score;

        if fraud {
            fraud_count += 1;
            amount_protected += tx.transaction_amount;
            if let Some(entry) = channels.get_mut(channel) {
                entry.1 += 1;
            }
            let bin = ((tx.risk_score * 10.0).floor() as usize).min(9);
            histogram[bin] += 1;
            if tx.transaction_amount > 0.0 && tx.risk_score > 0.0 {
                scatter.push(AmountRiskPoint {
                    transaction_id: tx.transaction_id.clone(),
                    amount: tx.transaction_amount,
                    risk_score: tx.risk_score,
                });
            }
        }
    }

    let mut daily_trend: Vec<DailyFraudRate> = days
        .into_iter()
        .map(|(date, (total, fraud))| DailyFraudRate {
            date,
            fraud_percentage: fraud as f64 / total as f64 * 100.0,
        })
        .collect();
    if daily_trend.len() > TREND_DAYS {
        daily_trend.drain(..daily_trend.len() - TREND_DAYS);
    }

    Insights {
        fraud_count,
        legit_count: transactions.len() - fraud_count,
        by_channel: channels
            .into_iter()
            .map(|(channel, (total, fraud))| ChannelBreakdown {
                channel,
                total,
                fraud,
            })
            .collect(),
        risk_distribution: distribution,
        fraud_risk_histogram: histogram
            .into_iter()
            .enumerate()
            .map(|(i, count)| RiskBin {
                range: format!("{}-{}%", i * 10, (i + 1) * 10),
                count,
            })
            .collect(),
        daily_trend,
        fraud_amount_vs_risk: scatter,
        total_amount,
        amount_protected,
        avg_risk_score: if transactions.is_empty() {
            0.0
        } else {
            risk_sum / transactions.len() as f64
        },
    }
}

fn utc_day(timestamp: &str) -> Option<String> {
    parse_timestamp_utc(timestamp).map(|t| t.format("%Y-%m-%d").to_string())
}

/// Headline numbers for the dashboard cards.
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct DashboardStats {
    pub source: StatsSource,
    pub total_transactions: usize,
    pub fraud_detected: usize,
    pub fraud_rate: f64,
    pub total_amount: f64,
    /// Fraction in [0, 1].
    pub avg_risk_score: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StatsSource {
    Dataset,
    History,
    #[default]
    Empty,
}

/// Prefer the uploaded dataset; fall back to single-transaction history.
pub fn dashboard_stats(
    dataset: Option<(&[ScoredTransaction], &DatasetSummary)>,
    history: &[ReviewRecord],
) -> DashboardStats {
    if let Some((transactions, summary)) = dataset.filter(|(t, _)| !t.is_empty()) {
        return DashboardStats {
            source: StatsSource::Dataset,
            total_transactions: summary.total_transactions,
            fraud_detected: summary.fraud_count,
            fraud_rate: summary.fraud_percentage,
            total_amount: transactions.iter().map(|t| t.transaction_amount).sum(),
            avg_risk_score: transactions.iter().map(|t| t.risk_score).sum::<f64>()
                / transactions.len() as f64,
        };
    }

    if history.is_empty() {
        return DashboardStats::default();
    }

    let total = history.len();
    let fraud = history
        .iter()
        .filter(|r| r.prediction == Verdict::Fraud)
        .count();
    DashboardStats {
        source: StatsSource::History,
        total_transactions: total,
        fraud_detected: fraud,
        fraud_rate: fraud as f64 / total as f64 * 100.0,
        total_amount: history.iter().map(|r| r.transaction_amount).sum(),
        avg_risk_score: history.iter().map(|r| r.risk_score).sum::<f64>() / total as f64,
    }
}
