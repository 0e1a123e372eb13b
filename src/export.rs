use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::ingest::types::ScoredTransaction;

pub const PAGE_SIZE: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    #[default]
    RiskScore,
    TransactionAmount,
    Timestamp,
    CustomerId,
    TransactionId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

/// Table filter, sort and page controls.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct TableQuery {
    /// Case-insensitive substring over every displayed column: ids, channel,
    /// amount, timestamp and risk (as a fraction or as percent text).
    pub search: Option<String>,
    pub fraud_only: bool,
    pub sort: SortField,
    pub order: SortOrder,
    /// 1-based.
    pub page: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct TablePage<'a> {
    pub transactions: Vec<&'a ScoredTransaction>,
    pub page: usize,
    pub page_size: usize,
    pub total_pages: usize,
    /// Rows matching the filter, across all pages.
    pub total_matching: usize,
}

/// Filter then sort. Export uses this without pagination.
pub fn view<'a>(transactions: &'a [ScoredTransaction], query: &TableQuery) -> Vec<&'a ScoredTransaction> {
    let needle = query
        .search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_lowercase);

    let mut rows: Vec<&ScoredTransaction> = transactions
        .iter()
        .filter(|tx| !query.fraud_only || tx.is_fraud())
        .filter(|tx| needle.as_deref().map_or(true, |n| matches_search(tx, n)))
        .collect();

    // Stable sort keeps upload order among equal keys.
    rows.sort_by(|a, b| {
        let ord = compare(a, b, query.sort);
        match query.order {
            SortOrder::Asc => ord,
            SortOrder::Desc => ord.reverse(),
        }
    });
    rows
}

/// `needle` must already be lower-cased.
fn matches_search(tx: &ScoredTransaction, needle: &str) -> bool {
    [
        tx.transaction_id.to_lowercase(),
        tx.customer_id.to_lowercase(),
        tx.channel.to_lowercase(),
        tx.transaction_amount.to_string(),
        tx.timestamp.to_lowercase(),
        tx.risk_score.to_string(),
        format!("{:.2}%", tx.risk_score * 100.0),
    ]
    .iter()
    .any(|field| field.contains(needle))
}

fn compare(a: &ScoredTransaction, b: &ScoredTransaction, field: SortField) -> Ordering {
    match field {
        SortField::RiskScore => a.risk_score.total_cmp(&b.risk_score),
        SortField::TransactionAmount => a.transaction_amount.total_cmp(&b.transaction_amount),
        SortField::Timestamp => a.timestamp.cmp(&b.timestamp),
        SortField::CustomerId => a.customer_id.cmp(&b.customer_id),
        SortField::TransactionId => a.transaction_id.cmp(&b.transaction_id),
    }
}

pub fn paginate<'a>(rows: Vec<&'a ScoredTransaction>, page: Option<usize>) -> TablePage<'a> {
    let total_matching = rows.len();
    let total_pages = total_matching.div_ceil(PAGE_SIZE).max(1);
    let page = page.unwrap_or(1).clamp(1, total_pages);
    let transactions = rows
        .into_iter()
        .skip((page - 1) * PAGE_SIZE)
        .take(PAGE_SIZE)
        .collect();
    TablePage {
        transactions,
        page,
        page_size: PAGE_SIZE,
        total_pages,
        total_matching,
    }
}

/// Render rows as CSV, risk shown as a percentage with two decimals.
pub fn export_csv(rows: &[&ScoredTransaction]) -> eyre::Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record([
        "Transaction ID",
        "Customer ID",
        "Amount",
        "Channel",
        "Timestamp",
        "Risk Score",
    ])?;
    for tx in rows {
        let amount = tx.transaction_amount.to_string();
        let risk = format!("{:.2}%", tx.risk_score * 100.0);
        writer.write_record([
            tx.transaction_id.as_str(),
            tx.customer_id.as_str(),
            amount.as_str(),
            tx.channel.as_str(),
            tx.timestamp.as_str(),
            risk.as_str(),
        ])?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| eyre::eyre!("Failed to flush CSV export: {}", e))?;
    Ok(String::from_utf8(bytes)?)
}
