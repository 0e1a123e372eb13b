use serde::{Deserialize, Serialize};

/// A dynamically typed CSV cell.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Text(String),
    Number(f64),
    Bool(bool),
}

impl RawValue {
    /// Type a trimmed, non-empty cell the way a spreadsheet would.
    pub fn infer(cell: &str) -> Self {
        if cell.eq_ignore_ascii_case("true") {
            return Self::Bool(true);
        }
        if cell.eq_ignore_ascii_case("false") {
            return Self::Bool(false);
        }
        match cell.parse::<f64>() {
            Ok(n) if n.is_finite() => Self::Number(n),
            _ => Self::Text(cell.to_string()),
        }
    }

    pub fn as_text(&self) -> String {
        match self {
            Self::Text(s) => s.clone(),
            Self::Number(n) => n.to_string(),
            Self::Bool(b) => b.to_string(),
        }
    }
}

/// One parsed CSV row: column name to value, in header order.
/// Blank cells are not stored, so a present key always carries a value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRow {
    fields: Vec<(String, RawValue)>,
}

impl RawRow {
    /// Case-insensitive lookup of a single column name.
    pub fn get(&self, column: &str) -> Option<&RawValue> {
        self.fields
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(column))
            .map(|(_, v)| v)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }
}

impl<K: Into<String>> FromIterator<(K, RawValue)> for RawRow {
    fn from_iter<I: IntoIterator<Item = (K, RawValue)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

/// The normalized, fully defaulted form of one input row.
/// Serialized with the column names the scoring endpoint expects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalTransaction {
    #[serde(rename = "Transaction_Type")]
    pub transaction_type: String,
    #[serde(rename = "Timestamp")]
    pub timestamp: String,
    #[serde(rename = "Account_Balance")]
    pub account_balance: f64,
    #[serde(rename = "Device_Type")]
    pub device_type: String,
    #[serde(rename = "Location")]
    pub location: String,
    #[serde(rename = "Merchant_Category")]
    pub merchant_category: String,
    #[serde(rename = "IP_Address_Flag")]
    pub ip_address_flag: u8,
    #[serde(rename = "Previous_Fraudulent_Activity")]
    pub previous_fraud_flag: u8,
    #[serde(rename = "Daily_Transaction_Count")]
    pub daily_transaction_count: u32,
    #[serde(rename = "Avg_Transaction_Amount_7d")]
    pub avg_transaction_amount_7d: f64,
    #[serde(rename = "Failed_Transaction_Count_7d")]
    pub failed_transaction_count_7d: u32,
    #[serde(rename = "Card_Type")]
    pub card_type: String,
    #[serde(rename = "Card_Age")]
    pub card_age_days: u32,
    #[serde(rename = "Transaction_Distance")]
    pub transaction_distance: f64,
    #[serde(rename = "Authentication_Method")]
    pub authentication_method: String,
    /// Risk score declared by the source row, as a fraction in [0, 1].
    #[serde(rename = "Risk_Score")]
    pub declared_risk_score: f64,
    #[serde(rename = "Is_Weekend")]
    pub is_weekend: bool,
}

/// Engineered features a model may report alongside its prediction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelFeatures {
    pub amount_log: f64,
    pub velocity_score: f64,
    pub kyc_risk_score: f64,
    pub combined_feature_score: f64,
}

/// A canonical transaction after scoring.
///
/// `risk_score` is always a fraction in [0, 1]; percentages only appear at
/// presentation boundaries (export, display).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredTransaction {
    #[serde(default)]
    pub transaction_id: String,
    #[serde(default)]
    pub customer_id: String,
    #[serde(default)]
    pub transaction_amount: f64,
    #[serde(default)]
    pub channel: String,
    #[serde(default)]
    pub timestamp: String,
    pub is_fraud: u8,
    pub risk_score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kyc_verified: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_age_days: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_features: Option<ModelFeatures>,
    #[serde(flatten)]
    pub transaction: CanonicalTransaction,
}

impl ScoredTransaction {
    pub fn is_fraud(&self) -> bool {
        self.is_fraud == 1
    }

    /// Fill identifiers and display fields the scorer left blank.
    /// `row` is the 1-based position of the transaction in the upload.
    pub fn fill_missing(&mut self, row: usize) {
        if self.transaction_id.is_empty() {
            self.transaction_id = format!("TXN_{:06}", row);
        }
        if self.customer_id.is_empty() {
            self.customer_id = format!("CUST_{:06}", row);
        }
        if self.timestamp.is_empty() {
            self.timestamp = self.transaction.timestamp.clone();
        }
        if self.channel.is_empty() {
            self.channel = channel_for_device(&self.transaction.device_type).to_string();
        }
        if self.transaction_amount == 0.0 {
            self.transaction_amount = self.transaction.account_balance;
        }
        self.risk_score = self.risk_score.clamp(0.0, 1.0);
    }
}

/// Map a device type onto the channel shown in tables and charts.
pub fn channel_for_device(device_type: &str) -> &'static str {
    match device_type {
        "Desktop" | "Tablet" => "Online",
        "ATM" => "ATM",
        "POS" => "POS",
        _ => "Mobile",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_infer_types() {
        assert_eq!(RawValue::infer("TRUE"), RawValue::Bool(true));
        assert_eq!(RawValue::infer("false"), RawValue::Bool(false));
        assert_eq!(RawValue::infer("12.5"), RawValue::Number(12.5));
        assert_eq!(RawValue::infer("Mobile"), RawValue::Text("Mobile".to_string()));
        // "inf" and "NaN" parse as f64 but are not usable numbers
        assert_eq!(RawValue::infer("NaN"), RawValue::Text("NaN".to_string()));
    }

    #[test]
    fn test_row_lookup_is_case_insensitive() {
        let row: RawRow = vec![("device_type", RawValue::Text("ATM".to_string()))]
            .into_iter()
            .collect();
        assert_eq!(row.get("Device_Type"), Some(&RawValue::Text("ATM".to_string())));
        assert_eq!(row.get("DEVICE_TYPE"), Some(&RawValue::Text("ATM".to_string())));
        assert!(row.get("Location").is_none());
    }

    #[test]
    fn test_channel_mapping() {
        assert_eq!(channel_for_device("Desktop"), "Online");
        assert_eq!(channel_for_device("Tablet"), "Online");
        assert_eq!(channel_for_device("POS"), "POS");
        assert_eq!(channel_for_device("Smartwatch"), "Mobile");
    }
}
