use chrono::{DateTime, SecondsFormat, Utc};

use super::types::{CanonicalTransaction, RawRow, RawValue};

// Header aliases in priority order. Lookup is case-insensitive, so each entry
// also covers its lower-cased spelling.
const TRANSACTION_TYPE: &[&str] = &["Transaction_Type"];
const TIMESTAMP: &[&str] = &["Timestamp"];
const ACCOUNT_BALANCE: &[&str] = &["Account_Balance", "Transaction_Amount", "Amount"];
const DEVICE_TYPE: &[&str] = &["Device_Type"];
const LOCATION: &[&str] = &["Location"];
const MERCHANT_CATEGORY: &[&str] = &["Merchant_Category"];
const IP_ADDRESS_FLAG: &[&str] = &["IP_Address_Flag"];
const PREVIOUS_FRAUD: &[&str] = &["Previous_Fraudulent_Activity", "Previous_Fraud_Flag"];
const DAILY_COUNT: &[&str] = &["Daily_Transaction_Count"];
const AVG_AMOUNT_7D: &[&str] = &["Avg_Transaction_Amount_7d"];
const FAILED_COUNT_7D: &[&str] = &["Failed_Transaction_Count_7d"];
const CARD_TYPE: &[&str] = &["Card_Type"];
const CARD_AGE: &[&str] = &["Card_Age", "Card_Age_Days"];
const DISTANCE: &[&str] = &["Transaction_Distance"];
const AUTH_METHOD: &[&str] = &["Authentication_Method"];
const RISK_SCORE: &[&str] = &["Risk_Score"];
const IS_WEEKEND: &[&str] = &["Is_Weekend"];

/// Normalize one raw row into a canonical transaction.
///
/// Never rejects a row. A missing column takes its default; a present
/// numeric column that fails to parse becomes 0. `now` stands in for an
/// absent timestamp.
pub fn normalize_row(row: &RawRow, now: DateTime<Utc>) -> CanonicalTransaction {
    let declared = float_or(row, RISK_SCORE, 0.0);

    CanonicalTransaction {
        transaction_type: text_or(row, TRANSACTION_TYPE, "Online"),
        timestamp: lookup(row, TIMESTAMP)
            .map(RawValue::as_text)
            .unwrap_or_else(|| now.to_rfc3339_opts(SecondsFormat::Millis, true)),
        account_balance: float_or(row, ACCOUNT_BALANCE, 0.0),
        device_type: text_or(row, DEVICE_TYPE, "Mobile"),
        location: text_or(row, LOCATION, "Unknown"),
        merchant_category: text_or(row, MERCHANT_CATEGORY, "Retail"),
        ip_address_flag: flag(row, IP_ADDRESS_FLAG),
        previous_fraud_flag: flag(row, PREVIOUS_FRAUD),
        daily_transaction_count: int_or(row, DAILY_COUNT, 1),
        avg_transaction_amount_7d: float_or(row, AVG_AMOUNT_7D, 0.0),
        failed_transaction_count_7d: int_or(row, FAILED_COUNT_7D, 0),
        card_type: text_or(row, CARD_TYPE, "Credit"),
        card_age_days: int_or(row, CARD_AGE, 365),
        transaction_distance: float_or(row, DISTANCE, 0.0),
        authentication_method: text_or(row, AUTH_METHOD, "Basic"),
        declared_risk_score: if declared > 1.0 { declared / 100.0 } else { declared },
        is_weekend: lookup(row, IS_WEEKEND).map(truthy).unwrap_or(false),
    }
}

/// Normalize a sequence of rows against a single clock reading.
pub fn normalize_rows(rows: &[RawRow], now: DateTime<Utc>) -> Vec<CanonicalTransaction> {
    rows.iter().map(|row| normalize_row(row, now)).collect()
}

fn lookup<'a>(row: &'a RawRow, aliases: &[&str]) -> Option<&'a RawValue> {
    aliases.iter().find_map(|alias| row.get(alias))
}

fn text_or(row: &RawRow, aliases: &[&str], default: &str) -> String {
    lookup(row, aliases)
        .map(RawValue::as_text)
        .unwrap_or_else(|| default.to_string())
}

fn parse_number(value: &RawValue) -> f64 {
    let n = match value {
        RawValue::Number(n) => *n,
        RawValue::Bool(b) => f64::from(u8::from(*b)),
        RawValue::Text(s) => s.trim().parse::<f64>().unwrap_or(0.0),
    };
    if n.is_finite() && n > 0.0 {
        n
    } else {
        0.0
    }
}

fn float_or(row: &RawRow, aliases: &[&str], default: f64) -> f64 {
    lookup(row, aliases).map(parse_number).unwrap_or(default)
}

fn int_or(row: &RawRow, aliases: &[&str], default: u32) -> u32 {
    lookup(row, aliases)
        .map(|v| parse_number(v).trunc().min(f64::from(u32::MAX)) as u32)
        .unwrap_or(default)
}

fn truthy(value: &RawValue) -> bool {
    match value {
        RawValue::Bool(b) => *b,
        RawValue::Number(n) => *n == 1.0,
        RawValue::Text(s) => s.eq_ignore_ascii_case("true") || s == "1",
    }
}

fn flag(row: &RawRow, aliases: &[&str]) -> u8 {
    let set = lookup(row, aliases)
        .map(|v| match v {
            RawValue::Number(n) => *n != 0.0,
            other => truthy(other),
        })
        .unwrap_or(false);
    u8::from(set)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn row(fields: &[(&str, RawValue)]) -> RawRow {
        fields.iter().cloned().collect()
    }

    fn text(s: &str) -> RawValue {
        RawValue::Text(s.to_string())
    }

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 9, 12, 30, 0).unwrap()
    }

    #[test]
    fn test_empty_columns_take_defaults() {
        let tx = normalize_row(&row(&[("unrelated", text("x"))]), fixed_now());

        assert_eq!(tx.transaction_type, "Online");
        assert_eq!(tx.timestamp, "2024-03-09T12:30:00.000Z");
        assert_eq!(tx.account_balance, 0.0);
        assert_eq!(tx.device_type, "Mobile");
        assert_eq!(tx.location, "Unknown");
        assert_eq!(tx.merchant_category, "Retail");
        assert_eq!(tx.ip_address_flag, 0);
        assert_eq!(tx.previous_fraud_flag, 0);
        assert_eq!(tx.daily_transaction_count, 1);
        assert_eq!(tx.avg_transaction_amount_7d, 0.0);
        assert_eq!(tx.failed_transaction_count_7d, 0);
        assert_eq!(tx.card_type, "Credit");
        assert_eq!(tx.card_age_days, 365);
        assert_eq!(tx.transaction_distance, 0.0);
        assert_eq!(tx.authentication_method, "Basic");
        assert_eq!(tx.declared_risk_score, 0.0);
        assert!(!tx.is_weekend);
    }

    #[test]
    fn test_amount_aliases_in_priority_order() {
        let only_amount = row(&[("amount", RawValue::Number(250.0))]);
        assert_eq!(normalize_row(&only_amount, fixed_now()).account_balance, 250.0);

        let both = row(&[
            ("amount", RawValue::Number(1.0)),
            ("ACCOUNT_BALANCE", RawValue::Number(2.0)),
        ]);
        assert_eq!(normalize_row(&both, fixed_now()).account_balance, 2.0);

        let tx_amount = row(&[
            ("amount", RawValue::Number(1.0)),
            ("transaction_amount", RawValue::Number(3.0)),
        ]);
        assert_eq!(normalize_row(&tx_amount, fixed_now()).account_balance, 3.0);
    }

    #[test]
    fn test_unparseable_numbers_become_zero() {
        let tx = normalize_row(
            &row(&[
                ("Account_Balance", text("n/a")),
                ("card_age", text("brand new")),
                ("daily_transaction_count", text("many")),
                ("transaction_distance", RawValue::Number(-12.0)),
            ]),
            fixed_now(),
        );
        assert_eq!(tx.account_balance, 0.0);
        assert_eq!(tx.card_age_days, 0);
        assert_eq!(tx.daily_transaction_count, 0);
        assert_eq!(tx.transaction_distance, 0.0);
    }

    #[test]
    fn test_integers_truncate() {
        let tx = normalize_row(
            &row(&[
                ("Failed_Transaction_Count_7d", RawValue::Number(3.9)),
                ("Card_Age", text("45.2")),
            ]),
            fixed_now(),
        );
        assert_eq!(tx.failed_transaction_count_7d, 3);
        assert_eq!(tx.card_age_days, 45);
    }

    #[test]
    fn test_is_weekend_coercion() {
        let cases = [
            (RawValue::Bool(true), true),
            (RawValue::Number(1.0), true),
            (RawValue::Number(0.0), false),
            (RawValue::Number(2.0), false),
            (text("TRUE"), true),
            (text("1"), true),
            (text("yes"), false),
        ];
        for (value, expected) in cases {
            let tx = normalize_row(&row(&[("is_weekend", value.clone())]), fixed_now());
            assert_eq!(tx.is_weekend, expected, "value {:?}", value);
        }
    }

    #[test]
    fn test_flags_and_declared_risk() {
        let tx = normalize_row(
            &row(&[
                ("ip_address_flag", RawValue::Number(1.0)),
                ("Previous_Fraudulent_Activity", text("true")),
                ("Risk_Score", RawValue::Number(85.0)),
            ]),
            fixed_now(),
        );
        assert_eq!(tx.ip_address_flag, 1);
        assert_eq!(tx.previous_fraud_flag, 1);
        assert!((tx.declared_risk_score - 0.85).abs() < 1e-9);

        let fraction = normalize_row(&row(&[("risk_score", RawValue::Number(0.4))]), fixed_now());
        assert!((fraction.declared_risk_score - 0.4).abs() < 1e-9);
    }

    #[test]
    fn test_source_timestamp_preserved() {
        let tx = normalize_row(
            &row(&[("timestamp", text("2023-12-31T23:59:00Z"))]),
            fixed_now(),
        );
        assert_eq!(tx.timestamp, "2023-12-31T23:59:00Z");
    }

    #[test]
    fn test_numeric_strings_kept_as_text() {
        let tx = normalize_row(&row(&[("Location", RawValue::Number(75001.0))]), fixed_now());
        assert_eq!(tx.location, "75001");
    }
}
