use chrono::{DateTime, Timelike, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::error::{ReviewError, ValidationError};
use crate::history::{ReviewRecord, TransactionRepository};
use crate::ingest::timestamp::parse_timestamp;

/// Points above which a transaction is predicted fraudulent.
const FRAUD_THRESHOLD: u32 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Fraud,
    Legit,
}

/// A single-transaction submission as received. Every field is optional on
/// the wire so that missing ones can be reported together.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReviewRequest {
    pub customer_id: Option<String>,
    pub kyc_verified: Option<bool>,
    pub account_age_days: Option<u32>,
    pub transaction_amount: Option<f64>,
    pub channel: Option<String>,
    pub timestamp: Option<String>,
}

/// A submission with every required field present.
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewInput {
    pub customer_id: String,
    pub kyc_verified: bool,
    pub account_age_days: u32,
    pub transaction_amount: f64,
    pub channel: String,
    pub timestamp: Option<String>,
}

impl ReviewRequest {
    pub fn validate(self) -> Result<ReviewInput, ValidationError> {
        let customer_id = self.customer_id.filter(|s| !s.trim().is_empty());
        let channel = self.channel.filter(|s| !s.trim().is_empty());

        let mut missing = Vec::new();
        if customer_id.is_none() {
            missing.push("customer_id");
        }
        if self.kyc_verified.is_none() {
            missing.push("kyc_verified");
        }
        if self.account_age_days.is_none() {
            missing.push("account_age_days");
        }
        if self.transaction_amount.is_none() {
            missing.push("transaction_amount");
        }
        if channel.is_none() {
            missing.push("channel");
        }

        match (
            customer_id,
            self.kyc_verified,
            self.account_age_days,
            self.transaction_amount,
            channel,
        ) {
            (
                Some(customer_id),
                Some(kyc_verified),
                Some(account_age_days),
                Some(transaction_amount),
                Some(channel),
            ) => Ok(ReviewInput {
                customer_id,
                kyc_verified,
                account_age_days,
                transaction_amount,
                channel,
                timestamp: self.timestamp.filter(|s| !s.trim().is_empty()),
            }),
            _ => Err(ValidationError { missing }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskRule {
    HighAmount,
    NewAccount,
    KycUnverified,
    OnlineChannel,
    OddHours,
}

/// One triggered rule and the points it contributes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskFactor {
    pub rule: RiskRule,
    pub points: u32,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Assessment {
    pub prediction: Verdict,
    /// Fraction in [0, 1].
    pub risk_score: f64,
    /// Fraction in [0, 1].
    pub confidence: f64,
    pub reason: Option<String>,
    pub factors: Vec<RiskFactor>,
}

/// Check whether the amount is unusually large.
pub fn check_amount(input: &ReviewInput) -> Option<RiskFactor> {
    let amount = input.transaction_amount;
    let (points, description) = if amount > 10_000.0 {
        (30, format!("the amount ({:.2}) is significantly higher than usual", amount))
    } else if amount > 5_000.0 {
        (15, format!("the amount ({:.2}) is higher than average", amount))
    } else {
        return None;
    };
    Some(RiskFactor {
        rule: RiskRule::HighAmount,
        points,
        description,
    })
}

/// Check whether the account is young.
pub fn check_account_age(input: &ReviewInput) -> Option<RiskFactor> {
    let age = input.account_age_days;
    let (points, description) = if age < 30 {
        (25, format!("the account is very new ({} days old)", age))
    } else if age < 90 {
        (10, format!("the account is relatively new ({} days old)", age))
    } else {
        return None;
    };
    Some(RiskFactor {
        rule: RiskRule::NewAccount,
        points,
        description,
    })
}

pub fn check_kyc(input: &ReviewInput) -> Option<RiskFactor> {
    (!input.kyc_verified).then(|| RiskFactor {
        rule: RiskRule::KycUnverified,
        points: 20,
        description: "the account is not KYC verified".to_string(),
    })
}

pub fn check_channel(input: &ReviewInput) -> Option<RiskFactor> {
    input.channel.eq_ignore_ascii_case("online").then(|| RiskFactor {
        rule: RiskRule::OnlineChannel,
        points: 10,
        description: "the transaction occurred through an online channel".to_string(),
    })
}

/// Check whether the transaction happened between midnight and 6am.
pub fn check_hour(input: &ReviewInput, now: DateTime<Utc>) -> Option<RiskFactor> {
    let hour = transaction_hour(input.timestamp.as_deref(), now);
    (hour < 6).then(|| RiskFactor {
        rule: RiskRule::OddHours,
        points: 15,
        description: format!("it occurred at an unusual time ({}:00 AM)", hour),
    })
}

/// Hour of day of a submitted timestamp, in the timestamp's own offset.
/// Anything unparseable uses `now`.
fn transaction_hour(timestamp: Option<&str>, now: DateTime<Utc>) -> u32 {
    timestamp
        .and_then(parse_timestamp)
        .map(|at| at.hour())
        .unwrap_or_else(|| now.hour())
}

/// Run every rule, add up to 19 points of noise and decide.
pub fn assess<R: Rng>(rng: &mut R, input: &ReviewInput, now: DateTime<Utc>) -> Assessment {
    let factors: Vec<RiskFactor> = [
        check_amount(input),
        check_account_age(input),
        check_kyc(input),
        check_channel(input),
        check_hour(input, now),
    ]
    .into_iter()
    .flatten()
    .collect();

    let points = factors.iter().map(|f| f.points).sum::<u32>() + rng.gen_range(0..20u32);
    let is_fraud = points > FRAUD_THRESHOLD;
    let confidence = (75 + rng.gen_range(0..20u32)).min(95);

    let reason = (is_fraud && !factors.is_empty()).then(|| {
        let parts: Vec<&str> = factors.iter().map(|f| f.description.as_str()).collect();
        format!("This transaction is suspicious because {}.", parts.join(", "))
    });

    Assessment {
        prediction: if is_fraud { Verdict::Fraud } else { Verdict::Legit },
        risk_score: f64::from(points.min(100)) / 100.0,
        confidence: f64::from(confidence) / 100.0,
        reason,
        factors,
    }
}

/// Reviews single transactions and records each result in the history.
pub struct ReviewService {
    history: Arc<dyn TransactionRepository>,
    rng: Mutex<StdRng>,
}

impl ReviewService {
    pub fn new(history: Arc<dyn TransactionRepository>, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            history,
            rng: Mutex::new(rng),
        }
    }

    pub fn history(&self) -> &Arc<dyn TransactionRepository> {
        &self.history
    }

    pub async fn review(
        &self,
        request: ReviewRequest,
    ) -> Result<(ReviewRecord, Assessment), ReviewError> {
        let input = request.validate()?;
        let now = Utc::now();
        let assessment = {
            let mut rng = self.rng.lock().await;
            assess(&mut *rng, &input, now)
        };

        let record = ReviewRecord {
            id: format!("TXN{}", now.timestamp_millis()),
            customer_id: input.customer_id,
            kyc_verified: input.kyc_verified,
            account_age_days: input.account_age_days,
            transaction_amount: input.transaction_amount,
            channel: input.channel,
            transaction_time: input
                .timestamp
                .unwrap_or_else(|| now.to_rfc3339()),
            prediction: assessment.prediction,
            risk_score: assessment.risk_score,
            confidence: assessment.confidence,
            reason: assessment.reason.clone(),
            reviewed_at: now,
        };

        self.history
            .append(record.clone())
            .await
            .map_err(|e| ReviewError::Storage(e.to_string()))?;

        tracing::info!(
            id = %record.id,
            prediction = ?record.prediction,
            risk_score = record.risk_score,
            factors = assessment.factors.len(),
            "Transaction reviewed"
        );

        Ok((record, assessment))
    }
}
