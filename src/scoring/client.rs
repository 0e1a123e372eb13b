use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::ScoringError;
use crate::ingest::types::{CanonicalTransaction, ScoredTransaction};

use super::Scorer;

#[derive(Serialize)]
struct ScorePayload<'a> {
    transactions: &'a [CanonicalTransaction],
}

#[derive(Deserialize)]
struct ScoreReply {
    transactions: Option<Vec<ScoredTransaction>>,
}

/// Scores batches by POSTing them to a remote scoring endpoint.
/// One request per batch; the transport timeout is the only time bound.
pub struct HttpScorer {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpScorer {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> eyre::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| eyre::eyre!("Failed to build scoring HTTP client: {}", e))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl Scorer for HttpScorer {
    async fn score(
        &self,
        batch: &[CanonicalTransaction],
    ) -> Result<Vec<ScoredTransaction>, ScoringError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&ScorePayload {
                transactions: batch,
            })
            .send()
            .await
            .map_err(|e| ScoringError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ScoringError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let reply: ScoreReply = response
            .json()
            .await
            .map_err(|e| ScoringError::Malformed(e.to_string()))?;

        reply
            .transactions
            .ok_or_else(|| ScoringError::Malformed("response has no `transactions` field".into()))
    }

    fn name(&self) -> &str {
        "http"
    }
}
