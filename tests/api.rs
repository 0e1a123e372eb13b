use std::sync::Arc;
use std::time::Duration;

use fraudshield::api::{router, AppState};
use fraudshield::config::{Config, ScoringMode};
use fraudshield::error::ScoringError;
use fraudshield::ingest::normalizer::normalize_row;
use fraudshield::ingest::types::{RawRow, RawValue};
use fraudshield::scoring::client::HttpScorer;
use fraudshield::scoring::Scorer;
use serde_json::Value;

const SAMPLE_CSV: &str = "\
Transaction_ID,Customer_ID,Transaction_Amount,Device_Type,Timestamp
,,100,Mobile,2024-05-01T10:00:00Z
,,20000,Desktop,2024-05-01T11:00:00Z
,,50,POS,2024-05-02T09:30:00Z
";

fn test_config() -> Config {
    let mut config = Config::default();
    config.scoring.seed = Some(7);
    config.upload.batch_size = 2;
    config
}

async fn spawn_server(config: Config) -> String {
    let state = Arc::new(AppState::from_config(&config).expect("app state"));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test listener");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, router(state)).await.expect("serve");
    });
    format!("http://{}", addr)
}

async fn upload(client: &reqwest::Client, base: &str, csv: &str) -> reqwest::Response {
    client
        .post(format!("{}/api/v1/bulk/upload?filename=transactions.csv", base))
        .header("content-type", "text/csv")
        .body(csv.to_string())
        .send()
        .await
        .expect("upload request")
}

#[tokio::test]
async fn test_health() {
    let base = spawn_server(test_config()).await;
    let body: Value = reqwest::get(format!("{}/api/v1/health", base))
        .await
        .expect("health request")
        .json()
        .await
        .expect("health json");
    assert_eq!(body["status"], "ok");
    assert_eq!(body["scorer"], "builtin");
    assert_eq!(body["dataset_loaded"], false);
}

#[tokio::test]
async fn test_bulk_upload_then_dataset_views() {
    let base = spawn_server(test_config()).await;
    let client = reqwest::Client::new();

    let resp = client
        .get(format!("{}/api/v1/dataset", base))
        .send()
        .await
        .expect("dataset request");
    assert_eq!(resp.status(), 404);

    let resp = upload(&client, &base, SAMPLE_CSV).await;
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.expect("upload json");
    assert_eq!(body["batches"], 2);
    assert_eq!(body["summary"]["total_transactions"], 3);
    assert_eq!(body["model_info"]["model_type"], "XGBoostClassifier");
    assert!(body["summary"]["highest_risk_transaction"]["id"]
        .as_str()
        .expect("highest risk id")
        .starts_with("TXN_"));

    let page: Value = client
        .get(format!(
            "{}/api/v1/dataset/transactions?sort=transaction_amount&order=asc",
            base
        ))
        .send()
        .await
        .expect("table request")
        .json()
        .await
        .expect("table json");
    assert_eq!(page["total_matching"], 3);
    assert_eq!(page["transactions"][0]["transaction_amount"], 50.0);
    assert_eq!(page["transactions"][0]["transaction_id"], "TXN_000003");
    assert_eq!(page["transactions"][2]["channel"], "Online");

    let insights: Value = client
        .get(format!("{}/api/v1/dataset/insights", base))
        .send()
        .await
        .expect("insights request")
        .json()
        .await
        .expect("insights json");
    assert_eq!(insights["total_amount"], 20150.0);
    assert_eq!(insights["daily_trend"].as_array().map(Vec::len), Some(2));

    let stats: Value = client
        .get(format!("{}/api/v1/stats", base))
        .send()
        .await
        .expect("stats request")
        .json()
        .await
        .expect("stats json");
    assert_eq!(stats["source"], "dataset");
    assert_eq!(stats["total_transactions"], 3);

    let resp = client
        .delete(format!("{}/api/v1/dataset", base))
        .send()
        .await
        .expect("clear request");
    assert_eq!(resp.status(), 200);
    let resp = client
        .get(format!("{}/api/v1/dataset/insights", base))
        .send()
        .await
        .expect("insights request");
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn test_export_csv() {
    let base = spawn_server(test_config()).await;
    let client = reqwest::Client::new();
    assert_eq!(upload(&client, &base, SAMPLE_CSV).await.status(), 200);

    let resp = client
        .get(format!("{}/api/v1/dataset/export", base))
        .send()
        .await
        .expect("export request");
    assert_eq!(resp.status(), 200);
    let content_type = resp
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(content_type.starts_with("text/csv"));

    let text = resp.text().await.expect("export body");
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 4);
    assert_eq!(
        lines[0],
        "Transaction ID,Customer ID,Amount,Channel,Timestamp,Risk Score"
    );
    assert!(lines[1..].iter().all(|l| l.ends_with('%')));
}

#[tokio::test]
async fn test_upload_rejections() {
    let base = spawn_server(test_config()).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{}/api/v1/bulk/upload?filename=report.pdf", base))
        .header("content-type", "application/pdf")
        .body("%PDF")
        .send()
        .await
        .expect("upload request");
    assert_eq!(resp.status(), 415);

    let resp = upload(&client, &base, "Transaction_Amount,Device_Type\n").await;
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.expect("error json");
    assert_eq!(body["error"], "CSV file is empty or no valid data rows found");

    let mut config = test_config();
    config.upload.max_file_size_mb = 1;
    let small = spawn_server(config).await;
    let big = format!("Transaction_Amount\n{}", "1\n".repeat(512 * 1024 + 16));
    assert_eq!(upload(&client, &small, &big).await.status(), 413);
}

#[tokio::test]
async fn test_failed_remote_scoring_stores_nothing() {
    let client = reqwest::Client::new();

    // A remote scorer pointed at a port nobody listens on.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
    let dead = format!("http://{}/score", listener.local_addr().expect("addr"));
    drop(listener);

    let mut config = test_config();
    config.scoring.mode = ScoringMode::Remote;
    config.scoring.endpoint = Some(dead);
    config.scoring.timeout_secs = 2;
    let remote = spawn_server(config).await;

    let resp = upload(&client, &remote, SAMPLE_CSV).await;
    assert_eq!(resp.status(), 502);
    let body: Value = resp.json().await.expect("error json");
    assert!(body["error"]
        .as_str()
        .expect("error message")
        .starts_with("Batch 1/2 failed"));

    let resp = client
        .get(format!("{}/api/v1/dataset", remote))
        .send()
        .await
        .expect("dataset request");
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn test_http_scorer_against_score_endpoint() {
    let base = spawn_server(test_config()).await;
    let scorer = HttpScorer::new(format!("{}/api/v1/score", base), Duration::from_secs(5))
        .expect("http scorer");

    let now = chrono::Utc::now();
    let batch: Vec<_> = [100.0, 20000.0, 50.0]
        .into_iter()
        .map(|amount| {
            let row: RawRow = vec![("Transaction_Amount", RawValue::Number(amount))]
                .into_iter()
                .collect();
            normalize_row(&row, now)
        })
        .collect();

    let scored = scorer.score(&batch).await.expect("remote scoring");
    assert_eq!(scored.len(), 3);
    for (tx, input) in scored.iter().zip(&batch) {
        assert!((0.0..=1.0).contains(&tx.risk_score));
        assert!(tx.is_fraud <= 1);
        assert_eq!(tx.transaction.account_balance, input.account_balance);
    }

    // Remote mode wired through the same endpoint runs a full upload.
    let mut config = test_config();
    config.scoring.mode = ScoringMode::Remote;
    config.scoring.endpoint = Some(format!("{}/api/v1/score", base));
    let remote = spawn_server(config).await;
    let client = reqwest::Client::new();
    let resp = upload(&client, &remote, SAMPLE_CSV).await;
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.expect("upload json");
    assert_eq!(body["summary"]["total_transactions"], 3);
}

#[tokio::test]
async fn test_http_scorer_transport_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
    let endpoint = format!("http://{}/score", listener.local_addr().expect("addr"));
    drop(listener);

    let scorer = HttpScorer::new(endpoint, Duration::from_secs(2)).expect("http scorer");
    let row: RawRow = vec![("Amount", RawValue::Number(10.0))].into_iter().collect();
    let err = scorer
        .score(&[normalize_row(&row, chrono::Utc::now())])
        .await
        .unwrap_err();
    assert!(matches!(err, ScoringError::Transport(_)));
}

/// A scoring service that answers 500 on `/down` and a body without
/// `transactions` on `/partial`.
async fn spawn_broken_scorer() -> String {
    use axum::http::StatusCode;
    use axum::routing::post;

    let app = axum::Router::new()
        .route(
            "/down",
            post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
        )
        .route(
            "/partial",
            post(|| async { axum::Json(serde_json::json!({ "summary": {} })) }),
        );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind scorer listener");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve");
    });
    format!("http://{}", addr)
}

#[tokio::test]
async fn test_http_scorer_status_and_malformed_errors() {
    let scorer_base = spawn_broken_scorer().await;
    let row: RawRow = vec![("Amount", RawValue::Number(10.0))].into_iter().collect();
    let batch = vec![normalize_row(&row, chrono::Utc::now())];

    let down = HttpScorer::new(format!("{}/down", scorer_base), Duration::from_secs(5))
        .expect("http scorer");
    match down.score(&batch).await.unwrap_err() {
        ScoringError::Status { status, body } => {
            assert_eq!(status, 500);
            assert_eq!(body, "boom");
        }
        other => panic!("unexpected error: {other}"),
    }

    let partial = HttpScorer::new(format!("{}/partial", scorer_base), Duration::from_secs(5))
        .expect("http scorer");
    assert!(matches!(
        partial.score(&batch).await.unwrap_err(),
        ScoringError::Malformed(_)
    ));

    let client = reqwest::Client::new();
    for route in ["down", "partial"] {
        let mut config = test_config();
        config.scoring.mode = ScoringMode::Remote;
        config.scoring.endpoint = Some(format!("{}/{}", scorer_base, route));
        let remote = spawn_server(config).await;

        let resp = upload(&client, &remote, SAMPLE_CSV).await;
        assert_eq!(resp.status(), 502, "route {}", route);

        let resp = client
            .get(format!("{}/api/v1/dataset", remote))
            .send()
            .await
            .expect("dataset request");
        assert_eq!(resp.status(), 404, "route {}", route);
    }
}

#[tokio::test]
async fn test_single_review_and_history() {
    let base = spawn_server(test_config()).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{}/api/v1/transactions", base))
        .json(&serde_json::json!({ "customer_id": "CUST001" }))
        .send()
        .await
        .expect("review request");
    assert_eq!(resp.status(), 422);
    let body: Value = resp.json().await.expect("error json");
    assert!(body["error"]
        .as_str()
        .expect("error message")
        .contains("kyc_verified"));

    let resp = client
        .post(format!("{}/api/v1/transactions", base))
        .json(&serde_json::json!({
            "customer_id": "CUST001",
            "kyc_verified": false,
            "account_age_days": 5,
            "transaction_amount": 15000.0,
            "channel": "Online",
            "timestamp": "2024-05-01T02:30:00Z"
        }))
        .send()
        .await
        .expect("review request");
    assert_eq!(resp.status(), 200);
    let review: Value = resp.json().await.expect("review json");
    assert_eq!(review["prediction"], "fraud");
    assert!(review["factors"].as_array().map(Vec::len).unwrap_or(0) >= 4);

    let history: Value = client
        .get(format!("{}/api/v1/transactions", base))
        .send()
        .await
        .expect("history request")
        .json()
        .await
        .expect("history json");
    assert_eq!(history["total"], 1);
    assert_eq!(history["transactions"][0]["id"], review["id"]);

    let stats: Value = client
        .get(format!("{}/api/v1/stats", base))
        .send()
        .await
        .expect("stats request")
        .json()
        .await
        .expect("stats json");
    assert_eq!(stats["source"], "history");
    assert_eq!(stats["fraud_detected"], 1);
}
