use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use std::sync::Arc;

use super::types::*;
use super::AppState;
use crate::aggregate::insights::{compute_insights, dashboard_stats, DashboardStats, Insights};
use crate::aggregate::summarize;
use crate::assessment::ReviewRequest;
use crate::error::{ReviewError, UploadError};
use crate::export::{export_csv, paginate, view, TablePage, TableQuery};
use crate::ingest::csv_input::UploadMeta;
use crate::scoring::{ScoreRequest, ScoreResponse, Scorer};
use crate::session::Dataset;

type ApiError = (StatusCode, Json<ErrorResponse>);
type ApiResult<T> = Result<Json<T>, ApiError>;

fn api_error(status: StatusCode, msg: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: msg.into(),
        }),
    )
}

fn internal(e: impl std::fmt::Display) -> ApiError {
    api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}

fn no_dataset() -> ApiError {
    api_error(StatusCode::NOT_FOUND, "No dataset uploaded")
}

fn upload_status(e: &UploadError) -> StatusCode {
    match e {
        UploadError::NotCsv => StatusCode::UNSUPPORTED_MEDIA_TYPE,
        UploadError::TooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
        UploadError::NoRows | UploadError::Parse(_) => StatusCode::BAD_REQUEST,
        UploadError::BatchFailed { .. } => StatusCode::BAD_GATEWAY,
    }
}

// ============================================================
// Health & Stats
// ============================================================

pub async fn health(State(state): State<Arc<AppState>>) -> ApiResult<HealthResponse> {
    let history = state.reviewer.history().list().await.map_err(internal)?;
    Ok(Json(HealthResponse {
        status: "ok".to_string(),
        scorer: state.pipeline.scorer().name().to_string(),
        dataset_loaded: state.session.snapshot().await.is_some(),
        history_size: history.len(),
    }))
}

pub async fn stats(State(state): State<Arc<AppState>>) -> ApiResult<DashboardStats> {
    let dataset = state.session.snapshot().await;
    let history = state.reviewer.history().list().await.map_err(internal)?;
    Ok(Json(dashboard_stats(
        dataset
            .as_deref()
            .map(|d| (d.transactions.as_slice(), &d.summary)),
        &history,
    )))
}

// ============================================================
// Scoring
// ============================================================

/// Score a batch with the built-in model. This is the endpoint a remote
/// scorer points at.
pub async fn score(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ScoreRequest>,
) -> ApiResult<ScoreResponse> {
    let transactions = state
        .model
        .score(&request.transactions)
        .await
        .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    Ok(Json(ScoreResponse {
        summary: summarize(&transactions),
        transactions,
        model_info: state.model.model_info(),
    }))
}

// ============================================================
// Bulk upload & dataset
// ============================================================

pub async fn bulk_upload(
    State(state): State<Arc<AppState>>,
    Query(params): Query<UploadParams>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<UploadResponse> {
    let meta = UploadMeta {
        file_name: params.filename.as_deref(),
        content_type: headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok()),
        size: body.len() as u64,
    };

    let result = state
        .pipeline
        .process_upload(&meta, &body)
        .await
        .map_err(|e| {
            if e.is_input_error() {
                tracing::warn!(error = %e, "Upload rejected");
            }
            api_error(upload_status(&e), e.to_string())
        })?;

    let batches = result
        .summary
        .total_transactions
        .div_ceil(state.pipeline.batch_size());
    let dataset = state
        .session
        .update_dataset(Dataset {
            transactions: result.transactions,
            summary: result.summary,
            model_info: result.model_info,
            uploaded_at: Utc::now(),
        })
        .await;

    Ok(Json(UploadResponse {
        file_name: params.filename,
        batches,
        summary: dataset.summary.clone(),
        model_info: dataset.model_info.clone(),
        uploaded_at: dataset.uploaded_at,
    }))
}

pub async fn dataset(State(state): State<Arc<AppState>>) -> ApiResult<DatasetResponse> {
    let dataset = state.session.snapshot().await.ok_or_else(no_dataset)?;
    Ok(Json(DatasetResponse {
        summary: dataset.summary.clone(),
        model_info: dataset.model_info.clone(),
        uploaded_at: dataset.uploaded_at,
    }))
}

pub async fn clear_dataset(State(state): State<Arc<AppState>>) -> ApiResult<ClearedResponse> {
    Ok(Json(ClearedResponse {
        cleared: state.session.clear().await,
    }))
}

pub async fn dataset_transactions(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TableQuery>,
) -> ApiResult<serde_json::Value> {
    let dataset = state.session.snapshot().await.ok_or_else(no_dataset)?;
    let page: TablePage<'_> = paginate(view(&dataset.transactions, &query), query.page);
    // The page borrows from the snapshot, so render it before returning.
    serde_json::to_value(&page).map(Json).map_err(internal)
}

pub async fn export_dataset(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TableQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let dataset = state.session.snapshot().await.ok_or_else(no_dataset)?;
    let rows = view(&dataset.transactions, &query);
    let csv = export_csv(&rows).map_err(internal)?;
    tracing::info!(rows = rows.len(), "Dataset exported");

    let file_name = format!(
        "fraud_analysis_{}.csv",
        dataset.uploaded_at.format("%Y-%m-%d")
    );
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", file_name),
            ),
        ],
        csv,
    ))
}

pub async fn insights(State(state): State<Arc<AppState>>) -> ApiResult<Insights> {
    let dataset = state.session.snapshot().await.ok_or_else(no_dataset)?;
    Ok(Json(compute_insights(&dataset.transactions)))
}

// ============================================================
// Single-transaction review
// ============================================================

pub async fn review_transaction(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ReviewRequest>,
) -> ApiResult<ReviewResponse> {
    let (record, assessment) = state.reviewer.review(request).await.map_err(|e| match e {
        ReviewError::Validation(_) => api_error(StatusCode::UNPROCESSABLE_ENTITY, e.to_string()),
        ReviewError::Storage(_) => internal(e),
    })?;
    Ok(Json(ReviewResponse {
        record,
        factors: assessment.factors,
    }))
}

pub async fn list_history(State(state): State<Arc<AppState>>) -> ApiResult<HistoryResponse> {
    let transactions = state.reviewer.history().list().await.map_err(internal)?;
    Ok(Json(HistoryResponse {
        total: transactions.len(),
        transactions,
    }))
}

pub async fn clear_history(State(state): State<Arc<AppState>>) -> ApiResult<ClearedResponse> {
    state.reviewer.history().clear().await.map_err(internal)?;
    Ok(Json(ClearedResponse { cleared: true }))
}
