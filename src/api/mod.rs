pub mod handlers;
pub mod types;

use axum::extract::DefaultBodyLimit;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::assessment::ReviewService;
use crate::config::{Config, ScoringMode};
use crate::history::InMemoryHistory;
use crate::pipeline::BulkPipeline;
use crate::scoring::client::HttpScorer;
use crate::scoring::model::SimulatedModel;
use crate::scoring::Scorer;
use crate::session::SessionStore;

pub struct AppState {
    pub pipeline: BulkPipeline,
    pub session: SessionStore,
    pub reviewer: ReviewService,
    /// Serves the scoring endpoint; also scores uploads in builtin mode.
    pub model: Arc<SimulatedModel>,
}

impl AppState {
    pub fn from_config(config: &Config) -> eyre::Result<Self> {
        let model = Arc::new(SimulatedModel::new(config.scoring.seed));

        let scorer: Arc<dyn Scorer> = match config.scoring.mode {
            ScoringMode::Builtin => model.clone(),
            ScoringMode::Remote => {
                let endpoint = config
                    .scoring
                    .endpoint
                    .clone()
                    .ok_or_else(|| eyre::eyre!("scoring.endpoint is required in remote mode"))?;
                Arc::new(HttpScorer::new(
                    endpoint,
                    Duration::from_secs(config.scoring.timeout_secs),
                )?)
            }
        };
        tracing::info!(scorer = scorer.name(), "Scorer configured");

        let history = Arc::new(InMemoryHistory::new(config.history.capacity));

        Ok(Self {
            pipeline: BulkPipeline::new(scorer, &config.upload)?,
            session: SessionStore::new(),
            reviewer: ReviewService::new(history, config.scoring.seed),
            model,
        })
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    // One byte over the limit so oversized files reach the handler's own check.
    let upload_limit = usize::try_from(state.pipeline.max_bytes())
        .unwrap_or(usize::MAX)
        .saturating_add(1);

    Router::new()
        .route("/api/v1/health", get(handlers::health))
        .route("/api/v1/stats", get(handlers::stats))
        .route("/api/v1/score", post(handlers::score))
        .route(
            "/api/v1/bulk/upload",
            post(handlers::bulk_upload).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route(
            "/api/v1/dataset",
            get(handlers::dataset).delete(handlers::clear_dataset),
        )
        .route(
            "/api/v1/dataset/transactions",
            get(handlers::dataset_transactions),
        )
        .route("/api/v1/dataset/export", get(handlers::export_dataset))
        .route("/api/v1/dataset/insights", get(handlers::insights))
        .route(
            "/api/v1/transactions",
            post(handlers::review_transaction)
                .get(handlers::list_history)
                .delete(handlers::clear_history),
        )
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

pub async fn serve(
    state: Arc<AppState>,
    host: &str,
    port: u16,
    shutdown: CancellationToken,
) -> eyre::Result<()> {
    let app = router(state);
    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "API server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;
    tracing::info!("API server stopped");
    Ok(())
}
