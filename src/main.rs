use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use fraudshield::api::{self, AppState};
use fraudshield::config::Config;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    color_eyre::install()?;

    // Initialize structured logging (set RUST_LOG=debug for batch-level output)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    tracing::info!("FraudShield starting");

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());

    let config = Config::load_or_default(&config_path)?;
    tracing::info!(
        mode = ?config.scoring.mode,
        batch_size = config.upload.batch_size,
        max_file_size_mb = config.upload.max_file_size_mb,
        "Configuration loaded from {}",
        config_path
    );

    let state = Arc::new(AppState::from_config(&config)?);

    let shutdown = CancellationToken::new();
    let server = {
        let shutdown = shutdown.clone();
        let host = config.api.host.clone();
        let port = config.api.port;
        tokio::spawn(async move {
            if let Err(e) = api::serve(state, &host, port, shutdown).await {
                tracing::error!(error = %e, "API server failed");
            }
        })
    };

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received, stopping API server...");
    shutdown.cancel();
    let _ = server.await;

    tracing::info!("FraudShield stopped gracefully");
    Ok(())
}
