mod config;
mod error;
mod handlers;
mod models;
mod router;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use config::Cli;
use etl_engine::store::InMemoryStore;
use etl_engine::EtlService;
use router::create_router;
use state::AppState;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .json()
        .init();
}

async fn shutdown_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "Failed to listen for SIGINT");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received SIGINT"),
        _ = terminate => tracing::info!("Received SIGTERM"),
    }

    // In-flight ingestion and export runs abort at their next await point.
    shutdown.cancel();
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    tracing::info!(version = etl_engine::SERVICE_VERSION, "Starting ETL gateway");

    let config = cli.engine_config();
    if config.sources().is_err() {
        tracing::warn!("ADS_API_URL / CRM_API_URL not set; ingestion will fail until configured");
    }
    if config.sink().is_err() {
        tracing::warn!("SINK_URL / SINK_SECRET not set; export will fail until configured");
    }

    let service = EtlService::new(config, Arc::new(InMemoryStore::new()))?;
    let shutdown = CancellationToken::new();
    let app = create_router(AppState::new(service, shutdown.clone()));

    let addr = SocketAddr::from(([0, 0, 0, 0], cli.port));
    let listener = TcpListener::bind(addr).await?;

    tracing::info!(%addr, "Listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await?;

    tracing::info!("Gateway stopped");
    Ok(())
}
