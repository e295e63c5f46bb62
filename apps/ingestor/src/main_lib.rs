use std::sync::Arc;

use craftflow_core::ingest::{IngestStore, IngestorService};
use craftflow_market_data::{AlbionDataProvider, PriceProvider};
use craftflow_storage_sqlite::{db, IngestRepository, StoredPriceProvider};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::{Config, LogFormat, PriceSource};

/// Install the global subscriber. `log` records from the library crates are
/// forwarded into it.
pub fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_current_span(false))
            .init(),
        LogFormat::Text => registry
            .with(fmt::layer().with_target(true).with_line_number(true))
            .init(),
    }
}

/// Open the database, apply migrations and wire the pipeline.
pub async fn build_service(config: &Config) -> anyhow::Result<IngestorService> {
    let db_path = db::init(&config.db_path)?;
    tracing::info!("Database path in use: {}", db_path);

    let pool = db::create_pool(&db_path)?;
    db::run_migrations(&pool)?;
    let writer = db::spawn_writer((*pool).clone());

    let store: Arc<dyn IngestStore> = Arc::new(IngestRepository::new(pool.clone(), writer));
    let provider: Arc<dyn PriceProvider> = match config.source {
        PriceSource::Api => Arc::new(AlbionDataProvider::new(config.provider_config())?),
        PriceSource::Database => Arc::new(StoredPriceProvider::new(pool)),
    };
    tracing::info!("Price source: {}", provider.id());

    Ok(IngestorService::new(provider, store, config.ingestor.clone())?)
}

/// Wait for SIGINT or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), finishing in-flight batches");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, finishing in-flight batches");
        }
    }
}

/// Run until `shutdown` fires or the pipeline hits a fatal error.
pub async fn run(config: Config, shutdown: CancellationToken) -> anyhow::Result<()> {
    let service = build_service(&config).await?;
    service.run(shutdown).await?;
    Ok(())
}
