use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use feed_collector::feed::build_http_client;
use feed_collector::storage::PgStore;
use feed_collector::{Collector, Config};

#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};

#[tokio::main]
async fn main() -> Result<()> {
    // Timestamped level + message lines on stdout; RUST_LOG overrides the level
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env().context("Invalid configuration")?;
    let client = build_http_client().context("Failed to build HTTP client")?;
    let store = PgStore::new(&config.database);

    tracing::info!(
        feed = %config.feed_url,
        poll_interval_secs = config.poll_interval.as_secs(),
        "Starting feed collector"
    );

    let collector = Collector::new(config, client, store);
    collector.run(shutdown_signal()).await;

    tracing::info!("Feed collector stopped");
    Ok(())
}

/// Resolves on SIGINT or SIGTERM (Ctrl+C only on non-Unix platforms).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received interrupt signal"),
        _ = terminate => tracing::info!("Received terminate signal"),
    }
}
