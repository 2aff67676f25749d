use std::sync::Arc;

use anyhow::Context;
use queue::DbQueue;
use store::database::{self, PoolOptions};
use tokio_util::sync::CancellationToken;
use tracing::info;

use worker::Processor;
use worker::config::{LoggingConfig, WorkerAppConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = WorkerAppConfig::load().context("Failed to load config")?;
    init_tracing(&config.logging);

    info!(
        poll_interval_ms = config.worker.poll_interval_ms,
        concurrency = config.worker.concurrency,
        max_attempts = config.retry.max_attempts,
        "Worker starting"
    );

    let db = database::init_db(
        &config.database.url,
        PoolOptions {
            max_connections: config.database.max_connections,
            min_connections: config.database.min_connections,
        },
    )
    .await
    .context("Failed to connect to database")?;

    let job_queue = Arc::new(DbQueue::new(db.clone()));
    let processor = Arc::new(Processor::new(db, job_queue, &config)?);

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            shutdown_signal().await;
            info!("Shutdown signal received");
            cancel.cancel();
        }
    });

    processor.run(cancel).await;

    info!("Worker stopped");
    Ok(())
}

fn init_tracing(logging: &LoggingConfig) {
    let level: tracing::Level = logging.level.parse().unwrap_or(tracing::Level::INFO);
    if logging.format == "json" {
        tracing_subscriber::fmt()
            .json()
            .with_max_level(level)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_max_level(level)
            .with_target(false)
            .init();
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.ok();
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
