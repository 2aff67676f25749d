use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use queue::DbQueue;
use store::database::{self, PoolOptions};
use tokio_util::sync::CancellationToken;
use tracing::info;

use server::config::{AppConfig, LoggingConfig};
use server::state::AppState;
use server::{build_router, sweeper};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load().context("Failed to load config")?;
    init_tracing(&config.logging);

    if config.queue.transport != "database" {
        anyhow::bail!(
            "unsupported queue transport '{}' (only 'database' is available)",
            config.queue.transport
        );
    }

    info!(
        host = %config.server.host,
        port = config.server.port,
        auth_enabled = config.auth.enabled,
        sweeper_enabled = config.sweeper.enabled,
        "API server starting"
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

    let job_queue: Arc<dyn queue::JobQueue> = Arc::new(DbQueue::new(db.clone()));

    let cancel = CancellationToken::new();
    let mut sweeper_handle = None;
    if config.sweeper.enabled {
        sweeper_handle = Some(tokio::spawn(sweeper::run_sweeper(
            db.clone(),
            job_queue.clone(),
            config.sweeper.clone(),
            cancel.clone(),
        )));
    }

    let state = AppState {
        db,
        queue: job_queue,
        config: config.clone(),
    };

    let app = build_router(state);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("HTTP server listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    cancel.cancel();
    if let Some(handle) = sweeper_handle {
        let _ = handle.await;
    }

    info!("API server stopped");
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
