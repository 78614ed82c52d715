//! trackgraph-server - Main entry point
//!
//! Serves the track graph over HTTP. When a database path is configured the
//! graph is restored from its last SQLite snapshot on startup, re-snapshotted
//! periodically, and snapshotted once more after graceful shutdown.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use sqlx::SqlitePool;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use trackgraph_core::TrackGraph;
use trackgraph_server::config::{load_toml_config, CliOverrides, ServerConfig};
use trackgraph_server::db::{init_database, load_snapshot, save_snapshot};
use trackgraph_server::{build_router, AppState};

/// Command-line arguments for trackgraph-server
#[derive(Parser, Debug)]
#[command(name = "trackgraph-server")]
#[command(about = "Track relationship graph and recommendation service")]
#[command(version)]
struct Args {
    /// Path to the TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port to listen on
    #[arg(short, long, env = "TRACKGRAPH_PORT")]
    port: Option<u16>,

    /// Address to bind
    #[arg(long, env = "TRACKGRAPH_BIND_ADDRESS")]
    bind_address: Option<String>,

    /// Identity allowed to remove tracks
    #[arg(long, env = "TRACKGRAPH_OWNER")]
    owner: Option<String>,

    /// SQLite file for graph snapshots
    #[arg(short, long, env = "TRACKGRAPH_DATABASE")]
    database: Option<PathBuf>,

    /// Default log level when RUST_LOG is unset
    #[arg(long, env = "TRACKGRAPH_LOG_LEVEL")]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let toml_config =
        load_toml_config(args.config.as_deref()).context("Failed to load config file")?;
    let config = ServerConfig::resolve(
        CliOverrides {
            port: args.port,
            bind_address: args.bind_address,
            owner: args.owner,
            database_path: args.database,
            log_level: args.log_level,
        },
        toml_config,
    )
    .context("Invalid configuration")?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "trackgraph_server={level},trackgraph_core={level},tower_http={level}",
                    level = config.log_level
                )
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting trackgraph-server v{} (owner: {})",
        env!("CARGO_PKG_VERSION"),
        config.owner
    );

    let pool = match &config.database_path {
        Some(path) => {
            info!("Snapshot database: {}", path.display());
            Some(init_database(path).await.context("Failed to open snapshot database")?)
        }
        None => {
            warn!("No database configured; graph state will not survive restarts");
            None
        }
    };

    let graph = match &pool {
        Some(pool) => {
            let snapshot = load_snapshot(pool)
                .await
                .context("Failed to load graph snapshot")?;
            if snapshot.is_empty() {
                info!("No stored snapshot, starting with an empty graph");
            }
            TrackGraph::restore(config.graph_config(), snapshot)
        }
        None => TrackGraph::new(config.graph_config()),
    };
    let graph = Arc::new(graph);
    info!("Graph ready: {:?}", graph.stats());

    let snapshot_task = match (&pool, config.snapshot_interval) {
        (Some(pool), Some(interval)) => Some(tokio::spawn(snapshot_loop(
            pool.clone(),
            Arc::clone(&graph),
            interval,
        ))),
        _ => None,
    };

    let app = build_router(AppState::new(Arc::clone(&graph)));

    let addr = config.listen_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("trackgraph-server listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    if let Some(task) = snapshot_task {
        task.abort();
    }

    if let Some(pool) = &pool {
        save_snapshot(pool, &graph.snapshot())
            .await
            .context("Failed to write final snapshot")?;
        info!("Final snapshot written");
        pool.close().await;
    }

    info!("Server shutdown complete");
    Ok(())
}

/// Persist the graph every `interval`; failures are logged and retried on
/// the next tick
async fn snapshot_loop(pool: SqlitePool, graph: Arc<TrackGraph>, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    // First tick completes immediately; the restored state is already on disk
    ticker.tick().await;

    loop {
        ticker.tick().await;
        let snapshot = graph.snapshot();
        match save_snapshot(&pool, &snapshot).await {
            Ok(()) => info!(
                "Snapshot saved ({} tracks, {} interactions)",
                snapshot.tracks.len(),
                snapshot.interactions.len()
            ),
            Err(e) => error!("Snapshot failed: {}", e),
        }
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
