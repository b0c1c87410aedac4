//! Cueline player - Main entry point
//!
//! Startup sequence:
//! 1. Resolve configuration (CLI > env > TOML > defaults)
//! 2. Initialize logging
//! 3. Open the database and select the default playlist
//! 4. Warm the cache from the durable store
//! 5. Serve HTTP until Ctrl+C / SIGTERM, then stop the position clock

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use cueline_common::config::DualWritePolicy;
use cueline_common::db::init_database;
use cueline_player::api::{self, AppContext};
use cueline_player::config::{Config, ConfigOverrides};
use cueline_player::playback::PlaybackController;
use cueline_player::store::{CacheStore, DurableStore};
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for cueline-player
#[derive(Parser, Debug)]
#[command(name = "cueline-player")]
#[command(about = "Playlist playback controller")]
#[command(version)]
struct Args {
    /// TOML configuration file
    #[arg(short, long, env = "CUELINE_CONFIG")]
    config: Option<PathBuf>,

    /// SQLite database file
    #[arg(short, long, env = "CUELINE_DATABASE")]
    database: Option<PathBuf>,

    /// HTTP listen address (host:port)
    #[arg(short, long, env = "CUELINE_BIND")]
    bind: Option<String>,

    /// Playlist to serve (created if missing)
    #[arg(short, long, env = "CUELINE_PLAYLIST")]
    playlist: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "CUELINE_LOG")]
    log_level: Option<String>,

    /// Cache handling when a durable track change fails (preserve, rollback-cache)
    #[arg(long, env = "CUELINE_DUAL_WRITE")]
    dual_write: Option<DualWritePolicy>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let overrides = ConfigOverrides {
        database_path: args.database,
        bind_address: args.bind,
        default_playlist: args.playlist,
        log_level: args.log_level,
        dual_write_policy: args.dual_write,
    };

    // Configuration is resolved before logging exists; its own log lines are
    // emitted again below once the subscriber is up.
    let config = Config::load(args.config.as_deref(), overrides)
        .context("Failed to load configuration")?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_filter().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting cueline-player v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE"),
    );
    info!(
        "Database: {}, playlist: '{}', tick: {:?}, dual-write: {}",
        config.database_path.display(),
        config.default_playlist,
        config.tick,
        config.dual_write_policy
    );

    let pool = init_database(&config.database_path)
        .await
        .context("Failed to initialize database")?;

    let durable = Arc::new(DurableStore::new(pool));
    let playlist_id = durable
        .ensure_playlist(&config.default_playlist)
        .await
        .context("Failed to select default playlist")?;
    durable.set_default_playlist_id(playlist_id).await;

    let cache = Arc::new(CacheStore::new());
    let controller = PlaybackController::new(cache, durable.clone(), config.controller_config());

    let songs = controller
        .init_cache()
        .await
        .context("Failed to initialize cache")?;
    if songs == 0 {
        warn!("Playlist '{}' is empty", config.default_playlist);
    }

    let ctx = AppContext {
        controller: controller.clone(),
        durable,
    };

    let listener = tokio::net::TcpListener::bind(config.bind_address)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_address))?;

    api::run(listener, ctx, config.request_timeout, shutdown_signal())
        .await
        .context("Server error")?;

    controller.shutdown().await;
    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
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
                warn!("Failed to install SIGTERM handler: {}", e);
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
