//! leadtrail-attribution - Referral lead attribution service
//!
//! Serves the attribution, visit tracking and referrer stats endpoints over
//! HTTP, backed by the shared leadtrail SQLite database.

use anyhow::{Context, Result};
use clap::Parser;
use leadtrail_common::config::{load_toml_config, ServiceConfig};
use leadtrail_common::db::init_database;
use leadtrail_attribution::{build_router, AppState};
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for leadtrail-attribution
#[derive(Parser, Debug)]
#[command(name = "leadtrail-attribution")]
#[command(about = "Referral lead attribution service")]
#[command(version)]
struct Args {
    /// Root folder holding leadtrail.db (overrides LEADTRAIL_ROOT_FOLDER)
    #[arg(short, long)]
    root_folder: Option<String>,

    /// Address to listen on, e.g. 127.0.0.1:5740
    #[arg(short, long, env = "LEADTRAIL_BIND")]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let toml_config = load_toml_config();
    let config = ServiceConfig::resolve(
        args.root_folder.as_deref(),
        args.bind.as_deref(),
        &toml_config,
    );

    // RUST_LOG wins over the config file level
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_level.as_str().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting leadtrail-attribution v{}",
        env!("CARGO_PKG_VERSION")
    );

    config
        .ensure_directory_exists()
        .context("Failed to create root folder")?;

    info!("Root folder: {}", config.root_folder.display());
    info!("Database path: {}", config.db_path.display());

    let pool = init_database(&config.db_path)
        .await
        .context("Failed to initialize database")?;
    info!("Database ready");

    let app = build_router(AppState::new(pool.clone()));

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_addr))?;
    info!("Listening on http://{}", config.bind_addr);
    info!("Health check: http://{}/health", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    pool.close().await;
    info!("Server shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::warn!("Failed to install SIGTERM handler: {}", e);
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
