//! Bookshelf - library management REST service.

use api::{router, AppState};
use bookshelf_core::AppConfig;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use storage::Database;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Bookshelf - books, readers and loans over HTTP
#[derive(Parser, Debug)]
#[command(name = "bookshelf")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to an optional TOML configuration file
    #[arg(short, long, default_value = "bookshelf.toml")]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "bookshelf={level},server={level},api={level},auth={level},library={level},storage={level},tower_http={level}",
                    level = args.log_level
                )
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = run(args).await {
        tracing::error!(error = %e, "server stopped");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Starting bookshelf");

    let (config, overrides) = AppConfig::load_with_env(&args.config)?;
    for key in &overrides {
        tracing::info!(key = %key, "configuration overridden from environment");
    }

    let db = Database::connect_with_timeout(
        &config.database.url,
        Duration::from_millis(config.database.timeout_ms),
    )
    .await?;
    tracing::info!("Database ready");

    let state = Arc::new(AppState::new(db.clone(), &config.auth));
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(config.server.bind_address()).await?;
    let addr = listener.local_addr()?;
    tracing::info!(%addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    db.close().await;
    tracing::info!("Shut down cleanly");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
