//! visitgate Server
//!
//! HTTP service issuing time-boxed visitor access codes.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use tracing::info;

use visitgate_core::config::{self, load_config};
use visitgate_core::tracing_init::{default_filter, init_tracing};
use visitgate_server::notifications::Notifier;
use visitgate_server::routes::{AppState, build_router};
use visitgate_server::storage::AccessDatabase;

#[derive(Parser, Debug)]
#[command(name = "visitgate-server")]
#[command(version, about = "visitgate server - visitor access codes over HTTP")]
struct Args {
    /// JSON config file layered over the global settings.
    #[arg(long, env = "VISITGATE_CONFIG")]
    config: Option<PathBuf>,

    /// Address to listen on (overrides config).
    #[arg(long)]
    addr: Option<SocketAddr>,

    /// Path to SQLite database file (overrides config).
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// Fixed UTC offset of the civil timezone, e.g. `-03:00` (overrides config).
    #[arg(long)]
    utc_offset: Option<String>,

    /// Output logs as JSON (for structured log aggregation).
    #[arg(long)]
    log_json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = load_config(args.config.as_deref())?;
    if let Some(addr) = args.addr {
        config.server.listen_addr = addr;
    }
    if let Some(path) = args.db_path {
        config.server.database_path = Some(path);
    }
    if let Some(offset) = args.utc_offset {
        config.schedule.utc_offset = offset;
    }
    let clock = config.schedule.clock()?;

    init_tracing(
        &default_filter(env!("CARGO_PKG_NAME"), &config.server.log_level),
        args.log_json,
    );

    info!(
        version = env!("CARGO_PKG_VERSION"),
        addr = %config.server.listen_addr,
        utc_offset = %clock.offset(),
        "Starting visitgate-server"
    );

    let db_path = match config.server.database_path.clone() {
        Some(path) => path,
        None => config::database_path()
            .ok_or_else(|| anyhow::anyhow!("Cannot determine data directory"))?,
    };
    info!(path = %db_path.display(), "Opening access database");
    let db = AccessDatabase::open(&db_path).await?;

    let notifier = Notifier::from_config(&config.notifications)?;
    let state = AppState::new(db.clone(), notifier, clock, &config.lifecycle);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(config.server.listen_addr).await?;
    info!(addr = %config.server.listen_addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    db.close().await;
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Received shutdown signal");
}
