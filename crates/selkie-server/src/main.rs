//! Selkie server binary

use clap::Parser;
use selkie_core::SelkieConfig;
use selkie_server::{api, AppState};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Selkie memory substrate server
#[derive(Parser, Debug)]
#[command(name = "selkie-server")]
#[command(about = "Shared long-term memory substrate for cooperating AI agents")]
#[command(version)]
struct Cli {
    /// Bind address
    #[arg(short, long, default_value = "127.0.0.1:7438")]
    bind: String,

    /// Data directory for persisted state
    #[arg(short, long, default_value = "selkie-data")]
    data_dir: PathBuf,

    /// Rebuild debounce window in milliseconds
    #[arg(long, default_value_t = selkie_core::constants::REBUILD_DEBOUNCE_MS_DEFAULT)]
    debounce_ms: u64,

    /// Enable verbose logging
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .init();

    let config = SelkieConfig {
        bind_address: cli.bind,
        data_dir: cli.data_dir,
        rebuild_debounce_ms: cli.debounce_ms,
        admin_key: None,
    };

    let state = AppState::open(&config)?;
    state.restore_index().await?;

    if state.admin_key().is_none() {
        tracing::warn!(
            "no admin key configured (set {}); admin endpoints are disabled",
            selkie_core::config::ADMIN_KEY_ENV
        );
    }

    let app = api::router(state);
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    tracing::info!(bind = %config.bind_address, "selkie server listening");
    axum::serve(listener, app).await?;

    Ok(())
}
