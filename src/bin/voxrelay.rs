//! voxrelay server binary.
//!
//! Loads configuration (TOML file plus provider keys from the environment or
//! a `.env` file), then serves the relay until Ctrl+C. Logs go to stderr and
//! to a daily-rolling file in the configured logs directory.

use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use voxrelay::{HistoryStore, MediaStore, RelayConfig, RelayServer, TurnOrchestrator};

const DEFAULT_LOG_FILTER: &str = "voxrelay=info,tower_http=warn";

#[derive(Debug, Parser)]
#[command(name = "voxrelay", version, about = "Voice relay: speech in, speech out")]
struct Cli {
    /// Path to a TOML config file. Defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the bind address.
    #[arg(long)]
    host: Option<String>,

    /// Override the bind port.
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Missing .env is fine; real environment variables still apply.
    let _ = dotenvy::dotenv();

    let config_path = cli.config.or_else(|| {
        let default = RelayConfig::default_config_path();
        default.exists().then_some(default)
    });
    let mut config = RelayConfig::load(config_path.as_deref())?;
    if let Some(host) = cli.host {
        config.server.host = host;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }

    std::fs::create_dir_all(&config.storage.logs_dir)?;
    let file_appender = tracing_appender::rolling::daily(&config.storage.logs_dir, "voxrelay.log");
    let (file_writer, _log_guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(file_writer),
        )
        .init();

    tracing::info!(
        config = ?config_path,
        "voxrelay {} starting",
        env!("CARGO_PKG_VERSION")
    );

    let media = MediaStore::from_config(&config.storage);
    let orchestrator = TurnOrchestrator::from_config(&config, &media, HistoryStore::new())?;
    let mut server = RelayServer::start(orchestrator, media, &config)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "voxrelay failed to start");
            anyhow::anyhow!("voxrelay failed: {e}")
        })?;

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutdown requested");
    server.shutdown();
    server.join().await;

    tracing::info!("voxrelay shut down cleanly");
    Ok(())
}
