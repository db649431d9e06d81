use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use herald::config::Config;

#[derive(Parser, Debug)]
#[command(
    name = "herald",
    about = "Watches feeds and live streams and relays new items to chat webhooks"
)]
struct Args {
    /// TOML config file (optional; defaults apply when missing)
    #[arg(long, value_name = "FILE", default_value = "herald.toml")]
    config: PathBuf,

    /// Source list JSON, overrides `sources_path`
    #[arg(long, value_name = "FILE")]
    sources: Option<PathBuf>,

    /// Dedup ledger file, overrides `ledger_path`
    #[arg(long, value_name = "FILE")]
    ledger: Option<PathBuf>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let mut config = Config::load(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;
    config.apply_env();
    if let Some(sources) = args.sources {
        config.sources_path = sources;
    }
    if let Some(ledger) = args.ledger {
        config.ledger_path = ledger;
    }
    tracing::debug!(config = ?config, "Effective configuration");

    herald::daemon::run(config).await
}
