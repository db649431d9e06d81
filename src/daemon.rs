//! Process lifecycle: startup, the three loops, shutdown.
use anyhow::{Context, Result};

use crate::config::Config;
use crate::context::AppContext;
use crate::dispatch::Dispatcher;
use crate::ledger::DedupLedger;
use crate::poller::{FeedPoller, StreamPoller};
use crate::shutdown::{Shutdown, ShutdownListener};

/// Startup message sent to the heartbeat webhook.
const STARTUP_HEARTBEAT: &str = "✅ herald is starting up.";

/// Runs the daemon until SIGINT or SIGTERM.
pub async fn run(config: Config) -> Result<()> {
    // Install handlers before anything starts so an early signal is not lost.
    #[cfg(unix)]
    let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
        .context("Failed to install SIGTERM handler")?;
    #[cfg(unix)]
    let mut sigint = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::interrupt())
        .context("Failed to install SIGINT handler")?;

    let (shutdown, listener) = Shutdown::new();

    let signals = async move {
        #[cfg(unix)]
        tokio::select! {
            _ = sigterm.recv() => tracing::info!("Received SIGTERM, shutting down gracefully"),
            _ = sigint.recv() => tracing::info!("Received SIGINT, shutting down gracefully"),
        }
        #[cfg(not(unix))]
        {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Received Ctrl-C, shutting down gracefully");
        }
    };

    let serving = serve(config, listener);
    tokio::pin!(serving);

    tokio::select! {
        // Startup failures end the process without waiting for a signal.
        result = &mut serving => return result,
        _ = signals => shutdown.trigger(),
    }

    serving.await
}

/// Loads state, then runs the feed poller, stream poller and dispatcher on
/// the current task until `shutdown` fires.
///
/// Fails only on unrecoverable startup errors: an unreadable ledger or an
/// HTTP client that cannot be built.
pub async fn serve(config: Config, shutdown: ShutdownListener) -> Result<()> {
    let ledger = DedupLedger::load(&config.ledger_path).context("Failed to load dedup ledger")?;
    tracing::info!(
        sources = %config.sources_path.display(),
        ledger = %ledger.path().display(),
        seen = ledger.len(),
        "Starting herald"
    );

    let (ctx, jobs) = AppContext::new(config).context("Failed to build HTTP client")?;
    ctx.heartbeat(STARTUP_HEARTBEAT);

    let feeds = FeedPoller::new(ctx.clone(), ledger);
    let streams = StreamPoller::new(ctx.clone());
    let dispatcher = Dispatcher::new(ctx.http.clone(), ctx.config.clone(), jobs);
    drop(ctx);

    tokio::join!(
        feeds.run(shutdown.clone()),
        streams.run(shutdown.clone()),
        dispatcher.run(shutdown),
    );

    // Every client clone lived in the loops above, so the pool is closed now.
    tracing::info!("HTTP session closed, shutdown complete");
    Ok(())
}
