use super::CycleReport;
use crate::context::AppContext;
use crate::dispatch::NotificationJob;
use crate::registry::{load_sources, RegistryError};
use crate::shutdown::ShutdownListener;
use crate::stream::{Liveness, StreamClient, StreamStateTracker};

/// Checks every stream source once per `stream_interval` and announces
/// channels that just went live. Owns the liveness state.
pub struct StreamPoller {
    ctx: AppContext,
    client: StreamClient,
    tracker: StreamStateTracker,
}

impl StreamPoller {
    pub fn new(ctx: AppContext) -> Self {
        let client = StreamClient::new(
            ctx.http.clone(),
            ctx.config.stream_api_base.clone(),
            ctx.config.fetch_timeout(),
        );
        Self {
            ctx,
            client,
            tracker: StreamStateTracker::new(),
        }
    }

    pub fn tracker(&self) -> &StreamStateTracker {
        &self.tracker
    }

    pub async fn run(mut self, mut shutdown: ShutdownListener) {
        let interval = self.ctx.config.stream_interval();
        tracing::info!(interval_secs = interval.as_secs(), "Stream poller started");

        while !shutdown.is_triggered() {
            let outcome = tokio::select! {
                biased;
                _ = shutdown.wait() => break,
                outcome = self.run_cycle() => outcome,
            };

            match outcome {
                Ok(report) if report.enqueued > 0 || report.failed > 0 => tracing::info!(
                    sources = report.sources,
                    failed = report.failed,
                    went_live = report.enqueued,
                    "Stream check complete"
                ),
                Ok(_) => {}
                Err(e) => tracing::warn!(error = %e, "Skipping stream check"),
            }

            if shutdown.sleep(interval).await {
                break;
            }
        }

        tracing::info!("Stream poller stopped");
    }

    /// Queries every stream source once. Failed queries leave that
    /// channel's state untouched.
    pub async fn run_cycle(&mut self) -> Result<CycleReport, RegistryError> {
        let registry = load_sources(&self.ctx.config.sources_path)?;
        let mut report = CycleReport::default();

        for source in registry.streams() {
            let Some(channel) = source.stream_name().filter(|c| !c.is_empty()) else {
                tracing::warn!(source = %source.key, "Stream source without a channel name");
                continue;
            };
            report.sources += 1;

            match self.client.query_liveness(channel).await {
                Ok(Liveness::Live { uptime }) => {
                    if self.tracker.observe(channel, true) {
                        tracing::info!(channel = %channel, uptime = %uptime, "Channel went live");
                        let details = self.client.live_details(channel).await;
                        self.ctx
                            .queue
                            .push(NotificationJob::stream_live(source, channel, uptime, details));
                        report.enqueued += 1;
                    }
                }
                Ok(Liveness::Offline) => {
                    if self.tracker.is_live(channel) {
                        tracing::info!(channel = %channel, "Channel went offline");
                    }
                    self.tracker.observe(channel, false);
                }
                Err(e) => {
                    report.failed += 1;
                    tracing::warn!(channel = %channel, error = %e, "Stream status query failed");
                }
            }
        }

        Ok(report)
    }
}
