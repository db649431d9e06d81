use std::sync::Arc;

use chrono::Utc;
use reqwest::StatusCode;
use thiserror::Error;

use super::format::build_payload;
use super::job::NotificationJob;
use super::queue::JobReceiver;
use crate::config::Config;
use crate::shutdown::ShutdownListener;

#[derive(Debug, Error)]
pub enum SendError {
    #[error("Send failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Send timed out")]
    Timeout,
    /// Anything other than 204 No Content
    #[error("Destination answered {0}")]
    Status(u16),
}

/// The single consumer of the dispatch queue.
///
/// Sends one job at a time in enqueue order and then waits
/// `send_interval` before taking the next. A failed send is logged and the
/// job dropped; the dispatcher never retries and never stops on failure.
pub struct Dispatcher {
    http: reqwest::Client,
    config: Arc<Config>,
    jobs: JobReceiver,
}

impl Dispatcher {
    pub fn new(http: reqwest::Client, config: Arc<Config>, jobs: JobReceiver) -> Self {
        Self { http, config, jobs }
    }

    /// Runs until shutdown, or until every producer is gone and the queue is
    /// empty. Jobs still queued at shutdown are dropped.
    pub async fn run(mut self, mut shutdown: ShutdownListener) {
        let spacing = self.config.send_interval();
        tracing::info!(spacing_ms = spacing.as_millis() as u64, "Dispatcher started");

        loop {
            let job = tokio::select! {
                biased;
                _ = shutdown.wait() => break,
                job = self.jobs.recv() => match job {
                    Some(job) => job,
                    None => break,
                },
            };

            match self.deliver(&job).await {
                Ok(()) => tracing::info!(title = %job.title, endpoint = %job.endpoint, "Sent notification"),
                Err(e) => tracing::warn!(
                    title = %job.title,
                    endpoint = %job.endpoint,
                    error = %e,
                    "Notification not delivered, dropping"
                ),
            }

            if shutdown.sleep(spacing).await {
                break;
            }
        }

        let pending = self.jobs.len();
        if pending > 0 {
            tracing::info!(pending = pending, "Dispatcher stopped with jobs still queued");
        } else {
            tracing::info!("Dispatcher stopped");
        }
    }

    /// Formats and POSTs one job. Only 204 counts as delivered.
    pub async fn deliver(&self, job: &NotificationJob) -> Result<(), SendError> {
        let payload = build_payload(job, Utc::now(), &self.config);

        let response = tokio::time::timeout(
            self.config.send_timeout(),
            self.http.post(job.endpoint.url()).json(&payload).send(),
        )
        .await
        .map_err(|_| SendError::Timeout)??;

        match response.status() {
            StatusCode::NO_CONTENT => Ok(()),
            status => {
                let body = response.text().await.unwrap_or_default();
                tracing::debug!(status = %status, body = %body, "Destination rejected notification");
                Err(SendError::Status(status.as_u16()))
            }
        }
    }
}
