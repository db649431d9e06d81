//! Process-scoped state shared by the pollers.
use std::sync::Arc;
use std::time::Duration;

use reqwest::redirect::Policy;

use crate::config::Config;
use crate::dispatch::{channel, DispatchQueue, JobReceiver, NotificationJob};
use crate::registry::Endpoint;

/// Built once at startup and cloned into each loop. Clones are cheap:
/// the config is behind an `Arc`, and `reqwest::Client` and the queue
/// handle are reference counted internally.
#[derive(Debug, Clone)]
pub struct AppContext {
    pub config: Arc<Config>,
    pub http: reqwest::Client,
    pub queue: DispatchQueue,
    heartbeat: Option<Endpoint>,
}

impl AppContext {
    /// Builds the shared HTTP client and the dispatch queue.
    ///
    /// Connections are opened lazily on first use; the pool closes when the
    /// last clone of the client is dropped.
    pub fn new(config: Config) -> Result<(Self, JobReceiver), reqwest::Error> {
        let http = build_http_client(&config)?;
        let (queue, jobs) = channel();
        let heartbeat = config
            .heartbeat_webhook
            .as_deref()
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .map(Endpoint::new);

        Ok((
            Self {
                config: Arc::new(config),
                http,
                queue,
                heartbeat,
            },
            jobs,
        ))
    }

    /// Queues a plain-text status message for the operator, if a heartbeat
    /// webhook is configured.
    pub fn heartbeat(&self, message: &str) {
        if let Some(endpoint) = &self.heartbeat {
            self.queue.push(NotificationJob::heartbeat(endpoint.clone(), message));
        }
    }
}

fn build_http_client(config: &Config) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .user_agent(config.user_agent.as_str())
        .redirect(redirect_policy())
        .pool_max_idle_per_host(4)
        .pool_idle_timeout(Duration::from_secs(30))
        .tcp_keepalive(Duration::from_secs(60))
        .connect_timeout(config.fetch_timeout())
        .build()
}

/// At most 3 hops, and no URL may appear twice in the chain.
fn redirect_policy() -> Policy {
    Policy::custom(|attempt| {
        if attempt.previous().len() >= 3 {
            return attempt.error("Too many redirects (max 3)");
        }

        let url = attempt.url();
        if attempt.previous().iter().any(|prev| prev.as_str() == url.as_str()) {
            return attempt.error("Redirect loop detected");
        }

        tracing::debug!(
            from = %attempt.previous().last().map(|u| u.as_str()).unwrap_or("initial"),
            to = %url,
            hop = attempt.previous().len() + 1,
            "Following redirect"
        );
        attempt.follow()
    })
}
