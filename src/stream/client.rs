use std::time::Duration;
use thiserror::Error;
use url::Url;

use crate::feed::{fetch_text, FetchError};
use crate::util::{is_valid_image_url, strip_control_chars};

#[derive(Debug, Error)]
pub enum StreamError {
    #[error("Status lookup failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("Channel not found: {0}")]
    NotFound(String),

    #[error("Unusable status service base URL: {0}")]
    InvalidBase(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Liveness {
    /// Live, with the service's human-readable uptime ("1 hour, 4 minutes").
    Live { uptime: String },
    Offline,
}

/// Extra facts shown in a went-live notification. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LiveDetails {
    pub title: Option<String>,
    pub game: Option<String>,
    pub viewers: Option<String>,
    pub avatar: Option<String>,
}

/// Client for the bare-text status service.
///
/// Every lookup is `GET {base}/{field}/{channel}` answering with a plain
/// text body.
#[derive(Debug, Clone)]
pub struct StreamClient {
    http: reqwest::Client,
    base: String,
    timeout: Duration,
}

impl StreamClient {
    pub fn new(http: reqwest::Client, base: impl Into<String>, timeout: Duration) -> Self {
        Self {
            http,
            base: base.into().trim_end_matches('/').to_string(),
            timeout,
        }
    }

    /// Asks whether `channel` is live.
    ///
    /// An uptime answer mentioning "offline" is the only offline signal;
    /// any other answer counts as live.
    pub async fn query_liveness(&self, channel: &str) -> Result<Liveness, StreamError> {
        let uptime = self.lookup("uptime", channel).await?;
        if uptime.to_ascii_lowercase().contains("offline") {
            Ok(Liveness::Offline)
        } else {
            Ok(Liveness::Live { uptime })
        }
    }

    /// Fetches title, game, viewer count and avatar. Each lookup is best
    /// effort and a failure only leaves its field empty.
    pub async fn live_details(&self, channel: &str) -> LiveDetails {
        let title = self.optional("title", channel).await;
        let game = self.optional("game", channel).await;
        let viewers = self.optional("viewercount", channel).await;
        let avatar = self
            .optional("avatar", channel)
            .await
            .filter(|url| is_valid_image_url(url));

        LiveDetails {
            title,
            game,
            viewers,
            avatar,
        }
    }

    async fn optional(&self, field: &str, channel: &str) -> Option<String> {
        match self.lookup(field, channel).await {
            Ok(value) if !value.is_empty() => Some(value),
            Ok(_) => None,
            Err(e) => {
                tracing::debug!(channel = %channel, lookup = field, error = %e, "Stream detail lookup failed");
                None
            }
        }
    }

    /// Builds `{base}/{field}/{channel}` with the channel as a single
    /// escaped path segment.
    fn lookup_url(&self, field: &str, channel: &str) -> Result<Url, StreamError> {
        let invalid = || StreamError::InvalidBase(self.base.clone());
        let mut url = Url::parse(&self.base).map_err(|_| invalid())?;
        url.path_segments_mut()
            .map_err(|_| invalid())?
            .pop_if_empty()
            .push(field)
            .push(channel);
        Ok(url)
    }

    async fn lookup(&self, field: &str, channel: &str) -> Result<String, StreamError> {
        let url = self.lookup_url(field, channel)?;
        let body = fetch_text(&self.http, url.as_str(), self.timeout).await?;
        let body = strip_control_chars(body.trim()).into_owned();

        let lower = body.to_ascii_lowercase();
        if lower.contains("not found") || lower.contains("no user") {
            return Err(StreamError::NotFound(channel.to_string()));
        }
        Ok(body)
    }
}
