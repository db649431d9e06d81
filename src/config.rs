//! Configuration file parser for `herald.toml`.
//!
//! The config file is optional: a missing or empty file yields
//! `Config::default()`. Unknown keys are accepted but logged as warnings so
//! typos do not silently change behavior.
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Environment variable that overrides `heartbeat_webhook`.
pub const HEARTBEAT_WEBHOOK_ENV: &str = "HERALD_HEARTBEAT_WEBHOOK";

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config file too large: {0}")]
    TooLarge(String),

    #[error("Invalid config value: {0}")]
    Invalid(String),
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// Top-level daemon configuration.
///
/// All fields use `#[serde(default)]` so any subset of keys can be specified.
/// The custom Debug impl masks `heartbeat_webhook`, which embeds a token.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// JSON file mapping source keys to destinations, written by the control surface.
    pub sources_path: PathBuf,

    /// Newline-delimited fingerprint file.
    pub ledger_path: PathBuf,

    /// Seconds between feed poll cycles.
    pub feed_interval_secs: u64,

    /// Seconds between stream status checks.
    pub stream_interval_secs: u64,

    /// Minimum spacing between two outbound notifications, in milliseconds.
    pub send_interval_ms: u64,

    /// Items published longer ago than this are never announced.
    pub freshness_window_hours: u64,

    /// Upper bound on items enqueued per feed per cycle.
    pub max_items_per_source: usize,

    pub fetch_timeout_secs: u64,
    pub image_timeout_secs: u64,
    pub send_timeout_secs: u64,

    /// Character budget for article descriptions.
    pub description_budget: usize,

    /// User-Agent presented on every outbound request.
    pub user_agent: String,

    /// Base URL of the bare-text stream status lookups.
    pub stream_api_base: String,

    /// Base URL of stream preview thumbnails.
    pub stream_preview_base: String,

    /// Operator webhook for startup and cycle heartbeats.
    /// `HERALD_HEARTBEAT_WEBHOOK` takes precedence.
    pub heartbeat_webhook: Option<String>,

    /// Let the image backfill fetch loopback and private-range hosts.
    pub allow_private_hosts: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sources_path: PathBuf::from("feeds_config.json"),
            ledger_path: PathBuf::from("seen_entries.txt"),
            feed_interval_secs: 1200,
            stream_interval_secs: 120,
            send_interval_ms: 5000,
            freshness_window_hours: 24,
            max_items_per_source: 10,
            fetch_timeout_secs: 10,
            image_timeout_secs: 6,
            send_timeout_secs: 10,
            description_budget: 300,
            user_agent: "Mozilla/5.0 (X11; Linux x86_64; rv:128.0) Gecko/20100101 Firefox/128.0"
                .to_string(),
            stream_api_base: "https://decapi.me/twitch".to_string(),
            stream_preview_base: "https://static-cdn.jtvnw.net/previews-ttv".to_string(),
            heartbeat_webhook: None,
            allow_private_hosts: false,
        }
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("sources_path", &self.sources_path)
            .field("ledger_path", &self.ledger_path)
            .field("feed_interval_secs", &self.feed_interval_secs)
            .field("stream_interval_secs", &self.stream_interval_secs)
            .field("send_interval_ms", &self.send_interval_ms)
            .field("freshness_window_hours", &self.freshness_window_hours)
            .field("max_items_per_source", &self.max_items_per_source)
            .field("fetch_timeout_secs", &self.fetch_timeout_secs)
            .field("image_timeout_secs", &self.image_timeout_secs)
            .field("send_timeout_secs", &self.send_timeout_secs)
            .field("description_budget", &self.description_budget)
            .field("user_agent", &self.user_agent)
            .field("stream_api_base", &self.stream_api_base)
            .field("stream_preview_base", &self.stream_preview_base)
            .field(
                "heartbeat_webhook",
                &self.heartbeat_webhook.as_ref().map(|_| "[REDACTED]"),
            )
            .field("allow_private_hosts", &self.allow_private_hosts)
            .finish()
    }
}

impl Config {
    /// Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    /// Largest window `chrono` can represent in whole hours.
    const MAX_WINDOW_HOURS: u64 = (i64::MAX / 1000 / 3600) as u64;

    const KNOWN_KEYS: [&'static str; 16] = [
        "sources_path",
        "ledger_path",
        "feed_interval_secs",
        "stream_interval_secs",
        "send_interval_ms",
        "freshness_window_hours",
        "max_items_per_source",
        "fetch_timeout_secs",
        "image_timeout_secs",
        "send_timeout_secs",
        "description_budget",
        "user_agent",
        "stream_api_base",
        "stream_preview_base",
        "heartbeat_webhook",
        "allow_private_hosts",
    ];

    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Ok(Config::default())`
    /// - Empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Zero intervals or timeouts → `Err(ConfigError::Invalid)`
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = std::fs::read_to_string(path)?;

        if content.trim().is_empty() {
            tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
            return Ok(Self::default());
        }

        if let Ok(raw) = content.parse::<toml::Table>() {
            for key in raw.keys() {
                if !Self::KNOWN_KEYS.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        tracing::info!(
            path = %path.display(),
            feed_interval_secs = config.feed_interval_secs,
            stream_interval_secs = config.stream_interval_secs,
            "Loaded configuration"
        );
        Ok(config)
    }

    /// Applies environment overrides on top of file values.
    pub fn apply_env(&mut self) {
        if let Ok(hook) = std::env::var(HEARTBEAT_WEBHOOK_ENV) {
            if !hook.trim().is_empty() {
                self.heartbeat_webhook = Some(hook);
            }
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let zero = [
            ("feed_interval_secs", self.feed_interval_secs),
            ("stream_interval_secs", self.stream_interval_secs),
            ("fetch_timeout_secs", self.fetch_timeout_secs),
            ("image_timeout_secs", self.image_timeout_secs),
            ("send_timeout_secs", self.send_timeout_secs),
        ]
        .into_iter()
        .find(|(_, v)| *v == 0);

        if let Some((key, _)) = zero {
            return Err(ConfigError::Invalid(format!("{} must be greater than 0", key)));
        }
        if self.freshness_window_hours == 0 {
            return Err(ConfigError::Invalid(
                "freshness_window_hours must be greater than 0".to_string(),
            ));
        }
        if self.freshness_window_hours > Self::MAX_WINDOW_HOURS {
            return Err(ConfigError::Invalid(format!(
                "freshness_window_hours must be at most {}",
                Self::MAX_WINDOW_HOURS
            )));
        }
        if self.max_items_per_source == 0 {
            return Err(ConfigError::Invalid(
                "max_items_per_source must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    pub fn feed_interval(&self) -> Duration {
        Duration::from_secs(self.feed_interval_secs)
    }

    pub fn stream_interval(&self) -> Duration {
        Duration::from_secs(self.stream_interval_secs)
    }

    pub fn send_interval(&self) -> Duration {
        Duration::from_millis(self.send_interval_ms)
    }

    /// Saturates instead of panicking for windows `validate` would reject.
    pub fn freshness_window(&self) -> chrono::Duration {
        i64::try_from(self.freshness_window_hours)
            .ok()
            .and_then(chrono::Duration::try_hours)
            .unwrap_or(chrono::Duration::MAX)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn image_timeout(&self) -> Duration {
        Duration::from_secs(self.image_timeout_secs)
    }

    pub fn send_timeout(&self) -> Duration {
        Duration::from_secs(self.send_timeout_secs)
    }
}

// ============================================================================
// Tests
// ============================================================================
