//! Source registry backed by the JSON file the control surface writes.
//!
//! The file is re-read at the top of every poll cycle and never cached, so
//! edits take effect without a restart. Writers replace the whole file, so a
//! read is always a complete snapshot.
//!
//! ```json
//! {
//!   "https://blog.rust-lang.org/feed.xml": { "category": "Rust", "webhook": "https://..." },
//!   "twitch:somechannel": { "category": "Twitch", "webhook": "https://..." }
//! }
//! ```
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

/// Key prefix marking a stream-status source.
pub const STREAM_PREFIX: &str = "twitch:";

/// Category used for feeds that do not name one.
pub const DEFAULT_CATEGORY: &str = "RSS";

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Source store not found: {0}")]
    Missing(PathBuf),

    #[error("Failed to read source store: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed source store: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// A destination webhook URL.
///
/// Webhook URLs embed their own credential, so the value is kept in a
/// [`SecretString`] and never rendered by `Debug` or `Display`.
#[derive(Clone)]
pub struct Endpoint(Arc<SecretString>);

impl Endpoint {
    pub fn new(url: impl Into<String>) -> Self {
        Self(Arc::new(SecretString::from(url.into())))
    }

    pub fn url(&self) -> &str {
        self.0.expose_secret()
    }
}

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Endpoint([REDACTED])")
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Host only, the path carries the token.
        match url::Url::parse(self.url()) {
            Ok(url) => write!(f, "{}", url.host_str().unwrap_or("[REDACTED]")),
            Err(_) => f.write_str("[REDACTED]"),
        }
    }
}

impl PartialEq for Endpoint {
    fn eq(&self, other: &Self) -> bool {
        self.url() == other.url()
    }
}

impl Eq for Endpoint {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Feed,
    Stream,
}

impl SourceKind {
    pub fn from_key(key: &str) -> Self {
        if key.starts_with(STREAM_PREFIX) {
            SourceKind::Stream
        } else {
            SourceKind::Feed
        }
    }
}

/// One monitored feed or stream channel and where its notifications go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Source {
    pub key: String,
    pub endpoint: Endpoint,
    pub category: String,
    pub kind: SourceKind,
}

impl Source {
    /// Channel name of a stream source (`twitch:name` → `name`).
    pub fn stream_name(&self) -> Option<&str> {
        self.key.strip_prefix(STREAM_PREFIX)
    }
}

#[derive(Debug, Deserialize)]
struct SourceRecord {
    #[serde(default)]
    category: Option<String>,
    #[serde(alias = "webhook")]
    endpoint: String,
}

/// Snapshot of the source store for one cycle, in sorted key order.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    sources: Vec<Source>,
}

impl Registry {
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub fn feeds(&self) -> impl Iterator<Item = &Source> {
        self.sources.iter().filter(|s| s.kind == SourceKind::Feed)
    }

    pub fn streams(&self) -> impl Iterator<Item = &Source> {
        self.sources.iter().filter(|s| s.kind == SourceKind::Stream)
    }
}

/// Reads the source store.
///
/// - Missing file → `Err(RegistryError::Missing)`
/// - Empty file → empty registry
/// - Invalid JSON or a record without an endpoint → `Err(RegistryError::Malformed)`
/// - Record with a blank endpoint → skipped with a warning
pub fn load_sources(path: &Path) -> Result<Registry, RegistryError> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(RegistryError::Missing(path.to_path_buf()));
        }
        Err(e) => return Err(RegistryError::Io(e)),
    };

    parse_sources(&content)
}

/// Parses the source store's JSON text.
pub fn parse_sources(content: &str) -> Result<Registry, RegistryError> {
    if content.trim().is_empty() {
        return Ok(Registry::default());
    }

    let records: BTreeMap<String, SourceRecord> = serde_json::from_str(content)?;

    let sources = records
        .into_iter()
        .filter_map(|(key, record)| {
            let key = key.trim().to_string();
            if record.endpoint.trim().is_empty() || key.is_empty() {
                tracing::warn!(source = %key, "Source has no destination, skipping");
                return None;
            }

            let kind = SourceKind::from_key(&key);
            let category = record
                .category
                .filter(|c| !c.trim().is_empty())
                .unwrap_or_else(|| match kind {
                    SourceKind::Feed => DEFAULT_CATEGORY.to_string(),
                    SourceKind::Stream => "Twitch".to_string(),
                });

            Some(Source {
                endpoint: Endpoint::new(record.endpoint.trim()),
                category,
                kind,
                key,
            })
        })
        .collect();

    Ok(Registry { sources })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_feed_and_stream_sources() {
        let json = r#"{
            "https://example.com/feed.xml": {"category": "News", "webhook": "https://chat.example.com/hooks/1/a"},
            "twitch:somechannel": {"category": "Twitch", "webhook": "https://chat.example.com/hooks/2/b"}
        }"#;
        let registry = parse_sources(json).unwrap();
        assert_eq!(registry.len(), 2);

        let feeds: Vec<_> = registry.feeds().collect();
        assert_eq!(feeds.len(), 1);
        assert_eq!(feeds[0].key, "https://example.com/feed.xml");
        assert_eq!(feeds[0].category, "News");
        assert_eq!(feeds[0].endpoint.url(), "https://chat.example.com/hooks/1/a");

        let streams: Vec<_> = registry.streams().collect();
        assert_eq!(streams.len(), 1);
        assert_eq!(streams[0].kind, SourceKind::Stream);
        assert_eq!(streams[0].stream_name(), Some("somechannel"));
    }

    #[test]
    fn test_endpoint_field_name_accepted() {
        let json = r#"{"https://a.example/rss": {"category": "A", "endpoint": "https://hook/1"}}"#;
        let registry = parse_sources(json).unwrap();
        assert_eq!(registry.feeds().next().unwrap().endpoint.url(), "https://hook/1");
    }

    #[test]
    fn test_missing_category_defaults() {
        let json = r#"{
            "https://a.example/rss": {"webhook": "https://hook/1"},
            "twitch:chan": {"webhook": "https://hook/2", "category": "  "}
        }"#;
        let registry = parse_sources(json).unwrap();
        assert_eq!(registry.feeds().next().unwrap().category, "RSS");
        assert_eq!(registry.streams().next().unwrap().category, "Twitch");
    }

    #[test]
    fn test_iteration_order_is_sorted_and_stable() {
        let json = r#"{
            "https://c.example/rss": {"webhook": "https://hook/c"},
            "https://a.example/rss": {"webhook": "https://hook/a"},
            "https://b.example/rss": {"webhook": "https://hook/b"}
        }"#;
        let first: Vec<String> = parse_sources(json).unwrap().feeds().map(|s| s.key.clone()).collect();
        let second: Vec<String> = parse_sources(json).unwrap().feeds().map(|s| s.key.clone()).collect();
        assert_eq!(
            first,
            vec![
                "https://a.example/rss".to_string(),
                "https://b.example/rss".to_string(),
                "https://c.example/rss".to_string()
            ]
        );
        assert_eq!(first, second);
    }

    #[test]
    fn test_blank_endpoint_skipped() {
        let json = r#"{
            "https://a.example/rss": {"webhook": ""},
            "https://b.example/rss": {"webhook": "https://hook/b"}
        }"#;
        let registry = parse_sources(json).unwrap();
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_empty_store_is_empty_registry() {
        assert!(parse_sources("").unwrap().is_empty());
        assert!(parse_sources("{}").unwrap().is_empty());
    }

    #[test]
    fn test_malformed_store_is_error() {
        assert!(matches!(parse_sources("{not json"), Err(RegistryError::Malformed(_))));
        assert!(matches!(
            parse_sources(r#"{"https://a.example/rss": {"category": "x"}}"#),
            Err(RegistryError::Malformed(_))
        ));
    }

    #[test]
    fn test_missing_file_is_error() {
        let result = load_sources(Path::new("/tmp/herald_test_no_such_sources.json"));
        assert!(matches!(result, Err(RegistryError::Missing(_))));
    }

    #[test]
    fn test_load_rereads_file() {
        let dir = std::env::temp_dir().join("herald_registry_test_reload");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("sources.json");

        std::fs::write(&path, r#"{"https://a.example/rss": {"webhook": "https://hook/a"}}"#).unwrap();
        assert_eq!(load_sources(&path).unwrap().len(), 1);

        std::fs::write(
            &path,
            r#"{"https://a.example/rss": {"webhook": "https://hook/a"},
                "twitch:x": {"webhook": "https://hook/x"}}"#,
        )
        .unwrap();
        assert_eq!(load_sources(&path).unwrap().len(), 2);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_endpoint_never_printed() {
        let endpoint = Endpoint::new("https://chat.example.com/api/webhooks/1/token-value");
        assert_eq!(format!("{:?}", endpoint), "Endpoint([REDACTED])");
        assert_eq!(endpoint.to_string(), "chat.example.com");
    }
}
