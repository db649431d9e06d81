use chrono::Utc;

use super::CycleReport;
use crate::context::AppContext;
use crate::dispatch::NotificationJob;
use crate::feed::{backfill_image, extract_items, fetch_bytes, freshest, parse_feed, FetchError};
use crate::ledger::{DedupLedger, Fingerprint};
use crate::registry::{load_sources, RegistryError, Source};
use crate::shutdown::ShutdownListener;

/// Heartbeat text sent at the top of every feed cycle.
const CYCLE_HEARTBEAT: &str = "🔁 Checking feeds...";

/// Polls every feed source once per `feed_interval`. Owns the dedup ledger.
pub struct FeedPoller {
    ctx: AppContext,
    ledger: DedupLedger,
}

impl FeedPoller {
    pub fn new(ctx: AppContext, ledger: DedupLedger) -> Self {
        Self { ctx, ledger }
    }

    pub fn ledger(&self) -> &DedupLedger {
        &self.ledger
    }

    /// Runs cycles until shutdown. A cycle cut short by shutdown is
    /// abandoned without persisting the ledger.
    pub async fn run(mut self, mut shutdown: ShutdownListener) {
        let interval = self.ctx.config.feed_interval();
        tracing::info!(interval_secs = interval.as_secs(), "Feed poller started");

        while !shutdown.is_triggered() {
            let outcome = tokio::select! {
                biased;
                _ = shutdown.wait() => break,
                outcome = self.run_cycle() => outcome,
            };

            match outcome {
                Ok(report) => tracing::info!(
                    sources = report.sources,
                    failed = report.failed,
                    enqueued = report.enqueued,
                    next_in_secs = interval.as_secs(),
                    "Feed cycle complete"
                ),
                Err(e) => tracing::warn!(error = %e, "Skipping feed cycle"),
            }

            if shutdown.sleep(interval).await {
                break;
            }
        }

        tracing::info!("Feed poller stopped");
    }

    /// One full pass over the registry's feed sources, then one ledger
    /// persist.
    pub async fn run_cycle(&mut self) -> Result<CycleReport, RegistryError> {
        self.ctx.heartbeat(CYCLE_HEARTBEAT);

        let registry = load_sources(&self.ctx.config.sources_path)?;
        let mut report = CycleReport::default();

        for source in registry.feeds() {
            report.sources += 1;
            match self.poll_source(source).await {
                Ok(enqueued) => report.enqueued += enqueued,
                Err(e) => {
                    report.failed += 1;
                    tracing::warn!(source = %source.key, error = %e, "Feed fetch failed");
                }
            }
        }

        if let Err(e) = self.ledger.persist() {
            tracing::error!(error = %e, "Failed to persist dedup ledger");
        }

        Ok(report)
    }

    /// Fetch, parse, filter and enqueue for one source. Returns the number
    /// of jobs enqueued.
    async fn poll_source(&mut self, source: &Source) -> Result<usize, FetchError> {
        let config = &self.ctx.config;
        let bytes = fetch_bytes(&self.ctx.http, &source.key, config.fetch_timeout()).await?;

        let entries = match parse_feed(&bytes) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(source = %source.key, error = %e, "Unparseable feed, treating as empty");
                return Ok(0);
            }
        };

        let items = freshest(
            extract_items(source, entries, Utc::now(), config.freshness_window()),
            config.max_items_per_source,
        );

        let mut enqueued = 0;
        for mut item in items {
            let fingerprint = Fingerprint::new(&source.key, &item.title, &item.link, item.published);
            if !self.ledger.is_new(&fingerprint) {
                continue;
            }

            if item.image.is_none() {
                item.image = backfill_image(
                    &self.ctx.http,
                    &item.link,
                    config.image_timeout(),
                    config.allow_private_hosts,
                )
                .await;
            }

            tracing::debug!(
                source = %source.key,
                title = %item.title,
                has_image = item.image.is_some(),
                "New item"
            );

            self.ledger.mark_seen(fingerprint);
            self.ctx
                .queue
                .push(NotificationJob::from_item(item, source.endpoint.clone()));
            enqueued += 1;
        }

        Ok(enqueued)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::dispatch::JobPayload;
    use chrono::Duration;
    use std::path::{Path, PathBuf};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn workdir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("herald_feed_poller_test_{}", name));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn rss(items: &[(&str, &str, chrono::DateTime<Utc>)]) -> String {
        let body: String = items
            .iter()
            .map(|(title, link, published)| {
                format!(
                    "<item><title>{}</title><link>{}</link><pubDate>{}</pubDate>\
                     <media:thumbnail url=\"https://cdn.example.com/t.jpg\"/></item>",
                    title,
                    link,
                    published.to_rfc2822()
                )
            })
            .collect();
        format!(
            "<?xml version=\"1.0\"?><rss version=\"2.0\" xmlns:media=\"http://search.yahoo.com/mrss/\">\
             <channel><title>t</title>{}</channel></rss>",
            body
        )
    }

    fn setup(dir: &Path, sources_json: &str) -> (AppContext, crate::dispatch::JobReceiver) {
        let sources_path = dir.join("sources.json");
        std::fs::write(&sources_path, sources_json).unwrap();
        let config = Config {
            sources_path,
            ledger_path: dir.join("seen.txt"),
            allow_private_hosts: true,
            ..Config::default()
        };
        AppContext::new(config).unwrap()
    }

    #[tokio::test]
    async fn test_cycle_enqueues_new_items_once() {
        let server = MockServer::start().await;
        let now = Utc::now();
        Mock::given(method("GET"))
            .and(path("/feed.xml"))
            .respond_with(ResponseTemplate::new(200).set_body_string(rss(&[
                ("One", "https://example.com/1?utm_source=rss", now - Duration::hours(1)),
                ("Two", "https://example.com/2", now - Duration::hours(2)),
            ])))
            .mount(&server)
            .await;

        let dir = workdir("once");
        let feed_url = format!("{}/feed.xml", server.uri());
        let (ctx, mut jobs) = setup(
            &dir,
            &format!(r#"{{"{}": {{"category": "News", "webhook": "https://hook.example/1"}}}}"#, feed_url),
        );
        let ledger = DedupLedger::load(&ctx.config.ledger_path).unwrap();
        let mut poller = FeedPoller::new(ctx, ledger);

        let report = poller.run_cycle().await.unwrap();
        assert_eq!(report, CycleReport { sources: 1, failed: 0, enqueued: 2 });

        let first = jobs.try_recv().unwrap();
        assert_eq!(first.title, "One");
        assert_eq!(first.link, "https://example.com/1");
        assert_eq!(first.image.as_deref(), Some("https://cdn.example.com/t.jpg"));
        assert!(matches!(first.payload, JobPayload::Article { .. }));
        assert_eq!(jobs.try_recv().unwrap().title, "Two");

        let report = poller.run_cycle().await.unwrap();
        assert_eq!(report.enqueued, 0);
        assert!(jobs.try_recv().is_none());
        assert_eq!(poller.ledger().len(), 2);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn test_failing_source_does_not_abort_cycle() {
        let server = MockServer::start().await;
        let now = Utc::now();
        Mock::given(method("GET"))
            .and(path("/down.xml"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/garbage.xml"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>not a feed"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/up.xml"))
            .respond_with(ResponseTemplate::new(200).set_body_string(rss(&[(
                "Fresh",
                "https://example.com/fresh",
                now - Duration::minutes(5),
            )])))
            .mount(&server)
            .await;

        let dir = workdir("failing");
        let sources = format!(
            r#"{{
                "{base}/down.xml": {{"webhook": "https://hook.example/1"}},
                "{base}/garbage.xml": {{"webhook": "https://hook.example/1"}},
                "{base}/up.xml": {{"webhook": "https://hook.example/2"}}
            }}"#,
            base = server.uri()
        );
        let (ctx, mut jobs) = setup(&dir, &sources);
        let mut poller = FeedPoller::new(ctx, DedupLedger::new(dir.join("seen.txt")));

        let report = poller.run_cycle().await.unwrap();
        assert_eq!(report, CycleReport { sources: 3, failed: 1, enqueued: 1 });

        let job = jobs.try_recv().unwrap();
        assert_eq!(job.title, "Fresh");
        assert_eq!(job.category, "RSS");
        assert_eq!(job.endpoint.url(), "https://hook.example/2");

        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn test_cap_keeps_freshest() {
        let server = MockServer::start().await;
        let now = Utc::now();
        let links: Vec<String> = (0..5).map(|i| format!("https://example.com/{}", i)).collect();
        let items: Vec<(&str, &str, chrono::DateTime<Utc>)> = vec![
            ("Oldest", links[0].as_str(), now - Duration::hours(5)),
            ("Newest", links[1].as_str(), now - Duration::minutes(1)),
            ("Middle", links[2].as_str(), now - Duration::hours(2)),
            ("Old", links[3].as_str(), now - Duration::hours(4)),
            ("Newer", links[4].as_str(), now - Duration::minutes(30)),
        ];
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(rss(&items)))
            .mount(&server)
            .await;

        let dir = workdir("cap");
        let (mut ctx, mut jobs) = setup(
            &dir,
            &format!(r#"{{"{}/feed.xml": {{"webhook": "https://hook.example/1"}}}}"#, server.uri()),
        );
        let mut config = (*ctx.config).clone();
        config.max_items_per_source = 2;
        ctx.config = std::sync::Arc::new(config);

        let mut poller = FeedPoller::new(ctx, DedupLedger::new(dir.join("seen.txt")));
        poller.run_cycle().await.unwrap();

        assert_eq!(jobs.try_recv().unwrap().title, "Newest");
        assert_eq!(jobs.try_recv().unwrap().title, "Newer");
        assert!(jobs.try_recv().is_none());

        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn test_missing_registry_skips_cycle() {
        let dir = workdir("missing_registry");
        let config = Config {
            sources_path: dir.join("nope.json"),
            ..Config::default()
        };
        let (ctx, _jobs) = AppContext::new(config).unwrap();
        let mut poller = FeedPoller::new(ctx, DedupLedger::new(dir.join("seen.txt")));

        assert!(matches!(poller.run_cycle().await, Err(RegistryError::Missing(_))));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn test_backfill_when_entry_has_no_image() {
        let server = MockServer::start().await;
        let now = Utc::now();
        let article = format!("{}/article", server.uri());
        let feed = format!(
            "<?xml version=\"1.0\"?><rss version=\"2.0\"><channel><title>t</title>\
             <item><title>Plain</title><link>{}</link><pubDate>{}</pubDate></item></channel></rss>",
            article,
            (now - Duration::minutes(10)).to_rfc2822()
        );
        Mock::given(method("GET"))
            .and(path("/feed.xml"))
            .respond_with(ResponseTemplate::new(200).set_body_string(feed))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/article"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"<html><head><meta property="og:image" content="https://cdn.example.com/og.jpg"></head></html>"#,
            ))
            .expect(1)
            .mount(&server)
            .await;

        let dir = workdir("backfill");
        let (ctx, mut jobs) = setup(
            &dir,
            &format!(r#"{{"{}/feed.xml": {{"webhook": "https://hook.example/1"}}}}"#, server.uri()),
        );
        let mut poller = FeedPoller::new(ctx, DedupLedger::new(dir.join("seen.txt")));
        poller.run_cycle().await.unwrap();
        // Second cycle: item already seen, so no second page fetch.
        poller.run_cycle().await.unwrap();

        let job = jobs.try_recv().unwrap();
        assert_eq!(job.image.as_deref(), Some("https://cdn.example.com/og.jpg"));
        assert!(jobs.try_recv().is_none());

        std::fs::remove_dir_all(&dir).ok();
    }
}
