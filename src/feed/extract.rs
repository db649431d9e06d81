use chrono::{DateTime, Duration, Utc};

use super::image::extract_image;
use super::parser::FeedEntry;
use crate::registry::Source;
use crate::util::sanitize_url;

/// Placeholder for entries without a title.
pub const NO_TITLE: &str = "No Title";

/// A normalized, announceable feed item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    pub title: String,
    /// Link with tracking parameters removed.
    pub link: String,
    pub published: Option<DateTime<Utc>>,
    /// Best image found in the entry itself. The poller may backfill it.
    pub image: Option<String>,
    pub category: String,
    pub author: Option<String>,
    pub summary: Option<String>,
}

/// Whether an item published at `published` is still inside `window`.
///
/// Future-dated items count as fresh.
pub fn is_fresh(published: DateTime<Utc>, now: DateTime<Utc>, window: Duration) -> bool {
    now.signed_duration_since(published) <= window
}

/// Normalizes entries into items, keeping only those published inside `window`.
///
/// Entries without a timestamp are dropped since their age is unknown.
/// Feed order is preserved.
pub fn extract_items(
    source: &Source,
    entries: Vec<FeedEntry>,
    now: DateTime<Utc>,
    window: Duration,
) -> Vec<Item> {
    entries
        .into_iter()
        .filter_map(|entry| {
            let published = entry.published?;
            if !is_fresh(published, now, window) {
                tracing::trace!(
                    source = %source.key,
                    title = entry.title.as_deref().unwrap_or(NO_TITLE),
                    "Skipping stale entry"
                );
                return None;
            }

            let image = extract_image(&entry);
            let FeedEntry {
                title,
                link,
                author,
                summary,
                ..
            } = entry;

            Some(Item {
                title: title.unwrap_or_else(|| NO_TITLE.to_string()),
                link: sanitize_url(link.as_deref().unwrap_or_default()),
                published: Some(published),
                image,
                category: source.category.clone(),
                author,
                summary,
            })
        })
        .collect()
}

/// Keeps the `limit` most recently published items, newest first.
pub fn freshest(mut items: Vec<Item>, limit: usize) -> Vec<Item> {
    // Stable sort, so ties keep feed order.
    items.sort_by(|a, b| b.published.cmp(&a.published));
    items.truncate(limit);
    items
}
