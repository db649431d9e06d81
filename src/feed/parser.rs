use chrono::{DateTime, Utc};
use feed_rs::model::Entry;
use feed_rs::parser;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Feed parse error: {0}")]
    Feed(#[from] parser::ParseFeedError),
}

/// One feed entry reduced to the fields the pipeline reads.
///
/// RSS and Atom disagree on where links, dates and media live; `feed-rs`
/// unifies the formats and this type pins down which of its fields count.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedEntry {
    pub title: Option<String>,
    pub link: Option<String>,
    /// `published`, falling back to `updated`.
    pub published: Option<DateTime<Utc>>,
    pub author: Option<String>,
    /// Summary or description markup.
    pub summary: Option<String>,
    /// Full content blocks.
    pub content: Vec<String>,
    pub media_thumbnails: Vec<String>,
    /// `media:content` URLs. `feed-rs` also files RSS `<enclosure>` here.
    pub media_contents: Vec<String>,
    /// Atom `rel="enclosure"` links.
    pub enclosures: Vec<String>,
}

pub fn parse_feed(bytes: &[u8]) -> Result<Vec<FeedEntry>, ParseError> {
    let feed = parser::parse(bytes)?;
    Ok(feed.entries.into_iter().map(FeedEntry::from).collect())
}

impl From<Entry> for FeedEntry {
    fn from(entry: Entry) -> Self {
        let link = entry
            .links
            .iter()
            .find(|l| matches!(l.rel.as_deref(), None | Some("alternate")))
            .or_else(|| entry.links.first())
            .map(|l| l.href.trim().to_string())
            .filter(|href| !href.is_empty());

        let enclosures = entry
            .links
            .iter()
            .filter(|l| l.rel.as_deref() == Some("enclosure"))
            .map(|l| l.href.trim().to_string())
            .collect();

        // feed-rs has already resolved XML escapes; only HTML titles carry
        // a second layer of entities.
        let title = entry
            .title
            .map(|t| {
                if t.content_type.subty().as_str().eq_ignore_ascii_case("html") {
                    html_escape::decode_html_entities(t.content.trim()).into_owned()
                } else {
                    t.content.trim().to_string()
                }
            })
            .filter(|t| !t.is_empty());

        let author = entry
            .authors
            .first()
            .map(|p| p.name.trim().to_string())
            .filter(|name| !name.is_empty());

        let media_thumbnails = entry
            .media
            .iter()
            .flat_map(|m| m.thumbnails.iter())
            .map(|t| t.image.uri.clone())
            .collect();

        let media_contents = entry
            .media
            .iter()
            .flat_map(|m| m.content.iter())
            .filter_map(|c| c.url.as_ref().map(|u| u.to_string()))
            .collect();

        Self {
            title,
            link,
            published: entry.published.or(entry.updated),
            author,
            summary: entry.summary.map(|s| s.content),
            content: entry.content.and_then(|c| c.body).into_iter().collect(),
            media_thumbnails,
            media_contents,
            enclosures,
        }
    }
}
