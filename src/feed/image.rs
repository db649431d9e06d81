//! Picks the image shown alongside an announced item.
//!
//! [`extract_image`] only looks at the entry. When it finds nothing the feed
//! poller calls [`backfill_image`], which fetches the article page and runs
//! [`scrape_og_image`] over it.
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;

use super::fetcher::fetch_text;
use super::parser::FeedEntry;
use crate::util::{is_valid_image_url, validate_url, youtube_video_id};

static IMG_SRC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<img\b[^>]*?\bsrc\s*=\s*(?:"([^"]*)"|'([^']*)')"#).expect("valid regex")
});
static META_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<meta\b[^>]*>").expect("valid regex"));
static ATTRIBUTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)([a-z_:-]+)\s*=\s*(?:"([^"]*)"|'([^']*)')"#).expect("valid regex")
});
static ARTICLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<article\b[^>]*>(.*?)</article\s*>").expect("valid regex"));

/// Walks the entry's image sources in a fixed order and returns the first
/// usable one:
///
/// 1. media thumbnails
/// 2. media content
/// 3. enclosures
/// 4. `<img>` in the summary markup
/// 5. `<img>` in the full content blocks
/// 6. the YouTube thumbnail for video links
///
/// Candidates that are not http(s) URLs are passed over.
pub fn extract_image(entry: &FeedEntry) -> Option<String> {
    entry
        .media_thumbnails
        .iter()
        .find(|u| is_valid_image_url(u))
        .or_else(|| entry.media_contents.iter().find(|u| is_valid_image_url(u)))
        .or_else(|| entry.enclosures.iter().find(|u| is_valid_image_url(u)))
        .cloned()
        .or_else(|| entry.summary.as_deref().and_then(first_img_src))
        .or_else(|| entry.content.iter().find_map(|c| first_img_src(c)))
        .or_else(|| {
            let id = youtube_video_id(entry.link.as_deref()?)?;
            Some(format!("https://img.youtube.com/vi/{}/hqdefault.jpg", id))
        })
}

/// Finds a representative image in an article page.
///
/// Tries `og:image`, then `twitter:image`, then the first `<img>` inside
/// `<article>`, then the first `<img>` anywhere. A step whose candidate is
/// missing or not an http(s) URL falls through to the next.
pub fn scrape_og_image(html: &str) -> Option<String> {
    meta_content(html, "og:image")
        .or_else(|| meta_content(html, "twitter:image"))
        .or_else(|| {
            ARTICLE
                .captures(html)
                .and_then(|caps| caps.get(1))
                .and_then(|body| first_img_src(body.as_str()))
        })
        .or_else(|| first_img_src(html))
}

/// Fetches `link` and scrapes it for an image.
///
/// Best effort: every failure is logged at debug level and yields `None`.
pub async fn backfill_image(
    client: &reqwest::Client,
    link: &str,
    timeout: Duration,
    allow_private: bool,
) -> Option<String> {
    let url = match validate_url(link, allow_private) {
        Ok(url) => url,
        Err(e) => {
            tracing::debug!(link = %link, error = %e, "Not fetching link for image");
            return None;
        }
    };

    match fetch_text(client, url.as_str(), timeout).await {
        Ok(html) => {
            let image = scrape_og_image(&html);
            if image.is_none() {
                tracing::debug!(link = %link, "No image found in page");
            }
            image
        }
        Err(e) => {
            tracing::debug!(link = %link, error = %e, "Image backfill fetch failed");
            None
        }
    }
}

/// First `<img src>` in markup, only if it is an http(s) URL.
fn first_img_src(markup: &str) -> Option<String> {
    let caps = IMG_SRC.captures(markup)?;
    let src = caps.get(1).or_else(|| caps.get(2))?.as_str();
    let src = html_escape::decode_html_entities(src.trim()).into_owned();
    is_valid_image_url(&src).then_some(src)
}

fn meta_content(html: &str, key: &str) -> Option<String> {
    META_TAG.find_iter(html).find_map(|tag| {
        let mut names_key = false;
        let mut content = None;

        for caps in ATTRIBUTE.captures_iter(tag.as_str()) {
            let name = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
            let value = caps.get(2).or_else(|| caps.get(3)).map(|m| m.as_str()).unwrap_or_default();

            if name.eq_ignore_ascii_case("property") || name.eq_ignore_ascii_case("name") {
                names_key |= value.trim().eq_ignore_ascii_case(key);
            } else if name.eq_ignore_ascii_case("content") {
                content = Some(html_escape::decode_html_entities(value.trim()).into_owned());
            }
        }

        content.filter(|c| names_key && is_valid_image_url(c))
    })
}
