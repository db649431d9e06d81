use url::Url;

/// Query keys starting with any of these prefixes are dropped from item links.
const TRACKING_PREFIXES: &[&str] = &["utm", "fbclid", "gclid"];

/// Strips tracking parameters from a link's query string.
///
/// Links without tracking parameters, and strings that do not parse as URLs,
/// are returned unchanged. Only whole `&`-separated query segments are
/// removed; every other byte of the link is kept as written, so the
/// function is idempotent.
///
/// # Examples
///
/// ```
/// use herald::util::sanitize_url;
///
/// assert_eq!(
///     sanitize_url("https://example.com/a?utm_source=x&utm_medium=y"),
///     "https://example.com/a"
/// );
/// assert_eq!(sanitize_url("not a url"), "not a url");
/// ```
pub fn sanitize_url(raw: &str) -> String {
    if Url::parse(raw).is_err() {
        return raw.to_string();
    }

    let (head, fragment) = raw.split_at(raw.find('#').unwrap_or(raw.len()));
    let Some((base, query)) = head.split_once('?') else {
        return raw.to_string();
    };

    let segments: Vec<&str> = query.split('&').collect();
    let kept: Vec<&str> = segments
        .iter()
        .copied()
        .filter(|segment| !is_tracking_segment(segment))
        .collect();

    if kept.len() == segments.len() {
        return raw.to_string();
    }

    let mut cleaned = String::with_capacity(raw.len());
    cleaned.push_str(base);
    let query = kept.join("&");
    if !query.is_empty() {
        cleaned.push('?');
        cleaned.push_str(&query);
    }
    cleaned.push_str(fragment);
    cleaned
}

/// Checks the decoded key of one raw `key[=value]` query segment.
fn is_tracking_segment(segment: &str) -> bool {
    let key = segment.split_once('=').map_or(segment, |(key, _)| key);
    url::form_urlencoded::parse(key.as_bytes())
        .next()
        .is_some_and(|(key, _)| is_tracking_key(&key))
}

fn is_tracking_key(key: &str) -> bool {
    let lower = key.to_ascii_lowercase();
    TRACKING_PREFIXES.iter().any(|p| lower.starts_with(p))
}

/// Relaxed image URL check: anything served over http(s) is accepted.
pub fn is_valid_image_url(url: &str) -> bool {
    let lower = url.trim_start().to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// True for links that should be announced as a video rather than an article.
pub fn is_video_link(link: &str) -> bool {
    link.contains("youtube.com/watch") || link.contains("youtu.be/")
}

/// Extracts the video identifier from a YouTube watch or short link.
pub fn youtube_video_id(link: &str) -> Option<String> {
    let url = Url::parse(link).ok()?;
    let host = url.host_str()?.trim_start_matches("www.").trim_start_matches("m.");

    let id = match host {
        "youtube.com" if url.path() == "/watch" => url
            .query_pairs()
            .find(|(k, _)| k == "v")
            .map(|(_, v)| v.into_owned()),
        "youtu.be" => url
            .path_segments()
            .and_then(|mut segments| segments.next())
            .map(str::to_string),
        _ => None,
    }?;

    if id.is_empty() {
        None
    } else {
        Some(id)
    }
}

/// Host of a link without a leading `www.`, used as the article source label.
pub fn site_name(link: &str) -> Option<String> {
    let url = Url::parse(link).ok()?;
    url.host_str()
        .map(|h| h.strip_prefix("www.").unwrap_or(h).to_string())
}
