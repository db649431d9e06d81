//! Renders jobs as chat-webhook JSON bodies.
use chrono::{DateTime, Utc};
use serde_json::{json, Value};

use super::job::{JobPayload, NotificationJob};
use crate::config::Config;
use crate::util::{clean_html, is_valid_image_url, site_name, truncate_chars};

pub const ARTICLE_COLOR: u32 = 0x00ff00;
pub const STREAM_COLOR: u32 = 0x9146ff;

/// Embed titles longer than this are rejected by the destination.
const MAX_TITLE_CHARS: usize = 256;

/// Builds the request body for `job`.
///
/// `now` stamps the embed and cache-busts stream preview images.
pub fn build_payload(job: &NotificationJob, now: DateTime<Utc>, config: &Config) -> Value {
    match &job.payload {
        JobPayload::Heartbeat => json!({ "content": job.title }),

        JobPayload::Video { author } => json!({
            "content": format!("🎥 New video from **{}**!\n{}", author, job.link)
        }),

        JobPayload::Article { summary } => {
            let site = site_name(&job.link).unwrap_or_else(|| job.category.clone());
            let description = article_description(summary.as_deref(), &job.link, config.description_budget);

            let mut embed = json!({
                "title": truncate_chars(&job.title, MAX_TITLE_CHARS),
                "url": job.link,
                "description": description,
                "color": ARTICLE_COLOR,
                "timestamp": now.to_rfc3339(),
                "footer": { "text": job.category }
            });
            if let Some(image) = job.image.as_deref().filter(|i| is_valid_image_url(i)) {
                embed["image"] = json!({ "url": image });
            }

            json!({
                "content": format!("📰 New article from **{}**!", site),
                "embeds": [embed]
            })
        }

        JobPayload::StreamLive {
            channel,
            uptime,
            game,
            viewers,
            avatar,
        } => {
            let mut author = json!({ "name": channel, "url": job.link });
            if let Some(avatar) = avatar {
                author["icon_url"] = json!(avatar);
            }

            let preview = format!(
                "{}/live_user_{}-1280x720.jpg?t={}",
                config.stream_preview_base.trim_end_matches('/'),
                channel.to_lowercase(),
                now.timestamp()
            );

            let embed = json!({
                "author": author,
                "title": truncate_chars(&job.title, MAX_TITLE_CHARS),
                "url": job.link,
                "color": STREAM_COLOR,
                "fields": [
                    { "name": "Game", "value": game.as_deref().unwrap_or("Unknown"), "inline": true },
                    { "name": "Viewers", "value": viewers.as_deref().unwrap_or("?"), "inline": true },
                    { "name": "Uptime", "value": uptime, "inline": true }
                ],
                "footer": { "text": job.category },
                "timestamp": now.to_rfc3339(),
                "image": { "url": preview }
            });

            json!({
                "content": format!("🔴 **{}** is now live!", channel),
                "embeds": [embed]
            })
        }
    }
}

fn article_description(summary: Option<&str>, link: &str, budget: usize) -> String {
    let text = summary.map(clean_html).unwrap_or_default();
    if text.is_empty() {
        format!("[Click to read]({})", link)
    } else {
        format!("{}\n\n[Read more]({})", truncate_chars(&text, budget), link)
    }
}
