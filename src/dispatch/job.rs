use crate::feed::Item;
use crate::registry::{Endpoint, Source};
use crate::stream::LiveDetails;
use crate::util::is_video_link;

/// Fallback author shown for video links without one.
const DEFAULT_VIDEO_AUTHOR: &str = "YouTube";

/// A ready-to-send notification. Immutable once enqueued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationJob {
    pub title: String,
    pub link: String,
    pub image: Option<String>,
    pub endpoint: Endpoint,
    pub category: String,
    pub payload: JobPayload,
}

/// What kind of message the job renders as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobPayload {
    Article {
        summary: Option<String>,
    },
    Video {
        author: String,
    },
    StreamLive {
        channel: String,
        uptime: String,
        game: Option<String>,
        viewers: Option<String>,
        avatar: Option<String>,
    },
    /// Plain operator message; the text is the job title.
    Heartbeat,
}

impl NotificationJob {
    /// Builds the job for a feed item. YouTube links become video jobs.
    pub fn from_item(item: Item, endpoint: Endpoint) -> Self {
        let payload = if is_video_link(&item.link) {
            JobPayload::Video {
                author: item
                    .author
                    .unwrap_or_else(|| DEFAULT_VIDEO_AUTHOR.to_string()),
            }
        } else {
            JobPayload::Article {
                summary: item.summary,
            }
        };

        Self {
            title: item.title,
            link: item.link,
            image: item.image,
            endpoint,
            category: item.category,
            payload,
        }
    }

    /// Builds the went-live job for a stream source.
    pub fn stream_live(source: &Source, channel: &str, uptime: String, details: LiveDetails) -> Self {
        Self {
            title: details
                .title
                .unwrap_or_else(|| format!("{} is live", channel)),
            link: format!("https://www.twitch.tv/{}", channel),
            image: None,
            endpoint: source.endpoint.clone(),
            category: source.category.clone(),
            payload: JobPayload::StreamLive {
                channel: channel.to_string(),
                uptime,
                game: details.game,
                viewers: details.viewers,
                avatar: details.avatar,
            },
        }
    }

    pub fn heartbeat(endpoint: Endpoint, message: impl Into<String>) -> Self {
        Self {
            title: message.into(),
            link: String::new(),
            image: None,
            endpoint,
            category: String::new(),
            payload: JobPayload::Heartbeat,
        }
    }
}
