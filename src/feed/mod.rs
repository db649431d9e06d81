//! Feed retrieval and normalization.
//!
//! - [`parser`] - raw bytes to [`FeedEntry`] values via `feed-rs`
//! - [`extract`] - freshness filtering and conversion to [`Item`]
//! - [`image`] - the image fallback chain and the HTML scraper used to backfill it
//! - [`fetcher`] - bounded HTTP GETs shared by the feed and stream pollers

pub mod extract;
pub mod fetcher;
pub mod image;
pub mod parser;

pub use extract::{extract_items, freshest, is_fresh, Item, NO_TITLE};
pub use fetcher::{fetch_bytes, fetch_text, FetchError, MAX_BODY_SIZE};
pub use image::{backfill_image, extract_image, scrape_og_image};
pub use parser::{parse_feed, FeedEntry, ParseError};
