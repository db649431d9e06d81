//! Utility functions shared by the pollers and the dispatcher.
//!
//! - **Link hygiene**: tracking-parameter stripping, image URL checks, video IDs
//! - **URL validation**: SSRF guard applied to links taken from feed content
//! - **Text processing**: HTML-to-text cleaning and character-budget truncation
//!
//! # Examples
//!
//! ```
//! use herald::util::{sanitize_url, truncate_chars};
//!
//! assert_eq!(
//!     sanitize_url("https://example.com/post?id=7&utm_source=rss"),
//!     "https://example.com/post?id=7"
//! );
//! assert_eq!(truncate_chars("Hello World", 8), "Hello...");
//! ```

mod links;
mod text;
mod url_validator;

pub use links::{is_valid_image_url, is_video_link, sanitize_url, site_name, youtube_video_id};
pub use text::{clean_html, strip_control_chars, truncate_chars};
pub use url_validator::{validate_url, UrlValidationError};
