//! Outbound notification pipeline.
//!
//! Pollers turn discoveries into [`NotificationJob`]s and push them onto the
//! [`DispatchQueue`]. A single [`Dispatcher`] drains it in FIFO order, waiting
//! a fixed interval between sends so bursts never trip the destination's
//! rate limit.

mod dispatcher;
mod format;
mod job;
mod queue;

pub use dispatcher::{Dispatcher, SendError};
pub use format::{build_payload, ARTICLE_COLOR, STREAM_COLOR};
pub use job::{JobPayload, NotificationJob};
pub use queue::{channel, DispatchQueue, JobReceiver};
