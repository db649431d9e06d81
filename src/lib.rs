//! herald: watches syndication feeds and live-stream channels and relays new
//! items to chat webhooks.
//!
//! Three loops share one single-threaded runtime:
//!
//! - [`poller::FeedPoller`] fetches every feed source, filters by freshness
//!   and by the [`ledger::DedupLedger`], and enqueues notification jobs
//! - [`poller::StreamPoller`] checks stream channels and enqueues a job on
//!   each offline→live transition
//! - [`dispatch::Dispatcher`] drains the queue at a fixed pace
//!
//! The source list ([`registry`]) is re-read every cycle, so an external
//! control surface can edit it while the daemon runs.

pub mod config;
pub mod context;
pub mod daemon;
pub mod dispatch;
pub mod feed;
pub mod ledger;
pub mod poller;
pub mod registry;
pub mod shutdown;
pub mod stream;
pub mod util;
