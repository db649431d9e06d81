//! Live-stream status checks.
//!
//! [`StreamClient`] asks the bare-text status service about one channel;
//! [`StreamStateTracker`] remembers the last answer so only the offline→live
//! edge produces a notification.

mod client;
mod tracker;

pub use client::{LiveDetails, Liveness, StreamClient, StreamError};
pub use tracker::StreamStateTracker;
