//! The two producer loops.
//!
//! Both re-read the source registry at the start of every cycle, visit their
//! sources in registry order, and push jobs onto the dispatch queue. A
//! failing source is logged and skipped; it never aborts the cycle.

mod feed;
mod stream;

pub use feed::FeedPoller;
pub use stream::StreamPoller;

/// Outcome of one completed poll cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Sources visited.
    pub sources: usize,
    /// Sources whose fetch or query failed.
    pub failed: usize,
    /// Jobs pushed onto the dispatch queue.
    pub enqueued: usize,
}
