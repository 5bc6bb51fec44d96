//! Owner-batching loader for the collection-sharing views.
//!
//! Collection pages render an owner badge row under every visible album or
//! pressing. Fetching those one by one would cost a round trip per row, so
//! [`OwnersService`] coalesces lookups into chunked batch calls, caches the
//! results, and refetches selectively when the live-update feed reports a
//! change. Two instances run at once, one per [`OwnerScope`]; `feed.rs`
//! bridges the shared SSE feed into each.

mod feed;
mod service;

pub use feed::{spawn_owner_bridge, FeedEvent, OwnersFeed};
pub use service::{OwnerSource, OwnersService};

/// Which entity domain a loader instance resolves owners for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OwnerScope {
    Album,
    Pressing,
}

impl OwnerScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            OwnerScope::Album => "album",
            OwnerScope::Pressing => "pressing",
        }
    }
}

/// Events emitted by [`OwnersService`] when cached owner data changes.
#[derive(Clone, Debug)]
pub enum OwnersEvent {
    /// Owner lists for these entity IDs were (re)fetched.
    Updated { entity_ids: Vec<String> },
}
