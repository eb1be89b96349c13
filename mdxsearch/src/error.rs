//! Engine-level errors
//!
//! Provider failures never reach this type; they become missing
//! contributions inside the orchestrator. Only the feed entry points surface
//! errors, because their caller must distinguish "no episodes" from "not a
//! feed".

use mdxfeed::FeedError;

/// Result type alias for engine entry points that can fail.
pub type Result<T> = std::result::Result<T, SearchError>;

#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    /// The document is not a well-formed podcast feed.
    #[error(transparent)]
    Feed(#[from] FeedError),

    /// Fetching the feed body failed before parsing could start.
    #[error("feed fetch failed: {0}")]
    FeedFetch(#[from] reqwest::Error),
}
