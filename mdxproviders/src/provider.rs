//! Provider traits
//!
//! The uniform contract every directory adapter implements. `try_search`
//! carries the typed error; `search` is the failure-isolating entry point the
//! orchestrator calls, where any adapter error is logged at warn and becomes
//! an empty contribution, never a failed request.

use crate::error::ProviderResult;
use crate::query::SearchQuery;
use async_trait::async_trait;
use mdxmodel::{PodcastItem, ProviderId, StationItem};
use tracing::warn;

/// A source of radio-station listings.
#[async_trait]
pub trait StationProvider: Send + Sync {
    fn id(&self) -> ProviderId;

    /// True when the provider needs credentials to be queried at all.
    fn requires_auth(&self) -> bool {
        false
    }

    /// False when mandatory credentials are missing; unavailable providers
    /// are skipped by the registry.
    fn is_available(&self) -> bool {
        true
    }

    async fn try_search(&self, query: &SearchQuery) -> ProviderResult<Vec<StationItem>>;

    /// Failure-isolated search: errors are logged, not propagated.
    async fn search(&self, query: &SearchQuery) -> Vec<StationItem> {
        match self.try_search(query).await {
            Ok(items) => items,
            Err(err) => {
                warn!(provider = %self.id(), error = %err, "station search failed");
                Vec::new()
            }
        }
    }
}

/// A source of podcast listings.
#[async_trait]
pub trait PodcastProvider: Send + Sync {
    fn id(&self) -> ProviderId;

    fn requires_auth(&self) -> bool {
        false
    }

    fn is_available(&self) -> bool {
        true
    }

    async fn try_search(&self, query: &SearchQuery) -> ProviderResult<Vec<PodcastItem>>;

    /// Failure-isolated search: errors are logged, not propagated.
    async fn search(&self, query: &SearchQuery) -> Vec<PodcastItem> {
        match self.try_search(query).await {
            Ok(items) => items,
            Err(err) => {
                warn!(provider = %self.id(), error = %err, "podcast search failed");
                Vec::new()
            }
        }
    }
}
