//! # mdxsearch - Federated directory search
//!
//! One inbound query fans out concurrently to every enabled directory
//! provider, survives any subset of them failing, merges the heterogeneous
//! results into a canonical list, ranks it, and caches the answer.
//!
//! ```no_run
//! use mdxconfig::ProviderSettings;
//! use mdxsearch::{SearchEngine, StationQuery};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let engine = SearchEngine::new(&ProviderSettings::from_env())?;
//!     let page = engine.search_stations(&StationQuery::term("jazz")).await;
//!     for station in &page.items {
//!         println!("{} <{}>", station.name, station.stream_url);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! Failure semantics: a provider that errors, times out, or is denied by its
//! quota contributes nothing; the aggregate is still a success. An empty
//! result list is an answer, not an error. Only the feed entry points return
//! errors, because "not a feed" must be distinguishable from "no episodes".

pub mod cache_key;
pub mod dedupe;
pub mod error;
mod orchestrator;
pub mod params;
pub mod rank;

pub use error::{Result, SearchError};
pub use mdxfeed::ParsedFeed;
pub use mdxproviders::{ProviderStatus, SearchQuery};
pub use params::{Page, PodcastQuery, StationQuery};

use mdxcache::Cache;
use mdxconfig::{ProviderConfig, ProviderSettings};
use mdxlimit::RateLimiter;
use mdxmodel::{PodcastItem, StationItem};
use mdxproviders::ProviderRegistry;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Filter-only result sets change slowly; cache them longer, but never past
/// this ceiling.
const BROWSE_TTL_CAP: Duration = Duration::from_secs(3600);

/// Timeout for fetching a feed body in [`SearchEngine::parse_feed_url`].
const FEED_FETCH_TIMEOUT: Duration = Duration::from_secs(15);

/// The engine behind the station and podcast discovery endpoints.
pub struct SearchEngine {
    registry: Arc<ProviderRegistry>,
    cache: Cache,
    limiter: Arc<RateLimiter>,
    http: reqwest::Client,
}

impl SearchEngine {
    /// Engine over process-local cache and counters.
    pub fn new(settings: &ProviderSettings) -> anyhow::Result<Self> {
        let limiter = Arc::new(RateLimiter::in_memory(settings));
        let registry = Arc::new(ProviderRegistry::from_settings(settings, limiter.clone()));
        Self::with_parts(registry, Cache::in_memory(), limiter)
    }

    /// Engine over explicit parts (shared cache/counter stores, tests).
    pub fn with_parts(
        registry: Arc<ProviderRegistry>,
        cache: Cache,
        limiter: Arc<RateLimiter>,
    ) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(mdxproviders::http::USER_AGENT)
            .timeout(FEED_FETCH_TIMEOUT)
            .build()?;
        Ok(Self {
            registry,
            cache,
            limiter,
            http,
        })
    }

    pub fn registry(&self) -> &Arc<ProviderRegistry> {
        &self.registry
    }

    // ========================================================================
    // Stations
    // ========================================================================

    pub async fn search_stations(&self, query: &StationQuery) -> Page<StationItem> {
        let limit = params::clamp_limit(query.limit, params::MAX_STATION_LIMIT);
        let providers = self.registry.enabled_stations(query.providers.as_deref());
        if providers.is_empty() {
            warn!("no station providers enabled, returning empty result");
            return Page::single(Vec::new(), query.page);
        }

        let key = cache_key::station_key(
            &query.text,
            query.country.as_deref(),
            query.language.as_deref(),
            query.tag.as_deref(),
            limit,
            query.providers.as_deref(),
        );
        if !query.bypass_cache {
            if let Some(items) = self.cache.get_json::<Vec<StationItem>>(&key).await {
                debug!(key, "station search served from cache");
                return Page::single(items, query.page);
            }
        }

        let search = SearchQuery {
            text: query.text.trim().to_string(),
            country: trimmed(&query.country),
            language: trimmed(&query.language),
            tag: trimmed(&query.tag),
            limit,
        };

        let freeform = !search.text.is_empty();
        let ttl = result_ttl(&providers, freeform);

        let calls = providers
            .into_iter()
            .map(|(config, provider)| {
                let search = search.clone();
                (config.provider, config.timeout, async move {
                    provider.search(&search).await
                })
            })
            .collect();
        let mut collected = orchestrator::fan_out(calls, &self.limiter).await;
        for item in &mut collected {
            item.source_providers.insert(item.source);
        }

        let mut merged = dedupe::dedupe_stations(collected);
        rank::order_stations(&mut merged, &self.registry.priorities());
        merged.truncate(limit as usize);

        if !query.bypass_cache {
            self.cache.set_json(&key, &merged, ttl).await;
        }
        Page::single(merged, query.page)
    }

    // ========================================================================
    // Podcasts
    // ========================================================================

    pub async fn search_podcasts(&self, query: &PodcastQuery) -> Vec<PodcastItem> {
        let limit = params::clamp_limit(query.limit, params::MAX_PODCAST_LIMIT);
        let providers = self.registry.enabled_podcasts(query.providers.as_deref());
        if providers.is_empty() {
            warn!("no podcast providers enabled, returning empty result");
            return Vec::new();
        }

        let key = cache_key::podcast_key(
            &query.text,
            query.language.as_deref(),
            limit,
            query.providers.as_deref(),
        );
        if !query.bypass_cache {
            if let Some(items) = self.cache.get_json::<Vec<PodcastItem>>(&key).await {
                debug!(key, "podcast search served from cache");
                return items;
            }
        }

        let search = SearchQuery {
            text: query.text.trim().to_string(),
            language: trimmed(&query.language),
            limit,
            ..SearchQuery::default()
        };

        let freeform = !search.text.is_empty();
        let ttl = result_ttl(&providers, freeform);

        let calls = providers
            .into_iter()
            .map(|(config, provider)| {
                let search = search.clone();
                (config.provider, config.timeout, async move {
                    provider.search(&search).await
                })
            })
            .collect();
        let mut collected = orchestrator::fan_out(calls, &self.limiter).await;
        for item in &mut collected {
            item.source_providers.insert(item.source);
        }

        let mut merged = dedupe::dedupe_podcasts(collected);
        rank::order_podcasts(&mut merged, &self.registry.priorities());
        merged.truncate(limit as usize);

        if !query.bypass_cache {
            self.cache.set_json(&key, &merged, ttl).await;
        }
        merged
    }

    // ========================================================================
    // Statuses and feeds
    // ========================================================================

    /// Per-provider enablement, priority and remaining quota. Never fails.
    pub async fn provider_statuses(&self) -> Vec<ProviderStatus> {
        self.registry.statuses().await
    }

    /// Parse a feed body already in hand.
    pub fn parse_feed(&self, body: &[u8], feed_url: Option<&str>) -> Result<ParsedFeed> {
        Ok(mdxfeed::parse_feed(body, feed_url)?)
    }

    /// Fetch a feed by URL, then parse it.
    pub async fn parse_feed_url(&self, url: &str) -> Result<ParsedFeed> {
        let response = self.http.get(url).send().await?.error_for_status()?;
        let body = response.bytes().await?;
        Ok(mdxfeed::parse_feed(&body, Some(url))?)
    }
}

fn trimmed(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Cache TTL for a result set: the most conservative (smallest) TTL among the
/// queried providers; browse/filter-only queries hold three times longer.
fn result_ttl<P>(providers: &[(ProviderConfig, P)], freeform: bool) -> Duration {
    let base = providers
        .iter()
        .map(|(config, _)| config.cache_ttl)
        .min()
        .unwrap_or(Duration::from_secs(300));
    if freeform {
        base
    } else {
        (base * 3).min(BROWSE_TTL_CAP)
    }
}
