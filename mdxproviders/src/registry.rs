//! Provider registry
//!
//! Instantiates every adapter once at startup from [`mdxconfig`] settings and
//! hands the orchestrator the enabled set in priority order. The registry and
//! the configs it holds are immutable after construction.

use crate::itunes::ItunesProvider;
use crate::podcastindex::PodcastIndexProvider;
use crate::provider::{PodcastProvider, StationProvider};
use crate::radiobox::RadioboxProvider;
use crate::radiobrowser::RadioBrowserProvider;
use crate::shoutcast::ShoutcastProvider;
use crate::taddy::TaddyProvider;
use mdxconfig::{ProviderConfig, ProviderSettings};
use mdxlimit::RateLimiter;
use mdxmodel::ProviderId;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

/// One provider's row in the status endpoint.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProviderStatus {
    pub name: ProviderId,
    pub enabled: bool,
    pub priority: u32,
    pub rate_limit_quota: Option<u32>,
    pub remaining: Option<u32>,
    pub reset_seconds: Option<u64>,
}

/// The full provider set, built once at startup.
pub struct ProviderRegistry {
    stations: Vec<(ProviderConfig, Arc<dyn StationProvider>)>,
    podcasts: Vec<(ProviderConfig, Arc<dyn PodcastProvider>)>,
    limiter: Arc<RateLimiter>,
}

impl ProviderRegistry {
    pub fn from_settings(settings: &ProviderSettings, limiter: Arc<RateLimiter>) -> Self {
        let mut stations: Vec<(ProviderConfig, Arc<dyn StationProvider>)> = Vec::new();
        let mut podcasts: Vec<(ProviderConfig, Arc<dyn PodcastProvider>)> = Vec::new();

        for provider in ProviderId::ALL {
            let Some(config) = settings.get(provider) else {
                warn!(provider = %provider, "no configuration for known provider, skipping");
                continue;
            };
            match provider {
                ProviderId::RadioBrowser => match RadioBrowserProvider::new(config) {
                    Ok(p) => stations.push((config.clone(), Arc::new(p))),
                    Err(err) => warn!(provider = %provider, error = %err, "adapter construction failed"),
                },
                ProviderId::Shoutcast => match ShoutcastProvider::new(config) {
                    Ok(p) => stations.push((config.clone(), Arc::new(p))),
                    Err(err) => warn!(provider = %provider, error = %err, "adapter construction failed"),
                },
                ProviderId::Radiobox => match RadioboxProvider::new(config) {
                    Ok(p) => stations.push((config.clone(), Arc::new(p))),
                    Err(err) => warn!(provider = %provider, error = %err, "adapter construction failed"),
                },
                ProviderId::Itunes => match ItunesProvider::new(config) {
                    Ok(p) => podcasts.push((config.clone(), Arc::new(p))),
                    Err(err) => warn!(provider = %provider, error = %err, "adapter construction failed"),
                },
                ProviderId::PodcastIndex => {
                    match PodcastIndexProvider::new(config, limiter.clone()) {
                        Ok(p) => podcasts.push((config.clone(), Arc::new(p))),
                        Err(err) => warn!(provider = %provider, error = %err, "adapter construction failed"),
                    }
                }
                ProviderId::Taddy => match TaddyProvider::new(config, limiter.clone()) {
                    Ok(p) => podcasts.push((config.clone(), Arc::new(p))),
                    Err(err) => warn!(provider = %provider, error = %err, "adapter construction failed"),
                },
                ProviderId::Feed => {}
            }
        }

        // Ascending priority, stable name tie-break.
        stations.sort_by(|a, b| {
            (a.0.priority, a.0.provider.as_str()).cmp(&(b.0.priority, b.0.provider.as_str()))
        });
        podcasts.sort_by(|a, b| {
            (a.0.priority, a.0.provider.as_str()).cmp(&(b.0.priority, b.0.provider.as_str()))
        });

        Self {
            stations,
            podcasts,
            limiter,
        }
    }

    fn passes(config: &ProviderConfig, available: bool, filter: Option<&[ProviderId]>) -> bool {
        if !config.enabled || !available {
            return false;
        }
        match filter {
            Some(wanted) => wanted.contains(&config.provider),
            None => true,
        }
    }

    /// Enabled, available station providers intersected with `filter`, in
    /// ascending priority order.
    pub fn enabled_stations(
        &self,
        filter: Option<&[ProviderId]>,
    ) -> Vec<(ProviderConfig, Arc<dyn StationProvider>)> {
        self.stations
            .iter()
            .filter(|(config, provider)| Self::passes(config, provider.is_available(), filter))
            .map(|(config, provider)| (config.clone(), provider.clone()))
            .collect()
    }

    /// Enabled, available podcast providers intersected with `filter`, in
    /// ascending priority order.
    pub fn enabled_podcasts(
        &self,
        filter: Option<&[ProviderId]>,
    ) -> Vec<(ProviderConfig, Arc<dyn PodcastProvider>)> {
        self.podcasts
            .iter()
            .filter(|(config, provider)| Self::passes(config, provider.is_available(), filter))
            .map(|(config, provider)| (config.clone(), provider.clone()))
            .collect()
    }

    /// Priority map used by the ranker.
    pub fn priorities(&self) -> HashMap<ProviderId, u32> {
        self.stations
            .iter()
            .map(|(c, _)| (c.provider, c.priority))
            .chain(self.podcasts.iter().map(|(c, _)| (c.provider, c.priority)))
            .collect()
    }

    pub fn config_for(&self, provider: ProviderId) -> Option<&ProviderConfig> {
        self.stations
            .iter()
            .map(|(c, _)| c)
            .chain(self.podcasts.iter().map(|(c, _)| c))
            .find(|c| c.provider == provider)
    }

    /// One row per registered provider, stations first, each in priority
    /// order. Never fails: quota stats fall back to zeros on a broken store.
    pub async fn statuses(&self) -> Vec<ProviderStatus> {
        let mut statuses = Vec::new();
        let configs = self
            .stations
            .iter()
            .map(|(c, _)| c)
            .chain(self.podcasts.iter().map(|(c, _)| c));
        for config in configs {
            let stats = self.limiter.stats_for(config.provider).await;
            statuses.push(ProviderStatus {
                name: config.provider,
                enabled: config.enabled,
                priority: config.priority,
                rate_limit_quota: stats.limit,
                remaining: stats.remaining,
                reset_seconds: stats.seconds_until_reset,
            });
        }
        statuses
    }
}
