//! Community radio directory adapter (radio-browser)
//!
//! The community database is served by a set of volunteer mirrors with no
//! authentication. The adapter keeps a rotating host list: a connection or
//! non-2xx failure advances to the next mirror, and the first success against
//! a new mirror promotes it to preferred for subsequent calls.

use crate::error::{ProviderError, ProviderResult};
use crate::http;
use crate::provider::StationProvider;
use crate::query::SearchQuery;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mdxconfig::ProviderConfig;
use mdxmodel::{non_empty, split_tags, ProviderId, StationItem};
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::{info, warn};

/// Volunteer mirrors, tried in order starting from the preferred one.
pub const DEFAULT_HOSTS: &[&str] = &[
    "https://de1.api.radio-browser.info",
    "https://nl1.api.radio-browser.info",
    "https://at1.api.radio-browser.info",
];

// ============================================================================
// Wire format
// ============================================================================

#[derive(Debug, Deserialize)]
struct RbStation {
    stationuuid: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    url_resolved: String,
    #[serde(default)]
    homepage: String,
    #[serde(default)]
    favicon: String,
    #[serde(default)]
    tags: String,
    #[serde(default)]
    country: String,
    #[serde(default)]
    countrycode: String,
    #[serde(default)]
    state: String,
    #[serde(default)]
    language: String,
    #[serde(default)]
    votes: u64,
    #[serde(default)]
    clickcount: u64,
    #[serde(default)]
    codec: String,
    #[serde(default)]
    bitrate: u32,
    #[serde(default)]
    lastchangetime_iso8601: String,
    /// 0 means the mirror verified the stream is reachable over TLS.
    #[serde(default = "default_ssl_error")]
    ssl_error: u32,
}

fn default_ssl_error() -> u32 {
    1
}

impl From<RbStation> for StationItem {
    fn from(rb: RbStation) -> Self {
        // Prefer the mirror-resolved URL over the submitted one.
        let mut stream_url = if rb.url_resolved.is_empty() {
            rb.url
        } else {
            rb.url_resolved
        };
        // The mirror verified TLS works for this stream, so use it.
        if rb.ssl_error == 0 {
            if let Some(rest) = stream_url.strip_prefix("http://") {
                stream_url = format!("https://{rest}");
            }
        }

        let mut station =
            StationItem::new(ProviderId::RadioBrowser, rb.stationuuid, rb.name, stream_url);
        station.homepage = non_empty(&rb.homepage);
        station.country = non_empty(&rb.country);
        station.country_code = non_empty(&rb.countrycode).map(|c| c.to_uppercase());
        station.state = non_empty(&rb.state);
        station.language = non_empty(&rb.language);
        station.tags = split_tags(&rb.tags);
        station.bitrate = rb.bitrate;
        station.codec = non_empty(&rb.codec);
        station.logo_url = non_empty(&rb.favicon);
        station.votes = rb.votes;
        station.click_count = rb.clickcount;
        station.last_changed = DateTime::parse_from_rfc3339(rb.lastchangetime_iso8601.trim())
            .ok()
            .map(|dt| dt.with_timezone(&Utc));
        station
    }
}

// ============================================================================
// Adapter
// ============================================================================

/// Community radio directory provider.
pub struct RadioBrowserProvider {
    client: reqwest::Client,
    hosts: Vec<String>,
    /// Index of the mirror to try first.
    preferred: RwLock<usize>,
}

impl RadioBrowserProvider {
    pub fn new(config: &ProviderConfig) -> ProviderResult<Self> {
        // A base URL override pins a single host and disables rotation.
        let hosts = match &config.base_url {
            Some(base) => vec![base.clone()],
            None => DEFAULT_HOSTS.iter().map(|h| h.to_string()).collect(),
        };
        Self::with_hosts(hosts, config.timeout)
    }

    /// Provider over an explicit mirror list (custom deployments, tests).
    pub fn with_hosts(
        hosts: Vec<String>,
        timeout: std::time::Duration,
    ) -> ProviderResult<Self> {
        Ok(Self {
            client: http::build_client(timeout)?,
            hosts,
            preferred: RwLock::new(0),
        })
    }

    async fn fetch_from(&self, base: &str, query: &SearchQuery) -> ProviderResult<Vec<RbStation>> {
        let limit = query.limit.to_string();
        let mut params: Vec<(&str, &str)> = vec![
            ("limit", limit.as_str()),
            ("offset", "0"),
            ("order", "votes"),
            ("reverse", "true"),
            ("hidebroken", "true"),
        ];
        if !query.text.is_empty() {
            params.push(("name", query.text.as_str()));
        }
        if let Some(country) = query.country.as_deref() {
            params.push(("country", country));
        }
        if let Some(language) = query.language.as_deref() {
            params.push(("language", language));
        }
        if let Some(tag) = query.tag.as_deref() {
            params.push(("tag", tag));
        }

        let response = self
            .client
            .get(format!("{base}/json/stations/search"))
            .query(&params)
            .send()
            .await?;
        http::read_json(response).await
    }
}

#[async_trait]
impl StationProvider for RadioBrowserProvider {
    fn id(&self) -> ProviderId {
        ProviderId::RadioBrowser
    }

    async fn try_search(&self, query: &SearchQuery) -> ProviderResult<Vec<StationItem>> {
        let start = *self.preferred.read().await;
        let mut last_err = None;

        for attempt in 0..self.hosts.len() {
            let idx = (start + attempt) % self.hosts.len();
            match self.fetch_from(&self.hosts[idx], query).await {
                Ok(stations) => {
                    if idx != start {
                        *self.preferred.write().await = idx;
                        info!(host = %self.hosts[idx], "promoted radio-browser mirror");
                    }
                    return Ok(stations
                        .into_iter()
                        .map(StationItem::from)
                        .filter(StationItem::has_stream)
                        .collect());
                }
                // Connection trouble or a bad status: move on to the next
                // mirror. A malformed 2xx body is not a mirror problem.
                Err(err @ ProviderError::Unavailable(_)) => {
                    warn!(host = %self.hosts[idx], error = %err, "radio-browser mirror failed");
                    last_err = Some(err);
                }
                Err(err) => return Err(err),
            }
        }

        Err(last_err.unwrap_or_else(|| ProviderError::Unavailable("no mirrors configured".into())))
    }
}
