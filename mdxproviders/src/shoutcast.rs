//! Shoutcast-style directory adapter
//!
//! The legacy directory exposes a single free-text endpoint, so every facet
//! (name, tag, country, language) is folded into one query string. Stations
//! frequently omit an explicit stream URL; it is then constructed from the
//! station id.

use crate::error::ProviderResult;
use crate::http;
use crate::provider::StationProvider;
use crate::query::SearchQuery;
use async_trait::async_trait;
use mdxconfig::ProviderConfig;
use mdxmodel::{non_empty, split_tags, ProviderId, StationItem};
use serde::Deserialize;
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://directory.shoutcast.com";

// ============================================================================
// Wire format
// ============================================================================

#[derive(Debug, Deserialize)]
struct ScStation {
    #[serde(rename = "ID")]
    id: u64,
    #[serde(rename = "Name", default)]
    name: String,
    #[serde(rename = "Bitrate", default)]
    bitrate: u32,
    #[serde(rename = "Genre", default)]
    genre: String,
    #[serde(rename = "Listeners", default)]
    listeners: u64,
    #[serde(rename = "Format", default)]
    format: String,
    #[serde(rename = "StreamUrl", default)]
    stream_url: Option<String>,
}

fn codec_from_mime(mime: &str) -> Option<String> {
    match mime.trim() {
        "audio/mpeg" => Some("MP3".to_string()),
        "audio/aacp" | "audio/aac" => Some("AAC".to_string()),
        "application/ogg" | "audio/ogg" => Some("OGG".to_string()),
        other => non_empty(other),
    }
}

// ============================================================================
// Adapter
// ============================================================================

pub struct ShoutcastProvider {
    client: reqwest::Client,
    base_url: String,
}

impl ShoutcastProvider {
    pub fn new(config: &ProviderConfig) -> ProviderResult<Self> {
        Ok(Self {
            client: http::build_client(config.timeout)?,
            base_url: config
                .base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        })
    }

    /// Fold all facets into the directory's single free-text query.
    fn combined_query(query: &SearchQuery) -> String {
        [
            Some(query.text.as_str()),
            query.tag.as_deref(),
            query.country.as_deref(),
            query.language.as_deref(),
        ]
        .into_iter()
        .flatten()
        .filter(|part| !part.trim().is_empty())
        .collect::<Vec<_>>()
        .join(" ")
    }

    fn convert(&self, sc: ScStation) -> StationItem {
        let stream_url = sc
            .stream_url
            .as_deref()
            .and_then(non_empty)
            .unwrap_or_else(|| {
                format!("{}/sbin/tunein-station.m3u?id={}", self.base_url, sc.id)
            });
        let mut station =
            StationItem::new(ProviderId::Shoutcast, sc.id.to_string(), sc.name, stream_url);
        station.tags = split_tags(&sc.genre);
        station.bitrate = sc.bitrate;
        station.codec = codec_from_mime(&sc.format);
        // Listener count is the directory's click-style popularity signal.
        station.click_count = sc.listeners;
        station
    }
}

#[async_trait]
impl StationProvider for ShoutcastProvider {
    fn id(&self) -> ProviderId {
        ProviderId::Shoutcast
    }

    async fn try_search(&self, query: &SearchQuery) -> ProviderResult<Vec<StationItem>> {
        let combined = Self::combined_query(query);
        if combined.is_empty() {
            // The endpoint requires a term; nothing to ask for.
            return Ok(Vec::new());
        }

        let mut url = Url::parse(&format!("{}/Search/UpdateSearch", self.base_url))
            .map_err(|e| crate::error::ProviderError::Unavailable(e.to_string()))?;
        url.query_pairs_mut().append_pair("query", &combined);

        let response = self.client.get(url).send().await?;
        let stations: Vec<ScStation> = http::read_json(response).await?;

        Ok(stations
            .into_iter()
            .take(query.limit as usize)
            .map(|sc| self.convert(sc))
            .filter(StationItem::has_stream)
            .collect())
    }
}
