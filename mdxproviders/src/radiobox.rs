//! Keyword directory adapter (radiobox)
//!
//! The directory only searches by keyword or by country, so language and tag
//! filters are applied in memory after the fetch. When the request carries no
//! facet at all, a keyword is synthesized to elicit a non-empty result page.
//!
//! Stream URL fallback order: explicit `streamUrl`, first entry of
//! `streamUrls`, a URL synthesized from the station id. An item that still
//! ends up without a stream URL is dropped.

use crate::error::{ProviderError, ProviderResult};
use crate::http;
use crate::provider::StationProvider;
use crate::query::SearchQuery;
use async_trait::async_trait;
use mdxconfig::ProviderConfig;
use mdxmodel::{merge_tags, non_empty, ProviderId, StationItem};
use serde::Deserialize;
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://api.radiobox.fm/v2";

// ============================================================================
// Wire format
// ============================================================================

#[derive(Debug, Deserialize)]
struct RbxResponse {
    #[serde(default)]
    stations: Vec<RbxStation>,
}

/// Station ids arrive as numbers from some endpoints and strings from others.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RbxId {
    Num(u64),
    Str(String),
}

impl RbxId {
    fn into_string(self) -> String {
        match self {
            RbxId::Num(n) => n.to_string(),
            RbxId::Str(s) => s,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RbxStation {
    id: RbxId,
    #[serde(default)]
    name: String,
    #[serde(default)]
    stream_url: Option<String>,
    #[serde(default)]
    stream_urls: Vec<String>,
    #[serde(default)]
    country: Option<String>,
    #[serde(default)]
    country_code: Option<String>,
    #[serde(default)]
    city: Option<String>,
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    genres: Vec<String>,
    #[serde(default)]
    logo: Option<String>,
    #[serde(default)]
    website: Option<String>,
    #[serde(default)]
    bitrate: Option<u32>,
}

// ============================================================================
// Adapter
// ============================================================================

pub struct RadioboxProvider {
    client: reqwest::Client,
    base_url: String,
}

impl RadioboxProvider {
    pub fn new(config: &ProviderConfig) -> ProviderResult<Self> {
        Ok(Self {
            client: http::build_client(config.timeout)?,
            base_url: config
                .base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        })
    }

    /// Keyword sent upstream: the text, then the tag, then a synthesized
    /// keyword that reliably returns a populated page.
    fn keyword_for(query: &SearchQuery) -> String {
        if !query.text.is_empty() {
            return query.text.clone();
        }
        if let Some(tag) = query.tag.as_deref().and_then(non_empty) {
            return tag;
        }
        if query.language.is_some() {
            "music".to_string()
        } else {
            "top".to_string()
        }
    }

    fn endpoint_for(&self, query: &SearchQuery) -> ProviderResult<Url> {
        let mut url = if query.text.is_empty() && query.country.is_some() {
            let mut url = Url::parse(&format!("{}/search/stationsbycountry", self.base_url))
                .map_err(|e| ProviderError::Unavailable(e.to_string()))?;
            url.query_pairs_mut()
                .append_pair("country", query.country.as_deref().unwrap_or_default());
            url
        } else {
            let mut url = Url::parse(&format!("{}/search/stationsbykeyword", self.base_url))
                .map_err(|e| ProviderError::Unavailable(e.to_string()))?;
            url.query_pairs_mut()
                .append_pair("keyword", &Self::keyword_for(query));
            url
        };
        url.query_pairs_mut()
            .append_pair("limit", &query.limit.to_string());
        Ok(url)
    }

    fn convert(&self, rbx: RbxStation) -> Option<StationItem> {
        let id = rbx.id.into_string();
        let stream_url = rbx
            .stream_url
            .as_deref()
            .and_then(non_empty)
            .or_else(|| rbx.stream_urls.iter().map(|s| s.as_str()).find_map(non_empty))
            .or_else(|| {
                if id.is_empty() {
                    None
                } else {
                    Some(format!("{}/station/{}/stream", self.base_url, id))
                }
            })?;

        let mut station = StationItem::new(ProviderId::Radiobox, id, rbx.name, stream_url);
        station.country = rbx.country.as_deref().and_then(non_empty);
        station.country_code = rbx
            .country_code
            .as_deref()
            .and_then(non_empty)
            .map(|c| c.to_uppercase());
        station.city = rbx.city.as_deref().and_then(non_empty);
        station.language = rbx.language.as_deref().and_then(non_empty);
        merge_tags(&mut station.tags, &rbx.genres);
        station.logo_url = rbx.logo.as_deref().and_then(non_empty);
        station.homepage = rbx.website.as_deref().and_then(non_empty);
        station.bitrate = rbx.bitrate.unwrap_or(0);
        Some(station)
    }

    /// The upstream cannot filter on language or tag; do it here.
    fn matches_facets(station: &StationItem, query: &SearchQuery) -> bool {
        if let Some(language) = query.language.as_deref() {
            match station.language.as_deref() {
                Some(l) if l.eq_ignore_ascii_case(language) => {}
                _ => return false,
            }
        }
        if let Some(tag) = query.tag.as_deref() {
            if !station.tags.iter().any(|t| t.eq_ignore_ascii_case(tag)) {
                return false;
            }
        }
        true
    }
}

#[async_trait]
impl StationProvider for RadioboxProvider {
    fn id(&self) -> ProviderId {
        ProviderId::Radiobox
    }

    async fn try_search(&self, query: &SearchQuery) -> ProviderResult<Vec<StationItem>> {
        let url = self.endpoint_for(query)?;
        let response = self.client.get(url).send().await?;
        let page: RbxResponse = http::read_json(response).await?;

        Ok(page
            .stations
            .into_iter()
            .filter_map(|rbx| self.convert(rbx))
            .filter(|station| Self::matches_facets(station, query))
            .collect())
    }
}
