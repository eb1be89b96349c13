//! Apple iTunes search adapter
//!
//! Unauthenticated GET against the public search API. Apple reports no
//! popularity signal, so items from this provider rank on consensus with
//! other directories rather than on their own weight.

use crate::error::ProviderResult;
use crate::http;
use crate::provider::PodcastProvider;
use crate::query::SearchQuery;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mdxconfig::ProviderConfig;
use mdxmodel::{non_empty, Explicit, PodcastItem, ProviderId};
use serde::Deserialize;

pub const DEFAULT_BASE_URL: &str = "https://itunes.apple.com";

// ============================================================================
// Wire format
// ============================================================================

#[derive(Debug, Deserialize)]
struct ItSearchResponse {
    #[serde(default)]
    results: Vec<ItPodcast>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ItPodcast {
    track_id: Option<u64>,
    collection_id: Option<u64>,
    #[serde(default)]
    collection_name: String,
    artist_name: Option<String>,
    feed_url: Option<String>,
    artwork_url100: Option<String>,
    artwork_url600: Option<String>,
    collection_view_url: Option<String>,
    primary_genre_name: Option<String>,
    #[serde(default)]
    genres: Vec<String>,
    track_count: Option<u32>,
    collection_explicitness: Option<String>,
    release_date: Option<String>,
}

fn explicitness(raw: Option<&str>) -> Explicit {
    match raw.map(str::trim) {
        Some("explicit") => Explicit::Explicit,
        Some("cleaned") | Some("clean") | Some("notExplicit") => Explicit::Clean,
        _ => Explicit::Unknown,
    }
}

fn convert(it: ItPodcast) -> Option<PodcastItem> {
    let id = it.track_id.or(it.collection_id)?;

    let mut podcast = PodcastItem::new(ProviderId::Itunes, id.to_string(), it.collection_name);
    podcast.author = it.artist_name.as_deref().and_then(non_empty);
    podcast.feed_url = it.feed_url.as_deref().and_then(non_empty);
    podcast.itunes_id = Some(id.to_string());
    // The 600px artwork when present, the 100px thumbnail otherwise.
    podcast.artwork_url = it
        .artwork_url600
        .as_deref()
        .or(it.artwork_url100.as_deref())
        .and_then(non_empty);
    podcast.website_url = it.collection_view_url.as_deref().and_then(non_empty);
    podcast.episode_count = it.track_count;
    podcast.explicit = explicitness(it.collection_explicitness.as_deref());
    podcast.last_updated = it
        .release_date
        .as_deref()
        .and_then(|raw| DateTime::parse_from_rfc3339(raw.trim()).ok())
        .map(|dt| dt.with_timezone(&Utc));
    if it.genres.is_empty() {
        if let Some(genre) = it.primary_genre_name.as_deref().and_then(non_empty) {
            podcast.categories.push(genre);
        }
    } else {
        for genre in it.genres {
            if let Some(genre) = non_empty(&genre) {
                if genre.eq_ignore_ascii_case("podcasts") {
                    continue;
                }
                if !podcast
                    .categories
                    .iter()
                    .any(|c| c.eq_ignore_ascii_case(&genre))
                {
                    podcast.categories.push(genre);
                }
            }
        }
    }
    Some(podcast)
}

// ============================================================================
// Adapter
// ============================================================================

pub struct ItunesProvider {
    client: reqwest::Client,
    base_url: String,
}

impl ItunesProvider {
    pub fn new(config: &ProviderConfig) -> ProviderResult<Self> {
        Ok(Self {
            client: http::build_client(config.timeout)?,
            base_url: config
                .base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        })
    }
}

#[async_trait]
impl PodcastProvider for ItunesProvider {
    fn id(&self) -> ProviderId {
        ProviderId::Itunes
    }

    async fn try_search(&self, query: &SearchQuery) -> ProviderResult<Vec<PodcastItem>> {
        if query.text.is_empty() {
            return Ok(Vec::new());
        }

        let limit = query.limit.to_string();
        let mut params: Vec<(&str, &str)> = vec![
            ("media", "podcast"),
            ("term", query.text.as_str()),
            ("limit", limit.as_str()),
        ];
        if let Some(language) = query.language.as_deref() {
            params.push(("lang", language));
        }

        let response = self
            .client
            .get(format!("{}/search", self.base_url))
            .query(&params)
            .send()
            .await?;
        let page: ItSearchResponse = http::read_json(response).await?;

        Ok(page.results.into_iter().filter_map(convert).collect())
    }
}
