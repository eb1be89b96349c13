//! Taddy GraphQL adapter (bearer token, metered)
//!
//! A single fixed query document is POSTed to `/graphql` with `{term, limit}`
//! variables. The monthly quota is billed per issued request, like the other
//! metered directory.

use crate::error::{ProviderError, ProviderResult};
use crate::http;
use crate::provider::PodcastProvider;
use crate::query::SearchQuery;
use async_trait::async_trait;
use mdxconfig::ProviderConfig;
use mdxlimit::RateLimiter;
use mdxmodel::{non_empty, PodcastItem, ProviderId};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::warn;

pub const DEFAULT_BASE_URL: &str = "https://api.taddy.org";

/// The one search document this adapter ever sends.
const SEARCH_QUERY: &str = r#"query Search($term: String!, $limit: Int) {
  searchForTerm(term: $term, limitPerPage: $limit, filterForTypes: PODCASTSERIES) {
    podcastSeries {
      uuid
      name
      description
      rssUrl
      itunesId
      imageUrl
      authorName
      language
      websiteUrl
      totalEpisodesCount
      popularityRank
      genres
    }
  }
}"#;

// ============================================================================
// Wire format
// ============================================================================

#[derive(Debug, Deserialize)]
struct TdResponse {
    data: Option<TdData>,
    #[serde(default)]
    errors: Vec<TdError>,
}

#[derive(Debug, Deserialize)]
struct TdError {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct TdData {
    #[serde(rename = "searchForTerm")]
    search_for_term: Option<TdSearch>,
}

#[derive(Debug, Deserialize)]
struct TdSearch {
    #[serde(rename = "podcastSeries", default)]
    podcast_series: Vec<TdSeries>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TdSeries {
    uuid: String,
    #[serde(default)]
    name: String,
    description: Option<String>,
    rss_url: Option<String>,
    itunes_id: Option<u64>,
    image_url: Option<String>,
    author_name: Option<String>,
    language: Option<String>,
    website_url: Option<String>,
    total_episodes_count: Option<u32>,
    popularity_rank: Option<u64>,
    #[serde(default)]
    genres: Vec<String>,
}

/// `PODCASTSERIES_TRUE_CRIME` → `True Crime`.
fn genre_label(raw: &str) -> Option<String> {
    let raw = raw.strip_prefix("PODCASTSERIES_").unwrap_or(raw).trim();
    if raw.is_empty() {
        return None;
    }
    let label = raw
        .split('_')
        .map(|word| {
            let lower = word.to_ascii_lowercase();
            let mut chars = lower.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ");
    Some(label)
}

fn convert(td: TdSeries) -> PodcastItem {
    let mut podcast = PodcastItem::new(ProviderId::Taddy, td.uuid, td.name);
    podcast.description = td.description.as_deref().and_then(non_empty);
    podcast.feed_url = td.rss_url.as_deref().and_then(non_empty);
    podcast.itunes_id = td.itunes_id.map(|id| id.to_string());
    podcast.artwork_url = td.image_url.as_deref().and_then(non_empty);
    podcast.author = td.author_name.as_deref().and_then(non_empty);
    podcast.language = td.language.as_deref().and_then(non_empty);
    podcast.website_url = td.website_url.as_deref().and_then(non_empty);
    podcast.episode_count = td.total_episodes_count;
    podcast.popularity = td.popularity_rank.unwrap_or(0);
    for genre in &td.genres {
        if let Some(label) = genre_label(genre) {
            if !podcast
                .categories
                .iter()
                .any(|c| c.eq_ignore_ascii_case(&label))
            {
                podcast.categories.push(label);
            }
        }
    }
    podcast
}

// ============================================================================
// Adapter
// ============================================================================

pub struct TaddyProvider {
    client: reqwest::Client,
    base_url: String,
    bearer: Option<String>,
    limiter: Arc<RateLimiter>,
}

impl TaddyProvider {
    pub fn new(config: &ProviderConfig, limiter: Arc<RateLimiter>) -> ProviderResult<Self> {
        let bearer = config.credentials.bearer.clone();
        if bearer.is_none() {
            warn!("taddy bearer token missing, provider will not be queried");
        }
        Ok(Self {
            client: http::build_client(config.timeout)?,
            base_url: config
                .base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            bearer,
            limiter,
        })
    }
}

#[async_trait]
impl PodcastProvider for TaddyProvider {
    fn id(&self) -> ProviderId {
        ProviderId::Taddy
    }

    fn requires_auth(&self) -> bool {
        true
    }

    fn is_available(&self) -> bool {
        self.bearer.is_some()
    }

    async fn try_search(&self, query: &SearchQuery) -> ProviderResult<Vec<PodcastItem>> {
        let Some(bearer) = self.bearer.as_deref() else {
            return Err(ProviderError::AuthMissing(self.id()));
        };
        if query.text.is_empty() {
            return Ok(Vec::new());
        }

        let body = json!({
            "query": SEARCH_QUERY,
            "variables": {
                "term": query.text,
                "limit": query.limit,
            },
        });

        let result = self
            .client
            .post(format!("{}/graphql", self.base_url))
            .bearer_auth(bearer)
            .json(&body)
            .send()
            .await;

        self.limiter.record(self.id()).await;

        let response: TdResponse = http::read_json(result?).await?;
        if let Some(data) = response.data {
            let series = data
                .search_for_term
                .map(|s| s.podcast_series)
                .unwrap_or_default();
            return Ok(series.into_iter().map(convert).collect());
        }
        // 2xx with a GraphQL error envelope and no data.
        let sample = response
            .errors
            .first()
            .map(|e| e.message.clone())
            .unwrap_or_else(|| "empty GraphQL response".to_string());
        Err(ProviderError::Malformed {
            sample: http::body_sample(&sample),
        })
    }
}
