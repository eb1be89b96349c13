//! Podcast Index adapter (signed headers, metered)
//!
//! Every request carries `X-Auth-Key`, `X-Auth-Date` and an `Authorization`
//! header equal to `SHA1(key || secret || unix-seconds)` in lowercase hex.
//! The upstream quota is small (hundreds of requests per month), so each
//! issued request is billed against the rate limiter whether or not a
//! response ever arrives.

use crate::error::{ProviderError, ProviderResult};
use crate::http;
use crate::provider::PodcastProvider;
use crate::query::SearchQuery;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mdxconfig::ProviderConfig;
use mdxlimit::RateLimiter;
use mdxmodel::{non_empty, Explicit, PodcastItem, ProviderId};
use serde::Deserialize;
use sha1::{Digest, Sha1};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::warn;

pub const DEFAULT_BASE_URL: &str = "https://api.podcastindex.org/api/1.0";

// ============================================================================
// Request signing
// ============================================================================

/// Current unix time in seconds, as the header string.
fn auth_date() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
        .to_string()
}

/// `SHA1(key || secret || timestamp)` as lowercase hex.
fn sign_request(key: &str, secret: &str, timestamp: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(key.as_bytes());
    hasher.update(secret.as_bytes());
    hasher.update(timestamp.as_bytes());
    format!("{:x}", hasher.finalize())
}

// ============================================================================
// Wire format
// ============================================================================

#[derive(Debug, Deserialize)]
struct PiResponse {
    #[serde(default)]
    feeds: Vec<PiFeed>,
}

#[derive(Debug, Deserialize)]
struct PiFeed {
    id: u64,
    #[serde(default)]
    title: String,
    url: Option<String>,
    author: Option<String>,
    #[serde(rename = "ownerName")]
    owner_name: Option<String>,
    description: Option<String>,
    artwork: Option<String>,
    image: Option<String>,
    language: Option<String>,
    link: Option<String>,
    #[serde(rename = "itunesId")]
    itunes_id: Option<u64>,
    #[serde(rename = "episodeCount")]
    episode_count: Option<u32>,
    #[serde(rename = "lastUpdateTime")]
    last_update_time: Option<i64>,
    explicit: Option<bool>,
    /// Category-id to label map.
    categories: Option<BTreeMap<String, String>>,
}

fn convert(pi: PiFeed) -> PodcastItem {
    let mut podcast = PodcastItem::new(ProviderId::PodcastIndex, pi.id.to_string(), pi.title);
    podcast.feed_url = pi.url.as_deref().and_then(non_empty);
    podcast.author = pi
        .author
        .as_deref()
        .or(pi.owner_name.as_deref())
        .and_then(non_empty);
    podcast.description = pi.description.as_deref().and_then(non_empty);
    podcast.artwork_url = pi
        .artwork
        .as_deref()
        .or(pi.image.as_deref())
        .and_then(non_empty);
    podcast.language = pi.language.as_deref().and_then(non_empty);
    podcast.website_url = pi.link.as_deref().and_then(non_empty);
    podcast.itunes_id = pi.itunes_id.map(|id| id.to_string());
    podcast.episode_count = pi.episode_count;
    podcast.last_updated = pi
        .last_update_time
        .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0));
    podcast.explicit = pi.explicit.map(Explicit::from_flag).unwrap_or_default();
    if let Some(categories) = pi.categories {
        for label in categories.into_values() {
            if let Some(label) = non_empty(&label) {
                if !podcast
                    .categories
                    .iter()
                    .any(|c| c.eq_ignore_ascii_case(&label))
                {
                    podcast.categories.push(label);
                }
            }
        }
    }
    podcast
}

// ============================================================================
// Adapter
// ============================================================================

pub struct PodcastIndexProvider {
    client: reqwest::Client,
    base_url: String,
    credentials: Option<(String, String)>,
    limiter: Arc<RateLimiter>,
}

impl PodcastIndexProvider {
    pub fn new(config: &ProviderConfig, limiter: Arc<RateLimiter>) -> ProviderResult<Self> {
        let credentials = match (
            config.credentials.api_key.clone(),
            config.credentials.api_secret.clone(),
        ) {
            (Some(key), Some(secret)) => Some((key, secret)),
            _ => {
                warn!("podcast-index credentials missing, provider will not be queried");
                None
            }
        };
        Ok(Self {
            client: http::build_client(config.timeout)?,
            base_url: config
                .base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            credentials,
            limiter,
        })
    }
}

#[async_trait]
impl PodcastProvider for PodcastIndexProvider {
    fn id(&self) -> ProviderId {
        ProviderId::PodcastIndex
    }

    fn requires_auth(&self) -> bool {
        true
    }

    fn is_available(&self) -> bool {
        self.credentials.is_some()
    }

    async fn try_search(&self, query: &SearchQuery) -> ProviderResult<Vec<PodcastItem>> {
        let Some((key, secret)) = &self.credentials else {
            return Err(ProviderError::AuthMissing(self.id()));
        };
        if query.text.is_empty() {
            return Ok(Vec::new());
        }

        let timestamp = auth_date();
        let signature = sign_request(key, secret, &timestamp);
        let limit = query.limit.to_string();

        let result = self
            .client
            .get(format!("{}/search/byterm", self.base_url))
            .query(&[("q", query.text.as_str()), ("max", limit.as_str())])
            .header("X-Auth-Date", &timestamp)
            .header("X-Auth-Key", key)
            .header("Authorization", &signature)
            .send()
            .await;

        // The request left the building: it counts against the quota even if
        // the response never arrives.
        self.limiter.record(self.id()).await;

        let page: PiResponse = http::read_json(result?).await?;
        Ok(page.feeds.into_iter().map(convert).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mdxlimit::MemoryCounterStore;
    use std::collections::HashMap;

    fn limiter() -> Arc<RateLimiter> {
        Arc::new(RateLimiter::with_quotas(
            Arc::new(MemoryCounterStore::new()),
            HashMap::new(),
        ))
    }

    #[test]
    fn test_signature_shape() {
        let signature = sign_request("key", "secret", "1700000000");
        assert_eq!(signature.len(), 40);
        assert!(signature.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_signature_consistency() {
        let a = sign_request("key", "secret", "100");
        let b = sign_request("key", "secret", "100");
        assert_eq!(a, b);
        let c = sign_request("key", "secret", "101");
        assert_ne!(a, c);
    }

    #[test]
    fn test_known_signature() {
        // sha1("abc") - the key/secret/timestamp concatenation is plain
        // byte concatenation, nothing else.
        let signature = sign_request("a", "b", "c");
        assert_eq!(signature, "a9993e364706816aba3e25717850c26c9cd0d89d");
    }

    #[test]
    fn test_provider_without_credentials_is_unavailable() {
        let config = ProviderConfig::defaults(ProviderId::PodcastIndex);
        let provider = PodcastIndexProvider::new(&config, limiter()).unwrap();
        assert!(!provider.is_available());
        assert!(provider.requires_auth());
    }

    #[tokio::test]
    async fn test_search_without_credentials_short_circuits() {
        let config = ProviderConfig::defaults(ProviderId::PodcastIndex);
        let provider = PodcastIndexProvider::new(&config, limiter()).unwrap();
        let err = provider
            .try_search(&SearchQuery::term("history"))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::AuthMissing(_)));
    }

    #[test]
    fn test_feed_conversion() {
        let pi = PiFeed {
            id: 920666,
            title: "Tech Weekly".to_string(),
            url: Some("https://techweekly.example/rss".to_string()),
            author: None,
            owner_name: Some("Tech Weekly Team".to_string()),
            description: Some("A show about tools.".to_string()),
            artwork: Some("https://img.example/tw.jpg".to_string()),
            image: Some("https://img.example/tw-small.jpg".to_string()),
            language: Some("en".to_string()),
            link: Some("https://techweekly.example".to_string()),
            itunes_id: Some(123456),
            episode_count: Some(88),
            last_update_time: Some(1_700_000_000),
            explicit: Some(false),
            categories: Some(BTreeMap::from([
                ("102".to_string(), "Technology".to_string()),
                ("55".to_string(), "News".to_string()),
            ])),
        };
        let podcast = convert(pi);
        assert_eq!(podcast.id, "920666");
        assert_eq!(podcast.itunes_id.as_deref(), Some("123456"));
        assert_eq!(podcast.author.as_deref(), Some("Tech Weekly Team"));
        assert_eq!(
            podcast.artwork_url.as_deref(),
            Some("https://img.example/tw.jpg")
        );
        assert_eq!(podcast.explicit, Explicit::Clean);
        assert!(podcast.last_updated.is_some());
        assert_eq!(podcast.categories.len(), 2);
    }

    #[test]
    fn test_missing_explicit_is_unknown() {
        let json = r#"{"id": 1, "title": "X"}"#;
        let pi: PiFeed = serde_json::from_str(json).unwrap();
        let podcast = convert(pi);
        assert_eq!(podcast.explicit, Explicit::Unknown);
    }
}
