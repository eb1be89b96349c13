//! Inbound query types and the paging envelope

use mdxmodel::ProviderId;
use serde::Serialize;

/// Limit applied when the caller does not specify one.
pub const DEFAULT_LIMIT: u32 = 20;

/// Hard cap for station searches.
pub const MAX_STATION_LIMIT: u32 = 100;

/// Hard cap for podcast searches.
pub const MAX_PODCAST_LIMIT: u32 = 50;

/// Station search request.
#[derive(Debug, Clone, Default)]
pub struct StationQuery {
    pub text: String,
    pub country: Option<String>,
    pub language: Option<String>,
    pub tag: Option<String>,
    /// 1-based page echoed back in the envelope.
    pub page: u32,
    pub limit: Option<u32>,
    /// Restrict the fan-out to these providers.
    pub providers: Option<Vec<ProviderId>>,
    /// Skip both cache probe and cache store (observability runs).
    pub bypass_cache: bool,
}

impl StationQuery {
    pub fn term(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }
}

/// Podcast search request.
#[derive(Debug, Clone, Default)]
pub struct PodcastQuery {
    pub text: String,
    pub language: Option<String>,
    pub limit: Option<u32>,
    pub providers: Option<Vec<ProviderId>>,
    pub bypass_cache: bool,
}

impl PodcastQuery {
    pub fn term(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }
}

/// Paging envelope for station results. The engine returns one ranked page;
/// `total` counts what that page holds.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: usize,
    pub page: u32,
    pub total_pages: u32,
}

impl<T> Page<T> {
    pub fn single(items: Vec<T>, page: u32) -> Self {
        let total = items.len();
        Self {
            items,
            total,
            page: page.max(1),
            total_pages: 1,
        }
    }
}

/// Clamp a requested limit into `[1, max]`, defaulting when absent.
pub fn clamp_limit(requested: Option<u32>, max: u32) -> u32 {
    requested.unwrap_or(DEFAULT_LIMIT).clamp(1, max)
}
