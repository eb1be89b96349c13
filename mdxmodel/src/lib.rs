//! # mdxmodel - Canonical item types
//!
//! Every directory provider speaks its own wire format; this crate defines the
//! single shape their results are normalized into before deduplication,
//! ranking and caching. Items are flat records: once returned to a caller the
//! engine keeps no reference to them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

// ============================================================================
// Provider identifiers
// ============================================================================

/// Identifier of a directory provider.
///
/// The set of providers is closed: adapters are instantiated from this enum,
/// never discovered dynamically. `Feed` is a pseudo-source used for items
/// produced by the feed parser rather than by a search adapter; it is not part
/// of [`ProviderId::ALL`] and never appears in the registry.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum ProviderId {
    RadioBrowser,
    Shoutcast,
    Radiobox,
    Itunes,
    PodcastIndex,
    Taddy,
    Feed,
}

/// Which kind of catalog a provider answers for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Stations,
    Podcasts,
}

impl ProviderId {
    /// All searchable providers, in declaration order.
    pub const ALL: [ProviderId; 6] = [
        ProviderId::RadioBrowser,
        ProviderId::Shoutcast,
        ProviderId::Radiobox,
        ProviderId::Itunes,
        ProviderId::PodcastIndex,
        ProviderId::Taddy,
    ];

    /// Machine-readable name, stable across releases (used in cache keys,
    /// environment variables and log fields).
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderId::RadioBrowser => "radio-browser",
            ProviderId::Shoutcast => "shoutcast",
            ProviderId::Radiobox => "radiobox",
            ProviderId::Itunes => "itunes",
            ProviderId::PodcastIndex => "podcast-index",
            ProviderId::Taddy => "taddy",
            ProviderId::Feed => "feed",
        }
    }

    pub fn kind(&self) -> MediaKind {
        match self {
            ProviderId::RadioBrowser | ProviderId::Shoutcast | ProviderId::Radiobox => {
                MediaKind::Stations
            }
            ProviderId::Itunes | ProviderId::PodcastIndex | ProviderId::Taddy | ProviderId::Feed => {
                MediaKind::Podcasts
            }
        }
    }

    /// Parse a machine-readable name back into an identifier.
    pub fn parse(name: &str) -> Option<ProviderId> {
        match name {
            "radio-browser" => Some(ProviderId::RadioBrowser),
            "shoutcast" => Some(ProviderId::Shoutcast),
            "radiobox" => Some(ProviderId::Radiobox),
            "itunes" => Some(ProviderId::Itunes),
            "podcast-index" => Some(ProviderId::PodcastIndex),
            "taddy" => Some(ProviderId::Taddy),
            "feed" => Some(ProviderId::Feed),
            _ => None,
        }
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Explicit-content flag
// ============================================================================

/// Tri-state explicit-content flag reported by podcast directories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Explicit {
    #[default]
    Unknown,
    Clean,
    Explicit,
}

impl Explicit {
    pub fn from_flag(explicit: bool) -> Self {
        if explicit {
            Explicit::Explicit
        } else {
            Explicit::Clean
        }
    }

    /// Combine two provider reports. A known value beats `Unknown`; when two
    /// known values disagree the result is `Explicit` (conservative).
    pub fn merge(self, other: Explicit) -> Explicit {
        match (self, other) {
            (Explicit::Unknown, x) => x,
            (x, Explicit::Unknown) => x,
            (Explicit::Clean, Explicit::Clean) => Explicit::Clean,
            _ => Explicit::Explicit,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Explicit::Unknown)
    }
}

// ============================================================================
// StationItem
// ============================================================================

/// A single radio-station candidate in canonical form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StationItem {
    /// Provider-scoped catalog id (opaque).
    pub id: String,
    pub name: String,
    /// Playable HTTP/HTTPS URL. An item with an empty stream URL cannot play
    /// and is discarded before deduplication.
    pub stream_url: String,
    #[serde(default)]
    pub homepage: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    /// ISO-3166-1 alpha-2.
    #[serde(default)]
    pub country_code: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    /// Genre tags, case-preserving, deduplicated case-insensitively.
    #[serde(default)]
    pub tags: Vec<String>,
    /// kbps, 0 when unknown.
    #[serde(default)]
    pub bitrate: u32,
    #[serde(default)]
    pub codec: Option<String>,
    #[serde(default)]
    pub logo_url: Option<String>,
    #[serde(default)]
    pub votes: u64,
    #[serde(default)]
    pub click_count: u64,
    #[serde(default)]
    pub last_changed: Option<DateTime<Utc>>,
    /// Provider that originally produced this record.
    pub source: ProviderId,
    /// Every provider that contributed to this record after merging.
    /// Always contains `source`.
    #[serde(default)]
    pub source_providers: BTreeSet<ProviderId>,
}

impl StationItem {
    pub fn new(
        source: ProviderId,
        id: impl Into<String>,
        name: impl Into<String>,
        stream_url: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            stream_url: stream_url.into(),
            homepage: None,
            country: None,
            country_code: None,
            state: None,
            city: None,
            language: None,
            tags: Vec::new(),
            bitrate: 0,
            codec: None,
            logo_url: None,
            votes: 0,
            click_count: 0,
            last_changed: None,
            source,
            source_providers: BTreeSet::from([source]),
        }
    }

    /// Votes plus click count; the ranking signal for stations.
    pub fn popularity(&self) -> u64 {
        self.votes + self.click_count
    }

    pub fn has_stream(&self) -> bool {
        !self.stream_url.trim().is_empty()
    }
}

// ============================================================================
// PodcastItem
// ============================================================================

/// A single podcast candidate in canonical form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PodcastItem {
    /// Provider-scoped catalog id (opaque).
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub artwork_url: Option<String>,
    #[serde(default)]
    pub feed_url: Option<String>,
    /// Apple catalog id, when any contributing provider knows it.
    #[serde(default)]
    pub itunes_id: Option<String>,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub episode_count: Option<u32>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub website_url: Option<String>,
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
    #[serde(default)]
    pub explicit: Explicit,
    /// Provider-reported or inferred; 0 when the provider has no signal.
    #[serde(default)]
    pub popularity: u64,
    pub source: ProviderId,
    #[serde(default)]
    pub source_providers: BTreeSet<ProviderId>,
}

impl PodcastItem {
    pub fn new(source: ProviderId, id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            author: None,
            description: None,
            artwork_url: None,
            feed_url: None,
            itunes_id: None,
            categories: Vec::new(),
            episode_count: None,
            language: None,
            website_url: None,
            last_updated: None,
            explicit: Explicit::Unknown,
            popularity: 0,
            source,
            source_providers: BTreeSet::from([source]),
        }
    }
}

// ============================================================================
// EpisodeItem
// ============================================================================

/// A podcast episode, emitted only by the feed parser.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EpisodeItem {
    /// Unique per feed; falls back to the audio URL when the feed has no guid.
    pub guid: String,
    /// Id of the parent podcast within the feed.
    pub podcast_id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub audio_url: String,
    #[serde(default)]
    pub duration_secs: Option<u32>,
    /// Episode artwork; defaults to the parent podcast artwork.
    #[serde(default)]
    pub artwork_url: Option<String>,
    #[serde(default)]
    pub published: Option<DateTime<Utc>>,
}

// ============================================================================
// Shared normalization helpers
// ============================================================================

/// Convert an empty or whitespace-only string to None.
pub fn non_empty(s: &str) -> Option<String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Split a comma-separated tag string into a case-insensitively deduplicated
/// list, preserving the original case of the first occurrence.
pub fn split_tags(raw: &str) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    for part in raw.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        if !tags.iter().any(|t| t.eq_ignore_ascii_case(part)) {
            tags.push(part.to_string());
        }
    }
    tags
}

/// Union `incoming` into `tags`, comparing case-insensitively and keeping the
/// case already present.
pub fn merge_tags(tags: &mut Vec<String>, incoming: &[String]) {
    for tag in incoming {
        let tag = tag.trim();
        if tag.is_empty() {
            continue;
        }
        if !tags.iter().any(|t| t.eq_ignore_ascii_case(tag)) {
            tags.push(tag.to_string());
        }
    }
}
