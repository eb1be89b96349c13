//! # mdxfeed - Podcast feed parser
//!
//! Synchronous, deterministic parse of an XML-serialized podcast feed into a
//! channel-level [`PodcastItem`] and its [`EpisodeItem`] list. Identical input
//! always yields identical output; nothing here touches the network.
//!
//! Only `<item>` elements carrying an `<enclosure>` become episodes; an item
//! without one has nothing to play and is skipped silently. Episode duration
//! accepts a plain seconds integer or `HH:MM:SS` / `MM:SS` clock strings; a
//! value that parses as neither yields `None` rather than failing the episode.

use chrono::{DateTime, Utc};
use mdxmodel::{non_empty, EpisodeItem, Explicit, PodcastItem, ProviderId};
use serde::Deserialize;

/// Result type alias for feed parsing.
pub type Result<T> = std::result::Result<T, FeedError>;

/// The only error the engine surfaces to callers of `parse_feed`: its caller
/// needs to distinguish "no episodes" from "not a feed".
#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error("not a well-formed podcast feed: {0}")]
    Invalid(String),
}

/// Parsed feed: channel metadata plus episodes in document order.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedFeed {
    pub podcast: PodcastItem,
    pub episodes: Vec<EpisodeItem>,
}

// ============================================================================
// XML document model (quick-xml + serde)
// ============================================================================

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Option<Channel>,
}

#[derive(Debug, Deserialize)]
struct Channel {
    title: Option<String>,
    link: Option<String>,
    description: Option<String>,
    language: Option<String>,
    #[serde(rename = "lastBuildDate")]
    last_build_date: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    image: Option<ChannelImage>,
    #[serde(rename = "itunes:author")]
    itunes_author: Option<String>,
    #[serde(rename = "itunes:image")]
    itunes_image: Option<ItunesImage>,
    #[serde(rename = "itunes:explicit")]
    itunes_explicit: Option<String>,
    #[serde(rename = "itunes:category", default)]
    itunes_categories: Vec<ItunesCategory>,
    #[serde(rename = "item", default)]
    items: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct ChannelImage {
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ItunesImage {
    #[serde(rename = "@href")]
    href: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ItunesCategory {
    #[serde(rename = "@text")]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    description: Option<String>,
    guid: Option<Guid>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    enclosure: Option<Enclosure>,
    #[serde(rename = "itunes:duration")]
    itunes_duration: Option<String>,
    #[serde(rename = "itunes:image")]
    itunes_image: Option<ItunesImage>,
}

#[derive(Debug, Deserialize)]
struct Guid {
    #[serde(rename = "$text")]
    value: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Enclosure {
    #[serde(rename = "@url")]
    url: Option<String>,
}

// ============================================================================
// Parsing
// ============================================================================

/// Parse a feed body into channel metadata and episodes.
///
/// `feed_url` is the URL the body was fetched from, when known; it becomes
/// the podcast's `feed_url` and preferred id.
pub fn parse_feed(body: &[u8], feed_url: Option<&str>) -> Result<ParsedFeed> {
    let text = String::from_utf8_lossy(body);
    let rss: Rss = quick_xml::de::from_str(&text).map_err(|e| FeedError::Invalid(e.to_string()))?;
    let channel = rss
        .channel
        .ok_or_else(|| FeedError::Invalid("document has no <channel> element".to_string()))?;

    let artwork = channel
        .itunes_image
        .as_ref()
        .and_then(|i| i.href.as_deref())
        .or(channel.image.as_ref().and_then(|i| i.url.as_deref()))
        .and_then(non_empty);

    let title = channel.title.as_deref().and_then(non_empty).unwrap_or_default();
    let id = feed_url
        .and_then(non_empty)
        .or_else(|| channel.link.as_deref().and_then(non_empty))
        .unwrap_or_else(|| title.clone());

    let mut podcast = PodcastItem::new(ProviderId::Feed, id, title);
    podcast.feed_url = feed_url.and_then(non_empty);
    podcast.author = channel.itunes_author.as_deref().and_then(non_empty);
    podcast.description = channel.description.as_deref().and_then(non_empty);
    podcast.artwork_url = artwork.clone();
    podcast.language = channel.language.as_deref().and_then(non_empty);
    podcast.website_url = channel.link.as_deref().and_then(non_empty);
    podcast.last_updated = channel
        .last_build_date
        .as_deref()
        .or(channel.pub_date.as_deref())
        .and_then(parse_rfc2822);
    podcast.explicit = channel
        .itunes_explicit
        .as_deref()
        .map(parse_explicit)
        .unwrap_or(Explicit::Unknown);
    for category in &channel.itunes_categories {
        if let Some(text) = category.text.as_deref().and_then(non_empty) {
            if !podcast
                .categories
                .iter()
                .any(|c| c.eq_ignore_ascii_case(&text))
            {
                podcast.categories.push(text);
            }
        }
    }

    let episodes: Vec<EpisodeItem> = channel
        .items
        .iter()
        .filter_map(|item| convert_item(item, &podcast.id, artwork.as_deref()))
        .collect();

    podcast.episode_count = Some(episodes.len() as u32);

    Ok(ParsedFeed { podcast, episodes })
}

fn convert_item(item: &Item, podcast_id: &str, parent_artwork: Option<&str>) -> Option<EpisodeItem> {
    // No enclosure, nothing to play.
    let audio_url = item
        .enclosure
        .as_ref()
        .and_then(|e| e.url.as_deref())
        .and_then(non_empty)?;

    let guid = item
        .guid
        .as_ref()
        .and_then(|g| g.value.as_deref())
        .and_then(non_empty)
        .unwrap_or_else(|| audio_url.clone());

    Some(EpisodeItem {
        guid,
        podcast_id: podcast_id.to_string(),
        title: item.title.as_deref().and_then(non_empty).unwrap_or_default(),
        description: item.description.as_deref().and_then(non_empty),
        audio_url,
        duration_secs: item.itunes_duration.as_deref().and_then(parse_duration),
        artwork_url: item
            .itunes_image
            .as_ref()
            .and_then(|i| i.href.as_deref())
            .and_then(non_empty)
            .or_else(|| parent_artwork.map(|a| a.to_string())),
        published: item.pub_date.as_deref().and_then(parse_rfc2822),
    })
}

/// `3600`, `1:02:03` or `2:03` → seconds. Anything else is unknown.
fn parse_duration(raw: &str) -> Option<u32> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(secs) = raw.parse::<u32>() {
        return Some(secs);
    }
    let parts: Vec<u32> = raw
        .split(':')
        .map(|p| p.trim().parse::<u32>())
        .collect::<std::result::Result<_, _>>()
        .ok()?;
    match parts[..] {
        [h, m, s] => Some(h * 3600 + m * 60 + s),
        [m, s] => Some(m * 60 + s),
        _ => None,
    }
}

fn parse_rfc2822(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(raw.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn parse_explicit(raw: &str) -> Explicit {
    match raw.trim().to_ascii_lowercase().as_str() {
        "yes" | "true" | "explicit" => Explicit::Explicit,
        "no" | "false" | "clean" => Explicit::Clean,
        _ => Explicit::Unknown,
    }
}
