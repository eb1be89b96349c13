//! Identity resolution across providers
//!
//! The same station or podcast is published by several directories under
//! different catalog ids. Stations are keyed on their normalized stream URL.
//! Podcasts carry up to three identity facets in descending confidence: feed
//! URL, iTunes catalog id, normalized title+author. An incoming item merges
//! into an existing one when *any* facet collides, and the survivor inherits
//! every facet of both, so that later items can unify through either.
//!
//! Merging is fed in provider-priority order by the orchestrator: atomic
//! scalar fields keep their first non-empty value, which lets the
//! highest-priority provider win them deterministically. Popularity signals
//! are summed across duplicates: independent directories vouching for the
//! same entity is consensus, not repetition.

use mdxmodel::{merge_tags, PodcastItem, StationItem};
use std::collections::HashMap;

// ============================================================================
// Key normalization
// ============================================================================

/// Lowercased, scheme-stripped `host + path` with trailing slashes removed.
pub fn normalize_stream_url(url: &str) -> String {
    let lower = url.trim().to_lowercase();
    let rest = lower
        .strip_prefix("https://")
        .or_else(|| lower.strip_prefix("http://"))
        .unwrap_or(&lower);
    rest.trim_end_matches('/').to_string()
}

/// Lowercased, whitespace-collapsed `title-author`.
pub fn normalize_title_author(title: &str, author: Option<&str>) -> String {
    let squash = |s: &str| {
        s.split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase()
    };
    format!("{}-{}", squash(title), squash(author.unwrap_or_default()))
}

/// Identity facets of a podcast, most confident first.
fn podcast_keys(item: &PodcastItem) -> Vec<String> {
    let mut keys = Vec::with_capacity(3);
    if let Some(feed) = item.feed_url.as_deref() {
        let feed = feed.trim().to_lowercase();
        if !feed.is_empty() {
            keys.push(format!("feed:{feed}"));
        }
    }
    if let Some(itunes) = item.itunes_id.as_deref() {
        let itunes = itunes.trim().to_lowercase();
        if !itunes.is_empty() {
            keys.push(format!("itunes:{itunes}"));
        }
    }
    if !item.title.trim().is_empty() {
        keys.push(format!(
            "name:{}",
            normalize_title_author(&item.title, item.author.as_deref())
        ));
    }
    keys
}

// ============================================================================
// Merge rules
// ============================================================================

fn keep_first(existing: &mut Option<String>, incoming: Option<String>) {
    if existing.as_deref().map_or(true, |s| s.trim().is_empty()) {
        if let Some(value) = incoming {
            if !value.trim().is_empty() {
                *existing = Some(value);
            }
        }
    }
}

fn merge_station(existing: &mut StationItem, incoming: StationItem) {
    if existing.name.trim().is_empty() {
        existing.name = incoming.name;
    }
    keep_first(&mut existing.homepage, incoming.homepage);
    keep_first(&mut existing.country, incoming.country);
    keep_first(&mut existing.country_code, incoming.country_code);
    keep_first(&mut existing.state, incoming.state);
    keep_first(&mut existing.city, incoming.city);
    keep_first(&mut existing.language, incoming.language);
    keep_first(&mut existing.codec, incoming.codec);
    keep_first(&mut existing.logo_url, incoming.logo_url);
    if existing.bitrate == 0 {
        existing.bitrate = incoming.bitrate;
    }
    if existing.last_changed.is_none() {
        existing.last_changed = incoming.last_changed;
    }
    merge_tags(&mut existing.tags, &incoming.tags);
    // Independent provider signals, summed.
    existing.votes += incoming.votes;
    existing.click_count += incoming.click_count;
    existing.source_providers.insert(incoming.source);
    existing.source_providers.extend(incoming.source_providers);
}

fn merge_podcast(existing: &mut PodcastItem, incoming: PodcastItem) {
    if existing.title.trim().is_empty() {
        existing.title = incoming.title;
    }
    keep_first(&mut existing.author, incoming.author);
    keep_first(&mut existing.artwork_url, incoming.artwork_url);
    keep_first(&mut existing.feed_url, incoming.feed_url);
    keep_first(&mut existing.itunes_id, incoming.itunes_id);
    keep_first(&mut existing.language, incoming.language);
    keep_first(&mut existing.website_url, incoming.website_url);
    // The longer description wins regardless of arrival order.
    let incoming_len = incoming.description.as_deref().map_or(0, str::len);
    let existing_len = existing.description.as_deref().map_or(0, str::len);
    if incoming_len > existing_len {
        existing.description = incoming.description;
    }
    if existing.episode_count.is_none() {
        existing.episode_count = incoming.episode_count;
    }
    if existing.last_updated.is_none() {
        existing.last_updated = incoming.last_updated;
    }
    merge_tags(&mut existing.categories, &incoming.categories);
    existing.explicit = existing.explicit.merge(incoming.explicit);
    existing.popularity += incoming.popularity;
    existing.source_providers.insert(incoming.source);
    existing.source_providers.extend(incoming.source_providers);
}

// ============================================================================
// Dedupe
// ============================================================================

/// Merge station candidates keyed on normalized stream URL, preserving
/// first-seen order.
pub fn dedupe_stations(items: Vec<StationItem>) -> Vec<StationItem> {
    let mut merged: Vec<StationItem> = Vec::with_capacity(items.len());
    let mut index: HashMap<String, usize> = HashMap::new();

    for item in items {
        // Unplayable candidates never make it into the canonical list.
        if !item.has_stream() {
            continue;
        }
        let key = normalize_stream_url(&item.stream_url);
        match index.get(&key) {
            Some(&at) => merge_station(&mut merged[at], item),
            None => {
                index.insert(key, merged.len());
                merged.push(item);
            }
        }
    }
    merged
}

/// Merge podcast candidates on any shared identity facet, preserving
/// first-seen order.
pub fn dedupe_podcasts(items: Vec<PodcastItem>) -> Vec<PodcastItem> {
    let mut merged: Vec<PodcastItem> = Vec::with_capacity(items.len());
    let mut index: HashMap<String, usize> = HashMap::new();

    for item in items {
        let keys = podcast_keys(&item);
        if keys.is_empty() {
            // Nothing to identify it by; keep it as-is.
            merged.push(item);
            continue;
        }
        match keys.iter().find_map(|k| index.get(k)).copied() {
            Some(at) => {
                merge_podcast(&mut merged[at], item);
                // The survivor now answers to the union of both facet sets.
                for key in podcast_keys(&merged[at]) {
                    index.entry(key).or_insert(at);
                }
            }
            None => {
                let at = merged.len();
                for key in keys {
                    index.insert(key, at);
                }
                merged.push(item);
            }
        }
    }
    merged
}
