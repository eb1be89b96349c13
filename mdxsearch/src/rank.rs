//! Result ordering
//!
//! Three-key stable sort: ascending best (minimum) priority across the
//! item's contributing providers, then descending popularity, then display
//! name. A provider missing from the priority map sorts last.

use mdxmodel::{PodcastItem, ProviderId, StationItem};
use std::cmp::Reverse;
use std::collections::{BTreeSet, HashMap};

fn min_priority(providers: &BTreeSet<ProviderId>, priorities: &HashMap<ProviderId, u32>) -> u32 {
    providers
        .iter()
        .filter_map(|p| priorities.get(p).copied())
        .min()
        .unwrap_or(u32::MAX)
}

fn order_by<T>(
    items: &mut [T],
    priorities: &HashMap<ProviderId, u32>,
    providers: impl Fn(&T) -> &BTreeSet<ProviderId>,
    popularity: impl Fn(&T) -> u64,
    name: impl Fn(&T) -> &str,
) {
    items.sort_by(|a, b| {
        let key_a = (
            min_priority(providers(a), priorities),
            Reverse(popularity(a)),
            name(a).to_lowercase(),
        );
        let key_b = (
            min_priority(providers(b), priorities),
            Reverse(popularity(b)),
            name(b).to_lowercase(),
        );
        key_a.cmp(&key_b)
    });
}

pub fn order_stations(items: &mut [StationItem], priorities: &HashMap<ProviderId, u32>) {
    order_by(
        items,
        priorities,
        |s| &s.source_providers,
        StationItem::popularity,
        |s| s.name.as_str(),
    );
}

pub fn order_podcasts(items: &mut [PodcastItem], priorities: &HashMap<ProviderId, u32>) {
    order_by(
        items,
        priorities,
        |p| &p.source_providers,
        |p| p.popularity,
        |p| p.title.as_str(),
    );
}
