//! Cache key construction
//!
//! Keys are a stable colon-joined concatenation:
//! `<namespace>:<query>:<filter...>:<limit>:<providersCSV>`. Filter strings
//! are lowercased and trimmed so that `Jazz` and `jazz ` share an entry;
//! missing filters encode as `all`, a missing provider filter as `any`, and
//! the provider CSV is sorted ascending so filter order does not matter.

use mdxmodel::ProviderId;

pub const STATION_NAMESPACE: &str = "radio-search";
pub const PODCAST_NAMESPACE: &str = "podcasts:multi";

fn norm(value: &str) -> String {
    value.trim().to_lowercase()
}

fn norm_opt(value: Option<&str>, missing: &str) -> String {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => v.to_lowercase(),
        _ => missing.to_string(),
    }
}

fn providers_csv(filter: Option<&[ProviderId]>) -> String {
    match filter {
        Some(providers) if !providers.is_empty() => {
            let mut names: Vec<&str> = providers.iter().map(ProviderId::as_str).collect();
            names.sort_unstable();
            names.dedup();
            names.join(",")
        }
        _ => "any".to_string(),
    }
}

pub fn station_key(
    text: &str,
    country: Option<&str>,
    language: Option<&str>,
    tag: Option<&str>,
    limit: u32,
    filter: Option<&[ProviderId]>,
) -> String {
    format!(
        "{STATION_NAMESPACE}:{}:{}:{}:{}:{}:{}",
        norm(text),
        norm_opt(country, "all"),
        norm_opt(language, "all"),
        norm_opt(tag, "all"),
        limit,
        providers_csv(filter),
    )
}

pub fn podcast_key(
    text: &str,
    language: Option<&str>,
    limit: u32,
    filter: Option<&[ProviderId]>,
) -> String {
    format!(
        "{PODCAST_NAMESPACE}:{}:{}:{}:{}",
        norm(text),
        norm_opt(language, "all"),
        limit,
        providers_csv(filter),
    )
}
