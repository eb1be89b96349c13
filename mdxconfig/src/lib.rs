//! # mdxconfig - Provider configuration
//!
//! Per-provider settings loaded from environment variables at startup and
//! immutable for the process lifetime. Every provider ships with working
//! defaults; the environment only overrides them, so loading never fails.
//! Unknown variables are ignored, malformed values are logged at warn and
//! fall back to the default.
//!
//! Variable scheme: `MEDIADEX_<PROVIDER>_<FIELD>`, e.g.
//! `MEDIADEX_RADIO_BROWSER_ENABLED=false`,
//! `MEDIADEX_PODCAST_INDEX_API_KEY=...`,
//! `MEDIADEX_TADDY_RATE_LIMIT=500`.

use mdxmodel::ProviderId;
use std::collections::HashMap;
use std::env;
use std::time::Duration;
use tracing::warn;

/// Prefix shared by every MediaDex environment variable.
pub const ENV_PREFIX: &str = "MEDIADEX_";

/// Default per-provider request timeout.
pub const DEFAULT_TIMEOUT_MS: u64 = 8_000;

/// Default cache TTL for station searches.
pub const DEFAULT_STATION_TTL_MS: u64 = 300_000;

/// Default cache TTL for podcast searches.
pub const DEFAULT_PODCAST_TTL_MS: u64 = 600_000;

/// Default rate-limit window when a quota is configured without a period
/// (30 days, the billing window of the metered podcast directories).
pub const DEFAULT_RATE_PERIOD_SECS: u64 = 30 * 24 * 3600;

// ============================================================================
// Config types
// ============================================================================

/// A windowed request quota.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateQuota {
    /// Maximum requests per window.
    pub limit: u32,
    /// Window duration.
    pub period: Duration,
}

/// Optional upstream credentials.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub api_key: Option<String>,
    pub api_secret: Option<String>,
    pub bearer: Option<String>,
}

impl Credentials {
    /// True when both key and secret are present (HMAC-style providers).
    pub fn has_key_pair(&self) -> bool {
        self.api_key.is_some() && self.api_secret.is_some()
    }
}

/// Immutable settings for one provider.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderConfig {
    pub provider: ProviderId,
    pub enabled: bool,
    /// Lower priority wins merge precedence and ranks earlier.
    pub priority: u32,
    pub timeout: Duration,
    pub cache_ttl: Duration,
    pub rate_quota: Option<RateQuota>,
    pub credentials: Credentials,
    /// Overrides the adapter's built-in endpoint (also disables the
    /// radio-browser mirror rotation).
    pub base_url: Option<String>,
}

impl ProviderConfig {
    /// Built-in defaults for a provider, before environment overrides.
    pub fn defaults(provider: ProviderId) -> Self {
        let (priority, timeout_ms, cache_ttl_ms, rate_quota) = match provider {
            ProviderId::RadioBrowser => (1, DEFAULT_TIMEOUT_MS, DEFAULT_STATION_TTL_MS, None),
            ProviderId::Shoutcast => (2, DEFAULT_TIMEOUT_MS, DEFAULT_STATION_TTL_MS, None),
            ProviderId::Radiobox => (3, DEFAULT_TIMEOUT_MS, DEFAULT_STATION_TTL_MS, None),
            ProviderId::Itunes => (1, DEFAULT_TIMEOUT_MS, DEFAULT_PODCAST_TTL_MS, None),
            ProviderId::PodcastIndex => (
                2,
                10_000,
                DEFAULT_PODCAST_TTL_MS,
                Some(RateQuota {
                    limit: 500,
                    period: Duration::from_secs(DEFAULT_RATE_PERIOD_SECS),
                }),
            ),
            ProviderId::Taddy => (
                3,
                10_000,
                DEFAULT_PODCAST_TTL_MS,
                Some(RateQuota {
                    limit: 1_000,
                    period: Duration::from_secs(DEFAULT_RATE_PERIOD_SECS),
                }),
            ),
            ProviderId::Feed => (u32::MAX, DEFAULT_TIMEOUT_MS, 0, None),
        };
        Self {
            provider,
            enabled: true,
            priority,
            timeout: Duration::from_millis(timeout_ms),
            cache_ttl: Duration::from_millis(cache_ttl_ms),
            rate_quota,
            credentials: Credentials::default(),
            base_url: None,
        }
    }

    /// Load a provider's config from the process environment.
    pub fn from_env(provider: ProviderId) -> Self {
        Self::from_lookup(provider, |key| env::var(key).ok())
    }

    /// Load with an explicit lookup function (environment in production,
    /// a map in tests).
    pub fn from_lookup<F>(provider: ProviderId, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::defaults(provider);
        let get = |suffix: &str| lookup(&env_key(provider, suffix));

        if let Some(raw) = get("ENABLED") {
            config.enabled = parse_bool(&raw);
        }
        if let Some(raw) = get("PRIORITY") {
            config.priority = parse_number(provider, "PRIORITY", &raw, config.priority);
        }
        if let Some(raw) = get("TIMEOUT_MS") {
            let ms = parse_number(provider, "TIMEOUT_MS", &raw, config.timeout.as_millis() as u64);
            config.timeout = Duration::from_millis(ms);
        }
        if let Some(raw) = get("CACHE_TTL_MS") {
            let ms = parse_number(
                provider,
                "CACHE_TTL_MS",
                &raw,
                config.cache_ttl.as_millis() as u64,
            );
            config.cache_ttl = Duration::from_millis(ms);
        }
        if let Some(raw) = get("BASE_URL") {
            config.base_url = Some(raw.trim_end_matches('/').to_string());
        }
        if let Some(raw) = get("API_KEY") {
            config.credentials.api_key = Some(raw);
        }
        if let Some(raw) = get("API_SECRET") {
            config.credentials.api_secret = Some(raw);
        }
        if let Some(raw) = get("BEARER") {
            config.credentials.bearer = Some(raw);
        }

        let limit = get("RATE_LIMIT")
            .map(|raw| parse_number(provider, "RATE_LIMIT", &raw, 0))
            .or(config.rate_quota.map(|q| q.limit));
        let period_secs = get("RATE_PERIOD_SECONDS")
            .map(|raw| parse_number(provider, "RATE_PERIOD_SECONDS", &raw, DEFAULT_RATE_PERIOD_SECS))
            .or(config.rate_quota.map(|q| q.period.as_secs()));
        config.rate_quota = limit.map(|limit| RateQuota {
            limit,
            period: Duration::from_secs(period_secs.unwrap_or(DEFAULT_RATE_PERIOD_SECS)),
        });

        config
    }
}

// ============================================================================
// Settings map
// ============================================================================

/// Configuration for the full provider set, built once at startup.
#[derive(Debug, Clone, Default)]
pub struct ProviderSettings {
    configs: HashMap<ProviderId, ProviderConfig>,
}

impl ProviderSettings {
    /// Load every searchable provider from the environment.
    pub fn from_env() -> Self {
        let mut settings = Self::default();
        for provider in ProviderId::ALL {
            settings.insert(ProviderConfig::from_env(provider));
        }
        settings
    }

    /// Built-in defaults, no environment applied. Handy in tests.
    pub fn builtin() -> Self {
        let mut settings = Self::default();
        for provider in ProviderId::ALL {
            settings.insert(ProviderConfig::defaults(provider));
        }
        settings
    }

    pub fn insert(&mut self, config: ProviderConfig) {
        self.configs.insert(config.provider, config);
    }

    pub fn get(&self, provider: ProviderId) -> Option<&ProviderConfig> {
        self.configs.get(&provider)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ProviderConfig> {
        self.configs.values()
    }
}

// ============================================================================
// Parsing helpers
// ============================================================================

fn env_key(provider: ProviderId, suffix: &str) -> String {
    let name = provider.as_str().to_uppercase().replace('-', "_");
    format!("{ENV_PREFIX}{name}_{suffix}")
}

/// `true` / `1` are true, anything else is false.
fn parse_bool(raw: &str) -> bool {
    let raw = raw.trim();
    raw.eq_ignore_ascii_case("true") || raw == "1"
}

fn parse_number<T>(provider: ProviderId, field: &str, raw: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    match raw.trim().parse::<T>() {
        Ok(value) => value,
        Err(_) => {
            warn!(
                provider = %provider,
                field,
                value = raw,
                "invalid numeric configuration value, using default"
            );
            default
        }
    }
}
