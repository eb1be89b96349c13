//! # mdxlimit - Windowed request quotas
//!
//! Some upstream directories meter requests (e.g. 500 per 30 days). This
//! crate keeps one [`UsageCounter`] per provider and answers two questions:
//! may a request be issued now (`admit`), and how do we bill one that was
//! issued (`record`). Counters live behind the [`CounterStore`] trait so a
//! horizontally-scaled deployment can share them through an external store;
//! increments must stay atomic whatever the backing.
//!
//! The window is anchored once per window: the first `admit` observed at or
//! after `window_start + window` resets the count and re-anchors at `now`.
//! `record` never moves the window, it only increments; otherwise a steady
//! trickle of requests would keep the window from ever advancing.

use async_trait::async_trait;
use mdxconfig::{ProviderSettings, RateQuota};
use mdxmodel::ProviderId;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::Mutex;
use tracing::warn;

/// Result type alias for counter store operations.
pub type Result<T> = std::result::Result<T, LimitError>;

#[derive(Debug, thiserror::Error)]
pub enum LimitError {
    #[error("counter backend error: {0}")]
    Backend(String),
}

// ============================================================================
// Usage counter
// ============================================================================

/// One provider's consumption within the current window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UsageCounter {
    pub count: u32,
    pub window_start: SystemTime,
    pub window: Duration,
}

impl UsageCounter {
    /// Fresh counter anchored at `now`.
    pub fn anchored(now: SystemTime, window: Duration) -> Self {
        Self {
            count: 0,
            window_start: now,
            window,
        }
    }

    /// The window has elapsed when `now >= window_start + window`.
    pub fn expired_at(&self, now: SystemTime) -> bool {
        now >= self.window_start + self.window
    }

    /// Seconds until the window elapses, 0 when already elapsed.
    pub fn seconds_until_reset(&self, now: SystemTime) -> u64 {
        (self.window_start + self.window)
            .duration_since(now)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }
}

// ============================================================================
// Counter store
// ============================================================================

/// Pluggable storage for usage counters.
#[async_trait]
pub trait CounterStore: Send + Sync {
    async fn load(&self, provider: ProviderId) -> Result<Option<UsageCounter>>;

    /// Replace the provider's counter wholesale (anchors a fresh window).
    async fn reset(&self, provider: ProviderId, counter: UsageCounter) -> Result<()>;

    /// Atomically add one to the current count. Creates a counter anchored at
    /// `now` when none exists.
    async fn increment(&self, provider: ProviderId, window: Duration) -> Result<()>;
}

/// Process-local counter store for single-instance deployments.
#[derive(Default)]
pub struct MemoryCounterStore {
    counters: Mutex<HashMap<ProviderId, UsageCounter>>,
}

impl MemoryCounterStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CounterStore for MemoryCounterStore {
    async fn load(&self, provider: ProviderId) -> Result<Option<UsageCounter>> {
        Ok(self.counters.lock().await.get(&provider).copied())
    }

    async fn reset(&self, provider: ProviderId, counter: UsageCounter) -> Result<()> {
        self.counters.lock().await.insert(provider, counter);
        Ok(())
    }

    async fn increment(&self, provider: ProviderId, window: Duration) -> Result<()> {
        let mut counters = self.counters.lock().await;
        let counter = counters
            .entry(provider)
            .or_insert_with(|| UsageCounter::anchored(SystemTime::now(), window));
        counter.count = counter.count.saturating_add(1);
        Ok(())
    }
}

// ============================================================================
// Rate limiter
// ============================================================================

/// Point-in-time quota stats, read by the provider-status endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LimitStats {
    pub used: u32,
    pub limit: Option<u32>,
    pub remaining: Option<u32>,
    pub seconds_until_reset: Option<u64>,
}

impl LimitStats {
    fn unlimited() -> Self {
        Self {
            used: 0,
            limit: None,
            remaining: None,
            seconds_until_reset: None,
        }
    }
}

/// Admission control over per-provider windowed quotas.
///
/// Providers without a configured quota are always admitted and never billed.
/// Store failures fail open: a broken counter backend must not take search
/// down with it.
pub struct RateLimiter {
    store: Arc<dyn CounterStore>,
    quotas: HashMap<ProviderId, RateQuota>,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn CounterStore>, settings: &ProviderSettings) -> Self {
        let quotas = settings
            .iter()
            .filter_map(|c| c.rate_quota.map(|q| (c.provider, q)))
            .collect();
        Self { store, quotas }
    }

    /// Limiter with explicit quotas, mostly for tests.
    pub fn with_quotas(
        store: Arc<dyn CounterStore>,
        quotas: HashMap<ProviderId, RateQuota>,
    ) -> Self {
        Self { store, quotas }
    }

    pub fn in_memory(settings: &ProviderSettings) -> Self {
        Self::new(Arc::new(MemoryCounterStore::new()), settings)
    }

    /// True when the provider may issue a request now. Does not increment.
    pub async fn admit(&self, provider: ProviderId) -> bool {
        let Some(quota) = self.quotas.get(&provider) else {
            return true;
        };
        let now = SystemTime::now();
        let loaded = match self.store.load(provider).await {
            Ok(counter) => counter,
            Err(err) => {
                warn!(provider = %provider, error = %err, "counter load failed, admitting");
                return true;
            }
        };
        let current = match loaded {
            Some(counter) if !counter.expired_at(now) => counter,
            _ => {
                // First observation of a new window: anchor it here, once.
                let fresh = UsageCounter::anchored(now, quota.period);
                if let Err(err) = self.store.reset(provider, fresh).await {
                    warn!(provider = %provider, error = %err, "counter reset failed");
                }
                fresh
            }
        };
        current.count < quota.limit
    }

    /// Bill one issued request. Called right after the request goes out,
    /// whether or not a response ever arrives. No-op without a quota.
    pub async fn record(&self, provider: ProviderId) {
        let Some(quota) = self.quotas.get(&provider) else {
            return;
        };
        if let Err(err) = self.store.increment(provider, quota.period).await {
            warn!(provider = %provider, error = %err, "counter increment failed");
        }
    }

    pub async fn stats_for(&self, provider: ProviderId) -> LimitStats {
        let Some(quota) = self.quotas.get(&provider) else {
            return LimitStats::unlimited();
        };
        let now = SystemTime::now();
        let counter = self.store.load(provider).await.ok().flatten();
        let (used, seconds_until_reset) = match counter {
            Some(c) if !c.expired_at(now) => (c.count, c.seconds_until_reset(now)),
            _ => (0, quota.period.as_secs()),
        };
        LimitStats {
            used,
            limit: Some(quota.limit),
            remaining: Some(quota.limit.saturating_sub(used)),
            seconds_until_reset: Some(seconds_until_reset),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter_with(limit: u32, period: Duration) -> (RateLimiter, Arc<MemoryCounterStore>) {
        let store = Arc::new(MemoryCounterStore::new());
        let quotas = HashMap::from([(
            ProviderId::PodcastIndex,
            RateQuota { limit, period },
        )]);
        (RateLimiter::with_quotas(store.clone(), quotas), store)
    }

    #[tokio::test]
    async fn test_no_quota_always_admits() {
        let (limiter, _) = limiter_with(1, Duration::from_secs(60));
        assert!(limiter.admit(ProviderId::Itunes).await);
        limiter.record(ProviderId::Itunes).await;
        assert!(limiter.admit(ProviderId::Itunes).await);
        assert_eq!(
            limiter.stats_for(ProviderId::Itunes).await,
            LimitStats::unlimited()
        );
    }

    #[tokio::test]
    async fn test_quota_cuts_off_after_limit() {
        let (limiter, _) = limiter_with(2, Duration::from_secs(60));
        let provider = ProviderId::PodcastIndex;

        assert!(limiter.admit(provider).await);
        limiter.record(provider).await;
        assert!(limiter.admit(provider).await);
        limiter.record(provider).await;

        assert!(!limiter.admit(provider).await);
        // Still denied, admit does not consume anything.
        assert!(!limiter.admit(provider).await);
    }

    #[tokio::test]
    async fn test_admit_does_not_increment() {
        let (limiter, _) = limiter_with(1, Duration::from_secs(60));
        let provider = ProviderId::PodcastIndex;
        for _ in 0..5 {
            assert!(limiter.admit(provider).await);
        }
        let stats = limiter.stats_for(provider).await;
        assert_eq!(stats.used, 0);
    }

    #[tokio::test]
    async fn test_zero_limit_denies_from_the_start() {
        let (limiter, _) = limiter_with(0, Duration::from_secs(60));
        assert!(!limiter.admit(ProviderId::PodcastIndex).await);
    }

    #[tokio::test]
    async fn test_window_rolls_over_at_boundary() {
        let (limiter, store) = limiter_with(2, Duration::from_secs(60));
        let provider = ProviderId::PodcastIndex;

        // Window fully consumed, anchored exactly one window ago.
        let stale = UsageCounter {
            count: 2,
            window_start: SystemTime::now() - Duration::from_secs(60),
            window: Duration::from_secs(60),
        };
        store.reset(provider, stale).await.unwrap();

        // First admit at/after the boundary succeeds and re-anchors.
        assert!(limiter.admit(provider).await);
        let stats = limiter.stats_for(provider).await;
        assert_eq!(stats.used, 0);
        assert_eq!(stats.remaining, Some(2));
    }

    #[tokio::test]
    async fn test_record_does_not_move_the_window() {
        let (limiter, store) = limiter_with(10, Duration::from_secs(60));
        let provider = ProviderId::PodcastIndex;

        let anchored = UsageCounter {
            count: 0,
            window_start: SystemTime::now() - Duration::from_secs(30),
            window: Duration::from_secs(60),
        };
        store.reset(provider, anchored).await.unwrap();

        limiter.record(provider).await;
        limiter.record(provider).await;

        let counter = store.load(provider).await.unwrap().unwrap();
        assert_eq!(counter.count, 2);
        assert_eq!(counter.window_start, anchored.window_start);
    }

    #[tokio::test]
    async fn test_increment_creates_missing_counter() {
        let store = MemoryCounterStore::new();
        store
            .increment(ProviderId::Taddy, Duration::from_secs(60))
            .await
            .unwrap();
        let counter = store.load(ProviderId::Taddy).await.unwrap().unwrap();
        assert_eq!(counter.count, 1);
    }

    #[tokio::test]
    async fn test_stats_reflect_usage() {
        let (limiter, _) = limiter_with(5, Duration::from_secs(60));
        let provider = ProviderId::PodcastIndex;

        assert!(limiter.admit(provider).await);
        limiter.record(provider).await;
        limiter.record(provider).await;

        let stats = limiter.stats_for(provider).await;
        assert_eq!(stats.used, 2);
        assert_eq!(stats.limit, Some(5));
        assert_eq!(stats.remaining, Some(3));
        assert!(stats.seconds_until_reset.unwrap() <= 60);
    }

    #[tokio::test]
    async fn test_failing_store_fails_open() {
        struct BrokenStore;

        #[async_trait]
        impl CounterStore for BrokenStore {
            async fn load(&self, _provider: ProviderId) -> Result<Option<UsageCounter>> {
                Err(LimitError::Backend("down".into()))
            }
            async fn reset(&self, _provider: ProviderId, _counter: UsageCounter) -> Result<()> {
                Err(LimitError::Backend("down".into()))
            }
            async fn increment(&self, _provider: ProviderId, _window: Duration) -> Result<()> {
                Err(LimitError::Backend("down".into()))
            }
        }

        let quotas = HashMap::from([(
            ProviderId::PodcastIndex,
            RateQuota {
                limit: 1,
                period: Duration::from_secs(60),
            },
        )]);
        let limiter = RateLimiter::with_quotas(Arc::new(BrokenStore), quotas);
        assert!(limiter.admit(ProviderId::PodcastIndex).await);
    }
}
