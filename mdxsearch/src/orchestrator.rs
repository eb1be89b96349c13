//! Concurrent fan-out with isolation
//!
//! Each provider call runs in its own task, bounded by the provider's
//! configured timeout and gated by rate-limit admission. The join is settled:
//! every call finishes (or fails, or times out) before the aggregate moves
//! on, and results come back concatenated in the order the calls were given.
//! That order is provider priority, which is what makes atomic-field merging
//! deterministic downstream.
//!
//! Dropping the future returned by [`fan_out`] aborts every still-inflight
//! task: a cancelled request abandons its calls instead of leaking them.
//! Quota units already recorded stay recorded.

use mdxlimit::RateLimiter;
use mdxmodel::ProviderId;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Aborts the task when dropped before completion.
struct AbortOnDrop<T>(JoinHandle<T>);

impl<T> Drop for AbortOnDrop<T> {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Run every `(provider, timeout, call)` concurrently and return the
/// concatenation of their results in input order. A denied admission, a
/// timeout or a task panic contributes nothing, never an error.
pub(crate) async fn fan_out<T, Fut>(
    calls: Vec<(ProviderId, Duration, Fut)>,
    limiter: &Arc<RateLimiter>,
) -> Vec<T>
where
    T: Send + 'static,
    Fut: Future<Output = Vec<T>> + Send + 'static,
{
    let mut tasks = Vec::with_capacity(calls.len());
    for (provider, timeout, call) in calls {
        let limiter = limiter.clone();
        let handle = tokio::spawn(async move {
            if !limiter.admit(provider).await {
                debug!(provider = %provider, "admission denied, skipping call");
                return Vec::new();
            }
            match tokio::time::timeout(timeout, call).await {
                Ok(items) => items,
                Err(_) => {
                    warn!(provider = %provider, "provider call timed out");
                    Vec::new()
                }
            }
        });
        tasks.push((provider, AbortOnDrop(handle)));
    }

    let mut collected = Vec::new();
    for (provider, mut task) in tasks {
        match (&mut task.0).await {
            Ok(mut items) => collected.append(&mut items),
            Err(err) => {
                // An adapter bug must not take the request down with it.
                warn!(provider = %provider, error = %err, "provider task failed");
            }
        }
    }
    collected
}
