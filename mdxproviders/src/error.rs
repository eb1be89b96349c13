//! Error types for provider adapters

use mdxmodel::ProviderId;

/// Result type alias for adapter operations.
pub type ProviderResult<T> = std::result::Result<T, ProviderError>;

/// Errors an adapter can report. None of them propagate past the
/// orchestrator; each becomes a missing contribution for that provider.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// Upstream refused the connection, timed out, or answered 5xx.
    #[error("provider unavailable: {0}")]
    Unavailable(String),

    /// Credentials required by the provider are absent. No request is issued.
    #[error("credentials missing for {0}")]
    AuthMissing(ProviderId),

    /// Quota exhausted. No request is issued.
    #[error("rate limited")]
    RateLimited,

    /// Upstream answered 2xx with an unparseable body. Carries a truncated
    /// sample for the log line.
    #[error("malformed response: {sample}")]
    Malformed { sample: String },
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        ProviderError::Unavailable(err.to_string())
    }
}
