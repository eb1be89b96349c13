//! Shared HTTP plumbing for adapters
//!
//! Every adapter uses the same client construction (product User-Agent,
//! per-provider timeout) and the same response handling: non-2xx maps to
//! [`ProviderError::Unavailable`] (or `RateLimited` on 429), a 2xx body that
//! fails to parse maps to [`ProviderError::Malformed`] with a truncated
//! sample for the warn line.

use crate::error::{ProviderError, ProviderResult};
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;

/// User-Agent identifying the product to upstream directories.
pub const USER_AGENT: &str = "MediaDex/0.4 (mdxproviders)";

/// How much of an unparseable body is kept for the log line.
pub const SAMPLE_LEN: usize = 200;

/// Build a client with the product User-Agent and a request timeout.
pub fn build_client(timeout: Duration) -> ProviderResult<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()
        .map_err(ProviderError::from)
}

/// Check the status, then decode the body as JSON.
pub async fn read_json<T: DeserializeOwned>(response: Response) -> ProviderResult<T> {
    let status = response.status();
    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(ProviderError::RateLimited);
    }
    if !status.is_success() {
        return Err(ProviderError::Unavailable(format!(
            "upstream answered {status}"
        )));
    }
    let body = response.text().await?;
    serde_json::from_str(&body).map_err(|_| ProviderError::Malformed {
        sample: body_sample(&body),
    })
}

/// First [`SAMPLE_LEN`] characters of a body, on a char boundary.
pub fn body_sample(body: &str) -> String {
    body.chars().take(SAMPLE_LEN).collect()
}
