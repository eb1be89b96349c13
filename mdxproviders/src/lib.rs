//! # mdxproviders - Directory adapters
//!
//! One adapter per third-party catalog, each speaking its provider's protocol
//! (URL shapes, authentication, response schema) and emitting canonical
//! [`mdxmodel`] items. The set of providers is closed; the
//! [`registry::ProviderRegistry`] instantiates every adapter once at startup
//! from [`mdxconfig`] settings.
//!
//! Station directories:
//! - **radio-browser** - community database, no auth, rotating mirror hosts
//! - **shoutcast** - legacy free-text directory
//! - **radiobox** - keyword directory with in-memory facet filtering
//!
//! Podcast directories:
//! - **itunes** - Apple search API, no auth
//! - **podcast-index** - SHA-1 signed headers, metered
//! - **taddy** - GraphQL, bearer token, metered
//!
//! Adapters do not fail the aggregate: the [`provider`] traits expose a
//! failure-isolating `search` that logs and yields nothing, while `try_search`
//! keeps the typed error for tests and diagnostics.

pub mod error;
pub mod http;
pub mod provider;
pub mod query;
pub mod registry;

pub mod itunes;
pub mod podcastindex;
pub mod radiobox;
pub mod radiobrowser;
pub mod shoutcast;
pub mod taddy;

pub use error::{ProviderError, ProviderResult};
pub use provider::{PodcastProvider, StationProvider};
pub use query::SearchQuery;
pub use registry::{ProviderRegistry, ProviderStatus};
