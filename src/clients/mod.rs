//! HTTP clients for the upstream endpoints.

pub mod countries;
pub mod geo;
pub mod stats;

use reqwest::Client;
use std::time::Duration;

/// Shared client with a connection-level timeout; individual requests are
/// additionally bounded by [`crate::fetch::FetchPolicy`].
pub fn default_http_client(timeout: Duration) -> Client {
    Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_else(|_| Client::new())
}
