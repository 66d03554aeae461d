//! Caller geolocation endpoint.

use crate::fetch::{fetch_with_policy, FetchPolicy};
use anyhow::{Context, Result};
use reqwest::Client;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct GeoResponse {
    country: String,
}

#[derive(Debug, Clone)]
pub struct GeoClient {
    client: Client,
    endpoint: String,
    policy: FetchPolicy,
}

impl GeoClient {
    pub fn new(client: Client, endpoint: impl Into<String>, policy: FetchPolicy) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            policy,
        }
    }

    /// The caller's country code, lowercased cca2.
    pub async fn fetch_local_country_code(&self) -> Result<String> {
        let response = fetch_with_policy(&self.client, &self.endpoint, &self.policy)
            .await
            .context("geolocation fetch failed")?;
        let geo: GeoResponse = response
            .json()
            .await
            .context("geolocation payload has no country field")?;
        Ok(geo.country.to_lowercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::test_support::serve_json_once;

    #[tokio::test]
    async fn country_code_is_lowercased() {
        let url = serve_json_once(r#"{"ip":"93.184.216.34","country":"DE"}"#).await;
        let geo = GeoClient::new(Client::new(), url, FetchPolicy::default());
        assert_eq!(geo.fetch_local_country_code().await.unwrap(), "de");
    }
}
