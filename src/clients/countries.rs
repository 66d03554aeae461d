//! Structured country-list endpoint.

use crate::config::COUNTRY_LOOKUP_SUFFIX;
use crate::fetch::{fetch_with_policy, FetchPolicy};
use crate::models::{CountryName, CountryRecord};
use anyhow::{Context, Result};
use reqwest::Client;
use serde::Deserialize;

#[derive(Debug, Clone)]
pub struct CountriesClient {
    client: Client,
    endpoint: String,
    lookup_prefix: String,
    policy: FetchPolicy,
}

#[derive(Debug, Deserialize)]
struct NamedCountry {
    name: CountryName,
}

impl CountriesClient {
    pub fn new(
        client: Client,
        endpoint: impl Into<String>,
        lookup_prefix: impl Into<String>,
        policy: FetchPolicy,
    ) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            lookup_prefix: lookup_prefix.into(),
            policy,
        }
    }

    /// Fetch the full country list from `url` (primary or snapshot).
    pub async fn fetch_all_from(&self, url: &str) -> Result<Vec<CountryRecord>> {
        let response = fetch_with_policy(&self.client, url, &self.policy)
            .await
            .with_context(|| format!("country list fetch failed ({url})"))?;
        response
            .json::<Vec<CountryRecord>>()
            .await
            .context("country list payload is not a country array")
    }

    /// Fetch the full country list from the primary endpoint.
    pub async fn fetch_all(&self) -> Result<Vec<CountryRecord>> {
        let endpoint = self.endpoint.clone();
        self.fetch_all_from(&endpoint).await
    }

    /// Resolve a cca2 code to its name object.
    pub async fn fetch_name(&self, cca2: &str) -> Result<CountryName> {
        let url = format!(
            "{}{}{}",
            self.lookup_prefix,
            cca2.to_lowercase(),
            COUNTRY_LOOKUP_SUFFIX
        );
        let response = fetch_with_policy(&self.client, &url, &self.policy)
            .await
            .with_context(|| format!("country lookup failed for '{cca2}'"))?;
        let named: NamedCountry = response
            .json()
            .await
            .context("country lookup payload has no name object")?;
        Ok(named.name)
    }
}
