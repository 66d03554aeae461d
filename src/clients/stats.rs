//! Current-statistics endpoint.

use crate::fetch::{fetch_with_policy, FetchPolicy};
use crate::models::StatRecord;
use anyhow::{Context, Result};
use reqwest::Client;

#[derive(Debug, Clone)]
pub struct StatsClient {
    client: Client,
    endpoint: String,
    policy: FetchPolicy,
}

impl StatsClient {
    pub fn new(client: Client, endpoint: impl Into<String>, policy: FetchPolicy) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            policy,
        }
    }

    /// Fetch the current statistics list from `url` (primary or snapshot).
    pub async fn fetch_current_from(&self, url: &str) -> Result<Vec<StatRecord>> {
        let response = fetch_with_policy(&self.client, url, &self.policy)
            .await
            .with_context(|| format!("statistics fetch failed ({url})"))?;
        response
            .json::<Vec<StatRecord>>()
            .await
            .context("statistics payload is not a record array")
    }

    /// Fetch the current statistics list from the primary endpoint.
    pub async fn fetch_current(&self) -> Result<Vec<StatRecord>> {
        let endpoint = self.endpoint.clone();
        self.fetch_current_from(&endpoint).await
    }
}
