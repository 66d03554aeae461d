//! Startup orchestration.
//!
//! Fetches the two raw datasets concurrently, falls back to configured
//! offline snapshots when a primary endpoint is unreachable after retries,
//! builds the match index once, and serves read-only lookups for the rest
//! of the session.

use crate::clients::countries::CountriesClient;
use crate::clients::default_http_client;
use crate::clients::stats::StatsClient;
use crate::config::CoreConfig;
use crate::matching::{match_countries, MatchIndex};
use crate::models::{CountryRecord, StatRecord};
use thiserror::Error;
use tracing::{info, warn};

/// Display names of datasets served from offline snapshots, reported so the
/// UI can warn that numbers may be stale.
pub const SNAPSHOT_COUNTRIES: &str = "Country Information";
pub const SNAPSHOT_STATS: &str = "Current COVID-19 Statistics";

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("country list unavailable: {0}")]
    CountriesUnavailable(anyhow::Error),
    #[error("current statistics unavailable: {0}")]
    StatsUnavailable(anyhow::Error),
}

/// Session-lifetime view over the reconciled datasets.
pub struct DashboardSession {
    countries: Vec<CountryRecord>,
    stats: Vec<StatRecord>,
    index: MatchIndex,
    snapshots_used: Vec<&'static str>,
}

impl DashboardSession {
    /// Load both datasets and build the match index.
    pub async fn load(config: &CoreConfig) -> Result<Self, SessionError> {
        let client = default_http_client(config.load_timeout);
        let countries_client = CountriesClient::new(
            client.clone(),
            config.countries_endpoint.clone(),
            config.country_lookup_prefix.clone(),
            config.load_policy(),
        );
        let stats_client = StatsClient::new(
            client,
            config.stats_endpoint.clone(),
            config.load_policy(),
        );

        let (countries_result, stats_result) =
            tokio::join!(countries_client.fetch_all(), stats_client.fetch_current());

        let mut snapshots_used = Vec::new();

        let countries = match countries_result {
            Ok(countries) => countries,
            Err(err) => {
                warn!(error = %err, "primary country list unreachable, trying snapshot");
                let snapshot = config
                    .countries_snapshot
                    .as_deref()
                    .ok_or(SessionError::CountriesUnavailable(err))?;
                let countries = countries_client
                    .fetch_all_from(snapshot)
                    .await
                    .map_err(SessionError::CountriesUnavailable)?;
                snapshots_used.push(SNAPSHOT_COUNTRIES);
                countries
            }
        };

        let stats = match stats_result {
            Ok(stats) => stats,
            Err(err) => {
                warn!(error = %err, "primary statistics feed unreachable, trying snapshot");
                let snapshot = config
                    .stats_snapshot
                    .as_deref()
                    .ok_or(SessionError::StatsUnavailable(err))?;
                let stats = stats_client
                    .fetch_current_from(snapshot)
                    .await
                    .map_err(SessionError::StatsUnavailable)?;
                snapshots_used.push(SNAPSHOT_STATS);
                stats
            }
        };

        info!(
            countries = countries.len(),
            stats = stats.len(),
            snapshots = snapshots_used.len(),
            "datasets loaded, matching entries"
        );
        let index = match_countries(&countries, &stats);

        Ok(Self {
            countries,
            stats,
            index,
            snapshots_used,
        })
    }

    /// Build a session from already-held datasets (tests, replays).
    pub fn from_parts(countries: Vec<CountryRecord>, stats: Vec<StatRecord>) -> Self {
        let index = match_countries(&countries, &stats);
        Self {
            countries,
            stats,
            index,
            snapshots_used: Vec::new(),
        }
    }

    pub fn countries(&self) -> &[CountryRecord] {
        &self.countries
    }

    pub fn stats(&self) -> &[StatRecord] {
        &self.stats
    }

    pub fn index(&self) -> &MatchIndex {
        &self.index
    }

    /// Datasets that had to be served from offline snapshots.
    pub fn snapshots_used(&self) -> &[&'static str] {
        &self.snapshots_used
    }

    /// Stat record position for a cca2 code, including codes reported under
    /// an associated generalized area.
    pub fn stat_index_for_code(&self, cca2: &str) -> Option<usize> {
        self.index.stat_index_for_code(cca2)
    }

    pub fn stat(&self, stat_idx: usize) -> Option<&StatRecord> {
        self.stats.get(stat_idx)
    }

    /// Country record matched to a stat position, if any.
    pub fn country_for_stat(&self, stat_idx: usize) -> Option<&CountryRecord> {
        let country_idx = self.index.stat_to_country.get(&stat_idx)?;
        self.countries.get(*country_idx)
    }

    /// The worldwide aggregate sentinel, always the first stat entry.
    pub fn world(&self) -> Option<&StatRecord> {
        self.stats.first().filter(|record| record.is_world())
    }

    /// Database-wide last-update timestamp, carried on the trailing record.
    pub fn database_last_update(&self) -> Option<&str> {
        self.stats.last()?.last_update.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CountryName;

    fn country(cca2: &str, common: &str) -> CountryRecord {
        CountryRecord {
            cca2: cca2.to_string(),
            cca3: format!("{}X", cca2.to_uppercase()),
            name: CountryName {
                common: common.to_string(),
                official: common.to_string(),
            },
            alt_spellings: Vec::new(),
        }
    }

    fn stat(name: &str, update: &str) -> StatRecord {
        StatRecord {
            country_text: Some(name.to_string()),
            last_update: Some(update.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn session_lookups_work_end_to_end() {
        let session = DashboardSession::from_parts(
            vec![country("fr", "France"), country("de", "Germany")],
            vec![
                stat("World", "2023-04-13 16:00"),
                stat("France", "2023-04-13 17:00"),
                stat("Germany", "2023-04-13 18:00"),
            ],
        );

        assert!(session.world().is_some());
        assert_eq!(session.stat_index_for_code("FR"), Some(1));
        assert_eq!(
            session.country_for_stat(2).map(|c| c.name.common.as_str()),
            Some("Germany")
        );
        assert_eq!(session.database_last_update(), Some("2023-04-13 18:00"));
        assert!(session.snapshots_used().is_empty());
    }

    #[test]
    fn world_absent_when_first_record_is_not_the_sentinel() {
        let session = DashboardSession::from_parts(
            vec![country("fr", "France")],
            vec![stat("France", "2023-04-13 17:00")],
        );
        assert!(session.world().is_none());
    }
}
