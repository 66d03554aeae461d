//! Runtime configuration for the dashboard core.
//!
//! Endpoints and fetch tuning come from environment variables with sensible
//! defaults; callers load `.env` themselves (`dotenv::dotenv().ok()`).

use crate::fetch::{FetchPolicy, SuccessPolicy};
use std::env;
use std::time::Duration;

/// Structured country list (restcountries.com).
pub const DEFAULT_COUNTRIES_ENDPOINT: &str =
    "https://restcountries.com/v3.1/all?fields=cca2,cca3,name,altSpellings";

/// Single-country lookup prefix; append a cca2 code and the name filter.
pub const DEFAULT_COUNTRY_LOOKUP_PREFIX: &str = "https://restcountries.com/v3.1/alpha/";

/// Query suffix limiting single-country lookups to the name object.
pub const COUNTRY_LOOKUP_SUFFIX: &str = "?fields=name";

/// Current per-country statistics (dataflowkit scrape of worldometers).
pub const DEFAULT_STATS_ENDPOINT: &str = "https://covid-19.dataflowkit.com/v1";

/// Historical cumulative series; `/{key}?lastdays=N`.
pub const DEFAULT_HISTORY_ENDPOINT: &str = "https://corona.lmao.ninja/v2/historical";

/// Geolocation of the caller, returning their country code.
pub const DEFAULT_GEO_ENDPOINT: &str = "https://api.country.is/";

/// Timeout for the startup data loads.
pub const DEFAULT_LOAD_TIMEOUT_SECS: u64 = 30;

/// Retry attempts beyond the first for history fetches.
pub const DEFAULT_RETRY_LIMIT: u32 = 5;

/// Delay between history fetch retries.
pub const DEFAULT_RETRY_DELAY_MS: u64 = 100;

/// Endpoint and fetch-policy configuration.
#[derive(Debug, Clone)]
pub struct CoreConfig {
    pub countries_endpoint: String,
    pub country_lookup_prefix: String,
    pub stats_endpoint: String,
    pub history_endpoint: String,
    pub geo_endpoint: String,
    /// Offline snapshot served when the primary country list is down.
    pub countries_snapshot: Option<String>,
    /// Offline snapshot served when the primary stats feed is down.
    pub stats_snapshot: Option<String>,
    pub load_timeout: Duration,
    pub retry_limit: u32,
    pub retry_delay: Duration,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            countries_endpoint: DEFAULT_COUNTRIES_ENDPOINT.to_string(),
            country_lookup_prefix: DEFAULT_COUNTRY_LOOKUP_PREFIX.to_string(),
            stats_endpoint: DEFAULT_STATS_ENDPOINT.to_string(),
            history_endpoint: DEFAULT_HISTORY_ENDPOINT.to_string(),
            geo_endpoint: DEFAULT_GEO_ENDPOINT.to_string(),
            countries_snapshot: None,
            stats_snapshot: None,
            load_timeout: Duration::from_secs(DEFAULT_LOAD_TIMEOUT_SECS),
            retry_limit: DEFAULT_RETRY_LIMIT,
            retry_delay: Duration::from_millis(DEFAULT_RETRY_DELAY_MS),
        }
    }
}

impl CoreConfig {
    /// Load configuration from environment variables with defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            countries_endpoint: env::var("COUNTRIES_ENDPOINT")
                .unwrap_or(defaults.countries_endpoint),
            country_lookup_prefix: env::var("COUNTRY_LOOKUP_PREFIX")
                .unwrap_or(defaults.country_lookup_prefix),
            stats_endpoint: env::var("STATS_ENDPOINT").unwrap_or(defaults.stats_endpoint),
            history_endpoint: env::var("HISTORY_ENDPOINT").unwrap_or(defaults.history_endpoint),
            geo_endpoint: env::var("GEO_ENDPOINT").unwrap_or(defaults.geo_endpoint),
            countries_snapshot: env::var("COUNTRIES_SNAPSHOT_URL").ok(),
            stats_snapshot: env::var("STATS_SNAPSHOT_URL").ok(),
            load_timeout: Duration::from_secs(
                env::var("LOAD_TIMEOUT_SECS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(DEFAULT_LOAD_TIMEOUT_SECS),
            ),
            retry_limit: env::var("FETCH_RETRY_LIMIT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_RETRY_LIMIT),
            retry_delay: Duration::from_millis(
                env::var("FETCH_RETRY_DELAY_MS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(DEFAULT_RETRY_DELAY_MS),
            ),
        }
    }

    /// Policy for the startup dataset loads: long timeout, exact 200s only.
    pub fn load_policy(&self) -> FetchPolicy {
        FetchPolicy {
            timeout: self.load_timeout,
            retry_limit: self.retry_limit,
            retry_delay: self.retry_delay,
            success_policy: SuccessPolicy::Only200,
            stop_on_not_found: false,
        }
    }

    /// Policy for history fetches: 404 means "no data", so stop there.
    pub fn history_policy(&self) -> FetchPolicy {
        FetchPolicy {
            stop_on_not_found: true,
            ..self.load_policy()
        }
    }

    /// Full URL for a single-country name lookup.
    pub fn country_lookup_url(&self, cca2: &str) -> String {
        format!(
            "{}{}{}",
            self.country_lookup_prefix,
            cca2.to_lowercase(),
            COUNTRY_LOOKUP_SUFFIX
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_consistent() {
        let config = CoreConfig::default();
        assert_eq!(config.load_timeout, Duration::from_secs(30));
        assert!(config.countries_snapshot.is_none());
        assert!(config.history_policy().stop_on_not_found);
        assert!(!config.load_policy().stop_on_not_found);
    }

    #[test]
    fn country_lookup_url_lowercases_code() {
        let config = CoreConfig::default();
        assert_eq!(
            config.country_lookup_url("FR"),
            "https://restcountries.com/v3.1/alpha/fr?fields=name"
        );
    }
}
