//! Wire-format records for the upstream data sources.
//!
//! - `CountryRecord` maps the restcountries.com `v3.1` country objects.
//! - `StatRecord` maps the dataflowkit current-statistics objects, whose
//!   numeric fields arrive as display strings with thousands separators.

use serde::{Deserialize, Serialize};

/// Common and official names of a country.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountryName {
    pub common: String,
    pub official: String,
}

/// Structured country record. Source of truth for canonical country
/// identity, immutable once fetched for the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountryRecord {
    /// ISO 3166-1 alpha-2 code, unique per record.
    pub cca2: String,
    pub cca3: String,
    pub name: CountryName,
    #[serde(rename = "altSpellings", default)]
    pub alt_spellings: Vec<String>,
}

/// One current-statistics entry keyed by a free-text country name.
///
/// The first entry of the upstream list is always the "World" aggregate and
/// the trailing entry carries the database-wide last-update timestamp.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatRecord {
    #[serde(rename = "Country_text", default, skip_serializing_if = "Option::is_none")]
    pub country_text: Option<String>,
    #[serde(rename = "Total Cases_text", default, skip_serializing_if = "Option::is_none")]
    pub total_cases_text: Option<String>,
    #[serde(rename = "Total Deaths_text", default, skip_serializing_if = "Option::is_none")]
    pub total_deaths_text: Option<String>,
    #[serde(
        rename = "Total Recovered_text",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub total_recovered_text: Option<String>,
    #[serde(rename = "Last Update", default, skip_serializing_if = "Option::is_none")]
    pub last_update: Option<String>,
}

impl StatRecord {
    /// Whether this is the worldwide aggregate sentinel.
    pub fn is_world(&self) -> bool {
        self.country_text
            .as_deref()
            .is_some_and(|name| name.eq_ignore_ascii_case("world"))
    }

    pub fn total_cases(&self) -> Option<u64> {
        parse_count(self.total_cases_text.as_deref()?)
    }

    pub fn total_deaths(&self) -> Option<u64> {
        parse_count(self.total_deaths_text.as_deref()?)
    }

    pub fn total_recovered(&self) -> Option<u64> {
        parse_count(self.total_recovered_text.as_deref()?)
    }

    /// Active cases derived from the three totals, when all are present.
    pub fn active_cases(&self) -> Option<i64> {
        let cases = self.total_cases()? as i64;
        let recovered = self.total_recovered()? as i64;
        let deaths = self.total_deaths()? as i64;
        Some(cases - (recovered + deaths))
    }
}

/// Parse a display count like `"1,234,567"` into a number.
///
/// Returns `None` for placeholder values ("N/A", "-", empty).
pub fn parse_count(text: &str) -> Option<u64> {
    let cleaned: String = text.chars().filter(|c| *c != ',').collect();
    cleaned.trim().parse().ok()
}
