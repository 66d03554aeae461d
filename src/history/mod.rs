//! Historical statistics retrieval.
//!
//! Resolves a country selector plus a time window into a cases/deaths
//! series pair. Two request shapes exist:
//!
//! - trailing days: one request for `last_days + 1` days, the extra leading
//!   day serving as the baseline for delta transforms;
//! - explicit date range: a 1-day probe discovers the upstream's most recent
//!   data point (the feed stopped updating, so "now" cannot be the wall
//!   clock), the equivalent trailing span is fetched, and the result is
//!   filtered to the requested range.
//!
//! The resolver never caches and never mutates caller-held series; on
//! failure the caller decides whether to keep or clear what it displays.

pub mod series;

use crate::fetch::{fetch_with_policy, FetchError, FetchPolicy};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info};

pub use self::series::{HistoryBundle, HistorySeries, HistoryWindow, DEFAULT_LAST_DAYS};
use self::series::{epoch_ms_to_date, MS_PER_DAY};

/// What the history endpoint should be queried for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CountrySelector {
    Worldwide,
    /// Free-text country key understood by the upstream feed.
    Country(String),
}

impl CountrySelector {
    /// Path segment on the history endpoint.
    pub fn query_key(&self) -> &str {
        match self {
            CountrySelector::Worldwide => "all",
            CountrySelector::Country(key) => key,
        }
    }
}

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("invalid date range")]
    InvalidRange,
    #[error("upstream has no data inside the requested range")]
    NoDataInRange,
    #[error("upstream has no data for this selection")]
    NoData,
    #[error("history payload is missing the 'cases' series")]
    MissingCases,
    #[error("history payload is not an object")]
    MalformedPayload,
    #[error("cannot determine the upstream's most recent data point")]
    MalformedProbe,
    #[error(transparent)]
    Fetch(#[from] FetchError),
}

impl HistoryError {
    /// Message suitable for direct display in the chart status banner.
    pub fn user_message(&self) -> &'static str {
        match self {
            HistoryError::InvalidRange => "Invalid date range!",
            HistoryError::NoDataInRange => "Sorry, there is no data during this period.",
            HistoryError::NoData => "No data.",
            _ => "Unable to load historical chart.",
        }
    }
}

/// Transport seam for the resolver, mockable in tests.
#[async_trait]
pub trait HistoryTransport: Send + Sync {
    /// Fetch the raw timeline JSON for `selector` over the trailing
    /// `last_days` days.
    async fn fetch_timeline(
        &self,
        selector: &CountrySelector,
        last_days: u32,
    ) -> Result<Value, FetchError>;
}

/// Production transport hitting the history endpoint over HTTP.
pub struct HttpHistoryTransport {
    client: Client,
    base_url: String,
    policy: FetchPolicy,
}

impl HttpHistoryTransport {
    pub fn new(client: Client, base_url: impl Into<String>, policy: FetchPolicy) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            policy: FetchPolicy {
                // 404 means "no data for this country", not a transient
                // failure worth retrying.
                stop_on_not_found: true,
                ..policy
            },
        }
    }
}

#[async_trait]
impl HistoryTransport for HttpHistoryTransport {
    async fn fetch_timeline(
        &self,
        selector: &CountrySelector,
        last_days: u32,
    ) -> Result<Value, FetchError> {
        let url = format!(
            "{}/{}?lastdays={}",
            self.base_url,
            selector.query_key(),
            last_days
        );
        debug!(%url, "fetching history timeline");
        let response = fetch_with_policy(&self.client, &url, &self.policy).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(FetchError::BadStatus(StatusCode::NOT_FOUND));
        }
        Ok(response.json().await?)
    }
}

/// Options for a single resolve call.
#[derive(Debug, Default)]
pub struct ResolveOptions {
    /// Already-held series to reuse instead of touching the network at all.
    pub reuse: Option<HistoryBundle>,
}

/// Time-windowed historical data resolver.
pub struct HistoryResolver<T: HistoryTransport> {
    transport: T,
}

impl<T: HistoryTransport> HistoryResolver<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    /// Resolve `selector` over `window` into a cases/deaths bundle.
    ///
    /// Trailing-days windows fetch one extra leading day; display callers
    /// drop it via [`HistorySeries::without_baseline`]. Identical calls
    /// issue network requests every time unless `options.reuse` is set.
    pub async fn resolve(
        &self,
        selector: &CountrySelector,
        window: HistoryWindow,
        options: ResolveOptions,
    ) -> Result<HistoryBundle, HistoryError> {
        if let Some(held) = options.reuse {
            debug!("reusing held history series, skipping network");
            return Ok(held);
        }

        match window {
            HistoryWindow::LastDays(days) => {
                let days = if days == 0 { DEFAULT_LAST_DAYS } else { days };
                // One extra day so the earliest displayed day has a
                // prior-day baseline for the delta transform.
                let bundle = self.fetch_bundle(selector, days + 1).await?;
                info!(
                    key = selector.query_key(),
                    days,
                    points = bundle.cases.len(),
                    "history window loaded"
                );
                Ok(bundle)
            }
            HistoryWindow::Range { start_ms, end_ms } => {
                if start_ms >= end_ms {
                    return Err(HistoryError::InvalidRange);
                }

                let probe = self.fetch_bundle(selector, 1).await?;
                let now = probe.cases.latest_date().ok_or(HistoryError::MalformedProbe)?;
                let now_ms = series::date_to_epoch_ms(now);
                if now_ms <= start_ms {
                    return Err(HistoryError::NoDataInRange);
                }
                let span_days = ((now_ms - start_ms) / MS_PER_DAY) as u32;

                let bundle = self.fetch_bundle(selector, span_days).await?;
                let start = epoch_ms_to_date(start_ms).ok_or(HistoryError::InvalidRange)?;
                let end = epoch_ms_to_date(end_ms).ok_or(HistoryError::InvalidRange)?;
                info!(
                    key = selector.query_key(),
                    %start,
                    %end,
                    span_days,
                    "history range loaded"
                );
                Ok(HistoryBundle {
                    cases: bundle.cases.filter_range(start, end),
                    deaths: bundle.deaths.filter_range(start, end),
                })
            }
        }
    }

    async fn fetch_bundle(
        &self,
        selector: &CountrySelector,
        last_days: u32,
    ) -> Result<HistoryBundle, HistoryError> {
        let value = match self.transport.fetch_timeline(selector, last_days).await {
            Ok(value) => value,
            Err(FetchError::BadStatus(StatusCode::NOT_FOUND)) => {
                return Err(HistoryError::NoData)
            }
            Err(err) => return Err(HistoryError::Fetch(err)),
        };
        bundle_from(value)
    }
}

/// Unwrap the `{ country, timeline }` envelope used by per-country
/// responses; worldwide responses carry the series at the top level.
fn unwrap_timeline(mut value: Value) -> Value {
    match value.get_mut("timeline") {
        Some(timeline) => timeline.take(),
        None => value,
    }
}

fn bundle_from(value: Value) -> Result<HistoryBundle, HistoryError> {
    let value = unwrap_timeline(value);
    let Some(object) = value.as_object() else {
        return Err(HistoryError::MalformedPayload);
    };
    let cases = object
        .get("cases")
        .and_then(Value::as_object)
        .ok_or(HistoryError::MissingCases)?;
    let deaths = object
        .get("deaths")
        .and_then(Value::as_object)
        .map(HistorySeries::from_wire)
        .unwrap_or_default();
    Ok(HistoryBundle {
        cases: HistorySeries::from_wire(cases),
        deaths,
    })
}
