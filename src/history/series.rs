//! Time-series model for historical statistics.
//!
//! Upstream serves cumulative counts keyed by `M/D/YY` date strings. The
//! series keeps chronologically ordered `(date, count)` points; values are
//! signed because upstream corrections occasionally move a cumulative count
//! backwards, which makes daily deltas negative.

use chrono::{DateTime, NaiveDate, NaiveTime};
use serde_json::Value;
use tracing::warn;

pub(crate) const MS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

/// Upstream date-key format, e.g. `3/9/23`.
const WIRE_DATE_FORMAT: &str = "%m/%d/%y";

/// Default trailing window when the caller supplies a non-positive one.
pub const DEFAULT_LAST_DAYS: u32 = 30;

/// Requested time span: a trailing-days count or an explicit epoch-millis
/// range, never both.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryWindow {
    LastDays(u32),
    Range { start_ms: i64, end_ms: i64 },
}

impl HistoryWindow {
    pub fn last_days(days: u32) -> Self {
        HistoryWindow::LastDays(days)
    }

    /// Explicit range; endpoints are normalized so start <= end.
    pub fn range(a_ms: i64, b_ms: i64) -> Self {
        HistoryWindow::Range {
            start_ms: a_ms.min(b_ms),
            end_ms: a_ms.max(b_ms),
        }
    }
}

pub fn epoch_ms_to_date(ms: i64) -> Option<NaiveDate> {
    DateTime::from_timestamp_millis(ms).map(|dt| dt.date_naive())
}

pub fn date_to_epoch_ms(date: NaiveDate) -> i64 {
    date.and_time(NaiveTime::MIN).and_utc().timestamp_millis()
}

pub(crate) fn parse_wire_date(key: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(key, WIRE_DATE_FORMAT).ok()
}

/// Chronologically ordered cumulative series.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistorySeries {
    points: Vec<(NaiveDate, i64)>,
}

impl HistorySeries {
    /// Build a series from the upstream `{ "M/D/YY": count }` object.
    ///
    /// Unparseable keys and non-numeric values are dropped with a warning;
    /// the remainder is sorted ascending by date.
    pub fn from_wire(map: &serde_json::Map<String, Value>) -> Self {
        let mut points = Vec::with_capacity(map.len());
        for (key, value) in map {
            let Some(date) = parse_wire_date(key) else {
                warn!(%key, "dropping history point with malformed date");
                continue;
            };
            let Some(count) = value.as_i64() else {
                warn!(%key, "dropping history point with non-numeric count");
                continue;
            };
            points.push((date, count));
        }
        points.sort_by_key(|(date, _)| *date);
        Self { points }
    }

    pub fn from_points(mut points: Vec<(NaiveDate, i64)>) -> Self {
        points.sort_by_key(|(date, _)| *date);
        Self { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(NaiveDate, i64)> {
        self.points.iter()
    }

    pub fn first(&self) -> Option<&(NaiveDate, i64)> {
        self.points.first()
    }

    pub fn last(&self) -> Option<&(NaiveDate, i64)> {
        self.points.last()
    }

    /// Most recent date in the series.
    pub fn latest_date(&self) -> Option<NaiveDate> {
        self.points.last().map(|(date, _)| *date)
    }

    /// Points within `[start, end]` inclusive, ascending.
    pub fn filter_range(&self, start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            points: self
                .points
                .iter()
                .filter(|(date, _)| *date >= start && *date <= end)
                .copied()
                .collect(),
        }
    }

    /// Drop the leading baseline point requested beyond the display window.
    pub fn without_baseline(&self) -> Self {
        Self {
            points: self.points.iter().skip(1).copied().collect(),
        }
    }

    /// Convert cumulative counts to day-over-day deltas.
    ///
    /// The first point is dropped since it has no prior-day baseline.
    pub fn to_daily_deltas(&self) -> Self {
        let points = self
            .points
            .windows(2)
            .map(|pair| (pair[1].0, pair[1].1 - pair[0].1))
            .collect();
        Self { points }
    }
}

/// The cases/deaths series pair returned by the resolver.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryBundle {
    pub cases: HistorySeries,
    pub deaths: HistorySeries,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn series(points: &[(i32, u32, u32, i64)]) -> HistorySeries {
        HistorySeries::from_points(
            points
                .iter()
                .map(|&(y, m, d, v)| (date(y, m, d), v))
                .collect(),
        )
    }

    #[test]
    fn parses_unpadded_wire_dates() {
        assert_eq!(parse_wire_date("3/9/23"), Some(date(2023, 3, 9)));
        assert_eq!(parse_wire_date("12/31/20"), Some(date(2020, 12, 31)));
        assert_eq!(parse_wire_date("not-a-date"), None);
    }

    #[test]
    fn from_wire_sorts_chronologically() {
        let raw: serde_json::Map<String, Value> = serde_json::from_str(
            r#"{ "3/2/23": 11, "2/28/23": 9, "3/1/23": 10 }"#,
        )
        .unwrap();
        let series = HistorySeries::from_wire(&raw);
        let dates: Vec<_> = series.iter().map(|(d, _)| *d).collect();
        assert_eq!(
            dates,
            vec![date(2023, 2, 28), date(2023, 3, 1), date(2023, 3, 2)]
        );
    }

    #[test]
    fn from_wire_drops_malformed_entries() {
        let raw: serde_json::Map<String, Value> = serde_json::from_str(
            r#"{ "3/1/23": 10, "garbage": 11, "3/2/23": null }"#,
        )
        .unwrap();
        let series = HistorySeries::from_wire(&raw);
        assert_eq!(series.len(), 1);
    }

    #[test]
    fn delta_transform_drops_first_point() {
        let cumulative = series(&[(2023, 3, 1, 100), (2023, 3, 2, 130), (2023, 3, 3, 125)]);
        let deltas = cumulative.to_daily_deltas();
        assert_eq!(deltas.len(), 2);
        let values: Vec<_> = deltas.iter().map(|(_, v)| *v).collect();
        // Negative delta kept: upstream corrections move counts backwards.
        assert_eq!(values, vec![30, -5]);
    }

    #[test]
    fn filter_range_is_inclusive() {
        let s = series(&[
            (2023, 3, 1, 1),
            (2023, 3, 2, 2),
            (2023, 3, 3, 3),
            (2023, 3, 4, 4),
        ]);
        let filtered = s.filter_range(date(2023, 3, 2), date(2023, 3, 3));
        assert_eq!(filtered.len(), 2);
        assert_eq!(filtered.first().unwrap().0, date(2023, 3, 2));
        assert_eq!(filtered.last().unwrap().0, date(2023, 3, 3));
    }

    #[test]
    fn epoch_roundtrip_at_midnight_utc() {
        let d = date(2023, 3, 9);
        assert_eq!(epoch_ms_to_date(date_to_epoch_ms(d)), Some(d));
    }

    #[test]
    fn range_constructor_normalizes_order() {
        let w = HistoryWindow::range(200, 100);
        assert_eq!(
            w,
            HistoryWindow::Range {
                start_ms: 100,
                end_ms: 200
            }
        );
    }
}
