//! Per-metric trend series for dashboard charts.
//!
//! A series holds the most recent [`TREND_MAX_POINTS`] observations of one
//! metric, oldest first. Only entries with both a value and a parseable
//! `window_end` can be placed on the time axis; everything else is dropped.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::labels::DateLabelStyle;
use crate::models::MetricEntry;

/// Points kept per series (the tail of the ascending order).
pub const TREND_MAX_POINTS: usize = 20;

/// One chart point.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendPoint {
    /// Calendar date of the window end.
    pub label: String,
    pub value: f64,
    pub window_end: DateTime<Utc>,
}

/// Ascending, capped series for one metric.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendSeries {
    pub metric: String,
    points: Vec<TrendPoint>,
}

impl TrendSeries {
    #[must_use]
    pub fn points(&self) -> &[TrendPoint] {
        &self.points
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TrendPoint> {
        self.points.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Most recent point.
    #[must_use]
    pub fn last(&self) -> Option<&TrendPoint> {
        self.points.last()
    }
}

impl IntoIterator for TrendSeries {
    type Item = TrendPoint;
    type IntoIter = std::vec::IntoIter<TrendPoint>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.into_iter()
    }
}

impl<'a> IntoIterator for &'a TrendSeries {
    type Item = &'a TrendPoint;
    type IntoIter = std::slice::Iter<'a, TrendPoint>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.iter()
    }
}

/// Series for `metric_name` with the default (US) date labels.
#[must_use]
pub fn build_trend_series(entries: &[MetricEntry], metric_name: &str) -> TrendSeries {
    build_trend_series_with(entries, metric_name, DateLabelStyle::default())
}

/// Series for `metric_name` with the given label style.
///
/// An unknown metric yields an empty series.
#[must_use]
pub fn build_trend_series_with(
    entries: &[MetricEntry],
    metric_name: &str,
    style: DateLabelStyle,
) -> TrendSeries {
    let mut observed: Vec<(DateTime<Utc>, &MetricEntry, f64)> = entries
        .iter()
        .filter(|entry| entry.name() == Some(metric_name))
        .filter_map(|entry| Some((entry.window_end_at()?, entry, entry.value()?)))
        .collect();
    observed.sort_by(|(a_at, a, _), (b_at, b, _)| a_at.cmp(b_at).then_with(|| a.id.cmp(&b.id)));

    let skip = observed.len().saturating_sub(TREND_MAX_POINTS);
    let points: Vec<TrendPoint> = observed
        .into_iter()
        .skip(skip)
        .map(|(at, _, value)| TrendPoint {
            label: style.format(at),
            value,
            window_end: at,
        })
        .collect();

    tracing::debug!(
        metric = metric_name,
        points = points.len(),
        dropped = skip,
        "built trend series"
    );

    TrendSeries {
        metric: metric_name.to_string(),
        points,
    }
}
