//! Human-readable labels and value formatting shared by every derivation.
//!
//! # Label casing
//!
//! Generic metric names are humanized by replacing underscores with spaces and
//! uppercasing the first character of every whitespace-delimited word
//! (`late_delivery_count` -> `Late Delivery Count`). The rest of each word is
//! left untouched.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::risk::{CORRELATION_METRIC, MetricKind, RateKind, bucket_label};
use crate::thresholds::ValueFormat;

/// Placeholder for a value that is absent or not finite.
pub const MISSING_VALUE: &str = "n/a";

// ---------------------------------------------------------------------------
// Metric labels
// ---------------------------------------------------------------------------

/// Display label for a raw metric name.
#[must_use]
pub fn metric_label(name: &str) -> String {
    match MetricKind::parse(name) {
        MetricKind::Correlation => "Risk score vs late rate correlation".to_string(),
        MetricKind::Bucket { rate, bucket } => {
            let rate = match rate {
                RateKind::Late => "Late rate",
                RateKind::Defect => "Defect rate",
            };
            format!("{rate} ({})", bucket_label(bucket.as_str()))
        }
        MetricKind::Unstructured => humanize_metric_name(name),
    }
}

/// `snake_case` to `Title Words`.
#[must_use]
pub fn humanize_metric_name(name: &str) -> String {
    name.replace('_', " ")
        .split_whitespace()
        .map(capitalize_first)
        .collect::<Vec<_>>()
        .join(" ")
}

fn capitalize_first(word: &str) -> String {
    let mut chars = word.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}

// ---------------------------------------------------------------------------
// Values
// ---------------------------------------------------------------------------

/// Whether warnings render `name` as a percentage.
///
/// The metric-name vocabulary is shared by the metrics table and training-job
/// result maps, so this looks only at the name.
#[must_use]
pub fn is_percent_metric(name: &str) -> bool {
    name.contains("rate") || name == "mape" || name == "error_rate"
}

/// Round half away from zero at `precision` decimal places.
///
/// Scaling first keeps decimal ties such as `12.345` rounding up, which plain
/// `{:.2}` formatting of the binary value does not.
#[must_use]
pub fn round_to(value: f64, precision: u8) -> f64 {
    let scale = 10f64.powi(i32::from(precision));
    (value * scale).round() / scale
}

/// Percentage with the given precision: `0.256` -> `25.6%`.
#[must_use]
pub fn format_percent(value: f64, precision: u8) -> String {
    let pct = round_to(value * 100.0, precision);
    format!("{pct:.prec$}%", prec = usize::from(precision))
}

/// Plain number with the given precision: `12.345` -> `12.35`.
#[must_use]
pub fn format_number(value: f64, precision: u8) -> String {
    let rounded = round_to(value, precision);
    format!("{rounded:.prec$}", prec = usize::from(precision))
}

/// Value as embedded in a threshold warning for `name`.
#[must_use]
pub fn format_warning_value(name: &str, value: f64) -> String {
    if is_percent_metric(name) {
        format_percent(value, 1)
    } else {
        format_number(value, 2)
    }
}

/// Value for a dashboard tile, using a configured format and precision.
#[must_use]
pub fn format_metric_value(value: Option<f64>, format: ValueFormat, precision: u8) -> String {
    match value.filter(|v| v.is_finite()) {
        None => MISSING_VALUE.to_string(),
        Some(v) => match format {
            ValueFormat::Percent => format_percent(v, precision),
            ValueFormat::Number => format_number(v, precision),
        },
    }
}

// ---------------------------------------------------------------------------
// Dates
// ---------------------------------------------------------------------------

/// Calendar-date label style for trend points.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateLabelStyle {
    /// `1/31/2024`
    #[default]
    Us,
    /// `2024-01-31`
    Iso,
    /// `Jan 31, 2024`
    Short,
}

impl DateLabelStyle {
    /// Format the UTC calendar date of `at`; time of day is dropped.
    #[must_use]
    pub fn format(self, at: DateTime<Utc>) -> String {
        let pattern = match self {
            Self::Us => "%-m/%-d/%Y",
            Self::Iso => "%Y-%m-%d",
            Self::Short => "%b %-d, %Y",
        };
        at.date_naive().format(pattern).to_string()
    }
}

impl FromStr for DateLabelStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "us" | "en-us" => Ok(Self::Us),
            "iso" => Ok(Self::Iso),
            "short" => Ok(Self::Short),
            other => Err(format!(
                "unknown date label style {other:?} (expected us, iso or short)"
            )),
        }
    }
}

impl fmt::Display for DateLabelStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Us => f.write_str("us"),
            Self::Iso => f.write_str("iso"),
            Self::Short => f.write_str("short"),
        }
    }
}

/// Label for the reserved correlation metric, exposed for table headers.
#[must_use]
pub fn correlation_label() -> String {
    metric_label(CORRELATION_METRIC)
}
