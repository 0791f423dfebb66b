//! Threshold table and warning evaluation.
//!
//! The table is an explicit value handed to the evaluator. The built-in
//! [`ThresholdConfig::reference`] table covers the forecasting and supplier-risk
//! metrics the console shows; a JSON5 file may replace it (see
//! [`crate::config`]).
//!
//! Warnings are evaluated in table declaration order, `warnAbove` before
//! `warnBelow`, against whatever [`MetricSource`] is supplied: the latest index
//! for the metrics dashboard, or a training job's result map.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::labels::{format_warning_value, metric_label};
use crate::latest::LatestIndex;
use crate::models::TrainingJobResult;

/// Highest display precision a table entry may ask for.
pub const MAX_PRECISION: u8 = 6;

// ---------------------------------------------------------------------------
// Table
// ---------------------------------------------------------------------------

/// Display variant for a metric value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueFormat {
    Percent,
    #[default]
    Number,
}

impl ValueFormat {
    /// Format implied by the metric name when the table has no entry for it.
    #[must_use]
    pub fn infer(name: &str) -> Self {
        if crate::labels::is_percent_metric(name) {
            Self::Percent
        } else {
            Self::Number
        }
    }

    /// Precision used when none is configured.
    #[must_use]
    pub const fn default_precision(self) -> u8 {
        match self {
            Self::Percent => 1,
            Self::Number => 2,
        }
    }
}

const fn default_precision() -> u8 {
    2
}

/// One row of the threshold table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricThreshold {
    pub name: String,
    /// Overrides the generated label in tiles and warnings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default)]
    pub help: String,
    #[serde(default)]
    pub format: ValueFormat,
    #[serde(default = "default_precision")]
    pub precision: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warn_above: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warn_below: Option<f64>,
}

impl MetricThreshold {
    /// Row without bounds; chain [`Self::above`] / [`Self::below`] to add them.
    #[must_use]
    pub fn new(name: &str, format: ValueFormat, precision: u8, help: &str) -> Self {
        Self {
            name: name.to_string(),
            label: None,
            help: help.to_string(),
            format,
            precision,
            warn_above: None,
            warn_below: None,
        }
    }

    #[must_use]
    pub fn labelled(mut self, label: &str) -> Self {
        self.label = Some(label.to_string());
        self
    }

    #[must_use]
    pub fn above(mut self, bound: f64) -> Self {
        self.warn_above = Some(bound);
        self
    }

    #[must_use]
    pub fn below(mut self, bound: f64) -> Self {
        self.warn_below = Some(bound);
        self
    }

    /// Configured label, else the generated one.
    #[must_use]
    pub fn display_label(&self) -> String {
        self.label
            .clone()
            .unwrap_or_else(|| metric_label(&self.name))
    }
}

/// Ordered threshold table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ThresholdConfig {
    metrics: Vec<MetricThreshold>,
}

impl ThresholdConfig {
    /// Build a table from rows, validating it.
    pub fn new(metrics: Vec<MetricThreshold>) -> Result<Self> {
        let config = Self { metrics };
        config.validate()?;
        Ok(config)
    }

    /// The built-in reference table.
    #[must_use]
    pub fn reference() -> Self {
        use ValueFormat::{Number, Percent};

        let metrics = vec![
            MetricThreshold::new("mape", Percent, 1, "Mean absolute percentage error of lead-time forecasts")
                .labelled("MAPE")
                .above(0.35),
            MetricThreshold::new("mae", Number, 2, "Mean absolute error in days")
                .labelled("MAE")
                .above(10.0),
            MetricThreshold::new("rmse", Number, 2, "Root mean squared error in days")
                .labelled("RMSE")
                .above(15.0),
            MetricThreshold::new("error_rate", Percent, 1, "Share of predictions outside tolerance")
                .above(0.25),
            MetricThreshold::new("accuracy", Percent, 1, "Share of predictions within tolerance")
                .below(0.70),
            MetricThreshold::new("f1_score", Number, 2, "F1 score of the late-delivery classifier")
                .labelled("F1 score")
                .below(0.60),
            MetricThreshold::new("late_rate", Percent, 1, "Share of purchase orders delivered late")
                .above(0.15),
            MetricThreshold::new("defect_rate", Percent, 1, "Share of deliveries with quality defects")
                .above(0.05),
            MetricThreshold::new(
                crate::risk::CORRELATION_METRIC,
                Number,
                2,
                "Pearson r between supplier risk score and observed late rate",
            )
            .below(0.20),
            MetricThreshold::new("feature_drift_psi", Number, 2, "Population stability index of model inputs")
                .labelled("Feature drift (PSI)")
                .above(0.25),
        ];
        Self { metrics }
    }

    /// Parse and validate a JSON5 table: `{ metrics: [ { name: "mape", ... } ] }`.
    pub fn from_json5_str(source: &str) -> Result<Self> {
        let config: Self = json5::from_str(source)
            .map_err(|e| Error::Config(format!("threshold table: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a JSON5 table from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let source = std::fs::read_to_string(path)?;
        Self::from_json5_str(&source)
    }

    /// Reject tables the evaluator cannot apply meaningfully.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for metric in &self.metrics {
            if metric.name.trim().is_empty() {
                return Err(Error::InvalidThresholds("empty metric name".into()));
            }
            if !seen.insert(metric.name.as_str()) {
                return Err(Error::InvalidThresholds(format!(
                    "duplicate metric {:?}",
                    metric.name
                )));
            }
            if metric.precision > MAX_PRECISION {
                return Err(Error::InvalidThresholds(format!(
                    "{}: precision {} exceeds {MAX_PRECISION}",
                    metric.name, metric.precision
                )));
            }
            for bound in [metric.warn_above, metric.warn_below].into_iter().flatten() {
                if !bound.is_finite() {
                    return Err(Error::InvalidThresholds(format!(
                        "{}: non-finite bound",
                        metric.name
                    )));
                }
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&MetricThreshold> {
        self.metrics.iter().find(|m| m.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &MetricThreshold> {
        self.metrics.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.metrics.iter().map(|m| m.name.as_str())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Sources
// ---------------------------------------------------------------------------

/// Anything that can answer "what is the current value of this metric?".
pub trait MetricSource {
    fn metric_value(&self, name: &str) -> Option<f64>;
}

impl MetricSource for LatestIndex {
    fn metric_value(&self, name: &str) -> Option<f64> {
        self.value(name)
    }
}

impl MetricSource for TrainingJobResult {
    fn metric_value(&self, name: &str) -> Option<f64> {
        self.number(name)
    }
}

impl MetricSource for BTreeMap<String, f64> {
    fn metric_value(&self, name: &str) -> Option<f64> {
        self.get(name).copied().filter(|v| v.is_finite())
    }
}

impl<S: std::hash::BuildHasher> MetricSource for HashMap<String, f64, S> {
    fn metric_value(&self, name: &str) -> Option<f64> {
        self.get(name).copied().filter(|v| v.is_finite())
    }
}

impl<T: MetricSource + ?Sized> MetricSource for &T {
    fn metric_value(&self, name: &str) -> Option<f64> {
        (**self).metric_value(name)
    }
}

// ---------------------------------------------------------------------------
// Warnings
// ---------------------------------------------------------------------------

/// Which side of a bound was crossed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundKind {
    Above,
    Below,
}

impl fmt::Display for BoundKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Above => f.write_str("above"),
            Self::Below => f.write_str("below"),
        }
    }
}

/// A metric whose current value crossed a configured bound.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThresholdWarning {
    pub metric: String,
    pub label: String,
    pub bound: BoundKind,
    pub value: f64,
    pub limit: f64,
    pub message: String,
}

impl ThresholdWarning {
    fn new(threshold: &MetricThreshold, bound: BoundKind, value: f64, limit: f64) -> Self {
        let label = threshold.display_label();
        let shown = format_warning_value(&threshold.name, value);
        let shown_limit = format_warning_value(&threshold.name, limit);
        let message = match bound {
            BoundKind::Above => format!("{label} is {shown}, above the {shown_limit} limit"),
            BoundKind::Below => format!("{label} is {shown}, below the {shown_limit} floor"),
        };
        Self {
            metric: threshold.name.clone(),
            label,
            bound,
            value,
            limit,
            message,
        }
    }
}

impl fmt::Display for ThresholdWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Structured warnings for every configured metric that crossed a bound.
#[must_use]
pub fn evaluate<S: MetricSource + ?Sized>(
    source: &S,
    config: &ThresholdConfig,
) -> Vec<ThresholdWarning> {
    let mut warnings = Vec::new();
    for threshold in config.iter() {
        let Some(value) = source.metric_value(&threshold.name).filter(|v| v.is_finite()) else {
            continue;
        };
        if let Some(limit) = threshold.warn_above {
            if value > limit {
                warnings.push(ThresholdWarning::new(threshold, BoundKind::Above, value, limit));
            }
        }
        if let Some(limit) = threshold.warn_below {
            if value < limit {
                warnings.push(ThresholdWarning::new(threshold, BoundKind::Below, value, limit));
            }
        }
    }
    tracing::debug!(
        checked = config.len(),
        warnings = warnings.len(),
        "evaluated metric thresholds"
    );
    warnings
}

/// Warning messages only, in evaluation order.
#[must_use]
pub fn evaluate_warnings<S: MetricSource + ?Sized>(
    source: &S,
    config: &ThresholdConfig,
) -> Vec<String> {
    evaluate(source, config)
        .into_iter()
        .map(|w| w.message)
        .collect()
}
