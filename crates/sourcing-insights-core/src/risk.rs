//! Supplier-risk bucket correlation analysis.
//!
//! Two naming conventions carry structure in the metrics table:
//!
//! | metric name | meaning |
//! |-------------|---------|
//! | `risk_score_late_rate_correlation` | Pearson r between supplier risk score and late rate |
//! | `risk_bucket_{late,defect}_rate_{low,medium,high}` | observed rate for one risk bucket |
//!
//! [`analyze_risk_buckets`] folds *all* raw observations (not just the latest
//! per name) into a row per bucket plus one correlation summary. Entries are
//! visited in input order; rows appear in first-seen order.

use std::sync::LazyLock;

use indexmap::IndexMap;
use regex::Regex;
use serde::Serialize;

use crate::models::MetricEntry;

/// Reserved metric name for the risk score / late rate correlation.
pub const CORRELATION_METRIC: &str = "risk_score_late_rate_correlation";

static BUCKET_RATE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^risk_bucket_(late|defect)_rate_(low|medium|high)$").expect("valid regex")
});

/// Note keys holding the correlation's sample size, in lookup order.
const CORRELATION_SAMPLE_KEYS: [&str; 2] = ["sample_size", "count"];

/// Note keys holding a bucket's sample count, in lookup order.
const BUCKET_SAMPLE_KEYS: [&str; 2] = ["sample_size", "sampleSize"];

// ---------------------------------------------------------------------------
// Metric name parsing
// ---------------------------------------------------------------------------

/// Which rate a bucket metric measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RateKind {
    Late,
    Defect,
}

/// Coarse supplier risk-score grouping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskBucket {
    Low,
    Medium,
    High,
}

impl RiskBucket {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    #[must_use]
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            _ => None,
        }
    }
}

/// Structure encoded in a metric name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    Bucket { rate: RateKind, bucket: RiskBucket },
    Correlation,
    Unstructured,
}

impl MetricKind {
    #[must_use]
    pub fn parse(name: &str) -> Self {
        if name == CORRELATION_METRIC {
            return Self::Correlation;
        }
        let Some(caps) = BUCKET_RATE_PATTERN.captures(name) else {
            return Self::Unstructured;
        };
        let rate = match &caps[1] {
            "late" => RateKind::Late,
            _ => RateKind::Defect,
        };
        RiskBucket::from_token(&caps[2])
            .map_or(Self::Unstructured, |bucket| Self::Bucket { rate, bucket })
    }
}

/// Display label for a bucket token; unknown tokens label themselves.
#[must_use]
pub fn bucket_label(token: &str) -> String {
    match token {
        "low" => "Low risk".to_string(),
        "medium" => "Medium risk".to_string(),
        "high" => "High risk".to_string(),
        other => other.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

/// Late/defect rates observed for one risk bucket.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskBucketRow {
    pub bucket: String,
    pub label: String,
    pub late_rate: Option<f64>,
    pub defect_rate: Option<f64>,
    pub samples: u64,
}

impl RiskBucketRow {
    fn new(bucket: RiskBucket) -> Self {
        Self {
            bucket: bucket.as_str().to_string(),
            label: bucket_label(bucket.as_str()),
            late_rate: None,
            defect_rate: None,
            samples: 0,
        }
    }
}

/// How much of the late-rate variance the risk score explains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrelationStrength {
    /// |r| < 0.1
    None,
    /// 0.1 <= |r| < 0.3
    Weak,
    /// 0.3 <= |r| < 0.5
    Moderate,
    /// |r| >= 0.5
    Strong,
}

impl CorrelationStrength {
    #[must_use]
    pub fn classify(r: f64) -> Self {
        let r = r.abs();
        if r < 0.1 {
            Self::None
        } else if r < 0.3 {
            Self::Weak
        } else if r < 0.5 {
            Self::Moderate
        } else {
            Self::Strong
        }
    }
}

/// Pearson coefficient plus the sample size it was computed over.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrelationSummary {
    pub correlation: Option<f64>,
    pub sample_size: u64,
}

impl CorrelationSummary {
    #[must_use]
    pub fn strength(&self) -> Option<CorrelationStrength> {
        self.correlation.map(CorrelationStrength::classify)
    }
}

/// Result of [`analyze_risk_buckets`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskAnalysis {
    pub rows: Vec<RiskBucketRow>,
    pub correlation: Option<f64>,
    pub correlation_sample_size: u64,
}

impl RiskAnalysis {
    #[must_use]
    pub const fn summary(&self) -> CorrelationSummary {
        CorrelationSummary {
            correlation: self.correlation,
            sample_size: self.correlation_sample_size,
        }
    }

    #[must_use]
    pub fn row(&self, bucket: RiskBucket) -> Option<&RiskBucketRow> {
        self.rows.iter().find(|row| row.bucket == bucket.as_str())
    }
}

// ---------------------------------------------------------------------------
// Analysis
// ---------------------------------------------------------------------------

/// Fold state. Each step consumes and returns the accumulator.
#[derive(Default)]
struct RiskFold {
    rows: IndexMap<RiskBucket, RiskBucketRow>,
    correlation: CorrelationSummary,
}

impl RiskFold {
    fn absorb(mut self, entry: &MetricEntry) -> Self {
        let Some(name) = entry.name() else {
            return self;
        };
        match MetricKind::parse(name) {
            MetricKind::Correlation => {
                if let Some(r) = entry.value() {
                    self.correlation.correlation = Some(r);
                }
                if let Some(n) = sample_count(entry, &CORRELATION_SAMPLE_KEYS) {
                    self.correlation.sample_size = n;
                }
            }
            MetricKind::Bucket { rate, bucket } => {
                let row = self
                    .rows
                    .entry(bucket)
                    .or_insert_with(|| RiskBucketRow::new(bucket));
                match rate {
                    RateKind::Late => {
                        if let Some(v) = entry.value() {
                            row.late_rate = Some(v);
                        }
                        if let Some(n) = sample_count(entry, &BUCKET_SAMPLE_KEYS) {
                            row.samples = n;
                        }
                    }
                    RateKind::Defect => {
                        if let Some(v) = entry.value() {
                            row.defect_rate = Some(v);
                        }
                    }
                }
            }
            MetricKind::Unstructured => {}
        }
        self
    }

    fn finish(self) -> RiskAnalysis {
        RiskAnalysis {
            rows: self.rows.into_values().collect(),
            correlation: self.correlation.correlation,
            correlation_sample_size: self.correlation.sample_size,
        }
    }
}

/// First present note among `keys`, accepted only if finite and positive.
///
/// A rejected value returns `None` so the caller keeps whatever count it had.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn sample_count(entry: &MetricEntry, keys: &[&str]) -> Option<u64> {
    let (key, note) = keys
        .iter()
        .find_map(|key| entry.note(key).map(|note| (*key, note)))?;
    let parsed = note.as_f64().filter(|n| n.is_finite() && *n > 0.0);
    let count = parsed.map(f64::round).filter(|n| *n >= 1.0);
    if count.is_none() {
        tracing::warn!(entry = %entry.id, key, value = ?note, "ignoring invalid sample size");
    }
    count.map(|n| n as u64)
}

/// Build bucket rows and the correlation summary from every observation.
#[must_use]
pub fn analyze_risk_buckets(entries: &[MetricEntry]) -> RiskAnalysis {
    let analysis = entries
        .iter()
        .fold(RiskFold::default(), RiskFold::absorb)
        .finish();
    tracing::debug!(
        entries = entries.len(),
        buckets = analysis.rows.len(),
        correlation = ?analysis.correlation,
        "analyzed risk buckets"
    );
    analysis
}
