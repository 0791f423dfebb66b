//! Metric derivation and drift detection for the sourcing admin console
//!
//! This crate provides:
//! - Metric and training-job models as exported by the admin API
//! - Latest-per-name indexing and capped trend series
//! - Threshold warnings over the latest index or a job's result map
//! - Supplier-risk bucket / correlation analysis
//! - Label and value formatting shared by all of the above
//!
//! Every derivation is a pure function of its input collection.

#![forbid(unsafe_code)]

pub mod config;
pub mod dashboard;
pub mod error;
pub mod labels;
pub mod latest;
pub mod models;
pub mod risk;
pub mod thresholds;
pub mod timestamps;
pub mod trend;

// Re-export key types for convenience
pub use config::Config;
pub use dashboard::{DashboardReport, JobSummary, LatestTile, summarize_job};
pub use error::{Error as InsightsError, Result as InsightsResult};
pub use labels::{DateLabelStyle, format_warning_value, metric_label};
pub use latest::{DataIssue, DataIssueKind, LatestIndex, build_latest_index};
pub use models::{
    EntryId, JobStatus, MetricEntry, NoteValue, ResultValue, TrainingJob, TrainingJobResult,
};
pub use risk::{
    CORRELATION_METRIC, CorrelationStrength, CorrelationSummary, MetricKind, RateKind,
    RiskAnalysis, RiskBucket, RiskBucketRow, analyze_risk_buckets,
};
pub use thresholds::{
    BoundKind, MetricSource, MetricThreshold, ThresholdConfig, ThresholdWarning, ValueFormat,
    evaluate, evaluate_warnings,
};
pub use trend::{
    TREND_MAX_POINTS, TrendPoint, TrendSeries, build_trend_series, build_trend_series_with,
};
