//! Dashboard assembly: every derivation run once over one fetched collection.
//!
//! A report is recomputed from scratch on each data fetch and replaces the
//! previous one; nothing is merged or cached between calls.

use serde::Serialize;

use crate::config::Config;
use crate::labels::{format_metric_value, metric_label};
use crate::latest::{DataIssue, LatestIndex};
use crate::models::{EntryId, JobStatus, MetricEntry, TrainingJob};
use crate::risk::{CorrelationStrength, RiskAnalysis, analyze_risk_buckets};
use crate::thresholds::{ThresholdConfig, ThresholdWarning, ValueFormat, evaluate};
use crate::trend::{TrendSeries, build_trend_series_with};

/// Latest value of one metric, ready to display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LatestTile {
    pub metric: String,
    pub label: String,
    pub value: Option<f64>,
    pub display: String,
    pub window_end: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub help: Option<String>,
}

/// Everything the metrics page renders.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardReport {
    pub entry_count: usize,
    pub latest: Vec<LatestTile>,
    pub trends: Vec<TrendSeries>,
    pub warnings: Vec<ThresholdWarning>,
    pub risk: RiskAnalysis,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation_strength: Option<CorrelationStrength>,
    pub issues: Vec<DataIssue>,
}

impl DashboardReport {
    /// Derive the full report.
    ///
    /// Entries without a metric name are skipped and listed in `issues`;
    /// use [`crate::latest::build_latest_index`] first to reject them instead.
    #[must_use]
    pub fn derive(entries: &[MetricEntry], thresholds: &ThresholdConfig, config: &Config) -> Self {
        let index = LatestIndex::build_lenient(entries);
        let latest = latest_tiles(&index, thresholds);
        let trends = config
            .trend_metric_names(thresholds)
            .iter()
            .map(|name| build_trend_series_with(entries, name, config.date_label_style))
            .filter(|series| !series.is_empty())
            .collect();
        let warnings = evaluate(&index, thresholds);
        let risk = analyze_risk_buckets(entries);
        let correlation_strength = risk.summary().strength();

        tracing::debug!(
            entries = entries.len(),
            tiles = latest.len(),
            warnings = warnings.len(),
            "derived dashboard report"
        );

        Self {
            entry_count: entries.len(),
            latest,
            trends,
            warnings,
            risk,
            correlation_strength,
            issues: index.issues().to_vec(),
        }
    }
}

/// Tiles for thresholded metrics in table order, then the rest by name.
fn latest_tiles(index: &LatestIndex, thresholds: &ThresholdConfig) -> Vec<LatestTile> {
    let mut tiles: Vec<LatestTile> = thresholds
        .iter()
        .filter_map(|threshold| {
            let entry = index.get(&threshold.name)?;
            Some(LatestTile {
                metric: threshold.name.clone(),
                label: threshold.display_label(),
                value: entry.value(),
                display: format_metric_value(entry.value(), threshold.format, threshold.precision),
                window_end: entry.window_end.clone(),
                help: Some(threshold.help.clone()).filter(|h| !h.is_empty()),
            })
        })
        .collect();

    let mut rest: Vec<(&str, &MetricEntry)> = index
        .iter()
        .filter(|(name, _)| thresholds.get(name).is_none())
        .collect();
    rest.sort_by_key(|(name, _)| *name);
    tiles.extend(rest.into_iter().map(|(name, entry)| {
        let format = ValueFormat::infer(name);
        LatestTile {
            metric: name.to_string(),
            label: metric_label(name),
            value: entry.value(),
            display: format_metric_value(entry.value(), format, format.default_precision()),
            window_end: entry.window_end.clone(),
            help: None,
        }
    }));
    tiles
}

/// A training job reduced to what the jobs page shows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobSummary {
    pub id: EntryId,
    pub status: JobStatus,
    pub duration_secs: Option<i64>,
    pub warnings: Vec<ThresholdWarning>,
}

/// Summarize a job, checking its result fields against the same thresholds.
#[must_use]
pub fn summarize_job(job: &TrainingJob, thresholds: &ThresholdConfig) -> JobSummary {
    let warnings = job
        .result
        .as_ref()
        .map(|result| evaluate(result, thresholds))
        .unwrap_or_default();
    JobSummary {
        id: job.id.clone(),
        status: job.status,
        duration_secs: job.duration().map(|d| d.num_seconds()),
        warnings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::labels::DateLabelStyle;
    use crate::risk::CORRELATION_METRIC;

    fn entries() -> Vec<MetricEntry> {
        vec![
            MetricEntry::new(1, "mape", Some(0.4)).with_window_end("2024-01-31"),
            MetricEntry::new(2, "mape", Some(0.3)).with_window_end("2024-02-29"),
            MetricEntry::new(3, "accuracy", Some(0.55)).with_window_end("2024-02-29"),
            MetricEntry::new(4, "supplier_count", Some(412.0)).with_window_end("2024-02-29"),
            MetricEntry::new(5, "risk_bucket_late_rate_low", Some(0.04)).with_window_end("2024-02-29"),
            MetricEntry::new(6, CORRELATION_METRIC, Some(0.38))
                .with_window_end("2024-02-29")
                .with_note("sample_size", 250.0),
        ]
    }

    #[test]
    fn report_combines_all_derivations() {
        let config = Config {
            date_label_style: DateLabelStyle::Iso,
            ..Config::default()
        };
        let report = DashboardReport::derive(&entries(), &ThresholdConfig::reference(), &config);

        assert_eq!(report.entry_count, 6);
        assert!(report.issues.is_empty());

        let messages: Vec<_> = report.warnings.iter().map(|w| w.message.as_str()).collect();
        assert_eq!(messages, vec!["Accuracy is 0.55, below the 0.70 floor"]);

        let mape = report.trends.iter().find(|s| s.metric == "mape").unwrap();
        let labels: Vec<_> = mape.iter().map(|p| p.label.as_str()).collect();
        assert_eq!(labels, vec!["2024-01-31", "2024-02-29"]);

        assert_eq!(report.risk.rows.len(), 1);
        assert_eq!(report.risk.correlation_sample_size, 250);
        assert_eq!(report.correlation_strength, Some(CorrelationStrength::Moderate));
    }

    #[test]
    fn tiles_put_thresholded_metrics_first() {
        let report =
            DashboardReport::derive(&entries(), &ThresholdConfig::reference(), &Config::default());
        let metrics: Vec<_> = report.latest.iter().map(|t| t.metric.as_str()).collect();
        assert_eq!(
            metrics,
            vec![
                "mape",
                "accuracy",
                CORRELATION_METRIC,
                "risk_bucket_late_rate_low",
                "supplier_count",
            ]
        );
        assert_eq!(report.latest[0].display, "30.0%");
        assert_eq!(report.latest[0].label, "MAPE");
        assert_eq!(report.latest[3].label, "Late rate (Low risk)");
        assert_eq!(report.latest[3].display, "4.0%");
        assert_eq!(report.latest[4].display, "412.00");
    }

    #[test]
    fn nameless_entries_surface_as_issues() {
        let mut data = entries();
        data.push(MetricEntry {
            metric_name: None,
            ..MetricEntry::new(99, "x", Some(1.0))
        });
        let report =
            DashboardReport::derive(&data, &ThresholdConfig::reference(), &Config::default());
        assert_eq!(report.issues.len(), 1);
        assert_eq!(report.issues[0].entry_id, EntryId::Int(99));
    }

    #[test]
    fn job_summary_checks_result_fields() {
        let job: TrainingJob = serde_json::from_str(
            r#"{
                "id": 12,
                "status": "succeeded",
                "started_at": "2024-05-01T08:00:00Z",
                "finished_at": "2024-05-01T09:00:00Z",
                "result": {"mape": 0.5, "error_rate": 0.1, "model": "gbm"}
            }"#,
        )
        .unwrap();
        let summary = summarize_job(&job, &ThresholdConfig::reference());
        assert_eq!(summary.status, JobStatus::Succeeded);
        assert_eq!(summary.duration_secs, Some(3600));
        assert_eq!(summary.warnings.len(), 1);
        assert_eq!(summary.warnings[0].message, "MAPE is 50.0%, above the 35.0% limit");
    }

    #[test]
    fn job_without_result_has_no_warnings() {
        let job = TrainingJob {
            id: EntryId::from("job-1"),
            status: JobStatus::Queued,
            started_at: None,
            finished_at: None,
            result: None,
        };
        let summary = summarize_job(&job, &ThresholdConfig::reference());
        assert!(summary.warnings.is_empty());
        assert!(summary.duration_secs.is_none());
    }
}
