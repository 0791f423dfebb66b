//! Criterion benchmarks for the dashboard derivations.
//!
//! Covers: latest index, trend series, risk analysis, full report.
//! Inputs are generated deterministically; no I/O.

use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};

use sourcing_insights_core::{
    Config, DashboardReport, MetricEntry, ThresholdConfig, analyze_risk_buckets,
    build_latest_index, build_trend_series, evaluate,
};

const METRICS: [&str; 8] = [
    "mape",
    "mae",
    "error_rate",
    "late_rate",
    "accuracy",
    "risk_bucket_late_rate_high",
    "risk_bucket_defect_rate_low",
    "risk_score_late_rate_correlation",
];

/// `n` entries spread over the metric names and a year of daily windows.
fn synthetic_entries(n: usize) -> Vec<MetricEntry> {
    (0..n)
        .map(|i| {
            let id = i64::try_from(i).unwrap_or(i64::MAX);
            let day = (i / METRICS.len()) % 365;
            let month = day / 31 + 1;
            let dom = day % 28 + 1;
            #[allow(clippy::cast_precision_loss)]
            let value = (i % 97) as f64 / 100.0;
            MetricEntry::new(id, METRICS[i % METRICS.len()], Some(value))
                .with_window_end(&format!("2024-{month:02}-{dom:02}"))
                .with_note("sample_size", 40.0)
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Individual derivations
// ---------------------------------------------------------------------------

fn bench_latest_index(c: &mut Criterion) {
    let entries = synthetic_entries(10_000);
    c.bench_function("latest_index_10k", |b| {
        b.iter(|| build_latest_index(black_box(&entries)));
    });
}

fn bench_trend_series(c: &mut Criterion) {
    let entries = synthetic_entries(10_000);
    c.bench_function("trend_series_10k", |b| {
        b.iter(|| build_trend_series(black_box(&entries), black_box("mape")));
    });
}

fn bench_risk_analysis(c: &mut Criterion) {
    let entries = synthetic_entries(10_000);
    c.bench_function("risk_analysis_10k", |b| {
        b.iter(|| analyze_risk_buckets(black_box(&entries)));
    });
}

fn bench_threshold_evaluation(c: &mut Criterion) {
    let entries = synthetic_entries(1_000);
    let Ok(index) = build_latest_index(&entries) else {
        return;
    };
    let thresholds = ThresholdConfig::reference();
    c.bench_function("evaluate_reference_table", |b| {
        b.iter(|| evaluate(black_box(&index), &thresholds));
    });
}

// ---------------------------------------------------------------------------
// Full report
// ---------------------------------------------------------------------------

fn bench_dashboard_report(c: &mut Criterion) {
    let entries = synthetic_entries(10_000);
    let thresholds = ThresholdConfig::reference();
    let config = Config::default();
    c.bench_function("dashboard_report_10k", |b| {
        b.iter(|| DashboardReport::derive(black_box(&entries), &thresholds, &config));
    });
}

criterion_group!(
    benches,
    bench_latest_index,
    bench_trend_series,
    bench_risk_analysis,
    bench_threshold_evaluation,
    bench_dashboard_report,
);
criterion_main!(benches);
