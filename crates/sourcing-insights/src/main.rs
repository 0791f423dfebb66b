//! Sourcing Insights - dashboard derivations over metric exports
//!
//! Reads a JSON export of the admin API's metrics collection (or a training
//! job record), runs the derivations and prints the result as JSON on stdout.
//! Logs go to stderr.

#![forbid(unsafe_code)]

use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use sourcing_insights_core::{
    Config, DashboardReport, DateLabelStyle, InsightsError, InsightsResult, MetricEntry,
    ThresholdConfig, TrainingJob, build_latest_index, build_trend_series_with,
    summarize_job,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sourcing-insights")]
#[command(
    version,
    about = "Derive dashboard metrics, trend series and drift warnings from JSON exports",
    after_help = "Environment:\n  SI_THRESHOLDS_PATH   JSON5 threshold table\n  SI_DATE_LABEL_STYLE  us | iso | short\n  SI_TREND_METRICS     comma-separated metrics to chart"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pretty: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Full dashboard report: latest tiles, trends, warnings, risk analysis
    Report {
        /// Metric export (JSON array); `-` reads stdin
        #[arg(long)]
        entries: String,

        /// Threshold table; overrides `SI_THRESHOLDS_PATH`
        #[arg(long)]
        thresholds: Option<PathBuf>,

        /// Fail on entries without a metric name instead of listing them
        #[arg(long)]
        strict: bool,
    },
    /// Trend series for one metric
    Trend {
        /// Metric export (JSON array); `-` reads stdin
        #[arg(long)]
        entries: String,

        /// Metric name to chart
        #[arg(long)]
        metric: String,

        /// Label style; overrides `SI_DATE_LABEL_STYLE`
        #[arg(long, value_enum)]
        date_style: Option<LabelStyleArg>,
    },
    /// Summarize a training job and check its result against the thresholds
    Job {
        /// Training job record (JSON object); `-` reads stdin
        #[arg(long)]
        job: String,

        /// Threshold table; overrides `SI_THRESHOLDS_PATH`
        #[arg(long)]
        thresholds: Option<PathBuf>,
    },
    /// Print the resolved threshold table
    Thresholds {
        /// Threshold table; overrides `SI_THRESHOLDS_PATH`
        #[arg(long)]
        thresholds: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
enum LabelStyleArg {
    Us,
    Iso,
    Short,
}

impl From<LabelStyleArg> for DateLabelStyle {
    fn from(arg: LabelStyleArg) -> Self {
        match arg {
            LabelStyleArg::Us => Self::Us,
            LabelStyleArg::Iso => Self::Iso,
            LabelStyleArg::Short => Self::Short,
        }
    }
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let config = Config::from_env();
    if cli.verbose {
        tracing::debug!("Configuration loaded: {:?}", config);
    }

    if let Err(err) = run(cli.command, config, cli.pretty) {
        tracing::error!(error_type = err.error_type(), "{err}");
        eprintln!("Error [{}]: {err}", err.error_type());
        std::process::exit(1);
    }
}

fn run(command: Commands, mut config: Config, pretty: bool) -> InsightsResult<()> {
    match command {
        Commands::Report {
            entries,
            thresholds,
            strict,
        } => {
            apply_thresholds_override(&mut config, thresholds);
            let table = config.load_thresholds()?;
            let entries = read_entries(&entries)?;
            if strict {
                build_latest_index(&entries)?;
            }
            let report = DashboardReport::derive(&entries, &table, &config);
            for issue in &report.issues {
                tracing::warn!(entry = %issue.entry_id, "skipped entry without metric_name");
            }
            write_json(&report, pretty)
        }
        Commands::Trend {
            entries,
            metric,
            date_style,
        } => {
            if let Some(style) = date_style {
                config.date_label_style = style.into();
            }
            let entries = read_entries(&entries)?;
            let series = build_trend_series_with(&entries, &metric, config.date_label_style);
            if series.is_empty() {
                tracing::info!(metric = %metric, "no plottable entries for metric");
            }
            write_json(&series, pretty)
        }
        Commands::Job { job, thresholds } => {
            apply_thresholds_override(&mut config, thresholds);
            let table = config.load_thresholds()?;
            let job: TrainingJob = serde_json::from_str(&read_input(&job)?)?;
            write_json(&summarize_job(&job, &table), pretty)
        }
        Commands::Thresholds { thresholds } => {
            apply_thresholds_override(&mut config, thresholds);
            let table: ThresholdConfig = config.load_thresholds()?;
            write_json(&table, pretty)
        }
    }
}

fn apply_thresholds_override(config: &mut Config, path: Option<PathBuf>) {
    if path.is_some() {
        config.thresholds_path = path;
    }
}

/// Read a file, or stdin when `source` is `-`.
fn read_input(source: &str) -> InsightsResult<String> {
    if source == "-" {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf)?;
        return Ok(buf);
    }
    if source.trim().is_empty() {
        return Err(InsightsError::InvalidArgument(
            "input path must not be empty".to_string(),
        ));
    }
    Ok(fs::read_to_string(Path::new(source))?)
}

fn read_entries(source: &str) -> InsightsResult<Vec<MetricEntry>> {
    parse_entries(&read_input(source)?)
}

/// Accepts a bare array or an `{"items": [...]}` page from the admin API.
fn parse_entries(raw: &str) -> InsightsResult<Vec<MetricEntry>> {
    #[derive(serde::Deserialize)]
    #[serde(untagged)]
    enum Export {
        List(Vec<MetricEntry>),
        Page { items: Vec<MetricEntry> },
    }

    let export: Export = serde_json::from_str(raw).map_err(|e| {
        InsightsError::InvalidArgument(format!(
            "expected a JSON array of metric entries or an object with \"items\": {e}"
        ))
    })?;
    let entries = match export {
        Export::List(entries) | Export::Page { items: entries } => entries,
    };
    tracing::debug!(count = entries.len(), "read metric entries");
    Ok(entries)
}

fn write_json<T: Serialize>(value: &T, pretty: bool) -> InsightsResult<()> {
    let rendered = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{rendered}")?;
    Ok(())
}
