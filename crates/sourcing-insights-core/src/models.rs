//! Data models for Sourcing Insights
//!
//! These models mirror the JSON collections returned by the admin API. Every
//! field the API may omit or null out is an `Option`; timestamps are kept as the
//! raw strings the API sent and parsed on demand (see [`crate::timestamps`]),
//! so a malformed value degrades to "absent" instead of failing deserialization.

use std::fmt;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::timestamps::parse_timestamp;

// =============================================================================
// Identifiers and note values
// =============================================================================

/// Opaque record identifier. The API emits both integer and UUID-style ids.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntryId {
    Int(i64),
    Text(String),
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(id) => write!(f, "{id}"),
            Self::Text(id) => f.write_str(id),
        }
    }
}

impl From<i64> for EntryId {
    fn from(id: i64) -> Self {
        Self::Int(id)
    }
}

impl From<&str> for EntryId {
    fn from(id: &str) -> Self {
        Self::Text(id.to_string())
    }
}

impl From<String> for EntryId {
    fn from(id: String) -> Self {
        Self::Text(id)
    }
}

/// Scalar value stored in an entry's `notes` map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NoteValue {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
    /// Nested arrays and objects are carried through untouched.
    Other(serde_json::Value),
}

impl NoteValue {
    /// Numeric view of the note. Numeric strings (`"120"`) are accepted since
    /// some exporters stringify counts.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(s) => s.trim().parse().ok(),
            Self::Null | Self::Bool(_) | Self::Other(_) => None,
        }
    }

    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl From<f64> for NoteValue {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<&str> for NoteValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

// =============================================================================
// MetricEntry
// =============================================================================

/// One time-stamped observation of a named metric.
///
/// # Constraints
/// - `id`: unique within a collection.
/// - `metric_name`: required and non-empty. Entries violating this are reported
///   as data issues (see [`crate::latest`]).
/// - Multiple entries per `metric_name` are the normal case (one per window).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricEntry {
    pub id: EntryId,
    #[serde(default)]
    pub metric_name: Option<String>,
    #[serde(default)]
    pub metric_value: Option<f64>,
    #[serde(default)]
    pub window_end: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub notes: Option<IndexMap<String, NoteValue>>,
    #[serde(default)]
    pub feature: Option<String>,
    #[serde(default)]
    pub company_id: Option<serde_json::Value>,
}

impl MetricEntry {
    /// Create an entry with a name and value and no timestamps.
    #[must_use]
    pub fn new(id: impl Into<EntryId>, metric_name: &str, metric_value: Option<f64>) -> Self {
        Self {
            id: id.into(),
            metric_name: Some(metric_name.to_string()),
            metric_value,
            window_end: None,
            updated_at: None,
            notes: None,
            feature: None,
            company_id: None,
        }
    }

    #[must_use]
    pub fn with_window_end(mut self, window_end: &str) -> Self {
        self.window_end = Some(window_end.to_string());
        self
    }

    #[must_use]
    pub fn with_updated_at(mut self, updated_at: &str) -> Self {
        self.updated_at = Some(updated_at.to_string());
        self
    }

    #[must_use]
    pub fn with_note(mut self, key: &str, value: impl Into<NoteValue>) -> Self {
        self.notes
            .get_or_insert_with(IndexMap::new)
            .insert(key.to_string(), value.into());
        self
    }

    /// The metric name, if present and not blank.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.metric_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
    }

    /// The metric value, if present and finite.
    #[must_use]
    pub fn value(&self) -> Option<f64> {
        self.metric_value.filter(|v| v.is_finite())
    }

    /// Parsed `window_end`; `None` when absent or malformed.
    #[must_use]
    pub fn window_end_at(&self) -> Option<DateTime<Utc>> {
        self.window_end.as_deref().and_then(parse_timestamp)
    }

    /// Parsed `updated_at`; `None` when absent or malformed.
    #[must_use]
    pub fn updated_at_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at.as_deref().and_then(parse_timestamp)
    }

    /// Recency key: `window_end`, falling back to `updated_at`.
    ///
    /// `None` sorts below every real timestamp, which is where the epoch-zero
    /// default would place it for any post-1970 data.
    #[must_use]
    pub fn recency_key(&self) -> Option<DateTime<Utc>> {
        self.window_end_at().or_else(|| self.updated_at_at())
    }

    /// Look up a note by key; JSON `null` counts as absent.
    #[must_use]
    pub fn note(&self, key: &str) -> Option<&NoteValue> {
        self.notes
            .as_ref()
            .and_then(|notes| notes.get(key))
            .filter(|v| !v.is_null())
    }
}

// =============================================================================
// Training jobs
// =============================================================================

/// Lifecycle state reported by the training service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Running,
    #[serde(alias = "completed", alias = "success")]
    Succeeded,
    Failed,
    #[serde(alias = "canceled")]
    Cancelled,
    #[default]
    #[serde(other)]
    Unknown,
}

impl JobStatus {
    /// Whether the job has stopped (successfully or not).
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Cancelled)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Queued => f.write_str("queued"),
            Self::Running => f.write_str("running"),
            Self::Succeeded => f.write_str("succeeded"),
            Self::Failed => f.write_str("failed"),
            Self::Cancelled => f.write_str("cancelled"),
            Self::Unknown => f.write_str("unknown"),
        }
    }
}

/// A value in a training job's `result` map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResultValue {
    Number(f64),
    Text(String),
    Other(serde_json::Value),
}

impl ResultValue {
    /// Numeric entries only; strings are labels, not measurements.
    #[must_use]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) if n.is_finite() => Some(*n),
            _ => None,
        }
    }
}

/// Result fields attached to a finished training job, keyed by metric name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrainingJobResult(pub IndexMap<String, ResultValue>);

impl TrainingJobResult {
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&ResultValue> {
        self.0.get(key)
    }

    #[must_use]
    pub fn number(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(ResultValue::as_number)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<ResultValue>> FromIterator<(K, V)> for TrainingJobResult {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl From<f64> for ResultValue {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<&str> for ResultValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

/// A training job record as exported by the training service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingJob {
    pub id: EntryId,
    #[serde(default)]
    pub status: JobStatus,
    #[serde(default)]
    pub started_at: Option<String>,
    #[serde(default)]
    pub finished_at: Option<String>,
    #[serde(default)]
    pub result: Option<TrainingJobResult>,
}

impl TrainingJob {
    /// Wall-clock run time. `None` unless both timestamps parse and are ordered.
    #[must_use]
    pub fn duration(&self) -> Option<chrono::Duration> {
        let started = self.started_at.as_deref().and_then(parse_timestamp)?;
        let finished = self.finished_at.as_deref().and_then(parse_timestamp)?;
        (finished >= started).then(|| finished - started)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_deserializes_with_nulls_and_missing_fields() {
        let json = r#"{
            "id": 17,
            "metric_name": "mape",
            "metric_value": null,
            "window_end": "2024-01-31",
            "notes": {"sample_size": 120, "source": "nightly", "flag": null}
        }"#;
        let entry: MetricEntry = serde_json::from_str(json).unwrap();
        assert_eq!(entry.id, EntryId::Int(17));
        assert_eq!(entry.name(), Some("mape"));
        assert_eq!(entry.value(), None);
        assert!(entry.updated_at.is_none());
        assert_eq!(entry.note("sample_size").and_then(NoteValue::as_f64), Some(120.0));
        assert!(entry.note("flag").is_none());
        assert!(entry.note("missing").is_none());
    }

    #[test]
    fn string_ids_are_supported() {
        let json = r#"{"id": "a1b2", "metric_name": "mae", "metric_value": 3.5}"#;
        let entry: MetricEntry = serde_json::from_str(json).unwrap();
        assert_eq!(entry.id.to_string(), "a1b2");
    }

    #[test]
    fn blank_name_is_treated_as_missing() {
        let mut entry = MetricEntry::new(1, "  ", Some(1.0));
        assert!(entry.name().is_none());
        entry.metric_name = None;
        assert!(entry.name().is_none());
    }

    #[test]
    fn recency_key_falls_back_to_updated_at() {
        let entry = MetricEntry::new(1, "mae", Some(1.0))
            .with_window_end("not a date")
            .with_updated_at("2024-03-01T10:00:00Z");
        assert_eq!(entry.recency_key(), entry.updated_at_at());
        assert!(entry.window_end_at().is_none());

        let bare = MetricEntry::new(2, "mae", Some(1.0));
        assert!(bare.recency_key().is_none());
    }

    #[test]
    fn numeric_text_notes_parse() {
        assert_eq!(NoteValue::from(" 42 ").as_f64(), Some(42.0));
        assert_eq!(NoteValue::from("many").as_f64(), None);
        assert_eq!(NoteValue::Bool(true).as_f64(), None);
        let nested: NoteValue = serde_json::from_str(r#"{"by_region": [1, 2]}"#).unwrap();
        assert!(matches!(nested, NoteValue::Other(_)));
        assert_eq!(nested.as_f64(), None);
    }

    #[test]
    fn job_status_aliases_and_unknowns() {
        let parse = |s: &str| serde_json::from_str::<JobStatus>(&format!("\"{s}\"")).unwrap();
        assert_eq!(parse("succeeded"), JobStatus::Succeeded);
        assert_eq!(parse("completed"), JobStatus::Succeeded);
        assert_eq!(parse("canceled"), JobStatus::Cancelled);
        assert_eq!(parse("paused"), JobStatus::Unknown);
        assert!(JobStatus::Failed.is_terminal());
        assert!(!JobStatus::Running.is_terminal());
    }

    #[test]
    fn job_result_keeps_numbers_and_strings() {
        let json = r#"{
            "id": "job-9",
            "status": "succeeded",
            "started_at": "2024-05-01T08:00:00Z",
            "finished_at": "2024-05-01T08:45:30Z",
            "result": {"mape": 0.41, "model": "gbm-v3", "converged": true}
        }"#;
        let job: TrainingJob = serde_json::from_str(json).unwrap();
        let result = job.result.as_ref().unwrap();
        assert_eq!(result.number("mape"), Some(0.41));
        assert_eq!(result.number("model"), None);
        assert_eq!(result.number("converged"), None);
        assert_eq!(job.duration(), Some(chrono::Duration::seconds(45 * 60 + 30)));
    }

    #[test]
    fn job_duration_requires_ordered_timestamps() {
        let job = TrainingJob {
            id: EntryId::Int(1),
            status: JobStatus::Running,
            started_at: Some("2024-05-01T08:00:00Z".into()),
            finished_at: None,
            result: None,
        };
        assert!(job.duration().is_none());

        let backwards = TrainingJob {
            finished_at: Some("2024-04-30T08:00:00Z".into()),
            ..job
        };
        assert!(backwards.duration().is_none());
    }
}
