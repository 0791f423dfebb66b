//! Latest-observation index: one entry per metric name.
//!
//! Entries are ordered by recency key (`window_end`, else `updated_at`)
//! descending, with entry id ascending as the tie-break, using a stable sort.
//! The first occurrence of each name in that order wins, so the result does not
//! depend on the order the API returned the collection in.

use indexmap::IndexMap;
use serde::Serialize;

use crate::error::{Error, Result};
use crate::models::{EntryId, MetricEntry};

/// Why an entry was left out of a derivation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DataIssueKind {
    MissingMetricName,
}

/// A structurally invalid entry that a lenient derivation skipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DataIssue {
    pub entry_id: EntryId,
    pub kind: DataIssueKind,
}

impl DataIssue {
    #[must_use]
    pub fn into_error(self) -> Error {
        match self.kind {
            DataIssueKind::MissingMetricName => Error::MissingMetricName {
                id: self.entry_id.to_string(),
            },
        }
    }
}

/// Most recent entry per metric name, iterated newest first.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LatestIndex {
    entries: IndexMap<String, MetricEntry>,
    issues: Vec<DataIssue>,
}

impl LatestIndex {
    /// Build the index, skipping entries without a metric name.
    ///
    /// Skipped entries are logged and kept in [`LatestIndex::issues`].
    #[must_use]
    pub fn build_lenient(entries: &[MetricEntry]) -> Self {
        let mut issues = Vec::new();
        let mut valid: Vec<&MetricEntry> = Vec::with_capacity(entries.len());
        for entry in entries {
            if entry.name().is_some() {
                valid.push(entry);
            } else {
                tracing::warn!(entry = %entry.id, "skipping metric entry without metric_name");
                issues.push(DataIssue {
                    entry_id: entry.id.clone(),
                    kind: DataIssueKind::MissingMetricName,
                });
            }
        }

        // Keys are parsed once, outside the comparator.
        let mut keyed: Vec<_> = valid
            .into_iter()
            .map(|entry| (entry.recency_key(), entry))
            .collect();
        keyed.sort_by(|(a_key, a), (b_key, b)| b_key.cmp(a_key).then_with(|| a.id.cmp(&b.id)));

        let mut index: IndexMap<String, MetricEntry> = IndexMap::new();
        for (_, entry) in keyed {
            if let Some(name) = entry.name() {
                if !index.contains_key(name) {
                    index.insert(name.to_string(), entry.clone());
                }
            }
        }

        tracing::debug!(
            entries = entries.len(),
            names = index.len(),
            skipped = issues.len(),
            "built latest metric index"
        );

        Self {
            entries: index,
            issues,
        }
    }

    #[must_use]
    pub fn get(&self, metric_name: &str) -> Option<&MetricEntry> {
        self.entries.get(metric_name)
    }

    /// Latest finite value for `metric_name`.
    #[must_use]
    pub fn value(&self, metric_name: &str) -> Option<f64> {
        self.get(metric_name).and_then(MetricEntry::value)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &MetricEntry)> {
        self.entries.iter().map(|(name, entry)| (name.as_str(), entry))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Entries skipped while building.
    #[must_use]
    pub fn issues(&self) -> &[DataIssue] {
        &self.issues
    }

    #[must_use]
    pub fn into_map(self) -> IndexMap<String, MetricEntry> {
        self.entries
    }
}

/// Build the latest-per-name index, failing on the first entry without a name.
pub fn build_latest_index(entries: &[MetricEntry]) -> Result<LatestIndex> {
    let index = LatestIndex::build_lenient(entries);
    if let Some(issue) = index.issues.first() {
        return Err(issue.clone().into_error());
    }
    Ok(index)
}
