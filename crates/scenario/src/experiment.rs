//! Append-only log of trial results.
//!
//! Concurrent trials append through a mutex; records are never modified
//! after they are written.

use data_loader::RecommendationTable;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::BTreeMap;

/// Result of one completed trial
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrialRecord {
    /// Recommender name followed by its parameters
    pub label: String,
    pub recommendations: RecommendationTable,
    /// Metric values keyed like `"HitRate@10"`
    pub metrics: BTreeMap<String, f64>,
}

#[derive(Debug, Serialize)]
struct RecordSummary<'a> {
    label: &'a str,
    metrics: &'a BTreeMap<String, f64>,
}

#[derive(Debug, Default)]
pub struct Experiment {
    records: Mutex<Vec<TrialRecord>>,
}

impl Experiment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&self, record: TrialRecord) {
        self.records.lock().push(record);
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    /// Earliest record written under `label`
    pub fn get(&self, label: &str) -> Option<TrialRecord> {
        self.records
            .lock()
            .iter()
            .find(|record| record.label == label)
            .cloned()
    }

    /// Copy of every record in append order
    pub fn records(&self) -> Vec<TrialRecord> {
        self.records.lock().clone()
    }

    pub fn into_records(self) -> Vec<TrialRecord> {
        self.records.into_inner()
    }

    /// Labels and metrics of every record as a JSON array
    pub fn summary_json(&self) -> serde_json::Result<String> {
        let records = self.records.lock();
        let summary: Vec<RecordSummary<'_>> = records
            .iter()
            .map(|record| RecordSummary {
                label: &record.label,
                metrics: &record.metrics,
            })
            .collect();
        serde_json::to_string_pretty(&summary)
    }
}
