//! Stage run reports.

use super::Stage;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

/// Record of a single failed item within an itemized stage.
///
/// Item failures are recovered at the item boundary: they are logged,
/// excluded from the artifact, and surfaced only here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemFailure {
    /// 1-based position of the item in the planned input.
    pub index: usize,
    /// Collaborator error message.
    pub error: String,
}

impl ItemFailure {
    /// Creates a new item failure record.
    #[must_use]
    pub fn new(index: usize, error: impl Into<String>) -> Self {
        Self { index, error: error.into() }
    }
}

/// The result of one stage runner invocation.
///
/// A report never mutates approval state; approval is a separate,
/// explicit act on the orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageReport {
    /// Unique id of this run.
    pub run_id: Uuid,
    /// The project the stage ran for.
    pub project: String,
    /// The stage that ran.
    pub stage: Stage,
    /// Location of the persisted artifact.
    pub artifact: PathBuf,
    /// Number of items planned (1 for unitary stages).
    pub requested: usize,
    /// Number of items that made it into the artifact.
    pub produced: usize,
    /// Failures among the planned items, in index order.
    pub failures: Vec<ItemFailure>,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// When the run finished.
    pub finished_at: DateTime<Utc>,
}

impl StageReport {
    /// Returns true if every planned item was produced.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.produced == self.requested
    }

    /// Returns the 1-based indices of failed items.
    #[must_use]
    pub fn failed_indices(&self) -> Vec<usize> {
        self.failures.iter().map(|f| f.index).collect()
    }

    /// Returns the wall-clock duration of the run in milliseconds.
    #[must_use]
    pub fn duration_ms(&self) -> i64 {
        (self.finished_at - self.started_at).num_milliseconds()
    }

    /// One-line human summary, e.g. `images: requested=5 produced=4 failed=[3]`.
    #[must_use]
    pub fn summary(&self) -> String {
        if self.failures.is_empty() {
            format!("{}: requested={} produced={}", self.stage, self.requested, self.produced)
        } else {
            format!(
                "{}: requested={} produced={} failed={:?}",
                self.stage,
                self.requested,
                self.produced,
                self.failed_indices()
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(requested: usize, produced: usize, failures: Vec<ItemFailure>) -> StageReport {
        let now = Utc::now();
        StageReport {
            run_id: Uuid::new_v4(),
            project: "demo".to_string(),
            stage: Stage::Images,
            artifact: PathBuf::from("projects/demo/5_images"),
            requested,
            produced,
            failures,
            started_at: now,
            finished_at: now,
        }
    }

    #[test]
    fn test_complete_report() {
        let report = report(3, 3, Vec::new());
        assert!(report.is_complete());
        assert_eq!(report.summary(), "images: requested=3 produced=3");
    }

    #[test]
    fn test_partial_report_names_failed_indices() {
        let report = report(5, 4, vec![ItemFailure::new(3, "quota exhausted")]);
        assert!(!report.is_complete());
        assert_eq!(report.failed_indices(), vec![3]);
        assert_eq!(report.summary(), "images: requested=5 produced=4 failed=[3]");
    }

    #[test]
    fn test_report_serializes() {
        let report = report(2, 1, vec![ItemFailure::new(1, "boom")]);
        let json = serde_json::to_string(&report).unwrap();
        let back: StageReport = serde_json::from_str(&json).unwrap();
        assert_eq!(back.requested, 2);
        assert_eq!(back.failures.len(), 1);
    }
}
