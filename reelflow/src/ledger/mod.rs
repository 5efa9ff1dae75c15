//! Approval tracking.
//!
//! Approval is an explicit, stage-scoped flag gating downstream
//! execution. It is independent of artifact existence and survives
//! process restarts: the ledger persists one record per project, and a
//! single read reconstructs the full approval vector.

mod fs;

pub use fs::FsApprovalLedger;

use crate::core::Stage;
use crate::errors::LedgerError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The single durable record the core owns for a project, beyond the
/// raw artifacts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectRecord {
    /// The project this record belongs to.
    pub project: String,
    /// Approval flag per stage. Unset stages read as unapproved.
    pub approvals: BTreeMap<Stage, bool>,
    /// Content fingerprint of each artifact at the moment it was
    /// approved. Used only by the integrity check; never enforced on
    /// the read path.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub fingerprints: BTreeMap<Stage, String>,
}

impl ProjectRecord {
    /// Creates a fresh record with every stage unapproved.
    #[must_use]
    pub fn new(project: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            approvals: Stage::all().map(|stage| (stage, false)).collect(),
            fingerprints: BTreeMap::new(),
        }
    }

    /// Returns the approval flag for a stage (false if unset).
    #[must_use]
    pub fn is_approved(&self, stage: Stage) -> bool {
        self.approvals.get(&stage).copied().unwrap_or(false)
    }

    /// Sets the approval flag for a stage. Revoking approval also
    /// drops the recorded fingerprint; the artifact itself is never
    /// touched.
    pub fn set_approved(&mut self, stage: Stage, value: bool) {
        self.approvals.insert(stage, value);
        if !value {
            self.fingerprints.remove(&stage);
        }
    }

    /// Returns the fingerprint recorded at approval time, if any.
    #[must_use]
    pub fn fingerprint(&self, stage: Stage) -> Option<&str> {
        self.fingerprints.get(&stage).map(String::as_str)
    }

    /// Records the artifact fingerprint observed at approval time.
    pub fn set_fingerprint(&mut self, stage: Stage, fingerprint: impl Into<String>) {
        self.fingerprints.insert(stage, fingerprint.into());
    }
}

/// Persistence for per-project approval records.
///
/// Writes are whole-record rewrites: a failed write leaves the previous
/// record intact, never a torn one.
pub trait ApprovalLedger: Send + Sync {
    /// Loads the record for a project.
    ///
    /// Returns [`LedgerError::UnknownProject`] for projects that were
    /// never created; a created project with no record yet reads as a
    /// fresh all-unapproved record.
    fn load(&self, project: &str) -> Result<ProjectRecord, LedgerError>;

    /// Persists the record in one atomic rewrite.
    fn store(&self, record: &ProjectRecord) -> Result<(), LedgerError>;

    /// Returns the approval flag for one stage (false if unset).
    fn get_approval(&self, project: &str, stage: Stage) -> Result<bool, LedgerError> {
        Ok(self.load(project)?.is_approved(stage))
    }

    /// Sets the approval flag for one stage.
    fn set_approval(&self, project: &str, stage: Stage, value: bool) -> Result<(), LedgerError> {
        let mut record = self.load(project)?;
        record.set_approved(stage, value);
        self.store(&record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_record_is_unapproved() {
        let record = ProjectRecord::new("demo");
        for stage in Stage::all() {
            assert!(!record.is_approved(stage));
        }
        assert_eq!(record.approvals.len(), 7);
    }

    #[test]
    fn test_revoking_drops_fingerprint() {
        let mut record = ProjectRecord::new("demo");
        record.set_approved(Stage::Script, true);
        record.set_fingerprint(Stage::Script, "abc123");
        assert_eq!(record.fingerprint(Stage::Script), Some("abc123"));

        record.set_approved(Stage::Script, false);
        assert_eq!(record.fingerprint(Stage::Script), None);
    }

    #[test]
    fn test_record_serializes_as_single_document() {
        let mut record = ProjectRecord::new("demo");
        record.set_approved(Stage::Input, true);

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["project"], "demo");
        assert_eq!(json["approvals"]["input"], true);
        assert_eq!(json["approvals"]["script"], false);
    }
}
