//! Filesystem-backed approval ledger.

use super::{ApprovalLedger, ProjectRecord};
use crate::errors::LedgerError;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Approval ledger storing one `config.json` per project directory.
///
/// Shares its root with [`FsArtifactStore`](crate::store::FsArtifactStore)
/// so a project's artifacts and its approval record live side by side.
#[derive(Debug, Clone)]
pub struct FsApprovalLedger {
    root: PathBuf,
}

impl FsApprovalLedger {
    /// Creates a ledger rooted at the projects directory.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn record_path(&self, project: &str) -> PathBuf {
        self.root.join(project).join("config.json")
    }

    fn unavailable(path: &Path, source: std::io::Error) -> LedgerError {
        LedgerError::Unavailable { path: path.to_path_buf(), source }
    }
}

impl ApprovalLedger for FsApprovalLedger {
    fn load(&self, project: &str) -> Result<ProjectRecord, LedgerError> {
        let project_dir = self.root.join(project);
        match fs::metadata(&project_dir) {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => return Err(LedgerError::UnknownProject { project: project.to_string() }),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(LedgerError::UnknownProject { project: project.to_string() });
            }
            Err(e) => return Err(Self::unavailable(&project_dir, e)),
        }

        let path = self.record_path(project);
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            // A created project with no record yet reads as fresh.
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Ok(ProjectRecord::new(project));
            }
            Err(e) => return Err(Self::unavailable(&path, e)),
        };
        serde_json::from_str(&text)
            .map_err(|e| LedgerError::Malformed { project: project.to_string(), source: e })
    }

    fn store(&self, record: &ProjectRecord) -> Result<(), LedgerError> {
        let path = self.record_path(&record.project);
        let dir = self.root.join(&record.project);
        fs::create_dir_all(&dir).map_err(|e| Self::unavailable(&dir, e))?;

        let text = serde_json::to_string_pretty(record).map_err(|e| LedgerError::Malformed {
            project: record.project.clone(),
            source: e,
        })?;

        // Whole-record rewrite through a temp file: a crash mid-write
        // leaves the previous record, never a torn one.
        let mut tmp = tempfile::Builder::new()
            .prefix(".tmp_record")
            .tempfile_in(&dir)
            .map_err(|e| Self::unavailable(&dir, e))?;
        tmp.write_all(text.as_bytes()).map_err(|e| Self::unavailable(&path, e))?;
        tmp.flush().map_err(|e| Self::unavailable(&path, e))?;
        tmp.persist(&path).map_err(|e| Self::unavailable(&path, e.error))?;
        debug!(project = %record.project, "approval record rewritten");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Stage;

    fn ledger() -> (tempfile::TempDir, FsApprovalLedger) {
        let dir = tempfile::tempdir().unwrap();
        let ledger = FsApprovalLedger::new(dir.path().join("projects"));
        (dir, ledger)
    }

    fn create_project(ledger: &FsApprovalLedger, project: &str) {
        fs::create_dir_all(ledger.root.join(project)).unwrap();
    }

    #[test]
    fn test_unknown_project_is_an_error() {
        let (_dir, ledger) = ledger();
        let err = ledger.load("ghost").unwrap_err();
        assert!(matches!(err, LedgerError::UnknownProject { .. }));
    }

    #[test]
    fn test_created_project_reads_fresh_record() {
        let (_dir, ledger) = ledger();
        create_project(&ledger, "demo");

        let record = ledger.load("demo").unwrap();
        assert_eq!(record, ProjectRecord::new("demo"));
        assert!(!ledger.get_approval("demo", Stage::Script).unwrap());
    }

    #[test]
    fn test_set_approval_round_trips() {
        let (_dir, ledger) = ledger();
        create_project(&ledger, "demo");

        ledger.set_approval("demo", Stage::Script, true).unwrap();
        assert!(ledger.get_approval("demo", Stage::Script).unwrap());
        assert!(!ledger.get_approval("demo", Stage::Audio).unwrap());

        ledger.set_approval("demo", Stage::Script, false).unwrap();
        assert!(!ledger.get_approval("demo", Stage::Script).unwrap());
    }

    #[test]
    fn test_approvals_survive_reload() {
        let (dir, ledger) = ledger();
        create_project(&ledger, "demo");
        ledger.set_approval("demo", Stage::Input, true).unwrap();
        drop(ledger);

        let reopened = FsApprovalLedger::new(dir.path().join("projects"));
        assert!(reopened.get_approval("demo", Stage::Input).unwrap());
    }

    #[test]
    fn test_malformed_record_is_reported() {
        let (_dir, ledger) = ledger();
        create_project(&ledger, "demo");
        fs::write(ledger.record_path("demo"), b"{not json").unwrap();

        let err = ledger.load("demo").unwrap_err();
        assert!(matches!(err, LedgerError::Malformed { .. }));
    }

    #[test]
    fn test_fingerprints_persist() {
        let (_dir, ledger) = ledger();
        create_project(&ledger, "demo");

        let mut record = ledger.load("demo").unwrap();
        record.set_approved(Stage::Script, true);
        record.set_fingerprint(Stage::Script, "deadbeef");
        ledger.store(&record).unwrap();

        let back = ledger.load("demo").unwrap();
        assert_eq!(back.fingerprint(Stage::Script), Some("deadbeef"));
    }
}
