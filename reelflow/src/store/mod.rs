//! Artifact storage.
//!
//! The store maps a (project, stage) pair to a location on stable
//! storage and reports existence. It never interprets artifact content;
//! interpretation belongs to the stage runner.

mod fs;

pub use fs::FsArtifactStore;

use crate::core::{ArtifactPayload, Stage};
use crate::errors::StoreError;
use std::path::PathBuf;

/// Storage for stage artifacts, addressed by (project, stage).
///
/// `write` must be atomic with respect to `exists`: a reader must never
/// observe a partially written artifact as existing.
pub trait ArtifactStore: Send + Sync {
    /// Creates the storage location for a project, idempotently.
    fn create_project(&self, project: &str) -> Result<(), StoreError>;

    /// Lists projects known to the store, sorted by name.
    fn list_projects(&self) -> Result<Vec<String>, StoreError>;

    /// Returns true if the stage's artifact exists and is non-empty.
    fn exists(&self, project: &str, stage: Stage) -> Result<bool, StoreError>;

    /// Reads the stage's artifact.
    ///
    /// Returns [`StoreError::Missing`] when the artifact is absent;
    /// [`StoreError::Unavailable`] when storage itself failed.
    fn read(&self, project: &str, stage: Stage) -> Result<ArtifactPayload, StoreError>;

    /// Persists the stage's artifact in one atomic step, replacing any
    /// previous artifact. Returns the artifact location.
    fn write(&self, project: &str, stage: Stage, payload: &ArtifactPayload) -> Result<PathBuf, StoreError>;

    /// Returns the location the stage's artifact occupies (whether or
    /// not it exists yet).
    fn location(&self, project: &str, stage: Stage) -> PathBuf;
}
