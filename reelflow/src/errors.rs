//! Error types for the reelflow pipeline.
//!
//! The taxonomy separates cheap pre-execution failures (prerequisites,
//! configuration) from storage failures (always fatal, never silently
//! recovered) and collaborator failures (opaque to the core).

use crate::core::Stage;
use std::path::PathBuf;
use thiserror::Error;

/// The main error type for pipeline operations.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// An upstream stage is missing or unapproved.
    #[error("{0}")]
    Prerequisite(#[from] PrerequisiteError),

    /// A derived-parameter input or run parameter is missing or invalid.
    #[error("{0}")]
    Configuration(#[from] ConfigurationError),

    /// The artifact store failed or an expected artifact is absent.
    #[error("{0}")]
    Store(#[from] StoreError),

    /// The approval ledger failed.
    #[error("{0}")]
    Ledger(#[from] LedgerError),

    /// The stage's artifact already exists and regeneration was not
    /// explicitly requested.
    #[error("artifact for stage '{stage}' of project '{project}' already exists; regeneration must be requested explicitly")]
    AlreadyExists {
        /// The project being run.
        project: String,
        /// The stage whose artifact exists.
        stage: Stage,
    },

    /// A generation collaborator failed for a unitary stage, or every
    /// item of an itemized stage failed.
    #[error("generation failed for stage '{stage}': {source}")]
    Generation {
        /// The stage whose collaborator failed.
        stage: Stage,
        /// The underlying collaborator error.
        #[source]
        source: GenerationError,
    },
}

impl PipelineError {
    /// Returns true if the error indicates unreachable storage rather
    /// than an absent artifact or a logic failure.
    #[must_use]
    pub fn is_storage_unavailable(&self) -> bool {
        matches!(
            self,
            Self::Store(StoreError::Unavailable { .. }) | Self::Ledger(LedgerError::Unavailable { .. })
        )
    }
}

/// Error raised when a stage's prerequisite set is not satisfied.
///
/// Raised before any external call is made; the attempted run is not
/// retried automatically.
#[derive(Debug, Clone, Error)]
#[error(
    "stage '{stage}' of project '{project}' is not runnable: missing {missing:?}, unapproved {unapproved:?}"
)]
pub struct PrerequisiteError {
    /// The project being run.
    pub project: String,
    /// The stage that was attempted.
    pub stage: Stage,
    /// Prerequisite stages whose artifact does not exist.
    pub missing: Vec<Stage>,
    /// Prerequisite stages whose artifact exists but is unapproved.
    pub unapproved: Vec<Stage>,
}

/// Error raised when a required input to planning or execution is
/// missing or invalid (e.g. zero-duration audio, absent source URL).
#[derive(Debug, Clone, Error)]
#[error("configuration error: {message}")]
pub struct ConfigurationError {
    /// Description of the invalid input.
    pub message: String,
}

impl ConfigurationError {
    /// Creates a new configuration error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

/// Errors from the artifact store.
///
/// `Missing` means "not yet generated" and is an expected state during
/// orchestration; `Unavailable` means the storage itself failed and
/// always propagates to the caller. Callers must not conflate the two.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The artifact is absent.
    #[error("artifact for stage '{stage}' of project '{project}' does not exist")]
    Missing {
        /// The project queried.
        project: String,
        /// The stage queried.
        stage: Stage,
    },

    /// The underlying storage is unreachable or failed.
    #[error("storage unavailable at '{path}': {source}")]
    Unavailable {
        /// The path the operation targeted.
        path: PathBuf,
        /// The I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// The payload cannot be persisted (e.g. empty content, which the
    /// store would report as non-existent on read-back).
    #[error("refusing to persist artifact for stage '{stage}': {reason}")]
    InvalidPayload {
        /// The stage being written.
        stage: Stage,
        /// Why the payload was rejected.
        reason: String,
    },
}

/// Errors from the approval ledger.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// The ledger storage is unreachable or failed.
    #[error("approval ledger unavailable at '{path}': {source}")]
    Unavailable {
        /// The record path.
        path: PathBuf,
        /// The I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// The persisted record cannot be decoded.
    #[error("approval record for project '{project}' is malformed: {source}")]
    Malformed {
        /// The project whose record failed to decode.
        project: String,
        /// The decode failure.
        #[source]
        source: serde_json::Error,
    },

    /// No record exists for the project.
    #[error("project '{project}' does not exist")]
    UnknownProject {
        /// The missing project.
        project: String,
    },
}

/// An opaque failure from a generation collaborator.
///
/// Collaborators are external; their failures carry no structure the
/// core is allowed to interpret.
#[derive(Debug, Error)]
#[error(transparent)]
pub struct GenerationError(#[from] pub anyhow::Error);

impl GenerationError {
    /// Creates a generation error from a message.
    #[must_use]
    pub fn msg(message: impl Into<String>) -> Self {
        Self(anyhow::anyhow!(message.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prerequisite_error_names_stages() {
        let err = PrerequisiteError {
            project: "demo".to_string(),
            stage: Stage::ImagePrompts,
            missing: vec![Stage::Audio],
            unapproved: vec![Stage::Script],
        };
        let text = err.to_string();
        assert!(text.contains("image_prompts"));
        assert!(text.contains("Audio"));
        assert!(text.contains("Script"));
    }

    #[test]
    fn test_storage_unavailable_detection() {
        let unavailable: PipelineError = StoreError::Unavailable {
            path: PathBuf::from("/projects/demo"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        }
        .into();
        assert!(unavailable.is_storage_unavailable());

        let missing: PipelineError = StoreError::Missing {
            project: "demo".to_string(),
            stage: Stage::Audio,
        }
        .into();
        assert!(!missing.is_storage_unavailable());
    }

    #[test]
    fn test_generation_error_wraps_message() {
        let err = GenerationError::msg("model overloaded");
        assert_eq!(err.to_string(), "model overloaded");
    }
}
