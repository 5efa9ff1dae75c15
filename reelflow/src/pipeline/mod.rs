//! Stage graph and top-level orchestration.
//!
//! The orchestrator is the only component that knows stage ordering
//! semantics. UI layers call [`Pipeline::runnable_stages`],
//! [`Pipeline::run_stage`], and [`Pipeline::approve`]/[`Pipeline::revoke`]
//! and must embed no ordering or partial-failure logic of their own.

mod graph;

pub use graph::StageGraph;

use crate::config::PipelineConfig;
use crate::core::{Stage, StageReport};
use crate::errors::PipelineError;
use crate::generate::Collaborators;
use crate::ledger::ApprovalLedger;
use crate::runner::{RunOptions, StageRunner};
use crate::store::ArtifactStore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

/// Observability row: one stage's state within a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageStatus {
    /// The stage.
    pub stage: Stage,
    /// Whether the stage's artifact exists (derived from the store,
    /// never stored).
    pub exists: bool,
    /// Whether the stage is approved (from the ledger).
    pub approved: bool,
}

/// Why an approval is considered stale by the integrity check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StaleReason {
    /// The approved artifact no longer exists.
    ArtifactMissing,
    /// The artifact's content changed since approval was granted.
    ContentChanged,
}

/// An approved stage whose artifact diverged out-of-band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaleApproval {
    /// The stage with the stale approval.
    pub stage: Stage,
    /// What diverged.
    pub reason: StaleReason,
}

/// The top-level orchestrator over the fixed production graph.
#[derive(Clone)]
pub struct Pipeline {
    graph: Arc<StageGraph>,
    store: Arc<dyn ArtifactStore>,
    ledger: Arc<dyn ApprovalLedger>,
    runner: StageRunner,
}

impl Pipeline {
    /// Creates an orchestrator over the given services.
    #[must_use]
    pub fn new(
        store: Arc<dyn ArtifactStore>,
        ledger: Arc<dyn ApprovalLedger>,
        collaborators: Collaborators,
    ) -> Self {
        let graph = Arc::new(StageGraph::production());
        let runner = StageRunner::new(
            Arc::clone(&graph),
            Arc::clone(&store),
            Arc::clone(&ledger),
            collaborators,
        );
        Self { graph, store, ledger, runner }
    }

    /// The stage dependency graph.
    #[must_use]
    pub fn graph(&self) -> &StageGraph {
        &self.graph
    }

    /// Creates a project explicitly. Idempotent on the storage
    /// location; an existing approval record is left untouched.
    /// Projects are never created implicitly by other operations.
    pub fn create_project(&self, project: &str) -> Result<(), PipelineError> {
        self.store.create_project(project)?;
        let record = self.ledger.load(project)?;
        self.ledger.store(&record)?;
        info!(project, "project created");
        Ok(())
    }

    /// Lists known projects, sorted by name.
    pub fn list_projects(&self) -> Result<Vec<String>, PipelineError> {
        Ok(self.store.list_projects()?)
    }

    /// Every stage whose full prerequisite set is `{exists, approved}`
    /// and whose own artifact does not yet exist.
    ///
    /// Regenerating a stage that already has an artifact is not listed
    /// here; it goes through [`Pipeline::run_stage`] with
    /// [`RunOptions::with_force`], which then revokes the stage's own
    /// and all downstream approvals.
    pub fn runnable_stages(&self, project: &str) -> Result<Vec<Stage>, PipelineError> {
        let record = self.ledger.load(project)?;
        let mut runnable = Vec::new();
        for stage in self.graph.stages() {
            if self.store.exists(project, stage)? {
                continue;
            }
            let mut ready = true;
            for &dep in self.graph.prerequisites(stage) {
                if !self.store.exists(project, dep)? || !record.is_approved(dep) {
                    ready = false;
                    break;
                }
            }
            if ready {
                runnable.push(stage);
            }
        }
        Ok(runnable)
    }

    /// Full per-stage state in pipeline order.
    pub fn project_status(&self, project: &str) -> Result<Vec<StageStatus>, PipelineError> {
        let record = self.ledger.load(project)?;
        let mut rows = Vec::new();
        for stage in self.graph.stages() {
            rows.push(StageStatus {
                stage,
                exists: self.store.exists(project, stage)?,
                approved: record.is_approved(stage),
            });
        }
        Ok(rows)
    }

    /// Approves a stage, recording the artifact's content fingerprint.
    ///
    /// The artifact must exist; approving a stage that was never
    /// generated is a [`StoreError::Missing`](crate::errors::StoreError)
    /// failure.
    pub fn approve(&self, project: &str, stage: Stage) -> Result<(), PipelineError> {
        let payload = self.store.read(project, stage)?;
        let mut record = self.ledger.load(project)?;
        record.set_approved(stage, true);
        record.set_fingerprint(stage, payload.fingerprint());
        self.ledger.store(&record)?;
        info!(project, stage = %stage, "stage approved");
        Ok(())
    }

    /// Revokes a stage's approval and every transitively downstream
    /// approval. Artifacts are never touched.
    pub fn revoke(&self, project: &str, stage: Stage) -> Result<(), PipelineError> {
        let mut record = self.ledger.load(project)?;
        for affected in self.graph.invalidation_set(stage) {
            record.set_approved(affected, false);
        }
        self.ledger.store(&record)?;
        info!(project, stage = %stage, "approval revoked");
        Ok(())
    }

    /// Integrity check: reports approved stages whose artifact is
    /// missing or whose content changed since approval.
    ///
    /// The divergence is reported, never enforced — nothing is revoked
    /// and reads stay lenient. Callers decide what to do with the
    /// findings.
    pub fn verify_approvals(&self, project: &str) -> Result<Vec<StaleApproval>, PipelineError> {
        let record = self.ledger.load(project)?;
        let mut stale = Vec::new();
        for stage in self.graph.stages() {
            if !record.is_approved(stage) {
                continue;
            }
            if !self.store.exists(project, stage)? {
                stale.push(StaleApproval { stage, reason: StaleReason::ArtifactMissing });
                continue;
            }
            if let Some(expected) = record.fingerprint(stage) {
                let actual = self.store.read(project, stage)?.fingerprint();
                if actual != expected {
                    stale.push(StaleApproval { stage, reason: StaleReason::ContentChanged });
                }
            }
        }
        Ok(stale)
    }

    /// Runs one stage. Configuration is taken as a call-time value:
    /// callers re-load it before each invocation, so edits apply on the
    /// next run without shared global state.
    pub async fn run_stage(
        &self,
        project: &str,
        stage: Stage,
        config: &PipelineConfig,
        options: &RunOptions,
    ) -> Result<StageReport, PipelineError> {
        self.runner.run(project, stage, config, options).await
    }
}
