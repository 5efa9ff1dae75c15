//! # Reelflow
//!
//! A stage-dependency orchestrator and resumable file-based state
//! machine for multi-stage content production: a source input is
//! transformed through a fixed sequence of derived artifacts
//! (transcript → script → audio → metadata/images → final video),
//! each produced by an external generation service.
//!
//! The core guarantees:
//!
//! - **At most one terminal artifact per stage**: artifacts land in one
//!   atomic write; a reader never observes a partial artifact.
//! - **Approval-gated ordering**: a stage runs only once every upstream
//!   stage exists *and* was explicitly approved, including the fan-out
//!   after Script and the reconvergence at ImagePrompts and Video.
//! - **Derived parameters**: stage inputs computed from upstream
//!   artifact properties (image count from narration duration) are
//!   re-derived on every run, never cached.
//! - **Partial-failure isolation**: one failed item inside an itemized
//!   stage is logged and excluded without aborting the stage, and the
//!   report always distinguishes partial from full success.
//! - **Resumability**: all durable state is the artifacts themselves
//!   plus one approval record per project; a restarted process picks up
//!   exactly where the files say it left off.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use reelflow::prelude::*;
//!
//! let store = Arc::new(FsArtifactStore::new("projects"));
//! let ledger = Arc::new(FsApprovalLedger::new("projects"));
//! let pipeline = Pipeline::new(store, ledger, collaborators);
//!
//! pipeline.create_project("MyNewVideo")?;
//! let config = PipelineConfig::load("config/config.json")?;
//! for stage in pipeline.runnable_stages("MyNewVideo")? {
//!     let report = pipeline.run_stage("MyNewVideo", stage, &config, &RunOptions::new()).await?;
//!     println!("{}", report.summary());
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, missing_docs, rust_2018_idioms)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod chunk;
pub mod config;
pub mod core;
pub mod errors;
pub mod generate;
pub mod ledger;
pub mod pipeline;
pub mod planner;
pub mod runner;
pub mod store;
pub mod testing;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::chunk::{reassemble_bytes, reassemble_text, split, ChunkPlan};
    pub use crate::config::{ModelChoice, PipelineConfig, TtsChoice, TtsVoice};
    pub use crate::core::{ArtifactPayload, BundleItem, ItemFailure, Stage, StageReport};
    pub use crate::errors::{
        ConfigurationError, GenerationError, LedgerError, PipelineError, PrerequisiteError,
        StoreError,
    };
    pub use crate::generate::{
        Collaborators, Generate, GenerateItem, GenerateRequest, GenerationSettings, ItemRequest,
        MeasureProbe, NoRetry, RetryPolicy,
    };
    pub use crate::ledger::{ApprovalLedger, FsApprovalLedger, ProjectRecord};
    pub use crate::pipeline::{Pipeline, StageGraph, StageStatus, StaleApproval, StaleReason};
    pub use crate::planner::{plan_item_count, plan_partition};
    pub use crate::runner::{RunOptions, StageRunner};
    pub use crate::store::{ArtifactStore, FsArtifactStore};
}
