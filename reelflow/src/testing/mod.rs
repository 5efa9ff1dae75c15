//! Mock collaborators and fixtures for tests.
//!
//! Generation collaborators are external services; tests exercise the
//! orchestration core against deterministic in-process stand-ins wired
//! to a throwaway projects directory.

use crate::config::PipelineConfig;
use crate::core::{ArtifactPayload, Stage};
use crate::errors::GenerationError;
use crate::generate::{Collaborators, Generate, GenerateItem, GenerateRequest, ItemRequest, MeasureProbe};
use crate::ledger::{ApprovalLedger, FsApprovalLedger};
use crate::pipeline::{Pipeline, StageGraph};
use crate::runner::StageRunner;
use crate::store::{ArtifactStore, FsArtifactStore};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Counts collaborator invocations across a fixture.
#[derive(Debug, Default)]
pub struct CallCounter(AtomicUsize);

impl CallCounter {
    /// Records one invocation.
    pub fn increment(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }

    /// Total invocations so far.
    #[must_use]
    pub fn total(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

struct FnGenerate<F> {
    func: F,
    calls: Arc<CallCounter>,
}

#[async_trait]
impl<F> Generate for FnGenerate<F>
where
    F: Fn(GenerateRequest) -> Result<ArtifactPayload, GenerationError> + Send + Sync,
{
    async fn generate(&self, request: GenerateRequest) -> Result<ArtifactPayload, GenerationError> {
        self.calls.increment();
        (self.func)(request)
    }
}

struct FnGenerateItem<F> {
    func: F,
    calls: Arc<CallCounter>,
}

#[async_trait]
impl<F> GenerateItem for FnGenerateItem<F>
where
    F: Fn(ItemRequest) -> Result<ArtifactPayload, GenerationError> + Send + Sync,
{
    async fn generate_one(&self, request: ItemRequest) -> Result<ArtifactPayload, GenerationError> {
        self.calls.increment();
        (self.func)(request)
    }
}

/// Speech mock whose later chunks finish first, so tests exercise the
/// index-ordered reassembly guarantee. Output is the 1-based chunk
/// index followed by the chunk text bytes.
struct StaggeredSpeech {
    calls: Arc<CallCounter>,
}

#[async_trait]
impl GenerateItem for StaggeredSpeech {
    async fn generate_one(&self, request: ItemRequest) -> Result<ArtifactPayload, GenerationError> {
        self.calls.increment();
        let delay = u64::try_from(request.total.saturating_sub(request.index)).unwrap_or(0) * 5;
        tokio::time::sleep(Duration::from_millis(delay)).await;

        let mut bytes = vec![u8::try_from(request.index).unwrap_or(u8::MAX)];
        bytes.extend_from_slice(request.item.as_bytes());
        Ok(ArtifactPayload::Bytes(bytes))
    }
}

/// Probe that reads one artifact byte as one second of audio, letting
/// tests control measured duration through seeded payload length.
struct BytesAsSecondsProbe;

impl MeasureProbe for BytesAsSecondsProbe {
    fn measure(&self, payload: &ArtifactPayload) -> Result<f64, GenerationError> {
        match payload.as_bytes() {
            #[allow(clippy::cast_precision_loss)]
            Some(bytes) => Ok(bytes.len() as f64),
            None => Err(GenerationError::msg("cannot measure a non-binary payload")),
        }
    }
}

/// A unitary mock that always returns the given text.
#[must_use]
pub fn scripted(text: impl Into<String>) -> Arc<dyn Generate> {
    let text = text.into();
    Arc::new(FnGenerate {
        calls: Arc::new(CallCounter::default()),
        func: move |_request: GenerateRequest| Ok(ArtifactPayload::Text(text.clone())),
    })
}

/// An itemized mock that fails every item.
#[must_use]
pub fn failing_items() -> Arc<dyn GenerateItem> {
    Arc::new(FnGenerateItem {
        calls: Arc::new(CallCounter::default()),
        func: |request: ItemRequest| -> Result<ArtifactPayload, GenerationError> {
            Err(GenerationError::msg(format!("item {} refused", request.index)))
        },
    })
}

/// An image mock that fails exactly one 1-based item index and renders
/// marker bytes for the rest.
#[must_use]
pub fn failing_item_at(failed_index: usize) -> Arc<dyn GenerateItem> {
    Arc::new(FnGenerateItem {
        calls: Arc::new(CallCounter::default()),
        func: move |request: ItemRequest| {
            if request.index == failed_index {
                Err(GenerationError::msg("generation quota exhausted"))
            } else {
                let mut bytes = b"\x89PNG".to_vec();
                bytes.push(u8::try_from(request.index).unwrap_or(u8::MAX));
                Ok(ArtifactPayload::Bytes(bytes))
            }
        },
    })
}

/// A probe reporting a fixed duration regardless of payload.
#[must_use]
pub fn fixed_duration(seconds: f64) -> Arc<dyn MeasureProbe> {
    struct Fixed(f64);
    impl MeasureProbe for Fixed {
        fn measure(&self, _payload: &ArtifactPayload) -> Result<f64, GenerationError> {
            Ok(self.0)
        }
    }
    Arc::new(Fixed(seconds))
}

fn default_collaborators(calls: &Arc<CallCounter>) -> Collaborators {
    Collaborators {
        transcriber: Arc::new(FnGenerate {
            calls: Arc::clone(calls),
            func: |request: GenerateRequest| {
                let source = request
                    .params
                    .get("source")
                    .and_then(serde_json::Value::as_str)
                    .unwrap_or("unknown");
                Ok(ArtifactPayload::Text(format!("transcript of {source}")))
            },
        }),
        script_writer: Arc::new(FnGenerate {
            calls: Arc::clone(calls),
            func: |_request: GenerateRequest| {
                Ok(ArtifactPayload::Text(
                    "A tight narration script.\n\nSecond paragraph for pacing.".to_string(),
                ))
            },
        }),
        speech: Arc::new(StaggeredSpeech { calls: Arc::clone(calls) }),
        metadata: Arc::new(FnGenerate {
            calls: Arc::clone(calls),
            func: |_request: GenerateRequest| {
                Ok(ArtifactPayload::Text(
                    r##"{"titles":["A Demo"],"description":"About the demo.","hashtags":["#demo"]}"##.to_string(),
                ))
            },
        }),
        prompter: Arc::new(FnGenerateItem {
            calls: Arc::clone(calls),
            func: |request: ItemRequest| {
                let gist: String = request.item.split_whitespace().take(4).collect::<Vec<_>>().join(" ");
                Ok(ArtifactPayload::Text(format!("A photorealistic scene of {gist}")))
            },
        }),
        imager: Arc::new(FnGenerateItem {
            calls: Arc::clone(calls),
            func: |request: ItemRequest| {
                let mut bytes = b"\x89PNG".to_vec();
                bytes.push(u8::try_from(request.index).unwrap_or(u8::MAX));
                Ok(ArtifactPayload::Bytes(bytes))
            },
        }),
        composer: Arc::new(FnGenerate {
            calls: Arc::clone(calls),
            func: |request: GenerateRequest| {
                let audio_len = request
                    .inputs
                    .get(&Stage::Audio)
                    .map_or(0, ArtifactPayload::len);
                let mut bytes = b"ftypmp42".to_vec();
                bytes.extend_from_slice(&u64::try_from(audio_len).unwrap_or(0).to_be_bytes());
                Ok(ArtifactPayload::Bytes(bytes))
            },
        }),
        audio_probe: Arc::new(BytesAsSecondsProbe),
    }
}

/// A full orchestration fixture on a throwaway projects directory.
pub struct Fixture {
    /// Keeps the temp directory alive for the fixture's lifetime.
    pub dir: tempfile::TempDir,
    /// Store rooted inside the temp directory.
    pub store: Arc<FsArtifactStore>,
    /// Ledger sharing the store's root.
    pub ledger: Arc<FsApprovalLedger>,
    /// The production graph.
    pub graph: Arc<StageGraph>,
    /// Default configuration, cloneable and editable per test.
    pub config: PipelineConfig,
    /// Counts default-collaborator invocations.
    pub calls: Arc<CallCounter>,
    collaborators: Collaborators,
}

impl Fixture {
    /// Creates a fixture with deterministic default collaborators.
    #[must_use]
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap_or_else(|e| panic!("cannot create temp dir: {e}"));
        let root = dir.path().join("projects");
        let calls = Arc::new(CallCounter::default());
        Self {
            store: Arc::new(FsArtifactStore::new(&root)),
            ledger: Arc::new(FsApprovalLedger::new(&root)),
            graph: Arc::new(StageGraph::production()),
            config: PipelineConfig::default(),
            collaborators: default_collaborators(&calls),
            calls,
            dir,
        }
    }

    /// Replaces the script writer.
    #[must_use]
    pub fn with_script_writer(mut self, collaborator: Arc<dyn Generate>) -> Self {
        self.collaborators.script_writer = collaborator;
        self
    }

    /// Replaces the speech synthesizer.
    #[must_use]
    pub fn with_speech(mut self, collaborator: Arc<dyn GenerateItem>) -> Self {
        self.collaborators.speech = collaborator;
        self
    }

    /// Replaces the prompter.
    #[must_use]
    pub fn with_prompter(mut self, collaborator: Arc<dyn GenerateItem>) -> Self {
        self.collaborators.prompter = collaborator;
        self
    }

    /// Replaces the imager.
    #[must_use]
    pub fn with_imager(mut self, collaborator: Arc<dyn GenerateItem>) -> Self {
        self.collaborators.imager = collaborator;
        self
    }

    /// Replaces the audio probe.
    #[must_use]
    pub fn with_probe(mut self, probe: Arc<dyn MeasureProbe>) -> Self {
        self.collaborators.audio_probe = probe;
        self
    }

    /// Builds a runner over the fixture's services.
    #[must_use]
    pub fn runner(&self) -> StageRunner {
        let store: Arc<dyn ArtifactStore> = self.store.clone();
        let ledger: Arc<dyn ApprovalLedger> = self.ledger.clone();
        StageRunner::new(Arc::clone(&self.graph), store, ledger, self.collaborators.clone())
    }

    /// Builds the orchestrator over the fixture's services.
    #[must_use]
    pub fn pipeline(&self) -> Pipeline {
        let store: Arc<dyn ArtifactStore> = self.store.clone();
        let ledger: Arc<dyn ApprovalLedger> = self.ledger.clone();
        Pipeline::new(store, ledger, self.collaborators.clone())
    }

    /// Creates a project directory.
    pub fn create_project(&self, project: &str) {
        self.store
            .create_project(project)
            .unwrap_or_else(|e| panic!("cannot create project: {e}"));
    }

    /// Seeds a text artifact without approving it.
    pub fn seed_text(&self, project: &str, stage: Stage, text: &str) {
        self.store
            .write(project, stage, &ArtifactPayload::from(text))
            .unwrap_or_else(|e| panic!("cannot seed {stage}: {e}"));
    }

    /// Seeds a binary artifact without approving it.
    pub fn seed_bytes(&self, project: &str, stage: Stage, bytes: Vec<u8>) {
        self.store
            .write(project, stage, &ArtifactPayload::Bytes(bytes))
            .unwrap_or_else(|e| panic!("cannot seed {stage}: {e}"));
    }

    /// Marks a stage approved.
    pub fn approve(&self, project: &str, stage: Stage) {
        self.ledger
            .set_approval(project, stage, true)
            .unwrap_or_else(|e| panic!("cannot approve {stage}: {e}"));
    }

    /// Seeds a text artifact and approves it.
    pub fn seed_approved(&self, project: &str, stage: Stage, text: &str) {
        self.seed_text(project, stage, text);
        self.approve(project, stage);
    }
}

impl Default for Fixture {
    fn default() -> Self {
        Self::new()
    }
}
