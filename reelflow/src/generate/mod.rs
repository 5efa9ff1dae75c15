//! External generation collaborators.
//!
//! Every stage's content is produced by an external service (speech
//! recognition, language model prompting, speech synthesis, image
//! synthesis, video rendering). The core treats each one as an opaque
//! function of its inputs: it never inspects, retries, or interprets
//! collaborator internals. Anything a collaborator needs to vary per
//! call — model id, voice, language — travels inside the request, never
//! as hidden collaborator state.

use crate::core::{ArtifactPayload, Stage};
use crate::errors::GenerationError;
use async_trait::async_trait;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Per-request settings snapshot, taken from the pipeline configuration
/// at call time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationSettings {
    /// Model id for model-backed collaborators.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Voice id for speech synthesis.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice: Option<String>,
    /// Language code for speech synthesis.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

/// Request for a unitary generation.
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    /// The project being generated for.
    pub project: String,
    /// The stage being generated.
    pub stage: Stage,
    /// Settings snapshot for this call.
    pub settings: GenerationSettings,
    /// Upstream artifacts, keyed by the stage that produced them.
    pub inputs: HashMap<Stage, ArtifactPayload>,
    /// Free-form run parameters (e.g. the source URL for transcription).
    pub params: HashMap<String, serde_json::Value>,
}

/// One item of an itemized generation (a synthesis chunk, a text
/// segment to prompt on, a prompt to render).
#[derive(Debug, Clone)]
pub struct ItemRequest {
    /// The project being generated for.
    pub project: String,
    /// The stage being generated.
    pub stage: Stage,
    /// Settings snapshot for this call.
    pub settings: GenerationSettings,
    /// 1-based position of the item in the planned input.
    pub index: usize,
    /// Total number of planned items.
    pub total: usize,
    /// The item content.
    pub item: String,
}

/// A unitary generation collaborator.
#[async_trait]
pub trait Generate: Send + Sync {
    /// Produces the stage's payload from its inputs.
    async fn generate(&self, request: GenerateRequest) -> Result<ArtifactPayload, GenerationError>;
}

/// An itemized generation collaborator, called once per item.
#[async_trait]
pub trait GenerateItem: Send + Sync {
    /// Produces one item's payload.
    async fn generate_one(&self, request: ItemRequest) -> Result<ArtifactPayload, GenerationError>;
}

/// Measures a numeric property of an artifact (e.g. audio seconds).
/// Used only by derived-parameter planning.
pub trait MeasureProbe: Send + Sync {
    /// Returns the measured value.
    fn measure(&self, payload: &ArtifactPayload) -> Result<f64, GenerationError>;
}

/// The full set of collaborators the runner dispatches to.
#[derive(Clone)]
pub struct Collaborators {
    /// Produces the Input transcript from a source parameter.
    pub transcriber: Arc<dyn Generate>,
    /// Turns the transcript into a narration script.
    pub script_writer: Arc<dyn Generate>,
    /// Synthesizes one audio chunk per call.
    pub speech: Arc<dyn GenerateItem>,
    /// Produces publishing metadata from the script.
    pub metadata: Arc<dyn Generate>,
    /// Produces one visual prompt per script segment.
    pub prompter: Arc<dyn GenerateItem>,
    /// Renders one image per prompt.
    pub imager: Arc<dyn GenerateItem>,
    /// Composes the final video from audio and images.
    pub composer: Arc<dyn Generate>,
    /// Measures audio duration in seconds.
    pub audio_probe: Arc<dyn MeasureProbe>,
}

/// An external call the retry policy may invoke one or more times.
pub type GenerateOp<'a> =
    Box<dyn Fn() -> BoxFuture<'a, Result<ArtifactPayload, GenerationError>> + Send + Sync + 'a>;

/// Seam for caller-injected retry behavior around external calls.
///
/// The core ships no retry or backoff policy of its own; it routes
/// every collaborator call through the policy it was handed and knows
/// nothing else about it.
#[async_trait]
pub trait RetryPolicy: Send + Sync {
    /// Runs the operation, invoking it again on failure if the policy
    /// chooses to.
    async fn run(&self, op: GenerateOp<'_>) -> Result<ArtifactPayload, GenerationError>;
}

/// The default policy: a single attempt, no retry.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRetry;

#[async_trait]
impl RetryPolicy for NoRetry {
    async fn run(&self, op: GenerateOp<'_>) -> Result<ArtifactPayload, GenerationError> {
        op().await
    }
}
