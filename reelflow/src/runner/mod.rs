//! Stage execution.
//!
//! One runner invocation drives a single stage through
//! `CheckPrerequisites -> Execute -> Persist -> Report`. Prerequisite
//! and configuration failures abort before any external call is made;
//! item failures inside an itemized stage are recovered at the item
//! boundary; the artifact is persisted in one atomic write only after
//! every item has been collected.

use crate::chunk;
use crate::config::PipelineConfig;
use crate::core::{ArtifactPayload, BundleItem, ItemFailure, Stage, StageReport};
use crate::errors::{ConfigurationError, PipelineError, PrerequisiteError, StoreError};
use crate::generate::{
    Collaborators, Generate, GenerateItem, GenerateOp, GenerateRequest, GenerationSettings,
    ItemRequest, NoRetry, RetryPolicy,
};
use crate::ledger::ApprovalLedger;
use crate::pipeline::StageGraph;
use crate::store::ArtifactStore;
use chrono::Utc;
use futures::StreamExt;
use regex::Regex;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use tracing::{info, warn};
use uuid::Uuid;

/// Paragraph boundary used when chunking narration text for synthesis.
pub const PARAGRAPH_BOUNDARY: &str = "\n\n";

/// Per-run options supplied by the caller.
#[derive(Clone)]
pub struct RunOptions {
    /// Regenerate even though the stage's artifact already exists.
    /// Regeneration revokes the stage's own approval and every
    /// transitively downstream approval once the new artifact lands.
    pub force: bool,
    /// Free-form parameters forwarded to the collaborator (e.g. the
    /// transcription source).
    pub params: HashMap<String, serde_json::Value>,
    /// Retry behavior around external calls. Defaults to a single
    /// attempt.
    pub retry: Arc<dyn RetryPolicy>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            force: false,
            params: HashMap::new(),
            retry: Arc::new(NoRetry),
        }
    }
}

impl RunOptions {
    /// Creates default options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests regeneration of an existing artifact.
    #[must_use]
    pub fn with_force(mut self) -> Self {
        self.force = true;
        self
    }

    /// Adds a run parameter.
    #[must_use]
    pub fn with_param(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.params.insert(key.into(), value);
        self
    }

    /// Injects a retry policy around external calls.
    #[must_use]
    pub fn with_retry(mut self, retry: Arc<dyn RetryPolicy>) -> Self {
        self.retry = retry;
        self
    }
}

/// Outcome of the execute phase, before persistence.
struct Execution {
    payload: ArtifactPayload,
    requested: usize,
    produced: usize,
    failures: Vec<ItemFailure>,
}

impl Execution {
    fn unitary(payload: ArtifactPayload) -> Self {
        Self { payload, requested: 1, produced: 1, failures: Vec::new() }
    }
}

/// Executes single stages against the store, ledger, and collaborators.
#[derive(Clone)]
pub struct StageRunner {
    graph: Arc<StageGraph>,
    store: Arc<dyn ArtifactStore>,
    ledger: Arc<dyn ApprovalLedger>,
    collaborators: Collaborators,
}

impl StageRunner {
    /// Creates a new runner.
    #[must_use]
    pub fn new(
        graph: Arc<StageGraph>,
        store: Arc<dyn ArtifactStore>,
        ledger: Arc<dyn ApprovalLedger>,
        collaborators: Collaborators,
    ) -> Self {
        Self { graph, store, ledger, collaborators }
    }

    /// Runs one stage to completion and reports the outcome.
    ///
    /// Blocks (in the async sense) until the external collaborator
    /// returns; these calls run from seconds to tens of minutes.
    /// Approval state is never granted here — on success the stage's
    /// own approval and all downstream approvals are revoked, since the
    /// artifact they vouched for has been replaced.
    pub async fn run(
        &self,
        project: &str,
        stage: Stage,
        config: &PipelineConfig,
        options: &RunOptions,
    ) -> Result<StageReport, PipelineError> {
        let started_at = Utc::now();
        let run_id = Uuid::new_v4();

        config.validate()?;
        self.check_prerequisites(project, stage, options.force)?;
        info!(project, stage = %stage, %run_id, "stage started");

        let execution = self.execute(project, stage, config, options).await?;
        let artifact = self.store.write(project, stage, &execution.payload)?;
        self.invalidate_approvals(project, stage)?;

        let report = StageReport {
            run_id,
            project: project.to_string(),
            stage,
            artifact,
            requested: execution.requested,
            produced: execution.produced,
            failures: execution.failures,
            started_at,
            finished_at: Utc::now(),
        };
        info!(
            project,
            stage = %stage,
            requested = report.requested,
            produced = report.produced,
            duration_ms = report.duration_ms(),
            "stage finished"
        );
        Ok(report)
    }

    /// Synchronous gate ahead of any external call: every prerequisite
    /// must exist and be approved, and an existing artifact blocks the
    /// run unless regeneration was requested.
    fn check_prerequisites(&self, project: &str, stage: Stage, force: bool) -> Result<(), PipelineError> {
        let record = self.ledger.load(project)?;

        let mut missing = Vec::new();
        let mut unapproved = Vec::new();
        for &dep in self.graph.prerequisites(stage) {
            if !self.store.exists(project, dep)? {
                missing.push(dep);
            } else if !record.is_approved(dep) {
                unapproved.push(dep);
            }
        }
        if !missing.is_empty() || !unapproved.is_empty() {
            return Err(PrerequisiteError {
                project: project.to_string(),
                stage,
                missing,
                unapproved,
            }
            .into());
        }

        if self.store.exists(project, stage)? && !force {
            return Err(PipelineError::AlreadyExists { project: project.to_string(), stage });
        }
        Ok(())
    }

    async fn execute(
        &self,
        project: &str,
        stage: Stage,
        config: &PipelineConfig,
        options: &RunOptions,
    ) -> Result<Execution, PipelineError> {
        match stage {
            Stage::Input => self.execute_input(project, options).await,
            Stage::Script => self.execute_script(project, config, options).await,
            Stage::Audio => self.execute_audio(project, config, options).await,
            Stage::Metadata => self.execute_metadata(project, config, options).await,
            Stage::ImagePrompts => self.execute_image_prompts(project, config, options).await,
            Stage::Images => self.execute_images(project, config, options).await,
            Stage::Video => self.execute_video(project, options).await,
        }
    }

    async fn execute_input(&self, project: &str, options: &RunOptions) -> Result<Execution, PipelineError> {
        let source = options.params.get("source").and_then(serde_json::Value::as_str);
        if source.is_none() {
            return Err(ConfigurationError::new(
                "transcription requires a 'source' run parameter",
            )
            .into());
        }

        let request = GenerateRequest {
            project: project.to_string(),
            stage: Stage::Input,
            settings: GenerationSettings::default(),
            inputs: HashMap::new(),
            params: options.params.clone(),
        };
        let payload = self
            .call_unitary(&self.collaborators.transcriber, request, &options.retry, Stage::Input)
            .await?;
        expect_text(&payload, Stage::Input)?;
        Ok(Execution::unitary(payload))
    }

    async fn execute_script(
        &self,
        project: &str,
        config: &PipelineConfig,
        options: &RunOptions,
    ) -> Result<Execution, PipelineError> {
        let transcript = self.store.read(project, Stage::Input)?;
        let request = GenerateRequest {
            project: project.to_string(),
            stage: Stage::Script,
            settings: settings_for(Stage::Script, config),
            inputs: HashMap::from([(Stage::Input, transcript)]),
            params: options.params.clone(),
        };
        let payload = self
            .call_unitary(&self.collaborators.script_writer, request, &options.retry, Stage::Script)
            .await?;
        expect_text(&payload, Stage::Script)?;
        Ok(Execution::unitary(payload))
    }

    async fn execute_audio(
        &self,
        project: &str,
        config: &PipelineConfig,
        options: &RunOptions,
    ) -> Result<Execution, PipelineError> {
        let script = self.read_text(project, Stage::Script)?;
        let plan = chunk::split(&script, config.chunk_limit, PARAGRAPH_BOUNDARY);
        let requested = plan.len();
        info!(project, chunks = requested, "script split for synthesis");

        let (successes, mut failures) = self
            .run_items(
                &self.collaborators.speech,
                project,
                Stage::Audio,
                settings_for(Stage::Audio, config),
                plan.into_chunks(),
                config.item_concurrency,
                &options.retry,
            )
            .await;

        let mut indexed = Vec::with_capacity(successes.len());
        for (position, payload) in successes {
            match payload {
                ArtifactPayload::Bytes(bytes) => indexed.push((position, bytes)),
                _ => failures.push(ItemFailure::new(position + 1, "collaborator returned a non-binary chunk")),
            }
        }
        failures.sort_by_key(|f| f.index);

        let produced = indexed.len();
        if produced == 0 {
            return Err(all_items_failed(Stage::Audio, requested));
        }
        Ok(Execution {
            payload: ArtifactPayload::Bytes(chunk::reassemble_bytes(indexed)),
            requested,
            produced,
            failures,
        })
    }

    async fn execute_metadata(
        &self,
        project: &str,
        config: &PipelineConfig,
        options: &RunOptions,
    ) -> Result<Execution, PipelineError> {
        let script = self.store.read(project, Stage::Script)?;
        let request = GenerateRequest {
            project: project.to_string(),
            stage: Stage::Metadata,
            settings: settings_for(Stage::Metadata, config),
            inputs: HashMap::from([(Stage::Script, script)]),
            params: options.params.clone(),
        };
        let payload = self
            .call_unitary(&self.collaborators.metadata, request, &options.retry, Stage::Metadata)
            .await?;
        expect_text(&payload, Stage::Metadata)?;
        Ok(Execution::unitary(payload))
    }

    async fn execute_image_prompts(
        &self,
        project: &str,
        config: &PipelineConfig,
        options: &RunOptions,
    ) -> Result<Execution, PipelineError> {
        let script = self.read_text(project, Stage::Script)?;
        let audio = self.store.read(project, Stage::Audio)?;

        let seconds = self
            .collaborators
            .audio_probe
            .measure(&audio)
            .map_err(|source| PipelineError::Generation { stage: Stage::ImagePrompts, source })?;
        let count = crate::planner::plan_item_count(seconds, config.seconds_per_image)?;
        info!(project, seconds, count, "derived image count from narration length");

        let segments = crate::planner::plan_partition(&script, count);
        if segments.is_empty() {
            return Err(ConfigurationError::new("script has no words to derive prompts from").into());
        }
        let items: Vec<String> = segments.iter().map(|s| s.trim().to_string()).collect();
        let requested = items.len();

        let (successes, mut failures) = self
            .run_items(
                &self.collaborators.prompter,
                project,
                Stage::ImagePrompts,
                settings_for(Stage::ImagePrompts, config),
                items,
                config.item_concurrency,
                &options.retry,
            )
            .await;

        let mut prompts = Vec::with_capacity(successes.len());
        for (position, payload) in successes {
            match payload.as_text() {
                Some(text) => prompts.push(text.trim().to_string()),
                None => failures.push(ItemFailure::new(position + 1, "collaborator returned a non-text prompt")),
            }
        }
        failures.sort_by_key(|f| f.index);

        let produced = prompts.len();
        if produced == 0 {
            return Err(all_items_failed(Stage::ImagePrompts, requested));
        }

        let lines: Vec<String> = prompts
            .iter()
            .enumerate()
            .map(|(i, prompt)| format!("{}. {prompt}", i + 1))
            .collect();
        Ok(Execution {
            payload: ArtifactPayload::Text(lines.join("\n")),
            requested,
            produced,
            failures,
        })
    }

    async fn execute_images(
        &self,
        project: &str,
        config: &PipelineConfig,
        options: &RunOptions,
    ) -> Result<Execution, PipelineError> {
        let prompts_text = self.read_text(project, Stage::ImagePrompts)?;
        let prompts = parse_numbered_prompts(&prompts_text);
        if prompts.is_empty() {
            return Err(ConfigurationError::new("no numbered prompts found in the prompts artifact").into());
        }
        let requested = prompts.len();

        let (successes, mut failures) = self
            .run_items(
                &self.collaborators.imager,
                project,
                Stage::Images,
                settings_for(Stage::Images, config),
                prompts.clone(),
                config.item_concurrency,
                &options.retry,
            )
            .await;

        let mut items = Vec::with_capacity(successes.len() + 1);
        let mut manifest = Vec::with_capacity(successes.len());
        for (position, payload) in successes {
            match payload {
                ArtifactPayload::Bytes(bytes) => {
                    let name = format!("{:03}.png", position + 1);
                    manifest.push(serde_json::json!({
                        "index": position + 1,
                        "prompt": prompts[position],
                        "file": name,
                    }));
                    items.push(BundleItem::new(name, bytes));
                }
                _ => failures.push(ItemFailure::new(position + 1, "collaborator returned a non-binary image")),
            }
        }
        failures.sort_by_key(|f| f.index);

        let produced = items.len();
        if produced == 0 {
            return Err(all_items_failed(Stage::Images, requested));
        }

        let manifest_json = serde_json::to_vec_pretty(&manifest)
            .map_err(|e| PipelineError::Generation {
                stage: Stage::Images,
                source: crate::errors::GenerationError(e.into()),
            })?;
        items.push(BundleItem::new("manifest.json", manifest_json));

        Ok(Execution {
            payload: ArtifactPayload::Bundle(items),
            requested,
            produced,
            failures,
        })
    }

    async fn execute_video(&self, project: &str, options: &RunOptions) -> Result<Execution, PipelineError> {
        let audio = self.store.read(project, Stage::Audio)?;
        let images = self.store.read(project, Stage::Images)?;
        let request = GenerateRequest {
            project: project.to_string(),
            stage: Stage::Video,
            settings: GenerationSettings::default(),
            inputs: HashMap::from([(Stage::Audio, audio), (Stage::Images, images)]),
            params: options.params.clone(),
        };
        let payload = self
            .call_unitary(&self.collaborators.composer, request, &options.retry, Stage::Video)
            .await?;
        expect_bytes(&payload, Stage::Video)?;
        Ok(Execution::unitary(payload))
    }

    /// Routes a unitary collaborator call through the retry seam.
    async fn call_unitary(
        &self,
        collaborator: &Arc<dyn Generate>,
        request: GenerateRequest,
        retry: &Arc<dyn RetryPolicy>,
        stage: Stage,
    ) -> Result<ArtifactPayload, PipelineError> {
        let op: GenerateOp<'_> = Box::new({
            let collaborator = Arc::clone(collaborator);
            move || {
                let collaborator = Arc::clone(&collaborator);
                let request = request.clone();
                Box::pin(async move { collaborator.generate(request).await })
            }
        });
        retry
            .run(op)
            .await
            .map_err(|source| PipelineError::Generation { stage, source })
    }

    /// Fans items out across a bounded worker pool and collects results
    /// indexed by their original position, so reassembly order never
    /// depends on completion order. Item failures are logged with their
    /// index and excluded from the successes.
    async fn run_items(
        &self,
        collaborator: &Arc<dyn GenerateItem>,
        project: &str,
        stage: Stage,
        settings: GenerationSettings,
        items: Vec<String>,
        concurrency: usize,
        retry: &Arc<dyn RetryPolicy>,
    ) -> (Vec<(usize, ArtifactPayload)>, Vec<ItemFailure>) {
        let total = items.len();
        let mut stream = futures::stream::iter(items.into_iter().enumerate().map(|(position, item)| {
            let collaborator = Arc::clone(collaborator);
            let retry = Arc::clone(retry);
            let settings = settings.clone();
            let project = project.to_string();
            async move {
                let request = ItemRequest {
                    project,
                    stage,
                    settings,
                    index: position + 1,
                    total,
                    item,
                };
                let op: GenerateOp<'_> = Box::new({
                    let collaborator = Arc::clone(&collaborator);
                    move || {
                        let collaborator = Arc::clone(&collaborator);
                        let request = request.clone();
                        Box::pin(async move { collaborator.generate_one(request).await })
                    }
                });
                (position, retry.run(op).await)
            }
        }))
        .buffer_unordered(concurrency.max(1));

        let mut successes = Vec::new();
        let mut failures = Vec::new();
        while let Some((position, result)) = stream.next().await {
            match result {
                Ok(payload) => successes.push((position, payload)),
                Err(error) => {
                    warn!(stage = %stage, index = position + 1, %error, "item generation failed");
                    failures.push(ItemFailure::new(position + 1, error.to_string()));
                }
            }
        }
        successes.sort_by_key(|(position, _)| *position);
        failures.sort_by_key(|failure| failure.index);
        (successes, failures)
    }

    /// A fresh artifact voids the promises made about the old one: the
    /// stage's own approval and every transitively downstream approval
    /// are revoked in a single record rewrite.
    fn invalidate_approvals(&self, project: &str, stage: Stage) -> Result<(), PipelineError> {
        let mut record = self.ledger.load(project)?;
        let mut revoked = Vec::new();
        for affected in self.graph.invalidation_set(stage) {
            if record.is_approved(affected) {
                revoked.push(affected);
            }
            record.set_approved(affected, false);
        }
        self.ledger.store(&record)?;
        if !revoked.is_empty() {
            info!(project, stage = %stage, ?revoked, "approvals revoked by regeneration");
        }
        Ok(())
    }

    fn read_text(&self, project: &str, stage: Stage) -> Result<String, PipelineError> {
        let payload = self.store.read(project, stage)?;
        match payload.as_text() {
            Some(text) => Ok(text.to_string()),
            None => Err(StoreError::InvalidPayload {
                stage,
                reason: "expected a text artifact".to_string(),
            }
            .into()),
        }
    }
}

fn settings_for(stage: Stage, config: &PipelineConfig) -> GenerationSettings {
    match stage {
        Stage::Script => GenerationSettings {
            model: Some(config.script_model.current.clone()),
            ..GenerationSettings::default()
        },
        Stage::Metadata | Stage::ImagePrompts => GenerationSettings {
            model: Some(config.prompting_model.current.clone()),
            ..GenerationSettings::default()
        },
        Stage::Images => GenerationSettings {
            model: Some(config.image_model.current.clone()),
            ..GenerationSettings::default()
        },
        Stage::Audio => GenerationSettings {
            model: None,
            voice: Some(config.tts.current_voice.clone()),
            language: Some(config.tts.current_lang.clone()),
        },
        Stage::Input | Stage::Video => GenerationSettings::default(),
    }
}

fn all_items_failed(stage: Stage, requested: usize) -> PipelineError {
    PipelineError::Generation {
        stage,
        source: crate::errors::GenerationError::msg(format!("all {requested} items failed")),
    }
}

fn expect_text(payload: &ArtifactPayload, stage: Stage) -> Result<(), PipelineError> {
    if payload.as_text().is_some() {
        Ok(())
    } else {
        Err(PipelineError::Generation {
            stage,
            source: crate::errors::GenerationError::msg("collaborator returned a non-text payload"),
        })
    }
}

fn expect_bytes(payload: &ArtifactPayload, stage: Stage) -> Result<(), PipelineError> {
    if payload.as_bytes().is_some() {
        Ok(())
    } else {
        Err(PipelineError::Generation {
            stage,
            source: crate::errors::GenerationError::msg("collaborator returned a non-binary payload"),
        })
    }
}

fn prompt_line_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\s*\d+\.\s*(.+)$").expect("prompt line pattern is valid"))
}

/// Extracts prompts from numbered lines (`1. a cinematic shot ...`).
/// Lines without a numeric prefix are ignored.
fn parse_numbered_prompts(text: &str) -> Vec<String> {
    text.lines()
        .filter_map(|line| {
            prompt_line_pattern()
                .captures(line)
                .and_then(|captures| captures.get(1))
                .map(|m| m.as_str().trim().to_string())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{failing_items, scripted, Fixture};

    #[test]
    fn test_parse_numbered_prompts() {
        let text = "1. a foggy harbor\n\nnot a prompt\n2.   a neon skyline\n10. a quiet library";
        assert_eq!(
            parse_numbered_prompts(text),
            vec!["a foggy harbor", "a neon skyline", "a quiet library"]
        );
        assert!(parse_numbered_prompts("no numbering here").is_empty());
    }

    #[test]
    fn test_settings_follow_configuration() {
        let config = PipelineConfig::default();
        let script = settings_for(Stage::Script, &config);
        assert_eq!(script.model.as_deref(), Some("gemini-3-pro-preview"));

        let audio = settings_for(Stage::Audio, &config);
        assert_eq!(audio.voice.as_deref(), Some("en-US-Studio-O"));
        assert_eq!(audio.language.as_deref(), Some("en-US"));
        assert!(audio.model.is_none());
    }

    #[tokio::test]
    async fn test_prerequisite_failure_blocks_before_any_call() {
        let fixture = Fixture::new();
        fixture.create_project("demo");

        let err = fixture
            .runner()
            .run("demo", Stage::Script, &fixture.config, &RunOptions::new())
            .await
            .unwrap_err();

        match err {
            PipelineError::Prerequisite(inner) => {
                assert_eq!(inner.missing, vec![Stage::Input]);
            }
            other => panic!("expected prerequisite error, got {other}"),
        }
        assert_eq!(fixture.calls.total(), 0, "no collaborator may run");
    }

    #[tokio::test]
    async fn test_unapproved_prerequisite_blocks() {
        let fixture = Fixture::new();
        fixture.create_project("demo");
        fixture.seed_text("demo", Stage::Input, "a transcript");

        let err = fixture
            .runner()
            .run("demo", Stage::Script, &fixture.config, &RunOptions::new())
            .await
            .unwrap_err();

        match err {
            PipelineError::Prerequisite(inner) => {
                assert!(inner.missing.is_empty());
                assert_eq!(inner.unapproved, vec![Stage::Input]);
            }
            other => panic!("expected prerequisite error, got {other}"),
        }
    }

    #[tokio::test]
    async fn test_input_requires_source_param() {
        let fixture = Fixture::new();
        fixture.create_project("demo");

        let err = fixture
            .runner()
            .run("demo", Stage::Input, &fixture.config, &RunOptions::new())
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Configuration(_)));
        assert_eq!(fixture.calls.total(), 0);
    }

    #[tokio::test]
    async fn test_existing_artifact_requires_force() {
        let fixture = Fixture::new();
        fixture.create_project("demo");
        fixture.seed_text("demo", Stage::Input, "a transcript");

        let options = RunOptions::new().with_param("source", serde_json::json!("https://example.com/v"));
        let err = fixture
            .runner()
            .run("demo", Stage::Input, &fixture.config, &options)
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::AlreadyExists { stage: Stage::Input, .. }));

        let report = fixture
            .runner()
            .run("demo", Stage::Input, &fixture.config, &options.with_force())
            .await
            .unwrap();
        assert_eq!(report.produced, 1);
    }

    #[tokio::test]
    async fn test_audio_reassembles_in_chunk_order() {
        let fixture = Fixture::new();
        fixture.create_project("demo");
        // Two paragraphs, each its own chunk under a tiny limit, each
        // synthesized to a marker byte derived from its 1-based index.
        fixture.seed_approved("demo", Stage::Input, "a transcript");
        fixture.seed_approved("demo", Stage::Script, "alpha\n\nbeta");

        let mut config = fixture.config.clone();
        config.chunk_limit = 8;

        let report = fixture
            .runner()
            .run("demo", Stage::Audio, &config, &RunOptions::new())
            .await
            .unwrap();
        assert_eq!(report.requested, 2);
        assert_eq!(report.produced, 2);

        // The scripted speech mock prefixes output with the item index.
        let audio = fixture.store.read("demo", Stage::Audio).unwrap();
        let bytes = audio.as_bytes().unwrap();
        assert!(bytes.starts_with(&[1]));
        let second = bytes.iter().position(|&b| b == 2).unwrap();
        assert!(second > 0);
    }

    #[tokio::test]
    async fn test_all_items_failed_persists_nothing() {
        let fixture = Fixture::new().with_speech(failing_items());
        fixture.create_project("demo");
        fixture.seed_approved("demo", Stage::Input, "a transcript");
        fixture.seed_approved("demo", Stage::Script, "alpha\n\nbeta");

        let err = fixture
            .runner()
            .run("demo", Stage::Audio, &fixture.config, &RunOptions::new())
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Generation { stage: Stage::Audio, .. }));
        assert!(!fixture.store.exists("demo", Stage::Audio).unwrap());
    }

    #[tokio::test]
    async fn test_regeneration_revokes_downstream_approvals() {
        let fixture = Fixture::new().with_script_writer(scripted("rewritten script"));
        fixture.create_project("demo");
        fixture.seed_approved("demo", Stage::Input, "a transcript");
        fixture.seed_approved("demo", Stage::Script, "original script");
        fixture.seed_approved("demo", Stage::Metadata, "{}");

        fixture
            .runner()
            .run("demo", Stage::Script, &fixture.config, &RunOptions::new().with_force())
            .await
            .unwrap();

        let record = fixture.ledger.load("demo").unwrap();
        assert!(record.is_approved(Stage::Input), "upstream approval untouched");
        assert!(!record.is_approved(Stage::Script));
        assert!(!record.is_approved(Stage::Metadata), "downstream approval revoked");
    }
}
