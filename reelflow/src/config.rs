//! Pipeline configuration.
//!
//! Configuration is an explicit value passed into the runner at call
//! time. Callers re-load it before each invocation; nothing in the core
//! caches it, so edits to the config file take effect on the next run
//! without an invalidation step.

use crate::errors::ConfigurationError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A model selection with a validated list of alternatives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelChoice {
    /// The currently selected model id.
    pub current: String,
    /// Model ids that may be selected.
    pub available: Vec<String>,
}

impl ModelChoice {
    /// Creates a choice whose only option is `current`.
    #[must_use]
    pub fn single(current: impl Into<String>) -> Self {
        let current = current.into();
        Self { available: vec![current.clone()], current }
    }

    /// Selects a model, validating it against the available list.
    pub fn select(&mut self, model: &str) -> Result<(), ConfigurationError> {
        if !self.available.iter().any(|m| m == model) {
            return Err(ConfigurationError::new(format!(
                "model '{model}' is not in the available list"
            )));
        }
        self.current = model.to_string();
        Ok(())
    }
}

/// One synthesizer voice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TtsVoice {
    /// Voice id, e.g. `en-US-Studio-O`.
    pub id: String,
    /// Language code the voice belongs to.
    pub lang: String,
}

/// Speech synthesis selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TtsChoice {
    /// The currently selected voice id.
    pub current_voice: String,
    /// The currently selected language code.
    pub current_lang: String,
    /// Voices that may be selected.
    pub available: Vec<TtsVoice>,
}

impl TtsChoice {
    /// Selects a voice by id. The language is taken from the voice
    /// entry unless overridden.
    pub fn select_voice(&mut self, voice_id: &str, lang: Option<&str>) -> Result<(), ConfigurationError> {
        let Some(voice) = self.available.iter().find(|v| v.id == voice_id) else {
            return Err(ConfigurationError::new(format!(
                "voice '{voice_id}' is not in the available list"
            )));
        };
        self.current_lang = lang.unwrap_or(&voice.lang).to_string();
        self.current_voice = voice_id.to_string();
        Ok(())
    }
}

/// Full pipeline configuration.
///
/// The serialized form is a single JSON document; see
/// [`PipelineConfig::load`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Model used to turn the transcript into a narration script.
    pub script_model: ModelChoice,
    /// Model used for prompt and metadata generation.
    pub prompting_model: ModelChoice,
    /// Speech synthesis selection.
    pub tts: TtsChoice,
    /// Image generation model.
    pub image_model: ModelChoice,
    /// Pacing: seconds of narration covered by one image.
    pub seconds_per_image: f64,
    /// Hard per-request size ceiling for speech synthesis, in bytes.
    pub chunk_limit: usize,
    /// Worker pool bound for itemized stages.
    pub item_concurrency: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            script_model: ModelChoice {
                current: "gemini-3-pro-preview".to_string(),
                available: vec![
                    "gemini-3-pro-preview".to_string(),
                    "gemini-3-flash-preview".to_string(),
                ],
            },
            prompting_model: ModelChoice {
                current: "gemini-3-flash-preview".to_string(),
                available: vec![
                    "gemini-3-flash-preview".to_string(),
                    "gemini-3-pro-preview".to_string(),
                ],
            },
            tts: TtsChoice {
                current_voice: "en-US-Studio-O".to_string(),
                current_lang: "en-US".to_string(),
                available: vec![TtsVoice {
                    id: "en-US-Studio-O".to_string(),
                    lang: "en-US".to_string(),
                }],
            },
            image_model: ModelChoice {
                current: "imagen-4.0-ultra-generate-001".to_string(),
                available: vec![
                    "imagen-4.0-ultra-generate-001".to_string(),
                    "imagen-4.0-generate-001".to_string(),
                    "imagen-4.0-fast-generate-001".to_string(),
                ],
            },
            seconds_per_image: 20.0,
            // The synthesis service caps requests at 5000 bytes; 4500
            // leaves headroom for multi-byte characters.
            chunk_limit: 4500,
            item_concurrency: 4,
        }
    }
}

impl PipelineConfig {
    /// Loads configuration from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigurationError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| ConfigurationError::new(format!("cannot read config '{}': {e}", path.display())))?;
        serde_json::from_str(&text)
            .map_err(|e| ConfigurationError::new(format!("cannot parse config '{}': {e}", path.display())))
    }

    /// Saves configuration to a JSON file, creating parent directories.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigurationError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| ConfigurationError::new(format!("cannot create '{}': {e}", parent.display())))?;
        }
        let text = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigurationError::new(format!("cannot encode config: {e}")))?;
        std::fs::write(path, text)
            .map_err(|e| ConfigurationError::new(format!("cannot write config '{}': {e}", path.display())))
    }

    /// Validates values a run depends on.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if !self.seconds_per_image.is_finite() || self.seconds_per_image <= 0.0 {
            return Err(ConfigurationError::new("seconds_per_image must be positive"));
        }
        if self.chunk_limit == 0 {
            return Err(ConfigurationError::new("chunk_limit must be at least 1"));
        }
        if self.item_concurrency == 0 {
            return Err(ConfigurationError::new("item_concurrency must be at least 1"));
        }
        Ok(())
    }
}
