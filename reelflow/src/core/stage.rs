//! The fixed set of production stages.
//!
//! Stages are static definitions: per-project state is attached to
//! (project, stage) pairs by the artifact store and the approval ledger,
//! never to the stage itself.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// One step of the fixed content-production sequence.
///
/// Declaration order is pipeline order; it is used for display purposes
/// only. Dependency relationships live in
/// [`StageGraph`](crate::pipeline::StageGraph), not here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Source transcript for the project.
    Input,
    /// Narration script derived from the transcript.
    Script,
    /// Synthesized narration audio.
    Audio,
    /// Publishing metadata (titles, description, hashtags).
    Metadata,
    /// Visual prompts, one per planned image.
    ImagePrompts,
    /// Generated still images.
    Images,
    /// The final rendered video.
    Video,
}

/// All stages in pipeline order.
pub const ALL_STAGES: [Stage; 7] = [
    Stage::Input,
    Stage::Script,
    Stage::Audio,
    Stage::Metadata,
    Stage::ImagePrompts,
    Stage::Images,
    Stage::Video,
];

impl Stage {
    /// Returns the canonical name of the stage.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Input => "input",
            Self::Script => "script",
            Self::Audio => "audio",
            Self::Metadata => "metadata",
            Self::ImagePrompts => "image_prompts",
            Self::Images => "images",
            Self::Video => "video",
        }
    }

    /// Returns all stages in pipeline order.
    #[must_use]
    pub fn all() -> impl Iterator<Item = Stage> {
        ALL_STAGES.into_iter()
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error raised when parsing an unknown stage name.
#[derive(Debug, Clone, Error)]
#[error("unknown stage name: '{name}'")]
pub struct UnknownStageError {
    /// The name that failed to parse.
    pub name: String,
}

impl FromStr for Stage {
    type Err = UnknownStageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "input" => Ok(Self::Input),
            "script" => Ok(Self::Script),
            "audio" => Ok(Self::Audio),
            "metadata" => Ok(Self::Metadata),
            "image_prompts" => Ok(Self::ImagePrompts),
            "images" => Ok(Self::Images),
            "video" => Ok(Self::Video),
            _ => Err(UnknownStageError { name: s.to_string() }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_round_trip() {
        for stage in Stage::all() {
            let parsed: Stage = stage.name().parse().unwrap();
            assert_eq!(parsed, stage);
        }
    }

    #[test]
    fn test_unknown_name_fails() {
        let err = "thumbnails".parse::<Stage>().unwrap_err();
        assert!(err.to_string().contains("thumbnails"));
    }

    #[test]
    fn test_pipeline_order() {
        let stages: Vec<Stage> = Stage::all().collect();
        assert_eq!(stages.len(), 7);
        assert_eq!(stages[0], Stage::Input);
        assert_eq!(stages[6], Stage::Video);
    }

    #[test]
    fn test_serde_as_map_key() {
        let mut map = std::collections::BTreeMap::new();
        map.insert(Stage::ImagePrompts, true);
        let json = serde_json::to_string(&map).unwrap();
        assert_eq!(json, r#"{"image_prompts":true}"#);
    }
}
