//! Filesystem-backed artifact store.

use super::ArtifactStore;
use crate::core::{ArtifactPayload, BundleItem, Stage};
use crate::errors::StoreError;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Artifact store rooted at a projects directory.
///
/// Each project owns one directory; each stage occupies one fixed
/// location inside it. The numeric prefixes are storage addresses
/// carried over from the project layout — ordering semantics live in
/// [`StageGraph`](crate::pipeline::StageGraph), never in these names.
#[derive(Debug, Clone)]
pub struct FsArtifactStore {
    root: PathBuf,
}

/// How a stage's artifact is shaped on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ArtifactShape {
    Text,
    Bytes,
    Bundle,
}

fn shape_of(stage: Stage) -> ArtifactShape {
    match stage {
        Stage::Input | Stage::Script | Stage::Metadata | Stage::ImagePrompts => ArtifactShape::Text,
        Stage::Audio | Stage::Video => ArtifactShape::Bytes,
        Stage::Images => ArtifactShape::Bundle,
    }
}

fn file_name(stage: Stage) -> &'static str {
    match stage {
        Stage::Input => "0_transcript.txt",
        Stage::Script => "1_script.txt",
        Stage::Audio => "2_audio.mp3",
        Stage::ImagePrompts => "3_image_prompts.txt",
        Stage::Metadata => "4_metadata.json",
        Stage::Images => "5_images",
        Stage::Video => "6_final_video.mp4",
    }
}

impl FsArtifactStore {
    /// Creates a store rooted at `root`. The root directory is created
    /// lazily on the first project creation.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Returns the store root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn project_dir(&self, project: &str) -> PathBuf {
        self.root.join(project)
    }

    fn unavailable(path: &Path, source: std::io::Error) -> StoreError {
        StoreError::Unavailable { path: path.to_path_buf(), source }
    }

    fn write_file(&self, path: &Path, content: &[u8]) -> Result<(), StoreError> {
        let dir = path.parent().unwrap_or(&self.root);
        let mut tmp = tempfile::Builder::new()
            .prefix(".tmp_artifact")
            .tempfile_in(dir)
            .map_err(|e| Self::unavailable(dir, e))?;
        tmp.write_all(content).map_err(|e| Self::unavailable(path, e))?;
        tmp.flush().map_err(|e| Self::unavailable(path, e))?;
        tmp.persist(path).map_err(|e| Self::unavailable(path, e.error))?;
        Ok(())
    }

    fn write_bundle(&self, path: &Path, items: &[BundleItem]) -> Result<(), StoreError> {
        let dir = path.parent().unwrap_or(&self.root);
        let tmp = tempfile::Builder::new()
            .prefix(".tmp_bundle")
            .tempdir_in(dir)
            .map_err(|e| Self::unavailable(dir, e))?;
        for item in items {
            fs::write(tmp.path().join(&item.name), &item.data)
                .map_err(|e| Self::unavailable(path, e))?;
        }
        // Replace any previous bundle; the target is either fully the
        // old artifact, absent, or fully the new one — never partial.
        if path.is_dir() {
            fs::remove_dir_all(path).map_err(|e| Self::unavailable(path, e))?;
        }
        let tmp_path = tmp.into_path();
        fs::rename(&tmp_path, path).map_err(|e| {
            let _ = fs::remove_dir_all(&tmp_path);
            Self::unavailable(path, e)
        })?;
        Ok(())
    }

    fn read_bundle(&self, path: &Path) -> Result<Vec<BundleItem>, StoreError> {
        let mut names = Vec::new();
        let entries = fs::read_dir(path).map_err(|e| Self::unavailable(path, e))?;
        for entry in entries {
            let entry = entry.map_err(|e| Self::unavailable(path, e))?;
            if entry.path().is_file() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        let mut items = Vec::with_capacity(names.len());
        for name in names {
            let item_path = path.join(&name);
            let data = fs::read(&item_path).map_err(|e| Self::unavailable(&item_path, e))?;
            items.push(BundleItem::new(name, data));
        }
        Ok(items)
    }
}

impl ArtifactStore for FsArtifactStore {
    fn create_project(&self, project: &str) -> Result<(), StoreError> {
        let dir = self.project_dir(project);
        fs::create_dir_all(&dir).map_err(|e| Self::unavailable(&dir, e))
    }

    fn list_projects(&self) -> Result<Vec<String>, StoreError> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(Self::unavailable(&self.root, e)),
        };
        let mut projects = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| Self::unavailable(&self.root, e))?;
            if entry.path().is_dir() {
                projects.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        projects.sort();
        Ok(projects)
    }

    fn exists(&self, project: &str, stage: Stage) -> Result<bool, StoreError> {
        let path = self.location(project, stage);
        let meta = match fs::metadata(&path) {
            Ok(meta) => meta,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(Self::unavailable(&path, e)),
        };
        match shape_of(stage) {
            ArtifactShape::Text | ArtifactShape::Bytes => Ok(meta.is_file() && meta.len() > 0),
            ArtifactShape::Bundle => {
                if !meta.is_dir() {
                    return Ok(false);
                }
                let mut entries = fs::read_dir(&path).map_err(|e| Self::unavailable(&path, e))?;
                Ok(entries.next().is_some())
            }
        }
    }

    fn read(&self, project: &str, stage: Stage) -> Result<ArtifactPayload, StoreError> {
        if !self.exists(project, stage)? {
            return Err(StoreError::Missing { project: project.to_string(), stage });
        }
        let path = self.location(project, stage);
        match shape_of(stage) {
            ArtifactShape::Text => {
                let text = fs::read_to_string(&path).map_err(|e| Self::unavailable(&path, e))?;
                Ok(ArtifactPayload::Text(text))
            }
            ArtifactShape::Bytes => {
                let bytes = fs::read(&path).map_err(|e| Self::unavailable(&path, e))?;
                Ok(ArtifactPayload::Bytes(bytes))
            }
            ArtifactShape::Bundle => Ok(ArtifactPayload::Bundle(self.read_bundle(&path)?)),
        }
    }

    fn write(&self, project: &str, stage: Stage, payload: &ArtifactPayload) -> Result<PathBuf, StoreError> {
        if payload.is_empty() {
            return Err(StoreError::InvalidPayload {
                stage,
                reason: "payload is empty".to_string(),
            });
        }
        self.create_project(project)?;
        let path = self.location(project, stage);
        match payload {
            ArtifactPayload::Text(text) => self.write_file(&path, text.as_bytes())?,
            ArtifactPayload::Bytes(bytes) => self.write_file(&path, bytes)?,
            ArtifactPayload::Bundle(items) => self.write_bundle(&path, items)?,
        }
        debug!(project, stage = %stage, path = %path.display(), "artifact persisted");
        Ok(path)
    }

    fn location(&self, project: &str, stage: Stage) -> PathBuf {
        self.project_dir(project).join(file_name(stage))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (tempfile::TempDir, FsArtifactStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = FsArtifactStore::new(dir.path().join("projects"));
        (dir, store)
    }

    #[test]
    fn test_missing_artifact_is_not_a_storage_failure() {
        let (_dir, store) = store();
        store.create_project("demo").unwrap();

        assert!(!store.exists("demo", Stage::Script).unwrap());
        let err = store.read("demo", Stage::Script).unwrap_err();
        assert!(matches!(err, StoreError::Missing { stage: Stage::Script, .. }));
    }

    #[test]
    fn test_write_then_read_text() {
        let (_dir, store) = store();
        let payload = ArtifactPayload::from("a narration script");

        let path = store.write("demo", Stage::Script, &payload).unwrap();
        assert!(path.ends_with("1_script.txt"));
        assert!(store.exists("demo", Stage::Script).unwrap());
        assert_eq!(store.read("demo", Stage::Script).unwrap(), payload);
    }

    #[test]
    fn test_write_then_read_bytes() {
        let (_dir, store) = store();
        let payload = ArtifactPayload::Bytes(vec![0xffu8, 0xfb, 0x90, 0x00]);

        store.write("demo", Stage::Audio, &payload).unwrap();
        assert_eq!(store.read("demo", Stage::Audio).unwrap(), payload);
    }

    #[test]
    fn test_bundle_round_trip_preserves_name_order() {
        let (_dir, store) = store();
        let payload = ArtifactPayload::Bundle(vec![
            BundleItem::new("001.png", vec![1]),
            BundleItem::new("002.png", vec![2]),
            BundleItem::new("manifest.json", b"[]".to_vec()),
        ]);

        store.write("demo", Stage::Images, &payload).unwrap();
        let back = store.read("demo", Stage::Images).unwrap();
        let names: Vec<&str> = back.as_bundle().unwrap().iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["001.png", "002.png", "manifest.json"]);
    }

    #[test]
    fn test_rewrite_replaces_previous_bundle() {
        let (_dir, store) = store();
        store
            .write(
                "demo",
                Stage::Images,
                &ArtifactPayload::Bundle(vec![
                    BundleItem::new("001.png", vec![1]),
                    BundleItem::new("002.png", vec![2]),
                ]),
            )
            .unwrap();
        store
            .write(
                "demo",
                Stage::Images,
                &ArtifactPayload::Bundle(vec![BundleItem::new("001.png", vec![9])]),
            )
            .unwrap();

        let back = store.read("demo", Stage::Images).unwrap();
        assert_eq!(back.as_bundle().unwrap().len(), 1);
        assert_eq!(back.as_bundle().unwrap()[0].data, vec![9]);
    }

    #[test]
    fn test_empty_payload_rejected() {
        let (_dir, store) = store();
        let err = store.write("demo", Stage::Script, &ArtifactPayload::Text(String::new())).unwrap_err();
        assert!(matches!(err, StoreError::InvalidPayload { .. }));
    }

    #[test]
    fn test_empty_file_reads_as_nonexistent() {
        let (_dir, store) = store();
        store.create_project("demo").unwrap();
        fs::write(store.location("demo", Stage::Script), b"").unwrap();
        assert!(!store.exists("demo", Stage::Script).unwrap());
    }

    #[test]
    fn test_no_temp_residue_after_write() {
        let (_dir, store) = store();
        store.write("demo", Stage::Script, &ArtifactPayload::from("script")).unwrap();

        let residue: Vec<_> = fs::read_dir(store.root().join("demo"))
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|name| name.starts_with(".tmp"))
            .collect();
        assert!(residue.is_empty(), "temp residue: {residue:?}");
    }

    #[test]
    fn test_create_project_is_idempotent() {
        let (_dir, store) = store();
        store.create_project("demo").unwrap();
        store.create_project("demo").unwrap();
        assert_eq!(store.list_projects().unwrap(), vec!["demo".to_string()]);
    }
}
