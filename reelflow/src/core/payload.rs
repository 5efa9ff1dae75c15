//! Artifact payload types.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// One named item inside a bundle artifact.
///
/// Bundles are ordered: item order is the generation order and is
/// preserved through persistence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleItem {
    /// File name of the item inside the bundle directory.
    pub name: String,
    /// Raw item content.
    pub data: Vec<u8>,
}

impl BundleItem {
    /// Creates a new bundle item.
    #[must_use]
    pub fn new(name: impl Into<String>, data: Vec<u8>) -> Self {
        Self { name: name.into(), data }
    }
}

/// The content of a stage artifact.
///
/// A payload is written in one piece; the store never exposes a
/// partially written payload as existing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactPayload {
    /// UTF-8 text (transcripts, scripts, prompt lists, metadata JSON).
    Text(String),
    /// Opaque binary content (audio, video).
    Bytes(Vec<u8>),
    /// An ordered set of named binary items (per-image files).
    Bundle(Vec<BundleItem>),
}

impl ArtifactPayload {
    /// Returns the text content, if this is a text payload.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Returns the binary content, if this is a bytes payload.
    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytes(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// Returns the bundle items, if this is a bundle payload.
    #[must_use]
    pub fn as_bundle(&self) -> Option<&[BundleItem]> {
        match self {
            Self::Bundle(items) => Some(items),
            _ => None,
        }
    }

    /// Returns the total content size in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Text(text) => text.len(),
            Self::Bytes(bytes) => bytes.len(),
            Self::Bundle(items) => items.iter().map(|i| i.data.len()).sum(),
        }
    }

    /// Returns true if the payload carries no content.
    ///
    /// An empty payload must never be persisted: the store treats empty
    /// files and empty directories as non-existent.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Text(text) => text.is_empty(),
            Self::Bytes(bytes) => bytes.is_empty(),
            Self::Bundle(items) => items.is_empty(),
        }
    }

    /// Computes a stable hex-encoded content fingerprint.
    ///
    /// Bundle fingerprints cover item names and contents in item order,
    /// so renaming or reordering items changes the fingerprint.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        match self {
            Self::Text(text) => hasher.update(text.as_bytes()),
            Self::Bytes(bytes) => hasher.update(bytes),
            Self::Bundle(items) => {
                for item in items {
                    hasher.update(item.name.as_bytes());
                    hasher.update([0u8]);
                    hasher.update(&item.data);
                }
            }
        }
        hex::encode(hasher.finalize())
    }
}

impl From<String> for ArtifactPayload {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for ArtifactPayload {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<Vec<u8>> for ArtifactPayload {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_len_and_empty() {
        assert!(ArtifactPayload::Text(String::new()).is_empty());
        assert!(ArtifactPayload::Bundle(Vec::new()).is_empty());
        assert_eq!(ArtifactPayload::from("abc").len(), 3);

        let bundle = ArtifactPayload::Bundle(vec![
            BundleItem::new("001.png", vec![1, 2]),
            BundleItem::new("002.png", vec![3]),
        ]);
        assert_eq!(bundle.len(), 3);
        assert!(!bundle.is_empty());
    }

    #[test]
    fn test_fingerprint_is_stable() {
        let a = ArtifactPayload::from("hello world");
        let b = ArtifactPayload::from("hello world");
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_ne!(a.fingerprint(), ArtifactPayload::from("hello").fingerprint());
    }

    #[test]
    fn test_bundle_fingerprint_sensitive_to_names() {
        let a = ArtifactPayload::Bundle(vec![BundleItem::new("001.png", vec![1])]);
        let b = ArtifactPayload::Bundle(vec![BundleItem::new("002.png", vec![1])]);
        assert_ne!(a.fingerprint(), b.fingerprint());
    }
}
