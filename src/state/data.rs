//! Shared data structures for the application state
//!
//! These structs represent the data model that flows between
//! the generation worker, the gallery and the UI layer.

use chrono::{DateTime, Utc};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use uuid::Uuid;

/// Opaque identity of a generated image
///
/// Assigned once at construction and independent of where the
/// artifact lives on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ImageId(Uuid);

impl ImageId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ImageId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ImageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Pooled prompt embedding driving image synthesis
///
/// Two independent vector spaces, each with its own mutation
/// parameters and clamp range. The lifecycle code never looks inside.
#[derive(Debug, Clone, PartialEq)]
pub struct Embedding {
    /// Per-token prompt embedding, flattened
    pub tokens: Vec<f32>,
    /// Pooled prompt embedding
    pub pooled: Vec<f32>,
}

impl Embedding {
    pub fn new(tokens: Vec<f32>, pooled: Vec<f32>) -> Self {
        Self { tokens, pooled }
    }
}

/// Back-reference to the record an image was derived from
///
/// Not ownership: the parent may already have been evicted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParentRef {
    pub id: ImageId,
    /// Display name of the parent at the time the child was requested
    pub name: String,
}

/// Represents a single generated image in the gallery
///
/// Immutable once constructed. Two records are equal iff their ids match.
#[derive(Debug, Clone)]
pub struct ImageRecord {
    id: ImageId,
    embedding: Arc<Embedding>,
    artifact_path: PathBuf,
    score: f32,
    selectable: bool,
    parent1: Option<ParentRef>,
    parent2: Option<ParentRef>,
    created_at: DateTime<Utc>,
}

impl ImageRecord {
    /// Create a record for a freshly generated artifact
    pub fn new(
        embedding: Arc<Embedding>,
        artifact_path: PathBuf,
        score: f32,
        parent1: Option<ParentRef>,
        parent2: Option<ParentRef>,
    ) -> Self {
        Self {
            id: ImageId::new(),
            embedding,
            artifact_path,
            score,
            selectable: true,
            parent1,
            parent2,
            created_at: Utc::now(),
        }
    }

    /// Create a non-selectable record derived from `source`
    /// (e.g. a QR code rendition of it) that shares its embedding and score
    // Built by display collaborators and handed to `ImageManager::manual_add`
    #[allow(dead_code)]
    pub fn derived(source: &ImageRecord, artifact_path: PathBuf) -> Self {
        Self {
            id: ImageId::new(),
            embedding: Arc::clone(&source.embedding),
            artifact_path,
            score: source.score,
            selectable: false,
            parent1: Some(source.as_parent()),
            parent2: None,
            created_at: Utc::now(),
        }
    }

    pub fn id(&self) -> ImageId {
        self.id
    }

    pub fn embedding(&self) -> &Arc<Embedding> {
        &self.embedding
    }

    pub fn artifact_path(&self) -> &Path {
        &self.artifact_path
    }

    pub fn score(&self) -> f32 {
        self.score
    }

    pub fn selectable(&self) -> bool {
        self.selectable
    }

    pub fn parent1(&self) -> Option<&ParentRef> {
        self.parent1.as_ref()
    }

    pub fn parent2(&self) -> Option<&ParentRef> {
        self.parent2.as_ref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Filename without extension, e.g. "17" for "results/17.png"
    pub fn display_name(&self) -> String {
        self.artifact_path
            .file_stem()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string()
    }

    /// Reference to this record for use as a child's parent
    pub fn as_parent(&self) -> ParentRef {
        ParentRef {
            id: self.id,
            name: self.display_name(),
        }
    }
}

impl PartialEq for ImageRecord {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ImageRecord {}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(path: &str) -> ImageRecord {
        let embedding = Arc::new(Embedding::new(vec![0.1, 0.2], vec![0.3]));
        ImageRecord::new(embedding, PathBuf::from(path), 5.5, None, None)
    }

    #[test]
    fn test_display_name_strips_extension() {
        let image = record("results/17.png");
        assert_eq!(image.display_name(), "17");
    }

    #[test]
    fn test_identity_is_independent_of_path() {
        let a = record("results/1.png");
        let b = record("results/1.png");
        assert_ne!(a, b);
        assert_eq!(a, a.clone());
    }

    #[test]
    fn test_derived_record_is_not_selectable() {
        let source = record("results/3.png");
        let qr = ImageRecord::derived(&source, PathBuf::from("results/3_qr.png"));

        assert!(!qr.selectable());
        assert_eq!(qr.score(), source.score());
        assert_eq!(qr.parent1().map(|p| p.id), Some(source.id()));
        assert_eq!(qr.parent1().map(|p| p.name.as_str()), Some("3"));
        assert!(qr.parent2().is_none());
        assert!(Arc::ptr_eq(qr.embedding(), source.embedding()));
    }
}
