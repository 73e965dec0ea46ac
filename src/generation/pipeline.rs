//! Blocking execution of a single generation request
//!
//! Synthesize, score, reserve a filename index, save the artifact and
//! build the record. Runs on a blocking worker thread, never on the
//! interactive path.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

use super::engine::{AestheticScorer, ImageSynthesizer};
use crate::error::GenerationError;
use crate::state::counter::CounterStore;
use crate::state::data::{Embedding, ImageRecord, ParentRef};

/// What to generate and where it came from
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub embedding: Arc<Embedding>,
    pub parent1: Option<ParentRef>,
    pub parent2: Option<ParentRef>,
}

impl GenerationRequest {
    /// A fresh image with no parents
    pub fn new(embedding: Embedding) -> Self {
        Self {
            embedding: Arc::new(embedding),
            parent1: None,
            parent2: None,
        }
    }

    pub fn with_parents(mut self, parent1: Option<ParentRef>, parent2: Option<ParentRef>) -> Self {
        self.parent1 = parent1;
        self.parent2 = parent2;
        self
    }
}

/// Owns the exclusive generation resources
pub struct GenerationPipeline {
    synthesizer: Box<dyn ImageSynthesizer>,
    scorer: Box<dyn AestheticScorer>,
    counter: CounterStore,
    artifact_dir: PathBuf,
}

impl GenerationPipeline {
    pub fn new(
        synthesizer: Box<dyn ImageSynthesizer>,
        scorer: Box<dyn AestheticScorer>,
        counter: CounterStore,
        artifact_dir: PathBuf,
    ) -> Self {
        Self {
            synthesizer,
            scorer,
            counter,
            artifact_dir,
        }
    }

    /// Run one request to completion
    pub fn execute(&mut self, request: &GenerationRequest) -> Result<ImageRecord, GenerationError> {
        let image = self
            .synthesizer
            .synthesize(&request.embedding)
            .map_err(GenerationError::Synthesis)?;

        let score = self.scorer.score(&image).map_err(GenerationError::Scoring)?;
        debug!("Scored new image at {:.2}", score);

        // A failure after this point burns the index; filenames stay unique
        let index = self.counter.next()?;
        let path = artifact_path(&self.artifact_dir, index);

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| GenerationError::Storage {
                path: parent.to_path_buf(),
                message: e.to_string(),
            })?;
        }
        image.save(&path).map_err(|e| GenerationError::Storage {
            path: path.clone(),
            message: e.to_string(),
        })?;

        info!("📸 Generated image: {} (score {:.2})", path.display(), score);

        Ok(ImageRecord::new(
            Arc::clone(&request.embedding),
            path,
            score,
            request.parent1.clone(),
            request.parent2.clone(),
        ))
    }
}

impl std::fmt::Debug for GenerationPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerationPipeline")
            .field("counter", &self.counter)
            .field("artifact_dir", &self.artifact_dir)
            .finish()
    }
}

/// Location of the artifact with the given counter index
pub fn artifact_path(artifact_dir: &Path, index: i64) -> PathBuf {
    artifact_dir.join(format!("{}.png", index))
}
