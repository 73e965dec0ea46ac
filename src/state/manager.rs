use rand::thread_rng;
use tracing::{debug, error, info};

use super::config::{KioskConfig, RANDOM_STYLE};
use super::counter::CounterStore;
use super::data::{ImageId, ImageRecord};
use super::events::{ManagerEvent, Notifier};
use super::gallery::Gallery;
use super::selection::{Selection, SelectionChange};
use crate::error::{CounterError, ManagerError};
use crate::generation::engine::{AestheticsHeuristic, HashedStyleEncoder, StyleEncoder, WaveSynthesizer};
use crate::generation::pipeline::{GenerationPipeline, GenerationRequest};
use crate::generation::scheduler::{GenerationJob, GenerationOutcome, GenerationScheduler};
use crate::generation::variation::{
    random_embedding, ArithmeticCrossover, CrossoverOperator, EmbeddingSpace, GaussianMutator,
    MutationOperator,
};

/// Embedding operators used to build generation requests
pub struct Operators {
    pub mutator: Box<dyn MutationOperator>,
    pub crossover: Box<dyn CrossoverOperator>,
    pub style_encoder: Box<dyn StyleEncoder>,
    pub tokens: EmbeddingSpace,
    pub pooled: EmbeddingSpace,
    /// Blend weight toward a style embedding for styled new images
    pub style_weight: f32,
}

impl Operators {
    pub fn from_config(config: &KioskConfig) -> Self {
        let tokens = config.token_space();
        let pooled = config.pooled_space();
        Self {
            mutator: Box::new(GaussianMutator {
                tokens: config.token_mutation,
                tokens_range: config.token_range,
                pooled: config.pooled_mutation,
                pooled_range: config.pooled_range,
            }),
            crossover: Box::new(ArithmeticCrossover),
            style_encoder: Box::new(HashedStyleEncoder::new(tokens, pooled)),
            tokens,
            pooled,
            style_weight: config.style_weight,
        }
    }
}

/// The ImageManager owns the gallery and the selection and is the only
/// way to change them. Generation work is handed to the scheduler; the
/// caller runs the returned `GenerationJob` and passes its outcome back
/// through `complete`.
///
/// Every method is meant to be called from the interactive context.
pub struct ImageManager {
    gallery: Gallery,
    selection: Selection,
    notifier: Notifier,
    scheduler: GenerationScheduler,
    operators: Operators,
}

impl ImageManager {
    pub fn new(max_images: usize, pipeline: GenerationPipeline, operators: Operators) -> Self {
        Self {
            gallery: Gallery::new(max_images),
            selection: Selection::new(),
            notifier: Notifier::new(),
            scheduler: GenerationScheduler::new(pipeline),
            operators,
        }
    }

    /// Wire up the built-in engine, counter store and operators from `config`
    pub fn from_config(config: &KioskConfig) -> Result<Self, CounterError> {
        let counter = CounterStore::open(&config.counter_db_path())?;
        info!("🔢 Artifact counter at {}", counter.current()?);

        let pipeline = GenerationPipeline::new(
            Box::new(WaveSynthesizer::new(config.image_size, config.token_range, config.pooled_range)),
            Box::new(AestheticsHeuristic),
            counter,
            config.artifact_dir.clone(),
        );
        Ok(Self::new(config.max_images, pipeline, Operators::from_config(config)))
    }

    /// Register an observer for every notification the manager raises
    pub fn subscribe<F>(&mut self, listener: F)
    where
        F: FnMut(&ManagerEvent) + Send + 'static,
    {
        self.notifier.subscribe(listener);
    }

    // ========== Queries ==========

    /// Gallery contents, oldest first
    pub fn images(&self) -> &[ImageRecord] {
        self.gallery.images()
    }

    /// Selected images, oldest selection first
    pub fn selected(&self) -> &[ImageRecord] {
        self.selection.selected()
    }

    pub fn selection_count(&self) -> usize {
        self.selection.count()
    }

    pub fn is_selected(&self, id: ImageId) -> bool {
        self.selection.contains(id)
    }

    pub fn get(&self, id: ImageId) -> Option<&ImageRecord> {
        self.gallery.get(id)
    }

    pub fn capacity(&self) -> usize {
        self.gallery.capacity()
    }

    /// True while a generation job is out for execution
    pub fn is_loading(&self) -> bool {
        self.scheduler.is_running()
    }

    pub fn queued(&self) -> usize {
        self.scheduler.queued()
    }

    // ========== Generation ==========

    /// Request a new random image, optionally pulled toward a named style.
    /// `None`, an empty name or "Random" mean no style bias.
    #[must_use = "the returned job must be run for the request to make progress"]
    pub fn generate_new(&mut self, style: Option<&str>) -> Option<GenerationJob> {
        let ops = &self.operators;
        let random = random_embedding(&ops.tokens, &ops.pooled, &mut thread_rng());

        let embedding = match style.map(str::trim) {
            Some(style) if !style.is_empty() && style != RANDOM_STYLE => {
                info!("Generating new image in style '{}'", style);
                let target = ops.style_encoder.encode(style);
                ops.crossover.crossover(&random, &target, ops.style_weight)
            }
            _ => {
                info!("Generating new image");
                random
            }
        };

        self.submit(GenerationRequest::new(embedding))
    }

    /// Request a mutated copy of a gallery image
    #[must_use = "the returned job must be run for the request to make progress"]
    pub fn mutate(&mut self, id: ImageId) -> Result<Option<GenerationJob>, ManagerError> {
        let parent = self.gallery.get(id).ok_or(ManagerError::UnknownImage(id))?;
        info!("Mutating image {}", parent.display_name());

        let embedding = self.operators.mutator.mutate(parent.embedding());
        let request = GenerationRequest::new(embedding).with_parents(Some(parent.as_parent()), None);
        Ok(self.submit(request))
    }

    /// Request a child of two gallery images.
    /// `contribution` (0 - 100) becomes the blend weight (0.0 - 1.0).
    #[must_use = "the returned job must be run for the request to make progress"]
    pub fn crossover(
        &mut self,
        a: ImageId,
        b: ImageId,
        contribution: u8,
    ) -> Result<Option<GenerationJob>, ManagerError> {
        if contribution > 100 {
            return Err(ManagerError::ContributionOutOfRange(contribution));
        }
        let parent1 = self.gallery.get(a).ok_or(ManagerError::UnknownImage(a))?;
        let parent2 = self.gallery.get(b).ok_or(ManagerError::UnknownImage(b))?;

        let weight = f32::from(contribution) / 100.0;
        info!(
            "Parent contribution: {} for {} and {}",
            weight,
            parent1.display_name(),
            parent2.display_name()
        );

        let embedding = self
            .operators
            .crossover
            .crossover(parent1.embedding(), parent2.embedding(), weight);
        let request = GenerationRequest::new(embedding)
            .with_parents(Some(parent1.as_parent()), Some(parent2.as_parent()));
        Ok(self.submit(request))
    }

    /// Apply a finished job's outcome and release the next queued job
    #[must_use = "the next queued job must be run or the queue stalls"]
    pub fn complete(&mut self, outcome: GenerationOutcome) -> Option<GenerationJob> {
        match outcome.result {
            Ok(record) => {
                debug!("Generation #{} finished: {}", outcome.ticket, record.display_name());
                self.insert(record);
            }
            Err(err) => {
                error!("❌ Generation #{} dropped: {}", outcome.ticket, err);
                self.notifier.emit(ManagerEvent::GenerationFailed(err.to_string()));
            }
        }
        self.notifier.emit(ManagerEvent::LoadingChanged(false));

        let next = self.scheduler.finish();
        self.dispatch(next)
    }

    fn submit(&mut self, request: GenerationRequest) -> Option<GenerationJob> {
        let job = self.scheduler.submit(request);
        if job.is_none() {
            info!("⏳ Generation queued ({} waiting)", self.scheduler.queued());
        }
        self.dispatch(job)
    }

    fn dispatch(&mut self, job: Option<GenerationJob>) -> Option<GenerationJob> {
        if job.is_some() {
            self.notifier.emit(ManagerEvent::LoadingChanged(true));
        }
        job
    }

    // ========== Gallery ==========

    /// Add an externally produced record (e.g. a QR code derivative).
    /// Returns false if a record with the same id is already present.
    // The kiosk window has no producer of such records; display collaborators call this.
    #[allow(dead_code)]
    pub fn manual_add(&mut self, record: ImageRecord) -> bool {
        self.insert(record)
    }

    fn insert(&mut self, record: ImageRecord) -> bool {
        if self.gallery.contains(record.id()) {
            debug!("Image {} already in gallery, skipping", record.display_name());
            return false;
        }

        if self.gallery.is_full() {
            let victim = {
                let selection = &self.selection;
                self.gallery.eviction_candidate(|id| selection.contains(id))
            };
            if let Some(victim) = victim {
                debug!("Gallery full ({}), evicting oldest image", self.gallery.capacity());
                self.remove(victim);
            }
        }

        self.gallery.push(record.clone());
        info!("🖼️  Added image {} ({} in gallery)", record.display_name(), self.gallery.len());
        self.notifier.emit(ManagerEvent::ImageAdded(record));
        true
    }

    /// Remove an image, unselecting it first. Returns false if absent.
    ///
    /// The artifact file is left on disk.
    pub fn remove(&mut self, id: ImageId) -> bool {
        if !self.gallery.contains(id) {
            return false;
        }

        if let Some(change) = self.selection.unselect(id) {
            self.emit_selection(vec![change]);
        }

        let Some(record) = self.gallery.remove(id) else {
            return false;
        };
        info!("Removing image {}", record.display_name());
        self.notifier.emit(ManagerEvent::ImageRemoved(record));
        self.notifier
            .emit(ManagerEvent::SelectionCountChanged(self.selection.count()));
        true
    }

    /// Unselect everything, then remove every image oldest first
    pub fn clear(&mut self) {
        if self.gallery.is_empty() {
            debug!("Gallery already empty");
            return;
        }
        self.unselect_all();
        for id in self.gallery.ids() {
            self.remove(id);
        }
    }

    // ========== Selection ==========

    /// Select a gallery image; the oldest selection is dropped beyond two
    pub fn select(&mut self, id: ImageId) -> Result<(), ManagerError> {
        let record = self.gallery.get(id).ok_or(ManagerError::UnknownImage(id))?;
        if !record.selectable() {
            return Err(ManagerError::NotSelectable(id));
        }

        let changes = self.selection.select(record.clone());
        self.emit_selection(changes);
        Ok(())
    }

    pub fn unselect(&mut self, id: ImageId) -> Result<(), ManagerError> {
        if !self.gallery.contains(id) {
            return Err(ManagerError::UnknownImage(id));
        }
        if let Some(change) = self.selection.unselect(id) {
            self.emit_selection(vec![change]);
        }
        Ok(())
    }

    /// Select if unselected and vice versa; returns the new state
    pub fn toggle_selection(&mut self, id: ImageId) -> Result<bool, ManagerError> {
        if self.selection.contains(id) {
            self.unselect(id)?;
            Ok(false)
        } else {
            self.select(id)?;
            Ok(true)
        }
    }

    pub fn unselect_all(&mut self) {
        let changes = self.selection.unselect_all();
        self.emit_selection(changes);
    }

    /// Emit each change followed by the selection count right after it
    fn emit_selection(&mut self, changes: Vec<SelectionChange>) {
        for change in changes {
            self.notifier
                .emit(ManagerEvent::SelectionChanged(change.record, change.selected));
            self.notifier
                .emit(ManagerEvent::SelectionCountChanged(change.count));
        }
    }
}

impl std::fmt::Debug for ImageManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageManager")
            .field("images", &self.gallery.len())
            .field("selected", &self.selection.count())
            .field("scheduler", &self.scheduler)
            .finish()
    }
}
