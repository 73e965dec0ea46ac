//! Scripted collaborators for tests
use image::{Rgb, RgbImage};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::engine::{AestheticScorer, ImageSynthesizer};
use super::variation::{ArithmeticCrossover, CrossoverOperator};
use crate::state::data::Embedding;

/// What a `ScriptedSynthesizer` observed
#[derive(Clone, Default)]
pub struct Probe {
    calls: Arc<Mutex<Vec<Embedding>>>,
    active: Arc<AtomicUsize>,
    max_active: Arc<AtomicUsize>,
}

impl Probe {
    /// Embeddings passed to `synthesize`, in call order
    pub fn calls(&self) -> Vec<Embedding> {
        self.calls.lock().unwrap().clone()
    }

    /// First token of every call, handy as a request marker
    pub fn markers(&self) -> Vec<f32> {
        self.calls().iter().map(marker).collect()
    }

    /// Highest number of overlapping `synthesize` calls seen
    pub fn max_active(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }
}

pub fn marker(embedding: &Embedding) -> f32 {
    embedding.tokens.first().copied().unwrap_or(f32::NAN)
}

/// Renders a tiny solid image, failing (or panicking) for embeddings
/// whose marker is listed
pub struct ScriptedSynthesizer {
    probe: Probe,
    fail_markers: Vec<f32>,
    panic_markers: Vec<f32>,
    delay: Duration,
}

impl ScriptedSynthesizer {
    pub fn new() -> Self {
        Self {
            probe: Probe::default(),
            fail_markers: Vec::new(),
            panic_markers: Vec::new(),
            delay: Duration::from_millis(5),
        }
    }

    pub fn failing_on(markers: &[f32]) -> Self {
        Self {
            fail_markers: markers.to_vec(),
            ..Self::new()
        }
    }

    pub fn panicking_on(markers: &[f32]) -> Self {
        Self {
            panic_markers: markers.to_vec(),
            ..Self::new()
        }
    }

    pub fn probe(&self) -> Probe {
        self.probe.clone()
    }
}

impl ImageSynthesizer for ScriptedSynthesizer {
    fn synthesize(&mut self, embedding: &Embedding) -> Result<RgbImage, String> {
        let now_active = self.probe.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.probe.max_active.fetch_max(now_active, Ordering::SeqCst);
        self.probe.calls.lock().unwrap().push(embedding.clone());

        std::thread::sleep(self.delay);
        self.probe.active.fetch_sub(1, Ordering::SeqCst);

        let marker = marker(embedding);
        if self.panic_markers.contains(&marker) {
            panic!("scripted panic for {}", marker);
        }
        if self.fail_markers.contains(&marker) {
            return Err(format!("scripted failure for {}", marker));
        }
        Ok(RgbImage::from_pixel(4, 4, Rgb([10, 20, 30])))
    }
}

pub struct ConstantScorer(pub f32);

impl AestheticScorer for ConstantScorer {
    fn score(&self, _image: &RgbImage) -> Result<f32, String> {
        Ok(self.0)
    }
}

/// Arithmetic crossover that remembers every weight it was given
#[derive(Clone, Default)]
pub struct RecordingCrossover {
    pub weights: Arc<Mutex<Vec<f32>>>,
}

impl CrossoverOperator for RecordingCrossover {
    fn crossover(&self, a: &Embedding, b: &Embedding, weight: f32) -> Embedding {
        self.weights.lock().unwrap().push(weight);
        ArithmeticCrossover.crossover(a, b, weight)
    }
}
