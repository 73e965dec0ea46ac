//! Image synthesis, aesthetics scoring and style encoding
//!
//! The kiosk only talks to these through traits. The built-in
//! implementations render embeddings procedurally so the app runs
//! without a diffusion model; a model-backed engine plugs in the same way.

use image::{Rgb, RgbImage};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::f32::consts::PI;

use super::variation::{random_embedding, EmbeddingSpace, ValueRange};
use crate::state::data::Embedding;

/// Turns an embedding into a rendered image.
///
/// The rendered image doubles as the raw artifact: it is what gets saved
/// as `{index}.png`.
///
/// Slow (seconds for a real model) and not reentrant: the scheduler
/// guarantees only one call is in flight.
pub trait ImageSynthesizer: Send {
    fn synthesize(&mut self, embedding: &Embedding) -> Result<RgbImage, String>;
}

/// Predicts how pleasing an image is
pub trait AestheticScorer: Send {
    fn score(&self, image: &RgbImage) -> Result<f32, String>;
}

/// Maps a style name (e.g. "Cubism") to an embedding to blend toward
pub trait StyleEncoder: Send {
    fn encode(&self, style: &str) -> Embedding;
}

/// Number of colour waves layered into each rendering
const WAVE_COUNT: usize = 8;
/// Features per wave: x frequency, y frequency, phase, r/g/b weight
const FEATURES_PER_WAVE: usize = 6;

/// Procedural renderer: folds the token embedding into a handful of
/// colour waves and the pooled embedding into a base tint.
#[derive(Debug, Clone)]
pub struct WaveSynthesizer {
    size: u32,
    tokens_range: ValueRange,
    pooled_range: ValueRange,
}

impl WaveSynthesizer {
    pub fn new(size: u32, tokens_range: ValueRange, pooled_range: ValueRange) -> Self {
        Self {
            size: size.max(1),
            tokens_range,
            pooled_range,
        }
    }
}

impl ImageSynthesizer for WaveSynthesizer {
    fn synthesize(&mut self, embedding: &Embedding) -> Result<RgbImage, String> {
        if embedding.tokens.is_empty() {
            return Err("Token embedding is empty".to_string());
        }

        let waves = fold_features(&embedding.tokens, &self.tokens_range, WAVE_COUNT * FEATURES_PER_WAVE);
        let tint = fold_features(&embedding.pooled, &self.pooled_range, 3);
        let size = self.size as f32;
        let norm = (WAVE_COUNT as f32).sqrt();

        let image = RgbImage::from_fn(self.size, self.size, |x, y| {
            let (u, v) = (x as f32 / size, y as f32 / size);
            let mut channels = [0.0f32; 3];

            for wave in waves.chunks_exact(FEATURES_PER_WAVE) {
                let fx = wave[0] * 4.0;
                let fy = wave[1] * 4.0;
                let phase = wave[2] * PI;
                let s = (2.0 * PI * (fx * u + fy * v) + phase).sin();
                for (c, channel) in channels.iter_mut().enumerate() {
                    *channel += wave[3 + c] * s;
                }
            }

            let mut pixel = [0u8; 3];
            for c in 0..3 {
                let value = 0.5 + 0.25 * tint[c] + 0.25 * channels[c] / norm;
                pixel[c] = (value.clamp(0.0, 1.0) * 255.0).round() as u8;
            }
            Rgb(pixel)
        });

        Ok(image)
    }
}

/// Fold `values` into `count` features in (-1, 1).
///
/// Each feature sums a contiguous chunk of centred values and scales by
/// 1/sqrt(chunk) so random embeddings don't all collapse to zero.
fn fold_features(values: &[f32], range: &ValueRange, count: usize) -> Vec<f32> {
    if values.is_empty() {
        return vec![0.0; count];
    }

    let chunk = values.len().div_ceil(count).max(1);
    (0..count)
        .map(|k| {
            // Wrap around so short embeddings still fill every feature
            let start = (k * chunk) % values.len();
            let sum: f32 = (0..chunk)
                .map(|i| range.normalize(values[(start + i) % values.len()]) * 2.0 - 1.0)
                .sum();
            (sum / (chunk as f32).sqrt()).tanh()
        })
        .collect()
}

/// Aesthetics heuristic on a 0..10 scale: colourfulness plus contrast
#[derive(Debug, Clone, Copy, Default)]
pub struct AestheticsHeuristic;

impl AestheticScorer for AestheticsHeuristic {
    fn score(&self, image: &RgbImage) -> Result<f32, String> {
        let n = (image.width() as usize) * (image.height() as usize);
        if n == 0 {
            return Err("Cannot score an empty image".to_string());
        }

        let mut rg = Stats::default();
        let mut yb = Stats::default();
        let mut luma = Stats::default();
        for Rgb([r, g, b]) in image.pixels() {
            let (r, g, b) = (*r as f32, *g as f32, *b as f32);
            rg.push(r - g);
            yb.push(0.5 * (r + g) - b);
            luma.push(0.299 * r + 0.587 * g + 0.114 * b);
        }

        // Hasler & Suesstrunk colourfulness
        let spread = (rg.variance() + yb.variance()).sqrt();
        let offset = (rg.mean().powi(2) + yb.mean().powi(2)).sqrt();
        let colourfulness = ((spread + 0.3 * offset) / 100.0).min(1.0);
        let contrast = (luma.variance().sqrt() / 64.0).min(1.0);

        Ok(10.0 * (0.6 * colourfulness + 0.4 * contrast))
    }
}

/// Running mean and variance (Welford)
#[derive(Default)]
struct Stats {
    n: f32,
    mean: f32,
    m2: f32,
}

impl Stats {
    fn push(&mut self, value: f32) {
        self.n += 1.0;
        let delta = value - self.mean;
        self.mean += delta / self.n;
        self.m2 += delta * (value - self.mean);
    }

    fn mean(&self) -> f32 {
        self.mean
    }

    fn variance(&self) -> f32 {
        (self.m2 / self.n).max(0.0)
    }
}

/// Deterministic style embeddings seeded from a hash of the style name
#[derive(Debug, Clone)]
pub struct HashedStyleEncoder {
    tokens: EmbeddingSpace,
    pooled: EmbeddingSpace,
}

impl HashedStyleEncoder {
    pub fn new(tokens: EmbeddingSpace, pooled: EmbeddingSpace) -> Self {
        Self { tokens, pooled }
    }
}

impl StyleEncoder for HashedStyleEncoder {
    fn encode(&self, style: &str) -> Embedding {
        let seed = seahash::hash(style.trim().to_lowercase().as_bytes());
        let mut rng = StdRng::seed_from_u64(seed);
        random_embedding(&self.tokens, &self.pooled, &mut rng)
    }
}
