//! Variation operators on embeddings
//!
//! Mutation perturbs a single embedding, crossover blends two. Both
//! work on each embedding space independently.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::f32::consts::PI;

use crate::state::data::Embedding;

/// Inclusive value range of one embedding space
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct ValueRange {
    pub min: f32,
    pub max: f32,
}

impl ValueRange {
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    pub fn is_valid(&self) -> bool {
        self.min.is_finite() && self.max.is_finite() && self.min < self.max
    }

    pub fn clamp(&self, value: f32) -> f32 {
        value.clamp(self.min, self.max)
    }

    /// Map `value` from this range onto 0.0..=1.0
    pub fn normalize(&self, value: f32) -> f32 {
        ((value - self.min) / (self.max - self.min)).clamp(0.0, 1.0)
    }

    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f32 {
        rng.gen_range(self.min..=self.max)
    }
}

/// How strongly one embedding space is mutated
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct MutationParams {
    /// Probability that any single value is perturbed (0.0 - 1.0)
    pub rate: f32,
    /// Standard deviation of the gaussian noise added to a perturbed value
    pub strength: f32,
}

/// Shape and bounds of one embedding space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EmbeddingSpace {
    pub dims: usize,
    pub range: ValueRange,
}

impl EmbeddingSpace {
    fn random<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<f32> {
        (0..self.dims).map(|_| self.range.sample(rng)).collect()
    }
}

/// Draw a uniformly random embedding inside both spaces' ranges
pub fn random_embedding<R: Rng + ?Sized>(
    tokens: &EmbeddingSpace,
    pooled: &EmbeddingSpace,
    rng: &mut R,
) -> Embedding {
    Embedding::new(tokens.random(rng), pooled.random(rng))
}

/// Produces a randomly perturbed copy of an embedding
pub trait MutationOperator: Send {
    fn mutate(&self, embedding: &Embedding) -> Embedding;
}

/// Blends two embeddings; `weight` 0.0 yields `a`, 1.0 yields `b`
pub trait CrossoverOperator: Send {
    fn crossover(&self, a: &Embedding, b: &Embedding, weight: f32) -> Embedding;
}

/// Uniform-gaussian mutation with separate settings per embedding space
#[derive(Debug, Clone)]
pub struct GaussianMutator {
    pub tokens: MutationParams,
    pub tokens_range: ValueRange,
    pub pooled: MutationParams,
    pub pooled_range: ValueRange,
}

impl GaussianMutator {
    pub fn mutate_with<R: Rng + ?Sized>(&self, embedding: &Embedding, rng: &mut R) -> Embedding {
        Embedding::new(
            mutate_values(&embedding.tokens, &self.tokens, &self.tokens_range, rng),
            mutate_values(&embedding.pooled, &self.pooled, &self.pooled_range, rng),
        )
    }
}

impl MutationOperator for GaussianMutator {
    fn mutate(&self, embedding: &Embedding) -> Embedding {
        self.mutate_with(embedding, &mut rand::thread_rng())
    }
}

fn mutate_values<R: Rng + ?Sized>(
    values: &[f32],
    params: &MutationParams,
    range: &ValueRange,
    rng: &mut R,
) -> Vec<f32> {
    values
        .iter()
        .map(|&value| {
            if rng.gen::<f32>() < params.rate {
                range.clamp(value + gaussian(rng) * params.strength)
            } else {
                value
            }
        })
        .collect()
}

/// Standard normal sample (Box-Muller)
fn gaussian<R: Rng + ?Sized>(rng: &mut R) -> f32 {
    let u1: f32 = rng.gen_range(f32::EPSILON..1.0);
    let u2: f32 = rng.gen();
    (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
}

/// Element-wise linear interpolation, same weight for both spaces
#[derive(Debug, Clone, Copy, Default)]
pub struct ArithmeticCrossover;

impl CrossoverOperator for ArithmeticCrossover {
    fn crossover(&self, a: &Embedding, b: &Embedding, weight: f32) -> Embedding {
        Embedding::new(
            lerp_values(&a.tokens, &b.tokens, weight),
            lerp_values(&a.pooled, &b.pooled, weight),
        )
    }
}

fn lerp_values(a: &[f32], b: &[f32], weight: f32) -> Vec<f32> {
    let weight = weight.clamp(0.0, 1.0);
    a.iter()
        .zip(b.iter())
        .map(|(&x, &y)| x + (y - x) * weight)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn mutator(rate: f32, strength: f32) -> GaussianMutator {
        GaussianMutator {
            tokens: MutationParams { rate, strength },
            tokens_range: ValueRange::new(-1.0, 1.0),
            pooled: MutationParams { rate, strength },
            pooled_range: ValueRange::new(-0.5, 0.5),
        }
    }

    #[test]
    fn test_random_embedding_respects_shape_and_range() {
        let mut rng = StdRng::seed_from_u64(7);
        let tokens = EmbeddingSpace { dims: 32, range: ValueRange::new(-2.0, 2.0) };
        let pooled = EmbeddingSpace { dims: 8, range: ValueRange::new(0.0, 1.0) };

        let embedding = random_embedding(&tokens, &pooled, &mut rng);
        assert_eq!(embedding.tokens.len(), 32);
        assert_eq!(embedding.pooled.len(), 8);
        assert!(embedding.tokens.iter().all(|v| (-2.0..=2.0).contains(v)));
        assert!(embedding.pooled.iter().all(|v| (0.0..=1.0).contains(v)));
    }

    #[test]
    fn test_zero_rate_leaves_embedding_untouched() {
        let mut rng = StdRng::seed_from_u64(1);
        let original = Embedding::new(vec![0.1; 16], vec![0.2; 4]);
        let mutated = mutator(0.0, 10.0).mutate_with(&original, &mut rng);
        assert_eq!(mutated, original);
    }

    #[test]
    fn test_mutation_stays_in_clamp_range() {
        let mut rng = StdRng::seed_from_u64(42);
        let original = Embedding::new(vec![0.9; 256], vec![0.4; 64]);
        let mutated = mutator(1.0, 5.0).mutate_with(&original, &mut rng);

        assert_ne!(mutated, original);
        assert!(mutated.tokens.iter().all(|v| (-1.0..=1.0).contains(v)));
        assert!(mutated.pooled.iter().all(|v| (-0.5..=0.5).contains(v)));
    }

    #[test]
    fn test_crossover_weight_endpoints() {
        let a = Embedding::new(vec![0.0, 1.0], vec![2.0]);
        let b = Embedding::new(vec![1.0, 3.0], vec![4.0]);
        let crossover = ArithmeticCrossover;

        assert_eq!(crossover.crossover(&a, &b, 0.0), a);
        assert_eq!(crossover.crossover(&a, &b, 1.0), b);
        assert_eq!(
            crossover.crossover(&a, &b, 0.5),
            Embedding::new(vec![0.5, 2.0], vec![3.0])
        );
    }

    #[test]
    fn test_normalize_maps_range_to_unit() {
        let range = ValueRange::new(-2.0, 2.0);
        assert_eq!(range.normalize(-2.0), 0.0);
        assert_eq!(range.normalize(0.0), 0.5);
        assert_eq!(range.normalize(9.0), 1.0);
        assert!(!ValueRange::new(1.0, 1.0).is_valid());
    }
}
