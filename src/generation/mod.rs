/// Image generation module
///
/// This module handles:
/// - Synthesis, scoring and style encoding collaborators (engine.rs)
/// - Mutation and crossover of embeddings (variation.rs)
/// - Running a single request to a saved artifact (pipeline.rs)
/// - Serializing requests onto one worker (scheduler.rs)

pub mod engine;
pub mod pipeline;
pub mod scheduler;
pub mod variation;

#[cfg(test)]
pub mod testing;
