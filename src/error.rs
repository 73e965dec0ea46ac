//! Error types for the kiosk
//!
//! Invalid requests are rejected synchronously on the interactive path
//! (`ManagerError`). Everything that can go wrong while a generation job
//! runs is captured as a `GenerationError` inside the job's outcome.

use std::path::PathBuf;
use thiserror::Error;

use crate::state::data::ImageId;

/// A façade request that was rejected before anything was scheduled
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ManagerError {
    #[error("Image {0} is not in the gallery")]
    UnknownImage(ImageId),

    #[error("Image {0} cannot be selected")]
    NotSelectable(ImageId),

    #[error("Parent contribution must be between 0 and 100, got {0}")]
    ContributionOutOfRange(u8),
}

/// Failure of a single generation request
///
/// The request is dropped; the scheduler moves on to the next one.
#[derive(Error, Debug, Clone)]
pub enum GenerationError {
    #[error("Image synthesis failed: {0}")]
    Synthesis(String),

    #[error("Aesthetics scoring failed: {0}")]
    Scoring(String),

    #[error("Could not reserve an artifact index: {0}")]
    Counter(String),

    #[error("Failed to save artifact to {}: {message}", .path.display())]
    Storage { path: PathBuf, message: String },

    #[error("Generation worker panicked: {0}")]
    WorkerPanicked(String),
}

impl From<CounterError> for GenerationError {
    fn from(err: CounterError) -> Self {
        GenerationError::Counter(err.to_string())
    }
}

/// Durable counter store failure
#[derive(Error, Debug)]
pub enum CounterError {
    #[error("Counter database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Could not create counter directory {}: {source}", .path.display())]
    Directory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Startup configuration failure
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid config value: {0}")]
    Invalid(String),

    #[error("Could not create artifact directory {}: {source}", .path.display())]
    ArtifactDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
