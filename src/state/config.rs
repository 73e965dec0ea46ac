//! Kiosk configuration
//!
//! Fixed at startup. Stored as JSON; every field has a default so a
//! partial (or missing) file is fine.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use super::counter::CounterStore;
use super::gallery::MAX_IMAGES;
use crate::error::ConfigError;
use crate::generation::variation::{EmbeddingSpace, MutationParams, ValueRange};

/// Environment variable overriding the config file location
pub const CONFIG_ENV: &str = "EVOLUTION_KIOSK_CONFIG";

/// Style entry meaning "no style bias"
pub const RANDOM_STYLE: &str = "Random";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct KioskConfig {
    /// Images shown at once; the oldest unselected one is evicted beyond this
    pub max_images: usize,

    /// Where generated artifacts are written ("{index}.png")
    pub artifact_dir: PathBuf,

    /// Counter database; `None` uses the platform data directory
    pub counter_db: Option<PathBuf>,

    /// Edge length of rendered images in pixels
    pub image_size: u32,

    // ========== Embedding spaces ==========
    pub token_dims: usize,
    pub pooled_dims: usize,
    pub token_range: ValueRange,
    pub pooled_range: ValueRange,

    // ========== Variation ==========
    pub token_mutation: MutationParams,
    pub pooled_mutation: MutationParams,

    /// How far a new image is pulled toward the chosen style (0.0 - 1.0)
    pub style_weight: f32,

    /// Styles offered for new images; "Random" means no bias
    pub styles: Vec<String>,
}

impl Default for KioskConfig {
    fn default() -> Self {
        Self {
            max_images: MAX_IMAGES,
            artifact_dir: PathBuf::from("results"),
            counter_db: None,
            image_size: 256,
            token_dims: 512,
            pooled_dims: 64,
            token_range: ValueRange::new(-1.0, 1.0),
            pooled_range: ValueRange::new(-1.0, 1.0),
            token_mutation: MutationParams { rate: 0.05, strength: 0.25 },
            pooled_mutation: MutationParams { rate: 0.05, strength: 0.1 },
            style_weight: 0.95,
            styles: default_styles(),
        }
    }
}

fn default_styles() -> Vec<String> {
    [
        RANDOM_STYLE,
        "Renaissance",
        "Baroque",
        "Impressionism",
        "Post-Impressionism",
        "Cubism",
        "Surrealism",
        "Pop Art",
        "Abstract Expressionism",
        "Modernism",
        "Fauvism",
        "Pointillism",
        "Minimalism",
        "Digital Art",
        "Street Art",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

impl KioskConfig {
    /// Load from `EVOLUTION_KIOSK_CONFIG` or the platform config directory
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path())
    }

    /// Load from `path`; a missing file yields the defaults
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            info!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let json = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_json(&json)?;
        config.validate()?;

        info!("⚙️  Loaded config from {}", path.display());
        Ok(config)
    }

    /// Get the path where the config file is expected
    /// - Linux: ~/.config/evolution-kiosk/config.json
    pub fn config_path() -> PathBuf {
        if let Some(path) = std::env::var_os(CONFIG_ENV) {
            return PathBuf::from(path);
        }

        let mut path = dirs::config_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."));
        path.push("evolution-kiosk");
        path.push("config.json");
        path
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Reject values the lifecycle cannot work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_images == 0 {
            return Err(ConfigError::Invalid("max_images must be at least 1".to_string()));
        }
        if self.image_size == 0 {
            return Err(ConfigError::Invalid("image_size must be at least 1".to_string()));
        }
        if self.token_dims == 0 {
            return Err(ConfigError::Invalid("token_dims must be at least 1".to_string()));
        }
        for (name, range) in [("token_range", &self.token_range), ("pooled_range", &self.pooled_range)] {
            if !range.is_valid() {
                return Err(ConfigError::Invalid(format!(
                    "{} must have finite min < max, got [{}, {}]",
                    name, range.min, range.max
                )));
            }
        }
        for (name, params) in [
            ("token_mutation", &self.token_mutation),
            ("pooled_mutation", &self.pooled_mutation),
        ] {
            if !(0.0..=1.0).contains(&params.rate) {
                return Err(ConfigError::Invalid(format!("{}.rate must be in [0, 1]", name)));
            }
            if !(params.strength >= 0.0) {
                return Err(ConfigError::Invalid(format!("{}.strength must not be negative", name)));
            }
        }
        if !(0.0..=1.0).contains(&self.style_weight) {
            return Err(ConfigError::Invalid("style_weight must be in [0, 1]".to_string()));
        }
        Ok(())
    }

    pub fn counter_db_path(&self) -> PathBuf {
        self.counter_db.clone().unwrap_or_else(CounterStore::default_path)
    }

    pub fn token_space(&self) -> EmbeddingSpace {
        EmbeddingSpace {
            dims: self.token_dims,
            range: self.token_range,
        }
    }

    pub fn pooled_space(&self) -> EmbeddingSpace {
        EmbeddingSpace {
            dims: self.pooled_dims,
            range: self.pooled_range,
        }
    }

    /// Create the artifact directory if it does not exist yet
    pub fn prepare_artifact_dir(&self) -> Result<(), ConfigError> {
        fs::create_dir_all(&self.artifact_dir).map_err(|source| ConfigError::ArtifactDir {
            path: self.artifact_dir.clone(),
            source,
        })
    }
}
