use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::engine::{AlphaPrior, CoherenceMeasure, TrainingParams};
use crate::error::ConfigError;

/// Per-run pipeline settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub num_topics: usize,
    pub remove_stop_words: bool,
    pub stem_words: bool,
    /// Comma-separated words added to the baseline stoplist.
    pub additional_stop_words: String,
    pub seed: u64,
    /// Words per topic in the report.
    pub top_n_words: usize,
    pub stemmer_language: String,
    pub coherence: CoherenceMeasure,
    pub iterations: usize,
    pub output_dir: PathBuf,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            num_topics: 5,
            remove_stop_words: false,
            stem_words: false,
            additional_stop_words: String::new(),
            seed: 100,
            top_n_words: 10,
            stemmer_language: "english".to_string(),
            coherence: CoherenceMeasure::CV,
            iterations: 50,
            output_dir: PathBuf::from("./data/"),
        }
    }
}

impl PipelineConfig {
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Training hyperparameters: one update per chunk of 100 documents, a
    /// learned prior and per-word topic assignments.
    pub fn training_params(&self) -> TrainingParams {
        TrainingParams {
            num_topics: self.num_topics,
            seed: self.seed,
            update_every: 1,
            chunk_size: 100,
            alpha: AlphaPrior::Auto,
            per_word_topics: true,
            iterations: self.iterations,
        }
    }
}
