//! Seams to the topic-inference, coherence and visualization engines.
//!
//! The pipeline only talks to these traits. The crate ships one implementation
//! of each (`lda`, `coherence`, `visualize`), and any of them can be replaced.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::vocabulary::{BowDocument, Corpus, Vocabulary};

/// Dirichlet prior over per-document topic mixtures.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlphaPrior {
    /// Learned from the corpus, starting from `1 / num_topics`.
    Auto,
    Symmetric(f64),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingParams {
    pub num_topics: usize,
    pub seed: u64,
    /// Number of chunks between prior updates.
    pub update_every: usize,
    pub chunk_size: usize,
    pub alpha: AlphaPrior,
    pub per_word_topics: bool,
    /// Sampling sweeps over the corpus.
    pub iterations: usize,
}

impl TrainingParams {
    pub fn new(num_topics: usize, seed: u64) -> Self {
        TrainingParams {
            num_topics,
            seed,
            ..TrainingParams::default()
        }
    }
}

impl Default for TrainingParams {
    fn default() -> Self {
        TrainingParams {
            num_topics: 5,
            seed: 100,
            update_every: 1,
            chunk_size: 100,
            alpha: AlphaPrior::Auto,
            per_word_topics: true,
            iterations: 50,
        }
    }
}

/// A fitted topic model.
pub trait TopicModel: Send + Sync {
    fn num_topics(&self) -> usize;

    /// Total log-likelihood of `corpus` under the model.
    fn log_likelihood(&self, corpus: &Corpus) -> Result<f64, EngineError>;

    /// Top `top_n` (term id, probability) pairs of a topic, most probable first.
    fn topic_terms(&self, topic: usize, top_n: usize) -> Vec<(usize, f64)>;

    /// Topic mixture of one document; sums to one.
    fn document_topics(&self, document: &BowDocument) -> Vec<f64>;

    /// Each topic rendered as `0.123*"word" + ...`, in topic order.
    fn topics(&self, top_n: usize) -> Vec<(usize, String)>;
}

pub trait TopicEngine: Send + Sync {
    fn train(
        &self,
        corpus: &Corpus,
        vocabulary: &Vocabulary,
        params: &TrainingParams,
    ) -> Result<Box<dyn TopicModel>, EngineError>;
}

/// Coherence measure identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CoherenceMeasure {
    #[serde(rename = "c_v")]
    CV,
    #[serde(rename = "u_mass")]
    UMass,
}

impl CoherenceMeasure {
    pub fn as_str(&self) -> &'static str {
        match self {
            CoherenceMeasure::CV => "c_v",
            CoherenceMeasure::UMass => "u_mass",
        }
    }
}

impl std::str::FromStr for CoherenceMeasure {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "c_v" => Ok(CoherenceMeasure::CV),
            "u_mass" => Ok(CoherenceMeasure::UMass),
            other => Err(EngineError::UnsupportedMeasure(other.to_string())),
        }
    }
}

pub trait CoherenceEngine: Send + Sync {
    fn score(
        &self,
        model: &dyn TopicModel,
        texts: &[Vec<String>],
        vocabulary: &Vocabulary,
        measure: CoherenceMeasure,
    ) -> Result<f64, EngineError>;
}

/// A rendered, self-contained HTML page.
#[derive(Debug, Clone, PartialEq)]
pub struct HtmlDocument {
    pub html: String,
}

pub trait VisualizationEngine: Send + Sync {
    fn render(
        &self,
        model: &dyn TopicModel,
        corpus: &Corpus,
        vocabulary: &Vocabulary,
    ) -> Result<HtmlDocument, EngineError>;

    fn save(&self, document: &HtmlDocument, path: &Path) -> Result<(), EngineError>;
}
