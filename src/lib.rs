//! Turns a column of free-text documents into a topic model, quality
//! metrics, a topic/word report and an interactive HTML visualization.

pub mod coherence;
pub mod config;
pub mod engine;
pub mod error;
pub mod lda;
pub mod metrics;
pub mod pipeline;
pub mod preprocess;
pub mod report;
pub mod table;
pub mod visualize;
pub mod vocabulary;

pub const MIN_TOPICS: usize = 2;
pub const MAX_TOPICS: usize = 100;

pub use config::PipelineConfig;
pub use engine::{
    AlphaPrior, CoherenceEngine, CoherenceMeasure, HtmlDocument, TopicEngine, TopicModel,
    TrainingParams, VisualizationEngine,
};
pub use error::{ConfigError, EngineError, PipelineError, Stage};
pub use metrics::Metrics;
pub use pipeline::{Pipeline, PipelineOutput};
pub use report::{TopicReport, TopicRow};
pub use table::DocumentTable;
pub use visualize::VisualizationArtifact;
pub use vocabulary::{BowDocument, Corpus, Vocabulary};
