use std::path::PathBuf;

use thiserror::Error;

/// Failures raised by a topic, coherence or visualization engine.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("term id {id} is out of range for a vocabulary of {len} tokens")]
    TermOutOfRange { id: usize, len: usize },

    #[error("unsupported coherence measure `{0}`")]
    UnsupportedMeasure(String),

    #[error("{0}")]
    Failed(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl EngineError {
    pub fn failed(message: impl Into<String>) -> Self {
        EngineError::Failed(message.into())
    }
}

/// Pipeline stage an engine failure surfaced from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Training,
    Metrics,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Training => "training",
            Stage::Metrics => "metric evaluation",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("corpus is empty after preprocessing")]
    EmptyCorpus,

    #[error(
        "topic count {requested} is outside the supported range [{min}, {max}]",
        min = crate::MIN_TOPICS,
        max = crate::MAX_TOPICS
    )]
    InvalidTopicCount { requested: usize },

    #[error("topic model {stage} failed: {source}")]
    TrainingFailure {
        stage: Stage,
        #[source]
        source: EngineError,
    },

    #[error("could not write visualization to {}: {source}", .path.display())]
    VisualizationWriteFailure {
        path: PathBuf,
        #[source]
        source: EngineError,
    },

    #[error("column `{column}` is missing or holds no text")]
    MissingTextColumn { column: String },

    #[error("could not read document table {}: {source}", .path.display())]
    TableRead {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

/// Failures loading a [`crate::PipelineConfig`] file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

pub type Result<T, E = PipelineError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn training_failure_keeps_engine_detail() {
        let err = PipelineError::TrainingFailure {
            stage: Stage::Training,
            source: EngineError::TermOutOfRange { id: 7, len: 3 },
        };
        let rendered = err.to_string();
        assert!(rendered.contains("training"));
        assert!(rendered.contains("term id 7"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn invalid_topic_count_names_bounds() {
        let err = PipelineError::InvalidTopicCount { requested: 101 };
        assert_eq!(
            err.to_string(),
            "topic count 101 is outside the supported range [2, 100]"
        );
    }
}
