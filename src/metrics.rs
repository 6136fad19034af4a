use serde::{Deserialize, Serialize};
use tracing::info;

use crate::engine::{CoherenceEngine, CoherenceMeasure, TopicModel};
use crate::error::{EngineError, PipelineError, Result, Stage};
use crate::vocabulary::{Corpus, Vocabulary};

/// Model quality scores, rounded to four decimal places.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub coherence: f64,
    pub perplexity: f64,
}

pub fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

/// Per-token log-likelihood bound of `corpus`.
///
/// Computed on the same corpus the model was trained on, so the resulting
/// perplexity is an in-sample fit measure.
pub fn log_perplexity(model: &dyn TopicModel, corpus: &Corpus) -> Result<f64, EngineError> {
    let total_tokens = corpus.total_tokens();
    if total_tokens == 0 {
        return Err(EngineError::failed("cannot compute perplexity of an empty corpus"));
    }
    Ok(model.log_likelihood(corpus)? / total_tokens as f64)
}

pub fn evaluate(
    engine: &dyn CoherenceEngine,
    model: &dyn TopicModel,
    texts: &[Vec<String>],
    corpus: &Corpus,
    vocabulary: &Vocabulary,
    measure: CoherenceMeasure,
) -> Result<Metrics> {
    let wrap = |source| PipelineError::TrainingFailure {
        stage: Stage::Metrics,
        source,
    };

    let coherence = engine
        .score(model, texts, vocabulary, measure)
        .map_err(wrap)?;
    let bound = log_perplexity(model, corpus).map_err(wrap)?;
    let perplexity = (-bound).exp();

    let metrics = Metrics {
        coherence: round4(coherence),
        perplexity: round4(perplexity),
    };
    info!(
        measure = measure.as_str(),
        coherence = metrics.coherence,
        perplexity = metrics.perplexity,
        "model evaluated"
    );
    Ok(metrics)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vocabulary::BowDocument;

    struct UniformModel {
        vocab_size: usize,
    }

    impl TopicModel for UniformModel {
        fn num_topics(&self) -> usize {
            2
        }
        fn log_likelihood(&self, corpus: &Corpus) -> Result<f64, EngineError> {
            Ok(corpus.total_tokens() as f64 * (1.0 / self.vocab_size as f64).ln())
        }
        fn topic_terms(&self, _: usize, top_n: usize) -> Vec<(usize, f64)> {
            (0..self.vocab_size.min(top_n))
                .map(|id| (id, 1.0 / self.vocab_size as f64))
                .collect()
        }
        fn document_topics(&self, _: &BowDocument) -> Vec<f64> {
            vec![0.5, 0.5]
        }
        fn topics(&self, _: usize) -> Vec<(usize, String)> {
            Vec::new()
        }
    }

    struct ConstantCoherence(Result<f64, ()>);

    impl CoherenceEngine for ConstantCoherence {
        fn score(
            &self,
            _: &dyn TopicModel,
            _: &[Vec<String>],
            _: &Vocabulary,
            _: CoherenceMeasure,
        ) -> Result<f64, EngineError> {
            self.0.map_err(|_| EngineError::failed("coherence blew up"))
        }
    }

    #[test]
    fn rounds_to_four_places() {
        assert_eq!(round4(0.123_456), 0.1235);
        assert_eq!(round4(12.000_04), 12.0);
        assert_eq!(round4(-0.987_66), -0.9877);
    }

    #[test]
    fn uniform_model_perplexity_equals_vocabulary_size() {
        let texts = vec![vec!["a".to_string(), "b".to_string(), "c".to_string(), "d".to_string()]];
        let vocabulary = Vocabulary::build(&texts);
        let corpus = Corpus::encode(&vocabulary, &texts);
        let model = UniformModel { vocab_size: 4 };

        let metrics = evaluate(
            &ConstantCoherence(Ok(0.4567891)),
            &model,
            &texts,
            &corpus,
            &vocabulary,
            CoherenceMeasure::CV,
        )
        .unwrap();
        assert_eq!(metrics.coherence, 0.4568);
        assert_eq!(metrics.perplexity, 4.0);
    }

    #[test]
    fn coherence_failure_is_wrapped_with_detail() {
        let texts = vec![vec!["a".to_string()]];
        let vocabulary = Vocabulary::build(&texts);
        let corpus = Corpus::encode(&vocabulary, &texts);
        let err = evaluate(
            &ConstantCoherence(Err(())),
            &UniformModel { vocab_size: 1 },
            &texts,
            &corpus,
            &vocabulary,
            CoherenceMeasure::CV,
        )
        .unwrap_err();
        match err {
            PipelineError::TrainingFailure { stage, source } => {
                assert_eq!(stage, Stage::Metrics);
                assert_eq!(source.to_string(), "coherence blew up");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
