use serde::Serialize;
use tracing::{debug, info, warn};

use crate::coherence::SlidingWindowCoherence;
use crate::config::PipelineConfig;
use crate::engine::{
    CoherenceEngine, TopicEngine, TopicModel, TrainingParams, VisualizationEngine,
};
use crate::error::{PipelineError, Result, Stage};
use crate::lda::GibbsLda;
use crate::metrics::{self, Metrics};
use crate::preprocess::{clean_text, tokenize, SnowballStemmer, StopWords, TokenStemmer};
use crate::report::TopicReport;
use crate::table::DocumentTable;
use crate::visualize::{self, HtmlRenderer, VisualizationArtifact};
use crate::vocabulary::{build_corpus, Corpus, Vocabulary};
use crate::{MAX_TOPICS, MIN_TOPICS};

/// Everything a run hands back to its caller.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineOutput {
    pub html_file_path: VisualizationArtifact,
    pub metrics: Metrics,
    pub topic_report: TopicReport,
    pub num_topics: usize,
    pub vocabulary_size: usize,
    pub documents: usize,
}

/// Text-to-topic-model pipeline over swappable engines.
pub struct Pipeline {
    topic_engine: Box<dyn TopicEngine>,
    coherence_engine: Box<dyn CoherenceEngine>,
    visualization_engine: Box<dyn VisualizationEngine>,
    stemmer: Option<Box<dyn TokenStemmer>>,
}

impl Default for Pipeline {
    fn default() -> Self {
        Pipeline::new(
            Box::new(GibbsLda::new()),
            Box::new(SlidingWindowCoherence::default()),
            Box::new(HtmlRenderer::default()),
        )
    }
}

impl Pipeline {
    pub fn new(
        topic_engine: Box<dyn TopicEngine>,
        coherence_engine: Box<dyn CoherenceEngine>,
        visualization_engine: Box<dyn VisualizationEngine>,
    ) -> Self {
        Pipeline {
            topic_engine,
            coherence_engine,
            visualization_engine,
            stemmer: None,
        }
    }

    /// Replaces the Snowball stemmer picked from the configured language.
    pub fn with_stemmer(mut self, stemmer: Box<dyn TokenStemmer>) -> Self {
        self.stemmer = Some(stemmer);
        self
    }

    pub fn run_table(
        &self,
        table: &DocumentTable,
        column: &str,
        config: &PipelineConfig,
    ) -> Result<PipelineOutput> {
        let documents = table.text_column(column)?;
        self.run(&documents, config)
    }

    /// Runs every stage once, start to finish.
    pub fn run<S: AsRef<str>>(
        &self,
        documents: &[S],
        config: &PipelineConfig,
    ) -> Result<PipelineOutput> {
        info!(
            documents = documents.len(),
            num_topics = config.num_topics,
            remove_stop_words = config.remove_stop_words,
            stem_words = config.stem_words,
            "starting topic pipeline"
        );
        let fallback;
        let stemmer: &dyn TokenStemmer = match &self.stemmer {
            Some(stemmer) => stemmer.as_ref(),
            None => {
                fallback = resolve_stemmer(&config.stemmer_language);
                &fallback
            }
        };

        let texts = preprocess(documents, config, stemmer);
        let run = PipelineRun::prepare(texts)?;
        let model = run.train(self.topic_engine.as_ref(), &config.training_params())?;

        let metrics = metrics::evaluate(
            self.coherence_engine.as_ref(),
            model.as_ref(),
            &run.texts,
            &run.corpus,
            &run.vocabulary,
            config.coherence,
        )?;
        let topic_report = TopicReport::from_model(model.as_ref(), config.top_n_words);
        let artifact = visualize::export(
            self.visualization_engine.as_ref(),
            model.as_ref(),
            &run.corpus,
            &run.vocabulary,
            &config.output_dir,
        )?;

        Ok(PipelineOutput {
            html_file_path: artifact,
            metrics,
            topic_report,
            num_topics: model.num_topics(),
            vocabulary_size: run.vocabulary.len(),
            documents: run.corpus.len(),
        })
    }
}

fn resolve_stemmer(language: &str) -> SnowballStemmer {
    SnowballStemmer::for_language(language).unwrap_or_else(|| {
        warn!(language, "no stemmer for language, using english");
        SnowballStemmer::english()
    })
}

/// Normalizes, optionally filters stopwords, and optionally stems.
pub fn preprocess<S: AsRef<str>>(
    documents: &[S],
    config: &PipelineConfig,
    stemmer: &dyn TokenStemmer,
) -> Vec<Vec<String>> {
    let mut texts = tokenize(&clean_text(documents));
    if config.remove_stop_words {
        let stop_words = StopWords::with_additional(&config.additional_stop_words);
        texts = stop_words.remove(texts);
        debug!(stop_words = stop_words.len(), "stopwords removed");
    }
    if config.stem_words {
        texts = stemmer.stem_documents(texts);
        debug!("tokens stemmed");
    }
    texts
}

pub fn validate_topic_count(num_topics: usize) -> Result<()> {
    if (MIN_TOPICS..=MAX_TOPICS).contains(&num_topics) {
        Ok(())
    } else {
        Err(PipelineError::InvalidTopicCount {
            requested: num_topics,
        })
    }
}

/// State owned by a single run; dropped when the run returns.
struct PipelineRun {
    texts: Vec<Vec<String>>,
    vocabulary: Vocabulary,
    corpus: Corpus,
}

impl PipelineRun {
    fn prepare(texts: Vec<Vec<String>>) -> Result<Self> {
        let (vocabulary, corpus) = build_corpus(&texts)?;
        info!(
            vocabulary = vocabulary.len(),
            documents = corpus.len(),
            tokens = corpus.total_tokens(),
            "corpus built"
        );
        Ok(PipelineRun {
            texts,
            vocabulary,
            corpus,
        })
    }

    fn train(
        &self,
        engine: &dyn TopicEngine,
        params: &TrainingParams,
    ) -> Result<Box<dyn TopicModel>> {
        validate_topic_count(params.num_topics)?;
        let model = engine
            .train(&self.corpus, &self.vocabulary, params)
            .map_err(|source| PipelineError::TrainingFailure {
                stage: Stage::Training,
                source,
            })?;
        info!(
            num_topics = model.num_topics(),
            seed = params.seed,
            "topic model trained"
        );
        Ok(model)
    }
}
