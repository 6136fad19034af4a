use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, trace};

use crate::engine::{AlphaPrior, TopicEngine, TopicModel, TrainingParams};
use crate::error::EngineError;
use crate::vocabulary::{BowDocument, Corpus, Vocabulary};

const FOLD_IN_ITERATIONS: usize = 20;
const MIN_ALPHA: f64 = 1e-5;

/// Collapsed Gibbs sampler for latent Dirichlet allocation.
#[derive(Debug, Clone, Default)]
pub struct GibbsLda {
    /// Topic-word prior; `1 / num_topics` when unset.
    pub eta: Option<f64>,
}

impl GibbsLda {
    pub fn new() -> Self {
        GibbsLda::default()
    }

    pub fn fit(
        &self,
        corpus: &Corpus,
        vocabulary: &Vocabulary,
        params: &TrainingParams,
    ) -> Result<LdaModel, EngineError> {
        let num_topics = params.num_topics;
        let vocab_size = vocabulary.len();
        if num_topics == 0 {
            return Err(EngineError::failed("at least one topic is required"));
        }
        if vocab_size == 0 {
            return Err(EngineError::failed("vocabulary is empty"));
        }
        if let Some(id) = corpus.max_term_id().filter(|&id| id >= vocab_size) {
            return Err(EngineError::TermOutOfRange { id, len: vocab_size });
        }
        if corpus.total_tokens() == 0 {
            return Err(EngineError::failed("corpus holds no tokens"));
        }

        let eta = self.eta.unwrap_or(1.0 / num_topics as f64);
        let mut alpha = match params.alpha {
            AlphaPrior::Auto => vec![1.0 / num_topics as f64; num_topics],
            AlphaPrior::Symmetric(value) => vec![value; num_topics],
        };

        // Expand each bag of words into a flat token stream.
        let word_docs: Vec<Vec<usize>> = corpus
            .documents()
            .iter()
            .map(|bow| {
                bow.iter()
                    .flat_map(|&(id, count)| std::iter::repeat(id).take(count))
                    .collect()
            })
            .collect();

        let mut rng = StdRng::seed_from_u64(params.seed);
        let mut word_topic_counts = vec![vec![0usize; vocab_size]; num_topics];
        let mut doc_topic_counts = vec![vec![0usize; num_topics]; word_docs.len()];
        let mut topic_counts = vec![0usize; num_topics];
        let mut doc_word_topics: Vec<Vec<usize>> = Vec::with_capacity(word_docs.len());

        for (doc_id, doc) in word_docs.iter().enumerate() {
            let mut word_topics = Vec::with_capacity(doc.len());
            for &word_id in doc {
                let topic = rng.gen_range(0..num_topics);
                word_topic_counts[topic][word_id] += 1;
                doc_topic_counts[doc_id][topic] += 1;
                topic_counts[topic] += 1;
                word_topics.push(topic);
            }
            doc_word_topics.push(word_topics);
        }

        let vocab_eta = vocab_size as f64 * eta;
        let chunk_size = params.chunk_size.max(1);
        let update_every = params.update_every.max(1);
        let doc_ids: Vec<usize> = (0..word_docs.len()).collect();
        let mut weights = vec![0.0f64; num_topics];

        for iteration in 0..params.iterations {
            for (chunk_index, chunk) in doc_ids.chunks(chunk_size).enumerate() {
                for &doc_id in chunk {
                    for (word_pos, &word_id) in word_docs[doc_id].iter().enumerate() {
                        let old_topic = doc_word_topics[doc_id][word_pos];
                        word_topic_counts[old_topic][word_id] -= 1;
                        doc_topic_counts[doc_id][old_topic] -= 1;
                        topic_counts[old_topic] -= 1;

                        for (topic, weight) in weights.iter_mut().enumerate() {
                            let doc_part = doc_topic_counts[doc_id][topic] as f64 + alpha[topic];
                            let word_part = (word_topic_counts[topic][word_id] as f64 + eta)
                                / (topic_counts[topic] as f64 + vocab_eta);
                            *weight = doc_part * word_part;
                        }
                        let new_topic = WeightedIndex::new(&weights)
                            .map_err(|e| {
                                EngineError::failed(format!("topic sampling failed: {e}"))
                            })?
                            .sample(&mut rng);

                        word_topic_counts[new_topic][word_id] += 1;
                        doc_topic_counts[doc_id][new_topic] += 1;
                        topic_counts[new_topic] += 1;
                        doc_word_topics[doc_id][word_pos] = new_topic;
                    }
                }

                if params.alpha == AlphaPrior::Auto && (chunk_index + 1) % update_every == 0 {
                    update_alpha(&mut alpha, &doc_topic_counts);
                }
            }
            trace!(iteration = iteration + 1, total = params.iterations, "gibbs sweep done");
        }

        let phi: Vec<Vec<f64>> = word_topic_counts
            .iter()
            .zip(&topic_counts)
            .map(|(counts, &total)| {
                let denom = total as f64 + vocab_eta;
                counts.iter().map(|&count| (count as f64 + eta) / denom).collect()
            })
            .collect();

        debug!(num_topics, vocab_size, ?alpha, "lda model fitted");

        let (word_docs, doc_word_topics) = if params.per_word_topics {
            (word_docs, doc_word_topics)
        } else {
            (Vec::new(), Vec::new())
        };

        Ok(LdaModel {
            vocabulary: vocabulary.tokens().to_vec(),
            alpha,
            phi,
            word_docs,
            doc_word_topics,
        })
    }
}

impl TopicEngine for GibbsLda {
    fn train(
        &self,
        corpus: &Corpus,
        vocabulary: &Vocabulary,
        params: &TrainingParams,
    ) -> Result<Box<dyn TopicModel>, EngineError> {
        Ok(Box::new(self.fit(corpus, vocabulary, params)?))
    }
}

/// Minka's fixed-point update for an asymmetric document-topic prior.
fn update_alpha(alpha: &mut [f64], doc_topic_counts: &[Vec<usize>]) {
    let alpha_sum: f64 = alpha.iter().sum();
    let mut denominator = 0.0;
    let mut numerators = vec![0.0; alpha.len()];

    for counts in doc_topic_counts {
        let doc_len: usize = counts.iter().sum();
        if doc_len == 0 {
            continue;
        }
        denominator += digamma(doc_len as f64 + alpha_sum) - digamma(alpha_sum);
        for (topic, numerator) in numerators.iter_mut().enumerate() {
            *numerator += digamma(counts[topic] as f64 + alpha[topic]) - digamma(alpha[topic]);
        }
    }

    if denominator <= 0.0 {
        return;
    }
    for (value, numerator) in alpha.iter_mut().zip(numerators) {
        *value = (*value * numerator / denominator).max(MIN_ALPHA);
    }
}

fn digamma(mut x: f64) -> f64 {
    let mut result = 0.0;
    while x < 6.0 {
        result -= 1.0 / x;
        x += 1.0;
    }
    let f = 1.0 / (x * x);
    result + x.ln()
        - 0.5 / x
        - f * (1.0 / 12.0 - f * (1.0 / 120.0 - f * (1.0 / 252.0 - f * (1.0 / 240.0 - f / 132.0))))
}

/// Fitted LDA model: topic-word distributions plus the learned prior.
#[derive(Debug, Clone)]
pub struct LdaModel {
    vocabulary: Vec<String>,
    alpha: Vec<f64>,
    phi: Vec<Vec<f64>>,
    word_docs: Vec<Vec<usize>>,
    doc_word_topics: Vec<Vec<usize>>,
}

impl LdaModel {
    pub fn alpha(&self) -> &[f64] {
        &self.alpha
    }

    /// Topic-word probability matrix, topics by terms.
    pub fn topic_word_matrix(&self) -> &[Vec<f64>] {
        &self.phi
    }

    /// Topics sampled for each term of a training document, most frequent first.
    ///
    /// `None` when per-word topics were not kept or the index is out of range.
    pub fn word_topics(&self, doc_index: usize) -> Option<Vec<(usize, Vec<usize>)>> {
        let words = self.word_docs.get(doc_index)?;
        let topics = self.doc_word_topics.get(doc_index)?;

        let mut per_term: std::collections::BTreeMap<usize, Vec<usize>> = Default::default();
        for (&word_id, &topic) in words.iter().zip(topics) {
            let counts = per_term
                .entry(word_id)
                .or_insert_with(|| vec![0; self.alpha.len()]);
            counts[topic] += 1;
        }

        Some(
            per_term
                .into_iter()
                .map(|(word_id, counts)| {
                    let mut ranked: Vec<usize> =
                        (0..counts.len()).filter(|&t| counts[t] > 0).collect();
                    ranked.sort_by(|a, b| counts[*b].cmp(&counts[*a]).then(a.cmp(b)));
                    (word_id, ranked)
                })
                .collect(),
        )
    }

    fn check_document(&self, document: &BowDocument) -> Result<(), EngineError> {
        let len = self.vocabulary.len();
        match document.iter().find(|&&(id, _)| id >= len) {
            Some(&(id, _)) => Err(EngineError::TermOutOfRange { id, len }),
            None => Ok(()),
        }
    }

    /// Infers a document's topic mixture against the fixed topic-word distributions.
    fn fold_in(&self, document: &BowDocument) -> Vec<f64> {
        let alpha_sum: f64 = self.alpha.iter().sum();
        let mut theta: Vec<f64> = self.alpha.iter().map(|a| a / alpha_sum).collect();
        if document.is_empty() {
            return theta;
        }

        for _ in 0..FOLD_IN_ITERATIONS {
            let mut next = self.alpha.clone();
            for &(word_id, count) in document {
                let norm: f64 = theta
                    .iter()
                    .zip(&self.phi)
                    .map(|(t, row)| t * row[word_id])
                    .sum();
                if norm <= 0.0 {
                    continue;
                }
                for (topic, value) in next.iter_mut().enumerate() {
                    *value += count as f64 * theta[topic] * self.phi[topic][word_id] / norm;
                }
            }
            let total: f64 = next.iter().sum();
            theta = next.into_iter().map(|v| v / total).collect();
        }
        theta
    }
}

impl TopicModel for LdaModel {
    fn num_topics(&self) -> usize {
        self.phi.len()
    }

    fn log_likelihood(&self, corpus: &Corpus) -> Result<f64, EngineError> {
        let mut total = 0.0;
        for document in corpus.documents() {
            self.check_document(document)?;
            let theta = self.fold_in(document);
            for &(word_id, count) in document {
                let p: f64 = theta
                    .iter()
                    .zip(&self.phi)
                    .map(|(t, row)| t * row[word_id])
                    .sum();
                total += count as f64 * p.ln();
            }
        }
        Ok(total)
    }

    fn topic_terms(&self, topic: usize, top_n: usize) -> Vec<(usize, f64)> {
        let Some(row) = self.phi.get(topic) else {
            return Vec::new();
        };
        let mut terms: Vec<(usize, f64)> = row.iter().copied().enumerate().collect();
        terms.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        terms.truncate(top_n);
        terms
    }

    fn document_topics(&self, document: &BowDocument) -> Vec<f64> {
        if self.check_document(document).is_err() {
            return vec![1.0 / self.num_topics() as f64; self.num_topics()];
        }
        self.fold_in(document)
    }

    fn topics(&self, top_n: usize) -> Vec<(usize, String)> {
        (0..self.num_topics())
            .map(|topic| {
                let rendered = self
                    .topic_terms(topic, top_n)
                    .into_iter()
                    .map(|(word_id, prob)| format!("{:.3}*\"{}\"", prob, self.vocabulary[word_id]))
                    .collect::<Vec<_>>()
                    .join(" + ");
                (topic, rendered)
            })
            .collect()
    }
}
