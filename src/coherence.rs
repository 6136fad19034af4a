use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::engine::{CoherenceEngine, CoherenceMeasure, TopicModel};
use crate::error::EngineError;
use crate::vocabulary::Vocabulary;

const EPSILON: f64 = 1e-12;

/// Co-occurrence based topic coherence over the tokenized texts.
#[derive(Debug, Clone)]
pub struct SlidingWindowCoherence {
    /// Boolean sliding window width used by `c_v`.
    pub window_size: usize,
    /// Top words per topic that are scored.
    pub top_n: usize,
}

impl Default for SlidingWindowCoherence {
    fn default() -> Self {
        SlidingWindowCoherence {
            window_size: 110,
            top_n: 20,
        }
    }
}

/// Occurrence counts of single words and word pairs over a set of windows.
#[derive(Debug, Default)]
struct Occurrences {
    windows: usize,
    single: HashMap<usize, usize>,
    pairs: HashMap<(usize, usize), usize>,
}

impl Occurrences {
    fn record(&mut self, present: &HashSet<usize>) {
        self.windows += 1;
        let mut ids: Vec<usize> = present.iter().copied().collect();
        ids.sort_unstable();
        for (i, &a) in ids.iter().enumerate() {
            *self.single.entry(a).or_default() += 1;
            for &b in &ids[i + 1..] {
                *self.pairs.entry((a, b)).or_default() += 1;
            }
        }
    }

    fn count(&self, a: usize) -> usize {
        self.single.get(&a).copied().unwrap_or(0)
    }

    fn joint(&self, a: usize, b: usize) -> usize {
        if a == b {
            return self.count(a);
        }
        let key = if a < b { (a, b) } else { (b, a) };
        self.pairs.get(&key).copied().unwrap_or(0)
    }

    fn prob(&self, count: usize) -> f64 {
        if self.windows == 0 {
            0.0
        } else {
            count as f64 / self.windows as f64
        }
    }

    fn npmi(&self, a: usize, b: usize) -> f64 {
        let p_a = self.prob(self.count(a));
        let p_b = self.prob(self.count(b));
        if p_a == 0.0 || p_b == 0.0 {
            return 0.0;
        }
        let p_ab = self.prob(self.joint(a, b)) + EPSILON;
        (p_ab / (p_a * p_b)).ln() / -p_ab.ln()
    }
}

impl SlidingWindowCoherence {
    fn top_words(&self, model: &dyn TopicModel) -> Vec<Vec<usize>> {
        (0..model.num_topics())
            .map(|topic| {
                model
                    .topic_terms(topic, self.top_n)
                    .into_iter()
                    .map(|(id, _)| id)
                    .collect()
            })
            .collect()
    }

    fn sliding_windows(&self, texts: &[Vec<usize>], relevant: &HashSet<usize>) -> Occurrences {
        let mut occurrences = Occurrences::default();
        let width = self.window_size.max(1);
        for text in texts {
            if text.len() <= width {
                let present: HashSet<usize> =
                    text.iter().copied().filter(|id| relevant.contains(id)).collect();
                occurrences.record(&present);
                continue;
            }
            for window in text.windows(width) {
                let present: HashSet<usize> =
                    window.iter().copied().filter(|id| relevant.contains(id)).collect();
                occurrences.record(&present);
            }
        }
        occurrences
    }

    fn whole_documents(texts: &[Vec<usize>], relevant: &HashSet<usize>) -> Occurrences {
        let mut occurrences = Occurrences::default();
        for text in texts {
            let present: HashSet<usize> =
                text.iter().copied().filter(|id| relevant.contains(id)).collect();
            occurrences.record(&present);
        }
        occurrences
    }

    /// One-set segmentation with indirect cosine confirmation over NPMI vectors.
    fn c_v(occurrences: &Occurrences, words: &[usize]) -> f64 {
        if words.is_empty() {
            return 0.0;
        }
        let vectors: Vec<Vec<f64>> = words
            .iter()
            .map(|&w| words.iter().map(|&other| occurrences.npmi(w, other)).collect())
            .collect();
        let topic_vector: Vec<f64> = (0..words.len())
            .map(|j| vectors.iter().map(|v| v[j]).sum())
            .collect();

        let total: f64 = vectors
            .iter()
            .map(|v| cosine_similarity(v, &topic_vector))
            .sum();
        total / words.len() as f64
    }

    fn u_mass(occurrences: &Occurrences, words: &[usize]) -> f64 {
        let mut total = 0.0;
        let mut pairs = 0usize;
        for i in 1..words.len() {
            for j in 0..i {
                let prior = occurrences.prob(occurrences.count(words[j]));
                if prior == 0.0 {
                    continue;
                }
                let joint = occurrences.prob(occurrences.joint(words[i], words[j]));
                total += ((joint + EPSILON) / prior).ln();
                pairs += 1;
            }
        }
        if pairs == 0 {
            0.0
        } else {
            total / pairs as f64
        }
    }
}

fn cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
    let dot: f64 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f64>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

impl CoherenceEngine for SlidingWindowCoherence {
    fn score(
        &self,
        model: &dyn TopicModel,
        texts: &[Vec<String>],
        vocabulary: &Vocabulary,
        measure: CoherenceMeasure,
    ) -> Result<f64, EngineError> {
        let topics = self.top_words(model);
        if topics.is_empty() {
            return Err(EngineError::failed("model has no topics to score"));
        }
        if let Some(&id) = topics.iter().flatten().find(|&&id| id >= vocabulary.len()) {
            return Err(EngineError::TermOutOfRange {
                id,
                len: vocabulary.len(),
            });
        }

        let relevant: HashSet<usize> = topics.iter().flatten().copied().collect();
        let texts: Vec<Vec<usize>> = texts
            .iter()
            .map(|tokens| tokens.iter().filter_map(|t| vocabulary.id(t)).collect())
            .collect();

        let per_topic: Vec<f64> = match measure {
            CoherenceMeasure::CV => {
                let occurrences = self.sliding_windows(&texts, &relevant);
                topics.iter().map(|words| Self::c_v(&occurrences, words)).collect()
            }
            CoherenceMeasure::UMass => {
                let occurrences = Self::whole_documents(&texts, &relevant);
                topics.iter().map(|words| Self::u_mass(&occurrences, words)).collect()
            }
        };
        debug!(measure = measure.as_str(), ?per_topic, "per-topic coherence");

        Ok(per_topic.iter().sum::<f64>() / per_topic.len() as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vocabulary::BowDocument;

    /// Fixed topics over a known vocabulary.
    struct FixedModel {
        topics: Vec<Vec<(usize, f64)>>,
    }

    impl TopicModel for FixedModel {
        fn num_topics(&self) -> usize {
            self.topics.len()
        }
        fn log_likelihood(&self, _: &crate::vocabulary::Corpus) -> Result<f64, EngineError> {
            Ok(0.0)
        }
        fn topic_terms(&self, topic: usize, top_n: usize) -> Vec<(usize, f64)> {
            self.topics[topic].iter().copied().take(top_n).collect()
        }
        fn document_topics(&self, _: &BowDocument) -> Vec<f64> {
            vec![1.0 / self.topics.len() as f64; self.topics.len()]
        }
        fn topics(&self, _: usize) -> Vec<(usize, String)> {
            Vec::new()
        }
    }

    fn texts(raw: &[&str]) -> Vec<Vec<String>> {
        raw.iter()
            .map(|doc| doc.split_whitespace().map(str::to_string).collect())
            .collect()
    }

    #[test]
    fn co_occurring_words_score_higher_than_disjoint_ones() {
        let texts = texts(&[
            "apple banana", "apple banana", "car road", "car road", "apple banana",
        ]);
        let vocabulary = Vocabulary::build(&texts);
        let id = |w: &str| vocabulary.id(w).unwrap();
        let engine = SlidingWindowCoherence::default();

        let coherent = FixedModel {
            topics: vec![
                vec![(id("apple"), 0.5), (id("banana"), 0.5)],
                vec![(id("car"), 0.5), (id("road"), 0.5)],
            ],
        };
        let mixed = FixedModel {
            topics: vec![
                vec![(id("apple"), 0.5), (id("car"), 0.5)],
                vec![(id("banana"), 0.5), (id("road"), 0.5)],
            ],
        };

        let good = engine
            .score(&coherent, &texts, &vocabulary, CoherenceMeasure::CV)
            .unwrap();
        let bad = engine
            .score(&mixed, &texts, &vocabulary, CoherenceMeasure::CV)
            .unwrap();
        assert!(good > bad, "expected {good} > {bad}");

        let good = engine
            .score(&coherent, &texts, &vocabulary, CoherenceMeasure::UMass)
            .unwrap();
        let bad = engine
            .score(&mixed, &texts, &vocabulary, CoherenceMeasure::UMass)
            .unwrap();
        assert!(good > bad, "expected {good} > {bad}");
    }

    #[test]
    fn npmi_is_bounded() {
        let mut occurrences = Occurrences::default();
        occurrences.record(&[0, 1].into_iter().collect());
        occurrences.record(&[0].into_iter().collect());
        occurrences.record(&[2].into_iter().collect());
        for (a, b) in [(0, 1), (0, 2), (1, 2), (0, 0)] {
            let value = occurrences.npmi(a, b);
            assert!((-1.0..=1.0 + 1e-9).contains(&value), "npmi({a},{b}) = {value}");
        }
    }

    #[test]
    fn defaults_score_twenty_words_in_110_token_windows() {
        let engine = SlidingWindowCoherence::default();
        assert_eq!(engine.window_size, 110);
        assert_eq!(engine.top_n, 20);
    }

    #[test]
    fn long_texts_use_sliding_windows() {
        let engine = SlidingWindowCoherence {
            window_size: 2,
            top_n: 10,
        };
        let relevant: HashSet<usize> = [0, 1, 2].into_iter().collect();
        let occurrences = engine.sliding_windows(&[vec![0, 1, 2]], &relevant);
        assert_eq!(occurrences.windows, 2);
        assert_eq!(occurrences.joint(0, 1), 1);
        assert_eq!(occurrences.joint(0, 2), 0);
        assert_eq!(occurrences.count(1), 2);
    }

    #[test]
    fn measure_names_round_trip() {
        assert_eq!("c_v".parse::<CoherenceMeasure>().unwrap(), CoherenceMeasure::CV);
        assert!(matches!(
            "c_npmi".parse::<CoherenceMeasure>(),
            Err(EngineError::UnsupportedMeasure(_))
        ));
    }
}
