use std::collections::HashMap;

use counter::Counter;

use crate::error::{PipelineError, Result};

/// Sparse term counts for one document, sorted by term id.
pub type BowDocument = Vec<(usize, usize)>;

/// Token <-> id mapping with ids assigned in first-seen order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Vocabulary {
    tokens: Vec<String>,
    ids: HashMap<String, usize>,
}

impl Vocabulary {
    pub fn build(documents: &[Vec<String>]) -> Self {
        let mut vocabulary = Vocabulary::default();
        for doc in documents {
            for token in doc {
                vocabulary.insert(token);
            }
        }
        vocabulary
    }

    fn insert(&mut self, token: &str) -> usize {
        if let Some(&id) = self.ids.get(token) {
            return id;
        }
        let id = self.tokens.len();
        self.tokens.push(token.to_string());
        self.ids.insert(token.to_string(), id);
        id
    }

    pub fn id(&self, token: &str) -> Option<usize> {
        self.ids.get(token).copied()
    }

    pub fn token(&self, id: usize) -> Option<&str> {
        self.tokens.get(id).map(String::as_str)
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Encodes a token list as term counts. Unknown tokens are skipped.
    pub fn doc2bow(&self, tokens: &[String]) -> BowDocument {
        let counts: Counter<usize> = tokens.iter().filter_map(|t| self.id(t)).collect();
        let mut bow: BowDocument = counts.into_iter().collect();
        bow.sort_unstable_by_key(|&(id, _)| id);
        bow
    }
}

/// Bag-of-words corpus, one entry per input document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Corpus {
    documents: Vec<BowDocument>,
}

impl Corpus {
    pub fn encode(vocabulary: &Vocabulary, documents: &[Vec<String>]) -> Self {
        Corpus {
            documents: documents.iter().map(|doc| vocabulary.doc2bow(doc)).collect(),
        }
    }

    pub fn from_documents(documents: Vec<BowDocument>) -> Self {
        Corpus { documents }
    }

    pub fn documents(&self) -> &[BowDocument] {
        &self.documents
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn total_tokens(&self) -> usize {
        self.documents
            .iter()
            .flat_map(|doc| doc.iter().map(|&(_, count)| count))
            .sum()
    }

    /// Largest term id referenced, if any.
    pub fn max_term_id(&self) -> Option<usize> {
        self.documents
            .iter()
            .flat_map(|doc| doc.iter().map(|&(id, _)| id))
            .max()
    }
}

/// Builds the vocabulary and encodes the corpus against it.
///
/// Fails with [`PipelineError::EmptyCorpus`] when there are no documents or
/// no tokens in any of them.
pub fn build_corpus(documents: &[Vec<String>]) -> Result<(Vocabulary, Corpus)> {
    let vocabulary = Vocabulary::build(documents);
    if vocabulary.is_empty() {
        return Err(PipelineError::EmptyCorpus);
    }
    let corpus = Corpus::encode(&vocabulary, documents);
    Ok((vocabulary, corpus))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn docs(raw: &[&[&str]]) -> Vec<Vec<String>> {
        raw.iter()
            .map(|doc| doc.iter().map(|t| t.to_string()).collect())
            .collect()
    }

    #[test]
    fn ids_follow_first_seen_order() {
        let vocabulary = Vocabulary::build(&docs(&[&["great", "food"], &["bad", "food"]]));
        assert_eq!(vocabulary.tokens(), &["great", "food", "bad"]);
        assert_eq!(vocabulary.id("bad"), Some(2));
        assert_eq!(vocabulary.token(1), Some("food"));
        assert_eq!(vocabulary.id("missing"), None);
    }

    #[test]
    fn vocabulary_is_a_bijection_over_observed_tokens() {
        let documents = docs(&[&["a", "b", "a"], &[], &["c", "b", "d", "d"]]);
        let vocabulary = Vocabulary::build(&documents);
        for token in documents.iter().flatten() {
            let id = vocabulary.id(token).expect("token in vocabulary");
            assert_eq!(vocabulary.token(id), Some(token.as_str()));
        }
        let mut ids: Vec<usize> = vocabulary
            .tokens()
            .iter()
            .filter_map(|t| vocabulary.id(t))
            .collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), vocabulary.len());
    }

    #[test]
    fn corpus_counts_terms_per_document() {
        let documents = docs(&[&["b", "a", "b"], &[], &["a"]]);
        let (vocabulary, corpus) = build_corpus(&documents).unwrap();
        assert_eq!(corpus.len(), 3);
        assert_eq!(corpus.documents()[0], vec![(0, 2), (1, 1)]);
        assert!(corpus.documents()[1].is_empty());
        assert_eq!(corpus.documents()[2], vec![(vocabulary.id("a").unwrap(), 1)]);
        assert_eq!(corpus.total_tokens(), 4);
        assert_eq!(corpus.max_term_id(), Some(1));
    }

    #[test]
    fn empty_corpus_is_rejected() {
        assert!(matches!(build_corpus(&[]), Err(PipelineError::EmptyCorpus)));
        assert!(matches!(
            build_corpus(&docs(&[&[], &[], &[]])),
            Err(PipelineError::EmptyCorpus)
        ));
    }
}
