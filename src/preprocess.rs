use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};

static NON_ALPHANUMERIC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^A-Za-z0-9 ]+").expect("literal regex"));

/// Baseline stoplist: the NLTK English list followed by corpus noise tokens.
pub const BASELINE_STOP_WORDS: &[&str] = &[
    "i", "me", "my", "myself", "we", "our", "ours", "ourselves", "you", "you're",
    "you've", "you'll", "you'd", "your", "yours", "yourself", "yourselves", "he",
    "him", "his", "himself", "she", "she's", "her", "hers", "herself", "it", "it's",
    "its", "itself", "they", "them", "their", "theirs", "themselves", "what", "which",
    "who", "whom", "this", "that", "that'll", "these", "those", "am", "is", "are",
    "was", "were", "be", "been", "being", "have", "has", "had", "having", "do",
    "does", "did", "doing", "a", "an", "the", "and", "but", "if", "or", "because",
    "as", "until", "while", "of", "at", "by", "for", "with", "about", "against",
    "between", "into", "through", "during", "before", "after", "above", "below", "to",
    "from", "up", "down", "in", "out", "on", "off", "over", "under", "again",
    "further", "then", "once", "here", "there", "when", "where", "why", "how", "all",
    "any", "both", "each", "few", "more", "most", "other", "some", "such", "no", "nor",
    "not", "only", "own", "same", "so", "than", "too", "very", "s", "t", "can",
    "will", "just", "don", "don't", "should", "should've", "now", "d", "ll", "m", "o",
    "re", "ve", "y", "ain", "aren", "aren't", "couldn", "couldn't", "didn", "didn't",
    "doesn", "doesn't", "hadn", "hadn't", "hasn", "hasn't", "haven", "haven't", "isn",
    "isn't", "ma", "mightn", "mightn't", "mustn", "mustn't", "needn", "needn't",
    "shan", "shan't", "shouldn", "shouldn't", "wasn", "wasn't", "weren", "weren't",
    "won", "won't", "wouldn", "wouldn't",
    // corpus noise
    "from", "subject", "re", "edu", "use", "?", "&", ".", "chipotle",
];

/// Strips everything but ASCII letters, digits and spaces, then lowercases.
pub fn clean_text<S: AsRef<str>>(documents: &[S]) -> Vec<String> {
    documents
        .iter()
        .map(|doc| NON_ALPHANUMERIC.replace_all(doc.as_ref(), "").to_lowercase())
        .collect()
}

/// Splits cleaned documents on whitespace.
pub fn tokenize<S: AsRef<str>>(documents: &[S]) -> Vec<Vec<String>> {
    documents
        .iter()
        .map(|doc| doc.as_ref().split_whitespace().map(str::to_string).collect())
        .collect()
}

/// Baseline stoplist unioned with caller-supplied words, built once per run.
#[derive(Debug, Clone)]
pub struct StopWords {
    words: HashSet<String>,
}

impl StopWords {
    /// `additional` is a comma-separated list; entries are trimmed and blanks skipped.
    pub fn with_additional(additional: &str) -> Self {
        let mut words: HashSet<String> =
            BASELINE_STOP_WORDS.iter().map(|w| w.to_string()).collect();
        words.extend(parse_word_list(additional));
        StopWords { words }
    }

    pub fn contains(&self, word: &str) -> bool {
        self.words.contains(word)
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Drops stopwords from every document. Documents may end up empty.
    pub fn remove(&self, documents: Vec<Vec<String>>) -> Vec<Vec<String>> {
        documents
            .into_iter()
            .map(|tokens| tokens.into_iter().filter(|t| !self.contains(t)).collect())
            .collect()
    }
}

impl Default for StopWords {
    fn default() -> Self {
        StopWords::with_additional("")
    }
}

pub fn parse_word_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect()
}

/// Reduces one token to its stem.
pub trait TokenStemmer: Send + Sync {
    fn stem(&self, token: &str) -> String;

    /// Stems every token in place of the original, one for one.
    fn stem_documents(&self, documents: Vec<Vec<String>>) -> Vec<Vec<String>> {
        documents
            .into_iter()
            .map(|tokens| tokens.iter().map(|t| self.stem(t)).collect())
            .collect()
    }
}

/// Snowball stemmer backed by `rust_stemmers`.
pub struct SnowballStemmer {
    stemmer: Stemmer,
    algorithm: Algorithm,
}

impl std::fmt::Debug for SnowballStemmer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnowballStemmer")
            .field("algorithm", &self.algorithm)
            .finish()
    }
}

impl SnowballStemmer {
    pub fn new(algorithm: Algorithm) -> Self {
        SnowballStemmer {
            stemmer: Stemmer::create(algorithm),
            algorithm,
        }
    }

    pub fn english() -> Self {
        SnowballStemmer::new(Algorithm::English)
    }

    /// Looks up the algorithm by lowercase language name, e.g. `"english"`.
    pub fn for_language(language: &str) -> Option<Self> {
        let algorithm = match language.trim().to_lowercase().as_str() {
            "arabic" => Algorithm::Arabic,
            "danish" => Algorithm::Danish,
            "dutch" => Algorithm::Dutch,
            "english" => Algorithm::English,
            "finnish" => Algorithm::Finnish,
            "french" => Algorithm::French,
            "german" => Algorithm::German,
            "greek" => Algorithm::Greek,
            "hungarian" => Algorithm::Hungarian,
            "italian" => Algorithm::Italian,
            "norwegian" => Algorithm::Norwegian,
            "portuguese" => Algorithm::Portuguese,
            "romanian" => Algorithm::Romanian,
            "russian" => Algorithm::Russian,
            "spanish" => Algorithm::Spanish,
            "swedish" => Algorithm::Swedish,
            "tamil" => Algorithm::Tamil,
            "turkish" => Algorithm::Turkish,
            _ => return None,
        };
        Some(SnowballStemmer::new(algorithm))
    }
}

impl TokenStemmer for SnowballStemmer {
    fn stem(&self, token: &str) -> String {
        self.stemmer.stem(token).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_text_keeps_only_lowercase_alphanumerics_and_spaces() {
        let docs = vec![
            "Hello, World!".to_string(),
            "It's 2024 -- déjà vu?".to_string(),
            "".to_string(),
            "\tTabs\nand newlines".to_string(),
        ];
        let cleaned = clean_text(&docs);
        assert_eq!(cleaned.len(), docs.len());
        assert_eq!(cleaned[0], "hello world");
        assert_eq!(cleaned[1], "its 2024  dj vu");
        assert_eq!(cleaned[2], "");
        assert_eq!(cleaned[3], "tabsand newlines");
        for doc in &cleaned {
            assert!(doc
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == ' '));
        }
    }

    #[test]
    fn tokenize_ignores_repeated_spaces() {
        let tokens = tokenize(&["its 2024  dj vu", "   "]);
        assert_eq!(tokens[0], vec!["its", "2024", "dj", "vu"]);
        assert!(tokens[1].is_empty());
    }

    #[test]
    fn stop_words_include_baseline_and_trimmed_extras() {
        let stop_words = StopWords::with_additional(" tacos, burrito ,,");
        assert!(stop_words.contains("chipotle"));
        assert!(stop_words.contains("is"));
        assert!(stop_words.contains("tacos"));
        assert!(stop_words.contains("burrito"));
        assert!(!stop_words.contains(""));
        assert!(!stop_words.contains("great"));
    }

    #[test]
    fn removal_never_introduces_or_keeps_stop_words() {
        let stop_words = StopWords::with_additional("tacos");
        let docs = tokenize(&clean_text(&[
            "Chipotle is great",
            "the tacos are the best tacos",
            "and or but",
        ]));
        let filtered = stop_words.remove(docs.clone());

        assert_eq!(filtered.len(), docs.len());
        assert_eq!(filtered[0], vec!["great"]);
        assert_eq!(filtered[1], vec!["best"]);
        assert!(filtered[2].is_empty());
        for (before, after) in docs.iter().zip(&filtered) {
            for token in after {
                assert!(!stop_words.contains(token));
                assert!(before.contains(token));
            }
        }
    }

    #[test]
    fn stemming_is_one_to_one() {
        let stemmer = SnowballStemmer::english();
        let docs = vec![
            vec!["running".to_string(), "jumps".to_string(), "foxes".to_string()],
            vec![],
        ];
        let stemmed = stemmer.stem_documents(docs.clone());
        assert_eq!(stemmed.len(), docs.len());
        for (before, after) in docs.iter().zip(&stemmed) {
            assert_eq!(before.len(), after.len());
        }
        assert_eq!(stemmed[0], vec!["run", "jump", "fox"]);
    }

    #[test]
    fn unknown_stemmer_language_is_rejected() {
        assert!(SnowballStemmer::for_language("English").is_some());
        assert!(SnowballStemmer::for_language("klingon").is_none());
    }
}
