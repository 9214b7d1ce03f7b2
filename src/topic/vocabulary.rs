//! Document-frequency filtered vocabulary.
//!
//! Terms are ordered by corpus frequency (descending), then lexicographically,
//! so the same corpus always yields the same term ids.

use crate::primitives::Matrix;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Filters applied while learning a [`Vocabulary`].
#[derive(Debug, Clone, PartialEq)]
pub struct VocabularyBuilder {
    min_token_len: usize,
    min_doc_freq: usize,
    max_doc_ratio: f64,
    max_features: usize,
}

impl Default for VocabularyBuilder {
    fn default() -> Self {
        Self {
            min_token_len: 3,
            min_doc_freq: 5,
            max_doc_ratio: 0.6,
            max_features: 5000,
        }
    }
}

impl VocabularyBuilder {
    /// Builder with the default filters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop tokens shorter than `len` characters.
    #[must_use]
    pub fn with_min_token_len(mut self, len: usize) -> Self {
        self.min_token_len = len;
        self
    }

    /// Keep terms present in at least `min_doc_freq` documents.
    #[must_use]
    pub fn with_min_doc_freq(mut self, min_doc_freq: usize) -> Self {
        self.min_doc_freq = min_doc_freq;
        self
    }

    /// Drop terms present in more than `ratio` of the documents.
    #[must_use]
    pub fn with_max_doc_ratio(mut self, ratio: f64) -> Self {
        self.max_doc_ratio = ratio.clamp(0.0, 1.0);
        self
    }

    /// Keep at most `max_features` terms.
    #[must_use]
    pub fn with_max_features(mut self, max_features: usize) -> Self {
        self.max_features = max_features;
        self
    }

    /// Learn the vocabulary from tokenized documents.
    pub fn fit<D: AsRef<[String]>>(&self, documents: &[D]) -> Vocabulary {
        let n_docs = documents.len();
        let mut term_freq: HashMap<&str, usize> = HashMap::new();
        let mut doc_freq: HashMap<&str, usize> = HashMap::new();

        for doc in documents {
            let mut seen = HashSet::new();
            for token in doc.as_ref() {
                if token.chars().count() < self.min_token_len {
                    continue;
                }
                *term_freq.entry(token.as_str()).or_insert(0) += 1;
                if seen.insert(token.as_str()) {
                    *doc_freq.entry(token.as_str()).or_insert(0) += 1;
                }
            }
        }

        let mut kept: Vec<(&str, usize)> = term_freq
            .into_iter()
            .filter(|(term, _)| {
                let df = doc_freq.get(term).copied().unwrap_or(0);
                df >= self.min_doc_freq && df as f64 <= self.max_doc_ratio * n_docs as f64
            })
            .collect();
        kept.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        kept.truncate(self.max_features);

        let terms: Vec<String> = kept.iter().map(|(t, _)| (*t).to_string()).collect();
        let doc_freqs = kept
            .iter()
            .map(|(t, _)| doc_freq.get(t).copied().unwrap_or(0))
            .collect();
        let index = terms
            .iter()
            .enumerate()
            .map(|(i, t)| (t.clone(), i))
            .collect();

        Vocabulary {
            terms,
            index,
            doc_freqs,
            n_docs,
        }
    }
}

/// Learned term ↔ id mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vocabulary {
    terms: Vec<String>,
    index: HashMap<String, usize>,
    doc_freqs: Vec<usize>,
    n_docs: usize,
}

impl Vocabulary {
    /// Number of terms.
    #[must_use]
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    /// Whether no term survived filtering.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Terms in id order.
    #[must_use]
    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    /// Term for an id.
    #[must_use]
    pub fn term(&self, id: usize) -> Option<&str> {
        self.terms.get(id).map(String::as_str)
    }

    /// Id for a term.
    #[must_use]
    pub fn id(&self, term: &str) -> Option<usize> {
        self.index.get(term).copied()
    }

    /// Smoothed inverse document frequency: `ln((1 + n) / (1 + df)) + 1`.
    #[must_use]
    pub fn idf(&self, id: usize) -> f64 {
        let df = self.doc_freqs.get(id).copied().unwrap_or(0) as f64;
        ((1.0 + self.n_docs as f64) / (1.0 + df)).ln() + 1.0
    }

    /// Sparse term counts of one document, ordered by term id.
    pub fn bag(&self, tokens: &[String]) -> Vec<(usize, f64)> {
        let mut counts: BTreeMap<usize, f64> = BTreeMap::new();
        for id in tokens.iter().filter_map(|t| self.id(t)) {
            *counts.entry(id).or_insert(0.0) += 1.0;
        }
        counts.into_iter().collect()
    }

    /// Dense document-term count matrix.
    pub fn count_matrix<D: AsRef<[String]>>(&self, documents: &[D]) -> Matrix {
        let mut m = Matrix::zeros(documents.len(), self.len());
        for (d, doc) in documents.iter().enumerate() {
            for (id, count) in self.bag(doc.as_ref()) {
                m.set(d, id, count);
            }
        }
        m
    }

    /// L2-normalized TF-IDF vector of one document (all zeros without overlap).
    pub fn tfidf(&self, tokens: &[String]) -> Vec<f64> {
        let mut v = vec![0.0; self.len()];
        for (id, count) in self.bag(tokens) {
            v[id] = count * self.idf(id);
        }
        let norm = v.iter().map(|x| x * x).sum::<f64>().sqrt();
        if norm > 0.0 {
            v.iter_mut().for_each(|x| *x /= norm);
        }
        v
    }
}
