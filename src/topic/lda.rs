//! Latent Dirichlet Allocation fitted by smoothed EM.
//!
//! Each EM pass computes responsibilities `p(z | d, w) ∝ θ_dz · φ_zw` for every
//! non-zero document-term count, then re-estimates θ and φ from the expected
//! counts plus the Dirichlet pseudo-counts `alpha` and `eta`.
//!
//! # Examples
//!
//! ```
//! use reviewlens::primitives::Matrix;
//! use reviewlens::topic::LatentDirichletAllocation;
//!
//! let dtm = Matrix::from_vec(3, 5, vec![
//!     2.0, 1.0, 0.0, 0.0, 0.0,
//!     0.0, 0.0, 2.0, 1.0, 0.0,
//!     1.0, 0.0, 0.0, 1.0, 2.0,
//! ]).expect("3x5 counts");
//!
//! let mut lda = LatentDirichletAllocation::new(2).with_random_seed(42);
//! lda.fit(&dtm, 20).expect("non-empty counts");
//! assert_eq!(lda.document_topics().expect("fitted").shape(), (3, 2));
//! ```

use crate::error::{InsightError, Result};
use crate::primitives::Matrix;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Iterations used to infer θ for a document outside the training set.
const INFERENCE_ITER: usize = 30;

/// LDA topic model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LatentDirichletAllocation {
    n_topics: usize,
    alpha: f64,
    eta: f64,
    random_seed: u64,
    /// θ: `n_docs` × `n_topics`
    doc_topic: Option<Matrix>,
    /// φ: `n_topics` × `n_terms`
    topic_word: Option<Matrix>,
}

impl LatentDirichletAllocation {
    /// LDA with `n_topics` topics and priors `alpha = 0.1`, `eta = 0.01`.
    #[must_use]
    pub fn new(n_topics: usize) -> Self {
        Self {
            n_topics,
            alpha: 0.1,
            eta: 0.01,
            random_seed: 42,
            doc_topic: None,
            topic_word: None,
        }
    }

    /// Set the document-topic prior.
    #[must_use]
    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    /// Set the topic-word prior.
    #[must_use]
    pub fn with_eta(mut self, eta: f64) -> Self {
        self.eta = eta;
        self
    }

    /// Set the initialization seed.
    #[must_use]
    pub fn with_random_seed(mut self, seed: u64) -> Self {
        self.random_seed = seed;
        self
    }

    /// Number of topics.
    #[must_use]
    pub fn n_topics(&self) -> usize {
        self.n_topics
    }

    /// Fit on a document-term count matrix.
    ///
    /// # Errors
    ///
    /// `DegenerateCorpus` when the matrix is empty or smaller than the topic count.
    pub fn fit(&mut self, dtm: &Matrix, max_iter: usize) -> Result<()> {
        let (n_docs, n_terms) = dtm.shape();
        if self.n_topics == 0 || n_docs < self.n_topics || n_terms < self.n_topics {
            return Err(InsightError::DegenerateCorpus {
                requested_topics: self.n_topics,
                documents: n_docs,
                vocabulary: n_terms,
            });
        }

        let k = self.n_topics;
        let mut rng = StdRng::seed_from_u64(self.random_seed);
        let mut doc_topic = Matrix::zeros(n_docs, k);
        let mut topic_word = Matrix::zeros(k, n_terms);
        for d in 0..n_docs {
            for z in 0..k {
                doc_topic.set(d, z, 1.0 / k as f64 + rng.gen::<f64>() * 0.01);
            }
        }
        for z in 0..k {
            for v in 0..n_terms {
                topic_word.set(z, v, 1.0 / n_terms as f64 + rng.gen::<f64>() * 0.01);
            }
        }
        doc_topic.normalize_rows();
        topic_word.normalize_rows();

        let mut responsibilities = vec![0.0; k];
        for _ in 0..max_iter {
            let mut expected_doc = Matrix::zeros(n_docs, k);
            let mut expected_word = Matrix::zeros(k, n_terms);

            for d in 0..n_docs {
                for v in 0..n_terms {
                    let count = dtm.get(d, v);
                    if count <= 0.0 {
                        continue;
                    }
                    if !responsibilities_into(
                        &mut responsibilities,
                        doc_topic.row(d),
                        &topic_word,
                        v,
                    ) {
                        continue;
                    }
                    for (z, &r) in responsibilities.iter().enumerate() {
                        expected_doc.add_at(d, z, count * r);
                        expected_word.add_at(z, v, count * r);
                    }
                }
            }

            add_prior(&mut expected_doc, self.alpha);
            add_prior(&mut expected_word, self.eta);
            expected_doc.normalize_rows();
            expected_word.normalize_rows();
            doc_topic = expected_doc;
            topic_word = expected_word;
        }

        self.doc_topic = Some(doc_topic);
        self.topic_word = Some(topic_word);
        Ok(())
    }

    /// θ of the training documents.
    ///
    /// # Errors
    ///
    /// Fails before [`fit`](Self::fit).
    pub fn document_topics(&self) -> Result<&Matrix> {
        self.doc_topic
            .as_ref()
            .ok_or_else(|| InsightError::Other("LDA model not fitted".to_string()))
    }

    /// φ, one row per topic.
    ///
    /// # Errors
    ///
    /// Fails before [`fit`](Self::fit).
    pub fn topic_words(&self) -> Result<&Matrix> {
        self.topic_word
            .as_ref()
            .ok_or_else(|| InsightError::Other("LDA model not fitted".to_string()))
    }

    /// Infer θ for one sparse bag of `(term_id, count)`.
    ///
    /// Starts from a uniform θ, so the result only depends on the fitted φ.
    /// Returns `None` for an empty bag or an unfitted model.
    #[must_use]
    pub fn infer(&self, bag: &[(usize, f64)]) -> Option<Vec<f64>> {
        let topic_word = self.topic_word.as_ref()?;
        if bag.is_empty() {
            return None;
        }
        let k = self.n_topics;
        let mut theta = vec![1.0 / k as f64; k];
        let mut responsibilities = vec![0.0; k];

        for _ in 0..INFERENCE_ITER {
            let mut expected = vec![self.alpha; k];
            for &(v, count) in bag {
                if responsibilities_into(&mut responsibilities, &theta, topic_word, v) {
                    for (e, r) in expected.iter_mut().zip(&responsibilities) {
                        *e += count * r;
                    }
                }
            }
            let total: f64 = expected.iter().sum();
            theta = expected.into_iter().map(|e| e / total).collect();
        }
        Some(theta)
    }

    /// Top `n_words` `(term_id, weight)` per topic, heaviest first; ties by term id.
    ///
    /// # Errors
    ///
    /// Fails before [`fit`](Self::fit).
    pub fn top_term_ids(&self, n_words: usize) -> Result<Vec<Vec<(usize, f64)>>> {
        let topic_word = self.topic_words()?;
        Ok((0..self.n_topics)
            .map(|z| {
                let mut scored: Vec<(usize, f64)> =
                    topic_word.row(z).iter().copied().enumerate().collect();
                scored.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
                scored.truncate(n_words);
                scored
            })
            .collect())
    }
}

/// Fill `out` with normalized `theta_z · φ_zv`; false when all are ~0.
fn responsibilities_into(out: &mut [f64], theta: &[f64], topic_word: &Matrix, v: usize) -> bool {
    let mut sum = 0.0;
    for (z, r) in out.iter_mut().enumerate() {
        *r = theta[z] * topic_word.get(z, v);
        sum += *r;
    }
    if sum <= 1e-300 {
        return false;
    }
    out.iter_mut().for_each(|r| *r /= sum);
    true
}

fn add_prior(m: &mut Matrix, prior: f64) {
    for r in 0..m.n_rows() {
        m.row_mut(r).iter_mut().for_each(|x| *x += prior);
    }
}
