//! Topic discovery and assignment.
//!
//! [`TopicModeler::fit`] learns a [`Vocabulary`] and then either an LDA model
//! (default) or a k-means clustering of document embeddings. The resulting
//! [`TopicModel`] assigns each review its highest-probability topic and looks
//! its label up in the operator-supplied [`TopicLabels`].

mod embedding;
mod lda;
mod vocabulary;

pub use embedding::{Embedder, TfIdfEmbedder};
pub use lda::LatentDirichletAllocation;
pub use vocabulary::{Vocabulary, VocabularyBuilder};

use crate::cluster::KMeans;
use crate::config::TopicConfig;
use crate::error::{InsightError, Result};
use crate::primitives::{argmax, Matrix};
use crate::review::{Entity, Review};
use crate::text::NormalizedText;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

/// Label for ids missing from the label table.
pub const UNKNOWN_TOPIC: &str = "Unknown Topic";

/// Operator-curated topic id → label table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TopicLabels(BTreeMap<usize, String>);

impl TopicLabels {
    /// Empty table (every topic is "Unknown Topic").
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a label.
    #[must_use]
    pub fn with_label(mut self, topic_id: usize, label: impl Into<String>) -> Self {
        self.0.insert(topic_id, label.into());
        self
    }

    /// Label for `topic_id`, or [`UNKNOWN_TOPIC`].
    #[must_use]
    pub fn label(&self, topic_id: usize) -> &str {
        self.0.get(&topic_id).map_or(UNKNOWN_TOPIC, String::as_str)
    }
}

impl<S: Into<String>> FromIterator<(usize, S)> for TopicLabels {
    fn from_iter<I: IntoIterator<Item = (usize, S)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(id, l)| (id, l.into())).collect())
    }
}

/// A review's topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicAssignment {
    /// Stable id assigned at fit time
    pub topic_id: usize,
    /// Operator label
    pub label: String,
    /// Probability of the assigned topic
    pub probability: f64,
}

/// Corpus-level view of one topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Topic {
    /// Stable id
    pub topic_id: usize,
    /// Operator label
    pub label: String,
    /// Share of topic-assigned reviews
    pub prevalence: f64,
    /// Assigned reviews per entity
    pub entity_distribution: BTreeMap<Entity, usize>,
    /// Heaviest vocabulary terms
    pub top_terms: Vec<String>,
    /// Review ids with the highest probability for this topic
    pub representative_reviews: Vec<String>,
}

/// Which algorithm produced a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TopicMethod {
    /// Latent Dirichlet Allocation
    Lda,
    /// k-means over document embeddings
    EmbeddingClustering,
}

enum Backend {
    Lda(LatentDirichletAllocation),
    Clustering {
        kmeans: KMeans,
        embedder: Arc<dyn Embedder>,
    },
}

/// Fitted topic model. Immutable once built.
pub struct TopicModel {
    backend: Backend,
    vocabulary: Vocabulary,
    labels: TopicLabels,
    top_terms: Vec<Vec<String>>,
    n_representative: usize,
}

impl fmt::Debug for TopicModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TopicModel")
            .field("method", &self.method())
            .field("n_topics", &self.n_topics())
            .field("vocabulary", &self.vocabulary.len())
            .finish()
    }
}

impl TopicModel {
    /// Algorithm used.
    #[must_use]
    pub fn method(&self) -> TopicMethod {
        match self.backend {
            Backend::Lda(_) => TopicMethod::Lda,
            Backend::Clustering { .. } => TopicMethod::EmbeddingClustering,
        }
    }

    /// Number of topics.
    #[must_use]
    pub fn n_topics(&self) -> usize {
        self.top_terms.len()
    }

    /// Vocabulary the model was fitted with.
    #[must_use]
    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    /// Heaviest terms per topic, by topic id.
    #[must_use]
    pub fn top_terms(&self) -> &[Vec<String>] {
        &self.top_terms
    }

    /// Label for a topic id.
    #[must_use]
    pub fn label(&self, topic_id: usize) -> &str {
        self.labels.label(topic_id)
    }

    /// Full topic distribution of one review.
    ///
    /// `None` when no token is in the vocabulary (or the embedder fails).
    #[must_use]
    pub fn distribution(&self, text: &NormalizedText) -> Option<Vec<f64>> {
        let bag = self.vocabulary.bag(&text.tokens);
        if bag.is_empty() {
            return None;
        }
        match &self.backend {
            Backend::Lda(lda) => lda.infer(&bag),
            Backend::Clustering { kmeans, embedder } => {
                let embedding = match embedder.embed(&self.vocabulary, text) {
                    Ok(e) => e,
                    Err(e) => {
                        tracing::debug!(embedder = embedder.name(), error = %e, "embedding failed");
                        return None;
                    }
                };
                Some(soft_assignment(&kmeans.distances(&embedding)))
            }
        }
    }

    /// Hard assignment: highest probability, ties to the lowest id.
    #[must_use]
    pub fn assign(&self, text: &NormalizedText) -> Option<TopicAssignment> {
        let distribution = self.distribution(text)?;
        let (topic_id, probability) = argmax(&distribution)?;
        Some(TopicAssignment {
            topic_id,
            label: self.label(topic_id).to_string(),
            probability,
        })
    }

    /// Summarize assigned reviews per topic.
    ///
    /// Every topic id appears, including topics no review was assigned to.
    #[must_use]
    pub fn topics(&self, reviews: &[Review]) -> Vec<Topic> {
        let assigned: Vec<(&Review, &TopicAssignment)> = reviews
            .iter()
            .filter_map(|r| r.topic.as_ref().map(|t| (r, t)))
            .collect();
        let total = assigned.len();

        (0..self.n_topics())
            .map(|topic_id| {
                let mut members: Vec<(&Review, &TopicAssignment)> = assigned
                    .iter()
                    .copied()
                    .filter(|(_, t)| t.topic_id == topic_id)
                    .collect();
                let mut entity_distribution = BTreeMap::new();
                for (review, _) in &members {
                    *entity_distribution.entry(review.entity.clone()).or_insert(0) += 1;
                }
                members.sort_by(|a, b| {
                    b.1.probability
                        .total_cmp(&a.1.probability)
                        .then_with(|| a.0.review_id.cmp(&b.0.review_id))
                });
                Topic {
                    topic_id,
                    label: self.label(topic_id).to_string(),
                    prevalence: if total == 0 {
                        0.0
                    } else {
                        members.len() as f64 / total as f64
                    },
                    entity_distribution,
                    top_terms: self.top_terms[topic_id].clone(),
                    representative_reviews: members
                        .iter()
                        .take(self.n_representative)
                        .map(|(r, _)| r.review_id.clone())
                        .collect(),
                }
            })
            .collect()
    }
}

/// Softmax over negative squared distances.
fn soft_assignment(distances: &[f64]) -> Vec<f64> {
    let min = distances.iter().copied().fold(f64::INFINITY, f64::min);
    let weights: Vec<f64> = distances.iter().map(|d| (-(d - min)).exp()).collect();
    let total: f64 = weights.iter().sum();
    weights.into_iter().map(|w| w / total).collect()
}

/// Fits topic models from configuration.
pub struct TopicModeler {
    config: TopicConfig,
    embedder: Arc<dyn Embedder>,
}

impl fmt::Debug for TopicModeler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TopicModeler")
            .field("config", &self.config)
            .field("embedder", &self.embedder.name())
            .finish()
    }
}

impl TopicModeler {
    /// Modeler with the TF-IDF embedder for the clustering path.
    #[must_use]
    pub fn new(config: TopicConfig) -> Self {
        Self {
            config,
            embedder: Arc::new(TfIdfEmbedder),
        }
    }

    /// Build from configuration, loading an ONNX sentence embedder when
    /// clustering is enabled and model paths are configured. A failed load
    /// falls back to TF-IDF.
    #[must_use]
    pub fn from_config(config: &TopicConfig) -> Self {
        let modeler = Self::new(config.clone());
        if !config.use_embedding_clustering || config.embedding_model_path.is_none() {
            return modeler;
        }
        match load_embedder(config) {
            Ok(embedder) => {
                tracing::info!(embedder = embedder.name(), "sentence embedder enabled");
                modeler.with_embedder(embedder)
            }
            Err(e) => {
                tracing::warn!(error = %e, "sentence embedder unavailable, using TF-IDF");
                modeler
            }
        }
    }

    /// Replace the embedder used by the clustering path.
    #[must_use]
    pub fn with_embedder(mut self, embedder: Arc<dyn Embedder>) -> Self {
        self.embedder = embedder;
        self
    }

    /// Fit on normalized reviews.
    ///
    /// # Errors
    ///
    /// `DegenerateCorpus` when fewer documents overlap the vocabulary, or
    /// fewer vocabulary terms exist, than the configured topic count; the
    /// clustering path also fails when there are fewer distinct embeddings
    /// than topics. Embedder errors are propagated.
    pub fn fit(&self, corpus: &[&NormalizedText]) -> Result<TopicModel> {
        let k = self.config.count;
        let tokens: Vec<&[String]> = corpus.iter().map(|t| t.tokens.as_slice()).collect();
        let vocabulary = VocabularyBuilder::new()
            .with_min_token_len(self.config.min_token_len)
            .with_min_doc_freq(self.config.min_doc_freq)
            .with_max_doc_ratio(self.config.max_doc_ratio)
            .with_max_features(self.config.max_features)
            .fit(&tokens);

        let usable: Vec<&NormalizedText> = corpus
            .iter()
            .copied()
            .filter(|t| t.tokens.iter().any(|tok| vocabulary.id(tok).is_some()))
            .collect();
        if k == 0 || usable.len() < k || vocabulary.len() < k {
            return Err(InsightError::DegenerateCorpus {
                requested_topics: k,
                documents: usable.len(),
                vocabulary: vocabulary.len(),
            });
        }

        let (backend, top_terms) = if self.config.use_embedding_clustering {
            self.fit_clustering(&vocabulary, &usable)?
        } else {
            self.fit_lda(&vocabulary, &usable)?
        };

        tracing::info!(
            topics = k,
            documents = usable.len(),
            vocabulary = vocabulary.len(),
            clustering = self.config.use_embedding_clustering,
            "fitted topic model"
        );

        Ok(TopicModel {
            backend,
            vocabulary,
            labels: self.config.labels.clone(),
            top_terms,
            n_representative: self.config.representative_reviews,
        })
    }

    fn fit_lda(
        &self,
        vocabulary: &Vocabulary,
        usable: &[&NormalizedText],
    ) -> Result<(Backend, Vec<Vec<String>>)> {
        let tokens: Vec<&[String]> = usable.iter().map(|t| t.tokens.as_slice()).collect();
        let dtm = vocabulary.count_matrix(&tokens);
        let mut lda = LatentDirichletAllocation::new(self.config.count)
            .with_alpha(self.config.alpha)
            .with_eta(self.config.eta)
            .with_random_seed(self.config.random_seed);
        lda.fit(&dtm, self.config.max_iter)?;

        let top_terms = lda
            .top_term_ids(self.config.top_terms)?
            .into_iter()
            .map(|ids| term_names(vocabulary, ids.into_iter().map(|(id, _)| id)))
            .collect();
        Ok((Backend::Lda(lda), top_terms))
    }

    fn fit_clustering(
        &self,
        vocabulary: &Vocabulary,
        usable: &[&NormalizedText],
    ) -> Result<(Backend, Vec<Vec<String>>)> {
        let embeddings = usable
            .iter()
            .map(|t| self.embedder.embed(vocabulary, t))
            .collect::<Result<Vec<_>>>()?;
        let dim = embeddings.first().map_or(0, Vec::len);
        if let Some(bad) = embeddings.iter().find(|e| e.len() != dim) {
            return Err(InsightError::dimension_mismatch("embedding", dim, bad.len()));
        }
        let data = Matrix::from_vec(usable.len(), dim, embeddings.concat())?;

        let mut kmeans = KMeans::new(self.config.count)
            .with_max_iter(self.config.max_iter.max(1))
            .with_random_state(self.config.random_seed);
        kmeans.fit(&data)?;

        let labels = kmeans.labels().unwrap_or_default();
        let mut weights = vec![HashMap::<usize, f64>::new(); self.config.count];
        for (doc, &cluster) in usable.iter().zip(labels) {
            for (id, count) in vocabulary.bag(&doc.tokens) {
                *weights[cluster].entry(id).or_insert(0.0) += count * vocabulary.idf(id);
            }
        }
        let top_terms = weights
            .into_iter()
            .map(|w| {
                let mut scored: Vec<(usize, f64)> = w.into_iter().collect();
                scored.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
                scored.truncate(self.config.top_terms);
                term_names(vocabulary, scored.into_iter().map(|(id, _)| id))
            })
            .collect();

        Ok((
            Backend::Clustering {
                kmeans,
                embedder: Arc::clone(&self.embedder),
            },
            top_terms,
        ))
    }
}

fn term_names(vocabulary: &Vocabulary, ids: impl Iterator<Item = usize>) -> Vec<String> {
    ids.filter_map(|id| vocabulary.term(id).map(str::to_string))
        .collect()
}

fn load_embedder(config: &TopicConfig) -> Result<Arc<dyn Embedder>> {
    #[cfg(feature = "onnx")]
    {
        let (Some(model), Some(tokenizer)) = (
            config.embedding_model_path.as_deref(),
            config.embedding_tokenizer_path.as_deref(),
        ) else {
            return Err(InsightError::model_unavailable(
                "embedder",
                "embedding_model_path and embedding_tokenizer_path are required",
            ));
        };
        Ok(Arc::new(crate::onnx::OnnxEmbedder::load(model, tokenizer)?))
    }

    #[cfg(not(feature = "onnx"))]
    {
        let _ = config;
        Err(InsightError::model_unavailable(
            "embedder",
            "built without the `onnx` feature",
        ))
    }
}
