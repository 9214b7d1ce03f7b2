//! Document embedders for clustering-based topics.

use super::vocabulary::Vocabulary;
use crate::error::Result;
use crate::text::NormalizedText;

/// Maps a normalized review to a dense vector.
///
/// Embeddings of the same text must be identical across calls; the clustering
/// path relies on it for deterministic assignment.
pub trait Embedder: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    /// Embed one review. `vocabulary` is the corpus vocabulary the topic
    /// model was fitted with; model-based embedders may ignore it.
    ///
    /// # Errors
    ///
    /// Model-backed embedders fail when inference fails.
    fn embed(&self, vocabulary: &Vocabulary, text: &NormalizedText) -> Result<Vec<f64>>;
}

/// L2-normalized TF-IDF over the topic vocabulary.
#[derive(Debug, Clone, Copy, Default)]
pub struct TfIdfEmbedder;

impl Embedder for TfIdfEmbedder {
    fn name(&self) -> &str {
        "tfidf"
    }

    fn embed(&self, vocabulary: &Vocabulary, text: &NormalizedText) -> Result<Vec<f64>> {
        Ok(vocabulary.tfidf(&text.tokens))
    }
}
