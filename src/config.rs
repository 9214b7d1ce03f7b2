//! Pipeline configuration.
//!
//! Every field is optional when deserialized; missing fields take the
//! defaults documented on each struct. Loading the configuration from disk is
//! the caller's job, [`PipelineConfig::from_json_str`] only parses.
//!
//! # Examples
//!
//! ```
//! use reviewlens::config::PipelineConfig;
//!
//! let config = PipelineConfig::from_json_str(r#"{"topics": {"count": 4}}"#)
//!     .expect("valid config");
//! assert_eq!(config.topics.count, 4);
//! assert_eq!(config.stats.bootstrap_resamples, 10_000);
//! ```

use crate::aspect::AspectLexicon;
use crate::error::{InsightError, Result};
use crate::topic::TopicLabels;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level configuration threaded through every stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Sentiment scorer settings
    pub sentiment: SentimentConfig,
    /// Topic modeler settings
    pub topics: TopicConfig,
    /// Aspect keyword sets
    pub aspects: AspectLexicon,
    /// Divergence bucketing
    pub divergence: DivergenceConfig,
    /// Comparative statistics settings
    pub stats: StatsConfig,
}

impl PipelineConfig {
    /// Parse a JSON document and validate it.
    ///
    /// # Errors
    ///
    /// Returns `Serialization` on malformed JSON and `InvalidConfig` when a
    /// value violates its constraint.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check all sections.
    ///
    /// # Errors
    ///
    /// Returns the first `InvalidConfig` found.
    pub fn validate(&self) -> Result<()> {
        self.topics.validate()?;
        self.aspects.validate()?;
        self.divergence.validate()?;
        self.stats.validate()?;
        Ok(())
    }

    /// Replace the topic section.
    #[must_use]
    pub fn with_topics(mut self, topics: TopicConfig) -> Self {
        self.topics = topics;
        self
    }

    /// Replace the statistics section.
    #[must_use]
    pub fn with_stats(mut self, stats: StatsConfig) -> Self {
        self.stats = stats;
        self
    }

    /// Replace the sentiment section.
    #[must_use]
    pub fn with_sentiment(mut self, sentiment: SentimentConfig) -> Self {
        self.sentiment = sentiment;
        self
    }
}

/// Sentiment scorer settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SentimentConfig {
    /// Run the transformer model in addition to the lexicon models (default: false)
    pub use_transformer: bool,
    /// Run the pattern-based cross-check model (default: true)
    pub use_pattern_model: bool,
    /// Text is truncated to this many characters before the transformer sees it
    pub transformer_max_chars: usize,
    /// ONNX sequence-classification model (requires the `onnx` feature)
    pub transformer_model_path: Option<PathBuf>,
    /// `tokenizer.json` matching the transformer model
    pub transformer_tokenizer_path: Option<PathBuf>,
}

impl Default for SentimentConfig {
    fn default() -> Self {
        Self {
            use_transformer: false,
            use_pattern_model: true,
            transformer_max_chars: 500,
            transformer_model_path: None,
            transformer_tokenizer_path: None,
        }
    }
}

/// Topic modeler settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TopicConfig {
    /// Number of topics (fixed, never inferred from data)
    pub count: usize,
    /// Use embedding clustering instead of LDA
    pub use_embedding_clustering: bool,
    /// Seed for model initialization
    pub random_seed: u64,
    /// Fitting iterations (EM passes for LDA, Lloyd iterations for k-means)
    pub max_iter: usize,
    /// Terms must appear in at least this many documents
    pub min_doc_freq: usize,
    /// Terms appearing in more than this fraction of documents are dropped
    pub max_doc_ratio: f64,
    /// Vocabulary size cap
    pub max_features: usize,
    /// Tokens shorter than this are ignored
    pub min_token_len: usize,
    /// Document-topic Dirichlet prior
    pub alpha: f64,
    /// Topic-word Dirichlet prior
    pub eta: f64,
    /// Terms reported per topic
    pub top_terms: usize,
    /// Representative review ids reported per topic
    pub representative_reviews: usize,
    /// Operator-curated topic labels
    pub labels: TopicLabels,
    /// ONNX sentence-embedding model for clustering (requires the `onnx` feature)
    pub embedding_model_path: Option<PathBuf>,
    /// `tokenizer.json` matching the embedding model
    pub embedding_tokenizer_path: Option<PathBuf>,
}

impl Default for TopicConfig {
    fn default() -> Self {
        Self {
            count: 8,
            use_embedding_clustering: false,
            random_seed: 42,
            max_iter: 50,
            min_doc_freq: 5,
            max_doc_ratio: 0.6,
            max_features: 5000,
            min_token_len: 3,
            alpha: 0.1,
            eta: 0.01,
            top_terms: 10,
            representative_reviews: 3,
            labels: TopicLabels::default(),
            embedding_model_path: None,
            embedding_tokenizer_path: None,
        }
    }
}

impl TopicConfig {
    /// Set the topic count.
    #[must_use]
    pub fn with_count(mut self, count: usize) -> Self {
        self.count = count;
        self
    }

    /// Set the random seed.
    #[must_use]
    pub fn with_random_seed(mut self, seed: u64) -> Self {
        self.random_seed = seed;
        self
    }

    /// Set the minimum document frequency.
    #[must_use]
    pub fn with_min_doc_freq(mut self, min_doc_freq: usize) -> Self {
        self.min_doc_freq = min_doc_freq;
        self
    }

    /// Set the maximum document ratio. Must lie in (0, 1]; checked by
    /// [`TopicConfig::validate`].
    #[must_use]
    pub fn with_max_doc_ratio(mut self, ratio: f64) -> Self {
        self.max_doc_ratio = ratio;
        self
    }

    /// Switch to embedding clustering.
    #[must_use]
    pub fn with_embedding_clustering(mut self, enable: bool) -> Self {
        self.use_embedding_clustering = enable;
        self
    }

    /// Set the operator label table.
    #[must_use]
    pub fn with_labels(mut self, labels: TopicLabels) -> Self {
        self.labels = labels;
        self
    }

    /// Check value ranges.
    ///
    /// # Errors
    ///
    /// `InvalidConfig` naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        if self.count == 0 {
            return Err(InsightError::invalid_config("topics.count", self.count, ">= 1"));
        }
        if !(self.max_doc_ratio > 0.0 && self.max_doc_ratio <= 1.0) {
            return Err(InsightError::invalid_config(
                "topics.max_doc_ratio",
                self.max_doc_ratio,
                "in (0, 1]",
            ));
        }
        if self.max_features == 0 {
            return Err(InsightError::invalid_config(
                "topics.max_features",
                self.max_features,
                ">= 1",
            ));
        }
        if self.alpha <= 0.0 || self.eta <= 0.0 {
            return Err(InsightError::invalid_config(
                "topics.alpha/eta",
                format!("{}/{}", self.alpha, self.eta),
                "> 0",
            ));
        }
        Ok(())
    }
}

/// Residual bucket cutoffs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DivergenceConfig {
    /// Ascending |residual| cutoffs separating Low/Medium/High/Very High
    pub residual_bucket_thresholds: Vec<f64>,
}

/// Default |residual| cutoffs: Low < 0.2 ≤ Medium < 0.5 ≤ High < 1.0 ≤ Very High.
pub const DEFAULT_RESIDUAL_THRESHOLDS: [f64; 3] = [0.2, 0.5, 1.0];

impl Default for DivergenceConfig {
    fn default() -> Self {
        Self {
            residual_bucket_thresholds: DEFAULT_RESIDUAL_THRESHOLDS.to_vec(),
        }
    }
}

impl DivergenceConfig {
    /// Check value ranges.
    ///
    /// # Errors
    ///
    /// `InvalidConfig` naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        let t = &self.residual_bucket_thresholds;
        let ascending = t.windows(2).all(|w| w[0] < w[1]);
        if t.len() != 3 || !ascending || t[0] <= 0.0 {
            return Err(InsightError::invalid_config(
                "divergence.residual_bucket_thresholds",
                format!("{t:?}"),
                "three strictly ascending positive values",
            ));
        }
        Ok(())
    }
}

/// Comparative statistics settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatsConfig {
    /// Bootstrap resample count
    pub bootstrap_resamples: usize,
    /// Seed shared by every bootstrap
    pub random_seed: u64,
    /// Groups smaller than this are reported as insufficient
    pub min_group_size: usize,
    /// Confidence level for bootstrap intervals
    pub confidence_level: f64,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            bootstrap_resamples: 10_000,
            random_seed: 42,
            min_group_size: 5,
            confidence_level: 0.95,
        }
    }
}

impl StatsConfig {
    /// Set the minimum group size.
    #[must_use]
    pub fn with_min_group_size(mut self, min_group_size: usize) -> Self {
        self.min_group_size = min_group_size;
        self
    }

    /// Set the bootstrap resample count.
    #[must_use]
    pub fn with_bootstrap_resamples(mut self, resamples: usize) -> Self {
        self.bootstrap_resamples = resamples;
        self
    }

    /// Check value ranges.
    ///
    /// # Errors
    ///
    /// `InvalidConfig` naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        if self.bootstrap_resamples == 0 {
            return Err(InsightError::invalid_config(
                "stats.bootstrap_resamples",
                0,
                ">= 1",
            ));
        }
        if self.min_group_size == 0 {
            return Err(InsightError::invalid_config("stats.min_group_size", 0, ">= 1"));
        }
        if !(self.confidence_level > 0.0 && self.confidence_level < 1.0) {
            return Err(InsightError::invalid_config(
                "stats.confidence_level",
                self.confidence_level,
                "in (0, 1)",
            ));
        }
        Ok(())
    }
}
