//! Pluggable three-class polarity models.
//!
//! The scorer only sees the [`PolarityModel`] trait. With the `onnx` feature
//! [`load_polarity_model`] builds an ONNX sequence classifier; without it,
//! loading reports `ModelUnavailable` and the scorer keeps the cheap models.

use crate::config::SentimentConfig;
use crate::error::{InsightError, Result};
use serde::{Deserialize, Serialize};

/// Class probabilities from a polarity model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransformerScores {
    /// P(negative)
    pub negative: f64,
    /// P(neutral)
    pub neutral: f64,
    /// P(positive)
    pub positive: f64,
}

impl TransformerScores {
    /// Build from raw logits (negative, neutral, positive order).
    #[must_use]
    pub fn from_logits(logits: [f64; 3]) -> Self {
        let max = logits.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let exp: Vec<f64> = logits.iter().map(|l| (l - max).exp()).collect();
        let sum: f64 = exp.iter().sum();
        Self {
            negative: exp[0] / sum,
            neutral: exp[1] / sum,
            positive: exp[2] / sum,
        }
    }

    /// Signed polarity `positive - negative` in [-1, 1].
    #[must_use]
    pub fn polarity(&self) -> f64 {
        self.positive - self.negative
    }
}

/// A model that maps review text to class probabilities.
///
/// Implementations must be safe to share across worker threads.
pub trait PolarityModel: Send + Sync {
    /// Short model name for logs.
    fn name(&self) -> &str;

    /// Predict class probabilities for one (already truncated) text.
    ///
    /// # Errors
    ///
    /// Any error is treated as a per-review degradation by the scorer.
    fn predict(&self, text: &str) -> Result<TransformerScores>;
}

/// Load the configured transformer.
///
/// # Errors
///
/// Returns `ModelUnavailable` when the crate was built without `onnx`, when a
/// path is missing, or when the model fails to load.
pub fn load_polarity_model(config: &SentimentConfig) -> Result<Box<dyn PolarityModel>> {
    #[cfg(feature = "onnx")]
    {
        let (Some(model), Some(tokenizer)) = (
            config.transformer_model_path.as_deref(),
            config.transformer_tokenizer_path.as_deref(),
        ) else {
            return Err(InsightError::model_unavailable(
                "transformer",
                "transformer_model_path and transformer_tokenizer_path are required",
            ));
        };
        let model = crate::onnx::OnnxPolarityModel::load(model, tokenizer)?;
        Ok(Box::new(model))
    }

    #[cfg(not(feature = "onnx"))]
    {
        let _ = config;
        Err(InsightError::model_unavailable(
            "transformer",
            "built without the `onnx` feature",
        ))
    }
}

/// Cut `text` to at most `max_chars` characters on a char boundary.
#[must_use]
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
