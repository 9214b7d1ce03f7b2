//! Error types for reviewlens operations.
//!
//! Per-review problems (empty text, a transformer that chokes on one review)
//! and per-stage problems (a corpus too sparse for the configured topic count)
//! share one enum so callers can match on the kind and decide whether to
//! degrade or surface it.

use thiserror::Error;

/// Main error type for reviewlens operations.
///
/// # Examples
///
/// ```
/// use reviewlens::error::InsightError;
///
/// let err = InsightError::DegenerateCorpus {
///     requested_topics: 8,
///     documents: 3,
///     vocabulary: 2,
/// };
/// assert!(err.to_string().contains("8 topics"));
/// ```
#[derive(Debug, Error)]
pub enum InsightError {
    /// Review text is empty or whitespace-only after cleaning.
    #[error("review text is empty after normalization")]
    EmptyText,

    /// An optional heavy model failed to load or run.
    #[error("model '{model}' unavailable: {reason}")]
    ModelUnavailable {
        /// Model name (e.g. "transformer")
        model: String,
        /// Why it could not be used
        reason: String,
    },

    /// The corpus cannot support the configured number of topics.
    #[error(
        "corpus too small to fit {requested_topics} topics: \
         {documents} usable documents, {vocabulary} vocabulary terms"
    )]
    DegenerateCorpus {
        /// Configured topic count
        requested_topics: usize,
        /// Documents with at least one in-vocabulary token
        documents: usize,
        /// Vocabulary size after document-frequency filtering
        vocabulary: usize,
    },

    /// Invalid configuration value.
    #[error("invalid configuration: {param} = {value}, expected {constraint}")]
    InvalidConfig {
        /// Parameter name
        param: String,
        /// Provided value
        value: String,
        /// Constraint description
        constraint: String,
    },

    /// Matrix/vector dimensions don't match for the operation.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected dimensions description
        expected: String,
        /// Actual dimensions found
        actual: String,
    },

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic error with string message.
    #[error("{0}")]
    Other(String),
}

impl InsightError {
    /// Create an invalid configuration error.
    #[must_use]
    pub fn invalid_config(param: &str, value: impl ToString, constraint: &str) -> Self {
        Self::InvalidConfig {
            param: param.to_string(),
            value: value.to_string(),
            constraint: constraint.to_string(),
        }
    }

    /// Create a model-unavailable error.
    #[must_use]
    pub fn model_unavailable(model: &str, reason: impl ToString) -> Self {
        Self::ModelUnavailable {
            model: model.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Create a dimension mismatch error with descriptive context
    #[must_use]
    pub fn dimension_mismatch(context: &str, expected: usize, actual: usize) -> Self {
        Self::DimensionMismatch {
            expected: format!("{context}={expected}"),
            actual: format!("{actual}"),
        }
    }

    /// Whether the error only degrades a stage instead of aborting it.
    #[must_use]
    pub fn is_degradable(&self) -> bool {
        matches!(self, Self::ModelUnavailable { .. } | Self::EmptyText)
    }
}

impl From<&str> for InsightError {
    fn from(msg: &str) -> Self {
        InsightError::Other(msg.to_string())
    }
}

impl From<String> for InsightError {
    fn from(msg: String) -> Self {
        InsightError::Other(msg)
    }
}

/// Convenience type alias for Results.
pub type Result<T> = std::result::Result<T, InsightError>;
