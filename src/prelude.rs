//! Convenience re-exports for common usage.
//!
//! # Usage
//!
//! ```
//! use reviewlens::prelude::*;
//! ```

pub use crate::aspect::{Aspect, AspectExtractor, AspectFlags, AspectLexicon};
pub use crate::config::{
    DivergenceConfig, PipelineConfig, SentimentConfig, StatsConfig, TopicConfig,
};
pub use crate::divergence::{Divergence, DivergenceCalculator, ResidualBucket};
pub use crate::error::{InsightError, Result};
pub use crate::pipeline::{Pipeline, PipelineContext, PipelineOutput, Stage, StageStatus};
pub use crate::report::Report;
pub use crate::review::{
    Corpus, Entity, EntityScoreDistribution, ProcessingFlag, Review, ReviewInput,
};
pub use crate::sentiment::{PolarityModel, SentimentBucket, SentimentResult, SentimentScorer};
pub use crate::stats::{ComparativeStatistics, Estimate, Metric, Scope, StatisticsReport};
pub use crate::text::{NormalizedText, TextNormalizer};
pub use crate::topic::{Embedder, TopicLabels, TopicModel, TopicModeler};
