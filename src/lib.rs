//! Reviewlens: sentiment, topic and rating-divergence analysis for franchise
//! reviews in pure Rust.
//!
//! Reviewlens takes fan reviews already grouped by canonical franchise
//! ([`review::Entity`]) and answers comparative questions about them: how the
//! text sentiment of one franchise compares to another's, which themes and
//! production aspects drive that sentiment, and where the text disagrees with
//! the score the reviewer gave.
//!
//! # Quick Start
//!
//! ```
//! use reviewlens::prelude::*;
//!
//! let config = PipelineConfig::default()
//!     .with_stats(StatsConfig::default().with_min_group_size(1).with_bootstrap_resamples(500));
//! let pipeline = Pipeline::new(config).expect("valid config");
//!
//! let output = pipeline.run(
//!     vec![
//!         ReviewInput::new("X", "I loved this, amazing fights and story").with_score(9),
//!         ReviewInput::new("X", "filler dragged it down, still fine").with_score(6),
//!         ReviewInput::new("Y", "terrible pacing and filler ruined it").with_score(2),
//!     ],
//!     &[],
//! );
//!
//! let first = &output.corpus.reviews[0];
//! assert_eq!(
//!     first.sentiment.as_ref().map(|s| s.bucket),
//!     Some(SentimentBucket::VeryPositive)
//! );
//! assert!(first.aspects.as_ref().is_some_and(|a| a.contains(Aspect::Fight)));
//! assert_eq!(output.report.entity_kpis.len(), 2);
//! ```
//!
//! # Modules
//!
//! - [`text`]: Cleaning, segmentation, stop words and readability
//! - [`sentiment`]: Lexicon, pattern and optional transformer polarity models
//! - [`topic`]: LDA and embedding-clustering topic models
//! - [`aspect`]: Keyword flags for production aspects (filler, pacing, ...)
//! - [`divergence`]: Residual between text sentiment and user score
//! - [`stats`]: Bootstrap intervals, rank tests and effect sizes
//! - [`report`]: Tabular records for downstream consumers
//! - [`pipeline`]: Stage orchestration over one corpus
//! - [`config`]: Serde-loadable configuration
//! - [`review`]: Review records, ingestion and deduplication
//! - [`primitives`]: Dense matrices for the topic models
//! - [`cluster`]: Seeded k-means

pub mod aspect;
pub mod cluster;
pub mod config;
pub mod divergence;
pub mod error;
/// ONNX-backed polarity and embedding models
#[cfg(feature = "onnx")]
pub mod onnx;
pub mod pipeline;
pub mod prelude;
pub mod primitives;
pub mod report;
pub mod review;
pub mod sentiment;
pub mod stats;
pub mod text;
pub mod topic;

pub use error::{InsightError, Result};
pub use pipeline::{Pipeline, PipelineOutput};
pub use review::{Corpus, Entity, Review, ReviewInput};
