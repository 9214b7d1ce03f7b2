//! Corpus-level orchestration.
//!
//! [`Pipeline::run`] takes upstream records through every stage in order:
//! ingestion, normalization, sentiment, aspects, divergence, topics, then
//! statistics and report tables. Per-review failures become
//! [`ProcessingFlag`]s; only the topic stage can fail as a whole, and when it
//! does the remaining stages still run.
//!
//! # Examples
//!
//! ```
//! use reviewlens::config::{PipelineConfig, StatsConfig};
//! use reviewlens::pipeline::{Pipeline, Stage, StageStatus};
//! use reviewlens::review::ReviewInput;
//!
//! let config = PipelineConfig::default()
//!     .with_stats(StatsConfig::default().with_min_group_size(1).with_bootstrap_resamples(200));
//! let pipeline = Pipeline::new(config).expect("valid config");
//! let output = pipeline.run(
//!     vec![
//!         ReviewInput::new("X", "I loved this, amazing fights and story").with_score(9),
//!         ReviewInput::new("Y", "terrible pacing and filler ruined it").with_score(2),
//!     ],
//!     &[],
//! );
//! assert_eq!(output.corpus.len(), 2);
//! // two reviews cannot support eight topics
//! assert!(matches!(output.stage(Stage::Topics), Some(StageStatus::Failed { .. })));
//! ```

use crate::aspect::AspectExtractor;
use crate::config::PipelineConfig;
use crate::divergence::DivergenceCalculator;
use crate::error::Result;
use crate::report::Report;
use crate::review::{Corpus, EntityScoreDistribution, ProcessingFlag, Review, ReviewInput};
use crate::sentiment::{
    model_agreement, summarize, ModelAgreement, ModelSummary, PolarityModel, SentimentScorer,
};
use crate::stats::{ComparativeStatistics, StatisticsReport};
use crate::text::{NormalizedText, TextNormalizer};
use crate::topic::{Embedder, Topic, TopicModel, TopicModeler};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, info_span, warn};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Pipeline stage, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Deduplication and score coercion
    Ingest,
    /// Cleaning, segmentation, readability
    Normalize,
    /// Lexicon, pattern and transformer scoring
    Sentiment,
    /// Aspect keyword flags
    Aspects,
    /// Score/text residuals
    Divergence,
    /// Topic fit and assignment
    Topics,
    /// Comparative statistics and report tables
    Statistics,
}

impl Stage {
    /// Stage name used in logs.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Stage::Ingest => "ingest",
            Stage::Normalize => "normalize",
            Stage::Sentiment => "sentiment",
            Stage::Aspects => "aspects",
            Stage::Divergence => "divergence",
            Stage::Topics => "topics",
            Stage::Statistics => "statistics",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Outcome of one stage over the whole corpus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StageStatus {
    /// Ran over every eligible review
    Completed,
    /// Ran, but with a reduced model set or on fewer reviews than asked
    Degraded {
        /// What was lost
        reason: String,
    },
    /// Aborted; its derived fields stay empty
    Failed {
        /// Error that stopped the stage
        reason: String,
    },
    /// Nothing to do
    Skipped,
}

impl StageStatus {
    /// Whether the stage produced its output.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, StageStatus::Completed | StageStatus::Degraded { .. })
    }
}

/// Per-stage summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageReport {
    /// Stage
    pub stage: Stage,
    /// Outcome
    pub status: StageStatus,
    /// Reviews the stage wrote a field into
    pub processed: usize,
    /// Reviews the stage flagged
    pub flagged: usize,
}

/// Immutable resources shared by every stage of a run.
#[derive(Debug)]
pub struct PipelineContext {
    config: PipelineConfig,
    normalizer: TextNormalizer,
    scorer: SentimentScorer,
    modeler: TopicModeler,
    extractor: AspectExtractor,
    divergence: DivergenceCalculator,
    statistics: ComparativeStatistics,
}

impl PipelineContext {
    /// Validate the configuration and load every model it asks for.
    ///
    /// Optional models that fail to load are logged and left out.
    ///
    /// # Errors
    ///
    /// `InvalidConfig` when a section fails validation.
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            normalizer: TextNormalizer::new(),
            scorer: SentimentScorer::from_config(&config.sentiment),
            modeler: TopicModeler::from_config(&config.topics),
            extractor: AspectExtractor::new(&config.aspects)?,
            divergence: DivergenceCalculator::from_config(&config.divergence)?,
            statistics: ComparativeStatistics::new(config.stats.clone()),
            config,
        })
    }

    /// Attach a polarity model in place of the configured one.
    #[must_use]
    pub fn with_polarity_model(mut self, model: Box<dyn PolarityModel>) -> Self {
        self.scorer = self.scorer.with_transformer(model);
        self
    }

    /// Use `embedder` for embedding clustering.
    #[must_use]
    pub fn with_embedder(mut self, embedder: Arc<dyn Embedder>) -> Self {
        self.modeler = self.modeler.with_embedder(embedder);
        self
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Normalize, score, flag and compare one review. Topic assignment needs
    /// the fitted corpus model and happens separately.
    fn enrich(&self, review: &mut Review) {
        match self.normalizer.normalize(&review.review_text) {
            Ok(text) => {
                review.readability = Some(text.readability());
                let sentiment = self.scorer.score(&text);
                if self.scorer.has_transformer() && sentiment.transformer.is_none() {
                    review.flags.insert(ProcessingFlag::TransformerDegraded);
                }
                review.aspects = Some(self.extractor.extract(&text));
                review.divergence = self
                    .divergence
                    .compute(review.user_score, sentiment.lexicon.compound);
                review.sentiment = Some(sentiment);
                review.normalized = Some(text);
            }
            Err(e) => {
                debug!(review_id = %review.review_id, error = %e, "skipping text stages");
                review.flags.insert(ProcessingFlag::EmptyText);
            }
        }
        if review.user_score.is_none() {
            review.flags.insert(ProcessingFlag::MissingScore);
        }
    }
}

/// Everything one run produces.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineOutput {
    /// Enriched reviews
    pub corpus: Corpus,
    /// Stage outcomes in execution order
    pub stages: Vec<StageReport>,
    /// Fitted topics; empty when the topic stage did not complete
    pub topics: Vec<Topic>,
    /// Corpus-level agreement between sentiment models
    pub model_agreement: ModelAgreement,
    /// Per-model sentiment distributions
    pub sentiment_summary: Vec<ModelSummary>,
    /// Group comparisons and score baselines
    pub statistics: StatisticsReport,
    /// Tabular records
    pub report: Report,
}

impl PipelineOutput {
    /// Status of `stage`.
    #[must_use]
    pub fn stage(&self, stage: Stage) -> Option<&StageStatus> {
        self.stages.iter().find(|s| s.stage == stage).map(|s| &s.status)
    }
}

/// Runs the stages over a corpus.
#[derive(Debug)]
pub struct Pipeline {
    context: PipelineContext,
}

impl Pipeline {
    /// Build a pipeline from configuration.
    ///
    /// # Errors
    ///
    /// `InvalidConfig` when a section fails validation.
    pub fn new(config: PipelineConfig) -> Result<Self> {
        Ok(Self::with_context(PipelineContext::new(config)?))
    }

    /// Wrap a prepared context.
    #[must_use]
    pub fn with_context(context: PipelineContext) -> Self {
        Self { context }
    }

    /// Shared resources.
    #[must_use]
    pub fn context(&self) -> &PipelineContext {
        &self.context
    }

    /// Process one corpus end to end.
    ///
    /// Never fails: stage failures are reported in [`PipelineOutput::stages`]
    /// and per-review problems as flags.
    pub fn run<I>(&self, inputs: I, distributions: &[EntityScoreDistribution]) -> PipelineOutput
    where
        I: IntoIterator<Item = ReviewInput>,
    {
        let span = info_span!("pipeline.run");
        let _guard = span.enter();
        let ctx = &self.context;
        let mut stages = Vec::with_capacity(7);

        let mut corpus = Corpus::ingest(inputs);
        stages.push(StageReport {
            stage: Stage::Ingest,
            status: StageStatus::Completed,
            processed: corpus.len(),
            flagged: corpus.duplicates_dropped,
        });

        {
            let _enrich = info_span!("pipeline.enrich", reviews = corpus.len()).entered();

            #[cfg(feature = "parallel")]
            corpus.reviews.par_iter_mut().for_each(|review| ctx.enrich(review));

            #[cfg(not(feature = "parallel"))]
            corpus.reviews.iter_mut().for_each(|review| ctx.enrich(review));
        }
        stages.extend(self.review_stage_reports(&corpus.reviews));

        let topics = {
            let _topics = info_span!("pipeline.topics").entered();
            let (report, topics) = self.topic_stage(&mut corpus.reviews);
            stages.push(report);
            topics
        };

        let (statistics, report) = {
            let _stats = info_span!("pipeline.statistics").entered();
            let statistics = ctx.statistics.analyze(&corpus.reviews, distributions);
            let report = Report::build(
                &corpus.reviews,
                &statistics,
                ctx.statistics.min_group_size(),
            );
            (statistics, report)
        };
        stages.push(StageReport {
            stage: Stage::Statistics,
            status: if corpus.is_empty() {
                StageStatus::Skipped
            } else {
                StageStatus::Completed
            },
            processed: corpus.len(),
            flagged: 0,
        });

        let scored = || corpus.reviews.iter().filter_map(|r| r.sentiment.as_ref());
        let agreement = model_agreement(scored());
        let sentiment_summary = summarize(scored());

        for report in &stages {
            info!(
                stage = %report.stage,
                status = ?report.status,
                processed = report.processed,
                flagged = report.flagged,
                "stage finished"
            );
        }

        PipelineOutput {
            corpus,
            stages,
            topics,
            model_agreement: agreement,
            sentiment_summary,
            statistics,
            report,
        }
    }

    fn review_stage_reports(&self, reviews: &[Review]) -> Vec<StageReport> {
        let ctx = &self.context;
        let count = |pred: &dyn Fn(&Review) -> bool| reviews.iter().filter(|r| pred(r)).count();
        let normalized = count(&|r| r.normalized.is_some());
        let empty = count(&|r| r.has_flag(ProcessingFlag::EmptyText));
        let degraded = count(&|r| r.has_flag(ProcessingFlag::TransformerDegraded));
        let missing = count(&|r| r.has_flag(ProcessingFlag::MissingScore));

        let transformer_missing =
            ctx.config.sentiment.use_transformer && !ctx.scorer.has_transformer();
        let sentiment_status = if transformer_missing {
            StageStatus::Degraded {
                reason: "transformer unavailable, lexicon models only".to_string(),
            }
        } else if degraded > 0 {
            StageStatus::Degraded {
                reason: format!("{degraded} reviews scored without the transformer"),
            }
        } else {
            StageStatus::Completed
        };
        if degraded > 0 {
            warn!(reviews = degraded, "transformer degraded on some reviews");
        }

        vec![
            StageReport {
                stage: Stage::Normalize,
                status: StageStatus::Completed,
                processed: normalized,
                flagged: empty,
            },
            StageReport {
                stage: Stage::Sentiment,
                status: sentiment_status,
                processed: count(&|r| r.sentiment.is_some()),
                flagged: degraded,
            },
            StageReport {
                stage: Stage::Aspects,
                status: StageStatus::Completed,
                processed: count(&|r| r.aspects.is_some()),
                flagged: 0,
            },
            StageReport {
                stage: Stage::Divergence,
                status: StageStatus::Completed,
                processed: count(&|r| r.divergence.is_some()),
                flagged: missing,
            },
        ]
    }

    /// Fit on every normalized review, then assign. A failed fit flags every
    /// normalized review `TopicStageFailed`.
    fn topic_stage(&self, reviews: &mut [Review]) -> (StageReport, Vec<Topic>) {
        let texts: Vec<&NormalizedText> = reviews
            .iter()
            .filter_map(|r| r.normalized.as_ref())
            .collect();
        if texts.is_empty() {
            let report = StageReport {
                stage: Stage::Topics,
                status: StageStatus::Skipped,
                processed: 0,
                flagged: 0,
            };
            return (report, Vec::new());
        }

        let model = match self.context.modeler.fit(&texts) {
            Ok(model) => model,
            Err(e) => {
                warn!(error = %e, "topic stage failed, continuing without topics");
                let mut flagged = 0;
                for review in reviews.iter_mut().filter(|r| r.normalized.is_some()) {
                    review.flags.insert(ProcessingFlag::TopicStageFailed);
                    flagged += 1;
                }
                let report = StageReport {
                    stage: Stage::Topics,
                    status: StageStatus::Failed {
                        reason: e.to_string(),
                    },
                    processed: 0,
                    flagged,
                };
                return (report, Vec::new());
            }
        };

        #[cfg(feature = "parallel")]
        reviews.par_iter_mut().for_each(|review| assign_topic(&model, review));

        #[cfg(not(feature = "parallel"))]
        reviews.iter_mut().for_each(|review| assign_topic(&model, review));

        let processed = reviews.iter().filter(|r| r.topic.is_some()).count();
        let flagged = reviews
            .iter()
            .filter(|r| r.has_flag(ProcessingFlag::NoTopicSignal))
            .count();
        let report = StageReport {
            stage: Stage::Topics,
            status: StageStatus::Completed,
            processed,
            flagged,
        };
        (report, model.topics(reviews))
    }
}

fn assign_topic(model: &TopicModel, review: &mut Review) {
    let Some(text) = review.normalized.as_ref() else {
        return;
    };
    match model.assign(text) {
        Some(assignment) => review.topic = Some(assignment),
        None => {
            review.flags.insert(ProcessingFlag::NoTopicSignal);
        }
    }
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
