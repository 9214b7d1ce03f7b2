//! Comparative statistics across entities.
//!
//! For each metric (text sentiment, divergence residual) and each scope (whole
//! corpus, one topic, one aspect) the engine compares entities: bootstrap mean
//! per entity, an omnibus rank test over entities with enough reviews, and a
//! pairwise Mann–Whitney U + Cliff's delta for every entity pair.
//!
//! Groups smaller than `stats.min_group_size` are kept and reported as
//! [`Estimate::InsufficientSample`].

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use super::bootstrap::{Bootstrap, BootstrapEstimate};
use super::effect_size::{cliffs_delta, CliffsDelta};
use super::hypothesis::{mann_whitney_u, MannWhitneyResult, OmnibusTest};
use super::{mean, median, std_dev};
use crate::aspect::Aspect;
use crate::config::StatsConfig;
use crate::divergence::normalize_score;
use crate::review::{Entity, EntityScoreDistribution, Review};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// A value, or the reason there is none.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Estimate<T> {
    /// Enough data
    Value(T),
    /// Group has `n` observations, `required` are needed
    InsufficientSample { n: usize, required: usize },
}

impl<T> Estimate<T> {
    /// The value, if any.
    #[must_use]
    pub fn value(&self) -> Option<&T> {
        match self {
            Estimate::Value(v) => Some(v),
            Estimate::InsufficientSample { .. } => None,
        }
    }

    /// Whether the group was too small.
    #[must_use]
    pub fn is_insufficient(&self) -> bool {
        matches!(self, Estimate::InsufficientSample { .. })
    }
}

/// Per-review quantity being compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    /// Lexicon compound
    Sentiment,
    /// Sentiment minus normalized score
    Residual,
}

impl Metric {
    /// Value of this metric for one review.
    #[must_use]
    pub fn of(self, review: &Review) -> Option<f64> {
        match self {
            Metric::Sentiment => review.compound(),
            Metric::Residual => review.residual(),
        }
    }
}

/// Subset of reviews a comparison runs over.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "scope", rename_all = "snake_case")]
pub enum Scope {
    /// Every review
    Corpus,
    /// Reviews assigned to one topic
    Topic { topic_id: usize, label: String },
    /// Reviews flagged with one aspect
    Aspect { aspect: Aspect },
}

impl Scope {
    fn contains(&self, review: &Review) -> bool {
        match self {
            Scope::Corpus => true,
            Scope::Topic { topic_id, .. } => {
                review.topic.as_ref().is_some_and(|t| t.topic_id == *topic_id)
            }
            Scope::Aspect { aspect } => review.aspects.as_ref().is_some_and(|a| a.contains(*aspect)),
        }
    }
}

/// One entity within a comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupEstimate {
    /// Entity
    pub entity: Entity,
    /// Observations in scope
    pub n: usize,
    /// Bootstrap mean and interval
    pub mean: Estimate<BootstrapEstimate>,
    /// Sample median
    pub median: Option<f64>,
    /// Sample standard deviation; `None` below two observations
    pub std_dev: Option<f64>,
}

/// Rank test and effect size for one entity pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PairwiseTest {
    /// Mean of `a` minus mean of `b`
    pub mean_difference: f64,
    /// Two-sided rank test
    pub mann_whitney: MannWhitneyResult,
    /// Effect size, positive when `a` tends higher
    pub cliffs_delta: CliffsDelta,
}

/// Comparison of two entities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairwiseComparison {
    /// First entity
    pub a: Entity,
    /// Second entity
    pub b: Entity,
    /// `InsufficientSample` carries the smaller group's size
    pub result: Estimate<PairwiseTest>,
}

/// All entity comparisons for one metric within one scope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonSet {
    /// Compared value
    pub metric: Metric,
    /// Reviews the comparison is restricted to
    pub scope: Scope,
    /// One entry per corpus entity, in entity order
    pub groups: Vec<GroupEstimate>,
    /// Entities that met the minimum sample size, in the order the omnibus
    /// test saw them
    pub omnibus_entities: Vec<Entity>,
    /// `None` with fewer than two eligible groups
    pub omnibus: Option<OmnibusTest>,
    /// Every entity pair, in entity order
    pub pairwise: Vec<PairwiseComparison>,
}

impl ComparisonSet {
    /// Estimate of one entity.
    #[must_use]
    pub fn group(&self, entity: &Entity) -> Option<&GroupEstimate> {
        self.groups.iter().find(|g| &g.entity == entity)
    }

    /// Pair comparison in either order.
    #[must_use]
    pub fn pair(&self, a: &Entity, b: &Entity) -> Option<&PairwiseComparison> {
        self.pairwise
            .iter()
            .find(|p| (&p.a == a && &p.b == b) || (&p.a == b && &p.b == a))
    }
}

/// Score-side view of one entity, next to its text sentiment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreBaseline {
    /// Entity
    pub entity: Entity,
    /// Votes across all score buckets
    pub total_votes: u64,
    /// Vote-weighted mean on the 1..=10 scale
    pub weighted_mean_score: Option<f64>,
    /// Weighted mean mapped onto [-1, 1]
    pub normalized_mean_score: Option<f64>,
    /// Completed viewers over all tracked viewers
    pub completion_rate: Option<f64>,
    /// Dropped viewers over all tracked viewers
    pub drop_rate: Option<f64>,
    /// Mean compound of the entity's reviews
    pub mean_sentiment: Option<f64>,
    /// `mean_sentiment - normalized_mean_score`
    pub sentiment_score_gap: Option<f64>,
}

/// Output of [`ComparativeStatistics::analyze`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatisticsReport {
    /// Every metric and scope compared
    pub comparisons: Vec<ComparisonSet>,
    /// One row per entity with a score distribution
    pub score_baselines: Vec<ScoreBaseline>,
}

impl StatisticsReport {
    /// Comparison for a metric and scope.
    #[must_use]
    pub fn find(&self, metric: Metric, scope: &Scope) -> Option<&ComparisonSet> {
        self.comparisons
            .iter()
            .find(|c| c.metric == metric && &c.scope == scope)
    }

    /// Whole-corpus comparison for a metric.
    #[must_use]
    pub fn corpus(&self, metric: Metric) -> Option<&ComparisonSet> {
        self.find(metric, &Scope::Corpus)
    }
}

/// Comparative statistics engine.
#[derive(Debug, Clone, Default)]
pub struct ComparativeStatistics {
    config: StatsConfig,
    bootstrap: Bootstrap,
}

impl ComparativeStatistics {
    /// Engine with the given settings.
    #[must_use]
    pub fn new(config: StatsConfig) -> Self {
        let bootstrap = Bootstrap::from_config(&config);
        Self { config, bootstrap }
    }

    /// Minimum group size in effect.
    #[must_use]
    pub fn min_group_size(&self) -> usize {
        self.config.min_group_size
    }

    /// Bootstrap mean of `values`, or `InsufficientSample`.
    #[must_use]
    pub fn estimate_mean(&self, values: &[f64]) -> Estimate<BootstrapEstimate> {
        let required = self.config.min_group_size.max(1);
        if values.len() < required {
            return Estimate::InsufficientSample {
                n: values.len(),
                required,
            };
        }
        match self.bootstrap.mean_ci(values) {
            Some(est) => Estimate::Value(est),
            None => Estimate::InsufficientSample { n: 0, required },
        }
    }

    /// Run every comparison.
    #[must_use]
    pub fn analyze(
        &self,
        reviews: &[Review],
        distributions: &[EntityScoreDistribution],
    ) -> StatisticsReport {
        let entities: Vec<Entity> = reviews
            .iter()
            .map(|r| r.entity.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let mut topics: BTreeMap<usize, String> = BTreeMap::new();
        for assignment in reviews.iter().filter_map(|r| r.topic.as_ref()) {
            topics
                .entry(assignment.topic_id)
                .or_insert_with(|| assignment.label.clone());
        }

        let mut scopes = vec![Scope::Corpus];
        scopes.extend(
            topics
                .into_iter()
                .map(|(topic_id, label)| Scope::Topic { topic_id, label }),
        );
        scopes.extend(Aspect::ALL.into_iter().map(|aspect| Scope::Aspect { aspect }));

        let jobs: Vec<(Metric, Scope)> = [Metric::Sentiment, Metric::Residual]
            .into_iter()
            .flat_map(|m| scopes.iter().cloned().map(move |s| (m, s)))
            .collect();

        #[cfg(feature = "parallel")]
        let comparisons: Vec<ComparisonSet> = jobs
            .into_par_iter()
            .map(|(metric, scope)| self.compare(reviews, &entities, metric, scope))
            .collect();

        #[cfg(not(feature = "parallel"))]
        let comparisons: Vec<ComparisonSet> = jobs
            .into_iter()
            .map(|(metric, scope)| self.compare(reviews, &entities, metric, scope))
            .collect();

        let report = StatisticsReport {
            comparisons,
            score_baselines: score_baselines(reviews, distributions),
        };
        tracing::info!(
            entities = entities.len(),
            comparisons = report.comparisons.len(),
            baselines = report.score_baselines.len(),
            "computed comparative statistics"
        );
        report
    }

    /// Compare entities on one metric within one scope.
    #[must_use]
    pub fn compare(
        &self,
        reviews: &[Review],
        entities: &[Entity],
        metric: Metric,
        scope: Scope,
    ) -> ComparisonSet {
        let samples: Vec<(Entity, Vec<f64>)> = entities
            .iter()
            .map(|entity| {
                let values = reviews
                    .iter()
                    .filter(|r| &r.entity == entity && scope.contains(r))
                    .filter_map(|r| metric.of(r))
                    .collect();
                (entity.clone(), values)
            })
            .collect();

        let groups = samples
            .iter()
            .map(|(entity, values)| GroupEstimate {
                entity: entity.clone(),
                n: values.len(),
                mean: self.estimate_mean(values),
                median: median(values),
                std_dev: std_dev(values),
            })
            .collect();

        let required = self.config.min_group_size.max(1);
        let (omnibus_entities, eligible): (Vec<Entity>, Vec<&[f64]>) = samples
            .iter()
            .filter(|(_, v)| v.len() >= required)
            .map(|(entity, v)| (entity.clone(), v.as_slice()))
            .unzip();
        let omnibus = if eligible.len() >= 2 {
            OmnibusTest::for_groups(&eligible).ok()
        } else {
            None
        };

        let mut pairwise = Vec::new();
        for (i, (a, va)) in samples.iter().enumerate() {
            for (b, vb) in &samples[i + 1..] {
                pairwise.push(PairwiseComparison {
                    a: a.clone(),
                    b: b.clone(),
                    result: self.compare_pair(va, vb),
                });
            }
        }

        ComparisonSet {
            metric,
            scope,
            groups,
            omnibus_entities,
            omnibus,
            pairwise,
        }
    }

    fn compare_pair(&self, a: &[f64], b: &[f64]) -> Estimate<PairwiseTest> {
        let required = self.config.min_group_size.max(1);
        let smaller = a.len().min(b.len());
        if smaller < required {
            return Estimate::InsufficientSample {
                n: smaller,
                required,
            };
        }
        let test = (|| {
            Some(PairwiseTest {
                mean_difference: mean(a)? - mean(b)?,
                mann_whitney: mann_whitney_u(a, b).ok()?,
                cliffs_delta: cliffs_delta(a, b)?,
            })
        })();
        match test {
            Some(t) => Estimate::Value(t),
            None => Estimate::InsufficientSample { n: 0, required },
        }
    }
}

/// One baseline per entity with a distribution; sub-series are merged.
fn score_baselines(
    reviews: &[Review],
    distributions: &[EntityScoreDistribution],
) -> Vec<ScoreBaseline> {
    let mut merged: BTreeMap<Entity, EntityScoreDistribution> = BTreeMap::new();
    for dist in distributions {
        merged
            .entry(dist.entity.clone())
            .and_modify(|m| m.merge(dist))
            .or_insert_with(|| dist.clone());
    }

    merged
        .into_values()
        .map(|dist| {
            let sentiments: Vec<f64> = reviews
                .iter()
                .filter(|r| r.entity == dist.entity)
                .filter_map(Review::compound)
                .collect();
            let weighted_mean_score = dist.weighted_mean();
            let normalized_mean_score = weighted_mean_score.map(normalize_score);
            let mean_sentiment = mean(&sentiments);
            ScoreBaseline {
                total_votes: dist.total_votes(),
                weighted_mean_score,
                normalized_mean_score,
                completion_rate: dist.completion_rate(),
                drop_rate: dist.drop_rate(),
                mean_sentiment,
                sentiment_score_gap: mean_sentiment
                    .zip(normalized_mean_score)
                    .map(|(s, n)| s - n),
                entity: dist.entity,
            }
        })
        .collect()
}

#[cfg(test)]
#[path = "compare_tests.rs"]
mod tests;
