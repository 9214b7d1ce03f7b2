//! Tabular records for the downstream dashboard layer.
//!
//! Every row type is flat and `Serialize`; writing them to CSV or JSON files
//! is left to the caller.

use crate::aspect::Aspect;
use crate::divergence::ResidualBucket;
use crate::review::{Entity, ProcessingFlag, Recommendation, Review};
use crate::sentiment::{SentimentBucket, NEUTRAL_BAND};
use crate::stats::{mean, median, BootstrapEstimate, Estimate, Metric, StatisticsReport};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Raw review length class, in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LengthBucket {
    /// Under 200
    #[serde(rename = "Short (<200)")]
    Short,
    /// 200 to 799
    #[serde(rename = "Medium (200-800)")]
    Medium,
    /// 800 to 1999
    #[serde(rename = "Long (800-2000)")]
    Long,
    /// 2000 and up
    #[serde(rename = "Very Long (2000+)")]
    VeryLong,
}

impl LengthBucket {
    /// Bucket of a character count.
    #[must_use]
    pub fn of(chars: usize) -> Self {
        match chars {
            0..=199 => LengthBucket::Short,
            200..=799 => LengthBucket::Medium,
            800..=1999 => LengthBucket::Long,
            _ => LengthBucket::VeryLong,
        }
    }
}

/// One review with every derived field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewExport {
    /// Upstream or content-hash id
    pub review_id: String,
    /// Canonical entity
    pub entity: Entity,
    /// Sub-series the review was written for
    pub series_component: String,
    /// Raw text as ingested
    pub review_text: String,
    /// Score in 1..=10, if valid
    pub user_score: Option<u8>,
    /// Recommendation tag
    pub recommendation: Option<Recommendation>,
    /// Review date
    pub review_date: Option<NaiveDate>,
    /// Raw text length in characters
    pub review_length: usize,
    /// Length class
    pub review_length_bucket: LengthBucket,
    /// Word tokens after cleaning
    pub token_count: Option<usize>,
    /// Sentences after cleaning
    pub sentence_count: Option<usize>,
    /// Tokens per sentence
    pub avg_sentence_length: Option<f64>,
    /// Distinct tokens over tokens
    pub lexical_diversity: Option<f64>,
    /// Lexicon compound in [-1, 1]
    pub compound: Option<f64>,
    /// Lexicon share of positive mass
    pub lexicon_positive: Option<f64>,
    /// Lexicon share of neutral words
    pub lexicon_neutral: Option<f64>,
    /// Lexicon share of negative mass
    pub lexicon_negative: Option<f64>,
    /// Seven-way label of the compound
    pub sentiment_bucket: Option<SentimentBucket>,
    /// Pattern model polarity in [-1, 1]
    pub pattern_polarity: Option<f64>,
    /// Pattern model subjectivity in [0, 1]
    pub pattern_subjectivity: Option<f64>,
    /// Transformer P(negative)
    pub transformer_negative: Option<f64>,
    /// Transformer P(neutral)
    pub transformer_neutral: Option<f64>,
    /// Transformer P(positive)
    pub transformer_positive: Option<f64>,
    /// Transformer P(positive) minus P(negative)
    pub transformer_polarity: Option<f64>,
    /// Score mapped onto [-1, 1]
    pub normalized_score: Option<f64>,
    /// Compound minus normalized score
    pub residual: Option<f64>,
    /// Residual magnitude
    pub residual_abs: Option<f64>,
    /// Residual magnitude class
    pub residual_bucket: Option<ResidualBucket>,
    /// Dominant topic
    pub topic_id: Option<usize>,
    /// Dominant topic label
    pub topic_label: Option<String>,
    /// Weight of the dominant topic
    pub topic_probability: Option<f64>,
    /// Mentions filler
    pub mentions_filler: bool,
    /// Mentions animation
    pub mentions_animation: bool,
    /// Mentions characters
    pub mentions_character: bool,
    /// Mentions pacing
    pub mentions_pacing: bool,
    /// Mentions fights
    pub mentions_fight: bool,
    /// Mentions story
    pub mentions_story: bool,
    /// Mentions world building
    pub mentions_world_building: bool,
    /// Processing flags, sorted
    pub flags: Vec<ProcessingFlag>,
}

impl From<&Review> for ReviewExport {
    fn from(review: &Review) -> Self {
        let mentions = |aspect| {
            review
                .aspects
                .as_ref()
                .is_some_and(|flags| flags.contains(aspect))
        };
        let sentiment = review.sentiment.as_ref();
        let lexicon = sentiment.map(|s| &s.lexicon);
        let pattern = sentiment.and_then(|s| s.pattern.as_ref());
        let transformer = sentiment.and_then(|s| s.transformer.as_ref());
        let divergence = review.divergence.as_ref();
        let topic = review.topic.as_ref();
        let review_length = review.review_text.chars().count();

        Self {
            review_id: review.review_id.clone(),
            entity: review.entity.clone(),
            series_component: review.series_component.clone(),
            review_text: review.review_text.clone(),
            user_score: review.user_score,
            recommendation: review.recommendation,
            review_date: review.review_date,
            review_length,
            review_length_bucket: LengthBucket::of(review_length),
            token_count: review.readability.as_ref().map(|r| r.token_count),
            sentence_count: review.readability.as_ref().map(|r| r.sentence_count),
            avg_sentence_length: review.readability.as_ref().map(|r| r.avg_sentence_length),
            lexical_diversity: review.readability.as_ref().map(|r| r.lexical_diversity),
            compound: review.compound(),
            lexicon_positive: lexicon.map(|l| l.positive),
            lexicon_neutral: lexicon.map(|l| l.neutral),
            lexicon_negative: lexicon.map(|l| l.negative),
            sentiment_bucket: sentiment.map(|s| s.bucket),
            pattern_polarity: pattern.map(|p| p.polarity),
            pattern_subjectivity: pattern.map(|p| p.subjectivity),
            transformer_negative: transformer.map(|t| t.negative),
            transformer_neutral: transformer.map(|t| t.neutral),
            transformer_positive: transformer.map(|t| t.positive),
            transformer_polarity: transformer.map(|t| t.polarity()),
            normalized_score: divergence.map(|d| d.normalized_score),
            residual: divergence.map(|d| d.residual),
            residual_abs: divergence.map(|d| d.residual.abs()),
            residual_bucket: divergence.map(|d| d.bucket),
            topic_id: topic.map(|t| t.topic_id),
            topic_label: topic.map(|t| t.label.clone()),
            topic_probability: topic.map(|t| t.probability),
            mentions_filler: mentions(Aspect::Filler),
            mentions_animation: mentions(Aspect::Animation),
            mentions_character: mentions(Aspect::Character),
            mentions_pacing: mentions(Aspect::Pacing),
            mentions_fight: mentions(Aspect::Fight),
            mentions_story: mentions(Aspect::Story),
            mentions_world_building: mentions(Aspect::WorldBuilding),
            flags: review.flags.iter().copied().collect(),
        }
    }
}

/// Headline sentiment figures of one entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityKpi {
    /// Entity
    pub entity: Entity,
    /// Reviews with a sentiment score
    pub num_reviews: usize,
    /// Bootstrap mean compound
    pub mean_sentiment: Estimate<BootstrapEstimate>,
    /// Median compound
    pub median_sentiment: Option<f64>,
    /// Standard deviation of the compound
    pub std_sentiment: Option<f64>,
    /// Share with compound above the neutral band
    pub positive_rate: Option<f64>,
    /// Share with compound below the neutral band
    pub negative_rate: Option<f64>,
}

/// Topic share within one entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicPrevalenceRow {
    /// Entity
    pub entity: Entity,
    /// Topic
    pub topic_id: usize,
    /// Topic label
    pub topic_label: String,
    /// Reviews assigned to the topic
    pub num_reviews: usize,
    /// Fraction of the entity's topic-assigned reviews
    pub share: f64,
}

/// Sentiment of one topic within one entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicSentimentRow {
    /// Entity
    pub entity: Entity,
    /// Topic
    pub topic_id: usize,
    /// Topic label
    pub topic_label: String,
    /// Scored reviews assigned to the topic
    pub num_reviews: usize,
    /// Mean compound
    pub mean_sentiment: Option<f64>,
    /// Median compound
    pub median_sentiment: Option<f64>,
}

/// Sentiment among reviews mentioning one aspect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AspectSentimentRow {
    /// Entity
    pub entity: Entity,
    /// Aspect
    pub aspect: Aspect,
    /// Scored reviews mentioning the aspect
    pub num_reviews: usize,
    /// Mean compound
    pub mean_sentiment: Option<f64>,
    /// Median compound
    pub median_sentiment: Option<f64>,
}

/// Mean sentiment with an aspect minus without it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AspectLiftRow {
    /// Entity
    pub entity: Entity,
    /// Aspect
    pub aspect: Aspect,
    /// Scored reviews mentioning the aspect
    pub with_n: usize,
    /// Scored reviews not mentioning it
    pub without_n: usize,
    /// `InsufficientSample` carries the smaller side's size
    pub lift: Estimate<f64>,
}

/// Direction of the gap between text and score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RatingTendency {
    /// Scores run higher than the text reads
    Overrated,
    /// Scores run lower than the text reads
    Underrated,
    /// Mean residual within the neutral band
    Balanced,
}

impl RatingTendency {
    fn of(mean_residual: f64) -> Self {
        if mean_residual < -NEUTRAL_BAND {
            RatingTendency::Overrated
        } else if mean_residual > NEUTRAL_BAND {
            RatingTendency::Underrated
        } else {
            RatingTendency::Balanced
        }
    }
}

/// Over/under-rated index of one entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingIndexRow {
    /// Entity
    pub entity: Entity,
    /// Reviews with a residual
    pub num_scored: usize,
    /// Mean residual
    pub mean_residual: Option<f64>,
    /// Mean residual magnitude
    pub mean_abs_residual: Option<f64>,
    /// Share of High or Very High residuals
    pub high_share: Option<f64>,
    /// 1 = most overrated (lowest mean residual)
    pub rank: Option<usize>,
    /// Sign of the mean residual outside the neutral band
    pub tendency: Option<RatingTendency>,
}

/// Every table emitted for one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Report {
    /// One row per review, in corpus order
    pub reviews: Vec<ReviewExport>,
    /// One row per entity
    pub entity_kpis: Vec<EntityKpi>,
    /// Entity by topic shares
    pub topic_prevalence: Vec<TopicPrevalenceRow>,
    /// Entity by topic sentiment
    pub topic_sentiment: Vec<TopicSentimentRow>,
    /// Entity by aspect sentiment
    pub aspect_sentiment: Vec<AspectSentimentRow>,
    /// Entity by aspect lift
    pub aspect_lift: Vec<AspectLiftRow>,
    /// Over/under-rated index
    pub rating_index: Vec<RatingIndexRow>,
}

impl Report {
    /// Build every table from enriched reviews and their statistics.
    #[must_use]
    pub fn build(reviews: &[Review], statistics: &StatisticsReport, min_group_size: usize) -> Self {
        let by_entity = group_by_entity(reviews);
        Self {
            reviews: reviews.iter().map(ReviewExport::from).collect(),
            entity_kpis: entity_kpis(&by_entity, statistics, min_group_size),
            topic_prevalence: topic_prevalence(&by_entity),
            topic_sentiment: topic_sentiment(&by_entity),
            aspect_sentiment: aspect_sentiment(&by_entity),
            aspect_lift: aspect_lift(&by_entity, min_group_size),
            rating_index: rating_index(&by_entity),
        }
    }
}

type EntityGroups<'a> = BTreeMap<&'a Entity, Vec<&'a Review>>;

fn group_by_entity(reviews: &[Review]) -> EntityGroups<'_> {
    let mut groups: EntityGroups<'_> = BTreeMap::new();
    for review in reviews {
        groups.entry(&review.entity).or_default().push(review);
    }
    groups
}

fn rate(values: &[f64], pred: impl Fn(f64) -> bool) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().filter(|&&v| pred(v)).count() as f64 / values.len() as f64)
}

fn entity_kpis(
    groups: &EntityGroups<'_>,
    statistics: &StatisticsReport,
    min_group_size: usize,
) -> Vec<EntityKpi> {
    let corpus = statistics.corpus(Metric::Sentiment);
    groups
        .iter()
        .map(|(&entity, reviews)| {
            let values: Vec<f64> = reviews.iter().filter_map(|r| r.compound()).collect();
            let group = corpus.and_then(|c| c.group(entity));
            EntityKpi {
                entity: entity.clone(),
                num_reviews: values.len(),
                mean_sentiment: group.map_or(
                    Estimate::InsufficientSample {
                        n: values.len(),
                        required: min_group_size.max(1),
                    },
                    |g| g.mean.clone(),
                ),
                median_sentiment: median(&values),
                std_sentiment: crate::stats::std_dev(&values),
                positive_rate: rate(&values, |v| v > NEUTRAL_BAND),
                negative_rate: rate(&values, |v| v < -NEUTRAL_BAND),
            }
        })
        .collect()
}

/// `(topic_id, label)` → compounds (`None` when unscored) of one entity.
fn topic_groups<'a>(reviews: &[&'a Review]) -> BTreeMap<(usize, &'a str), Vec<Option<f64>>> {
    let mut out: BTreeMap<(usize, &str), Vec<Option<f64>>> = BTreeMap::new();
    for &review in reviews {
        if let Some(topic) = &review.topic {
            out.entry((topic.topic_id, topic.label.as_str()))
                .or_default()
                .push(review.compound());
        }
    }
    out
}

fn topic_prevalence(groups: &EntityGroups<'_>) -> Vec<TopicPrevalenceRow> {
    let mut rows = Vec::new();
    for (&entity, reviews) in groups {
        let topics = topic_groups(reviews);
        let total: usize = topics.values().map(Vec::len).sum();
        for ((topic_id, label), members) in topics {
            rows.push(TopicPrevalenceRow {
                entity: entity.clone(),
                topic_id,
                topic_label: label.to_string(),
                num_reviews: members.len(),
                share: members.len() as f64 / total as f64,
            });
        }
    }
    rows
}

fn topic_sentiment(groups: &EntityGroups<'_>) -> Vec<TopicSentimentRow> {
    let mut rows = Vec::new();
    for (&entity, reviews) in groups {
        for ((topic_id, label), members) in topic_groups(reviews) {
            let values: Vec<f64> = members.into_iter().flatten().collect();
            rows.push(TopicSentimentRow {
                entity: entity.clone(),
                topic_id,
                topic_label: label.to_string(),
                num_reviews: values.len(),
                mean_sentiment: mean(&values),
                median_sentiment: median(&values),
            });
        }
    }
    rows
}

/// Compounds of reviews with and without `aspect`; unflagged reviews are skipped.
fn split_by_aspect(reviews: &[&Review], aspect: Aspect) -> (Vec<f64>, Vec<f64>) {
    let mut with = Vec::new();
    let mut without = Vec::new();
    for review in reviews {
        let (Some(flags), Some(compound)) = (&review.aspects, review.compound()) else {
            continue;
        };
        if flags.contains(aspect) {
            with.push(compound);
        } else {
            without.push(compound);
        }
    }
    (with, without)
}

fn aspect_sentiment(groups: &EntityGroups<'_>) -> Vec<AspectSentimentRow> {
    let mut rows = Vec::new();
    for aspect in Aspect::ALL {
        for (&entity, reviews) in groups {
            let (with, _) = split_by_aspect(reviews, aspect);
            if with.is_empty() {
                continue;
            }
            rows.push(AspectSentimentRow {
                entity: entity.clone(),
                aspect,
                num_reviews: with.len(),
                mean_sentiment: mean(&with),
                median_sentiment: median(&with),
            });
        }
    }
    rows
}

fn aspect_lift(groups: &EntityGroups<'_>, min_group_size: usize) -> Vec<AspectLiftRow> {
    let required = min_group_size.max(1);
    let mut rows = Vec::new();
    for aspect in Aspect::ALL {
        for (&entity, reviews) in groups {
            let (with, without) = split_by_aspect(reviews, aspect);
            let lift = match (mean(&with), mean(&without)) {
                (Some(w), Some(wo)) if with.len() >= required && without.len() >= required => {
                    Estimate::Value(w - wo)
                }
                _ => Estimate::InsufficientSample {
                    n: with.len().min(without.len()),
                    required,
                },
            };
            rows.push(AspectLiftRow {
                entity: entity.clone(),
                aspect,
                with_n: with.len(),
                without_n: without.len(),
                lift,
            });
        }
    }
    rows
}

fn rating_index(groups: &EntityGroups<'_>) -> Vec<RatingIndexRow> {
    let mut rows: Vec<RatingIndexRow> = groups
        .iter()
        .map(|(&entity, reviews)| {
            let divergences: Vec<_> = reviews.iter().filter_map(|r| r.divergence).collect();
            let residuals: Vec<f64> = divergences.iter().map(|d| d.residual).collect();
            let abs: Vec<f64> = residuals.iter().map(|r| r.abs()).collect();
            let high = divergences.iter().filter(|d| d.bucket.is_high()).count();
            let mean_residual = mean(&residuals);
            RatingIndexRow {
                entity: entity.clone(),
                num_scored: residuals.len(),
                mean_residual,
                mean_abs_residual: mean(&abs),
                high_share: (!divergences.is_empty())
                    .then(|| high as f64 / divergences.len() as f64),
                rank: None,
                tendency: mean_residual.map(RatingTendency::of),
            }
        })
        .collect();

    let mut ranked: Vec<(usize, f64)> = rows
        .iter()
        .enumerate()
        .filter_map(|(i, r)| r.mean_residual.map(|m| (i, m)))
        .collect();
    ranked.sort_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
    for (rank, (i, _)) in ranked.into_iter().enumerate() {
        rows[i].rank = Some(rank + 1);
    }
    rows
}

#[cfg(test)]
#[path = "report_tests.rs"]
mod tests;
