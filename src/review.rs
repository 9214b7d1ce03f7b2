//! Review records, ingestion and deduplication.
//!
//! Upstream collectors hand over [`ReviewInput`] records already tagged with a
//! canonical [`Entity`]. [`Corpus::ingest`] turns them into [`Review`]s:
//! scores outside 1..=10 become absent, ids are derived from a content hash
//! when missing, and case/whitespace/punctuation variants of the same text are
//! dropped (first occurrence wins).

use crate::aspect::AspectFlags;
use crate::divergence::Divergence;
use crate::sentiment::SentimentResult;
use crate::text::normalize::dedup_key;
use crate::text::{NormalizedText, Readability};
use crate::topic::TopicAssignment;
use chrono::NaiveDate;
use serde::de::IntoDeserializer;
use serde::{Deserialize, Deserializer, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeSet, HashSet};
use std::fmt;

/// Canonical comparison group (a franchise after sub-series harmonization).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Entity(pub String);

impl Entity {
    /// Create an entity id.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Entity name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Entity {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

/// Reviewer's recommendation tag, spelled on the wire as the review site
/// shows it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Recommendation {
    /// "Recommended"
    #[serde(rename = "Recommended", alias = "recommended")]
    Recommended,
    /// "Mixed Feelings"
    #[serde(rename = "Mixed Feelings", alias = "mixed_feelings")]
    MixedFeelings,
    /// "Not Recommended"
    #[serde(rename = "Not Recommended", alias = "not_recommended")]
    NotRecommended,
}

/// Untagged reviews arrive as `""`; treat that like a missing tag.
fn blank_as_none<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<Recommendation>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(tag) => Recommendation::deserialize(tag.into_deserializer()).map(Some),
    }
}

/// Why a review is missing some derived field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingFlag {
    /// Nothing left after cleaning; skipped by text stages
    EmptyText,
    /// Transformer failed on this review; only lexicon/pattern scores kept
    TransformerDegraded,
    /// Topic stage aborted for the whole corpus
    TopicStageFailed,
    /// No token overlaps the topic vocabulary
    NoTopicSignal,
    /// No valid user score; no divergence computed
    MissingScore,
}

/// One upstream review record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewInput {
    /// Upstream id, if any
    #[serde(default)]
    pub review_id: Option<String>,
    /// Canonical entity
    pub entity: Entity,
    /// Sub-series the review was written for
    #[serde(default)]
    pub series_component: String,
    /// Raw review text
    pub review_text: String,
    /// Reviewer score; anything outside 1..=10 is treated as absent
    #[serde(default)]
    pub user_score: Option<i64>,
    /// Recommendation tag; blank means untagged
    #[serde(default, deserialize_with = "blank_as_none")]
    pub recommendation: Option<Recommendation>,
    /// Review date
    #[serde(default)]
    pub review_date: Option<NaiveDate>,
}

impl ReviewInput {
    /// Minimal record with entity and text.
    pub fn new(entity: impl Into<String>, review_text: impl Into<String>) -> Self {
        Self {
            review_id: None,
            entity: Entity::new(entity),
            series_component: String::new(),
            review_text: review_text.into(),
            user_score: None,
            recommendation: None,
            review_date: None,
        }
    }

    /// Set the user score.
    #[must_use]
    pub fn with_score(mut self, score: i64) -> Self {
        self.user_score = Some(score);
        self
    }

    /// Set the upstream id.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.review_id = Some(id.into());
        self
    }

    /// Set the series component.
    #[must_use]
    pub fn with_series_component(mut self, component: impl Into<String>) -> Self {
        self.series_component = component.into();
        self
    }

    /// Set the recommendation tag.
    #[must_use]
    pub fn with_recommendation(mut self, recommendation: Recommendation) -> Self {
        self.recommendation = Some(recommendation);
        self
    }

    /// Set the review date.
    #[must_use]
    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.review_date = Some(date);
        self
    }
}

/// A review plus the fields each stage writes into it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    /// Unique after deduplication
    pub review_id: String,
    /// Canonical entity
    pub entity: Entity,
    /// Informational sub-series name
    pub series_component: String,
    /// Raw text
    pub review_text: String,
    /// Score in 1..=10
    pub user_score: Option<u8>,
    /// Recommendation tag
    pub recommendation: Option<Recommendation>,
    /// Review date
    pub review_date: Option<NaiveDate>,
    /// Written by the normalizer
    pub normalized: Option<NormalizedText>,
    /// Written by the normalizer
    pub readability: Option<Readability>,
    /// Written by the sentiment scorer
    pub sentiment: Option<SentimentResult>,
    /// Written by the topic modeler
    pub topic: Option<TopicAssignment>,
    /// Written by the aspect extractor
    pub aspects: Option<AspectFlags>,
    /// Written by the divergence calculator
    pub divergence: Option<Divergence>,
    /// Skips and degradations
    pub flags: BTreeSet<ProcessingFlag>,
}

impl Review {
    fn from_input(input: ReviewInput, review_id: String) -> Self {
        Self {
            review_id,
            entity: input.entity,
            series_component: input.series_component,
            review_text: input.review_text,
            user_score: valid_score(input.user_score),
            recommendation: input.recommendation,
            review_date: input.review_date,
            normalized: None,
            readability: None,
            sentiment: None,
            topic: None,
            aspects: None,
            divergence: None,
            flags: BTreeSet::new(),
        }
    }

    /// Primary (lexicon) compound, if scored.
    #[must_use]
    pub fn compound(&self) -> Option<f64> {
        self.sentiment.as_ref().map(|s| s.lexicon.compound)
    }

    /// Divergence residual, if computed.
    #[must_use]
    pub fn residual(&self) -> Option<f64> {
        self.divergence.as_ref().map(|d| d.residual)
    }

    /// Whether the review carries `flag`.
    #[must_use]
    pub fn has_flag(&self, flag: ProcessingFlag) -> bool {
        self.flags.contains(&flag)
    }
}

fn valid_score(score: Option<i64>) -> Option<u8> {
    score
        .filter(|s| (1..=10).contains(s))
        .and_then(|s| u8::try_from(s).ok())
}

/// Content id: hex of the first 16 bytes of SHA-256 over `key`.
#[must_use]
pub fn content_id(key: &str) -> String {
    let digest = Sha256::digest(key.as_bytes());
    hex::encode(&digest[..16])
}

/// Deduplicated set of reviews.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Corpus {
    /// Kept reviews in input order
    pub reviews: Vec<Review>,
    /// Records dropped as duplicates
    pub duplicates_dropped: usize,
}

impl Corpus {
    /// Ingest upstream records.
    ///
    /// Reviews with no words at all are never treated as duplicates of each
    /// other; they are kept and later flagged `EmptyText`. A record whose
    /// upstream id was already taken is dropped like a text duplicate.
    pub fn ingest<I>(inputs: I) -> Self
    where
        I: IntoIterator<Item = ReviewInput>,
    {
        let mut seen_keys = HashSet::new();
        let mut seen_ids = HashSet::new();
        let mut reviews = Vec::new();
        let mut duplicates_dropped = 0;

        for (index, input) in inputs.into_iter().enumerate() {
            let key = dedup_key(&input.review_text);
            if !key.is_empty() && !seen_keys.insert(key.clone()) {
                duplicates_dropped += 1;
                continue;
            }

            let review_id = match &input.review_id {
                Some(id) => id.clone(),
                None if key.is_empty() => content_id(&format!("{index}\u{0}{}", input.review_text)),
                None => content_id(&key),
            };
            if !seen_ids.insert(review_id.clone()) {
                tracing::warn!(review_id = %review_id, "duplicate review id, dropping record");
                duplicates_dropped += 1;
                continue;
            }

            reviews.push(Review::from_input(input, review_id));
        }

        tracing::info!(
            kept = reviews.len(),
            dropped = duplicates_dropped,
            "ingested reviews"
        );
        Self {
            reviews,
            duplicates_dropped,
        }
    }

    /// Number of kept reviews.
    #[must_use]
    pub fn len(&self) -> usize {
        self.reviews.len()
    }

    /// Whether no review was kept.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.reviews.is_empty()
    }

    /// Distinct entities, sorted.
    #[must_use]
    pub fn entities(&self) -> Vec<Entity> {
        let set: BTreeSet<&Entity> = self.reviews.iter().map(|r| &r.entity).collect();
        set.into_iter().cloned().collect()
    }
}

/// Viewer status counts for one entity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusCounts {
    /// Currently watching
    pub watching: u64,
    /// Completed
    pub completed: u64,
    /// On hold
    pub on_hold: u64,
    /// Dropped
    pub dropped: u64,
    /// Plan to watch
    pub plan_to_watch: u64,
}

impl StatusCounts {
    /// Sum of all statuses.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.watching + self.completed + self.on_hold + self.dropped + self.plan_to_watch
    }
}

/// Score-side data for one entity: votes per score 1..=10 plus statuses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityScoreDistribution {
    /// Canonical entity
    pub entity: Entity,
    /// `votes[s - 1]` is the number of votes for score `s`
    pub votes: [u64; 10],
    /// Viewer statuses
    #[serde(default)]
    pub statuses: StatusCounts,
}

impl EntityScoreDistribution {
    /// Empty distribution.
    pub fn new(entity: impl Into<String>) -> Self {
        Self {
            entity: Entity::new(entity),
            votes: [0; 10],
            statuses: StatusCounts::default(),
        }
    }

    /// Set votes for one score; scores outside 1..=10 are ignored.
    #[must_use]
    pub fn with_votes(mut self, score: u8, votes: u64) -> Self {
        if (1..=10).contains(&score) {
            self.votes[usize::from(score - 1)] = votes;
        }
        self
    }

    /// Set status counts.
    #[must_use]
    pub fn with_statuses(mut self, statuses: StatusCounts) -> Self {
        self.statuses = statuses;
        self
    }

    /// Fold another sub-series into this one (votes and statuses add up).
    pub fn merge(&mut self, other: &Self) {
        for (mine, theirs) in self.votes.iter_mut().zip(other.votes.iter()) {
            *mine += theirs;
        }
        self.statuses.watching += other.statuses.watching;
        self.statuses.completed += other.statuses.completed;
        self.statuses.on_hold += other.statuses.on_hold;
        self.statuses.dropped += other.statuses.dropped;
        self.statuses.plan_to_watch += other.statuses.plan_to_watch;
    }

    /// Total number of score votes.
    #[must_use]
    pub fn total_votes(&self) -> u64 {
        self.votes.iter().sum()
    }

    /// Vote-weighted mean score, `None` without votes.
    #[must_use]
    pub fn weighted_mean(&self) -> Option<f64> {
        let total = self.total_votes();
        if total == 0 {
            return None;
        }
        let sum: f64 = self
            .votes
            .iter()
            .enumerate()
            .map(|(i, &v)| (i + 1) as f64 * v as f64)
            .sum();
        Some(sum / total as f64)
    }

    /// Completed over all statuses.
    #[must_use]
    pub fn completion_rate(&self) -> Option<f64> {
        self.status_rate(self.statuses.completed)
    }

    /// Dropped over all statuses.
    #[must_use]
    pub fn drop_rate(&self) -> Option<f64> {
        self.status_rate(self.statuses.dropped)
    }

    fn status_rate(&self, count: u64) -> Option<f64> {
        let total = self.statuses.total();
        (total > 0).then(|| count as f64 / total as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_out_of_range_scores_become_absent() {
        let corpus = Corpus::ingest(vec![
            ReviewInput::new("A", "one").with_score(0),
            ReviewInput::new("A", "two").with_score(11),
            ReviewInput::new("A", "three").with_score(10),
            ReviewInput::new("A", "four").with_score(1),
        ]);
        let scores: Vec<_> = corpus.reviews.iter().map(|r| r.user_score).collect();
        assert_eq!(scores, vec![None, None, Some(10), Some(1)]);
    }

    #[test]
    fn test_dedup_case_whitespace_variants_first_wins() {
        let corpus = Corpus::ingest(vec![
            ReviewInput::new("A", "Great show!").with_score(9),
            ReviewInput::new("B", "great   SHOW").with_score(2),
            ReviewInput::new("A", "Different text"),
        ]);
        assert_eq!(corpus.len(), 2);
        assert_eq!(corpus.duplicates_dropped, 1);
        assert_eq!(corpus.reviews[0].user_score, Some(9));
        assert_eq!(corpus.reviews[0].entity, Entity::from("A"));
    }

    #[test]
    fn test_generated_ids_are_stable_content_hashes() {
        let a = Corpus::ingest(vec![ReviewInput::new("A", "Great show!")]);
        let b = Corpus::ingest(vec![ReviewInput::new("B", "great show")]);
        assert_eq!(a.reviews[0].review_id, b.reviews[0].review_id);
        assert_eq!(a.reviews[0].review_id.len(), 32);
        assert_eq!(a.reviews[0].review_id, content_id("great show"));
    }

    #[test]
    fn test_upstream_id_kept_and_collisions_dropped() {
        let corpus = Corpus::ingest(vec![
            ReviewInput::new("A", "first").with_id("r1"),
            ReviewInput::new("A", "second").with_id("r1"),
        ]);
        assert_eq!(corpus.len(), 1);
        assert_eq!(corpus.reviews[0].review_id, "r1");
    }

    #[test]
    fn test_wordless_reviews_are_not_deduplicated() {
        let corpus = Corpus::ingest(vec![
            ReviewInput::new("A", "   "),
            ReviewInput::new("A", "   "),
        ]);
        assert_eq!(corpus.len(), 2);
        assert_ne!(corpus.reviews[0].review_id, corpus.reviews[1].review_id);
    }

    #[test]
    fn test_null_score_from_json() {
        let input: ReviewInput = serde_json::from_str(
            r#"{"entity": "X", "review_text": "ok", "user_score": null, "review_date": "2023-04-01"}"#,
        )
        .expect("valid record");
        assert!(input.user_score.is_none());
        assert_eq!(
            input.review_date,
            NaiveDate::from_ymd_opt(2023, 4, 1)
        );
    }

    #[test]
    fn test_recommendation_tags_from_scraped_records() {
        let parse = |tag: &str| -> Option<Recommendation> {
            let record = format!(
                r#"{{"entity": "X", "review_text": "ok", "recommendation": "{tag}"}}"#
            );
            serde_json::from_str::<ReviewInput>(&record)
                .expect("valid record")
                .recommendation
        };
        assert_eq!(parse("Recommended"), Some(Recommendation::Recommended));
        assert_eq!(parse("Mixed Feelings"), Some(Recommendation::MixedFeelings));
        assert_eq!(parse("Not Recommended"), Some(Recommendation::NotRecommended));
        assert_eq!(parse(""), None);
        assert_eq!(parse("mixed_feelings"), Some(Recommendation::MixedFeelings));

        let absent: ReviewInput =
            serde_json::from_str(r#"{"entity": "X", "review_text": "ok", "recommendation": null}"#)
                .expect("valid record");
        assert!(absent.recommendation.is_none());
        assert!(serde_json::from_str::<ReviewInput>(
            r#"{"entity": "X", "review_text": "ok", "recommendation": "Loved It"}"#
        )
        .is_err());
    }

    #[test]
    fn test_recommendation_serializes_as_site_label() {
        let json = serde_json::to_string(&Recommendation::MixedFeelings).expect("serializable");
        assert_eq!(json, r#""Mixed Feelings""#);
    }

    #[test]
    fn test_entities_sorted_unique() {
        let corpus = Corpus::ingest(vec![
            ReviewInput::new("Y", "b"),
            ReviewInput::new("X", "a"),
            ReviewInput::new("Y", "c"),
        ]);
        assert_eq!(corpus.entities(), vec![Entity::from("X"), Entity::from("Y")]);
    }

    #[test]
    fn test_distribution_baselines() {
        let mut dist = EntityScoreDistribution::new("X")
            .with_votes(10, 3)
            .with_votes(4, 1)
            .with_votes(11, 100)
            .with_statuses(StatusCounts {
                completed: 6,
                dropped: 2,
                watching: 2,
                ..StatusCounts::default()
            });
        assert_eq!(dist.total_votes(), 4);
        assert!((dist.weighted_mean().unwrap() - 8.5).abs() < 1e-12);
        assert!((dist.completion_rate().unwrap() - 0.6).abs() < 1e-12);
        assert!((dist.drop_rate().unwrap() - 0.2).abs() < 1e-12);

        let other = EntityScoreDistribution::new("X").with_votes(4, 1);
        dist.merge(&other);
        assert_eq!(dist.total_votes(), 5);
        assert!(EntityScoreDistribution::new("Z").weighted_mean().is_none());
    }
}
