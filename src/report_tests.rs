use super::*;
use crate::aspect::AspectFlags;
use crate::config::StatsConfig;
use crate::divergence::DivergenceCalculator;
use crate::review::{Corpus, ReviewInput};
use crate::sentiment::{LexiconScores, SentimentResult, TransformerScores};
use crate::stats::ComparativeStatistics;
use crate::topic::TopicAssignment;

struct Row {
    entity: &'static str,
    compound: f64,
    score: Option<i64>,
    topic: Option<usize>,
    aspects: &'static [Aspect],
}

fn row(entity: &'static str, compound: f64, score: Option<i64>) -> Row {
    Row {
        entity,
        compound,
        score,
        topic: None,
        aspects: &[],
    }
}

fn build(rows: &[Row]) -> Vec<Review> {
    let inputs = rows.iter().enumerate().map(|(i, r)| {
        let input = ReviewInput::new(r.entity, format!("text {i}"));
        match r.score {
            Some(s) => input.with_score(s),
            None => input,
        }
    });
    let mut corpus = Corpus::ingest(inputs);
    let calc = DivergenceCalculator::new();
    for (review, r) in corpus.reviews.iter_mut().zip(rows) {
        review.sentiment = Some(SentimentResult {
            lexicon: LexiconScores {
                compound: r.compound,
                positive: 0.0,
                neutral: 1.0,
                negative: 0.0,
            },
            pattern: None,
            transformer: None,
            bucket: SentimentBucket::from_compound(r.compound),
        });
        review.divergence = calc.compute(review.user_score, r.compound);
        review.topic = r.topic.map(|topic_id| TopicAssignment {
            topic_id,
            label: format!("Topic {topic_id}"),
            probability: 0.8,
        });
        review.aspects = Some(r.aspects.iter().copied().collect::<AspectFlags>());
    }
    corpus.reviews
}

fn report(reviews: &[Review], min_group_size: usize) -> Report {
    let config = StatsConfig::default()
        .with_min_group_size(min_group_size)
        .with_bootstrap_resamples(500);
    let stats = ComparativeStatistics::new(config).analyze(reviews, &[]);
    Report::build(reviews, &stats, min_group_size)
}

#[test]
fn test_length_buckets() {
    assert_eq!(LengthBucket::of(0), LengthBucket::Short);
    assert_eq!(LengthBucket::of(200), LengthBucket::Medium);
    assert_eq!(LengthBucket::of(1999), LengthBucket::Long);
    assert_eq!(LengthBucket::of(2000), LengthBucket::VeryLong);
    let json = serde_json::to_string(&LengthBucket::Medium).expect("serialize");
    assert_eq!(json, "\"Medium (200-800)\"");
}

#[test]
fn test_review_export_fields() {
    let mut reviews = build(&[Row {
        topic: Some(3),
        aspects: &[Aspect::Filler, Aspect::Pacing],
        ..row("X", -0.7845, Some(2))
    }]);
    reviews[0].flags.insert(ProcessingFlag::NoTopicSignal);
    let export = ReviewExport::from(&reviews[0]);
    assert_eq!(export.compound, Some(-0.7845));
    assert_eq!(export.sentiment_bucket, Some(SentimentBucket::VeryNegative));
    assert_eq!(export.topic_id, Some(3));
    assert_eq!(export.topic_label.as_deref(), Some("Topic 3"));
    assert!(export.mentions_filler && export.mentions_pacing);
    assert!(!export.mentions_story);
    assert_eq!(export.residual_bucket, Some(ResidualBucket::Low));
    assert_eq!(export.flags, vec![ProcessingFlag::NoTopicSignal]);
}

#[test]
fn test_review_export_carries_class_proportions() {
    let mut reviews = build(&[row("X", 0.6, Some(8))]);
    let sentiment = reviews[0].sentiment.as_mut().expect("scored");
    sentiment.lexicon.positive = 0.4;
    sentiment.lexicon.neutral = 0.5;
    sentiment.lexicon.negative = 0.1;
    let export = ReviewExport::from(&reviews[0]);
    assert_eq!(export.lexicon_positive, Some(0.4));
    assert_eq!(export.lexicon_neutral, Some(0.5));
    assert_eq!(export.lexicon_negative, Some(0.1));
    assert_eq!(export.transformer_positive, None);

    let probs = TransformerScores::from_logits([0.0, 0.0, 2.0]);
    reviews[0].sentiment.as_mut().expect("scored").transformer = Some(probs);
    let export = ReviewExport::from(&reviews[0]);
    assert_eq!(export.transformer_negative, Some(probs.negative));
    assert_eq!(export.transformer_neutral, Some(probs.neutral));
    assert_eq!(export.transformer_positive, Some(probs.positive));
    assert!(export.transformer_positive > export.transformer_neutral);
    assert_eq!(export.transformer_polarity, Some(probs.polarity()));

    let json = serde_json::to_value(&export).expect("serialize");
    assert!(json.get("lexicon_neutral").is_some());
    assert!(json.get("transformer_negative").is_some());
}

#[test]
fn test_missing_score_exports_null_residual() {
    let reviews = build(&[row("X", 0.4, None)]);
    let export = ReviewExport::from(&reviews[0]);
    assert_eq!(export.residual, None);
    assert_eq!(export.residual_abs, None);
    assert_eq!(export.normalized_score, None);
}

#[test]
fn test_entity_kpis() {
    let reviews = build(&[
        row("X", 0.8, Some(9)),
        row("X", -0.6, Some(3)),
        row("X", 0.0, Some(5)),
        row("Y", 0.3, Some(6)),
    ]);
    let report = report(&reviews, 3);
    assert_eq!(report.entity_kpis.len(), 2);

    let x = &report.entity_kpis[0];
    assert_eq!(x.entity, Entity::new("X"));
    assert_eq!(x.num_reviews, 3);
    assert!(!x.mean_sentiment.is_insufficient());
    assert_eq!(x.median_sentiment, Some(0.0));
    let third = 1.0 / 3.0;
    assert!((x.positive_rate.expect("scored") - third).abs() < 1e-12);
    assert!((x.negative_rate.expect("scored") - third).abs() < 1e-12);

    let y = &report.entity_kpis[1];
    assert_eq!(
        y.mean_sentiment,
        Estimate::InsufficientSample { n: 1, required: 3 }
    );
}

#[test]
fn test_topic_tables() {
    let reviews = build(&[
        Row { topic: Some(0), ..row("X", 0.6, Some(8)) },
        Row { topic: Some(0), ..row("X", 0.2, Some(7)) },
        Row { topic: Some(1), ..row("X", -0.4, Some(4)) },
        Row { topic: None, ..row("X", 0.1, Some(5)) },
    ]);
    let report = report(&reviews, 1);

    assert_eq!(report.topic_prevalence.len(), 2);
    let first = &report.topic_prevalence[0];
    assert_eq!((first.topic_id, first.num_reviews), (0, 2));
    assert!((first.share - 2.0 / 3.0).abs() < 1e-12);

    let sentiment = &report.topic_sentiment[0];
    assert_eq!(sentiment.topic_label, "Topic 0");
    assert!((sentiment.mean_sentiment.expect("scored") - 0.4).abs() < 1e-12);
    assert!((sentiment.median_sentiment.expect("scored") - 0.4).abs() < 1e-12);
}

#[test]
fn test_aspect_tables() {
    let mut rows = Vec::new();
    for i in 0..5 {
        let jitter = f64::from(i) * 0.01;
        rows.push(Row {
            aspects: &[Aspect::Filler],
            ..row("X", -0.5 + jitter, Some(3))
        });
        rows.push(row("X", 0.5 + jitter, Some(8)));
    }
    rows.push(Row {
        aspects: &[Aspect::Filler],
        ..row("Y", 0.1, Some(5))
    });
    let reviews = build(&rows);
    let report = report(&reviews, 5);

    let filler_rows: Vec<_> = report
        .aspect_sentiment
        .iter()
        .filter(|r| r.aspect == Aspect::Filler)
        .collect();
    assert_eq!(filler_rows.len(), 2);
    assert_eq!(filler_rows[0].num_reviews, 5);
    assert!(report.aspect_sentiment.iter().all(|r| r.aspect == Aspect::Filler));

    let lift = |entity: &str| {
        report
            .aspect_lift
            .iter()
            .find(|r| r.aspect == Aspect::Filler && r.entity == Entity::new(entity))
            .expect("row per entity and aspect")
    };
    let x = lift("X");
    assert_eq!((x.with_n, x.without_n), (5, 5));
    let value = *x.lift.value().expect("both sides large enough");
    assert!((value + 1.0).abs() < 1e-9);

    let y = lift("Y");
    assert_eq!(y.lift, Estimate::InsufficientSample { n: 0, required: 5 });
}

#[test]
fn test_rating_index() {
    let reviews = build(&[
        // text cooler than the score: overrated
        row("A", 0.0, Some(10)),
        row("A", 0.1, Some(9)),
        // text warmer than the score: underrated
        row("B", 0.9, Some(2)),
        // no score at all
        row("C", 0.5, None),
    ]);
    let report = report(&reviews, 1);
    let index: BTreeMap<&str, &RatingIndexRow> = report
        .rating_index
        .iter()
        .map(|r| (r.entity.as_str(), r))
        .collect();

    assert_eq!(index["A"].tendency, Some(RatingTendency::Overrated));
    assert_eq!(index["A"].rank, Some(1));
    assert_eq!(index["A"].high_share, Some(1.0));
    assert_eq!(index["B"].tendency, Some(RatingTendency::Underrated));
    assert_eq!(index["B"].rank, Some(2));
    assert_eq!(index["C"].num_scored, 0);
    assert_eq!(index["C"].mean_residual, None);
    assert_eq!(index["C"].rank, None);
}
