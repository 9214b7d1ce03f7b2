use super::*;
use crate::aspect::AspectFlags;
use crate::divergence::DivergenceCalculator;
use crate::review::{Corpus, ReviewInput, StatusCounts};
use crate::sentiment::{LexiconScores, SentimentBucket, SentimentResult};
use crate::topic::TopicAssignment;

fn sentiment(compound: f64) -> SentimentResult {
    SentimentResult {
        lexicon: LexiconScores {
            compound,
            positive: 0.0,
            neutral: 1.0,
            negative: 0.0,
        },
        pattern: None,
        transformer: None,
        bucket: SentimentBucket::from_compound(compound),
    }
}

/// Reviews with fixed compounds; `score` of 0 means absent.
fn reviews(rows: &[(&str, f64, i64)]) -> Vec<Review> {
    let inputs = rows.iter().enumerate().map(|(i, (entity, _, score))| {
        let input = ReviewInput::new(*entity, format!("review number {i}"));
        if *score > 0 {
            input.with_score(*score)
        } else {
            input
        }
    });
    let mut corpus = Corpus::ingest(inputs);
    let calc = DivergenceCalculator::new();
    for (review, (_, compound, _)) in corpus.reviews.iter_mut().zip(rows) {
        review.sentiment = Some(sentiment(*compound));
        review.divergence = calc.compute(review.user_score, *compound);
    }
    corpus.reviews
}

fn engine(min_group_size: usize) -> ComparativeStatistics {
    ComparativeStatistics::new(
        StatsConfig::default()
            .with_min_group_size(min_group_size)
            .with_bootstrap_resamples(2000),
    )
}

#[test]
fn test_scenario_entity_interval() {
    let data = reviews(&[("X", 0.8271, 9), ("X", 0.2023, 6), ("Y", -0.7845, 2)]);
    let report = engine(1).analyze(&data, &[]);
    let corpus = report.corpus(Metric::Sentiment).expect("corpus comparison");

    let x = corpus.group(&Entity::new("X")).expect("X present");
    let y = corpus.group(&Entity::new("Y")).expect("Y present");
    let x_mean = x.mean.value().expect("enough data");
    let y_mean = y.mean.value().expect("enough data");
    assert!((x_mean.mean - 0.5147).abs() < 1e-9);
    assert!(x_mean.ci_lower > y_mean.mean);
    assert!(matches!(corpus.omnibus, Some(OmnibusTest::MannWhitneyU(_))));
}

#[test]
fn test_small_groups_are_insufficient_not_zero() {
    let data = reviews(&[("X", 0.5, 9), ("X", 0.4, 8), ("Y", -0.2, 2)]);
    let report = engine(5).analyze(&data, &[]);
    let corpus = report.corpus(Metric::Sentiment).expect("corpus comparison");

    assert_eq!(corpus.groups.len(), 2);
    for group in &corpus.groups {
        assert!(group.mean.is_insufficient());
    }
    assert_eq!(
        corpus.group(&Entity::new("X")).expect("X").mean,
        Estimate::InsufficientSample { n: 2, required: 5 }
    );
    assert!(corpus.omnibus.is_none());
    assert!(corpus.omnibus_entities.is_empty());
    let pair = corpus
        .pair(&Entity::new("Y"), &Entity::new("X"))
        .expect("pair listed");
    assert_eq!(pair.result, Estimate::InsufficientSample { n: 1, required: 5 });
}

#[test]
fn test_missing_scores_excluded_from_residual() {
    let data = reviews(&[("X", 0.9, 10), ("X", 0.9, 0), ("X", -0.9, 0)]);
    let report = engine(1).analyze(&data, &[]);
    let residual = report.corpus(Metric::Residual).expect("residual comparison");
    let x = residual.group(&Entity::new("X")).expect("X");
    assert_eq!(x.n, 1);
    let est = x.mean.value().expect("one scored review");
    assert!((est.mean - (0.9 - 1.0)).abs() < 1e-12);

    let sentiment = report.corpus(Metric::Sentiment).expect("sentiment comparison");
    assert_eq!(sentiment.group(&Entity::new("X")).expect("X").n, 3);
}

#[test]
fn test_omnibus_lists_only_entities_past_the_gate() {
    let mut rows = vec![("Z", 0.1, 5)];
    for i in 0..3 {
        let jitter = f64::from(i) * 0.01;
        rows.push(("A", 0.7 + jitter, 9));
        rows.push(("B", -0.4 + jitter, 3));
    }
    let data = reviews(&rows);
    let report = engine(3).analyze(&data, &[]);
    let corpus = report.corpus(Metric::Sentiment).expect("corpus comparison");

    assert_eq!(corpus.groups.len(), 3);
    assert_eq!(
        corpus.omnibus_entities,
        vec![Entity::new("A"), Entity::new("B")]
    );
    assert!(matches!(corpus.omnibus, Some(OmnibusTest::MannWhitneyU(_))));
}

#[test]
fn test_three_entities_use_kruskal_wallis() {
    let mut rows = Vec::new();
    for i in 0..6 {
        let jitter = f64::from(i) * 0.01;
        rows.push(("A", 0.8 + jitter, 9));
        rows.push(("B", 0.0 + jitter, 5));
        rows.push(("C", -0.8 + jitter, 1));
    }
    let data = reviews(&rows);
    let report = engine(5).analyze(&data, &[]);
    let corpus = report.corpus(Metric::Sentiment).expect("corpus comparison");
    match corpus.omnibus {
        Some(OmnibusTest::KruskalWallis(r)) => {
            assert_eq!(r.df, 2);
            assert!(r.p_value < 0.01);
        }
        other => panic!("expected Kruskal-Wallis, got {other:?}"),
    }
    assert_eq!(
        corpus.omnibus_entities,
        vec![Entity::new("A"), Entity::new("B"), Entity::new("C")]
    );
    assert_eq!(corpus.pairwise.len(), 3);
    let ac = corpus
        .pair(&Entity::new("A"), &Entity::new("C"))
        .and_then(|p| p.result.value())
        .expect("enough data");
    assert_eq!(ac.cliffs_delta.delta, 1.0);
    assert!(ac.mean_difference > 1.5);
}

#[test]
fn test_topic_and_aspect_scopes() {
    let mut data = reviews(&[("X", 0.6, 8), ("X", 0.4, 7), ("Y", -0.3, 3)]);
    for review in &mut data {
        review.topic = Some(TopicAssignment {
            topic_id: 2,
            label: "Filler Fatigue".to_string(),
            probability: 0.9,
        });
        review.aspects = Some([Aspect::Filler].into_iter().collect::<AspectFlags>());
    }
    let report = engine(1).analyze(&data, &[]);

    let topic_scope = Scope::Topic {
        topic_id: 2,
        label: "Filler Fatigue".to_string(),
    };
    let topic = report
        .find(Metric::Sentiment, &topic_scope)
        .expect("topic comparison");
    assert_eq!(topic.group(&Entity::new("X")).expect("X").n, 2);

    let filler = report
        .find(Metric::Sentiment, &Scope::Aspect { aspect: Aspect::Filler })
        .expect("aspect comparison");
    assert_eq!(filler.group(&Entity::new("Y")).expect("Y").n, 1);

    let story = report
        .find(Metric::Sentiment, &Scope::Aspect { aspect: Aspect::Story })
        .expect("every aspect listed");
    assert!(story.groups.iter().all(|g| g.n == 0 && g.mean.is_insufficient()));
}

#[test]
fn test_score_baselines_merge_sub_series() {
    let data = reviews(&[("X", 0.5, 9), ("X", 0.3, 8)]);
    let parts = vec![
        EntityScoreDistribution::new("X")
            .with_votes(10, 1)
            .with_statuses(StatusCounts {
                completed: 3,
                dropped: 1,
                ..StatusCounts::default()
            }),
        EntityScoreDistribution::new("X").with_votes(1, 1),
        EntityScoreDistribution::new("Z").with_votes(5, 2),
    ];
    let report = engine(1).analyze(&data, &parts);
    assert_eq!(report.score_baselines.len(), 2);

    let x = &report.score_baselines[0];
    assert_eq!(x.entity, Entity::new("X"));
    assert_eq!(x.total_votes, 2);
    assert_eq!(x.weighted_mean_score, Some(5.5));
    assert!(x.normalized_mean_score.expect("votes").abs() < 1e-12);
    assert_eq!(x.completion_rate, Some(0.75));
    assert_eq!(x.drop_rate, Some(0.25));
    assert!((x.sentiment_score_gap.expect("both sides") - 0.4).abs() < 1e-12);

    let z = &report.score_baselines[1];
    assert_eq!(z.mean_sentiment, None);
    assert_eq!(z.sentiment_score_gap, None);
    assert_eq!(z.completion_rate, None);
}

#[test]
fn test_analysis_is_deterministic() {
    let data = reviews(&[("X", 0.1, 3), ("X", 0.7, 8), ("Y", -0.4, 4), ("Y", 0.2, 6)]);
    let a = engine(1).analyze(&data, &[]);
    let b = engine(1).analyze(&data, &[]);
    assert_eq!(a, b);
}

#[test]
fn test_interval_narrows_with_sample_size() {
    let pattern = [0.9, -0.5, 0.3, -0.1, 0.6, -0.7, 0.2, 0.0];
    let small: Vec<f64> = pattern.to_vec();
    let large: Vec<f64> = pattern.iter().cycle().take(pattern.len() * 16).copied().collect();
    let stats = engine(1);
    let narrow = stats.estimate_mean(&large);
    let wide = stats.estimate_mean(&small);
    let narrow = narrow.value().expect("enough data");
    let wide = wide.value().expect("enough data");
    assert!(narrow.width() < wide.width());
}
