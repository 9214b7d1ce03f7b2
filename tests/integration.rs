//! Integration tests for Reviewlens.
//!
//! These tests drive the full pipeline from upstream records to report rows.

use reviewlens::prelude::*;
use reviewlens::review::StatusCounts;

fn small_config() -> PipelineConfig {
    PipelineConfig::default().with_stats(
        StatsConfig::default()
            .with_min_group_size(1)
            .with_bootstrap_resamples(2000),
    )
}

fn scenario() -> Vec<ReviewInput> {
    vec![
        ReviewInput::new("X", "I loved this, amazing fights and story").with_score(9),
        ReviewInput::new("X", "filler dragged it down, still fine").with_score(6),
        ReviewInput::new("Y", "terrible pacing and filler ruined it").with_score(2),
    ]
}

#[test]
fn test_three_review_scenario() {
    let pipeline = Pipeline::new(small_config()).expect("valid config");
    let output = pipeline.run(scenario(), &[]);
    let reviews = &output.corpus.reviews;

    // buckets ordered A > B > C
    let buckets: Vec<SentimentBucket> = reviews
        .iter()
        .map(|r| r.sentiment.as_ref().expect("scored").bucket)
        .collect();
    assert!(buckets[0] > buckets[1] && buckets[1] > buckets[2]);

    let flags = |i: usize| reviews[i].aspects.clone().expect("extracted");
    assert_eq!(
        flags(0).iter().collect::<Vec<_>>(),
        vec![Aspect::Fight, Aspect::Story]
    );
    assert!(flags(1).contains(Aspect::Filler));
    assert!(flags(2).contains(Aspect::Filler));
    assert!(!flags(0).contains(Aspect::Filler));

    let sentiment = output
        .statistics
        .corpus(Metric::Sentiment)
        .expect("corpus comparison");
    let x = sentiment.group(&Entity::new("X")).expect("X");
    let y = sentiment.group(&Entity::new("Y")).expect("Y");
    let x_ci = x.mean.value().expect("enough data");
    let y_point = y.mean.value().expect("enough data").mean;
    assert!(
        x_ci.ci_lower > y_point,
        "X lower bound {} should exceed Y mean {}",
        x_ci.ci_lower,
        y_point
    );

    let failed = output.stage(Stage::Topics).expect("topic stage recorded");
    assert!(!failed.is_success());
    assert!(reviews
        .iter()
        .all(|r| r.has_flag(ProcessingFlag::TopicStageFailed)));
}

#[test]
fn test_report_rows_cover_every_review() {
    let output = Pipeline::new(small_config())
        .expect("valid config")
        .run(scenario(), &[]);
    let report = &output.report;

    assert_eq!(report.reviews.len(), 3);
    assert!(report.reviews[1].mentions_filler);
    assert!(report.reviews[2].mentions_pacing);
    assert_eq!(report.entity_kpis.len(), 2);
    assert!(report.topic_prevalence.is_empty());

    let filler: Vec<_> = report
        .aspect_sentiment
        .iter()
        .filter(|row| row.aspect == Aspect::Filler)
        .collect();
    assert_eq!(filler.len(), 2);
    assert_eq!(report.rating_index.len(), 2);
}

#[test]
fn test_duplicate_variants_collapse() {
    let inputs = vec![
        ReviewInput::new("X", "Great show, great fights!").with_score(9),
        ReviewInput::new("X", "great show   GREAT fights").with_score(3),
        ReviewInput::new("Y", "Boring.").with_score(4),
    ];
    let output = Pipeline::new(small_config())
        .expect("valid config")
        .run(inputs, &[]);
    assert_eq!(output.corpus.len(), 2);
    assert_eq!(output.corpus.duplicates_dropped, 1);
    assert_eq!(output.corpus.reviews[0].user_score, Some(9));
}

#[test]
fn test_missing_score_is_null_and_excluded() {
    let inputs = vec![
        ReviewInput::new("X", "Loved every episode").with_score(10),
        ReviewInput::new("X", "Hated every episode"),
        ReviewInput::new("Y", "It was okay").with_score(5),
    ];
    let output = Pipeline::new(small_config())
        .expect("valid config")
        .run(inputs, &[]);

    let unscored = &output.corpus.reviews[1];
    assert!(unscored.divergence.is_none());
    assert!(unscored.has_flag(ProcessingFlag::MissingScore));
    assert_eq!(output.report.reviews[1].residual, None);

    let residual = output
        .statistics
        .corpus(Metric::Residual)
        .expect("residual comparison");
    assert_eq!(residual.group(&Entity::new("X")).expect("X").n, 1);
}

#[test]
fn test_score_baselines_from_distributions() {
    let distributions = vec![
        EntityScoreDistribution::new("X")
            .with_votes(9, 3)
            .with_votes(8, 1)
            .with_statuses(StatusCounts {
                completed: 9,
                dropped: 1,
                ..StatusCounts::default()
            }),
        EntityScoreDistribution::new("Y").with_votes(3, 2),
    ];
    let output = Pipeline::new(small_config())
        .expect("valid config")
        .run(scenario(), &distributions);

    let baselines = &output.statistics.score_baselines;
    assert_eq!(baselines.len(), 2);
    assert_eq!(baselines[0].weighted_mean_score, Some(8.75));
    assert_eq!(baselines[0].completion_rate, Some(0.9));
    assert!(baselines[1].sentiment_score_gap.is_some());
}

#[test]
fn test_config_from_json_drives_pipeline() {
    let config = PipelineConfig::from_json_str(
        r#"{
            "stats": {"min_group_size": 1, "bootstrap_resamples": 500},
            "aspects": {"filler": ["filler", "recap episodes"]}
        }"#,
    )
    .expect("valid config");
    let output = Pipeline::new(config).expect("valid config").run(
        vec![ReviewInput::new("X", "Too many recap episodes.").with_score(4)],
        &[],
    );
    let flags = output.corpus.reviews[0].aspects.clone().expect("extracted");
    assert!(flags.contains(Aspect::Filler));
}

#[test]
fn test_bootstrap_interval_shrinks_with_more_reviews() {
    let texts = [
        "amazing fights",
        "boring filler",
        "great story",
        "terrible pacing",
        "good characters",
        "awful animation",
    ];
    let corpus = |copies: usize| -> Vec<ReviewInput> {
        (0..copies)
            .flat_map(|c| {
                texts
                    .iter()
                    .map(move |t| ReviewInput::new("X", format!("{t} {c}")).with_score(5))
            })
            .collect()
    };
    let pipeline = Pipeline::new(small_config()).expect("valid config");
    let width = |copies: usize| {
        let output = pipeline.run(corpus(copies), &[]);
        let comparison = output
            .statistics
            .corpus(Metric::Sentiment)
            .expect("corpus comparison")
            .clone();
        comparison
            .group(&Entity::new("X"))
            .and_then(|g| g.mean.value().copied())
            .expect("enough data")
            .width()
    };
    assert!(width(20) < width(1));
}
