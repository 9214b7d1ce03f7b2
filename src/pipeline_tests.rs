use super::*;
use crate::aspect::Aspect;
use crate::config::{StatsConfig, TopicConfig};
use crate::divergence::ResidualBucket;
use crate::error::InsightError;
use crate::review::Entity;
use crate::sentiment::{SentimentBucket, TransformerScores};
use crate::stats::Metric;

fn config() -> PipelineConfig {
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

/// Fails on any text with an exclamation mark.
struct Picky;

impl PolarityModel for Picky {
    fn name(&self) -> &str {
        "picky"
    }

    fn predict(&self, text: &str) -> Result<TransformerScores> {
        if text.contains('!') {
            Err(InsightError::from("input rejected"))
        } else {
            Ok(TransformerScores::from_logits([0.0, 0.0, 2.0]))
        }
    }
}

#[test]
fn test_scenario_end_to_end() {
    let output = Pipeline::new(config()).expect("valid").run(scenario(), &[]);
    let reviews = &output.corpus.reviews;
    assert_eq!(reviews.len(), 3);

    let buckets: Vec<_> = reviews
        .iter()
        .map(|r| r.sentiment.as_ref().expect("scored").bucket)
        .collect();
    assert_eq!(
        buckets,
        vec![
            SentimentBucket::VeryPositive,
            SentimentBucket::SlightlyPositive,
            SentimentBucket::VeryNegative
        ]
    );

    let aspects = |i: usize| reviews[i].aspects.clone().expect("extracted");
    assert!(aspects(0).contains(Aspect::Fight) && aspects(0).contains(Aspect::Story));
    assert!(aspects(1).contains(Aspect::Filler));
    assert!(aspects(2).contains(Aspect::Filler) && aspects(2).contains(Aspect::Pacing));

    let a = reviews[0].divergence.expect("scored");
    assert!((a.normalized_score - 3.5 / 4.5).abs() < 1e-12);
    assert_eq!(a.bucket, ResidualBucket::Low);

    let corpus = output
        .statistics
        .corpus(Metric::Sentiment)
        .expect("corpus comparison");
    let x = corpus.group(&Entity::new("X")).expect("X");
    let y = corpus.group(&Entity::new("Y")).expect("Y");
    let x_ci = x.mean.value().expect("enough data");
    let y_mean = y.mean.value().expect("enough data").mean;
    assert!(x_ci.ci_lower > y_mean);
}

#[test]
fn test_degenerate_topics_do_not_abort_other_stages() {
    let output = Pipeline::new(config()).expect("valid").run(scenario(), &[]);

    match output.stage(Stage::Topics) {
        Some(StageStatus::Failed { reason }) => assert!(reason.contains("8 topics")),
        other => panic!("expected failed topic stage, got {other:?}"),
    }
    assert!(output.topics.is_empty());
    for review in &output.corpus.reviews {
        assert!(review.has_flag(ProcessingFlag::TopicStageFailed));
        assert!(review.topic.is_none());
        assert!(review.sentiment.is_some());
    }
    for stage in [Stage::Ingest, Stage::Normalize, Stage::Sentiment, Stage::Statistics] {
        assert_eq!(output.stage(stage), Some(&StageStatus::Completed));
    }
    assert_eq!(output.report.entity_kpis.len(), 2);
}

#[test]
fn test_empty_text_is_kept_and_flagged() {
    let inputs = vec![
        ReviewInput::new("X", "Great fights").with_score(8),
        ReviewInput::new("X", "   \n\t ").with_score(5),
    ];
    let output = Pipeline::new(config()).expect("valid").run(inputs, &[]);
    assert_eq!(output.corpus.len(), 2);

    let empty = &output.corpus.reviews[1];
    assert!(empty.has_flag(ProcessingFlag::EmptyText));
    assert!(empty.normalized.is_none());
    assert!(empty.sentiment.is_none());
    assert!(empty.aspects.is_none());
    assert!(empty.divergence.is_none());
    assert!(!empty.has_flag(ProcessingFlag::TopicStageFailed));

    let normalize = output
        .stages
        .iter()
        .find(|s| s.stage == Stage::Normalize)
        .expect("normalize stage");
    assert_eq!((normalize.processed, normalize.flagged), (1, 1));
}

#[test]
fn test_missing_score_has_no_divergence() {
    let inputs = vec![ReviewInput::new("X", "solid story, nice characters")];
    let output = Pipeline::new(config()).expect("valid").run(inputs, &[]);
    let review = &output.corpus.reviews[0];
    assert!(review.has_flag(ProcessingFlag::MissingScore));
    assert!(review.divergence.is_none());
    assert!(review.sentiment.is_some());
    assert_eq!(output.report.reviews[0].residual, None);
}

#[test]
fn test_transformer_failure_degrades_single_reviews() {
    let context = PipelineContext::new(config())
        .expect("valid")
        .with_polarity_model(Box::new(Picky));
    let inputs = vec![
        ReviewInput::new("X", "Loved it!").with_score(9),
        ReviewInput::new("X", "pretty good overall").with_score(7),
    ];
    let output = Pipeline::with_context(context).run(inputs, &[]);
    let reviews = &output.corpus.reviews;

    assert!(reviews[0].has_flag(ProcessingFlag::TransformerDegraded));
    assert!(reviews[0].sentiment.as_ref().expect("cheap scores").transformer.is_none());
    assert!(!reviews[1].has_flag(ProcessingFlag::TransformerDegraded));
    assert!(reviews[1].sentiment.as_ref().expect("scored").transformer.is_some());

    assert!(matches!(
        output.stage(Stage::Sentiment),
        Some(StageStatus::Degraded { .. })
    ));
    assert_eq!(output.model_agreement.transformer_reviews, 1);
}

#[test]
fn test_unavailable_transformer_degrades_stage() {
    let mut config = config();
    config.sentiment.use_transformer = true;
    let output = Pipeline::new(config)
        .expect("valid")
        .run(vec![ReviewInput::new("X", "fine").with_score(6)], &[]);
    let status = output.stage(Stage::Sentiment).expect("sentiment stage");
    assert!(matches!(status, StageStatus::Degraded { .. }));
    assert!(status.is_success());
    assert!(!output.corpus.reviews[0].has_flag(ProcessingFlag::TransformerDegraded));
}

#[test]
fn test_topic_stage_assigns_and_flags_no_signal() {
    let themes = [
        "fights animation battles choreography",
        "filler pacing padding recap",
    ];
    let mut inputs: Vec<ReviewInput> = (0..20)
        .map(|i| {
            let entity = if i % 4 < 2 { "Naruto" } else { "Boruto" };
            ReviewInput::new(entity, format!("{} {i}", themes[i % 2])).with_score(6)
        })
        .collect();
    inputs.push(ReviewInput::new("Naruto", "wonderful soundtrack overall").with_score(8));

    let mut config = config().with_topics(
        TopicConfig::default()
            .with_count(2)
            .with_min_doc_freq(2)
            .with_max_doc_ratio(0.6),
    );
    config.stats.bootstrap_resamples = 200;
    let output = Pipeline::new(config).expect("valid").run(inputs, &[]);

    assert_eq!(output.stage(Stage::Topics), Some(&StageStatus::Completed));
    assert_eq!(output.topics.len(), 2);
    let reviews = &output.corpus.reviews;
    assert!(reviews[..20].iter().all(|r| r.topic.is_some()));
    let topic_of = |i: usize| reviews[i].topic.as_ref().map(|t| t.topic_id);
    assert_ne!(topic_of(0), topic_of(1));
    assert!(reviews[20].topic.is_none());
    assert!(reviews[20].has_flag(ProcessingFlag::NoTopicSignal));
    assert!(!output.report.topic_prevalence.is_empty());
}

#[test]
fn test_runs_are_deterministic() {
    let pipeline = Pipeline::new(config()).expect("valid");
    let a = pipeline.run(scenario(), &[]);
    let b = pipeline.run(scenario(), &[]);
    assert_eq!(a, b);
}

#[test]
fn test_invalid_config_rejected() {
    let config = PipelineConfig::default().with_topics(TopicConfig::default().with_count(0));
    assert!(matches!(
        Pipeline::new(config),
        Err(InsightError::InvalidConfig { .. })
    ));
}

#[test]
fn test_output_serializes() {
    let output = Pipeline::new(config()).expect("valid").run(scenario(), &[]);
    let json = serde_json::to_value(&output).expect("serialize");
    assert_eq!(json["stages"][5]["stage"], "topics");
    assert_eq!(json["stages"][5]["status"]["status"], "failed");
}
