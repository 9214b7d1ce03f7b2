//! Multi-model sentiment scoring.
//!
//! The lexicon model is always run and provides the primary compound score and
//! the composite [`SentimentBucket`]. The pattern model and an optional
//! transformer ([`PolarityModel`]) are cross-checks whose agreement is
//! reported at corpus level by [`model_agreement`].
//!
//! # Examples
//!
//! ```
//! use reviewlens::sentiment::{SentimentBucket, SentimentScorer};
//! use reviewlens::text::TextNormalizer;
//!
//! let text = TextNormalizer::new()
//!     .normalize("I loved this, amazing fights and story")
//!     .expect("non-empty");
//! let result = SentimentScorer::new().score(&text);
//! assert_eq!(result.bucket, SentimentBucket::VeryPositive);
//! assert!(result.pattern.is_some());
//! ```

pub mod lexicon;
pub mod pattern;
pub mod transformer;

pub use lexicon::{LexiconModel, LexiconScores};
pub use pattern::{PatternModel, PatternScores};
pub use transformer::{load_polarity_model, PolarityModel, TransformerScores};

use crate::config::SentimentConfig;
use crate::text::NormalizedText;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Band around zero treated as neutral when comparing models.
pub const NEUTRAL_BAND: f64 = 0.05;

/// Seven ordered buckets on the primary compound score.
///
/// Variants are declared from most negative to most positive so `Ord`
/// follows sentiment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SentimentBucket {
    /// compound < -0.5
    #[serde(rename = "Very Negative")]
    VeryNegative,
    /// -0.5 ≤ compound < -0.2
    #[serde(rename = "Negative")]
    Negative,
    /// -0.2 ≤ compound < 0.0
    #[serde(rename = "Slightly Negative")]
    SlightlyNegative,
    /// 0.0 ≤ compound < 0.2
    #[serde(rename = "Neutral")]
    Neutral,
    /// 0.2 ≤ compound < 0.5
    #[serde(rename = "Slightly Positive")]
    SlightlyPositive,
    /// 0.5 ≤ compound < 0.8
    #[serde(rename = "Positive")]
    Positive,
    /// compound ≥ 0.8
    #[serde(rename = "Very Positive")]
    VeryPositive,
}

impl SentimentBucket {
    /// Bucket a compound score; lower edges are inclusive.
    #[must_use]
    pub fn from_compound(compound: f64) -> Self {
        if compound >= 0.8 {
            Self::VeryPositive
        } else if compound >= 0.5 {
            Self::Positive
        } else if compound >= 0.2 {
            Self::SlightlyPositive
        } else if compound >= 0.0 {
            Self::Neutral
        } else if compound >= -0.2 {
            Self::SlightlyNegative
        } else if compound >= -0.5 {
            Self::Negative
        } else {
            Self::VeryNegative
        }
    }

    /// Display label.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::VeryNegative => "Very Negative",
            Self::Negative => "Negative",
            Self::SlightlyNegative => "Slightly Negative",
            Self::Neutral => "Neutral",
            Self::SlightlyPositive => "Slightly Positive",
            Self::Positive => "Positive",
            Self::VeryPositive => "Very Positive",
        }
    }
}

impl fmt::Display for SentimentBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Which model produced a polarity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    /// Valence lexicon (primary)
    Lexicon,
    /// Adjective pattern model
    Pattern,
    /// Transformer classifier
    Transformer,
}

/// Sign class with a ±[`NEUTRAL_BAND`] neutral zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Polarity {
    /// x < -0.05
    Negative,
    /// |x| ≤ 0.05
    Neutral,
    /// x > 0.05
    Positive,
}

impl Polarity {
    /// Classify a signed score.
    #[must_use]
    pub fn of(score: f64) -> Self {
        if score > NEUTRAL_BAND {
            Self::Positive
        } else if score < -NEUTRAL_BAND {
            Self::Negative
        } else {
            Self::Neutral
        }
    }
}

/// Per-review sentiment from every available model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentResult {
    /// Primary scores
    pub lexicon: LexiconScores,
    /// Pattern model cross-check
    pub pattern: Option<PatternScores>,
    /// Transformer probabilities, absent when disabled or degraded
    pub transformer: Option<TransformerScores>,
    /// Composite bucket on `lexicon.compound`
    pub bucket: SentimentBucket,
}

impl SentimentResult {
    /// Primary compound score.
    #[must_use]
    pub fn compound(&self) -> f64 {
        self.lexicon.compound
    }

    /// Signed polarity of each available model.
    #[must_use]
    pub fn polarities(&self) -> Vec<(ModelKind, f64)> {
        let mut out = vec![(ModelKind::Lexicon, self.lexicon.compound)];
        if let Some(p) = &self.pattern {
            out.push((ModelKind::Pattern, p.polarity));
        }
        if let Some(t) = &self.transformer {
            out.push((ModelKind::Transformer, t.polarity()));
        }
        out
    }
}

/// Runs the configured models over normalized text.
pub struct SentimentScorer {
    lexicon: LexiconModel,
    pattern: Option<PatternModel>,
    transformer: Option<Box<dyn PolarityModel>>,
    transformer_max_chars: usize,
}

impl fmt::Debug for SentimentScorer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SentimentScorer")
            .field("pattern", &self.pattern.is_some())
            .field("transformer", &self.transformer.as_ref().map(|t| t.name()))
            .field("transformer_max_chars", &self.transformer_max_chars)
            .finish()
    }
}

impl Default for SentimentScorer {
    fn default() -> Self {
        Self::new()
    }
}

impl SentimentScorer {
    /// Lexicon and pattern models, no transformer.
    #[must_use]
    pub fn new() -> Self {
        Self {
            lexicon: LexiconModel::new(),
            pattern: Some(PatternModel::new()),
            transformer: None,
            transformer_max_chars: SentimentConfig::default().transformer_max_chars,
        }
    }

    /// Build from configuration.
    ///
    /// A transformer that fails to load is logged and left out; the scorer
    /// then runs the cheap models only.
    #[must_use]
    pub fn from_config(config: &SentimentConfig) -> Self {
        let mut scorer = Self::new();
        scorer.transformer_max_chars = config.transformer_max_chars;
        if !config.use_pattern_model {
            scorer.pattern = None;
        }
        if config.use_transformer {
            match load_polarity_model(config) {
                Ok(model) => {
                    tracing::info!(model = model.name(), "transformer sentiment enabled");
                    scorer.transformer = Some(model);
                }
                Err(e) => {
                    tracing::warn!(error = %e, "transformer unavailable, using lexicon models only");
                }
            }
        }
        scorer
    }

    /// Replace the lexicon model.
    #[must_use]
    pub fn with_lexicon(mut self, lexicon: LexiconModel) -> Self {
        self.lexicon = lexicon;
        self
    }

    /// Attach a transformer.
    #[must_use]
    pub fn with_transformer(mut self, model: Box<dyn PolarityModel>) -> Self {
        self.transformer = Some(model);
        self
    }

    /// Disable the pattern model.
    #[must_use]
    pub fn without_pattern_model(mut self) -> Self {
        self.pattern = None;
        self
    }

    /// Whether a transformer is attached.
    #[must_use]
    pub fn has_transformer(&self) -> bool {
        self.transformer.is_some()
    }

    /// Score one review. Never fails: a transformer error only drops the
    /// transformer scores (see [`has_transformer`](Self::has_transformer)).
    #[must_use]
    pub fn score(&self, text: &NormalizedText) -> SentimentResult {
        let lexicon = self.lexicon.score(&text.clean_text);
        let pattern = self.pattern.as_ref().map(|m| m.score(&text.words));
        let transformer = self.transformer.as_ref().and_then(|model| {
            let input = transformer::truncate_chars(&text.clean_text, self.transformer_max_chars);
            match model.predict(input) {
                Ok(scores) => Some(scores),
                Err(e) => {
                    tracing::debug!(model = model.name(), error = %e, "transformer failed on review");
                    None
                }
            }
        });

        SentimentResult {
            bucket: SentimentBucket::from_compound(lexicon.compound),
            lexicon,
            pattern,
            transformer,
        }
    }
}

/// Corpus-level agreement between models.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelAgreement {
    /// Reviews with at least two models available
    pub reviews_compared: usize,
    /// Share of those where at least two models agree on the sign class
    pub agreement_rate: Option<f64>,
    /// Mean |lexicon compound - transformer polarity| where both exist
    pub mean_intensity_diff: Option<f64>,
    /// Reviews with transformer scores
    pub transformer_reviews: usize,
}

/// Measure how often the models agree.
#[must_use]
pub fn model_agreement<'a, I>(results: I) -> ModelAgreement
where
    I: IntoIterator<Item = &'a SentimentResult>,
{
    let mut compared = 0usize;
    let mut agreeing = 0usize;
    let mut diff_sum = 0.0;
    let mut transformer_reviews = 0usize;

    for result in results {
        let polarities = result.polarities();
        if polarities.len() >= 2 {
            compared += 1;
            let classes: Vec<Polarity> = polarities.iter().map(|&(_, p)| Polarity::of(p)).collect();
            let agree = classes
                .iter()
                .enumerate()
                .any(|(i, c)| classes[i + 1..].contains(c));
            if agree {
                agreeing += 1;
            }
        }
        if let Some(t) = &result.transformer {
            transformer_reviews += 1;
            diff_sum += (result.lexicon.compound - t.polarity()).abs();
        }
    }

    ModelAgreement {
        reviews_compared: compared,
        agreement_rate: (compared > 0).then(|| agreeing as f64 / compared as f64),
        mean_intensity_diff: (transformer_reviews > 0)
            .then(|| diff_sum / transformer_reviews as f64),
        transformer_reviews,
    }
}

/// Distribution of one model's polarity across the corpus.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelSummary {
    /// Model
    pub model: ModelKind,
    /// Reviews scored by the model
    pub count: usize,
    /// Mean polarity
    pub mean: f64,
    /// Sample standard deviation (0 for a single review)
    pub std: f64,
    /// Share above +0.05
    pub positive_rate: f64,
    /// Share below -0.05
    pub negative_rate: f64,
    /// Share within ±0.05
    pub neutral_rate: f64,
}

/// Per-model summaries, in [`ModelKind`] order; models with no scores are skipped.
#[must_use]
pub fn summarize<'a, I>(results: I) -> Vec<ModelSummary>
where
    I: IntoIterator<Item = &'a SentimentResult>,
{
    let mut by_model: [(ModelKind, Vec<f64>); 3] = [
        (ModelKind::Lexicon, Vec::new()),
        (ModelKind::Pattern, Vec::new()),
        (ModelKind::Transformer, Vec::new()),
    ];
    for result in results {
        for (kind, polarity) in result.polarities() {
            if let Some((_, values)) = by_model.iter_mut().find(|(k, _)| *k == kind) {
                values.push(polarity);
            }
        }
    }

    by_model
        .into_iter()
        .filter(|(_, values)| !values.is_empty())
        .map(|(model, values)| {
            let n = values.len() as f64;
            let rate = |class: Polarity| {
                values.iter().filter(|&&v| Polarity::of(v) == class).count() as f64 / n
            };
            ModelSummary {
                model,
                count: values.len(),
                mean: crate::stats::mean(&values).unwrap_or(0.0),
                std: crate::stats::std_dev(&values).unwrap_or(0.0),
                positive_rate: rate(Polarity::Positive),
                negative_rate: rate(Polarity::Negative),
                neutral_rate: rate(Polarity::Neutral),
            }
        })
        .collect()
}
