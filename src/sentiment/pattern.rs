//! Adjective-polarity pattern model.
//!
//! Averages the polarity and subjectivity of known adjectives. An intensifier
//! directly before an adjective multiplies it; a negator before that (or
//! before the adjective itself) flips and halves the polarity. Used as an
//! independent cross-check of the lexicon model.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

const NEGATION_FACTOR: f64 = -0.5;

/// Scores from [`PatternModel::score`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PatternScores {
    /// Mean polarity in [-1, 1]
    pub polarity: f64,
    /// Mean subjectivity in [0, 1]
    pub subjectivity: f64,
}

/// Adjective lexicon with intensifiers.
#[derive(Debug, Clone)]
pub struct PatternModel {
    adjectives: HashMap<&'static str, (f64, f64)>,
    intensifiers: HashMap<&'static str, f64>,
}

impl Default for PatternModel {
    fn default() -> Self {
        Self::new()
    }
}

impl PatternModel {
    /// Model with the built-in adjective table.
    #[must_use]
    pub fn new() -> Self {
        Self {
            adjectives: ADJECTIVES.iter().map(|&(w, p, s)| (w, (p, s))).collect(),
            intensifiers: INTENSIFIERS.iter().copied().collect(),
        }
    }

    /// Score lowercase words.
    #[must_use]
    pub fn score(&self, words: &[String]) -> PatternScores {
        let mut polarity_sum = 0.0;
        let mut subjectivity_sum = 0.0;
        let mut assessments = 0usize;

        for (i, word) in words.iter().enumerate() {
            let Some(&(polarity, subjectivity)) = self.adjectives.get(word.as_str()) else {
                continue;
            };
            let mut polarity = polarity;
            let mut subjectivity = subjectivity;
            let mut modifier_at = i;

            if let Some(prev) = i.checked_sub(1).map(|p| words[p].as_str()) {
                if let Some(&factor) = self.intensifiers.get(prev) {
                    polarity *= factor;
                    subjectivity *= factor;
                    modifier_at = i - 1;
                }
            }
            if let Some(prev) = modifier_at.checked_sub(1).map(|p| words[p].as_str()) {
                if is_negation(prev) {
                    polarity *= NEGATION_FACTOR;
                }
            }

            polarity_sum += polarity.clamp(-1.0, 1.0);
            subjectivity_sum += subjectivity.clamp(0.0, 1.0);
            assessments += 1;
        }

        if assessments == 0 {
            return PatternScores {
                polarity: 0.0,
                subjectivity: 0.0,
            };
        }
        let n = assessments as f64;
        PatternScores {
            polarity: (polarity_sum / n).clamp(-1.0, 1.0),
            subjectivity: (subjectivity_sum / n).clamp(0.0, 1.0),
        }
    }
}

fn is_negation(word: &str) -> bool {
    matches!(
        word,
        "not" | "never" | "no" | "isnt" | "wasnt" | "arent" | "werent" | "dont" | "doesnt"
            | "didnt" | "cant" | "wont" | "aint" | "hardly"
    )
}

const INTENSIFIERS: &[(&str, f64)] = &[
    ("absolutely", 1.4),
    ("extremely", 1.5),
    ("incredibly", 1.4),
    ("really", 1.3),
    ("so", 1.2),
    ("super", 1.3),
    ("too", 1.2),
    ("totally", 1.3),
    ("truly", 1.2),
    ("very", 1.3),
    ("quite", 1.1),
    ("pretty", 1.1),
];

/// (word, polarity, subjectivity)
const ADJECTIVES: &[(&str, f64, f64)] = &[
    ("amazing", 0.6, 0.9),
    ("awesome", 1.0, 1.0),
    ("bad", -0.7, 0.667),
    ("beautiful", 0.85, 1.0),
    ("best", 1.0, 0.3),
    ("better", 0.5, 0.5),
    ("bland", -0.4, 0.6),
    ("boring", -1.0, 1.0),
    ("brilliant", 0.9, 1.0),
    ("confusing", -0.3, 0.7),
    ("cool", 0.35, 0.65),
    ("disappointing", -0.6, 0.7),
    ("dull", -0.3125, 0.6875),
    ("emotional", 0.3, 0.8),
    ("enjoyable", 0.5, 0.5),
    ("epic", 0.6, 0.8),
    ("excellent", 1.0, 1.0),
    ("fantastic", 0.4, 0.9),
    ("fine", 0.4167, 0.5),
    ("forgettable", -0.5, 0.6),
    ("fun", 0.3, 0.2),
    ("funny", 0.25, 1.0),
    ("good", 0.7, 0.6),
    ("gorgeous", 0.7, 0.9),
    ("great", 0.8, 0.75),
    ("horrible", -1.0, 1.0),
    ("incredible", 0.9, 0.9),
    ("interesting", 0.5, 0.5),
    ("lazy", -0.25, 0.5),
    ("long", -0.05, 0.4),
    ("mediocre", -0.4, 0.7),
    ("messy", -0.4, 0.7),
    ("nice", 0.6, 1.0),
    ("perfect", 1.0, 1.0),
    ("pointless", -0.5, 0.6),
    ("poor", -0.4, 0.6),
    ("predictable", -0.2, 0.5),
    ("repetitive", -0.3, 0.5),
    ("sad", -0.5, 1.0),
    ("slow", -0.3, 0.4),
    ("solid", 0.3, 0.4),
    ("strong", 0.433, 0.733),
    ("stunning", 0.8, 0.9),
    ("stupid", -0.8, 1.0),
    ("tedious", -0.6, 0.8),
    ("terrible", -1.0, 1.0),
    ("ugly", -0.7, 1.0),
    ("weak", -0.375, 0.625),
    ("wonderful", 1.0, 1.0),
    ("worse", -0.4, 0.6),
    ("worst", -1.0, 1.0),
];

#[cfg(test)]
mod tests {
    use super::*;

    fn words(text: &str) -> Vec<String> {
        text.split_whitespace().map(str::to_string).collect()
    }

    #[test]
    fn test_average_of_adjectives() {
        let scores = PatternModel::new().score(&words("good story terrible pacing"));
        assert!((scores.polarity - (-0.15)).abs() < 1e-9);
        assert!((scores.subjectivity - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_intensifier_multiplies() {
        let scores = PatternModel::new().score(&words("very good"));
        assert!((scores.polarity - 0.91).abs() < 1e-9);
        assert!((scores.subjectivity - 0.78).abs() < 1e-9);
    }

    #[test]
    fn test_negation_flips_and_halves() {
        let model = PatternModel::new();
        let scores = model.score(&words("not good"));
        assert!((scores.polarity - (-0.35)).abs() < 1e-9);
        let scores = model.score(&words("not very good"));
        assert!((scores.polarity - (-0.455)).abs() < 1e-9);
    }

    #[test]
    fn test_intensified_value_is_clamped() {
        let scores = PatternModel::new().score(&words("extremely perfect"));
        assert!((scores.polarity - 1.0).abs() < 1e-9);
        assert!((scores.subjectivity - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_no_adjectives() {
        let scores = PatternModel::new().score(&words("episode twelve aired"));
        assert_eq!(scores.polarity, 0.0);
        assert_eq!(scores.subjectivity, 0.0);
    }
}
