//! Rule-based valence model.
//!
//! Each word found in the valence table contributes its valence, adjusted by
//! up to three preceding booster words and negators, ALL-CAPS emphasis and a
//! contrastive "but". The sum is squashed into [-1, 1] with
//! `x / sqrt(x² + 15)`.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Booster increment.
const BOOST: f64 = 0.293;
/// Valence bump for an ALL-CAPS word in mixed-case text.
const CAPS_BOOST: f64 = 0.733;
/// Multiplier applied per negator in the preceding window.
const NEGATION_SCALAR: f64 = -0.74;
/// Per-`!` emphasis, at most four counted.
const EXCLAMATION_BOOST: f64 = 0.292;
/// Compound normalization constant.
const ALPHA: f64 = 15.0;
/// Words looked back for boosters and negators.
const WINDOW: usize = 3;

/// Scores from [`LexiconModel::score`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LexiconScores {
    /// Normalized sum in [-1, 1]
    pub compound: f64,
    /// Share of positive mass
    pub positive: f64,
    /// Share of neutral words
    pub neutral: f64,
    /// Share of negative mass
    pub negative: f64,
}

impl LexiconScores {
    fn neutral_text() -> Self {
        Self {
            compound: 0.0,
            positive: 0.0,
            neutral: 1.0,
            negative: 0.0,
        }
    }
}

struct Word<'a> {
    lower: String,
    raw: &'a str,
}

impl Word<'_> {
    fn is_caps(&self) -> bool {
        self.raw.chars().any(char::is_alphabetic)
            && self
                .raw
                .chars()
                .filter(|c| c.is_alphabetic())
                .all(char::is_uppercase)
    }
}

/// Valence lexicon with booster and negation rules.
#[derive(Debug, Clone)]
pub struct LexiconModel {
    valence: HashMap<String, f64>,
    boosters: HashMap<String, f64>,
    negators: HashSet<String>,
}

impl Default for LexiconModel {
    fn default() -> Self {
        Self::new()
    }
}

impl LexiconModel {
    /// Model with the built-in English review lexicon.
    #[must_use]
    pub fn new() -> Self {
        let valence = VALENCE.iter().map(|&(w, v)| (w.to_string(), v)).collect();
        let boosters = BOOSTERS
            .iter()
            .map(|&w| (w.to_string(), BOOST))
            .chain(DAMPENERS.iter().map(|&w| (w.to_string(), -BOOST)))
            .collect();
        let negators = NEGATORS.iter().map(|w| (*w).to_string()).collect();
        Self {
            valence,
            boosters,
            negators,
        }
    }

    /// Add or override valences (e.g. franchise slang).
    #[must_use]
    pub fn with_valences<I, S>(mut self, entries: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: AsRef<str>,
    {
        for (word, value) in entries {
            self.valence.insert(word.as_ref().to_lowercase(), value);
        }
        self
    }

    /// Valence of a single lowercase word.
    #[must_use]
    pub fn valence(&self, word: &str) -> Option<f64> {
        self.valence.get(word).copied()
    }

    fn is_negator(&self, word: &str) -> bool {
        self.negators.contains(word) || word.ends_with("n't")
    }

    /// Score cleaned text (original case and punctuation).
    #[must_use]
    pub fn score(&self, text: &str) -> LexiconScores {
        let words: Vec<Word<'_>> = text
            .split_whitespace()
            .map(|t| t.trim_matches(|c: char| !c.is_alphanumeric()))
            .filter(|t| t.chars().count() > 1)
            .map(|raw| Word {
                lower: raw.to_lowercase().replace('\u{2019}', "'"),
                raw,
            })
            .collect();
        if words.is_empty() {
            return LexiconScores::neutral_text();
        }

        let caps_count = words.iter().filter(|w| w.is_caps()).count();
        let caps_differ = caps_count > 0 && caps_count < words.len();

        let mut sentiments: Vec<f64> = words
            .iter()
            .enumerate()
            .map(|(i, word)| self.word_sentiment(&words, i, word, caps_differ))
            .collect();

        if let Some(but) = words.iter().position(|w| w.lower == "but") {
            for (i, s) in sentiments.iter_mut().enumerate() {
                if i < but {
                    *s *= 0.5;
                } else if i > but {
                    *s *= 1.5;
                }
            }
        }

        let emphasis = punctuation_emphasis(text);
        let mut sum: f64 = sentiments.iter().sum();
        if sum > 0.0 {
            sum += emphasis;
        } else if sum < 0.0 {
            sum -= emphasis;
        }
        let compound = (sum / (sum * sum + ALPHA).sqrt()).clamp(-1.0, 1.0);

        let mut pos_sum = 0.0;
        let mut neg_sum = 0.0;
        let mut neu_count = 0.0;
        for &s in &sentiments {
            if s > 0.0 {
                pos_sum += s + 1.0;
            } else if s < 0.0 {
                neg_sum += s - 1.0;
            } else {
                neu_count += 1.0;
            }
        }
        if pos_sum > neg_sum.abs() {
            pos_sum += emphasis;
        } else if pos_sum < neg_sum.abs() {
            neg_sum -= emphasis;
        }
        let total = pos_sum + neg_sum.abs() + neu_count;

        LexiconScores {
            compound,
            positive: (pos_sum / total).abs(),
            neutral: (neu_count / total).abs(),
            negative: (neg_sum / total).abs(),
        }
    }

    fn word_sentiment(&self, words: &[Word<'_>], i: usize, word: &Word<'_>, caps_differ: bool) -> f64 {
        if self.boosters.contains_key(&word.lower) {
            return 0.0;
        }
        let Some(mut valence) = self.valence(&word.lower) else {
            return 0.0;
        };
        let sign = valence.signum();
        if caps_differ && word.is_caps() {
            valence += sign * CAPS_BOOST;
        }

        for back in 1..=WINDOW.min(i) {
            let prev = &words[i - back];
            let distance_scale = match back {
                1 => 1.0,
                2 => 0.95,
                _ => 0.9,
            };
            if let Some(&boost) = self.boosters.get(&prev.lower) {
                let mut scalar = boost * sign;
                if caps_differ && prev.is_caps() {
                    scalar += sign * CAPS_BOOST;
                }
                valence += scalar * distance_scale;
            }
            if self.is_negator(&prev.lower) {
                valence *= NEGATION_SCALAR;
            }
        }
        valence
    }
}

fn punctuation_emphasis(text: &str) -> f64 {
    let exclamations = text.matches('!').count().min(4);
    let questions = text.matches('?').count();
    let question_boost = match questions {
        0 | 1 => 0.0,
        2 | 3 => questions as f64 * 0.18,
        _ => 0.96,
    };
    exclamations as f64 * EXCLAMATION_BOOST + question_boost
}

const NEGATORS: &[&str] = &[
    "not", "no", "never", "none", "nobody", "nothing", "neither", "nor", "nowhere",
    "cannot", "without", "dont", "doesnt", "didnt", "isnt", "wasnt", "arent", "werent",
    "cant", "couldnt", "wouldnt", "shouldnt", "wont", "aint", "hasnt", "havent", "hadnt",
];

const BOOSTERS: &[&str] = &[
    "absolutely", "completely", "deeply", "especially", "extremely", "highly",
    "incredibly", "insanely", "really", "so", "super", "too", "totally", "truly",
    "utterly", "very",
];

const DAMPENERS: &[&str] = &[
    "barely", "hardly", "kinda", "marginally", "partly", "slightly", "somewhat",
];

/// Built-in valences on a -4..4 scale.
const VALENCE: &[(&str, f64)] = &[
    // positive
    ("amazing", 2.8), ("awesome", 3.1), ("beautiful", 2.9), ("best", 3.2),
    ("better", 1.9), ("brilliant", 2.8), ("clever", 2.0), ("compelling", 1.8),
    ("cool", 1.3), ("engaging", 1.9), ("enjoy", 2.2), ("enjoyable", 1.9),
    ("enjoyed", 2.3), ("entertaining", 2.1), ("epic", 2.3), ("excellent", 2.7),
    ("exciting", 2.2), ("fantastic", 2.6), ("favorite", 2.0), ("favourite", 2.0),
    ("fine", 0.8), ("fun", 2.3), ("funny", 1.9), ("glad", 2.0), ("good", 1.9),
    ("gorgeous", 3.0), ("great", 3.1), ("happy", 2.7), ("heartwarming", 2.5),
    ("impressive", 2.3), ("incredible", 2.2), ("interesting", 1.7), ("legendary", 2.3),
    ("liked", 1.8), ("love", 3.2), ("loved", 2.9), ("lovely", 2.8), ("loves", 2.7),
    ("masterpiece", 3.1), ("memorable", 1.9), ("nice", 1.8), ("outstanding", 3.0),
    ("perfect", 2.7), ("recommend", 1.5), ("recommended", 1.5), ("satisfying", 2.0),
    ("solid", 1.4), ("strong", 2.3), ("stunning", 2.6), ("superb", 3.1),
    ("thrilling", 2.3), ("touching", 1.6), ("wholesome", 2.0), ("wonderful", 2.7),
    ("worth", 0.9),
    // negative
    ("annoyed", -1.6), ("annoying", -1.8), ("awful", -2.0), ("bad", -2.5),
    ("bland", -1.4), ("bored", -1.1), ("boring", -1.3), ("confusing", -1.3),
    ("cringe", -1.5), ("cringey", -1.5), ("disappointed", -1.9), ("disappointing", -2.2),
    ("disappointment", -2.3), ("disaster", -3.1), ("dull", -1.7), ("flawed", -1.6),
    ("forgettable", -1.3), ("frustrating", -1.9), ("garbage", -2.5), ("hate", -2.7),
    ("hated", -3.2), ("horrible", -2.5), ("lack", -1.3), ("lacking", -1.2),
    ("lazy", -1.3), ("mediocre", -1.6), ("mess", -1.5), ("messy", -1.6),
    ("nonsense", -1.5), ("overrated", -1.4), ("painful", -1.9), ("pointless", -1.8),
    ("poor", -2.1), ("poorly", -1.5), ("predictable", -0.9), ("problem", -1.7),
    ("problems", -1.7), ("repetitive", -1.1), ("ruin", -2.1), ("ruined", -2.4),
    ("ruins", -1.9), ("sad", -2.1), ("shallow", -1.2), ("stupid", -2.4),
    ("sucked", -2.0), ("sucks", -1.5), ("tedious", -1.9), ("terrible", -2.5),
    ("trash", -1.9), ("ugly", -2.3), ("unbearable", -2.6), ("unfortunately", -1.4),
    ("waste", -1.8), ("wasted", -2.2), ("weak", -1.9), ("worse", -2.1),
    ("worst", -3.1),
];

#[cfg(test)]
#[path = "lexicon_tests.rs"]
mod tests;
