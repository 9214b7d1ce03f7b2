//! Review text cleaning and segmentation.
//!
//! # Examples
//!
//! ```
//! use reviewlens::text::TextNormalizer;
//!
//! let normalizer = TextNormalizer::new();
//! let text = normalizer
//!     .normalize("This review may contain spoilers.  The FIGHTS were great!")
//!     .expect("non-empty");
//! assert_eq!(text.clean_text, "The FIGHTS were great!");
//! assert_eq!(text.dedup_key, "the fights were great");
//! assert_eq!(text.tokens, vec!["fights", "great"]);
//! ```

use super::stopwords::StopWordsFilter;
use crate::error::{InsightError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::LazyLock;
use unicode_segmentation::UnicodeSegmentation;

/// Site boilerplate that carries no opinion.
static BOILERPLATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(?:this review (?:may|might) contain spoilers?|spoilers? warning|no spoilers?|click to read more)[.!:]*",
    )
    .expect("boilerplate pattern is valid")
});

static URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:https?://|www\.)\S+").expect("url pattern is valid")
});

/// Output of [`TextNormalizer::normalize`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedText {
    /// Cleaned text in original case, punctuation kept
    pub clean_text: String,
    /// Lowercase, punctuation-stripped words
    pub words: Vec<String>,
    /// Words minus stop words and pure numbers
    pub tokens: Vec<String>,
    /// Sentences of `clean_text`
    pub sentences: Vec<String>,
    /// `words` joined by single spaces
    pub dedup_key: String,
}

/// Readability metrics derived from a [`NormalizedText`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Readability {
    /// Number of words
    pub token_count: usize,
    /// Number of sentences
    pub sentence_count: usize,
    /// `token_count / max(1, sentence_count)`
    pub avg_sentence_length: f64,
    /// Unique words over `max(1, token_count)`
    pub lexical_diversity: f64,
}

impl NormalizedText {
    /// Compute readability metrics.
    #[must_use]
    pub fn readability(&self) -> Readability {
        let token_count = self.words.len();
        let sentence_count = self.sentences.len();
        let unique: HashSet<&str> = self.words.iter().map(String::as_str).collect();
        Readability {
            token_count,
            sentence_count,
            avg_sentence_length: token_count as f64 / sentence_count.max(1) as f64,
            lexical_diversity: unique.len() as f64 / token_count.max(1) as f64,
        }
    }
}

/// Deterministic, side-effect free review text normalizer.
#[derive(Debug, Clone, Default)]
pub struct TextNormalizer {
    stop_words: StopWordsFilter,
}

impl TextNormalizer {
    /// Normalizer with the built-in English stop words.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the stop word filter used for `tokens`.
    #[must_use]
    pub fn with_stop_words(mut self, stop_words: StopWordsFilter) -> Self {
        self.stop_words = stop_words;
        self
    }

    /// Clean and segment one review.
    ///
    /// # Errors
    ///
    /// Returns `EmptyText` when nothing is left after cleaning.
    pub fn normalize(&self, raw: &str) -> Result<NormalizedText> {
        let clean_text = clean(raw);
        if clean_text.is_empty() {
            return Err(InsightError::EmptyText);
        }

        let words = words_of(&clean_text);
        let tokens = words
            .iter()
            .filter(|w| !w.chars().all(|c| c.is_ascii_digit()))
            .filter(|w| !self.stop_words.is_stop_word(w))
            .cloned()
            .collect();
        let sentences = clean_text
            .unicode_sentences()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        let dedup_key = words.join(" ");

        Ok(NormalizedText {
            clean_text,
            words,
            tokens,
            sentences,
            dedup_key,
        })
    }
}

/// Case, whitespace and punctuation-insensitive key used for deduplication.
///
/// Empty when the text has no words.
#[must_use]
pub fn dedup_key(raw: &str) -> String {
    words_of(&clean(raw)).join(" ")
}

/// Strip boilerplate and URLs and collapse whitespace until nothing changes.
fn clean(raw: &str) -> String {
    let mut current = collapse_whitespace(raw);
    loop {
        let stripped = BOILERPLATE.replace_all(&current, " ");
        let stripped = URL.replace_all(&stripped, " ");
        let next = collapse_whitespace(&stripped);
        if next == current {
            return current;
        }
        current = next;
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn words_of(clean_text: &str) -> Vec<String> {
    clean_text
        .unicode_words()
        .map(|w| {
            w.chars()
                .filter(|c| c.is_alphanumeric())
                .flat_map(char::to_lowercase)
                .collect::<String>()
        })
        .filter(|w| !w.is_empty())
        .collect()
}

#[cfg(test)]
#[path = "normalize_tests.rs"]
mod tests;
