//! English stop words for topic tokens.
//!
//! Stop words only leave the topic/bag-of-words path. Sentiment scoring reads
//! the cleaned text directly, so negators such as "not" and contrast markers
//! such as "but" are still seen there.
//!
//! # Examples
//!
//! ```
//! use reviewlens::text::stopwords::StopWordsFilter;
//!
//! let filter = StopWordsFilter::english();
//! let tokens = vec!["the", "filler", "was", "endless"];
//! assert_eq!(filter.filter(&tokens), vec!["filler", "endless"]);
//! ```

use std::collections::HashSet;

/// Case-insensitive stop word set.
#[derive(Debug, Clone)]
pub struct StopWordsFilter {
    /// Lowercased stop words
    stop_words: HashSet<String>,
}

impl StopWordsFilter {
    /// Build a filter from custom words (lowercased on insert).
    pub fn new<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let stop_words = words
            .into_iter()
            .map(|s| s.as_ref().to_lowercase())
            .collect();

        Self { stop_words }
    }

    /// Filter with the built-in English list.
    #[must_use]
    pub fn english() -> Self {
        Self::new(ENGLISH_STOP_WORDS)
    }

    /// Add extra words, e.g. franchise names that would dominate every topic.
    #[must_use]
    pub fn with_extra<I, S>(mut self, words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.stop_words
            .extend(words.into_iter().map(|s| s.as_ref().to_lowercase()));
        self
    }

    /// Keep tokens that are not stop words, preserving order and case.
    pub fn filter<S: AsRef<str>>(&self, tokens: &[S]) -> Vec<String> {
        tokens
            .iter()
            .map(AsRef::as_ref)
            .filter(|t| !self.is_stop_word(t))
            .map(str::to_string)
            .collect()
    }

    /// Owned variant of [`filter`](Self::filter); kept tokens are moved, not cloned.
    #[must_use]
    pub fn filter_owned(&self, tokens: Vec<String>) -> Vec<String> {
        tokens
            .into_iter()
            .filter(|t| !self.is_stop_word(t))
            .collect()
    }

    /// Case-insensitive membership test.
    #[must_use]
    pub fn is_stop_word(&self, word: &str) -> bool {
        if word.chars().any(char::is_uppercase) {
            self.stop_words.contains(&word.to_lowercase())
        } else {
            self.stop_words.contains(word)
        }
    }

    /// Number of stop words.
    #[must_use]
    pub fn len(&self) -> usize {
        self.stop_words.len()
    }

    /// Whether the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stop_words.is_empty()
    }
}

impl Default for StopWordsFilter {
    fn default() -> Self {
        Self::english()
    }
}

/// Built-in English stop words, flattened from the category table.
pub const ENGLISH_STOP_WORDS: &[&str] = &build_stop_words();

/// (category, words)
const STOP_WORD_CATEGORIES: &[(&str, &[&str])] = &[
    ("articles", &["a", "an", "the"]),
    ("pronouns", &[
        "i", "me", "my", "myself", "we", "our", "ours", "ourselves",
        "you", "your", "yours", "yourself", "yourselves",
        "he", "him", "his", "himself", "she", "her", "hers", "herself",
        "it", "its", "itself", "they", "them", "their", "theirs", "themselves",
    ]),
    ("questions", &["what", "which", "who", "whom", "whose", "why", "when", "where", "how"]),
    ("prepositions", &[
        "about", "above", "across", "after", "against", "along", "among", "around",
        "at", "before", "behind", "below", "beneath", "beside", "between", "beyond",
        "by", "down", "during", "for", "from", "in", "inside", "into", "near",
        "of", "off", "on", "onto", "out", "outside", "over", "through", "throughout",
        "to", "toward", "under", "until", "up", "upon", "with", "within", "without",
    ]),
    ("conjunctions", &[
        "and", "as", "because", "but", "if", "or", "since", "so",
        "than", "that", "though", "unless", "while", "although",
    ]),
    ("verbs", &[
        "am", "is", "are", "was", "were", "be", "been", "being",
        "have", "has", "had", "having", "do", "does", "did", "doing",
        "would", "should", "could", "can", "may", "might", "must", "will", "shall",
    ]),
    ("contractions", &[
        "im", "ive", "dont", "doesnt", "didnt", "isnt", "wasnt", "arent", "cant",
        "wont", "its", "thats", "theres", "youre", "theyre",
    ]),
    ("adverbs_adjectives", &[
        "all", "any", "both", "each", "every", "few", "more", "most", "much",
        "neither", "no", "none", "not", "one", "other", "same", "several",
        "some", "such", "very", "too", "only", "own", "then", "there",
        "these", "this", "those", "just", "now", "here", "also", "really",
    ]),
    ("common", &[
        "again", "another", "back", "even", "ever", "still", "yet",
        "get", "got", "go", "going", "make", "made", "say", "said", "see",
        "take", "way", "thing", "things", "lot", "bit", "like",
    ]),
];

const TOTAL_STOP_WORDS: usize = count_total_stop_words();

const fn count_total_stop_words() -> usize {
    let mut total = 0;
    let mut i = 0;
    while i < STOP_WORD_CATEGORIES.len() {
        total += STOP_WORD_CATEGORIES[i].1.len();
        i += 1;
    }
    total
}

const fn build_stop_words() -> [&'static str; TOTAL_STOP_WORDS] {
    let mut result = [""; TOTAL_STOP_WORDS];
    let mut idx = 0;
    let mut cat = 0;
    while cat < STOP_WORD_CATEGORIES.len() {
        let words = STOP_WORD_CATEGORIES[cat].1;
        let mut w = 0;
        while w < words.len() {
            result[idx] = words[w];
            idx += 1;
            w += 1;
        }
        cat += 1;
    }
    result
}

#[cfg(test)]
#[path = "stopwords_tests.rs"]
mod tests;
