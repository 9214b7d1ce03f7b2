//! Text normalization for review corpora.
//!
//! - [`normalize`]: cleaning, word/sentence segmentation, dedup keys, readability
//! - [`stopwords`]: English stop words for topic tokens

pub mod normalize;
pub mod stopwords;

pub use normalize::{NormalizedText, Readability, TextNormalizer};
pub use stopwords::StopWordsFilter;
