//! Keyword-based aspect flags.
//!
//! Each [`Aspect`] owns a phrase list. A review mentions an aspect when one of
//! its phrases appears as a whole-word sequence in the normalized words.
//!
//! # Examples
//!
//! ```
//! use reviewlens::aspect::{Aspect, AspectExtractor, AspectLexicon};
//! use reviewlens::text::TextNormalizer;
//!
//! let extractor = AspectExtractor::new(&AspectLexicon::default()).expect("valid lexicon");
//! let text = TextNormalizer::new()
//!     .normalize("Great world-building, amazing fights")
//!     .expect("non-empty");
//! let flags = extractor.extract(&text);
//! assert!(flags.contains(Aspect::WorldBuilding));
//! assert!(flags.contains(Aspect::Fight));
//! assert!(!flags.contains(Aspect::Filler));
//! ```

use crate::error::{InsightError, Result};
use crate::text::NormalizedText;
use aho_corasick::{AhoCorasick, AhoCorasickBuilder, MatchKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Discussion aspects tracked per review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aspect {
    /// Filler episodes and arcs
    Filler,
    /// Art, animation quality, studio
    Animation,
    /// Characters and their development
    Character,
    /// Pacing, slow or rushed stretches
    Pacing,
    /// Fights and battle choreography
    Fight,
    /// Story, plot and writing
    Story,
    /// Setting, lore, power systems
    WorldBuilding,
}

impl Aspect {
    /// All aspects in reporting order.
    pub const ALL: [Aspect; 7] = [
        Aspect::Filler,
        Aspect::Animation,
        Aspect::Character,
        Aspect::Pacing,
        Aspect::Fight,
        Aspect::Story,
        Aspect::WorldBuilding,
    ];

    /// Stable lowercase name.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Aspect::Filler => "filler",
            Aspect::Animation => "animation",
            Aspect::Character => "character",
            Aspect::Pacing => "pacing",
            Aspect::Fight => "fight",
            Aspect::Story => "story",
            Aspect::WorldBuilding => "world_building",
        }
    }
}

impl fmt::Display for Aspect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn phrases(list: &[&str]) -> Vec<String> {
    list.iter().map(|p| (*p).to_string()).collect()
}

/// Phrase lists per aspect. Every field may be overridden from configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AspectLexicon {
    /// Phrases for [`Aspect::Filler`]
    pub filler: Vec<String>,
    /// Phrases for [`Aspect::Animation`]
    pub animation: Vec<String>,
    /// Phrases for [`Aspect::Character`]
    pub character: Vec<String>,
    /// Phrases for [`Aspect::Pacing`]
    pub pacing: Vec<String>,
    /// Phrases for [`Aspect::Fight`]
    pub fight: Vec<String>,
    /// Phrases for [`Aspect::Story`]
    pub story: Vec<String>,
    /// Phrases for [`Aspect::WorldBuilding`]
    pub world_building: Vec<String>,
}

impl Default for AspectLexicon {
    fn default() -> Self {
        Self {
            filler: phrases(&["filler", "fillers"]),
            animation: phrases(&["animation", "animated", "animating"]),
            character: phrases(&["character", "characters"]),
            pacing: phrases(&["pacing", "slow", "drag", "drags", "dragging"]),
            fight: phrases(&["fight", "fights", "fighting", "battle", "battles", "combat"]),
            story: phrases(&["story", "plot"]),
            world_building: phrases(&["world building", "worldbuilding"]),
        }
    }
}

impl AspectLexicon {
    /// Phrases of one aspect.
    #[must_use]
    pub fn phrases(&self, aspect: Aspect) -> &[String] {
        match aspect {
            Aspect::Filler => &self.filler,
            Aspect::Animation => &self.animation,
            Aspect::Character => &self.character,
            Aspect::Pacing => &self.pacing,
            Aspect::Fight => &self.fight,
            Aspect::Story => &self.story,
            Aspect::WorldBuilding => &self.world_building,
        }
    }

    /// Replace the phrases of one aspect.
    #[must_use]
    pub fn with_phrases<S: Into<String>>(
        mut self,
        aspect: Aspect,
        list: impl IntoIterator<Item = S>,
    ) -> Self {
        let list: Vec<String> = list.into_iter().map(Into::into).collect();
        match aspect {
            Aspect::Filler => self.filler = list,
            Aspect::Animation => self.animation = list,
            Aspect::Character => self.character = list,
            Aspect::Pacing => self.pacing = list,
            Aspect::Fight => self.fight = list,
            Aspect::Story => self.story = list,
            Aspect::WorldBuilding => self.world_building = list,
        }
        self
    }

    /// Reject phrases with no word characters.
    ///
    /// # Errors
    ///
    /// `InvalidConfig` naming the offending aspect.
    pub fn validate(&self) -> Result<()> {
        for aspect in Aspect::ALL {
            if let Some(bad) = self.phrases(aspect).iter().find(|p| canonical(p).is_empty()) {
                return Err(InsightError::invalid_config(
                    &format!("aspects.{}", aspect.name()),
                    format!("{bad:?}"),
                    "phrases must contain at least one word",
                ));
            }
        }
        Ok(())
    }
}

/// Aspects mentioned by one review.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AspectFlags(BTreeSet<Aspect>);

impl AspectFlags {
    /// Whether `aspect` was mentioned.
    #[must_use]
    pub fn contains(&self, aspect: Aspect) -> bool {
        self.0.contains(&aspect)
    }

    /// Mentioned aspects in order.
    pub fn iter(&self) -> impl Iterator<Item = Aspect> + '_ {
        self.0.iter().copied()
    }

    /// Whether nothing was mentioned.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of aspects mentioned.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl FromIterator<Aspect> for AspectFlags {
    fn from_iter<I: IntoIterator<Item = Aspect>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Lowercased words joined by single spaces, padded on both ends.
fn canonical(phrase: &str) -> String {
    let words: Vec<String> = phrase
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect();
    if words.is_empty() {
        String::new()
    } else {
        format!(" {} ", words.join(" "))
    }
}

/// Whole-word phrase matcher over every aspect at once.
#[derive(Debug, Clone)]
pub struct AspectExtractor {
    automaton: AhoCorasick,
    /// Aspect of each automaton pattern
    owners: Vec<Aspect>,
}

impl AspectExtractor {
    /// Compile the lexicon.
    ///
    /// # Errors
    ///
    /// `InvalidConfig` for an empty phrase or an automaton that cannot be built.
    pub fn new(lexicon: &AspectLexicon) -> Result<Self> {
        lexicon.validate()?;
        let mut patterns = Vec::new();
        let mut owners = Vec::new();
        for aspect in Aspect::ALL {
            for phrase in lexicon.phrases(aspect) {
                patterns.push(canonical(phrase));
                owners.push(aspect);
            }
        }
        let automaton = AhoCorasickBuilder::new()
            .match_kind(MatchKind::Standard)
            .build(&patterns)
            .map_err(|e| InsightError::invalid_config("aspects", e, "phrases must compile"))?;
        Ok(Self { automaton, owners })
    }

    /// Flags for one review.
    #[must_use]
    pub fn extract(&self, text: &NormalizedText) -> AspectFlags {
        if text.words.is_empty() {
            return AspectFlags::default();
        }
        let haystack = format!(" {} ", text.words.join(" "));
        self.automaton
            .find_overlapping_iter(&haystack)
            .map(|m| self.owners[m.pattern().as_usize()])
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::TextNormalizer;

    fn flags(text: &str) -> AspectFlags {
        let normalized = TextNormalizer::new().normalize(text).expect("non-empty");
        AspectExtractor::new(&AspectLexicon::default())
            .expect("built-in lexicon compiles")
            .extract(&normalized)
    }

    #[test]
    fn test_scenario_reviews() {
        let a = flags("I loved this, amazing fights and story");
        assert_eq!(a.iter().collect::<Vec<_>>(), vec![Aspect::Fight, Aspect::Story]);

        let b = flags("filler dragged it down, still fine");
        assert_eq!(b.iter().collect::<Vec<_>>(), vec![Aspect::Filler]);

        let c = flags("terrible pacing and filler ruined it");
        assert!(c.contains(Aspect::Filler));
        assert!(c.contains(Aspect::Pacing));
    }

    #[test]
    fn test_whole_word_only() {
        assert!(!flags("a plotted fightless history").contains(Aspect::Story));
        assert!(!flags("fightless").contains(Aspect::Fight));
        assert!(flags("The PLOT!").contains(Aspect::Story));
    }

    #[test]
    fn test_multi_word_phrase() {
        assert!(flags("the world building is deep").contains(Aspect::WorldBuilding));
        assert!(flags("Worldbuilding: top tier").contains(Aspect::WorldBuilding));
        assert!(!flags("the world is building up").contains(Aspect::WorldBuilding));
    }

    #[test]
    fn test_lexicon_override() {
        let lexicon = AspectLexicon::default().with_phrases(Aspect::Filler, ["recap episodes"]);
        let extractor = AspectExtractor::new(&lexicon).expect("valid");
        let n = TextNormalizer::new();
        let recap = n.normalize("so many recap episodes").expect("non-empty");
        let filler = n.normalize("so much filler").expect("non-empty");
        assert!(extractor.extract(&recap).contains(Aspect::Filler));
        assert!(!extractor.extract(&filler).contains(Aspect::Filler));
    }

    #[test]
    fn test_empty_phrase_rejected() {
        let lexicon = AspectLexicon::default().with_phrases(Aspect::Story, ["  --  "]);
        assert!(matches!(
            AspectExtractor::new(&lexicon),
            Err(InsightError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn test_partial_config_keeps_defaults() {
        let lexicon: AspectLexicon =
            serde_json::from_str(r#"{"filler": ["padding"]}"#).expect("valid json");
        assert_eq!(lexicon.filler, vec!["padding".to_string()]);
        assert_eq!(lexicon.story, AspectLexicon::default().story);
    }
}
