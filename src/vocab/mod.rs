//! Fixed tone/syllable vocabulary, target sampling, and prompt metadata.
//!
//! The class tables are a frozen contract with the classifier's output
//! spaces. Everything else here is bookkeeping around them: compound keys
//! such as `"chong4"`, uniform target sampling, and an optional display
//! metadata file for richer prompts.

mod table;

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::{ensure, Context, Result};
use serde::Deserialize;

pub use table::{SYLLABLES, TONE_BY_INDEX};

/// Size of the tone output head.
pub const TONE_COUNT: usize = TONE_BY_INDEX.len();
/// Size of the syllable output head.
pub const SYLLABLE_COUNT: usize = SYLLABLES.len();

/// Syllable label for a syllable-head output index.
pub fn syllable_label(index: usize) -> Option<&'static str> {
    SYLLABLES.get(index).copied()
}

/// Output index for a syllable label.
pub fn syllable_index(label: &str) -> Option<usize> {
    SYLLABLES.iter().position(|&entry| entry == label)
}

/// Tone number (1-4) for a tone-head output index.
pub fn tone_label(index: usize) -> Option<u8> {
    TONE_BY_INDEX.get(index).copied()
}

/// Output index for a tone number.
pub fn tone_index(tone: u8) -> Option<usize> {
    TONE_BY_INDEX.iter().position(|&entry| entry == tone)
}

/// The (syllable, tone) pair the learner is asked to produce this round.
///
/// Read-only once created; a round keeps its target until `new_round`
/// replaces it wholesale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Target {
    syllable: usize,
    tone: u8,
}

impl Target {
    pub fn new(syllable: usize, tone: u8) -> Result<Self> {
        ensure!(
            syllable < SYLLABLE_COUNT,
            "syllable index {} is outside the {}-entry vocabulary",
            syllable,
            SYLLABLE_COUNT
        );
        ensure!(
            tone_index(tone).is_some(),
            "tone {} is not one of the four Mandarin tones",
            tone
        );
        Ok(Self { syllable, tone })
    }

    pub fn syllable(&self) -> &'static str {
        SYLLABLES[self.syllable]
    }

    pub fn syllable_index(&self) -> usize {
        self.syllable
    }

    pub fn tone(&self) -> u8 {
        self.tone
    }

    /// Position of this target's tone in the tone output head.
    pub fn tone_output_index(&self) -> usize {
        TONE_BY_INDEX
            .iter()
            .position(|&entry| entry == self.tone)
            .unwrap_or(0)
    }

    /// Compound key form used by the metadata file, e.g. `"chong4"`.
    pub fn key(&self) -> String {
        format!("{}{}", self.syllable(), self.tone)
    }
}

/// Decompose a compound key such as `"chong4"` into its target.
pub fn parse_key(key: &str) -> Result<Target> {
    let trimmed = key.trim();
    let tone_char = trimmed
        .chars()
        .last()
        .with_context(|| format!("target key '{}' is empty", key))?;
    ensure!(
        tone_char.is_ascii_digit(),
        "target key '{}' must end in a tone digit 1-4",
        key
    );
    let syllable = &trimmed[..trimmed.len() - 1];
    let index = syllable_index(syllable)
        .with_context(|| format!("'{}' is not in the syllable vocabulary", syllable))?;
    Target::new(index, tone_char as u8 - b'0')
}

/// Sample a target uniformly at random from the full vocabulary.
pub fn sample_target() -> Target {
    Target {
        syllable: fastrand::usize(0..SYLLABLE_COUNT),
        tone: TONE_BY_INDEX[fastrand::usize(0..TONE_COUNT)],
    }
}

/// Display metadata for one prompt: characters, romanized pinyin, and the
/// recorded example speakers available for it.
#[derive(Debug, Clone, Deserialize)]
pub struct PromptEntry {
    pub characters: String,
    pub pinyin: String,
    #[serde(default)]
    pub speakers: Vec<String>,
}

/// Read-only lookup from compound key to display metadata.
#[derive(Debug, Clone, Default)]
pub struct PromptBook {
    entries: HashMap<String, PromptEntry>,
}

impl PromptBook {
    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("failed to read prompt metadata at {:?}", path))?;
        let entries: HashMap<String, PromptEntry> =
            serde_json::from_str(&data).context("failed to parse prompt metadata JSON")?;
        Ok(Self { entries })
    }

    pub fn get(&self, key: &str) -> Option<&PromptEntry> {
        self.entries.get(key)
    }

    /// Prompt line for a target: pinyin and characters when known, bare key
    /// otherwise.
    pub fn describe(&self, target: &Target) -> String {
        self.describe_key(&target.key())
    }

    pub fn describe_key(&self, key: &str) -> String {
        match self.get(key) {
            Some(entry) => format!("{} ({}) [{}]", entry.pinyin, entry.characters, key),
            None => key.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{
        parse_key, sample_target, syllable_index, syllable_label, tone_index, tone_label, Target,
        SYLLABLES, SYLLABLE_COUNT, TONE_BY_INDEX, TONE_COUNT,
    };
    use std::collections::HashSet;

    #[test]
    fn syllable_table_is_a_bijection() {
        let unique: HashSet<&str> = SYLLABLES.iter().copied().collect();
        assert_eq!(unique.len(), SYLLABLE_COUNT);
        for (index, &label) in SYLLABLES.iter().enumerate() {
            assert_eq!(syllable_index(label), Some(index));
            assert_eq!(syllable_label(index), Some(label));
        }
    }

    #[test]
    fn tone_table_is_a_permutation_of_the_four_tones() {
        let unique: HashSet<u8> = TONE_BY_INDEX.iter().copied().collect();
        assert_eq!(unique, [1, 2, 3, 4].into_iter().collect());
        for tone in 1..=4u8 {
            let index = tone_index(tone).unwrap();
            assert_eq!(tone_label(index), Some(tone));
        }
        assert_eq!(TONE_COUNT, 4);
    }

    #[test]
    fn keys_round_trip_through_parse() {
        let target = parse_key("chong4").unwrap();
        assert_eq!(target.syllable(), "chong");
        assert_eq!(target.tone(), 4);
        assert_eq!(target.key(), "chong4");
    }

    #[test]
    fn parse_rejects_unknown_syllables_and_tones() {
        assert!(parse_key("xyzzy1").is_err());
        assert!(parse_key("chong5").is_err());
        assert!(parse_key("chong").is_err());
        assert!(parse_key("").is_err());
    }

    #[test]
    fn sampled_targets_are_always_valid() {
        for _ in 0..64 {
            let target = sample_target();
            assert!(Target::new(target.syllable_index(), target.tone()).is_ok());
        }
    }

    #[test]
    fn tone_output_index_inverts_the_tone_table() {
        for (index, &tone) in TONE_BY_INDEX.iter().enumerate() {
            let target = Target::new(0, tone).unwrap();
            assert_eq!(target.tone_output_index(), index);
        }
    }
}
