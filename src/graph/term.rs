//! Term representation: one token occurrence in a sentence

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Identifier of a sentence within one document
///
/// Chosen by whoever creates the sentence; unique but not necessarily contiguous.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SentenceId(pub u32);

impl std::fmt::Display for SentenceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a term, allocated by the document
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TermId(pub u32);

impl std::fmt::Display for TermId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "t{}", self.0)
    }
}

/// Coarse part-of-speech category
///
/// Serialized as the single-letter code shared by every adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Pos {
    #[serde(rename = "N")]
    Noun,
    #[serde(rename = "V")]
    Verb,
    #[serde(rename = "A")]
    Adjective,
    #[serde(rename = "B")]
    Adverb,
    #[serde(rename = "P")]
    Preposition,
    #[serde(rename = "D")]
    Determiner,
    #[serde(rename = "C")]
    Conjunction,
    #[serde(rename = "O")]
    Pronoun,
    #[serde(rename = "Q")]
    Number,
    #[serde(rename = "R")]
    Particle,
    #[serde(rename = "M")]
    Name,
    #[serde(rename = ".")]
    Punctuation,
    #[serde(rename = "?")]
    Unknown,
}

impl Pos {
    /// The single-letter code
    pub fn code(self) -> char {
        match self {
            Self::Noun => 'N',
            Self::Verb => 'V',
            Self::Adjective => 'A',
            Self::Adverb => 'B',
            Self::Preposition => 'P',
            Self::Determiner => 'D',
            Self::Conjunction => 'C',
            Self::Pronoun => 'O',
            Self::Number => 'Q',
            Self::Particle => 'R',
            Self::Name => 'M',
            Self::Punctuation => '.',
            Self::Unknown => '?',
        }
    }

    pub fn from_code(code: char) -> Option<Self> {
        let pos = match code {
            'N' => Self::Noun,
            'V' => Self::Verb,
            'A' => Self::Adjective,
            'B' => Self::Adverb,
            'P' => Self::Preposition,
            'D' => Self::Determiner,
            'C' => Self::Conjunction,
            'O' => Self::Pronoun,
            'Q' => Self::Number,
            'R' => Self::Particle,
            'M' => Self::Name,
            '.' => Self::Punctuation,
            '?' => Self::Unknown,
            _ => return None,
        };
        Some(pos)
    }

    /// Part-of-speech suffix used in lexical unit names (`victory.n`)
    pub fn lexical_unit_suffix(self) -> &'static str {
        match self {
            Self::Noun | Self::Name => "n",
            Self::Verb => "v",
            Self::Adjective => "a",
            Self::Adverb => "adv",
            Self::Preposition => "prep",
            Self::Number => "num",
            Self::Conjunction => "c",
            Self::Pronoun => "pron",
            Self::Determiner => "art",
            Self::Particle => "part",
            Self::Punctuation | Self::Unknown => "x",
        }
    }
}

impl std::fmt::Display for Pos {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Attribute overflow for a term (fine-grained tag, entity type, ...)
pub type Extra = BTreeMap<String, String>;

/// A token occurrence, unique per (sentence, offset)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Term {
    pub id: TermId,
    pub sentence: SentenceId,
    /// Adapter-defined position; the dedup key within the sentence
    pub offset: i64,
    pub word: String,
    pub lemma: String,
    pub pos: Pos,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    extra: Extra,
}

impl Term {
    pub(crate) fn new(id: TermId, sentence: SentenceId, spec: NewTerm) -> Self {
        Self {
            id,
            sentence,
            offset: spec.offset,
            word: spec.word,
            lemma: spec.lemma,
            pos: spec.pos,
            extra: spec.extra,
        }
    }

    /// All attributes not covered by a named field
    pub fn extra(&self) -> &Extra {
        &self.extra
    }

    pub fn extra_value(&self, key: &str) -> Option<&str> {
        self.extra.get(key).map(String::as_str)
    }
}

/// Input for [`Document::add_term`](super::Document::add_term)
#[derive(Debug, Clone, PartialEq)]
pub struct NewTerm {
    pub offset: i64,
    pub word: String,
    pub lemma: String,
    pub pos: Pos,
    pub extra: Extra,
}

impl NewTerm {
    pub fn new(offset: i64, word: impl Into<String>, lemma: impl Into<String>, pos: Pos) -> Self {
        Self {
            offset,
            word: word.into(),
            lemma: lemma.into(),
            pos,
            extra: Extra::new(),
        }
    }

    /// Add an overflow attribute
    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }
}
