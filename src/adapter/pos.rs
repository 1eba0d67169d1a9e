//! Tag tables mapping tool-specific part-of-speech tags onto [`Pos`]

use super::error::AdapterError;
use crate::graph::Pos;
use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Coarse category names emitted by the streaming dependency parser
static CATEGORY_TABLE: Lazy<HashMap<&'static str, Pos>> = Lazy::new(|| {
    use Pos::*;
    HashMap::from([
        ("pronoun", Pronoun),
        ("reflexive", Pronoun),
        ("verb", Verb),
        ("noun", Noun),
        ("np", Noun),
        ("preposition", Preposition),
        ("pp", Preposition),
        ("p", Preposition),
        ("determiner", Determiner),
        ("comparative", Conjunction),
        ("complementizer", Conjunction),
        ("conj", Conjunction),
        ("conjunct", Conjunction),
        ("adverb", Adverb),
        ("adv", Adverb),
        ("intensifier", Adverb),
        ("adjective", Adjective),
        ("punct", Punctuation),
        ("particle", Particle),
        ("part", Particle),
        ("name", Name),
        ("number", Number),
        ("cat", Number),
        ("n", Number),
        ("quant", Number),
        ("tag", Unknown),
        ("anders", Unknown),
        ("etc", Unknown),
        ("enumeration", Unknown),
        ("sg", Unknown),
        ("zo", Unknown),
        ("max", Unknown),
        ("mogelijk", Unknown),
        ("sbar", Unknown),
        ("--", Unknown),
    ])
});

/// A parsed category tag such as `noun(de,count,sg)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryTag {
    pub pos: Pos,
    /// Text before the parenthesised features
    pub major: String,
    /// Parenthesised features, without the parentheses
    pub minor: Option<String>,
}

/// Split a category tag into major/minor parts and look up its coarse POS.
///
/// The lookup key is the last `_`-separated piece of the major part, so
/// `tmp_noun(...)` resolves like `noun(...)`.
pub fn category_tag(tag: &str) -> Result<CategoryTag, AdapterError> {
    let (major, minor) = match tag.split_once('(') {
        Some((major, rest)) => (major, Some(rest.strip_suffix(')').unwrap_or(rest))),
        None => (tag, None),
    };
    let key = major.rsplit('_').next().unwrap_or(major);

    let pos = CATEGORY_TABLE
        .get(key)
        .copied()
        .ok_or_else(|| AdapterError::UnknownTag {
            tag: key.to_string(),
            context: format!("category tag {:?}", tag),
        })?;

    Ok(CategoryTag {
        pos,
        major: major.to_string(),
        minor: minor.map(str::to_string),
    })
}

/// Map a Penn Treebank tag (as produced by the interactive parser).
pub fn penn_tag(tag: &str) -> Result<Pos, AdapterError> {
    use Pos::*;
    let pos = match tag {
        "NNP" | "NNPS" => Name,
        "NN" | "NNS" => Noun,
        "VB" | "VBD" | "VBG" | "VBN" | "VBP" | "VBZ" | "MD" => Verb,
        "JJ" | "JJR" | "JJS" => Adjective,
        "RB" | "RBR" | "RBS" | "WRB" => Adverb,
        "IN" | "TO" => Preposition,
        "DT" | "PDT" | "WDT" => Determiner,
        "CC" => Conjunction,
        "PRP" | "PRP$" | "WP" | "WP$" | "EX" => Pronoun,
        "CD" => Number,
        "RP" | "POS" => Particle,
        "." | "," | ":" | "``" | "''" | "-LRB-" | "-RRB-" | "#" | "$" | "HYPH" => Punctuation,
        "FW" | "LS" | "SYM" | "UH" => Unknown,
        _ => {
            return Err(AdapterError::UnknownTag {
                tag: tag.to_string(),
                context: "Penn Treebank tag".to_string(),
            })
        }
    };
    Ok(pos)
}
