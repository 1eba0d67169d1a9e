//! Phrase-type to dependency-label table
//!
//! Catalog valences speak in phrase types and grammatical functions
//! (`NP`/`Ext`, `PP[for]`/`Dep`); documents speak in dependency labels
//! (`nsubj`, `prep_for`). The table bridging them is configuration, tuned to
//! whichever label vocabulary the syntactic adapter produces.

use super::catalog::Valence;
use crate::graph::TermId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Candidate label prefixes for one valence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationRule {
    pub phrase_type: String,
    pub function: String,
    pub prefixes: Vec<String>,
}

impl RelationRule {
    pub fn new(phrase_type: &str, function: &str, prefixes: &[&str]) -> Self {
        Self {
            phrase_type: phrase_type.to_string(),
            function: function.to_string(),
            prefixes: prefixes.iter().map(|p| p.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelationTable {
    /// Phrase types marking elements that are never realised in the sentence
    pub skip: BTreeSet<String>,
    /// Phrase types treated as another phrase type
    pub equivalents: BTreeMap<String, String>,
    pub rules: Vec<RelationRule>,
}

impl Default for RelationTable {
    /// Labels of the Stanford collapsed dependency scheme.
    fn default() -> Self {
        Self {
            skip: ["CNI", "DNI", "INI"].iter().map(|s| s.to_string()).collect(),
            equivalents: [("N".to_string(), "NP".to_string())].into_iter().collect(),
            rules: vec![
                RelationRule::new("NP", "Ext", &["nsubj", "nsubjpass", "xsubj"]),
                RelationRule::new("NP", "Obj", &["dobj", "iobj"]),
                RelationRule::new("NP", "Dep", &["dobj", "nn", "npadvmod", "tmod"]),
                RelationRule::new("Poss", "Gen", &["poss"]),
                RelationRule::new("PP", "Dep", &["prep"]),
                RelationRule::new("PPing", "Dep", &["prepc"]),
                RelationRule::new("AJP", "Dep", &["amod", "acomp"]),
                RelationRule::new("AVP", "Dep", &["advmod"]),
                RelationRule::new("Sfin", "Dep", &["ccomp"]),
                RelationRule::new("Sinterrog", "Dep", &["ccomp"]),
                RelationRule::new("VPto", "Dep", &["xcomp"]),
                RelationRule::new("VPing", "Dep", &["xcomp"]),
            ],
        }
    }
}

/// Split `PP[for]` into `("PP", Some("for"))`.
fn split_phrase_type(phrase_type: &str) -> (&str, Option<&str>) {
    match phrase_type.split_once('[') {
        Some((base, rest)) => (base, Some(rest.trim_end_matches(']'))),
        None => (phrase_type, None),
    }
}

impl RelationTable {
    pub fn is_skip(&self, valence: &Valence) -> bool {
        self.skip.contains(&valence.phrase_type)
    }

    /// Number of elements whose phrase type can be realised
    pub fn significant_count<'a>(&self, valences: impl IntoIterator<Item = &'a Valence>) -> usize {
        valences.into_iter().filter(|v| !self.is_skip(v)).count()
    }

    /// First label among `children` that can realise `valence`.
    pub fn compatible_relation(
        &self,
        valence: &Valence,
        children: &BTreeMap<String, TermId>,
    ) -> Option<String> {
        if self.is_skip(valence) {
            return None;
        }

        let (base, suffix) = split_phrase_type(&valence.phrase_type);
        let base = self.equivalents.get(base).map(String::as_str).unwrap_or(base);

        self.rules
            .iter()
            .filter(|r| r.phrase_type == base && r.function == valence.grammatical_function)
            .flat_map(|r| r.prefixes.iter())
            .map(|prefix| match suffix {
                Some(suffix) => format!("{}_{}", prefix, suffix),
                None => prefix.clone(),
            })
            .find(|label| children.contains_key(label))
    }
}
