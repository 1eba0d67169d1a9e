//! Frame catalog: valence patterns per frame and lexical unit
//!
//! The resolver only needs, for a (frame, lemma, pos) triple, the observed
//! element groups and single-element patterns with their frequencies.
//! `StaticCatalog` serves these from a YAML or JSON file:
//!
//! ```yaml
//! frames:
//!   Finish_competition:
//!     lexical_units:
//!       victory.n:
//!         groups:
//!           - elements:
//!               Competition: { pt: N, gf: Dep }
//!               Competitor: { pt: Poss, gf: Gen }
//!             frequency: 4
//!         patterns:
//!           - element: Competitor
//!             valence: { pt: "PP[for]", gf: Dep }
//!             frequency: 4
//! ```

use crate::graph::Pos;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// How an element is realised: phrase type and grammatical function
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Valence {
    #[serde(rename = "pt")]
    pub phrase_type: String,
    #[serde(rename = "gf")]
    pub grammatical_function: String,
}

impl Valence {
    pub fn new(phrase_type: impl Into<String>, grammatical_function: impl Into<String>) -> Self {
        Self {
            phrase_type: phrase_type.into(),
            grammatical_function: grammatical_function.into(),
        }
    }
}

/// Elements observed together, and how often
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeGroup {
    pub elements: BTreeMap<String, Valence>,
    pub frequency: u32,
}

/// One element observed on its own
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FePattern {
    pub element: String,
    pub valence: Valence,
    pub frequency: u32,
}

/// Everything the catalog knows about one lexical unit of one frame
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    #[serde(default)]
    pub groups: Vec<FeGroup>,
    #[serde(default)]
    pub patterns: Vec<FePattern>,
}

/// A lookup that found nothing. Not an error for the caller's document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogMiss {
    #[error("frame not found: {0}")]
    FrameNotFound(String),

    #[error("lexical unit {lexical_unit} not found in frame {frame}")]
    LexicalUnitNotFound { frame: String, lexical_unit: String },
}

/// Source of valence patterns for the resolver
pub trait FrameCatalog: Send + Sync {
    fn lookup(&self, frame: &str, lemma: &str, pos: Pos) -> Result<CatalogEntry, CatalogMiss>;
}

/// `finish competition` -> `Finish_competition`
pub fn normalize_frame_name(name: &str) -> String {
    let mut chars = name.chars();
    let normalized: String = match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.as_str().to_lowercase().chars()).collect(),
        None => String::new(),
    };
    normalized.replace(' ', "_")
}

/// `Victory`, noun -> `victory.n`
pub fn lexical_unit_key(lemma: &str, pos: Pos) -> String {
    format!("{}.{}", lemma.to_lowercase(), pos.lexical_unit_suffix())
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("cannot read catalog {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid catalog {path}: {reason}")]
    Parse { path: PathBuf, reason: String },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogFrame {
    #[serde(default)]
    pub lexical_units: BTreeMap<String, CatalogEntry>,
}

/// In-memory catalog, usually loaded from a file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StaticCatalog {
    #[serde(default)]
    frames: BTreeMap<String, CatalogFrame>,
}

impl StaticCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(mut self, frame: &str, lemma: &str, pos: Pos, entry: CatalogEntry) -> Self {
        self.frames
            .entry(normalize_frame_name(frame))
            .or_default()
            .lexical_units
            .insert(lexical_unit_key(lemma, pos), entry);
        self
    }

    /// Re-key frames and lexical units in their lookup form.
    fn normalized(self) -> Self {
        let frames = self
            .frames
            .into_iter()
            .map(|(name, frame)| {
                let lexical_units = frame
                    .lexical_units
                    .into_iter()
                    .map(|(key, entry)| (key.to_lowercase(), entry))
                    .collect();
                (normalize_frame_name(&name), CatalogFrame { lexical_units })
            })
            .collect();
        Self { frames }
    }

    pub fn from_yaml(text: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str::<Self>(text).map(Self::normalized)
    }

    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str::<Self>(text).map(Self::normalized)
    }

    /// Load a `.json` file as JSON and anything else as YAML.
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let text = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let parse_error = |reason: String| CatalogError::Parse {
            path: path.to_path_buf(),
            reason,
        };

        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json(&text).map_err(|e| parse_error(e.to_string())),
            _ => Self::from_yaml(&text).map_err(|e| parse_error(e.to_string())),
        }
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }
}

impl FrameCatalog for StaticCatalog {
    fn lookup(&self, frame: &str, lemma: &str, pos: Pos) -> Result<CatalogEntry, CatalogMiss> {
        let name = normalize_frame_name(frame);
        let found = self
            .frames
            .get(&name)
            .ok_or_else(|| CatalogMiss::FrameNotFound(name.clone()))?;
        let key = lexical_unit_key(lemma, pos);
        found
            .lexical_units
            .get(&key)
            .cloned()
            .ok_or(CatalogMiss::LexicalUnitNotFound {
                frame: name,
                lexical_unit: key,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const VICTORY: &str = r#"
frames:
  finish competition:
    lexical_units:
      Victory.N:
        groups:
          - elements:
              Competition: { pt: N, gf: Dep }
              Competitor: { pt: Poss, gf: Gen }
            frequency: 4
        patterns:
          - element: Competitor
            valence: { pt: "PP[for]", gf: Dep }
            frequency: 4
"#;

    #[test]
    fn frame_names_are_normalized() {
        assert_eq!(normalize_frame_name("finish competition"), "Finish_competition");
        assert_eq!(normalize_frame_name("ATTACK"), "Attack");
        assert_eq!(normalize_frame_name(""), "");
    }

    #[test]
    fn lookup_by_lemma_and_pos() {
        let catalog = StaticCatalog::from_yaml(VICTORY).unwrap();
        let entry = catalog.lookup("Finish_competition", "victory", Pos::Noun).unwrap();

        assert_eq!(entry.groups.len(), 1);
        assert_eq!(entry.groups[0].elements["Competitor"], Valence::new("Poss", "Gen"));
        assert_eq!(entry.patterns[0].valence.phrase_type, "PP[for]");
    }

    #[test]
    fn misses_are_typed() {
        let catalog = StaticCatalog::from_yaml(VICTORY).unwrap();
        assert_eq!(
            catalog.lookup("Attack", "victory", Pos::Noun),
            Err(CatalogMiss::FrameNotFound("Attack".to_string()))
        );
        assert_eq!(
            catalog.lookup("finish competition", "victory", Pos::Verb),
            Err(CatalogMiss::LexicalUnitNotFound {
                frame: "Finish_competition".to_string(),
                lexical_unit: "victory.v".to_string(),
            })
        );
    }

    #[test]
    fn load_json_by_extension() {
        let catalog = StaticCatalog::new().with_entry("Attack", "attack", Pos::Verb, CatalogEntry::default());
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, "{}", serde_json::to_string(&catalog).unwrap()).unwrap();

        let loaded = StaticCatalog::load(file.path()).unwrap();
        assert_eq!(loaded, catalog);
        assert!(loaded.lookup("attack", "Attack", Pos::Verb).is_ok());
    }

    #[test]
    fn broken_file_names_the_path() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        write!(file, "frames: [").unwrap();
        let err = StaticCatalog::load(file.path()).unwrap_err();
        assert!(matches!(err, CatalogError::Parse { .. }));
        assert!(err.to_string().contains(".yaml"));
    }
}
