//! Semantic frame instances

use super::term::TermId;
use serde::{Deserialize, Serialize};

/// Identifier of a frame instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FrameId(pub u32);

impl std::fmt::Display for FrameId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "f{}", self.0)
    }
}

/// Who produced a frame instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrameSource {
    /// Decoded from frame-semantic tagger output
    Tagger,
    /// Synthesized from catalog patterns by the resolver
    Resolver,
}

/// A role and the terms filling it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameElement {
    pub name: String,
    pub terms: Vec<TermId>,
}

impl FrameElement {
    pub fn new(name: impl Into<String>, terms: Vec<TermId>) -> Self {
        Self {
            name: name.into(),
            terms,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameInstance {
    pub id: FrameId,
    pub name: String,
    pub targets: Vec<TermId>,
    pub elements: Vec<FrameElement>,
    pub source: FrameSource,
}

impl FrameInstance {
    /// The term the frame is anchored to
    pub fn target(&self) -> Option<TermId> {
        self.targets.first().copied()
    }

    pub fn element(&self, name: &str) -> Option<&FrameElement> {
        self.elements.iter().find(|e| e.name == name)
    }
}
