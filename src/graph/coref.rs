//! Coreference chains

use super::term::TermId;
use serde::{Deserialize, Serialize};

/// Identifier of a coreference chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorefId(pub u32);

impl std::fmt::Display for CorefId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "co{}", self.0)
    }
}

/// One term of a mention span
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpanMember {
    pub term: TermId,
    pub is_head: bool,
}

impl SpanMember {
    pub fn new(term: TermId, is_head: bool) -> Self {
        Self { term, is_head }
    }
}

/// A mention: ordered terms, at most one of them marked head
pub type Span = Vec<SpanMember>;

/// Spans that refer to the same entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoreferenceChain {
    pub id: CorefId,
    pub spans: Vec<Span>,
}

impl CoreferenceChain {
    pub(crate) fn new(id: CorefId) -> Self {
        Self {
            id,
            spans: Vec::new(),
        }
    }

    /// Head term of every span that has one
    pub fn heads(&self) -> impl Iterator<Item = TermId> + '_ {
        self.spans
            .iter()
            .filter_map(|span| span.iter().find(|m| m.is_head).map(|m| m.term))
    }
}
