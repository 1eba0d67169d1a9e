//! Document: the per-text annotation graph every adapter writes into

use super::coref::{CorefId, CoreferenceChain, SpanMember};
use super::dependency::Dependency;
use super::frame::{FrameElement, FrameId, FrameInstance, FrameSource};
use super::term::{NewTerm, SentenceId, Term, TermId};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use thiserror::Error;
use uuid::Uuid;

/// Errors raised when a mutation would break the graph's invariants
#[derive(Debug, Error, PartialEq)]
pub enum GraphError {
    #[error("invalid edge {from} -> {to}: {reason}")]
    InvalidEdge {
        from: TermId,
        to: TermId,
        reason: String,
    },

    #[error("unknown term: {0}")]
    UnknownTerm(TermId),

    #[error("unknown sentence: {0}")]
    UnknownSentence(SentenceId),

    #[error("unknown coreference chain: {0}")]
    UnknownChain(CorefId),

    #[error("malformed span in {chain}: {reason}")]
    MalformedSpan { chain: CorefId, reason: String },
}

/// Result type for graph mutations
pub type GraphResult<T> = Result<T, GraphError>;

/// Unique identifier for a document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct DocumentId(Uuid);

impl DocumentId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for DocumentId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for DocumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A sentence: owns its terms and the dependencies between them
#[derive(Debug, Clone, Serialize)]
pub struct Sentence {
    pub id: SentenceId,
    terms: Vec<Term>,
    dependencies: Vec<Dependency>,
    #[serde(skip)]
    by_offset: HashMap<i64, usize>,
}

impl Sentence {
    fn new(id: SentenceId) -> Self {
        Self {
            id,
            terms: Vec::new(),
            dependencies: Vec::new(),
            by_offset: HashMap::new(),
        }
    }

    /// Terms in the order they were created
    pub fn terms(&self) -> &[Term] {
        &self.terms
    }

    pub fn dependencies(&self) -> &[Dependency] {
        &self.dependencies
    }
}

/// The annotation graph for one input text
///
/// Not safe for concurrent mutation: adapters run to completion one after
/// another, then the frame resolver reads the finished document.
#[derive(Debug, Clone, Serialize)]
pub struct Document {
    pub id: DocumentId,
    pub created_at: DateTime<Utc>,
    sentences: Vec<Sentence>,
    coreferences: Vec<CoreferenceChain>,
    frames: Vec<FrameInstance>,
    #[serde(skip)]
    sentence_index: HashMap<SentenceId, usize>,
    /// term id -> (sentence position, term position)
    #[serde(skip)]
    term_index: HashMap<TermId, (usize, usize)>,
    #[serde(skip)]
    next_term: u32,
    #[serde(skip)]
    next_coref: u32,
    #[serde(skip)]
    next_frame: u32,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        Self {
            id: DocumentId::new(),
            created_at: Utc::now(),
            sentences: Vec::new(),
            coreferences: Vec::new(),
            frames: Vec::new(),
            sentence_index: HashMap::new(),
            term_index: HashMap::new(),
            next_term: 1,
            next_coref: 1,
            next_frame: 1,
        }
    }

    // ------------------------------------------------------------------
    // Mutation
    // ------------------------------------------------------------------

    /// Create a sentence, or return the existing one with this id
    pub fn create_sentence(&mut self, id: SentenceId) -> SentenceId {
        if !self.sentence_index.contains_key(&id) {
            self.sentence_index.insert(id, self.sentences.len());
            self.sentences.push(Sentence::new(id));
        }
        id
    }

    /// Create a sentence numbered one past the highest id so far
    pub fn next_sentence(&mut self) -> SentenceId {
        let next = self.sentences.iter().map(|s| s.id.0).max().unwrap_or(0) + 1;
        self.create_sentence(SentenceId(next))
    }

    /// Add a term, or return the one already stored at this offset
    pub fn add_term(&mut self, sentence: SentenceId, term: NewTerm) -> GraphResult<TermId> {
        let s_idx = *self
            .sentence_index
            .get(&sentence)
            .ok_or(GraphError::UnknownSentence(sentence))?;
        let s = &mut self.sentences[s_idx];

        if let Some(&t_idx) = s.by_offset.get(&term.offset) {
            return Ok(s.terms[t_idx].id);
        }

        let id = TermId(self.next_term);
        self.next_term += 1;

        let t_idx = s.terms.len();
        s.by_offset.insert(term.offset, t_idx);
        s.terms.push(Term::new(id, sentence, term));
        self.term_index.insert(id, (s_idx, t_idx));
        Ok(id)
    }

    /// Record a dependency; both terms must exist and share a sentence
    pub fn add_dependency(
        &mut self,
        from: TermId,
        to: TermId,
        relation: impl Into<String>,
    ) -> GraphResult<()> {
        let invalid = |reason: String| GraphError::InvalidEdge { from, to, reason };

        let &(from_s, _) = self
            .term_index
            .get(&from)
            .ok_or_else(|| invalid(format!("unknown term {}", from)))?;
        let &(to_s, _) = self
            .term_index
            .get(&to)
            .ok_or_else(|| invalid(format!("unknown term {}", to)))?;

        if from_s != to_s {
            return Err(invalid(format!(
                "terms belong to sentences {} and {}",
                self.sentences[from_s].id, self.sentences[to_s].id
            )));
        }

        self.sentences[from_s]
            .dependencies
            .push(Dependency::new(from, to, relation));
        Ok(())
    }

    /// Start an empty coreference chain
    pub fn create_coreference(&mut self) -> CorefId {
        let id = CorefId(self.next_coref);
        self.next_coref += 1;
        self.coreferences.push(CoreferenceChain::new(id));
        id
    }

    /// Append a span to a chain; at most one member may be the head
    pub fn add_span(&mut self, chain: CorefId, members: Vec<SpanMember>) -> GraphResult<()> {
        if let Some(missing) = members.iter().find(|m| !self.term_index.contains_key(&m.term)) {
            return Err(GraphError::UnknownTerm(missing.term));
        }
        let heads = members.iter().filter(|m| m.is_head).count();
        if heads > 1 {
            return Err(GraphError::MalformedSpan {
                chain,
                reason: format!("{} head markers", heads),
            });
        }
        let target = self
            .coreferences
            .iter_mut()
            .find(|c| c.id == chain)
            .ok_or(GraphError::UnknownChain(chain))?;
        target.spans.push(members);
        Ok(())
    }

    /// Record a frame instance
    pub fn add_frame(
        &mut self,
        name: impl Into<String>,
        targets: Vec<TermId>,
        elements: Vec<FrameElement>,
        source: FrameSource,
    ) -> GraphResult<FrameId> {
        let referenced = targets
            .iter()
            .chain(elements.iter().flat_map(|e| e.terms.iter()));
        for term in referenced {
            if !self.term_index.contains_key(term) {
                return Err(GraphError::UnknownTerm(*term));
            }
        }

        let id = FrameId(self.next_frame);
        self.next_frame += 1;
        self.frames.push(FrameInstance {
            id,
            name: name.into(),
            targets,
            elements,
            source,
        });
        Ok(id)
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Sentences in creation order
    pub fn sentences(&self) -> &[Sentence] {
        &self.sentences
    }

    pub fn sentence(&self, id: SentenceId) -> Option<&Sentence> {
        self.sentence_index.get(&id).map(|&i| &self.sentences[i])
    }

    pub fn term(&self, id: TermId) -> Option<&Term> {
        self.term_index
            .get(&id)
            .map(|&(s, t)| &self.sentences[s].terms[t])
    }

    /// Terms of a sentence in creation order (empty if the sentence is unknown)
    pub fn terms_of(&self, sentence: SentenceId) -> &[Term] {
        self.sentence(sentence).map(Sentence::terms).unwrap_or(&[])
    }

    pub fn term_count(&self) -> usize {
        self.term_index.len()
    }

    /// All dependencies, sentence by sentence
    pub fn dependencies(&self) -> impl Iterator<Item = &Dependency> + '_ {
        self.sentences.iter().flat_map(|s| s.dependencies.iter())
    }

    /// Dependencies governed by `term`
    pub fn children_of(&self, term: TermId) -> impl Iterator<Item = &Dependency> + '_ {
        let deps: &[Dependency] = match self.term_index.get(&term) {
            Some(&(s, _)) => &self.sentences[s].dependencies,
            None => &[],
        };
        deps.iter().filter(move |d| d.to == term)
    }

    pub fn coreferences(&self) -> &[CoreferenceChain] {
        &self.coreferences
    }

    pub fn frames(&self) -> &[FrameInstance] {
        &self.frames
    }

    /// Serialize the whole graph as pretty-printed JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
