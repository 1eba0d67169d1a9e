//! Core annotation graph data structures

mod coref;
mod dependency;
mod document;
mod frame;
mod term;


pub use coref::{CorefId, CoreferenceChain, Span, SpanMember};
pub use dependency::Dependency;
pub use document::{Document, DocumentId, GraphError, GraphResult, Sentence};
pub use frame::{FrameElement, FrameId, FrameInstance, FrameSource};
pub use term::{Extra, NewTerm, Pos, SentenceId, Term, TermId};
