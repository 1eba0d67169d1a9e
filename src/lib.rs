//! annograph: one annotation graph from many NLP tools
//!
//! External parsers and taggers each see a document differently. Adapters
//! translate their output (dependency lines, interactive transcripts, frame
//! records) into a single graph of sentences, terms, dependencies,
//! coreference chains and frames. A resolver then aligns frame elements with
//! the syntactic children of each frame's target.
//!
//! # Core Concepts
//!
//! - **Document**: sentences owning terms and the dependencies between them
//! - **Adapters**: one per external tool, run in sequence against a document
//! - **Frame catalog**: valence patterns used to fill frame elements
//!
//! # Example
//!
//! ```
//! use annograph::{Document, NewTerm, Pos, SentenceId};
//!
//! let mut doc = Document::new();
//! let s = doc.create_sentence(SentenceId(1));
//! let dog = doc.add_term(s, NewTerm::new(0, "dog", "dog", Pos::Noun)).unwrap();
//! let barks = doc.add_term(s, NewTerm::new(4, "barks", "bark", Pos::Verb)).unwrap();
//! doc.add_dependency(dog, barks, "nsubj").unwrap();
//! assert_eq!(doc.children_of(barks).count(), 1);
//! ```

pub mod adapter;
pub mod config;
pub mod frames;
mod graph;
pub mod pipeline;

pub use config::{Config, ConfigError};
pub use graph::{
    CorefId, CoreferenceChain, Dependency, Document, DocumentId, Extra, FrameElement, FrameId, FrameInstance,
    FrameSource, GraphError, GraphResult, NewTerm, Pos, Sentence, SentenceId, Span, SpanMember, Term, TermId,
};
pub use pipeline::{AnnotationPipeline, PipelineError, PipelineResult};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
