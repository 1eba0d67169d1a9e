//! Annotation pipeline
//!
//! Runs the configured adapters one after another against a fresh document,
//! then resolves frame elements on the finished document. A failing adapter
//! drops the document; callers never see a half-annotated graph.

use crate::adapter::{Adapter, AdapterError, AdapterInput, CancellationToken};
use crate::frames::{FrameElementResolver, ResolveError};
use crate::graph::Document;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("adapter {adapter} failed: {source}")]
    Adapter {
        adapter: String,
        #[source]
        source: AdapterError,
    },

    #[error("frame resolution failed: {0}")]
    Resolve(#[from] ResolveError),
}

pub type PipelineResult<T> = Result<T, PipelineError>;

#[derive(Default)]
pub struct AnnotationPipeline {
    adapters: Vec<Arc<dyn Adapter>>,
    resolver: Option<FrameElementResolver>,
}

impl AnnotationPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an adapter; adapters run in registration order.
    pub fn register_adapter(&mut self, adapter: Arc<dyn Adapter>) {
        self.adapters.push(adapter);
    }

    pub fn with_adapter(mut self, adapter: Arc<dyn Adapter>) -> Self {
        self.register_adapter(adapter);
        self
    }

    pub fn with_resolver(mut self, resolver: FrameElementResolver) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn adapter_ids(&self) -> Vec<&str> {
        self.adapters.iter().map(|a| a.id()).collect()
    }

    /// Annotate one text.
    ///
    /// 1. Each adapter writes into the same new document, in order
    /// 2. The resolver reads the finished document and drafts frames
    /// 3. The drafts are recorded
    pub async fn annotate(&self, text: &str, cancel: CancellationToken) -> PipelineResult<Document> {
        let input = AdapterInput::new(text).with_cancel(cancel);
        let mut doc = Document::new();

        for adapter in &self.adapters {
            debug!(adapter = adapter.id(), "running adapter");
            adapter
                .annotate(&input, &mut doc)
                .await
                .map_err(|source| PipelineError::Adapter {
                    adapter: adapter.id().to_string(),
                    source,
                })?;
        }

        if let Some(resolver) = &self.resolver {
            let drafts = resolver.resolve_document(&doc)?;
            let added = resolver.apply(&mut doc, &drafts)?;
            debug!(drafts = drafts.len(), added, "frame elements resolved");
        }

        info!(
            document = %doc.id,
            sentences = doc.sentences().len(),
            terms = doc.term_count(),
            frames = doc.frames().len(),
            "document annotated"
        );
        Ok(doc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frames::{CatalogEntry, FeGroup, RelationTable, StaticCatalog, Valence};
    use crate::graph::{FrameSource, NewTerm, Pos, SentenceId};
    use async_trait::async_trait;

    /// Writes "Troops attack" with a tagged Attack frame
    struct FixedAdapter;

    #[async_trait]
    impl Adapter for FixedAdapter {
        fn id(&self) -> &str {
            "fixed"
        }

        async fn annotate(&self, _input: &AdapterInput, doc: &mut Document) -> Result<(), AdapterError> {
            let s = doc.create_sentence(SentenceId(1));
            let troops = doc.add_term(s, NewTerm::new(0, "Troops", "troop", Pos::Noun))?;
            let attack = doc.add_term(s, NewTerm::new(7, "attack", "attack", Pos::Verb))?;
            doc.add_dependency(troops, attack, "nsubj")?;
            doc.add_frame("Attack", vec![attack], Vec::new(), FrameSource::Tagger)?;
            Ok(())
        }
    }

    struct FailingAdapter;

    #[async_trait]
    impl Adapter for FailingAdapter {
        fn id(&self) -> &str {
            "failing"
        }

        async fn annotate(&self, _input: &AdapterInput, _doc: &mut Document) -> Result<(), AdapterError> {
            Err(AdapterError::malformed("???", Some(SentenceId(1)), "unreadable"))
        }
    }

    fn resolver() -> FrameElementResolver {
        let entry = CatalogEntry {
            groups: vec![FeGroup {
                elements: [
                    ("Assailant".to_string(), Valence::new("NP", "Ext")),
                    ("Victim".to_string(), Valence::new("DNI", "")),
                ]
                .into_iter()
                .collect(),
                frequency: 3,
            }],
            patterns: Vec::new(),
        };
        let catalog = StaticCatalog::new().with_entry("Attack", "attack", Pos::Verb, entry);
        FrameElementResolver::new(Arc::new(catalog), RelationTable::default())
    }

    #[tokio::test]
    async fn adapters_then_resolver() {
        let pipeline = AnnotationPipeline::new()
            .with_adapter(Arc::new(FixedAdapter))
            .with_resolver(resolver());

        let doc = pipeline.annotate("Troops attack", CancellationToken::new()).await.unwrap();
        assert_eq!(doc.frames().len(), 2);
        let resolved = &doc.frames()[1];
        assert_eq!(resolved.source, FrameSource::Resolver);
        assert_eq!(resolved.element("Assailant").unwrap().terms, vec![doc.terms_of(SentenceId(1))[0].id]);
    }

    #[tokio::test]
    async fn failing_adapter_names_itself() {
        let pipeline = AnnotationPipeline::new()
            .with_adapter(Arc::new(FixedAdapter))
            .with_adapter(Arc::new(FailingAdapter));
        assert_eq!(pipeline.adapter_ids(), vec!["fixed", "failing"]);

        let err = pipeline.annotate("x", CancellationToken::new()).await.unwrap_err();
        match err {
            PipelineError::Adapter { adapter, source } => {
                assert_eq!(adapter, "failing");
                assert!(matches!(source, AdapterError::MalformedLine { .. }));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
