//! End-to-end runs of the annotation pipeline against stand-in tools

mod common;

use annograph::adapter::{AdapterError, CancellationToken, SocketFrameAdapter, StreamingDependencyAdapter};
use annograph::frames::{FrameElementResolver, StaticCatalog};
use annograph::{AnnotationPipeline, Config, FrameSource, PipelineError, Pos, SentenceId};
use common::{fake_tagger, replay_parser, temp_file, ATTACK_RECORD, ATTACK_STREAM};
use std::sync::Arc;

/// Relation table for the parser's own labels, plus the catalog location
const CONFIG: &str = r#"
relations:
  rules:
    - phrase_type: NP
      function: Ext
      prefixes: [su]
    - phrase_type: NP
      function: Obj
      prefixes: [obj1]
"#;

const CATALOG: &str = r#"
frames:
  attack:
    lexical_units:
      attack.v:
        groups:
          - elements:
              Assailant: { pt: NP, gf: Ext }
              Victim: { pt: NP, gf: Obj }
            frequency: 5
        patterns:
          - element: Assailant
            valence: { pt: NP, gf: Ext }
            frequency: 9
"#;

#[tokio::test]
async fn parse_tag_and_resolve() {
    let config_file = temp_file(".yaml", CONFIG);
    let catalog_file = temp_file(".yaml", CATALOG);
    let config = Config::load(config_file.path()).unwrap();
    let catalog = StaticCatalog::load(catalog_file.path()).unwrap();
    let (tagger, server) = fake_tagger(ATTACK_RECORD).await;

    let pipeline = AnnotationPipeline::new()
        .with_adapter(Arc::new(StreamingDependencyAdapter::new(replay_parser())))
        .with_adapter(Arc::new(SocketFrameAdapter::new(tagger)))
        .with_resolver(FrameElementResolver::new(Arc::new(catalog), config.relations.clone()));

    let doc = pipeline
        .annotate(ATTACK_STREAM, CancellationToken::new())
        .await
        .unwrap();

    let terms = doc.terms_of(SentenceId(1));
    assert_eq!(terms.len(), 3);
    assert_eq!(terms[1].word, "attacked");
    assert_eq!(terms[1].pos, Pos::Verb);
    assert_eq!(doc.dependencies().count(), 2);

    let request = server.await.unwrap();
    assert_eq!(request.lines().filter(|l| !l.is_empty()).count(), 3);
    assert!(request.lines().nth(1).unwrap().starts_with("2\tattacked\tattack\tV\tverb"));

    assert_eq!(doc.frames().len(), 2);
    let tagged = &doc.frames()[0];
    assert_eq!(tagged.source, FrameSource::Tagger);
    assert_eq!(tagged.targets, vec![terms[1].id]);

    let resolved = &doc.frames()[1];
    assert_eq!(resolved.source, FrameSource::Resolver);
    assert_eq!(resolved.name, "Attack");
    assert_eq!(resolved.element("Assailant").unwrap().terms, vec![terms[0].id]);
    assert_eq!(resolved.element("Victim").unwrap().terms, vec![terms[2].id]);

    let json: serde_json::Value = serde_json::from_str(&doc.to_json().unwrap()).unwrap();
    assert_eq!(json["frames"][1]["source"], "resolver");
}

#[tokio::test]
async fn broken_parser_output_discards_the_document() {
    let pipeline = AnnotationPipeline::new()
        .with_adapter(Arc::new(StreamingDependencyAdapter::new(replay_parser())));

    let err = pipeline
        .annotate("not|a|dependency|line\n", CancellationToken::new())
        .await
        .unwrap_err();
    match err {
        PipelineError::Adapter { adapter, source } => {
            assert_eq!(adapter, "streaming-dependencies");
            assert!(matches!(source, AdapterError::MalformedLine { .. }));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn tagger_disagreeing_on_tokens_is_fatal() {
    let (tagger, _server) = fake_tagger(r#"{"frames":[],"tokens":["Troops","attacked"]}"#).await;
    let pipeline = AnnotationPipeline::new()
        .with_adapter(Arc::new(StreamingDependencyAdapter::new(replay_parser())))
        .with_adapter(Arc::new(SocketFrameAdapter::new(tagger)));

    let err = pipeline
        .annotate(ATTACK_STREAM, CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        PipelineError::Adapter {
            source: AdapterError::TokenCountMismatch { expected: 3, found: 2, .. },
            ..
        }
    ));
}

#[tokio::test]
async fn cancelled_pipeline_runs_nothing() {
    let cancel = CancellationToken::new();
    cancel.cancel();
    let pipeline = AnnotationPipeline::new()
        .with_adapter(Arc::new(StreamingDependencyAdapter::new(replay_parser())));

    let err = pipeline.annotate(ATTACK_STREAM, cancel).await.unwrap_err();
    assert!(matches!(
        err,
        PipelineError::Adapter {
            source: AdapterError::Cancelled,
            ..
        }
    ));
}
