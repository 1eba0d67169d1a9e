//! Socket frame adapter
//!
//! Each sentence is sent to the frame tagger as CoNLL rows over a fresh TCP
//! connection. The tagger answers with one JSON record per line once the
//! write half is closed, and closes the connection when done.

use super::error::{AdapterError, AdapterResult};
use super::traits::{Adapter, AdapterInput};
use crate::config::SocketConfig;
use crate::graph::{Document, FrameElement, FrameSource, SentenceId, TermId};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, info};

/// One tagged sentence as returned by the tagger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaggerRecord {
    #[serde(default)]
    pub tokens: Vec<String>,
    #[serde(default)]
    pub frames: Vec<TaggedFrame>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaggedFrame {
    pub target: TaggedTarget,
    #[serde(rename = "annotationSets", default)]
    pub annotation_sets: Vec<AnnotationSet>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaggedTarget {
    pub name: String,
    pub spans: Vec<TokenSpan>,
}

/// One ranked reading of a frame's elements
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationSet {
    pub rank: u32,
    #[serde(default)]
    pub score: f64,
    #[serde(rename = "frameElements", default)]
    pub frame_elements: Vec<TaggedElement>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaggedElement {
    pub name: String,
    pub spans: Vec<TokenSpan>,
}

/// Token positions `start..end` within the sentence, end exclusive
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenSpan {
    pub start: usize,
    pub end: usize,
    #[serde(default)]
    pub text: String,
}

/// Render one sentence as CoNLL-X rows, terminated by a blank line.
///
/// The head column is the 1-based position of the term's governor, or 0
/// with relation `ROOT` when the term governs itself.
pub fn to_conll(doc: &Document, sentence: SentenceId) -> String {
    let terms = doc.terms_of(sentence);
    let position = |id: TermId| terms.iter().position(|t| t.id == id).map(|p| p + 1);
    let deps = doc.sentence(sentence).map(|s| s.dependencies()).unwrap_or(&[]);

    let mut out = String::new();
    for (i, term) in terms.iter().enumerate() {
        let fine = term
            .extra_value("tag")
            .or_else(|| term.extra_value("major"))
            .map(str::to_string)
            .unwrap_or_else(|| term.pos.code().to_string());
        let (head, relation) = deps
            .iter()
            .find(|d| d.from == term.id)
            .and_then(|d| position(d.to).map(|p| (p, d.relation.as_str())))
            .unwrap_or((0, "ROOT"));

        let _ = writeln!(
            out,
            "{}\t{}\t{}\t{}\t{}\t_\t{}\t{}\t_\t_",
            i + 1,
            term.word,
            term.lemma,
            term.pos.code(),
            fine,
            head,
            relation
        );
    }
    out.push('\n');
    out
}

/// Send `payload`, close the write half, and read until the peer closes.
pub async fn exchange(address: &str, payload: &str, timeout: Duration) -> AdapterResult<String> {
    let io = async {
        let mut stream = TcpStream::connect(address).await?;
        stream.write_all(payload.as_bytes()).await?;
        stream.shutdown().await?;

        let mut response = Vec::new();
        stream.read_to_end(&mut response).await?;
        let text = String::from_utf8(response).map_err(|e| {
            AdapterError::malformed(
                String::from_utf8_lossy(e.as_bytes()).into_owned(),
                None,
                format!("tagger response is not UTF-8: {}", e.utf8_error()),
            )
        })?;
        Ok::<_, AdapterError>(text)
    };

    tokio::time::timeout(timeout, io)
        .await
        .map_err(|_| AdapterError::timeout(format!("frame tagger at {}", address), timeout))?
}

/// Decode the non-blank lines of a tagger response.
pub fn decode_response(response: &str, sentence: SentenceId) -> AdapterResult<Vec<TaggerRecord>> {
    response
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            serde_json::from_str(line).map_err(|e| {
                AdapterError::malformed(line, Some(sentence), format!("invalid tagger record: {}", e))
            })
        })
        .collect()
}

fn span_terms(
    terms: &[TermId],
    spans: &[TokenSpan],
    sentence: SentenceId,
) -> AdapterResult<Vec<TermId>> {
    let mut ids = Vec::new();
    for span in spans {
        if span.start >= span.end || span.end > terms.len() {
            return Err(AdapterError::malformed(
                format!("{}..{} {:?}", span.start, span.end, span.text),
                Some(sentence),
                format!("span outside the sentence's {} tokens", terms.len()),
            ));
        }
        ids.extend_from_slice(&terms[span.start..span.end]);
    }
    Ok(ids)
}

/// Map a record's frames onto the sentence's terms and store them.
pub fn apply_record(doc: &mut Document, sentence: SentenceId, record: &TaggerRecord) -> AdapterResult<usize> {
    let terms: Vec<TermId> = doc.terms_of(sentence).iter().map(|t| t.id).collect();
    if record.tokens.len() != terms.len() {
        return Err(AdapterError::TokenCountMismatch {
            sentence,
            expected: terms.len(),
            found: record.tokens.len(),
        });
    }

    for frame in &record.frames {
        let targets = span_terms(&terms, &frame.target.spans, sentence)?;
        let elements = match frame.annotation_sets.iter().min_by_key(|set| set.rank) {
            Some(best) => best
                .frame_elements
                .iter()
                .map(|fe| Ok(FrameElement::new(&fe.name, span_terms(&terms, &fe.spans, sentence)?)))
                .collect::<AdapterResult<Vec<_>>>()?,
            None => Vec::new(),
        };
        doc.add_frame(&frame.target.name, targets, elements, FrameSource::Tagger)?;
    }
    Ok(record.frames.len())
}

/// Adapter for the frame-semantic tagging service.
///
/// Needs a document that already holds terms and dependencies.
pub struct SocketFrameAdapter {
    adapter_id: String,
    config: SocketConfig,
}

impl SocketFrameAdapter {
    pub fn new(config: SocketConfig) -> Self {
        Self {
            adapter_id: "socket-frames".to_string(),
            config,
        }
    }
}

#[async_trait]
impl Adapter for SocketFrameAdapter {
    fn id(&self) -> &str {
        &self.adapter_id
    }

    async fn annotate(&self, input: &AdapterInput, doc: &mut Document) -> Result<(), AdapterError> {
        let address = self.config.address();
        let ids: Vec<SentenceId> = doc.sentences().iter().map(|s| s.id).collect();
        info!(address = %address, sentences = ids.len(), "tagging frames");

        let mut total = 0;
        for sentence in ids {
            input.check_cancelled()?;
            let payload = to_conll(doc, sentence);

            let response = tokio::select! {
                result = exchange(&address, &payload, self.config.timeout()) => result?,
                _ = input.cancel.cancelled() => return Err(AdapterError::Cancelled),
            };

            for record in decode_response(&response, sentence)? {
                let added = apply_record(doc, sentence, &record)?;
                debug!(sentence = %sentence, frames = added, "tagged sentence");
                total += added;
            }
        }

        info!(frames = total, "frame tagging finished");
        Ok(())
    }
}
